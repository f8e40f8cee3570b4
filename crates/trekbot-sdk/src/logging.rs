//! 日志初始化
//!
//! 导航库本身只通过 `tracing` 宏输出；应用在启动时调用一次 [`init_logger`]，
//! 安装 `tracing-subscriber` 的 fmt 输出（写到 stderr）并用 `RUST_LOG` 过滤。
//! 同时把 `log` crate 的记录桥接进来，依赖库的日志也能看到。
//!
//! 重复调用是安全的：已经安装过全局 subscriber 时什么也不做，返回 `false`。

use tracing_subscriber::EnvFilter;

/// 未设置 `RUST_LOG` 时的默认过滤
pub const DEFAULT_DIRECTIVE: &str = "trekbot=info";

/// 以 [`DEFAULT_DIRECTIVE`] 为基础初始化日志
pub fn init_logger() -> bool {
    init_logger_with_filter(DEFAULT_DIRECTIVE)
}

/// 以指定过滤初始化日志；`RUST_LOG` 存在时优先使用 `RUST_LOG`
///
/// 返回本次调用是否安装了全局 subscriber。
pub fn init_logger_with_filter(directives: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return false;
    }

    // log -> tracing 桥接；已有 logger 时忽略
    let _ = tracing_log::LogTracer::init_with_filter(log::LevelFilter::Trace);
    true
}
