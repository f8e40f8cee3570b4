//! 命令定义和实现

pub mod config;
pub mod detect;
pub mod diff;
pub mod navigate;

pub use config::ConfigCommand;
pub use detect::DetectCommand;
pub use diff::DiffCommand;
pub use navigate::NavigateCommand;
