// conda-manager 库入口

pub mod core;
pub mod models;
pub mod server;
pub mod services;
pub mod utils;

pub use models::*;

pub use services::{EnvManager, PackageVersion};

pub use server::{ApiReply, ApiRoute, ApiServer};

pub use utils::command::{CommandExecutor, CommandOutput, CommandRunner, SystemRunner};

pub use crate::core::{init_logger, update_log_level, AppError, AppResult, ErrorContext};
