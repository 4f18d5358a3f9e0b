pub mod config;
pub mod env_type;
pub mod environment;
pub mod package;
pub mod response;

pub use config::*;
pub use env_type::EnvironmentType;
pub use environment::*;
pub use package::*;
pub use response::{error_sentinel, CondaResponse, Reply};
