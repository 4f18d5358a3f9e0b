pub mod command;
pub mod config;

pub use command::*;
pub use config::*;
