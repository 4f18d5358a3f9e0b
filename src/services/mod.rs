// 服务层
//
// - env_manager: conda 环境与包操作
// - salvage: 从 conda 输出中恢复 JSON
// - version: 包版本解析与比较

pub mod env_manager;
pub mod salvage;
pub mod version;

pub use env_manager::EnvManager;
pub use salvage::{clean_json, clean_json_lines};
pub use version::PackageVersion;
