// 配置结构：服务端口、日志以及外部包管理器可执行文件

use serde::{Deserialize, Serialize};

/// 未设置 `CONDA_EXE` 时使用的可执行文件名
pub const DEFAULT_CONDA_EXE: &str = "conda";

/// 指定包管理器可执行文件的环境变量
pub const CONDA_EXE_ENV: &str = "CONDA_EXE";

/// 外部包管理器配置
///
/// 启动时读取一次，之后显式注入 `EnvManager`，不使用全局变量。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// 可执行文件（可以带固定参数，按空白切分）
    pub conda_exe: String,
}

impl ManagerConfig {
    pub fn new(conda_exe: impl Into<String>) -> Self {
        Self {
            conda_exe: conda_exe.into(),
        }
    }

    /// 从环境变量读取，未设置或为空时回退到 `conda`
    pub fn from_env() -> Self {
        let conda_exe = std::env::var(CONDA_EXE_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONDA_EXE.to_string());
        Self { conda_exe }
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CONDA_EXE)
    }
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!("无效的日志级别: {s}")),
        }
    }
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// 日志输出目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Console,
    File,
    Both,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub output: LogOutput,
    /// 日志目录（文件输出时使用），为空时使用 ~/.conda-manager/logs
    #[serde(default)]
    pub file_path: Option<String>,
}

/// HTTP 服务配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// 允许局域网访问（默认仅本地访问）
    #[serde(default)]
    pub allow_public: bool,
}

fn default_port() -> u16 {
    8765
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            allow_public: false,
        }
    }
}

/// 全局配置（config.json）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8765);
        assert!(!config.server.allow_public);
        assert_eq!(config.log.level, LogLevel::Info);
        assert_eq!(config.log.output, LogOutput::Console);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"log": {"level": "debug", "format": "json"}}"#).unwrap();
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.log.format, LogFormat::Json);
        assert!(config.log.file_path.is_none());
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!("DEBUG".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    #[serial]
    fn test_manager_config_from_env() {
        let previous = std::env::var(CONDA_EXE_ENV).ok();

        std::env::set_var(CONDA_EXE_ENV, "/opt/conda/bin/conda");
        assert_eq!(ManagerConfig::from_env().conda_exe, "/opt/conda/bin/conda");

        std::env::set_var(CONDA_EXE_ENV, "  ");
        assert_eq!(ManagerConfig::from_env().conda_exe, DEFAULT_CONDA_EXE);

        std::env::remove_var(CONDA_EXE_ENV);
        assert_eq!(ManagerConfig::from_env().conda_exe, DEFAULT_CONDA_EXE);

        if let Some(value) = previous {
            std::env::set_var(CONDA_EXE_ENV, value);
        }
    }
}
