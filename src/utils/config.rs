use crate::core::error::{AppError, AppResult, ErrorContext};
use crate::models::AppConfig;
use std::fs;
use std::path::PathBuf;

/// 覆盖配置目录的环境变量
pub const CONFIG_DIR_ENV: &str = "CONDA_MANAGER_CONFIG_DIR";

/// 配置目录（默认 ~/.conda-manager），若不存在则创建
pub fn config_dir() -> AppResult<PathBuf> {
    let dir = match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .ok_or_else(|| AppError::Config {
                reason: "无法获取用户主目录".to_string(),
            })?
            .join(".conda-manager"),
    };

    if !dir.exists() {
        fs::create_dir_all(&dir).with_path(&dir)?;
    }
    Ok(dir)
}

/// 全局配置文件路径
pub fn app_config_path() -> AppResult<PathBuf> {
    Ok(config_dir()?.join("config.json"))
}

/// 默认日志目录
pub fn default_log_dir() -> AppResult<PathBuf> {
    let dir = config_dir()?.join("logs");
    fs::create_dir_all(&dir).with_path(&dir)?;
    Ok(dir)
}

/// 读取全局配置，文件不存在时返回默认配置
pub fn read_app_config() -> AppResult<AppConfig> {
    let config_path = app_config_path()?;
    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "配置文件不存在，使用默认配置");
        return Ok(AppConfig::default());
    }

    let content = fs::read_to_string(&config_path).with_path(&config_path)?;
    serde_json::from_str(&content).map_err(|e| AppError::Config {
        reason: format!("解析 {} 失败: {e}", config_path.display()),
    })
}
