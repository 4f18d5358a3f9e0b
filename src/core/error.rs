//! 统一错误类型定义
//!
//! JSON 解析失败不会走到这里：那一类错误由 salvage 解码器降级为 `{"error": true}`。
//! `AppError` 只承载配置/集成层面的故障（找不到可执行文件、输出不是 UTF-8、
//! 未知的环境类型等），并原样向调用方传播。

use std::path::PathBuf;
use thiserror::Error;

/// 应用层统一错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 无法启动外部命令（可执行文件不存在、权限不足等）
    #[error("无法启动命令 `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// 命令输出不是合法的 UTF-8
    #[error("命令输出不是合法的 UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// 未知的环境类型（不在预置类型表中）
    #[error("未知的环境类型: {0}")]
    UnknownEnvironmentType(String),

    /// 包描述无法解析
    #[error("无法解析包信息: {0}")]
    MalformedPackage(String),

    /// 外部工具返回了结构不符合预期的 JSON
    #[error("外部工具返回的数据结构不符合预期: {0}")]
    UnexpectedPayload(String),

    /// 配置错误
    #[error("配置错误: {reason}")]
    Config { reason: String },

    /// 文件 I/O 错误
    #[error("文件 I/O 错误: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON 序列化/反序列化错误
    #[error("JSON 序列化错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    /// 从 `std::io::Error` 和路径创建 I/O 错误
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// 稳定的错误码，供 HTTP 响应使用
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Spawn { .. } => "SPAWN_FAILED",
            AppError::Encoding(_) => "INVALID_ENCODING",
            AppError::UnknownEnvironmentType(_) => "UNKNOWN_ENVIRONMENT_TYPE",
            AppError::MalformedPackage(_) => "MALFORMED_PACKAGE",
            AppError::UnexpectedPayload(_) => "UNEXPECTED_PAYLOAD",
            AppError::Config { .. } => "CONFIGURATION_ERROR",
            AppError::Io { .. } => "IO_ERROR",
            AppError::Json(_) => "JSON_ERROR",
            AppError::Other(_) => "INTERNAL_ERROR",
        }
    }
}

/// 为 `Result` 附加上下文信息
pub trait ErrorContext<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> AppResult<T>;
}

impl<T> ErrorContext<T> for std::result::Result<T, std::io::Error> {
    fn with_path(self, path: impl Into<PathBuf>) -> AppResult<T> {
        self.map_err(|e| AppError::io(path, e))
    }
}
