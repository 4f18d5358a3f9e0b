use crate::core::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 包描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    pub build: String,
}

impl PackageInfo {
    /// 从 conda 输出的单条包记录解析
    ///
    /// 新版 conda 输出对象记录（`name` / `version` / `build_string` 或 `build`），
    /// 旧版输出 `name-version-build` 形式的字符串。
    pub fn from_record(record: &Value) -> AppResult<Self> {
        match record {
            Value::String(dist_name) => Self::from_dist_name(dist_name),
            Value::Object(fields) => {
                let field = |key: &str| fields.get(key).and_then(Value::as_str);

                let name = field("name")
                    .ok_or_else(|| AppError::MalformedPackage(format!("缺少 name 字段: {record}")))?;
                let version = field("version").ok_or_else(|| {
                    AppError::MalformedPackage(format!("缺少 version 字段: {record}"))
                })?;
                let build = field("build_string")
                    .filter(|build| !build.is_empty())
                    .or_else(|| field("build"))
                    .ok_or_else(|| {
                        AppError::MalformedPackage(format!("缺少 build 字段: {record}"))
                    })?;

                Ok(Self {
                    name: name.to_string(),
                    version: version.to_string(),
                    build: build.to_string(),
                })
            }
            other => Err(AppError::MalformedPackage(format!(
                "不支持的包记录类型: {other}"
            ))),
        }
    }

    /// 解析旧版 `name-version-build` 字符串
    ///
    /// 从右侧按最后两个 `-` 切分，包名本身可以包含 `-`。
    pub fn from_dist_name(dist_name: &str) -> AppResult<Self> {
        let mut parts = dist_name.rsplitn(3, '-');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(build), Some(version), Some(name)) => Ok(Self {
                name: name.to_string(),
                version: version.to_string(),
                build: build.to_string(),
            }),
            _ => Err(AppError::MalformedPackage(format!(
                "无法按 name-version-build 切分: {dist_name}"
            ))),
        }
    }
}

/// 包列表响应：`{"packages": [...]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageList {
    pub packages: Vec<PackageInfo>,
}

/// 可更新包列表响应：`{"updates": [...]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateList {
    pub updates: Vec<PackageInfo>,
}
