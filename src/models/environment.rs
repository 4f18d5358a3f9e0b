use serde::{Deserialize, Serialize};

/// 根环境在列表中使用的名称
pub const BASE_ENV_NAME: &str = "base";

/// 环境描述（每次调用根据 `conda info --json` 实时生成，不做持久化）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    pub name: String,
    pub dir: String,
    pub is_default: bool,
}

/// 环境列表响应：`{"environments": [...]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentList {
    pub environments: Vec<EnvironmentInfo>,
}

/// `conda info --json` 中用到的字段
#[derive(Debug, Clone, Deserialize)]
pub struct CondaInfo {
    pub root_prefix: String,
    pub default_prefix: String,
    #[serde(default)]
    pub envs: Vec<String>,
}

impl EnvironmentList {
    /// 根据 conda info 构建环境列表
    ///
    /// 根前缀作为合成的 `base` 环境排在最前，其余只保留位于根前缀之下的环境。
    pub fn from_info(info: &CondaInfo) -> Self {
        let base = EnvironmentInfo {
            name: BASE_ENV_NAME.to_string(),
            dir: info.root_prefix.clone(),
            is_default: info.root_prefix == info.default_prefix,
        };

        let nested = info
            .envs
            .iter()
            .filter(|env| **env != info.root_prefix && env.starts_with(&info.root_prefix))
            .map(|env| EnvironmentInfo {
                name: env_basename(env),
                dir: env.clone(),
                is_default: *env == info.default_prefix,
            });

        Self {
            environments: std::iter::once(base).chain(nested).collect(),
        }
    }
}

// 路径最后一段（兼容 `/` 与 `\` 分隔符）
fn env_basename(dir: &str) -> String {
    dir.rsplit(['/', '\\']).next().unwrap_or(dir).to_string()
}
