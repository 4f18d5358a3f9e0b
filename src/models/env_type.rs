use crate::core::error::AppError;
use std::str::FromStr;

/// 可一键创建的环境类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentType {
    Python2,
    Python3,
    R,
}

impl EnvironmentType {
    /// 所有预置类型
    pub fn all() -> [EnvironmentType; 3] {
        [
            EnvironmentType::Python2,
            EnvironmentType::Python3,
            EnvironmentType::R,
        ]
    }

    pub fn key(&self) -> &'static str {
        match self {
            EnvironmentType::Python2 => "python2",
            EnvironmentType::Python3 => "python3",
            EnvironmentType::R => "r",
        }
    }

    /// 创建该类型环境时传给 conda 的包列表
    pub fn packages(&self) -> &'static [&'static str] {
        match self {
            EnvironmentType::Python2 => &["python=2", "ipykernel"],
            EnvironmentType::Python3 => &["python=3", "ipykernel"],
            EnvironmentType::R => &["r-base", "r-essentials"],
        }
    }
}

impl FromStr for EnvironmentType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|env_type| env_type.key() == s)
            .ok_or_else(|| AppError::UnknownEnvironmentType(s.to_string()))
    }
}
