use once_cell::sync::Lazy;
use pep440_rs::Version;
use regex::Regex;
use std::cmp::Ordering;
use std::str::FromStr;

/// 包版本号（用于比较版本先后）
///
/// 符合 PEP 440 的版本交给 `pep440_rs` 比较：
/// `1.0 == 1.0.0`，`1.0.dev1 < 1.0a1 < 1.0rc1 < 1.0 < 1.0.post1`。
/// 解析不了的版本（如 `1.1.1k`）按字母/数字片段比较，且总是排在所有规范版本之前。
#[derive(Debug, Clone)]
pub enum PackageVersion {
    Legacy(Vec<Segment>),
    Canonical(Version),
}

/// 版本片段：数字片段大于字母片段
///
/// 数字片段按去掉前导零后的位数、再按字面比较，任意长度都不会溢出。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Segment {
    Alpha(String),
    Num { digits: usize, value: String },
}

static SEGMENT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+|[a-z]+").expect("invalid segment regex"));

impl PackageVersion {
    /// 解析版本号，解析不了规范格式时退化为片段比较
    pub fn parse(version: &str) -> Self {
        let normalized = version.trim().to_lowercase();
        match Version::from_str(&normalized) {
            Ok(canonical) => PackageVersion::Canonical(canonical),
            Err(_) => PackageVersion::Legacy(split_segments(&normalized)),
        }
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (PackageVersion::Canonical(a), PackageVersion::Canonical(b)) => a.cmp(b),
            (PackageVersion::Legacy(a), PackageVersion::Legacy(b)) => a.cmp(b),
            (PackageVersion::Legacy(_), PackageVersion::Canonical(_)) => Ordering::Less,
            (PackageVersion::Canonical(_), PackageVersion::Legacy(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// 相等性与排序保持一致：1.0 == 1.0.0
impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PackageVersion {}

fn split_segments(s: &str) -> Vec<Segment> {
    SEGMENT_REGEX
        .find_iter(s)
        .map(|m| {
            let part = m.as_str();
            if part.as_bytes()[0].is_ascii_digit() {
                let trimmed = part.trim_start_matches('0');
                let value = if trimmed.is_empty() { "0" } else { trimmed };
                Segment::Num {
                    digits: value.len(),
                    value: value.to_string(),
                }
            } else {
                Segment::Alpha(part.to_string())
            }
        })
        .collect()
}
