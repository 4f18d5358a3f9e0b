//! conda JSON 输出的容错解码
//!
//! 即使传了 `--json`，部分 conda 版本仍会把进度条、警告等文本混进标准输出。
//! 先整体严格解析；失败后只保留"看起来像 JSON"的行再解析一次；
//! 仍然失败则返回 `{"error": true}`，调用方必须先检查这个哨兵值。

use crate::models::response::error_sentinel;
use crate::utils::command::CommandOutput;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

// 行首（忽略前导空白）是 " { [ ] 或数字，或行尾（忽略尾随空白）是 " } ] , 或数字
static JSONISH_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*["{\[\]\d]|["}\],\d]\s*$"#).expect("invalid json line regex")
});

/// 判断一行是否像 JSON 片段
pub fn is_jsonish(line: &str) -> bool {
    JSONISH_LINE.is_match(line)
}

/// 解码命令输出
pub fn clean_json(output: &CommandOutput) -> Value {
    clean_json_lines(&output.lines())
}

/// 解码若干行文本，两次解析都失败时返回 `{"error": true}`
pub fn clean_json_lines(lines: &[&str]) -> Value {
    match serde_json::from_str::<Value>(&lines.join("\n")) {
        Ok(value) => return value,
        Err(err) => tracing::warn!(error = %err, "JSON 解析失败，尝试过滤非 JSON 行"),
    }

    let filtered: Vec<&str> = lines.iter().copied().filter(|line| is_jsonish(line)).collect();

    match serde_json::from_str::<Value>(&filtered.join("\n")) {
        Ok(value) => value,
        Err(err) => {
            tracing::error!(error = %err, "过滤后 JSON 仍然解析失败");
            error_sentinel()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_output_decodes_directly() {
        let output = CommandOutput::Lines(vec![
            "{".into(),
            "  \"success\": true".into(),
            "}".into(),
        ]);
        assert_eq!(clean_json(&output), json!({"success": true}));
    }

    #[test]
    fn test_noise_lines_are_dropped() {
        let payload = [
            "{",
            "  \"actions\": {",
            "    \"LINK\": [",
            "      \"numpy-1.26.4-py311_0\"",
            "    ]",
            "  },",
            "  \"success\": true",
            "}",
        ];
        let mut noisy = vec!["Collecting package metadata (current_repodata.json): done"];
        noisy.extend_from_slice(&payload[..3]);
        noisy.push("Solving environment: ...working... done");
        noisy.extend_from_slice(&payload[3..]);
        noisy.push("==> WARNING: A newer version of conda exists. <==");

        let expected = clean_json_lines(&payload);
        assert_eq!(clean_json_lines(&noisy), expected);
        assert_eq!(expected["actions"]["LINK"][0], json!("numpy-1.26.4-py311_0"));
    }

    #[test]
    fn test_undecodable_output_yields_sentinel() {
        let output = CommandOutput::Failure("EnvironmentNotWritableError".to_string());
        assert_eq!(clean_json(&output), json!({"error": true}));

        let broken = CommandOutput::Lines(vec!["{".into(), "\"name\": ".into()]);
        assert_eq!(clean_json(&broken), json!({"error": true}));
    }

    #[test]
    fn test_empty_output_yields_sentinel() {
        assert_eq!(clean_json(&CommandOutput::Lines(vec![])), json!({"error": true}));
    }

    #[test]
    fn test_stderr_json_is_decoded() {
        let output = CommandOutput::Failure(
            "{\n  \"error\": \"PackagesNotFoundError\",\n  \"exception_name\": \"PackagesNotFoundError\"\n}\n"
                .to_string(),
        );
        assert_eq!(
            clean_json(&output)["exception_name"],
            json!("PackagesNotFoundError")
        );
    }

    #[test]
    fn test_jsonish_heuristic() {
        assert!(is_jsonish("  {"));
        assert!(is_jsonish("]"));
        assert!(is_jsonish("  \"name\": \"numpy\","));
        assert!(is_jsonish("12"));
        assert!(is_jsonish("  },"));
        assert!(is_jsonish("}"));
        assert!(!is_jsonish("Solving environment: done"));
        assert!(!is_jsonish("  }x"));
        assert!(!is_jsonish(""));
    }
}
