// conda JSON 结果的分类与统一响应形状

use serde::Serialize;
use serde_json::{json, Map, Value};

/// 解析彻底失败时返回的哨兵值：`{"error": true}`
pub fn error_sentinel() -> Value {
    json!({ "error": true })
}

/// 对一次 conda 调用结果的分类
///
/// 在一处根据 `error` / `actions` 等键完成判定，之后各处理函数只按变体匹配。
#[derive(Debug, Clone, PartialEq)]
pub enum CondaResponse {
    /// 工具返回的数据（列表、info 对象等）
    Success(Value),
    /// 含有操作计划（`actions`），携带其中的 `LINK` 列表
    ActionPlan(Vec<Value>),
    /// 只有状态、没有操作计划（例如已是最新版本）
    NoAction,
    /// 工具自身的错误对象或解析失败哨兵，原样透传
    Error(Value),
}

impl CondaResponse {
    pub fn classify(value: Value) -> Self {
        let Some(object) = value.as_object() else {
            return CondaResponse::Success(value);
        };

        if object.contains_key("error") {
            return CondaResponse::Error(value);
        }

        if let Some(actions) = object.get("actions") {
            return CondaResponse::ActionPlan(link_entries(actions));
        }

        if is_status_only(object) {
            return CondaResponse::NoAction;
        }

        CondaResponse::Success(value)
    }
}

// `actions` 可能是 `{"LINK": [...]}`，旧版本中也可能是这种对象的列表
fn link_entries(actions: &Value) -> Vec<Value> {
    match actions {
        Value::Object(plan) => plan
            .get("LINK")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        Value::Array(plans) => plans.iter().flat_map(link_entries).collect(),
        _ => Vec::new(),
    }
}

fn is_status_only(object: &Map<String, Value>) -> bool {
    object.contains_key("success")
        && object
            .keys()
            .all(|key| matches!(key.as_str(), "success" | "message" | "dry_run" | "prefix"))
}

/// 统一响应：规范化后的数据，或原样透传的错误对象
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply<T> {
    Data(T),
    Failed(Value),
}

#[cfg(test)]
impl<T> Reply<T> {
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Failed(_))
    }

    pub fn data(self) -> Option<T> {
        match self {
            Reply::Data(data) => Some(data),
            Reply::Failed(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_error() {
        assert_eq!(
            CondaResponse::classify(error_sentinel()),
            CondaResponse::Error(json!({"error": true}))
        );

        let tool_error = json!({"error": "PackagesNotFoundError: ...", "exception_name": "PackagesNotFoundError"});
        assert_eq!(
            CondaResponse::classify(tool_error.clone()),
            CondaResponse::Error(tool_error)
        );
    }

    #[test]
    fn test_classify_action_plan() {
        let plan = json!({
            "actions": {
                "LINK": [{"dist_name": "numpy-1.26.4-py311_0"}],
                "UNLINK": [{"dist_name": "numpy-1.26.0-py311_0"}]
            },
            "dry_run": true
        });
        assert_eq!(
            CondaResponse::classify(plan),
            CondaResponse::ActionPlan(vec![json!({"dist_name": "numpy-1.26.4-py311_0"})])
        );

        let legacy_plan = json!({
            "actions": [
                {"LINK": ["a-1.0-0"]},
                {"UNLINK": ["a-0.9-0"]},
                {"LINK": ["b-2.0-1"]}
            ]
        });
        assert_eq!(
            CondaResponse::classify(legacy_plan),
            CondaResponse::ActionPlan(vec![json!("a-1.0-0"), json!("b-2.0-1")])
        );
    }

    #[test]
    fn test_classify_no_action() {
        let up_to_date = json!({
            "message": "All requested packages already installed.",
            "success": true
        });
        assert_eq!(CondaResponse::classify(up_to_date), CondaResponse::NoAction);
    }

    #[test]
    fn test_classify_success() {
        let list = json!([{"name": "x"}]);
        assert_eq!(
            CondaResponse::classify(list.clone()),
            CondaResponse::Success(list)
        );

        let info = json!({"root_prefix": "/opt/conda", "envs": []});
        assert_eq!(
            CondaResponse::classify(info.clone()),
            CondaResponse::Success(info)
        );
    }

    #[test]
    fn test_reply_serializes_untagged() {
        let ok: Reply<Vec<u8>> = Reply::Data(vec![1, 2]);
        assert_eq!(serde_json::to_value(&ok).unwrap(), json!([1, 2]));

        let failed: Reply<Vec<u8>> = Reply::Failed(error_sentinel());
        assert!(failed.is_error());
        assert_eq!(serde_json::to_value(&failed).unwrap(), json!({"error": true}));
    }
}
