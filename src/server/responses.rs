//! HTTP 响应构建
//!
//! 统一的 JSON 错误格式：`{"error": "<CODE>", "message": "..."}`

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde_json::{json, Value};

use crate::core::error::AppError;

pub type ApiResponse = Response<Full<Bytes>>;

/// 处理函数的输出，在 blocking 线程中产生，再转换为 HTTP 响应
#[derive(Debug, Clone, PartialEq)]
pub enum ApiReply {
    Json(StatusCode, Value),
    Text(StatusCode, String),
}

impl ApiReply {
    pub fn ok(value: Value) -> Self {
        ApiReply::Json(StatusCode::OK, value)
    }

    pub fn error(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        ApiReply::Json(
            status,
            json!({
                "error": code,
                "message": message.into(),
            }),
        )
    }

    pub fn not_found(path: &str) -> Self {
        Self::error(StatusCode::NOT_FOUND, "NOT_FOUND", format!("未知接口: {path}"))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::error(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiReply::Json(status, _) | ApiReply::Text(status, _) => *status,
        }
    }

    pub fn into_response(self) -> ApiResponse {
        let (status, content_type, body) = match self {
            ApiReply::Json(status, value) => (
                status,
                "application/json",
                Bytes::from(value.to_string()),
            ),
            ApiReply::Text(status, text) => (status, "text/plain; charset=utf-8", Bytes::from(text)),
        };

        let mut response = Response::new(Full::new(body));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        response
    }
}

impl From<AppError> for ApiReply {
    fn from(err: AppError) -> Self {
        let status = match err {
            AppError::UnknownEnvironmentType(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiReply::error(status, err.code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_reply_shape() {
        let reply = ApiReply::not_found("/nope");
        assert_eq!(reply.status(), StatusCode::NOT_FOUND);
        match reply {
            ApiReply::Json(_, value) => {
                assert_eq!(value["error"], json!("NOT_FOUND"));
                assert!(value["message"].as_str().unwrap().contains("/nope"));
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn test_app_error_mapping() {
        let reply: ApiReply = AppError::UnknownEnvironmentType("julia".into()).into();
        assert_eq!(reply.status(), StatusCode::BAD_REQUEST);

        let reply: ApiReply = AppError::MalformedPackage("x".into()).into();
        assert_eq!(reply.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_into_response_sets_content_type() {
        let response = ApiReply::Text(StatusCode::OK, "numpy=1.26.4=py311_0".into()).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );

        let response = ApiReply::ok(json!({"packages": []})).into_response();
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    }
}
