// 路由解析与请求分发
//
// 路由：
// - GET  /environments                               列出环境
// - GET  /environments/{env}                         列出环境中的包
// - GET  /environments/{env}/export                  导出环境（纯文本）
// - POST /environments/{env}/create|clone|delete     环境操作
// - POST /environments/{env}/packages/{action}       包操作（check/install/update/remove）
// - GET  /packages/search?q=...                      搜索包
// - GET  /health                                     健康检查
// - PUT  /logging/level                              热更新日志级别

use hyper::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::responses::ApiReply;
use crate::core::error::AppResult;
use crate::core::logger::update_log_level;
use crate::models::{LogLevel, Reply};
use crate::services::EnvManager;
use crate::utils::command::CommandRunner;

/// 包操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageAction {
    Check,
    Install,
    Update,
    Remove,
}

impl PackageAction {
    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "check" => Some(PackageAction::Check),
            "install" => Some(PackageAction::Install),
            "update" => Some(PackageAction::Update),
            "remove" => Some(PackageAction::Remove),
            _ => None,
        }
    }
}

/// 解析后的接口
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRoute {
    Health,
    ListEnvironments,
    EnvPackages { env: String },
    ExportEnv { env: String },
    CreateEnv { env: String },
    CloneEnv { env: String },
    DeleteEnv { env: String },
    Packages { env: String, action: PackageAction },
    SearchPackages { query: Option<String> },
    SetLogLevel,
}

impl ApiRoute {
    /// 根据方法、路径和查询串匹配接口，未匹配时返回 None
    pub fn parse(method: &Method, path: &str, query: Option<&str>) -> Option<Self> {
        let segments = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::decode(segment).map(|s| s.into_owned()))
            .collect::<Result<Vec<_>, _>>()
            .ok()?;
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        let route = match (method, segments.as_slice()) {
            (&Method::GET, ["health"]) => ApiRoute::Health,
            (&Method::GET, ["environments"]) => ApiRoute::ListEnvironments,
            (&Method::GET, ["environments", env]) => ApiRoute::EnvPackages {
                env: env.to_string(),
            },
            (&Method::GET, ["environments", env, "export"]) => ApiRoute::ExportEnv {
                env: env.to_string(),
            },
            (&Method::POST, ["environments", env, "create"]) => ApiRoute::CreateEnv {
                env: env.to_string(),
            },
            (&Method::POST, ["environments", env, "clone"]) => ApiRoute::CloneEnv {
                env: env.to_string(),
            },
            (&Method::POST, ["environments", env, "delete"]) => ApiRoute::DeleteEnv {
                env: env.to_string(),
            },
            (&Method::POST, ["environments", env, "packages", action]) => ApiRoute::Packages {
                env: env.to_string(),
                action: PackageAction::from_segment(action)?,
            },
            (&Method::GET, ["packages", "search"]) => ApiRoute::SearchPackages {
                query: query.and_then(|q| {
                    url::form_urlencoded::parse(q.as_bytes())
                        .find(|(key, _)| key == "q")
                        .map(|(_, value)| value.into_owned())
                }),
            },
            (&Method::PUT, ["logging", "level"]) => ApiRoute::SetLogLevel,
            _ => return None,
        };

        Some(route)
    }

    /// 是否需要执行外部命令（需要放到 blocking 线程）
    pub fn runs_command(&self) -> bool {
        !matches!(self, ApiRoute::Health | ApiRoute::SetLogLevel)
    }
}

#[derive(Debug, Deserialize)]
struct CreateEnvRequest {
    #[serde(rename = "type")]
    env_type: Option<String>,
    #[serde(default)]
    packages: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CloneEnvRequest {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct PackagesRequest {
    #[serde(default)]
    packages: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LogLevelRequest {
    level: String,
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ApiReply> {
    serde_json::from_slice(body).map_err(|e| ApiReply::bad_request(format!("请求体无效: {e}")))
}

// 空请求体视为 `{}`
fn parse_optional_body<T>(body: &[u8]) -> Result<T, ApiReply>
where
    T: serde::de::DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        Ok(T::default())
    } else {
        parse_body(body)
    }
}

fn reply_json<T: serde::Serialize>(result: AppResult<T>) -> ApiReply {
    match result.and_then(|value| Ok(serde_json::to_value(value)?)) {
        Ok(value) => ApiReply::ok(value),
        Err(err) => {
            tracing::error!(error = %err, code = err.code(), "处理请求失败");
            err.into()
        }
    }
}

fn reply_normalized<T: serde::Serialize>(result: AppResult<Reply<T>>) -> ApiReply {
    if let Ok(Reply::Failed(error)) = &result {
        tracing::warn!(error = %error, "conda 返回错误");
    }
    reply_json(result)
}

/// 分发请求到 `EnvManager`（同步执行，会阻塞当前线程直到 conda 退出）
pub fn dispatch<R: CommandRunner>(manager: &EnvManager<R>, route: ApiRoute, body: &[u8]) -> ApiReply {
    match handle(manager, route, body) {
        Ok(reply) | Err(reply) => reply,
    }
}

fn handle<R: CommandRunner>(
    manager: &EnvManager<R>,
    route: ApiRoute,
    body: &[u8],
) -> Result<ApiReply, ApiReply> {
    let reply = match route {
        ApiRoute::Health => ApiReply::ok(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        })),
        ApiRoute::ListEnvironments => reply_normalized(manager.list_envs()),
        ApiRoute::EnvPackages { env } => reply_normalized(manager.env_packages(&env)),
        ApiRoute::ExportEnv { env } => match manager.export_env(&env) {
            Ok(text) => ApiReply::Text(StatusCode::OK, text),
            Err(err) => err.into(),
        },
        ApiRoute::CreateEnv { env } => {
            let request: CreateEnvRequest = parse_body(body)?;
            match request.env_type {
                Some(env_type) => reply_json(manager.create_env_by_type(&env, &env_type)),
                None if !request.packages.is_empty() => {
                    reply_json(manager.create_env(&env, &request.packages))
                }
                None => return Err(ApiReply::bad_request("需要提供 type 或 packages")),
            }
        }
        ApiRoute::CloneEnv { env } => {
            let request: CloneEnvRequest = parse_body(body)?;
            reply_json(manager.clone_env(&env, &request.name))
        }
        ApiRoute::DeleteEnv { env } => reply_json(manager.delete_env(&env)),
        ApiRoute::Packages { env, action } => {
            let PackagesRequest { packages } = parse_optional_body(body)?;
            if packages.is_empty() && action != PackageAction::Check {
                return Err(ApiReply::bad_request("packages 不能为空"));
            }
            match action {
                PackageAction::Check => reply_normalized(manager.check_update(&env, &packages)),
                PackageAction::Install => reply_json(manager.install_packages(&env, &packages)),
                PackageAction::Update => reply_json(manager.update_packages(&env, &packages)),
                PackageAction::Remove => reply_json(manager.remove_packages(&env, &packages)),
            }
        }
        ApiRoute::SearchPackages { query } => match query {
            Some(query) if !query.trim().is_empty() => {
                reply_normalized(manager.package_search(&query))
            }
            _ => return Err(ApiReply::bad_request("缺少查询参数 q")),
        },
        ApiRoute::SetLogLevel => {
            let request: LogLevelRequest = parse_body(body)?;
            let level: LogLevel = request.level.parse().map_err(ApiReply::bad_request)?;
            match update_log_level(level) {
                Ok(()) => ApiReply::ok(json!({ "level": level.as_str() })),
                Err(e) => ApiReply::internal_error(e.to_string()),
            }
        }
    };

    Ok(reply)
}
