// HTTP API 服务
//
// ApiServer 把 EnvManager 暴露为本地 JSON 接口，负责：
// - HTTP 服务器的启动和停止
// - 路由解析与请求体读取
// - 把同步的 conda 调用放到 blocking 线程池执行

pub mod responses;
pub mod router;

use anyhow::{Context, Result};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

use crate::models::ServerConfig;
use crate::services::EnvManager;
use crate::utils::command::{CommandRunner, SystemRunner};

pub use responses::{ApiReply, ApiResponse};
pub use router::{dispatch, ApiRoute, PackageAction};

/// HTTP API 服务实例
pub struct ApiServer<R = SystemRunner> {
    config: ServerConfig,
    manager: Arc<EnvManager<R>>,
    server_handle: Arc<RwLock<Option<tokio::task::JoinHandle<()>>>>,
}

impl<R: CommandRunner + 'static> ApiServer<R> {
    pub fn new(config: ServerConfig, manager: EnvManager<R>) -> Self {
        Self {
            config,
            manager: Arc::new(manager),
            server_handle: Arc::new(RwLock::new(None)),
        }
    }

    /// 启动服务，返回实际监听的地址（端口为 0 时由系统分配）
    pub async fn start(&self) -> Result<SocketAddr> {
        {
            let handle = self.server_handle.read().await;
            if handle.is_some() {
                anyhow::bail!("服务已在运行");
            }
        }

        let addr = if self.config.allow_public {
            SocketAddr::from(([0, 0, 0, 0], self.config.port))
        } else {
            SocketAddr::from(([127, 0, 0, 1], self.config.port))
        };

        let listener = TcpListener::bind(addr)
            .await
            .context(format!("绑定端口 {} 失败", self.config.port))?;
        let local_addr = listener.local_addr().context("读取监听地址失败")?;

        tracing::info!(
            addr = %local_addr,
            public = self.config.allow_public,
            conda = %self.manager.config().conda_exe,
            "API 服务启动"
        );

        let manager = Arc::clone(&self.manager);
        let handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        let manager = Arc::clone(&manager);

                        tokio::spawn(async move {
                            let io = TokioIo::new(stream);
                            let service = service_fn(move |req| {
                                let manager = Arc::clone(&manager);
                                async move { handle_request(req, manager).await }
                            });

                            if let Err(err) =
                                http1::Builder::new().serve_connection(io, service).await
                            {
                                tracing::warn!(peer = %peer, error = ?err, "处理连接失败");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "接受连接失败");
                    }
                }
            }
        });

        {
            let mut h = self.server_handle.write().await;
            *h = Some(handle);
        }

        Ok(local_addr)
    }

    /// 停止服务
    pub async fn stop(&self) {
        let handle = {
            let mut h = self.server_handle.write().await;
            h.take()
        };

        if let Some(handle) = handle {
            handle.abort();
            tracing::info!("API 服务已停止");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.server_handle.read().await.is_some()
    }
}

/// 处理单个请求
async fn handle_request<R: CommandRunner + 'static>(
    req: Request<Incoming>,
    manager: Arc<EnvManager<R>>,
) -> Result<ApiResponse, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let Some(route) = ApiRoute::parse(&method, &path, req.uri().query()) else {
        tracing::debug!(method = %method, path = %path, "未知接口");
        return Ok(ApiReply::not_found(&path).into_response());
    };

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return Ok(ApiReply::bad_request(format!("读取请求体失败: {e}")).into_response());
        }
    };

    tracing::debug!(method = %method, path = %path, route = ?route, "收到请求");

    let reply = if route.runs_command() {
        // conda 调用会阻塞到进程退出
        tokio::task::spawn_blocking(move || router::dispatch(&manager, route, &body))
            .await
            .unwrap_or_else(|e| ApiReply::internal_error(format!("处理任务异常退出: {e}")))
    } else {
        router::dispatch(&manager, route, &body)
    };

    tracing::info!(method = %method, path = %path, status = reply.status().as_u16(), "请求完成");
    Ok(reply.into_response())
}
