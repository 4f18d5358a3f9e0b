use anyhow::Context;
use conda_manager::utils::config::read_app_config;
use conda_manager::{init_logger, ApiServer, EnvManager, ManagerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_config = read_app_config().context("读取配置失败")?;
    init_logger(&app_config.log)?;

    let manager = EnvManager::new(ManagerConfig::from_env());
    let server = ApiServer::new(app_config.server.clone(), manager);
    let addr = server.start().await?;

    println!("conda-manager 已启动: http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("监听退出信号失败")?;

    tracing::info!("收到退出信号，正在停止服务");
    server.stop().await;
    Ok(())
}
