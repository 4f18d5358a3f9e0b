use crate::models::config::{LogConfig, LogFormat, LogLevel, LogOutput};
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt,
    layer::{Layered, SubscriberExt},
    registry::LookupSpan,
    reload,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;
type FilteredRegistry = Layered<reload::Layer<EnvFilter, Registry>, Registry>;

/// 全局日志级别 reload handle
static LOG_LEVEL_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// 初始化日志系统
///
/// 根据配置选择输出格式（文本/JSON）和输出目标（控制台/文件/两者），
/// 文件按天滚动写入。日志级别之后可以通过 `update_log_level` 热更新，
/// 格式、输出目标和文件路径的变更需要重启服务。
pub fn init_logger(config: &LogConfig) -> anyhow::Result<()> {
    let (filter_layer, reload_handle) = reload::Layer::new(create_env_filter(config.level));

    if LOG_LEVEL_HANDLE.set(reload_handle).is_err() {
        anyhow::bail!("日志系统已初始化，不能重复初始化");
    }

    let mut layers: Vec<BoxedLayer<FilteredRegistry>> = Vec::new();
    if matches!(config.output, LogOutput::Console | LogOutput::Both) {
        layers.push(console_layer(config.format));
    }
    if matches!(config.output, LogOutput::File | LogOutput::Both) {
        layers.push(file_layer(config.format, config.file_path.as_deref())?);
    }

    Registry::default().with(filter_layer).with(layers).init();

    tracing::info!(
        level = config.level.as_str(),
        format = ?config.format,
        output = ?config.output,
        file_path = ?config.file_path,
        "日志系统初始化完成"
    );

    Ok(())
}

/// 动态更新日志级别（热重载）
pub fn update_log_level(new_level: LogLevel) -> anyhow::Result<()> {
    let handle = LOG_LEVEL_HANDLE
        .get()
        .ok_or_else(|| anyhow::anyhow!("日志系统未初始化"))?;

    handle
        .reload(create_env_filter(new_level))
        .map_err(|e| anyhow::anyhow!("重载日志级别失败: {e}"))?;

    tracing::info!(new_level = new_level.as_str(), "日志级别已动态更新");
    Ok(())
}

/// 默认过滤规则：本服务使用配置的级别，第三方库只输出 WARN 以上
pub fn default_filter_directives(level: LogLevel) -> String {
    format!(
        "conda_manager={},hyper=warn,hyper_util=warn,tokio=warn",
        level.as_str()
    )
}

// RUST_LOG 优先（例如 RUST_LOG=conda_manager=trace），否则使用默认规则
fn create_env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter_directives(level)))
}

fn console_layer<S>(format: LogFormat) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(cfg!(debug_assertions))
        .with_thread_ids(false);

    match format {
        LogFormat::Text => layer.with_ansi(true).boxed(),
        LogFormat::Json => layer.json().with_ansi(false).boxed(),
    }
}

fn file_layer<S>(format: LogFormat, file_path: Option<&str>) -> anyhow::Result<BoxedLayer<S>>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let file_appender = rolling::daily(log_dir(file_path)?, "conda-manager");
    let (writer, guard) = non_blocking(file_appender);

    // guard 被 drop 后后台写线程会退出，需要在进程生命周期内保留
    Box::leak(Box::new(guard));

    let layer = fmt::layer().with_writer(writer).with_ansi(false);

    Ok(match format {
        LogFormat::Text => layer.with_target(cfg!(debug_assertions)).boxed(),
        LogFormat::Json => layer.json().with_target(true).with_thread_ids(true).boxed(),
    })
}

fn log_dir(file_path: Option<&str>) -> anyhow::Result<PathBuf> {
    match file_path {
        Some(path) => {
            let dir = PathBuf::from(path);
            std::fs::create_dir_all(&dir)?;
            Ok(dir)
        }
        None => Ok(crate::utils::config::default_log_dir()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_filter_directives() {
        assert_eq!(
            default_filter_directives(LogLevel::Debug),
            "conda_manager=debug,hyper=warn,hyper_util=warn,tokio=warn"
        );
    }

    #[test]
    fn test_update_before_init_fails() {
        assert!(update_log_level(LogLevel::Trace).is_err());
    }

    #[test]
    fn test_explicit_log_dir_is_created() {
        let temp = TempDir::new().expect("create temp dir");
        let target = temp.path().join("nested").join("logs");

        let dir = log_dir(target.to_str()).unwrap();
        assert_eq!(dir, target);
        assert!(target.is_dir());
    }
}
