use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogConfig;
use crate::errors::CacheError;

/// 初始化全局日志
///
/// `RUST_LOG` 优先于配置中的级别。配置了 `file` 时日志写入文件
/// （`enable_rotation` 为真则按天滚动），返回的 guard 必须持有到进程结束。
///
/// 全局 subscriber 已存在时返回 `CacheError::Internal`。
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>, CacheError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (writer, guard) = match &config.file {
        Some(file) => {
            let appender = file_appender(file, config.enable_rotation);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match (config.format.as_str(), writer) {
        ("json", Some(writer)) => registry
            .with(fmt::layer().json().with_writer(writer).with_ansi(false))
            .try_init(),
        ("json", None) => registry.with(fmt::layer().json()).try_init(),
        (_, Some(writer)) => registry
            .with(fmt::layer().with_writer(writer).with_ansi(false))
            .try_init(),
        // pretty format (default)
        (_, None) => registry.with(fmt::layer().pretty()).try_init(),
    };

    result.map_err(|e| CacheError::Internal(format!("Failed to initialize logging: {}", e)))?;

    tracing::info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

fn file_appender(
    file: &str,
    enable_rotation: bool,
) -> tracing_appender::rolling::RollingFileAppender {
    let path = Path::new(file);
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "keycache.log".to_string());

    if enable_rotation {
        tracing_appender::rolling::daily(directory, file_name)
    } else {
        tracing_appender::rolling::never(directory, file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_reported() {
        let config = LogConfig::default();
        // 其他测试可能已经安装了 subscriber，第一次调用结果不确定
        let _ = init_logging(&config);
        let second = init_logging(&config);
        assert!(matches!(second, Err(CacheError::Internal(_))));
    }
}
