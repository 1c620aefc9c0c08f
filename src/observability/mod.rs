//! 可观测性模块
//!
//! 提供结构化日志初始化。

use crate::config::LoggingConfig;
use tracing_subscriber::{
    EnvFilter, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// 根据配置构建日志过滤器，`RUST_LOG` 优先
pub fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    match config.level.trim().parse::<LevelFilter>() {
        Ok(level) => EnvFilter::default()
            .add_directive(level.into())
            .add_directive(format!("lens={level}").parse().unwrap_or(level.into())),
        Err(_) => EnvFilter::default().add_directive(LevelFilter::INFO.into()),
    }
}

/// 初始化结构化日志
///
/// 日志写到 stderr，stdout 留给命令输出。
pub fn init_tracing(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = build_env_filter(config);

    if config.structured {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_falls_back_on_bad_level() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig {
            level: "not a level!!".into(),
            structured: false,
        };
        let filter = build_env_filter(&config);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_filter_uses_configured_level() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig {
            level: "debug".into(),
            structured: true,
        };
        let filter = build_env_filter(&config);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }
}
