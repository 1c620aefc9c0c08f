//! 配置管理模块
//!
//! 提供 API 客户端配置的加载和管理功能，按部署环境选择默认值，支持 TOML 配置文件和环境变量覆盖。

pub mod config;
pub mod loader;

pub use config::{ApiConfig, Endpoint, EndpointsConfig, LoggingConfig, Profile, UploadConfig};
pub use loader::{ConfigLoader, ConfigValidationError};
