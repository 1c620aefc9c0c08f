use crate::config::config::{ApiConfig, LoggingConfig, Profile};
use crate::error::Result;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 选择部署环境的环境变量
pub const PROFILE_ENV: &str = "LENS_PROFILE";
/// 配置覆盖的环境变量前缀
pub const ENV_PREFIX: &str = "LENS_";
/// 日志配置的环境变量前缀
pub const LOG_ENV_PREFIX: &str = "LENS_LOG_";

/// 配置加载器
///
/// 合并顺序（后者覆盖前者）：
/// 1. 所选环境的内置默认值
/// 2. `lens.toml` 中的 `[default]` 与 `[<profile>]` 表
/// 3. `LENS_*` 环境变量，嵌套字段用 `__` 分隔，例如 `LENS_UPLOAD__MAX_SIZE`
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置，环境由 `LENS_PROFILE` 决定
    pub fn load() -> Result<ApiConfig> {
        Self::load_from(default_config_path())
    }

    /// 从指定路径加载配置，环境由 `LENS_PROFILE` 决定
    pub fn load_from(path: impl AsRef<Path>) -> Result<ApiConfig> {
        let profile = Self::active_profile()?;
        Self::load_profile(profile, path)
    }

    /// 加载指定环境的配置并校验
    pub fn load_profile(profile: Profile, path: impl AsRef<Path>) -> Result<ApiConfig> {
        let path = path.as_ref();
        debug!(profile = %profile, path = %path.display(), "Loading API configuration");

        let mut config: ApiConfig = Self::figment(profile, path).extract()?;
        config.profile = profile;

        Self::validate(&config)?;
        info!(
            profile = %config.profile,
            base_url = %config.base_url,
            timeout_ms = config.timeout,
            "API configuration loaded"
        );

        Ok(config)
    }

    /// 加载日志配置
    pub fn load_logging_config() -> Result<LoggingConfig> {
        let config = Figment::from(Serialized::defaults(LoggingConfig::default()))
            .merge(Env::prefixed(LOG_ENV_PREFIX))
            .extract()?;

        Ok(config)
    }

    /// 读取 `LENS_PROFILE`，未设置时为生产环境
    pub fn active_profile() -> Result<Profile> {
        match std::env::var(PROFILE_ENV) {
            Ok(value) if !value.trim().is_empty() => Ok(value.parse()?),
            _ => Ok(Profile::default()),
        }
    }

    /// 验证配置
    pub fn validate(config: &ApiConfig) -> std::result::Result<(), ConfigValidationError> {
        config.validate()
    }

    fn figment(profile: Profile, path: &Path) -> Figment {
        Figment::from(Serialized::defaults(ApiConfig::for_profile(profile)))
            .merge(Toml::file(path).nested())
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .ignore(&["PROFILE", "LOG_LEVEL", "LOG_STRUCTURED"])
                    .split("__")
                    .global(),
            )
            .select(profile.as_str())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("基础地址无效 '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("不支持的协议 '{0}'，仅支持 http 和 https")]
    UnsupportedScheme(String),

    #[error("生产环境基础地址仍是占位符: {0}")]
    PlaceholderBaseUrl(String),

    #[error("生产环境必须使用 https 且不能指向本机: {0}")]
    InsecureProductionUrl(String),

    #[error("端点 '{name}' 路径无效: '{path}'，必须以 / 开头")]
    InvalidEndpoint { name: String, path: String },

    #[error("端点路径重复: {0}")]
    DuplicateEndpoint(String),

    #[error("请求超时无效，必须大于 0")]
    InvalidTimeout,

    #[error("上传大小上限无效，必须大于 0")]
    InvalidMaxSize,

    #[error("允许的上传类型为空")]
    EmptyAcceptedTypes,

    #[error("不是有效的图片 MIME 类型: {0}")]
    InvalidMimeType(String),

    #[error("上传类型重复: {0}")]
    DuplicateMimeType(String),

    #[error("未知的部署环境 '{0}'，可选值: local, production")]
    UnknownProfile(String),
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("lens.toml")
}
