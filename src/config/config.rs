use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::config::loader::ConfigValidationError;

/// 已部署的后端地址 (Vercel)
pub const PRODUCTION_BASE_URL: &str = "https://cnn-image-recognition-helioo.vercel.app";
/// 本地开发后端地址
pub const LOCAL_BASE_URL: &str = "http://localhost:8080";

/// 默认请求超时（毫秒）
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// 默认上传大小上限：10 MiB
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 10 * 1024 * 1024;
/// 默认允许的图片 MIME 类型
pub const DEFAULT_ACCEPTED_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/bmp",
    "image/webp",
];

/// 生产环境中视为占位符的地址片段
const PLACEHOLDER_MARKERS: [&str; 4] = ["your-", "example.com", "changeme", "<"];

/// 部署环境
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// 本地开发
    Local,
    /// 生产部署
    #[default]
    Production,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Local => "local",
            Profile::Production => "production",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = ConfigValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "dev" | "development" => Ok(Profile::Local),
            "production" | "prod" => Ok(Profile::Production),
            other => Err(ConfigValidationError::UnknownProfile(other.to_string())),
        }
    }
}

/// API 端点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Predict,
    Health,
}

impl Endpoint {
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::Predict => "predict",
            Endpoint::Health => "health",
        }
    }
}

/// 端点路径配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// 图像识别
    pub predict: String,
    /// 健康检查
    pub health: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            predict: "/predict".into(),
            health: "/health".into(),
        }
    }
}

impl EndpointsConfig {
    pub fn path(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::Predict => &self.predict,
            Endpoint::Health => &self.health,
        }
    }
}

/// 上传限制配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// 文件大小上限（字节，含边界）
    pub max_size: u64,
    /// 允许的 MIME 类型
    pub accepted_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_UPLOAD_SIZE,
            accepted_types: DEFAULT_ACCEPTED_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            structured: false,
        }
    }
}

/// API 客户端配置
///
/// 启动时构建一次，之后只读；通过 `Arc<ApiConfig>` 或 `&ApiConfig` 传给使用方。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// 当前部署环境
    pub profile: Profile,
    /// 后端基础地址
    pub base_url: String,
    /// 端点路径
    pub endpoints: EndpointsConfig,
    /// 请求超时（毫秒）
    pub timeout: u64,
    /// 上传限制
    pub upload: UploadConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl ApiConfig {
    /// 创建本地开发配置
    pub fn local() -> Self {
        Self {
            profile: Profile::Local,
            base_url: LOCAL_BASE_URL.into(),
            endpoints: EndpointsConfig::default(),
            timeout: DEFAULT_TIMEOUT_MS,
            upload: UploadConfig::default(),
        }
    }

    /// 创建生产环境配置
    pub fn production() -> Self {
        Self {
            profile: Profile::Production,
            base_url: PRODUCTION_BASE_URL.into(),
            ..Self::local()
        }
    }

    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Local => Self::local(),
            Profile::Production => Self::production(),
        }
    }

    /// 请求超时
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// 拼接端点完整地址：`base_url + path`
    pub fn endpoint_url(&self, endpoint: Endpoint) -> Result<Url, ConfigValidationError> {
        let path = self.endpoints.path(endpoint);
        let joined = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        Url::parse(&joined).map_err(|e| ConfigValidationError::InvalidBaseUrl {
            url: joined,
            reason: e.to_string(),
        })
    }

    /// 判断 MIME 类型是否允许上传（忽略大小写和参数）
    pub fn accepts_type(&self, content_type: &str) -> bool {
        let essence = mime_essence(content_type);
        self.upload
            .accepted_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&essence))
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.validate_base_url()?;
        self.validate_endpoints()?;

        if self.timeout == 0 {
            return Err(ConfigValidationError::InvalidTimeout);
        }

        if self.upload.max_size == 0 {
            return Err(ConfigValidationError::InvalidMaxSize);
        }

        self.validate_accepted_types()
    }

    fn validate_base_url(&self) -> Result<(), ConfigValidationError> {
        let invalid = |reason: &str| ConfigValidationError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: reason.to_string(),
        };

        if self.base_url.trim().is_empty() {
            return Err(invalid("empty"));
        }

        if self.profile == Profile::Production {
            let lowered = self.base_url.to_ascii_lowercase();
            if PLACEHOLDER_MARKERS.iter().any(|m| lowered.contains(m)) {
                return Err(ConfigValidationError::PlaceholderBaseUrl(
                    self.base_url.clone(),
                ));
            }
        }

        let url = Url::parse(&self.base_url).map_err(|e| invalid(&e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigValidationError::UnsupportedScheme(
                url.scheme().to_string(),
            ));
        }

        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_ascii_lowercase(),
            _ => return Err(invalid("missing host")),
        };

        // endpoint_url 直接拼接路径，查询串或片段会吞掉端点路径
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("query/fragment not allowed"));
        }

        if self.profile == Profile::Production && (is_local_host(&host) || url.scheme() != "https") {
            return Err(ConfigValidationError::InsecureProductionUrl(
                self.base_url.clone(),
            ));
        }

        Ok(())
    }

    fn validate_endpoints(&self) -> Result<(), ConfigValidationError> {
        for endpoint in [Endpoint::Predict, Endpoint::Health] {
            let path = self.endpoints.path(endpoint);
            if path.len() < 2 || !path.starts_with('/') || path.contains(char::is_whitespace) {
                return Err(ConfigValidationError::InvalidEndpoint {
                    name: endpoint.name().to_string(),
                    path: path.to_string(),
                });
            }
        }

        if self.endpoints.predict == self.endpoints.health {
            return Err(ConfigValidationError::DuplicateEndpoint(
                self.endpoints.predict.clone(),
            ));
        }

        Ok(())
    }

    fn validate_accepted_types(&self) -> Result<(), ConfigValidationError> {
        if self.upload.accepted_types.is_empty() {
            return Err(ConfigValidationError::EmptyAcceptedTypes);
        }

        let mut seen = HashSet::new();
        for content_type in &self.upload.accepted_types {
            if !is_image_mime(content_type) {
                return Err(ConfigValidationError::InvalidMimeType(content_type.clone()));
            }
            if !seen.insert(content_type.to_ascii_lowercase()) {
                return Err(ConfigValidationError::DuplicateMimeType(content_type.clone()));
            }
        }

        Ok(())
    }
}

/// 去掉参数并转小写，例如 `image/PNG; q=1` -> `image/png`
pub fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// 本机或未指定地址：`localhost`、回环 IP、`0.0.0.0`、`::`
fn is_local_host(host: &str) -> bool {
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    match host.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
        Ok(ip) => ip.is_loopback() || ip.is_unspecified(),
        Err(_) => false,
    }
}

fn is_image_mime(content_type: &str) -> bool {
    let is_token = |s: &str| {
        !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+".contains(c))
    };

    match content_type.split_once('/') {
        Some((kind, subtype)) => kind.eq_ignore_ascii_case("image") && is_token(subtype),
        None => false,
    }
}
