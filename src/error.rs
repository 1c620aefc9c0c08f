//! 错误处理模块
//!
//! 定义应用程序的错误类型和错误处理逻辑。

use crate::config::loader::ConfigValidationError;
use crate::upload::UploadError;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 配置错误（部署配置有误，应在启动时发现）
    #[error("配置错误: {0}")]
    Config(String),

    /// 参数验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),

    /// 上传文件不符合限制
    #[error("上传被拒绝: {0}")]
    Upload(#[from] UploadError),

    /// 连接错误
    #[error("连接错误: {0}")]
    Connection(String),

    /// 超时错误
    #[error("操作超时: {0}")]
    Timeout(String),

    /// 后端返回错误
    #[error("后端错误 ({status}): {message}")]
    Remote { status: u16, message: String },

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(String),
}

impl AppError {
    /// 是否在发起网络请求前就被拒绝
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            AppError::Config(_) | AppError::Validation(_) | AppError::Upload(_)
        )
    }

    /// 错误代码
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Validation(_) => "BAD_REQUEST",
            AppError::Upload(_) => "UPLOAD_REJECTED",
            AppError::Connection(_) => "SERVICE_UNAVAILABLE",
            AppError::Timeout(_) => "TIMEOUT",
            AppError::Remote { .. } => "REMOTE_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Internal(_) | AppError::Io(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<ConfigValidationError> for AppError {
    fn from(e: ConfigValidationError) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AppError::Timeout(e.to_string())
        } else if e.is_connect() || e.is_request() {
            AppError::Connection(e.to_string())
        } else if e.is_decode() {
            AppError::Serialization(e.to_string())
        } else if let Some(status) = e.status() {
            AppError::Remote {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            AppError::Internal(e.to_string())
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;
