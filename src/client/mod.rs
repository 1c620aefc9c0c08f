//! 后端客户端模块
//!
//! 通过 HTTP 调用图像识别后端的 `/predict` 与 `/health` 端点。

pub mod dto;
pub mod http;

use crate::error::Result;
use crate::upload::ImageUpload;
use async_trait::async_trait;

pub use dto::{HealthReport, PredictResponse, Prediction};
pub use http::HttpVisionClient;

/// 图像识别后端
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VisionApi: Send + Sync {
    /// 健康检查
    async fn health(&self) -> Result<HealthReport>;

    /// 上传图片并返回识别结果，按置信度从高到低排列
    async fn predict(&self, upload: ImageUpload) -> Result<Vec<Prediction>>;
}
