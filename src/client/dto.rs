//! 后端请求/响应数据结构

use serde::{Deserialize, Serialize};

/// 健康检查响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// 状态，正常时为 "ok"
    pub status: String,
    /// 后端使用的模型
    #[serde(default)]
    pub model: Option<String>,
    /// 是否开启 CORS
    #[serde(default)]
    pub cors_enabled: bool,
    /// 允许的跨域来源
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl HealthReport {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// 单条识别结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// ImageNet 类别 ID
    pub class_id: String,
    /// 类别名称
    pub name: String,
    /// 置信度（百分比 0-100）
    pub confidence: f64,
}

/// `/predict` 响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub success: bool,
    #[serde(default)]
    pub predictions: Vec<Prediction>,
    #[serde(default)]
    pub error: Option<String>,
}
