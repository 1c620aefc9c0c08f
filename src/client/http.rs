use crate::client::VisionApi;
use crate::client::dto::{HealthReport, PredictResponse, Prediction};
use crate::config::{ApiConfig, Endpoint};
use crate::error::{AppError, Result};
use crate::upload::ImageUpload;
use async_trait::async_trait;
use reqwest::{StatusCode, Url, multipart};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// 基于 reqwest 的后端客户端
///
/// 所有请求共享配置中的超时，超时后以 `AppError::Timeout` 返回。
#[derive(Clone)]
pub struct HttpVisionClient {
    client: reqwest::Client,
    config: Arc<ApiConfig>,
    predict_url: Url,
    health_url: Url,
}

impl std::fmt::Debug for HttpVisionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpVisionClient")
            .field("client", &"reqwest::Client")
            .field("predict_url", &self.predict_url.as_str())
            .field("health_url", &self.health_url.as_str())
            .field("timeout_ms", &self.config.timeout)
            .finish()
    }
}

impl HttpVisionClient {
    pub fn new(config: Arc<ApiConfig>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        // 地址无效时返回连接错误
        let predict_url = config
            .endpoint_url(Endpoint::Predict)
            .map_err(|e| AppError::Connection(e.to_string()))?;
        let health_url = config
            .endpoint_url(Endpoint::Health)
            .map_err(|e| AppError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            config,
            predict_url,
            health_url,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn predict_url(&self) -> &Url {
        &self.predict_url
    }

    pub fn health_url(&self) -> &Url {
        &self.health_url
    }

    fn transport_error(&self, url: &Url, e: reqwest::Error) -> AppError {
        let err = if e.is_timeout() {
            AppError::Timeout(format!(
                "{} 未在 {}ms 内响应",
                url, self.config.timeout
            ))
        } else {
            AppError::from(e)
        };
        warn!(url = %url, error = %err, "Request failed");
        err
    }
}

#[async_trait]
impl VisionApi for HttpVisionClient {
    async fn health(&self) -> Result<HealthReport> {
        let url = &self.health_url;
        let start = Instant::now();

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(url, e))?;
        debug!(
            url = %url,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Health check finished"
        );

        if !status.is_success() {
            return Err(AppError::Remote {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn predict(&self, upload: ImageUpload) -> Result<Vec<Prediction>> {
        let url = &self.predict_url;
        let start = Instant::now();
        let size = upload.size();

        let part = multipart::Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(url, e))?;
        debug!(
            url = %url,
            status = status.as_u16(),
            size,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Prediction request finished"
        );

        let parsed = parse_predict_body(status, &body)?;
        let mut predictions = parsed.predictions;
        predictions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Ok(predictions)
    }
}

fn parse_predict_body(status: StatusCode, body: &str) -> Result<PredictResponse> {
    let parsed = serde_json::from_str::<PredictResponse>(body);

    match parsed {
        Ok(response) if status.is_success() && response.success => Ok(response),
        Ok(response) => Err(AppError::Remote {
            status: status.as_u16(),
            message: response
                .error
                .unwrap_or_else(|| "prediction failed".to_string()),
        }),
        Err(_) if !status.is_success() => Err(AppError::Remote {
            status: status.as_u16(),
            message: body.to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}
