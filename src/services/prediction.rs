//! 图像识别服务
//!
//! 先按上传限制校验图片，通过后才调用后端。

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::client::{HealthReport, Prediction, VisionApi};
use crate::config::ApiConfig;
use crate::error::Result;
use crate::upload::{ImageUpload, UploadPolicy};

#[async_trait]
pub trait PredictionService: Send + Sync {
    /// 识别图片，最多返回 `top` 条结果
    async fn classify(&self, upload: ImageUpload, top: usize) -> Result<Vec<Prediction>>;
    /// 从磁盘读取图片后识别
    async fn classify_file(&self, path: &Path, top: usize) -> Result<Vec<Prediction>>;
    /// 检查后端状态
    async fn check_backend(&self) -> Result<HealthReport>;
}

pub struct PredictionServiceImpl {
    api: Arc<dyn VisionApi>,
    policy: UploadPolicy,
}

impl PredictionServiceImpl {
    pub fn new(api: Arc<dyn VisionApi>, policy: UploadPolicy) -> Self {
        Self { api, policy }
    }
}

#[async_trait]
impl PredictionService for PredictionServiceImpl {
    async fn classify(&self, upload: ImageUpload, top: usize) -> Result<Vec<Prediction>> {
        if let Err(e) = self.policy.validate(&upload) {
            warn!(
                file_name = %upload.file_name,
                content_type = %upload.content_type,
                size = upload.size(),
                error = %e,
                "Upload rejected"
            );
            return Err(e.into());
        }

        let file_name = upload.file_name.clone();
        let mut predictions = self.api.predict(upload).await?;
        predictions.truncate(top);

        info!(
            file_name = %file_name,
            results = predictions.len(),
            best = predictions.first().map(|p| p.name.as_str()).unwrap_or("-"),
            "Image classified"
        );

        Ok(predictions)
    }

    async fn classify_file(&self, path: &Path, top: usize) -> Result<Vec<Prediction>> {
        let upload = match ImageUpload::from_path(path, self.policy.max_size()).await {
            Ok(upload) => upload,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Upload rejected");
                return Err(e);
            }
        };
        self.classify(upload, top).await
    }

    async fn check_backend(&self) -> Result<HealthReport> {
        let report = self.api.health().await?;
        if report.is_ok() {
            info!(model = ?report.model, "Backend healthy");
        } else {
            warn!(status = %report.status, "Backend reported non-ok status");
        }
        Ok(report)
    }
}

pub fn create_prediction_service(
    config: &ApiConfig,
    api: Arc<dyn VisionApi>,
) -> Box<dyn PredictionService> {
    Box::new(PredictionServiceImpl::new(
        api,
        UploadPolicy::from_config(config),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockVisionApi;
    use crate::error::AppError;
    use crate::upload::UploadError;

    fn prediction(name: &str, confidence: f64) -> Prediction {
        Prediction {
            class_id: format!("n{}", name.len()),
            name: name.to_string(),
            confidence,
        }
    }

    fn service(mock: MockVisionApi) -> Box<dyn PredictionService> {
        create_prediction_service(&ApiConfig::production(), Arc::new(mock))
    }

    #[tokio::test]
    async fn test_oversized_upload_never_reaches_backend() {
        let mut mock = MockVisionApi::new();
        mock.expect_predict().times(0);

        let upload = ImageUpload::new("big.png", "image/png", vec![0; 10_485_761]);
        let err = service(mock).classify(upload, 5).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Upload(UploadError::TooLarge {
                max: 10_485_760,
                got: 10_485_761
            })
        ));
    }

    #[tokio::test]
    async fn test_svg_upload_never_reaches_backend() {
        let mut mock = MockVisionApi::new();
        mock.expect_predict().times(0);

        let upload = ImageUpload::new("logo.svg", "image/svg+xml", b"<svg/>".to_vec());
        let err = service(mock).classify(upload, 5).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Upload(UploadError::UnsupportedType { .. })
        ));
        assert!(err.is_client_side());
    }

    #[tokio::test]
    async fn test_upload_at_limit_is_sent() {
        let mut mock = MockVisionApi::new();
        mock.expect_predict()
            .times(1)
            .withf(|upload| upload.size() == 10_485_760)
            .returning(|_| Ok(vec![prediction("Tabby", 87.5)]));

        let upload = ImageUpload::new("cat.jpg", "image/jpeg", vec![0; 10_485_760]);
        let predictions = service(mock).classify(upload, 5).await.unwrap();

        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].name, "Tabby");
    }

    #[tokio::test]
    async fn test_results_truncated_to_top() {
        let mut mock = MockVisionApi::new();
        mock.expect_predict().returning(|_| {
            Ok(vec![
                prediction("Tabby", 60.0),
                prediction("Tiger Cat", 20.0),
                prediction("Egyptian Cat", 10.0),
            ])
        });

        let upload = ImageUpload::new("cat.png", "image/png", vec![1, 2, 3]);
        let predictions = service(mock).classify(upload, 2).await.unwrap();

        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[1].name, "Tiger Cat");
    }

    #[tokio::test]
    async fn test_backend_timeout_propagates() {
        let mut mock = MockVisionApi::new();
        mock.expect_predict()
            .returning(|_| Err(AppError::Timeout("30000ms".into())));

        let upload = ImageUpload::new("cat.png", "image/png", vec![1]);
        let err = service(mock).classify(upload, 5).await.unwrap_err();

        assert!(matches!(err, AppError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_check_backend() {
        let mut mock = MockVisionApi::new();
        mock.expect_health().returning(|| {
            Ok(HealthReport {
                status: "ok".into(),
                model: Some("MobileNetV2".into()),
                cors_enabled: true,
                allowed_origins: vec![],
            })
        });

        let report = service(mock).check_backend().await.unwrap();
        assert!(report.is_ok());
    }

    #[tokio::test]
    async fn test_oversized_file_rejected_before_read_and_send() {
        let mut mock = MockVisionApi::new();
        mock.expect_predict().times(0);

        let file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
        file.as_file().set_len(10_485_761).unwrap();

        let err = service(mock).classify_file(file.path(), 5).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Upload(UploadError::TooLarge { got: 10_485_761, .. })
        ));
    }
}
