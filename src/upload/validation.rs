//! Upload Validation Module
//!
//! Checks image uploads against the configured size and MIME limits before
//! anything is sent over the network.

use crate::config::config::{ApiConfig, mime_essence};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Upload rejection reasons
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadError {
    #[error("File is empty")]
    Empty,

    #[error("File too large: max={max} bytes, got={got} bytes")]
    TooLarge { max: u64, got: u64 },

    #[error("Unsupported content type '{content_type}', accepted: {}", accepted.join(", "))]
    UnsupportedType {
        content_type: String,
        accepted: Vec<String>,
    },
}

impl UploadError {
    pub fn field(&self) -> &str {
        match self {
            Self::Empty | Self::TooLarge { .. } => "file",
            Self::UnsupportedType { .. } => "content_type",
        }
    }
}

/// An image file ready to be sent to the predict endpoint
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    ///
    /// At most `max_size + 1` bytes are read; anything larger fails with
    /// `UploadError::TooLarge` without buffering the rest of the file.
    pub async fn from_path(path: impl AsRef<Path>, max_size: u64) -> crate::error::Result<Self> {
        let path = path.as_ref();

        let declared = tokio::fs::metadata(path).await?.len();
        if declared > max_size {
            return Err(UploadError::TooLarge {
                max: max_size,
                got: declared,
            }
            .into());
        }

        // metadata 对设备文件和管道不可靠，读取时再限一次
        let file = tokio::fs::File::open(path).await?;
        let mut bytes = Vec::with_capacity(declared as usize);
        file.take(max_size.saturating_add(1))
            .read_to_end(&mut bytes)
            .await?;
        if bytes.len() as u64 > max_size {
            return Err(UploadError::TooLarge {
                max: max_size,
                got: bytes.len() as u64,
            }
            .into());
        }

        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        debug!(
            file_name = %file_name,
            content_type = %content_type,
            size = bytes.len(),
            "Read upload from disk"
        );

        Ok(Self::new(file_name, content_type, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Size and type limits for image uploads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    max_size: u64,
    accepted_types: Vec<String>,
}

impl UploadPolicy {
    pub fn new(max_size: u64, accepted_types: Vec<String>) -> Self {
        Self {
            max_size,
            accepted_types: accepted_types
                .iter()
                .map(|t| mime_essence(t))
                .collect(),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(config.upload.max_size, config.upload.accepted_types.clone())
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn accepted_types(&self) -> &[String] {
        &self.accepted_types
    }

    pub fn accepts_type(&self, content_type: &str) -> bool {
        let essence = mime_essence(content_type);
        self.accepted_types.iter().any(|t| *t == essence)
    }

    /// Check a size and content type. A size equal to the limit is accepted.
    pub fn check(&self, size: u64, content_type: &str) -> Result<(), UploadError> {
        if size == 0 {
            return Err(UploadError::Empty);
        }

        if size > self.max_size {
            return Err(UploadError::TooLarge {
                max: self.max_size,
                got: size,
            });
        }

        if !self.accepts_type(content_type) {
            return Err(UploadError::UnsupportedType {
                content_type: content_type.to_string(),
                accepted: self.accepted_types.clone(),
            });
        }

        Ok(())
    }

    pub fn validate(&self, upload: &ImageUpload) -> Result<(), UploadError> {
        self.check(upload.size(), &upload.content_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn policy() -> UploadPolicy {
        UploadPolicy::from_config(&ApiConfig::production())
    }

    #[test]
    fn test_size_boundary_is_inclusive() {
        let policy = policy();
        assert_eq!(policy.max_size(), 10_485_760);

        assert!(policy.check(10_485_760, "image/png").is_ok());
        assert_eq!(
            policy.check(10_485_761, "image/png"),
            Err(UploadError::TooLarge {
                max: 10_485_760,
                got: 10_485_761
            })
        );
    }

    #[test]
    fn test_empty_file_rejected() {
        assert_eq!(policy().check(0, "image/png"), Err(UploadError::Empty));
    }

    #[rstest]
    #[case("image/jpeg")]
    #[case("image/png")]
    #[case("image/gif")]
    #[case("image/bmp")]
    #[case("image/webp")]
    #[case("Image/JPEG")]
    fn test_accepted_types(#[case] content_type: &str) {
        assert!(policy().check(1024, content_type).is_ok());
    }

    #[rstest]
    #[case("image/svg+xml")]
    #[case("image/tiff")]
    #[case("application/octet-stream")]
    #[case("")]
    fn test_rejected_types(#[case] content_type: &str) {
        let err = policy().check(1024, content_type).unwrap_err();
        assert_eq!(err.field(), "content_type");
        assert!(matches!(err, UploadError::UnsupportedType { .. }));
    }

    #[test]
    fn test_size_checked_before_type() {
        let err = policy().check(20 * 1024 * 1024, "image/svg+xml").unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { .. }));
    }

    #[test]
    fn test_validate_upload() {
        let policy = UploadPolicy::new(4, vec!["image/png".into()]);
        let ok = ImageUpload::new("cat.png", "image/png", vec![1, 2, 3, 4]);
        let too_big = ImageUpload::new("cat.png", "image/png", vec![0; 5]);

        assert!(policy.validate(&ok).is_ok());
        assert!(policy.validate(&too_big).is_err());
    }

    #[test]
    fn test_unsupported_type_message_lists_accepted() {
        let policy = UploadPolicy::new(4, vec!["image/png".into(), "image/gif".into()]);
        let err = policy.check(1, "image/svg+xml").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported content type 'image/svg+xml', accepted: image/png, image/gif"
        );
    }

    #[tokio::test]
    async fn test_from_path_guesses_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dog.JPG");
        tokio::fs::write(&path, b"fake jpeg").await.unwrap();

        let upload = ImageUpload::from_path(&path, 10_485_760).await.unwrap();
        assert_eq!(upload.file_name, "dog.JPG");
        assert_eq!(upload.content_type, "image/jpeg");
        assert_eq!(upload.size(), 9);
        assert!(policy().validate(&upload).is_ok());
    }

    #[tokio::test]
    async fn test_from_path_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.unknownext");
        tokio::fs::write(&path, b"data").await.unwrap();

        let upload = ImageUpload::from_path(&path, 10_485_760).await.unwrap();
        assert_eq!(upload.content_type, "application/octet-stream");
        assert!(policy().validate(&upload).is_err());
    }

    #[tokio::test]
    async fn test_from_path_rejects_oversized_file_without_reading() {
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        // 稀疏文件，不占用实际磁盘
        file.as_file().set_len(10_485_761).unwrap();

        let err = ImageUpload::from_path(file.path(), 10_485_760)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::AppError::Upload(UploadError::TooLarge {
                max: 10_485_760,
                got: 10_485_761
            })
        ));
    }

    #[tokio::test]
    async fn test_from_path_accepts_file_at_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.png");
        tokio::fs::write(&path, vec![7u8; 16]).await.unwrap();

        let upload = ImageUpload::from_path(&path, 16).await.unwrap();
        assert_eq!(upload.size(), 16);

        let err = ImageUpload::from_path(&path, 15).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::AppError::Upload(UploadError::TooLarge { max: 15, got: 16 })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_from_path_bounds_unsized_stream() {
        // /dev/zero 的 metadata 长度为 0，只能靠读取上限拦截
        let err = ImageUpload::from_path("/dev/zero", 1024).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::AppError::Upload(UploadError::TooLarge { max: 1024, got: 1025 })
        ));
    }
}
