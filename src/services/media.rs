//! Image hosting service
//!
//! Client for the hosted image-transformation service (Cloudinary). Uploads
//! are validated locally (size, content type) before any network call.
//! Nothing here retries: a failed upload or destroy surfaces to the caller,
//! who owns any compensating action.

use crate::config::MediaConfig;
use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Error types for image hosting operations
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// The file was rejected before upload (size or content type)
    #[error("{0}")]
    Invalid(String),

    /// The hosting service call failed
    #[error("image host error: {0}")]
    Upstream(String),
}

/// An image file received from a client
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Result of a successful upload
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedImage {
    pub secure_url: String,
    pub public_id: String,
    pub format: String,
    pub bytes: u64,
    pub width: u32,
    pub height: u32,
}

/// Interface to the image hosting service
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload an image into the configured folder
    async fn upload(&self, upload: ImageUpload) -> Result<UploadedImage, MediaError>;

    /// Remove a previously uploaded image
    async fn destroy(&self, public_id: &str) -> Result<(), MediaError>;
}

/// Cloudinary REST API client
pub struct CloudinaryClient {
    config: MediaConfig,
    client: reqwest::Client,
}

impl CloudinaryClient {
    /// Create a new client from the media configuration
    pub fn new(config: MediaConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn validate(&self, upload: &ImageUpload) -> Result<(), MediaError> {
        if upload.bytes.len() as u64 > self.config.max_file_size {
            return Err(MediaError::Invalid(format!(
                "File too large. Maximum size: {:.1}MB",
                self.config.max_file_size as f64 / (1024.0 * 1024.0)
            )));
        }

        if !self.config.is_type_allowed(&upload.content_type) {
            return Err(MediaError::Invalid(format!(
                "Unsupported file type '{}'. Allowed: {}",
                upload.content_type,
                self.config.allowed_types.join(", ")
            )));
        }

        Ok(())
    }

    /// SHA-256 request signature over the sorted parameter string, as the
    /// hosting API expects: "k1=v1&k2=v2" + api_secret, hex-encoded.
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);

        let joined = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(joined.as_bytes());
        hasher.update(self.config.api_secret.as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/{}",
            self.config.cloud_name, action
        )
    }
}

#[async_trait]
impl ImageHost for CloudinaryClient {
    async fn upload(&self, upload: ImageUpload) -> Result<UploadedImage, MediaError> {
        self.validate(&upload)?;

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[
            ("folder", &self.config.folder),
            ("timestamp", &timestamp),
        ]);

        let file_part = reqwest::multipart::Part::bytes(upload.bytes)
            .file_name(upload.filename)
            .mime_str(&upload.content_type)
            .map_err(|e| MediaError::Invalid(format!("Invalid content type: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", self.config.folder.clone())
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| MediaError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::Upstream(format!(
                "upload failed with status {}: {}",
                status, body
            )));
        }

        response
            .json::<UploadedImage>()
            .await
            .map_err(|e| MediaError::Upstream(format!("unexpected upload response: {}", e)))
    }

    async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[("public_id", public_id), ("timestamp", &timestamp)]);

        let form = reqwest::multipart::Form::new()
            .text("public_id", public_id.to_string())
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| MediaError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(MediaError::Upstream(format!(
                "destroy failed with status {}",
                status
            )));
        }

        Ok(())
    }
}

/// Test doubles for the image host
#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Image host that accepts every upload and records destroyed ids
    #[derive(Default)]
    pub struct StaticImageHost {
        pub uploads: AtomicUsize,
        pub destroyed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageHost for StaticImageHost {
        async fn upload(&self, upload: ImageUpload) -> Result<UploadedImage, MediaError> {
            let n = self.uploads.fetch_add(1, Ordering::SeqCst);
            Ok(UploadedImage {
                secure_url: format!("https://img.test/{}/{}", n, upload.filename),
                public_id: format!("test/{}", n),
                format: "jpg".to_string(),
                bytes: upload.bytes.len() as u64,
                width: 800,
                height: 600,
            })
        }

        async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
            self.destroyed.lock().unwrap().push(public_id.to_string());
            Ok(())
        }
    }

    /// Image host whose uploads always fail
    pub struct FailingImageHost;

    #[async_trait]
    impl ImageHost for FailingImageHost {
        async fn upload(&self, _upload: ImageUpload) -> Result<UploadedImage, MediaError> {
            Err(MediaError::Upstream("simulated outage".to_string()))
        }

        async fn destroy(&self, _public_id: &str) -> Result<(), MediaError> {
            Err(MediaError::Upstream("simulated outage".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> CloudinaryClient {
        CloudinaryClient::new(MediaConfig {
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            ..MediaConfig::default()
        })
    }

    #[test]
    fn test_validate_rejects_oversized_file() {
        let c = client();
        let upload = ImageUpload {
            filename: "big.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: vec![0; (c.config.max_file_size + 1) as usize],
        };
        assert!(matches!(c.validate(&upload), Err(MediaError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_bad_content_type() {
        let c = client();
        let upload = ImageUpload {
            filename: "doc.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            bytes: vec![1, 2, 3],
        };
        assert!(matches!(c.validate(&upload), Err(MediaError::Invalid(_))));
    }

    #[test]
    fn test_validate_accepts_small_image() {
        let c = client();
        let upload = ImageUpload {
            filename: "pic.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        };
        assert!(c.validate(&upload).is_ok());
    }

    #[test]
    fn test_sign_is_deterministic_and_order_insensitive() {
        let c = client();
        let a = c.sign(&[("folder", "x"), ("timestamp", "123")]);
        let b = c.sign(&[("timestamp", "123"), ("folder", "x")]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64); // hex-encoded sha256
    }

    #[test]
    fn test_sign_depends_on_secret() {
        let a = client().sign(&[("timestamp", "123")]);

        let other = CloudinaryClient::new(MediaConfig {
            api_secret: "different".to_string(),
            ..MediaConfig::default()
        });
        let b = other.sign(&[("timestamp", "123")]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_endpoint_format() {
        let c = client();
        assert_eq!(
            c.endpoint("upload"),
            "https://api.cloudinary.com/v1_1/demo/image/upload"
        );
    }
}
