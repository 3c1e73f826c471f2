// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! HTTP client for the inference endpoint

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::debug;

use super::{Classification, Classifier};
use crate::config::ClassifierConfig;
use crate::upload::ImageUpload;
use crate::{Result, ScanError};

/// Posts the image as multipart form data and decodes the JSON verdict
pub struct RemoteClassifier {
    client: Client,
    endpoint: Url,
    field_name: String,
}

impl RemoteClassifier {
    /// Create a client for `endpoint`; `timeout` of `None` waits indefinitely
    pub fn new(endpoint: &str, field_name: &str, timeout: Option<Duration>) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ScanError::Config(format!("Invalid endpoint '{}': {}", endpoint, e)))?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            endpoint,
            field_name: field_name.to_string(),
        })
    }

    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        Self::new(
            &config.endpoint,
            &config.field_name,
            config.timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn form(&self, upload: &ImageUpload) -> Result<Form> {
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.content_type)
            .map_err(|e| {
                ScanError::InvalidUpload(format!(
                    "{} has an unusable content type '{}': {}",
                    upload.file_name, upload.content_type, e
                ))
            })?;
        Ok(Form::new().part(self.field_name.clone(), part))
    }
}

#[async_trait]
impl Classifier for RemoteClassifier {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn classify(&self, upload: &ImageUpload) -> Result<Classification> {
        debug!(
            "Sending {} ({} bytes, {}) to {}",
            upload.file_name,
            upload.len(),
            upload.content_type,
            self.endpoint
        );

        let response = self.client
            .post(self.endpoint.clone())
            .multipart(self.form(upload)?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::Server(
                status.canonical_reason().unwrap_or(status.as_str()).to_string(),
            ));
        }

        let classification: Classification = response.json().await?;
        debug!("Server answered {:?}", classification);
        Ok(classification)
    }

    /// The inference server answers on its root path
    async fn health_check(&self) -> Result<()> {
        let root = self.endpoint
            .join("/")
            .map_err(|e| ScanError::Config(format!("Invalid endpoint: {}", e)))?;

        let response = self.client
            .get(root)
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ScanError::Server(format!(
                "health check returned status {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_endpoint() {
        assert!(matches!(
            RemoteClassifier::new("not a url", "file", None),
            Err(ScanError::Config(_))
        ));
    }

    #[test]
    fn test_from_config() {
        let classifier = RemoteClassifier::from_config(&ClassifierConfig::default()).unwrap();
        assert_eq!(classifier.endpoint().as_str(), "http://127.0.0.1:8000/predict");
        assert_eq!(classifier.field_name, "file");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_api_error() {
        // Nothing listens once the ephemeral listener is dropped
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let endpoint = format!("http://{}/predict", addr);

        let classifier = RemoteClassifier::new(&endpoint, "file", None).unwrap();
        let upload = ImageUpload::new("a.png", crate::upload::tests::png_bytes());
        let err = classifier.classify(&upload).await.unwrap_err();
        assert!(matches!(err, ScanError::Api(_)));
    }

    #[tokio::test]
    async fn test_bad_content_type_is_an_invalid_upload() {
        let classifier = RemoteClassifier::new("http://127.0.0.1:1/predict", "file", None).unwrap();
        let mut upload = ImageUpload::new("a.png", crate::upload::tests::png_bytes());
        upload.content_type = "not a mime".to_string();

        let err = classifier.classify(&upload).await.unwrap_err();
        match err {
            ScanError::InvalidUpload(reason) => assert!(reason.contains("not a mime")),
            other => panic!("expected an invalid upload, got {:?}", other),
        }
    }
}
