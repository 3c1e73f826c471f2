// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for oralscan

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Classification provider settings
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Checks applied to a file before it is sent
    #[serde(default)]
    pub upload: UploadConfig,

    /// Web UI settings
    #[serde(default)]
    pub web: WebConfig,
}

/// Which classification provider to build
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Multipart POST to the inference endpoint
    #[default]
    Remote,
    /// Local randomized stand-in, no network
    Random,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Multipart field the server reads the image from
    #[serde(default = "default_field_name")]
    pub field_name: String,
    /// No timeout unless set
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub random: RandomConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RandomConfig {
    #[serde(default)]
    pub seed: Option<u64>,
    /// Simulated inference latency
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    #[serde(default = "default_true")]
    pub require_image: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

// Default value functions
fn default_endpoint() -> String { "http://127.0.0.1:8000/predict".to_string() }
fn default_field_name() -> String { "file".to_string() }
fn default_delay_ms() -> u64 { 1500 }
fn default_max_bytes() -> u64 { 10 * 1024 * 1024 }
fn default_true() -> bool { true }
fn default_web_host() -> String { "127.0.0.1".to_string() }
fn default_web_port() -> u16 { 8080 }

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            endpoint: default_endpoint(),
            field_name: default_field_name(),
            timeout_secs: None,
            random: RandomConfig::default(),
        }
    }
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self {
            seed: None,
            delay_ms: default_delay_ms(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            require_image: true,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::ScanError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values that would make the flow unusable
    pub fn validate(&self) -> crate::Result<()> {
        if self.classifier.field_name.trim().is_empty() {
            return Err(crate::ScanError::Config("classifier.field_name must not be empty".to_string()));
        }
        if self.classifier.provider == ProviderKind::Remote
            && !(self.classifier.endpoint.starts_with("http://")
                || self.classifier.endpoint.starts_with("https://"))
        {
            return Err(crate::ScanError::Config(format!(
                "classifier.endpoint must be an http(s) URL, got '{}'",
                self.classifier.endpoint
            )));
        }
        if self.upload.max_bytes == 0 {
            return Err(crate::ScanError::Config("upload.max_bytes must be positive".to_string()));
        }
        Ok(())
    }
}
