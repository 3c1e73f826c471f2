// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Classification providers

pub mod random;
pub mod remote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::config::{ClassifierConfig, ProviderKind};
use crate::upload::ImageUpload;
use crate::Result;

pub use random::RandomClassifier;
pub use remote::RemoteClassifier;

/// Response body of the inference endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Human-readable label, e.g. "Cancer Positive"
    pub result: String,
    /// Percentage in [0, 100]
    pub confidence: f64,
    /// Model label; informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_label: Option<String>,
}

/// Binary reading of a classification label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Positive,
    Negative,
}

impl Classification {
    pub fn new(result: impl Into<String>, confidence: f64) -> Self {
        Self {
            result: result.into(),
            confidence,
            raw_label: None,
        }
    }

    /// Positive iff the label contains "positive", ignoring case
    pub fn verdict(&self) -> Verdict {
        if self.result.to_lowercase().contains("positive") {
            Verdict::Positive
        } else {
            Verdict::Negative
        }
    }

    /// Confidence as shown to the user, e.g. "98.5%"
    pub fn confidence_text(&self) -> String {
        format!("{}%", self.confidence)
    }
}

impl Verdict {
    pub fn title(&self) -> &'static str {
        match self {
            Verdict::Positive => "POSITIVE",
            Verdict::Negative => "NEGATIVE",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Verdict::Positive => {
                "Potential malignancy detected. Immediate clinical consultation recommended."
            }
            Verdict::Negative => "No malignant features detected. Tissue appears normal.",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Something that turns image bytes into a label and a confidence
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Name of this provider
    fn name(&self) -> &'static str;

    /// Classify one upload; may suspend until the provider answers
    async fn classify(&self, upload: &ImageUpload) -> Result<Classification>;

    /// Check the provider is reachable
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Build the provider selected in config
pub fn from_config(config: &ClassifierConfig) -> Result<Arc<dyn Classifier>> {
    let classifier: Arc<dyn Classifier> = match config.provider {
        ProviderKind::Remote => Arc::new(RemoteClassifier::from_config(config)?),
        ProviderKind::Random => Arc::new(RandomClassifier::from_config(&config.random)),
    };
    tracing::debug!("Using classifier: {}", classifier.name());
    Ok(classifier)
}
