// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Randomized stand-in for the inference server

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::Mutex;

use super::{Classification, Classifier};
use crate::config::RandomConfig;
use crate::upload::ImageUpload;
use crate::Result;

/// Answers like the real server would, without looking at the image
pub struct RandomClassifier {
    rng: Mutex<StdRng>,
    delay: Duration,
}

impl RandomClassifier {
    pub fn new(seed: Option<u64>, delay: Duration) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
            delay,
        }
    }

    pub fn from_config(config: &RandomConfig) -> Self {
        Self::new(config.seed, Duration::from_millis(config.delay_ms))
    }
}

#[async_trait]
impl Classifier for RandomClassifier {
    fn name(&self) -> &'static str {
        "random"
    }

    async fn classify(&self, _upload: &ImageUpload) -> Result<Classification> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut rng = self.rng.lock().await;
        let positive = rng.gen_bool(0.5);
        let confidence = (rng.gen_range(50.0..100.0_f64) * 100.0).round() / 100.0;

        let (result, raw_label) = if positive {
            ("Cancer Positive", "LABEL_1")
        } else {
            ("Cancer Negative", "LABEL_0")
        };

        Ok(Classification {
            result: result.to_string(),
            // Rounding can land exactly on 100.0
            confidence: confidence.min(99.99),
            raw_label: Some(raw_label.to_string()),
        })
    }
}
