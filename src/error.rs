// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for oralscan

use thiserror::Error;

/// Result type alias for oralscan operations
pub type Result<T> = std::result::Result<T, ScanError>;

/// oralscan error types
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Server Error: {0}")]
    Server(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
