// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! The selected file, its preview encoding and the pre-upload checks

use base64::{engine::general_purpose, Engine as _};
use std::path::Path;

use crate::config::UploadConfig;
use crate::{Result, ScanError};

const FALLBACK_MIME: &str = "application/octet-stream";

/// Raw image chosen by the user
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Build an upload, sniffing the MIME type from the bytes
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::with_declared_type(file_name, None, bytes)
    }

    /// Build an upload; the sniffed type wins over what the browser declared
    ///
    /// A declared type only counts as its bare `type/subtype`; parameters are
    /// dropped and anything else falls back to `application/octet-stream`.
    pub fn with_declared_type(
        file_name: impl Into<String>,
        declared: Option<&str>,
        bytes: Vec<u8>,
    ) -> Self {
        let content_type = match sniff_mime(&bytes) {
            Some(sniffed) => sniffed.to_string(),
            None => declared
                .and_then(mime_essence)
                .unwrap_or_else(|| FALLBACK_MIME.to_string()),
        };

        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }

    /// Read an upload from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let declared = image::ImageFormat::from_path(path)
            .ok()
            .map(|f| f.to_mime_type());

        Ok(Self::with_declared_type(file_name, declared, bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Base64 data URL used as the preview image source
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|f| f.to_mime_type())
}

/// `type/subtype` of a Content-Type value, lowercased, if both halves are tokens
fn mime_essence(declared: &str) -> Option<String> {
    let essence = declared.split(';').next()?.trim();
    let (kind, subtype) = essence.split_once('/')?;

    let is_token = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "!#$&^_.+-".contains(c))
    };
    if !is_token(kind) || !is_token(subtype) {
        return None;
    }

    Some(essence.to_ascii_lowercase())
}

impl UploadConfig {
    /// Check a selection before it is previewed or sent
    pub fn check(&self, upload: &ImageUpload) -> Result<()> {
        if upload.is_empty() {
            return Err(ScanError::InvalidUpload(format!("{} is empty", upload.file_name)));
        }

        if upload.len() as u64 > self.max_bytes {
            return Err(ScanError::InvalidUpload(format!(
                "{} is {} bytes, limit is {}",
                upload.file_name,
                upload.len(),
                self.max_bytes
            )));
        }

        if self.require_image && sniff_mime(&upload.bytes).is_none() {
            return Err(ScanError::InvalidUpload("File must be an image".to_string()));
        }

        Ok(())
    }
}
