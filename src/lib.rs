// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! oralscan: upload an image, preview it, classify it remotely
//!
//! The [`controller::Controller`] drives the idle → scanning → result flow over
//! an injected [`ui::Surface`], asking a pluggable [`classifier::Classifier`]
//! for the verdict. The web UI and the CLI are thin front ends over it.

pub mod classifier;
pub mod config;
pub mod controller;
pub mod error;
pub mod ui;
pub mod upload;
pub mod web;

pub use config::AppConfig;
pub use controller::{Controller, Outcome, Phase};
pub use error::{Result, ScanError};
