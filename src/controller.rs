// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Upload → analyze → display flow

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::classifier::{Classification, Classifier, Verdict};
use crate::config::UploadConfig;
use crate::ui::{Element, Style, Surface, TextSlot};
use crate::upload::ImageUpload;
use crate::{Result, ScanError};

/// Notification raised when the classifier cannot be reached
pub const CONNECTION_ERROR: &str =
    "Error: Could not connect to the AI Server.\nMake sure the inference server is running!";

/// Where the flow currently is; a failed analysis goes straight back to `Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Scanning,
    Result,
}

/// How one selection ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The classification is on screen
    Displayed(Classification),
    /// The provider failed; the user was notified and the UI reset
    Failed(String),
    /// The upload policy refused the file; the user was notified
    Rejected(String),
    /// A newer selection or a reset happened first; nothing was shown
    Superseded,
}

struct Inner<S> {
    surface: S,
    phase: Phase,
}

/// Owns the surface and the classifier and moves the UI between phases
///
/// Every call takes `&self`, so the controller can sit in an `Arc` shared by
/// request handlers and background analysis tasks. The surface lock is never
/// held while the classifier runs.
pub struct Controller<S: Surface> {
    inner: Mutex<Inner<S>>,
    classifier: Arc<dyn Classifier>,
    policy: UploadConfig,
    generation: AtomicU64,
}

impl<S: Surface> Controller<S> {
    pub fn new(surface: S, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                surface,
                phase: Phase::Idle,
            }),
            classifier,
            policy: UploadConfig::default(),
            generation: AtomicU64::new(0),
        }
    }

    /// Replace the default upload checks
    pub fn with_policy(mut self, policy: UploadConfig) -> Self {
        self.policy = policy;
        self
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub async fn phase(&self) -> Phase {
        self.inner.lock().await.phase
    }

    /// Run `f` against the surface under the lock
    pub async fn with_surface<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut inner = self.inner.lock().await;
        f(&mut inner.surface)
    }

    pub async fn snapshot(&self) -> S
    where
        S: Clone,
    {
        self.inner.lock().await.surface.clone()
    }

    /// Accept a new selection: preview it, then analyze it
    pub async fn select_file(&self, upload: ImageUpload) -> Outcome {
        match self.stage(&upload).await {
            Ok(ticket) => {
                let outcome = self.classifier.classify(&upload).await;
                self.finish(ticket, outcome).await
            }
            Err(rejected) => rejected,
        }
    }

    /// Check and preview `upload`, then enter scanning; returns the request ticket
    async fn stage(&self, upload: &ImageUpload) -> std::result::Result<u64, Outcome> {
        let mut inner = self.inner.lock().await;

        if let Err(e) = self.policy.check(upload) {
            warn!("Rejected {}: {}", upload.file_name, e);
            return Err(self.reject_locked(&mut inner, e.to_string()));
        }

        inner.surface.set_selection(Some((&upload.file_name, upload.data_url())));
        Ok(self.begin_scan(&mut inner, upload))
    }

    /// Show the scanning state and ask the classifier about `upload`
    pub async fn analyze(&self, upload: &ImageUpload) -> Outcome {
        let ticket = {
            let mut inner = self.inner.lock().await;
            self.begin_scan(&mut inner, upload)
        };

        let outcome = self.classifier.classify(upload).await;
        self.finish(ticket, outcome).await
    }

    /// Replace whatever result is on screen with `result`
    pub async fn display_result(&self, result: &Classification) {
        let mut inner = self.inner.lock().await;
        Self::apply_result(&mut inner, result);
    }

    /// Refuse a selection that never made it to [`Controller::select_file`],
    /// e.g. a request body the web layer gave up reading
    pub async fn reject(&self, message: impl Into<String>) -> Outcome {
        let message = message.into();
        warn!("Rejected upload: {}", message);
        let mut inner = self.inner.lock().await;
        self.reject_locked(&mut inner, message)
    }

    /// Back to the first-load state; any in-flight answer is dropped
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        self.reset_locked(&mut inner);
    }

    fn begin_scan(&self, inner: &mut Inner<S>, upload: &ImageUpload) -> u64 {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            "Analyzing {} ({} bytes) with {} [request {}]",
            upload.file_name,
            upload.len(),
            self.classifier.name(),
            ticket
        );

        let surface = &mut inner.surface;
        surface.set_visible(Element::UploadBox, false);
        surface.set_visible(Element::PreviewBox, true);
        surface.set_visible(Element::IntroText, false);
        surface.set_visible(Element::AnalysisPanel, true);
        surface.set_visible(Element::ScannerOverlay, true);
        surface.set_visible(Element::LoadingState, true);
        surface.set_visible(Element::ResultState, false);
        inner.phase = Phase::Scanning;

        ticket
    }

    async fn finish(&self, ticket: u64, outcome: Result<Classification>) -> Outcome {
        let mut inner = self.inner.lock().await;

        if self.generation.load(Ordering::SeqCst) != ticket {
            debug!("Dropping stale response for request {}", ticket);
            return Outcome::Superseded;
        }

        match outcome {
            Ok(result) => {
                info!("Result: {} ({})", result.verdict(), result.confidence_text());
                Self::apply_result(&mut inner, &result);
                Outcome::Displayed(result)
            }
            Err(ScanError::InvalidUpload(reason)) => {
                warn!("Classifier refused the upload: {}", reason);
                self.reject_locked(&mut inner, reason)
            }
            Err(e) => {
                error!("Analysis failed: {}", e);
                inner.surface.alert(CONNECTION_ERROR);
                self.reset_locked(&mut inner);
                Outcome::Failed(e.to_string())
            }
        }
    }

    fn apply_result(inner: &mut Inner<S>, result: &Classification) {
        let surface = &mut inner.surface;
        surface.set_visible(Element::ScannerOverlay, false);
        surface.set_visible(Element::LoadingState, false);
        surface.set_visible(Element::ResultState, true);

        surface.remove_style(Style::Danger);
        surface.remove_style(Style::Safe);

        let verdict = result.verdict();
        surface.add_style(match verdict {
            Verdict::Positive => Style::Danger,
            Verdict::Negative => Style::Safe,
        });
        surface.set_text(TextSlot::ResultTitle, verdict.title());
        surface.set_text(TextSlot::ResultDesc, verdict.description());
        surface.set_text(TextSlot::ConfidenceValue, &result.confidence_text());

        inner.phase = Phase::Result;
    }

    fn reject_locked(&self, inner: &mut Inner<S>, message: String) -> Outcome {
        inner.surface.alert(&message);
        self.reset_locked(inner);
        Outcome::Rejected(message)
    }

    fn reset_locked(&self, inner: &mut Inner<S>) {
        self.generation.fetch_add(1, Ordering::SeqCst);

        let surface = &mut inner.surface;
        surface.set_selection(None);
        surface.set_visible(Element::PreviewBox, false);
        surface.set_visible(Element::UploadBox, true);
        surface.set_visible(Element::AnalysisPanel, false);
        surface.set_visible(Element::IntroText, true);
        surface.set_visible(Element::ScannerOverlay, false);
        surface.set_visible(Element::LoadingState, false);
        surface.set_visible(Element::ResultState, false);

        surface.remove_style(Style::Danger);
        surface.remove_style(Style::Safe);
        surface.set_text(TextSlot::ResultTitle, "");
        surface.set_text(TextSlot::ResultDesc, "");
        surface.set_text(TextSlot::ConfidenceValue, "");

        inner.phase = Phase::Idle;
    }
}

impl<S: Surface + 'static> Controller<S> {
    /// Like [`Controller::select_file`], but only the classifier call runs in
    /// the background; the preview and scanning state are on screen when this
    /// returns. `None` means the upload was rejected.
    pub async fn submit(self: &Arc<Self>, upload: ImageUpload) -> Option<JoinHandle<Outcome>> {
        let ticket = self.stage(&upload).await.ok()?;
        let controller = Arc::clone(self);

        Some(tokio::spawn(async move {
            let outcome = controller.classifier.classify(&upload).await;
            controller.finish(ticket, outcome).await
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::{Screen, ViewState};
    use crate::upload::tests::png_bytes;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    /// Returns the same answer every time
    struct Fixed(std::result::Result<Classification, String>);

    #[async_trait]
    impl Classifier for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn classify(&self, _upload: &ImageUpload) -> Result<Classification> {
            self.0.clone().map_err(ScanError::Server)
        }
    }

    /// First call blocks until released; later calls answer at once
    struct Gated {
        calls: AtomicUsize,
        first_started: Notify,
        release: Notify,
        first: Classification,
        rest: Classification,
    }

    #[async_trait]
    impl Classifier for Gated {
        fn name(&self) -> &'static str {
            "gated"
        }

        async fn classify(&self, _upload: &ImageUpload) -> Result<Classification> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.first_started.notify_one();
                self.release.notified().await;
                Ok(self.first.clone())
            } else {
                Ok(self.rest.clone())
            }
        }
    }

    /// Refuses every upload the way the remote provider does for a bad MIME type
    struct Refusing;

    #[async_trait]
    impl Classifier for Refusing {
        fn name(&self) -> &'static str {
            "refusing"
        }

        async fn classify(&self, upload: &ImageUpload) -> Result<Classification> {
            Err(ScanError::InvalidUpload(format!("{} has no usable MIME type", upload.file_name)))
        }
    }

    fn controller(answer: std::result::Result<Classification, String>) -> Controller<ViewState> {
        Controller::new(ViewState::new(), Arc::new(Fixed(answer)))
    }

    fn image() -> ImageUpload {
        ImageUpload::new("mouth.png", png_bytes())
    }

    #[tokio::test]
    async fn test_positive_response_is_danger() {
        let c = controller(Ok(Classification::new("Cancer Positive", 98.5)));
        let outcome = c.select_file(image()).await;
        assert!(matches!(outcome, Outcome::Displayed(_)));

        let view = c.snapshot().await;
        assert_eq!(view.screen.result_title, "POSITIVE");
        assert_eq!(view.screen.confidence_value, "98.5%");
        assert!(view.screen.is_danger);
        assert!(!view.screen.is_safe);
        assert!(view.screen.visible.result_state);
        assert!(!view.screen.visible.loading_state);
        assert!(!view.screen.visible.scanner_overlay);
        assert!(view.screen.preview.as_deref().unwrap().starts_with("data:image/png;base64,"));
        assert_eq!(c.phase().await, Phase::Result);
    }

    #[tokio::test]
    async fn test_negative_response_is_safe() {
        let c = controller(Ok(Classification::new("Negative", 91.2)));
        c.select_file(image()).await;

        let view = c.snapshot().await;
        assert_eq!(view.screen.result_title, "NEGATIVE");
        assert_eq!(view.screen.result_desc, Verdict::Negative.description());
        assert_eq!(view.screen.confidence_value, "91.2%");
        assert!(view.screen.is_safe);
        assert!(!view.screen.is_danger);
    }

    #[tokio::test]
    async fn test_new_result_clears_previous_style() {
        let c = controller(Ok(Classification::new("Negative", 91.2)));
        c.display_result(&Classification::new("cancer POSITIVE", 70.0)).await;
        c.display_result(&Classification::new("Cancer Negative", 88.0)).await;

        let view = c.snapshot().await;
        assert!(view.screen.is_safe);
        assert!(!view.screen.is_danger);
        assert_eq!(view.screen.confidence_value, "88%");

        c.display_result(&Classification::new("Positive", 51.25)).await;
        let view = c.snapshot().await;
        assert!(view.screen.is_danger);
        assert!(!view.screen.is_safe);
        assert_eq!(view.screen.confidence_value, "51.25%");
    }

    #[tokio::test]
    async fn test_failure_alerts_once_and_returns_to_idle() {
        let c = controller(Err("Internal Server Error".to_string()));
        let initial = c.snapshot().await.screen;

        let outcome = c.select_file(image()).await;
        assert!(matches!(outcome, Outcome::Failed(_)));

        let mut view = c.snapshot().await;
        assert_eq!(view.screen, initial);
        assert_eq!(view.take_alerts(), vec![CONNECTION_ERROR.to_string()]);
        assert_eq!(c.phase().await, Phase::Idle);
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let c = controller(Ok(Classification::new("Cancer Positive", 98.5)));
        c.select_file(image()).await;

        c.reset().await;
        let once = c.snapshot().await.screen;
        c.reset().await;
        let twice = c.snapshot().await.screen;

        assert_eq!(once, twice);
        assert_eq!(once, Screen::default());
    }

    #[tokio::test]
    async fn test_rejected_upload_stays_idle() {
        let c = controller(Ok(Classification::new("Cancer Positive", 98.5)));
        let outcome = c.select_file(ImageUpload::new("notes.txt", b"hello".to_vec())).await;
        assert!(matches!(outcome, Outcome::Rejected(_)));

        let mut view = c.snapshot().await;
        assert_eq!(view.screen, Screen::default());
        assert_eq!(view.take_alerts().len(), 1);
    }

    #[tokio::test]
    async fn test_classifier_refusal_is_a_rejection() {
        let c = Controller::new(ViewState::new(), Arc::new(Refusing));
        let outcome = c.select_file(image()).await;
        assert_eq!(
            outcome,
            Outcome::Rejected("mouth.png has no usable MIME type".to_string())
        );

        let mut view = c.snapshot().await;
        assert_eq!(view.screen, Screen::default());
        assert_eq!(view.take_alerts(), vec!["mouth.png has no usable MIME type".to_string()]);
        assert_eq!(c.phase().await, Phase::Idle);
    }

    #[tokio::test]
    async fn test_reject_clears_a_displayed_result() {
        let c = controller(Ok(Classification::new("Cancer Positive", 98.5)));
        c.select_file(image()).await;

        let outcome = c.reject("too large").await;
        assert_eq!(outcome, Outcome::Rejected("too large".to_string()));

        let mut view = c.snapshot().await;
        assert_eq!(view.screen, Screen::default());
        assert_eq!(view.take_alerts(), vec!["too large".to_string()]);
    }

    #[tokio::test]
    async fn test_custom_policy_allows_non_images() {
        let c = controller(Ok(Classification::new("Negative", 60.0)))
            .with_policy(UploadConfig { require_image: false, ..UploadConfig::default() });
        let outcome = c.select_file(ImageUpload::new("notes.txt", b"hello".to_vec())).await;
        assert!(matches!(outcome, Outcome::Displayed(_)));
    }

    #[tokio::test]
    async fn test_flow_restarts_after_result() {
        let c = controller(Ok(Classification::new("Negative", 91.2)));
        c.select_file(image()).await;
        c.select_file(ImageUpload::new("second.png", png_bytes())).await;

        let view = c.snapshot().await;
        assert_eq!(view.screen.file_name.as_deref(), Some("second.png"));
        assert!(view.alerts.is_empty());
    }

    #[tokio::test]
    async fn test_stale_response_is_dropped() {
        let classifier = Arc::new(Gated {
            calls: AtomicUsize::new(0),
            first_started: Notify::new(),
            release: Notify::new(),
            first: Classification::new("Cancer Positive", 99.0),
            rest: Classification::new("Cancer Negative", 91.2),
        });
        let c = Arc::new(Controller::new(ViewState::new(), classifier.clone()));

        let slow = tokio::spawn({
            let c = c.clone();
            async move { c.select_file(ImageUpload::new("first.png", png_bytes())).await }
        });
        classifier.first_started.notified().await;
        assert_eq!(c.phase().await, Phase::Scanning);

        let fast = c.select_file(ImageUpload::new("second.png", png_bytes())).await;
        assert!(matches!(fast, Outcome::Displayed(_)));

        classifier.release.notify_one();
        assert_eq!(slow.await.unwrap(), Outcome::Superseded);

        let view = c.snapshot().await;
        assert_eq!(view.screen.result_title, "NEGATIVE");
        assert_eq!(view.screen.file_name.as_deref(), Some("second.png"));
        assert!(!view.screen.is_danger);
    }

    #[tokio::test]
    async fn test_reset_drops_in_flight_response() {
        let classifier = Arc::new(Gated {
            calls: AtomicUsize::new(0),
            first_started: Notify::new(),
            release: Notify::new(),
            first: Classification::new("Cancer Positive", 99.0),
            rest: Classification::new("Cancer Negative", 91.2),
        });
        let c = Arc::new(Controller::new(ViewState::new(), classifier.clone()));

        let pending = tokio::spawn({
            let c = c.clone();
            async move { c.analyze(&image()).await }
        });
        classifier.first_started.notified().await;

        c.reset().await;
        classifier.release.notify_one();
        assert_eq!(pending.await.unwrap(), Outcome::Superseded);
        assert_eq!(c.snapshot().await.screen, Screen::default());
    }

    #[tokio::test]
    async fn test_submit_shows_scanning_before_returning() {
        let classifier = Arc::new(Gated {
            calls: AtomicUsize::new(0),
            first_started: Notify::new(),
            release: Notify::new(),
            first: Classification::new("Cancer Positive", 98.5),
            rest: Classification::new("Cancer Negative", 91.2),
        });
        let c = Arc::new(Controller::new(ViewState::new(), classifier.clone()));

        let handle = c.submit(image()).await.expect("accepted");
        let view = c.snapshot().await;
        assert!(view.screen.visible.scanner_overlay);
        assert!(view.screen.visible.preview_box);
        assert!(!view.screen.visible.upload_box);

        classifier.release.notify_one();
        assert!(matches!(handle.await.unwrap(), Outcome::Displayed(_)));
        assert_eq!(c.phase().await, Phase::Result);

        assert!(c.submit(ImageUpload::new("empty.png", Vec::new())).await.is_none());
    }
}
