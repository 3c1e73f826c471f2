// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Display surface the controller drives
//!
//! [`Surface`] names every element the flow touches, so a controller never
//! looks anything up on its own. [`ViewState`] is the in-memory surface used
//! by the web page, the CLI and the tests.

use serde::Serialize;

/// Elements that are shown or hidden as a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    UploadBox,
    PreviewBox,
    ScannerOverlay,
    IntroText,
    AnalysisPanel,
    LoadingState,
    ResultState,
}

/// Elements whose text is rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSlot {
    ResultTitle,
    ResultDesc,
    ConfidenceValue,
}

/// Style flags on the result container; at most one is set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Danger,
    Safe,
}

impl Style {
    pub fn css_class(&self) -> &'static str {
        match self {
            Style::Danger => "is-danger",
            Style::Safe => "is-safe",
        }
    }
}

/// Mutable display handed to a controller at construction
pub trait Surface: Send + Sync {
    fn set_visible(&mut self, element: Element, visible: bool);

    fn set_text(&mut self, slot: TextSlot, text: &str);

    fn add_style(&mut self, style: Style);

    fn remove_style(&mut self, style: Style);

    /// Selected file name and preview source; `None` clears both
    fn set_selection(&mut self, selection: Option<(&str, String)>);

    /// Blocking user-facing notification
    fn alert(&mut self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Visibility {
    pub upload_box: bool,
    pub preview_box: bool,
    pub scanner_overlay: bool,
    pub intro_text: bool,
    pub analysis_panel: bool,
    pub loading_state: bool,
    pub result_state: bool,
}

impl Visibility {
    /// What the page shows on first load
    pub fn idle() -> Self {
        Self {
            upload_box: true,
            preview_box: false,
            scanner_overlay: false,
            intro_text: true,
            analysis_panel: false,
            loading_state: false,
            result_state: false,
        }
    }

    fn slot(&mut self, element: Element) -> &mut bool {
        match element {
            Element::UploadBox => &mut self.upload_box,
            Element::PreviewBox => &mut self.preview_box,
            Element::ScannerOverlay => &mut self.scanner_overlay,
            Element::IntroText => &mut self.intro_text,
            Element::AnalysisPanel => &mut self.analysis_panel,
            Element::LoadingState => &mut self.loading_state,
            Element::ResultState => &mut self.result_state,
        }
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Self::idle()
    }
}

/// Everything the user can see
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Screen {
    pub visible: Visibility,
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    pub result_title: String,
    pub result_desc: String,
    pub confidence_value: String,
    pub is_danger: bool,
    pub is_safe: bool,
}

/// In-memory surface: the screen plus notifications not yet delivered
#[derive(Debug, Clone, Default, Serialize)]
pub struct ViewState {
    pub screen: Screen,
    pub alerts: Vec<String>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand pending notifications to whoever shows them
    pub fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alerts)
    }

    pub fn style(&self) -> Option<Style> {
        match (self.screen.is_danger, self.screen.is_safe) {
            (true, false) => Some(Style::Danger),
            (false, true) => Some(Style::Safe),
            _ => None,
        }
    }
}

impl Surface for ViewState {
    fn set_visible(&mut self, element: Element, visible: bool) {
        *self.screen.visible.slot(element) = visible;
    }

    fn set_text(&mut self, slot: TextSlot, text: &str) {
        let target = match slot {
            TextSlot::ResultTitle => &mut self.screen.result_title,
            TextSlot::ResultDesc => &mut self.screen.result_desc,
            TextSlot::ConfidenceValue => &mut self.screen.confidence_value,
        };
        text.clone_into(target);
    }

    fn add_style(&mut self, style: Style) {
        match style {
            Style::Danger => self.screen.is_danger = true,
            Style::Safe => self.screen.is_safe = true,
        }
    }

    fn remove_style(&mut self, style: Style) {
        match style {
            Style::Danger => self.screen.is_danger = false,
            Style::Safe => self.screen.is_safe = false,
        }
    }

    fn set_selection(&mut self, selection: Option<(&str, String)>) {
        match selection {
            Some((name, preview)) => {
                self.screen.file_name = Some(name.to_string());
                self.screen.preview = Some(preview);
            }
            None => {
                self.screen.file_name = None;
                self.screen.preview = None;
            }
        }
    }

    fn alert(&mut self, message: &str) {
        tracing::debug!("Alert: {}", message);
        self.alerts.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_screen_is_idle() {
        let view = ViewState::new();
        assert_eq!(view.screen.visible, Visibility::idle());
        assert!(view.screen.preview.is_none());
        assert_eq!(view.style(), None);
    }

    #[test]
    fn test_surface_mutations() {
        let mut view = ViewState::new();
        view.set_visible(Element::AnalysisPanel, true);
        view.set_text(TextSlot::ConfidenceValue, "12%");
        view.add_style(Style::Safe);
        view.set_selection(Some(("a.png", "data:image/png;base64,AA==".to_string())));

        assert!(view.screen.visible.analysis_panel);
        assert_eq!(view.screen.confidence_value, "12%");
        assert_eq!(view.style(), Some(Style::Safe));
        assert_eq!(view.screen.file_name.as_deref(), Some("a.png"));

        view.remove_style(Style::Safe);
        view.set_selection(None);
        assert_eq!(view.style(), None);
        assert!(view.screen.preview.is_none());
    }

    #[test]
    fn test_alerts_drain_once() {
        let mut view = ViewState::new();
        view.alert("boom");
        assert_eq!(view.take_alerts(), vec!["boom".to_string()]);
        assert!(view.take_alerts().is_empty());
    }
}
