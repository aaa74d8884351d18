//! Integrity monitoring domain model.
//!
//! Client-observed focus/visibility/fullscreen signals used for
//! anti-cheat heuristics. The monitor only annotates; enforcement is a
//! human-review concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of client-observed integrity event. Wire names match the DOM
/// event names the client reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityEventKind {
    #[serde(rename = "visibilitychange")]
    VisibilityChange,
    Blur,
    Focus,
    #[serde(rename = "fullscreenchange")]
    FullscreenChange,
    TabSwitch,
    WindowResize,
}

impl IntegrityEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VisibilityChange => "visibilitychange",
            Self::Blur => "blur",
            Self::Focus => "focus",
            Self::FullscreenChange => "fullscreenchange",
            Self::TabSwitch => "tab_switch",
            Self::WindowResize => "window_resize",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "visibilitychange" => Some(Self::VisibilityChange),
            "blur" => Some(Self::Blur),
            "focus" => Some(Self::Focus),
            "fullscreenchange" => Some(Self::FullscreenChange),
            "tab_switch" => Some(Self::TabSwitch),
            "window_resize" => Some(Self::WindowResize),
            _ => None,
        }
    }
}

/// One integrity event as recorded in the append-only log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityEvent {
    #[serde(rename = "type")]
    pub kind: IntegrityEventKind,
    /// For `visibilitychange`: whether the page became visible
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    /// For `fullscreenchange`: whether fullscreen is now active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullscreen: Option<bool>,
    #[serde(default)]
    pub client_timestamp: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now")]
    pub server_timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

/// Running counters derived from the event log.
///
/// Counters are monotone non-decreasing until the assessment terminates,
/// and `suspicious_activity` never transitions true -> false within one
/// assessment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegritySummary {
    pub tab_switches: u32,
    pub focus_loss: u32,
    pub visibility_changes: u32,
    pub fullscreen_exits: u32,
    pub suspicious_activity: bool,
}

impl IntegritySummary {
    /// Fold one event into the counters and re-derive the suspicion flag.
    pub fn apply(&mut self, event: &IntegrityEvent) {
        match event.kind {
            IntegrityEventKind::VisibilityChange => {
                if event.visible == Some(false) {
                    self.tab_switches += 1;
                    self.visibility_changes += 1;
                }
            }
            IntegrityEventKind::Blur => self.focus_loss += 1,
            IntegrityEventKind::FullscreenChange => {
                if event.fullscreen == Some(false) {
                    self.fullscreen_exits += 1;
                }
            }
            IntegrityEventKind::TabSwitch => self.tab_switches += 1,
            IntegrityEventKind::Focus | IntegrityEventKind::WindowResize => {}
        }

        // Monotone: once suspicious, stays suspicious. The flag flips
        // on the 4th tab switch, the 5th focus loss, or the 2nd
        // fullscreen exit.
        self.suspicious_activity = self.suspicious_activity
            || self.tab_switches > 3
            || self.focus_loss >= 5
            || self.fullscreen_exits > 1;
    }
}
