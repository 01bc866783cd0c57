//! Coaching cues and their rate-limited dispatch.
//!
//! Cues reach the user through two paths: locally generated safety, form,
//! and motivation cues, and an optional external natural-language coaching
//! service consulted through the [`CoachingService`] trait. The
//! [`CoachingDispatcher`] throttles both paths so the user is coached, not
//! spammed.

mod dispatcher;
mod service;

pub use dispatcher::{CoachingDispatcher, DispatcherConfig};
pub use service::{CoachingRequest, CoachingService, RuleBasedCoachingService};

use serde::{Deserialize, Serialize};

use crate::profile::Severity;

/// Default on-screen display duration for a cue, in milliseconds.
pub const DEFAULT_CUE_DISPLAY_MS: f64 = 3000.0;

/// What kind of guidance a cue carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CueCategory {
    /// Injury-risk condition; rendered assertively
    Safety,
    /// Technique correction
    Form,
    /// Encouragement and milestones
    Motivation,
}

/// How urgently the presentation layer should render a cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CueUrgency {
    /// Render immediately and assertively (e.g. stronger haptics)
    Critical = 1,
    /// Render promptly
    High = 2,
    /// Render when convenient
    Normal = 3,
}

impl CueUrgency {
    /// Maps rule severity to cue urgency.
    #[must_use]
    pub fn from_severity(severity: Severity) -> Self {
        match severity {
            Severity::Critical => Self::Critical,
            Severity::Warning => Self::High,
            Severity::Info => Self::Normal,
        }
    }
}

/// A short coaching message surfaced to the end user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachingCue {
    /// Message text
    pub message: String,
    /// Guidance category
    pub category: CueCategory,
    /// Rendering urgency
    pub urgency: CueUrgency,
    /// Frame timestamp the cue was generated at, in milliseconds
    pub timestamp_ms: f64,
    /// Suggested display duration, in milliseconds
    pub display_ms: f64,
}

impl CoachingCue {
    /// Creates a cue with the default display duration.
    #[must_use]
    pub fn new(
        message: impl Into<String>,
        category: CueCategory,
        urgency: CueUrgency,
        timestamp_ms: f64,
    ) -> Self {
        Self {
            message: message.into(),
            category,
            urgency,
            timestamp_ms,
            display_ms: DEFAULT_CUE_DISPLAY_MS,
        }
    }

    /// Overrides the display duration.
    #[must_use]
    pub fn with_display_ms(mut self, display_ms: f64) -> Self {
        self.display_ms = display_ms;
        self
    }
}
