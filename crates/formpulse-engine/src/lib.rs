//! # FormPulse Engine
//!
//! Real-time motion analysis for bodyweight exercise: repetition counting,
//! form scoring, session analytics, and rate-limited coaching cues.
//!
//! The engine consumes timestamped landmark [`Frame`]s from an external
//! pose-estimation provider and emits three result streams to its consumer:
//! discrete repetition counts, a continuous 0-100 form-quality score, and
//! throttled coaching cues. The exercise identity is supplied by the caller;
//! the engine never infers it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     formpulse-engine                     │
//! ├──────────────────────────────────────────────────────────┤
//! │  Frame ──▶ visibility gate                               │
//! │              │                                           │
//! │      ┌───────┴────────┐                                  │
//! │      ▼                ▼                                  │
//! │  ┌─────────────┐  ┌────────────┐                         │
//! │  │ Classifier  │  │ FormScorer │                         │
//! │  │ ▸ Debouncer │  └─────┬──────┘                         │
//! │  │ ▸ RepCounter│        │                                │
//! │  └──────┬──────┘        │                                │
//! │         └───────┬───────┘                                │
//! │                 ▼                                        │
//! │        ┌─────────────────┐     ┌────────────────────┐    │
//! │        │ SessionAnalytics│ ──▶ │ CoachingDispatcher │──▶ observers
//! │        └─────────────────┘     └────────────────────┘    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use formpulse_core::Frame;
//! use formpulse_engine::{EngineConfig, MotionEngine, ProfileRegistry};
//!
//! let registry = ProfileRegistry::with_builtins();
//! let mut engine = MotionEngine::for_exercise(&registry, "Body-Weight Squat", EngineConfig::default())
//!     .expect("squat is a built-in profile");
//!
//! engine.start();
//! engine.process_frame(&Frame::new(0.0));
//! let summary = engine.stop();
//! assert!(summary.is_some());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![forbid(unsafe_code)]

pub mod analysis;
pub mod coaching;
pub mod engine;
pub mod profile;
pub mod session;

// Re-export main types
pub use analysis::{
    FormMetrics, FormScorer, FormViolation, PhaseClassifier, PhaseDebouncer, PhaseEstimate,
    PhaseTransition, RepCounter, RepEvent,
};
pub use coaching::{
    CoachingCue, CoachingDispatcher, CoachingRequest, CoachingService, CueCategory, CueUrgency,
    DispatcherConfig, RuleBasedCoachingService,
};
pub use engine::{EngineConfig, EngineConfigBuilder, EngineObserver, EngineState, MotionEngine};
pub use profile::{
    normalize_exercise_id, AngleCheck, CalorieModel, CameraView, CoachingText, ExerciseProfile,
    FormRule, Measurement, MovementPattern, MovementPhase, PhaseSpec, ProfileRegistry,
    ReferenceLine, RepTrigger, Severity,
};
pub use session::{RepRecord, SessionAnalytics, SessionSummary};

// Core types the engine's public API speaks in
pub use formpulse_core::{Axis, Confidence, Frame, Landmark, LandmarkType};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Unified error type for engine operations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Exercise profile failed load-time validation
    #[error("Profile error: {0}")]
    Profile(String),

    /// Coaching-service boundary failure (logged and suppressed at the dispatcher)
    #[error("Coaching error: {0}")]
    Coaching(String),

    /// Core type validation failure
    #[error("Core error: {0}")]
    Core(#[from] formpulse_core::CoreError),
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        // Engine
        EngineConfig, EngineError, EngineObserver, MotionEngine, Result,
        // Profiles
        ExerciseProfile, MovementPattern, MovementPhase, ProfileRegistry, RepTrigger, Severity,
        // Analysis
        FormMetrics, FormViolation, RepEvent,
        // Session
        SessionAnalytics, SessionSummary,
        // Coaching
        CoachingCue, CoachingService, CueCategory, CueUrgency,
    };
    pub use formpulse_core::prelude::*;
}
