//! Declarative per-exercise configuration.
//!
//! An [`ExerciseProfile`] describes everything the engine needs to analyze
//! one exercise: the landmarks it must see, the movement phases and their
//! angle checks, the repetition trigger signal with its hysteresis
//! thresholds, the ordered form rules, coaching text banks, and a calorie
//! model. Profiles are validated once at load time and immutable afterwards;
//! nothing is re-checked on the per-frame path.

mod exercise;
mod registry;
mod rules;

pub use exercise::{
    normalize_exercise_id, AngleCheck, CalorieModel, CameraView, CoachingText, ExerciseProfile,
    MovementPattern, MovementPhase, PhaseSpec, RepTrigger,
};
pub use registry::ProfileRegistry;
pub use rules::{FormRule, Measurement, ReferenceLine, Severity};
