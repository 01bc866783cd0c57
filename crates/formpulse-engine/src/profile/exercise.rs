//! Exercise profile: the immutable per-exercise configuration aggregate.

use formpulse_core::{Axis, LandmarkType};
use serde::{Deserialize, Serialize};

use crate::profile::FormRule;
use crate::EngineError;

/// Default minimum time between repetition fires, in milliseconds.
pub const DEFAULT_MIN_CYCLE_MS: f64 = 500.0;

/// Default range-of-motion requirement when `requires_full_range` is set.
pub const DEFAULT_MIN_RANGE_PERCENT: f32 = 40.0;

/// Movement pattern tag of an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementPattern {
    /// Knee-dominant lower body (squat, lunge)
    Squat,
    /// Hip-dominant lower body (hinge, bridge)
    Hinge,
    /// Upper-body push (push-up, dip)
    Push,
    /// Upper-body pull (pull-up, row)
    Pull,
    /// Isometric hold (plank, wall sit)
    Hold,
}

impl MovementPattern {
    /// Human-readable pattern name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Squat => "squat",
            Self::Hinge => "hinge",
            Self::Push => "push",
            Self::Pull => "pull",
            Self::Hold => "hold",
        }
    }
}

/// Camera placement the profile's thresholds were authored for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraView {
    /// Camera faces the subject
    Front,
    /// Camera sees the subject side-on
    Side,
    /// Thresholds tolerate either placement
    Any,
}

/// A movement-cycle stage.
///
/// Profiles declare which of these stages exist for their exercise and what
/// angle checks characterize each; the classifier only ever outputs declared
/// stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementPhase {
    /// Extended/start position
    Top,
    /// Lowering portion of the cycle
    Descending,
    /// Deepest position
    Bottom,
    /// Rising portion of the cycle
    Ascending,
    /// Isometric hold position
    Hold,
}

impl MovementPhase {
    /// Phase name as a string.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Descending => "descending",
            Self::Bottom => "bottom",
            Self::Ascending => "ascending",
            Self::Hold => "hold",
        }
    }
}

impl std::fmt::Display for MovementPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One angle criterion contributing to a phase's classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleCheck {
    /// Joint chain; the angle is measured at the middle landmark
    pub joint: [LandmarkType; 3],
    /// Minimum angle in degrees for the check to pass
    pub min_degrees: f32,
    /// Maximum angle in degrees for the check to pass
    pub max_degrees: f32,
}

/// A declared movement phase with its classification checks.
///
/// Declaration order matters: classification ties resolve to the earlier
/// phase, and a phase without checks can never be classified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSpec {
    /// The phase being declared
    pub phase: MovementPhase,
    /// Angle checks characterizing the phase
    pub checks: Vec<AngleCheck>,
}

/// The scalar signal driving the repetition counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum RepTrigger {
    /// Track a landmark's position along an axis
    AxisPosition {
        /// Landmark to track
        landmark: LandmarkType,
        /// Axis of the tracked coordinate
        axis: Axis,
    },
    /// Track a three-point joint angle in degrees
    JointAngle {
        /// Joint chain; the angle is measured at the middle landmark
        joint: [LandmarkType; 3],
    },
    /// Isometric hold: count elapsed seconds in the hold phase instead of reps
    HoldTimer {
        /// Phase whose confirmed occupancy accumulates hold time
        hold_phase: MovementPhase,
    },
}

/// Calorie estimation model supplied by the profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalorieModel {
    /// Kilocalories per completed repetition
    PerRep(f32),
    /// Kilocalories per minute of session time
    PerMinute(f32),
}

impl CalorieModel {
    /// Estimate kilocalories for a finished session.
    #[must_use]
    pub fn estimate(&self, total_reps: u32, duration_ms: f64) -> f32 {
        match self {
            Self::PerRep(kcal) => kcal * total_reps as f32,
            Self::PerMinute(kcal) => kcal * (duration_ms / 60_000.0) as f32,
        }
    }
}

/// Coaching text banks for locally generated cues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachingText {
    /// Motivation lines rotated at rep milestones
    pub motivation: Vec<String>,
    /// Emit a motivation cue every this many reps (0 disables)
    pub milestone_interval: u32,
}

impl Default for CoachingText {
    fn default() -> Self {
        Self {
            motivation: Vec::new(),
            milestone_interval: 0,
        }
    }
}

/// Immutable, validated per-exercise configuration.
///
/// Built declaratively (typically deserialized), then checked once with
/// [`ExerciseProfile::validate`] before entering a registry. The engine
/// treats a loaded profile as trusted and does no per-frame re-validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseProfile {
    /// Canonical exercise id (normalized form is the registry key)
    pub id: String,
    /// Display name for the presentation layer
    pub display_name: String,
    /// Movement pattern tag
    pub pattern: MovementPattern,
    /// Camera placement hint
    pub camera_view: CameraView,
    /// Landmarks that must be visible for a frame to be analyzed
    pub required_landmarks: Vec<LandmarkType>,
    /// Declared phases in declaration order (ties resolve to the earlier one)
    pub phases: Vec<PhaseSpec>,
    /// Phase the debouncer starts in
    pub start_phase: MovementPhase,
    /// Signal driving the repetition counter
    pub trigger: RepTrigger,
    /// Hysteresis arm threshold
    pub start_threshold: f32,
    /// Hysteresis fire threshold
    pub end_threshold: f32,
    /// Minimum time between fires, in milliseconds
    pub min_cycle_ms: f64,
    /// Require the configured range of motion before a rep may fire
    pub requires_full_range: bool,
    /// Range-of-motion requirement in percent, used with `requires_full_range`
    pub min_range_percent: f32,
    /// Ordered form rules
    pub rules: Vec<FormRule>,
    /// Coaching text banks
    pub coaching: CoachingText,
    /// Safety condition tags surfaced with critical cues
    pub safety_tags: Vec<String>,
    /// Calorie estimation model
    pub calories: CalorieModel,
}

impl ExerciseProfile {
    /// Validates the profile once at load time.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Profile`] when the profile cannot drive the
    /// engine: no declared phases, no phase with checks (nothing could ever
    /// be classified), coincident hysteresis thresholds, a non-positive
    /// cycle cooldown, a rule scoped to an undeclared phase, a hold trigger
    /// naming an undeclared phase, or an undeclared start phase.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.id.trim().is_empty() {
            return Err(EngineError::Profile("profile id is empty".into()));
        }
        if self.phases.is_empty() {
            return Err(EngineError::Profile(format!(
                "profile '{}' declares no phases",
                self.id
            )));
        }
        if self.phases.iter().all(|p| p.checks.is_empty()) {
            return Err(EngineError::Profile(format!(
                "profile '{}' has no phase with angle checks",
                self.id
            )));
        }
        if !self.declares_phase(self.start_phase) {
            return Err(EngineError::Profile(format!(
                "profile '{}' start phase '{}' is not declared",
                self.id, self.start_phase
            )));
        }
        if (self.start_threshold - self.end_threshold).abs() < f32::EPSILON {
            return Err(EngineError::Profile(format!(
                "profile '{}' start and end thresholds coincide at {}",
                self.id, self.start_threshold
            )));
        }
        if self.min_cycle_ms <= 0.0 {
            return Err(EngineError::Profile(format!(
                "profile '{}' min_cycle_ms must be positive, got {}",
                self.id, self.min_cycle_ms
            )));
        }
        for rule in &self.rules {
            if rule.phases.is_empty() {
                return Err(EngineError::Profile(format!(
                    "rule '{}' is scoped to no phases",
                    rule.id
                )));
            }
            for phase in &rule.phases {
                if !self.declares_phase(*phase) {
                    return Err(EngineError::Profile(format!(
                        "rule '{}' references undeclared phase '{phase}'",
                        rule.id
                    )));
                }
            }
        }
        if let RepTrigger::HoldTimer { hold_phase } = &self.trigger {
            if !self.declares_phase(*hold_phase) {
                return Err(EngineError::Profile(format!(
                    "profile '{}' hold phase '{hold_phase}' is not declared",
                    self.id
                )));
            }
        }
        if self.coaching.milestone_interval > 0 && self.coaching.motivation.is_empty() {
            return Err(EngineError::Profile(format!(
                "profile '{}' sets a milestone interval but has no motivation lines",
                self.id
            )));
        }
        Ok(())
    }

    /// Returns `true` if the profile declares the given phase.
    #[must_use]
    pub fn declares_phase(&self, phase: MovementPhase) -> bool {
        self.phases.iter().any(|p| p.phase == phase)
    }

    /// Returns `true` if this is a hold/isometric profile.
    #[must_use]
    pub fn is_hold(&self) -> bool {
        matches!(self.trigger, RepTrigger::HoldTimer { .. })
    }
}

/// Normalizes an exercise identifier for registry lookup.
///
/// Lookup is case- and separator-insensitive: `"Push-Up"`, `"push_up"`, and
/// `"PUSH UP"` all resolve to the same profile.
#[must_use]
pub fn normalize_exercise_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
