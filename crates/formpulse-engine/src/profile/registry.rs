//! Profile registry with normalized-id resolution.

use std::collections::HashMap;
use std::sync::Arc;

use formpulse_core::{Axis, LandmarkType};

use crate::profile::{
    normalize_exercise_id, AngleCheck, CalorieModel, CameraView, CoachingText, ExerciseProfile,
    FormRule, Measurement, MovementPattern, MovementPhase, PhaseSpec, ReferenceLine, RepTrigger,
    Severity, exercise::DEFAULT_MIN_CYCLE_MS, exercise::DEFAULT_MIN_RANGE_PERCENT,
};
use crate::EngineError;

/// Registry of validated exercise profiles, keyed by normalized id.
///
/// A lookup miss is a supported outcome ("unsupported for this exercise"),
/// not an error: the caller is expected to fall back to a manual mode.
#[derive(Debug, Default)]
pub struct ProfileRegistry {
    profiles: HashMap<String, Arc<ExerciseProfile>>,
}

impl ProfileRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-loaded with the built-in profiles
    /// (squat, push-up, plank).
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for profile in [builtin_squat(), builtin_pushup(), builtin_plank()] {
            registry
                .register(profile)
                .expect("built-in profiles are valid");
        }
        registry
    }

    /// Registers a profile after validating it.
    ///
    /// Re-registering an id replaces the previous profile.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Profile`] if the profile fails validation.
    pub fn register(&mut self, profile: ExerciseProfile) -> Result<(), EngineError> {
        profile.validate()?;
        let key = normalize_exercise_id(&profile.id);
        tracing::debug!(exercise = %profile.id, key = %key, "Registered exercise profile");
        self.profiles.insert(key, Arc::new(profile));
        Ok(())
    }

    /// Resolves a profile by exercise id, case- and separator-insensitively.
    ///
    /// Returns `None` for unsupported exercises.
    #[must_use]
    pub fn resolve(&self, exercise_id: &str) -> Option<Arc<ExerciseProfile>> {
        self.profiles
            .get(&normalize_exercise_id(exercise_id))
            .cloned()
    }

    /// Returns `true` if the exercise is supported.
    #[must_use]
    pub fn supports(&self, exercise_id: &str) -> bool {
        self.profiles
            .contains_key(&normalize_exercise_id(exercise_id))
    }

    /// Number of registered profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns `true` if no profiles are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Built-in bodyweight squat profile (side view).
///
/// The rep signal is the knee flexion angle: arming at or below 100° and
/// firing on return past 160° of extension.
fn builtin_squat() -> ExerciseProfile {
    let knee = [
        LandmarkType::LeftHip,
        LandmarkType::LeftKnee,
        LandmarkType::LeftAnkle,
    ];
    ExerciseProfile {
        id: "bodyweight_squat".into(),
        display_name: "Bodyweight Squat".into(),
        pattern: MovementPattern::Squat,
        camera_view: CameraView::Side,
        required_landmarks: vec![
            LandmarkType::LeftShoulder,
            LandmarkType::LeftHip,
            LandmarkType::LeftKnee,
            LandmarkType::LeftAnkle,
        ],
        phases: vec![
            PhaseSpec {
                phase: MovementPhase::Top,
                checks: vec![AngleCheck {
                    joint: knee,
                    min_degrees: 160.0,
                    max_degrees: 180.0,
                }],
            },
            PhaseSpec {
                phase: MovementPhase::Descending,
                checks: vec![AngleCheck {
                    joint: knee,
                    min_degrees: 100.0,
                    max_degrees: 160.0,
                }],
            },
            PhaseSpec {
                phase: MovementPhase::Bottom,
                checks: vec![AngleCheck {
                    joint: knee,
                    min_degrees: 40.0,
                    max_degrees: 100.0,
                }],
            },
        ],
        start_phase: MovementPhase::Top,
        trigger: RepTrigger::JointAngle { joint: knee },
        start_threshold: 100.0,
        end_threshold: 160.0,
        min_cycle_ms: DEFAULT_MIN_CYCLE_MS,
        requires_full_range: true,
        min_range_percent: DEFAULT_MIN_RANGE_PERCENT,
        rules: vec![
            FormRule {
                id: "knee_over_ankle".into(),
                severity: Severity::Critical,
                phases: vec![MovementPhase::Descending, MovementPhase::Bottom],
                measurement: Measurement::Alignment {
                    points: vec![LandmarkType::LeftKnee],
                    reference: ReferenceLine::Vertical(LandmarkType::LeftAnkle),
                    tolerance: 0.08,
                },
                violation_text: "Knee is drifting past your toes".into(),
                correction_text: "Sit back into your hips and keep the knee stacked over the ankle"
                    .into(),
            },
            FormRule {
                id: "torso_lean".into(),
                severity: Severity::Warning,
                phases: vec![
                    MovementPhase::Top,
                    MovementPhase::Descending,
                    MovementPhase::Bottom,
                ],
                measurement: Measurement::Alignment {
                    points: vec![LandmarkType::LeftShoulder],
                    reference: ReferenceLine::Vertical(LandmarkType::LeftHip),
                    tolerance: 0.12,
                },
                violation_text: "Torso is folding forward".into(),
                correction_text: "Lift your chest and keep your back neutral".into(),
            },
            FormRule {
                id: "descent_control".into(),
                severity: Severity::Warning,
                phases: vec![MovementPhase::Descending],
                measurement: Measurement::Velocity {
                    landmark: LandmarkType::LeftHip,
                    max_speed: 1.2,
                },
                violation_text: "Dropping too fast".into(),
                correction_text: "Lower under control, about two seconds down".into(),
            },
        ],
        coaching: CoachingText {
            motivation: vec![
                "Strong set, keep that depth coming".into(),
                "Great pace, stay tall through the chest".into(),
                "Halfway there, drive through the heels".into(),
            ],
            milestone_interval: 5,
        },
        safety_tags: vec!["knee_valgus".into()],
        calories: CalorieModel::PerRep(0.32),
    }
}

/// Built-in push-up profile (side view).
///
/// The rep signal is the elbow flexion angle: arming at or below 100° and
/// firing on return past 150° of extension.
fn builtin_pushup() -> ExerciseProfile {
    let elbow = [
        LandmarkType::LeftShoulder,
        LandmarkType::LeftElbow,
        LandmarkType::LeftWrist,
    ];
    ExerciseProfile {
        id: "push_up".into(),
        display_name: "Push-Up".into(),
        pattern: MovementPattern::Push,
        camera_view: CameraView::Side,
        required_landmarks: vec![
            LandmarkType::LeftShoulder,
            LandmarkType::LeftElbow,
            LandmarkType::LeftWrist,
            LandmarkType::LeftHip,
            LandmarkType::LeftAnkle,
        ],
        phases: vec![
            PhaseSpec {
                phase: MovementPhase::Top,
                checks: vec![AngleCheck {
                    joint: elbow,
                    min_degrees: 150.0,
                    max_degrees: 180.0,
                }],
            },
            PhaseSpec {
                phase: MovementPhase::Descending,
                checks: vec![AngleCheck {
                    joint: elbow,
                    min_degrees: 100.0,
                    max_degrees: 150.0,
                }],
            },
            PhaseSpec {
                phase: MovementPhase::Bottom,
                checks: vec![AngleCheck {
                    joint: elbow,
                    min_degrees: 30.0,
                    max_degrees: 100.0,
                }],
            },
        ],
        start_phase: MovementPhase::Top,
        trigger: RepTrigger::JointAngle { joint: elbow },
        start_threshold: 100.0,
        end_threshold: 150.0,
        min_cycle_ms: DEFAULT_MIN_CYCLE_MS,
        requires_full_range: true,
        min_range_percent: DEFAULT_MIN_RANGE_PERCENT,
        rules: vec![
            FormRule {
                id: "hip_sag".into(),
                severity: Severity::Critical,
                phases: vec![
                    MovementPhase::Top,
                    MovementPhase::Descending,
                    MovementPhase::Bottom,
                ],
                measurement: Measurement::Alignment {
                    points: vec![LandmarkType::LeftHip],
                    reference: ReferenceLine::Segment(
                        LandmarkType::LeftShoulder,
                        LandmarkType::LeftAnkle,
                    ),
                    tolerance: 0.06,
                },
                violation_text: "Hips are breaking the body line".into(),
                correction_text: "Squeeze your glutes and brace so shoulders, hips, and ankles stay in one line"
                    .into(),
            },
            FormRule {
                id: "lowering_control".into(),
                severity: Severity::Warning,
                phases: vec![MovementPhase::Descending],
                measurement: Measurement::Velocity {
                    landmark: LandmarkType::LeftShoulder,
                    max_speed: 1.0,
                },
                violation_text: "Lowering too fast".into(),
                correction_text: "Control the descent instead of dropping into the bottom".into(),
            },
            FormRule {
                id: "wrist_level".into(),
                severity: Severity::Info,
                phases: vec![MovementPhase::Bottom],
                measurement: Measurement::Symmetry {
                    left: LandmarkType::LeftWrist,
                    right: LandmarkType::RightWrist,
                    axis: Axis::Y,
                    max_deviation: 0.06,
                },
                violation_text: "Hands are uneven".into(),
                correction_text: "Set both hands at the same height under your shoulders".into(),
            },
        ],
        coaching: CoachingText {
            motivation: vec![
                "Solid reps, keep that plank line".into(),
                "Good lockout, stay tight through the core".into(),
            ],
            milestone_interval: 5,
        },
        safety_tags: vec!["lumbar_sag".into()],
        calories: CalorieModel::PerRep(0.29),
    }
}

/// Built-in plank profile (side view, isometric hold).
///
/// Reports elapsed hold seconds instead of repetitions.
fn builtin_plank() -> ExerciseProfile {
    ExerciseProfile {
        id: "plank".into(),
        display_name: "Plank".into(),
        pattern: MovementPattern::Hold,
        camera_view: CameraView::Side,
        required_landmarks: vec![
            LandmarkType::LeftShoulder,
            LandmarkType::LeftHip,
            LandmarkType::LeftAnkle,
        ],
        phases: vec![PhaseSpec {
            phase: MovementPhase::Hold,
            checks: vec![AngleCheck {
                joint: [
                    LandmarkType::LeftShoulder,
                    LandmarkType::LeftHip,
                    LandmarkType::LeftAnkle,
                ],
                min_degrees: 155.0,
                max_degrees: 180.0,
            }],
        }],
        start_phase: MovementPhase::Hold,
        trigger: RepTrigger::HoldTimer {
            hold_phase: MovementPhase::Hold,
        },
        // Unused by the hold timer, but kept distinct for validation
        start_threshold: 0.0,
        end_threshold: 1.0,
        min_cycle_ms: DEFAULT_MIN_CYCLE_MS,
        requires_full_range: false,
        min_range_percent: DEFAULT_MIN_RANGE_PERCENT,
        rules: vec![
            FormRule {
                id: "hip_line".into(),
                severity: Severity::Critical,
                phases: vec![MovementPhase::Hold],
                measurement: Measurement::Alignment {
                    points: vec![LandmarkType::LeftHip],
                    reference: ReferenceLine::Segment(
                        LandmarkType::LeftShoulder,
                        LandmarkType::LeftAnkle,
                    ),
                    tolerance: 0.05,
                },
                violation_text: "Hips are sagging or piking".into(),
                correction_text: "Tuck your pelvis and hold one straight line from shoulders to ankles"
                    .into(),
            },
            FormRule {
                id: "shoulder_level".into(),
                severity: Severity::Info,
                phases: vec![MovementPhase::Hold],
                measurement: Measurement::Symmetry {
                    left: LandmarkType::LeftShoulder,
                    right: LandmarkType::RightShoulder,
                    axis: Axis::Y,
                    max_deviation: 0.05,
                },
                violation_text: "Weight is shifting to one side".into(),
                correction_text: "Press the floor away evenly with both arms".into(),
            },
        ],
        coaching: CoachingText {
            motivation: vec!["Breathe and hold steady".into()],
            milestone_interval: 0,
        },
        safety_tags: vec!["lumbar_sag".into()],
        calories: CalorieModel::PerMinute(3.5),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_register_and_validate() {
        let registry = ProfileRegistry::with_builtins();
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn lookup_is_case_and_separator_insensitive() {
        let registry = ProfileRegistry::with_builtins();
        assert!(registry.resolve("bodyweight_squat").is_some());
        assert!(registry.resolve("Bodyweight Squat").is_some());
        assert!(registry.resolve("BODYWEIGHT-SQUAT").is_some());
        assert!(registry.resolve("Push-Up").is_some());
        assert!(registry.resolve("pushup").is_some());
    }

    #[test]
    fn unknown_exercise_is_none_not_error() {
        let registry = ProfileRegistry::with_builtins();
        assert!(registry.resolve("burpee").is_none());
        assert!(!registry.supports("burpee"));
    }

    #[test]
    fn register_rejects_invalid_profile() {
        let mut registry = ProfileRegistry::new();
        let mut p = builtin_squat();
        p.phases.clear();
        assert!(registry.register(p).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn reregistering_replaces() {
        let mut registry = ProfileRegistry::new();
        registry.register(builtin_squat()).unwrap();
        let mut updated = builtin_squat();
        updated.min_cycle_ms = 750.0;
        registry.register(updated).unwrap();
        assert_eq!(registry.len(), 1);
        let resolved = registry.resolve("bodyweight_squat").unwrap();
        assert!((resolved.min_cycle_ms - 750.0).abs() < f64::EPSILON);
    }

    #[test]
    fn plank_is_hold_profile() {
        let registry = ProfileRegistry::with_builtins();
        let plank = registry.resolve("plank").unwrap();
        assert!(plank.is_hold());
    }
}
