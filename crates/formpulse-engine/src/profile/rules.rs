//! Form rule configuration: measurement variants and severities.

use formpulse_core::{Axis, LandmarkType};
use serde::{Deserialize, Serialize};

use crate::profile::MovementPhase;

/// Severity of a form rule.
///
/// Severity affects coaching-cue urgency only; the scorer deducts a fixed
/// penalty per failing rule regardless of severity, keeping the score
/// deterministic and reconcilable against the violation count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Safety-relevant fault; escalated past throttling
    Critical = 1,
    /// Meaningful technique fault
    Warning = 2,
    /// Minor technique note
    Info = 3,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Info => write!(f, "INFO"),
        }
    }
}

/// Reference line for alignment measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceLine {
    /// Vertical line through the anchor landmark
    Vertical(LandmarkType),
    /// Horizontal line through the anchor landmark
    Horizontal(LandmarkType),
    /// Line through two landmarks
    Segment(LandmarkType, LandmarkType),
}

impl ReferenceLine {
    /// Landmarks this reference line depends on.
    #[must_use]
    pub fn landmarks(&self) -> Vec<LandmarkType> {
        match self {
            Self::Vertical(a) | Self::Horizontal(a) => vec![*a],
            Self::Segment(a, b) => vec![*a, *b],
        }
    }
}

/// What a form rule measures, with its acceptable range.
///
/// Tagged variants so a profile is checked once at load time instead of
/// being interpreted per frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Measurement {
    /// Three-point joint angle against an optimal value ± tolerance (degrees)
    Angle {
        /// Joint chain: the angle is measured at the middle landmark
        joint: [LandmarkType; 3],
        /// Optimal angle in degrees
        optimal_degrees: f32,
        /// Acceptable deviation in degrees
        tolerance_degrees: f32,
    },
    /// Deviation of points from a reference line (normalized image units)
    Alignment {
        /// Points whose deviation is checked; the worst one counts
        points: Vec<LandmarkType>,
        /// Reference line to measure against
        reference: ReferenceLine,
        /// Maximum acceptable deviation
        tolerance: f32,
    },
    /// Left/right coordinate difference along an axis (normalized image units)
    Symmetry {
        /// Left-side landmark
        left: LandmarkType,
        /// Right-side landmark
        right: LandmarkType,
        /// Axis along which the pair should agree
        axis: Axis,
        /// Maximum acceptable difference
        max_deviation: f32,
    },
    /// Displacement rate of a tracked landmark (normalized units per second)
    Velocity {
        /// Landmark whose motion is tracked
        landmark: LandmarkType,
        /// Maximum acceptable speed for controlled movement
        max_speed: f32,
    },
}

impl Measurement {
    /// Landmarks this measurement reads. A rule is skipped (never penalized)
    /// when any of them is missing or below the visibility threshold.
    #[must_use]
    pub fn landmarks(&self) -> Vec<LandmarkType> {
        match self {
            Self::Angle { joint, .. } => joint.to_vec(),
            Self::Alignment {
                points, reference, ..
            } => {
                let mut all = points.clone();
                all.extend(reference.landmarks());
                all
            }
            Self::Symmetry { left, right, .. } => vec![*left, *right],
            Self::Velocity { landmark, .. } => vec![*landmark],
        }
    }
}

/// A configured form check with feedback text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormRule {
    /// Stable rule identifier (e.g. `"knee_over_toe"`)
    pub id: String,
    /// Severity, driving cue urgency
    pub severity: Severity,
    /// Movement phases in which this rule applies
    pub phases: Vec<MovementPhase>,
    /// What to measure and the acceptable range
    pub measurement: Measurement,
    /// Text shown when the rule fails
    pub violation_text: String,
    /// Corrective instruction paired with the violation
    pub correction_text: String,
}

impl FormRule {
    /// Returns `true` if this rule applies in the given phase.
    #[must_use]
    pub fn applies_in(&self, phase: MovementPhase) -> bool {
        self.phases.contains(&phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Critical < Severity::Warning);
        assert!(Severity::Warning < Severity::Info);
    }

    #[test]
    fn measurement_landmarks_angle() {
        let m = Measurement::Angle {
            joint: [
                LandmarkType::LeftHip,
                LandmarkType::LeftKnee,
                LandmarkType::LeftAnkle,
            ],
            optimal_degrees: 90.0,
            tolerance_degrees: 20.0,
        };
        assert_eq!(m.landmarks().len(), 3);
    }

    #[test]
    fn measurement_landmarks_alignment_includes_reference() {
        let m = Measurement::Alignment {
            points: vec![LandmarkType::LeftHip],
            reference: ReferenceLine::Segment(LandmarkType::LeftShoulder, LandmarkType::LeftAnkle),
            tolerance: 0.05,
        };
        let lms = m.landmarks();
        assert!(lms.contains(&LandmarkType::LeftHip));
        assert!(lms.contains(&LandmarkType::LeftShoulder));
        assert!(lms.contains(&LandmarkType::LeftAnkle));
    }

    #[test]
    fn rule_phase_scoping() {
        let rule = FormRule {
            id: "test".into(),
            severity: Severity::Warning,
            phases: vec![MovementPhase::Bottom],
            measurement: Measurement::Velocity {
                landmark: LandmarkType::LeftHip,
                max_speed: 1.0,
            },
            violation_text: "too fast".into(),
            correction_text: "slow down".into(),
        };
        assert!(rule.applies_in(MovementPhase::Bottom));
        assert!(!rule.applies_in(MovementPhase::Top));
    }

    #[test]
    fn measurement_serde_tagged() {
        let m = Measurement::Symmetry {
            left: LandmarkType::LeftShoulder,
            right: LandmarkType::RightShoulder,
            axis: Axis::Y,
            max_deviation: 0.05,
        };
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"kind\":\"symmetry\""));
        let parsed: Measurement = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, m);
    }
}
