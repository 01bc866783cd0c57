//! Raw per-frame phase classification from joint angles.

use formpulse_core::{geometry, Frame};

use crate::profile::{AngleCheck, ExerciseProfile, MovementPhase};

/// A raw per-frame phase estimate, before debouncing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseEstimate {
    /// The estimated phase
    pub phase: MovementPhase,
    /// Fraction of the winning phase's checks that were satisfied, in [0, 1]
    pub confidence: f32,
}

/// Classifies each frame into the profile-declared phase whose angle checks
/// are best satisfied.
///
/// - A phase with no configured checks can never be classified.
/// - Ties resolve to the phase declared earlier in the profile.
/// - When every phase scores zero (e.g. key landmarks dropped out), the
///   classifier falls back to the previous confirmed phase rather than
///   emitting an undefined value.
#[derive(Debug, Clone)]
pub struct PhaseClassifier {
    visibility_threshold: f32,
}

impl PhaseClassifier {
    /// Creates a classifier using the given landmark visibility threshold.
    #[must_use]
    pub fn new(visibility_threshold: f32) -> Self {
        Self {
            visibility_threshold,
        }
    }

    /// Classifies one frame.
    ///
    /// `previous_confirmed` is the debouncer's current confirmed phase, used
    /// as the fallback when no phase matches at all.
    #[must_use]
    pub fn classify(
        &self,
        frame: &Frame,
        profile: &ExerciseProfile,
        previous_confirmed: MovementPhase,
    ) -> PhaseEstimate {
        let mut best: Option<PhaseEstimate> = None;

        for spec in &profile.phases {
            if spec.checks.is_empty() {
                continue;
            }
            let satisfied = spec
                .checks
                .iter()
                .filter(|check| self.check_satisfied(frame, check))
                .count();
            let fraction = satisfied as f32 / spec.checks.len() as f32;

            // Strict comparison keeps the earlier declaration on ties
            if fraction > 0.0 && best.map_or(true, |b| fraction > b.confidence) {
                best = Some(PhaseEstimate {
                    phase: spec.phase,
                    confidence: fraction,
                });
            }
        }

        best.unwrap_or(PhaseEstimate {
            phase: previous_confirmed,
            confidence: 0.0,
        })
    }

    fn check_satisfied(&self, frame: &Frame, check: &AngleCheck) -> bool {
        let [a, b, c] = check.joint;
        let (Some(la), Some(lb), Some(lc)) = (frame.get(a), frame.get(b), frame.get(c)) else {
            return false;
        };
        if !la.visibility.exceeds(self.visibility_threshold)
            || !lb.visibility.exceeds(self.visibility_threshold)
            || !lc.visibility.exceeds(self.visibility_threshold)
        {
            return false;
        }
        match geometry::joint_angle_degrees(la, lb, lc) {
            Some(angle) => angle >= check.min_degrees && angle <= check.max_degrees,
            None => false,
        }
    }
}
