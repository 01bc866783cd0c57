//! Rule-based form scoring.
//!
//! Evaluates the profile's form rules against each frame, scoped to the
//! frame's raw phase. A rule whose landmarks are missing or below the
//! visibility threshold is skipped and never penalizes.

use std::collections::{HashMap, VecDeque};

use formpulse_core::{geometry, Frame, LandmarkType};

use crate::profile::{ExerciseProfile, Measurement, MovementPhase, ReferenceLine, Severity};

/// Fixed score deduction per failing rule.
///
/// Severity affects cue urgency only, never the deduction, so
/// `violations.len() × penalty` always reconciles with `100 − score`.
pub const DEFAULT_RULE_PENALTY: f32 = 15.0;

/// Number of recent frame scores feeding the consistency estimate.
const CONSISTENCY_WINDOW: usize = 30;

/// A failed form rule, with its feedback text.
#[derive(Debug, Clone, PartialEq)]
pub struct FormViolation {
    /// Id of the rule that failed
    pub rule_id: String,
    /// Severity of the rule
    pub severity: Severity,
    /// Violation text for the user
    pub message: String,
    /// Corrective instruction
    pub correction: String,
}

/// Per-frame form evaluation output.
#[derive(Debug, Clone, PartialEq)]
pub struct FormMetrics {
    /// Form score in [0, 100]
    pub score: f32,
    /// Every failing rule this frame
    pub violations: Vec<FormViolation>,
    /// Most recent tracked-landmark speed, normalized units per second
    pub velocity: f32,
    /// Score steadiness over the recent window, in [0, 100]
    pub consistency: f32,
    /// Range of motion of the current repetition cycle, in percent
    pub range_of_motion: f32,
}

impl FormMetrics {
    /// A perfect score with no violations.
    #[must_use]
    pub fn perfect() -> Self {
        Self {
            score: 100.0,
            violations: Vec::new(),
            velocity: 0.0,
            consistency: 100.0,
            range_of_motion: 0.0,
        }
    }

    /// The most severe violation this frame, if any.
    #[must_use]
    pub fn worst_violation(&self) -> Option<&FormViolation> {
        self.violations.iter().min_by_key(|v| v.severity)
    }

    /// Returns `true` if any critical-severity rule failed.
    #[must_use]
    pub fn has_critical(&self) -> bool {
        self.violations
            .iter()
            .any(|v| v.severity == Severity::Critical)
    }
}

/// Evaluates configured form rules against frames.
#[derive(Debug, Clone)]
pub struct FormScorer {
    penalty: f32,
    visibility_threshold: f32,
    /// Last observed position and timestamp per velocity-tracked landmark
    last_positions: HashMap<LandmarkType, ((f32, f32), f64)>,
    recent_scores: VecDeque<f32>,
    last_velocity: f32,
}

impl FormScorer {
    /// Creates a scorer with the given penalty and visibility threshold.
    #[must_use]
    pub fn new(penalty: f32, visibility_threshold: f32) -> Self {
        Self {
            penalty,
            visibility_threshold,
            last_positions: HashMap::new(),
            recent_scores: VecDeque::with_capacity(CONSISTENCY_WINDOW),
            last_velocity: 0.0,
        }
    }

    /// Scores one frame against the rules relevant to its raw phase.
    ///
    /// `range_of_motion` is the rep counter's current-cycle estimate, folded
    /// into the returned metrics.
    pub fn score_frame(
        &mut self,
        frame: &Frame,
        profile: &ExerciseProfile,
        raw_phase: MovementPhase,
        range_of_motion: f32,
    ) -> FormMetrics {
        let mut violations = Vec::new();

        for rule in &profile.rules {
            if !rule.applies_in(raw_phase) {
                continue;
            }
            match self.evaluate(frame, &rule.measurement) {
                Some(false) => violations.push(FormViolation {
                    rule_id: rule.id.clone(),
                    severity: rule.severity,
                    message: rule.violation_text.clone(),
                    correction: rule.correction_text.clone(),
                }),
                // Passed, or skipped for missing input
                Some(true) | None => {}
            }
        }

        // Refresh position history for every velocity-tracked landmark so
        // gaps between applicable phases don't read as motion spikes
        self.update_velocity_history(frame, profile);

        let score = (100.0 - self.penalty * violations.len() as f32).max(0.0);

        if self.recent_scores.len() == CONSISTENCY_WINDOW {
            self.recent_scores.pop_front();
        }
        self.recent_scores.push_back(score);

        FormMetrics {
            score,
            violations,
            velocity: self.last_velocity,
            consistency: self.consistency(),
            range_of_motion,
        }
    }

    /// Evaluates one measurement.
    ///
    /// Returns `Some(true)` on pass, `Some(false)` on fail, `None` when the
    /// measurement could not be taken (missing/low-visibility landmarks, a
    /// degenerate reference line, or no motion history yet).
    fn evaluate(&self, frame: &Frame, measurement: &Measurement) -> Option<bool> {
        for lt in measurement.landmarks() {
            if !frame.visible(lt, self.visibility_threshold) {
                return None;
            }
        }

        match measurement {
            Measurement::Angle {
                joint,
                optimal_degrees,
                tolerance_degrees,
            } => {
                let angle = geometry::joint_angle_degrees(
                    frame.get(joint[0])?,
                    frame.get(joint[1])?,
                    frame.get(joint[2])?,
                )?;
                Some((angle - optimal_degrees).abs() <= *tolerance_degrees)
            }
            Measurement::Alignment {
                points,
                reference,
                tolerance,
            } => {
                let mut worst = 0.0_f32;
                for point in points {
                    let p = frame.get(*point)?;
                    let deviation = match reference {
                        ReferenceLine::Vertical(anchor) => {
                            geometry::vertical_deviation(p, frame.get(*anchor)?)
                        }
                        ReferenceLine::Horizontal(anchor) => {
                            geometry::horizontal_deviation(p, frame.get(*anchor)?)
                        }
                        ReferenceLine::Segment(a, b) => {
                            geometry::point_line_deviation(p, frame.get(*a)?, frame.get(*b)?)?
                        }
                    };
                    worst = worst.max(deviation);
                }
                Some(worst <= *tolerance)
            }
            Measurement::Symmetry {
                left,
                right,
                axis,
                max_deviation,
            } => {
                let deviation =
                    geometry::symmetry_deviation(frame.get(*left)?, frame.get(*right)?, *axis);
                Some(deviation <= *max_deviation)
            }
            Measurement::Velocity {
                landmark,
                max_speed,
            } => {
                let lm = frame.get(*landmark)?;
                let (prev_pos, prev_ms) = self.last_positions.get(landmark)?;
                let speed = geometry::rate_of_change(
                    *prev_pos,
                    *prev_ms,
                    lm.position_2d(),
                    frame.timestamp_ms,
                )?;
                Some(speed <= *max_speed)
            }
        }
    }

    fn update_velocity_history(&mut self, frame: &Frame, profile: &ExerciseProfile) {
        for rule in &profile.rules {
            let Measurement::Velocity { landmark, .. } = &rule.measurement else {
                continue;
            };
            let Some(lm) = frame.get(*landmark) else {
                continue;
            };
            if !lm.visibility.exceeds(self.visibility_threshold) {
                continue;
            }
            if let Some((prev_pos, prev_ms)) = self.last_positions.get(landmark) {
                if let Some(speed) = geometry::rate_of_change(
                    *prev_pos,
                    *prev_ms,
                    lm.position_2d(),
                    frame.timestamp_ms,
                ) {
                    self.last_velocity = speed;
                }
            }
            self.last_positions
                .insert(*landmark, (lm.position_2d(), frame.timestamp_ms));
        }
    }

    /// Score steadiness over the recent window: 100 minus the standard
    /// deviation of recent frame scores, clamped to [0, 100].
    fn consistency(&self) -> f32 {
        let n = self.recent_scores.len();
        if n < 2 {
            return 100.0;
        }
        let mean = self.recent_scores.iter().sum::<f32>() / n as f32;
        let variance = self
            .recent_scores
            .iter()
            .map(|s| (s - mean) * (s - mean))
            .sum::<f32>()
            / n as f32;
        (100.0 - variance.sqrt()).clamp(0.0, 100.0)
    }

    /// Resets motion history and the consistency window.
    pub fn reset(&mut self) {
        self.last_positions.clear();
        self.recent_scores.clear();
        self.last_velocity = 0.0;
    }
}
