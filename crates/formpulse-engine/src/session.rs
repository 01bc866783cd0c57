//! Session analytics: running accumulation and the finalized summary.
//!
//! Pure bookkeeping — no side effects beyond its own state. The engine feeds
//! it every scored frame and every fired repetition; on stop it is finalized
//! into a read-only [`SessionSummary`], the only artifact handed to the
//! caller for storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::{FormMetrics, RepEvent};
use crate::coaching::CoachingCue;
use crate::profile::CalorieModel;

/// Score at or above which a repetition counts as "valid".
pub const DEFAULT_PASS_THRESHOLD: f32 = 70.0;

/// Snapshot of one completed repetition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepRecord {
    /// Repetition number, starting at 1
    pub rep_number: u32,
    /// Form score at fire time
    pub score: f32,
    /// Time from arming to firing, in milliseconds
    pub cycle_ms: f64,
    /// Range of motion achieved, in percent
    pub range_of_motion: f32,
    /// Distinct violation messages accrued during the cycle
    pub violations: Vec<String>,
}

/// Read-only summary of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Exercise id the session analyzed
    pub exercise_id: String,
    /// Unique session identifier
    pub session_id: Uuid,
    /// Wall-clock session start
    pub started_at: DateTime<Utc>,
    /// Total repetitions fired
    pub total_reps: u32,
    /// Repetitions whose fire-time score met the pass threshold
    pub valid_reps: u32,
    /// Mean frame score (exactly 100 when no frame was scored)
    pub average_score: f32,
    /// Best frame score observed
    pub peak_score: f32,
    /// Analyzed time span in milliseconds (first to last frame)
    pub duration_ms: f64,
    /// Calorie estimate from the profile's calorie model
    pub calories: f32,
    /// Longest uninterrupted hold achieved, in seconds (hold profiles)
    pub hold_seconds: f64,
    /// Per-repetition log
    pub reps: Vec<RepRecord>,
    /// Every coaching cue emitted during the session
    pub cues: Vec<CoachingCue>,
}

/// Running statistics over all processed frames and fired reps.
///
/// Created on engine start, mutated per frame/rep, finalized on stop.
#[derive(Debug, Clone)]
pub struct SessionAnalytics {
    exercise_id: String,
    session_id: Uuid,
    started_at: DateTime<Utc>,
    pass_threshold: f32,

    first_frame_ms: Option<f64>,
    last_frame_ms: Option<f64>,
    /// Per-frame scores, append-only
    score_series: Vec<f32>,
    score_sum: f64,
    peak_score: f32,
    last_score: f32,

    reps: Vec<RepRecord>,
    valid_reps: u32,
    /// Violation messages accrued since the last fired rep
    cycle_violations: Vec<String>,
    cues: Vec<CoachingCue>,
    discarded_frames: u64,
}

impl SessionAnalytics {
    /// Begins a session for the given exercise.
    #[must_use]
    pub fn new(exercise_id: impl Into<String>, pass_threshold: f32) -> Self {
        Self {
            exercise_id: exercise_id.into(),
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            pass_threshold,
            first_frame_ms: None,
            last_frame_ms: None,
            score_series: Vec::new(),
            score_sum: 0.0,
            peak_score: 0.0,
            last_score: 100.0,
            reps: Vec::new(),
            valid_reps: 0,
            cycle_violations: Vec::new(),
            cues: Vec::new(),
            discarded_frames: 0,
        }
    }

    /// Records one scored frame.
    pub fn record_frame(&mut self, timestamp_ms: f64, metrics: &FormMetrics) {
        self.first_frame_ms.get_or_insert(timestamp_ms);
        self.last_frame_ms = Some(timestamp_ms);
        self.score_series.push(metrics.score);
        self.score_sum += f64::from(metrics.score);
        self.peak_score = self.peak_score.max(metrics.score);
        self.last_score = metrics.score;

        for violation in &metrics.violations {
            if !self.cycle_violations.contains(&violation.message) {
                self.cycle_violations.push(violation.message.clone());
            }
        }
    }

    /// Records a frame discarded before analysis (visibility gate).
    pub fn record_discarded(&mut self) {
        self.discarded_frames += 1;
    }

    /// Records a fired repetition, draining the cycle's accrued violations.
    pub fn record_rep(&mut self, event: &RepEvent) -> &RepRecord {
        debug_assert!(
            self.reps.len() + 1 == event.count as usize,
            "rep log must stay in lockstep with the counter"
        );
        let record = RepRecord {
            rep_number: event.count,
            score: self.last_score,
            cycle_ms: event.cycle_ms,
            range_of_motion: event.range_of_motion,
            violations: std::mem::take(&mut self.cycle_violations),
        };
        if record.score >= self.pass_threshold {
            self.valid_reps += 1;
        }
        self.reps.push(record);
        self.reps.last().expect("just pushed")
    }

    /// Records an emitted coaching cue.
    pub fn record_cue(&mut self, cue: &CoachingCue) {
        self.cues.push(cue.clone());
    }

    /// Total repetitions recorded so far.
    #[must_use]
    pub fn rep_count(&self) -> u32 {
        self.reps.len() as u32
    }

    /// Repetitions that met the pass threshold.
    #[must_use]
    pub fn valid_rep_count(&self) -> u32 {
        self.valid_reps
    }

    /// Mean frame score; exactly 100 before any frame has been scored.
    #[must_use]
    pub fn average_score(&self) -> f32 {
        if self.score_series.is_empty() {
            100.0
        } else {
            (self.score_sum / self.score_series.len() as f64) as f32
        }
    }

    /// Every frame score recorded so far, in arrival order.
    #[must_use]
    pub fn score_series(&self) -> &[f32] {
        &self.score_series
    }

    /// Analyzed time span so far, in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        match (self.first_frame_ms, self.last_frame_ms) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// Frames rejected by the visibility gate.
    #[must_use]
    pub fn discarded_frames(&self) -> u64 {
        self.discarded_frames
    }

    /// Session identifier.
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Finalizes into a read-only summary.
    #[must_use]
    pub fn finalize(self, calories: &CalorieModel, hold_seconds: f64) -> SessionSummary {
        let duration_ms = self.elapsed_ms();
        let total_reps = self.reps.len() as u32;
        SessionSummary {
            exercise_id: self.exercise_id,
            session_id: self.session_id,
            started_at: self.started_at,
            total_reps,
            valid_reps: self.valid_reps,
            average_score: if self.score_series.is_empty() {
                100.0
            } else {
                (self.score_sum / self.score_series.len() as f64) as f32
            },
            peak_score: self.peak_score,
            duration_ms,
            calories: calories.estimate(total_reps, duration_ms),
            hold_seconds,
            reps: self.reps,
            cues: self.cues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FormViolation;
    use crate::coaching::{CueCategory, CueUrgency};
    use crate::profile::Severity;

    fn metrics_with_score(score: f32) -> FormMetrics {
        FormMetrics {
            score,
            violations: Vec::new(),
            velocity: 0.0,
            consistency: 100.0,
            range_of_motion: 0.0,
        }
    }

    fn rep_event(count: u32, at_ms: f64) -> RepEvent {
        RepEvent {
            count,
            cycle_ms: 900.0,
            range_of_motion: 85.0,
            at_ms,
        }
    }

    #[test]
    fn average_is_100_with_no_scored_frames() {
        let session = SessionAnalytics::new("squat", DEFAULT_PASS_THRESHOLD);
        assert!((session.average_score() - 100.0).abs() < f32::EPSILON);

        let summary = session.finalize(&CalorieModel::PerRep(0.3), 0.0);
        assert!((summary.average_score - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn running_average_tracks_frames() {
        let mut session = SessionAnalytics::new("squat", DEFAULT_PASS_THRESHOLD);
        session.record_frame(0.0, &metrics_with_score(100.0));
        session.record_frame(33.0, &metrics_with_score(70.0));
        assert!((session.average_score() - 85.0).abs() < 0.001);
        assert!((session.elapsed_ms() - 33.0).abs() < f64::EPSILON);
        assert_eq!(session.score_series(), &[100.0, 70.0]);
    }

    #[test]
    fn rep_records_snapshot_cycle_violations() {
        let mut session = SessionAnalytics::new("squat", DEFAULT_PASS_THRESHOLD);
        let mut metrics = metrics_with_score(85.0);
        metrics.violations.push(FormViolation {
            rule_id: "torso_lean".into(),
            severity: Severity::Warning,
            message: "Torso is folding forward".into(),
            correction: "Lift your chest".into(),
        });
        session.record_frame(0.0, &metrics);
        // Same violation on a later frame is not duplicated
        session.record_frame(33.0, &metrics);

        let record = session.record_rep(&rep_event(1, 900.0));
        assert_eq!(record.rep_number, 1);
        assert_eq!(record.violations.len(), 1);
        assert!((record.score - 85.0).abs() < f32::EPSILON);

        // The next cycle starts with a clean violation slate
        session.record_frame(950.0, &metrics_with_score(90.0));
        let record = session.record_rep(&rep_event(2, 1800.0));
        assert!(record.violations.is_empty());
    }

    #[test]
    fn valid_reps_respect_pass_threshold() {
        let mut session = SessionAnalytics::new("squat", DEFAULT_PASS_THRESHOLD);
        session.record_frame(0.0, &metrics_with_score(90.0));
        session.record_rep(&rep_event(1, 500.0));
        session.record_frame(600.0, &metrics_with_score(40.0));
        session.record_rep(&rep_event(2, 1200.0));

        assert_eq!(session.rep_count(), 2);
        assert_eq!(session.valid_rep_count(), 1);
    }

    #[test]
    fn finalize_estimates_calories_per_rep() {
        let mut session = SessionAnalytics::new("squat", DEFAULT_PASS_THRESHOLD);
        session.record_frame(0.0, &metrics_with_score(90.0));
        session.record_rep(&rep_event(1, 500.0));
        session.record_rep(&rep_event(2, 1200.0));

        let summary = session.finalize(&CalorieModel::PerRep(0.5), 0.0);
        assert_eq!(summary.total_reps, 2);
        assert!((summary.calories - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn finalize_estimates_calories_per_minute() {
        let mut session = SessionAnalytics::new("plank", DEFAULT_PASS_THRESHOLD);
        session.record_frame(0.0, &metrics_with_score(95.0));
        session.record_frame(30_000.0, &metrics_with_score(95.0));

        let summary = session.finalize(&CalorieModel::PerMinute(4.0), 30.0);
        assert!((summary.calories - 2.0).abs() < 0.001);
        assert!((summary.hold_seconds - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn cue_log_is_retained_in_summary() {
        let mut session = SessionAnalytics::new("squat", DEFAULT_PASS_THRESHOLD);
        let cue = CoachingCue::new(
            "Keep your chest up",
            CueCategory::Form,
            CueUrgency::Normal,
            1000.0,
        );
        session.record_cue(&cue);
        let summary = session.finalize(&CalorieModel::PerRep(0.3), 0.0);
        assert_eq!(summary.cues.len(), 1);
        assert_eq!(summary.cues[0].message, "Keep your chest up");
    }

    #[test]
    fn discarded_frames_are_counted() {
        let mut session = SessionAnalytics::new("squat", DEFAULT_PASS_THRESHOLD);
        session.record_discarded();
        session.record_discarded();
        assert_eq!(session.discarded_frames(), 2);
    }
}
