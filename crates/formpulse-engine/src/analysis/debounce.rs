//! Temporal debouncing of raw phase estimates.
//!
//! Eliminates single-frame classification jitter: a confirmed-phase
//! transition fires only after a run of consecutive agreeing raw
//! observations.

use crate::profile::MovementPhase;

/// A confirmed phase transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseTransition {
    /// Phase being left
    pub from: MovementPhase,
    /// Phase being entered
    pub to: MovementPhase,
    /// Frame timestamp at which the transition confirmed, in milliseconds
    pub at_ms: f64,
}

/// Converts raw per-frame phase estimates into a stable confirmed phase.
///
/// State transitions:
/// - raw phase differs from the previous frame's raw phase → stable counter
///   resets to 1
/// - raw phase repeats → stable counter increments
/// - counter reaches the threshold AND raw differs from confirmed → the
///   confirmed phase changes and the transition timestamp is recorded
///
/// Only the confirmed phase is exposed downstream.
#[derive(Debug, Clone)]
pub struct PhaseDebouncer {
    confirmed: MovementPhase,
    raw_previous: Option<MovementPhase>,
    stable_frames: u32,
    threshold: u32,
    last_transition_ms: Option<f64>,
}

impl PhaseDebouncer {
    /// Creates a debouncer confirmed at the profile's start phase.
    #[must_use]
    pub fn new(start_phase: MovementPhase, threshold: u32) -> Self {
        Self {
            confirmed: start_phase,
            raw_previous: None,
            stable_frames: 0,
            threshold: threshold.max(1),
            last_transition_ms: None,
        }
    }

    /// Observes one raw phase estimate.
    ///
    /// Returns the confirmed transition, if this observation caused one.
    pub fn observe(&mut self, raw: MovementPhase, timestamp_ms: f64) -> Option<PhaseTransition> {
        if self.raw_previous == Some(raw) {
            self.stable_frames = self.stable_frames.saturating_add(1);
        } else {
            self.raw_previous = Some(raw);
            self.stable_frames = 1;
        }

        if self.stable_frames >= self.threshold && raw != self.confirmed {
            let transition = PhaseTransition {
                from: self.confirmed,
                to: raw,
                at_ms: timestamp_ms,
            };
            self.confirmed = raw;
            self.last_transition_ms = Some(timestamp_ms);
            tracing::trace!(from = %transition.from, to = %transition.to, "Phase confirmed");
            return Some(transition);
        }
        None
    }

    /// The current confirmed phase.
    #[must_use]
    pub fn confirmed(&self) -> MovementPhase {
        self.confirmed
    }

    /// Timestamp of the most recent confirmed transition, if any.
    #[must_use]
    pub fn last_transition_ms(&self) -> Option<f64> {
        self.last_transition_ms
    }

    /// Resets to the given start phase, clearing all counters.
    pub fn reset(&mut self, start_phase: MovementPhase) {
        self.confirmed = start_phase;
        self.raw_previous = None;
        self.stable_frames = 0;
        self.last_transition_ms = None;
    }
}
