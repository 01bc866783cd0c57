//! Hysteresis-based repetition counting.
//!
//! One state machine over one scalar signal — a tracked landmark's position
//! along an axis, or a joint angle, selected by the profile's
//! [`RepTrigger`]. Two distinct thresholds (arm/fire) prevent
//! oscillation-driven false triggers near a single boundary.
//!
//! Hold/isometric profiles bypass hysteresis entirely: the counter reports
//! elapsed hold seconds while the confirmed phase is the designated hold
//! phase, resetting whenever that phase is exited.

use formpulse_core::{geometry, Frame};

use crate::profile::{MovementPhase, RepTrigger};

/// A completed repetition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepEvent {
    /// Total repetition count after this fire
    pub count: u32,
    /// Time from arming to firing, in milliseconds
    pub cycle_ms: f64,
    /// Range of motion achieved this cycle, in percent [0, 100]
    pub range_of_motion: f32,
    /// Frame timestamp of the fire, in milliseconds
    pub at_ms: f64,
}

/// Two-threshold repetition counter.
///
/// With `start_threshold < end_threshold` the counter arms when the signal
/// crosses at or below the start threshold (deep/flexed) and fires when,
/// while armed, the signal returns past the end threshold (extension).
/// Profiles with the opposite threshold ordering get the mirrored behavior.
///
/// A fire additionally requires the cooldown (`min_cycle_ms`) since the last
/// fire and, when the profile demands full range, the configured
/// range-of-motion percentage; a crossing that fails either condition
/// discards the cycle (disarms without counting), so the count never skips
/// and never fires twice without an intervening arm.
#[derive(Debug, Clone)]
pub struct RepCounter {
    trigger: RepTrigger,
    start_threshold: f32,
    end_threshold: f32,
    min_cycle_ms: f64,
    requires_full_range: bool,
    min_range_percent: f32,
    visibility_threshold: f32,

    armed: bool,
    /// Signal value at the moment the cycle armed
    cycle_start_value: Option<f32>,
    /// Deepest signal value of the current armed cycle
    extreme: Option<f32>,
    cycle_start_ms: f64,
    last_fire_ms: Option<f64>,
    count: u32,

    hold_since_ms: Option<f64>,
    hold_elapsed_s: f64,
    hold_best_s: f64,
}

impl RepCounter {
    /// Creates a counter from profile configuration.
    #[must_use]
    pub fn new(
        trigger: RepTrigger,
        start_threshold: f32,
        end_threshold: f32,
        min_cycle_ms: f64,
        requires_full_range: bool,
        min_range_percent: f32,
        visibility_threshold: f32,
    ) -> Self {
        Self {
            trigger,
            start_threshold,
            end_threshold,
            min_cycle_ms,
            requires_full_range,
            min_range_percent,
            visibility_threshold,
            armed: false,
            cycle_start_value: None,
            extreme: None,
            cycle_start_ms: 0.0,
            last_fire_ms: None,
            count: 0,
            hold_since_ms: None,
            hold_elapsed_s: 0.0,
            hold_best_s: 0.0,
        }
    }

    /// Observes one frame under the given confirmed phase.
    ///
    /// Returns a [`RepEvent`] when a repetition fires.
    pub fn observe(&mut self, frame: &Frame, confirmed: MovementPhase) -> Option<RepEvent> {
        let timestamp_ms = frame.timestamp_ms;

        if let RepTrigger::HoldTimer { hold_phase } = self.trigger {
            self.observe_hold(confirmed, hold_phase, timestamp_ms);
            return None;
        }

        let value = self.signal_value(frame)?;

        if !self.armed {
            if self.on_arm_side(value) {
                self.armed = true;
                self.cycle_start_value = Some(value);
                self.cycle_start_ms = timestamp_ms;
                self.extreme = Some(value);
            }
            return None;
        }

        // Armed: track the deepest point of the cycle
        self.extreme = Some(match self.extreme {
            Some(extreme) if self.deeper(value, extreme) => value,
            Some(extreme) => extreme,
            None => value,
        });

        if !self.on_fire_side(value) {
            return None;
        }

        let cooldown_ok = self
            .last_fire_ms
            .map_or(true, |last| timestamp_ms - last >= self.min_cycle_ms);
        let range_of_motion = self.current_range_of_motion();
        let range_ok = !self.requires_full_range || range_of_motion >= self.min_range_percent;

        // The cycle ends either way; a failed condition discards it
        let cycle_ms = timestamp_ms - self.cycle_start_ms;
        self.armed = false;
        self.cycle_start_value = None;
        self.extreme = None;

        if !cooldown_ok || !range_ok {
            tracing::debug!(
                cooldown_ok,
                range_ok,
                range_of_motion,
                "Discarding repetition cycle"
            );
            return None;
        }

        let previous = self.count;
        self.count += 1;
        debug_assert!(self.count == previous + 1, "rep count must advance by one");
        self.last_fire_ms = Some(timestamp_ms);

        Some(RepEvent {
            count: self.count,
            cycle_ms,
            range_of_motion,
            at_ms: timestamp_ms,
        })
    }

    fn observe_hold(&mut self, confirmed: MovementPhase, hold_phase: MovementPhase, now_ms: f64) {
        if confirmed == hold_phase {
            let since = *self.hold_since_ms.get_or_insert(now_ms);
            self.hold_elapsed_s = (now_ms - since) / 1000.0;
            self.hold_best_s = self.hold_best_s.max(self.hold_elapsed_s);
        } else {
            // Leaving the hold phase resets the clock
            self.hold_since_ms = None;
            self.hold_elapsed_s = 0.0;
        }
    }

    fn signal_value(&self, frame: &Frame) -> Option<f32> {
        match &self.trigger {
            RepTrigger::AxisPosition { landmark, axis } => {
                let lm = frame.get(*landmark)?;
                lm.visibility
                    .exceeds(self.visibility_threshold)
                    .then(|| lm.axis_value(*axis))
            }
            RepTrigger::JointAngle { joint } => {
                let [a, b, c] = joint;
                let (la, lb, lc) = (frame.get(*a)?, frame.get(*b)?, frame.get(*c)?);
                if !la.visibility.exceeds(self.visibility_threshold)
                    || !lb.visibility.exceeds(self.visibility_threshold)
                    || !lc.visibility.exceeds(self.visibility_threshold)
                {
                    return None;
                }
                geometry::joint_angle_degrees(la, lb, lc)
            }
            RepTrigger::HoldTimer { .. } => None,
        }
    }

    /// `true` when arming runs toward lower signal values.
    fn descending(&self) -> bool {
        self.start_threshold < self.end_threshold
    }

    fn on_arm_side(&self, value: f32) -> bool {
        if self.descending() {
            value <= self.start_threshold
        } else {
            value >= self.start_threshold
        }
    }

    fn on_fire_side(&self, value: f32) -> bool {
        if self.descending() {
            value >= self.end_threshold
        } else {
            value <= self.end_threshold
        }
    }

    fn deeper(&self, candidate: f32, current: f32) -> bool {
        if self.descending() {
            candidate < current
        } else {
            candidate > current
        }
    }

    /// Range of motion of the current armed cycle, in percent.
    ///
    /// |cycle-start signal − extreme signal| ÷ |end − start| × 100,
    /// clamped to [0, 100]. Zero while no cycle is armed.
    #[must_use]
    pub fn current_range_of_motion(&self) -> f32 {
        let (Some(start), Some(extreme)) = (self.cycle_start_value, self.extreme) else {
            return 0.0;
        };
        let span = (self.end_threshold - self.start_threshold).abs();
        if span < f32::EPSILON {
            return 0.0;
        }
        ((start - extreme).abs() / span * 100.0).clamp(0.0, 100.0)
    }

    /// Total repetitions fired.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Elapsed seconds in the designated hold phase (hold profiles only).
    #[must_use]
    pub fn hold_seconds(&self) -> f64 {
        self.hold_elapsed_s
    }

    /// Longest uninterrupted hold achieved this session, in seconds.
    #[must_use]
    pub fn best_hold_seconds(&self) -> f64 {
        self.hold_best_s
    }

    /// Returns `true` if the counter is currently armed.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Resets all counters and timers.
    pub fn reset(&mut self) {
        self.armed = false;
        self.cycle_start_value = None;
        self.extreme = None;
        self.cycle_start_ms = 0.0;
        self.last_fire_ms = None;
        self.count = 0;
        self.hold_since_ms = None;
        self.hold_elapsed_s = 0.0;
        self.hold_best_s = 0.0;
    }
}
