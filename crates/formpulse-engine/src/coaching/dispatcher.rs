//! Rate-limited coaching-cue dispatch.
//!
//! Two independent timers gate the user-facing channel, both driven by the
//! producer's frame clock:
//!
//! - a short settle window after each confirmed phase transition, during
//!   which form-violation cues are withheld (prevents correction spam while
//!   the body is mid-transition);
//! - a longer debounce gating the external coaching service: at most one
//!   call per window, and never a second call while one is outstanding.
//!
//! Rep-completion events are never throttled. Safety-severity conditions
//! bypass the long debounce and escalate to critical urgency.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::analysis::FormMetrics;
use crate::coaching::{CoachingCue, CoachingRequest, CoachingService, CueCategory, CueUrgency};
use crate::engine::EngineObserver;
use crate::profile::{ExerciseProfile, Severity};

/// Configuration for the coaching dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Settle window after a confirmed phase transition, in milliseconds
    pub settle_ms: f64,
    /// Minimum spacing between external-service calls, in milliseconds
    pub service_debounce_ms: f64,
    /// Window within which an identical cue message is suppressed, in milliseconds
    pub repeat_suppress_ms: f64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            settle_ms: 1000.0,
            service_debounce_ms: 2000.0,
            repeat_suppress_ms: 4000.0,
        }
    }
}

/// Throttled conduit between the analysis pipeline and the user-facing
/// coaching channel.
pub struct CoachingDispatcher {
    config: DispatcherConfig,
    service: Option<Arc<dyn CoachingService>>,
    last_transition_ms: Option<f64>,
    last_service_call_ms: Option<f64>,
    in_flight: Arc<AtomicBool>,
    service_calls: u64,
    /// Last emission timestamp per cue message
    recent_messages: HashMap<String, f64>,
    /// Externally sourced cues awaiting pickup into the session log
    delivered: Arc<Mutex<Vec<CoachingCue>>>,
}

impl CoachingDispatcher {
    /// Creates a dispatcher with no external service attached.
    #[must_use]
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            service: None,
            last_transition_ms: None,
            last_service_call_ms: None,
            in_flight: Arc::new(AtomicBool::new(false)),
            service_calls: 0,
            recent_messages: HashMap::new(),
            delivered: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Attaches an external coaching service.
    pub fn set_service(&mut self, service: Arc<dyn CoachingService>) {
        self.service = Some(service);
    }

    /// Returns `true` if an external service is attached.
    #[must_use]
    pub fn has_service(&self) -> bool {
        self.service.is_some()
    }

    /// Records a confirmed phase transition, opening the settle window.
    pub fn note_transition(&mut self, at_ms: f64) {
        self.last_transition_ms = Some(at_ms);
    }

    /// Returns `true` while form cues are withheld after a transition.
    #[must_use]
    pub fn in_settle_window(&self, now_ms: f64) -> bool {
        self.last_transition_ms
            .is_some_and(|t| now_ms - t < self.config.settle_ms)
    }

    /// Generates local cues for the current frame's metrics.
    ///
    /// Critical violations produce safety cues that bypass the settle
    /// window; the worst remaining violation produces a form cue outside
    /// it. Identical messages are suppressed within the repeat window.
    pub fn local_cues(&mut self, metrics: &FormMetrics, now_ms: f64) -> Vec<CoachingCue> {
        let mut cues = Vec::new();

        for violation in &metrics.violations {
            if violation.severity == Severity::Critical
                && self.repeat_guard(&violation.correction, now_ms)
            {
                cues.push(CoachingCue::new(
                    violation.correction.clone(),
                    CueCategory::Safety,
                    CueUrgency::Critical,
                    now_ms,
                ));
            }
        }

        if !self.in_settle_window(now_ms) {
            let worst = metrics
                .violations
                .iter()
                .filter(|v| v.severity != Severity::Critical)
                .min_by_key(|v| v.severity);
            if let Some(violation) = worst {
                if self.repeat_guard(&violation.correction, now_ms) {
                    cues.push(CoachingCue::new(
                        violation.correction.clone(),
                        CueCategory::Form,
                        CueUrgency::from_severity(violation.severity),
                        now_ms,
                    ));
                }
            }
        }

        cues
    }

    /// Generates a motivation cue at profile-configured rep milestones.
    ///
    /// Rep-driven cues are never throttled by the settle window.
    pub fn milestone_cue(
        &mut self,
        profile: &ExerciseProfile,
        rep_count: u32,
        now_ms: f64,
    ) -> Option<CoachingCue> {
        let interval = profile.coaching.milestone_interval;
        if interval == 0 || rep_count == 0 || rep_count % interval != 0 {
            return None;
        }
        let lines = &profile.coaching.motivation;
        if lines.is_empty() {
            return None;
        }
        let line = &lines[((rep_count / interval - 1) as usize) % lines.len()];
        Some(CoachingCue::new(
            line.clone(),
            CueCategory::Motivation,
            CueUrgency::Normal,
            now_ms,
        ))
    }

    /// Requests a cue from the external service, if the gates allow it.
    ///
    /// Issues at most one call per debounce window and never a second call
    /// while one is outstanding. `bypass_debounce` lets safety conditions
    /// skip the spacing requirement (the one-in-flight rule still holds).
    /// The call runs on the ambient Tokio runtime; its result is delivered
    /// to the observers asynchronously and staged for the session cue log,
    /// unless the engine epoch has moved on (stop/reset) in the meantime.
    pub fn maybe_request_external(
        &mut self,
        request: CoachingRequest,
        now_ms: f64,
        epoch: &Arc<AtomicU64>,
        observers: &[Arc<dyn EngineObserver>],
        bypass_debounce: bool,
    ) {
        let Some(service) = self.service.clone() else {
            return;
        };
        if self.in_flight.load(Ordering::Acquire) {
            return;
        }
        let debounce_ok = bypass_debounce
            || self
                .last_service_call_ms
                .map_or(true, |last| now_ms - last >= self.config.service_debounce_ms);
        if !debounce_ok {
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                service = service.name(),
                "No Tokio runtime available for coaching service call"
            );
            return;
        };

        self.in_flight.store(true, Ordering::Release);
        self.last_service_call_ms = Some(now_ms);
        self.service_calls += 1;

        let in_flight = Arc::clone(&self.in_flight);
        let delivered = Arc::clone(&self.delivered);
        let epoch = Arc::clone(epoch);
        let epoch_at_call = epoch.load(Ordering::Acquire);
        let observers: Vec<Arc<dyn EngineObserver>> = observers.to_vec();
        let urgency = if bypass_debounce {
            CueUrgency::Critical
        } else {
            CueUrgency::Normal
        };

        handle.spawn(async move {
            let result = service.generate_cue(&request).await;
            in_flight.store(false, Ordering::Release);

            if epoch.load(Ordering::Acquire) != epoch_at_call {
                tracing::debug!(
                    service = service.name(),
                    "Discarding coaching result from a stopped or reset session"
                );
                return;
            }

            match result {
                Ok(Some(message)) => {
                    let cue = CoachingCue::new(message, CueCategory::Form, urgency, now_ms);
                    for observer in &observers {
                        observer.on_coaching_cue(&cue);
                    }
                    delivered.lock().push(cue);
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(
                        service = service.name(),
                        error = %error,
                        "Coaching service call failed; no cue this cycle"
                    );
                }
            }
        });
    }

    /// Drains externally sourced cues staged since the last call.
    #[must_use]
    pub fn drain_delivered(&self) -> Vec<CoachingCue> {
        std::mem::take(&mut *self.delivered.lock())
    }

    /// Total external-service calls issued.
    #[must_use]
    pub fn service_call_count(&self) -> u64 {
        self.service_calls
    }

    /// Resets all timers and staged cues; the attached service is kept.
    pub fn reset(&mut self) {
        self.last_transition_ms = None;
        self.last_service_call_ms = None;
        self.service_calls = 0;
        self.recent_messages.clear();
        self.delivered.lock().clear();
    }

    /// Returns `true` and records the emission if the message is outside
    /// its repeat-suppression window.
    fn repeat_guard(&mut self, message: &str, now_ms: f64) -> bool {
        match self.recent_messages.get(message) {
            Some(&last) if now_ms - last < self.config.repeat_suppress_ms => false,
            _ => {
                self.recent_messages.insert(message.to_owned(), now_ms);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FormViolation;
    use crate::profile::{MovementPattern, MovementPhase, ProfileRegistry};
    use crate::EngineError;
    use async_trait::async_trait;

    fn metrics_with(violations: Vec<FormViolation>) -> FormMetrics {
        FormMetrics {
            score: 100.0 - 15.0 * violations.len() as f32,
            violations,
            velocity: 0.0,
            consistency: 100.0,
            range_of_motion: 0.0,
        }
    }

    fn violation(severity: Severity, correction: &str) -> FormViolation {
        FormViolation {
            rule_id: "r".into(),
            severity,
            message: "violated".into(),
            correction: correction.into(),
        }
    }

    fn request() -> CoachingRequest {
        CoachingRequest {
            pattern: MovementPattern::Squat,
            exercise: "Bodyweight Squat".into(),
            score: 70.0,
            top_violation: Some("Lift your chest".into()),
            rep_count: 3,
            phase: MovementPhase::Bottom,
        }
    }

    struct CountingService {
        calls: Arc<AtomicU64>,
        reply: Option<String>,
    }

    #[async_trait]
    impl CoachingService for CountingService {
        fn name(&self) -> &str {
            "counting"
        }

        async fn generate_cue(
            &self,
            _request: &CoachingRequest,
        ) -> Result<Option<String>, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    #[test]
    fn settle_window_withholds_form_cues() {
        let mut dispatcher = CoachingDispatcher::new(DispatcherConfig::default());
        dispatcher.note_transition(1000.0);

        let metrics = metrics_with(vec![violation(Severity::Warning, "Lift your chest")]);
        // 500 ms after the transition: inside the 1000 ms settle window
        assert!(dispatcher.local_cues(&metrics, 1500.0).is_empty());
        // 1200 ms after: window has elapsed
        let cues = dispatcher.local_cues(&metrics, 2200.0);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].category, CueCategory::Form);
        assert_eq!(cues[0].urgency, CueUrgency::High);
    }

    #[test]
    fn safety_cues_bypass_settle_window() {
        let mut dispatcher = CoachingDispatcher::new(DispatcherConfig::default());
        dispatcher.note_transition(1000.0);

        let metrics = metrics_with(vec![violation(Severity::Critical, "Stop: knees caving in")]);
        let cues = dispatcher.local_cues(&metrics, 1100.0);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].category, CueCategory::Safety);
        assert_eq!(cues[0].urgency, CueUrgency::Critical);
    }

    #[test]
    fn identical_cue_is_suppressed_within_repeat_window() {
        let mut dispatcher = CoachingDispatcher::new(DispatcherConfig::default());
        let metrics = metrics_with(vec![violation(Severity::Warning, "Lift your chest")]);

        assert_eq!(dispatcher.local_cues(&metrics, 0.0).len(), 1);
        // Same correction 2 s later: suppressed
        assert!(dispatcher.local_cues(&metrics, 2000.0).is_empty());
        // After the 4 s repeat window it may fire again
        assert_eq!(dispatcher.local_cues(&metrics, 4500.0).len(), 1);
    }

    #[test]
    fn milestone_cue_rotates_motivation_lines() {
        let mut dispatcher = CoachingDispatcher::new(DispatcherConfig::default());
        let profile = ProfileRegistry::with_builtins()
            .resolve("bodyweight_squat")
            .unwrap();

        assert!(dispatcher.milestone_cue(&profile, 0, 0.0).is_none());
        assert!(dispatcher.milestone_cue(&profile, 3, 0.0).is_none());

        let first = dispatcher.milestone_cue(&profile, 5, 0.0).unwrap();
        let second = dispatcher.milestone_cue(&profile, 10, 0.0).unwrap();
        assert_eq!(first.category, CueCategory::Motivation);
        assert_ne!(first.message, second.message);
    }

    #[tokio::test]
    async fn external_debounce_limits_call_rate() {
        let mut dispatcher = CoachingDispatcher::new(DispatcherConfig {
            service_debounce_ms: 1500.0,
            ..DispatcherConfig::default()
        });
        let calls = Arc::new(AtomicU64::new(0));
        dispatcher.set_service(Arc::new(CountingService {
            calls: Arc::clone(&calls),
            reply: None,
        }));
        let epoch = Arc::new(AtomicU64::new(0));

        // 3 seconds of frames at 30 fps
        for i in 0..90 {
            let now = i as f64 * 33.3;
            dispatcher.maybe_request_external(request(), now, &epoch, &[], false);
            tokio::task::yield_now().await;
        }

        assert!(
            dispatcher.service_call_count() <= 2,
            "expected at most 2 calls, got {}",
            dispatcher.service_call_count()
        );
    }

    #[tokio::test]
    async fn delivered_cue_is_staged_for_pickup() {
        let mut dispatcher = CoachingDispatcher::new(DispatcherConfig::default());
        dispatcher.set_service(Arc::new(CountingService {
            calls: Arc::new(AtomicU64::new(0)),
            reply: Some("Slow your descent".into()),
        }));
        let epoch = Arc::new(AtomicU64::new(0));

        dispatcher.maybe_request_external(request(), 0.0, &epoch, &[], false);
        // Let the spawned task run
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        let staged = dispatcher.drain_delivered();
        assert_eq!(staged.len(), 1);
        assert_eq!(staged[0].message, "Slow your descent");
        assert!(dispatcher.drain_delivered().is_empty());
    }

    #[tokio::test]
    async fn stale_epoch_discards_result() {
        let mut dispatcher = CoachingDispatcher::new(DispatcherConfig::default());
        dispatcher.set_service(Arc::new(CountingService {
            calls: Arc::new(AtomicU64::new(0)),
            reply: Some("Too late".into()),
        }));
        let epoch = Arc::new(AtomicU64::new(0));

        dispatcher.maybe_request_external(request(), 0.0, &epoch, &[], false);
        // Session stops before the result lands
        epoch.fetch_add(1, Ordering::SeqCst);
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert!(dispatcher.drain_delivered().is_empty());
    }

    #[tokio::test]
    async fn safety_bypass_skips_debounce_but_not_in_flight() {
        let mut dispatcher = CoachingDispatcher::new(DispatcherConfig::default());
        let calls = Arc::new(AtomicU64::new(0));
        dispatcher.set_service(Arc::new(CountingService {
            calls: Arc::clone(&calls),
            reply: None,
        }));
        let epoch = Arc::new(AtomicU64::new(0));

        dispatcher.maybe_request_external(request(), 0.0, &epoch, &[], false);
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        // Normal follow-up at +100 ms is debounced; a safety bypass is not
        dispatcher.maybe_request_external(request(), 100.0, &epoch, &[], false);
        assert_eq!(dispatcher.service_call_count(), 1);
        dispatcher.maybe_request_external(request(), 100.0, &epoch, &[], true);
        assert_eq!(dispatcher.service_call_count(), 2);
    }
}
