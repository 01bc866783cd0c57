//! The caller-owned motion analysis engine.
//!
//! One [`MotionEngine`] instance owns one in-progress session. The caller
//! drives frames serially into [`MotionEngine::process_frame`] (`&mut self`
//! enforces the single-writer rule); rep-completed and form-updated
//! callbacks fire synchronously from that call, while externally sourced
//! coaching cues may arrive asynchronously after it returns.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use formpulse_core::Frame;

use crate::analysis::{
    FormMetrics, FormScorer, PhaseClassifier, PhaseDebouncer, RepCounter, DEFAULT_RULE_PENALTY,
};
use crate::coaching::{
    CoachingCue, CoachingDispatcher, CoachingRequest, CoachingService, DispatcherConfig,
};
use crate::profile::{ExerciseProfile, ProfileRegistry};
use crate::session::{SessionAnalytics, SessionSummary, DEFAULT_PASS_THRESHOLD};
use crate::EngineError;

/// Default number of consecutive agreeing frames to confirm a phase change.
pub const DEFAULT_DEBOUNCE_FRAMES: u32 = 3;

/// Receives engine results.
///
/// Implementations must be cheap and non-blocking: rep and form callbacks
/// run inside `process_frame`, and cue callbacks may run on a Tokio worker.
pub trait EngineObserver: Send + Sync {
    /// A repetition fired; `count` is the new total.
    fn on_rep_completed(&self, count: u32) {
        let _ = count;
    }

    /// A frame was scored.
    fn on_form_updated(&self, metrics: &FormMetrics) {
        let _ = metrics;
    }

    /// A coaching cue was emitted.
    fn on_coaching_cue(&self, cue: &CoachingCue) {
        let _ = cue;
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum landmark visibility for a frame to be analyzed
    pub visibility_threshold: f32,
    /// Consecutive agreeing frames required to confirm a phase change
    pub debounce_frames: u32,
    /// Score deduction per failing form rule
    pub rule_penalty: f32,
    /// Score at or above which a repetition counts as valid
    pub pass_threshold: f32,
    /// Coaching dispatch throttling
    pub dispatcher: DispatcherConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: formpulse_core::DEFAULT_VISIBILITY_THRESHOLD,
            debounce_frames: DEFAULT_DEBOUNCE_FRAMES,
            rule_penalty: DEFAULT_RULE_PENALTY,
            pass_threshold: DEFAULT_PASS_THRESHOLD,
            dispatcher: DispatcherConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Sets the landmark visibility threshold, clamped to [0, 1].
    #[must_use]
    pub fn visibility_threshold(mut self, threshold: f32) -> Self {
        self.config.visibility_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Sets the debounce frame count (at least 1).
    #[must_use]
    pub fn debounce_frames(mut self, frames: u32) -> Self {
        self.config.debounce_frames = frames.max(1);
        self
    }

    /// Sets the per-rule score penalty, clamped to [0, 100].
    #[must_use]
    pub fn rule_penalty(mut self, penalty: f32) -> Self {
        self.config.rule_penalty = penalty.clamp(0.0, 100.0);
        self
    }

    /// Sets the valid-rep pass threshold, clamped to [0, 100].
    #[must_use]
    pub fn pass_threshold(mut self, threshold: f32) -> Self {
        self.config.pass_threshold = threshold.clamp(0.0, 100.0);
        self
    }

    /// Sets the settle window after phase transitions, in milliseconds.
    #[must_use]
    pub fn settle_ms(mut self, settle_ms: f64) -> Self {
        self.config.dispatcher.settle_ms = settle_ms.max(0.0);
        self
    }

    /// Sets the external-service debounce, clamped to the supported
    /// 1500-3000 ms range.
    #[must_use]
    pub fn service_debounce_ms(mut self, debounce_ms: f64) -> Self {
        self.config.dispatcher.service_debounce_ms = debounce_ms.clamp(1500.0, 3000.0);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> EngineConfig {
        self.config
    }
}

/// Lifecycle state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Not analyzing; frames are ignored
    Idle,
    /// Analyzing frames into the current session
    Active,
}

/// Real-time motion analysis engine for one exercise at a time.
pub struct MotionEngine {
    config: EngineConfig,
    profile: Arc<ExerciseProfile>,
    state: EngineState,

    classifier: PhaseClassifier,
    debouncer: PhaseDebouncer,
    rep_counter: RepCounter,
    scorer: FormScorer,
    session: Option<SessionAnalytics>,
    dispatcher: CoachingDispatcher,

    observers: Vec<Arc<dyn EngineObserver>>,
    /// Bumped on stop/reset so in-flight coaching results get discarded
    epoch: Arc<AtomicU64>,
    last_summary: Option<SessionSummary>,
    warned_not_started: bool,
    /// Whether the previous frame carried a critical violation; safety
    /// conditions bypass the service debounce only on their leading edge
    critical_active: bool,
}

impl MotionEngine {
    /// Creates an engine for a profile, validating it first.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Profile`] if the profile fails validation.
    pub fn new(profile: ExerciseProfile, config: EngineConfig) -> Result<Self, EngineError> {
        profile.validate()?;
        Ok(Self::build(Arc::new(profile), config))
    }

    /// Creates an engine for a registry-resolved exercise.
    ///
    /// Returns `None` when the exercise is unsupported, letting the caller
    /// fall back to a manual mode.
    #[must_use]
    pub fn for_exercise(
        registry: &ProfileRegistry,
        exercise_id: &str,
        config: EngineConfig,
    ) -> Option<Self> {
        registry
            .resolve(exercise_id)
            .map(|profile| Self::build(profile, config))
    }

    fn build(profile: Arc<ExerciseProfile>, config: EngineConfig) -> Self {
        let classifier = PhaseClassifier::new(config.visibility_threshold);
        let debouncer = PhaseDebouncer::new(profile.start_phase, config.debounce_frames);
        let rep_counter = Self::counter_for(&profile, &config);
        let scorer = FormScorer::new(config.rule_penalty, config.visibility_threshold);
        let dispatcher = CoachingDispatcher::new(config.dispatcher.clone());

        Self {
            config,
            profile,
            state: EngineState::Idle,
            classifier,
            debouncer,
            rep_counter,
            scorer,
            session: None,
            dispatcher,
            observers: Vec::new(),
            epoch: Arc::new(AtomicU64::new(0)),
            last_summary: None,
            warned_not_started: false,
            critical_active: false,
        }
    }

    fn counter_for(profile: &ExerciseProfile, config: &EngineConfig) -> RepCounter {
        RepCounter::new(
            profile.trigger.clone(),
            profile.start_threshold,
            profile.end_threshold,
            profile.min_cycle_ms,
            profile.requires_full_range,
            profile.min_range_percent,
            config.visibility_threshold,
        )
    }

    /// Registers an observer.
    pub fn add_observer(&mut self, observer: Arc<dyn EngineObserver>) {
        self.observers.push(observer);
    }

    /// Attaches the external coaching service.
    pub fn set_coaching_service(&mut self, service: Arc<dyn CoachingService>) {
        self.dispatcher.set_service(service);
    }

    /// Starts a new session.
    ///
    /// Starting an already-started engine logs a warning and is a no-op.
    pub fn start(&mut self) {
        if self.state == EngineState::Active {
            tracing::warn!(exercise = %self.profile.id, "Engine already started; ignoring start()");
            return;
        }
        self.reset_pipeline();
        self.session = Some(SessionAnalytics::new(
            self.profile.id.clone(),
            self.config.pass_threshold,
        ));
        self.state = EngineState::Active;
        self.warned_not_started = false;
        tracing::info!(exercise = %self.profile.id, "Session started");
    }

    /// Stops the session and finalizes its summary.
    ///
    /// Stopping an unstarted engine is a no-op returning `None`. Any
    /// in-flight coaching-service result is discarded rather than cancelled.
    pub fn stop(&mut self) -> Option<SessionSummary> {
        if self.state == EngineState::Idle {
            return None;
        }
        self.state = EngineState::Idle;
        self.epoch.fetch_add(1, Ordering::AcqRel);

        // Fold any already-delivered external cues into the log before sealing
        let pending = self.dispatcher.drain_delivered();
        let mut session = self.session.take()?;
        for cue in &pending {
            session.record_cue(cue);
        }
        let summary = session.finalize(&self.profile.calories, self.rep_counter.best_hold_seconds());
        tracing::info!(
            exercise = %self.profile.id,
            total_reps = summary.total_reps,
            average_score = summary.average_score,
            "Session stopped"
        );
        self.last_summary = Some(summary.clone());
        Some(summary)
    }

    /// Zeroes all counters and timers, keeping the loaded profile.
    ///
    /// If a session is active, a fresh one begins in place.
    pub fn reset(&mut self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.reset_pipeline();
        if self.state == EngineState::Active {
            self.session = Some(SessionAnalytics::new(
                self.profile.id.clone(),
                self.config.pass_threshold,
            ));
        } else {
            self.session = None;
        }
        tracing::debug!(exercise = %self.profile.id, "Engine reset");
    }

    fn reset_pipeline(&mut self) {
        self.debouncer.reset(self.profile.start_phase);
        self.rep_counter.reset();
        self.scorer.reset();
        self.dispatcher.reset();
        self.critical_active = false;
    }

    /// Processes one frame.
    ///
    /// Frames below the required-visibility threshold, and frames received
    /// while the engine is not started, are ignored without error.
    pub fn process_frame(&mut self, frame: &Frame) {
        if self.state != EngineState::Active {
            if !self.warned_not_started {
                tracing::warn!("Frame received while engine is not started; ignoring");
                self.warned_not_started = true;
            }
            return;
        }

        if !frame.has_required(
            &self.profile.required_landmarks,
            self.config.visibility_threshold,
        ) {
            if let Some(session) = &mut self.session {
                session.record_discarded();
            }
            return;
        }

        let now_ms = frame.timestamp_ms;

        // Classification and scoring run independently off the same frame
        let raw = self
            .classifier
            .classify(frame, &self.profile, self.debouncer.confirmed());
        let metrics = self.scorer.score_frame(
            frame,
            &self.profile,
            raw.phase,
            self.rep_counter.current_range_of_motion(),
        );

        if let Some(transition) = self.debouncer.observe(raw.phase, now_ms) {
            self.dispatcher.note_transition(transition.at_ms);
        }

        let rep_event = self.rep_counter.observe(frame, self.debouncer.confirmed());

        if let Some(session) = &mut self.session {
            session.record_frame(now_ms, &metrics);
        }
        for observer in &self.observers {
            observer.on_form_updated(&metrics);
        }

        if let Some(event) = rep_event {
            if let Some(session) = &mut self.session {
                session.record_rep(&event);
            }
            // Rep completions are never throttled
            for observer in &self.observers {
                observer.on_rep_completed(event.count);
            }
            if let Some(cue) = self
                .dispatcher
                .milestone_cue(&self.profile, event.count, now_ms)
            {
                self.emit_cue(cue);
            }
        }

        for cue in self.dispatcher.local_cues(&metrics, now_ms) {
            self.emit_cue(cue);
        }

        // Externally sourced cues were already delivered to observers by the
        // service task; fold them into the session log here
        for cue in self.dispatcher.drain_delivered() {
            if let Some(session) = &mut self.session {
                session.record_cue(&cue);
            }
        }

        let request = CoachingRequest {
            pattern: self.profile.pattern,
            exercise: self.profile.display_name.clone(),
            score: metrics.score,
            top_violation: metrics.worst_violation().map(|v| v.message.clone()),
            rep_count: self.rep_counter.count(),
            phase: self.debouncer.confirmed(),
        };
        let safety_edge = metrics.has_critical() && !self.critical_active;
        self.critical_active = metrics.has_critical();
        self.dispatcher.maybe_request_external(
            request,
            now_ms,
            &self.epoch,
            &self.observers,
            safety_edge,
        );
    }

    fn emit_cue(&mut self, cue: CoachingCue) {
        if let Some(session) = &mut self.session {
            session.record_cue(&cue);
        }
        for observer in &self.observers {
            observer.on_coaching_cue(&cue);
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The loaded profile.
    #[must_use]
    pub fn profile(&self) -> &ExerciseProfile {
        &self.profile
    }

    /// Total repetitions in the current session.
    #[must_use]
    pub fn rep_count(&self) -> u32 {
        self.rep_counter.count()
    }

    /// Elapsed hold seconds (hold profiles).
    #[must_use]
    pub fn hold_seconds(&self) -> f64 {
        self.rep_counter.hold_seconds()
    }

    /// Running session analytics, while a session is active.
    #[must_use]
    pub fn session(&self) -> Option<&SessionAnalytics> {
        self.session.as_ref()
    }

    /// Summary of the most recently stopped session.
    #[must_use]
    pub fn last_summary(&self) -> Option<&SessionSummary> {
        self.last_summary.as_ref()
    }

    /// Total external coaching-service calls issued this session.
    #[must_use]
    pub fn coaching_call_count(&self) -> u64 {
        self.dispatcher.service_call_count()
    }
}
