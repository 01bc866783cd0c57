//! External coaching-service boundary.

use async_trait::async_trait;

use crate::profile::{MovementPattern, MovementPhase};
use crate::EngineError;

/// Snapshot handed to the coaching service when a cue is requested.
#[derive(Debug, Clone, PartialEq)]
pub struct CoachingRequest {
    /// Movement pattern of the active exercise
    pub pattern: MovementPattern,
    /// Display name of the active exercise
    pub exercise: String,
    /// Current form score
    pub score: f32,
    /// Message of the worst current violation, if any
    pub top_violation: Option<String>,
    /// Repetitions completed so far
    pub rep_count: u32,
    /// Current confirmed phase
    pub phase: MovementPhase,
}

/// A natural-language coaching generator consulted by the dispatcher.
///
/// Implementations are best-effort: a failure or `None` suppresses only that
/// cycle's cue and never interrupts frame analysis. Calls are issued off the
/// frame path, at most one in flight per debounce window.
#[async_trait]
pub trait CoachingService: Send + Sync {
    /// Service name, used in logs.
    fn name(&self) -> &str;

    /// Generates an optional short cue for the given state.
    async fn generate_cue(&self, request: &CoachingRequest) -> Result<Option<String>, EngineError>;
}

/// Local fallback service that phrases the worst current violation.
///
/// Keeps the coaching channel useful when no network-backed generator is
/// configured.
#[derive(Debug, Default)]
pub struct RuleBasedCoachingService;

#[async_trait]
impl CoachingService for RuleBasedCoachingService {
    fn name(&self) -> &str {
        "rule_based"
    }

    async fn generate_cue(&self, request: &CoachingRequest) -> Result<Option<String>, EngineError> {
        if let Some(violation) = &request.top_violation {
            return Ok(Some(violation.clone()));
        }
        if request.score >= 90.0 && request.rep_count > 0 {
            return Ok(Some(format!(
                "{} reps with clean form, keep it up",
                request.rep_count
            )));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(score: f32, top_violation: Option<&str>, rep_count: u32) -> CoachingRequest {
        CoachingRequest {
            pattern: MovementPattern::Squat,
            exercise: "Bodyweight Squat".into(),
            score,
            top_violation: top_violation.map(String::from),
            rep_count,
            phase: MovementPhase::Bottom,
        }
    }

    #[tokio::test]
    async fn rule_based_phrases_top_violation() {
        let service = RuleBasedCoachingService;
        let cue = service
            .generate_cue(&request(55.0, Some("Lift your chest"), 3))
            .await
            .unwrap();
        assert_eq!(cue.as_deref(), Some("Lift your chest"));
    }

    #[tokio::test]
    async fn rule_based_praises_clean_form() {
        let service = RuleBasedCoachingService;
        let cue = service.generate_cue(&request(95.0, None, 4)).await.unwrap();
        assert!(cue.unwrap().contains("4 reps"));
    }

    #[tokio::test]
    async fn rule_based_stays_quiet_otherwise() {
        let service = RuleBasedCoachingService;
        let cue = service.generate_cue(&request(80.0, None, 2)).await.unwrap();
        assert!(cue.is_none());
    }
}
