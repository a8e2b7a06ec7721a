use crate::models::exercise::{BreakPolicy, ExerciseType, Target};
use crate::models::session::{SessionError, SessionResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-session configuration, supplied at `start()`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Exercise being tracked; selects classifier and accumulator
    pub exercise: ExerciseType,
    /// Completion threshold (reps for cyclic, seconds for holds)
    pub target: Target,
    /// Uninterrupted readiness required before the countdown starts
    #[serde(default = "default_stability_window_ms")]
    pub stability_window_ms: u64,
    /// Number of countdown ticks between positioning and detection
    #[serde(default = "default_countdown_ticks")]
    pub countdown_ticks: u32,
    /// Duration of a single countdown tick
    #[serde(default = "default_countdown_tick_ms")]
    pub countdown_tick_ms: u64,
    /// Per-joint confidence threshold (0.0-1.0)
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    /// How long a phase must persist before it counts as a transition
    #[serde(default = "default_min_dwell_ms")]
    pub min_dwell_ms: u64,
    /// Moving-average window applied to the classifier's main feature
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,
    /// Overrides the exercise's default behaviour when a hold breaks
    #[serde(default)]
    pub break_policy: Option<BreakPolicy>,
}

fn default_stability_window_ms() -> u64 {
    1500
}

fn default_countdown_ticks() -> u32 {
    3
}

fn default_countdown_tick_ms() -> u64 {
    1000
}

fn default_min_confidence() -> f32 {
    0.5
}

fn default_min_dwell_ms() -> u64 {
    150
}

fn default_smoothing_window() -> usize {
    3
}

impl SessionConfig {
    pub fn new(exercise: ExerciseType, target: Target) -> Self {
        Self {
            exercise,
            target,
            stability_window_ms: default_stability_window_ms(),
            countdown_ticks: default_countdown_ticks(),
            countdown_tick_ms: default_countdown_tick_ms(),
            min_confidence: default_min_confidence(),
            min_dwell_ms: default_min_dwell_ms(),
            smoothing_window: default_smoothing_window(),
            break_policy: None,
        }
    }

    /// Build from an exercise name as received from the UI layer
    pub fn for_exercise_name(name: &str, target: Target) -> SessionResult<Self> {
        let exercise = ExerciseType::from_string(name).map_err(|_| SessionError::UnknownExercise(name.to_string()))?;
        Ok(Self::new(exercise, target))
    }

    pub fn with_stability_window_ms(mut self, ms: u64) -> Self {
        self.stability_window_ms = ms;
        self
    }

    pub fn with_countdown(mut self, ticks: u32, tick_ms: u64) -> Self {
        self.countdown_ticks = ticks;
        self.countdown_tick_ms = tick_ms;
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_min_dwell_ms(mut self, ms: u64) -> Self {
        self.min_dwell_ms = ms;
        self
    }

    pub fn with_smoothing_window(mut self, window: usize) -> Self {
        self.smoothing_window = window;
        self
    }

    pub fn with_break_policy(mut self, policy: BreakPolicy) -> Self {
        self.break_policy = Some(policy);
        self
    }

    /// Break policy in force for this session
    pub fn effective_break_policy(&self) -> BreakPolicy {
        self.break_policy
            .unwrap_or_else(|| self.exercise.default_break_policy())
    }

    /// Parse and validate a JSON config
    pub fn from_json(contents: &str) -> SessionResult<Self> {
        let config: SessionConfig = serde_json::from_str(contents)
            .map_err(|e| SessionError::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> SessionResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SessionError::InvalidConfig(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    /// Validate configuration values
    pub fn validate(&self) -> SessionResult<()> {
        if !self.target.matches_kind(self.exercise.kind()) {
            return Err(SessionError::TargetMismatch {
                exercise: self.exercise,
                target: self.target,
            });
        }

        if self.target.amount() == 0 {
            return Err(SessionError::InvalidConfig(format!(
                "Invalid target: {}. Must be greater than zero",
                self.target
            )));
        }

        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(SessionError::InvalidConfig(format!(
                "Invalid minimum confidence: {}. Must be between 0.0 and 1.0",
                self.min_confidence
            )));
        }

        if self.countdown_ticks > 0 && self.countdown_tick_ms == 0 {
            return Err(SessionError::InvalidConfig(
                "Invalid countdown tick duration: 0. Must be greater than zero".to_string(),
            ));
        }

        if self.min_dwell_ms == 0 {
            return Err(SessionError::InvalidConfig(
                "Invalid dwell time: 0. Must be greater than zero".to_string(),
            ));
        }

        if self.smoothing_window == 0 {
            return Err(SessionError::InvalidConfig(
                "Invalid smoothing window: 0. Must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::new(ExerciseType::PushUp, Target::Reps(10));
        assert_eq!(config.stability_window_ms, 1500);
        assert_eq!(config.countdown_ticks, 3);
        assert_eq!(config.min_confidence, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_target_is_rejected() {
        let config = SessionConfig::new(ExerciseType::Squat, Target::Reps(0));
        assert!(matches!(config.validate(), Err(SessionError::InvalidConfig(_))));
    }

    #[test]
    fn test_target_kind_must_match() {
        let config = SessionConfig::new(ExerciseType::Plank, Target::Reps(5));
        assert!(matches!(config.validate(), Err(SessionError::TargetMismatch { .. })));
    }

    #[test]
    fn test_invalid_confidence() {
        let config = SessionConfig::new(ExerciseType::Squat, Target::Reps(5)).with_min_confidence(1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_exercise_name() {
        let result = SessionConfig::for_exercise_name("burpee", Target::Reps(5));
        assert_eq!(result, Err(SessionError::UnknownExercise("burpee".to_string())));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = SessionConfig::from_json(
            r#"{"exercise":"wall_sit","target":{"kind":"hold_seconds","value":45},"countdown_ticks":5}"#,
        )
        .unwrap();
        assert_eq!(config.exercise, ExerciseType::WallSit);
        assert_eq!(config.target, Target::HoldSeconds(45));
        assert_eq!(config.countdown_ticks, 5);
        assert_eq!(config.min_dwell_ms, 150);
        assert_eq!(config.effective_break_policy(), BreakPolicy::Reset);
    }

    #[test]
    fn test_from_json_validates() {
        let result = SessionConfig::from_json(r#"{"exercise":"squat","target":{"kind":"reps","value":0}}"#);
        assert!(result.is_err());

        let result = SessionConfig::from_json(r#"{"exercise":"burpee","target":{"kind":"reps","value":3}}"#);
        assert!(matches!(result, Err(SessionError::InvalidConfig(_))));
    }

    #[test]
    fn test_break_policy_override() {
        let config = SessionConfig::new(ExerciseType::Plank, Target::HoldSeconds(30))
            .with_break_policy(BreakPolicy::Reset);
        assert_eq!(config.effective_break_policy(), BreakPolicy::Reset);
    }
}
