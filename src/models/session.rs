// Data models for session lifecycle, engine events and errors

use crate::models::exercise::{ExerciseType, Phase, Progress, Target};
use crate::models::keypoint::{Joint, KeypointFrame};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// Session State
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "remaining", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Positioning,
    /// Ticks left before detection goes live
    CountingDown(u32),
    Active,
    Complete,
}

impl SessionState {
    pub fn to_string(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Positioning => "positioning",
            SessionState::CountingDown(_) => "counting_down",
            SessionState::Active => "active",
            SessionState::Complete => "complete",
        }
    }

    /// States in which a frame produces a pose update
    pub fn accepts_frames(&self) -> bool {
        matches!(
            self,
            SessionState::Positioning | SessionState::CountingDown(_) | SessionState::Active
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::CountingDown(n) => write!(f, "counting_down({})", n),
            other => write!(f, "{}", SessionState::to_string(other)),
        }
    }
}

// ==============================================================================
// Readiness
// ==============================================================================

/// Whether the visible body is good enough to begin or continue detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Readiness {
    pub ready: bool,
    pub hint: String,
    /// Required joints that were absent or under the confidence threshold
    pub missing: Vec<Joint>,
}

impl Readiness {
    pub fn ready() -> Self {
        Self {
            ready: true,
            hint: "Hold still".to_string(),
            missing: Vec::new(),
        }
    }

    pub fn not_ready(hint: impl Into<String>, missing: Vec<Joint>) -> Self {
        Self {
            ready: false,
            hint: hint.into(),
            missing,
        }
    }
}

// ==============================================================================
// Engine Events
// ==============================================================================

/// Emitted for every accepted frame while a session exists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseUpdate {
    pub readiness: Readiness,
    pub phase: Phase,
    pub state: SessionState,
    pub keypoints: KeypointFrame,
}

/// Emitted on session state and progress changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    Progress {
        progress: Progress,
    },
    Completed {
        progress: Progress,
        skipped: bool,
    },
}

// ==============================================================================
// Session Summary
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub exercise: ExerciseType,
    pub target: Target,
    pub state: SessionState,
    pub progress: Progress,
    pub frames_seen: u64,
    pub frames_ready: u64,
    pub manual_ticks: u32,
    pub skipped: bool,
}

// ==============================================================================
// Error Types
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("Cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown exercise: {0}")]
    UnknownExercise(String),

    #[error("Target {target} does not fit exercise {exercise}")]
    TargetMismatch { exercise: ExerciseType, target: Target },

    #[error("Engine has been disposed")]
    Disposed,

    #[error("No async runtime available: {0}")]
    RuntimeUnavailable(String),
}

pub type SessionResult<T> = Result<T, SessionError>;
