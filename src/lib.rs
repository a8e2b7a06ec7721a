pub mod core;
pub mod models;

pub use crate::core::config::SessionConfig;
pub use crate::core::engine::{Engine, EngineEvents};
pub use crate::models::exercise::{BreakPolicy, ExerciseType, Phase, Progress, Target};
pub use crate::models::keypoint::{Joint, Keypoint, KeypointFrame};
pub use crate::models::session::{
    PoseUpdate, Readiness, SessionError, SessionEvent, SessionResult, SessionState, SessionSummary,
};
