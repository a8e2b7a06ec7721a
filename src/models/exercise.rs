// Data models for exercise types, classified phases, targets and progress

use crate::models::keypoint::Joint;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==============================================================================
// Exercise Types
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseType {
    PushUp,
    Squat,
    SitUp,
    JumpingJack,
    Plank,
    WallSit,
}

/// How progress is measured for an exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    /// Counted repetitions; one rep per `from -> to` stable transition
    Cyclic { from: Phase, to: Phase },
    /// Accumulated seconds spent in `Phase::Holding`
    Hold,
}

/// What a hold timer does when the pose breaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakPolicy {
    Pause,
    Reset,
}

impl ExerciseType {
    pub fn all() -> Vec<ExerciseType> {
        vec![
            ExerciseType::PushUp,
            ExerciseType::Squat,
            ExerciseType::SitUp,
            ExerciseType::JumpingJack,
            ExerciseType::Plank,
            ExerciseType::WallSit,
        ]
    }

    pub fn to_string(&self) -> &'static str {
        match self {
            ExerciseType::PushUp => "push_up",
            ExerciseType::Squat => "squat",
            ExerciseType::SitUp => "sit_up",
            ExerciseType::JumpingJack => "jumping_jack",
            ExerciseType::Plank => "plank",
            ExerciseType::WallSit => "wall_sit",
        }
    }

    /// Parse an exercise name. Accepts snake_case and a few common spellings.
    pub fn from_string(s: &str) -> Result<Self, String> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "push_up" | "pushup" => Ok(ExerciseType::PushUp),
            "squat" => Ok(ExerciseType::Squat),
            "sit_up" | "situp" => Ok(ExerciseType::SitUp),
            "jumping_jack" | "jumping_jacks" => Ok(ExerciseType::JumpingJack),
            "plank" => Ok(ExerciseType::Plank),
            "wall_sit" | "wallsit" => Ok(ExerciseType::WallSit),
            _ => Err(format!("Unknown exercise: {}", s)),
        }
    }

    pub fn kind(&self) -> ExerciseKind {
        match self {
            ExerciseType::PushUp | ExerciseType::Squat | ExerciseType::SitUp => {
                ExerciseKind::Cyclic {
                    from: Phase::Down,
                    to: Phase::Up,
                }
            }
            // Arms up and feet apart, then back together
            ExerciseType::JumpingJack => ExerciseKind::Cyclic {
                from: Phase::Up,
                to: Phase::Down,
            },
            ExerciseType::Plank | ExerciseType::WallSit => ExerciseKind::Hold,
        }
    }

    pub fn is_hold(&self) -> bool {
        matches!(self.kind(), ExerciseKind::Hold)
    }

    /// Break behaviour used when the session config does not override it
    pub fn default_break_policy(&self) -> BreakPolicy {
        match self {
            ExerciseType::WallSit => BreakPolicy::Reset,
            _ => BreakPolicy::Pause,
        }
    }

    /// Joints that must be visible before detection may begin. Side-view
    /// exercises accept either side, so both sides are listed as alternatives
    /// via `RequiredJoints::EitherSide`.
    pub fn required_joints(&self) -> RequiredJoints {
        match self {
            ExerciseType::PushUp => RequiredJoints::EitherSide(vec![
                (Joint::LeftShoulder, Joint::RightShoulder),
                (Joint::LeftElbow, Joint::RightElbow),
                (Joint::LeftWrist, Joint::RightWrist),
                (Joint::LeftHip, Joint::RightHip),
                (Joint::LeftAnkle, Joint::RightAnkle),
            ]),
            ExerciseType::Squat | ExerciseType::WallSit => RequiredJoints::EitherSide(vec![
                (Joint::LeftShoulder, Joint::RightShoulder),
                (Joint::LeftHip, Joint::RightHip),
                (Joint::LeftKnee, Joint::RightKnee),
                (Joint::LeftAnkle, Joint::RightAnkle),
            ]),
            ExerciseType::SitUp => RequiredJoints::EitherSide(vec![
                (Joint::LeftShoulder, Joint::RightShoulder),
                (Joint::LeftHip, Joint::RightHip),
                (Joint::LeftKnee, Joint::RightKnee),
            ]),
            ExerciseType::Plank => RequiredJoints::EitherSide(vec![
                (Joint::LeftShoulder, Joint::RightShoulder),
                (Joint::LeftElbow, Joint::RightElbow),
                (Joint::LeftHip, Joint::RightHip),
                (Joint::LeftAnkle, Joint::RightAnkle),
            ]),
            ExerciseType::JumpingJack => RequiredJoints::All(vec![
                Joint::LeftShoulder,
                Joint::RightShoulder,
                Joint::LeftWrist,
                Joint::RightWrist,
                Joint::LeftHip,
                Joint::RightHip,
                Joint::LeftAnkle,
                Joint::RightAnkle,
            ]),
        }
    }

    /// Positioning hint shown while the body is not fully visible
    pub fn positioning_hint(&self) -> &'static str {
        match self {
            ExerciseType::PushUp | ExerciseType::Plank => {
                "Show your full body from the side, head to feet"
            }
            ExerciseType::Squat | ExerciseType::WallSit => {
                "Stand side-on so your hips, knees and ankles are visible"
            }
            ExerciseType::SitUp => "Lie side-on to the camera with knees bent",
            ExerciseType::JumpingJack => "Face the camera and step back until your whole body fits",
        }
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", ExerciseType::to_string(self))
    }
}

/// Minimum visible joint set for an exercise
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequiredJoints {
    /// Every listed joint must be visible
    All(Vec<Joint>),
    /// For every (left, right) pair, the same side must be visible throughout
    EitherSide(Vec<(Joint, Joint)>),
}

// ==============================================================================
// Phase
// ==============================================================================

/// Discrete body position for one frame. `Unknown` is produced whenever
/// keypoints are insufficient or the pose sits inside a dead zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Up,
    Down,
    Holding,
    Broken,
    #[default]
    Unknown,
}

impl Phase {
    pub fn to_string(&self) -> &'static str {
        match self {
            Phase::Up => "up",
            Phase::Down => "down",
            Phase::Holding => "holding",
            Phase::Broken => "broken",
            Phase::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Phase::to_string(self))
    }
}

// ==============================================================================
// Target & Progress
// ==============================================================================

/// Completion threshold, fixed for the lifetime of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Target {
    Reps(u32),
    HoldSeconds(u32),
}

impl Target {
    pub fn amount(&self) -> u32 {
        match self {
            Target::Reps(n) | Target::HoldSeconds(n) => *n,
        }
    }

    pub fn matches_kind(&self, kind: ExerciseKind) -> bool {
        matches!(
            (self, kind),
            (Target::Reps(_), ExerciseKind::Cyclic { .. }) | (Target::HoldSeconds(_), ExerciseKind::Hold)
        )
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Reps(n) => write!(f, "{} reps", n),
            Target::HoldSeconds(n) => write!(f, "{}s hold", n),
        }
    }
}

/// Running count for the live session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Progress {
    Reps(u32),
    HoldSeconds(u32),
}

impl Progress {
    pub fn amount(&self) -> u32 {
        match self {
            Progress::Reps(n) | Progress::HoldSeconds(n) => *n,
        }
    }

    pub fn reaches(&self, target: &Target) -> bool {
        self.amount() >= target.amount()
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progress::Reps(n) => write!(f, "{} reps", n),
            Progress::HoldSeconds(n) => write!(f, "{}s", n),
        }
    }
}
