// Readiness gate - decides whether enough of the body is visible to detect

use crate::models::exercise::{ExerciseType, RequiredJoints};
use crate::models::keypoint::{Joint, KeypointFrame};
use crate::models::session::Readiness;

const EMPTY_FRAME_HINT: &str = "Step into the camera view";

/// Pure check of a frame against an exercise's minimum joint set.
/// Never fails: malformed or empty frames are simply not ready.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    exercise: ExerciseType,
    required: RequiredJoints,
    min_confidence: f32,
}

impl ReadinessGate {
    pub fn new(exercise: ExerciseType, min_confidence: f32) -> Self {
        Self {
            exercise,
            required: exercise.required_joints(),
            min_confidence,
        }
    }

    pub fn evaluate(&self, frame: &KeypointFrame) -> Readiness {
        if frame.is_empty() {
            return Readiness::not_ready(EMPTY_FRAME_HINT, self.all_required());
        }

        let missing = match &self.required {
            RequiredJoints::All(joints) => self.missing_from(frame, joints.iter().copied()),
            RequiredJoints::EitherSide(pairs) => {
                let left = self.missing_from(frame, pairs.iter().map(|(l, _)| *l));
                let right = self.missing_from(frame, pairs.iter().map(|(_, r)| *r));
                // Report against whichever side is closer to complete
                if left.len() <= right.len() {
                    left
                } else {
                    right
                }
            }
        };

        if missing.is_empty() {
            Readiness::ready()
        } else {
            Readiness::not_ready(self.exercise.positioning_hint(), missing)
        }
    }

    fn missing_from(&self, frame: &KeypointFrame, joints: impl Iterator<Item = Joint>) -> Vec<Joint> {
        joints
            .filter(|joint| frame.visible(*joint, self.min_confidence).is_none())
            .collect()
    }

    fn all_required(&self) -> Vec<Joint> {
        match &self.required {
            RequiredJoints::All(joints) => joints.clone(),
            RequiredJoints::EitherSide(pairs) => pairs.iter().map(|(l, _)| *l).collect(),
        }
    }
}
