// Data models for the keypoint stream produced by the external pose estimator

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ==============================================================================
// Body Joints (COCO 17-point layout)
// ==============================================================================

/// Named body joints the engine understands.
/// Serialized as snake_case names so a frame encodes as a flat map
/// of joint-name -> {x, y, confidence}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl Joint {
    pub fn all() -> Vec<Joint> {
        vec![
            Joint::Nose,
            Joint::LeftEye,
            Joint::RightEye,
            Joint::LeftEar,
            Joint::RightEar,
            Joint::LeftShoulder,
            Joint::RightShoulder,
            Joint::LeftElbow,
            Joint::RightElbow,
            Joint::LeftWrist,
            Joint::RightWrist,
            Joint::LeftHip,
            Joint::RightHip,
            Joint::LeftKnee,
            Joint::RightKnee,
            Joint::LeftAnkle,
            Joint::RightAnkle,
        ]
    }

    pub fn to_string(&self) -> &'static str {
        match self {
            Joint::Nose => "nose",
            Joint::LeftEye => "left_eye",
            Joint::RightEye => "right_eye",
            Joint::LeftEar => "left_ear",
            Joint::RightEar => "right_ear",
            Joint::LeftShoulder => "left_shoulder",
            Joint::RightShoulder => "right_shoulder",
            Joint::LeftElbow => "left_elbow",
            Joint::RightElbow => "right_elbow",
            Joint::LeftWrist => "left_wrist",
            Joint::RightWrist => "right_wrist",
            Joint::LeftHip => "left_hip",
            Joint::RightHip => "right_hip",
            Joint::LeftKnee => "left_knee",
            Joint::RightKnee => "right_knee",
            Joint::LeftAnkle => "left_ankle",
            Joint::RightAnkle => "right_ankle",
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Joint::to_string(self))
    }
}

/// Which side of the body a side-view exercise is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodySide {
    Left,
    Right,
}

impl BodySide {
    pub fn shoulder(&self) -> Joint {
        match self {
            BodySide::Left => Joint::LeftShoulder,
            BodySide::Right => Joint::RightShoulder,
        }
    }

    pub fn elbow(&self) -> Joint {
        match self {
            BodySide::Left => Joint::LeftElbow,
            BodySide::Right => Joint::RightElbow,
        }
    }

    pub fn wrist(&self) -> Joint {
        match self {
            BodySide::Left => Joint::LeftWrist,
            BodySide::Right => Joint::RightWrist,
        }
    }

    pub fn hip(&self) -> Joint {
        match self {
            BodySide::Left => Joint::LeftHip,
            BodySide::Right => Joint::RightHip,
        }
    }

    pub fn knee(&self) -> Joint {
        match self {
            BodySide::Left => Joint::LeftKnee,
            BodySide::Right => Joint::RightKnee,
        }
    }

    pub fn ankle(&self) -> Joint {
        match self {
            BodySide::Left => Joint::LeftAnkle,
            BodySide::Right => Joint::RightAnkle,
        }
    }
}

// ==============================================================================
// Keypoint
// ==============================================================================

/// A 2D keypoint with confidence score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,          // Normalized camera space, not mirrored
    pub y: f32,          // Normalized camera space, grows downward
    pub confidence: f32, // Detection confidence [0, 1]
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// A keypoint is usable when its coordinates are finite and its
    /// confidence reaches the threshold.
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.confidence.is_finite()
            && self.confidence >= threshold
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

// ==============================================================================
// Keypoint Frame
// ==============================================================================

/// One camera frame worth of keypoints. Missing joints are absent from
/// the map rather than zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeypointFrame {
    pub timestamp_ms: i64,
    pub joints: BTreeMap<Joint, Keypoint>,
}

impl KeypointFrame {
    pub fn new(timestamp_ms: i64) -> Self {
        Self {
            timestamp_ms,
            joints: BTreeMap::new(),
        }
    }

    /// Builder-style insert, mostly for tests and replay tools
    pub fn with_joint(mut self, joint: Joint, x: f32, y: f32, confidence: f32) -> Self {
        self.joints.insert(joint, Keypoint::new(x, y, confidence));
        self
    }

    pub fn get(&self, joint: Joint) -> Option<&Keypoint> {
        self.joints.get(&joint)
    }

    /// Position of a joint, only if it clears the confidence threshold
    pub fn visible(&self, joint: Joint, threshold: f32) -> Option<(f32, f32)> {
        self.joints
            .get(&joint)
            .filter(|kp| kp.is_visible(threshold))
            .map(|kp| kp.position())
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Mean confidence over the given joints, counting absent joints as 0
    pub fn mean_confidence(&self, joints: &[Joint]) -> f32 {
        if joints.is_empty() {
            return 0.0;
        }
        let sum: f32 = joints
            .iter()
            .map(|j| {
                self.joints
                    .get(j)
                    .filter(|kp| kp.confidence.is_finite())
                    .map(|kp| kp.confidence)
                    .unwrap_or(0.0)
            })
            .sum();
        sum / joints.len() as f32
    }

    /// Pick the body side the camera sees best for side-view exercises
    pub fn dominant_side(&self, joints_per_side: &[fn(&BodySide) -> Joint]) -> BodySide {
        let score = |side: BodySide| -> f32 {
            let joints: Vec<Joint> = joints_per_side.iter().map(|f| f(&side)).collect();
            self.mean_confidence(&joints)
        };

        if score(BodySide::Right) > score(BodySide::Left) {
            BodySide::Right
        } else {
            BodySide::Left
        }
    }
}
