// Phase classification - one geometric strategy per exercise type
//
// Every strategy maps a frame to a Phase using joint-angle features and a
// pair of thresholds with a dead zone between them. Values inside the dead
// zone classify as Unknown so jitter around a single threshold cannot flip
// the phase back and forth.

use crate::core::geometry::{distance, incline_from_horizontal, joint_angle, MovingAverage};
use crate::models::exercise::{ExerciseType, Phase};
use crate::models::keypoint::{BodySide, Joint, KeypointFrame};
use log::debug;

type SideJoint = fn(&BodySide) -> Joint;

/// Strategy selected once per session from the exercise type
#[derive(Debug, Clone)]
pub enum PhaseClassifier {
    PushUp(PushUpClassifier),
    Squat(SquatClassifier),
    SitUp(SitUpClassifier),
    JumpingJack(JumpingJackClassifier),
    Plank(PlankClassifier),
    WallSit(WallSitClassifier),
}

impl PhaseClassifier {
    pub fn for_exercise(exercise: ExerciseType, min_confidence: f32, smoothing_window: usize) -> Self {
        let features = FeatureSampler::new(min_confidence, smoothing_window);
        match exercise {
            ExerciseType::PushUp => PhaseClassifier::PushUp(PushUpClassifier { features }),
            ExerciseType::Squat => PhaseClassifier::Squat(SquatClassifier { features }),
            ExerciseType::SitUp => PhaseClassifier::SitUp(SitUpClassifier { features }),
            ExerciseType::JumpingJack => PhaseClassifier::JumpingJack(JumpingJackClassifier { features }),
            ExerciseType::Plank => PhaseClassifier::Plank(PlankClassifier { features }),
            ExerciseType::WallSit => PhaseClassifier::WallSit(WallSitClassifier { features }),
        }
    }

    pub fn classify(&mut self, frame: &KeypointFrame) -> Phase {
        let phase = match self {
            PhaseClassifier::PushUp(c) => c.classify(frame),
            PhaseClassifier::Squat(c) => c.classify(frame),
            PhaseClassifier::SitUp(c) => c.classify(frame),
            PhaseClassifier::JumpingJack(c) => c.classify(frame),
            PhaseClassifier::Plank(c) => c.classify(frame),
            PhaseClassifier::WallSit(c) => c.classify(frame),
        };
        phase.unwrap_or(Phase::Unknown)
    }

    /// Drop all smoothing state
    pub fn reset(&mut self) {
        match self {
            PhaseClassifier::PushUp(c) => c.features.reset(),
            PhaseClassifier::Squat(c) => c.features.reset(),
            PhaseClassifier::SitUp(c) => c.features.reset(),
            PhaseClassifier::JumpingJack(c) => c.features.reset(),
            PhaseClassifier::Plank(c) => c.features.reset(),
            PhaseClassifier::WallSit(c) => c.features.reset(),
        }
    }
}

// ==============================================================================
// Shared feature extraction
// ==============================================================================

/// Confidence-gated joint lookup plus the one smoothed feature a
/// classifier tracks.
#[derive(Debug, Clone)]
pub struct FeatureSampler {
    min_confidence: f32,
    smoother: MovingAverage,
}

impl FeatureSampler {
    fn new(min_confidence: f32, smoothing_window: usize) -> Self {
        Self {
            min_confidence,
            smoother: MovingAverage::new(smoothing_window),
        }
    }

    fn reset(&mut self) {
        self.smoother.clear();
    }

    fn smooth(&mut self, value: f32) -> f32 {
        self.smoother.push(value)
    }

    /// Positions of `joints` on the best visible side. The side the camera
    /// sees more confidently is tried first, then the other one.
    fn side_points<const N: usize>(
        &self,
        frame: &KeypointFrame,
        joints: [SideJoint; N],
    ) -> Option<[(f32, f32); N]> {
        let preferred = frame.dominant_side(&joints);
        let fallback = match preferred {
            BodySide::Left => BodySide::Right,
            BodySide::Right => BodySide::Left,
        };

        [preferred, fallback]
            .into_iter()
            .find_map(|side| self.points_for(frame, &side, &joints))
    }

    fn points_for<const N: usize>(
        &self,
        frame: &KeypointFrame,
        side: &BodySide,
        joints: &[SideJoint; N],
    ) -> Option<[(f32, f32); N]> {
        let mut points = [(0.0, 0.0); N];
        for (slot, joint) in points.iter_mut().zip(joints.iter()) {
            *slot = frame.visible(joint(side), self.min_confidence)?;
        }
        Some(points)
    }

    fn point(&self, frame: &KeypointFrame, joint: Joint) -> Option<(f32, f32)> {
        frame.visible(joint, self.min_confidence)
    }
}

/// Two-threshold band: at or above `high` is one phase, at or below `low`
/// the other, anything between is the dead zone.
fn band(value: f32, low: f32, high: f32, at_low: Phase, at_high: Phase) -> Phase {
    if value >= high {
        at_high
    } else if value <= low {
        at_low
    } else {
        Phase::Unknown
    }
}

// ==============================================================================
// Cyclic exercises
// ==============================================================================

/// Elbow flexion read from the side. Torso must be closer to horizontal
/// than vertical, otherwise the user is standing and nothing is counted.
#[derive(Debug, Clone)]
pub struct PushUpClassifier {
    features: FeatureSampler,
}

impl PushUpClassifier {
    const ARM_EXTENDED_DEG: f32 = 150.0;
    const ARM_BENT_DEG: f32 = 100.0;
    const MAX_TORSO_INCLINE_DEG: f32 = 50.0;

    fn classify(&mut self, frame: &KeypointFrame) -> Option<Phase> {
        let [shoulder, elbow, wrist, hip] = self.features.side_points(
            frame,
            [BodySide::shoulder, BodySide::elbow, BodySide::wrist, BodySide::hip],
        )?;

        let incline = incline_from_horizontal(shoulder, hip);
        if incline > Self::MAX_TORSO_INCLINE_DEG {
            debug!("push_up: torso incline {:.1}° too upright", incline);
            return Some(Phase::Unknown);
        }

        let angle = self.features.smooth(joint_angle(shoulder, elbow, wrist)?);
        Some(band(angle, Self::ARM_BENT_DEG, Self::ARM_EXTENDED_DEG, Phase::Down, Phase::Up))
    }
}

/// Knee flexion read from the side
#[derive(Debug, Clone)]
pub struct SquatClassifier {
    features: FeatureSampler,
}

impl SquatClassifier {
    const STANDING_DEG: f32 = 160.0;
    const SQUATTING_DEG: f32 = 100.0;

    fn classify(&mut self, frame: &KeypointFrame) -> Option<Phase> {
        let [hip, knee, ankle] = self
            .features
            .side_points(frame, [BodySide::hip, BodySide::knee, BodySide::ankle])?;

        let angle = self.features.smooth(joint_angle(hip, knee, ankle)?);
        Some(band(angle, Self::SQUATTING_DEG, Self::STANDING_DEG, Phase::Down, Phase::Up))
    }
}

/// Hip flexion (shoulder-hip-knee) read from the side. A small angle means
/// the torso is curled up towards the knees.
#[derive(Debug, Clone)]
pub struct SitUpClassifier {
    features: FeatureSampler,
}

impl SitUpClassifier {
    const CURLED_DEG: f32 = 70.0;
    const LYING_DEG: f32 = 110.0;

    fn classify(&mut self, frame: &KeypointFrame) -> Option<Phase> {
        let [shoulder, hip, knee] = self
            .features
            .side_points(frame, [BodySide::shoulder, BodySide::hip, BodySide::knee])?;

        let angle = self.features.smooth(joint_angle(shoulder, hip, knee)?);
        Some(band(angle, Self::CURLED_DEG, Self::LYING_DEG, Phase::Up, Phase::Down))
    }
}

/// Front view. `Up` = both wrists above the shoulders with feet spread,
/// `Down` = both wrists below the shoulders with feet together. The foot
/// spread is measured relative to hip width so distance to camera cancels.
#[derive(Debug, Clone)]
pub struct JumpingJackClassifier {
    features: FeatureSampler,
}

impl JumpingJackClassifier {
    const FEET_APART_RATIO: f32 = 1.6;
    const FEET_TOGETHER_RATIO: f32 = 1.2;

    fn classify(&mut self, frame: &KeypointFrame) -> Option<Phase> {
        let f = &self.features;
        let left_shoulder = f.point(frame, Joint::LeftShoulder)?;
        let right_shoulder = f.point(frame, Joint::RightShoulder)?;
        let left_wrist = f.point(frame, Joint::LeftWrist)?;
        let right_wrist = f.point(frame, Joint::RightWrist)?;
        let left_hip = f.point(frame, Joint::LeftHip)?;
        let right_hip = f.point(frame, Joint::RightHip)?;
        let left_ankle = f.point(frame, Joint::LeftAnkle)?;
        let right_ankle = f.point(frame, Joint::RightAnkle)?;

        let hip_width = distance(left_hip, right_hip);
        if hip_width < 0.0001 {
            return None;
        }

        let spread = self
            .features
            .smooth(distance(left_ankle, right_ankle) / hip_width);

        // Image y grows downward
        let arms_up = left_wrist.1 < left_shoulder.1 && right_wrist.1 < right_shoulder.1;
        let arms_down = left_wrist.1 > left_shoulder.1 && right_wrist.1 > right_shoulder.1;

        let phase = if arms_up && spread >= Self::FEET_APART_RATIO {
            Phase::Up
        } else if arms_down && spread <= Self::FEET_TOGETHER_RATIO {
            Phase::Down
        } else {
            Phase::Unknown
        };
        Some(phase)
    }
}

// ==============================================================================
// Hold exercises
// ==============================================================================

/// Straightness of the shoulder-hip-ankle line. A body that is closer to
/// vertical than horizontal has left the plank.
#[derive(Debug, Clone)]
pub struct PlankClassifier {
    features: FeatureSampler,
}

impl PlankClassifier {
    const STRAIGHT_DEG: f32 = 160.0;
    const SAGGING_DEG: f32 = 145.0;
    const MAX_BODY_INCLINE_DEG: f32 = 45.0;

    fn classify(&mut self, frame: &KeypointFrame) -> Option<Phase> {
        let [shoulder, hip, ankle] = self
            .features
            .side_points(frame, [BodySide::shoulder, BodySide::hip, BodySide::ankle])?;

        if incline_from_horizontal(shoulder, ankle) > Self::MAX_BODY_INCLINE_DEG {
            return Some(Phase::Broken);
        }

        let angle = self.features.smooth(joint_angle(shoulder, hip, ankle)?);
        Some(band(angle, Self::SAGGING_DEG, Self::STRAIGHT_DEG, Phase::Broken, Phase::Holding))
    }
}

/// Knee angle held near a right angle
#[derive(Debug, Clone)]
pub struct WallSitClassifier {
    features: FeatureSampler,
}

impl WallSitClassifier {
    const HOLD_MIN_DEG: f32 = 70.0;
    const HOLD_MAX_DEG: f32 = 110.0;
    const BROKEN_BELOW_DEG: f32 = 55.0;
    const BROKEN_ABOVE_DEG: f32 = 125.0;

    fn classify(&mut self, frame: &KeypointFrame) -> Option<Phase> {
        let [hip, knee, ankle] = self
            .features
            .side_points(frame, [BodySide::hip, BodySide::knee, BodySide::ankle])?;

        let angle = self.features.smooth(joint_angle(hip, knee, ankle)?);
        let phase = if (Self::HOLD_MIN_DEG..=Self::HOLD_MAX_DEG).contains(&angle) {
            Phase::Holding
        } else if angle < Self::BROKEN_BELOW_DEG || angle > Self::BROKEN_ABOVE_DEG {
            Phase::Broken
        } else {
            Phase::Unknown
        };
        Some(phase)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Synthetic side-view frames shared by classifier, machine and engine tests

    use crate::models::keypoint::{Joint, KeypointFrame};

    const CONF: f32 = 0.95;

    /// Push-up seen from the left. `elbow_deg` is the elbow angle.
    pub fn push_up(timestamp_ms: i64, elbow_deg: f32) -> KeypointFrame {
        let shoulder = (0.40, 0.50);
        let elbow = (0.40, 0.60);
        // Rotate the forearm around the elbow; upper arm points straight up
        let theta = elbow_deg.to_radians();
        let wrist = (elbow.0 + 0.1 * theta.sin(), elbow.1 - 0.1 * theta.cos());

        KeypointFrame::new(timestamp_ms)
            .with_joint(Joint::LeftShoulder, shoulder.0, shoulder.1, CONF)
            .with_joint(Joint::LeftElbow, elbow.0, elbow.1, CONF)
            .with_joint(Joint::LeftWrist, wrist.0, wrist.1, CONF)
            .with_joint(Joint::LeftHip, 0.65, 0.52, CONF)
            .with_joint(Joint::LeftKnee, 0.78, 0.53, CONF)
            .with_joint(Joint::LeftAnkle, 0.90, 0.54, CONF)
    }

    pub fn push_up_top(timestamp_ms: i64) -> KeypointFrame {
        push_up(timestamp_ms, 175.0)
    }

    pub fn push_up_bottom(timestamp_ms: i64) -> KeypointFrame {
        push_up(timestamp_ms, 80.0)
    }

    /// Plank seen from the left. `sag` pushes the hip down, bending the
    /// shoulder-hip-ankle line.
    pub fn plank(timestamp_ms: i64, sag: f32) -> KeypointFrame {
        KeypointFrame::new(timestamp_ms)
            .with_joint(Joint::LeftShoulder, 0.30, 0.50, CONF)
            .with_joint(Joint::LeftElbow, 0.30, 0.60, CONF)
            .with_joint(Joint::LeftHip, 0.55, 0.52 + sag, CONF)
            .with_joint(Joint::LeftAnkle, 0.80, 0.54, CONF)
    }

    /// Every joint present but with zero confidence
    pub fn invisible(timestamp_ms: i64) -> KeypointFrame {
        let mut frame = KeypointFrame::new(timestamp_ms);
        for joint in Joint::all() {
            frame = frame.with_joint(joint, 0.5, 0.5, 0.0);
        }
        frame
    }
}
