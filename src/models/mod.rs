// Data models for keypoint frames, exercises, phases and session lifecycle

pub mod keypoint;
pub mod exercise;
pub mod session;
