pub mod config;
pub mod geometry;

// Per-frame analysis
pub mod readiness;
pub mod classifier;
pub mod accumulator;

// Session lifecycle
pub mod session_machine;
pub mod timer;
pub mod engine;
