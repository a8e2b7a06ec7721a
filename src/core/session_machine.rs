// Session state machine: Idle -> Positioning -> CountingDown -> Active -> Complete
//
// The machine is synchronous and owns every piece of mutable session state.
// It never sleeps or spawns: each input returns a `Step` listing the events to
// publish and the timer to (re)arm, and the caller executes it. All timers
// carry the generation they were armed under; any state change bumps the
// generation, so a timer that fires after being superseded is rejected.

use crate::core::accumulator::Accumulator;
use crate::core::classifier::PhaseClassifier;
use crate::core::config::SessionConfig;
use crate::core::readiness::ReadinessGate;
use crate::models::exercise::{Phase, Progress};
use crate::models::keypoint::KeypointFrame;
use crate::models::session::{
    PoseUpdate, Readiness, SessionError, SessionEvent, SessionResult, SessionState, SessionSummary,
};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::time::Duration;
use uuid::Uuid;

const STALE_FRAME_HINT: &str = "Waiting for a newer camera frame";
const HOLD_TICK: Duration = Duration::from_secs(1);

// ==============================================================================
// Timer plumbing
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Stability,
    Countdown,
    HoldTick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerRequest {
    pub kind: TimerKind,
    pub generation: u64,
    pub delay: Duration,
}

/// What the caller must do with its single timer slot.
/// `Schedule` replaces whatever was pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Schedule(TimerRequest),
    Cancel,
}

/// Output of one machine input
#[derive(Debug, Default)]
pub struct Step {
    pub events: Vec<SessionEvent>,
    pub pose_update: Option<PoseUpdate>,
    pub timer: Option<TimerCommand>,
}

impl Step {
    fn empty() -> Self {
        Self::default()
    }
}

// ==============================================================================
// Session
// ==============================================================================

/// Everything that exists only while a session exists
struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    config: SessionConfig,
    gate: ReadinessGate,
    classifier: PhaseClassifier,
    accumulator: Accumulator,
    last_timestamp_ms: Option<i64>,
    frames_seen: u64,
    frames_ready: u64,
    manual_ticks: u32,
    skipped: bool,
}

impl Session {
    fn new(config: SessionConfig) -> Self {
        let exercise = config.exercise;
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            gate: ReadinessGate::new(exercise, config.min_confidence),
            classifier: PhaseClassifier::for_exercise(exercise, config.min_confidence, config.smoothing_window),
            accumulator: Accumulator::for_kind(
                exercise.kind(),
                config.effective_break_policy(),
                config.min_dwell_ms,
            ),
            config,
            last_timestamp_ms: None,
            frames_seen: 0,
            frames_ready: 0,
            manual_ticks: 0,
            skipped: false,
        }
    }
}

// ==============================================================================
// State Machine
// ==============================================================================

pub struct SessionMachine {
    state: SessionState,
    session: Option<Session>,
    generation: u64,
    /// The one timer the current state is waiting for, if any
    pending: Option<(TimerKind, u64)>,
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMachine {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            session: None,
            generation: 0,
            pending: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn progress(&self) -> Option<Progress> {
        self.session.as_ref().map(|s| s.accumulator.current_progress())
    }

    pub fn summary(&self) -> Option<SessionSummary> {
        self.session.as_ref().map(|s| SessionSummary {
            session_id: s.id,
            started_at: s.started_at,
            exercise: s.config.exercise,
            target: s.config.target,
            state: self.state,
            progress: s.accumulator.current_progress(),
            frames_seen: s.frames_seen,
            frames_ready: s.frames_ready,
            manual_ticks: s.manual_ticks,
            skipped: s.skipped,
        })
    }

    // --------------------------------------------------------------------------
    // Caller operations
    // --------------------------------------------------------------------------

    /// Create a session and begin positioning
    pub fn start(&mut self, config: SessionConfig) -> SessionResult<Step> {
        if self.state != SessionState::Idle {
            return Err(self.reject("start a session"));
        }
        config.validate()?;

        info!(
            "Starting {} session, target {}",
            config.exercise, config.target
        );
        self.session = Some(Session::new(config));

        let mut step = Step::empty();
        self.enter(SessionState::Positioning, &mut step);
        Ok(step)
    }

    pub fn feed_frame(&mut self, frame: KeypointFrame) -> Step {
        let mut step = Step::empty();
        if !self.state.accepts_frames() {
            return step;
        }
        let Some(session) = self.session.as_mut() else {
            return step;
        };

        session.frames_seen += 1;

        let stale = matches!(session.last_timestamp_ms, Some(last) if frame.timestamp_ms <= last);
        let (readiness, phase) = if stale {
            debug!("Discarding stale frame at {}ms", frame.timestamp_ms);
            (Readiness::not_ready(STALE_FRAME_HINT, Vec::new()), Phase::Unknown)
        } else {
            session.last_timestamp_ms = Some(frame.timestamp_ms);
            // Phases are only classified once detection is live
            let phase = if self.state == SessionState::Active {
                session.classifier.classify(&frame)
            } else {
                Phase::Unknown
            };
            (session.gate.evaluate(&frame), phase)
        };

        if readiness.ready {
            session.frames_ready += 1;
        }

        match self.state {
            SessionState::Positioning => self.on_positioning_frame(readiness.ready, &mut step),
            SessionState::Active if !stale => {
                // A frame the gate rejects carries no usable phase
                let observed = if readiness.ready { phase } else { Phase::Unknown };
                let was_holding = session.accumulator.is_holding();
                let changed = session.accumulator.observe(observed, frame.timestamp_ms);
                let holding = session.accumulator.is_holding();
                if changed {
                    self.on_progress(&mut step);
                }
                if self.state == SessionState::Active && holding != was_holding {
                    if holding {
                        debug!("Hold confirmed, starting hold clock");
                        self.arm(TimerKind::HoldTick, HOLD_TICK, &mut step);
                    } else {
                        debug!("Hold lost, stopping hold clock");
                        self.cancel_timer(&mut step);
                    }
                }
            }
            // Countdown runs to completion regardless of what the camera sees
            _ => {}
        }

        step.pose_update = Some(PoseUpdate {
            readiness,
            phase,
            state: self.state,
            keypoints: frame,
        });
        step
    }

    /// Count one rep (or one second for holds) from outside the camera path
    pub fn add_manual_tick(&mut self) -> SessionResult<Step> {
        if self.state != SessionState::Active {
            return Err(self.reject("add a manual tick"));
        }
        let mut step = Step::empty();
        if let Some(session) = self.session.as_mut() {
            session.accumulator.add_manual_tick();
            session.manual_ticks += 1;
        }
        self.on_progress(&mut step);
        Ok(step)
    }

    /// Force the session to Complete, keeping progress as-is
    pub fn skip(&mut self) -> SessionResult<Step> {
        match self.state {
            SessionState::Positioning | SessionState::CountingDown(_) | SessionState::Active => {
                if let Some(session) = self.session.as_mut() {
                    session.skipped = true;
                }
                let mut step = Step::empty();
                self.enter(SessionState::Complete, &mut step);
                Ok(step)
            }
            _ => Err(self.reject("skip")),
        }
    }

    /// Drop the session and return to Idle from any state
    pub fn reset(&mut self) -> Step {
        let mut step = Step::empty();
        if let Some(session) = self.session.as_mut() {
            session.classifier.reset();
            session.accumulator.reset();
        }
        self.session = None;
        if self.state != SessionState::Idle {
            self.enter(SessionState::Idle, &mut step);
        } else {
            self.cancel_timer(&mut step);
        }
        step
    }

    // --------------------------------------------------------------------------
    // Timer input
    // --------------------------------------------------------------------------

    pub fn on_timer(&mut self, kind: TimerKind, generation: u64) -> Step {
        let mut step = Step::empty();
        if self.pending != Some((kind, generation)) {
            warn!(
                "Ignoring stale {:?} timer (generation {}, current {})",
                kind, generation, self.generation
            );
            return step;
        }
        self.pending = None;

        match (kind, self.state) {
            (TimerKind::Stability, SessionState::Positioning) => {
                let ticks = self.config().map(|c| c.countdown_ticks).unwrap_or(0);
                self.enter_countdown(ticks, &mut step);
            }
            (TimerKind::Countdown, SessionState::CountingDown(remaining)) => {
                self.enter_countdown(remaining.saturating_sub(1), &mut step);
            }
            (TimerKind::HoldTick, SessionState::Active) => {
                let (counted, holding) = self
                    .session
                    .as_mut()
                    .map(|s| (s.accumulator.on_tick(), s.accumulator.is_holding()))
                    .unwrap_or((false, false));
                if counted {
                    self.on_progress(&mut step);
                }
                if self.state == SessionState::Active && holding {
                    self.arm(TimerKind::HoldTick, HOLD_TICK, &mut step);
                }
            }
            (kind, state) => {
                warn!("Timer {:?} fired in unexpected state {}", kind, state);
            }
        }
        step
    }

    // --------------------------------------------------------------------------
    // Internal transitions
    // --------------------------------------------------------------------------

    fn on_positioning_frame(&mut self, ready: bool, step: &mut Step) {
        let armed = matches!(self.pending, Some((TimerKind::Stability, _)));
        match (ready, armed) {
            (true, false) => {
                let window = self.config().map(|c| c.stability_window_ms).unwrap_or(0);
                if window == 0 {
                    let ticks = self.config().map(|c| c.countdown_ticks).unwrap_or(0);
                    self.enter_countdown(ticks, step);
                } else {
                    debug!("Readiness acquired, arming {}ms stability window", window);
                    self.arm(TimerKind::Stability, Duration::from_millis(window), step);
                }
            }
            (false, true) => {
                debug!("Readiness lost, stability window restarted");
                self.cancel_timer(step);
            }
            _ => {}
        }
    }

    fn enter_countdown(&mut self, remaining: u32, step: &mut Step) {
        if remaining == 0 {
            self.enter(SessionState::Active, step);
        } else {
            self.enter(SessionState::CountingDown(remaining), step);
        }
    }

    fn on_progress(&mut self, step: &mut Step) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let progress = session.accumulator.current_progress();
        let target = session.config.target;
        step.events.push(SessionEvent::Progress { progress });

        if self.state == SessionState::Active && progress.reaches(&target) {
            self.enter(SessionState::Complete, step);
        }
    }

    /// The single place `state` changes. Invalidates any pending timer and
    /// arms the one the new state needs.
    fn enter(&mut self, next: SessionState, step: &mut Step) {
        let from = self.state;
        self.state = next;
        self.cancel_timer(step);
        info!("Session state {} -> {}", from, next);
        step.events.push(SessionEvent::StateChanged { from, to: next });

        match next {
            SessionState::CountingDown(_) => {
                let tick_ms = self.config().map(|c| c.countdown_tick_ms).unwrap_or(0);
                self.arm(TimerKind::Countdown, Duration::from_millis(tick_ms), step);
            }
            // The hold clock is armed later, once `Holding` is confirmed
            SessionState::Active => {
                if let Some(session) = self.session.as_mut() {
                    session.classifier.reset();
                    step.events.push(SessionEvent::Progress {
                        progress: session.accumulator.current_progress(),
                    });
                }
            }
            SessionState::Complete => {
                if let Some(session) = self.session.as_ref() {
                    let progress = session.accumulator.current_progress();
                    info!(
                        "Session {} complete at {} (skipped: {})",
                        session.id, progress, session.skipped
                    );
                    step.events.push(SessionEvent::Completed {
                        progress,
                        skipped: session.skipped,
                    });
                }
            }
            SessionState::Idle | SessionState::Positioning => {}
        }
    }

    fn arm(&mut self, kind: TimerKind, delay: Duration, step: &mut Step) {
        self.generation += 1;
        self.pending = Some((kind, self.generation));
        step.timer = Some(TimerCommand::Schedule(TimerRequest {
            kind,
            generation: self.generation,
            delay,
        }));
    }

    fn cancel_timer(&mut self, step: &mut Step) {
        self.generation += 1;
        if self.pending.take().is_some() {
            step.timer = Some(TimerCommand::Cancel);
        }
    }

    fn config(&self) -> Option<&SessionConfig> {
        self.session.as_ref().map(|s| &s.config)
    }

    fn reject(&self, operation: &'static str) -> SessionError {
        warn!("Rejected: cannot {} while {}", operation, self.state);
        SessionError::InvalidTransition {
            operation,
            state: self.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::fixtures::*;
    use crate::models::exercise::{BreakPolicy, ExerciseType, Target};

    fn push_up_config(target: u32) -> SessionConfig {
        SessionConfig::new(ExerciseType::PushUp, Target::Reps(target))
            .with_smoothing_window(1)
    }

    fn scheduled(step: &Step) -> TimerRequest {
        match step.timer {
            Some(TimerCommand::Schedule(request)) => request,
            other => panic!("expected a scheduled timer, got {:?}", other),
        }
    }

    /// Drive the machine from Positioning into Active, returning the next
    /// free frame timestamp
    fn activate(machine: &mut SessionMachine, config: SessionConfig) -> i64 {
        machine.start(config).unwrap();
        let step = machine.feed_frame(push_up_top(0));
        let stability = scheduled(&step);
        assert_eq!(stability.kind, TimerKind::Stability);

        let mut step = machine.on_timer(stability.kind, stability.generation);
        while let SessionState::CountingDown(_) = machine.state() {
            let tick = scheduled(&step);
            step = machine.on_timer(tick.kind, tick.generation);
        }
        assert_eq!(machine.state(), SessionState::Active);
        100
    }

    /// Hold `frame_at` for `duration_ms` at 25ms spacing
    fn hold(
        machine: &mut SessionMachine,
        frame_at: fn(i64) -> KeypointFrame,
        start_ms: i64,
        duration_ms: i64,
        events: &mut Vec<SessionEvent>,
    ) -> i64 {
        let mut t = start_ms;
        while t < start_ms + duration_ms {
            events.extend(machine.feed_frame(frame_at(t)).events);
            t += 25;
        }
        t
    }

    #[test]
    fn test_start_moves_to_positioning() {
        let mut machine = SessionMachine::new();
        let step = machine.start(push_up_config(3)).unwrap();
        assert_eq!(machine.state(), SessionState::Positioning);
        assert_eq!(
            step.events,
            vec![SessionEvent::StateChanged {
                from: SessionState::Idle,
                to: SessionState::Positioning
            }]
        );
        assert!(machine.summary().is_some());
    }

    #[test]
    fn test_start_rejects_bad_config_without_creating_session() {
        let mut machine = SessionMachine::new();
        let result = machine.start(SessionConfig::new(ExerciseType::PushUp, Target::Reps(0)));
        assert!(result.is_err());
        assert_eq!(machine.state(), SessionState::Idle);
        assert!(machine.summary().is_none());
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let mut machine = SessionMachine::new();
        machine.start(push_up_config(3)).unwrap();
        let err = machine.start(push_up_config(3)).unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition { .. }));
    }

    #[test]
    fn test_readiness_loss_cancels_stability_window() {
        let mut machine = SessionMachine::new();
        machine.start(push_up_config(3)).unwrap();

        let first = scheduled(&machine.feed_frame(push_up_top(0)));
        let step = machine.feed_frame(invisible(40));
        assert_eq!(step.timer, Some(TimerCommand::Cancel));

        // The cancelled window firing late must not start the countdown
        machine.on_timer(first.kind, first.generation);
        assert_eq!(machine.state(), SessionState::Positioning);

        // Readiness again arms a fresh window
        let second = scheduled(&machine.feed_frame(push_up_top(80)));
        assert!(second.generation > first.generation);
        assert_eq!(second.delay, Duration::from_millis(1500));
    }

    #[test]
    fn test_countdown_ignores_readiness_loss() {
        let mut machine = SessionMachine::new();
        machine.start(push_up_config(3)).unwrap();
        let stability = scheduled(&machine.feed_frame(push_up_top(0)));
        let mut step = machine.on_timer(stability.kind, stability.generation);
        assert_eq!(machine.state(), SessionState::CountingDown(3));

        let mut t = 100;
        for expected in [2, 1] {
            let tick = scheduled(&step);
            let lost = machine.feed_frame(invisible(t));
            assert!(lost.timer.is_none());
            t += 100;
            step = machine.on_timer(tick.kind, tick.generation);
            assert_eq!(machine.state(), SessionState::CountingDown(expected));
        }
        let tick = scheduled(&step);
        machine.on_timer(tick.kind, tick.generation);
        assert_eq!(machine.state(), SessionState::Active);
    }

    #[test]
    fn test_positioning_frames_do_not_count() {
        let mut machine = SessionMachine::new();
        machine.start(push_up_config(3)).unwrap();
        let mut events = Vec::new();
        let mut t = 0;
        for _ in 0..3 {
            t = hold(&mut machine, push_up_bottom, t, 300, &mut events);
            t = hold(&mut machine, push_up_top, t, 300, &mut events);
        }
        assert_eq!(machine.progress(), Some(Progress::Reps(0)));
        assert!(!events.iter().any(|e| matches!(e, SessionEvent::Progress { .. })));
    }

    #[test]
    fn test_completes_exactly_at_target() {
        let mut machine = SessionMachine::new();
        let mut t = activate(&mut machine, push_up_config(3));
        let mut events = Vec::new();

        t = hold(&mut machine, push_up_top, t, 200, &mut events);
        for _ in 0..3 {
            t = hold(&mut machine, push_up_bottom, t, 200, &mut events);
            t = hold(&mut machine, push_up_top, t, 200, &mut events);
        }
        assert_eq!(machine.state(), SessionState::Complete);
        assert_eq!(machine.progress(), Some(Progress::Reps(3)));

        // A fourth rep after completion changes nothing
        t = hold(&mut machine, push_up_bottom, t, 200, &mut events);
        hold(&mut machine, push_up_top, t, 200, &mut events);
        assert_eq!(machine.progress(), Some(Progress::Reps(3)));

        let completions = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Completed { .. }))
            .count();
        assert_eq!(completions, 1);
    }

    #[test]
    fn test_stale_frames_are_not_counted() {
        let mut machine = SessionMachine::new();
        activate(&mut machine, push_up_config(3));
        let mut events = Vec::new();
        let t = hold(&mut machine, push_up_top, 1000, 200, &mut events);

        // Timestamps going backwards never reach the accumulator
        let step = machine.feed_frame(push_up_bottom(t - 500));
        let update = step.pose_update.unwrap();
        assert!(!update.readiness.ready);
        assert_eq!(update.phase, Phase::Unknown);
    }

    #[test]
    fn test_manual_tick_only_while_active() {
        let mut machine = SessionMachine::new();
        assert!(machine.add_manual_tick().is_err());

        activate(&mut machine, push_up_config(2));
        machine.add_manual_tick().unwrap();
        assert_eq!(machine.progress(), Some(Progress::Reps(1)));

        let step = machine.add_manual_tick().unwrap();
        assert_eq!(machine.state(), SessionState::Complete);
        assert!(step
            .events
            .contains(&SessionEvent::Completed { progress: Progress::Reps(2), skipped: false }));

        assert!(machine.add_manual_tick().is_err());
    }

    #[test]
    fn test_skip_keeps_progress() {
        let mut machine = SessionMachine::new();
        activate(&mut machine, push_up_config(5));
        machine.add_manual_tick().unwrap();

        let step = machine.skip().unwrap();
        assert_eq!(machine.state(), SessionState::Complete);
        assert_eq!(machine.progress(), Some(Progress::Reps(1)));
        assert!(step
            .events
            .contains(&SessionEvent::Completed { progress: Progress::Reps(1), skipped: true }));
        assert!(machine.summary().unwrap().skipped);

        assert!(machine.skip().is_err());
    }

    #[test]
    fn test_skip_from_positioning() {
        let mut machine = SessionMachine::new();
        machine.start(push_up_config(5)).unwrap();
        machine.skip().unwrap();
        assert_eq!(machine.state(), SessionState::Complete);
        assert_eq!(machine.progress(), Some(Progress::Reps(0)));
    }

    #[test]
    fn test_reset_invalidates_pending_timers() {
        let mut machine = SessionMachine::new();
        machine.start(push_up_config(3)).unwrap();
        let stability = scheduled(&machine.feed_frame(push_up_top(0)));
        let countdown = scheduled(&machine.on_timer(stability.kind, stability.generation));

        let step = machine.reset();
        assert_eq!(machine.state(), SessionState::Idle);
        assert_eq!(step.timer, Some(TimerCommand::Cancel));
        assert!(machine.summary().is_none());

        // A countdown tick racing the reset is discarded
        let late = machine.on_timer(countdown.kind, countdown.generation);
        assert!(late.events.is_empty());
        assert_eq!(machine.state(), SessionState::Idle);

        // Frames after reset are ignored
        assert!(machine.feed_frame(push_up_top(500)).pose_update.is_none());
    }

    #[test]
    fn test_complete_ignores_frames() {
        let mut machine = SessionMachine::new();
        machine.start(push_up_config(3)).unwrap();
        machine.skip().unwrap();
        assert!(machine.feed_frame(push_up_top(0)).pose_update.is_none());
    }

    fn plank_config(seconds: u32) -> SessionConfig {
        SessionConfig::new(ExerciseType::Plank, Target::HoldSeconds(seconds))
            .with_smoothing_window(1)
            .with_countdown(0, 1000)
    }

    fn straight_plank(timestamp_ms: i64) -> KeypointFrame {
        plank(timestamp_ms, 0.0)
    }

    fn sagging_plank(timestamp_ms: i64) -> KeypointFrame {
        plank(timestamp_ms, 0.15)
    }

    fn activate_plank(machine: &mut SessionMachine, config: SessionConfig) {
        machine.start(config).unwrap();
        let stability = scheduled(&machine.feed_frame(straight_plank(0)));
        let step = machine.on_timer(stability.kind, stability.generation);
        assert_eq!(machine.state(), SessionState::Active);
        // No hold clock until the hold is confirmed
        assert!(step.timer.is_none());
    }

    /// Like `hold`, but also returns the last timer command issued
    fn hold_with_timer(
        machine: &mut SessionMachine,
        frame_at: fn(i64) -> KeypointFrame,
        start_ms: i64,
        duration_ms: i64,
        events: &mut Vec<SessionEvent>,
    ) -> (i64, Option<TimerCommand>) {
        let mut t = start_ms;
        let mut timer = None;
        while t < start_ms + duration_ms {
            let step = machine.feed_frame(frame_at(t));
            events.extend(step.events);
            if step.timer.is_some() {
                timer = step.timer;
            }
            t += 25;
        }
        (t, timer)
    }

    fn scheduled_command(command: Option<TimerCommand>) -> TimerRequest {
        match command {
            Some(TimerCommand::Schedule(request)) => request,
            other => panic!("expected a scheduled timer, got {:?}", other),
        }
    }

    #[test]
    fn test_hold_accumulates_on_ticks() {
        let mut machine = SessionMachine::new();
        activate_plank(&mut machine, plank_config(2));
        let mut events = Vec::new();

        let (t, timer) = hold_with_timer(&mut machine, straight_plank, 100, 300, &mut events);
        let tick = scheduled_command(timer);
        assert_eq!(tick.kind, TimerKind::HoldTick);
        assert_eq!(tick.delay, HOLD_TICK);

        let step = machine.on_timer(tick.kind, tick.generation);
        assert_eq!(machine.progress(), Some(Progress::HoldSeconds(1)));
        let tick = scheduled(&step);

        hold(&mut machine, straight_plank, t, 300, &mut events);
        machine.on_timer(tick.kind, tick.generation);
        assert_eq!(machine.progress(), Some(Progress::HoldSeconds(2)));
        assert_eq!(machine.state(), SessionState::Complete);
    }

    #[test]
    fn test_hold_pauses_when_body_leaves_frame() {
        let mut machine = SessionMachine::new();
        activate_plank(&mut machine, plank_config(10));
        let mut events = Vec::new();

        let (t, timer) = hold_with_timer(&mut machine, straight_plank, 100, 300, &mut events);
        let tick = scheduled_command(timer);
        let next = scheduled(&machine.on_timer(tick.kind, tick.generation));
        assert_eq!(machine.progress(), Some(Progress::HoldSeconds(1)));

        let (t, timer) = hold_with_timer(&mut machine, invisible, t, 2000, &mut events);
        assert_eq!(timer, Some(TimerCommand::Cancel));

        // The clock armed before the body left is discarded
        let late = machine.on_timer(next.kind, next.generation);
        assert!(late.events.is_empty());
        assert!(late.timer.is_none());
        assert_eq!(machine.progress(), Some(Progress::HoldSeconds(1)));
        assert_eq!(machine.state(), SessionState::Active);

        // Coming back into frame resumes from where it paused
        let (_, timer) = hold_with_timer(&mut machine, straight_plank, t, 300, &mut events);
        let tick = scheduled_command(timer);
        machine.on_timer(tick.kind, tick.generation);
        assert_eq!(machine.progress(), Some(Progress::HoldSeconds(2)));
    }

    #[test]
    fn test_hold_shorter_than_a_second_earns_nothing() {
        let mut machine = SessionMachine::new();
        activate_plank(&mut machine, plank_config(10));
        let mut events = Vec::new();

        let t = hold(&mut machine, sagging_plank, 100, 300, &mut events);
        let (t, timer) = hold_with_timer(&mut machine, straight_plank, t, 400, &mut events);
        let tick = scheduled_command(timer);
        let (_, timer) = hold_with_timer(&mut machine, sagging_plank, t, 300, &mut events);
        assert_eq!(timer, Some(TimerCommand::Cancel));

        machine.on_timer(tick.kind, tick.generation);
        assert_eq!(machine.progress(), Some(Progress::HoldSeconds(0)));
    }

    #[test]
    fn test_reset_on_break_emits_progress() {
        let mut machine = SessionMachine::new();
        activate_plank(&mut machine, plank_config(30).with_break_policy(BreakPolicy::Reset));
        let mut events = Vec::new();

        let (t, timer) = hold_with_timer(&mut machine, straight_plank, 100, 300, &mut events);
        let tick = scheduled_command(timer);
        let tick = scheduled(&machine.on_timer(tick.kind, tick.generation));
        let t = hold(&mut machine, straight_plank, t, 300, &mut events);
        machine.on_timer(tick.kind, tick.generation);
        assert_eq!(machine.progress(), Some(Progress::HoldSeconds(2)));

        let mut events = Vec::new();
        let (_, timer) = hold_with_timer(&mut machine, sagging_plank, t, 300, &mut events);
        assert_eq!(timer, Some(TimerCommand::Cancel));
        assert!(events.contains(&SessionEvent::Progress {
            progress: Progress::HoldSeconds(0)
        }));
        assert_eq!(machine.progress(), Some(Progress::HoldSeconds(0)));
        assert_eq!(machine.state(), SessionState::Active);
    }

    #[test]
    fn test_manual_tick_advances_hold_by_one_second() {
        let mut machine = SessionMachine::new();
        let config = SessionConfig::new(ExerciseType::Plank, Target::HoldSeconds(30)).with_countdown(0, 1000);
        machine.start(config).unwrap();
        let stability = scheduled(&machine.feed_frame(plank(0, 0.0)));
        machine.on_timer(stability.kind, stability.generation);

        machine.add_manual_tick().unwrap();
        assert_eq!(machine.progress(), Some(Progress::HoldSeconds(1)));
    }
}
