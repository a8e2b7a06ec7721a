// Engine facade - the only entry point for the UI layer and test harnesses
//
// Frames and timer callbacks both funnel into one mutex-guarded
// `SessionMachine`; the machine's `Step` output is executed (events sent,
// timer re-armed) before the lock is released, so event order always
// matches transition order.

use crate::core::config::SessionConfig;
use crate::core::readiness::ReadinessGate;
use crate::core::session_machine::{SessionMachine, Step, TimerRequest};
use crate::core::timer::{Timer, TimerCallback, TokioTimer};
use crate::models::exercise::{ExerciseType, Progress, Target};
use crate::models::keypoint::KeypointFrame;
use crate::models::session::{
    PoseUpdate, Readiness, SessionError, SessionEvent, SessionResult, SessionState, SessionSummary,
};
use log::{info, warn};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Receiving ends of the two event streams
pub struct EngineEvents {
    /// One update per accepted frame while a session exists
    pub pose_updates: mpsc::UnboundedReceiver<PoseUpdate>,
    /// State changes, progress and completion
    pub session_events: mpsc::UnboundedReceiver<SessionEvent>,
}

struct EventSinks {
    pose_updates: mpsc::UnboundedSender<PoseUpdate>,
    session_events: mpsc::UnboundedSender<SessionEvent>,
}

struct EngineInner {
    machine: SessionMachine,
    timer: TokioTimer,
    sinks: Option<EventSinks>,
}

impl EngineInner {
    fn is_disposed(&self) -> bool {
        self.sinks.is_none()
    }

    /// Publish a step's events and execute its timer command
    fn dispatch(&mut self, step: Step, weak: &Weak<Mutex<EngineInner>>) {
        if let Some(sinks) = self.sinks.as_ref() {
            if let Some(update) = step.pose_update {
                // A dropped receiver just means nobody is listening
                let _ = sinks.pose_updates.send(update);
            }
            for event in step.events {
                let _ = sinks.session_events.send(event);
            }
        }

        if let Some(command) = step.timer {
            self.timer.apply(command, || timer_callback(weak.clone()));
        }
    }
}

/// Routes an elapsed timer back into the machine, if the engine still exists
fn timer_callback(weak: Weak<Mutex<EngineInner>>) -> TimerCallback {
    Box::new(move |request: TimerRequest| {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let mut guard = inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if guard.is_disposed() {
            return;
        }
        let step = guard.machine.on_timer(request.kind, request.generation);
        guard.dispatch(step, &weak);
    })
}

/// Exercise detection engine. Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Mutex<EngineInner>>,
}

impl Engine {
    /// Create an engine bound to the current tokio runtime
    pub fn new() -> SessionResult<(Self, EngineEvents)> {
        let runtime = Handle::try_current().map_err(|e| SessionError::RuntimeUnavailable(e.to_string()))?;
        Ok(Self::with_runtime(runtime))
    }

    /// Create an engine whose timers run on the given runtime. Frames may
    /// then be fed from any thread.
    pub fn with_runtime(runtime: Handle) -> (Self, EngineEvents) {
        let (pose_tx, pose_rx) = mpsc::unbounded_channel();
        let (session_tx, session_rx) = mpsc::unbounded_channel();

        let inner = EngineInner {
            machine: SessionMachine::new(),
            timer: TokioTimer::new(runtime),
            sinks: Some(EventSinks {
                pose_updates: pose_tx,
                session_events: session_tx,
            }),
        };

        let engine = Self {
            inner: Arc::new(Mutex::new(inner)),
        };
        let events = EngineEvents {
            pose_updates: pose_rx,
            session_events: session_rx,
        };
        (engine, events)
    }

    /// Readiness of a frame for an exercise, without a session. Lets the UI
    /// show positioning hints before `start()`.
    pub fn check_readiness(exercise: ExerciseType, min_confidence: f32, frame: &KeypointFrame) -> Readiness {
        ReadinessGate::new(exercise, min_confidence).evaluate(frame)
    }

    /// Start a session with default tuning
    pub fn start(&self, exercise: ExerciseType, target: Target) -> SessionResult<()> {
        self.start_with_config(SessionConfig::new(exercise, target))
    }

    pub fn start_with_config(&self, config: SessionConfig) -> SessionResult<()> {
        self.with_machine(|machine| machine.start(config))
    }

    /// Feed one camera frame. Never waits on anything but the state lock.
    pub fn feed_frame(&self, frame: KeypointFrame) -> SessionResult<()> {
        self.with_machine(|machine| Ok(machine.feed_frame(frame)))
    }

    pub fn add_manual_tick(&self) -> SessionResult<()> {
        self.with_machine(|machine| machine.add_manual_tick())
    }

    pub fn skip(&self) -> SessionResult<()> {
        self.with_machine(|machine| machine.skip())
    }

    pub fn reset(&self) -> SessionResult<()> {
        self.with_machine(|machine| Ok(machine.reset()))
    }

    /// Reset, cancel timers and close both event streams. Idempotent.
    pub fn dispose(&self) {
        let mut inner = self.lock();
        if inner.is_disposed() {
            return;
        }
        let step = inner.machine.reset();
        let weak = Arc::downgrade(&self.inner);
        inner.dispatch(step, &weak);
        inner.timer.cancel();
        inner.sinks = None;
        info!("Engine disposed");
    }

    pub fn state(&self) -> SessionState {
        self.lock().machine.state()
    }

    pub fn progress(&self) -> Option<Progress> {
        self.lock().machine.progress()
    }

    pub fn summary(&self) -> Option<SessionSummary> {
        self.lock().machine.summary()
    }

    fn with_machine<F>(&self, op: F) -> SessionResult<()>
    where
        F: FnOnce(&mut SessionMachine) -> SessionResult<Step>,
    {
        let mut inner = self.lock();
        if inner.is_disposed() {
            warn!("Operation on disposed engine");
            return Err(SessionError::Disposed);
        }
        let step = op(&mut inner.machine)?;
        let weak = Arc::downgrade(&self.inner);
        inner.dispatch(step, &weak);
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, EngineInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
