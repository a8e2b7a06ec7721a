// Timer scheduling for the session machine (stability window, countdown, hold ticks)

use crate::core::session_machine::{TimerCommand, TimerRequest};
use log::debug;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Callback run when a scheduled timer elapses
pub type TimerCallback = Box<dyn FnOnce(TimerRequest) + Send + 'static>;

/// A single-slot timer: starting a new timer replaces the pending one.
pub trait Timer: Send {
    /// Start a countdown that calls `on_fire` once `request.delay` elapses
    fn start(&mut self, request: TimerRequest, on_fire: TimerCallback);

    /// Cancel any pending countdown
    fn cancel(&mut self);

    /// Apply a command returned by the session machine
    fn apply(&mut self, command: TimerCommand, on_fire: impl FnOnce() -> TimerCallback)
    where
        Self: Sized,
    {
        match command {
            TimerCommand::Schedule(request) => self.start(request, on_fire()),
            TimerCommand::Cancel => self.cancel(),
        }
    }
}

/// Tokio-backed timer. Each countdown is a spawned task sleeping on the
/// runtime clock; cancelling aborts the task. A callback that already
/// started running can still race a cancel, so the machine re-checks the
/// generation on every request.
pub struct TokioTimer {
    runtime: Handle,
    pending: Option<JoinHandle<()>>,
}

impl TokioTimer {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            pending: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().map(|task| !task.is_finished()).unwrap_or(false)
    }
}

impl Timer for TokioTimer {
    fn start(&mut self, request: TimerRequest, on_fire: TimerCallback) {
        self.cancel();
        debug!(
            "Scheduling {:?} timer in {:?} (generation {})",
            request.kind, request.delay, request.generation
        );
        self.pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(request.delay).await;
            on_fire(request);
        }));
    }

    fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
