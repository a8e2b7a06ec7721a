// Repetition / hold accumulation from a stream of classified phases

use crate::models::exercise::{BreakPolicy, ExerciseKind, Phase, Progress};
use log::debug;

// ==============================================================================
// Debounce
// ==============================================================================

/// Promotes a phase to "stable" only after it has been observed for at
/// least `min_dwell_ms` of frame time. `Unknown` frames neither confirm nor
/// cancel the pending candidate.
#[derive(Debug, Clone)]
pub struct PhaseDebouncer {
    min_dwell_ms: i64,
    stable: Phase,
    candidate: Option<(Phase, i64)>,
}

impl PhaseDebouncer {
    pub fn new(min_dwell_ms: u64) -> Self {
        Self {
            min_dwell_ms: min_dwell_ms as i64,
            stable: Phase::Unknown,
            candidate: None,
        }
    }

    pub fn stable(&self) -> Phase {
        self.stable
    }

    /// Feed one observation. Returns `(from, to)` when the stable phase changes.
    pub fn observe(&mut self, phase: Phase, timestamp_ms: i64) -> Option<(Phase, Phase)> {
        if phase == Phase::Unknown {
            return None;
        }

        if phase == self.stable {
            self.candidate = None;
            return None;
        }

        let since = match self.candidate {
            Some((candidate, since)) if candidate == phase => since,
            _ => {
                self.candidate = Some((phase, timestamp_ms));
                timestamp_ms
            }
        };

        if timestamp_ms - since >= self.min_dwell_ms {
            let from = std::mem::replace(&mut self.stable, phase);
            self.candidate = None;
            Some((from, phase))
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.stable = Phase::Unknown;
        self.candidate = None;
    }
}

// ==============================================================================
// Cyclic counter
// ==============================================================================

#[derive(Debug, Clone)]
pub struct RepCounter {
    debouncer: PhaseDebouncer,
    counts_from: Phase,
    counts_to: Phase,
    reps: u32,
}

impl RepCounter {
    pub fn new(counts_from: Phase, counts_to: Phase, min_dwell_ms: u64) -> Self {
        Self {
            debouncer: PhaseDebouncer::new(min_dwell_ms),
            counts_from,
            counts_to,
            reps: 0,
        }
    }

    /// Returns true if a rep was counted
    pub fn observe(&mut self, phase: Phase, timestamp_ms: i64) -> bool {
        match self.debouncer.observe(phase, timestamp_ms) {
            Some((from, to)) if from == self.counts_from && to == self.counts_to => {
                self.reps += 1;
                debug!("rep counted ({} -> {}), total {}", from, to, self.reps);
                true
            }
            _ => false,
        }
    }

    pub fn add_manual(&mut self) {
        self.reps += 1;
    }

    pub fn reps(&self) -> u32 {
        self.reps
    }

    pub fn reset(&mut self) {
        self.debouncer.reset();
        self.reps = 0;
    }
}

// ==============================================================================
// Hold timer
// ==============================================================================

/// Counts whole-second ticks spent in a stable `Holding` phase.
///
/// The caller runs a one-second clock only while `is_holding()` is true, so
/// a hold shorter than one tick earns nothing. A tick is credited only if a
/// `Holding` frame arrived since the previous tick, and a run of `Unknown`
/// frames lasting at least the dwell time drops the stable phase, which
/// pauses the hold until `Holding` is confirmed again.
#[derive(Debug, Clone)]
pub struct HoldTimer {
    debouncer: PhaseDebouncer,
    break_policy: BreakPolicy,
    min_dwell_ms: i64,
    lost_since: Option<i64>,
    seen_holding: bool,
    seconds: u32,
}

impl HoldTimer {
    pub fn new(break_policy: BreakPolicy, min_dwell_ms: u64) -> Self {
        Self {
            debouncer: PhaseDebouncer::new(min_dwell_ms),
            break_policy,
            min_dwell_ms: min_dwell_ms as i64,
            lost_since: None,
            seen_holding: false,
            seconds: 0,
        }
    }

    /// Returns true if progress changed (only possible via a reset-on-break)
    pub fn observe(&mut self, phase: Phase, timestamp_ms: i64) -> bool {
        if phase == Phase::Unknown {
            let since = *self.lost_since.get_or_insert(timestamp_ms);
            if timestamp_ms - since >= self.min_dwell_ms && self.is_holding() {
                debug!("hold pose lost, paused at {}s", self.seconds);
                self.debouncer.reset();
            }
            return false;
        }

        self.lost_since = None;
        if phase == Phase::Holding {
            self.seen_holding = true;
        }

        match self.debouncer.observe(phase, timestamp_ms) {
            Some((_, Phase::Broken)) if self.break_policy == BreakPolicy::Reset && self.seconds > 0 => {
                debug!("hold broken after {}s, resetting", self.seconds);
                self.seconds = 0;
                true
            }
            _ => false,
        }
    }

    /// Whether the hold clock should be running
    pub fn is_holding(&self) -> bool {
        self.debouncer.stable() == Phase::Holding
    }

    /// One second of wall-clock time passed. Returns true if it was counted.
    pub fn tick(&mut self) -> bool {
        let counted = self.is_holding() && self.seen_holding;
        self.seen_holding = false;
        if counted {
            self.seconds += 1;
        }
        counted
    }

    pub fn add_manual(&mut self) {
        self.seconds += 1;
    }

    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    pub fn reset(&mut self) {
        self.debouncer.reset();
        self.lost_since = None;
        self.seen_holding = false;
        self.seconds = 0;
    }
}

// ==============================================================================
// Accumulator
// ==============================================================================

#[derive(Debug, Clone)]
pub enum Accumulator {
    Cyclic(RepCounter),
    Hold(HoldTimer),
}

impl Accumulator {
    pub fn for_kind(kind: ExerciseKind, break_policy: BreakPolicy, min_dwell_ms: u64) -> Self {
        match kind {
            ExerciseKind::Cyclic { from, to } => Accumulator::Cyclic(RepCounter::new(from, to, min_dwell_ms)),
            ExerciseKind::Hold => Accumulator::Hold(HoldTimer::new(break_policy, min_dwell_ms)),
        }
    }

    pub fn current_progress(&self) -> Progress {
        match self {
            Accumulator::Cyclic(counter) => Progress::Reps(counter.reps()),
            Accumulator::Hold(timer) => Progress::HoldSeconds(timer.seconds()),
        }
    }

    /// Feed a classified phase. Returns true if progress changed.
    pub fn observe(&mut self, phase: Phase, timestamp_ms: i64) -> bool {
        match self {
            Accumulator::Cyclic(counter) => counter.observe(phase, timestamp_ms),
            Accumulator::Hold(timer) => timer.observe(phase, timestamp_ms),
        }
    }

    /// Hold tick. Cyclic counters ignore it.
    pub fn on_tick(&mut self) -> bool {
        match self {
            Accumulator::Cyclic(_) => false,
            Accumulator::Hold(timer) => timer.tick(),
        }
    }

    /// One rep, or one second for holds
    pub fn add_manual_tick(&mut self) {
        match self {
            Accumulator::Cyclic(counter) => counter.add_manual(),
            Accumulator::Hold(timer) => timer.add_manual(),
        }
    }

    /// True while a hold exercise is in a confirmed `Holding` phase
    pub fn is_holding(&self) -> bool {
        match self {
            Accumulator::Cyclic(_) => false,
            Accumulator::Hold(timer) => timer.is_holding(),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Accumulator::Cyclic(counter) => counter.reset(),
            Accumulator::Hold(timer) => timer.reset(),
        }
    }
}
