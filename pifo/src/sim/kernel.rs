//! Event kernel: a heap of timestamped stage wake-ups

use crate::core::time::{Clock, Cycle};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Every concurrently running activity of the simulated system
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Producer pushing one workload towards the write port
    Source(usize),
    /// Round-robin merge of several sources into the write port
    Arbiter,
    /// Buffer admission in front of the rank pipe
    WriteIngest,
    /// Rank computation
    RankCompute,
    /// Per-tick token bucket replenishment
    TokenRefill,
    /// Insertion of ranked packets into the store
    RankIngest,
    /// Read port serving dequeue requests
    Read,
    /// Consumer issuing dequeue requests
    Receiver,
    /// Per-tick queue occupancy sampler
    Stats,
    /// Completion detection
    Monitor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Wakeup {
    at: Cycle,
    seq: u64,
    stage: Stage,
}

/// Discrete-event scheduler driving all stages
///
/// # Example
/// ```
/// use pifo_sim_core::sim::{Kernel, Stage};
/// use pifo_sim_core::Clock;
///
/// let mut kernel = Kernel::new(Clock::new(1, 5.0));
/// kernel.wait_ticks(Stage::Stats, 2);
/// kernel.wake(Stage::Source(0));
///
/// assert_eq!(kernel.advance(), Some(Stage::Source(0)));
/// assert_eq!(kernel.now(), 0);
/// assert_eq!(kernel.advance(), Some(Stage::Stats));
/// assert_eq!(kernel.now(), 2);
/// assert_eq!(kernel.advance(), None);
/// ```
#[derive(Debug)]
pub struct Kernel {
    clock: Clock,
    pending: BinaryHeap<Reverse<Wakeup>>,
    next_seq: u64,
    done: bool,
}

impl Kernel {
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            pending: BinaryHeap::new(),
            next_seq: 0,
            done: false,
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Current cycle
    pub fn now(&self) -> Cycle {
        self.clock.now()
    }

    /// Resume `stage` at cycle `at` (never earlier than now)
    pub fn schedule(&mut self, stage: Stage, at: Cycle) {
        let at = at.max(self.clock.now());
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Reverse(Wakeup { at, seq, stage }));
    }

    /// Resume `stage` in the current cycle, after already pending wake-ups
    pub fn wake(&mut self, stage: Stage) {
        self.schedule(stage, self.clock.now());
    }

    /// Resume `stage` after `ticks` clock periods
    pub fn wait_ticks(&mut self, stage: Stage, ticks: u64) {
        let at = self.clock.now() + ticks * self.clock.period();
        self.schedule(stage, at);
    }

    /// Resume `stage` after `cycles` raw cycles
    pub fn wait_cycles(&mut self, stage: Stage, cycles: Cycle) {
        let at = self.clock.now() + cycles;
        self.schedule(stage, at);
    }

    /// Pop the earliest wake-up, advancing the clock to it
    pub fn advance(&mut self) -> Option<Stage> {
        let Reverse(wakeup) = self.pending.pop()?;
        self.clock.advance_to(wakeup.at);
        Some(wakeup.stage)
    }

    /// Cycle of the earliest pending wake-up
    pub fn peek_time(&self) -> Option<Cycle> {
        self.pending.peek().map(|Reverse(w)| w.at)
    }

    /// Raise the global done flag; stages observe it when next resumed
    pub fn finish(&mut self) {
        self.done = true;
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Number of wake-ups still pending
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
