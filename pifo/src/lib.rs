//! PIFO Scheduler Core - Rust Engine
//!
//! Group-based Push-In-First-Out scheduling with a deterministic, clocked
//! simulation of a PIFO hardware pipeline.
//!
//! # Architecture
//!
//! - **gpifo**: Scheduling data structures (FIFO, PriorityQ, GPIFO, GPIFO tree)
//! - **core**: Clock and cycle arithmetic
//! - **sim**: Discrete-event kernel and bounded handoff channels
//! - **rank**: Pluggable rank computation policies (strict, token bucket)
//! - **pipeline**: PIFO hardware model (admission, push-out, rank-ordered store, stats)
//! - **orchestrator**: Testbench wiring senders, arbiter, rank pipe and PIFO together
//! - **workload**: Experiment traffic builders and sender shaping
//!
//! # Critical Invariants
//!
//! 1. Lower rank dequeues first; equal ranks dequeue in arrival order
//! 2. A group is scheduled iff its FIFO is non-empty
//! 3. Simulations are single-threaded and deterministic (same input, same trace)

// Module declarations
pub mod core;
pub mod gpifo;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod rank;
pub mod sim;
pub mod workload;

// Re-exports for convenience
pub use crate::core::time::{Clock, Cycle};
pub use gpifo::{Fifo, Gpifo, GpifoError, GpifoTree, NodeId, PriorityQ, TreeShape};
pub use models::{
    event::{Event, EventLog},
    packet::{Packet, QueueId},
};
pub use orchestrator::{
    Arbiter, ReceivedRecord, SentRecord, Simulation, SimulationConfig, SimulationError,
    SimulationReport,
};
pub use pipeline::{PifoModel, PifoStore, QueueOccupancy};
pub use rank::{RankDecision, RankPolicy, RankPolicyConfig, StrictPolicy, TokenBucketPolicy};
pub use workload::{BurstPattern, GeneratorConfig, Workload};
