//! Orchestrator - testbench driving one PIFO simulation
//!
//! See `engine.rs` for the run loop, `endpoints.rs` for the traffic
//! senders and receiver, and `arbiter.rs` for multi-source runs.

pub mod arbiter;
pub mod endpoints;
pub mod engine;

pub use arbiter::Arbiter;
pub use endpoints::{PacketReceiver, PacketSender, ReceivedRecord, SentRecord};
pub use engine::{Simulation, SimulationConfig, SimulationError, SimulationReport};
