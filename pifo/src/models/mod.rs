//! Domain models for the PIFO simulation

pub mod event;
pub mod packet;

// Re-exports
pub use event::{Event, EventLog};
pub use packet::{Packet, QueueId};
