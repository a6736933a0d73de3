//! Discrete-event simulation primitives
//!
//! The pipeline is modelled as a fixed set of stages multiplexed on one
//! thread. A stage runs until it has to wait, then registers a wake-up:
//!
//! - a timed wake-up on the [`Kernel`] (waiting for the next clock edge)
//! - a receive on an empty [`Channel`], which wakes it when a value arrives
//!
//! The kernel always resumes the earliest wake-up, breaking ties by the
//! order in which they were registered, so every run is reproducible.

pub mod channel;
pub mod kernel;

pub use channel::{Channel, ChannelError};
pub use kernel::{Kernel, Stage};
