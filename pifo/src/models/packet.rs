//! Packet representation shared by all pipeline stages.
//!
//! The simulation never looks inside a packet: it needs the byte length for
//! buffer accounting and link timing, and the flow id as the rank field.
//! Parsing real frames into this form is left to the caller.

use serde::{Deserialize, Serialize};

/// Index of a buffer sub-queue inside the PIFO model
pub type QueueId = usize;

/// Opaque scheduled payload with the fields rank computation may read
///
/// # Example
/// ```
/// use pifo_sim_core::Packet;
///
/// let pkt = Packet::new(0, 1, 100);
/// assert_eq!(pkt.len(), 100);
/// assert_eq!(pkt.flow_id(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// Unique id, assigned by the producer
    id: u64,
    /// Flow identifier (e.g. the transport source port)
    flow_id: u64,
    /// Length on the wire in bytes
    len: usize,
}

#[allow(clippy::len_without_is_empty)]
impl Packet {
    pub fn new(id: u64, flow_id: u64, len: usize) -> Self {
        Self { id, flow_id, len }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn flow_id(&self) -> u64 {
        self.flow_id
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    /// Copy of this packet carrying a different id
    pub fn with_id(&self, id: u64) -> Self {
        Self { id, ..self.clone() }
    }
}
