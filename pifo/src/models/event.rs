//! Event logging for simulation replay and auditing.
//!
//! Every significant state change in the PIFO pipeline is captured as an
//! [`Event`]. Because the simulation is deterministic, two runs over the
//! same workload and configuration produce identical logs, which makes the
//! log a convenient oracle for regression tests.
//!
//! # Event Types
//!
//! Events follow a packet through the pipeline:
//! - **Sent**: producer handed the packet to the write port
//! - **Admitted** / **Dropped**: buffer admission outcome
//! - **PushedOut**: evicted from a full store by a lower-ranked arrival
//! - **Ranked**: rank computation finished
//! - **Dequeued**: read port released the packet
//! - **Received**: consumer recorded the packet
//! - **Finished**: completion monitor raised the done flag
//!
//! # Example
//!
//! ```rust
//! use pifo_sim_core::models::Event;
//!
//! let event = Event::Dropped {
//!     cycle: 10,
//!     packet_id: 42,
//!     queue_id: 1,
//!     len: 1500,
//!     queue_bytes: 64_000,
//! };
//!
//! assert_eq!(event.cycle(), 10);
//! assert_eq!(event.packet_id(), Some(42));
//! ```

use crate::core::time::Cycle;
use crate::models::packet::QueueId;
use serde::Serialize;

/// Simulation event capturing a state change.
///
/// All events include a cycle number for temporal ordering. Events sharing a
/// cycle are logged in the order the kernel resumed their stages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Event {
    /// Producer wrote a packet into the PIFO write port
    Sent {
        cycle: Cycle,
        packet_id: u64,
        queue_id: QueueId,
        len: usize,
    },

    /// Packet fit within its queue's byte budget and entered the rank pipe
    Admitted {
        cycle: Cycle,
        packet_id: u64,
        queue_id: QueueId,
        len: usize,
    },

    /// Packet would have overflowed its queue and was discarded
    Dropped {
        cycle: Cycle,
        packet_id: u64,
        queue_id: QueueId,
        len: usize,
        /// Bytes already buffered in the queue at the time of the drop
        queue_bytes: usize,
    },

    /// Store was over capacity and gave up its highest-ranked entry
    PushedOut {
        cycle: Cycle,
        packet_id: u64,
        queue_id: QueueId,
        rank: u64,
    },

    /// Rank computation produced a rank (and maybe a send time)
    Ranked {
        cycle: Cycle,
        packet_id: u64,
        rank: u64,
        send_time: Option<f64>,
    },

    /// Read port removed the packet from the store
    Dequeued {
        cycle: Cycle,
        packet_id: u64,
        queue_id: QueueId,
        rank: u64,
    },

    /// Consumer finished receiving the packet
    Received {
        cycle: Cycle,
        packet_id: u64,
        rank: u64,
    },

    /// All traffic was sent and the store drained
    Finished { cycle: Cycle },
}

impl Event {
    /// Get the cycle when this event occurred
    pub fn cycle(&self) -> Cycle {
        match self {
            Event::Sent { cycle, .. } => *cycle,
            Event::Admitted { cycle, .. } => *cycle,
            Event::Dropped { cycle, .. } => *cycle,
            Event::PushedOut { cycle, .. } => *cycle,
            Event::Ranked { cycle, .. } => *cycle,
            Event::Dequeued { cycle, .. } => *cycle,
            Event::Received { cycle, .. } => *cycle,
            Event::Finished { cycle } => *cycle,
        }
    }

    /// Get a short description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::Sent { .. } => "Sent",
            Event::Admitted { .. } => "Admitted",
            Event::Dropped { .. } => "Dropped",
            Event::PushedOut { .. } => "PushedOut",
            Event::Ranked { .. } => "Ranked",
            Event::Dequeued { .. } => "Dequeued",
            Event::Received { .. } => "Received",
            Event::Finished { .. } => "Finished",
        }
    }

    /// Get packet ID if event relates to a specific packet
    pub fn packet_id(&self) -> Option<u64> {
        match self {
            Event::Sent { packet_id, .. }
            | Event::Admitted { packet_id, .. }
            | Event::Dropped { packet_id, .. }
            | Event::PushedOut { packet_id, .. }
            | Event::Ranked { packet_id, .. }
            | Event::Dequeued { packet_id, .. }
            | Event::Received { packet_id, .. } => Some(*packet_id),
            Event::Finished { .. } => None,
        }
    }
}

/// Append-only log of simulation events
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Add an event to the log
    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Get all events
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Get events for a specific cycle
    pub fn events_at_cycle(&self, cycle: Cycle) -> Vec<&Event> {
        self.events.iter().filter(|e| e.cycle() == cycle).collect()
    }

    /// Get events of a specific type
    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get the lifecycle of one packet
    pub fn events_for_packet(&self, packet_id: u64) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.packet_id() == Some(packet_id))
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type() {
        let event = Event::Ranked {
            cycle: 3,
            packet_id: 7,
            rank: 2,
            send_time: None,
        };
        assert_eq!(event.event_type(), "Ranked");
        assert_eq!(Event::Finished { cycle: 9 }.packet_id(), None);
    }

    #[test]
    fn test_event_log_queries() {
        let mut log = EventLog::new();
        assert!(log.is_empty());

        log.log(Event::Sent {
            cycle: 1,
            packet_id: 0,
            queue_id: 0,
            len: 100,
        });
        log.log(Event::Admitted {
            cycle: 1,
            packet_id: 0,
            queue_id: 0,
            len: 100,
        });
        log.log(Event::Sent {
            cycle: 2,
            packet_id: 1,
            queue_id: 1,
            len: 300,
        });

        assert_eq!(log.len(), 3);
        assert_eq!(log.events_at_cycle(1).len(), 2);
        assert_eq!(log.events_of_type("Sent").len(), 2);
        assert_eq!(log.events_for_packet(0).len(), 2);

        log.clear();
        assert!(log.is_empty());
    }
}
