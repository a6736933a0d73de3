//! Rank-ordered packet store with optional send-time shaping

use crate::core::time::Cycle;
use crate::models::packet::{Packet, QueueId};
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};

/// A packet held by the store together with its scheduling metadata
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPacket {
    pub rank: u64,
    pub queue_id: QueueId,
    pub packet: Packet,
}

/// Entry waiting in the calendar for its send time
#[derive(Debug, Clone)]
struct Scheduled {
    send_time: f64,
    seq: u64,
    item: StoredPacket,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        self.send_time
            .total_cmp(&other.send_time)
            .then(self.seq.cmp(&other.seq))
    }
}

/// The PIFO hardware model's internal store
///
/// Eligible packets are keyed by `(rank, arrival sequence)`, so equal ranks
/// leave in arrival order, matching [`crate::gpifo::PriorityQ`]. Packets
/// carrying a send time sit in a calendar until `send_time <= now`.
///
/// # Example
/// ```
/// use pifo_sim_core::{Packet, PifoStore};
///
/// let mut store = PifoStore::new();
/// store.push(3, None, 0, Packet::new(0, 3, 100));
/// store.push(1, Some(10.0), 0, Packet::new(1, 1, 100));
///
/// // Rank 1 is not yet due at cycle 0
/// assert_eq!(store.pop(0).map(|p| p.packet.id()), Some(0));
/// assert!(store.pop(5).is_none());
/// assert_eq!(store.pop(10).map(|p| p.packet.id()), Some(1));
/// ```
#[derive(Debug, Default)]
pub struct PifoStore {
    ready: BTreeMap<(u64, u64), StoredPacket>,
    calendar: BinaryHeap<Reverse<Scheduled>>,
    next_seq: u64,
}

impl PifoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a ranked packet; `send_time` of `None` makes it eligible now
    pub fn push(&mut self, rank: u64, send_time: Option<f64>, queue_id: QueueId, packet: Packet) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let item = StoredPacket {
            rank,
            queue_id,
            packet,
        };
        match send_time {
            None => {
                self.ready.insert((rank, seq), item);
            }
            Some(send_time) => self.calendar.push(Reverse(Scheduled {
                send_time,
                seq,
                item,
            })),
        }
    }

    /// Move every calendar entry due at `now` into the eligible set
    ///
    /// Returns the number of entries released.
    pub fn release(&mut self, now: Cycle) -> usize {
        let now = now as f64;
        let mut released = 0;
        while self
            .calendar
            .peek()
            .is_some_and(|Reverse(s)| s.send_time <= now)
        {
            if let Some(Reverse(s)) = self.calendar.pop() {
                self.ready.insert((s.item.rank, s.seq), s.item);
                released += 1;
            }
        }
        released
    }

    /// Remove the lowest-ranked packet eligible at `now`
    pub fn pop(&mut self, now: Cycle) -> Option<StoredPacket> {
        self.release(now);
        self.ready.pop_first().map(|(_, item)| item)
    }

    /// Remove the entry with the largest rank, eligible or not
    ///
    /// Among equal ranks the latest arrival goes, so a newcomer that ties
    /// the worst entry is the one evicted.
    pub fn evict_max(&mut self) -> Option<StoredPacket> {
        let ready_max = self.ready.last_key_value().map(|(key, _)| *key);
        let waiting_max = self
            .calendar
            .iter()
            .map(|Reverse(s)| (s.item.rank, s.seq))
            .max();

        match (ready_max, waiting_max) {
            (Some(ready), Some(waiting)) if waiting > ready => self.evict_waiting(waiting.1),
            (Some(_), _) => self.ready.pop_last().map(|(_, item)| item),
            (None, Some(waiting)) => self.evict_waiting(waiting.1),
            (None, None) => None,
        }
    }

    fn evict_waiting(&mut self, seq: u64) -> Option<StoredPacket> {
        let mut entries = std::mem::take(&mut self.calendar).into_vec();
        let victim = entries
            .iter()
            .position(|Reverse(s)| s.seq == seq)
            .map(|pos| entries.swap_remove(pos));
        self.calendar = entries.into();
        victim.map(|Reverse(s)| s.item)
    }

    /// Rank of the next eligible packet, without releasing anything
    pub fn peek_rank(&self) -> Option<u64> {
        self.ready.keys().next().map(|(rank, _)| *rank)
    }

    /// Earliest send time still waiting in the calendar
    pub fn next_send_time(&self) -> Option<f64> {
        self.calendar.peek().map(|Reverse(s)| s.send_time)
    }

    /// Packets eligible for reading
    pub fn num_ready(&self) -> usize {
        self.ready.len()
    }

    /// Packets still waiting for their send time
    pub fn num_waiting(&self) -> usize {
        self.calendar.len()
    }

    pub fn len(&self) -> usize {
        self.ready.len() + self.calendar.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty() && self.calendar.is_empty()
    }
}
