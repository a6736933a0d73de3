//! Strict priority ranking
//!
//! Rank is the packet's flow id: lower flow ids always win. The computation
//! is combinational and adds no latency beyond the rank pipe handshake.

use super::{RankDecision, RankPolicy};
use crate::core::time::Cycle;
use crate::models::packet::{Packet, QueueId};

/// Strict policy: rank = flow id
///
/// # Example
///
/// ```
/// use pifo_sim_core::rank::{RankPolicy, StrictPolicy};
/// use pifo_sim_core::Packet;
///
/// let mut policy = StrictPolicy::new();
/// let decision = policy.compute_rank(&Packet::new(0, 2, 300), 1, 10);
/// assert_eq!(decision.rank, 2);
/// assert_eq!(decision.send_time, None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StrictPolicy;

impl StrictPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl RankPolicy for StrictPolicy {
    fn compute_rank(&mut self, packet: &Packet, _queue_id: QueueId, _now: Cycle) -> RankDecision {
        RankDecision::immediate(packet.flow_id())
    }

    fn name(&self) -> &'static str {
        "strict"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_ignores_queue_and_time() {
        let mut policy = StrictPolicy::new();
        let pkt = Packet::new(5, 9, 64);
        let a = policy.compute_rank(&pkt, 0, 0);
        let b = policy.compute_rank(&pkt, 3, 1_000);
        assert_eq!(a, b);
        assert!(!policy.needs_tick());
    }
}
