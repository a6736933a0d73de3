//! Ingress rate limiting with a token bucket
//!
//! # Behavior
//!
//! - One token is one byte; the bucket starts full at `max_burst`
//! - Every tick the bucket gains `target_rate` tokens, capped at `max_burst`
//! - A packet that fits in the current balance leaves now and spends its
//!   length in tokens
//! - A packet that does not fit is scheduled after the previous send time by
//!   the time the bucket needs to cover the shortfall, and empties the bucket
//!
//! The previous send time is always overwritten with the value just
//! computed, so successive shortfalls chain into a non-decreasing schedule.
//! Rate limiting thus becomes a scheduling decision of the PIFO rather than
//! a separate shaping queue.

use super::{RankDecision, RankPolicy};
use crate::core::time::Cycle;
use crate::models::packet::{Packet, QueueId};
use tracing::trace;

/// Strict rank plus a token-bucket send time
///
/// # Example
///
/// ```
/// use pifo_sim_core::rank::{RankPolicy, TokenBucketPolicy};
/// use pifo_sim_core::Packet;
///
/// // 10 bytes per tick, 100 byte burst, 1 cycle per tick
/// let mut policy = TokenBucketPolicy::new(10.0, 100.0, 1);
///
/// let first = policy.compute_rank(&Packet::new(0, 1, 100), 0, 5);
/// assert_eq!(first.send_time, Some(5.0));
///
/// // Bucket is empty: 50 bytes need 5 ticks after the previous send time
/// let second = policy.compute_rank(&Packet::new(1, 1, 50), 0, 5);
/// assert_eq!(second.send_time, Some(10.0));
/// ```
#[derive(Debug, Clone)]
pub struct TokenBucketPolicy {
    /// Current balance in bytes
    tokens: f64,
    /// Refill in bytes per tick
    target_rate: f64,
    /// Bucket capacity in bytes
    max_burst: f64,
    /// Cycles per tick, used to express send times in cycles
    period: Cycle,
    /// Send time of the previous packet
    last_send_time: f64,
}

impl TokenBucketPolicy {
    /// Create a full bucket
    ///
    /// # Arguments
    /// * `target_rate` - Refill in bytes per tick (must be positive)
    /// * `max_burst` - Capacity in bytes
    /// * `period` - Cycles per tick
    pub fn new(target_rate: f64, max_burst: f64, period: Cycle) -> Self {
        Self {
            tokens: max_burst,
            target_rate,
            max_burst,
            period,
            last_send_time: 0.0,
        }
    }

    /// Current token balance in bytes
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Send time handed to the previous packet
    pub fn last_send_time(&self) -> f64 {
        self.last_send_time
    }

    /// Add one tick's worth of tokens, up to the burst cap
    pub fn refill(&mut self) {
        if self.tokens < self.max_burst {
            self.tokens = (self.tokens + self.target_rate).min(self.max_burst);
        }
    }

    fn send_time(&mut self, len: f64, now: Cycle) -> f64 {
        let send_time = if len <= self.tokens {
            self.tokens -= len;
            now as f64
        } else {
            let shortfall_ticks = (len - self.tokens) / self.target_rate;
            self.tokens = 0.0;
            self.last_send_time + shortfall_ticks * self.period as f64
        };
        self.last_send_time = send_time;
        send_time
    }
}

impl RankPolicy for TokenBucketPolicy {
    fn compute_rank(&mut self, packet: &Packet, _queue_id: QueueId, now: Cycle) -> RankDecision {
        let send_time = self.send_time(packet.len() as f64, now);
        trace!(
            packet_id = packet.id(),
            len = packet.len(),
            tokens = self.tokens,
            send_time,
            "token bucket scheduled packet"
        );
        RankDecision::shaped(packet.flow_id(), send_time)
    }

    fn on_tick(&mut self, _now: Cycle) {
        self.refill();
    }

    fn needs_tick(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "token_bucket"
    }
}
