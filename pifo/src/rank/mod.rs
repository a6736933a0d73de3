//! Rank Computation Module
//!
//! This module defines the policy interface used by the rank pipe to turn an
//! arriving packet into a scheduling rank.
//!
//! # Overview
//!
//! Every packet admitted to the PIFO passes through exactly one rank
//! computation. The policy decides:
//! - **rank**: the packet's position in the store (lower dequeues first)
//! - **send time**: optionally, the earliest cycle at which the packet may
//!   be dequeued, which turns rate limiting into a scheduling decision
//!
//! # Policy Interface
//!
//! All policies implement the `RankPolicy` trait:
//! ```rust
//! use pifo_sim_core::rank::{RankDecision, RankPolicy};
//! use pifo_sim_core::{Cycle, Packet, QueueId};
//!
//! #[derive(Debug)]
//! struct BySize;
//!
//! impl RankPolicy for BySize {
//!     fn compute_rank(&mut self, packet: &Packet, _queue_id: QueueId, _now: Cycle) -> RankDecision {
//!         RankDecision::immediate(packet.len() as u64)
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "by_size"
//!     }
//! }
//! ```
//!
//! Available policies:
//! 1. **Strict**: rank is the packet's flow id
//! 2. **TokenBucket**: strict rank plus an ingress rate-limited send time
//!
//! Policies are selected through [`RankPolicyConfig`] and instantiated by the
//! orchestrator.

use crate::core::time::{Clock, Cycle};
use crate::models::packet::{Packet, QueueId};
use serde::{Deserialize, Serialize};

pub mod pipe;
pub mod strict;
pub mod token_bucket;

pub use pipe::RankPipe;
pub use strict::StrictPolicy;
pub use token_bucket::TokenBucketPolicy;

/// Outcome of a rank computation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankDecision {
    /// Scheduling rank (lower dequeues first)
    pub rank: u64,
    /// Earliest cycle the packet may leave; `None` means immediately
    pub send_time: Option<f64>,
}

impl RankDecision {
    /// Rank with no send-time constraint
    pub fn immediate(rank: u64) -> Self {
        Self {
            rank,
            send_time: None,
        }
    }

    /// Rank that must wait until `send_time`
    pub fn shaped(rank: u64, send_time: f64) -> Self {
        Self {
            rank,
            send_time: Some(send_time),
        }
    }
}

/// Pluggable rank computation
pub trait RankPolicy: std::fmt::Debug {
    /// Compute the rank (and optional send time) of an admitted packet
    ///
    /// # Arguments
    /// * `packet` - Packet being ranked
    /// * `queue_id` - Buffer queue the packet was admitted to
    /// * `now` - Current cycle
    fn compute_rank(&mut self, packet: &Packet, queue_id: QueueId, now: Cycle) -> RankDecision;

    /// Called once per clock tick while the simulation runs
    fn on_tick(&mut self, _now: Cycle) {}

    /// Whether `on_tick` does anything; ticking stages are only spawned then
    fn needs_tick(&self) -> bool {
        false
    }

    /// Short label for logs
    fn name(&self) -> &'static str;
}

/// Rank policy selection
///
/// Deserializes from JSON, e.g. `{"type": "strict"}` or
/// `{"type": "token_bucket", "target_rate": 0.9375, "max_burst": 1500.0}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RankPolicyConfig {
    /// Rank = flow id
    #[default]
    Strict,

    /// Rank = flow id, send time from an ingress token bucket
    TokenBucket {
        /// Refill rate in bytes per clock tick
        target_rate: f64,
        /// Bucket capacity in bytes
        max_burst: f64,
    },
}

impl RankPolicyConfig {
    /// Token bucket configured from a link rate in Gbps
    ///
    /// # Example
    /// ```
    /// use pifo_sim_core::{Clock, RankPolicyConfig};
    ///
    /// // 1.5 Gbps with 5 ns cycles = 0.9375 bytes per cycle
    /// let config = RankPolicyConfig::token_bucket_gbps(1.5, 1500.0, &Clock::new(1, 5.0));
    /// assert_eq!(
    ///     config,
    ///     RankPolicyConfig::TokenBucket { target_rate: 0.9375, max_burst: 1500.0 }
    /// );
    /// ```
    pub fn token_bucket_gbps(gbps: f64, max_burst: f64, clock: &Clock) -> Self {
        let ns_per_tick = clock.cycles_to_ns(clock.period());
        RankPolicyConfig::TokenBucket {
            target_rate: gbps * ns_per_tick / 8.0,
            max_burst,
        }
    }

    /// Check parameters, returning a description of the first problem
    pub fn validate(&self) -> Result<(), String> {
        match self {
            RankPolicyConfig::Strict => Ok(()),
            RankPolicyConfig::TokenBucket {
                target_rate,
                max_burst,
            } => {
                if !target_rate.is_finite() || *target_rate <= 0.0 {
                    return Err(format!("token bucket target_rate must be positive, got {target_rate}"));
                }
                if !max_burst.is_finite() || *max_burst < 0.0 {
                    return Err(format!("token bucket max_burst must be non-negative, got {max_burst}"));
                }
                Ok(())
            }
        }
    }

    /// Instantiate the configured policy for a clock with `period` cycles per tick
    pub fn build(&self, period: Cycle) -> Box<dyn RankPolicy> {
        match self {
            RankPolicyConfig::Strict => Box::new(StrictPolicy::new()),
            RankPolicyConfig::TokenBucket {
                target_rate,
                max_burst,
            } => Box::new(TokenBucketPolicy::new(*target_rate, *max_burst, period)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parses_from_json() {
        let strict: RankPolicyConfig = serde_json::from_str(r#"{"type": "strict"}"#).unwrap();
        assert_eq!(strict, RankPolicyConfig::Strict);

        let tb: RankPolicyConfig = serde_json::from_str(
            r#"{"type": "token_bucket", "target_rate": 2.0, "max_burst": 100.0}"#,
        )
        .unwrap();
        assert_eq!(
            tb,
            RankPolicyConfig::TokenBucket {
                target_rate: 2.0,
                max_burst: 100.0
            }
        );
    }

    #[test]
    fn test_validate_rejects_non_positive_rate() {
        let bad = RankPolicyConfig::TokenBucket {
            target_rate: 0.0,
            max_burst: 10.0,
        };
        assert!(bad.validate().is_err());
        assert!(RankPolicyConfig::Strict.validate().is_ok());
    }

    #[test]
    fn test_build_selects_policy() {
        assert_eq!(RankPolicyConfig::Strict.build(1).name(), "strict");
        let tb = RankPolicyConfig::TokenBucket {
            target_rate: 1.0,
            max_burst: 10.0,
        }
        .build(1);
        assert_eq!(tb.name(), "token_bucket");
        assert!(tb.needs_tick());
    }
}
