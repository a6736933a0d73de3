//! Rank computation stage
//!
//! Sits between buffer admission and the rank-ordered store:
//!
//! ```text
//! WriteIngest --rank_w_in--> RankPipe --rank_r_out--> RankIngest
//!             <-rank_w_out--          <--rank_r_in---
//! ```
//!
//! The packet is acknowledged to admission as soon as it is received, then
//! the ranked result is handed to the store and the pipe waits for the
//! store's acknowledgement before accepting the next packet.

use super::RankPolicy;
use crate::models::event::{Event, EventLog};
use crate::pipeline::{Pipes, RankedPacket};
use crate::sim::{ChannelError, Kernel, Stage};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitPacket,
    AwaitStoreAck,
}

/// Rank stage wrapping a pluggable [`RankPolicy`]
#[derive(Debug)]
pub struct RankPipe {
    policy: Box<dyn RankPolicy>,
    phase: Phase,
    ranked: u64,
}

impl RankPipe {
    pub fn new(policy: Box<dyn RankPolicy>) -> Self {
        Self {
            policy,
            phase: Phase::AwaitPacket,
            ranked: 0,
        }
    }

    /// Register the stage (and the refill stage if the policy ticks)
    pub fn start(&self, kernel: &mut Kernel) {
        kernel.wake(Stage::RankCompute);
        if self.policy.needs_tick() {
            kernel.wake(Stage::TokenRefill);
        }
    }

    pub fn policy(&self) -> &dyn RankPolicy {
        self.policy.as_ref()
    }

    /// Number of packets ranked so far
    pub fn ranked(&self) -> u64 {
        self.ranked
    }

    /// Resume the compute state machine until it parks on a channel
    pub fn step(
        &mut self,
        kernel: &mut Kernel,
        pipes: &mut Pipes,
        log: &mut EventLog,
    ) -> Result<(), ChannelError> {
        if kernel.is_done() {
            return Ok(());
        }
        loop {
            match self.phase {
                Phase::AwaitPacket => {
                    let Some((queue_id, packet)) = pipes.rank_w_in.get(Stage::RankCompute) else {
                        return Ok(());
                    };
                    pipes.rank_w_out.put((), kernel)?;

                    let now = kernel.now();
                    let decision = self.policy.compute_rank(&packet, queue_id, now);
                    self.ranked += 1;
                    debug!(
                        policy = self.policy.name(),
                        packet_id = packet.id(),
                        rank = decision.rank,
                        "ranked packet"
                    );
                    log.log(Event::Ranked {
                        cycle: now,
                        packet_id: packet.id(),
                        rank: decision.rank,
                        send_time: decision.send_time,
                    });

                    pipes.rank_r_out.put(
                        RankedPacket {
                            rank: decision.rank,
                            send_time: decision.send_time,
                            queue_id,
                            packet,
                        },
                        kernel,
                    )?;
                    self.phase = Phase::AwaitStoreAck;
                }
                Phase::AwaitStoreAck => {
                    if pipes.rank_r_in.get(Stage::RankCompute).is_none() {
                        return Ok(());
                    }
                    self.phase = Phase::AwaitPacket;
                }
            }
        }
    }

    /// Per-tick policy maintenance (token refill)
    pub fn tick(&mut self, kernel: &mut Kernel) {
        if kernel.is_done() {
            return;
        }
        self.policy.on_tick(kernel.now());
        kernel.wait_ticks(Stage::TokenRefill, 1);
    }
}
