//! Clocked PIFO hardware model
//!
//! The model is a set of stages that share no state except the channels in
//! [`Pipes`]:
//!
//! ```text
//!            pifo_w_in            rank_w_in             rank_r_out
//! Sender ───────────────> Write ────────────> RankPipe ───────────> RankIngest ─> store
//!        <─────────────── Ingest <──────────          <───────────
//!            pifo_w_out           rank_w_out            rank_r_in
//!
//!            pifo_r_in                  pifo_r_out
//! Receiver ───────────────> Read ─────────────────> Receiver
//! ```
//!
//! Every handshake keeps at most one value in flight, so all channels have
//! capacity 1.

pub mod pifo;
pub mod stats;
pub mod store;

pub use pifo::PifoModel;
pub use stats::QueueOccupancy;
pub use store::{PifoStore, StoredPacket};

use crate::models::packet::{Packet, QueueId};
use crate::sim::Channel;

/// Output of the rank pipe, consumed by rank ingest
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPacket {
    pub rank: u64,
    /// Earliest cycle the packet may be read; `None` means immediately
    pub send_time: Option<f64>,
    pub queue_id: QueueId,
    pub packet: Packet,
}

/// All inter-stage channels of one simulation
#[derive(Debug)]
pub struct Pipes {
    /// Write data into the PIFO
    pub pifo_w_in: Channel<(QueueId, Packet)>,
    /// Write completion back to the producer
    pub pifo_w_out: Channel<()>,
    /// Admitted packets into the rank pipe
    pub rank_w_in: Channel<(QueueId, Packet)>,
    /// Rank pipe accepted the packet
    pub rank_w_out: Channel<()>,
    /// Ranked packets towards the store
    pub rank_r_out: Channel<RankedPacket>,
    /// Store accepted the ranked packet
    pub rank_r_in: Channel<()>,
    /// Read requests
    pub pifo_r_in: Channel<()>,
    /// Read results: (rank, packet)
    pub pifo_r_out: Channel<(u64, Packet)>,
}

impl Pipes {
    pub fn new() -> Self {
        Self {
            pifo_w_in: Channel::new("pifo_w_in", 1),
            pifo_w_out: Channel::new("pifo_w_out", 1),
            rank_w_in: Channel::new("rank_w_in", 1),
            rank_w_out: Channel::new("rank_w_out", 1),
            rank_r_out: Channel::new("rank_r_out", 1),
            rank_r_in: Channel::new("rank_r_in", 1),
            pifo_r_in: Channel::new("pifo_r_in", 1),
            pifo_r_out: Channel::new("pifo_r_out", 1),
        }
    }
}

impl Default for Pipes {
    fn default() -> Self {
        Self::new()
    }
}
