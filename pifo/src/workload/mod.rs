//! Experiment traffic
//!
//! A workload is the ordered list of packets the sender writes into the PIFO,
//! each tagged with the buffer queue it should enter. Reading traces from
//! disk is left to the caller; these builders cover synthetic experiments.
//!
//! [`GeneratorConfig`] shapes how a sender releases its workload: on/off
//! bursts, a packet limit and a cycle after which it stops sending.

use crate::core::time::Cycle;
use crate::models::packet::{Packet, QueueId};
use crate::orchestrator::SimulationError;
use serde::{Deserialize, Serialize};

/// One flow's share of an interleaved pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSpec {
    pub flow_id: u64,
    pub len: usize,
    pub queue_id: QueueId,
}

impl FlowSpec {
    pub fn new(flow_id: u64, len: usize, queue_id: QueueId) -> Self {
        Self {
            flow_id,
            len,
            queue_id,
        }
    }
}

/// On/off traffic: `size` packets back to back, then `gap_ticks` idle ticks
///
/// A sender starts in the idle part, so its first packet leaves after one
/// gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurstPattern {
    pub size: usize,
    pub gap_ticks: u64,
}

/// How a sender releases its workload
///
/// Link-rate pacing comes from the simulation's ingress link; this adds the
/// burst envelope and the stopping conditions.
///
/// # Example
/// ```
/// use pifo_sim_core::workload::GeneratorConfig;
///
/// let generator: GeneratorConfig =
///     serde_json::from_str(r#"{"burst": {"size": 4, "gap_ticks": 100}, "pkt_limit": 1000}"#).unwrap();
/// assert_eq!(generator.burst.map(|b| b.size), Some(4));
/// assert_eq!(generator.cycle_limit, None);
/// assert!(generator.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// `None` sends continuously
    pub burst: Option<BurstPattern>,
    /// Send at most this many packets of the workload
    pub pkt_limit: Option<usize>,
    /// Stop sending once this cycle is reached
    pub cycle_limit: Option<Cycle>,
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if let Some(burst) = self.burst {
            if burst.size == 0 || burst.gap_ticks == 0 {
                return Err(SimulationError::InvalidConfig(format!(
                    "burst size and gap must be positive, got {} packets every {} ticks",
                    burst.size, burst.gap_ticks
                )));
            }
        }
        Ok(())
    }
}

/// Ordered (queue id, packet) pairs fed to the sender
///
/// # Example
/// ```
/// use pifo_sim_core::Workload;
/// use pifo_sim_core::workload::FlowSpec;
///
/// let workload = Workload::uniform(2, 1000, 7, 0)
///     .then(Workload::interleaved(&[FlowSpec::new(1, 64, 1), FlowSpec::new(2, 64, 1)], 2));
///
/// assert_eq!(workload.len(), 6);
/// let flows: Vec<u64> = workload.iter().map(|(_, p)| p.flow_id()).collect();
/// assert_eq!(flows, vec![7, 7, 1, 2, 1, 2]);
/// // Packet ids stay unique after concatenation
/// let ids: Vec<u64> = workload.iter().map(|(_, p)| p.id()).collect();
/// assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    entries: Vec<(QueueId, Packet)>,
}

impl Workload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair packets with their queue ids
    ///
    /// # Errors
    /// `InvalidConfig` when the two lists differ in length.
    pub fn from_parts(packets: Vec<Packet>, queue_ids: Vec<QueueId>) -> Result<Self, SimulationError> {
        if packets.len() != queue_ids.len() {
            return Err(SimulationError::InvalidConfig(format!(
                "{} packets but {} queue ids",
                packets.len(),
                queue_ids.len()
            )));
        }
        Ok(Self {
            entries: queue_ids.into_iter().zip(packets).collect(),
        })
    }

    /// `count` identical packets of one flow, all into one queue
    pub fn uniform(count: usize, len: usize, flow_id: u64, queue_id: QueueId) -> Self {
        Self::interleaved(&[FlowSpec::new(flow_id, len, queue_id)], count)
    }

    /// Repeat `pattern` `rounds` times, one packet per flow per round
    pub fn interleaved(pattern: &[FlowSpec], rounds: usize) -> Self {
        let entries = (0..rounds)
            .flat_map(|_| pattern.iter())
            .enumerate()
            .map(|(id, flow)| (flow.queue_id, Packet::new(id as u64, flow.flow_id, flow.len)))
            .collect();
        Self { entries }
    }

    /// Append a packet; its id is kept as given
    pub fn push(&mut self, queue_id: QueueId, packet: Packet) {
        self.entries.push((queue_id, packet));
    }

    /// Append `other`, renumbering its packet ids to follow this workload's
    pub fn then(mut self, other: Workload) -> Self {
        let offset = self.next_id();
        self.entries.extend(
            other
                .entries
                .into_iter()
                .map(|(q, p)| (q, p.with_id(offset + p.id()))),
        );
        self
    }

    fn next_id(&self) -> u64 {
        self.entries.iter().map(|(_, p)| p.id() + 1).max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(QueueId, Packet)> {
        self.entries.iter()
    }

    /// Sum of packet lengths
    pub fn total_bytes(&self) -> usize {
        self.entries.iter().map(|(_, p)| p.len()).sum()
    }

    pub fn into_entries(self) -> Vec<(QueueId, Packet)> {
        self.entries
    }
}
