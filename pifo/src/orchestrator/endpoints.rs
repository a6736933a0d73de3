//! Traffic endpoints around the PIFO
//!
//! A sender writes one packet at a time and waits for write completion.
//! With an ingress link rate it also waits out each packet's serialization
//! time before writing the next one, and a [`GeneratorConfig`] can cut its
//! traffic into bursts or stop it early. Several senders share the write
//! port through an [`super::Arbiter`].
//!
//! The receiver keeps exactly one read request outstanding. With an egress
//! link rate it holds each packet for its serialization time, less the two
//! cycles the read handshake already spends, before recording it.

use crate::core::time::Cycle;
use crate::models::event::{Event, EventLog};
use crate::models::packet::{Packet, QueueId};
use crate::pipeline::Pipes;
use crate::sim::{Channel, ChannelError, Kernel, Stage};
use crate::workload::{GeneratorConfig, Workload};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::debug;

/// Cycles of egress serialization already covered by the read handshake
const READ_PIPELINE_CYCLES: Cycle = 2;

/// A packet as written by a sender
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentRecord {
    pub cycle: Cycle,
    /// Index of the sender that wrote it
    pub source: usize,
    pub queue_id: QueueId,
    pub packet: Packet,
}

/// A packet as taken off the egress link
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceivedRecord {
    pub cycle: Cycle,
    pub rank: u64,
    pub packet: Packet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SendPhase {
    /// Off period before the next burst
    Idle,
    Send,
    AwaitDone,
}

/// Producer replaying a [`Workload`] towards the write port
#[derive(Debug)]
pub struct PacketSender {
    index: usize,
    pending: VecDeque<(QueueId, Packet)>,
    link_gbps: Option<f64>,
    generator: GeneratorConfig,
    phase: SendPhase,
    last_len: usize,
    /// Packets written in the current burst
    burst_sent: usize,
    sent: Vec<SentRecord>,
    finished: bool,
}

impl PacketSender {
    pub fn new(index: usize, workload: Workload, link_gbps: Option<f64>) -> Self {
        Self {
            index,
            pending: workload.into_entries().into(),
            link_gbps,
            generator: GeneratorConfig::default(),
            phase: SendPhase::Send,
            last_len: 0,
            burst_sent: 0,
            sent: Vec::new(),
            finished: false,
        }
    }

    /// Shape the release of the workload
    pub fn with_generator(mut self, generator: GeneratorConfig) -> Self {
        if let Some(limit) = generator.pkt_limit {
            self.pending.truncate(limit);
        }
        self.phase = if generator.burst.is_some() {
            SendPhase::Idle
        } else {
            SendPhase::Send
        };
        self.generator = generator;
        self
    }

    pub fn start(&self, kernel: &mut Kernel) {
        kernel.wake(self.stage());
    }

    fn stage(&self) -> Stage {
        Stage::Source(self.index)
    }

    /// Nothing left to send, or the cycle limit has passed
    fn exhausted(&self, now: Cycle) -> bool {
        self.pending.is_empty() || self.generator.cycle_limit.is_some_and(|limit| now >= limit)
    }

    /// Resume the sender, writing into `out` and awaiting completion on `done`
    pub fn step(
        &mut self,
        kernel: &mut Kernel,
        out: &mut Channel<(QueueId, Packet)>,
        done: &mut Channel<()>,
        log: &mut EventLog,
    ) -> Result<(), ChannelError> {
        if kernel.is_done() {
            return Ok(());
        }
        loop {
            match self.phase {
                SendPhase::Idle | SendPhase::Send if self.exhausted(kernel.now()) => {
                    if !self.pending.is_empty() {
                        debug!(
                            source = self.index,
                            unsent = self.pending.len(),
                            "sender reached its cycle limit"
                        );
                    }
                    self.finished = true;
                    return Ok(());
                }
                SendPhase::Idle => {
                    let gap = self.generator.burst.map_or(0, |b| b.gap_ticks);
                    self.phase = SendPhase::Send;
                    if gap > 0 {
                        kernel.wait_ticks(self.stage(), gap);
                        return Ok(());
                    }
                }
                SendPhase::Send => {
                    let Some((queue_id, packet)) = self.pending.pop_front() else {
                        self.finished = true;
                        return Ok(());
                    };
                    let now = kernel.now();
                    log.log(Event::Sent {
                        cycle: now,
                        packet_id: packet.id(),
                        queue_id,
                        len: packet.len(),
                    });
                    self.last_len = packet.len();
                    self.sent.push(SentRecord {
                        cycle: now,
                        source: self.index,
                        queue_id,
                        packet: packet.clone(),
                    });
                    out.put((queue_id, packet), kernel)?;
                    self.phase = SendPhase::AwaitDone;
                }
                SendPhase::AwaitDone => {
                    if done.get(self.stage()).is_none() {
                        return Ok(());
                    }
                    self.phase = SendPhase::Send;
                    if let Some(burst) = self.generator.burst {
                        self.burst_sent += 1;
                        if self.burst_sent >= burst.size {
                            self.burst_sent = 0;
                            self.phase = SendPhase::Idle;
                        }
                    }
                    if let Some(gbps) = self.link_gbps {
                        let cycles = kernel.clock().transmit_cycles(self.last_len, gbps);
                        if cycles > 0 {
                            kernel.wait_cycles(self.stage(), cycles);
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Every packet has been written and acknowledged, or the sender gave up
    /// at its cycle limit
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn sent(&self) -> &[SentRecord] {
        &self.sent
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ReceivePhase {
    Request,
    AwaitData,
    Egress { rank: u64, packet: Packet },
}

/// Consumer pulling packets out of the read port
#[derive(Debug)]
pub struct PacketReceiver {
    link_gbps: Option<f64>,
    phase: ReceivePhase,
    received: Vec<ReceivedRecord>,
}

impl PacketReceiver {
    pub fn new(link_gbps: Option<f64>) -> Self {
        Self {
            link_gbps,
            phase: ReceivePhase::Request,
            received: Vec::new(),
        }
    }

    pub fn start(&self, kernel: &mut Kernel) {
        kernel.wake(Stage::Receiver);
    }

    /// Resume the receiver; a packet already on its way out is still
    /// recorded after the done flag is raised
    pub fn step(
        &mut self,
        kernel: &mut Kernel,
        pipes: &mut Pipes,
        log: &mut EventLog,
    ) -> Result<(), ChannelError> {
        loop {
            match std::mem::replace(&mut self.phase, ReceivePhase::Request) {
                ReceivePhase::Request => {
                    if kernel.is_done() {
                        return Ok(());
                    }
                    pipes.pifo_r_in.put((), kernel)?;
                    self.phase = ReceivePhase::AwaitData;
                }
                ReceivePhase::AwaitData => {
                    let Some((rank, packet)) = pipes.pifo_r_out.get(Stage::Receiver) else {
                        self.phase = ReceivePhase::AwaitData;
                        return Ok(());
                    };
                    let hold = self
                        .link_gbps
                        .map(|gbps| kernel.clock().transmit_cycles(packet.len(), gbps))
                        .unwrap_or(0)
                        .saturating_sub(READ_PIPELINE_CYCLES);
                    self.phase = ReceivePhase::Egress { rank, packet };
                    if hold > 0 {
                        kernel.wait_cycles(Stage::Receiver, hold);
                        return Ok(());
                    }
                }
                ReceivePhase::Egress { rank, packet } => {
                    let now = kernel.now();
                    log.log(Event::Received {
                        cycle: now,
                        packet_id: packet.id(),
                        rank,
                    });
                    self.received.push(ReceivedRecord {
                        cycle: now,
                        rank,
                        packet,
                    });
                }
            }
        }
    }

    pub fn received(&self) -> &[ReceivedRecord] {
        &self.received
    }
}
