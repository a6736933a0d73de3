//! Simulation engine
//!
//! Wires the senders, PIFO model, rank pipe and receiver together over one
//! [`Kernel`] and runs them until the workload has drained through the PIFO.
//! A single sender writes straight into the PIFO; several senders are merged
//! by an [`Arbiter`].
//!
//! # Run loop
//!
//! ```text
//! while let Some(stage) = kernel.advance():
//!     dispatch(stage)          // resume that stage's state machine
//! ```
//!
//! A monitor stage checks once per tick whether every sender has finished,
//! the arbiter holds nothing and nothing is buffered between admission and
//! the store. It then raises the
//! kernel's done flag; every looping stage stops at its next resumption and
//! the pending heap drains. A cycle limit bounds runs that never drain.
//!
//! # Determinism
//!
//! There is no randomness and no parallelism: same config and workload give
//! an identical event log and report.

use super::arbiter::Arbiter;
use super::endpoints::{PacketReceiver, PacketSender, ReceivedRecord, SentRecord};
use crate::core::time::{Clock, Cycle};
use crate::models::event::{Event, EventLog};
use crate::pipeline::{PifoModel, Pipes, QueueOccupancy};
use crate::rank::{RankPipe, RankPolicyConfig};
use crate::sim::{ChannelError, Kernel, Stage};
use crate::workload::{GeneratorConfig, Workload};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// Configuration
// ============================================================================

/// Simulation configuration
///
/// Every field has a default, so a JSON config only needs the fields it
/// changes.
///
/// # Example
/// ```
/// use pifo_sim_core::{RankPolicyConfig, SimulationConfig};
///
/// let config = SimulationConfig::from_json(r#"{
///     "buf_size": 4096,
///     "num_queues": 2,
///     "rank_policy": {"type": "token_bucket", "target_rate": 0.9375, "max_burst": 1500.0}
/// }"#).unwrap();
///
/// assert_eq!(config.period, 1);
/// assert_eq!(config.buf_size, Some(4096));
/// assert!(matches!(config.rank_policy, RankPolicyConfig::TokenBucket { .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Cycles per clock tick
    pub period: Cycle,

    /// Nanoseconds per cycle, used for link timing
    pub ns_per_cycle: f64,

    /// Total PIFO buffer in bytes (None = unlimited)
    pub buf_size: Option<usize>,

    /// Number of queues the buffer is split into
    pub num_queues: usize,

    /// Store capacity in packets; an overfull store pushes out its highest
    /// rank (None = unlimited)
    pub max_entries: Option<usize>,

    /// Ticks the store takes to insert a ranked packet
    pub write_latency: u64,

    /// Ticks between a read request and the store serving it
    pub read_latency: u64,

    /// Rank computation policy
    pub rank_policy: RankPolicyConfig,

    /// Sender link rate in Gbps (None = back-to-back writes)
    pub ingress_link_gbps: Option<f64>,

    /// Receiver link rate in Gbps (None = reads as fast as the PIFO serves)
    pub egress_link_gbps: Option<f64>,

    /// Burst envelope and stopping conditions applied to every sender
    pub generator: GeneratorConfig,

    /// Hard stop for runs that never drain
    pub max_cycles: Cycle,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            period: 1,
            ns_per_cycle: 5.0,
            buf_size: None,
            num_queues: 1,
            max_entries: None,
            write_latency: 0,
            read_latency: 0,
            rank_policy: RankPolicyConfig::Strict,
            ingress_link_gbps: None,
            egress_link_gbps: None,
            generator: GeneratorConfig::default(),
            max_cycles: 10_000_000,
        }
    }
}

impl SimulationConfig {
    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        let config: SimulationConfig =
            serde_json::from_str(json).map_err(|e| SimulationError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.period == 0 {
            return Err(SimulationError::InvalidConfig(
                "period must be positive".to_string(),
            ));
        }
        if !self.ns_per_cycle.is_finite() || self.ns_per_cycle <= 0.0 {
            return Err(SimulationError::InvalidConfig(format!(
                "ns_per_cycle must be positive, got {}",
                self.ns_per_cycle
            )));
        }
        if self.num_queues == 0 {
            return Err(SimulationError::InvalidConfig(
                "num_queues must be at least 1".to_string(),
            ));
        }
        if self.max_entries == Some(0) {
            return Err(SimulationError::InvalidConfig(
                "max_entries must be at least 1".to_string(),
            ));
        }
        if self.max_cycles == 0 {
            return Err(SimulationError::InvalidConfig(
                "max_cycles must be positive".to_string(),
            ));
        }
        for (name, rate) in [
            ("ingress_link_gbps", self.ingress_link_gbps),
            ("egress_link_gbps", self.egress_link_gbps),
        ] {
            if let Some(gbps) = rate {
                if !gbps.is_finite() || gbps <= 0.0 {
                    return Err(SimulationError::InvalidConfig(format!(
                        "{name} must be positive, got {gbps}"
                    )));
                }
            }
        }
        self.generator.validate()?;
        self.rank_policy
            .validate()
            .map_err(SimulationError::InvalidConfig)
    }

    pub fn clock(&self) -> Clock {
        Clock::new(self.period, self.ns_per_cycle)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Simulation error types
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulationError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Channel protocol violation: {0}")]
    Channel(#[from] ChannelError),
}

// ============================================================================
// Report
// ============================================================================

/// Everything an external statistics or plotting step needs from a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    /// Cycle at which the last stage stopped
    pub final_cycle: Cycle,
    /// Run stopped at `max_cycles` rather than by draining
    pub timed_out: bool,
    pub rank_policy: &'static str,
    pub sent: Vec<SentRecord>,
    pub received: Vec<ReceivedRecord>,
    /// Admission drops plus push-out evictions
    pub drops: u64,
    pub drops_per_queue: Vec<u64>,
    pub pushed_out: u64,
    pub occupancy: QueueOccupancy,
}

impl SimulationReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Packet ids in the order they left the PIFO
    pub fn received_ids(&self) -> Vec<u64> {
        self.received.iter().map(|r| r.packet.id()).collect()
    }

    /// Ranks in the order packets left the PIFO
    pub fn received_ranks(&self) -> Vec<u64> {
        self.received.iter().map(|r| r.rank).collect()
    }
}

// ============================================================================
// Simulation
// ============================================================================

/// Testbench owning every stage of one run
///
/// # Example
/// ```
/// use pifo_sim_core::{Simulation, SimulationConfig, Workload};
/// use pifo_sim_core::workload::FlowSpec;
///
/// let workload = Workload::interleaved(&[FlowSpec::new(2, 64, 0), FlowSpec::new(1, 64, 0)], 3);
/// let mut sim = Simulation::new(SimulationConfig::default(), workload).unwrap();
/// let report = sim.run().unwrap();
///
/// assert_eq!(report.received.len(), 6);
/// assert_eq!(report.drops, 0);
/// assert!(!report.timed_out);
/// ```
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    kernel: Kernel,
    pipes: Pipes,
    log: EventLog,
    sources: Vec<PacketSender>,
    arbiter: Option<Arbiter>,
    pifo: PifoModel,
    rank_pipe: RankPipe,
    receiver: PacketReceiver,
    started: bool,
    timed_out: bool,
}

impl Simulation {
    /// Build a single-source simulation after validating `config`
    pub fn new(config: SimulationConfig, workload: Workload) -> Result<Self, SimulationError> {
        Self::with_sources(config, vec![workload])
    }

    /// Build a simulation with one sender per workload
    ///
    /// With more than one workload the senders share the write port through
    /// a round-robin [`Arbiter`]. Packet ids are kept as given, so callers
    /// that want to trace packets should keep them unique across workloads.
    ///
    /// # Errors
    /// `InvalidConfig` for an invalid `config` or an empty workload list.
    pub fn with_sources(
        config: SimulationConfig,
        workloads: Vec<Workload>,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        if workloads.is_empty() {
            return Err(SimulationError::InvalidConfig(
                "at least one workload is required".to_string(),
            ));
        }

        let kernel = Kernel::new(config.clock());
        let policy = config.rank_policy.build(config.period);
        let arbiter = (workloads.len() > 1).then(|| Arbiter::new(workloads.len()));
        let sources = workloads
            .into_iter()
            .enumerate()
            .map(|(index, workload)| {
                PacketSender::new(index, workload, config.ingress_link_gbps)
                    .with_generator(config.generator)
            })
            .collect();
        let pifo = PifoModel::new(config.buf_size, config.num_queues)
            .with_max_entries(config.max_entries)
            .with_latency(config.write_latency, config.read_latency);

        Ok(Self {
            kernel,
            pipes: Pipes::new(),
            log: EventLog::new(),
            sources,
            arbiter,
            pifo,
            rank_pipe: RankPipe::new(policy),
            receiver: PacketReceiver::new(config.egress_link_gbps),
            started: false,
            timed_out: false,
            config,
        })
    }

    /// Run to completion (or the cycle limit) and summarize
    ///
    /// Calling `run` again returns the same report without simulating more.
    pub fn run(&mut self) -> Result<SimulationReport, SimulationError> {
        if !self.started {
            self.started = true;
            info!(
                rank_policy = self.rank_pipe.policy().name(),
                num_queues = self.config.num_queues,
                buf_size = ?self.config.buf_size,
                sources = self.sources.len(),
                "starting PIFO simulation"
            );
            for source in &self.sources {
                source.start(&mut self.kernel);
            }
            if let Some(arbiter) = &self.arbiter {
                arbiter.start(&mut self.kernel);
            }
            self.pifo.start(&mut self.kernel);
            self.rank_pipe.start(&mut self.kernel);
            self.receiver.start(&mut self.kernel);
            self.kernel.wake(Stage::Monitor);

            while let Some(stage) = self.kernel.advance() {
                self.dispatch(stage)?;
            }

            info!(
                final_cycle = self.kernel.now(),
                sent = self.sources.iter().map(|s| s.sent().len()).sum::<usize>(),
                received = self.receiver.received().len(),
                drops = self.pifo.drop_count(),
                timed_out = self.timed_out,
                "PIFO simulation finished"
            );
        }
        Ok(self.report())
    }

    fn dispatch(&mut self, stage: Stage) -> Result<(), SimulationError> {
        let Self {
            kernel,
            pipes,
            log,
            sources,
            arbiter,
            pifo,
            rank_pipe,
            receiver,
            ..
        } = self;
        match stage {
            Stage::Source(index) => {
                let Some(source) = sources.get_mut(index) else {
                    return Ok(());
                };
                match arbiter {
                    Some(arbiter) => {
                        if let Some((input, ack)) = arbiter.port_mut(index) {
                            source.step(kernel, input, ack, log)?;
                        }
                    }
                    None => source.step(kernel, &mut pipes.pifo_w_in, &mut pipes.pifo_w_out, log)?,
                }
            }
            Stage::Arbiter => {
                if let Some(arbiter) = arbiter {
                    arbiter.step(kernel, pipes)?;
                }
            }
            Stage::WriteIngest => pifo.step_write(kernel, pipes, log)?,
            Stage::RankCompute => rank_pipe.step(kernel, pipes, log)?,
            Stage::TokenRefill => rank_pipe.tick(kernel),
            Stage::RankIngest => pifo.step_rank_ingest(kernel, pipes, log)?,
            Stage::Read => pifo.step_read(kernel, pipes, log)?,
            Stage::Receiver => receiver.step(kernel, pipes, log)?,
            Stage::Stats => pifo.step_stats(kernel),
            Stage::Monitor => self.step_monitor(),
        }
        Ok(())
    }

    /// Raise the done flag once all traffic has drained, or at the cycle limit
    fn step_monitor(&mut self) {
        if self.kernel.is_done() {
            return;
        }
        let now = self.kernel.now();
        let senders_done = self.sources.iter().all(PacketSender::is_finished)
            && self.arbiter.as_ref().map_or(true, Arbiter::is_idle);
        if senders_done && self.pifo.is_drained() {
            debug!(cycle = now, "all packets drained");
            self.log.log(Event::Finished { cycle: now });
            self.kernel.finish();
        } else if now >= self.config.max_cycles {
            warn!(
                cycle = now,
                in_flight = self.pifo.in_flight(),
                stored = self.pifo.store().len(),
                "cycle limit reached before the PIFO drained"
            );
            self.timed_out = true;
            self.log.log(Event::Finished { cycle: now });
            self.kernel.finish();
        } else {
            self.kernel.wait_ticks(Stage::Monitor, 1);
        }
    }

    fn report(&self) -> SimulationReport {
        let mut sent: Vec<SentRecord> = self
            .sources
            .iter()
            .flat_map(|s| s.sent().iter().cloned())
            .collect();
        // Stable: same-cycle writes keep source order
        sent.sort_by_key(|r| r.cycle);
        SimulationReport {
            final_cycle: self.kernel.now(),
            timed_out: self.timed_out,
            rank_policy: self.rank_pipe.policy().name(),
            sent,
            received: self.receiver.received().to_vec(),
            drops: self.pifo.drop_count(),
            drops_per_queue: self.pifo.drops_per_queue().to_vec(),
            pushed_out: self.pifo.pushed_out(),
            occupancy: self.pifo.occupancy().clone(),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    pub fn pifo(&self) -> &PifoModel {
        &self.pifo
    }

    /// The arbiter, present when the run has several senders
    pub fn arbiter(&self) -> Option<&Arbiter> {
        self.arbiter.as_ref()
    }

    pub fn now(&self) -> Cycle {
        self.kernel.now()
    }
}
