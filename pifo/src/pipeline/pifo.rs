//! PIFO hardware model: admission, store insertion, reads and statistics
//!
//! # Stages
//!
//! - **WriteIngest**: remaps unknown queue ids to queue 0, admits a packet
//!   iff `queue_bytes + len < budget`, forwards admitted packets to the rank
//!   pipe and waits for its acknowledgement. Drops are counted and complete
//!   the write immediately, so a full queue never blocks the writer.
//! - **RankIngest**: inserts ranked packets into the [`PifoStore`] after the
//!   write latency and acknowledges them. With a capacity, an insert that
//!   overfills the store pushes out the highest-ranked entry, which may be
//!   the packet just written.
//! - **Read**: serves one request at a time, starting the read latency after
//!   the request arrives. An empty store (or one whose entries are not yet
//!   due) is retried on the next tick.
//! - **Stats**: samples every queue's buffered bytes once per tick.
//!
//! Latencies are whole ticks and default to zero.

use super::stats::QueueOccupancy;
use super::store::PifoStore;
use super::{Pipes, RankedPacket};
use crate::core::time::Cycle;
use crate::models::event::{Event, EventLog};
use crate::models::packet::QueueId;
use crate::sim::{ChannelError, Kernel, Stage};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WritePhase {
    AwaitWrite,
    AwaitRankAck,
}

#[derive(Debug, Clone, PartialEq)]
enum IngestPhase {
    AwaitRanked,
    Writing(RankedPacket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadPhase {
    AwaitRequest,
    Polling,
}

/// Buffer-partitioned PIFO with a pluggable rank pipe in front of it
#[derive(Debug)]
pub struct PifoModel {
    store: PifoStore,
    /// Bytes buffered per queue (admitted and not yet read)
    queue_bytes: Vec<usize>,
    /// Per-queue byte budget; `None` means unlimited
    queue_budget: Option<f64>,
    /// Store capacity in packets; `None` means unlimited
    max_entries: Option<usize>,
    /// Ticks between receiving a ranked packet and storing it
    write_latency: u64,
    /// Ticks between receiving a read request and serving it
    read_latency: u64,
    /// Admission drops plus push-out evictions
    drops: u64,
    drops_per_queue: Vec<u64>,
    pushed_out: u64,
    admitted: u64,
    /// Admitted packets not yet inserted into the store
    in_flight: usize,
    occupancy: QueueOccupancy,
    write_phase: WritePhase,
    ingest_phase: IngestPhase,
    read_phase: ReadPhase,
}

impl PifoModel {
    /// Create a model whose buffer of `buf_size` bytes is split evenly
    /// across `num_queues` queues
    ///
    /// # Example
    /// ```
    /// use pifo_sim_core::PifoModel;
    ///
    /// let pifo = PifoModel::new(Some(3000), 2);
    /// assert!(pifo.admits(0, 1499));
    /// assert!(!pifo.admits(0, 1500));
    /// assert!(PifoModel::new(None, 1).admits(0, usize::MAX / 2));
    /// ```
    pub fn new(buf_size: Option<usize>, num_queues: usize) -> Self {
        let num_queues = num_queues.max(1);
        Self {
            store: PifoStore::new(),
            queue_bytes: vec![0; num_queues],
            queue_budget: buf_size.map(|b| b as f64 / num_queues as f64),
            max_entries: None,
            write_latency: 0,
            read_latency: 0,
            drops: 0,
            drops_per_queue: vec![0; num_queues],
            pushed_out: 0,
            admitted: 0,
            in_flight: 0,
            occupancy: QueueOccupancy::new(num_queues),
            write_phase: WritePhase::AwaitWrite,
            ingest_phase: IngestPhase::AwaitRanked,
            read_phase: ReadPhase::AwaitRequest,
        }
    }

    /// Bound the store to `max_entries` packets, evicting by rank on overflow
    ///
    /// # Example
    /// ```
    /// use pifo_sim_core::PifoModel;
    ///
    /// let pifo = PifoModel::new(None, 1).with_max_entries(Some(64)).with_latency(1, 2);
    /// assert_eq!(pifo.max_entries(), Some(64));
    /// assert_eq!(pifo.latency(), (1, 2));
    /// ```
    pub fn with_max_entries(mut self, max_entries: Option<usize>) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Set the write and read latencies, in ticks
    pub fn with_latency(mut self, write_latency: u64, read_latency: u64) -> Self {
        self.write_latency = write_latency;
        self.read_latency = read_latency;
        self
    }

    /// Register all PIFO stages with the kernel
    pub fn start(&self, kernel: &mut Kernel) {
        kernel.wake(Stage::WriteIngest);
        kernel.wake(Stage::RankIngest);
        kernel.wake(Stage::Read);
        kernel.wake(Stage::Stats);
    }

    /// Whether a packet of `len` bytes fits in queue `queue_id` right now
    pub fn admits(&self, queue_id: QueueId, len: usize) -> bool {
        match self.queue_budget {
            None => true,
            Some(budget) => {
                let buffered = self.queue_bytes.get(queue_id).copied().unwrap_or(0);
                ((buffered + len) as f64) < budget
            }
        }
    }

    /// Map a queue id onto an existing queue
    fn resolve_queue(&self, queue_id: QueueId) -> QueueId {
        if queue_id < self.queue_bytes.len() {
            queue_id
        } else {
            trace!(queue_id, "unknown queue id remapped to queue 0");
            0
        }
    }

    /// Resume buffer admission until it parks on a channel
    pub fn step_write(
        &mut self,
        kernel: &mut Kernel,
        pipes: &mut Pipes,
        log: &mut EventLog,
    ) -> Result<(), ChannelError> {
        if kernel.is_done() {
            return Ok(());
        }
        loop {
            match self.write_phase {
                WritePhase::AwaitWrite => {
                    let Some((queue_id, packet)) = pipes.pifo_w_in.get(Stage::WriteIngest) else {
                        return Ok(());
                    };
                    let queue_id = self.resolve_queue(queue_id);
                    let len = packet.len();
                    let now = kernel.now();

                    if self.admits(queue_id, len) {
                        self.queue_bytes[queue_id] += len;
                        self.admitted += 1;
                        self.in_flight += 1;
                        log.log(Event::Admitted {
                            cycle: now,
                            packet_id: packet.id(),
                            queue_id,
                            len,
                        });
                        pipes.rank_w_in.put((queue_id, packet), kernel)?;
                        self.write_phase = WritePhase::AwaitRankAck;
                    } else {
                        self.drops += 1;
                        self.drops_per_queue[queue_id] += 1;
                        debug!(
                            packet_id = packet.id(),
                            queue_id,
                            len,
                            queue_bytes = self.queue_bytes[queue_id],
                            "queue full, packet dropped"
                        );
                        log.log(Event::Dropped {
                            cycle: now,
                            packet_id: packet.id(),
                            queue_id,
                            len,
                            queue_bytes: self.queue_bytes[queue_id],
                        });
                        pipes.pifo_w_out.put((), kernel)?;
                    }
                }
                WritePhase::AwaitRankAck => {
                    if pipes.rank_w_out.get(Stage::WriteIngest).is_none() {
                        return Ok(());
                    }
                    pipes.pifo_w_out.put((), kernel)?;
                    self.write_phase = WritePhase::AwaitWrite;
                }
            }
        }
    }

    /// Resume store insertion until the rank pipe has nothing to hand over
    pub fn step_rank_ingest(
        &mut self,
        kernel: &mut Kernel,
        pipes: &mut Pipes,
        log: &mut EventLog,
    ) -> Result<(), ChannelError> {
        if kernel.is_done() {
            return Ok(());
        }
        loop {
            match std::mem::replace(&mut self.ingest_phase, IngestPhase::AwaitRanked) {
                IngestPhase::AwaitRanked => {
                    let Some(ranked) = pipes.rank_r_out.get(Stage::RankIngest) else {
                        return Ok(());
                    };
                    self.ingest_phase = IngestPhase::Writing(ranked);
                    if self.write_latency > 0 {
                        kernel.wait_ticks(Stage::RankIngest, self.write_latency);
                        return Ok(());
                    }
                }
                IngestPhase::Writing(ranked) => {
                    self.insert(ranked, kernel.now(), log);
                    pipes.rank_r_in.put((), kernel)?;
                }
            }
        }
    }

    fn insert(&mut self, ranked: RankedPacket, now: Cycle, log: &mut EventLog) {
        self.store
            .push(ranked.rank, ranked.send_time, ranked.queue_id, ranked.packet);
        self.in_flight = self.in_flight.saturating_sub(1);

        let Some(max_entries) = self.max_entries else {
            return;
        };
        if self.store.len() <= max_entries {
            return;
        }
        let Some(victim) = self.store.evict_max() else {
            return;
        };
        let bytes = &mut self.queue_bytes[victim.queue_id];
        *bytes = bytes.saturating_sub(victim.packet.len());
        self.drops += 1;
        self.drops_per_queue[victim.queue_id] += 1;
        self.pushed_out += 1;
        debug!(
            packet_id = victim.packet.id(),
            queue_id = victim.queue_id,
            rank = victim.rank,
            "store full, highest rank pushed out"
        );
        log.log(Event::PushedOut {
            cycle: now,
            packet_id: victim.packet.id(),
            queue_id: victim.queue_id,
            rank: victim.rank,
        });
    }

    /// Resume the read port until it parks on a request or a tick
    pub fn step_read(
        &mut self,
        kernel: &mut Kernel,
        pipes: &mut Pipes,
        log: &mut EventLog,
    ) -> Result<(), ChannelError> {
        if kernel.is_done() {
            return Ok(());
        }
        loop {
            match self.read_phase {
                ReadPhase::AwaitRequest => {
                    if pipes.pifo_r_in.get(Stage::Read).is_none() {
                        return Ok(());
                    }
                    self.read_phase = ReadPhase::Polling;
                    if self.read_latency > 0 {
                        kernel.wait_ticks(Stage::Read, self.read_latency);
                        return Ok(());
                    }
                }
                ReadPhase::Polling => {
                    let now = kernel.now();
                    let Some(entry) = self.store.pop(now) else {
                        kernel.wait_ticks(Stage::Read, 1);
                        return Ok(());
                    };
                    let bytes = &mut self.queue_bytes[entry.queue_id];
                    *bytes = bytes.saturating_sub(entry.packet.len());
                    log.log(Event::Dequeued {
                        cycle: now,
                        packet_id: entry.packet.id(),
                        queue_id: entry.queue_id,
                        rank: entry.rank,
                    });
                    pipes.pifo_r_out.put((entry.rank, entry.packet), kernel)?;
                    self.read_phase = ReadPhase::AwaitRequest;
                }
            }
        }
    }

    /// Take one occupancy sample and wait for the next tick
    pub fn step_stats(&mut self, kernel: &mut Kernel) {
        if kernel.is_done() {
            return;
        }
        self.occupancy.record(kernel.now(), &self.queue_bytes);
        kernel.wait_ticks(Stage::Stats, 1);
    }

    pub fn store(&self) -> &PifoStore {
        &self.store
    }

    pub fn num_queues(&self) -> usize {
        self.queue_bytes.len()
    }

    /// Per-queue byte budget, if the buffer is bounded
    pub fn queue_budget(&self) -> Option<f64> {
        self.queue_budget
    }

    /// Bytes currently buffered in a queue
    pub fn queue_bytes(&self, queue_id: QueueId) -> usize {
        self.queue_bytes.get(queue_id).copied().unwrap_or(0)
    }

    /// Total packets lost, at admission or pushed out of a full store
    pub fn drop_count(&self) -> u64 {
        self.drops
    }

    /// Packets evicted from a full store
    pub fn pushed_out(&self) -> u64 {
        self.pushed_out
    }

    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    /// (write, read) latency in ticks
    pub fn latency(&self) -> (u64, u64) {
        (self.write_latency, self.read_latency)
    }

    pub fn drops_per_queue(&self) -> &[u64] {
        &self.drops_per_queue
    }

    pub fn admitted(&self) -> u64 {
        self.admitted
    }

    /// Packets between admission and the store
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Nothing buffered anywhere in the model
    pub fn is_drained(&self) -> bool {
        self.in_flight == 0 && self.store.is_empty()
    }

    pub fn occupancy(&self) -> &QueueOccupancy {
        &self.occupancy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::Clock;
    use crate::models::packet::Packet;

    fn setup(buf_size: Option<usize>, num_queues: usize) -> (Kernel, Pipes, EventLog, PifoModel) {
        (
            Kernel::new(Clock::default()),
            Pipes::new(),
            EventLog::new(),
            PifoModel::new(buf_size, num_queues),
        )
    }

    #[test]
    fn test_full_queue_drops_and_completes_write() {
        let (mut kernel, mut pipes, mut log, mut pifo) = setup(Some(200), 2);

        pipes.pifo_w_in.put((1, Packet::new(0, 1, 60)), &mut kernel).unwrap();
        pifo.step_write(&mut kernel, &mut pipes, &mut log).unwrap();
        assert_eq!(pifo.queue_bytes(1), 60);
        assert!(pipes.pifo_w_out.is_empty());

        pipes.rank_w_in.get(Stage::RankCompute);
        pipes.rank_w_out.put((), &mut kernel).unwrap();
        pifo.step_write(&mut kernel, &mut pipes, &mut log).unwrap();
        assert_eq!(pipes.pifo_w_out.get(Stage::Source(0)), Some(()));

        // 60 + 40 is not below the budget of 100
        pipes.pifo_w_in.put((1, Packet::new(1, 1, 40)), &mut kernel).unwrap();
        pifo.step_write(&mut kernel, &mut pipes, &mut log).unwrap();
        assert_eq!(pifo.drop_count(), 1);
        assert_eq!(pifo.drops_per_queue(), &[0, 1]);
        assert_eq!(pipes.pifo_w_out.get(Stage::Source(0)), Some(()));
        assert!(pipes.rank_w_in.is_empty());

        // Queue 0 is unaffected
        pipes.pifo_w_in.put((0, Packet::new(2, 1, 90)), &mut kernel).unwrap();
        pifo.step_write(&mut kernel, &mut pipes, &mut log).unwrap();
        assert_eq!(pifo.queue_bytes(0), 90);
        assert_eq!(log.events_of_type("Dropped").len(), 1);
        assert_eq!(log.events_of_type("Admitted").len(), 2);
    }

    #[test]
    fn test_unknown_queue_id_is_remapped() {
        let (mut kernel, mut pipes, mut log, mut pifo) = setup(None, 2);
        pipes.pifo_w_in.put((7, Packet::new(0, 1, 64)), &mut kernel).unwrap();
        pifo.step_write(&mut kernel, &mut pipes, &mut log).unwrap();
        assert_eq!(pifo.queue_bytes(0), 64);
        assert_eq!(pipes.rank_w_in.get(Stage::RankCompute).map(|(q, _)| q), Some(0));
    }

    #[test]
    fn test_read_retries_on_empty_store_then_frees_bytes() {
        let (mut kernel, mut pipes, mut log, mut pifo) = setup(None, 1);
        pifo.queue_bytes[0] = 64;
        pifo.in_flight = 1;

        pipes.pifo_r_in.put((), &mut kernel).unwrap();
        pifo.step_read(&mut kernel, &mut pipes, &mut log).unwrap();
        assert!(pipes.pifo_r_out.is_empty());
        assert_eq!(kernel.peek_time(), Some(1));

        pipes
            .rank_r_out
            .put(
                RankedPacket {
                    rank: 3,
                    send_time: None,
                    queue_id: 0,
                    packet: Packet::new(5, 3, 64),
                },
                &mut kernel,
            )
            .unwrap();
        pifo.step_rank_ingest(&mut kernel, &mut pipes, &mut log).unwrap();
        assert_eq!(pifo.in_flight(), 0);
        assert_eq!(pipes.rank_r_in.len(), 1);

        assert_eq!(kernel.advance(), Some(Stage::Read));
        pifo.step_read(&mut kernel, &mut pipes, &mut log).unwrap();
        let (rank, packet) = pipes.pifo_r_out.get(Stage::Receiver).unwrap();
        assert_eq!((rank, packet.id()), (3, 5));
        assert_eq!(pifo.queue_bytes(0), 0);
        assert!(pifo.is_drained());
    }

    #[test]
    fn test_stats_samples_every_tick_until_done() {
        let (mut kernel, _, _, mut pifo) = setup(None, 3);
        pifo.step_stats(&mut kernel);
        kernel.advance();
        pifo.step_stats(&mut kernel);
        kernel.finish();
        kernel.advance();
        pifo.step_stats(&mut kernel);

        assert_eq!(pifo.occupancy().times(), &[0, 1]);
        assert_eq!(pifo.occupancy().num_queues(), 3);
        assert_eq!(kernel.pending(), 0);
    }

    fn ranked(id: u64, rank: u64, queue_id: QueueId) -> RankedPacket {
        RankedPacket {
            rank,
            send_time: None,
            queue_id,
            packet: Packet::new(id, rank, 100),
        }
    }

    /// Hand one ranked packet to rank ingest as if it had just been admitted
    fn write_ranked(
        pifo: &mut PifoModel,
        kernel: &mut Kernel,
        pipes: &mut Pipes,
        log: &mut EventLog,
        packet: RankedPacket,
    ) {
        pifo.queue_bytes[packet.queue_id] += packet.packet.len();
        pifo.in_flight += 1;
        pipes.rank_r_out.put(packet, kernel).unwrap();
        pifo.step_rank_ingest(kernel, pipes, log).unwrap();
        assert_eq!(pipes.rank_r_in.get(Stage::RankCompute), Some(()));
    }

    #[test]
    fn test_push_out_evicts_highest_rank_and_counts_drop() {
        let (mut kernel, mut pipes, mut log, pifo) = setup(None, 2);
        let mut pifo = pifo.with_max_entries(Some(2));

        write_ranked(&mut pifo, &mut kernel, &mut pipes, &mut log, ranked(0, 5, 0));
        write_ranked(&mut pifo, &mut kernel, &mut pipes, &mut log, ranked(1, 1, 1));
        assert_eq!(pifo.drop_count(), 0);

        // The newcomer carries the worst rank and is evicted itself
        write_ranked(&mut pifo, &mut kernel, &mut pipes, &mut log, ranked(2, 9, 1));
        assert_eq!(pifo.pushed_out(), 1);
        assert_eq!(pifo.queue_bytes(1), 100);

        // A better newcomer pushes out the stored rank 5
        write_ranked(&mut pifo, &mut kernel, &mut pipes, &mut log, ranked(3, 3, 1));
        assert_eq!(pifo.pushed_out(), 2);
        assert_eq!(pifo.drop_count(), 2);
        assert_eq!(pifo.drops_per_queue(), &[1, 1]);
        assert_eq!(pifo.queue_bytes(0), 0);
        assert_eq!(pifo.queue_bytes(1), 200);
        assert_eq!(pifo.store().len(), 2);
        assert_eq!(pifo.in_flight(), 0);

        let evicted: Vec<u64> = log
            .events_of_type("PushedOut")
            .iter()
            .filter_map(|e| e.packet_id())
            .collect();
        assert_eq!(evicted, vec![2, 0]);
    }

    #[test]
    fn test_write_latency_delays_insertion() {
        let (mut kernel, mut pipes, mut log, pifo) = setup(None, 1);
        let mut pifo = pifo.with_latency(3, 0);
        pifo.in_flight = 1;

        pipes.rank_r_out.put(ranked(0, 4, 0), &mut kernel).unwrap();
        pifo.step_rank_ingest(&mut kernel, &mut pipes, &mut log).unwrap();
        assert!(pifo.store().is_empty());
        assert!(pipes.rank_r_in.is_empty());
        assert!(!pifo.is_drained());

        assert_eq!(kernel.advance(), Some(Stage::RankIngest));
        assert_eq!(kernel.now(), 3);
        pifo.step_rank_ingest(&mut kernel, &mut pipes, &mut log).unwrap();
        assert_eq!(pifo.store().len(), 1);
        assert_eq!(pipes.rank_r_in.len(), 1);
    }

    #[test]
    fn test_read_latency_delays_first_read() {
        let (mut kernel, mut pipes, mut log, pifo) = setup(None, 1);
        let mut pifo = pifo.with_latency(0, 2);
        write_ranked(&mut pifo, &mut kernel, &mut pipes, &mut log, ranked(0, 4, 0));

        pipes.pifo_r_in.put((), &mut kernel).unwrap();
        pifo.step_read(&mut kernel, &mut pipes, &mut log).unwrap();
        assert!(pipes.pifo_r_out.is_empty());

        assert_eq!(kernel.advance(), Some(Stage::Read));
        assert_eq!(kernel.now(), 2);
        pifo.step_read(&mut kernel, &mut pipes, &mut log).unwrap();
        assert_eq!(pipes.pifo_r_out.get(Stage::Receiver).map(|(r, _)| r), Some(4));
    }
}
