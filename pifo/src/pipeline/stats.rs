//! Per-tick queue occupancy samples

use crate::core::time::Cycle;
use crate::models::packet::QueueId;
use serde::Serialize;

/// Time series of buffered bytes per queue, one sample per clock tick
///
/// `times[i]` is the cycle of sample `i`; `sizes[q][i]` is the number of
/// bytes buffered in queue `q` at that cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueueOccupancy {
    times: Vec<Cycle>,
    sizes: Vec<Vec<usize>>,
}

impl QueueOccupancy {
    pub fn new(num_queues: usize) -> Self {
        Self {
            times: Vec::new(),
            sizes: vec![Vec::new(); num_queues],
        }
    }

    /// Append one sample; `queue_bytes` holds one value per queue
    pub fn record(&mut self, now: Cycle, queue_bytes: &[usize]) {
        debug_assert_eq!(queue_bytes.len(), self.sizes.len());
        self.times.push(now);
        for (series, bytes) in self.sizes.iter_mut().zip(queue_bytes) {
            series.push(*bytes);
        }
    }

    pub fn times(&self) -> &[Cycle] {
        &self.times
    }

    /// Samples for one queue
    pub fn queue(&self, queue_id: QueueId) -> Option<&[usize]> {
        self.sizes.get(queue_id).map(Vec::as_slice)
    }

    pub fn num_queues(&self) -> usize {
        self.sizes.len()
    }

    pub fn num_samples(&self) -> usize {
        self.times.len()
    }

    /// Largest sampled occupancy of a queue
    pub fn peak(&self, queue_id: QueueId) -> Option<usize> {
        self.queue(queue_id)?.iter().copied().max()
    }
}
