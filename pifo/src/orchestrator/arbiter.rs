//! Round-robin merge of several senders into the single write port
//!
//! Each sender gets its own input port: a data channel the arbiter polls
//! and an acknowledgement channel the sender waits on. Once per tick the
//! arbiter looks at the next port in turn. A waiting packet is acknowledged
//! straight away, written into the PIFO, and the arbiter holds until the
//! write completes. An empty port just costs the tick.

use crate::models::packet::{Packet, QueueId};
use crate::pipeline::Pipes;
use crate::sim::{Channel, ChannelError, Kernel, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArbiterPhase {
    Poll,
    AwaitWrite,
}

/// Write-port arbiter for multi-source runs
///
/// # Example
/// ```
/// use pifo_sim_core::orchestrator::Arbiter;
///
/// let arbiter = Arbiter::new(3);
/// assert_eq!(arbiter.num_inputs(), 3);
/// assert!(arbiter.is_idle());
/// ```
#[derive(Debug)]
pub struct Arbiter {
    inputs: Vec<Channel<(QueueId, Packet)>>,
    acks: Vec<Channel<()>>,
    /// Port examined at the next poll
    next: usize,
    phase: ArbiterPhase,
    /// Packets forwarded per input
    forwarded: Vec<u64>,
}

impl Arbiter {
    /// Create an arbiter with `num_inputs` ports (at least one)
    pub fn new(num_inputs: usize) -> Self {
        let num_inputs = num_inputs.max(1);
        Self {
            inputs: (0..num_inputs)
                .map(|_| Channel::new("arbiter_in", 1))
                .collect(),
            acks: (0..num_inputs)
                .map(|_| Channel::new("arbiter_ack", 1))
                .collect(),
            next: 0,
            phase: ArbiterPhase::Poll,
            forwarded: vec![0; num_inputs],
        }
    }

    pub fn start(&self, kernel: &mut Kernel) {
        kernel.wake(Stage::Arbiter);
    }

    /// Data and acknowledgement channels of one input port
    pub fn port_mut(
        &mut self,
        index: usize,
    ) -> Option<(&mut Channel<(QueueId, Packet)>, &mut Channel<()>)> {
        let input = self.inputs.get_mut(index)?;
        let ack = self.acks.get_mut(index)?;
        Some((input, ack))
    }

    /// Resume the arbiter until it waits for a tick or a write completion
    pub fn step(&mut self, kernel: &mut Kernel, pipes: &mut Pipes) -> Result<(), ChannelError> {
        if kernel.is_done() {
            return Ok(());
        }
        match self.phase {
            ArbiterPhase::Poll => {
                let index = self.next;
                if let Some(item) = self.inputs[index].try_get() {
                    self.acks[index].put((), kernel)?;
                    self.forwarded[index] += 1;
                    pipes.pifo_w_in.put(item, kernel)?;
                    self.phase = ArbiterPhase::AwaitWrite;
                    return self.step(kernel, pipes);
                }
            }
            ArbiterPhase::AwaitWrite => {
                if pipes.pifo_w_out.get(Stage::Arbiter).is_none() {
                    return Ok(());
                }
                self.phase = ArbiterPhase::Poll;
            }
        }
        self.next = (self.next + 1) % self.inputs.len();
        kernel.wait_ticks(Stage::Arbiter, 1);
        Ok(())
    }

    /// No packet held and none waiting at any port
    pub fn is_idle(&self) -> bool {
        self.phase == ArbiterPhase::Poll && self.inputs.iter().all(Channel::is_empty)
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Packets forwarded from each input
    pub fn forwarded(&self) -> &[u64] {
        &self.forwarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::Clock;

    fn offer(arbiter: &mut Arbiter, kernel: &mut Kernel, index: usize, id: u64) {
        let (input, _) = arbiter.port_mut(index).unwrap();
        input.put((0, Packet::new(id, 1, 64)), kernel).unwrap();
    }

    #[test]
    fn test_polls_one_port_per_tick() {
        let mut kernel = Kernel::new(Clock::default());
        let mut pipes = Pipes::new();
        let mut arbiter = Arbiter::new(2);

        // Only port 1 has data; port 0 is polled first
        offer(&mut arbiter, &mut kernel, 1, 7);
        arbiter.step(&mut kernel, &mut pipes).unwrap();
        assert!(pipes.pifo_w_in.is_empty());
        assert_eq!(kernel.advance(), Some(Stage::Arbiter));
        assert_eq!(kernel.now(), 1);

        arbiter.step(&mut kernel, &mut pipes).unwrap();
        assert_eq!(pipes.pifo_w_in.get(Stage::WriteIngest).map(|(_, p)| p.id()), Some(7));
        assert_eq!(arbiter.port_mut(1).map(|(_, ack)| ack.len()), Some(1));
        assert!(!arbiter.is_idle());

        // Completion releases the arbiter for the next tick
        pipes.pifo_w_out.put((), &mut kernel).unwrap();
        assert_eq!(kernel.advance(), Some(Stage::Arbiter));
        arbiter.step(&mut kernel, &mut pipes).unwrap();
        assert!(arbiter.is_idle());
        assert_eq!(kernel.peek_time(), Some(2));
        assert_eq!(arbiter.forwarded(), &[0, 1]);
    }

    #[test]
    fn test_stops_polling_once_done() {
        let mut kernel = Kernel::new(Clock::default());
        let mut pipes = Pipes::new();
        let mut arbiter = Arbiter::new(3);
        kernel.finish();
        arbiter.step(&mut kernel, &mut pipes).unwrap();
        assert_eq!(kernel.pending(), 0);
    }
}
