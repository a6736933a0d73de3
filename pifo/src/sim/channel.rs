//! Bounded single-reader handoff channel between stages

use super::kernel::{Kernel, Stage};
use std::collections::VecDeque;
use thiserror::Error;

/// Channel protocol violations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("channel '{channel}' overflowed its capacity of {capacity}")]
    Overflow {
        channel: &'static str,
        capacity: usize,
    },
}

/// Bounded FIFO connecting one writer stage to one reader stage
///
/// A receive on an empty channel parks the reader; the next `put` wakes it
/// in the same cycle. All pipeline handshakes keep at most one value in
/// flight per channel, so a put into a full channel is a wiring error.
///
/// # Example
/// ```
/// use pifo_sim_core::sim::{Channel, Kernel, Stage};
/// use pifo_sim_core::Clock;
///
/// let mut kernel = Kernel::new(Clock::default());
/// let mut ch: Channel<u32> = Channel::new("req", 1);
///
/// assert_eq!(ch.get(Stage::Read), None); // Read parks on the channel
/// ch.put(7, &mut kernel).unwrap();       // ...and is woken by the put
///
/// assert_eq!(kernel.advance(), Some(Stage::Read));
/// assert_eq!(ch.get(Stage::Read), Some(7));
/// ```
#[derive(Debug)]
pub struct Channel<T> {
    name: &'static str,
    items: VecDeque<T>,
    capacity: usize,
    reader: Option<Stage>,
}

impl<T> Channel<T> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            items: VecDeque::with_capacity(capacity),
            capacity,
            reader: None,
        }
    }

    /// Hand a value to the reader, waking it if it is parked
    ///
    /// # Errors
    /// `ChannelError::Overflow` if the channel already holds `capacity`
    /// values.
    pub fn put(&mut self, item: T, kernel: &mut Kernel) -> Result<(), ChannelError> {
        if self.items.len() >= self.capacity {
            return Err(ChannelError::Overflow {
                channel: self.name,
                capacity: self.capacity,
            });
        }
        self.items.push_back(item);
        if let Some(reader) = self.reader.take() {
            kernel.wake(reader);
        }
        Ok(())
    }

    /// Take the oldest value, or park `reader` until one is put
    pub fn get(&mut self, reader: Stage) -> Option<T> {
        match self.items.pop_front() {
            Some(item) => Some(item),
            None => {
                debug_assert!(
                    self.reader.map_or(true, |r| r == reader),
                    "channel '{}' has a second reader",
                    self.name
                );
                self.reader = Some(reader);
                None
            }
        }
    }

    /// Take the oldest value without parking anyone when empty
    ///
    /// For readers that poll on their own clock instead of waiting for a
    /// value to arrive.
    pub fn try_get(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::Clock;

    #[test]
    fn test_put_without_parked_reader_does_not_wake() {
        let mut kernel = Kernel::new(Clock::default());
        let mut ch = Channel::new("ack", 1);
        ch.put((), &mut kernel).unwrap();
        assert_eq!(kernel.pending(), 0);
        assert_eq!(ch.get(Stage::Source(0)), Some(()));
    }

    #[test]
    fn test_try_get_never_parks() {
        let mut kernel = Kernel::new(Clock::default());
        let mut ch = Channel::new("poll", 1);
        assert_eq!(ch.try_get(), None);
        ch.put(4u8, &mut kernel).unwrap();
        assert_eq!(kernel.pending(), 0);
        assert_eq!(ch.try_get(), Some(4));
    }

    #[test]
    fn test_overflow_is_reported() {
        let mut kernel = Kernel::new(Clock::default());
        let mut ch = Channel::new("data", 1);
        ch.put(1u8, &mut kernel).unwrap();
        assert_eq!(
            ch.put(2u8, &mut kernel),
            Err(ChannelError::Overflow {
                channel: "data",
                capacity: 1
            })
        );
        assert_eq!(ch.len(), 1);
    }
}
