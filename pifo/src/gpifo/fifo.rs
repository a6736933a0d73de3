//! Per-group FIFO queue

use super::GpifoError;
use std::collections::VecDeque;
use std::fmt;

/// Ordered queue of elements sharing one group id
///
/// # Example
/// ```
/// use pifo_sim_core::Fifo;
///
/// let mut fifo = Fifo::new(7u64);
/// fifo.push('a');
/// fifo.push('b');
/// assert_eq!(fifo.pop().unwrap(), 'a');
/// assert_eq!(fifo.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Fifo<T, G = u64> {
    id: G,
    items: VecDeque<T>,
}

impl<T, G> Fifo<T, G> {
    /// Create an empty FIFO for group `id`
    pub fn new(id: G) -> Self {
        Self {
            id,
            items: VecDeque::new(),
        }
    }

    /// Group id this FIFO belongs to
    pub fn id(&self) -> &G {
        &self.id
    }

    pub fn push(&mut self, item: T) {
        self.items.push_back(item);
    }

    /// Remove the oldest element
    ///
    /// # Errors
    /// `GpifoError::Empty` if the FIFO holds nothing.
    pub fn pop(&mut self) -> Result<T, GpifoError> {
        self.items
            .pop_front()
            .ok_or(GpifoError::Empty { structure: "FIFO" })
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

/// Renders as `[a, b] - ID: 7`
impl<T: fmt::Display, G: fmt::Display> fmt::Display for Fifo<T, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{item}")?;
        }
        write!(f, "] - ID: {}", self.id)
    }
}
