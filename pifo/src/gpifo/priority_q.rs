//! Stable priority queue
//!
//! A binary heap cannot be used here: it gives no guarantee about the order
//! of entries with equal rank, and GPIFO semantics require that ties dequeue
//! in arrival order. Entries are kept in a sorted vector instead; insertion
//! finds the upper bound of the new rank so equal ranks stay in insertion
//! order.

use super::GpifoError;

/// Ordered collection of `(rank, item)` pairs, ascending by rank
///
/// # Example
/// ```
/// use pifo_sim_core::PriorityQ;
///
/// let mut pq = PriorityQ::new();
/// pq.insert(5, "late");
/// pq.insert(1, "first");
/// pq.insert(5, "later");
///
/// assert_eq!(pq.remove_min().unwrap(), (1, "first"));
/// assert_eq!(pq.remove_min().unwrap(), (5, "late"));
/// assert_eq!(pq.remove_min().unwrap(), (5, "later"));
/// assert!(pq.remove_min().is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityQ<R, T> {
    entries: Vec<(R, T)>,
}

impl<R: Ord, T> PriorityQ<R, T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert keeping ascending order; placed after existing equal ranks
    pub fn insert(&mut self, rank: R, item: T) {
        let pos = self.upper_bound(&rank);
        self.entries.insert(pos, (rank, item));
    }

    /// Pop the entry with the smallest rank
    ///
    /// # Errors
    /// `GpifoError::Empty` if the queue holds nothing.
    pub fn remove_min(&mut self) -> Result<(R, T), GpifoError> {
        if self.entries.is_empty() {
            return Err(GpifoError::Empty {
                structure: "PriorityQ",
            });
        }
        Ok(self.entries.remove(0))
    }

    /// Borrow the entry with the smallest rank
    pub fn peek_min(&self) -> Option<(&R, &T)> {
        self.entries.first().map(|(rank, item)| (rank, item))
    }

    /// Put back an entry just taken with [`PriorityQ::remove_min`]
    ///
    /// The entry goes in front of every remaining one, so ties that were
    /// behind it stay behind it.
    pub(crate) fn restore_min(&mut self, rank: R, item: T) {
        debug_assert!(self.entries.first().map_or(true, |(r, _)| rank <= *r));
        self.entries.insert(0, (rank, item));
    }

    /// Mutable access to the rank stored at `index`
    ///
    /// Any change made through this reference must be followed by
    /// [`PriorityQ::resort`] before the next pop.
    pub fn rank_mut(&mut self, index: usize) -> Option<&mut R> {
        self.entries.get_mut(index).map(|(rank, _)| rank)
    }

    /// Re-establish ascending order after ranks were mutated in place
    ///
    /// The sort is stable: entries whose rank did not change keep their
    /// relative order, so unrelated ties are never disturbed.
    pub fn resort(&mut self) {
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
    }

    /// Overwrite the rank at `index` and relocate only that entry
    ///
    /// The entry lands after every other entry with the same rank, exactly
    /// as if it had just been inserted. Returns `false` if `index` is out of
    /// range.
    pub fn update_rank(&mut self, index: usize, rank: R) -> bool {
        if index >= self.entries.len() {
            return false;
        }
        let (_, item) = self.entries.remove(index);
        self.insert(rank, item);
        true
    }

    /// Index of the first entry whose item matches `pred`
    pub fn position(&self, mut pred: impl FnMut(&T) -> bool) -> Option<usize> {
        self.entries.iter().position(|(_, item)| pred(item))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in dequeue order
    pub fn iter(&self) -> impl Iterator<Item = (&R, &T)> {
        self.entries.iter().map(|(rank, item)| (rank, item))
    }

    fn upper_bound(&self, rank: &R) -> usize {
        self.entries.partition_point(|(r, _)| r <= rank)
    }
}

impl<R: Ord, T> Default for PriorityQ<R, T> {
    fn default() -> Self {
        Self::new()
    }
}
