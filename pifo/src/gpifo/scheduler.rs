//! Single-level group scheduler (GPIFO)
//!
//! # Behavior
//!
//! - No group id: the element is scheduled on its own at `rank`
//! - Unseen group id: a FIFO is allocated, registered in the group table and
//!   scheduled at `rank`
//! - Known group id: the element joins the group's FIFO and the group's rank
//!   is overwritten with `rank` (last write wins)
//!
//! Removing a group entry pops only the FIFO head; the group stays scheduled
//! at its current rank until the FIFO drains, at which point the group table
//! entry is dropped and a later insert with the same id starts fresh.

use super::{Fifo, GpifoError, PriorityQ};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Target of a PriorityQ entry: one element or a whole group
#[derive(Debug, Clone, PartialEq)]
enum Scheduled<T, G> {
    Element(T),
    Group(G),
}

/// Group table entry: the group's current rank and its FIFO
#[derive(Debug, Clone)]
struct GroupEntry<T, R, G> {
    rank: R,
    fifo: Fifo<T, G>,
}

/// Group-based PIFO
///
/// # Example
/// ```
/// use pifo_sim_core::Gpifo;
///
/// let mut gpifo = Gpifo::new();
/// gpifo.insert('a', 5, None);
/// gpifo.insert('b', 2, Some(1));
/// gpifo.insert('c', 2, Some(1));
///
/// assert_eq!(gpifo.remove().unwrap(), 'b');
/// assert_eq!(gpifo.remove().unwrap(), 'c');
/// assert_eq!(gpifo.remove().unwrap(), 'a');
/// ```
#[derive(Debug, Clone)]
pub struct Gpifo<T, R = u64, G = u64> {
    /// Scheduled keys: individual elements and active groups
    items: PriorityQ<R, Scheduled<T, G>>,

    /// GroupID → (rank, FIFO); present iff the FIFO is non-empty
    groups: HashMap<G, GroupEntry<T, R, G>>,

    /// Total number of elements held, grouped or not
    len: usize,
}

impl<T, R, G> Gpifo<T, R, G>
where
    R: Ord + Clone,
    G: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            items: PriorityQ::new(),
            groups: HashMap::new(),
            len: 0,
        }
    }

    /// Insert an element
    ///
    /// # Arguments
    /// * `elem` - Element to schedule
    /// * `rank` - Scheduling rank (lower dequeues first)
    /// * `group` - `None` to schedule `elem` individually, otherwise the
    ///   group whose FIFO receives it
    pub fn insert(&mut self, elem: T, rank: R, group: Option<G>) {
        self.len += 1;

        let Some(group_id) = group else {
            self.items.insert(rank, Scheduled::Element(elem));
            return;
        };

        match self.groups.get_mut(&group_id) {
            Some(entry) => {
                entry.fifo.push(elem);
                entry.rank = rank.clone();
                if let Some(index) = self
                    .items
                    .position(|item| matches!(item, Scheduled::Group(g) if *g == group_id))
                {
                    self.items.update_rank(index, rank);
                }
            }
            None => {
                let mut fifo = Fifo::new(group_id.clone());
                fifo.push(elem);
                self.groups.insert(
                    group_id.clone(),
                    GroupEntry {
                        rank: rank.clone(),
                        fifo,
                    },
                );
                self.items.insert(rank, Scheduled::Group(group_id));
            }
        }
    }

    /// Remove the head element (smallest rank)
    ///
    /// # Errors
    /// `GpifoError::Empty` if nothing is scheduled.
    pub fn remove(&mut self) -> Result<T, GpifoError> {
        let Ok((rank, target)) = self.items.remove_min() else {
            return Err(GpifoError::Empty { structure: "GPIFO" });
        };

        let head = match target {
            Scheduled::Element(elem) => elem,
            Scheduled::Group(group_id) => {
                let entry = self
                    .groups
                    .get_mut(&group_id)
                    .ok_or(GpifoError::Empty { structure: "FIFO" })?;
                let head = entry.fifo.pop()?;
                if entry.fifo.is_empty() {
                    self.groups.remove(&group_id);
                } else {
                    // The group keeps its place at the head
                    self.items.restore_min(rank, Scheduled::Group(group_id));
                }
                head
            }
        };

        self.len -= 1;
        Ok(head)
    }

    /// Rank of the next entry to be removed
    pub fn peek_rank(&self) -> Option<&R> {
        self.items.peek_min().map(|(rank, _)| rank)
    }

    /// Current rank of an active group
    pub fn group_rank(&self, group: &G) -> Option<&R> {
        self.groups.get(group).map(|entry| &entry.rank)
    }

    /// Elements waiting in an active group's FIFO
    pub fn group_len(&self, group: &G) -> usize {
        self.groups.get(group).map_or(0, |entry| entry.fifo.len())
    }

    /// Number of active groups
    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// Number of PriorityQ entries (individual elements + active groups)
    pub fn num_scheduled(&self) -> usize {
        self.items.len()
    }

    /// Total number of elements held
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T, R, G> Default for Gpifo<T, R, G>
where
    R: Ord + Clone,
    G: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// One `rank : entry` line per scheduled entry, in dequeue order
///
/// A group entry prints its whole FIFO, e.g. `2 : [b, c] - ID: 1`.
impl<T, R, G> fmt::Display for Gpifo<T, R, G>
where
    T: fmt::Display,
    R: fmt::Display + Ord,
    G: fmt::Display + Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (rank, target) in self.items.iter() {
            match target {
                Scheduled::Element(elem) => writeln!(f, "{rank} : {elem}")?,
                Scheduled::Group(group_id) => match self.groups.get(group_id) {
                    Some(entry) => writeln!(f, "{rank} : {}", entry.fifo)?,
                    None => writeln!(f, "{rank} : [] - ID: {group_id}")?,
                },
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_empty_gpifo_fails() {
        let mut gpifo: Gpifo<char> = Gpifo::new();
        assert_eq!(
            gpifo.remove(),
            Err(GpifoError::Empty { structure: "GPIFO" })
        );
    }

    #[test]
    fn test_group_rank_tracks_last_insert() {
        let mut gpifo: Gpifo<char> = Gpifo::new();
        gpifo.insert('a', 3, Some(9));
        assert_eq!(gpifo.group_rank(&9), Some(&3));
        gpifo.insert('b', 8, Some(9));
        assert_eq!(gpifo.group_rank(&9), Some(&8));
        gpifo.insert('c', 1, Some(9));
        assert_eq!(gpifo.group_rank(&9), Some(&1));
        assert_eq!(gpifo.num_scheduled(), 1);
        assert_eq!(gpifo.group_len(&9), 3);
    }

    #[test]
    fn test_group_entry_dropped_when_drained() {
        let mut gpifo: Gpifo<char> = Gpifo::new();
        gpifo.insert('a', 1, Some(2));
        gpifo.insert('b', 1, Some(2));
        assert_eq!(gpifo.remove().unwrap(), 'a');
        assert_eq!(gpifo.num_groups(), 1);
        assert_eq!(gpifo.remove().unwrap(), 'b');
        assert_eq!(gpifo.num_groups(), 0);
        assert_eq!(gpifo.group_rank(&2), None);
        assert!(gpifo.is_empty());
    }

    #[test]
    fn test_rank_overwrite_reorders_group_against_elements() {
        let mut gpifo: Gpifo<char> = Gpifo::new();
        gpifo.insert('g', 1, Some(4));
        gpifo.insert('x', 5, None);
        // Group moves behind 'x' once its newest member carries rank 7.
        gpifo.insert('h', 7, Some(4));
        assert_eq!(gpifo.remove().unwrap(), 'x');
        assert_eq!(gpifo.remove().unwrap(), 'g');
        assert_eq!(gpifo.remove().unwrap(), 'h');
    }

    #[test]
    fn test_partial_group_drain_keeps_head_position() {
        let mut gpifo: Gpifo<char> = Gpifo::new();
        gpifo.insert('a', 2, Some(1));
        gpifo.insert('x', 2, None);
        gpifo.insert('b', 2, Some(1));
        // Group 1 was relocated behind 'x' by the second insert
        assert_eq!(gpifo.remove().unwrap(), 'x');
        gpifo.insert('y', 2, None);
        assert_eq!(gpifo.remove().unwrap(), 'a');
        // Still ahead of 'y' after giving up its head
        assert_eq!(gpifo.remove().unwrap(), 'b');
        assert_eq!(gpifo.remove().unwrap(), 'y');
        assert_eq!(gpifo.num_scheduled(), 0);
    }

    #[test]
    fn test_display_lists_rank_and_entry() {
        let mut gpifo: Gpifo<char> = Gpifo::new();
        gpifo.insert('a', 5, None);
        gpifo.insert('b', 2, Some(1));
        gpifo.insert('c', 2, Some(1));
        assert_eq!(gpifo.to_string(), "2 : [b, c] - ID: 1\n5 : a\n");
        assert_eq!(Gpifo::<char>::new().to_string(), "");
    }
}
