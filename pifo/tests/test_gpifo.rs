//! Tests for the flat group-based PIFO and its building blocks

use pifo_sim_core::{Fifo, Gpifo, GpifoError, PriorityQ};

#[test]
fn test_group_beats_individual_element() {
    let mut gpifo: Gpifo<&str> = Gpifo::new();
    gpifo.insert("a", 5, None);
    gpifo.insert("b", 2, Some(1));
    gpifo.insert("c", 2, Some(1));

    assert_eq!(gpifo.remove(), Ok("b"));
    assert_eq!(gpifo.remove(), Ok("c"));
    assert_eq!(gpifo.remove(), Ok("a"));
    assert_eq!(gpifo.remove(), Err(GpifoError::Empty { structure: "GPIFO" }));
}

#[test]
fn test_distinct_ranks_dequeue_ascending() {
    let mut gpifo: Gpifo<u64> = Gpifo::new();
    for rank in [8, 3, 11, 1, 6] {
        gpifo.insert(rank * 10, rank, None);
    }
    let out: Vec<u64> = std::iter::from_fn(|| gpifo.remove().ok()).collect();
    assert_eq!(out, vec![10, 30, 60, 80, 110]);
}

#[test]
fn test_last_insert_sets_group_rank() {
    let mut gpifo: Gpifo<&str> = Gpifo::new();
    gpifo.insert("x1", 1, Some(7));
    gpifo.insert("y", 5, None);
    gpifo.insert("x2", 9, Some(7));

    // The group moved behind "y" with its latest rank
    assert_eq!(gpifo.group_rank(&7), Some(&9));
    assert_eq!(gpifo.peek_rank(), Some(&5));
    assert_eq!(gpifo.remove(), Ok("y"));
    assert_eq!(gpifo.remove(), Ok("x1"));
    assert_eq!(gpifo.remove(), Ok("x2"));
}

#[test]
fn test_group_relocation_goes_after_equal_ranks() {
    let mut gpifo: Gpifo<&str> = Gpifo::new();
    gpifo.insert("g1", 1, Some(1));
    gpifo.insert("e", 4, None);
    gpifo.insert("g2", 4, Some(1));

    assert_eq!(gpifo.remove(), Ok("e"));
    assert_eq!(gpifo.remove(), Ok("g1"));
    assert_eq!(gpifo.remove(), Ok("g2"));
}

#[test]
fn test_group_entry_exists_iff_fifo_non_empty() {
    let mut gpifo: Gpifo<u32> = Gpifo::new();
    gpifo.insert(1, 3, Some(2));
    gpifo.insert(2, 3, Some(2));
    assert_eq!(gpifo.num_groups(), 1);
    assert_eq!(gpifo.group_len(&2), 2);
    assert_eq!(gpifo.num_scheduled(), 1);

    gpifo.remove().unwrap();
    assert_eq!(gpifo.num_groups(), 1);
    gpifo.remove().unwrap();
    assert_eq!(gpifo.num_groups(), 0);
    assert_eq!(gpifo.group_rank(&2), None);
    assert_eq!(gpifo.num_scheduled(), 0);

    // A drained group comes back fresh with the new rank
    gpifo.insert(3, 0, Some(2));
    assert_eq!(gpifo.group_len(&2), 1);
    assert_eq!(gpifo.group_rank(&2), Some(&0));
    assert_eq!(gpifo.remove(), Ok(3));
    assert!(gpifo.is_empty());
}

#[test]
fn test_len_counts_elements_not_entries() {
    let mut gpifo: Gpifo<u32> = Gpifo::new();
    gpifo.insert(1, 1, Some(1));
    gpifo.insert(2, 1, Some(1));
    gpifo.insert(3, 1, None);
    assert_eq!(gpifo.len(), 3);
    assert_eq!(gpifo.num_scheduled(), 2);
}

#[test]
fn test_priority_q_resort_keeps_unrelated_ties() {
    let mut pq: PriorityQ<u32, &str> = PriorityQ::new();
    pq.insert(2, "a");
    pq.insert(2, "b");
    pq.insert(5, "c");
    pq.insert(2, "d");

    pq.resort();
    let order: Vec<&str> = pq.iter().map(|(_, v)| *v).collect();
    assert_eq!(order, vec!["a", "b", "d", "c"]);

    // Lower "c" below the ties: only it moves
    if let Some(rank) = pq.rank_mut(3) {
        *rank = 1;
    }
    pq.resort();
    let order: Vec<&str> = pq.iter().map(|(_, v)| *v).collect();
    assert_eq!(order, vec!["c", "a", "b", "d"]);
}

#[test]
fn test_priority_q_empty_remove() {
    let mut pq: PriorityQ<u32, u32> = PriorityQ::new();
    assert!(pq.peek_min().is_none());
    assert_eq!(
        pq.remove_min(),
        Err(GpifoError::Empty {
            structure: "PriorityQ"
        })
    );
}

#[test]
fn test_fifo_pop_order_and_empty_error() {
    let mut fifo: Fifo<u32> = Fifo::new(4);
    fifo.push(1);
    fifo.push(2);
    assert_eq!(fifo.id(), &4);
    assert_eq!(fifo.peek(), Some(&1));
    assert_eq!(fifo.pop(), Ok(1));
    assert_eq!(fifo.pop(), Ok(2));
    assert_eq!(fifo.pop(), Err(GpifoError::Empty { structure: "FIFO" }));
}
