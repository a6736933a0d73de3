//! Group-based PIFO scheduling structures
//!
//! # Overview
//!
//! A PIFO pops elements in rank order regardless of push order. A GPIFO
//! extends this so an entry can be either a single element or a whole FIFO
//! (a *group*): many elements share one scheduling decision while draining in
//! their own arrival order.
//!
//! ```text
//!   PriorityQ (ascending rank, stable ties)
//!   ┌────────────┬──────────────┬────────────┐
//!   │ 2: group 1 │ 5: element a │ 7: group 3 │
//!   └─────┬──────┴──────────────┴─────┬──────┘
//!         ▼                           ▼
//!     FIFO [b, c]                 FIFO [d]
//! ```
//!
//! A [`GpifoTree`] composes GPIFOs into a hierarchy: leaves hold payloads,
//! internal nodes schedule the ids of their children.

pub mod fifo;
pub mod priority_q;
pub mod scheduler;
pub mod tree;

pub use fifo::Fifo;
pub use priority_q::PriorityQ;
pub use scheduler::Gpifo;
pub use tree::{GpifoTree, NodeId, TreeShape};

use thiserror::Error;

/// Errors raised by the scheduling structures
///
/// All variants are contract violations or corruption signals; capacity
/// pressure is never reported through this type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GpifoError {
    #[error("cannot remove from empty {structure}")]
    Empty { structure: &'static str },

    #[error("node {node} has children and cannot receive elements")]
    InvalidNode { node: NodeId },

    #[error("node {node} does not exist in the tree")]
    UnknownNode { node: NodeId },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("node {parent} dequeued id {child} which is not one of its children")]
    UnknownChild { parent: NodeId, child: NodeId },

    #[error("duplicate node id {0} in tree shape")]
    DuplicateNode(NodeId),

    #[error("invalid tree shape: {0}")]
    InvalidShape(String),
}
