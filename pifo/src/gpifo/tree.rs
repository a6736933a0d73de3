//! Hierarchical scheduling tree of GPIFO nodes
//!
//! The tree mirrors an organizational hierarchy such as port → queue → flow.
//! Leaves hold payloads; every internal node schedules the ids of its
//! children, so one scheduling decision is made per level.
//!
//! # Storage
//!
//! Nodes live in an arena indexed by position. Each node records its parent
//! index and the ordered indices of its children, and an id → index map
//! gives O(1) lookup. The shape is fixed once built.
//!
//! # Shapes
//!
//! A shape is either a bare id (a leaf) or a list whose head is the node id
//! and whose tail are child shapes:
//!
//! ```text
//!   [0, [1, 3, 4], 2]          0
//!                            /   \
//!                           1     2
//!                          / \
//!                         3   4
//! ```

use super::{Gpifo, GpifoError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Identifier of a tree node
pub type NodeId = u32;

/// Nested tree shape as written in configuration
///
/// Deserializes from JSON: `3` is a leaf, `[2, 0, 1]` is node 2 with leaves
/// 0 and 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeShape {
    Leaf(NodeId),
    Node(Vec<TreeShape>),
}

impl TreeShape {
    /// Internal node with the given children
    pub fn node(id: NodeId, children: Vec<TreeShape>) -> Self {
        let mut parts = Vec::with_capacity(children.len() + 1);
        parts.push(TreeShape::Leaf(id));
        parts.extend(children);
        TreeShape::Node(parts)
    }
}

/// Per-node queue: leaves schedule payloads, internal nodes schedule child ids
#[derive(Debug, Clone)]
enum NodeQueue<T, R, G> {
    Leaf(Gpifo<T, R, G>),
    Internal(Gpifo<NodeId, R, G>),
}

/// Arena record for one node
#[derive(Debug, Clone)]
struct TreeNode<T, R, G> {
    id: NodeId,
    parent: Option<usize>,
    children: Vec<usize>,
    queue: NodeQueue<T, R, G>,
}

impl<T, R, G> TreeNode<T, R, G> {
    fn len(&self) -> usize
    where
        R: Ord + Clone,
        G: Eq + Hash + Clone,
    {
        match &self.queue {
            NodeQueue::Leaf(gpifo) => gpifo.len(),
            NodeQueue::Internal(gpifo) => gpifo.len(),
        }
    }
}

/// Tree of group-based PIFOs
///
/// # Example
/// ```
/// use pifo_sim_core::{GpifoTree, TreeShape};
///
/// // Root 2 with leaves 0 and 1
/// let shape: TreeShape = serde_json::from_str("[2, 0, 1]").unwrap();
/// let mut tree: GpifoTree<&str> = GpifoTree::new(&shape).unwrap();
///
/// // Leaf rank first, then the rank used at the root
/// tree.insert("slow", &[1, 9], &[None, None], 0).unwrap();
/// tree.insert("fast", &[4, 2], &[None, None], 1).unwrap();
///
/// assert_eq!(tree.remove().unwrap(), "fast");
/// assert_eq!(tree.remove().unwrap(), "slow");
/// assert!(tree.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct GpifoTree<T, R = u64, G = u64> {
    nodes: Vec<TreeNode<T, R, G>>,
    index: HashMap<NodeId, usize>,
    root: usize,
}

impl<T, R, G> GpifoTree<T, R, G>
where
    R: Ord + Clone,
    G: Eq + Hash + Clone,
{
    /// Build a tree from its shape
    ///
    /// # Errors
    /// * `InvalidShape` - an empty list, or a list whose head is not an id
    /// * `DuplicateNode` - the same id appears twice
    pub fn new(shape: &TreeShape) -> Result<Self, GpifoError> {
        let mut tree = Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            root: 0,
        };
        tree.root = tree.build(shape, None)?;
        Ok(tree)
    }

    fn build(&mut self, shape: &TreeShape, parent: Option<usize>) -> Result<usize, GpifoError> {
        let (id, child_shapes) = match shape {
            TreeShape::Leaf(id) => (*id, &[][..]),
            TreeShape::Node(parts) => match parts.split_first() {
                Some((TreeShape::Leaf(id), rest)) => (*id, rest),
                Some((TreeShape::Node(_), _)) => {
                    return Err(GpifoError::InvalidShape(
                        "node list must start with the node id".to_string(),
                    ))
                }
                None => return Err(GpifoError::InvalidShape("empty node list".to_string())),
            },
        };

        if self.index.contains_key(&id) {
            return Err(GpifoError::DuplicateNode(id));
        }

        let slot = self.nodes.len();
        let queue = if child_shapes.is_empty() {
            NodeQueue::Leaf(Gpifo::new())
        } else {
            NodeQueue::Internal(Gpifo::new())
        };
        self.nodes.push(TreeNode {
            id,
            parent,
            children: Vec::with_capacity(child_shapes.len()),
            queue,
        });
        self.index.insert(id, slot);

        for child in child_shapes {
            let child_slot = self.build(child, Some(slot))?;
            self.nodes[slot].children.push(child_slot);
        }
        Ok(slot)
    }

    /// Insert `elem` at leaf `leaf_id`
    ///
    /// `ranks` and `group_ids` hold one entry per level, ordered from the
    /// leaf up to the root. The leaf schedules `elem`; every ancestor
    /// schedules the id of the child on the path.
    ///
    /// # Errors
    /// * `UnknownNode` - `leaf_id` is not in the tree
    /// * `InvalidNode` - `leaf_id` has children
    /// * `InvalidArgument` - sequence lengths differ, are empty, or do not
    ///   match the number of levels from the leaf to the root
    ///
    /// The tree is left untouched on error.
    pub fn insert(
        &mut self,
        elem: T,
        ranks: &[R],
        group_ids: &[Option<G>],
        leaf_id: NodeId,
    ) -> Result<(), GpifoError> {
        if ranks.is_empty() || ranks.len() != group_ids.len() {
            return Err(GpifoError::InvalidArgument(format!(
                "expected one rank and one group id per level, got {} ranks and {} group ids",
                ranks.len(),
                group_ids.len()
            )));
        }

        let leaf = self.slot_of(leaf_id)?;
        if !self.nodes[leaf].children.is_empty() {
            return Err(GpifoError::InvalidNode { node: leaf_id });
        }

        let levels = self.path_len(leaf);
        if ranks.len() != levels {
            return Err(GpifoError::InvalidArgument(format!(
                "leaf {} sits {} levels below the root inclusive, got {} ranks",
                leaf_id,
                levels,
                ranks.len()
            )));
        }

        match &mut self.nodes[leaf].queue {
            NodeQueue::Leaf(gpifo) => gpifo.insert(elem, ranks[0].clone(), group_ids[0].clone()),
            NodeQueue::Internal(_) => return Err(GpifoError::InvalidNode { node: leaf_id }),
        }

        let mut child = leaf;
        let mut level = 1;
        while let Some(parent) = self.nodes[child].parent {
            let child_id = self.nodes[child].id;
            let parent_id = self.nodes[parent].id;
            match &mut self.nodes[parent].queue {
                NodeQueue::Internal(gpifo) => {
                    gpifo.insert(child_id, ranks[level].clone(), group_ids[level].clone())
                }
                NodeQueue::Leaf(_) => return Err(GpifoError::InvalidNode { node: parent_id }),
            }
            child = parent;
            level += 1;
        }
        Ok(())
    }

    /// Remove the next payload, descending from the root to a leaf
    ///
    /// # Errors
    /// * `Empty` - the tree holds nothing
    /// * `UnknownChild` - an internal node dequeued an id that is not one of
    ///   its children (corrupted tree)
    pub fn remove(&mut self) -> Result<T, GpifoError> {
        self.remove_from(self.root)
    }

    fn remove_from(&mut self, slot: usize) -> Result<T, GpifoError> {
        let parent_id = self.nodes[slot].id;
        let child_id = match &mut self.nodes[slot].queue {
            NodeQueue::Leaf(gpifo) => return gpifo.remove(),
            NodeQueue::Internal(gpifo) => gpifo.remove()?,
        };

        let child = self.nodes[slot]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c].id == child_id)
            .ok_or(GpifoError::UnknownChild {
                parent: parent_id,
                child: child_id,
            })?;
        self.remove_from(child)
    }

    /// Number of payloads held by the tree
    pub fn len(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node.queue, NodeQueue::Leaf(_)))
            .map(TreeNode::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[self.root].len() == 0
    }

    /// Entries queued at one node: payloads at a leaf, child ids elsewhere
    pub fn node_len(&self, id: NodeId) -> Result<usize, GpifoError> {
        Ok(self.nodes[self.slot_of(id)?].len())
    }

    /// Number of levels from node `id` up to and including the root
    pub fn depth_of(&self, id: NodeId) -> Result<usize, GpifoError> {
        Ok(self.path_len(self.slot_of(id)?))
    }

    /// Ids of all leaves, in construction order
    pub fn leaf_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|node| node.children.is_empty())
            .map(|node| node.id)
            .collect()
    }

    pub fn root_id(&self) -> NodeId {
        self.nodes[self.root].id
    }

    fn slot_of(&self, id: NodeId) -> Result<usize, GpifoError> {
        self.index
            .get(&id)
            .copied()
            .ok_or(GpifoError::UnknownNode { node: id })
    }

    fn path_len(&self, slot: usize) -> usize {
        let mut levels = 1;
        let mut current = slot;
        while let Some(parent) = self.nodes[current].parent {
            levels += 1;
            current = parent;
        }
        levels
    }
}

/// Every node in construction order, followed by its scheduled entries
impl<T, R, G> fmt::Display for GpifoTree<T, R, G>
where
    T: fmt::Display,
    R: fmt::Display + Ord + Clone,
    G: fmt::Display + Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            writeln!(f, "node {}:", node.id)?;
            let entries = match &node.queue {
                NodeQueue::Leaf(gpifo) => gpifo.to_string(),
                NodeQueue::Internal(gpifo) => gpifo.to_string(),
            };
            for line in entries.lines() {
                writeln!(f, "  {line}")?;
            }
        }
        Ok(())
    }
}
