//! Codebook tree utilities.
//!
//! A codebook is stored as a flat list of rows that reference their parent.
//! This module turns such a list into a validated forest:
//! - `sort_nested`: pre-order (document) ordering, nesting levels, derived fields
//! - `detects_cycle`: guard for a proposed `parentId` change
//! - `is_valid_parent`: the fixed parent/child type table
//! - `recursive_descendants`: every transitive child of a node
//! - `reindex_positions`: contiguous sibling positions (see `order`)
//! - `validate_tree`: everything above, for a whole snapshot
//!
//! Every traversal goes top-down through an adjacency index built once per call
//! (`order::ChildIndex`). Parent pointers are never followed blindly, so a
//! corrupted `parentId` chain produces a `Cycle` error instead of a loop.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::config::TreeLimits;
use crate::errors::{CodebookError, CodebookResult};
use crate::model::{CodebookNode, NodeId, NodeType, TreeType};

pub mod mutate;
pub mod order;

pub use mutate::{CodebookTree, NewNode, TreeChanges};
pub use order::{reindex_positions, ChildIndex, PositionUpdate, ReindexScope};

/// A node in nested order, with its derived (never persisted) fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    #[serde(flatten)]
    pub node: CodebookNode,
    /// Nesting depth, roots are 0.
    pub level: usize,
    /// Number of direct children.
    pub children: usize,
    pub tree_type: TreeType,
    /// Nearest ancestor-or-self phase.
    pub phase_id: NodeId,
    /// Nearest ancestor-or-self that owns a layout.
    pub layout_id: Option<NodeId>,
    /// Index in the flattened pre-order.
    pub global_position: usize,
    pub dependencies: BTreeSet<String>,
}

impl TreeNode {
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    pub fn node_type(&self) -> NodeType {
        self.node.node_type()
    }
}

/// Parent/child type compatibility. `parent == None` means the node is a root.
pub fn is_valid_parent(child: NodeType, parent: Option<NodeType>) -> bool {
    use NodeType::*;

    match parent {
        None => matches!(child, SurveyPhase | AnnotationPhase),
        Some(SurveyPhase | SurveyGroup) => matches!(child, SurveyGroup | Question),
        Some(AnnotationPhase | AnnotationGroup) => {
            matches!(child, AnnotationGroup | Question | AnnotationTask)
        }
        Some(Question | AnnotationTask) => false,
    }
}

/// Sort nodes into nested pre-order with default limits.
pub fn sort_nested(nodes: &[CodebookNode]) -> CodebookResult<Vec<TreeNode>> {
    sort_nested_with_limits(nodes, &TreeLimits::default())
}

/// Sort nodes into nested pre-order.
///
/// Every node appears after its parent and before the subtrees of its later
/// siblings. Positions are rewritten to `0..n` within each parent group. Fails
/// with `Cycle` when a node is revisited or cannot be reached from any root
/// (i.e. it only hangs off a cycle).
pub fn sort_nested_with_limits(nodes: &[CodebookNode], limits: &TreeLimits) -> CodebookResult<Vec<TreeNode>> {
    if nodes.len() > limits.max_nodes {
        return Err(CodebookError::NodeLimit {
            max_nodes: limits.max_nodes,
        });
    }

    let index = ChildIndex::build(nodes)?;

    struct Frame<'n> {
        node: &'n CodebookNode,
        level: usize,
        sibling_index: usize,
        phase_id: Option<NodeId>,
        layout_id: Option<NodeId>,
    }

    let roots: Vec<&CodebookNode> = index.children(None).collect();
    let mut stack: Vec<Frame> = roots
        .into_iter()
        .enumerate()
        .rev()
        .map(|(i, node)| Frame {
            node,
            level: 0,
            sibling_index: i,
            phase_id: None,
            layout_id: None,
        })
        .collect();

    let mut visited: HashSet<NodeId> = HashSet::with_capacity(nodes.len());
    let mut out: Vec<TreeNode> = Vec::with_capacity(nodes.len());

    while let Some(frame) = stack.pop() {
        let node = frame.node;
        if !visited.insert(node.id) {
            return Err(CodebookError::Cycle { node_id: node.id });
        }
        if frame.level >= limits.max_depth {
            return Err(CodebookError::DepthLimit {
                node_id: node.id,
                max_depth: limits.max_depth,
            });
        }

        let node_type = node.node_type();
        let phase_id = if frame.level == 0 { Some(node.id) } else { frame.phase_id };
        let layout_id = if node.data.layout().is_some() {
            Some(node.id)
        } else {
            frame.layout_id
        };

        let children: Vec<&CodebookNode> = index.children(Some(node.id)).collect();

        let mut sorted = node.clone();
        sorted.position = frame.sibling_index as f64;
        out.push(TreeNode {
            node: sorted,
            level: frame.level,
            children: children.len(),
            tree_type: node_type.tree_type(),
            // Roots set it above, so only the level-0 frame can carry None here.
            phase_id: phase_id.unwrap_or(node.id),
            layout_id,
            global_position: out.len(),
            dependencies: node.data.dependencies(),
        });

        for (i, child) in children.into_iter().enumerate().rev() {
            stack.push(Frame {
                node: child,
                level: frame.level + 1,
                sibling_index: i,
                phase_id,
                layout_id,
            });
        }
    }

    if out.len() != nodes.len() {
        let unreached = nodes
            .iter()
            .map(|n| n.id)
            .filter(|id| !visited.contains(id))
            .min();
        if let Some(node_id) = unreached {
            return Err(CodebookError::Cycle { node_id });
        }
    }

    tracing::trace!(nodes = out.len(), "sorted codebook tree");
    Ok(out)
}

/// Would setting `candidate_id`'s parent to `proposed_parent_id` create a
/// cycle? Walks ancestors upward from the proposed parent. A loop that already
/// exists in the chain is reported as a cycle too.
pub fn detects_cycle(nodes: &[CodebookNode], candidate_id: NodeId, proposed_parent_id: Option<NodeId>) -> bool {
    let parents: HashMap<NodeId, Option<NodeId>> = nodes.iter().map(|n| (n.id, n.parent_id)).collect();

    let mut seen = HashSet::new();
    let mut cur = proposed_parent_id;
    while let Some(id) = cur {
        if id == candidate_id || !seen.insert(id) {
            return true;
        }
        cur = parents.get(&id).copied().flatten();
    }
    false
}

/// Every transitive child of `root_id`, breadth first. `root_id` itself is not
/// included.
pub fn recursive_descendants(nodes: &[CodebookNode], root_id: NodeId) -> Vec<NodeId> {
    let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for n in nodes {
        if let Some(p) = n.parent_id {
            children.entry(p).or_default().push(n.id);
        }
    }

    let mut out = Vec::new();
    let mut seen = HashSet::from([root_id]);
    let mut queue = VecDeque::from([root_id]);
    while let Some(id) = queue.pop_front() {
        for &child in children.get(&id).into_iter().flatten() {
            if seen.insert(child) {
                out.push(child);
                queue.push_back(child);
            }
        }
    }
    out
}

/// Full structural validation of a snapshot: cycles, limits, parent types and
/// sibling name uniqueness. Returns the sorted tree on success.
pub fn validate_tree(nodes: &[CodebookNode], limits: &TreeLimits) -> CodebookResult<Vec<TreeNode>> {
    let sorted = sort_nested_with_limits(nodes, limits)?;

    let types: HashMap<NodeId, NodeType> = nodes.iter().map(|n| (n.id, n.node_type())).collect();
    let mut names: HashSet<(Option<NodeId>, &str)> = HashSet::new();

    for n in nodes {
        let parent_type = n.parent_id.and_then(|p| types.get(&p).copied());
        if !is_valid_parent(n.node_type(), parent_type) {
            return Err(CodebookError::InvalidParent {
                node_id: n.id,
                child: n.node_type(),
                parent: parent_type,
            });
        }
        if !names.insert((n.parent_id, n.name.as_str())) {
            return Err(CodebookError::DuplicateName {
                name: n.name.clone(),
                parent_id: n.parent_id,
            });
        }
    }

    Ok(sorted)
}
