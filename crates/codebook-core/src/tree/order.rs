//! Deterministic sibling ordering and position reindexing.
//!
//! Sibling order is the total order `(position, id)`:
//! - positions are `f64`, compared with `total_cmp` so NaN cannot break sorting
//! - ties (e.g. two rows written with the same temporary position) fall back to
//!   the node id, so the outcome never depends on input order

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::errors::{CodebookError, CodebookResult};
use crate::model::{CodebookNode, NodeId};

/// Compare two siblings.
pub fn sibling_cmp(a: &CodebookNode, b: &CodebookNode) -> Ordering {
    a.position
        .total_cmp(&b.position)
        .then_with(|| a.id.cmp(&b.id))
}

/// The `{id, parentId, position}` triple a caller writes back after a
/// structural change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdate {
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    pub position: f64,
}

/// Which sibling groups to renumber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReindexScope {
    All,
    Parent(Option<NodeId>),
}

impl ReindexScope {
    fn includes(&self, parent_id: Option<NodeId>) -> bool {
        match self {
            Self::All => true,
            Self::Parent(p) => *p == parent_id,
        }
    }
}

/// Adjacency index over a flat node list: parent id -> ordered child indices.
///
/// Built once per operation; every traversal goes top-down through it.
#[derive(Debug)]
pub struct ChildIndex<'a> {
    nodes: &'a [CodebookNode],
    children: BTreeMap<Option<NodeId>, Vec<usize>>,
}

impl<'a> ChildIndex<'a> {
    /// Build the index. Fails on duplicate ids and on parent ids that do not
    /// refer to a node of the list.
    pub fn build(nodes: &'a [CodebookNode]) -> CodebookResult<Self> {
        let mut ids = HashSet::with_capacity(nodes.len());
        for n in nodes {
            if !ids.insert(n.id) {
                return Err(CodebookError::DuplicateId(n.id));
            }
        }

        let mut children: BTreeMap<Option<NodeId>, Vec<usize>> = BTreeMap::new();
        for (i, n) in nodes.iter().enumerate() {
            if let Some(p) = n.parent_id {
                if !ids.contains(&p) {
                    return Err(CodebookError::DanglingParent {
                        node_id: n.id,
                        parent_id: p,
                    });
                }
            }
            children.entry(n.parent_id).or_default().push(i);
        }

        for list in children.values_mut() {
            list.sort_by(|&a, &b| sibling_cmp(&nodes[a], &nodes[b]));
        }

        Ok(Self { nodes, children })
    }

    /// Ordered children of `parent` (`None` = roots).
    pub fn children(&self, parent: Option<NodeId>) -> impl Iterator<Item = &'a CodebookNode> + '_ {
        let nodes = self.nodes;
        self.children
            .get(&parent)
            .into_iter()
            .flatten()
            .map(move |&i| &nodes[i])
    }
}

/// Renumber sibling positions to `0..n` per parent group within `scope`,
/// preserving relative order. Returns the rows whose position changed.
///
/// Reindexing an already contiguous set changes nothing and returns no updates.
pub fn reindex_positions(nodes: &mut [CodebookNode], scope: ReindexScope) -> Vec<PositionUpdate> {
    let mut groups: BTreeMap<Option<NodeId>, Vec<usize>> = BTreeMap::new();
    for (i, n) in nodes.iter().enumerate() {
        if scope.includes(n.parent_id) {
            groups.entry(n.parent_id).or_default().push(i);
        }
    }

    let mut updates = Vec::new();
    for list in groups.values_mut() {
        list.sort_by(|&a, &b| sibling_cmp(&nodes[a], &nodes[b]));
        for (pos, &i) in list.iter().enumerate() {
            let n = &mut nodes[i];
            let new_pos = pos as f64;
            if n.position != new_pos {
                n.position = new_pos;
                updates.push(PositionUpdate {
                    id: n.id,
                    parent_id: n.parent_id,
                    position: new_pos,
                });
            }
        }
    }
    updates
}

/// Ensure every sibling group already holds contiguous positions `0..n`.
pub fn ensure_contiguous(nodes: &[CodebookNode]) -> CodebookResult<()> {
    let index = ChildIndex::build(nodes)?;
    for (parent, list) in &index.children {
        for (pos, &i) in list.iter().enumerate() {
            if nodes[i].position != pos as f64 {
                return Err(CodebookError::invalid_argument(format!(
                    "positions under {} are not contiguous at node {}",
                    parent.map(|p| format!("node {p}")).unwrap_or_else(|| "the root".to_string()),
                    nodes[i].id
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContainerData, NodeData};

    fn group(id: NodeId, parent: Option<NodeId>, pos: f64) -> CodebookNode {
        CodebookNode::new(id, parent, pos, format!("n{id}"), NodeData::AnnotationGroup(ContainerData::default()))
    }

    #[test]
    fn reindex_renumbers_per_parent() {
        let mut nodes = vec![group(1, None, 0.0), group(2, Some(1), 4.0), group(3, Some(1), 1.5), group(4, Some(1), -0.5)];
        let updates = reindex_positions(&mut nodes, ReindexScope::All);
        let positions: Vec<f64> = nodes.iter().map(|n| n.position).collect();
        assert_eq!(positions, vec![0.0, 2.0, 1.0, 0.0]);
        assert_eq!(updates.len(), 3);
        ensure_contiguous(&nodes).unwrap();
    }

    #[test]
    fn reindex_respects_scope() {
        let mut nodes = vec![group(1, None, 5.0), group(2, Some(1), 3.0)];
        let updates = reindex_positions(&mut nodes, ReindexScope::Parent(Some(1)));
        assert_eq!(updates, vec![PositionUpdate { id: 2, parent_id: Some(1), position: 0.0 }]);
        assert_eq!(nodes[0].position, 5.0);
    }

    #[test]
    fn ties_are_broken_ids() {
        let mut nodes = vec![group(9, None, 1.0), group(3, None, 1.0)];
        reindex_positions(&mut nodes, ReindexScope::All);
        assert_eq!(nodes[1].position, 0.0);
        assert_eq!(nodes[0].position, 1.0);
    }

    #[test]
    fn ensure_contiguous_detects_gaps() {
        let nodes = vec![group(1, None, 0.0), group(2, None, 2.0)];
        let err = ensure_contiguous(&nodes).unwrap_err();
        assert!(err.to_string().contains("not contiguous"));
    }
}
