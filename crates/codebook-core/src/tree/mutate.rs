//! Validate-then-commit mutations of a codebook snapshot.
//!
//! Every operation builds a candidate copy of the node list, applies the
//! change, revalidates the whole candidate with [`validate_tree`] and only then
//! replaces the snapshot. A rejected mutation leaves the tree untouched.
//!
//! The returned [`TreeChanges`] lists every row whose `parentId` or `position`
//! changed, which is exactly what the persistence layer has to write back in
//! one transaction.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::order::{reindex_positions, PositionUpdate, ReindexScope};
use super::{detects_cycle, recursive_descendants, validate_tree, TreeNode};
use crate::config::TreeLimits;
use crate::errors::{CodebookError, CodebookResult};
use crate::model::{CodebookNode, NodeData, NodeId};

/// A node to insert. `slot` is the index among the new siblings; `None`
/// appends after the last sibling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNode {
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub slot: Option<usize>,
    pub name: String,
    pub data: NodeData,
}

/// Rows a caller must persist after a successful mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeChanges {
    pub updates: Vec<PositionUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inserted: Option<CodebookNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deleted: Vec<NodeId>,
}

/// An owned, always-valid codebook snapshot.
#[derive(Debug, Clone)]
pub struct CodebookTree {
    nodes: Vec<CodebookNode>,
    limits: TreeLimits,
}

impl CodebookTree {
    /// Wrap a snapshot, validating it first.
    pub fn new(nodes: Vec<CodebookNode>, limits: TreeLimits) -> CodebookResult<Self> {
        validate_tree(&nodes, &limits)?;
        Ok(Self { nodes, limits })
    }

    pub fn nodes(&self) -> &[CodebookNode] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<CodebookNode> {
        self.nodes
    }

    pub fn limits(&self) -> &TreeLimits {
        &self.limits
    }

    pub fn node(&self, id: NodeId) -> Option<&CodebookNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// The snapshot in nested order.
    pub fn sorted(&self) -> CodebookResult<Vec<TreeNode>> {
        super::sort_nested_with_limits(&self.nodes, &self.limits)
    }

    pub fn insert(&mut self, new: NewNode) -> CodebookResult<TreeChanges> {
        if let Some(p) = new.parent_id {
            self.require(p).map_err(|e| reject("insert", e))?;
        }

        let id = self.nodes.iter().map(|n| n.id).max().unwrap_or(0) + 1;
        let position = match new.slot {
            Some(k) => k as f64 - 0.5,
            None => f64::INFINITY,
        };

        // Slots count over `0..n`, so close any gaps before placing the node.
        let mut candidate = self.nodes.clone();
        reindex_positions(&mut candidate, ReindexScope::Parent(new.parent_id));
        candidate.push(CodebookNode::new(id, new.parent_id, position, new.name, new.data));
        reindex_positions(&mut candidate, ReindexScope::Parent(new.parent_id));

        let inserted = candidate.iter().find(|n| n.id == id).cloned();
        let mut changes = self.commit("insert", candidate)?;
        changes.updates.retain(|u| u.id != id);
        changes.inserted = inserted;
        Ok(changes)
    }

    /// Re-parent `id` under `new_parent` (or make it a root), at `slot` among
    /// its new siblings.
    pub fn move_node(&mut self, id: NodeId, new_parent: Option<NodeId>, slot: Option<usize>) -> CodebookResult<TreeChanges> {
        let idx = self.require(id).map_err(|e| reject("move", e))?;
        if let Some(p) = new_parent {
            self.require(p).map_err(|e| reject("move", e))?;
        }
        if detects_cycle(&self.nodes, id, new_parent) {
            return Err(reject("move", CodebookError::Cycle { node_id: id }));
        }

        let old_parent = self.nodes[idx].parent_id;
        let mut candidate = self.nodes.clone();

        // Park the node after its new siblings so they renumber without it.
        candidate[idx].parent_id = new_parent;
        candidate[idx].position = f64::INFINITY;
        reindex_positions(&mut candidate, ReindexScope::Parent(new_parent));
        if let Some(k) = slot {
            candidate[idx].position = k as f64 - 0.5;
            reindex_positions(&mut candidate, ReindexScope::Parent(new_parent));
        }
        if old_parent != new_parent {
            reindex_positions(&mut candidate, ReindexScope::Parent(old_parent));
        }

        self.commit("move", candidate)
    }

    /// Replace the payload of a node. The new type must fit both the parent and
    /// the existing children.
    pub fn update_data(&mut self, id: NodeId, data: NodeData) -> CodebookResult<TreeChanges> {
        let idx = self.require(id).map_err(|e| reject("update", e))?;
        let mut candidate = self.nodes.clone();
        candidate[idx].data = data;
        self.commit("update", candidate)
    }

    pub fn rename(&mut self, id: NodeId, name: impl Into<String>) -> CodebookResult<TreeChanges> {
        let idx = self.require(id).map_err(|e| reject("rename", e))?;
        let mut candidate = self.nodes.clone();
        candidate[idx].name = name.into();
        self.commit("rename", candidate)
    }

    /// Delete a node. Without `recursive` a node with children is refused.
    pub fn delete(&mut self, id: NodeId, recursive: bool) -> CodebookResult<TreeChanges> {
        let idx = self.require(id).map_err(|e| reject("delete", e))?;
        let descendants = recursive_descendants(&self.nodes, id);
        if !descendants.is_empty() && !recursive {
            return Err(reject("delete", CodebookError::HasChildren(id)));
        }

        let parent = self.nodes[idx].parent_id;
        let mut deleted = Vec::with_capacity(descendants.len() + 1);
        deleted.push(id);
        deleted.extend(descendants);

        let gone: HashSet<NodeId> = deleted.iter().copied().collect();
        let mut candidate: Vec<CodebookNode> = self.nodes.iter().filter(|n| !gone.contains(&n.id)).cloned().collect();
        reindex_positions(&mut candidate, ReindexScope::Parent(parent));

        let mut changes = self.commit("delete", candidate)?;
        changes.deleted = deleted;
        Ok(changes)
    }

    fn require(&self, id: NodeId) -> CodebookResult<usize> {
        self.nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or(CodebookError::NodeNotFound(id))
    }

    fn commit(&mut self, op: &'static str, candidate: Vec<CodebookNode>) -> CodebookResult<TreeChanges> {
        validate_tree(&candidate, &self.limits).map_err(|e| reject(op, e))?;

        let updates = diff_positions(&self.nodes, &candidate);
        tracing::debug!(op, updates = updates.len(), nodes = candidate.len(), "codebook mutation committed");
        self.nodes = candidate;

        Ok(TreeChanges {
            updates,
            ..TreeChanges::default()
        })
    }
}

fn reject(op: &'static str, e: CodebookError) -> CodebookError {
    tracing::warn!(op, error = %e, "codebook mutation rejected");
    e
}

/// Rows of `after` whose parent or position differs from `before`, in `after`
/// order. Rows new in `after` are included.
fn diff_positions(before: &[CodebookNode], after: &[CodebookNode]) -> Vec<PositionUpdate> {
    let old: HashMap<NodeId, (Option<NodeId>, f64)> = before.iter().map(|n| (n.id, (n.parent_id, n.position))).collect();

    after
        .iter()
        .filter(|n| old.get(&n.id) != Some(&(n.parent_id, n.position)))
        .map(|n| PositionUpdate {
            id: n.id,
            parent_id: n.parent_id,
            position: n.position,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::model::{AnnotationTaskData, ContainerData, QuestionData, TaskKind};

    fn container(id: NodeId, parent: Option<NodeId>, pos: f64, data: fn(ContainerData) -> NodeData) -> CodebookNode {
        CodebookNode::new(id, parent, pos, format!("n{id}"), data(ContainerData::default()))
    }

    fn question(id: NodeId, parent: NodeId, pos: f64) -> CodebookNode {
        CodebookNode::new(id, Some(parent), pos, format!("n{id}"), NodeData::Question(QuestionData::default()))
    }

    fn tree() -> CodebookTree {
        // 1 Annotation phase
        //   2 Annotation group
        //     4 Question
        //   3 Question
        // 5 Survey phase
        let nodes = vec![
            container(1, None, 0.0, NodeData::AnnotationPhase),
            container(2, Some(1), 0.0, NodeData::AnnotationGroup),
            question(3, 1, 1.0),
            question(4, 2, 0.0),
            container(5, None, 1.0, NodeData::SurveyPhase),
        ];
        CodebookTree::new(nodes, TreeLimits::default()).unwrap()
    }

    fn position(t: &CodebookTree, id: NodeId) -> f64 {
        t.node(id).unwrap().position
    }

    #[test]
    fn insert_into_slot_shifts_later_siblings() {
        let mut t = tree();
        let changes = t
            .insert(NewNode {
                parent_id: Some(1),
                slot: Some(1),
                name: "task".into(),
                data: NodeData::AnnotationTask(AnnotationTaskData {
                    instruction: None,
                    task: TaskKind::Span { codes: vec![] },
                }),
            })
            .unwrap();

        let inserted = changes.inserted.unwrap();
        assert_eq!(inserted.id, 6);
        assert_eq!(inserted.position, 1.0);
        assert_eq!(changes.updates, vec![PositionUpdate { id: 3, parent_id: Some(1), position: 2.0 }]);
        assert_eq!(position(&t, 3), 2.0);
    }

    #[test]
    fn insert_appends_without_slot() {
        let mut t = tree();
        let changes = t
            .insert(NewNode {
                parent_id: Some(5),
                slot: None,
                name: "age".into(),
                data: NodeData::Question(QuestionData::default()),
            })
            .unwrap();
        assert_eq!(changes.inserted.unwrap().position, 0.0);
        assert!(changes.updates.is_empty());
    }

    #[test]
    fn insert_counts_slots_over_gapped_positions() {
        let nodes = vec![
            container(1, None, 0.0, NodeData::SurveyPhase),
            question(2, 1, 0.0),
            question(3, 1, 10.0),
            question(4, 1, 20.0),
        ];
        let mut t = CodebookTree::new(nodes, TreeLimits::default()).unwrap();
        let changes = t
            .insert(NewNode {
                parent_id: Some(1),
                slot: Some(2),
                name: "age".into(),
                data: NodeData::Question(QuestionData::default()),
            })
            .unwrap();

        assert_eq!(changes.inserted.unwrap().position, 2.0);
        assert_eq!(position(&t, 2), 0.0);
        assert_eq!(position(&t, 3), 1.0);
        assert_eq!(position(&t, 4), 3.0);
        assert_eq!(
            changes.updates,
            vec![
                PositionUpdate { id: 3, parent_id: Some(1), position: 1.0 },
                PositionUpdate { id: 4, parent_id: Some(1), position: 3.0 },
            ]
        );
    }

    #[test]
    fn insert_rejects_wrong_type_and_keeps_snapshot() {
        let mut t = tree();
        let before = t.nodes().to_vec();
        let err = t
            .insert(NewNode {
                parent_id: Some(5),
                slot: None,
                name: "task".into(),
                data: NodeData::AnnotationTask(AnnotationTaskData {
                    instruction: None,
                    task: TaskKind::Span { codes: vec![] },
                }),
            })
            .unwrap_err();
        assert_matches!(err, CodebookError::InvalidParent { node_id: 6, .. });
        assert_eq!(t.nodes(), before.as_slice());
    }

    #[test]
    fn move_into_descendant_is_a_cycle() {
        let mut t = tree();
        assert_matches!(t.move_node(1, Some(2), None), Err(CodebookError::Cycle { node_id: 1 }));
        assert_matches!(t.move_node(2, Some(2), None), Err(CodebookError::Cycle { node_id: 2 }));
    }

    #[test]
    fn move_reindexes_old_and_new_parents() {
        let mut t = tree();
        let changes = t.move_node(3, Some(2), Some(0)).unwrap();
        assert_eq!(
            changes.updates,
            vec![
                PositionUpdate { id: 3, parent_id: Some(2), position: 0.0 },
                PositionUpdate { id: 4, parent_id: Some(2), position: 1.0 },
            ]
        );
        assert_eq!(t.node(3).unwrap().parent_id, Some(2));
    }

    #[test]
    fn move_within_parent_uses_slot_without_self() {
        let mut t = tree();
        let changes = t.move_node(2, Some(1), Some(1)).unwrap();
        assert_eq!(position(&t, 3), 0.0);
        assert_eq!(position(&t, 2), 1.0);
        assert_eq!(changes.updates.len(), 2);
    }

    #[test]
    fn update_data_checks_children() {
        let mut t = tree();
        let err = t.update_data(2, NodeData::Question(QuestionData::default())).unwrap_err();
        assert_matches!(err, CodebookError::InvalidParent { node_id: 4, .. });
    }

    #[test]
    fn rename_enforces_sibling_uniqueness() {
        let mut t = tree();
        assert_matches!(t.rename(3, "n2"), Err(CodebookError::DuplicateName { .. }));
        t.rename(3, "topic").unwrap();
        assert_eq!(t.node(3).unwrap().name, "topic");
    }

    #[test]
    fn delete_requires_recursive_for_parents() {
        let mut t = tree();
        assert_matches!(t.delete(2, false), Err(CodebookError::HasChildren(2)));

        let changes = t.delete(2, true).unwrap();
        assert_eq!(changes.deleted, vec![2, 4]);
        assert_eq!(changes.updates, vec![PositionUpdate { id: 3, parent_id: Some(1), position: 0.0 }]);
        assert!(t.node(4).is_none());
    }

    #[test]
    fn unknown_node_is_reported() {
        let mut t = tree();
        assert_matches!(t.delete(42, true), Err(CodebookError::NodeNotFound(42)));
        assert_matches!(t.move_node(3, Some(42), None), Err(CodebookError::NodeNotFound(42)));
    }
}
