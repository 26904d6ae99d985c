//! Tracker node storage for one run.
//!
//! All trackers live in a [`TrackerArena`] owned by the context; handles are
//! plain indices ([`TrackerId`]). The parent's child list is the sole owner of
//! a tracker's position in the tree, so detaching a subtree (a generator
//! advancing to its next index) is a constant-time truncation. Detached nodes
//! stay allocated until the arena is cleared at the end of the run.

use serde::{Deserialize, Serialize};

/// Handle to a tracker in a [`TrackerArena`].
///
/// Ids stay valid for the whole run. An id under a generator refers to a node
/// built for one specific index; after the generator advances, the node is
/// detached from the tree but the id still reads its final state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackerId(pub(crate) usize);

/// Variant payload distinguishing sections from generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TrackerKind {
    Section,
    Generator {
        size: usize,
        /// `None` until the first advance of the run.
        index: Option<usize>,
    },
}

/// Per-tracker run state.
///
/// `Executing` marks the tracker the body is currently inside;
/// `ExecutingChildren` marks its ancestors. `NeedsAnotherRun` is recorded by a
/// descendant's failure and forces the subtree to be revisited in a later
/// cycle. `CompletedSuccessfully` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Executing,
    ExecutingChildren,
    NeedsAnotherRun,
    CompletedSuccessfully,
    Failed,
}

/// One tracker node: a section or generator instance, persistent for the run.
#[derive(Debug, Clone)]
pub struct TrackerNode {
    pub name: String,
    pub kind: TrackerKind,
    pub parent: Option<TrackerId>,
    /// Insertion-ordered, never reordered. Discovery order is first-seen-wins.
    pub children: Vec<TrackerId>,
    pub state: RunState,
}

impl TrackerNode {
    pub fn has_started(&self) -> bool {
        self.state != RunState::NotStarted
    }

    pub fn has_ended(&self) -> bool {
        matches!(
            self.state,
            RunState::CompletedSuccessfully | RunState::Failed
        )
    }

    pub fn is_open(&self) -> bool {
        self.has_started() && !self.has_ended()
    }

    pub fn is_successfully_completed(&self) -> bool {
        self.state == RunState::CompletedSuccessfully
    }
}

/// Slab of tracker nodes for one run. Discarded in bulk by `end_run`.
#[derive(Debug, Default)]
pub struct TrackerArena {
    nodes: Vec<TrackerNode>,
}

impl TrackerArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a node and, when `parent` is given, append it to the parent's
    /// child list.
    pub(crate) fn alloc(
        &mut self,
        name: &str,
        kind: TrackerKind,
        parent: Option<TrackerId>,
    ) -> TrackerId {
        let id = TrackerId(self.nodes.len());
        self.nodes.push(TrackerNode {
            name: name.to_string(),
            kind,
            parent,
            children: Vec::new(),
            state: RunState::NotStarted,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    pub fn node(&self, id: TrackerId) -> &TrackerNode {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: TrackerId) -> &mut TrackerNode {
        &mut self.nodes[id.0]
    }

    /// Look up a direct child of `parent` by name.
    pub fn find_child(&self, parent: TrackerId, name: &str) -> Option<TrackerId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|&child| self.nodes[child.0].name == name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_in_state(state: RunState) -> TrackerNode {
        TrackerNode {
            name: "n".to_string(),
            kind: TrackerKind::Section,
            parent: None,
            children: Vec::new(),
            state,
        }
    }

    /// `is_open` equals `has_started && !has_ended` in every state.
    #[test]
    fn open_is_started_and_not_ended_for_every_state() {
        let states = [
            RunState::NotStarted,
            RunState::Executing,
            RunState::ExecutingChildren,
            RunState::NeedsAnotherRun,
            RunState::CompletedSuccessfully,
            RunState::Failed,
        ];
        for state in states {
            let node = node_in_state(state);
            assert_eq!(
                node.is_open(),
                node.has_started() && !node.has_ended(),
                "state {state:?}"
            );
        }
    }

    #[test]
    fn terminal_states_are_ended_and_only_completed_is_successful() {
        assert!(node_in_state(RunState::CompletedSuccessfully).has_ended());
        assert!(node_in_state(RunState::Failed).has_ended());
        assert!(node_in_state(RunState::CompletedSuccessfully).is_successfully_completed());
        assert!(!node_in_state(RunState::Failed).is_successfully_completed());
        assert!(!node_in_state(RunState::NeedsAnotherRun).has_ended());
    }

    #[test]
    fn alloc_attaches_child_to_parent_in_insertion_order() {
        let mut arena = TrackerArena::new();
        let root = arena.alloc("root", TrackerKind::Section, None);
        let a = arena.alloc("a", TrackerKind::Section, Some(root));
        let b = arena.alloc("b", TrackerKind::Section, Some(root));

        assert_eq!(arena.node(root).children, vec![a, b]);
        assert_eq!(arena.node(a).parent, Some(root));
        assert_eq!(arena.find_child(root, "b"), Some(b));
        assert_eq!(arena.find_child(root, "missing"), None);
    }

    #[test]
    fn detached_node_is_still_readable_by_id() {
        let mut arena = TrackerArena::new();
        let root = arena.alloc("root", TrackerKind::Section, None);
        let child = arena.alloc("child", TrackerKind::Section, Some(root));

        arena.node_mut(root).children.clear();

        assert_eq!(arena.find_child(root, "child"), None);
        assert_eq!(arena.node(child).name, "child");
    }
}
