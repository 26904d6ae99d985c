//! Per-run coordinator: tracker arena, traversal cursor, and run phase.
//!
//! A context is local to one run of one test body. Hosts executing tests in
//! parallel hold one context per worker; nothing here is shared.

use crate::tree::{RunState, TrackerArena, TrackerId, TrackerKind, TrackerNode};

/// Name given to the implicit root section of every run.
pub const ROOT_NAME: &str = "{root}";

/// Phase of the whole run, as opposed to per-tracker [`RunState`].
///
/// `CompletedCycle` is entered whenever a close or fail returns the cursor to
/// a parent; acquisitions in that phase are pure lookups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunPhase {
    #[default]
    NotStarted,
    Executing,
    CompletedCycle,
}

/// Coordinator for one run: owns the tracker tree, the current-tracker
/// cursor, and the run phase.
#[derive(Debug, Default)]
pub struct TrackerContext {
    arena: TrackerArena,
    root: Option<TrackerId>,
    current: Option<TrackerId>,
    run_phase: RunPhase,
}

impl TrackerContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a run: allocate a fresh root section named `{root}` and return
    /// its id. The cursor stays unset until the first [`begin_cycle`].
    ///
    /// [`begin_cycle`]: TrackerContext::begin_cycle
    pub fn begin_run(&mut self) -> TrackerId {
        self.arena.clear();
        let root = self.arena.alloc(ROOT_NAME, TrackerKind::Section, None);
        self.root = Some(root);
        self.current = None;
        // Overwritten by the first begin_cycle; marks "in a run" until then.
        self.run_phase = RunPhase::Executing;
        root
    }

    /// Discard the whole tracker tree and return to the between-runs state.
    pub fn end_run(&mut self) {
        self.arena.clear();
        self.root = None;
        self.current = None;
        self.run_phase = RunPhase::NotStarted;
    }

    /// Point the cursor at the root and mark the cycle as executing.
    ///
    /// # Panics
    ///
    /// If no run has begun.
    pub fn begin_cycle(&mut self) {
        let root = self.root.expect("begin_cycle before begin_run");
        self.current = Some(root);
        self.run_phase = RunPhase::Executing;
    }

    /// True once a close or fail has returned the cursor to a parent this
    /// cycle. Reset by [`begin_cycle`](TrackerContext::begin_cycle).
    pub fn cycle_completed(&self) -> bool {
        self.run_phase == RunPhase::CompletedCycle
    }

    pub(crate) fn complete_cycle(&mut self) {
        self.run_phase = RunPhase::CompletedCycle;
    }

    pub fn run_phase(&self) -> RunPhase {
        self.run_phase
    }

    pub fn root(&self) -> Option<TrackerId> {
        self.root
    }

    pub fn current_tracker(&self) -> Option<TrackerId> {
        self.current
    }

    pub(crate) fn current_id(&self) -> TrackerId {
        self.current
            .expect("no current tracker (call begin_cycle first)")
    }

    pub(crate) fn set_current(&mut self, id: TrackerId) {
        self.current = Some(id);
    }

    /// Look up a child of the current tracker by name.
    pub fn find_child(&self, name: &str) -> Option<TrackerId> {
        self.current
            .and_then(|current| self.arena.find_child(current, name))
    }

    pub(crate) fn alloc(&mut self, name: &str, kind: TrackerKind, parent: TrackerId) -> TrackerId {
        self.arena.alloc(name, kind, Some(parent))
    }

    pub(crate) fn node_mut(&mut self, id: TrackerId) -> &mut TrackerNode {
        self.arena.node_mut(id)
    }

    pub fn name(&self, id: TrackerId) -> &str {
        &self.arena.node(id).name
    }

    pub fn kind(&self, id: TrackerId) -> TrackerKind {
        self.arena.node(id).kind
    }

    pub fn state(&self, id: TrackerId) -> RunState {
        self.arena.node(id).state
    }

    pub fn parent(&self, id: TrackerId) -> Option<TrackerId> {
        self.arena.node(id).parent
    }

    pub fn children(&self, id: TrackerId) -> &[TrackerId] {
        &self.arena.node(id).children
    }

    pub fn has_started(&self, id: TrackerId) -> bool {
        self.arena.node(id).has_started()
    }

    pub fn has_ended(&self, id: TrackerId) -> bool {
        self.arena.node(id).has_ended()
    }

    pub fn is_open(&self, id: TrackerId) -> bool {
        self.arena.node(id).is_open()
    }

    pub fn is_successfully_completed(&self, id: TrackerId) -> bool {
        self.arena.node(id).is_successfully_completed()
    }

    /// Index produced by the most recent advance of a generator tracker,
    /// always in `[0, size)`.
    ///
    /// # Panics
    ///
    /// If `id` is not a generator or has not been advanced this run. Both
    /// indicate macro-layer misuse: an acquired generator is always advanced
    /// before its body can observe it.
    pub fn generator_index(&self, id: TrackerId) -> usize {
        match self.arena.node(id).kind {
            TrackerKind::Generator {
                index: Some(index), ..
            } => index,
            TrackerKind::Generator { index: None, .. } => {
                panic!("generator '{}' has not been advanced", self.name(id))
            }
            TrackerKind::Section => panic!("tracker '{}' is not a generator", self.name(id)),
        }
    }

    /// Declared size of a generator tracker.
    ///
    /// # Panics
    ///
    /// If `id` is not a generator.
    pub fn generator_size(&self, id: TrackerId) -> usize {
        match self.arena.node(id).kind {
            TrackerKind::Generator { size, .. } => size,
            TrackerKind::Section => panic!("tracker '{}' is not a generator", self.name(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_run_creates_unstarted_root_and_no_cursor() {
        let mut ctx = TrackerContext::new();
        let root = ctx.begin_run();

        assert_eq!(ctx.name(root), ROOT_NAME);
        assert_eq!(ctx.root(), Some(root));
        assert_eq!(ctx.current_tracker(), None);
        assert_eq!(ctx.run_phase(), RunPhase::Executing);
        assert!(!ctx.has_started(root));
    }

    #[test]
    fn begin_cycle_points_cursor_at_root() {
        let mut ctx = TrackerContext::new();
        let root = ctx.begin_run();
        ctx.begin_cycle();

        assert_eq!(ctx.current_tracker(), Some(root));
        assert!(!ctx.cycle_completed());
    }

    #[test]
    fn end_run_discards_tree_and_resets_phase() {
        let mut ctx = TrackerContext::new();
        ctx.begin_run();
        ctx.begin_cycle();
        ctx.end_run();

        assert_eq!(ctx.root(), None);
        assert_eq!(ctx.current_tracker(), None);
        assert_eq!(ctx.run_phase(), RunPhase::NotStarted);
    }

    #[test]
    fn find_child_searches_under_the_cursor() {
        let mut ctx = TrackerContext::new();
        let root = ctx.begin_run();
        ctx.begin_cycle();
        let child = ctx.alloc("child", TrackerKind::Section, root);

        assert_eq!(ctx.find_child("child"), Some(child));
        assert_eq!(ctx.find_child("other"), None);
    }

    #[test]
    #[should_panic(expected = "begin_cycle before begin_run")]
    fn begin_cycle_without_run_panics() {
        let mut ctx = TrackerContext::new();
        ctx.begin_cycle();
    }
}
