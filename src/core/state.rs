//! Tracker state machine transitions.
//!
//! Transitions live here as free functions over the context rather than as
//! node methods: moving the cursor on close and fail is context state, and
//! keeping it out of the nodes avoids back-pointer cycles. Along any
//! root-to-cursor path exactly one tracker is `Executing`; its ancestors are
//! `ExecutingChildren`.

use tracing::debug;

use crate::context::TrackerContext;
use crate::tree::{RunState, TrackerId, TrackerKind};

/// Open `id`: mark it `Executing`, point the cursor at it, and put every
/// ancestor into `ExecutingChildren`.
pub(crate) fn open(ctx: &mut TrackerContext, id: TrackerId) {
    ctx.node_mut(id).state = RunState::Executing;
    ctx.set_current(id);
    debug!(tracker = %ctx.name(id), "opened");
    if let Some(parent) = ctx.parent(id) {
        open_child(ctx, parent);
    }
}

/// Record that a descendant of `id` opened. Idempotent: recurses upward only
/// on the first transition into `ExecutingChildren`.
pub(crate) fn open_child(ctx: &mut TrackerContext, id: TrackerId) {
    if ctx.state(id) != RunState::ExecutingChildren {
        ctx.node_mut(id).state = RunState::ExecutingChildren;
        if let Some(parent) = ctx.parent(id) {
            open_child(ctx, parent);
        }
    }
}

/// Close `id` for this cycle.
///
/// Any still-open descendants are closed first (a generator whose body fell
/// off the end, for instance). The tracker then either ends
/// (`CompletedSuccessfully`), stays `ExecutingChildren` because a child still
/// has work for a later cycle, or re-arms from `NeedsAnotherRun` back to
/// `Executing`. A generator that completed an index with more remaining
/// re-arms itself the same way. Finally the cursor moves to the parent (it
/// stays put on the root) and the cycle is marked complete.
///
/// Closing a tracker that already ended is a no-op.
///
/// # Panics
///
/// If `id` never started, or if the cursor is outside `id`'s subtree so the
/// unwind would walk past the root. Both indicate macro-layer misuse.
pub fn close(ctx: &mut TrackerContext, id: TrackerId) {
    if ctx.has_ended(id) {
        return;
    }

    // Unwind still-open descendants between the cursor and this tracker.
    loop {
        let current = ctx.current_id();
        if current == id {
            break;
        }
        assert!(
            ctx.parent(current).is_some(),
            "cannot close '{}': it is not on the active path",
            ctx.name(id)
        );
        close(ctx, current);
    }

    let next = match ctx.state(id) {
        RunState::Executing => RunState::CompletedSuccessfully,
        RunState::ExecutingChildren => {
            if last_child_ended(ctx, id) {
                RunState::CompletedSuccessfully
            } else {
                // A child still has pending work; leave the subtree open for
                // a later cycle.
                RunState::ExecutingChildren
            }
        }
        RunState::NeedsAnotherRun => RunState::Executing,
        RunState::NotStarted => {
            panic!("cannot close '{}': it never started", ctx.name(id))
        }
        // Terminal states returned above.
        RunState::CompletedSuccessfully | RunState::Failed => unreachable!(),
    };
    ctx.node_mut(id).state = next;

    // A generator that completed one index with more remaining schedules
    // itself for re-entry; the next acquisition advances it.
    if let TrackerKind::Generator {
        size,
        index: Some(index),
    } = ctx.kind(id)
    {
        if next == RunState::CompletedSuccessfully && index + 1 < size {
            ctx.node_mut(id).state = RunState::Executing;
        }
    }

    debug!(tracker = %ctx.name(id), state = ?ctx.state(id), "closed");
    if let Some(parent) = ctx.parent(id) {
        ctx.set_current(parent);
    }
    ctx.complete_cycle();
}

/// Fail `id`: end it as `Failed`, mark the parent as needing another run so
/// later cycles can discover untouched siblings, and return the cursor to
/// the parent (it stays put on the root).
pub fn fail(ctx: &mut TrackerContext, id: TrackerId) {
    ctx.node_mut(id).state = RunState::Failed;
    debug!(tracker = %ctx.name(id), "failed");
    if let Some(parent) = ctx.parent(id) {
        mark_needs_another_run(ctx, parent);
        ctx.set_current(parent);
    }
    ctx.complete_cycle();
}

/// Record on `id` that a descendant failed and its subtree must be revisited
/// in a later cycle.
pub(crate) fn mark_needs_another_run(ctx: &mut TrackerContext, id: TrackerId) {
    ctx.node_mut(id).state = RunState::NeedsAnotherRun;
}

fn last_child_ended(ctx: &TrackerContext, id: TrackerId) -> bool {
    match ctx.children(id).last() {
        None => true,
        Some(&last) => ctx.has_ended(last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::acquire::{acquire_generator, acquire_section};
    use crate::test_support::started_context;

    #[test]
    fn open_marks_every_ancestor_as_executing_children() {
        let mut ctx = started_context();
        let tc = acquire_section(&mut ctx, "Testcase");
        let s1 = acquire_section(&mut ctx, "S1");

        assert_eq!(ctx.state(s1), RunState::Executing);
        assert_eq!(ctx.state(tc), RunState::ExecutingChildren);
        assert_eq!(
            ctx.state(ctx.root().expect("root")),
            RunState::ExecutingChildren
        );
        assert_eq!(ctx.current_tracker(), Some(s1));
    }

    #[test]
    fn close_moves_cursor_to_parent_and_completes_cycle() {
        let mut ctx = started_context();
        let tc = acquire_section(&mut ctx, "Testcase");
        let s1 = acquire_section(&mut ctx, "S1");

        close(&mut ctx, s1);

        assert!(ctx.is_successfully_completed(s1));
        assert_eq!(ctx.current_tracker(), Some(tc));
        assert!(ctx.cycle_completed());
    }

    /// Closing is idempotent on terminal states.
    #[test]
    fn close_is_a_noop_on_an_ended_tracker() {
        let mut ctx = started_context();
        let tc = acquire_section(&mut ctx, "Testcase");
        let s1 = acquire_section(&mut ctx, "S1");

        close(&mut ctx, s1);
        close(&mut ctx, s1);

        assert!(ctx.is_successfully_completed(s1));
        assert_eq!(ctx.current_tracker(), Some(tc));
    }

    #[test]
    fn close_drains_still_open_descendants() {
        let mut ctx = started_context();
        let _tc = acquire_section(&mut ctx, "Testcase");
        let s1 = acquire_section(&mut ctx, "S1");
        let g1 = acquire_generator(&mut ctx, "G1", 1);
        assert_eq!(ctx.current_tracker(), Some(g1));

        close(&mut ctx, s1);

        assert!(ctx.is_successfully_completed(g1));
        assert!(ctx.is_successfully_completed(s1));
    }

    #[test]
    fn fail_marks_parent_as_needing_another_run() {
        let mut ctx = started_context();
        let tc = acquire_section(&mut ctx, "Testcase");
        let s1 = acquire_section(&mut ctx, "S1");

        fail(&mut ctx, s1);

        assert_eq!(ctx.state(s1), RunState::Failed);
        assert_eq!(ctx.state(tc), RunState::NeedsAnotherRun);
        assert_eq!(ctx.current_tracker(), Some(tc));
        assert!(ctx.cycle_completed());
    }

    /// Closing a tracker in `NeedsAnotherRun` re-arms it instead of ending it.
    #[test]
    fn close_rearms_a_tracker_needing_another_run() {
        let mut ctx = started_context();
        let tc = acquire_section(&mut ctx, "Testcase");
        let s1 = acquire_section(&mut ctx, "S1");

        fail(&mut ctx, s1);
        close(&mut ctx, tc);

        assert_eq!(ctx.state(tc), RunState::Executing);
        assert!(!ctx.has_ended(tc));
    }

    /// Root close is allowed: the cycle completes and the cursor stays put.
    #[test]
    fn closing_the_root_leaves_the_cursor_on_the_root() {
        let mut ctx = started_context();
        let root = ctx.root().expect("root");
        let tc = acquire_section(&mut ctx, "Testcase");
        close(&mut ctx, tc);

        close(&mut ctx, root);

        assert!(ctx.is_successfully_completed(root));
        assert_eq!(ctx.current_tracker(), Some(root));
        assert!(ctx.cycle_completed());
    }

    #[test]
    #[should_panic(expected = "not on the active path")]
    fn closing_an_unstarted_tracker_panics() {
        let mut ctx = started_context();
        let tc = acquire_section(&mut ctx, "Testcase");
        let s1 = acquire_section(&mut ctx, "S1");
        close(&mut ctx, s1);
        // Cycle already completed, so this sibling is created but not opened.
        let s2 = acquire_section(&mut ctx, "S2");
        close(&mut ctx, tc);

        close(&mut ctx, s2);
    }
}
