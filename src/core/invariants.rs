//! Semantic invariants over the tracker tree.
//!
//! These hold at every point where control returns to the macro layer, for
//! any sequence of legal operations. Violations indicate a bug in the
//! tracker core, not in user code.

use std::collections::HashSet;

use crate::context::TrackerContext;
use crate::core::path::tracker_path;
use crate::tree::{RunState, TrackerId, TrackerKind};

/// Check semantic invariants of the tracker tree:
/// - Sibling names are unique under every parent
/// - A generator's `size > 0` and its advanced `index < size`
/// - Every proper ancestor of an `Executing` cursor is `ExecutingChildren`
/// - A successfully completed tracker's last child has ended
///
/// Returns a list of stable error messages (empty on success).
pub fn validate_invariants(ctx: &TrackerContext) -> Vec<String> {
    let mut errors = Vec::new();
    let Some(root) = ctx.root() else {
        return errors;
    };
    validate_node(ctx, root, &mut errors);
    validate_cursor(ctx, &mut errors);
    errors
}

fn validate_node(ctx: &TrackerContext, id: TrackerId, errors: &mut Vec<String>) {
    let path = tracker_path(ctx, id);

    let mut seen = HashSet::new();
    for &child in ctx.children(id) {
        if !seen.insert(ctx.name(child)) {
            errors.push(format!(
                "duplicate sibling name '{}' under {}",
                ctx.name(child),
                path
            ));
        }
    }

    if let TrackerKind::Generator { size, index } = ctx.kind(id) {
        if size == 0 {
            errors.push(format!("{}: generator size must be > 0", path));
        }
        if let Some(index) = index {
            if index >= size {
                errors.push(format!(
                    "{}: index {} out of range for size {}",
                    path, index, size
                ));
            }
        }
    }

    if ctx.is_successfully_completed(id) {
        if let Some(&last) = ctx.children(id).last() {
            if !ctx.has_ended(last) {
                errors.push(format!(
                    "{}: completed with unfinished last child '{}'",
                    path,
                    ctx.name(last)
                ));
            }
        }
    }

    for &child in ctx.children(id) {
        validate_node(ctx, child, errors);
    }
}

fn validate_cursor(ctx: &TrackerContext, errors: &mut Vec<String>) {
    let Some(current) = ctx.current_tracker() else {
        return;
    };
    if ctx.state(current) != RunState::Executing {
        return;
    }
    let mut cursor = ctx.parent(current);
    while let Some(ancestor) = cursor {
        if ctx.state(ancestor) != RunState::ExecutingChildren {
            errors.push(format!(
                "{}: ancestor of the executing cursor is not executing children",
                tracker_path(ctx, ancestor)
            ));
        }
        cursor = ctx.parent(ancestor);
    }
}
