//! Find-or-create acquisition of sections and generators.
//!
//! Acquisition is the only way trackers enter the tree, which is what keeps
//! sibling discovery order equal to the order the body first names them.
//! Once the cycle has completed, acquisitions are pure lookups: the returned
//! tracker is left unopened and the macro layer skips its body.

use tracing::debug;

use crate::context::TrackerContext;
use crate::core::state;
use crate::tree::{RunState, TrackerId, TrackerKind};

/// Acquire the section named `name` under the current tracker, creating it on
/// first sight. Opens it (making it the current tracker) unless the cycle has
/// already completed or the section has already ended.
///
/// # Panics
///
/// If there is no current tracker, or a generator already holds `name` under
/// the same parent.
pub fn acquire_section(ctx: &mut TrackerContext, name: &str) -> TrackerId {
    let parent = ctx
        .current_tracker()
        .expect("no current tracker (call begin_cycle first)");
    let section = match ctx.find_child(name) {
        Some(existing) => {
            assert!(
                matches!(ctx.kind(existing), TrackerKind::Section),
                "tracker '{name}' already exists as a generator"
            );
            existing
        }
        None => {
            let id = ctx.alloc(name, TrackerKind::Section, parent);
            debug!(tracker = %name, "created section");
            id
        }
    };
    if !ctx.cycle_completed() && !ctx.has_ended(section) {
        state::open(ctx, section);
    }
    section
}

/// Acquire the generator named `name` under the current tracker, creating it
/// on first sight. Unless the cycle has completed or the generator has ended,
/// it is advanced to its next index (discarding the subtree built for the
/// previous one) whenever it is not mid-subtree, then opened.
///
/// The produced index is read with
/// [`TrackerContext::generator_index`].
///
/// # Panics
///
/// If `size` is zero, there is no current tracker, a section already holds
/// `name` under the same parent, or the generator was first acquired with a
/// different size.
pub fn acquire_generator(ctx: &mut TrackerContext, name: &str, size: usize) -> TrackerId {
    assert!(size > 0, "generator '{name}' must have size > 0");
    let parent = ctx
        .current_tracker()
        .expect("no current tracker (call begin_cycle first)");
    let generator = match ctx.find_child(name) {
        Some(existing) => {
            match ctx.kind(existing) {
                TrackerKind::Generator { size: stored, .. } => assert!(
                    stored == size,
                    "generator '{name}' re-acquired with size {size}, was {stored}"
                ),
                TrackerKind::Section => {
                    panic!("tracker '{name}' already exists as a section")
                }
            }
            existing
        }
        None => {
            let id = ctx.alloc(name, TrackerKind::Generator { size, index: None }, parent);
            debug!(tracker = %name, size, "created generator");
            id
        }
    };
    if !ctx.cycle_completed() && !ctx.has_ended(generator) {
        // Mid-subtree means the previous cycle left unfinished children for
        // this index; re-enter them instead of advancing.
        if ctx.state(generator) != RunState::ExecutingChildren {
            advance(ctx, generator);
        }
        state::open(ctx, generator);
    }
    generator
}

/// Move a generator to its next index, discarding the subtree built for the
/// previous one so each iteration rediscovers its children from scratch.
fn advance(ctx: &mut TrackerContext, id: TrackerId) {
    let node = ctx.node_mut(id);
    let TrackerKind::Generator { index, .. } = &mut node.kind else {
        unreachable!("advance on a section")
    };
    *index = Some(match *index {
        Some(current) => current + 1,
        None => 0,
    });
    node.children.clear();
    debug!(tracker = %ctx.name(id), index = ctx.generator_index(id), "advanced generator");
}
