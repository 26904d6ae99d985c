//! Helpers for rendering deterministic tracker paths.

use crate::context::TrackerContext;
use crate::tree::TrackerId;

/// Return the `/`-separated name path to `id`, rooted at the run's root.
pub fn tracker_path(ctx: &TrackerContext, id: TrackerId) -> String {
    let mut names = Vec::new();
    let mut cursor = Some(id);
    while let Some(node) = cursor {
        names.push(ctx.name(node).to_string());
        cursor = ctx.parent(node);
    }
    names.reverse();
    names.join("/")
}
