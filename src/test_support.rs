//! Test-only helpers for driving tracker contexts deterministically.

use std::sync::Once;

use crate::context::TrackerContext;
use crate::core::acquire::acquire_section;
use crate::tree::TrackerId;

static TRACING: Once = Once::new();

/// Context with a run and its first cycle already begun. The first call also
/// installs the dev tracing subscriber so `RUST_LOG` works under tests.
pub fn started_context() -> TrackerContext {
    TRACING.call_once(crate::logging::init);
    let mut ctx = TrackerContext::new();
    ctx.begin_run();
    ctx.begin_cycle();
    ctx
}

/// Acquire a chain of nested sections, returning ids outermost first.
pub fn open_path(ctx: &mut TrackerContext, names: &[&str]) -> Vec<TrackerId> {
    names
        .iter()
        .map(|name| acquire_section(ctx, name))
        .collect()
}
