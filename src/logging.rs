//! Development-time tracing for debugging tracker traversal.
//!
//! Cycle traversal is hard to follow from assertions alone: state
//! transitions log under `debug` with a `tracker` field, acquisitions log
//! creation and advance events, and the run driver wraps each run in a
//! `test_case` span. This module wires those into a stderr subscriber gated
//! by `RUST_LOG`. Reporter-facing output lives in `report` and is unaffected.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize development logging for tracker traversal.
///
/// The filter comes from `RUST_LOG`; unset, it shows this crate's open,
/// close, fail, and advance transitions at `debug`. The run driver's
/// `test_case` span is logged when it closes, so per-run transition logs end
/// with the run they belong to.
///
/// # Example
/// ```bash
/// RUST_LOG=part_tracker=debug cargo test
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("part_tracker=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_span_events(FmtSpan::CLOSE)
                .compact(),
        )
        .init();
}
