//! Serializable end-of-run snapshots for reporter consumption.
//!
//! The tracker core never talks to a reporter directly; hosts take a
//! [`snapshot`] before `end_run` discards the tree and feed it to whatever
//! output layer they run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::context::TrackerContext;
use crate::tree::{RunState, TrackerId, TrackerKind};

/// One tracker in a snapshot, with its subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerReport {
    pub name: String,
    #[serde(flatten)]
    pub kind: TrackerKind,
    pub state: RunState,
    pub children: Vec<TrackerReport>,
}

/// Leaf totals over one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTotals {
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
}

/// Snapshot the whole tracker tree. `None` between runs.
pub fn snapshot(ctx: &TrackerContext) -> Option<TrackerReport> {
    ctx.root().map(|root| snapshot_node(ctx, root))
}

fn snapshot_node(ctx: &TrackerContext, id: TrackerId) -> TrackerReport {
    TrackerReport {
        name: ctx.name(id).to_string(),
        kind: ctx.kind(id),
        state: ctx.state(id),
        children: ctx
            .children(id)
            .iter()
            .map(|&child| snapshot_node(ctx, child))
            .collect(),
    }
}

/// Count outcomes over a snapshot. A failed tracker counts as one failure
/// and absorbs its subtree: children it opened in earlier cycles stay
/// attached but are not counted separately. Other inner trackers defer to
/// their leaves.
pub fn totals(report: &TrackerReport) -> ReportTotals {
    let mut totals = ReportTotals::default();
    visit(report, &mut totals);
    totals
}

fn visit(node: &TrackerReport, totals: &mut ReportTotals) {
    if node.state == RunState::Failed {
        totals.failed += 1;
        return;
    }
    if node.children.is_empty() {
        match node.state {
            RunState::CompletedSuccessfully => totals.completed += 1,
            _ => totals.pending += 1,
        }
        return;
    }
    for child in &node.children {
        visit(child, totals);
    }
}

/// Render a snapshot as pretty JSON.
pub fn to_json(report: &TrackerReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("serialize tracker report")
}
