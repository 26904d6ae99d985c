//! Cycle-loop driver and the block helpers test bodies are written with.
//!
//! [`run_test`] packages the caller protocol: one run is a sequence of
//! cycles, each executing the whole body once, until the test-case tracker
//! has ended. [`section`] and [`generator`] are the expansions a host
//! framework's block macros forward to.

use anyhow::Result;
use tracing::{debug, instrument};

use crate::context::TrackerContext;
use crate::core::acquire::{acquire_generator, acquire_section};
use crate::core::invariants::validate_invariants;
use crate::core::path::tracker_path;
use crate::core::state::{close, fail};
use crate::report::{self, TrackerReport};

/// Configuration for one tracked run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Upper bound on cycles before the run is abandoned. A static section
    /// tree finishes in at most the product of its generator sizes along the
    /// widest path; the bound turns a protocol-violating body (one that
    /// invents a fresh section name every cycle) into a reported stop
    /// instead of a hang.
    pub max_cycles: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { max_cycles: 1024 }
    }
}

/// Reason why [`run_test`] stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStop {
    /// The test-case tracker ended: every reachable leaf has been visited.
    Complete,
    /// The run exceeded the configured `max_cycles`.
    CycleLimitExceeded { cycles: u32, max_cycles: u32 },
}

/// One body failure, recorded at the tracker that was current when it
/// surfaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFailure {
    /// Deterministic `/`-joined path of the failed tracker.
    pub path: String,
    /// Cycle number (1-indexed) in which the failure surfaced.
    pub cycle: u32,
    pub message: String,
}

/// Summary of a tracked run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub cycles: u32,
    pub stop: RunStop,
    pub failures: Vec<RecordedFailure>,
    /// Snapshot of the tracker tree taken just before the run was discarded.
    pub tree: Option<TrackerReport>,
}

/// Run `body` once per cycle until the test-case tracker named `name` has
/// ended.
///
/// Each cycle acquires the test-case tracker under a fresh-or-resumed root,
/// executes the body when it opened, routes a body `Err` through `fail` on
/// the current tracker, and closes the test-case tracker. The run stops when
/// the cycle completed and the test-case tracker has ended, or at the cycle
/// bound.
#[instrument(skip_all, fields(test_case = %name))]
pub fn run_test<F>(name: &str, config: &RunConfig, mut body: F) -> RunOutcome
where
    F: FnMut(&mut TrackerContext) -> Result<()>,
{
    let mut ctx = TrackerContext::new();
    ctx.begin_run();
    let mut cycles = 0u32;
    let mut failures = Vec::new();

    let stop = loop {
        if cycles >= config.max_cycles {
            break RunStop::CycleLimitExceeded {
                cycles,
                max_cycles: config.max_cycles,
            };
        }
        ctx.begin_cycle();
        cycles += 1;

        let test_case = acquire_section(&mut ctx, name);
        if ctx.is_open(test_case) {
            if let Err(err) = body(&mut ctx) {
                // The unwind left the cursor on the tracker that was
                // executing when the body bailed.
                let failed = ctx
                    .current_tracker()
                    .expect("body failed with no current tracker");
                failures.push(RecordedFailure {
                    path: tracker_path(&ctx, failed),
                    cycle: cycles,
                    message: format!("{err:#}"),
                });
                fail(&mut ctx, failed);
            }
        }
        if !ctx.has_ended(test_case) {
            close(&mut ctx, test_case);
        }

        if cfg!(debug_assertions) {
            let errors = validate_invariants(&ctx);
            assert!(
                errors.is_empty(),
                "tracker invariants violated after cycle {cycles}: {}",
                errors.join("; ")
            );
        }

        if ctx.cycle_completed() && ctx.has_ended(test_case) {
            break RunStop::Complete;
        }
    };

    debug!(cycles, failures = failures.len(), "run finished");
    let tree = report::snapshot(&ctx);
    ctx.end_run();
    RunOutcome {
        cycles,
        stop,
        failures,
        tree,
    }
}

/// The expansion of a user-level section block: acquire, run `f` if the
/// section opened, close on exit.
///
/// An `Err` from `f` propagates without closing, leaving the cursor on the
/// tracker that was executing so the failure can be attributed to it.
pub fn section<F>(ctx: &mut TrackerContext, name: &str, f: F) -> Result<()>
where
    F: FnOnce(&mut TrackerContext) -> Result<()>,
{
    let id = acquire_section(ctx, name);
    if !ctx.is_open(id) {
        return Ok(());
    }
    f(ctx)?;
    if !ctx.has_ended(id) {
        close(ctx, id);
    }
    Ok(())
}

/// The expansion of a user-level generator block; `f` receives the index
/// produced for this cycle.
pub fn generator<F>(ctx: &mut TrackerContext, name: &str, size: usize, f: F) -> Result<()>
where
    F: FnOnce(&mut TrackerContext, usize) -> Result<()>,
{
    let id = acquire_generator(ctx, name, size);
    if !ctx.is_open(id) {
        return Ok(());
    }
    let index = ctx.generator_index(id);
    f(ctx, index)?;
    if !ctx.has_ended(id) {
        close(ctx, id);
    }
    Ok(())
}
