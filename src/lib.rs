//! Part tracker: the state machine behind re-entrant nested test sections
//! and data-driven generators.
//!
//! A test body containing named nested blocks is executed once per leaf path
//! through its section tree. [`context::TrackerContext`] remembers, across
//! those repeated executions, which blocks have been entered, which have
//! completed, and which generator indices have been produced.
//! [`run::run_test`] drives the cycle loop; [`run::section`] and
//! [`run::generator`] are what a host framework's block macros expand to.

pub mod context;
pub mod core;
pub mod logging;
pub mod report;
pub mod run;
pub mod test_support;
pub mod tree;
