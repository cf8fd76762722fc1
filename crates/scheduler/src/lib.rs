//! Orchestrates the pull/analyze/apply/brief pipeline phases (§4.7, §5).
//! Each phase is a standalone async function so the CLI can drive them one
//! at a time (`triage pull`, `triage triage`, `triage brief`) without
//! standing up the full worker-pool scheduler.

pub mod analyze;
pub mod apply;
pub mod backoff;
pub mod brief;
pub mod learn;
pub mod pull;

pub use analyze::{run_analyze_phase, AnalyzePhase};
pub use apply::run_apply_phase;
pub use backoff::Backoff;
pub use brief::generate_brief;
pub use learn::{run_learn_phase, LearnOutcome};
pub use pull::{run_pull_phase, wait_out_rate_limit, PullError, PullOutcome};
