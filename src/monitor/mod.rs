//! Monitoring runs: acquire current state, compare against the stored
//! baseline, reconcile a verdict and persist the new baseline.

pub mod orchestrator;
pub mod types;

pub use orchestrator::{ChangeMonitor, SUMMARY_ERROR_PREFIX};
pub use types::{
    MonitorError, MonitorOptions, MonitorResult, NOT_COMPARABLE, RunOutcome, RunStatus, RunVerdict,
    VisualMetric,
};
