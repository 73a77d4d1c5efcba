//! Multi-group run loop

use tracing::{error, info};

use super::orchestrator::{GroupOrchestrator, GroupOutcome};
use super::PipelineError;
use crate::catalog::Groups;

/// Tally of a whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub committed: usize,
    pub skipped: usize,
    pub incomplete: usize,
    pub failed: usize,
}

/// Build every selected group in order.
///
/// A fatal error stops the run; any other group failure is logged and the
/// next group is attempted.
pub fn run_groups(
    orchestrator: &mut GroupOrchestrator,
    groups: &Groups,
    selection: &[usize],
) -> Result<RunSummary, PipelineError> {
    let mut summary = RunSummary::default();

    for &group_idx in selection {
        let Some(sources) = groups.get(group_idx) else {
            return Err(PipelineError::Config(format!(
                "group {} is not in the catalog ({} groups)",
                group_idx,
                groups.len()
            )));
        };

        match orchestrator.run(group_idx, sources) {
            Ok(GroupOutcome::Skipped) => summary.skipped += 1,
            Ok(GroupOutcome::Committed(_)) => summary.committed += 1,
            Ok(GroupOutcome::Incomplete(_)) => summary.incomplete += 1,
            Err(e) if e.is_fatal() => {
                error!(group = group_idx, "Aborting run: {}", e);
                return Err(e);
            }
            Err(e) => {
                error!(group = group_idx, "Group failed: {}", e);
                summary.failed += 1;
            }
        }
    }

    info!(
        "Run finished: {} committed, {} skipped, {} incomplete, {} failed",
        summary.committed, summary.skipped, summary.incomplete, summary.failed
    );
    Ok(summary)
}
