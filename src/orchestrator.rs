//! Runs the benchmark list across revisions and compares the results.
//!
//! Sequence: resolve revisions, check the working copy is clean, benchmark
//! each historical revision in order, benchmark HEAD, compare every
//! historical result set against HEAD, then restore the original checkout.
//! Restoration happens on every exit path once a checkout has occurred.

use serde::Serialize;
use tracing::info;

use crate::compare::{compare, Comparison};
use crate::config::ResolvedBenchmark;
use crate::error::Result;
use crate::runner::BenchRunner;
use crate::suite::{BenchmarkSuite, ResultSet};
use crate::vcs::{RevisionController, RevisionId, SourceControl};

pub const HEAD_LABEL: &str = "HEAD";

/// Everything the orchestrator needs, built once by the caller.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub command: String,
    pub benchmarks: Vec<ResolvedBenchmark>,
    /// Reference for the baseline revision, e.g. `HEAD~1` or `main`.
    pub base_ref: String,
    /// Also compare against the highest semver tag.
    pub compare_release: bool,
}

/// A historical revision to benchmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionTarget {
    pub label: String,
    pub revision: RevisionId,
    /// Set for release revisions; drives version-constraint gating.
    pub release_tag: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevisionResults {
    pub label: String,
    pub revision: RevisionId,
    pub results: ResultSet,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub head: RevisionId,
    /// Historical revisions in run order, then HEAD.
    pub revisions: Vec<RevisionResults>,
    pub comparisons: Vec<Comparison>,
    pub regressed: bool,
}

pub struct Orchestrator<S, R> {
    controller: RevisionController<S>,
    runner: R,
    settings: RunSettings,
}

impl<S: SourceControl, R: BenchRunner> Orchestrator<S, R> {
    pub fn new(scm: S, runner: R, settings: RunSettings) -> Self {
        Self {
            controller: RevisionController::new(scm),
            runner,
            settings,
        }
    }

    pub fn controller(&self) -> &RevisionController<S> {
        &self.controller
    }

    /// Resolve the historical revisions to benchmark, in run order.
    pub fn plan(&self) -> Result<Vec<RevisionTarget>> {
        let mut targets = vec![RevisionTarget {
            label: self.settings.base_ref.clone(),
            revision: self.controller.resolve_revision(&self.settings.base_ref)?,
            release_tag: None,
        }];

        if self.settings.compare_release {
            let release = self.controller.resolve_latest_release_tag()?;
            info!(tag = %release.name, version = %release.version, "latest release");
            targets.push(RevisionTarget {
                label: release.name.clone(),
                revision: release.revision,
                release_tag: Some(release.name),
            });
        }
        Ok(targets)
    }

    pub fn run(&self) -> Result<RunOutcome> {
        let head = self.controller.resolve_head()?;
        let targets = self.plan()?;

        let mut session = self.controller.begin()?;
        let suite = BenchmarkSuite::new(
            &self.settings.command,
            &self.settings.benchmarks,
            &self.runner,
        );

        let mut revisions = Vec::with_capacity(targets.len() + 1);
        for target in &targets {
            info!(label = %target.label, revision = %target.revision.short(), "running benchmarks");
            let results = session.with_checkout(&target.revision, || {
                suite.run(target.release_tag.as_deref())
            })?;
            revisions.push(RevisionResults {
                label: target.label.clone(),
                revision: target.revision.clone(),
                results,
            });
        }

        info!(label = HEAD_LABEL, revision = %head.short(), "running benchmarks");
        let head_results = session.with_checkout(&head, || suite.run(None))?;

        let comparisons: Vec<Comparison> = revisions
            .iter()
            .map(|base| {
                compare(
                    suite.benchmarks(),
                    HEAD_LABEL,
                    &head_results,
                    &base.label,
                    &base.results,
                )
            })
            .collect();
        let regressed = comparisons.iter().any(|c| c.regressed);

        session.restore();

        revisions.push(RevisionResults {
            label: HEAD_LABEL.to_string(),
            revision: head.clone(),
            results: head_results,
        });

        Ok(RunOutcome {
            head,
            revisions,
            comparisons,
            regressed,
        })
    }
}
