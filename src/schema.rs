use std::fs;
use std::io;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::compare::Comparison;
use crate::orchestrator::{RevisionResults, RunOutcome};
use crate::vcs::RevisionId;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub schema_version: u32,
    pub tool_version: String,
    pub timestamp_utc: String,
    pub head: RevisionId,
    pub regressed: bool,
}

/// JSON report written with `--out`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport<'a> {
    pub run: RunMeta,
    pub revisions: &'a [RevisionResults],
    pub comparisons: &'a [Comparison],
}

impl<'a> RunReport<'a> {
    pub fn new(outcome: &'a RunOutcome) -> Self {
        Self {
            run: RunMeta {
                schema_version: SCHEMA_VERSION,
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
                timestamp_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                head: outcome.head.clone(),
                regressed: outcome.regressed,
            },
            revisions: &outcome.revisions,
            comparisons: &outcome.comparisons,
        }
    }

    pub fn write(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::compare;
    use crate::suite::ResultSet;
    use crate::testing::{measurement, resolved_with, rev};
    use tempfile::tempdir;

    #[test]
    fn test_write_report() {
        let benchmarks = vec![resolved_with("BenchmarkA", 0.2, "ns/op")];
        let head: ResultSet = [("BenchmarkA".to_string(), measurement("BenchmarkA", 150.0, 0))]
            .into_iter()
            .collect();
        let base: ResultSet = [("BenchmarkA".to_string(), measurement("BenchmarkA", 100.0, 0))]
            .into_iter()
            .collect();
        let comparison = compare(&benchmarks, "HEAD", &head, "HEAD~1", &base);
        let outcome = RunOutcome {
            head: rev("abc123"),
            revisions: vec![
                RevisionResults {
                    label: "HEAD~1".to_string(),
                    revision: rev("def456"),
                    results: base,
                },
                RevisionResults {
                    label: "HEAD".to_string(),
                    revision: rev("abc123"),
                    results: head,
                },
            ],
            regressed: comparison.regressed,
            comparisons: vec![comparison],
        };

        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        RunReport::new(&outcome).write(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["run"]["schema_version"], 1);
        assert_eq!(value["run"]["head"], "abc123");
        assert_eq!(value["run"]["regressed"], true);
        let stamp = value["run"]["timestamp_utc"].as_str().unwrap();
        assert!(stamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
        assert_eq!(value["revisions"][0]["label"], "HEAD~1");
        assert_eq!(
            value["revisions"][1]["results"]["BenchmarkA"]["ns_per_op"],
            150.0
        );
        assert_eq!(value["comparisons"][0]["ratios"][0]["ratio_ns_per_op"], 0.5);
    }
}
