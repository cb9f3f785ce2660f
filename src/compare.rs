//! Ratio computation and regression classification.
//!
//! Ratios are `(current - baseline) / baseline`. A zero baseline yields a
//! ratio of zero, which reads as "no change".

use std::collections::HashSet;

use serde::Serialize;
use tracing::warn;

use crate::config::ResolvedBenchmark;
use crate::parse::Measurement;
use crate::suite::ResultSet;

/// Metrics subject to the regression check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricSelection {
    pub ns_per_op: bool,
    pub bytes_per_op: bool,
}

impl MetricSelection {
    /// Parse a comma-separated list such as `ns/op,B/op`. Unknown tokens are
    /// ignored.
    pub fn parse(s: &str) -> Self {
        let mut sel = MetricSelection::default();
        for token in s.split(',') {
            match token.trim() {
                "ns/op" => sel.ns_per_op = true,
                "B/op" => sel.bytes_per_op = true,
                _ => {}
            }
        }
        sel
    }
}

pub fn ratio(current: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        0.0
    } else {
        (current - baseline) / baseline
    }
}

/// One line of the side-by-side results table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub name: String,
    pub revision: String,
    /// `None` when the revision produced no result for this benchmark.
    pub measurement: Option<Measurement>,
}

/// Per-benchmark ratios against one baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioRow {
    pub name: String,
    pub ratio_ns_per_op: f64,
    pub ratio_bytes_per_op: f64,
    pub threshold: f64,
    pub selection: MetricSelection,
    pub regressed: bool,
}

impl RatioRow {
    pub fn new(benchmark: &ResolvedBenchmark, current: &Measurement, baseline: &Measurement) -> Self {
        let selection = MetricSelection::parse(&benchmark.config.compare);
        let threshold = benchmark.config.threshold;
        let ratio_ns_per_op = ratio(current.ns_per_op, baseline.ns_per_op);
        let ratio_bytes_per_op = ratio(
            current.allocated_bytes_per_op as f64,
            baseline.allocated_bytes_per_op as f64,
        );
        let regressed = (selection.ns_per_op && ratio_ns_per_op > threshold)
            || (selection.bytes_per_op && ratio_bytes_per_op > threshold);

        Self {
            name: benchmark.unique_name.clone(),
            ratio_ns_per_op,
            ratio_bytes_per_op,
            threshold,
            selection,
            regressed,
        }
    }
}

/// Outcome of comparing the current revision against one baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub current_label: String,
    pub baseline_label: String,
    pub rows: Vec<ResultRow>,
    pub ratios: Vec<RatioRow>,
    pub regressed: bool,
}

impl Comparison {
    pub fn regressions(&self) -> impl Iterator<Item = &RatioRow> {
        self.ratios.iter().filter(|r| r.regressed)
    }
}

/// Compare `current` against `baseline` for every benchmark, in configured
/// order. Missing data produces placeholder rows and never an error.
pub fn compare(
    benchmarks: &[ResolvedBenchmark],
    current_label: &str,
    current: &ResultSet,
    baseline_label: &str,
    baseline: &ResultSet,
) -> Comparison {
    let mut rows = Vec::new();
    let mut ratios = Vec::new();
    let mut seen = HashSet::new();

    for benchmark in benchmarks {
        let name = &benchmark.unique_name;
        // The result set keeps only the first run of a unique name.
        if !seen.insert(name.as_str()) {
            warn!(benchmark = %name, "duplicate unique name; comparing the first entry only");
            continue;
        }
        let placeholder = |label: &str| ResultRow {
            name: name.clone(),
            revision: label.to_string(),
            measurement: None,
        };

        let Some(cur) = current.get(name) else {
            rows.push(placeholder(current_label));
            continue;
        };
        rows.push(ResultRow {
            name: name.clone(),
            revision: current_label.to_string(),
            measurement: Some(cur.clone()),
        });

        let Some(base) = baseline.get(name) else {
            rows.push(placeholder(baseline_label));
            continue;
        };
        rows.push(ResultRow {
            name: name.clone(),
            revision: baseline_label.to_string(),
            measurement: Some(base.clone()),
        });

        ratios.push(RatioRow::new(benchmark, cur, base));
    }

    let regressed = ratios.iter().any(|r| r.regressed);
    Comparison {
        current_label: current_label.to_string(),
        baseline_label: baseline_label.to_string(),
        rows,
        ratios,
        regressed,
    }
}
