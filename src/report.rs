//! Terminal tables for results and comparisons.

use std::io::{self, Write};

use colored::{Color, Colorize};

use crate::compare::{Comparison, RatioRow, ResultRow};
use crate::orchestrator::RunOutcome;

/// Ratios smaller than this in magnitude print as `0.00%`.
const RATIO_EPSILON: f64 = 0.0001;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    /// Hide the results table and any ratio row that did not regress.
    pub only_regression: bool,
    pub color: bool,
}

/// Absolute percentage with two decimals; the sign is shown by colour.
pub fn format_ratio(ratio: f64) -> String {
    let ratio = if ratio.abs() < RATIO_EPSILON { 0.0 } else { ratio };
    format!("{:.2}%", 100.0 * ratio.abs())
}

fn ratio_color(ratio: f64) -> Color {
    if ratio > 0.0 {
        Color::BrightRed
    } else {
        Color::Blue
    }
}

struct Cell {
    text: String,
    color: Option<Color>,
}

impl Cell {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
        }
    }
}

struct Table {
    headers: Vec<&'static str>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    fn new(headers: Vec<&'static str>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.text.chars().count());
            }
        }
        widths
    }

    fn write(&self, w: &mut impl Write, color: bool) -> io::Result<()> {
        let widths = self.widths();
        let rule: String = widths
            .iter()
            .map(|n| format!("+{}", "-".repeat(n + 2)))
            .collect::<String>()
            + "+";

        writeln!(w, "{rule}")?;
        for (h, &n) in self.headers.iter().zip(&widths) {
            write!(w, "| {h:^n$} ")?;
        }
        writeln!(w, "|")?;
        writeln!(w, "{rule}")?;

        for row in &self.rows {
            for (cell, &n) in row.iter().zip(&widths) {
                let padded = format!("{:^n$}", cell.text);
                match cell.color {
                    Some(c) if color => write!(w, "| {} ", padded.color(c).bold())?,
                    _ => write!(w, "| {padded} ")?,
                }
            }
            writeln!(w, "|")?;
            writeln!(w, "{rule}")?;
        }
        Ok(())
    }
}

fn heading(w: &mut impl Write, title: &str) -> io::Result<()> {
    writeln!(w, "\n{title}")?;
    writeln!(w, "{}\n", "=".repeat(title.chars().count()))
}

/// Result rows across all comparisons, grouped by benchmark in first-seen
/// order with each (benchmark, revision) pair once.
fn merged_rows(comparisons: &[Comparison]) -> Vec<&ResultRow> {
    let mut order: Vec<&str> = Vec::new();
    let mut rows: Vec<&ResultRow> = Vec::new();
    for row in comparisons.iter().flat_map(|c| &c.rows) {
        if rows
            .iter()
            .any(|r| r.name == row.name && r.revision == row.revision)
        {
            continue;
        }
        if !order.contains(&row.name.as_str()) {
            order.push(&row.name);
        }
        rows.push(row);
    }
    rows.sort_by_key(|r| order.iter().position(|n| *n == r.name));
    rows
}

pub fn write_results(w: &mut impl Write, comparisons: &[Comparison]) -> io::Result<()> {
    let mut table = Table::new(vec!["Name", "Revision", "NsPerOp", "AllocedBytesPerOp"]);
    let mut previous: Option<&str> = None;
    for row in merged_rows(comparisons) {
        let name = if previous == Some(row.name.as_str()) {
            String::new()
        } else {
            row.name.clone()
        };
        previous = Some(row.name.as_str());

        let (ns, bytes) = match &row.measurement {
            Some(m) => (
                format!("{:.2} ns/op", m.ns_per_op),
                format!("{} B/op", m.allocated_bytes_per_op),
            ),
            None => ("-".to_string(), "-".to_string()),
        };
        table.rows.push(vec![
            Cell::plain(name),
            Cell::plain(row.revision.clone()),
            Cell::plain(ns),
            Cell::plain(bytes),
        ]);
    }

    heading(w, "Result")?;
    table.write(w, false)
}

fn ratio_cells(row: &RatioRow) -> Vec<Cell> {
    let metric = |selected: bool, ratio: f64| {
        if selected {
            Cell {
                text: format_ratio(ratio),
                color: Some(ratio_color(ratio)),
            }
        } else {
            Cell::plain("-")
        }
    };
    vec![
        Cell::plain(row.name.clone()),
        metric(row.selection.ns_per_op, row.ratio_ns_per_op),
        metric(row.selection.bytes_per_op, row.ratio_bytes_per_op),
    ]
}

/// Write one comparison table. Returns `false` when no row survived
/// filtering, in which case nothing is written.
pub fn write_comparison(
    w: &mut impl Write,
    comparison: &Comparison,
    opts: ReportOptions,
) -> io::Result<bool> {
    let mut table = Table::new(vec!["Name", "NsPerOp", "AllocedBytesPerOp"]);
    table.rows = if opts.only_regression {
        comparison.regressions().map(ratio_cells).collect()
    } else {
        comparison.ratios.iter().map(ratio_cells).collect()
    };

    if table.rows.is_empty() {
        return Ok(false);
    }

    heading(
        w,
        &format!(
            "Comparison: {} vs {}",
            comparison.current_label, comparison.baseline_label
        ),
    )?;
    table.write(w, opts.color)?;
    writeln!(w)?;
    Ok(true)
}

/// Render the whole run.
pub fn write_outcome(w: &mut impl Write, outcome: &RunOutcome, opts: ReportOptions) -> io::Result<()> {
    if !opts.only_regression {
        write_results(w, &outcome.comparisons)?;
    }
    for comparison in &outcome.comparisons {
        write_comparison(w, comparison, opts)?;
    }
    Ok(())
}
