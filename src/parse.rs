//! Parser for textual benchmark output.
//!
//! Each result line looks like
//!
//! ```text
//! BenchmarkEncode-4   	  300000	      4120 ns/op	     512 B/op	       3 allocs/op
//! ```
//!
//! i.e. a name starting with `Benchmark`, an iteration count, then
//! `value unit` pairs. Everything else in the output is ignored.

use serde::{Deserialize, Serialize};

/// One parsed benchmark line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub name: String,
    pub iterations: u64,
    pub ns_per_op: f64,
    pub allocated_bytes_per_op: u64,
    pub allocs_per_op: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mb_per_s: Option<f64>,
}

impl Measurement {
    /// Parse a single line; `None` if it is not a benchmark result.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let name = fields.next()?;
        if !name.starts_with("Benchmark") {
            return None;
        }
        let iterations = fields.next()?.parse::<u64>().ok()?;

        let mut m = Measurement {
            name: name.to_string(),
            iterations,
            ..Default::default()
        };

        let rest: Vec<&str> = fields.collect();
        for pair in rest.chunks_exact(2) {
            let (value, unit) = (pair[0], pair[1]);
            match unit {
                "ns/op" => m.ns_per_op = value.parse().ok()?,
                "B/op" => m.allocated_bytes_per_op = value.parse().ok()?,
                "allocs/op" => m.allocs_per_op = value.parse().ok()?,
                "MB/s" => m.mb_per_s = Some(value.parse().ok()?),
                _ => {}
            }
        }
        Some(m)
    }
}

/// Extract every measurement from a run's stdout, in order.
pub fn parse_output(output: &str) -> Vec<Measurement> {
    output.lines().filter_map(Measurement::parse_line).collect()
}
