//! Benchmark list configuration and three-level defaulting.
//!
//! Settings resolve per benchmark with precedence
//! per-benchmark > list-level > global (CLI flags). For each field the first
//! non-empty string, non-zero threshold or explicit flag wins.
//!
//! ```yaml
//! command: go
//! benchtime: 2s
//! threshold: 0.1
//! benchmarks:
//!   - name: BenchmarkEncode
//!     package: ./codec
//!   - name: BenchmarkDecode$
//!     package: ./codec
//!     uniqueName: decode
//!     compare: B/op
//!     version: ">=v1.4.0"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Command used when the configuration leaves `command` empty.
pub const DEFAULT_COMMAND: &str = "go";

/// Optional settings as written in YAML; shared by the list level and each
/// benchmark.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfiguration {
    pub benchtime: String,
    pub threshold: f64,
    pub compare: String,
    pub cpu: String,
    pub timeout: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmem: Option<bool>,
}

/// Fully resolved settings for one benchmark invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveConfig {
    pub benchtime: String,
    pub threshold: f64,
    pub compare: String,
    pub cpu: String,
    pub timeout: String,
    pub benchmem: bool,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            benchtime: "1s".to_string(),
            threshold: 0.2,
            compare: "ns/op,B/op".to_string(),
            cpu: "4".to_string(),
            timeout: "10m".to_string(),
            benchmem: true,
        }
    }
}

impl From<&EffectiveConfig> for BenchmarkConfiguration {
    fn from(c: &EffectiveConfig) -> Self {
        Self {
            benchtime: c.benchtime.clone(),
            threshold: c.threshold,
            compare: c.compare.clone(),
            cpu: c.cpu.clone(),
            timeout: c.timeout.clone(),
            benchmem: Some(c.benchmem),
        }
    }
}

fn first_str(values: [&str; 3]) -> String {
    values
        .into_iter()
        .find(|v| !v.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Merge the three levels into one effective configuration.
pub fn resolve(
    benchmark: &BenchmarkConfiguration,
    list: &BenchmarkConfiguration,
    global: &EffectiveConfig,
) -> EffectiveConfig {
    let threshold = [benchmark.threshold, list.threshold]
        .into_iter()
        .find(|t| *t != 0.0)
        .unwrap_or(global.threshold);

    EffectiveConfig {
        benchtime: first_str([
            benchmark.benchtime.as_str(),
            list.benchtime.as_str(),
            global.benchtime.as_str(),
        ]),
        threshold,
        compare: first_str([
            benchmark.compare.as_str(),
            list.compare.as_str(),
            global.compare.as_str(),
        ]),
        cpu: first_str([
            benchmark.cpu.as_str(),
            list.cpu.as_str(),
            global.cpu.as_str(),
        ]),
        timeout: first_str([
            benchmark.timeout.as_str(),
            list.timeout.as_str(),
            global.timeout.as_str(),
        ]),
        benchmem: benchmark.benchmem.or(list.benchmem).unwrap_or(global.benchmem),
    }
}

/// One benchmark entry as configured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Benchmark {
    pub name: String,
    pub package: String,
    pub unique_name: String,
    /// Version constraint gating release comparisons, e.g. `>=v1.4.0`.
    pub version: String,
    #[serde(flatten)]
    pub config: BenchmarkConfiguration,
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkList {
    #[serde(flatten)]
    pub defaults: BenchmarkConfiguration,
    pub command: String,
    pub benchmarks: Vec<Benchmark>,
}

impl BenchmarkList {
    pub fn from_yaml(path: &Path, text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(path, &text)
    }

    pub fn command(&self) -> &str {
        if self.command.trim().is_empty() {
            DEFAULT_COMMAND
        } else {
            &self.command
        }
    }

    /// Apply defaulting to every entry, preserving configured order.
    pub fn resolve(&self, global: &EffectiveConfig) -> Vec<ResolvedBenchmark> {
        self.benchmarks
            .iter()
            .map(|b| ResolvedBenchmark::new(b, &self.defaults, global))
            .collect()
    }
}

/// A benchmark with its unique name and settings filled in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedBenchmark {
    pub name: String,
    pub package: String,
    pub unique_name: String,
    pub version: String,
    pub config: EffectiveConfig,
}

impl ResolvedBenchmark {
    pub fn new(
        benchmark: &Benchmark,
        list: &BenchmarkConfiguration,
        global: &EffectiveConfig,
    ) -> Self {
        let unique_name = if benchmark.unique_name.is_empty() {
            benchmark.name.clone()
        } else {
            benchmark.unique_name.clone()
        };
        Self {
            name: benchmark.name.clone(),
            package: benchmark.package.clone(),
            unique_name,
            version: benchmark.version.clone(),
            config: resolve(&benchmark.config, list, global),
        }
    }
}
