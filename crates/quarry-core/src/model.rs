use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two compared backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum System {
    /// Warehouse-scoped: cold state via suspend/resume.
    Snowflake,
    /// Container-scoped: cold state via container restart.
    Embucket,
}

impl System {
    pub const ALL: [System; 2] = [System::Snowflake, System::Embucket];

    pub fn as_str(&self) -> &'static str {
        match self {
            System::Snowflake => "snowflake",
            System::Embucket => "embucket",
        }
    }
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for System {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snowflake" => Ok(System::Snowflake),
            "embucket" => Ok(System::Embucket),
            other => Err(ConfigError(format!(
                "unsupported system '{}' (expected snowflake or embucket)",
                other
            ))),
        }
    }
}

/// Which backends a run invocation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Snowflake,
    Embucket,
    Both,
}

impl Target {
    /// Execution order within one iteration.
    pub fn systems(&self) -> &'static [System] {
        match self {
            Target::Snowflake => &[System::Snowflake],
            Target::Embucket => &[System::Embucket],
            Target::Both => &System::ALL,
        }
    }
}

impl FromStr for Target {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snowflake" => Ok(Target::Snowflake),
            "embucket" => Ok(Target::Embucket),
            "both" => Ok(Target::Both),
            other => Err(ConfigError(format!(
                "unsupported system selector '{}' (expected snowflake, embucket or both)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkType {
    #[default]
    Tpch,
    /// Reserved; selecting its queries is a configuration error.
    Tpcds,
}

impl BenchmarkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BenchmarkType::Tpch => "tpch",
            BenchmarkType::Tpcds => "tpcds",
        }
    }
}

impl fmt::Display for BenchmarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BenchmarkType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tpch" => Ok(BenchmarkType::Tpch),
            "tpcds" => Ok(BenchmarkType::Tpcds),
            other => Err(ConfigError(format!(
                "unsupported benchmark type '{}' (expected tpch or tpcds)",
                other
            ))),
        }
    }
}

/// Whether a run may reuse warm state on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    Enabled,
    #[default]
    Disabled,
}

impl CacheMode {
    pub fn from_flag(cache: bool) -> Self {
        if cache {
            CacheMode::Enabled
        } else {
            CacheMode::Disabled
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, CacheMode::Enabled)
    }

    /// Directory segment used in the results layout.
    pub fn dir_name(&self) -> &'static str {
        match self {
            CacheMode::Enabled => "cached",
            CacheMode::Disabled => "no_cache",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTask {
    pub sequence_number: u32,
    /// Label written to the Query column, e.g. `tpch-q7`.
    pub name: String,
    pub sql: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    pub sequence_number: u32,
    pub name: String,
    pub query_id: String,
    pub elapsed_ms: f64,
    pub row_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunResult {
    pub records: Vec<ExecutionRecord>,
    pub total_elapsed_ms: f64,
}

impl RunResult {
    /// Pre-paired records and total, as accumulated by a driver.
    pub fn new(records: Vec<ExecutionRecord>, total_elapsed_ms: f64) -> Self {
        Self {
            records,
            total_elapsed_ms,
        }
    }

    /// Total computed by summation.
    pub fn from_records(records: Vec<ExecutionRecord>) -> Self {
        let total = records.iter().map(|r| r.elapsed_ms).sum();
        Self::new(records, total)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
