//! Query provider: ordered, parametrized benchmark queries.

use crate::errors::ConfigError;
use crate::model::{BenchmarkType, QueryTask};

pub mod tables;
pub mod tpch;

pub use tables::TableNaming;

/// The ordered task list for `benchmark`, with table names rendered by `naming`.
pub fn queries(benchmark: BenchmarkType, naming: &TableNaming) -> Result<Vec<QueryTask>, ConfigError> {
    match benchmark {
        BenchmarkType::Tpch => Ok(tpch::QUERIES
            .iter()
            .map(|(n, sql)| QueryTask {
                sequence_number: *n,
                name: format!("tpch-q{}", n),
                sql: naming.apply(sql.trim()),
            })
            .collect()),
        BenchmarkType::Tpcds => Err(ConfigError(
            "benchmark type 'tpcds' is not implemented yet".into(),
        )),
    }
}
