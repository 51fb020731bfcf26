use super::average::{query_number, AverageRow};
use super::results::TOTAL_LABEL;
use crate::model::{RunResult, System};
use crate::storage::csv::format_ms;
use std::collections::BTreeMap;
use std::path::Path;

pub fn print_run_summary(system: System, run: u32, result: &RunResult, path: &Path) {
    eprintln!(
        "{} run {}: {} queries, total {} ms -> {}",
        system,
        run,
        result.len(),
        format_ms(result.total_elapsed_ms),
        path.display()
    );
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompareRow {
    pub query: String,
    pub snowflake_ms: Option<f64>,
    pub embucket_ms: Option<f64>,
}

impl CompareRow {
    /// Embucket over Snowflake; `None` when either side is missing or Snowflake is 0.
    pub fn ratio(&self) -> Option<f64> {
        match (self.snowflake_ms, self.embucket_ms) {
            (Some(s), Some(e)) if s != 0.0 => Some(e / s),
            _ => None,
        }
    }
}

/// Joins both averages by label: per-query rows in numeric order, TOTAL last.
pub fn compare_rows(snowflake: &[AverageRow], embucket: &[AverageRow]) -> Vec<CompareRow> {
    let mut joined: BTreeMap<String, CompareRow> = BTreeMap::new();
    for r in snowflake {
        joined
            .entry(r.query.clone())
            .or_insert_with(|| empty_row(&r.query))
            .snowflake_ms = Some(r.total_ms);
    }
    for r in embucket {
        joined
            .entry(r.query.clone())
            .or_insert_with(|| empty_row(&r.query))
            .embucket_ms = Some(r.total_ms);
    }

    let mut rows: Vec<CompareRow> = joined.into_values().collect();
    rows.sort_by_key(|r| (r.query == TOTAL_LABEL, query_number(&r.query)));
    rows
}

fn empty_row(query: &str) -> CompareRow {
    CompareRow {
        query: query.to_string(),
        snowflake_ms: None,
        embucket_ms: None,
    }
}

pub fn render_compare(rows: &[CompareRow]) -> String {
    let cell = |v: Option<f64>| v.map(format_ms).unwrap_or_else(|| "-".to_string());
    let mut out = format!(
        "{:<12} {:>14} {:>14} {:>8}\n",
        "Query", "Snowflake ms", "Embucket ms", "Ratio"
    );
    for r in rows {
        let ratio = r
            .ratio()
            .map(|x| format!("{:.2}", x))
            .unwrap_or_else(|| "N/A".to_string());
        out.push_str(&format!(
            "{:<12} {:>14} {:>14} {:>8}\n",
            r.query,
            cell(r.snowflake_ms),
            cell(r.embucket_ms),
            ratio
        ));
    }
    out
}
