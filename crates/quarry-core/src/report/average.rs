//! Averages `Total (ms)` across the run files of one result directory.

use super::results::TOTAL_LABEL;
use crate::errors::AggregateError;
use crate::model::System;
use crate::storage::csv::{format_ms, Table};
use crate::storage::layout::{scan_run_files, RunFile, AVERAGE_FILE_NAME};
use crate::storage::ResultKey;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const AVERAGE_HEADERS: [&str; 2] = ["Query", "Total (ms)"];
const QUERY_COL: &str = "Query";
const TOTAL_COL: &str = "Total (ms)";

#[derive(Debug, Clone, PartialEq)]
pub struct AverageRow {
    pub query: String,
    pub total_ms: f64,
}

/// Recomputes the average file for `key` and returns its path.
pub fn average_for_key(root: &Path, key: &ResultKey) -> anyhow::Result<PathBuf> {
    let dir = key.dir(root);
    let written = calculate_averages(&dir)?;
    written
        .into_iter()
        .find(|(system, _)| *system == key.system)
        .map(|(_, path)| path)
        .ok_or_else(|| {
            AggregateError::NoFiles {
                system: key.system.to_string(),
                dir: dir.display().to_string(),
            }
            .into()
        })
}

/// Groups the run files in `dir` by system and overwrites `avg_results.csv`
/// for every non-empty group.
pub fn calculate_averages(dir: &Path) -> anyhow::Result<Vec<(System, PathBuf)>> {
    let mut groups: BTreeMap<&'static str, (System, Vec<RunFile>)> = BTreeMap::new();
    for f in scan_run_files(dir)? {
        groups
            .entry(f.system.as_str())
            .or_insert_with(|| (f.system, Vec::new()))
            .1
            .push(f);
    }

    let mut written = Vec::new();
    for (_, (system, files)) in groups {
        let paths: Vec<PathBuf> = files.into_iter().map(|f| f.path).collect();
        let rows = average_files(&paths)?;

        let out = dir.join(AVERAGE_FILE_NAME);
        average_table(&rows).write(&out)?;
        tracing::info!(
            event = "quarry.average.written",
            system = %system,
            files = paths.len(),
            path = %out.display()
        );
        written.push((system, out));
    }
    Ok(written)
}

/// Position-wise mean over files whose rows are sorted by label. Every file
/// must carry the same label set.
pub fn average_files(paths: &[PathBuf]) -> anyhow::Result<Vec<AverageRow>> {
    let mut loaded: Vec<(String, Vec<(String, f64)>)> = Vec::with_capacity(paths.len());
    for p in paths {
        loaded.push((p.display().to_string(), load_sorted(p)?));
    }

    let Some((first_name, first_rows)) = loaded.first() else {
        return Ok(Vec::new());
    };

    for (name, rows) in &loaded[1..] {
        let same = rows.len() == first_rows.len()
            && rows.iter().zip(first_rows).all(|(a, b)| a.0 == b.0);
        if !same {
            return Err(AggregateError::LabelMismatch {
                first: first_name.clone(),
                other: name.clone(),
            }
            .into());
        }
    }

    let n = loaded.len() as f64;
    let mut out: Vec<AverageRow> = first_rows
        .iter()
        .enumerate()
        .map(|(i, (label, _))| AverageRow {
            query: label.clone(),
            total_ms: loaded.iter().map(|(_, rows)| rows[i].1).sum::<f64>() / n,
        })
        .collect();

    out.sort_by_key(|r| (r.query != TOTAL_LABEL, query_number(&r.query)));
    Ok(out)
}

pub fn average_table(rows: &[AverageRow]) -> Table {
    let mut t = Table::new(AVERAGE_HEADERS);
    for r in rows {
        t.push_row([r.query.clone(), format_ms(r.total_ms)]);
    }
    t
}

/// Reads an average file back.
pub fn read_average_file(path: &Path) -> anyhow::Result<Vec<AverageRow>> {
    let table = Table::read(path)?;
    let file = path.display().to_string();
    let q = column(&table, &file, QUERY_COL)?;
    let t = column(&table, &file, TOTAL_COL)?;
    (0..table.rows.len())
        .map(|i| -> anyhow::Result<AverageRow> {
            Ok(AverageRow {
                query: table.cell(i, q).to_string(),
                total_ms: parse_number(&file, table.cell(i, t))?,
            })
        })
        .collect()
}

fn load_sorted(path: &Path) -> anyhow::Result<Vec<(String, f64)>> {
    let table = Table::read(path)?;
    let file = path.display().to_string();
    let q = column(&table, &file, QUERY_COL)?;
    let t = column(&table, &file, TOTAL_COL)?;

    let mut rows = Vec::with_capacity(table.rows.len());
    for i in 0..table.rows.len() {
        rows.push((
            table.cell(i, q).to_string(),
            parse_number(&file, table.cell(i, t))?,
        ));
    }
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(rows)
}

fn column(table: &Table, file: &str, name: &str) -> Result<usize, AggregateError> {
    table
        .column_index(name)
        .ok_or_else(|| AggregateError::MissingColumn {
            file: file.to_string(),
            column: name.to_string(),
        })
}

fn parse_number(file: &str, raw: &str) -> Result<f64, AggregateError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0.0);
    }
    raw.parse().map_err(|_| AggregateError::BadNumber {
        file: file.to_string(),
        value: raw.to_string(),
    })
}

/// Numeric suffix of labels like `tpch-q12`; anything else sorts last.
pub fn query_number(label: &str) -> u64 {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"q(\d+)").expect("static regex"));
    re.captures(label)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(u64::MAX)
}
