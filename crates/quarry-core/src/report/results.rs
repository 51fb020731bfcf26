use crate::model::RunResult;
use crate::storage::csv::{format_ms, Table};
use std::path::Path;

pub const RESULT_HEADERS: [&str; 4] = ["Query", "Query ID", "Total (ms)", "Rows"];
pub const TOTAL_LABEL: &str = "TOTAL";

/// One row per record in driver order, then the TOTAL row.
pub fn result_table(result: &RunResult) -> Table {
    let mut t = Table::new(RESULT_HEADERS);
    for r in &result.records {
        t.push_row([
            r.name.clone(),
            r.query_id.clone(),
            format_ms(r.elapsed_ms),
            r.row_count.to_string(),
        ]);
    }
    t.push_row([
        TOTAL_LABEL.to_string(),
        String::new(),
        format_ms(result.total_elapsed_ms),
        String::new(),
    ]);
    t
}

pub fn write_result_file(path: &Path, result: &RunResult) -> anyhow::Result<()> {
    result_table(result).write(path)?;
    tracing::info!(
        event = "quarry.results.written",
        path = %path.display(),
        queries = result.len(),
        total_ms = result.total_elapsed_ms
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExecutionRecord;

    #[test]
    fn test_total_row_has_empty_id_and_rows() {
        let result = RunResult::from_records(vec![ExecutionRecord {
            sequence_number: 1,
            name: "tpch-q1".into(),
            query_id: "01b2".into(),
            elapsed_ms: 812.0,
            row_count: 4,
        }]);
        let rendered = result_table(&result).render();
        assert_eq!(
            rendered,
            "Query,Query ID,Total (ms),Rows\ntpch-q1,01b2,812,4\nTOTAL,,812,\n"
        );
    }

    #[test]
    fn test_empty_run_still_has_total() {
        let t = result_table(&RunResult::default());
        assert_eq!(t.rows, vec![vec!["TOTAL", "", "0", ""]]);
    }
}
