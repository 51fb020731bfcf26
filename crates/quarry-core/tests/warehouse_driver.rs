use quarry_core::engine::warehouse::{WarehouseDriver, SNOWFLAKE};
use quarry_core::model::{CacheMode, QueryTask, RunResult};
use quarry_core::providers::fake::FakeSession;
use quarry_core::providers::SqlSession;
use quarry_core::report::results::result_table;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn tasks(n: u32) -> Vec<QueryTask> {
    (1..=n)
        .map(|i| QueryTask {
            sequence_number: i,
            name: format!("tpch-q{}", i),
            sql: format!("SELECT {} AS q", i),
        })
        .collect()
}

/// Hands out `id-1`, `id-2`, ... for LAST_QUERY_ID and reports history for
/// `history_ids` with 100 ms per position.
fn session(history_ids: &'static [&'static str]) -> FakeSession {
    let next_id = Arc::new(AtomicUsize::new(0));
    FakeSession::new(move |sql| {
        if sql.contains("FAIL") {
            anyhow::bail!("SQL compilation error");
        }
        if sql.contains("LAST_QUERY_ID") {
            let n = next_id.fetch_add(1, Ordering::SeqCst) + 1;
            return Ok(vec![vec![json!(format!("id-{}", n))]]);
        }
        if sql.contains("QUERY_HISTORY") {
            return Ok(history_ids
                .iter()
                .enumerate()
                .map(|(i, id)| vec![json!(id), json!((i as f64 + 1.0) * 100.0), json!(5)])
                .collect());
        }
        Ok(Vec::new())
    })
}

#[tokio::test]
async fn test_all_queries_recorded_with_total() {
    let mut s = session(&["id-1", "id-2", "id-3"]);
    let driver = WarehouseDriver::new(&SNOWFLAKE, "BENCH_WH", CacheMode::Disabled);
    let result = driver.run(&mut s, &tasks(3)).await.unwrap();

    assert_eq!(result.len(), 3);
    assert!((result.total_elapsed_ms - 600.0).abs() < 1e-9);
    assert_eq!(result.records[1].name, "tpch-q2");
    assert_eq!(result.records[1].query_id, "id-2");

    let table = result_table(&result);
    assert_eq!(table.rows.len(), 4);
    assert_eq!(table.rows[3], vec!["TOTAL", "", "600", ""]);
}

#[tokio::test]
async fn test_cold_mode_cycles_warehouse_per_query() {
    let mut s = session(&["id-1", "id-2"]);
    let log = s.log();
    WarehouseDriver::new(&SNOWFLAKE, "BENCH_WH", CacheMode::Disabled)
        .run(&mut s, &tasks(2))
        .await
        .unwrap();

    assert_eq!(log.count_matching("USE_CACHED_RESULT = FALSE"), 1);
    assert_eq!(log.count_matching("ALTER WAREHOUSE BENCH_WH SUSPEND"), 2);
    assert_eq!(log.count_matching("ALTER WAREHOUSE BENCH_WH RESUME"), 2);

    let statements = log.statements();
    let suspend = statements.iter().position(|s| s.contains("SUSPEND")).unwrap();
    let first_query = statements.iter().position(|s| s == "SELECT 1 AS q").unwrap();
    assert!(suspend < first_query);
}

#[tokio::test]
async fn test_cache_mode_leaves_warehouse_alone() {
    let mut s = session(&["id-1", "id-2"]);
    let log = s.log();
    WarehouseDriver::new(&SNOWFLAKE, "BENCH_WH", CacheMode::Enabled)
        .run(&mut s, &tasks(2))
        .await
        .unwrap();

    assert_eq!(log.count_matching("ALTER WAREHOUSE"), 0);
    assert_eq!(log.count_matching("USE_CACHED_RESULT"), 0);
}

#[tokio::test]
async fn test_failed_query_is_absent_not_fatal() {
    let mut t = tasks(3);
    t[1].sql = "SELECT FAIL".into();

    // history knows the two ids the driver recorded, plus one foreign id
    let mut s = session(&["id-1", "id-2", "someone-else"]);
    let log = s.log();
    let result = WarehouseDriver::new(&SNOWFLAKE, "BENCH_WH", CacheMode::Enabled)
        .run(&mut s, &t)
        .await
        .unwrap();

    assert_eq!(result.len(), 2);
    let names: Vec<&str> = result.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["tpch-q1", "tpch-q3"]);
    assert_eq!(result.records[1].sequence_number, 3);
    assert!(log.statements().last().unwrap().contains("IN ('id-1', 'id-2')"));
}

#[tokio::test]
async fn test_no_recorded_ids_skips_history() {
    let mut t = tasks(2);
    for task in &mut t {
        task.sql = "SELECT FAIL".into();
    }
    let mut s = session(&[]);
    let log = s.log();
    let result = WarehouseDriver::new(&SNOWFLAKE, "BENCH_WH", CacheMode::Enabled)
        .run(&mut s, &t)
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.total_elapsed_ms, 0.0);
    assert_eq!(log.count_matching("QUERY_HISTORY"), 0);
}

#[tokio::test]
async fn test_history_failure_fails_run() {
    let mut s = FakeSession::new(|sql| {
        if sql.contains("QUERY_HISTORY") {
            anyhow::bail!("warehouse suspended");
        }
        if sql.contains("LAST_QUERY_ID") {
            return Ok(vec![vec![json!("id-1")]]);
        }
        Ok(Vec::new())
    });
    let err = WarehouseDriver::new(&SNOWFLAKE, "BENCH_WH", CacheMode::Enabled)
        .run(&mut s, &tasks(1))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("warehouse suspended"));

    // the session is still usable by the caller
    assert!(s.close().await.is_ok());
}

/// Like [`session`], but every statement containing `failing` errors.
fn session_failing_on(failing: &'static str, history_ids: &'static [&'static str]) -> FakeSession {
    let next_id = Arc::new(AtomicUsize::new(0));
    FakeSession::new(move |sql| {
        if sql.contains(failing) {
            anyhow::bail!("warehouse BENCH_WH is busy");
        }
        if sql.contains("LAST_QUERY_ID") {
            let n = next_id.fetch_add(1, Ordering::SeqCst) + 1;
            return Ok(vec![vec![json!(format!("id-{}", n))]]);
        }
        if sql.contains("QUERY_HISTORY") {
            return Ok(history_ids
                .iter()
                .map(|id| vec![json!(id), json!(100.0), json!(5)])
                .collect());
        }
        Ok(Vec::new())
    })
}

async fn run_capturing_logs(s: &mut FakeSession, t: &[QueryTask]) -> (RunResult, String) {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let buffer_clone = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_writer(move || MockWriter(buffer_clone.clone()))
        .finish();

    let guard = tracing::subscriber::set_default(subscriber);
    let result = WarehouseDriver::new(&SNOWFLAKE, "BENCH_WH", CacheMode::Disabled)
        .run(s, t)
        .await
        .unwrap();
    drop(guard);

    let output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
    (result, output)
}

#[tokio::test]
async fn test_failed_suspend_still_runs_query() {
    let mut s = session_failing_on("SUSPEND", &["id-1", "id-2"]);
    let log = s.log();
    let (result, output) = run_capturing_logs(&mut s, &tasks(2)).await;

    assert_eq!(log.count_matching("SELECT 1 AS q"), 1);
    assert_eq!(log.count_matching("SELECT 2 AS q"), 1);
    assert_eq!(log.count_matching("LAST_QUERY_ID"), 2);
    // suspend failed, so resume was never attempted
    assert_eq!(log.count_matching("RESUME"), 0);

    assert_eq!(result.len(), 2);
    assert_eq!(result.records[0].query_id, "id-1");
    assert_eq!(result.records[1].name, "tpch-q2");

    assert!(output.contains("\"event\":\"quarry.warehouse.cycle_failed\""));
    assert!(output.contains("\"level\":\"WARN\""));
    assert!(output.contains("warehouse BENCH_WH is busy"));
}

#[tokio::test]
async fn test_failed_resume_still_runs_query() {
    let mut s = session_failing_on("RESUME", &["id-1"]);
    let log = s.log();
    let (result, output) = run_capturing_logs(&mut s, &tasks(1)).await;

    assert_eq!(log.count_matching("ALTER WAREHOUSE BENCH_WH SUSPEND"), 1);
    assert_eq!(log.count_matching("SELECT 1 AS q"), 1);
    assert_eq!(log.count_matching("LAST_QUERY_ID"), 1);

    assert_eq!(result.len(), 1);
    assert_eq!(result.records[0].query_id, "id-1");
    assert!((result.total_elapsed_ms - 100.0).abs() < 1e-9);
    assert!(output.contains("\"event\":\"quarry.warehouse.cycle_failed\""));
}

struct MockWriter(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for MockWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
