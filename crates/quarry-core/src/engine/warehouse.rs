//! Driver for warehouse-scoped backends (Snowflake).
//!
//! Cold state is forced by suspending and resuming the warehouse before each
//! query. Timings come from the backend's query history, correlated by the
//! query id recorded after each statement.

use crate::model::{CacheMode, ExecutionRecord, QueryTask, RunResult};
use crate::providers::{value_as_f64, value_as_string, value_as_u64, SqlSession};
use std::collections::HashMap;

/// Backend statements. `{warehouse}` and `{query_ids}` are substituted.
#[derive(Debug, Clone)]
pub struct WarehouseStatements {
    pub disable_result_cache: &'static str,
    pub suspend: &'static str,
    pub settle: &'static str,
    pub resume: &'static str,
    pub last_query_id: &'static str,
    /// Must yield `(query_id, elapsed_ms, rows)` ordered by start time.
    pub history_by_ids: &'static str,
}

pub const SNOWFLAKE: WarehouseStatements = WarehouseStatements {
    disable_result_cache: "ALTER SESSION SET USE_CACHED_RESULT = FALSE;",
    suspend: "ALTER WAREHOUSE {warehouse} SUSPEND;",
    settle: "SELECT SYSTEM$WAIT(2);",
    resume: "ALTER WAREHOUSE {warehouse} RESUME;",
    last_query_id: "SELECT LAST_QUERY_ID()",
    history_by_ids: "SELECT QUERY_ID, TOTAL_ELAPSED_TIME, ROWS_PRODUCED \
         FROM TABLE(SNOWFLAKE.INFORMATION_SCHEMA.QUERY_HISTORY(RESULT_LIMIT => 1000)) \
         WHERE QUERY_ID IN ({query_ids}) \
         ORDER BY START_TIME",
};

impl WarehouseStatements {
    fn for_warehouse(template: &str, warehouse: &str) -> String {
        template.replace("{warehouse}", warehouse)
    }

    pub fn history_sql(&self, ids: &[String]) -> String {
        let quoted: Vec<String> = ids
            .iter()
            .map(|id| format!("'{}'", id.replace('\'', "''")))
            .collect();
        self.history_by_ids.replace("{query_ids}", &quoted.join(", "))
    }
}

pub struct WarehouseDriver<'a> {
    pub statements: &'a WarehouseStatements,
    pub warehouse: String,
    pub cache: CacheMode,
}

impl<'a> WarehouseDriver<'a> {
    pub fn new(statements: &'a WarehouseStatements, warehouse: impl Into<String>, cache: CacheMode) -> Self {
        Self {
            statements,
            warehouse: warehouse.into(),
            cache,
        }
    }

    /// Runs `tasks` serially. Per-query failures are logged and leave the query
    /// out of the result; a failed history lookup fails the run.
    pub async fn run(&self, session: &mut dyn SqlSession, tasks: &[QueryTask]) -> anyhow::Result<RunResult> {
        if !self.cache.is_enabled() {
            if let Err(e) = session.execute(self.statements.disable_result_cache).await {
                tracing::warn!(
                    event = "quarry.warehouse.result_cache",
                    error = %e,
                    "could not disable the result cache"
                );
            }
        }

        let mut executed_ids: Vec<String> = Vec::new();
        let mut id_to_task: HashMap<String, &QueryTask> = HashMap::new();

        for task in tasks {
            tracing::info!(event = "quarry.query.start", query = %task.name, warehouse = %self.warehouse);

            if !self.cache.is_enabled() {
                if let Err(e) = self.cycle_warehouse(session).await {
                    tracing::warn!(
                        event = "quarry.warehouse.cycle_failed",
                        query = %task.name,
                        error = %e,
                        "could not suspend/resume warehouse for {}", task.name
                    );
                }
            }

            match self.execute_one(session, task).await {
                Ok(Some(id)) => {
                    id_to_task.insert(id.clone(), task);
                    executed_ids.push(id);
                }
                Ok(None) => {
                    tracing::warn!(event = "quarry.query.no_id", query = %task.name);
                }
                Err(e) => {
                    tracing::error!(
                        event = "quarry.query.failed",
                        query = %task.name,
                        error = %e,
                        "error executing {}", task.name
                    );
                }
            }
        }

        if executed_ids.is_empty() {
            return Ok(RunResult::default());
        }

        let history = session
            .execute(&self.statements.history_sql(&executed_ids))
            .await?;

        let mut records = Vec::new();
        for row in &history {
            let Some(query_id) = row.first().map(value_as_string) else {
                continue;
            };
            // unmatched history rows are dropped
            let Some(task) = id_to_task.get(&query_id) else {
                continue;
            };
            records.push(ExecutionRecord {
                sequence_number: task.sequence_number,
                name: task.name.clone(),
                query_id,
                elapsed_ms: row.get(1).and_then(value_as_f64).unwrap_or(0.0),
                row_count: row.get(2).and_then(value_as_u64).unwrap_or(0),
            });
        }

        if records.len() < tasks.len() {
            tracing::warn!(
                event = "quarry.warehouse.partial",
                expected = tasks.len(),
                recorded = records.len(),
                "history covers fewer queries than were submitted"
            );
        }

        Ok(RunResult::from_records(records))
    }

    async fn cycle_warehouse(&self, session: &mut dyn SqlSession) -> anyhow::Result<()> {
        let s = self.statements;
        session
            .execute(&WarehouseStatements::for_warehouse(s.suspend, &self.warehouse))
            .await?;
        session.execute(s.settle).await?;
        session
            .execute(&WarehouseStatements::for_warehouse(s.resume, &self.warehouse))
            .await?;
        Ok(())
    }

    async fn execute_one(&self, session: &mut dyn SqlSession, task: &QueryTask) -> anyhow::Result<Option<String>> {
        // rows are discarded; timing comes from history
        let _ = session.execute(&task.sql).await?;
        let rows = session.execute(self.statements.last_query_id).await?;
        Ok(rows
            .first()
            .and_then(|r| r.first())
            .map(value_as_string)
            .filter(|id| !id.is_empty()))
    }
}
