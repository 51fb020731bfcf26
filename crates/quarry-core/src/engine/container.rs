//! Driver for container-scoped backends (Embucket).
//!
//! Cold state is forced by restarting the container before each query. The
//! history store is read afterwards without per-request correlation, so the
//! result is reconciled by position and query text, all or nothing.

use crate::errors::{log_cleanup_failure, CleanupError, IntegrityError};
use crate::model::{CacheMode, ExecutionRecord, QueryTask, RunResult};
use crate::providers::{
    value_as_f64, value_as_string, value_as_u64, ConnectionFactory, ContainerManager, Row,
    SqlSession,
};

/// Characters of query text kept in mismatch errors.
const TEXT_PREFIX_CHARS: usize = 80;

#[derive(Debug, Clone)]
pub struct ContainerStatements {
    /// Must yield `(id, duration_ms, result_count, query, status, start_time)`
    /// for the latest `{limit}` successful queries, newest first.
    pub recent_successful: &'static str,
}

pub const EMBUCKET: ContainerStatements = ContainerStatements {
    recent_successful: "SELECT id, duration_ms, result_count, query, status, start_time \
         FROM slatedb.history.queries \
         WHERE status = 'Successful' \
         ORDER BY start_time DESC \
         LIMIT {limit}",
};

impl ContainerStatements {
    pub fn history_sql(&self, limit: usize) -> String {
        self.recent_successful.replace("{limit}", &limit.to_string())
    }
}

pub struct ContainerDriver<'a> {
    pub statements: &'a ContainerStatements,
    pub cache: CacheMode,
}

impl<'a> ContainerDriver<'a> {
    pub fn new(statements: &'a ContainerStatements, cache: CacheMode) -> Self {
        Self { statements, cache }
    }

    pub async fn run(
        &self,
        connections: &dyn ConnectionFactory,
        containers: &dyn ContainerManager,
        tasks: &[QueryTask],
    ) -> anyhow::Result<RunResult> {
        if self.cache.is_enabled() {
            self.run_warm(connections, tasks).await?;
        } else {
            self.run_cold(connections, containers, tasks).await;
        }

        tracing::info!(
            event = "quarry.history.fetch",
            backend = connections.backend_name(),
            limit = tasks.len()
        );
        let mut conn = connections.open().await?;
        let history = conn.execute(&self.statements.history_sql(tasks.len())).await;
        close_quietly(conn.as_mut(), "history connection").await;

        let mut rows = history?;
        rows.reverse();
        reconcile(tasks, &rows)
    }

    async fn run_cold(
        &self,
        connections: &dyn ConnectionFactory,
        containers: &dyn ContainerManager,
        tasks: &[QueryTask],
    ) {
        for task in tasks {
            tracing::info!(event = "quarry.query.start", query = %task.name, mode = "cold");
            if !containers.restart().await {
                tracing::error!(
                    event = "quarry.container.restart_failed",
                    query = %task.name,
                    "container restart failed, skipping {}", task.name
                );
                continue;
            }

            let mut conn = match connections.open().await {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!(event = "quarry.query.failed", query = %task.name, error = %e);
                    continue;
                }
            };
            if let Err(e) = conn.execute(&task.sql).await {
                tracing::error!(
                    event = "quarry.query.failed",
                    query = %task.name,
                    error = %e,
                    "error executing {}", task.name
                );
            }
            close_quietly(conn.as_mut(), "query connection").await;
        }
    }

    async fn run_warm(&self, connections: &dyn ConnectionFactory, tasks: &[QueryTask]) -> anyhow::Result<()> {
        let mut conn = connections.open().await?;
        for task in tasks {
            tracing::info!(event = "quarry.query.start", query = %task.name, mode = "warm");
            if let Err(e) = conn.execute(&task.sql).await {
                tracing::error!(
                    event = "quarry.query.failed",
                    query = %task.name,
                    error = %e,
                    "error executing {}", task.name
                );
            }
        }
        close_quietly(conn.as_mut(), "shared connection").await;
        Ok(())
    }
}

async fn close_quietly(conn: &mut dyn SqlSession, what: &'static str) {
    if let Err(e) = conn.close().await {
        log_cleanup_failure(CleanupError::new(what, e));
    }
}

/// Matches chronological history rows to tasks by position and trimmed text.
pub fn reconcile(tasks: &[QueryTask], rows: &[Row]) -> anyhow::Result<RunResult> {
    if rows.len() != tasks.len() {
        return Err(IntegrityError::CountMismatch {
            expected: tasks.len(),
            actual: rows.len(),
        }
        .into());
    }

    let mut records = Vec::with_capacity(rows.len());
    let mut total = 0.0;
    for (i, (row, task)) in rows.iter().zip(tasks).enumerate() {
        let stored = row.get(3).map(value_as_string).unwrap_or_default();
        if stored.trim() != task.sql.trim() {
            return Err(IntegrityError::TextMismatch {
                position: i + 1,
                expected: prefix(task.sql.trim()),
                actual: prefix(stored.trim()),
            }
            .into());
        }

        let elapsed_ms = row.get(1).and_then(value_as_f64).unwrap_or(0.0);
        total += elapsed_ms;
        records.push(ExecutionRecord {
            sequence_number: (i + 1) as u32,
            name: task.name.clone(),
            query_id: row.first().map(value_as_string).unwrap_or_default(),
            elapsed_ms,
            row_count: row.get(2).and_then(value_as_u64).unwrap_or(0),
        });
    }

    Ok(RunResult::new(records, total))
}

fn prefix(s: &str) -> String {
    s.chars().take(TEXT_PREFIX_CHARS).collect()
}
