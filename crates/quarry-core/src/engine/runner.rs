use super::container::{ContainerDriver, EMBUCKET};
use super::warehouse::{WarehouseDriver, SNOWFLAKE};
use crate::config::{resolve, BenchConfig};
use crate::errors::{log_cleanup_failure, CleanupError, ConfigError};
use crate::model::{CacheMode, QueryTask, RunResult, System, Target};
use crate::providers::{ConnectionFactory, ContainerManager};
use crate::report::{average_for_key, write_result_file};
use crate::storage::ResultKey;
use crate::suite;
use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;

/// Number of result files that triggers averaging.
pub const AVERAGE_TRIGGER_RUNS: usize = 3;

pub struct WarehouseBackend {
    pub connections: Arc<dyn ConnectionFactory>,
}

pub struct ContainerBackend {
    pub connections: Arc<dyn ConnectionFactory>,
    pub containers: Arc<dyn ContainerManager>,
}

/// One persisted run.
#[derive(Debug, Clone)]
pub struct RunArtifact {
    pub system: System,
    pub run: u32,
    pub path: PathBuf,
    pub result: RunResult,
    /// Set when this run completed the third result file for its key and the
    /// average could be computed.
    pub average: Option<PathBuf>,
}

pub struct Runner {
    pub root: PathBuf,
    pub config: BenchConfig,
    pub cache: CacheMode,
    pub snowflake: Option<WarehouseBackend>,
    pub embucket: Option<ContainerBackend>,
}

struct Plan {
    system: System,
    key: ResultKey,
    tasks: Vec<QueryTask>,
}

impl Runner {
    /// Runs `runs` iterations over the selected systems. Any fatal error aborts
    /// the invocation; files written before it stay on disk.
    pub async fn run(&self, target: Target, runs: u32) -> anyhow::Result<Vec<RunArtifact>> {
        let plans = self.plan(target)?;
        let mut artifacts = Vec::new();

        for iteration in 1..=runs {
            tracing::info!(event = "quarry.iteration.start", iteration, of = runs);
            for plan in &plans {
                let result = self.execute(plan).await?;
                artifacts.push(self.persist(plan, result)?);
            }
        }
        Ok(artifacts)
    }

    /// Resolves everything up front so configuration errors surface before
    /// any backend is touched.
    fn plan(&self, target: Target) -> Result<Vec<Plan>, ConfigError> {
        target
            .systems()
            .iter()
            .map(|&system| -> Result<Plan, ConfigError> {
                resolve::validate_for(&self.config, system)?;
                let missing_backend = || ConfigError(format!("no {} backend configured", system));
                match system {
                    System::Snowflake if self.snowflake.is_none() => return Err(missing_backend()),
                    System::Embucket if self.embucket.is_none() => return Err(missing_backend()),
                    _ => {}
                }
                let naming = resolve::table_naming(&self.config, system)?;
                Ok(Plan {
                    system,
                    key: resolve::result_key(&self.config, system, self.cache)?,
                    tasks: suite::queries(self.config.benchmark()?, &naming)?,
                })
            })
            .collect()
    }

    async fn execute(&self, plan: &Plan) -> anyhow::Result<RunResult> {
        match plan.system {
            System::Snowflake => {
                let backend = self
                    .snowflake
                    .as_ref()
                    .ok_or_else(|| ConfigError("no snowflake backend configured".into()))?;
                let warehouse = resolve::warehouse(&self.config)?;
                let driver = WarehouseDriver::new(&SNOWFLAKE, warehouse, self.cache);

                let mut session = backend
                    .connections
                    .open()
                    .await
                    .with_context(|| {
                        format!("failed to open {} session", backend.connections.backend_name())
                    })?;
                let result = driver.run(session.as_mut(), &plan.tasks).await;
                if let Err(e) = session.close().await {
                    log_cleanup_failure(CleanupError::new("snowflake session", e));
                }
                result
            }
            System::Embucket => {
                let backend = self
                    .embucket
                    .as_ref()
                    .ok_or_else(|| ConfigError("no embucket backend configured".into()))?;
                ContainerDriver::new(&EMBUCKET, self.cache)
                    .run(
                        backend.connections.as_ref(),
                        backend.containers.as_ref(),
                        &plan.tasks,
                    )
                    .await
            }
        }
    }

    fn persist(&self, plan: &Plan, result: RunResult) -> anyhow::Result<RunArtifact> {
        let run = plan
            .key
            .next_run_number(&self.root)
            .with_context(|| format!("failed to scan {}", plan.key.dir(&self.root).display()))?;
        let path = plan.key.run_file(&self.root, run);
        write_result_file(&path, &result)?;

        let existing = plan
            .key
            .existing_runs(&self.root)
            .with_context(|| format!("failed to scan {}", plan.key.dir(&self.root).display()))?;
        // a failed average never aborts the remaining runs
        let average = if existing.len() == AVERAGE_TRIGGER_RUNS {
            match average_for_key(&self.root, &plan.key) {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!(
                        event = "quarry.average.failed",
                        system = %plan.system,
                        dir = %plan.key.dir(&self.root).display(),
                        error = %e,
                        "could not average {} results", plan.system
                    );
                    None
                }
            }
        } else {
            None
        };

        Ok(RunArtifact {
            system: plan.system,
            run,
            path,
            result,
            average,
        })
    }
}
