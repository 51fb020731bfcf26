use super::exit_codes;
use crate::cli::args::RunArgs;
use quarry_core::config::{load_layered, BenchConfig};
use quarry_core::engine::{ContainerBackend, Runner, WarehouseBackend};
use quarry_core::errors::ConfigError;
use quarry_core::model::{CacheMode, System, Target};
use quarry_core::providers::container::SshDockerManager;
use quarry_core::providers::rest::{RestConnectionFactory, RestEndpoint};
use quarry_core::report::console::print_run_summary;
use std::sync::Arc;

pub async fn cmd_run(args: RunArgs) -> anyhow::Result<i32> {
    let target: Target = args.system.parse()?;
    if args.runs == 0 {
        return Err(ConfigError("--runs must be at least 1".into()).into());
    }

    let mut cfg = load_layered(args.config.as_deref())?;
    if let Some(b) = &args.benchmark {
        cfg.benchmark_type = Some(b.clone());
    }
    if let Some(p) = &args.dataset_path {
        cfg.dataset_path = Some(p.clone());
    }

    let runner = build_runner(cfg, target, &args)?;
    tracing::info!(
        event = "quarry.run.start",
        system = %args.system,
        runs = args.runs,
        cache = args.cache,
        results_dir = %args.results_dir.display()
    );

    let artifacts = runner.run(target, args.runs).await?;

    for a in &artifacts {
        print_run_summary(a.system, a.run, &a.result, &a.path);
        if let Some(avg) = &a.average {
            eprintln!("averaged {} runs -> {}", a.system, avg.display());
        }
    }
    Ok(exit_codes::OK)
}

fn build_runner(cfg: BenchConfig, target: Target, args: &RunArgs) -> Result<Runner, ConfigError> {
    let wants = |s: System| target.systems().contains(&s);

    let snowflake = if wants(System::Snowflake) {
        let endpoint = RestEndpoint::snowflake(&cfg.snowflake)?;
        Some(WarehouseBackend {
            connections: Arc::new(RestConnectionFactory::new("snowflake", endpoint)),
        })
    } else {
        None
    };

    let embucket = if wants(System::Embucket) {
        let endpoint = RestEndpoint::embucket(&cfg.embucket);
        Some(ContainerBackend {
            connections: Arc::new(RestConnectionFactory::new("embucket", endpoint)),
            containers: Arc::new(SshDockerManager::from_settings(&cfg.embucket)),
        })
    } else {
        None
    };

    Ok(Runner {
        root: args.results_dir.clone(),
        config: cfg,
        cache: CacheMode::from_flag(args.cache),
        snowflake,
        embucket,
    })
}
