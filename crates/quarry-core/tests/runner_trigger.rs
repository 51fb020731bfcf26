use quarry_core::config::BenchConfig;
use quarry_core::engine::{ContainerBackend, Runner, WarehouseBackend};
use quarry_core::errors::{as_config_error, IntegrityError};
use quarry_core::model::{BenchmarkType, CacheMode, System, Target};
use quarry_core::providers::fake::{FakeConnectionFactory, FakeContainerManager};
use quarry_core::providers::Row;
use quarry_core::storage::ResultKey;
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn config() -> BenchConfig {
    let mut c = BenchConfig {
        dataset_path: Some("tpch/10".into()),
        ..Default::default()
    };
    c.snowflake.warehouse = Some("BENCH_WH".into());
    c.snowflake.warehouse_size = Some("XSMALL".into());
    c.embucket.instance = Some("c7i.2xlarge".into());
    c
}

fn key(system: System, scale_unit: &str) -> ResultKey {
    ResultKey {
        system,
        benchmark: BenchmarkType::Tpch,
        dataset: "tpch/10".into(),
        scale_unit: scale_unit.into(),
        cache: CacheMode::Disabled,
    }
}

/// Hands out sequential query ids and answers history lookups for whatever
/// ids are asked for.
fn snowflake_fake() -> Arc<FakeConnectionFactory> {
    let ids = AtomicUsize::new(0);
    Arc::new(FakeConnectionFactory::new(move |sql| {
        if sql.contains("LAST_QUERY_ID") {
            let n = ids.fetch_add(1, Ordering::SeqCst) + 1;
            return Ok(vec![vec![json!(format!("sf-{}", n))]]);
        }
        if sql.contains("QUERY_HISTORY") {
            let rows: Vec<Row> = sql
                .split('\'')
                .skip(1)
                .step_by(2)
                .map(|id| vec![json!(id), json!(10), json!(1)])
                .collect();
            return Ok(rows);
        }
        Ok(Vec::new())
    }))
}

/// Remembers executed statements and serves them back as newest-first history.
fn embucket_fake(forget_history: bool) -> Arc<FakeConnectionFactory> {
    let seen: Mutex<Vec<String>> = Mutex::new(Vec::new());
    Arc::new(FakeConnectionFactory::new(move |sql| {
        if sql.contains("slatedb.history.queries") {
            if forget_history {
                return Ok(Vec::new());
            }
            let limit: usize = sql.rsplit(' ').next().unwrap().parse().unwrap();
            let seen = seen.lock().unwrap();
            return Ok(seen
                .iter()
                .rev()
                .take(limit)
                .map(|q| vec![json!("eb"), json!(5), json!(1), json!(q), json!("Successful"), json!("t")])
                .collect());
        }
        seen.lock().unwrap().push(sql.to_string());
        Ok(Vec::new())
    }))
}

fn runner(root: &Path, cfg: BenchConfig) -> (Runner, Arc<FakeConnectionFactory>) {
    let sf = snowflake_fake();
    let r = Runner {
        root: root.to_path_buf(),
        config: cfg,
        cache: CacheMode::Disabled,
        snowflake: Some(WarehouseBackend {
            connections: sf.clone(),
        }),
        embucket: Some(ContainerBackend {
            connections: embucket_fake(false),
            containers: Arc::new(FakeContainerManager::healthy()),
        }),
    };
    (r, sf)
}

#[tokio::test]
async fn test_average_triggers_only_at_three_files() {
    let root = TempDir::new().unwrap();
    let (r, _) = runner(root.path(), config());
    let k = key(System::Snowflake, "XSMALL");

    let first = r.run(Target::Snowflake, 2).await.unwrap();
    assert!(first.iter().all(|a| a.average.is_none()));
    assert!(!k.average_file(root.path()).exists());

    let third = r.run(Target::Snowflake, 1).await.unwrap();
    assert_eq!(third[0].run, 3);
    assert_eq!(third[0].average.as_deref(), Some(k.average_file(root.path()).as_path()));
    assert!(k.average_file(root.path()).exists());

    std::fs::remove_file(k.average_file(root.path())).unwrap();
    let fourth = r.run(Target::Snowflake, 1).await.unwrap();
    assert_eq!(fourth[0].run, 4);
    assert!(fourth[0].average.is_none());
    assert!(!k.average_file(root.path()).exists());
}

#[tokio::test]
async fn test_both_interleaves_systems_per_iteration() {
    let root = TempDir::new().unwrap();
    let (r, _) = runner(root.path(), config());

    let artifacts = r.run(Target::Both, 2).await.unwrap();
    let order: Vec<(System, u32)> = artifacts.iter().map(|a| (a.system, a.run)).collect();
    assert_eq!(
        order,
        vec![
            (System::Snowflake, 1),
            (System::Embucket, 1),
            (System::Snowflake, 2),
            (System::Embucket, 2),
        ]
    );

    let eb = &artifacts[1];
    assert_eq!(eb.result.len(), 22);
    assert_eq!(eb.path, key(System::Embucket, "c7i.2xlarge").run_file(root.path(), 1));
    // 22 queries plus TOTAL plus header
    let text = std::fs::read_to_string(&eb.path).unwrap();
    assert_eq!(text.lines().count(), 24);
    assert!(text.lines().last().unwrap().starts_with("TOTAL,,110,"));
}

#[tokio::test]
async fn test_failed_average_does_not_stop_later_runs() {
    let root = TempDir::new().unwrap();
    let k = key(System::Snowflake, "XSMALL");
    std::fs::create_dir_all(k.dir(root.path())).unwrap();
    // earlier partial runs without tpch-q5
    let partial = "Query,Query ID,Total (ms),Rows\n\
                   tpch-q1,a,10,1\ntpch-q2,b,10,1\ntpch-q3,c,10,1\ntpch-q4,d,10,1\n\
                   TOTAL,,40,\n";
    std::fs::write(k.run_file(root.path(), 1), partial).unwrap();
    std::fs::write(k.run_file(root.path(), 2), partial).unwrap();

    let eb = embucket_fake(false);
    let r = Runner {
        root: root.path().to_path_buf(),
        config: config(),
        cache: CacheMode::Disabled,
        snowflake: Some(WarehouseBackend {
            connections: snowflake_fake(),
        }),
        embucket: Some(ContainerBackend {
            connections: eb.clone(),
            containers: Arc::new(FakeContainerManager::healthy()),
        }),
    };

    let artifacts = r.run(Target::Both, 1).await.unwrap();
    assert_eq!(artifacts.len(), 2);
    assert_eq!((artifacts[0].system, artifacts[0].run), (System::Snowflake, 3));
    assert!(artifacts[0].average.is_none());
    assert!(!k.average_file(root.path()).exists());
    assert!(k.run_file(root.path(), 3).exists());

    assert_eq!(artifacts[1].system, System::Embucket);
    assert_eq!(artifacts[1].result.len(), 22);
    assert!(eb.opens() > 0);
}

#[tokio::test]
async fn test_integrity_failure_keeps_earlier_files() {
    let root = TempDir::new().unwrap();
    let k = key(System::Embucket, "c7i.2xlarge");
    let dir = k.dir(root.path());
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(k.run_file(root.path(), 1), "Query,Query ID,Total (ms),Rows\nTOTAL,,0,\n").unwrap();

    let r = Runner {
        root: root.path().to_path_buf(),
        config: config(),
        cache: CacheMode::Enabled,
        snowflake: None,
        embucket: Some(ContainerBackend {
            connections: embucket_fake(true),
            containers: Arc::new(FakeContainerManager::healthy()),
        }),
    };

    let err = r.run(Target::Embucket, 1).await.unwrap_err();
    assert!(err.downcast_ref::<IntegrityError>().is_some());
    assert!(k.run_file(root.path(), 1).exists());
    assert!(!k.run_file(root.path(), 2).exists());
}

#[tokio::test]
async fn test_unimplemented_benchmark_fails_before_execution() {
    let root = TempDir::new().unwrap();
    let mut cfg = config();
    cfg.benchmark_type = Some("tpcds".into());
    let (r, sf) = runner(root.path(), cfg);

    let err = r.run(Target::Both, 1).await.unwrap_err();
    assert!(as_config_error(&err).is_some());
    assert_eq!(sf.opens(), 0);
    assert!(std::fs::read_dir(root.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_missing_scale_unit_is_config_error() {
    let root = TempDir::new().unwrap();
    let mut cfg = config();
    cfg.embucket.instance = None;
    let (r, sf) = runner(root.path(), cfg);

    // embucket is validated before snowflake runs
    let err = r.run(Target::Both, 1).await.unwrap_err();
    let cfg_err = as_config_error(&err).expect("config error");
    assert!(cfg_err.0.contains("EMBUCKET_INSTANCE"));
    assert_eq!(sf.opens(), 0);
}

#[tokio::test]
async fn test_run_numbers_continue_after_gaps() {
    let root = TempDir::new().unwrap();
    let k = key(System::Snowflake, "XSMALL");
    std::fs::create_dir_all(k.dir(root.path())).unwrap();
    std::fs::write(k.run_file(root.path(), 5), "Query,Query ID,Total (ms),Rows\n").unwrap();

    let (r, _) = runner(root.path(), config());
    let artifacts = r.run(Target::Snowflake, 1).await.unwrap();
    assert_eq!(artifacts[0].run, 6);
}
