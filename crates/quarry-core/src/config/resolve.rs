use super::BenchConfig;
use crate::errors::ConfigError;
use crate::model::{CacheMode, System};
use crate::storage::ResultKey;
use crate::suite::TableNaming;

fn required<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::missing(key))
}

/// Dataset identity for `system`; Embucket may override the shared path.
pub fn dataset(cfg: &BenchConfig, system: System) -> Result<&str, ConfigError> {
    if system == System::Embucket {
        if let Ok(p) = required(&cfg.embucket.dataset_path, "EMBUCKET_DATASET_PATH") {
            return Ok(p);
        }
    }
    required(&cfg.dataset_path, "DATASET_PATH")
}

/// Warehouse size for Snowflake, instance id for Embucket.
pub fn scale_unit(cfg: &BenchConfig, system: System) -> Result<&str, ConfigError> {
    match system {
        System::Snowflake => required(&cfg.snowflake.warehouse_size, "SNOWFLAKE_WAREHOUSE_SIZE"),
        System::Embucket => required(&cfg.embucket.instance, "EMBUCKET_INSTANCE"),
    }
}

pub fn warehouse(cfg: &BenchConfig) -> Result<&str, ConfigError> {
    required(&cfg.snowflake.warehouse, "SNOWFLAKE_WAREHOUSE")
}

pub fn result_key(cfg: &BenchConfig, system: System, cache: CacheMode) -> Result<ResultKey, ConfigError> {
    Ok(ResultKey {
        system,
        benchmark: cfg.benchmark()?,
        dataset: dataset(cfg, system)?.to_string(),
        scale_unit: scale_unit(cfg, system)?.to_string(),
        cache,
    })
}

pub fn table_naming(cfg: &BenchConfig, system: System) -> Result<TableNaming, ConfigError> {
    match system {
        System::Embucket => Ok(TableNaming::Qualified {
            database: cfg.embucket.database().to_string(),
            schema: cfg.embucket.schema().to_string(),
        }),
        System::Snowflake if cfg.use_custom_dataset() => Ok(TableNaming::Bare),
        System::Snowflake => Ok(TableNaming::sample_data_for(dataset(cfg, system)?)),
    }
}

/// Checks everything a run against `system` needs, before any execution.
pub fn validate_for(cfg: &BenchConfig, system: System) -> Result<(), ConfigError> {
    cfg.benchmark()?;
    dataset(cfg, system)?;
    scale_unit(cfg, system)?;
    if system == System::Snowflake {
        warehouse(cfg)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BenchmarkType;

    fn cfg() -> BenchConfig {
        let mut c = BenchConfig {
            dataset_path: Some("tpch/10".into()),
            ..Default::default()
        };
        c.snowflake.warehouse = Some("BENCH_WH".into());
        c.snowflake.warehouse_size = Some("XSMALL".into());
        c.embucket.instance = Some("c7i.xlarge".into());
        c
    }

    #[test]
    fn test_embucket_dataset_override() {
        let mut c = cfg();
        assert_eq!(dataset(&c, System::Embucket).unwrap(), "tpch/10");
        c.embucket.dataset_path = Some("tpch/100".into());
        assert_eq!(dataset(&c, System::Embucket).unwrap(), "tpch/100");
        assert_eq!(dataset(&c, System::Snowflake).unwrap(), "tpch/10");
    }

    #[test]
    fn test_result_key_resolution() {
        let k = result_key(&cfg(), System::Snowflake, CacheMode::Disabled).unwrap();
        assert_eq!(k.benchmark, BenchmarkType::Tpch);
        assert_eq!(k.scale_unit, "XSMALL");
        assert_eq!(k.dataset, "tpch/10");

        let k = result_key(&cfg(), System::Embucket, CacheMode::Enabled).unwrap();
        assert_eq!(k.scale_unit, "c7i.xlarge");
    }

    #[test]
    fn test_missing_settings_are_named() {
        let mut c = cfg();
        c.snowflake.warehouse = None;
        let err = validate_for(&c, System::Snowflake).unwrap_err();
        assert!(err.0.contains("SNOWFLAKE_WAREHOUSE"));
        // embucket does not need the warehouse
        assert!(validate_for(&c, System::Embucket).is_ok());

        c.embucket.instance = Some("  ".into());
        let err = validate_for(&c, System::Embucket).unwrap_err();
        assert!(err.0.contains("EMBUCKET_INSTANCE"));
    }

    #[test]
    fn test_table_naming_per_system() {
        let mut c = cfg();
        assert_eq!(
            table_naming(&c, System::Snowflake).unwrap(),
            TableNaming::SampleData { scale_factor: 10 }
        );
        c.use_custom_dataset = Some(true);
        assert_eq!(table_naming(&c, System::Snowflake).unwrap(), TableNaming::Bare);
        assert_eq!(
            table_naming(&c, System::Embucket).unwrap(),
            TableNaming::Qualified {
                database: "embucket".into(),
                schema: "public".into()
            }
        );
    }
}
