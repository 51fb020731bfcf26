use crate::errors::ConfigError;
use crate::model::BenchmarkType;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod resolve;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BenchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmark_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_path: Option<String>,
    /// Snowflake reads tables from the user's schema instead of the sample database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_custom_dataset: Option<bool>,
    #[serde(default)]
    pub snowflake: SnowflakeSettings,
    #[serde(default)]
    pub embucket: EmbucketSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SnowflakeSettings {
    pub warehouse: Option<String>,
    pub warehouse_size: Option<String>,
    pub account: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmbucketSettings {
    pub instance: Option<String>,
    pub dataset_path: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub protocol: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub ec2_user: Option<String>,
    pub ssh_key_path: Option<String>,
}

impl EmbucketSettings {
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or("localhost")
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(3000)
    }

    pub fn protocol(&self) -> &str {
        self.protocol.as_deref().unwrap_or("http")
    }

    pub fn user(&self) -> &str {
        self.user.as_deref().unwrap_or("embucket")
    }

    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or("embucket")
    }

    pub fn database(&self) -> &str {
        self.database.as_deref().unwrap_or("embucket")
    }

    pub fn schema(&self) -> &str {
        self.schema.as_deref().unwrap_or("public")
    }

    pub fn ec2_user(&self) -> &str {
        self.ec2_user.as_deref().unwrap_or("ec2-user")
    }

    pub fn ssh_key_path(&self) -> &str {
        self.ssh_key_path.as_deref().unwrap_or("~/.ssh/id_rsa")
    }
}

impl BenchConfig {
    pub fn benchmark(&self) -> Result<BenchmarkType, ConfigError> {
        match self.benchmark_type.as_deref() {
            None => Ok(BenchmarkType::default()),
            Some(s) => s.parse(),
        }
    }

    pub fn use_custom_dataset(&self) -> bool {
        self.use_custom_dataset.unwrap_or(false)
    }

    /// Overlays process environment variables.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|k| std::env::var(k).ok())
    }

    /// Overlays values from `lookup`; set keys win over file values. Unparseable
    /// numbers and booleans are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("BENCHMARK_TYPE") {
            self.benchmark_type = Some(v);
        }
        if let Some(v) = get("DATASET_PATH") {
            self.dataset_path = Some(v);
        }
        if let Some(v) = get("USE_CUSTOM_DATASET") {
            if let Some(b) = parse_bool(&v) {
                self.use_custom_dataset = Some(b);
            }
        }

        let sf = &mut self.snowflake;
        for (key, slot) in [
            ("SNOWFLAKE_WAREHOUSE", &mut sf.warehouse),
            ("SNOWFLAKE_WAREHOUSE_SIZE", &mut sf.warehouse_size),
            ("SNOWFLAKE_ACCOUNT", &mut sf.account),
            ("SNOWFLAKE_USER", &mut sf.user),
            ("SNOWFLAKE_PASSWORD", &mut sf.password),
            ("SNOWFLAKE_DATABASE", &mut sf.database),
            ("SNOWFLAKE_SCHEMA", &mut sf.schema),
        ] {
            if let Some(v) = get(key) {
                *slot = Some(v);
            }
        }

        let emb = &mut self.embucket;
        for (key, slot) in [
            ("EMBUCKET_INSTANCE", &mut emb.instance),
            ("EMBUCKET_DATASET_PATH", &mut emb.dataset_path),
            ("EMBUCKET_HOST", &mut emb.host),
            ("EMBUCKET_PROTOCOL", &mut emb.protocol),
            ("EMBUCKET_USER", &mut emb.user),
            ("EMBUCKET_PASSWORD", &mut emb.password),
            ("EMBUCKET_DATABASE", &mut emb.database),
            ("EMBUCKET_SCHEMA", &mut emb.schema),
            ("EC2_USER", &mut emb.ec2_user),
            ("SSH_KEY_PATH", &mut emb.ssh_key_path),
        ] {
            if let Some(v) = get(key) {
                *slot = Some(v);
            }
        }
        if let Some(v) = get("EMBUCKET_PORT") {
            if let Ok(n) = v.trim().parse() {
                emb.port = Some(n);
            }
        }
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Reads a YAML config file. Unknown keys are reported and ignored.
pub fn load_config(path: &Path) -> Result<BenchConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;

    if raw.trim().is_empty() {
        return Ok(BenchConfig::default());
    }

    let mut ignored_keys = Vec::new();
    let deserializer = serde_yaml::Deserializer::from_str(&raw);
    let cfg: BenchConfig = serde_ignored::deserialize(deserializer, |p| {
        ignored_keys.push(p.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML {}: {}", path.display(), e)))?;

    if !ignored_keys.is_empty() {
        tracing::warn!(
            event = "quarry.config.unknown_keys",
            file = %path.display(),
            keys = ?ignored_keys,
            "ignored unknown config fields: {:?}", ignored_keys
        );
    }

    Ok(cfg)
}

/// Defaults, then the optional file, then the environment.
pub fn load_layered(path: Option<&Path>) -> Result<BenchConfig, ConfigError> {
    let mut cfg = match path {
        Some(p) => load_config(p)?,
        None => BenchConfig::default(),
    };
    cfg.apply_env();
    Ok(cfg)
}
