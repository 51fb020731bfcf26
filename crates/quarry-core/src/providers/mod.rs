use async_trait::async_trait;

pub mod container;
#[cfg(any(test, feature = "test-support"))]
pub mod fake;
pub mod rest;

/// One result row; values arrive as the backend serializes them.
pub type Row = Vec<serde_json::Value>;

/// A live SQL session. Statements run serially; the full row set is returned.
#[async_trait]
pub trait SqlSession: Send {
    async fn execute(&mut self, sql: &str) -> anyhow::Result<Vec<Row>>;

    async fn close(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Opens fresh sessions against one backend.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn open(&self) -> anyhow::Result<Box<dyn SqlSession>>;

    fn backend_name(&self) -> &'static str;
}

/// Restarts the backend's container and waits until it reports healthy.
#[async_trait]
pub trait ContainerManager: Send + Sync {
    async fn restart(&self) -> bool;
}

/// Text of a cell; numbers are rendered, null is empty.
pub fn value_as_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Numeric cell; REST rowsets carry numbers as strings.
pub fn value_as_f64(v: &serde_json::Value) -> Option<f64> {
    match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn value_as_u64(v: &serde_json::Value) -> Option<u64> {
    match v {
        serde_json::Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        serde_json::Value::String(s) => {
            let s = s.trim();
            s.parse()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as u64))
        }
        _ => None,
    }
}
