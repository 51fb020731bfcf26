//! Snowflake v1 REST session. Embucket serves the same protocol, so both
//! backends share this client.

use super::{ConnectionFactory, Row, SqlSession};
use crate::config::{EmbucketSettings, SnowflakeSettings};
use crate::errors::ConfigError;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// Response codes meaning "still running, poll the result URL".
const IN_PROGRESS_CODES: [&str; 2] = ["333333", "333334"];
const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct RestEndpoint {
    pub base_url: String,
    pub account: String,
    pub user: String,
    pub password: String,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub warehouse: Option<String>,
}

impl RestEndpoint {
    pub fn snowflake(s: &SnowflakeSettings) -> Result<Self, ConfigError> {
        let need = |v: &Option<String>, key: &str| {
            v.clone()
                .filter(|x| !x.trim().is_empty())
                .ok_or_else(|| ConfigError::missing(key))
        };
        let account = need(&s.account, "SNOWFLAKE_ACCOUNT")?;
        Ok(Self {
            base_url: format!("https://{}.snowflakecomputing.com", account),
            account,
            user: need(&s.user, "SNOWFLAKE_USER")?,
            password: need(&s.password, "SNOWFLAKE_PASSWORD")?,
            database: s.database.clone(),
            schema: s.schema.clone(),
            warehouse: s.warehouse.clone(),
        })
    }

    pub fn embucket(s: &EmbucketSettings) -> Self {
        Self {
            base_url: format!("{}://{}:{}", s.protocol(), s.host(), s.port()),
            // any account name is accepted; a fresh one keeps sessions apart
            account: format!("acc_{}", &uuid::Uuid::new_v4().simple().to_string()[..10]),
            user: s.user().to_string(),
            password: s.password().to_string(),
            database: Some(s.database().to_string()),
            schema: Some(s.schema().to_string()),
            warehouse: Some("embucket".to_string()),
        }
    }

    fn login_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("request_id", uuid::Uuid::new_v4().to_string())];
        if let Some(db) = &self.database {
            params.push(("databaseName", db.clone()));
        }
        if let Some(schema) = &self.schema {
            params.push(("schemaName", schema.clone()));
        }
        if let Some(wh) = &self.warehouse {
            params.push(("warehouse", wh.clone()));
        }
        params
    }

    fn login_body(&self) -> serde_json::Value {
        json!({
            "data": {
                "CLIENT_APP_ID": "quarry",
                "CLIENT_APP_VERSION": env!("CARGO_PKG_VERSION"),
                "ACCOUNT_NAME": self.account,
                "LOGIN_NAME": self.user,
                "PASSWORD": self.password,
            }
        })
    }
}

pub struct RestSession {
    client: reqwest::Client,
    base_url: String,
    token: String,
    sequence_id: u64,
}

impl RestSession {
    pub async fn login(client: reqwest::Client, endpoint: &RestEndpoint) -> anyhow::Result<Self> {
        let url = format!("{}/session/v1/login-request", endpoint.base_url);
        let resp = client
            .post(&url)
            .query(&endpoint.login_params())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&endpoint.login_body())
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("login to {} failed ({}): {}", endpoint.base_url, status, error_text);
        }

        let body: serde_json::Value = resp.json().await?;
        ensure_success(&body)?;
        let token = body
            .pointer("/data/token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("login response missing data.token"))?
            .to_string();

        Ok(Self {
            client,
            base_url: endpoint.base_url.clone(),
            token,
            sequence_id: 0,
        })
    }

    fn auth_header(&self) -> String {
        format!("Snowflake Token=\"{}\"", self.token)
    }

    async fn poll_result(&self, result_url: &str) -> anyhow::Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, result_url);
        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            let body: serde_json::Value = self
                .client
                .get(&url)
                .header("Authorization", self.auth_header())
                .header("Accept", "application/json")
                .send()
                .await?
                .json()
                .await?;
            if !is_in_progress(&body) {
                return Ok(body);
            }
        }
    }
}

#[async_trait]
impl SqlSession for RestSession {
    async fn execute(&mut self, sql: &str) -> anyhow::Result<Vec<Row>> {
        self.sequence_id += 1;
        let url = format!("{}/queries/v1/query-request", self.base_url);
        let resp = self
            .client
            .post(&url)
            .query(&[("requestId", uuid::Uuid::new_v4().to_string())])
            .header("Authorization", self.auth_header())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&json!({
                "sqlText": sql,
                "asyncExec": false,
                "sequenceId": self.sequence_id,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("query request failed ({}): {}", status, error_text);
        }

        let mut body: serde_json::Value = resp.json().await?;
        if is_in_progress(&body) {
            let result_url = body
                .pointer("/data/getResultUrl")
                .and_then(|v| v.as_str())
                .ok_or_else(|| anyhow::anyhow!("in-progress response without getResultUrl"))?
                .to_string();
            body = self.poll_result(&result_url).await?;
        }
        parse_rowset(&body)
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        let url = format!("{}/session", self.base_url);
        let resp = self
            .client
            .post(&url)
            .query(&[("delete", "true")])
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        if !resp.status().is_success() {
            anyhow::bail!("session close failed ({})", resp.status());
        }
        Ok(())
    }
}

fn is_in_progress(body: &serde_json::Value) -> bool {
    body.get("code")
        .and_then(|c| c.as_str())
        .is_some_and(|c| IN_PROGRESS_CODES.contains(&c))
}

fn ensure_success(body: &serde_json::Value) -> anyhow::Result<()> {
    if body.get("success").and_then(|s| s.as_bool()) == Some(false) {
        let msg = body
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error");
        let code = body.get("code").and_then(|c| c.as_str()).unwrap_or("-");
        anyhow::bail!("backend error {}: {}", code, msg);
    }
    Ok(())
}

/// Rows from the first rowset. Chunked result sets beyond it are not fetched;
/// benchmark queries discard rows and the bookkeeping queries are small.
pub fn parse_rowset(body: &serde_json::Value) -> anyhow::Result<Vec<Row>> {
    ensure_success(body)?;
    let rowset = match body.pointer("/data/rowset") {
        None | Some(serde_json::Value::Null) => return Ok(Vec::new()),
        Some(serde_json::Value::String(raw)) => serde_json::from_str(raw)?,
        Some(v) => v.clone(),
    };
    let rows = rowset
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("rowset is not an array"))?
        .iter()
        .map(|r| r.as_array().cloned().unwrap_or_default())
        .collect();
    Ok(rows)
}

/// Logs in a fresh [`RestSession`] per `open()`.
pub struct RestConnectionFactory {
    name: &'static str,
    endpoint: RestEndpoint,
    client: reqwest::Client,
}

impl RestConnectionFactory {
    pub fn new(name: &'static str, endpoint: RestEndpoint) -> Self {
        Self {
            name,
            endpoint,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ConnectionFactory for RestConnectionFactory {
    async fn open(&self) -> anyhow::Result<Box<dyn SqlSession>> {
        let session = RestSession::login(self.client.clone(), &self.endpoint).await?;
        Ok(Box::new(session))
    }

    fn backend_name(&self) -> &'static str {
        self.name
    }
}
