use super::ContainerManager;
use crate::config::EmbucketSettings;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::process::Command;

const COMPOSE_DIR: &str = "/home/ec2-user";
const SERVICE: &str = "embucket";

/// Restarts the Embucket docker-compose service over SSH and polls its
/// `/health` endpoint until it answers.
#[derive(Debug, Clone)]
pub struct SshDockerManager {
    pub host: String,
    pub user: String,
    pub key_path: String,
    pub health_url: String,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub health_timeout: Duration,
    pub command_timeout: Duration,
    pub shutdown_grace: Duration,
    client: reqwest::Client,
}

impl SshDockerManager {
    pub fn new(host: &str, port: u16, user: &str, key_path: &str) -> Self {
        Self {
            host: host.to_string(),
            user: user.to_string(),
            key_path: expand_home(key_path),
            health_url: format!("http://{}:{}/health", host, port),
            max_retries: 30,
            retry_delay: Duration::from_secs(10),
            health_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(120),
            shutdown_grace: Duration::from_secs(5),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_settings(s: &EmbucketSettings) -> Self {
        Self::new(s.host(), s.port(), s.ec2_user(), s.ssh_key_path())
    }

    pub fn ssh_args(&self, remote: &str) -> Vec<String> {
        vec![
            "-i".into(),
            self.key_path.clone(),
            "-o".into(),
            "StrictHostKeyChecking=no".into(),
            "-o".into(),
            "ConnectTimeout=10".into(),
            format!("{}@{}", self.user, self.host),
            remote.to_string(),
        ]
    }

    async fn run_ssh(&self, remote: &str) -> bool {
        tracing::debug!(event = "quarry.ssh.exec", host = %self.host, command = remote);
        let fut = Command::new("ssh")
            .args(self.ssh_args(remote))
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.command_timeout, fut).await {
            Ok(Ok(out)) if out.status.success() => true,
            Ok(Ok(out)) => {
                tracing::error!(
                    event = "quarry.ssh.failed",
                    code = ?out.status.code(),
                    stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                    "ssh command failed: {}", remote
                );
                false
            }
            Ok(Err(e)) => {
                tracing::error!(event = "quarry.ssh.failed", error = %e, "ssh could not start");
                false
            }
            Err(_) => {
                tracing::error!(
                    event = "quarry.ssh.timeout",
                    timeout_s = self.command_timeout.as_secs(),
                    "ssh command timed out: {}", remote
                );
                false
            }
        }
    }

    async fn compose(&self, action: &str) -> bool {
        self.run_ssh(&format!("cd {} && docker-compose {} {}", COMPOSE_DIR, action, SERVICE))
            .await
    }

    pub async fn is_healthy(&self) -> bool {
        match self
            .client
            .get(&self.health_url)
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(event = "quarry.health.unreachable", error = %e);
                false
            }
        }
    }

    async fn wait_until_healthy(&self) -> bool {
        for attempt in 1..=self.max_retries {
            if self.is_healthy().await {
                tracing::info!(event = "quarry.container.ready", attempts = attempt);
                return true;
            }
            if attempt < self.max_retries {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
        tracing::error!(
            event = "quarry.container.unhealthy",
            attempts = self.max_retries,
            "container did not become healthy"
        );
        false
    }
}

#[async_trait]
impl ContainerManager for SshDockerManager {
    async fn restart(&self) -> bool {
        let start = Instant::now();
        if !self.compose("stop").await {
            return false;
        }
        tokio::time::sleep(self.shutdown_grace).await;
        if !self.compose("start").await {
            return false;
        }
        if !self.wait_until_healthy().await {
            return false;
        }
        tracing::info!(
            event = "quarry.container.restarted",
            elapsed_ms = start.elapsed().as_millis() as u64
        );
        true
    }
}

fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path.to_string(),
    }
}
