//! In-process doubles for sessions, connection factories and containers.
//!
//! Test-only; built with `cfg(test)` or the `test-support` feature.

use super::{ConnectionFactory, ContainerManager, Row, SqlSession};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub type Responder = Arc<dyn Fn(&str) -> anyhow::Result<Vec<Row>> + Send + Sync>;

/// Every statement executed through fakes sharing this log, in order.
#[derive(Clone, Default)]
pub struct StatementLog(Arc<Mutex<Vec<String>>>);

impl StatementLog {
    pub fn push(&self, sql: &str) {
        self.0.lock().unwrap().push(sql.to_string());
    }

    pub fn statements(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count_matching(&self, needle: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.contains(needle))
            .count()
    }
}

pub struct FakeSession {
    responder: Responder,
    log: StatementLog,
    closes: Arc<AtomicUsize>,
    fail_close: bool,
}

impl FakeSession {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<Vec<Row>> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            log: StatementLog::default(),
            closes: Arc::new(AtomicUsize::new(0)),
            fail_close: false,
        }
    }

    pub fn log(&self) -> StatementLog {
        self.log.clone()
    }
}

#[async_trait]
impl SqlSession for FakeSession {
    async fn execute(&mut self, sql: &str) -> anyhow::Result<Vec<Row>> {
        self.log.push(sql);
        (self.responder)(sql)
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            anyhow::bail!("connection already gone");
        }
        Ok(())
    }
}

/// Hands out [`FakeSession`]s that share one responder and statement log.
pub struct FakeConnectionFactory {
    responder: Responder,
    log: StatementLog,
    opens: AtomicUsize,
    closes: Arc<AtomicUsize>,
    fail_close: bool,
}

impl FakeConnectionFactory {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<Vec<Row>> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            log: StatementLog::default(),
            opens: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
            fail_close: false,
        }
    }

    /// Sessions from this factory fail on `close()`.
    pub fn with_failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn log(&self) -> StatementLog {
        self.log.clone()
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionFactory for FakeConnectionFactory {
    async fn open(&self) -> anyhow::Result<Box<dyn SqlSession>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            responder: self.responder.clone(),
            log: self.log.clone(),
            closes: self.closes.clone(),
            fail_close: self.fail_close,
        }))
    }

    fn backend_name(&self) -> &'static str {
        "fake"
    }
}

/// Replays scripted restart outcomes, then `default`.
pub struct FakeContainerManager {
    outcomes: Mutex<VecDeque<bool>>,
    default: bool,
    restarts: AtomicUsize,
}

impl FakeContainerManager {
    pub fn healthy() -> Self {
        Self::scripted(Vec::new(), true)
    }

    pub fn scripted(outcomes: Vec<bool>, default: bool) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            default,
            restarts: AtomicUsize::new(0),
        }
    }

    pub fn restarts(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContainerManager for FakeContainerManager {
    async fn restart(&self) -> bool {
        self.restarts.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.default)
    }
}
