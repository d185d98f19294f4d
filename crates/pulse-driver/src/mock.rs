//! Scripted transport for exercising the driver without a network.

use std::sync::Mutex;

use serde_json::Value;
use tokio::time::Instant;

use crate::target::TargetDescriptor;
use crate::transport::{Attempt, AttemptError, Transport};

#[derive(Debug, Clone)]
pub enum Reply {
    Ok(Value),
    Fail(AttemptError),
    /// Never completes; only the attempt timeout ends it.
    Hang,
    Panic,
}

pub struct ScriptedTransport<F> {
    script: F,
    log: Mutex<Vec<(Attempt, Instant)>>,
}

impl<F> ScriptedTransport<F>
where
    F: Fn(Attempt) -> Reply + Send + Sync,
{
    pub fn new(script: F) -> Self {
        Self { script, log: Mutex::new(Vec::new()) }
    }

    /// Every attempt seen so far with the (tokio) instant it started.
    pub fn attempts(&self) -> Vec<(Attempt, Instant)> {
        self.log.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize { self.log.lock().unwrap().len() }
}

pub fn always_ok(body: Value) -> ScriptedTransport<impl Fn(Attempt) -> Reply + Send + Sync> {
    ScriptedTransport::new(move |_| Reply::Ok(body.clone()))
}

pub fn always_fail(err: AttemptError) -> ScriptedTransport<impl Fn(Attempt) -> Reply + Send + Sync> {
    ScriptedTransport::new(move |_| Reply::Fail(err.clone()))
}

impl<F> Transport for ScriptedTransport<F>
where
    F: Fn(Attempt) -> Reply + Send + Sync,
{
    async fn send(&self, _target: &TargetDescriptor, attempt: Attempt) -> Result<Value, AttemptError> {
        self.log.lock().unwrap().push((attempt, Instant::now()));
        match (self.script)(attempt) {
            Reply::Ok(v) => Ok(v),
            Reply::Fail(e) => Err(e),
            Reply::Hang => std::future::pending().await,
            Reply::Panic => panic!("scripted panic in slot {}", attempt.slot),
        }
    }
}
