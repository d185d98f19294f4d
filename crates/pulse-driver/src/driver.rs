use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::future::join_all;
use futures::FutureExt as _;
use pulse_common::config::DriverConfig;
use pulse_common::{PulseError, Result};
use pulse_obs::{BATCH_SECONDS, OUTCOMES_TOTAL, SINK_FAILURES_TOTAL};
use tokio::sync::watch;
use tokio::time;

use crate::aggregate::Aggregate;
use crate::outcome::Outcome;
use crate::retry::{attempt_request, RetryPolicy};
use crate::sink::Sink;
use crate::target::TargetDescriptor;
use crate::transport::Transport;

/// Result of one batch cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub aggregate: Aggregate,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub sink_failures: u64,
}

/// Fires a fixed batch of concurrent requests per cycle against one target.
///
/// All requests of a batch run as futures on the calling task; there is no
/// thread pool. Batches never overlap: the next cadence wait starts only once
/// the previous batch has been aggregated and written.
pub struct Driver<T> {
    transport: T,
    target: TargetDescriptor,
    policy: RetryPolicy,
    parallelism: usize,
    cadence: Duration,
    max_cycles: Option<u64>,
}

impl<T: Transport> Driver<T> {
    pub fn new(transport: T, target: TargetDescriptor) -> Self {
        Self {
            transport,
            target,
            policy: RetryPolicy::default(),
            parallelism: 100,
            cadence: Duration::from_secs(1),
            max_cycles: None,
        }
    }

    pub fn from_config(transport: T, target: TargetDescriptor, cfg: &DriverConfig) -> Self {
        Self::new(transport, target)
            .with_policy(RetryPolicy::from_config(cfg))
            .with_parallelism(cfg.parallelism)
            .with_cadence(Duration::from_millis(cfg.cadence_ms))
            .with_max_cycles(cfg.max_cycles)
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_cadence(mut self, cadence: Duration) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn with_max_cycles(mut self, max_cycles: Option<u64>) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    pub fn transport(&self) -> &T { &self.transport }
    pub fn target(&self) -> &TargetDescriptor { &self.target }
    pub fn policy(&self) -> &RetryPolicy { &self.policy }
    pub fn parallelism(&self) -> usize { self.parallelism }

    /// Launches `parallelism` logical requests and waits for all of them.
    ///
    /// Returns exactly one outcome per slot, in slot order. A request that
    /// panics is reported as `Outcome::Error` without disturbing the others.
    pub async fn run_batch(&self) -> Vec<Outcome> {
        let requests = (0..self.parallelism).map(|slot| {
            AssertUnwindSafe(attempt_request(&self.transport, &self.target, &self.policy, slot))
                .catch_unwind()
                .map(|res| res.unwrap_or_else(|panic| Outcome::Error(panic_message(panic.as_ref()))))
        });
        join_all(requests).await
    }

    /// One batch, aggregated, with its wall-clock duration.
    pub async fn run_cycle(&self) -> CycleReport {
        let start = Instant::now();
        let outcomes = self.run_batch().await;
        let elapsed = start.elapsed();
        for outcome in &outcomes {
            OUTCOMES_TOTAL.with_label_values(&[outcome.kind()]).inc();
        }
        BATCH_SECONDS.observe(elapsed.as_secs_f64());
        let aggregate: Aggregate = outcomes.iter().collect();
        tracing::info!(
            target: "driver",
            requests = outcomes.len(),
            exhausted = aggregate.count(Outcome::EXHAUSTED),
            "actual elapsed {:.3}s",
            elapsed.as_secs_f64()
        );
        CycleReport { aggregate, elapsed }
    }

    /// Issues a single request and fails if it exhausts its attempts.
    pub async fn preflight(&self) -> Result<()> {
        match attempt_request(&self.transport, &self.target, &self.policy, 0).await {
            Outcome::Exhausted { last_error, .. } => {
                Err(PulseError::Unreachable(format!("{}: {}", self.target.url(), last_error)))
            }
            _ => Ok(()),
        }
    }

    /// Wait, batch, aggregate, persist; repeated until `shutdown` turns true,
    /// its sender is dropped, or `max_cycles` is reached.
    ///
    /// A failed sink write is logged and counted, and the loop carries on.
    pub async fn run<S: Sink>(&self, sink: &mut S, mut shutdown: watch::Receiver<bool>) -> RunSummary {
        let mut summary = RunSummary::default();
        loop {
            if self.max_cycles.is_some_and(|max| summary.cycles >= max) {
                break;
            }
            tokio::select! {
                _ = time::sleep(self.cadence) => {}
                _ = shutdown.wait_for(|stop| *stop) => {
                    tracing::info!(target: "driver", "shutdown signal received");
                    break;
                }
            }
            let report = self.run_cycle().await;
            if let Err(e) = sink.append(&report.aggregate) {
                tracing::error!(target: "driver", "failed to persist aggregate: {}", e);
                SINK_FAILURES_TOTAL.inc();
                summary.sink_failures += 1;
            }
            summary.cycles += 1;
        }
        tracing::info!(target: "driver", cycles = summary.cycles, sink_failures = summary.sink_failures, "driver stopped");
        summary
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "request panicked".to_string()
    }
}
