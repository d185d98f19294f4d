//! Request driver: concurrent batches with bounded retry and outcome aggregation

pub mod aggregate;
pub mod driver;
#[cfg(feature = "mock")]
pub mod mock;
pub mod outcome;
pub mod retry;
pub mod sink;
pub mod target;
pub mod transport;

pub use aggregate::{aggregate, Aggregate};
pub use driver::{CycleReport, Driver, RunSummary};
pub use outcome::Outcome;
pub use retry::{attempt_request, RetryPolicy};
pub use sink::{JsonlSink, Sink};
pub use target::TargetDescriptor;
pub use transport::{Attempt, AttemptError, HttpTransport, Transport};
