use std::fmt;

use serde_json::Value;

use crate::aggregate::Aggregate;
use crate::transport::AttemptError;

/// Terminal result of one logical request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Value),
    /// Every attempt failed; `last_error` is what the final attempt saw.
    Exhausted { attempts: u32, last_error: AttemptError },
    /// The request itself failed outside the retry path (e.g. it panicked).
    Error(String),
}

impl Outcome {
    pub const EXHAUSTED: &'static str = "exhausted";

    /// Key under which this outcome is counted.
    ///
    /// Successful bodies map to their compact JSON text, so two bodies that
    /// serialize identically are counted together.
    pub fn signature(&self) -> String {
        match self {
            Outcome::Success(v) => v.to_string(),
            Outcome::Exhausted { .. } => Self::EXHAUSTED.to_string(),
            Outcome::Error(_) => Aggregate::ERROR_KEY.to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::Exhausted { .. } => "exhausted",
            Outcome::Error(_) => "error",
        }
    }

    pub fn is_success(&self) -> bool { matches!(self, Outcome::Success(_)) }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success(v) => write!(f, "{}", v),
            Outcome::Exhausted { attempts, last_error } => {
                write!(f, "exhausted after {} attempts: {}", attempts, last_error)
            }
            Outcome::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}
