use std::collections::BTreeMap;

use serde::Serialize;

use crate::outcome::Outcome;

/// Per-cycle count of outcomes keyed by signature.
///
/// The `"error"` key is always present, even at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Aggregate {
    counts: BTreeMap<String, u64>,
}

impl Default for Aggregate {
    fn default() -> Self { Self::new() }
}

impl Aggregate {
    pub const ERROR_KEY: &'static str = "error";

    pub fn new() -> Self {
        let mut counts = BTreeMap::new();
        counts.insert(Self::ERROR_KEY.to_string(), 0);
        Self { counts }
    }

    pub fn record(&mut self, outcome: &Outcome) {
        *self.counts.entry(outcome.signature()).or_insert(0) += 1;
    }

    /// Count for `signature`, zero when it was never recorded.
    pub fn count(&self, signature: &str) -> u64 {
        self.counts.get(signature).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 { self.counts.values().sum() }

    pub fn len(&self) -> usize { self.counts.len() }

    pub fn is_empty(&self) -> bool { self.total() == 0 }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn to_json_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

impl<'a> FromIterator<&'a Outcome> for Aggregate {
    fn from_iter<I: IntoIterator<Item = &'a Outcome>>(iter: I) -> Self {
        let mut agg = Aggregate::new();
        for outcome in iter {
            agg.record(outcome);
        }
        agg
    }
}

pub fn aggregate<'a>(outcomes: impl IntoIterator<Item = &'a Outcome>) -> Aggregate {
    outcomes.into_iter().collect()
}
