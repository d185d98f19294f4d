use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use pulse_common::Result;

use crate::aggregate::Aggregate;

/// Destination for per-cycle aggregates.
pub trait Sink {
    fn append(&mut self, aggregate: &Aggregate) -> Result<()>;
}

/// Appends one JSON object per line, creating the file on first write.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    pub fn path(&self) -> &Path { &self.path }
}

impl Sink for JsonlSink {
    fn append(&mut self, aggregate: &Aggregate) -> Result<()> {
        let line = aggregate.to_json_line()?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

impl Sink for Vec<Aggregate> {
    fn append(&mut self, aggregate: &Aggregate) -> Result<()> {
        self.push(aggregate.clone());
        Ok(())
    }
}
