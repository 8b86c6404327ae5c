//! CSV intake for screening batches.

mod parser;

use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::workflows::screening::RawRecord;

#[derive(Debug)]
pub enum IntakeError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for IntakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntakeError::Io(err) => write!(f, "failed to read student export: {}", err),
            IntakeError::Csv(err) => write!(f, "invalid student CSV data: {}", err),
        }
    }
}

impl std::error::Error for IntakeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IntakeError::Io(err) => Some(err),
            IntakeError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for IntakeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for IntakeError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub struct RecordImporter;

impl RecordImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<RawRecord>, IntakeError> {
        let file = std::fs::File::open(path.as_ref())?;
        let records = Self::from_reader(file)?;
        debug!(
            path = %path.as_ref().display(),
            rows = records.len(),
            "imported student export"
        );
        Ok(records)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<RawRecord>, IntakeError> {
        Ok(parser::parse_records(reader)?)
    }
}
