use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::config::schema::{ObservationSchema, SchemaMismatch};

/// One recorded gameplay frame: the observation the pilot saw and the
/// action index they chose.
#[derive(Debug, Clone, Deserialize)]
pub struct DemoRecord {
    pub observation: Vec<f32>,
    pub action: usize,
}

/// Errors that can occur when loading demonstration data
#[derive(Debug)]
pub enum DemoLoadError {
    IoError(std::io::Error),
    JsonError(serde_json::Error),
    SchemaError(SchemaMismatch),
    InvalidAction {
        record: usize,
        action: usize,
        action_dim: usize,
    },
    EmptyDataset,
}

impl From<std::io::Error> for DemoLoadError {
    fn from(error: std::io::Error) -> Self {
        DemoLoadError::IoError(error)
    }
}

impl From<serde_json::Error> for DemoLoadError {
    fn from(error: serde_json::Error) -> Self {
        DemoLoadError::JsonError(error)
    }
}

impl From<SchemaMismatch> for DemoLoadError {
    fn from(error: SchemaMismatch) -> Self {
        DemoLoadError::SchemaError(error)
    }
}

impl fmt::Display for DemoLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemoLoadError::IoError(e) => write!(f, "IO error reading demo file: {}", e),
            DemoLoadError::JsonError(e) => write!(f, "Failed to parse demo file: {}", e),
            DemoLoadError::SchemaError(e) => write!(f, "Demo record does not fit schema: {}", e),
            DemoLoadError::InvalidAction {
                record,
                action,
                action_dim,
            } => write!(
                f,
                "Record {} has action {} outside the {}-action space",
                record, action, action_dim
            ),
            DemoLoadError::EmptyDataset => write!(f, "Demo file contains no records"),
        }
    }
}

impl Error for DemoLoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DemoLoadError::IoError(e) => Some(e),
            DemoLoadError::JsonError(e) => Some(e),
            DemoLoadError::SchemaError(e) => Some(e),
            _ => None,
        }
    }
}

/// Loads and validates a demonstration file against the given schema.
///
/// Every record must carry a full observation vector and an in-range action
/// index. An empty file is an error: there is nothing to train on.
pub fn load_demonstrations(
    path: &Path,
    schema: &ObservationSchema,
) -> Result<Vec<DemoRecord>, DemoLoadError> {
    let contents = fs::read_to_string(path)?;
    let records: Vec<DemoRecord> = serde_json::from_str(&contents)?;

    if records.is_empty() {
        return Err(DemoLoadError::EmptyDataset);
    }

    for (index, record) in records.iter().enumerate() {
        schema.check_observation(&record.observation)?;
        if record.action >= schema.action_dim() {
            return Err(DemoLoadError::InvalidAction {
                record: index,
                action: record.action,
                action_dim: schema.action_dim(),
            });
        }
    }

    println!("Loaded {} demo frames from {}", records.len(), path.display());
    Ok(records)
}
