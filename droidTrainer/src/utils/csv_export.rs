use std::error::Error;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;

/// One row of the per-epoch training history CSV.
#[derive(Debug, Clone, Serialize)]
pub struct EpochRecord {
    /// Cumulative epoch index across the resume chain
    pub epoch: u64,
    /// Average loss over the epoch's batches
    pub loss: f64,
    /// Best average epoch loss seen so far
    pub best_loss: f64,
    /// Learning rate in effect during the epoch
    pub learning_rate: f64,
    /// Whether this epoch improved on the best loss
    pub improved: bool,
    /// Wall-clock timestamp when the epoch finished
    pub timestamp: String,
}

impl EpochRecord {
    pub fn new(epoch: u64, loss: f64, best_loss: f64, learning_rate: f64, improved: bool) -> Self {
        Self {
            epoch,
            loss,
            best_loss,
            learning_rate,
            improved,
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Writes training history CSVs into a timestamped run directory.
pub struct TrainingHistoryExporter {
    output_dir: PathBuf,
}

impl TrainingHistoryExporter {
    /// Creates the exporter and its run directory under `output_dir`.
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let full_path = output_dir.as_ref().join(timestamp);
        std::fs::create_dir_all(&full_path)?;
        Ok(Self {
            output_dir: full_path,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes the epoch history to `training_history.csv` and returns the
    /// file's path.
    pub fn export_history(&self, records: &[EpochRecord]) -> Result<PathBuf, Box<dyn Error>> {
        let path = self.output_dir.join("training_history.csv");
        let mut writer = csv::Writer::from_path(&path)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(path)
    }
}
