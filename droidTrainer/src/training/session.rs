use serde::{Deserialize, Serialize};

use crate::config::constants::{
    EARLY_STOP_MIN_EPOCHS, EARLY_STOP_PATIENCE, FRESH_LEARNING_RATE, RESUME_LEARNING_RATE,
};

/// Mutable state of a training run, carried across a resume chain.
///
/// Everything the exporter writes into artifact metadata lives here with an
/// explicit value, so a resumed run never has to guess which fields a prior
/// run happened to record. The whole record serializes for inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSession {
    /// Epochs completed across every run in the chain
    cumulative_epochs: u64,
    /// Lowest average epoch loss seen so far, if any epoch has finished
    best_loss: Option<f64>,
    /// Game episode counter, opaque here, carried through for the runtime
    episode: u64,
    /// Best game score, opaque here, carried through for the runtime
    best_score: f64,
    /// Path of the artifact this run resumed from
    resumed_from: Option<String>,
    /// Learning rate currently in effect
    learning_rate: f64,
    /// Epochs since the last strict improvement of best_loss
    stale_epochs: u32,
}

impl TrainingSession {
    /// State for a run starting from freshly initialized parameters.
    pub fn fresh() -> Self {
        Self {
            cumulative_epochs: 0,
            best_loss: None,
            episode: 0,
            best_score: 0.0,
            resumed_from: None,
            learning_rate: FRESH_LEARNING_RATE,
            stale_epochs: 0,
        }
    }

    /// State for a run that successfully restored a prior artifact. Uses
    /// the lower resume learning rate.
    pub fn resumed(
        prior_epochs: u64,
        prior_best_loss: Option<f64>,
        episode: u64,
        best_score: f64,
        source: String,
    ) -> Self {
        Self {
            cumulative_epochs: prior_epochs,
            best_loss: prior_best_loss,
            episode,
            best_score,
            resumed_from: Some(source),
            learning_rate: RESUME_LEARNING_RATE,
            stale_epochs: 0,
        }
    }

    pub fn cumulative_epochs(&self) -> u64 {
        self.cumulative_epochs
    }

    pub fn best_loss(&self) -> Option<f64> {
        self.best_loss
    }

    pub fn episode(&self) -> u64 {
        self.episode
    }

    pub fn best_score(&self) -> f64 {
        self.best_score
    }

    pub fn resumed_from(&self) -> Option<&str> {
        self.resumed_from.as_deref()
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn stale_epochs(&self) -> u32 {
        self.stale_epochs
    }

    /// Records one completed epoch. Returns true when the loss strictly
    /// improved on the best seen so far.
    pub fn observe_epoch(&mut self, loss: f64) -> bool {
        self.cumulative_epochs += 1;
        let improved = self.best_loss.map_or(true, |best| loss < best);
        if improved {
            self.best_loss = Some(loss);
            self.stale_epochs = 0;
        } else {
            self.stale_epochs += 1;
        }
        improved
    }

    /// True once the stale window is exhausted and enough total epochs have
    /// passed that early noise cannot be the cause.
    pub fn should_stop(&self) -> bool {
        self.stale_epochs >= EARLY_STOP_PATIENCE && self.cumulative_epochs > EARLY_STOP_MIN_EPOCHS
    }

    /// Mirrors a scheduler-driven learning rate change into the session.
    pub fn set_learning_rate(&mut self, lr: f64) {
        self.learning_rate = lr;
    }
}
