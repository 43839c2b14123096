use crate::config::constants::*;
use crate::model::network::{Gradients, PolicyNetwork};

/// Adam optimizer with bias correction, one moment pair per parameter.
pub struct Adam {
    lr: f64,
    beta1: f64,
    beta2: f64,
    eps: f64,
    steps: u64,
    first_moment: Vec<Vec<f32>>,
    second_moment: Vec<Vec<f32>>,
}

impl Adam {
    pub fn new(network: &PolicyNetwork, lr: f64) -> Self {
        let zeros: Vec<Vec<f32>> = network
            .blocks()
            .iter()
            .map(|b| vec![0.0f32; b.data().len()])
            .collect();
        Self {
            lr,
            beta1: ADAM_BETA1,
            beta2: ADAM_BETA2,
            eps: ADAM_EPS,
            steps: 0,
            first_moment: zeros.clone(),
            second_moment: zeros,
        }
    }

    pub fn learning_rate(&self) -> f64 {
        self.lr
    }

    pub fn set_learning_rate(&mut self, lr: f64) {
        self.lr = lr;
    }

    /// Applies one update to every parameter block.
    ///
    /// Blocks whose gradients are entirely zero keep zero moments, so their
    /// parameters never move.
    pub fn step(&mut self, network: &mut PolicyNetwork, grads: &Gradients) {
        self.steps += 1;
        let bias1 = 1.0 - self.beta1.powi(self.steps as i32);
        let bias2 = 1.0 - self.beta2.powi(self.steps as i32);

        for (index, grad_block) in grads.blocks().iter().enumerate() {
            let params = network.block_data_mut(index);
            let moments1 = &mut self.first_moment[index];
            let moments2 = &mut self.second_moment[index];
            for k in 0..grad_block.len() {
                let g = grad_block[k] as f64;
                let m = self.beta1 * moments1[k] as f64 + (1.0 - self.beta1) * g;
                let v = self.beta2 * moments2[k] as f64 + (1.0 - self.beta2) * g * g;
                moments1[k] = m as f32;
                moments2[k] = v as f32;
                let m_hat = m / bias1;
                let v_hat = v / bias2;
                params[k] -= (self.lr * m_hat / (v_hat.sqrt() + self.eps)) as f32;
            }
        }
    }
}

/// Caps the global gradient norm at `max_norm`, scaling every block down
/// proportionally when the cap is exceeded. Returns the pre-clip norm.
pub fn clip_global_norm(grads: &mut Gradients, max_norm: f64) -> f64 {
    let norm = grads.global_norm();
    let coef = max_norm / (norm + GRAD_CLIP_EPS);
    if coef < 1.0 {
        grads.scale(coef as f32);
    }
    norm
}

/// Halves the learning rate after a run of epochs without relative
/// improvement, mirroring reduce-on-plateau scheduling.
pub struct PlateauScheduler {
    factor: f64,
    patience: u32,
    threshold: f64,
    best: f64,
    bad_epochs: u32,
}

impl PlateauScheduler {
    pub fn new() -> Self {
        Self {
            factor: PLATEAU_FACTOR,
            patience: PLATEAU_PATIENCE,
            threshold: PLATEAU_REL_THRESHOLD,
            best: f64::INFINITY,
            bad_epochs: 0,
        }
    }

    /// Feeds one epoch loss. Returns the new learning rate when a
    /// reduction was triggered.
    pub fn observe(&mut self, loss: f64, optimizer: &mut Adam) -> Option<f64> {
        if loss < self.best * (1.0 - self.threshold) {
            self.best = loss;
            self.bad_epochs = 0;
        } else {
            self.bad_epochs += 1;
        }

        if self.bad_epochs > self.patience {
            let reduced = optimizer.learning_rate() * self.factor;
            optimizer.set_learning_rate(reduced);
            self.bad_epochs = 0;
            return Some(reduced);
        }
        None
    }
}

impl Default for PlateauScheduler {
    fn default() -> Self {
        Self::new()
    }
}
