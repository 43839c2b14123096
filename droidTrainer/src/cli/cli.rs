use clap::Parser;

/// Arguments for the heuristic-imitation pretrainer.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct PretrainArgs {
    #[arg(short = 'n', long, default_value_t = 200000, help = "Number of synthetic observations to label")]
    samples: usize,

    #[arg(short, long, default_value_t = 1000)]
    epochs: u64,

    #[arg(short, long, default_value_t = 256)]
    batch_size: usize,

    #[arg(short, long, default_value = "pretrained_model.json")]
    output: String,

    #[arg(short, long, help = "Artifact to resume training from")]
    resume: Option<String>,

    #[arg(long, default_value_t = 0, help = "Rewrite the artifact every N epochs (0 disables)")]
    checkpoint_interval: u64,

    #[arg(long, help = "Random seed for deterministic data generation and shuffling")]
    seed: Option<u64>,

    #[arg(long, help = "Directory for per-epoch training history CSVs")]
    history_dir: Option<String>,

    #[arg(long, default_value_t = false)]
    enable_timing: bool,
}

impl PretrainArgs {
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn epochs(&self) -> u64 {
        self.epochs
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn resume(&self) -> Option<&str> {
        self.resume.as_deref()
    }

    pub fn checkpoint_interval(&self) -> u64 {
        self.checkpoint_interval
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn history_dir(&self) -> Option<&str> {
        self.history_dir.as_deref()
    }

    pub fn enable_timing(&self) -> bool {
        self.enable_timing
    }
}


/// Arguments for the demonstration-trace trainer.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct TrainDemosArgs {
    #[arg(short, long, help = "JSON file of recorded (observation, action) frames")]
    demo_file: String,

    #[arg(short, long, default_value_t = 20)]
    epochs: u64,

    #[arg(short, long, default_value_t = 64)]
    batch_size: usize,

    #[arg(short, long, default_value_t = 0.0003)]
    learning_rate: f64,

    #[arg(short, long, default_value = "models")]
    output_dir: String,

    #[arg(short = 'r', long, help = "Artifact to resume training from")]
    resume: Option<String>,

    #[arg(long, default_value = "cpu", help = "Compute device (only 'cpu' is supported)")]
    device: String,

    #[arg(long, help = "Random seed for deterministic initialization and shuffling")]
    seed: Option<u64>,

    #[arg(long, default_value_t = false)]
    enable_timing: bool,
}

impl TrainDemosArgs {
    pub fn demo_file(&self) -> &str {
        &self.demo_file
    }

    pub fn epochs(&self) -> u64 {
        self.epochs
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn output_dir(&self) -> &str {
        &self.output_dir
    }

    pub fn resume(&self) -> Option<&str> {
        self.resume.as_deref()
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn enable_timing(&self) -> bool {
        self.enable_timing
    }
}
