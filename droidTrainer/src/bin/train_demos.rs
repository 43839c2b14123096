use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

use asteroid_droid::cli::cli::TrainDemosArgs;
use asteroid_droid::config::schema::ObservationSchema;
use asteroid_droid::training::pipeline::{run_demo_training, DemoTrainConfig};
use asteroid_droid::utils::logging;

fn main() -> Result<()> {
    let args = TrainDemosArgs::parse();

    logging::init_logging(args.enable_timing());

    if args.device() != "cpu" {
        bail!(
            "Unsupported device '{}': this trainer only runs on the CPU",
            args.device()
        );
    }

    let schema = ObservationSchema::demo_v1();
    println!("Asteroid Droid Demonstration Trainer");
    println!(
        "Schema {} ({} observations, {} actions), demo file {}",
        schema.version(),
        schema.obs_dim(),
        schema.action_dim(),
        args.demo_file()
    );

    let seed = args.seed().unwrap_or_else(rand::random);
    if args.seed().is_some() {
        println!("Using fixed seed {}", seed);
    }

    let config = DemoTrainConfig {
        demo_path: PathBuf::from(args.demo_file()),
        epochs: args.epochs(),
        batch_size: args.batch_size(),
        learning_rate: args.learning_rate(),
        output_dir: PathBuf::from(args.output_dir()),
        resume_from: args.resume().map(PathBuf::from),
        seed,
    };

    let report = run_demo_training(&config)?;

    println!(
        "✅ Training complete: {} epochs run, final loss {:.6}, best loss {:.6}",
        report.epochs_run, report.final_loss, report.best_loss
    );
    println!("Artifact written to {}", report.artifact_path.display());

    logging::print_timing_report();

    Ok(())
}
