use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use asteroid_droid::cli::cli::PretrainArgs;
use asteroid_droid::config::schema::ObservationSchema;
use asteroid_droid::training::pipeline::{run_pretrain, PretrainConfig};
use asteroid_droid::utils::logging;

fn main() -> Result<()> {
    let args = PretrainArgs::parse();

    logging::init_logging(args.enable_timing());

    let schema = ObservationSchema::heuristic_v2();
    println!("Asteroid Droid Pretrainer");
    println!(
        "Schema {} ({} observations, {} actions), {} samples, {} epochs",
        schema.version(),
        schema.obs_dim(),
        schema.action_dim(),
        args.samples(),
        args.epochs()
    );

    let seed = args.seed().unwrap_or_else(rand::random);
    if args.seed().is_some() {
        println!("Using fixed seed {}", seed);
    }

    let config = PretrainConfig {
        samples: args.samples(),
        epochs: args.epochs(),
        batch_size: args.batch_size(),
        output_path: PathBuf::from(args.output()),
        resume_from: args.resume().map(PathBuf::from),
        checkpoint_interval: args.checkpoint_interval(),
        seed,
        history_dir: args.history_dir().map(PathBuf::from),
    };

    let report = run_pretrain(&config)?;

    println!(
        "✅ Training complete: {} epochs run, final loss {:.6}, best loss {:.6}",
        report.epochs_run, report.final_loss, report.best_loss
    );

    logging::print_timing_report();

    Ok(())
}
