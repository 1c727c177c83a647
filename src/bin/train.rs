use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::prelude::*;

use connect_four_dqn::ai::estimator::InferBackend;
use connect_four_dqn::ai::networks::QNetwork;
use connect_four_dqn::ai::DqnAgent;
use connect_four_dqn::checkpoint::export_policy;
use connect_four_dqn::config::AppConfig;
use connect_four_dqn::game::ConnectFourEnv;
use connect_four_dqn::training::{seeded_rng, CancellationToken, Evaluator, Trainer};

/// Train a Double DQN Connect Four agent.
#[derive(Parser)]
#[command(name = "train", about = "Train a Connect Four Double DQN agent")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override number of training episodes
    #[arg(long)]
    episodes: Option<usize>,

    /// Override learning rate
    #[arg(long)]
    lr: Option<f64>,

    /// Override the base random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Resume training from the latest checkpoint
    #[arg(long, conflicts_with = "load")]
    resume: bool,

    /// Resume training from a specific checkpoint directory
    #[arg(long)]
    load: Option<PathBuf>,

    /// Write the training report (history, evaluations, running loss) as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Skip exporting the trained policy
    #[arg(long)]
    no_export: bool,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_default_config: bool,

    /// Log level: error, warn, info, debug or trace
    #[arg(long, default_value = "info")]
    log_level: Level,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let registry = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_subscriber::filter::LevelFilter::from_level(cli.log_level));
    registry.init();

    if cli.print_default_config {
        print!("{}", AppConfig::default_toml()?);
        return Ok(());
    }

    // Load configuration
    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    // Apply CLI overrides
    if let Some(episodes) = cli.episodes {
        config.training.episodes = episodes;
    }
    if let Some(lr) = cli.lr {
        config.agent.optimizer.learning_rate = lr;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    config.validate().context("validating configuration")?;

    let seed = config.seed;
    let mut agent = DqnAgent::new(
        config.agent.clone(),
        seeded_rng(seed, 0),
        seeded_rng(seed, 1),
    );
    let mut env = ConnectFourEnv::new(config.env.clone());
    let mut evaluator = Evaluator::new(config.eval.clone(), seeded_rng(seed, 2));
    let mut trainer = Trainer::new(
        config.training.clone(),
        config.agent.optimizer.learning_rate,
    )
    .context("preparing trainer")?;

    if let Some(dir) = &cli.load {
        let metadata = trainer
            .checkpoints()
            .restore(&mut agent, dir)
            .with_context(|| format!("loading checkpoint {}", dir.display()))?;
        trainer.resume_from(&metadata);
    } else if cli.resume {
        let metadata = trainer
            .checkpoints()
            .restore_latest(&mut agent)
            .context("loading latest checkpoint")?;
        trainer.resume_from(&metadata);
    }

    let cancel = CancellationToken::new();
    {
        let handle = cancel.clone();
        ctrlc::set_handler(move || {
            if !handle.cancel() {
                eprintln!("\nSIGINT received, finishing the current episode...");
            }
        })
        .context("installing Ctrl-C handler")?;
    }

    let report = trainer
        .train(&mut agent, &mut env, &mut evaluator, &cancel)
        .context("training")?;

    if !cli.no_export {
        export_policy(
            &agent,
            &trainer.config().policies_dir,
            &report.model_id,
            QNetwork::<InferBackend>::NAME,
        )
        .context("exporting policy")?;
    }

    if let Some(path) = &cli.report {
        report
            .write_json(path)
            .with_context(|| format!("writing report to {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }

    if let Some(last) = report.evaluations.last() {
        info!(
            episode = last.episode,
            win_rate = last.record.win_rate,
            draw_rate = last.record.draw_rate,
            finish_pct = last.record.finish_pct,
            block_pct = last.record.block_pct,
            "final evaluation"
        );
    }
    Ok(())
}
