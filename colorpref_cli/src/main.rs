//! `colorpref`: rate colors in the terminal and let a small network learn
//! what you like.

mod commands;
mod terminal;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use colorpref_core::{
    ColorSampler, ModelGuard, ModelOrigin, PredictOutcome, PreferenceConfig, PreferenceModel,
    SessionController, SessionError, SessionJournal, SessionOptions,
};

use commands::{Command, HELP};
use terminal::TerminalView;

#[derive(Debug, Parser)]
#[command(name = "colorpref", version, about = "Teach a model which colors you like")]
struct Cli {
    /// TOML configuration file; defaults apply if it does not exist.
    #[arg(long, default_value = "config/colorpref.toml")]
    config: PathBuf,

    /// Model file, overriding `model.path` from the config.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Seed for the color sequence (random when omitted).
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = PreferenceConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    if let Some(model_path) = cli.model {
        config.model.path = model_path;
    }

    let (model, origin) = PreferenceModel::open(
        &config.model.path,
        &config.model.spec,
        config.model.on_corrupt,
    )
    .with_context(|| format!("opening model at {}", config.model.path.display()))?;
    let spec = model.spec();
    tracing::info!(
        path = %config.model.path.display(),
        ?origin,
        layers = ?spec.layer_sizes,
        parameters = spec.num_parameters(),
        method = spec.method.name(),
        examples = model.examples_seen(),
        "preference model ready"
    );
    if let ModelOrigin::Reset { reason, backup } = &origin {
        eprintln!(
            "Saved model could not be used ({reason}); it was moved to {} and a new model started.",
            backup.display()
        );
    }

    let sampler = match cli.seed {
        Some(seed) => ColorSampler::seeded(seed),
        None => ColorSampler::from_entropy(),
    };
    let options = SessionOptions {
        autosave_every: config.session.autosave_every,
        journal: config.session.journal.clone().map(SessionJournal::new),
    };

    println!("{HELP}");
    let session = SessionController::new(
        ModelGuard::new(model, config.model.path.clone()),
        sampler,
        config.rating,
        TerminalView::new(io::stdout()),
        options,
    );
    run(session)
}

fn run(mut session: SessionController<TerminalView<io::Stdout>>) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("rating (0-{})> ", session.scale().max_rating());
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let command = match line?.parse::<Command>() {
            Ok(command) => command,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        match command {
            Command::Train(rating) => match session.on_train_requested(rating) {
                Ok(report) => tracing::debug!(
                    iterations = report.iterations,
                    final_error = report.final_error,
                    "trained"
                ),
                Err(SessionError::Rating(err)) => println!("{err}"),
                Err(err) => return Err(err.into()),
            },
            Command::Skip => session.on_skip_requested(),
            Command::Predict => {
                if let PredictOutcome::NotEnoughData = session.on_predict_requested()? {
                    tracing::debug!("prediction requested before any training");
                }
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
            Command::Empty => {}
        }
    }

    let examples = session.model().examples_seen();
    session.shutdown().context("saving model")?;
    tracing::info!(examples, "session finished, model saved");
    Ok(())
}
