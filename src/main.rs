mod cli;
mod commands;
mod logging;

use std::path::Path;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use cykel_calendar::config::Settings;

use crate::cli::{Cli, Command};
use crate::commands::AppState;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

const DEFAULT_CONFIG: &str = "cykel.toml";

/// An explicitly named config file has to exist; the default one is optional.
fn config_source(explicit: Option<&Path>) -> (&Path, bool) {
    match explicit {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG), false),
    }
}

fn run(cli: Cli) -> Result<()> {
    let (path, required) = config_source(cli.config.as_deref());
    let settings = Settings::load(path, required)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    let today = cli
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let state = AppState::new(settings, today);

    match cli.command {
        Command::Predict(args) => commands::predict(&state, args),
        Command::Calculate(args) => commands::calculate(&state, args),
        Command::Calendar(args) => commands::calendar(&state, args),
        Command::Phase(args) => commands::phase(&state, args),
        Command::Save(args) => commands::save(&state, args),
        Command::Show(args) => commands::show(&state, args),
        Command::Wipe(args) => commands::wipe(&state, args),
    }
}
