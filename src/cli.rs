use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Cycle predictions and calendar from the command line.
#[derive(Parser)]
#[command(name = "cykel", version, about = "Period, fertile window and PMS calendar")]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to TOML configuration file. Without it, `cykel.toml` is read if present.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Treat this date as today (YYYY-MM-DD).
    #[arg(long, global = true)]
    pub today: Option<NaiveDate>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the next period, fertile window and ovulation day.
    Predict(ProfileArgs),
    /// Show the compact cycle record (current period end included).
    Calculate(ProfileArgs),
    /// Render a month with period, fertile, ovulation and PMS days marked.
    Calendar(CalendarArgs),
    /// Show the cycle phase of a date.
    Phase(PhaseArgs),
    /// Save a profile to the encrypted store.
    Save(SaveArgs),
    /// Print the saved profile.
    Show(StoreArgs),
    /// Delete the saved profile.
    Wipe(StoreArgs),
}

/// Where the profile comes from: flags, the demo profile, or the store.
#[derive(Args, Clone)]
pub struct ProfileArgs {
    /// First day of the most recent period (YYYY-MM-DD).
    #[arg(long)]
    pub last_period: Option<String>,

    /// Days from one period start to the next.
    #[arg(long, default_value = "28")]
    pub cycle_length: String,

    /// Days of bleeding.
    #[arg(long, default_value = "5")]
    pub period_length: String,

    /// Use the built-in demo profile.
    #[arg(long, conflicts_with = "last_period")]
    pub demo: bool,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args, Clone)]
pub struct StoreArgs {
    /// Passphrase for the encrypted profile store.
    #[arg(long, env = "CYKEL_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,
}

#[derive(Args)]
pub struct CalendarArgs {
    #[command(flatten)]
    pub profile: ProfileArgs,

    /// Year to show. Defaults to the current year.
    #[arg(long)]
    pub year: Option<i32>,

    /// Month to show, 1-12. Values outside wrap into neighbouring years.
    #[arg(long, allow_negative_numbers = true)]
    pub month: Option<i64>,

    /// Cycles to project. Defaults to `calendar.projection_cycles`.
    #[arg(long)]
    pub cycles: Option<u32>,
}

#[derive(Args)]
pub struct PhaseArgs {
    #[command(flatten)]
    pub profile: ProfileArgs,

    /// Date to look up (YYYY-MM-DD).
    #[arg(long)]
    pub date: NaiveDate,
}

#[derive(Args)]
pub struct SaveArgs {
    /// First day of the most recent period (YYYY-MM-DD).
    #[arg(long)]
    pub last_period: String,

    #[arg(long, default_value = "28")]
    pub cycle_length: String,

    #[arg(long, default_value = "5")]
    pub period_length: String,

    #[command(flatten)]
    pub store: StoreArgs,
}
