use std::fmt::Write as _;

use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use tracing::info;

use cykel_calendar::calendar::MonthCursor;
use cykel_calendar::config::Settings;
use cykel_calendar::models::{CalendarGrid, CycleProfile, DayCategory, MonthOffset};
use cykel_calendar::storage::{EncryptedFileStore, Passphrase, ProfileStore};
use cykel_calendar::{calculate_cycle, phase_for, project_profile, summarize, PredictionSummary};

use crate::cli::{CalendarArgs, PhaseArgs, ProfileArgs, SaveArgs, StoreArgs};

/// Per-invocation state: settings plus the date treated as today.
pub struct AppState {
    pub settings: Settings,
    pub today: NaiveDate,
}

impl AppState {
    pub fn new(settings: Settings, today: NaiveDate) -> Self {
        Self { settings, today }
    }

    fn store(&self, args: &StoreArgs) -> Result<EncryptedFileStore> {
        let passphrase = args
            .passphrase
            .as_deref()
            .context("a passphrase is required (--passphrase or CYKEL_PASSPHRASE)")?;
        let path = self.settings.data_file()?;
        Ok(EncryptedFileStore::new(
            path,
            Passphrase::new(passphrase),
            self.settings.storage.kdf,
        ))
    }

    /// Flags win over the demo profile, which wins over the saved profile.
    fn resolve_profile(&self, args: &ProfileArgs) -> Result<CycleProfile> {
        if let Some(anchor) = &args.last_period {
            return Ok(CycleProfile::from_input(
                anchor,
                &args.cycle_length,
                &args.period_length,
            )?);
        }
        if args.demo {
            return Ok(CycleProfile::demo(self.today));
        }
        let store = self.store(&args.store)?;
        store
            .load_profile()
            .with_context(|| format!("failed to load profile from {}", store.path().display()))?
            .context("no saved profile: pass --last-period, --demo, or run `cykel save` first")
    }
}

pub fn predict(state: &AppState, args: ProfileArgs) -> Result<()> {
    let profile = state.resolve_profile(&args)?;
    let summary = summarize(&profile, state.today)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", render_summary(&summary, profile.cycle_length_days()));
    }
    Ok(())
}

pub fn calculate(state: &AppState, args: ProfileArgs) -> Result<()> {
    let profile = state.resolve_profile(&args)?;
    let record = calculate_cycle(&profile)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("Next period:    {}", long_date(record.next_period));
        println!("Ovulation day:  {}", long_date(record.ovulation_day));
        println!(
            "Fertile window: {} to {}",
            long_date(record.fertile_window.start()),
            long_date(record.fertile_window.end())
        );
        println!("Period ends:    {}", long_date(record.period_end));
    }
    Ok(())
}

pub fn calendar(state: &AppState, args: CalendarArgs) -> Result<()> {
    let profile = state.resolve_profile(&args.profile)?;
    let cycles = args
        .cycles
        .unwrap_or(state.settings.calendar.projection_cycles);
    if cycles == 0 {
        bail!("--cycles must be at least 1");
    }

    let cursor = match (args.year, args.month) {
        (None, None) => MonthCursor::containing(state.today),
        (year, month) => MonthCursor::new(
            year.unwrap_or_else(|| state.today.year()),
            month.unwrap_or_else(|| i64::from(state.today.month())) - 1,
        ),
    };

    let projection = project_profile(&profile, cycles)?;
    let grid = cursor.build(&projection, state.today)?;
    info!(year = grid.year, month = grid.month + 1, cycles, "rendering calendar");

    if args.profile.json {
        println!("{}", serde_json::to_string_pretty(&grid)?);
    } else {
        print!("{}", render_grid(&grid));
    }
    Ok(())
}

pub fn phase(state: &AppState, args: PhaseArgs) -> Result<()> {
    let profile = state.resolve_profile(&args.profile)?;
    let projection = project_profile(&profile, state.settings.calendar.projection_cycles)?;
    let phase = phase_for(args.date, &projection);
    if args.profile.json {
        println!("{}", serde_json::to_string_pretty(&phase)?);
    } else {
        match phase {
            Some(p) => println!("{}: {} phase", args.date, p.name()),
            None => println!("{}: outside the projected cycles", args.date),
        }
    }
    Ok(())
}

pub fn save(state: &AppState, args: SaveArgs) -> Result<()> {
    let profile =
        CycleProfile::from_input(&args.last_period, &args.cycle_length, &args.period_length)?;
    let store = state.store(&args.store)?;
    store
        .save_profile(&profile)
        .with_context(|| format!("failed to save profile to {}", store.path().display()))?;
    println!(
        "Saved: last period {}, cycle {} days, period {} days",
        profile.anchor_date(),
        profile.cycle_length_days(),
        profile.period_length_days()
    );
    if profile.is_irregular() {
        println!("{}", irregular_notice(profile.cycle_length_days()));
    }
    Ok(())
}

pub fn show(state: &AppState, args: StoreArgs) -> Result<()> {
    let store = state.store(&args)?;
    match store.load_profile()? {
        Some(profile) => println!(
            "Last period {}, cycle {} days, period {} days",
            profile.anchor_date(),
            profile.cycle_length_days(),
            profile.period_length_days()
        ),
        None => println!("No saved profile at {}", store.path().display()),
    }
    Ok(())
}

pub fn wipe(state: &AppState, args: StoreArgs) -> Result<()> {
    let store = state.store(&args)?;
    store.wipe()?;
    println!("Removed {}", store.path().display());
    Ok(())
}

fn long_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

fn irregular_notice(cycle_length_days: u32) -> String {
    format!(
        "Note: a {cycle_length_days}-day cycle is outside the usual 21-35 days. \
         Consider booking an appointment."
    )
}

fn render_summary(summary: &PredictionSummary, cycle_length_days: u32) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Next period:    {} to {}",
        long_date(summary.next_period_start),
        long_date(summary.period_end)
    );
    let _ = writeln!(
        out,
        "                {} days remaining ({:.0}% through the cycle)",
        summary.days_remaining, summary.progress_percent
    );
    let _ = writeln!(
        out,
        "Fertile window: {} to {}",
        long_date(summary.fertile_window.start()),
        long_date(summary.fertile_window.end())
    );
    let _ = writeln!(out, "Ovulation day:  {}", long_date(summary.ovulation_day));
    if summary.irregular {
        let _ = writeln!(out, "{}", irregular_notice(cycle_length_days));
    }
    out
}

fn marker(category: DayCategory) -> char {
    match category {
        DayCategory::None => ' ',
        DayCategory::Period => 'P',
        DayCategory::Ovulation => 'O',
        DayCategory::Fertile => 'F',
        DayCategory::Pms => 'S',
    }
}

/// Sunday-first text calendar. Neighbouring-month days are shown in
/// parentheses, today is starred.
fn render_grid(grid: &CalendarGrid) -> String {
    let mut out = String::new();
    let title = grid
        .current_month_cells()
        .next()
        .map(|c| c.date.format("%B %Y").to_string())
        .unwrap_or_default();
    let _ = writeln!(out, "{title:^35}");
    let _ = writeln!(out, "  Su   Mo   Tu   We   Th   Fr   Sa");

    for week in grid.weeks() {
        let line: Vec<String> = week
            .iter()
            .map(|cell| match cell.month_offset {
                MonthOffset::Current => format!(
                    "{:>3}{}{}",
                    cell.day_number,
                    marker(cell.category),
                    if cell.is_today { '*' } else { ' ' }
                ),
                MonthOffset::Previous | MonthOffset::Next => format!("({:>2})", cell.day_number),
            })
            .collect();
        let _ = writeln!(out, "{}", line.join("").trim_end());
    }
    let _ = writeln!(out, "P period  O ovulation  F fertile  S PMS  * today");
    out
}
