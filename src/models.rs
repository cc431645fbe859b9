use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_CYCLE_LENGTH: u32 = 28;
pub const DEFAULT_PERIOD_LENGTH: u32 = 5;
/// Day counts above this are treated as invalid input and replaced by the default.
pub const MAX_LENGTH_DAYS: i64 = 999;
pub const IRREGULAR_BELOW: u32 = 21;
pub const IRREGULAR_ABOVE: u32 = 35;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("invalid anchor date {0:?}, expected YYYY-MM-DD")]
    InvalidAnchor(String),
}

/// Anchor date plus cycle and period lengths. Lengths are always in 1..=999.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CycleProfile {
    anchor_date: NaiveDate,
    cycle_length_days: u32,
    period_length_days: u32,
}

impl CycleProfile {
    /// Build a profile, replacing non-positive or absurd lengths with 28 / 5.
    pub fn new(anchor_date: NaiveDate, cycle_length_days: i64, period_length_days: i64) -> Self {
        Self {
            anchor_date,
            cycle_length_days: coerce_length(cycle_length_days, DEFAULT_CYCLE_LENGTH),
            period_length_days: coerce_length(period_length_days, DEFAULT_PERIOD_LENGTH),
        }
    }

    /// Build a profile from raw form or storage text.
    ///
    /// The anchor must be an ISO date. The lengths are read as a leading
    /// integer (`"30 days"` is 30, `"27.9"` is 27); anything unreadable
    /// falls back to the defaults instead of failing.
    pub fn from_input(
        anchor: &str,
        cycle_length: &str,
        period_length: &str,
    ) -> Result<Self, ProfileError> {
        let anchor_date = NaiveDate::parse_from_str(anchor.trim(), "%Y-%m-%d")
            .map_err(|_| ProfileError::InvalidAnchor(anchor.to_string()))?;

        let cycle = parse_leading_int(cycle_length).unwrap_or(0);
        let period = parse_leading_int(period_length).unwrap_or(0);

        Ok(Self::new(anchor_date, cycle, period))
    }

    /// Profile served when no real data exists: a regular cycle that started two weeks ago.
    pub fn demo(today: NaiveDate) -> Self {
        let anchor = today.checked_sub_days(Days::new(14)).unwrap_or(today);
        Self::new(
            anchor,
            i64::from(DEFAULT_CYCLE_LENGTH),
            i64::from(DEFAULT_PERIOD_LENGTH),
        )
    }

    pub fn anchor_date(&self) -> NaiveDate {
        self.anchor_date
    }

    pub fn cycle_length_days(&self) -> u32 {
        self.cycle_length_days
    }

    pub fn period_length_days(&self) -> u32 {
        self.period_length_days
    }

    /// Cycles shorter than 21 or longer than 35 days are flagged for follow-up.
    pub fn is_irregular(&self) -> bool {
        is_irregular_cycle(self.cycle_length_days)
    }
}

pub fn is_irregular_cycle(cycle_length_days: u32) -> bool {
    cycle_length_days < IRREGULAR_BELOW || cycle_length_days > IRREGULAR_ABOVE
}

pub(crate) fn coerce_length(value: i64, default: u32) -> u32 {
    match u32::try_from(value) {
        Ok(days) if (1..=MAX_LENGTH_DAYS).contains(&value) => days,
        _ => {
            debug!(value, default, "length out of range, using default");
            default
        }
    }
}

/// Parse an optional sign followed by digits, ignoring whatever trails them.
fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    // Saturate instead of failing on absurdly long digit runs; the range check rejects them anyway.
    let magnitude = rest[..digits_end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Inclusive on both ends; `start <= end` always holds.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub(crate) start: NaiveDate,
    pub(crate) end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn single(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of days covered, counting both ends.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Per-cycle ranges, index `i` of each list belonging to cycle `i`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct CycleProjection {
    pub period_ranges: Vec<DateRange>,
    pub fertile_ranges: Vec<DateRange>,
    pub ovulation_ranges: Vec<DateRange>,
    pub pms_ranges: Vec<DateRange>,
}

impl CycleProjection {
    pub fn cycle_count(&self) -> usize {
        self.period_ranges.len()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DayCategory {
    None,
    Period,
    Ovulation,
    Fertile,
    Pms,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CyclePhase {
    Menstrual,
    Follicular,
    Ovulatory,
    Luteal,
}

impl CyclePhase {
    pub fn name(self) -> &'static str {
        match self {
            CyclePhase::Menstrual => "menstrual",
            CyclePhase::Follicular => "follicular",
            CyclePhase::Ovulatory => "ovulatory",
            CyclePhase::Luteal => "luteal",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MonthOffset {
    Previous,
    Current,
    Next,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub day_number: u32,
    pub month_offset: MonthOffset,
    pub is_today: bool,
    pub category: DayCategory,
}

/// Row-major, Sunday-first, always a whole number of weeks.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CalendarGrid {
    pub year: i32,
    /// Zero-based month (0 = January).
    pub month: u32,
    pub cells: Vec<CalendarCell>,
}

impl CalendarGrid {
    pub fn weeks(&self) -> impl Iterator<Item = &[CalendarCell]> {
        self.cells.chunks(7)
    }

    pub fn current_month_cells(&self) -> impl Iterator<Item = &CalendarCell> {
        self.cells
            .iter()
            .filter(|c| c.month_offset == MonthOffset::Current)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Next-cycle estimate for a single profile.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Prediction {
    pub next_period_start: NaiveDate,
    pub ovulation_day: NaiveDate,
    /// Five days before ovulation through ovulation day.
    pub fertile_window: DateRange,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PredictionSummary {
    pub next_period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub fertile_window: DateRange,
    pub ovulation_day: NaiveDate,
    pub days_remaining: i64,
    pub progress_percent: f64,
    pub irregular: bool,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CycleCalculation {
    pub next_period: NaiveDate,
    pub ovulation_day: NaiveDate,
    pub fertile_window: DateRange,
    /// End of the period that starts on the anchor date.
    pub period_end: NaiveDate,
}
