use chrono::{Days, NaiveDate};

use crate::models::{coerce_length, CycleProfile, DateRange, Prediction, DEFAULT_PERIOD_LENGTH};

/// Fixed gap between ovulation and the next period, whatever the cycle length.
pub const LUTEAL_PHASE_DAYS: i64 = 14;
pub const FERTILE_LEAD_DAYS: i64 = 5;
pub const PMS_LEAD_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DateMathError {
    #[error("shifting {date} by {days} days leaves the supported calendar")]
    OutOfRange { date: NaiveDate, days: i64 },
}

/// The fertile window is computed two ways and callers pick one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FertileVariant {
    /// `[ovulation - 5, ovulation]`, used for the single next-cycle prediction.
    SinglePrediction,
    /// `[ovulation - 5, ovulation - 1]`, used when projecting several cycles onto a calendar.
    MultiCycle,
}

/// Move a date by a signed number of calendar days.
pub fn shift_days(date: NaiveDate, days: i64) -> Result<NaiveDate, DateMathError> {
    let step = Days::new(days.unsigned_abs());
    let shifted = if days >= 0 {
        date.checked_add_days(step)
    } else {
        date.checked_sub_days(step)
    };
    shifted.ok_or(DateMathError::OutOfRange { date, days })
}

pub fn next_period_start(
    anchor: NaiveDate,
    cycle_length_days: u32,
) -> Result<NaiveDate, DateMathError> {
    shift_days(anchor, i64::from(cycle_length_days))
}

/// Ovulation is estimated 14 days before the next period. The cycle length
/// is accepted for symmetry with the other estimators but does not move it.
pub fn ovulation_day(
    next_period_start: NaiveDate,
    _cycle_length_days: u32,
) -> Result<NaiveDate, DateMathError> {
    shift_days(next_period_start, -LUTEAL_PHASE_DAYS)
}

pub fn fertile_window(
    ovulation_day: NaiveDate,
    variant: FertileVariant,
) -> Result<DateRange, DateMathError> {
    let start = shift_days(ovulation_day, -FERTILE_LEAD_DAYS)?;
    let end = match variant {
        FertileVariant::SinglePrediction => ovulation_day,
        FertileVariant::MultiCycle => shift_days(ovulation_day, -1)?,
    };
    Ok(DateRange { start, end })
}

/// The seven days immediately before a period starts.
pub fn pms_window(period_start: NaiveDate) -> Result<DateRange, DateMathError> {
    Ok(DateRange {
        start: shift_days(period_start, -PMS_LEAD_DAYS)?,
        end: shift_days(period_start, -1)?,
    })
}

/// Bleeding days of a period starting on `period_start`.
pub fn period_range(
    period_start: NaiveDate,
    period_length_days: u32,
) -> Result<DateRange, DateMathError> {
    let length = coerce_length(i64::from(period_length_days), DEFAULT_PERIOD_LENGTH);
    Ok(DateRange {
        start: period_start,
        end: shift_days(period_start, i64::from(length) - 1)?,
    })
}

/// Predict the next period, ovulation day and fertile window for a profile.
pub fn predict_next(profile: &CycleProfile) -> Result<Prediction, DateMathError> {
    let cycle = profile.cycle_length_days();
    let next = next_period_start(profile.anchor_date(), cycle)?;
    let ovulation = ovulation_day(next, cycle)?;
    let fertile = fertile_window(ovulation, FertileVariant::SinglePrediction)?;

    Ok(Prediction {
        next_period_start: next,
        ovulation_day: ovulation,
        fertile_window: fertile,
    })
}
