use chrono::NaiveDate;

use crate::models::{CyclePhase, CycleProjection, DateRange, DayCategory};

/// True when `date` falls inside any of `ranges`.
pub fn in_any(date: NaiveDate, ranges: &[DateRange]) -> bool {
    ranges.iter().any(|r| r.contains(date))
}

/// Category shown on the calendar.
///
/// Checked in order period, ovulation, fertile, pms; the first hit wins.
pub fn classify(date: NaiveDate, projection: &CycleProjection) -> DayCategory {
    if in_any(date, &projection.period_ranges) {
        DayCategory::Period
    } else if in_any(date, &projection.ovulation_ranges) {
        DayCategory::Ovulation
    } else if in_any(date, &projection.fertile_ranges) {
        DayCategory::Fertile
    } else if in_any(date, &projection.pms_ranges) {
        DayCategory::Pms
    } else {
        DayCategory::None
    }
}

/// Cycle phase for a selected day.
///
/// Fertile days are checked before ovulation days here, unlike [`classify`].
pub fn phase_for(date: NaiveDate, projection: &CycleProjection) -> Option<CyclePhase> {
    if in_any(date, &projection.period_ranges) {
        Some(CyclePhase::Menstrual)
    } else if in_any(date, &projection.fertile_ranges) {
        Some(CyclePhase::Follicular)
    } else if in_any(date, &projection.ovulation_ranges) {
        Some(CyclePhase::Ovulatory)
    } else if in_any(date, &projection.pms_ranges) {
        Some(CyclePhase::Luteal)
    } else {
        None
    }
}
