use chrono::NaiveDate;
use tracing::debug;

use crate::models::{
    coerce_length, CycleProfile, CycleProjection, DateRange, DEFAULT_CYCLE_LENGTH,
};
use crate::prediction::{
    fertile_window, next_period_start, ovulation_day, period_range, pms_window, shift_days,
    DateMathError, FertileVariant,
};

/// Number of cycles laid over the calendar view.
pub const DEFAULT_PROJECTION_CYCLES: u32 = 3;
const MAX_PRESIZED_CYCLES: usize = 64;

/// Expand the anchor into `cycle_count` consecutive cycles.
///
/// Cycle `i` starts `i * cycle_length_days` after the anchor. Ranges from
/// neighbouring cycles may overlap; that is resolved at classification time.
pub fn project(
    anchor: NaiveDate,
    cycle_length_days: u32,
    period_length_days: u32,
    cycle_count: u32,
) -> Result<CycleProjection, DateMathError> {
    let cycle = coerce_length(i64::from(cycle_length_days), DEFAULT_CYCLE_LENGTH);
    // The last cycle's end must be representable before anything is allocated.
    shift_days(anchor, i64::from(cycle_count) * i64::from(cycle))?;
    let capacity = (cycle_count as usize).min(MAX_PRESIZED_CYCLES);
    let mut projection = CycleProjection {
        period_ranges: Vec::with_capacity(capacity),
        fertile_ranges: Vec::with_capacity(capacity),
        ovulation_ranges: Vec::with_capacity(capacity),
        pms_ranges: Vec::with_capacity(capacity),
    };

    for i in 0..cycle_count {
        let period_start = shift_days(anchor, i64::from(i) * i64::from(cycle))?;
        let ovulation = ovulation_day(next_period_start(period_start, cycle)?, cycle)?;

        projection
            .period_ranges
            .push(period_range(period_start, period_length_days)?);
        projection
            .fertile_ranges
            .push(fertile_window(ovulation, FertileVariant::MultiCycle)?);
        projection.ovulation_ranges.push(DateRange::single(ovulation));
        projection.pms_ranges.push(pms_window(period_start)?);
    }

    debug!(%anchor, cycle, cycle_count, "projected cycles");
    Ok(projection)
}

pub fn project_profile(
    profile: &CycleProfile,
    cycle_count: u32,
) -> Result<CycleProjection, DateMathError> {
    project(
        profile.anchor_date(),
        profile.cycle_length_days(),
        profile.period_length_days(),
        cycle_count,
    )
}
