use chrono::NaiveDate;
use tracing::warn;

use crate::models::{
    is_irregular_cycle, CycleCalculation, CycleProfile, Prediction, PredictionSummary,
};
use crate::prediction::{period_range, predict_next, DateMathError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PresentError {
    #[error("cannot compute cycle progress without the previous period start")]
    MissingAnchor,
    #[error("next period start {next} is not after the anchor {anchor}")]
    DegenerateCycle { anchor: NaiveDate, next: NaiveDate },
    #[error(transparent)]
    DateMath(#[from] DateMathError),
}

/// Turn a prediction into the numbers shown on the prediction card.
///
/// `anchor` is the start of the previous period. Progress is measured from
/// it, so leaving it out is an error rather than a silent 0%.
pub fn present(
    prediction: &Prediction,
    period_length_days: u32,
    cycle_length_days: u32,
    anchor: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<PredictionSummary, PresentError> {
    let next = prediction.next_period_start;
    let period = period_range(next, period_length_days)?;

    let anchor = anchor.ok_or(PresentError::MissingAnchor)?;
    let total = (next - anchor).num_days();
    if total <= 0 {
        return Err(PresentError::DegenerateCycle { anchor, next });
    }
    let passed = (today - anchor).num_days();
    let progress_percent = (passed as f64 / total as f64 * 100.0).clamp(0.0, 100.0);

    let days_remaining = (next - today).num_days().max(0);

    let irregular = is_irregular_cycle(cycle_length_days);
    if irregular {
        warn!(cycle_length_days, "cycle length outside 21..=35 days");
    }

    Ok(PredictionSummary {
        next_period_start: next,
        period_end: period.end(),
        fertile_window: prediction.fertile_window,
        ovulation_day: prediction.ovulation_day,
        days_remaining,
        progress_percent,
        irregular,
    })
}

/// Predict and present in one step for a stored profile.
pub fn summarize(
    profile: &CycleProfile,
    today: NaiveDate,
) -> Result<PredictionSummary, PresentError> {
    let prediction = predict_next(profile)?;
    present(
        &prediction,
        profile.period_length_days(),
        profile.cycle_length_days(),
        Some(profile.anchor_date()),
        today,
    )
}

/// The compact prediction record: next period, ovulation, fertile window and
/// the end of the period that began on the anchor.
pub fn calculate_cycle(profile: &CycleProfile) -> Result<CycleCalculation, DateMathError> {
    let prediction = predict_next(profile)?;
    let current_period = period_range(profile.anchor_date(), profile.period_length_days())?;

    Ok(CycleCalculation {
        next_period: prediction.next_period_start,
        ovulation_day: prediction.ovulation_day,
        fertile_window: prediction.fertile_window,
        period_end: current_period.end(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn reference() -> CycleProfile {
        CycleProfile::new(date("2024-01-01"), 28, 5)
    }

    #[test]
    fn reference_summary_midway() {
        let s = summarize(&reference(), date("2024-01-15")).unwrap();
        assert_eq!(s.next_period_start, date("2024-01-29"));
        assert_eq!(s.period_end, date("2024-02-02"));
        assert_eq!(s.ovulation_day, date("2024-01-15"));
        assert_eq!(s.fertile_window.start(), date("2024-01-10"));
        assert_eq!(s.fertile_window.end(), date("2024-01-15"));
        assert_eq!(s.days_remaining, 14);
        assert!((s.progress_percent - 50.0).abs() < 1e-9);
        assert!(!s.irregular);
    }

    #[test]
    fn on_next_period_day() {
        let s = summarize(&reference(), date("2024-01-29")).unwrap();
        assert_eq!(s.days_remaining, 0);
        assert_eq!(s.progress_percent, 100.0);
    }

    #[test]
    fn overdue_clamps() {
        let s = summarize(&reference(), date("2024-03-01")).unwrap();
        assert_eq!(s.days_remaining, 0);
        assert_eq!(s.progress_percent, 100.0);
    }

    #[test]
    fn before_anchor_clamps_to_zero() {
        let s = summarize(&reference(), date("2023-12-20")).unwrap();
        assert_eq!(s.progress_percent, 0.0);
        assert_eq!(s.days_remaining, 40);
    }

    #[test]
    fn short_cycle_is_irregular() {
        let profile = CycleProfile::new(date("2024-01-01"), 20, 5);
        assert!(summarize(&profile, date("2024-01-05")).unwrap().irregular);
        let profile = CycleProfile::new(date("2024-01-01"), 36, 5);
        assert!(summarize(&profile, date("2024-01-05")).unwrap().irregular);
    }

    #[test]
    fn missing_anchor_is_reported() {
        let prediction = predict_next(&reference()).unwrap();
        let err = present(&prediction, 5, 28, None, date("2024-01-10")).unwrap_err();
        assert_eq!(err, PresentError::MissingAnchor);
    }

    #[test]
    fn anchor_after_next_period_is_degenerate() {
        let prediction = predict_next(&reference()).unwrap();
        let err = present(&prediction, 5, 28, Some(date("2024-02-01")), date("2024-01-10"))
            .unwrap_err();
        assert!(matches!(err, PresentError::DegenerateCycle { .. }));
    }

    #[test]
    fn calculation_uses_current_period_end() {
        let c = calculate_cycle(&reference()).unwrap();
        assert_eq!(c.next_period, date("2024-01-29"));
        assert_eq!(c.ovulation_day, date("2024-01-15"));
        assert_eq!(c.fertile_window.start(), date("2024-01-10"));
        assert_eq!(c.period_end, date("2024-01-05"));
    }

    #[test]
    fn calculation_serializes_camel_case() {
        let json = serde_json::to_value(calculate_cycle(&reference()).unwrap()).unwrap();
        assert_eq!(json["nextPeriod"], "2024-01-29");
        assert_eq!(json["ovulationDay"], "2024-01-15");
        assert_eq!(json["fertileWindow"]["start"], "2024-01-10");
        assert_eq!(json["fertileWindow"]["end"], "2024-01-15");
        assert_eq!(json["periodEnd"], "2024-01-05");
    }
}
