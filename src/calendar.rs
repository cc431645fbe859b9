use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::classify::classify;
use crate::models::{CalendarCell, CalendarGrid, CycleProjection, DayCategory, MonthOffset};
use crate::prediction::{shift_days, DateMathError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    #[error("invalid month: {month} (must be 0..=11)")]
    InvalidInput { month: u32 },
    #[error("month {month} of year {year} is outside the supported calendar")]
    OutOfRange { year: i32, month: u32 },
    #[error(transparent)]
    DateMath(#[from] DateMathError),
}

/// The month currently on screen. Owned by the caller and moved one month at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MonthCursor {
    year: i32,
    month: u32,
}

impl MonthCursor {
    /// Normalise any month offset relative to `year`, so `(2024, 12)` is January 2025
    /// and `(2024, -1)` is December 2023.
    pub fn new(year: i32, month: i64) -> Self {
        let total = i64::from(year) * 12 + month;
        let year = total.div_euclid(12).clamp(i64::from(i32::MIN), i64::from(i32::MAX));
        Self {
            year: year as i32,
            month: total.rem_euclid(12) as u32,
        }
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month0(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Zero-based month.
    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn next(self) -> Self {
        Self::new(self.year, i64::from(self.month) + 1)
    }

    pub fn prev(self) -> Self {
        Self::new(self.year, i64::from(self.month) - 1)
    }

    pub fn build(
        &self,
        projection: &CycleProjection,
        today: NaiveDate,
    ) -> Result<CalendarGrid, CalendarError> {
        build(self.month, self.year, projection, today)
    }
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, CalendarError> {
    if month > 11 {
        return Err(CalendarError::InvalidInput { month });
    }
    NaiveDate::from_ymd_opt(year, month + 1, 1).ok_or(CalendarError::OutOfRange { year, month })
}

/// Days in a zero-based month.
pub fn days_in_month(year: i32, month: u32) -> Result<u32, CalendarError> {
    let first = first_of_month(year, month)?;
    let next = MonthCursor::new(year, i64::from(month) + 1);
    let next_first = first_of_month(next.year, next.month)?;
    Ok((next_first - first).num_days() as u32)
}

/// Weekday of the first of a zero-based month, 0 = Sunday.
pub fn first_weekday(year: i32, month: u32) -> Result<u32, CalendarError> {
    Ok(first_of_month(year, month)?.weekday().num_days_from_sunday())
}

/// Lay out a Sunday-first month grid, padded with the neighbouring months'
/// days to whole weeks. Only current-month cells get a category or the
/// today marker.
pub fn build(
    month: u32,
    year: i32,
    projection: &CycleProjection,
    today: NaiveDate,
) -> Result<CalendarGrid, CalendarError> {
    let first = first_of_month(year, month)?;
    let lead = first.weekday().num_days_from_sunday();
    let days = days_in_month(year, month)?;
    let total = (days + lead).div_ceil(7) * 7;

    let mut cells = Vec::with_capacity(total as usize);

    for back in (1..=lead).rev() {
        let date = shift_days(first, -i64::from(back))?;
        cells.push(padding_cell(date, MonthOffset::Previous));
    }

    for date in first.iter_days().take(days as usize) {
        cells.push(CalendarCell {
            date,
            day_number: date.day(),
            month_offset: MonthOffset::Current,
            is_today: date == today,
            category: classify(date, projection),
        });
    }

    let trailing = total - days - lead;
    for ahead in 0..trailing {
        let date = shift_days(first, i64::from(days + ahead))?;
        cells.push(padding_cell(date, MonthOffset::Next));
    }

    debug!(year, month, cells = cells.len(), "built calendar grid");
    Ok(CalendarGrid { year, month, cells })
}

fn padding_cell(date: NaiveDate, month_offset: MonthOffset) -> CalendarCell {
    CalendarCell {
        date,
        day_number: date.day(),
        month_offset,
        is_today: false,
        category: DayCategory::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::project;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn empty() -> CycleProjection {
        CycleProjection::default()
    }

    #[test]
    fn february_2024_grid() {
        let grid = build(1, 2024, &empty(), date("2024-02-15")).unwrap();
        assert_eq!(grid.len(), 35);
        assert_eq!(grid.current_month_cells().count(), 29);

        // Feb 1 2024 is a Thursday: four days of January lead in, descending from the 31st.
        let lead: Vec<u32> = grid.cells[..4].iter().map(|c| c.day_number).collect();
        assert_eq!(lead, vec![28, 29, 30, 31]);
        assert!(grid.cells[..4]
            .iter()
            .all(|c| c.month_offset == MonthOffset::Previous));

        assert_eq!(grid.cells[4].date, date("2024-02-01"));
        assert_eq!(grid.cells[32].date, date("2024-02-29"));

        let trail: Vec<u32> = grid.cells[33..].iter().map(|c| c.day_number).collect();
        assert_eq!(trail, vec![1, 2]);
        assert!(grid.cells[33..]
            .iter()
            .all(|c| c.month_offset == MonthOffset::Next));
    }

    #[test]
    fn month_starting_sunday_has_no_lead() {
        // September 2024 starts on a Sunday.
        let grid = build(8, 2024, &empty(), date("2024-01-01")).unwrap();
        assert_eq!(grid.cells[0].date, date("2024-09-01"));
        assert_eq!(grid.cells[0].month_offset, MonthOffset::Current);
        assert_eq!(grid.len(), 35);
    }

    #[test]
    fn exact_four_week_month() {
        // February 2015: 28 days starting on a Sunday.
        let grid = build(1, 2015, &empty(), date("2015-02-01")).unwrap();
        assert_eq!(grid.len(), 28);
        assert!(grid.cells.iter().all(|c| c.month_offset == MonthOffset::Current));
    }

    #[test]
    fn six_week_month() {
        // March 2024 starts on a Friday and has 31 days.
        let grid = build(2, 2024, &empty(), date("2024-03-01")).unwrap();
        assert_eq!(grid.len(), 42);
        assert_eq!(grid.weeks().count(), 6);
    }

    #[test]
    fn cell_count_is_whole_weeks() {
        for year in [1900, 1999, 2000, 2023, 2024, 2100] {
            for month in 0..12 {
                let grid = build(month, year, &empty(), date("2024-01-01")).unwrap();
                assert_eq!(grid.len() % 7, 0, "{year}-{month}");
                assert_eq!(
                    grid.current_month_cells().count() as u32,
                    days_in_month(year, month).unwrap()
                );
                assert!(grid.weeks().all(|w| w.len() == 7));
            }
        }
    }

    #[test]
    fn today_marked_once() {
        let grid = build(0, 2024, &empty(), date("2024-01-17")).unwrap();
        let marked: Vec<&CalendarCell> = grid.cells.iter().filter(|c| c.is_today).collect();
        assert_eq!(marked.len(), 1);
        assert_eq!(marked[0].day_number, 17);
    }

    #[test]
    fn padding_never_marked_today_or_categorised() {
        let p = project(date("2024-01-29"), 28, 5, 3).unwrap();
        // Today falls on a trailing cell of January's grid.
        let grid = build(0, 2024, &p, date("2024-02-01")).unwrap();
        let padding = grid
            .cells
            .iter()
            .filter(|c| c.month_offset != MonthOffset::Current);
        for cell in padding {
            assert!(!cell.is_today);
            assert_eq!(cell.category, DayCategory::None);
        }
    }

    #[test]
    fn categories_follow_projection() {
        let p = project(date("2024-01-01"), 28, 5, 3).unwrap();
        let grid = build(0, 2024, &p, date("2024-01-01")).unwrap();
        let jan = |d: u32| {
            grid.current_month_cells()
                .find(|c| c.day_number == d)
                .unwrap()
                .category
        };
        assert_eq!(jan(1), DayCategory::Period);
        assert_eq!(jan(10), DayCategory::Fertile);
        assert_eq!(jan(15), DayCategory::Ovulation);
        assert_eq!(jan(22), DayCategory::Pms);
        assert_eq!(jan(29), DayCategory::Period);
        assert_eq!(jan(19), DayCategory::None);
    }

    #[test]
    fn month_out_of_range_is_invalid_input() {
        let err = build(12, 2024, &empty(), date("2024-01-01")).unwrap_err();
        assert_eq!(err, CalendarError::InvalidInput { month: 12 });
    }

    #[test]
    fn cursor_wraps_years() {
        let dec = MonthCursor::new(2023, 11);
        let jan = dec.next();
        assert_eq!((jan.year(), jan.month()), (2024, 0));
        assert_eq!(jan.prev(), dec);

        assert_eq!(MonthCursor::new(2024, 13), MonthCursor::new(2025, 1));
        assert_eq!(MonthCursor::new(2024, -13), MonthCursor::new(2022, 11));
        assert_eq!(MonthCursor::containing(date("2024-07-04")), MonthCursor::new(2024, 6));
    }

    #[test]
    fn cursor_builds_same_grid_as_build() {
        let p = project(date("2024-01-01"), 28, 5, 3).unwrap();
        let today = date("2024-02-10");
        let cursor = MonthCursor::containing(today);
        assert_eq!(
            cursor.build(&p, today).unwrap(),
            build(1, 2024, &p, today).unwrap()
        );
    }
}
