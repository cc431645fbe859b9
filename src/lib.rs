//! Cycle prediction and month-calendar engine.
//!
//! Everything here is a pure function of a [`CycleProfile`] and an injected
//! `today`; persistence sits behind [`storage::ProfileStore`].

pub mod calendar;
pub mod classify;
pub mod config;
pub mod crypto;
pub mod models;
pub mod prediction;
pub mod presenter;
pub mod projection;
pub mod storage;

pub use calendar::{build, CalendarError, MonthCursor};
pub use classify::{classify, phase_for};
pub use models::{
    CalendarCell, CalendarGrid, CycleCalculation, CyclePhase, CycleProfile, CycleProjection,
    DateRange, DayCategory, MonthOffset, Prediction, PredictionSummary, ProfileError,
};
pub use prediction::{predict_next, DateMathError, FertileVariant};
pub use presenter::{calculate_cycle, present, summarize, PresentError};
pub use projection::{project, project_profile};
