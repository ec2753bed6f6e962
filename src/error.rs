// ⚠️ Errors - Typed failures for the calendar domain
// I/O edges (sources, config, binaries) use anyhow; parsing the domain
// values themselves fails with CalendarError.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalendarError {
    /// Month string is not `YYYY-MM` or the values are out of range
    #[error("invalid month '{0}': expected YYYY-MM with year 1000-9999")]
    InvalidMonth(String),

    /// Week start is neither monday nor sunday
    #[error("invalid week start '{0}': expected 'monday' or 'sunday'")]
    InvalidWeekStart(String),
}

pub type CalendarResult<T> = std::result::Result<T, CalendarError>;
