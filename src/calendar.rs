// 📅 Calendar Grid - Month → weeks × 7 days
// The visible month always starts on a week boundary and ends on one,
// so leading/trailing days from the adjacent months fill the first and
// last rows.

use crate::error::{CalendarError, CalendarResult};
use chrono::{Datelike, Days, Local, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single day cell in the grid. Identity is the calendar date itself.
pub type CalendarDay = NaiveDate;

// ============================================================================
// YEAR / MONTH
// ============================================================================

/// YearMonth - The reference month of a calendar view (`YYYY-MM`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub const MIN_YEAR: i32 = 1000;
    pub const MAX_YEAR: i32 = 9999;

    pub fn new(year: i32, month: u32) -> CalendarResult<Self> {
        if !(Self::MIN_YEAR..=Self::MAX_YEAR).contains(&year) || !(1..=12).contains(&month) {
            return Err(CalendarError::InvalidMonth(format!("{}-{:02}", year, month)));
        }
        Ok(YearMonth { year, month })
    }

    /// Only the year and month of `date` are kept.
    /// Dates past either end of 1000-9999 map to the boundary month
    /// (1000-01 or 9999-12), the same place `next`/`previous` stop.
    pub fn from_date(date: NaiveDate) -> Self {
        match date.year() {
            year if year > Self::MAX_YEAR => YearMonth { year: Self::MAX_YEAR, month: 12 },
            year if year < Self::MIN_YEAR => YearMonth { year: Self::MIN_YEAR, month: 1 },
            year => YearMonth { year, month: date.month() },
        }
    }

    /// Month of the local clock
    pub fn current() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        // In range by construction
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        let first = self.first_day();
        let next_first = first + Months::new(1);
        next_first - Days::new(1)
    }

    pub fn days_in_month(&self) -> u32 {
        self.last_day().day()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            YearMonth {
                year: (self.year + 1).min(Self::MAX_YEAR),
                month: if self.year >= Self::MAX_YEAR { 12 } else { 1 },
            }
        } else {
            YearMonth { year: self.year, month: self.month + 1 }
        }
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            YearMonth {
                year: (self.year - 1).max(Self::MIN_YEAR),
                month: if self.year <= Self::MIN_YEAR { 1 } else { 12 },
            }
        } else {
            YearMonth { year: self.year, month: self.month - 1 }
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || CalendarError::InvalidMonth(s.to_string());

        let (year, month) = trimmed.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return Err(invalid());
        }

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        YearMonth::new(year, month).map_err(|_| invalid())
    }
}

impl Serialize for YearMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// WEEK START
// ============================================================================

/// WeekStart - Which weekday occupies column 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    /// ISO week (Monday..Sunday)
    #[default]
    Monday,

    /// Sunday..Saturday
    Sunday,
}

impl WeekStart {
    pub fn weekday(&self) -> Weekday {
        match self {
            WeekStart::Monday => Weekday::Mon,
            WeekStart::Sunday => Weekday::Sun,
        }
    }

    /// Column (0-6) of `date` in a week starting on this day
    pub fn offset_of(&self, date: NaiveDate) -> u64 {
        match self {
            WeekStart::Monday => date.weekday().num_days_from_monday() as u64,
            WeekStart::Sunday => date.weekday().num_days_from_sunday() as u64,
        }
    }

    pub fn start_of_week(&self, date: NaiveDate) -> NaiveDate {
        date - Days::new(self.offset_of(date))
    }

    pub fn end_of_week(&self, date: NaiveDate) -> NaiveDate {
        self.start_of_week(date) + Days::new(6)
    }

    /// Short column headers in display order
    pub fn day_labels(&self) -> [&'static str; 7] {
        match self {
            WeekStart::Monday => ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"],
            WeekStart::Sunday => ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"],
        }
    }
}

impl FromStr for WeekStart {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monday" | "mon" | "iso" => Ok(WeekStart::Monday),
            "sunday" | "sun" => Ok(WeekStart::Sunday),
            _ => Err(CalendarError::InvalidWeekStart(s.to_string())),
        }
    }
}

// ============================================================================
// WEEK ROW
// ============================================================================

/// WeekRow - Exactly 7 consecutive days
///
/// Only constructed from its first day, so `days[6] - days[0] == 6 days`
/// always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct WeekRow {
    days: [CalendarDay; 7],
}

impl WeekRow {
    pub fn starting(first: NaiveDate) -> Self {
        let mut days = [first; 7];
        for (i, day) in days.iter_mut().enumerate() {
            *day = first + Days::new(i as u64);
        }
        WeekRow { days }
    }

    pub fn days(&self) -> &[CalendarDay; 7] {
        &self.days
    }

    pub fn first_day(&self) -> CalendarDay {
        self.days[0]
    }

    pub fn last_day(&self) -> CalendarDay {
        self.days[6]
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.first_day() && date <= self.last_day()
    }

    /// Column index (0-6) of `date`, or None if it falls outside this week
    pub fn column_of(&self, date: NaiveDate) -> Option<usize> {
        if self.contains(date) {
            Some((date - self.first_day()).num_days() as usize)
        } else {
            None
        }
    }
}

// ============================================================================
// CALENDAR GRID
// ============================================================================

/// CalendarGrid - The weeks visible for one reference month
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarGrid {
    week_start: WeekStart,
    weeks: Vec<WeekRow>,
}

impl CalendarGrid {
    pub fn from_weeks(week_start: WeekStart, weeks: Vec<WeekRow>) -> Self {
        CalendarGrid { week_start, weeks }
    }

    pub fn week_start(&self) -> WeekStart {
        self.week_start
    }

    pub fn weeks(&self) -> &[WeekRow] {
        &self.weeks
    }

    pub fn week(&self, index: usize) -> Option<&WeekRow> {
        self.weeks.get(index)
    }

    pub fn len(&self) -> usize {
        self.weeks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }

    /// First and last visible day
    pub fn range(&self) -> Option<(CalendarDay, CalendarDay)> {
        match (self.weeks.first(), self.weeks.last()) {
            (Some(first), Some(last)) => Some((first.first_day(), last.last_day())),
            _ => None,
        }
    }

    /// All visible days in traversal order
    pub fn days(&self) -> impl Iterator<Item = CalendarDay> + '_ {
        self.weeks.iter().flat_map(|week| week.days().iter().copied())
    }

    /// Index of the week containing `date`
    pub fn week_index_of(&self, date: NaiveDate) -> Option<usize> {
        self.weeks.iter().position(|week| week.contains(date))
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Build the ISO (Monday-first) grid for a month.
pub fn build_grid(month: YearMonth) -> CalendarGrid {
    build_grid_with(month, WeekStart::Monday)
}

/// Build the grid for the month containing `date`.
pub fn build_grid_for_date(date: NaiveDate) -> CalendarGrid {
    build_grid(YearMonth::from_date(date))
}

/// Build the grid for a month with the given first weekday.
///
/// Covers from the week containing the 1st through the week containing the
/// last day of the month, inclusive.
pub fn build_grid_with(month: YearMonth, week_start: WeekStart) -> CalendarGrid {
    let start = week_start.start_of_week(month.first_day());
    let end = week_start.end_of_week(month.last_day());

    let mut weeks = Vec::with_capacity(6);
    let mut current = start;

    while current <= end {
        let week = WeekRow::starting(current);
        current = week.last_day() + Days::new(1);
        weeks.push(week);
    }

    CalendarGrid { week_start, weeks }
}
