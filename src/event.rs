// 🗓️ Leave Event - One leave record as the calendar sees it
// Replaced wholesale on every search; never mutated after construction.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// EVENT COLOR
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventColor {
    Purple,
    Cyan,
    Yellow,
    /// Unknown color names fall back to gray
    #[default]
    #[serde(other)]
    Gray,
}

impl EventColor {
    /// Rotation used when records carry no color of their own
    pub const PALETTE: [EventColor; 4] = [
        EventColor::Purple,
        EventColor::Cyan,
        EventColor::Yellow,
        EventColor::Gray,
    ];

    pub fn for_index(index: usize) -> Self {
        Self::PALETTE[index % Self::PALETTE.len()]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventColor::Purple => "purple",
            EventColor::Cyan => "cyan",
            EventColor::Yellow => "yellow",
            EventColor::Gray => "gray",
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "purple" => EventColor::Purple,
            "cyan" => EventColor::Cyan,
            "yellow" => EventColor::Yellow,
            _ => EventColor::Gray,
        }
    }
}

// ============================================================================
// LEAVE EVENT
// ============================================================================

/// LeaveEvent - A date-ranged leave entry
///
/// Dates stay as the strings the data layer delivered. A record with a
/// malformed date is still a LeaveEvent; it just never produces a bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveEvent {
    /// Stable identifier
    pub id: String,

    /// Display title (usually the employee name)
    pub title: String,

    /// First day of leave, `YYYY-MM-DD`
    pub start_date: String,

    /// Last day of leave (inclusive), `YYYY-MM-DD`
    pub end_date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,

    #[serde(default)]
    pub color: EventColor,

    /// Opaque payload for presentation (the raw leave record)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl LeaveEvent {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        LeaveEvent {
            id: id.into(),
            title: title.into(),
            start_date: start_date.into(),
            end_date: end_date.into(),
            start_time: None,
            end_time: None,
            color: EventColor::default(),
            meta: None,
        }
    }

    /// Builder pattern: set color
    pub fn with_color(mut self, color: EventColor) -> Self {
        self.color = color;
        self
    }

    /// Builder pattern: set time-of-day strings
    pub fn with_times(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_time = Some(start.into());
        self.end_time = Some(end.into());
        self
    }

    /// Builder pattern: attach the raw record
    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn start(&self) -> Option<NaiveDate> {
        parse_event_date(&self.start_date)
    }

    pub fn end(&self) -> Option<NaiveDate> {
        parse_event_date(&self.end_date)
    }

    /// Inclusive day range, or None when a date is unparseable or end < start
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.start()?;
        let end = self.end()?;
        if end < start {
            return None;
        }
        Some((start, end))
    }

    pub fn duration_days(&self) -> Option<i64> {
        self.date_range().map(|(start, end)| (end - start).num_days() + 1)
    }

    /// "08:00 - 17:00" when both times are known
    pub fn time_display(&self) -> Option<String> {
        match (&self.start_time, &self.end_time) {
            (Some(start), Some(end)) if !start.is_empty() && !end.is_empty() => {
                Some(format!("{} - {}", start, end))
            }
            _ => None,
        }
    }
}

// ============================================================================
// DATE PARSING
// ============================================================================

/// Parse the calendar date at the front of `raw`.
///
/// Accepts `YYYY-MM-DD` and `YYYY/MM/DD`, optionally followed by a time part
/// (`T...` or ` ...`), which is ignored. Anything else is None.
pub fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10)?;
    let rest = &raw[10..];

    if !(rest.is_empty() || rest.starts_with('T') || rest.starts_with(' ')) {
        return None;
    }

    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(head, "%Y/%m/%d"))
        .ok()
}
