// 🧾 Leave Detail - Segments of one leave record for the detail panel
//
// A leave record carries up to four numbered segments:
//   1 = home leave, 2 = local stay, 3 = overseas stay, 4 = other stay
// Segment 2 is a comma-separated list of days (StayComDates) rather than a
// start/end pair, and days already covered by 1/3/4 are not repeated there.

use crate::event::parse_event_date;
use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    HomeLeave,
    LocalStay,
    OverseasStay,
    OtherStay,
}

impl SegmentKind {
    pub fn index(&self) -> u8 {
        match self {
            SegmentKind::HomeLeave => 1,
            SegmentKind::LocalStay => 2,
            SegmentKind::OverseasStay => 3,
            SegmentKind::OtherStay => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SegmentKind::HomeLeave => "Home leave",
            SegmentKind::LocalStay => "Local stay",
            SegmentKind::OverseasStay => "Overseas stay",
            SegmentKind::OtherStay => "Other stay",
        }
    }

    /// Meta flag that switches the segment on
    fn flag(&self) -> &'static str {
        match self {
            SegmentKind::HomeLeave => "IsBackHome",
            SegmentKind::LocalStay => "IsStayComLoc",
            SegmentKind::OverseasStay => "IsStayForeign",
            SegmentKind::OtherStay => "IsStayOther",
        }
    }
}

/// Inclusive run of consecutive days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for DateSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}/{}", self.start.month(), self.start.day())
        } else {
            write!(
                f,
                "{}/{} ~ {}/{}",
                self.start.month(),
                self.start.day(),
                self.end.month(),
                self.end.day()
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaveSegment {
    pub kind: SegmentKind,
    pub spans: Vec<DateSpan>,
    pub location: Option<String>,
    /// Day count as reported by the source
    pub days: Option<String>,
}

impl fmt::Display for LeaveSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let spans: Vec<String> = self.spans.iter().map(|s| s.to_string()).collect();
        write!(f, "{}: {}", self.kind.label(), spans.join(", "))?;
        if let Some(location) = &self.location {
            write!(f, " ({})", location)?;
        }
        if let Some(days) = &self.days {
            write!(f, ", {} days", days)?;
        }
        Ok(())
    }
}

// ============================================================================
// DATE HELPERS
// ============================================================================

/// Every day from `start` to `end` inclusive (empty when end < start)
pub fn dates_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = start;
    while current <= end {
        dates.push(current);
        current = current + Days::new(1);
    }
    dates
}

/// Collapse a set of days into runs of consecutive days, in date order.
pub fn merge_continuous_dates<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Vec<DateSpan> {
    let sorted: BTreeSet<NaiveDate> = dates.into_iter().collect();
    let mut spans: Vec<DateSpan> = Vec::new();

    for date in sorted {
        match spans.last_mut() {
            Some(span) if span.end + Days::new(1) == date => span.end = date,
            _ => spans.push(DateSpan { start: date, end: date }),
        }
    }

    spans
}

// ============================================================================
// SEGMENTS
// ============================================================================

/// Segments of a leave record, local stay first, then 1/3/4 in order.
pub fn leave_segments(meta: &Value) -> Vec<LeaveSegment> {
    let ranged = [SegmentKind::HomeLeave, SegmentKind::OverseasStay, SegmentKind::OtherStay];

    // 1/3/4 ranges claim their days even when their own flag is off
    let occupied: Vec<(NaiveDate, NaiveDate)> = ranged
        .iter()
        .filter_map(|&kind| segment_range(meta, kind))
        .collect();

    let mut segments = Vec::new();

    if is_truthy(meta.get(SegmentKind::LocalStay.flag())) {
        let stay_dates = meta
            .get("StayComDates")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .split(',')
            .filter_map(parse_event_date)
            .filter(|d| !occupied.iter().any(|&(start, end)| start <= *d && *d <= end));

        let spans = merge_continuous_dates(stay_dates);
        if !spans.is_empty() {
            segments.push(segment(meta, SegmentKind::LocalStay, spans));
        }
    }

    for kind in ranged {
        if !is_truthy(meta.get(kind.flag())) {
            continue;
        }
        if let Some((start, end)) = segment_range(meta, kind) {
            segments.push(segment(meta, kind, vec![DateSpan { start, end }]));
        }
    }

    segments
}

fn segment(meta: &Value, kind: SegmentKind, spans: Vec<DateSpan>) -> LeaveSegment {
    LeaveSegment {
        kind,
        spans,
        location: text_field(meta, &format!("LocationTo{}", kind.index())),
        days: text_field(meta, &format!("DateTimeQty{}", kind.index())),
    }
}

fn segment_range(meta: &Value, kind: SegmentKind) -> Option<(NaiveDate, NaiveDate)> {
    let start = meta
        .get(format!("StartDate{}", kind.index()))
        .and_then(Value::as_str)
        .and_then(parse_event_date)?;
    let end = meta
        .get(format!("EndDate{}", kind.index()))
        .and_then(Value::as_str)
        .and_then(parse_event_date)?;
    (start <= end).then_some((start, end))
}

/// Non-empty string or number rendered as text
fn text_field(meta: &Value, key: &str) -> Option<String> {
    match meta.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Flags arrive as booleans, numbers, or strings depending on the backend
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "y" | "yes"
        ),
        _ => false,
    }
}
