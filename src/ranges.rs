// 🔗 Overlap Ranges - Compact listing of leave that overlaps in time
// Used where there is no room for a bar grid: each range is a date span
// plus every event that landed in it.

use crate::event::LeaveEvent;
use crate::packer::ranges_overlap;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRange<'a> {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub events: Vec<&'a LeaveEvent>,
}

impl EventRange<'_> {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Group events by start date into ranges.
///
/// Each event joins the first range it overlaps (inclusive by day), which
/// widens to cover it; otherwise it starts a new range. Events without a
/// usable date range are left out.
pub fn group_overlapping(events: &[LeaveEvent]) -> Vec<EventRange<'_>> {
    let mut dated: Vec<(&LeaveEvent, NaiveDate, NaiveDate)> = events
        .iter()
        .filter_map(|event| event.date_range().map(|(start, end)| (event, start, end)))
        .collect();
    dated.sort_by_key(|&(_, start, _)| start);

    let mut ranges: Vec<EventRange<'_>> = Vec::new();

    for (event, start, end) in dated {
        match ranges
            .iter_mut()
            .find(|range| ranges_overlap((start, end), (range.start, range.end)))
        {
            Some(range) => {
                range.start = range.start.min(start);
                range.end = range.end.max(end);
                range.events.push(event);
            }
            None => ranges.push(EventRange {
                start,
                end,
                events: vec![event],
            }),
        }
    }

    ranges
}

/// The range covering `date`, if any
pub fn range_for_date<'r, 'a>(ranges: &'r [EventRange<'a>], date: NaiveDate) -> Option<&'r EventRange<'a>> {
    ranges.iter().find(|range| range.contains(date))
}
