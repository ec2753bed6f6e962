// 🧩 Month Layout - Grid + bars + heights for one render
// Everything here is derived from (month, week start, events). Nothing is
// stored between renders except the optional grid memo.

use crate::calendar::{build_grid_with, CalendarGrid, WeekStart, YearMonth};
use crate::event::LeaveEvent;
use crate::height::{HeightSettings, WeekHeightCalculator};
use crate::packer::{pack_events, EventBar};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

// ============================================================================
// MONTH LAYOUT
// ============================================================================

/// MonthLayout - What the presentation layer needs to draw a month
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthLayout<'a> {
    pub month: YearMonth,
    pub grid: CalendarGrid,
    pub bars: Vec<EventBar<'a>>,
    /// One entry per week, same order as `grid.weeks()`
    pub heights: Vec<u32>,
}

impl<'a> MonthLayout<'a> {
    /// Build the full layout for `month`.
    pub fn compute(
        month: YearMonth,
        week_start: WeekStart,
        events: &'a [LeaveEvent],
        settings: HeightSettings,
    ) -> Self {
        let grid = build_grid_with(month, week_start);
        Self::from_grid(month, grid, events, settings)
    }

    /// Same as [`MonthLayout::compute`] with an already-built grid.
    pub fn from_grid(
        month: YearMonth,
        grid: CalendarGrid,
        events: &'a [LeaveEvent],
        settings: HeightSettings,
    ) -> Self {
        let bars = pack_events(&grid, events);
        let heights = WeekHeightCalculator::new(&bars, settings).heights(grid.len());

        MonthLayout {
            month,
            grid,
            bars,
            heights,
        }
    }

    pub fn week_bars(&self, week_index: usize) -> impl Iterator<Item = &EventBar<'a>> {
        self.bars.iter().filter(move |bar| bar.week_index == week_index)
    }

    /// Total height of all week rows
    pub fn total_height(&self) -> u32 {
        self.heights.iter().sum()
    }
}

// ============================================================================
// GRID MEMO
// ============================================================================

/// GridCache - Memoizes grids by (month, week start)
///
/// Grids are pure functions of the key, so entries never go stale.
#[derive(Debug, Default)]
pub struct GridCache {
    grids: HashMap<(YearMonth, WeekStart), CalendarGrid>,
}

impl GridCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grid(&mut self, month: YearMonth, week_start: WeekStart) -> &CalendarGrid {
        self.grids
            .entry((month, week_start))
            .or_insert_with(|| build_grid_with(month, week_start))
    }

    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    pub fn clear(&mut self) {
        self.grids.clear();
    }
}

// ============================================================================
// EVENT-SET DIGEST
// ============================================================================

/// SHA-256 over the event fields that affect bars, in input order.
///
/// Two event sets with the same digest pack to the same bars for any grid,
/// so the digest works as a cache key or an ETag for bar-only responses.
pub fn event_set_digest(month: YearMonth, events: &[LeaveEvent]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(month.to_string());
    hash_events(&mut hasher, events);
    format!("{:x}", hasher.finalize())
}

/// Digest of everything a serialized `MonthLayout` depends on.
///
/// Week start moves columns and grid rows, and the height settings change
/// every week's height, so both are part of the key.
pub fn layout_digest(
    month: YearMonth,
    week_start: WeekStart,
    heights: HeightSettings,
    events: &[LeaveEvent],
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(month.to_string());
    hasher.update(b"\x1d");
    hasher.update(format!("{:?}", week_start.weekday()));
    hasher.update(b"\x1d");
    hasher.update(heights.base.to_le_bytes());
    hasher.update(heights.per_row.to_le_bytes());
    hash_events(&mut hasher, events);
    format!("{:x}", hasher.finalize())
}

fn hash_events(hasher: &mut Sha256, events: &[LeaveEvent]) {
    for event in events {
        hasher.update(b"\x1e");
        for field in [
            event.id.as_str(),
            event.title.as_str(),
            event.start_date.as_str(),
            event.end_date.as_str(),
            event.color.as_str(),
        ] {
            hasher.update(field.as_bytes());
            hasher.update(b"\x1f");
        }
    }
}
