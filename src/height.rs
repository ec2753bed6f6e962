// 📏 Week Height - Row height from the deepest bar in each week

use crate::packer::EventBar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Height of a week row with no bars (pixels)
pub const EVENT_BASE_HEIGHT: u32 = 56;

/// Extra height per stacked bar row (pixels)
pub const EVENT_ROW_HEIGHT: u32 = 38;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightSettings {
    #[serde(default = "default_base")]
    pub base: u32,

    #[serde(default = "default_per_row")]
    pub per_row: u32,
}

fn default_base() -> u32 {
    EVENT_BASE_HEIGHT
}

fn default_per_row() -> u32 {
    EVENT_ROW_HEIGHT
}

impl Default for HeightSettings {
    fn default() -> Self {
        HeightSettings {
            base: EVENT_BASE_HEIGHT,
            per_row: EVENT_ROW_HEIGHT,
        }
    }
}

impl HeightSettings {
    pub fn new(base: u32, per_row: u32) -> Self {
        HeightSettings { base, per_row }
    }

    /// Height for a week whose deepest bar sits in `max_row`
    pub fn height_for_rows(&self, max_row: Option<usize>) -> u32 {
        match max_row {
            None => self.base,
            Some(row) => self
                .base
                .saturating_add((row as u32).saturating_add(1).saturating_mul(self.per_row)),
        }
    }
}

/// Height of one week, scanning all bars.
pub fn week_height(week_index: usize, bars: &[EventBar<'_>], settings: HeightSettings) -> u32 {
    let max_row = bars
        .iter()
        .filter(|bar| bar.week_index == week_index)
        .map(|bar| bar.row)
        .max();
    settings.height_for_rows(max_row)
}

/// WeekHeightCalculator - Answers heights for one bar set
///
/// Built once per packing result; lookups after that do not rescan the bars.
#[derive(Debug, Clone)]
pub struct WeekHeightCalculator {
    settings: HeightSettings,
    max_rows: BTreeMap<usize, usize>,
}

impl WeekHeightCalculator {
    pub fn new(bars: &[EventBar<'_>], settings: HeightSettings) -> Self {
        let mut max_rows: BTreeMap<usize, usize> = BTreeMap::new();
        for bar in bars {
            let entry = max_rows.entry(bar.week_index).or_insert(bar.row);
            if bar.row > *entry {
                *entry = bar.row;
            }
        }
        WeekHeightCalculator { settings, max_rows }
    }

    pub fn settings(&self) -> HeightSettings {
        self.settings
    }

    /// Number of bar rows used in a week (0 when empty)
    pub fn rows_in_week(&self, week_index: usize) -> usize {
        self.max_rows.get(&week_index).map_or(0, |row| row + 1)
    }

    pub fn height_for(&self, week_index: usize) -> u32 {
        self.settings
            .height_for_rows(self.max_rows.get(&week_index).copied())
    }

    /// Heights for weeks `0..week_count`, in order
    pub fn heights(&self, week_count: usize) -> Vec<u32> {
        (0..week_count).map(|index| self.height_for(index)).collect()
    }
}
