// Leave Calendar - Core Library
// Month grid, event-bar packing and row heights, plus the filter session
// and data sources that feed them. Used by the TUI, the HTTP server, and tests.

pub mod calendar;
pub mod config;
pub mod data_quality;
pub mod detail;
pub mod error;
pub mod event;
pub mod filter;
pub mod height;
pub mod layout;
pub mod packer;
pub mod ranges;
pub mod source;

// Re-export commonly used types
pub use calendar::{
    build_grid, build_grid_for_date, build_grid_with,
    CalendarDay, CalendarGrid, WeekRow, WeekStart, YearMonth,
};
pub use config::{Config, FilterConfig, LayoutConfig, ServerConfig, SourceConfig, SourceKind};
pub use data_quality::{
    BatchSummary, EventQualityEngine, QualityIssue, QualityReport, Severity,
    ValidationResult as QualityValidationResult,
};
pub use detail::{leave_segments, DateSpan, LeaveSegment, SegmentKind};
pub use error::{CalendarError, CalendarResult};
pub use event::{parse_event_date, EventColor, LeaveEvent};
pub use filter::{
    normalize_multi_select, resolve_factory_ids,
    FilterSession, SearchOutcome, SearchParams, SearchTicket, Selection,
};
pub use height::{week_height, HeightSettings, WeekHeightCalculator, EVENT_BASE_HEIGHT, EVENT_ROW_HEIGHT};
pub use layout::{event_set_digest, layout_digest, GridCache, MonthLayout};
pub use packer::{bars_in_week, pack_events, ranges_overlap, sort_for_display, EventBar};
pub use ranges::{group_overlapping, range_for_date, EventRange};
pub use source::{
    map_leave_record, open_source, CatalogOption, CsvFileSource, JsonFileSource, LeaveSource,
};

#[cfg(feature = "http")]
pub use source::HttpSource;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
