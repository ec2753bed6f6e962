// ✅ Data Quality - Checks on leave events before layout
// The packer already drops events it cannot place; this module says why,
// so callers can surface data-quality warnings instead of silent gaps.

use crate::event::{parse_event_date, LeaveEvent};
use serde::{Deserialize, Serialize};
use tracing::warn;

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Severity {
    Critical, // Event cannot be laid out
    Warning,  // Event renders but looks wrong
    Info,     // Event is fine
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    pub rule_name: String,
    pub field: String,
    pub message: String,
    pub severity: Severity,
}

impl ValidationResult {
    pub fn pass(rule_name: &str, field: &str) -> Self {
        ValidationResult {
            passed: true,
            rule_name: rule_name.to_string(),
            field: field.to_string(),
            message: "ok".to_string(),
            severity: Severity::Info,
        }
    }

    pub fn fail(rule_name: &str, field: &str, message: &str, severity: Severity) -> Self {
        ValidationResult {
            passed: false,
            rule_name: rule_name.to_string(),
            field: field.to_string(),
            message: message.to_string(),
            severity,
        }
    }
}

// ============================================================================
// QUALITY REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityIssue {
    pub severity: Severity,
    pub field: String,
    pub issue: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub event_id: String,
    pub validations: Vec<ValidationResult>,
    pub issues: Vec<QualityIssue>,
}

impl QualityReport {
    /// Usable by the packer: no critical issue
    pub fn is_layoutable(&self) -> bool {
        !self.has_critical_issues()
    }

    pub fn has_critical_issues(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Critical)
    }

    pub fn summary(&self) -> String {
        if self.issues.is_empty() {
            return format!("{}: ok", self.event_id);
        }
        let problems: Vec<&str> = self.issues.iter().map(|i| i.issue.as_str()).collect();
        format!("{}: {}", self.event_id, problems.join("; "))
    }
}

/// Totals for a batch of events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub layoutable: usize,
    pub dropped: usize,
    pub warnings: usize,
}

// ============================================================================
// QUALITY ENGINE
// ============================================================================

#[derive(Debug, Default)]
pub struct EventQualityEngine;

impl EventQualityEngine {
    pub fn new() -> Self {
        EventQualityEngine
    }

    pub fn validate(&self, event: &LeaveEvent) -> QualityReport {
        let validations = vec![
            self.validate_id(event),
            self.validate_title(event),
            self.validate_date("start_date", &event.start_date),
            self.validate_date("end_date", &event.end_date),
            self.validate_order(event),
        ];

        let issues = validations
            .iter()
            .filter(|v| !v.passed)
            .map(|v| QualityIssue {
                severity: v.severity.clone(),
                field: v.field.clone(),
                issue: v.message.clone(),
            })
            .collect();

        QualityReport {
            event_id: event.id.clone(),
            validations,
            issues,
        }
    }

    fn validate_id(&self, event: &LeaveEvent) -> ValidationResult {
        if event.id.trim().is_empty() {
            ValidationResult::fail("id_present", "id", "missing id", Severity::Warning)
        } else {
            ValidationResult::pass("id_present", "id")
        }
    }

    fn validate_title(&self, event: &LeaveEvent) -> ValidationResult {
        if event.title.trim().is_empty() {
            ValidationResult::fail("title_present", "title", "empty title", Severity::Warning)
        } else {
            ValidationResult::pass("title_present", "title")
        }
    }

    fn validate_date(&self, field: &str, raw: &str) -> ValidationResult {
        if parse_event_date(raw).is_some() {
            ValidationResult::pass("date_format", field)
        } else {
            ValidationResult::fail(
                "date_format",
                field,
                &format!("unparseable date '{}'", raw),
                Severity::Critical,
            )
        }
    }

    fn validate_order(&self, event: &LeaveEvent) -> ValidationResult {
        match (event.start(), event.end()) {
            (Some(start), Some(end)) if end < start => ValidationResult::fail(
                "date_order",
                "end_date",
                &format!("end {} is before start {}", end, start),
                Severity::Critical,
            ),
            _ => ValidationResult::pass("date_order", "end_date"),
        }
    }

    /// Split a batch into reports, logging every event that will be dropped.
    pub fn review(&self, events: &[LeaveEvent]) -> (Vec<QualityReport>, BatchSummary) {
        let mut summary = BatchSummary {
            total: events.len(),
            ..BatchSummary::default()
        };

        let reports: Vec<QualityReport> = events.iter().map(|e| self.validate(e)).collect();

        for report in &reports {
            if report.is_layoutable() {
                summary.layoutable += 1;
            } else {
                summary.dropped += 1;
                warn!(event_id = %report.event_id, "data quality: {}", report.summary());
            }
            summary.warnings += report
                .issues
                .iter()
                .filter(|i| i.severity == Severity::Warning)
                .count();
        }

        (reports, summary)
    }

    /// Reports for the events that have at least one issue
    pub fn problems(&self, events: &[LeaveEvent]) -> Vec<QualityReport> {
        self.review(events)
            .0
            .into_iter()
            .filter(|r| !r.issues.is_empty())
            .collect()
    }

    /// Layout-usable events (input order kept) plus the reports of every
    /// event with an issue.
    pub fn partition<'a>(&self, events: &'a [LeaveEvent]) -> (Vec<&'a LeaveEvent>, Vec<QualityReport>) {
        let (reports, _) = self.review(events);
        let mut usable = Vec::with_capacity(events.len());
        let mut flagged = Vec::new();

        for (event, report) in events.iter().zip(reports) {
            if report.is_layoutable() {
                usable.push(event);
            }
            if !report.issues.is_empty() {
                flagged.push(report);
            }
        }

        (usable, flagged)
    }

    /// Owned copies of the layout-usable events, input order kept.
    ///
    /// Dropped events are logged here, so the packer never sees them and
    /// each bad record produces exactly one warning.
    pub fn usable_events(&self, events: &[LeaveEvent]) -> (Vec<LeaveEvent>, BatchSummary) {
        let (reports, summary) = self.review(events);
        let usable = events
            .iter()
            .zip(reports)
            .filter(|(_, report)| report.is_layoutable())
            .map(|(event, _)| event.clone())
            .collect();

        (usable, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{build_grid, YearMonth};
    use crate::packer::pack_events;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    #[test]
    fn test_valid_event_passes() {
        let engine = EventQualityEngine::new();
        let report = engine.validate(&LeaveEvent::new("1", "Alice", "2025-03-10", "2025-03-12"));

        assert!(report.issues.is_empty());
        assert!(report.is_layoutable());
        assert_eq!(report.validations.len(), 5);
        assert_eq!(report.summary(), "1: ok");
    }

    #[test]
    fn test_malformed_date_is_critical() {
        let engine = EventQualityEngine::new();
        let report = engine.validate(&LeaveEvent::new("1", "Alice", "2025-3-x", "2025-03-12"));

        assert!(report.has_critical_issues());
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].field, "start_date");
    }

    #[test]
    fn test_inverted_range_is_critical() {
        let engine = EventQualityEngine::new();
        let report = engine.validate(&LeaveEvent::new("1", "Alice", "2025-03-12", "2025-03-10"));

        assert!(!report.is_layoutable());
        assert!(report.summary().contains("before start"));
    }

    #[test]
    fn test_empty_title_is_only_a_warning() {
        let engine = EventQualityEngine::new();
        let report = engine.validate(&LeaveEvent::new("1", " ", "2025-03-10", "2025-03-10"));

        assert!(report.is_layoutable());
        assert_eq!(report.issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_review_batch() {
        let engine = EventQualityEngine::new();
        let events = vec![
            LeaveEvent::new("1", "Alice", "2025-03-10", "2025-03-12"),
            LeaveEvent::new("", "Bob", "2025-03-10", "2025-03-12"),
            LeaveEvent::new("3", "Carol", "bad", "2025-03-12"),
        ];

        let (reports, summary) = engine.review(&events);
        assert_eq!(reports.len(), 3);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.layoutable, 2);
        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.warnings, 1);

        assert_eq!(engine.problems(&events).len(), 2);
    }

    #[test]
    fn test_partition_keeps_order() {
        let engine = EventQualityEngine::new();
        let events = vec![
            LeaveEvent::new("1", "Alice", "2025-03-10", "2025-03-12"),
            LeaveEvent::new("2", "Bob", "2025-03-12", "2025-03-10"),
            LeaveEvent::new("3", "", "2025-03-01", "2025-03-01"),
        ];

        let (usable, flagged) = engine.partition(&events);
        let ids: Vec<_> = usable.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);

        let flagged_ids: Vec<_> = flagged.iter().map(|r| r.event_id.as_str()).collect();
        assert_eq!(flagged_ids, vec!["2", "3"]);
    }

    /// Counts WARN events seen by the subscriber
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_usable_events_warns_once_per_dropped_record() {
        let events = vec![
            LeaveEvent::new("1", "Alice", "2025-03-10", "2025-03-12"),
            LeaveEvent::new("2", "Bob", "2025-03-12", "2025-03-10"),
            LeaveEvent::new("3", "Carol", "2025-03-11", "2025-03-11"),
        ];
        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));

        let bars = tracing::subscriber::with_default(subscriber, || {
            let (usable, summary) = EventQualityEngine::new().usable_events(&events);
            assert_eq!(summary.dropped, 1);
            assert_eq!(usable.len(), 2);

            let grid = build_grid(YearMonth::new(2025, 3).unwrap());
            pack_events(&grid, &usable).len()
        });

        assert_eq!(bars, 2);
        assert_eq!(warnings.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_quality_agrees_with_date_range() {
        let engine = EventQualityEngine::new();
        for (start, end) in [
            ("2025-03-10", "2025-03-12"),
            ("2025-03-12", "2025-03-10"),
            ("", "2025-03-10"),
            ("2025-03-10", "2025/03/11"),
        ] {
            let event = LeaveEvent::new("x", "x", start, end);
            assert_eq!(engine.validate(&event).is_layoutable(), event.date_range().is_some());
        }
    }
}
