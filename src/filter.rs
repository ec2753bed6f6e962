// 🔎 Filter Session - Committed filters → one authoritative event set
//
// Every commit issues a ticket. Only the most recent ticket may publish
// events; a response for an older ticket is dropped no matter when it
// arrives. A failed fetch publishes an empty set, never a partial one.

use crate::calendar::YearMonth;
use crate::event::LeaveEvent;
use crate::source::{CatalogOption, LeaveSource};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Option value meaning "no restriction"
pub const ALL: &str = "all";

// ============================================================================
// SELECTION
// ============================================================================

/// Selection - Value of a multi-select filter at commit time
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    #[default]
    All,
    Only(Vec<String>),
}

impl Selection {
    /// Commit-time reading of a form value: empty or containing "all" means All.
    pub fn from_form<S: AsRef<str>>(values: &[S]) -> Self {
        if values.is_empty() || values.iter().any(|v| v.as_ref() == ALL) {
            Selection::All
        } else {
            Selection::Only(values.iter().map(|v| v.as_ref().to_string()).collect())
        }
    }

    /// Parse the comma-joined wire form ("all" or "a,b,c")
    pub fn from_param(raw: &str) -> Self {
        let values: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();
        Self::from_form(values.as_slice())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    pub fn allows(&self, value: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(values) => values.iter().any(|v| v == value),
        }
    }

    /// Comma-joined wire form
    pub fn to_param(&self) -> String {
        match self {
            Selection::All => ALL.to_string(),
            Selection::Only(values) => values.join(","),
        }
    }
}

/// Edit-time normalization of a multi-select with an "all" option.
///
/// * nothing selected → `["all"]`
/// * "all" plus specific values → just the specific values
/// * every real option selected → `["all"]`
pub fn normalize_multi_select<S: AsRef<str>>(values: &[S], option_count: usize) -> Vec<String> {
    let has_all = values.iter().any(|v| v.as_ref() == ALL);

    if values.is_empty() {
        return vec![ALL.to_string()];
    }

    if has_all && values.len() > 1 {
        return values
            .iter()
            .map(|v| v.as_ref())
            .filter(|v| *v != ALL)
            .map(str::to_string)
            .collect();
    }

    if !has_all && values.len() == option_count {
        return vec![ALL.to_string()];
    }

    values.iter().map(|v| v.as_ref().to_string()).collect()
}

/// Factory ids to load departments for: the explicit selection, or every
/// known factory when the selection is All.
pub fn resolve_factory_ids(selection: &Selection, options: &[CatalogOption]) -> Vec<String> {
    match selection {
        Selection::All => options
            .iter()
            .filter(|o| o.value != ALL)
            .map(|o| o.value.clone())
            .collect(),
        Selection::Only(ids) => ids.clone(),
    }
}

// ============================================================================
// SEARCH PARAMS
// ============================================================================

/// SearchParams - One committed filter snapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchParams {
    pub business_group: String,
    #[serde(default)]
    pub factory: Selection,
    #[serde(default)]
    pub department: Selection,
    #[serde(default)]
    pub name: String,
    pub month: YearMonth,
}

impl SearchParams {
    /// Initial filters: everything in `business_group` for `month`
    pub fn new(business_group: impl Into<String>, month: YearMonth) -> Self {
        SearchParams {
            business_group: business_group.into(),
            factory: Selection::All,
            department: Selection::All,
            name: String::new(),
            month,
        }
    }

    pub fn with_month(&self, month: YearMonth) -> Self {
        SearchParams {
            month,
            ..self.clone()
        }
    }

    /// Query parameters of the remote leave-history action
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Action", "leave-history".to_string()),
            ("Business_Group_Type", self.business_group.clone()),
            ("Factory_ID", self.factory.to_param()),
            ("Department", self.department.to_param()),
            ("Name", self.name.trim().to_string()),
            ("Date", self.month.to_string()),
        ]
    }

    /// Local filtering for sources that return everything.
    ///
    /// Factory, department and business group are checked against the
    /// event's meta (`FactoryID`, `DepartmentID`, `BusinessGroupType`) when
    /// present; events without those keys are not excluded by them.
    pub fn matches(&self, event: &LeaveEvent) -> bool {
        let in_month = match event.date_range() {
            Some((start, end)) => {
                !(end < self.month.first_day() || start > self.month.last_day())
            }
            None => false,
        };
        if !in_month {
            return false;
        }

        let name = self.name.trim().to_lowercase();
        if !name.is_empty() && !event.title.to_lowercase().contains(&name) {
            return false;
        }

        let meta_str = |key: &str| {
            event
                .meta
                .as_ref()
                .and_then(|m| m.get(key))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        if let Some(factory) = meta_str("FactoryID") {
            if !self.factory.allows(&factory) {
                return false;
            }
        }
        if let Some(department) = meta_str("DepartmentID") {
            if !self.department.allows(&department) {
                return false;
            }
        }
        if let Some(group) = meta_str("BusinessGroupType") {
            if !self.business_group.is_empty() && group != self.business_group {
                return false;
            }
        }

        true
    }
}

// ============================================================================
// FILTER SESSION
// ============================================================================

/// SearchTicket - A request tagged with the snapshot it was issued for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub id: Uuid,
    pub params: SearchParams,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Events replaced with the response
    Applied { count: usize },
    /// A newer search was committed; response dropped
    Stale,
    /// Fetch failed; events reset to empty
    Failed { message: String },
}

#[derive(Debug, Default)]
pub struct FilterSession {
    current: Option<SearchParams>,
    pending: Option<Uuid>,
    events: Vec<LeaveEvent>,
    notification: Option<String>,
}

impl FilterSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last committed filters
    pub fn current(&self) -> Option<&SearchParams> {
        self.current.as_ref()
    }

    /// Month to display: the committed one, else the current month
    pub fn view_month(&self) -> YearMonth {
        self.current
            .as_ref()
            .map(|p| p.month)
            .unwrap_or_else(YearMonth::current)
    }

    /// Events of the latest successful search
    pub fn events(&self) -> &[LeaveEvent] {
        &self.events
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending user-facing notification, if any
    pub fn take_notification(&mut self) -> Option<String> {
        self.notification.take()
    }

    /// Commit filters. The returned ticket supersedes all earlier ones.
    pub fn begin_search(&mut self, params: SearchParams) -> SearchTicket {
        let ticket = SearchTicket {
            id: Uuid::new_v4(),
            params: params.clone(),
        };

        if let Some(previous) = self.pending.replace(ticket.id) {
            debug!(superseded = %previous, ticket = %ticket.id, "search superseded");
        }
        self.current = Some(params);

        ticket
    }

    /// Deliver the response for `ticket`.
    pub fn complete(
        &mut self,
        ticket: &SearchTicket,
        result: anyhow::Result<Vec<LeaveEvent>>,
    ) -> SearchOutcome {
        if self.pending != Some(ticket.id) {
            debug!(ticket = %ticket.id, "discarding stale search response");
            return SearchOutcome::Stale;
        }
        self.pending = None;

        match result {
            Ok(events) => {
                let count = events.len();
                self.events = events;
                info!(
                    month = %ticket.params.month,
                    business_group = %ticket.params.business_group,
                    count,
                    "leave events loaded"
                );
                SearchOutcome::Applied { count }
            }
            Err(err) => {
                warn!(ticket = %ticket.id, "load leave history failed: {:#}", err);
                self.events.clear();
                let message = "Load leave history failed".to_string();
                self.notification = Some(message.clone());
                SearchOutcome::Failed { message }
            }
        }
    }

    /// Commit and fetch synchronously.
    pub fn search(&mut self, source: &dyn LeaveSource, params: SearchParams) -> SearchOutcome {
        let ticket = self.begin_search(params);
        let result = source.fetch_events(&ticket.params);
        self.complete(&ticket, result)
    }

    /// Filters for the month after the displayed one
    pub fn next_month(&self) -> Option<SearchParams> {
        self.current.as_ref().map(|p| p.with_month(p.month.next()))
    }

    /// Filters for the month before the displayed one
    pub fn previous_month(&self) -> Option<SearchParams> {
        self.current.as_ref().map(|p| p.with_month(p.month.previous()))
    }

    /// Filters moved to `today`'s month
    pub fn go_to_today(&self, today: YearMonth) -> Option<SearchParams> {
        self.current.as_ref().map(|p| p.with_month(today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;

    fn march() -> YearMonth {
        YearMonth::new(2025, 3).unwrap()
    }

    fn events(n: usize) -> Vec<LeaveEvent> {
        (0..n)
            .map(|i| LeaveEvent::new(i.to_string(), "x", "2025-03-10", "2025-03-10"))
            .collect()
    }

    struct FixedSource(Vec<LeaveEvent>);

    impl LeaveSource for FixedSource {
        fn fetch_events(&self, params: &SearchParams) -> anyhow::Result<Vec<LeaveEvent>> {
            Ok(self.0.iter().filter(|e| params.matches(e)).cloned().collect())
        }
    }

    struct FailingSource;

    impl LeaveSource for FailingSource {
        fn fetch_events(&self, _params: &SearchParams) -> anyhow::Result<Vec<LeaveEvent>> {
            Err(anyhow!("connection refused"))
        }
    }

    #[test]
    fn test_selection_from_form() {
        assert_eq!(Selection::from_form::<&str>(&[]), Selection::All);
        assert_eq!(Selection::from_form(&["all", "F1"]), Selection::All);
        assert_eq!(
            Selection::from_form(&["F1", "F2"]),
            Selection::Only(vec!["F1".into(), "F2".into()])
        );
        assert_eq!(Selection::from_param(" F1, ,F2 ").to_param(), "F1,F2");
        assert!(Selection::from_param("").is_all());
    }

    #[test]
    fn test_normalize_multi_select() {
        assert_eq!(normalize_multi_select::<&str>(&[], 3), vec!["all"]);
        assert_eq!(normalize_multi_select(&["all", "F1"], 3), vec!["F1"]);
        assert_eq!(normalize_multi_select(&["F1", "F2", "F3"], 3), vec!["all"]);
        assert_eq!(normalize_multi_select(&["F1"], 3), vec!["F1"]);
        assert_eq!(normalize_multi_select(&["all"], 3), vec!["all"]);
    }

    #[test]
    fn test_resolve_factory_ids() {
        let options = vec![
            CatalogOption::new("Plant A", "F1"),
            CatalogOption::new("Plant B", "F2"),
        ];

        assert_eq!(resolve_factory_ids(&Selection::All, &options), vec!["F1", "F2"]);
        assert_eq!(
            resolve_factory_ids(&Selection::Only(vec!["F2".into()]), &options),
            vec!["F2"]
        );
    }

    #[test]
    fn test_query_pairs() {
        let params = SearchParams {
            business_group: "BG1".into(),
            factory: Selection::Only(vec!["F1".into(), "F2".into()]),
            department: Selection::All,
            name: " Alice ".into(),
            month: march(),
        };

        let pairs = params.query_pairs();
        assert_eq!(pairs[0], ("Action", "leave-history".to_string()));
        assert!(pairs.contains(&("Factory_ID", "F1,F2".to_string())));
        assert!(pairs.contains(&("Department", "all".to_string())));
        assert!(pairs.contains(&("Name", "Alice".to_string())));
        assert!(pairs.contains(&("Date", "2025-03".to_string())));
    }

    #[test]
    fn test_params_match_month_and_name() {
        let mut params = SearchParams::new("BG1", march());
        let inside = LeaveEvent::new("1", "Alice Chen", "2025-02-27", "2025-03-01");
        let outside = LeaveEvent::new("2", "Bob", "2025-04-01", "2025-04-02");
        let broken = LeaveEvent::new("3", "Carol", "bad", "2025-03-01");

        assert!(params.matches(&inside));
        assert!(!params.matches(&outside));
        assert!(!params.matches(&broken));

        params.name = "alice".into();
        assert!(params.matches(&inside));
        params.name = "bob".into();
        assert!(!params.matches(&inside));
    }

    #[test]
    fn test_params_match_meta() {
        let mut params = SearchParams::new("BG1", march());
        params.factory = Selection::Only(vec!["F1".into()]);

        let in_f1 = LeaveEvent::new("1", "a", "2025-03-10", "2025-03-10")
            .with_meta(json!({"FactoryID": "F1", "BusinessGroupType": "BG1"}));
        let in_f2 = LeaveEvent::new("2", "b", "2025-03-10", "2025-03-10")
            .with_meta(json!({"FactoryID": "F2"}));
        let other_group = LeaveEvent::new("3", "c", "2025-03-10", "2025-03-10")
            .with_meta(json!({"FactoryID": "F1", "BusinessGroupType": "BG2"}));
        let no_meta = LeaveEvent::new("4", "d", "2025-03-10", "2025-03-10");

        assert!(params.matches(&in_f1));
        assert!(!params.matches(&in_f2));
        assert!(!params.matches(&other_group));
        assert!(params.matches(&no_meta));
    }

    #[test]
    fn test_search_replaces_events_wholesale() {
        let mut session = FilterSession::new();

        let outcome = session.search(&FixedSource(events(3)), SearchParams::new("BG1", march()));
        assert_eq!(outcome, SearchOutcome::Applied { count: 3 });
        assert_eq!(session.events().len(), 3);

        let outcome = session.search(&FixedSource(events(1)), SearchParams::new("BG1", march()));
        assert_eq!(outcome, SearchOutcome::Applied { count: 1 });
        assert_eq!(session.events().len(), 1);
        assert!(!session.is_loading());
    }

    #[test]
    fn test_failed_search_resets_events() {
        let mut session = FilterSession::new();
        session.search(&FixedSource(events(2)), SearchParams::new("BG1", march()));

        let outcome = session.search(&FailingSource, SearchParams::new("BG1", march()));
        assert!(matches!(outcome, SearchOutcome::Failed { .. }));
        assert!(session.events().is_empty());
        assert_eq!(session.take_notification().as_deref(), Some("Load leave history failed"));
        assert_eq!(session.take_notification(), None);
    }

    #[test]
    fn test_out_of_order_responses_keep_latest() {
        let mut session = FilterSession::new();

        let first = session.begin_search(SearchParams::new("BG1", march()));
        let second = session.begin_search(SearchParams::new("BG2", march()));
        assert!(session.is_loading());

        // Newer response lands first, older one after
        assert_eq!(session.complete(&second, Ok(events(2))), SearchOutcome::Applied { count: 2 });
        assert_eq!(session.complete(&first, Ok(events(5))), SearchOutcome::Stale);

        assert_eq!(session.events().len(), 2);
        assert_eq!(session.current().unwrap().business_group, "BG2");
    }

    #[test]
    fn test_stale_failure_does_not_clear_events() {
        let mut session = FilterSession::new();

        let first = session.begin_search(SearchParams::new("BG1", march()));
        let second = session.begin_search(SearchParams::new("BG1", march()));
        session.complete(&second, Ok(events(2)));

        assert_eq!(session.complete(&first, Err(anyhow!("timeout"))), SearchOutcome::Stale);
        assert_eq!(session.events().len(), 2);
        assert_eq!(session.take_notification(), None);
    }

    #[test]
    fn test_month_navigation() {
        let mut session = FilterSession::new();
        assert!(session.next_month().is_none());

        session.begin_search(SearchParams::new("BG1", march()));
        assert_eq!(session.view_month(), march());
        assert_eq!(session.next_month().unwrap().month.to_string(), "2025-04");
        assert_eq!(session.previous_month().unwrap().month.to_string(), "2025-02");

        let today = YearMonth::new(2026, 10).unwrap();
        let params = session.go_to_today(today).unwrap();
        assert_eq!(params.month, today);
        assert_eq!(params.business_group, "BG1");
    }
}
