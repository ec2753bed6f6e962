// 📥 Leave Sources - Where leave events come from
//
// Three sources behind one trait:
// - JSON file: a LeaveEvent array, or the remote payload saved to disk
// - CSV file: one event per line
// - HTTP (feature "http"): the schedule-app.php endpoint
//
// Remote leave records are flat maps with numbered segments; they become
// LeaveEvents through map_leave_record, keeping the record itself as meta.

use crate::config::{SourceConfig, SourceKind};
use crate::event::{parse_event_date, EventColor, LeaveEvent};
use crate::filter::SearchParams;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// ============================================================================
// CORE TYPES
// ============================================================================

/// CatalogOption - One choice in a filter dropdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogOption {
    pub label: String,
    pub value: String,
}

impl CatalogOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        CatalogOption {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// LeaveSource - Fetches the events for one committed filter snapshot
pub trait LeaveSource: Send + Sync {
    fn fetch_events(&self, params: &SearchParams) -> Result<Vec<LeaveEvent>>;

    /// Business groups for the first dropdown
    fn business_groups(&self) -> Result<Vec<CatalogOption>> {
        Ok(Vec::new())
    }

    /// Factories of one business group
    fn factories(&self, _business_group: &str) -> Result<Vec<CatalogOption>> {
        Ok(Vec::new())
    }

    /// Departments of the given factories
    fn departments(&self, _factory_ids: &[String]) -> Result<Vec<CatalogOption>> {
        Ok(Vec::new())
    }

    /// Human-readable description for logs
    fn describe(&self) -> String {
        "leave source".to_string()
    }
}

// ============================================================================
// RECORD MAPPING
// ============================================================================

const SEGMENTS: [u8; 4] = [1, 2, 3, 4];

/// Convert one remote leave record into a LeaveEvent.
///
/// Dates come from `StartDate`/`EndDate` when present, otherwise from the
/// earliest start and latest end over the numbered segments and the local
/// stay days. When nothing parses the dates stay empty and the event is
/// dropped at layout time.
pub fn map_leave_record(record: &Value, index: usize) -> LeaveEvent {
    let id = text(record, "LeaveID")
        .or_else(|| text(record, "ID"))
        .unwrap_or_else(|| {
            let employee = text(record, "EmployeeID").unwrap_or_else(|| "leave".to_string());
            format!("{}-{}", employee, index)
        });

    let title = text(record, "EmployeeNameChinese")
        .or_else(|| text(record, "EmployeeName"))
        .or_else(|| text(record, "Name"))
        .unwrap_or_else(|| "Unknown".to_string());

    let (earliest, latest) = segment_bounds(record);
    let start_date = text(record, "StartDate")
        .or_else(|| earliest.map(format_date))
        .unwrap_or_default();
    let end_date = text(record, "EndDate")
        .or_else(|| latest.map(format_date))
        .unwrap_or_default();

    let color = text(record, "Color")
        .map(|c| EventColor::from_name(&c))
        .unwrap_or_else(|| EventColor::for_index(index));

    LeaveEvent {
        id,
        title,
        start_date,
        end_date,
        start_time: text(record, "StartTime"),
        end_time: text(record, "EndTime"),
        color,
        meta: Some(record.clone()),
    }
}

/// Map every record of a `leave_history` array; missing array → empty
pub fn map_leave_history(payload: &Value) -> Vec<LeaveEvent> {
    payload
        .get("leave_history")
        .and_then(Value::as_array)
        .map(|records| {
            records
                .iter()
                .enumerate()
                .map(|(index, record)| map_leave_record(record, index))
                .collect()
        })
        .unwrap_or_default()
}

fn segment_bounds(record: &Value) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let mut dates: Vec<NaiveDate> = Vec::new();

    for i in SEGMENTS {
        for key in [format!("StartDate{}", i), format!("EndDate{}", i)] {
            if let Some(date) = text(record, &key).as_deref().and_then(parse_event_date) {
                dates.push(date);
            }
        }
    }

    if let Some(stay) = text(record, "StayComDates") {
        dates.extend(stay.split(',').filter_map(parse_event_date));
    }

    (dates.iter().min().copied(), dates.iter().max().copied())
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Non-empty string, or a number rendered as text
fn text(record: &Value, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read `{ "<key>": [ {label_field, value_field}, ... ] }` into options.
pub fn parse_catalog(payload: &Value, key: &str, label_field: &str, value_field: &str) -> Vec<CatalogOption> {
    payload
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let value = text(item, value_field)?;
                    let label = text(item, label_field).unwrap_or_else(|| value.clone());
                    Some(CatalogOption { label, value })
                })
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// JSON FILE SOURCE
// ============================================================================

/// JsonFileSource - Events from a JSON file, filtered locally
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        JsonFileSource { path: path.into() }
    }

    fn read(&self) -> Result<Value> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open file: {}", self.path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse JSON from {}", self.path.display()))
    }

    /// All events in the file, before filtering
    pub fn load_all(&self) -> Result<Vec<LeaveEvent>> {
        let json = self.read()?;
        events_from_json(&json)
            .with_context(|| format!("Unsupported JSON layout in {}", self.path.display()))
    }
}

/// Accepts a LeaveEvent array, a raw record array, or `{ "leave_history": [...] }`.
pub fn events_from_json(json: &Value) -> Result<Vec<LeaveEvent>> {
    match json {
        Value::Array(items) => Ok(items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                if item.get("startDate").is_some() {
                    match serde_json::from_value::<LeaveEvent>(item.clone()) {
                        Ok(event) => Some(event),
                        Err(err) => {
                            warn!(index, "skipping malformed leave event: {}", err);
                            None
                        }
                    }
                } else {
                    Some(map_leave_record(item, index))
                }
            })
            .collect()),
        Value::Object(_) if json.get("leave_history").is_some() => Ok(map_leave_history(json)),
        _ => anyhow::bail!("expected an event array or an object with 'leave_history'"),
    }
}

impl LeaveSource for JsonFileSource {
    fn fetch_events(&self, params: &SearchParams) -> Result<Vec<LeaveEvent>> {
        let events: Vec<LeaveEvent> = self
            .load_all()?
            .into_iter()
            .filter(|e| params.matches(e))
            .collect();
        debug!(path = %self.path.display(), count = events.len(), "loaded leave events");
        Ok(events)
    }

    fn business_groups(&self) -> Result<Vec<CatalogOption>> {
        Ok(parse_catalog(&self.read()?, "business_group", "BusinessGroupName", "BusinessGroupType"))
    }

    fn factories(&self, business_group: &str) -> Result<Vec<CatalogOption>> {
        let json = self.read()?;
        let wanted = |item: &Value| {
            text(item, "BusinessGroupType").map_or(true, |group| group == business_group)
        };
        let filtered = filter_catalog(&json, "factory", wanted);
        Ok(parse_catalog(&filtered, "factory", "FactoryName", "FactoryID"))
    }

    fn departments(&self, factory_ids: &[String]) -> Result<Vec<CatalogOption>> {
        let json = self.read()?;
        let wanted = |item: &Value| {
            text(item, "FactoryID").map_or(true, |id| factory_ids.is_empty() || factory_ids.contains(&id))
        };
        let filtered = filter_catalog(&json, "department", wanted);
        Ok(parse_catalog(&filtered, "department", "DepartmentName", "DepartmentID"))
    }

    fn describe(&self) -> String {
        format!("json file {}", self.path.display())
    }
}

fn filter_catalog<F: Fn(&Value) -> bool>(json: &Value, key: &str, keep: F) -> Value {
    let items: Vec<Value> = json
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter(|item| keep(item)).cloned().collect())
        .unwrap_or_default();
    serde_json::json!({ key: items })
}

// ============================================================================
// CSV FILE SOURCE
// ============================================================================

/// One CSV line: id,title,start_date,end_date,start_time,end_time,color
#[derive(Debug, Deserialize)]
struct CsvLeaveRow {
    id: String,
    title: String,
    start_date: String,
    end_date: String,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    end_time: Option<String>,
    #[serde(default)]
    color: Option<String>,
}

impl From<CsvLeaveRow> for LeaveEvent {
    fn from(row: CsvLeaveRow) -> Self {
        LeaveEvent {
            id: row.id,
            title: row.title,
            start_date: row.start_date,
            end_date: row.end_date,
            start_time: row.start_time.filter(|t| !t.is_empty()),
            end_time: row.end_time.filter(|t| !t.is_empty()),
            color: row.color.map(|c| EventColor::from_name(&c)).unwrap_or_default(),
            meta: None,
        }
    }
}

/// CsvFileSource - Events from a CSV export, filtered locally
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        CsvFileSource { path: path.into() }
    }

    /// All events in the file; unreadable lines are skipped with a warning
    pub fn load_all(&self) -> Result<Vec<LeaveEvent>> {
        load_csv_events(&self.path)
    }
}

pub fn load_csv_events(path: &Path) -> Result<Vec<LeaveEvent>> {
    use csv::ReaderBuilder;

    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut events = Vec::new();

    for (line, result) in reader.deserialize::<CsvLeaveRow>().enumerate() {
        match result {
            Ok(row) => events.push(row.into()),
            // +2: header line and 1-based numbering
            Err(err) => warn!(path = %path.display(), line = line + 2, "skipping CSV row: {}", err),
        }
    }

    Ok(events)
}

impl LeaveSource for CsvFileSource {
    fn fetch_events(&self, params: &SearchParams) -> Result<Vec<LeaveEvent>> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter(|e| params.matches(e))
            .collect())
    }

    fn describe(&self) -> String {
        format!("csv file {}", self.path.display())
    }
}

// ============================================================================
// HTTP SOURCE
// ============================================================================

#[cfg(feature = "http")]
pub use http::HttpSource;

#[cfg(feature = "http")]
mod http {
    use super::*;
    use anyhow::bail;
    use std::time::Duration;

    /// HttpSource - The remote schedule-app.php endpoint
    pub struct HttpSource {
        base_url: String,
        client: reqwest::blocking::Client,
    }

    impl HttpSource {
        pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
            let client = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .context("Failed to build HTTP client")?;
            Ok(HttpSource {
                base_url: base_url.into(),
                client,
            })
        }

        pub fn url_for(&self, pairs: &[(&str, String)]) -> String {
            let query: Vec<String> = pairs
                .iter()
                .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
                .collect();
            format!("{}?{}", self.base_url, query.join("&"))
        }

        fn get_json(&self, pairs: &[(&str, String)]) -> Result<Value> {
            let url = self.url_for(pairs);
            debug!(%url, "GET");

            let response = self
                .client
                .get(&url)
                .send()
                .with_context(|| format!("Request failed: {}", url))?;

            let status = response.status();
            if !status.is_success() {
                bail!("{} returned HTTP {}", url, status);
            }

            response
                .json::<Value>()
                .with_context(|| format!("Invalid JSON from {}", url))
        }
    }

    impl LeaveSource for HttpSource {
        fn fetch_events(&self, params: &SearchParams) -> Result<Vec<LeaveEvent>> {
            let payload = self
                .get_json(&params.query_pairs())
                .context("Failed to fetch leave history")?;
            Ok(map_leave_history(&payload))
        }

        fn business_groups(&self) -> Result<Vec<CatalogOption>> {
            let payload = self.get_json(&[("Action", "business-group".to_string())])?;
            Ok(parse_catalog(&payload, "business_group", "BusinessGroupName", "BusinessGroupType"))
        }

        fn factories(&self, business_group: &str) -> Result<Vec<CatalogOption>> {
            if business_group.is_empty() {
                return Ok(Vec::new());
            }
            let payload = self.get_json(&[
                ("Action", "factory".to_string()),
                ("Business_Group_Type", business_group.to_string()),
            ])?;
            Ok(parse_catalog(&payload, "factory", "FactoryName", "FactoryID"))
        }

        fn departments(&self, factory_ids: &[String]) -> Result<Vec<CatalogOption>> {
            let payload = self.get_json(&[
                ("Action", "department".to_string()),
                ("Factory_ID", factory_ids.join(",")),
            ])?;
            Ok(parse_catalog(&payload, "department", "DepartmentName", "DepartmentID"))
        }

        fn describe(&self) -> String {
            format!("http {}", self.base_url)
        }
    }

}

// ============================================================================
// FACTORY
// ============================================================================

/// Build the source described by the configuration
pub fn open_source(config: &SourceConfig) -> Result<Box<dyn LeaveSource>> {
    match config.kind {
        SourceKind::Json => Ok(Box::new(JsonFileSource::new(&config.path))),
        SourceKind::Csv => Ok(Box::new(CsvFileSource::new(&config.path))),
        SourceKind::Http => open_http(config),
    }
}

#[cfg(feature = "http")]
fn open_http(config: &SourceConfig) -> Result<Box<dyn LeaveSource>> {
    let base_url = config
        .base_url
        .clone()
        .context("source.base_url is required for the http source")?;
    let source = HttpSource::new(base_url, std::time::Duration::from_secs(config.timeout_secs))?;
    Ok(Box::new(source))
}

#[cfg(not(feature = "http"))]
fn open_http(_config: &SourceConfig) -> Result<Box<dyn LeaveSource>> {
    anyhow::bail!("http source not available: rebuild with --features http")
}
