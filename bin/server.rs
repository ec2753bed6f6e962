// Leave Calendar - Web Server
// JSON API over the grid, packer and filter session

use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use leave_calendar::{
    build_grid_with, event_set_digest, group_overlapping, layout_digest, open_source,
    resolve_factory_ids, sort_for_display, Config, EventQualityEngine, FilterSession,
    HeightSettings, LeaveEvent, LeaveSource, MonthLayout, SearchOutcome, SearchParams, Selection,
    WeekStart, YearMonth,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Requests carrying the same value share one filter session, so a newer
/// search from that client supersedes its older one. Requests without it
/// never supersede anything.
const CLIENT_ID_HEADER: &str = "x-client-id";

/// Shared application state
#[derive(Clone)]
struct AppState {
    /// Sessions with a search in flight, keyed by client
    sessions: Arc<Mutex<HashMap<String, FilterSession>>>,
    source: Arc<dyn LeaveSource>,
    config: Arc<Config>,
}

impl AppState {
    fn new(source: Arc<dyn LeaveSource>, config: Config) -> Self {
        AppState {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            source,
            config: Arc::new(config),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, FilterSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Session key for a request: the client id, or a one-off key
fn session_key(headers: &HeaderMap) -> String {
    headers
        .get(CLIENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message.into()),
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::error(message))).into_response()
}

/// 200 with an ETag, or 304 when the client already has this body
fn tagged_response<T: Serialize>(headers: &HeaderMap, digest: &str, data: T) -> Response {
    let etag = format!("\"{}\"", digest);

    let cached = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == etag);
    if cached {
        return (StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response();
    }

    (StatusCode::OK, [(header::ETAG, etag)], Json(ApiResponse::ok(data))).into_response()
}

// ============================================================================
// Query parsing
// ============================================================================

fn parse_month(raw: Option<&str>) -> Result<YearMonth, Response> {
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|e: leave_calendar::CalendarError| error_response(StatusCode::BAD_REQUEST, e.to_string())),
        None => Ok(YearMonth::current()),
    }
}

fn parse_week_start(raw: Option<&str>, default: WeekStart) -> Result<WeekStart, Response> {
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|e: leave_calendar::CalendarError| error_response(StatusCode::BAD_REQUEST, e.to_string())),
        None => Ok(default),
    }
}

#[derive(Debug, Default, Deserialize)]
struct GridQuery {
    month: Option<String>,
    week_start: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CalendarQuery {
    business_group: Option<String>,
    factory: Option<String>,
    department: Option<String>,
    name: Option<String>,
    month: Option<String>,
    week_start: Option<String>,
}

impl CalendarQuery {
    fn to_params(&self, config: &Config) -> Result<SearchParams, Response> {
        let month = parse_month(self.month.as_deref())?;
        let business_group = self
            .business_group
            .clone()
            .unwrap_or_else(|| config.filter.business_group.clone());

        let mut params = SearchParams::new(business_group, month);
        params.factory = self.factory.as_deref().map(Selection::from_param).unwrap_or_default();
        params.department = self.department.as_deref().map(Selection::from_param).unwrap_or_default();
        params.name = self.name.clone().unwrap_or_default();
        Ok(params)
    }
}

#[derive(Debug, Deserialize)]
struct LayoutRequest {
    month: YearMonth,
    #[serde(default)]
    events: Vec<LeaveEvent>,
    week_start: Option<WeekStart>,
    heights: Option<HeightSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct FactoryQuery {
    business_group: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DepartmentQuery {
    business_group: Option<String>,
    factory: Option<String>,
}

#[derive(Serialize)]
struct CalendarResponse<'a> {
    #[serde(flatten)]
    layout: MonthLayout<'a>,
    dropped: usize,
}

// ============================================================================
// Search
// ============================================================================

/// Commit `params` in the caller's session, fetch off the async runtime, and
/// return the event set if this search is still that client's latest one
/// when the fetch finishes.
async fn run_search(
    state: &AppState,
    headers: &HeaderMap,
    params: SearchParams,
) -> Result<Vec<LeaveEvent>, Response> {
    let key = session_key(headers);
    let ticket = state
        .sessions()
        .entry(key.clone())
        .or_default()
        .begin_search(params);

    let source = Arc::clone(&state.source);
    let fetch_params = ticket.params.clone();
    let result = tokio::task::spawn_blocking(move || source.fetch_events(&fetch_params))
        .await
        .map_err(anyhow::Error::from)
        .and_then(|r| r);

    let mut sessions = state.sessions();
    // A finished newer search already took the session with it
    let Some(session) = sessions.get_mut(&key) else {
        return Err(superseded());
    };

    let outcome = match session.complete(&ticket, result) {
        SearchOutcome::Applied { .. } => Ok(session.events().to_vec()),
        SearchOutcome::Stale => Err(superseded()),
        SearchOutcome::Failed { message } => {
            session.take_notification();
            Err(error_response(StatusCode::BAD_GATEWAY, message))
        }
    };

    // Responses carry the events, so only in-flight sessions are kept
    if !session.is_loading() {
        sessions.remove(&key);
    }
    drop(sessions);

    let mut events = outcome?;
    if state.config.layout.sort_events {
        sort_for_display(&mut events);
    }
    Ok(events)
}

fn superseded() -> Response {
    error_response(StatusCode::CONFLICT, "superseded by a newer search")
}

/// Run a blocking catalog lookup on the blocking pool
async fn catalog<F, T>(lookup: F) -> Response
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Serialize + Send + 'static,
{
    match tokio::task::spawn_blocking(lookup).await {
        Ok(Ok(options)) => (StatusCode::OK, Json(ApiResponse::ok(options))).into_response(),
        Ok(Err(e)) => {
            warn!("catalog lookup failed: {:#}", e);
            error_response(StatusCode::BAD_GATEWAY, "Load options failed")
        }
        Err(e) => {
            warn!("catalog lookup panicked: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Load options failed")
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/grid - Week rows for a month
async fn get_grid(State(state): State<AppState>, Query(query): Query<GridQuery>) -> Response {
    let month = match parse_month(query.month.as_deref()) {
        Ok(month) => month,
        Err(response) => return response,
    };
    let week_start = match parse_week_start(query.week_start.as_deref(), state.config.layout.week_start) {
        Ok(week_start) => week_start,
        Err(response) => return response,
    };

    let grid = build_grid_with(month, week_start);
    (StatusCode::OK, Json(ApiResponse::ok(grid))).into_response()
}

/// POST /api/layout - Pack a caller-supplied event set
async fn post_layout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LayoutRequest>,
) -> Response {
    let week_start = request.week_start.unwrap_or(state.config.layout.week_start);
    let heights = request.heights.unwrap_or(state.config.layout.heights);

    let mut events = request.events;
    if state.config.layout.sort_events {
        sort_for_display(&mut events);
    }

    let digest = layout_digest(request.month, week_start, heights, &events);
    let (usable, summary) = EventQualityEngine::new().usable_events(&events);
    let layout = MonthLayout::compute(request.month, week_start, &usable, heights);

    tagged_response(
        &headers,
        &digest,
        CalendarResponse {
            layout,
            dropped: summary.dropped,
        },
    )
}

/// GET /api/calendar - Fetch through the session and lay out the month
async fn get_calendar(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CalendarQuery>,
) -> Response {
    let params = match query.to_params(&state.config) {
        Ok(params) => params,
        Err(response) => return response,
    };
    let week_start = match parse_week_start(query.week_start.as_deref(), state.config.layout.week_start) {
        Ok(week_start) => week_start,
        Err(response) => return response,
    };
    let month = params.month;
    let heights = state.config.layout.heights;

    let events = match run_search(&state, &headers, params).await {
        Ok(events) => events,
        Err(response) => return response,
    };

    let digest = layout_digest(month, week_start, heights, &events);
    let (usable, summary) = EventQualityEngine::new().usable_events(&events);
    let layout = MonthLayout::compute(month, week_start, &usable, heights);

    tagged_response(
        &headers,
        &digest,
        CalendarResponse {
            layout,
            dropped: summary.dropped,
        },
    )
}

/// GET /api/ranges - Overlap groups for the compact listing
async fn get_ranges(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CalendarQuery>,
) -> Response {
    let params = match query.to_params(&state.config) {
        Ok(params) => params,
        Err(response) => return response,
    };
    let month = params.month;

    let events = match run_search(&state, &headers, params).await {
        Ok(events) => events,
        Err(response) => return response,
    };

    // Overlap groups ignore week start and heights
    let digest = event_set_digest(month, &events);
    tagged_response(&headers, &digest, group_overlapping(&events))
}

/// GET /api/options/business-groups
async fn get_business_groups(State(state): State<AppState>) -> Response {
    let source = Arc::clone(&state.source);
    catalog(move || source.business_groups()).await
}

/// GET /api/options/factories?business_group=
async fn get_factories(State(state): State<AppState>, Query(query): Query<FactoryQuery>) -> Response {
    let source = Arc::clone(&state.source);
    let group = query
        .business_group
        .unwrap_or_else(|| state.config.filter.business_group.clone());
    catalog(move || source.factories(&group)).await
}

/// GET /api/options/departments?business_group=&factory=
///
/// `factory=all` (or no factory) expands to every factory of the group.
async fn get_departments(State(state): State<AppState>, Query(query): Query<DepartmentQuery>) -> Response {
    let source = Arc::clone(&state.source);
    let group = query
        .business_group
        .unwrap_or_else(|| state.config.filter.business_group.clone());
    let selection = query.factory.as_deref().map(Selection::from_param).unwrap_or_default();

    catalog(move || {
        let factories = source.factories(&group)?;
        let ids = resolve_factory_ids(&selection, &factories);
        source.departments(&ids)
    })
    .await
}

// ============================================================================
// Main Server
// ============================================================================

fn app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/grid", get(get_grid))
        .route("/layout", post(post_layout))
        .route("/calendar", get(get_calendar))
        .route("/ranges", get(get_ranges))
        .route("/options/business-groups", get(get_business_groups))
        .route("/options/factories", get(get_factories))
        .route("/options/departments", get(get_departments))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("🌐 Leave Calendar - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = Config::load()?;

    // The blocking HTTP client must be built off the async runtime
    let source_config = config.source.clone();
    let source: Arc<dyn LeaveSource> = tokio::task::spawn_blocking(move || open_source(&source_config))
        .await
        .context("Source setup task failed")??
        .into();
    println!("✓ Source: {}", source.describe());

    let addr = config.server.addr.clone();
    let state = AppState::new(source, config);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(%addr, "listening");
    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/calendar?month=YYYY-MM", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app(state))
        .await
        .context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use leave_calendar::CatalogOption;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    struct FixedSource(Vec<LeaveEvent>);

    impl LeaveSource for FixedSource {
        fn fetch_events(&self, params: &SearchParams) -> anyhow::Result<Vec<LeaveEvent>> {
            Ok(self.0.iter().filter(|e| params.matches(e)).cloned().collect())
        }

        fn factories(&self, _business_group: &str) -> anyhow::Result<Vec<CatalogOption>> {
            Ok(vec![CatalogOption::new("Plant A", "F1"), CatalogOption::new("Plant B", "F2")])
        }

        fn departments(&self, factory_ids: &[String]) -> anyhow::Result<Vec<CatalogOption>> {
            Ok(factory_ids
                .iter()
                .map(|id| CatalogOption::new(format!("Dept of {}", id), format!("D-{}", id)))
                .collect())
        }
    }

    struct FailingSource;

    impl LeaveSource for FailingSource {
        fn fetch_events(&self, _params: &SearchParams) -> anyhow::Result<Vec<LeaveEvent>> {
            anyhow::bail!("connection refused")
        }
    }

    /// One event titled after the business group; "slow" takes 300ms
    struct SlowSource;

    impl LeaveSource for SlowSource {
        fn fetch_events(&self, params: &SearchParams) -> anyhow::Result<Vec<LeaveEvent>> {
            if params.business_group == "slow" {
                std::thread::sleep(Duration::from_millis(300));
            }
            Ok(vec![LeaveEvent::new(
                "A",
                params.business_group.as_str(),
                "2025-03-10",
                "2025-03-10",
            )])
        }
    }

    fn state_with(source: impl LeaveSource + 'static) -> AppState {
        AppState::new(Arc::new(source), Config::default())
    }

    fn sample() -> AppState {
        state_with(FixedSource(vec![
            LeaveEvent::new("A", "Alice", "2025-03-10", "2025-03-12"),
            LeaveEvent::new("B", "Bob", "2025-03-11", "2025-03-13"),
        ]))
    }

    async fn send(state: AppState, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = app(state).oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, body)
    }

    fn fetch(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn calendar_for(group: &str, client: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(format!("/api/calendar?month=2025-03&business_group={}", group));
        if let Some(client) = client {
            builder = builder.header(CLIENT_ID_HEADER, client);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn layout_request(body: Value, etag: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/layout")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(etag) = etag {
            builder = builder.header(header::IF_NONE_MATCH, etag);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    /// Slow search from the first client, fast one from the second 50ms later
    async fn race(state: &AppState, first: Option<&str>, second: Option<&str>) -> ((StatusCode, Value), (StatusCode, Value)) {
        let slow = async {
            let (status, _, body) = send(state.clone(), calendar_for("slow", first)).await;
            (status, body)
        };
        let fast = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let (status, _, body) = send(state.clone(), calendar_for("fast", second)).await;
            (status, body)
        };
        tokio::join!(slow, fast)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, _, body) = send(sample(), fetch("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");
    }

    #[tokio::test]
    async fn test_grid() {
        let (status, _, body) = send(sample(), fetch("/api/grid?month=2025-03&week_start=sunday")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["weekStart"], "sunday");
        assert_eq!(body["data"]["weeks"][0]["days"][0], "2025-02-23");
    }

    #[tokio::test]
    async fn test_grid_rejects_bad_month() {
        let (status, _, body) = send(sample(), fetch("/api/grid?month=2025-13")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_calendar_layout_and_etag() {
        let (status, headers, body) = send(sample(), fetch("/api/calendar?month=2025-03")).await;

        assert_eq!(status, StatusCode::OK);
        let bars = body["data"]["bars"].as_array().unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1]["row"], 1);
        assert_eq!(body["data"]["heights"][2], 56 + 2 * 38);
        assert_eq!(body["data"]["dropped"], 0);

        let etag = headers.get(header::ETAG).unwrap().to_str().unwrap().to_string();
        let request = Request::builder()
            .uri("/api/calendar?month=2025-03")
            .header(header::IF_NONE_MATCH, etag)
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(sample(), request).await;
        assert_eq!(status, StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_calendar_fetch_failure() {
        let (status, _, body) = send(state_with(FailingSource), fetch("/api/calendar?month=2025-03")).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Load leave history failed");
    }

    #[tokio::test]
    async fn test_post_layout() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/layout")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "month": "2025-03",
                    "events": [
                        {"id": "C", "title": "Carol", "startDate": "2025-03-10", "endDate": "2025-03-20"},
                        {"id": "X", "title": "Broken", "startDate": "nope", "endDate": "2025-03-20"}
                    ]
                })
                .to_string(),
            ))
            .unwrap();

        let (status, _, body) = send(sample(), request).await;
        assert_eq!(status, StatusCode::OK);

        let bars = body["data"]["bars"].as_array().unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0]["weekIndex"], 2);
        assert_eq!(bars[0]["span"], 7);
        assert_eq!(bars[1]["span"], 4);
        assert_eq!(body["data"]["dropped"], 1);
    }

    #[tokio::test]
    async fn test_ranges() {
        let (status, _, body) = send(sample(), fetch("/api/ranges?month=2025-03")).await;

        assert_eq!(status, StatusCode::OK);
        let ranges = body["data"].as_array().unwrap();
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0]["start"], "2025-03-10");
        assert_eq!(ranges[0]["end"], "2025-03-13");
    }

    #[tokio::test]
    async fn test_departments_expand_all_factories() {
        let (status, _, body) = send(sample(), fetch("/api/options/departments?factory=all")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let (_, _, body) = send(sample(), fetch("/api/options/departments?factory=F2")).await;
        assert_eq!(body["data"][0]["value"], "D-F2");
    }

    #[tokio::test]
    async fn test_business_groups_default_empty() {
        let (status, _, body) = send(sample(), fetch("/api/options/business-groups")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn test_layout_etag_changes_with_week_start() {
        let events = json!([{"id": "A", "title": "Alice", "startDate": "2025-03-10", "endDate": "2025-03-12"}]);
        let monday = json!({"month": "2025-03", "events": events, "week_start": "monday"});
        let sunday = json!({"month": "2025-03", "events": events, "week_start": "sunday"});

        let (status, headers, _) = send(sample(), layout_request(monday.clone(), None)).await;
        assert_eq!(status, StatusCode::OK);
        let monday_etag = headers.get(header::ETAG).unwrap().to_str().unwrap().to_string();

        let (status, headers, body) = send(sample(), layout_request(sunday, Some(&monday_etag))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["grid"]["weekStart"], "sunday");
        assert_ne!(headers.get(header::ETAG).unwrap().to_str().unwrap(), monday_etag);

        let (status, _, _) = send(sample(), layout_request(monday, Some(&monday_etag))).await;
        assert_eq!(status, StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_layout_etag_changes_with_heights() {
        let events = json!([{"id": "A", "title": "Alice", "startDate": "2025-03-10", "endDate": "2025-03-12"}]);
        let plain = json!({"month": "2025-03", "events": events});
        let tall = json!({"month": "2025-03", "events": events, "heights": {"base": 80, "per_row": 38}});

        let (_, headers, _) = send(sample(), layout_request(plain, None)).await;
        let etag = headers.get(header::ETAG).unwrap().to_str().unwrap().to_string();

        let (status, _, body) = send(sample(), layout_request(tall, Some(&etag))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["heights"][0], 80);
    }

    #[tokio::test]
    async fn test_calendar_etag_changes_with_week_start() {
        let (_, headers, _) = send(sample(), fetch("/api/calendar?month=2025-03&week_start=monday")).await;
        let etag = headers.get(header::ETAG).unwrap().to_str().unwrap().to_string();

        let request = Request::builder()
            .uri("/api/calendar?month=2025-03&week_start=sunday")
            .header(header::IF_NONE_MATCH, etag)
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(sample(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["grid"]["weekStart"], "sunday");
    }

    #[tokio::test]
    async fn test_concurrent_clients_do_not_supersede_each_other() {
        let state = state_with(SlowSource);
        let ((slow_status, slow_body), (fast_status, fast_body)) =
            race(&state, Some("client-a"), Some("client-b")).await;

        assert_eq!(slow_status, StatusCode::OK);
        assert_eq!(slow_body["data"]["bars"][0]["event"]["title"], "slow");
        assert_eq!(fast_status, StatusCode::OK);
        assert_eq!(fast_body["data"]["bars"][0]["event"]["title"], "fast");
        assert!(state.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_requests_do_not_supersede_each_other() {
        let state = state_with(SlowSource);
        let ((slow_status, _), (fast_status, _)) = race(&state, None, None).await;

        assert_eq!(slow_status, StatusCode::OK);
        assert_eq!(fast_status, StatusCode::OK);
        assert!(state.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_same_client_newer_search_wins() {
        let state = state_with(SlowSource);
        let ((slow_status, slow_body), (fast_status, fast_body)) =
            race(&state, Some("client-a"), Some("client-a")).await;

        assert_eq!(slow_status, StatusCode::CONFLICT);
        assert_eq!(slow_body["error"], "superseded by a newer search");
        assert_eq!(fast_status, StatusCode::OK);
        assert_eq!(fast_body["data"]["bars"][0]["event"]["title"], "fast");
        assert!(state.sessions().is_empty());
    }
}
