//! `/api/events/*` handlers.
//!
//! Every route answers `200`. An unreachable or unreadable upstream yields
//! `[]` (the conflict route falls back to the bundled sample); the failure is
//! only logged.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{NaiveDate, Utc};
use formats::{adapter, ingest, ConflictAdapter, GeoEvent, IngestContext, NewsTimespan, SourceKind};
use http::header::CONTENT_TYPE;
use http::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::cache::Served;
use crate::upstream::{fetch_text, UpstreamError};
use crate::AppState;

const CONFLICT_SAMPLE: &str = include_str!("../data/conflict-sample.json");
const CONFLICT_LOOKBACK_DAYS: i64 = 30;
const CONFLICT_LIMIT: &str = "500";
const NEWS_MAX_ROWS: &str = "500";

fn json_body(body: &str) -> Response {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}

fn empty_array() -> Response {
    (StatusCode::OK, Json(json!([]))).into_response()
}

/// Run `kind`'s adapter over an upstream payload. A payload that cannot be
/// read at all is an error; dropped records are not.
fn normalize(kind: SourceKind, raw: &str) -> Result<Vec<GeoEvent>, UpstreamError> {
    ingest(adapter(kind), raw, &IngestContext::now())
        .into_result()
        .map_err(|e| UpstreamError::Body(e.to_string()))
}

fn to_body(events: &[GeoEvent]) -> Result<Arc<str>, UpstreamError> {
    serde_json::to_string(events)
        .map(Arc::from)
        .map_err(|e| UpstreamError::Body(e.to_string()))
}

/// The bundled conflict records, normalized once at startup.
pub fn bundled_conflict_sample() -> Arc<str> {
    let events = ingest(&ConflictAdapter, CONFLICT_SAMPLE, &IngestContext::now()).into_result();
    match events.map_err(|e| UpstreamError::Body(e.to_string())).and_then(|e| to_body(&e)) {
        Ok(body) => body,
        Err(err) => {
            warn!("bundled conflict sample unreadable: {err}");
            Arc::from("[]")
        }
    }
}

/// Serve `key` from the cache, refreshing through `refresh` when stale.
async fn serve_cached<F, Fut>(
    state: &AppState,
    kind: SourceKind,
    key: &str,
    refresh: F,
) -> Option<Response>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Arc<str>, UpstreamError>>,
{
    match state
        .cache
        .get_or_refresh(key, kind.freshness_window(), refresh)
        .await
    {
        Ok((body, served)) => {
            if served == Served::Refreshed {
                info!(source = %kind, key, bytes = body.len(), "upstream refreshed");
            }
            Some(json_body(&body))
        }
        Err(err) => {
            warn!(source = %kind, key, "upstream unavailable: {err}");
            None
        }
    }
}

async fn serve_normalized(
    state: &AppState,
    kind: SourceKind,
    key: &str,
    url: String,
    timeout: Option<Duration>,
) -> Response {
    let refresh = || async {
        let raw = fetch_text(state.upstream.as_ref(), &url, timeout).await?;
        let events = normalize(kind, &raw)?;
        debug!(source = %kind, events = events.len(), "normalized upstream payload");
        to_body(&events)
    };
    serve_cached(state, kind, key, refresh)
        .await
        .unwrap_or_else(empty_array)
}

pub async fn healthz() -> Response {
    (StatusCode::OK, "ok").into_response()
}

/// Upstream GeoJSON passed through as-is once it parses as JSON.
pub async fn earthquakes(State(state): State<AppState>) -> Response {
    let url = state.config.seismic_url.clone();
    let refresh = || async {
        let raw = fetch_text(state.upstream.as_ref(), &url, None).await?;
        serde_json::from_str::<Value>(&raw).map_err(|e| UpstreamError::Body(e.to_string()))?;
        let body: Arc<str> = Arc::from(raw);
        Ok::<_, UpstreamError>(body)
    };
    serve_cached(&state, SourceKind::Seismic, "seismic", refresh)
        .await
        .unwrap_or_else(empty_array)
}

pub async fn disasters(State(state): State<AppState>) -> Response {
    let url = state.config.hazard_url.clone();
    serve_normalized(&state, SourceKind::Hazard, "hazard", url, None).await
}

pub async fn fires(State(state): State<AppState>) -> Response {
    let url = state.config.thermal_url.clone();
    serve_normalized(&state, SourceKind::Thermal, "thermal", url, None).await
}

fn conflict_request_url(
    base: &str,
    key: &str,
    email: &str,
    today: NaiveDate,
) -> Result<String, UpstreamError> {
    let from = today - chrono::Duration::days(CONFLICT_LOOKBACK_DAYS);
    let window = format!("{}|{}", from.format("%Y-%m-%d"), today.format("%Y-%m-%d"));
    reqwest::Url::parse_with_params(
        base,
        &[
            ("key", key),
            ("email", email),
            ("limit", CONFLICT_LIMIT),
            ("event_date", window.as_str()),
            ("event_date_where", "BETWEEN"),
            ("terms", "accept"),
        ],
    )
    .map(String::from)
    .map_err(|e| UpstreamError::Request(e.to_string()))
}

pub async fn conflicts(State(state): State<AppState>) -> Response {
    if let Some((key, email)) = state.config.acled_credentials() {
        let refresh = || async {
            let url = conflict_request_url(
                &state.config.conflict_url,
                key,
                email,
                Utc::now().date_naive(),
            )?;
            let raw = fetch_text(state.upstream.as_ref(), &url, None).await?;
            let events = normalize(SourceKind::Conflict, &raw)?;
            if events.is_empty() {
                return Err(UpstreamError::Body("no records returned".to_string()));
            }
            to_body(&events)
        };
        if let Some(resp) = serve_cached(&state, SourceKind::Conflict, "conflict", refresh).await {
            return resp;
        }
        info!("serving bundled conflict sample");
    } else {
        debug!("no conflict credentials configured, serving bundled sample");
    }
    json_body(&state.conflict_sample)
}

#[derive(Debug, Default, Deserialize)]
pub struct NewsQuery {
    pub timespan: Option<String>,
}

/// An unreadable query string falls back to the default timespan.
pub async fn news(
    State(state): State<AppState>,
    query: Result<Query<NewsQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            debug!(source = "news", "ignoring query string: {rejection}");
            NewsQuery::default()
        }
    };
    let timespan = query
        .timespan
        .as_deref()
        .map(NewsTimespan::parse)
        .unwrap_or_default();

    let url = match reqwest::Url::parse_with_params(
        &state.config.news_url,
        &[
            ("query", "world"),
            ("mode", "PointData"),
            ("format", "GeoJSON"),
            ("timespan", timespan.upstream_token()),
            ("maxrows", NEWS_MAX_ROWS),
        ],
    ) {
        Ok(url) => url.to_string(),
        Err(err) => {
            warn!(source = "news", "bad upstream url: {err}");
            return empty_array();
        }
    };

    let key = format!("news:{}", timespan.as_query());
    let timeout = state.config.news_timeout();
    serve_normalized(&state, SourceKind::News, &key, url, Some(timeout)).await
}

#[cfg(test)]
mod tests {
    use super::{bundled_conflict_sample, conflict_request_url};
    use crate::config::ServerConfig;
    use crate::upstream::{BoxFuture, Upstream, UpstreamError};
    use crate::{build_router, AppState};
    use axum::body::{to_bytes, Body};
    use axum::Router;
    use chrono::NaiveDate;
    use clap::Parser;
    use http::{Request, StatusCode};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Canned upstream: the first prefix matching a requested URL answers it.
    #[derive(Default)]
    struct FakeUpstream {
        routes: Vec<(&'static str, Result<String, u16>)>,
        delay: Option<Duration>,
        requested: Mutex<Vec<String>>,
    }

    impl FakeUpstream {
        fn with(mut self, prefix: &'static str, body: Result<&str, u16>) -> Self {
            self.routes.push((prefix, body.map(str::to_string)));
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().clone()
        }
    }

    impl Upstream for FakeUpstream {
        fn get_text<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, UpstreamError>> {
            Box::pin(async move {
                self.requested.lock().push(url.to_string());
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                match self.routes.iter().find(|(p, _)| url.starts_with(p)) {
                    Some((_, Ok(body))) => Ok(body.clone()),
                    Some((_, Err(status))) => Err(UpstreamError::Status(*status)),
                    None => Err(UpstreamError::Request(format!("no route for {url}"))),
                }
            })
        }
    }

    fn config(extra: &[&str]) -> ServerConfig {
        let mut args = vec![
            "server",
            "--seismic-url",
            "http://quakes.test/feed.geojson",
            "--hazard-url",
            "http://hazards.test/rss.xml",
            "--thermal-url",
            "http://fires.test/24h.csv",
            "--conflict-url",
            "http://conflict.test/read",
            "--news-url",
            "http://news.test/geo",
        ];
        args.extend_from_slice(extra);
        ServerConfig::try_parse_from(args).unwrap()
    }

    fn router(cfg: ServerConfig, upstream: Arc<FakeUpstream>) -> Router {
        build_router(AppState::new(cfg, upstream))
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
        let resp = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn array(body: &str) -> Vec<Value> {
        serde_json::from_str::<Vec<Value>>(body).unwrap()
    }

    const NEWS_BODY: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"name": "Nowhere"},
         "geometry": {"type": "Point", "coordinates": [0, 0]}},
        {"type": "Feature",
         "properties": {"name": "Nairobi, Kenya", "url": "https://news.example/k",
                        "title": "Rail link opens", "domain": "news.example", "tone": 1.5},
         "geometry": {"type": "Point", "coordinates": [36.82, -1.29]}}
    ]}"#;

    #[tokio::test]
    async fn healthz_answers_ok() {
        let app = router(config(&[]), Arc::new(FakeUpstream::default()));
        assert_eq!(get(&app, "/healthz").await, (StatusCode::OK, "ok".to_string()));
    }

    #[tokio::test]
    async fn conflict_upstream_failure_serves_sample() {
        let upstream = Arc::new(FakeUpstream::default().with("http://conflict.test", Err(502)));
        let app = router(
            config(&["--acled-key", "k", "--acled-email", "ops@example.org"]),
            Arc::clone(&upstream),
        );

        let (status, body) = get(&app, "/api/events/conflicts").await;
        assert_eq!(status, StatusCode::OK);
        let events = array(&body);
        assert_eq!(events.len(), 12);
        assert_eq!(events[0]["id"], "900001");
        assert_eq!(events[0]["kind"], "conflict");

        let requested = upstream.requested();
        assert_eq!(requested.len(), 1);
        assert!(requested[0].contains("terms=accept"));
        assert!(requested[0].contains("limit=500"));
    }

    #[tokio::test]
    async fn conflict_without_credentials_never_calls_upstream() {
        let upstream = Arc::new(FakeUpstream::default());
        let app = router(config(&[]), Arc::clone(&upstream));
        let (status, body) = get(&app, "/api/events/conflicts").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(array(&body).len(), 12);
        assert!(upstream.requested().is_empty());
    }

    #[tokio::test]
    async fn conflict_empty_upstream_falls_back_to_sample() {
        let empty = r#"{"status": 200, "data": []}"#;
        let upstream = Arc::new(FakeUpstream::default().with("http://conflict.test", Ok(empty)));
        let app = router(
            config(&["--acled-key", "k", "--acled-email", "e"]),
            upstream,
        );
        assert_eq!(array(&get(&app, "/api/events/conflicts").await.1).len(), 12);
    }

    #[tokio::test]
    async fn conflict_upstream_records_are_normalized() {
        let upstream = Arc::new(FakeUpstream::default().with(
            "http://conflict.test",
            Ok(r#"{"data": [{"data_id": 77, "event_type": "Riots", "sub_event_type": "Mob violence",
                             "country": "Chad", "latitude": "12.1", "longitude": "15.0",
                             "event_date": "2024-06-01", "fatalities": "2", "notes": ""}]}"#),
        ));
        let app = router(
            config(&["--acled-key", "k", "--acled-email", "e"]),
            upstream,
        );
        let events = array(&get(&app, "/api/events/conflicts").await.1);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["id"], "77");
        assert_eq!(events[0]["category"], "Riots");
        assert_eq!(events[0]["fatalities"], 2);
    }

    #[tokio::test]
    async fn news_maps_timespan_and_drops_null_island() {
        let upstream = Arc::new(FakeUpstream::default().with("http://news.test", Ok(NEWS_BODY)));
        let app = router(config(&[]), Arc::clone(&upstream));

        let (status, body) = get(&app, "/api/events/news?timespan=6h").await;
        assert_eq!(status, StatusCode::OK);
        let events = array(&body);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["title"], "Rail link opens");

        let requested = upstream.requested();
        assert!(requested[0].contains("timespan=360min"), "{requested:?}");
        assert!(requested[0].contains("mode=PointData"));
        assert!(requested[0].contains("maxrows=500"));
    }

    #[tokio::test]
    async fn unreadable_news_query_uses_the_default_timespan() {
        let upstream = Arc::new(FakeUpstream::default().with("http://news.test", Ok(NEWS_BODY)));
        let app = router(config(&[]), Arc::clone(&upstream));

        let (status, body) = get(&app, "/api/events/news?timespan=1h&timespan=6h").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(array(&body).len(), 1);

        let (status, _) = get(&app, "/api/events/news?timespan=weekly").await;
        assert_eq!(status, StatusCode::OK);

        // Both fell back to 24h and share one cache entry.
        let requested = upstream.requested();
        assert_eq!(requested.len(), 1);
        assert!(requested[0].contains("timespan=1440min"), "{requested:?}");
    }

    #[tokio::test]
    async fn news_timespans_are_cached_separately() {
        let upstream = Arc::new(FakeUpstream::default().with("http://news.test", Ok(NEWS_BODY)));
        let app = router(config(&[]), Arc::clone(&upstream));

        get(&app, "/api/events/news?timespan=6h").await;
        get(&app, "/api/events/news?timespan=6h").await;
        get(&app, "/api/events/news").await;

        let requested = upstream.requested();
        assert_eq!(requested.len(), 2);
        assert!(requested[1].contains("timespan=1440min"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_news_upstream_times_out_to_empty() {
        let upstream = Arc::new(FakeUpstream {
            delay: Some(Duration::from_secs(60)),
            ..FakeUpstream::default().with("http://news.test", Ok(NEWS_BODY))
        });
        let app = router(config(&["--news-timeout-secs", "15"]), upstream);
        assert_eq!(
            get(&app, "/api/events/news?timespan=1h").await,
            (StatusCode::OK, "[]".to_string())
        );
    }

    #[tokio::test]
    async fn earthquakes_pass_through_and_degrade_to_empty() {
        let feed = r#"{"type":"FeatureCollection","features":[]}"#;
        let upstream = Arc::new(FakeUpstream::default().with("http://quakes.test", Ok(feed)));
        let app = router(config(&[]), upstream);
        assert_eq!(get(&app, "/api/events/earthquakes").await.1, feed);

        let broken = Arc::new(FakeUpstream::default().with("http://quakes.test", Ok("<html>")));
        let app = router(config(&[]), broken);
        assert_eq!(get(&app, "/api/events/earthquakes").await.1, "[]");
    }

    #[tokio::test]
    async fn disasters_are_normalized_and_cached() {
        let rss = r#"<?xml version="1.0"?>
            <rss version="2.0"><channel>
              <item><title>Flood in Kivu</title><guid>FL1</guid>
                <gdacs:eventtype>FL</gdacs:eventtype><gdacs:alertlevel>Orange</gdacs:alertlevel>
                <geo:Point><geo:lat>-2.5</geo:lat><geo:long>28.9</geo:long></geo:Point></item>
            </channel></rss>"#;
        let upstream = Arc::new(FakeUpstream::default().with("http://hazards.test", Ok(rss)));
        let app = router(config(&[]), Arc::clone(&upstream));

        let events = array(&get(&app, "/api/events/disasters").await.1);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["alertLevel"], "Orange");
        assert_eq!(events[0]["hazardType"], "flood");

        get(&app, "/api/events/disasters").await;
        assert_eq!(upstream.requested().len(), 1);
    }

    #[tokio::test]
    async fn fires_failure_is_an_empty_array() {
        let upstream = Arc::new(FakeUpstream::default().with("http://fires.test", Err(503)));
        let app = router(config(&[]), upstream);
        assert_eq!(
            get(&app, "/api/events/fires").await,
            (StatusCode::OK, "[]".to_string())
        );
    }

    #[test]
    fn conflict_url_covers_thirty_days() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let url = conflict_request_url("https://acled.test/read", "k", "a@b.c", today).unwrap();
        assert!(url.contains("event_date=2024-05-16%7C2024-06-15"), "{url}");
        assert!(url.contains("event_date_where=BETWEEN"));
        assert!(url.contains("email=a%40b.c"));
    }

    #[test]
    fn bundled_sample_normalizes_every_record() {
        let sample = bundled_conflict_sample();
        assert_eq!(array(&sample).len(), 12);
    }
}
