use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::maghrib::{
    cache::MaghribCache,
    types::{Maghrib, Source},
};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<MaghribCache>,
}

#[derive(Debug, Serialize)]
pub struct MaghribResponse {
    pub ok: bool,
    pub h: u8,
    pub m: u8,
    pub source: Source,
}

impl From<Maghrib> for MaghribResponse {
    fn from(maghrib: Maghrib) -> Self {
        Self {
            ok: true,
            h: maghrib.value.hour,
            m: maghrib.value.minute,
            source: maghrib.source,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: error.into(),
        }
    }
}

/// JSON body with an explicit utf-8 charset, which `axum::Json` leaves out.
pub struct JsonUtf8<T>(pub StatusCode, pub T);

impl<T: Serialize> IntoResponse for JsonUtf8<T> {
    fn into_response(self) -> Response {
        match serde_json::to_string(&self.1) {
            Ok(body) => (
                self.0,
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json; charset=utf-8"),
                )],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Failed to serialize response: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

// Route handlers
pub async fn get_maghrib(State(state): State<AppState>) -> Response {
    match state.cache.get_maghrib().await {
        Ok(maghrib) => JsonUtf8(StatusCode::OK, MaghribResponse::from(maghrib)).into_response(),
        Err(e) => {
            tracing::error!("No maghrib time available: {}", e);
            JsonUtf8(StatusCode::BAD_GATEWAY, ErrorResponse::new(e.to_string())).into_response()
        }
    }
}

pub async fn not_found() -> JsonUtf8<ErrorResponse> {
    JsonUtf8(StatusCode::NOT_FOUND, ErrorResponse::new("not found"))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/maghrib", get(get_maghrib).fallback(not_found))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maghrib::cache::tests::{ManualClock, ScriptedFetcher};
    use crate::maghrib::manar::FetchError;
    use crate::maghrib::types::TimeValue;
    use serde_json::{json, Value};
    use std::time::Duration;

    const TTL: Duration = Duration::from_secs(30 * 60);

    struct TestApp {
        base_url: String,
        fetcher: Arc<ScriptedFetcher>,
        clock: Arc<ManualClock>,
        client: reqwest::Client,
    }

    impl TestApp {
        async fn spawn(script: Vec<Result<TimeValue, FetchError>>) -> Self {
            let fetcher = Arc::new(ScriptedFetcher::new(script));
            let clock = Arc::new(ManualClock::new());
            let cache = Arc::new(MaghribCache::new(fetcher.clone(), clock.clone(), TTL));

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let app = create_router(AppState { cache });
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            Self {
                base_url: format!("http://{}", addr),
                fetcher,
                clock,
                client: reqwest::Client::new(),
            }
        }

        async fn get(&self, path: &str) -> (StatusCode, reqwest::header::HeaderMap, Value) {
            let response = self
                .client
                .get(format!("{}{}", self.base_url, path))
                .send()
                .await
                .unwrap();
            let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
            let headers = response.headers().clone();
            let body = response.json().await.unwrap();
            (status, headers, body)
        }
    }

    fn t(hour: u8, minute: u8) -> TimeValue {
        TimeValue { hour, minute }
    }

    #[tokio::test]
    async fn test_fresh_then_cached() {
        let app = TestApp::spawn(vec![Ok(t(17, 42))]).await;

        let (status, headers, body) = app.get("/maghrib").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true, "h": 17, "m": 42, "source": "manar" }));
        assert_eq!(
            headers.get("content-type").unwrap(),
            "application/json; charset=utf-8"
        );
        assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");

        let (status, _, body) = app.get("/maghrib").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true, "h": 17, "m": 42, "source": "cache" }));
        assert_eq!(app.fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_stale_fallback() {
        let app = TestApp::spawn(vec![Ok(t(18, 5)), Err(FetchError::Timeout)]).await;

        app.get("/maghrib").await;
        app.clock.advance(TTL + Duration::from_secs(60));

        let (status, _, body) = app.get("/maghrib").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "ok": true, "h": 18, "m": 5, "source": "cache_fallback" })
        );
        assert_eq!(app.fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_cold_start_failure_is_bad_gateway() {
        let app = TestApp::spawn(vec![Err(FetchError::Parse)]).await;

        let (status, headers, body) = app.get("/maghrib").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body, json!({ "ok": false, "error": "parse_failed" }));
        assert_eq!(
            headers.get("content-type").unwrap(),
            "application/json; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let app = TestApp::spawn(vec![Ok(t(17, 42))]).await;

        let (status, headers, body) = app.get("/other").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "ok": false, "error": "not found" }));
        assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");

        // Same answer once the cache holds a value.
        app.get("/maghrib").await;
        let (status, _, body) = app.get("/other").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "ok": false, "error": "not found" }));
        assert_eq!(app.fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_non_get_is_not_found() {
        let app = TestApp::spawn(vec![Ok(t(17, 42))]).await;

        let response = app
            .client
            .post(format!("{}/maghrib", app.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 404);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "ok": false, "error": "not found" }));
        assert_eq!(app.fetcher.calls(), 0);
    }
}
