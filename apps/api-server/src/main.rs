//! api-server — HTTP front for the work-record ledger.
//!
//! Exposes the two ledger entry points:
//! - `POST /invoke` for state-changing functions (init, write, addRecord, updateComment)
//! - `POST /query` for read-only functions (read, search)
//!
//! Both take `{"function": "<name>", "args": ["..."]}` and answer with the
//! operation payload, or 204 when the operation yields none.
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! cargo run -p api-server
//!
//! # throwaway in-memory ledger with exact id matching
//! STORAGE_PROVIDER=memory MATCH_MODE=exact cargo run -p api-server
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use domain::adapters::memory_ledger::InMemoryLedger;
use domain::matching::MatchMode;
use domain::operation::{EntryPoint, Operation};
use domain::service::RepositoryService;
use domain::{CoreError, LedgerStore, StoreError};
use serde::Deserialize;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Ledger backend selected at startup (sqlite is feature-gated).
enum AnyLedger {
    Memory(InMemoryLedger),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite_adapter::SqliteLedger),
}

impl LedgerStore for AnyLedger {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match self {
            AnyLedger::Memory(l) => l.get(key),
            #[cfg(feature = "sqlite")]
            AnyLedger::Sqlite(l) => l.get(key),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        match self {
            AnyLedger::Memory(l) => l.put(key, value),
            #[cfg(feature = "sqlite")]
            AnyLedger::Sqlite(l) => l.put(key, value),
        }
    }
}

#[derive(Clone)]
struct AppState {
    service: Arc<RepositoryService<AnyLedger, MatchMode>>,
}

impl AppState {
    fn new(ledger: AnyLedger, match_mode: MatchMode) -> Self {
        Self {
            service: Arc::new(RepositoryService::with_matcher(ledger, match_mode)),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.warn_if_unusual();

    let ledger = match build_ledger(&cfg) {
        Ok(l) => l,
        Err(e) => {
            error!(err = %e, "failed to open ledger");
            std::process::exit(1);
        }
    };
    let state = AppState::new(ledger, cfg.match_mode);

    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    let mut app = router(state)
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));

    // CORS - already validated in Config::from_env()
    let cors = if cfg.cors_allow_origin == HeaderValue::from_static("*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([cfg.cors_allow_origin.clone()]))
            .allow_methods([axum::http::Method::POST, axum::http::Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };
    app = app.layer(cors);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, err = %e, "bind failed");
            std::process::exit(1);
        }
    };
    info!(%addr, match_mode = cfg.match_mode.as_str(), "api-server listening");
    if let Err(e) = axum::serve(listener, app).await {
        error!(err = %e, "server error");
        std::process::exit(1);
    }
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

// Construct the ledger based on config and feature flags.
fn build_ledger(cfg: &config::Config) -> Result<AnyLedger, StoreError> {
    match cfg.storage_provider {
        #[cfg(feature = "sqlite")]
        config::StorageProvider::Sqlite => {
            let ledger = match &cfg.db_path {
                Some(path) => sqlite_adapter::SqliteLedger::open_creating_dirs(path)?,
                None => sqlite_adapter::SqliteLedger::from_env()?,
            };
            Ok(AnyLedger::Sqlite(ledger))
        }
        #[cfg(not(feature = "sqlite"))]
        config::StorageProvider::Sqlite => {
            warn!("built without the sqlite feature; using the in-memory ledger");
            Ok(AnyLedger::Memory(InMemoryLedger::new()))
        }
        config::StorageProvider::Memory => Ok(AnyLedger::Memory(InMemoryLedger::new())),
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/invoke", post(invoke))
        .route("/query", post(query))
        .with_state(state)
}

#[derive(Deserialize)]
struct CallReq {
    function: String,
    #[serde(default)]
    args: Vec<String>,
}

async fn invoke(State(state): State<AppState>, Json(body): Json<CallReq>) -> Response {
    call(&state, EntryPoint::Invoke, body)
}

async fn query(State(state): State<AppState>, Json(body): Json<CallReq>) -> Response {
    call(&state, EntryPoint::Query, body)
}

fn call(state: &AppState, entry: EntryPoint, body: CallReq) -> Response {
    let op = match Operation::parse_for(entry, &body.function, &body.args) {
        Ok(op) => op,
        Err(e) => return error_response(&body.function, e),
    };
    let raw_read = matches!(op, Operation::Read { .. });

    match state.service.execute(op) {
        Ok(Some(payload)) => {
            info!(function = %body.function, bytes = payload.len(), "call ok");
            let content_type = if raw_read && !http_common::is_json(&payload) {
                "application/octet-stream"
            } else {
                "application/json"
            };
            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], payload).into_response()
        }
        Ok(None) => {
            info!(function = %body.function, "call ok");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(&body.function, e),
    }
}

fn error_response(function: &str, err: CoreError) -> Response {
    let (status, code) = match &err {
        CoreError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "invalid_argument"),
        CoreError::UnknownFunction { .. } => (StatusCode::BAD_REQUEST, "unknown_function"),
        CoreError::RecordNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        CoreError::StoreRead { .. } | CoreError::StoreWrite { .. } | CoreError::Codec { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "internal")
        }
    };
    if status.is_server_error() {
        error!(%function, err = %err, "call failed");
    } else {
        warn!(%function, err = %err, "call rejected");
    }
    (
        status,
        Json(http_common::json_error_with_message(code, &err.to_string())),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    fn app() -> Router {
        router(AppState::new(
            AnyLedger::Memory(InMemoryLedger::new()),
            MatchMode::Substring,
        ))
    }

    async fn post_call(
        router: &Router,
        path: &str,
        function: &str,
        args: &[&str],
    ) -> (StatusCode, Vec<u8>) {
        let body = serde_json::json!({"function": function, "args": args});
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn add_search_update_flow() {
        let router = app();

        let (status, body) = post_call(
            &router,
            "/invoke",
            "addRecord",
            &["12345", "999", "Jane Doe", "2024-01-15", "8"],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let added: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(added["name"], "jane doe");

        let (status, _) =
            post_call(&router, "/invoke", "addRecord", &["555", "777", "John Roe", "2024-02-01", "4"])
                .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = post_call(&router, "/query", "read", &["12345_999_2024-01-15"]).await;
        assert_eq!(status, StatusCode::OK);
        let read: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(read, added);

        let (status, body) = post_call(&router, "/query", "search", &["234", "9"]).await;
        assert_eq!(status, StatusCode::OK);
        let found: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["personalId"], 12345);

        // Every id contains the empty string.
        let (_, body) = post_call(&router, "/query", "search", &["234", ""]).await;
        let found: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[1]["personalId"], 555);

        let (status, body) =
            post_call(&router, "/invoke", "updateComment", &["12345", "late arrival"]).await;
        assert_eq!(status, StatusCode::OK);
        let updated: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(updated["comment"], "late arrival");

        let (_, body) = post_call(&router, "/query", "search", &["12345", "9"]).await;
        let found: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().any(|r| r["comment"] == "late arrival"));

        let (_, body) = post_call(&router, "/query", "search", &["", ""]).await;
        let found: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(found.len(), 3);
    }

    #[tokio::test]
    async fn search_without_matches_returns_empty_array() {
        let (status, body) = post_call(&app(), "/query", "search", &["1", "2"]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"[]");
    }

    #[tokio::test]
    async fn write_then_read_raw_value() {
        let router = app();
        let (status, _) = post_call(&router, "/invoke", "write", &["greeting", "hi"]).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = post_call(&router, "/query", "read", &["greeting"]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"hi");
    }

    #[tokio::test]
    async fn init_seeds_sentinel() {
        let router = app();
        let (status, _) = post_call(&router, "/invoke", "init", &["42"]).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, body) = post_call(&router, "/query", "read", &[domain::SENTINEL_KEY]).await;
        assert_eq!(body, b"42");
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_404() {
        let (status, body) =
            post_call(&app(), "/invoke", "updateComment", &["777", "x"]).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let err: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(err["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn bad_arity_is_400() {
        let (status, body) =
            post_call(&app(), "/invoke", "addRecord", &["1", "2", "n", "d"]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(err["error"]["code"], "invalid_argument");
    }

    #[tokio::test]
    async fn misrouted_and_unknown_functions_are_400() {
        let router = app();
        let (status, body) = post_call(&router, "/invoke", "search", &["1", "2"]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(err["error"]["code"], "unknown_function");

        let (status, _) = post_call(&router, "/query", "addRecord", &[]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_call(&router, "/query", "dropTable", &[]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
