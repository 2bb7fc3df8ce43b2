use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

use crate::{
    ports,
    scanner::{self, ScanTarget},
    types::ScanResult,
};

/// Settings for the embedded HTTP front end.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// Directory served at `/`.
    pub static_dir: PathBuf,
    /// Concurrency applied to every scan started through the API.
    pub concurrency: usize,
    /// Connect timeout applied to every scan started through the API.
    pub timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".into(),
            static_dir: PathBuf::from("web/static"),
            concurrency: scanner::DEFAULT_CONCURRENCY,
            timeout: scanner::DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Clone)]
struct AppState {
    config: Arc<ServerConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub target: String,
    pub ports: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub target: String,
    pub results: Vec<ScanResult>,
    pub scan_time: String,
    pub total_ports: usize,
}

/// Build the application router: `/api/scan` plus static files as fallback.
pub fn router(config: ServerConfig) -> Router {
    let static_svc = ServeDir::new(&config.static_dir).append_index_html_on_directories(true);
    let state = AppState {
        config: Arc::new(config),
    };

    let api = Router::new()
        .route(
            "/scan",
            post(post_scan)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, GET, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .fallback_service(static_svc)
        .layer(TraceLayer::new_for_http())
}

pub async fn spawn_server(config: ServerConfig) -> Result<()> {
    let bind = config.bind.clone();
    let app = router(config);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind HTTP server to {bind}"))?;
    info!(%bind, "HTTP server listening");
    println!("Serving UI on http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("HTTP server failed")?;
    Ok(())
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

async fn post_scan(State(app): State<AppState>, body: Bytes) -> Response {
    // Decoded by hand so every malformed body maps to 400.
    let req: ScanRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            debug!(error = %e, "rejecting scan request");
            return (StatusCode::BAD_REQUEST, "Invalid request format").into_response();
        }
    };

    let ports = match ports::resolve(&req.ports) {
        Ok(p) => p,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                format!("Invalid port specification: {e}"),
            )
                .into_response()
        }
    };

    let target = ScanTarget::new(req.target.clone())
        .with_timeout(app.config.timeout)
        .with_concurrency(app.config.concurrency);

    let start = Instant::now();
    let results = scanner::scan(&target, &ports).await;
    let elapsed = start.elapsed();

    let resp = ScanResponse {
        target: req.target,
        results,
        scan_time: format!("{elapsed:?}"),
        total_ports: ports.len(),
    };
    encode_json(&resp)
}

fn encode_json<T: Serialize>(value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            warn!(error = %e, "failed to encode response");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn response_uses_camel_case_keys() {
        let resp = ScanResponse {
            target: "127.0.0.1".into(),
            results: vec![ScanResult::closed(1)],
            scan_time: "1ms".into(),
            total_ports: 1,
        };
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["scanTime"], "1ms");
        assert_eq!(v["totalPorts"], 1);
        assert_eq!(v["results"][0]["state"], "closed");
    }

    #[test]
    fn encode_failure_is_internal_error() {
        // Non-string map keys cannot be encoded as JSON.
        let mut bad: BTreeMap<Vec<u8>, u8> = BTreeMap::new();
        bad.insert(vec![1], 1);
        let resp = encode_json(&bad);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
