use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    extract::{ConnectInfo, Extension},
    http::{
        header::{CONTENT_TYPE, REFERER, USER_AGENT},
        HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use trail_core::{Acknowledgement, LocationRecorder, RequestContext};

use crate::config::AppConfig;

const JSON_UTF8: &str = "application/json; charset=UTF-8";

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    recorder: Arc<LocationRecorder>,
}

impl AppState {
    pub fn new(recorder: LocationRecorder) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                recorder: Arc::new(recorder),
            }),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(LocationRecorder::new(&config.log_dir).with_notifier(config.build_notifier()))
    }

    fn recorder(&self) -> Arc<LocationRecorder> {
        Arc::clone(&self.inner.recorder)
    }
}

#[derive(Debug)]
enum ApiError {
    Internal(anyhow::Error),
}

impl ApiError {
    fn internal<E: Into<anyhow::Error>>(err: E) -> Self {
        Self::Internal(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Internal(err) => {
                tracing::error!("HTTP handler error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json_utf8(json!({ "success": false, "error": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/send_location", post(send_location))
        .route("/send_location.php", post(send_location))
        .route("/health", get(health))
        .layer(Extension(state))
        .layer(build_cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

pub async fn run_http_server(config: AppConfig) -> Result<()> {
    let state = AppState::from_config(&config);
    state.inner.recorder.ensure_log_dir().with_context(|| {
        format!(
            "Failed to create log directory {}",
            config.log_dir.display()
        )
    })?;

    let router = build_router(state, &config.server.cors_origins);
    let addr = config.bind_addr()?;

    tracing::info!(
        "geotrail listening on {addr}, writing to {}",
        config.log_dir.display()
    );

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server to {addr}"))?;

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server encountered an unrecoverable error")?;

    tracing::info!("shutdown complete");
    Ok(())
}

async fn send_location(
    Extension(state): Extension<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let context = RequestContext {
        client_addr: connect_info.map(|ConnectInfo(addr)| addr.ip()),
        user_agent: header_text(&headers, USER_AGENT),
        referer: header_text(&headers, REFERER),
    };

    let recorder = state.recorder();
    let ack = tokio::task::spawn_blocking(move || recorder.handle(&body, &context))
        .await
        .map_err(ApiError::internal)?;

    if let Acknowledgement::Rejected { error, .. } = &ack {
        tracing::info!("rejected location request: {error}");
    }

    Ok(json_utf8(ack).into_response())
}

async fn health() -> impl IntoResponse {
    json_utf8(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// JSON body with an explicit UTF-8 charset in the content type.
fn json_utf8<T: serde::Serialize>(body: T) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8))],
        Json(body),
    )
}

fn header_text(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    if !origins.is_empty() {
        return layer.allow_origin(AllowOrigin::list(origins));
    }

    layer
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C"),
        _ = terminate => tracing::info!("received terminate signal"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_text_is_lossy_for_non_utf8() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_bytes(b"agent\xff").unwrap());
        assert_eq!(
            header_text(&headers, USER_AGENT).as_deref(),
            Some("agent\u{fffd}")
        );
        assert_eq!(header_text(&headers, REFERER), None);
    }

    #[test]
    fn cors_layer_ignores_invalid_origins() {
        let _ = build_cors_layer(&["https://ok.example".to_string(), "bad\norigin".to_string()]);
        let _ = build_cors_layer(&[]);
    }
}
