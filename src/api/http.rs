//! HTTP API Server
//!
//! REST API for browsing object storage one page at a time.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::listing::ListingService;

/// Shared application state
pub struct AppState {
    /// Listing front-end shared by all requests
    pub service: Arc<ListingService>,
}

/// HTTP API server
pub struct HttpServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(config: ServerConfig, service: Arc<ListingService>) -> Self {
        let state = Arc::new(AppState { service });
        Self { config, state }
    }

    /// Get the state for sharing with other components
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Create the router
    pub fn router(&self) -> Router {
        Self::create_router(Arc::clone(&self.state), self.config.cors_enabled)
    }

    fn create_router(state: Arc<AppState>, cors_enabled: bool) -> Router {
        let router = Router::new()
            .route("/api/s3", get(handle_browse))
            .route("/health", get(handle_health))
            .with_state(state)
            .layer(TraceLayer::new_for_http());

        if cors_enabled {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Start the HTTP server and run until Ctrl+C
    pub async fn start(&self) -> Result<()> {
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(&self.config.bind_address).await?;
        tracing::info!("HTTP API listening on {}", self.config.bind_address);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Network(format!("HTTP server error: {}", e)))?;

        tracing::info!("HTTP API stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}

// ============ Request/Response Types ============

/// Browse query parameters
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BrowseQuery {
    pub path: Option<String>,
    pub region: Option<String>,
    pub token: Option<String>,
}

/// One page of a listing
#[derive(Debug, Serialize, Deserialize)]
pub struct BrowseResponse {
    pub path: String,
    pub region: String,
    pub directories: Vec<String>,
    pub files: Vec<String>,
    pub token: Option<String>,
}

/// Rejected request field
#[derive(Debug, Serialize, Deserialize)]
pub struct InvalidFieldResponse {
    pub field: String,
    pub invalid: bool,
    pub message: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub regions_cached: usize,
}

// ============ Handlers ============

async fn handle_browse(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<BrowseQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => {
            return error_response(&Error::InvalidParameter {
                field: "query",
                reason: rejection.body_text(),
            })
        }
    };
    let path = match required(query.path, "path") {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };
    let region = match required(query.region, "region") {
        Ok(r) => r,
        Err(e) => return error_response(&e),
    };

    match state
        .service
        .browse(&path, &region, query.token.as_deref())
        .await
    {
        Ok(page) => Json(BrowseResponse {
            path,
            region,
            directories: page.directories,
            files: page.files,
            token: page.next_token,
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        healthy: true,
        regions_cached: state.service.pool().len().await,
    })
}

// ============ Helpers ============

fn required(value: Option<String>, field: &'static str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(Error::MissingParameter { field })
}

/// Map an error onto a status code and JSON body
fn error_response(err: &Error) -> Response {
    if let (true, Some(field)) = (err.is_user_error(), err.field()) {
        tracing::debug!("Rejected request: {}", err);
        return (
            StatusCode::BAD_REQUEST,
            Json(InvalidFieldResponse {
                field: field.to_string(),
                invalid: true,
                message: err.to_string(),
            }),
        )
            .into_response();
    }

    // backend detail stays in the log
    let (status, code, message) = match err.kind() {
        ErrorKind::BackendUnavailable => (
            StatusCode::BAD_GATEWAY,
            "BACKEND_UNAVAILABLE",
            "Storage backend unavailable",
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "Internal server error",
        ),
    };
    tracing::warn!("Browse request failed: {}", err);

    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
            code: code.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::{CountingFactory, FailingBackend};
    use crate::backend::{CredentialSource, CredentialStore, MemoryBackend, MemoryBackendFactory, S3BackendFactory};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn memory_server() -> (HttpServer, Arc<MemoryBackend>) {
        let backend = Arc::new(
            MemoryBackend::new()
                .with_object("bucket", "a/")
                .with_object("bucket", "a/b/c.txt")
                .with_object("bucket", "a/file.txt"),
        );
        let service = ListingService::new(Arc::new(MemoryBackendFactory::new(backend.clone())));
        (HttpServer::new(ServerConfig::default(), Arc::new(service)), backend)
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_browse_success() {
        let (server, _) = memory_server();
        let (status, body) = get_json(server.router(), "/api/s3?path=bucket/a/&region=us-east-2").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["path"], "bucket/a/");
        assert_eq!(body["region"], "us-east-2");
        assert_eq!(body["directories"], serde_json::json!(["b/"]));
        assert_eq!(body["files"], serde_json::json!(["file.txt"]));
        assert!(body["token"].is_null());
    }

    #[tokio::test]
    async fn test_missing_path_is_rejected_before_backend_call() {
        let (server, backend) = memory_server();
        let (status, body) = get_json(server.router(), "/api/s3?region=us-east-2").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "path");
        assert_eq!(body["invalid"], true);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_region_is_rejected() {
        let (server, backend) = memory_server();
        let (status, body) = get_json(server.router(), "/api/s3?path=bucket&region=").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "region");
        assert_eq!(body["invalid"], true);
        assert_eq!(backend.call_count(), 0);
        assert!(server.state().service.pool().is_empty().await);
    }

    #[tokio::test]
    async fn test_invalid_location_is_a_client_error() {
        let (server, _) = memory_server();
        let (status, body) = get_json(server.router(), "/api/s3?path=s3:///a/&region=us-east-2").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "path");
    }

    #[tokio::test]
    async fn test_backend_failure_is_bad_gateway() {
        let factory = CountingFactory::new(Arc::new(FailingBackend::new()));
        let service = ListingService::new(Arc::new(factory));
        let server = HttpServer::new(ServerConfig::default(), Arc::new(service));

        let (status, body) = get_json(server.router(), "/api/s3?path=bucket&region=us-east-2").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "BACKEND_UNAVAILABLE");
        assert_eq!(body["error"], "Storage backend unavailable");
        assert!(!body.to_string().contains("AccessDenied"));
        assert!(body.get("files").is_none());
    }

    #[tokio::test]
    async fn test_host_like_region_is_a_client_error() {
        let source = CredentialSource::Explicit {
            access_key: "AKID".into(),
            secret_key: "secret".into(),
        };
        let store = CredentialStore::load(source).unwrap();
        let factory = S3BackendFactory::new(Arc::new(store), None, false);
        let service = Arc::new(ListingService::new(Arc::new(factory)));
        let server = HttpServer::new(ServerConfig::default(), service);

        for region in ["169.254.169.254", "attacker.example%3A8080"] {
            let uri = format!("/api/s3?path=bucket/a/&region={}", region);
            let (status, body) = get_json(server.router(), &uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["field"], "region");
            assert_eq!(body["invalid"], true);
        }
        assert!(server.state().service.pool().is_empty().await);
    }

    #[tokio::test]
    async fn test_undecodable_query_is_a_structured_client_error() {
        let (server, backend) = memory_server();
        let (status, body) =
            get_json(server.router(), "/api/s3?path=bucket&path=other&region=us-east-2").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "query");
        assert_eq!(body["invalid"], true);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_health_reports_cached_regions() {
        let (server, _) = memory_server();
        get_json(server.router(), "/api/s3?path=bucket&region=us-east-2").await;

        let (status, body) = get_json(server.router(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["healthy"], true);
        assert_eq!(body["regions_cached"], 1);
    }
}
