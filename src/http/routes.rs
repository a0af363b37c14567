//! HTTP route definitions

use std::net::SocketAddr;
use std::path::Path;

use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::app::AppState;
use crate::ws::handler::upgrade;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler).fallback(not_found))
        .route("/style.css", get(style_handler).fallback(not_found))
        .route("/main.js", get(script_handler).fallback(not_found))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Static files
// ============================================================================

/// `/` serves the page, or accepts a sync connection on WebSocket upgrade
async fn root_handler(
    ws: Option<WebSocketUpgrade>,
    peer: Option<ConnectInfo<SocketAddr>>,
    State(state): State<AppState>,
) -> Response {
    match ws {
        Some(ws) => upgrade(ws, peer.map(|ConnectInfo(addr)| addr), state),
        None => serve_file(&state.config.static_root, "index.html", "text/html")
            .await
            .into_response(),
    }
}

async fn style_handler(State(state): State<AppState>) -> Result<Response, AppError> {
    serve_file(&state.config.static_root, "style.css", "text/css").await
}

async fn script_handler(State(state): State<AppState>) -> Result<Response, AppError> {
    serve_file(&state.config.static_root, "main.js", "text/javascript").await
}

async fn not_found() -> AppError {
    AppError::NotFound
}

/// Read a file from the static root off the world task
async fn serve_file(
    root: &Path,
    name: &'static str,
    content_type: &'static str,
) -> Result<Response, AppError> {
    let path = root.join(name);
    let data = tokio::fs::read(&path).await.map_err(|e| {
        error!(path = %path.display(), error = %e, "Failed to read static file");
        AppError::File(e)
    })?;

    Ok(([(header::CONTENT_TYPE, content_type)], data).into_response())
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error("{0}")]
    File(#[from] std::io::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::File(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            [(header::CONTENT_TYPE, "text/plain")],
            self.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::game::WorldSession;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use std::path::PathBuf;
    use std::time::Duration;
    use tower::ServiceExt;

    fn static_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("worldsync-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn router_for(root: &Path) -> Router {
        let mut config =
            Config::from_sources(vec!["0".to_string(), "www".to_string()], |_| None).unwrap();
        config.static_root = root.to_path_buf();

        let (session, world) =
            WorldSession::new(Duration::from_millis(10), Duration::from_millis(10));
        tokio::spawn(session.run());
        build_router(AppState::new(config, world))
    }

    async fn get_path(router: Router, method: Method, uri: &str) -> (StatusCode, String, String) {
        let response = router
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test]
    async fn serves_known_files_with_content_types() {
        let dir = static_dir("serve");
        std::fs::write(dir.join("index.html"), "<html></html>").unwrap();
        std::fs::write(dir.join("style.css"), "body {}").unwrap();
        std::fs::write(dir.join("main.js"), "console.log(1)").unwrap();

        let cases = [
            ("/", "text/html", "<html></html>"),
            ("/style.css", "text/css", "body {}"),
            ("/main.js", "text/javascript", "console.log(1)"),
        ];
        for (uri, expected_type, expected_body) in cases {
            let (status, content_type, body) = get_path(router_for(&dir), Method::GET, uri).await;
            assert_eq!(status, StatusCode::OK, "{}", uri);
            assert_eq!(content_type, expected_type);
            assert_eq!(body, expected_body);
        }
    }

    #[tokio::test]
    async fn missing_backing_file_is_a_server_error() {
        let dir = static_dir("missing");
        let _ = std::fs::remove_file(dir.join("style.css"));

        let (status, content_type, _) = get_path(router_for(&dir), Method::GET, "/style.css").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(content_type, "text/plain");
    }

    #[tokio::test]
    async fn unknown_paths_and_methods_are_not_found() {
        let dir = static_dir("unknown");

        let (status, content_type, body) =
            get_path(router_for(&dir), Method::GET, "/favicon.ico").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(content_type, "text/plain");
        assert_eq!(body, "not found");

        let (status, _, _) = get_path(router_for(&dir), Method::POST, "/main.js").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
