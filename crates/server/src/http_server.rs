//! Read-only HTTP server for the documentation viewer.
//!
//! Serves files under a fixed root with content types from [`MimeTable`] and
//! adds `Access-Control-Allow-Origin: *` to every response, errors included.
//!
//! ## Behaviour
//!
//! - **Files**: `200` with the exact bytes and the table's content type
//! - **Directories**: `301` to the trailing-slash form, then `index.html` or
//!   `index.htm` if present; directories without an index are `404`, never listed
//! - **Anything else**: `404`; non-GET methods get `405`
//!
//! Requests are independent and stateless. The serve loop runs until the
//! shutdown future resolves, then releases the listener.

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, MethodRouter};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::mime::{MimeTable, FALLBACK_CONTENT_TYPE};
use crate::resolve::{is_within_root, resolve_request_path};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_ROOT: &str = "docs/viewer";

const INDEX_FILES: &[&str] = &["index.html", "index.htm"];

/// Startup configuration for the viewer server. Fixed for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeConfig {
    pub host: String,
    pub port: u16,
    pub root: PathBuf,
    pub mime_types: MimeTable,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            root: PathBuf::from(DEFAULT_ROOT),
            mime_types: MimeTable::default(),
        }
    }
}

impl ServeConfig {
    /// Socket address to bind. Accepts an IP literal or `localhost`.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            self.host
                .parse()
                .with_context(|| format!("invalid bind host: {}", self.host))?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug)]
struct Viewer {
    root: PathBuf,
    mime_types: MimeTable,
}

/// Builds the viewer router.
///
/// Fails if the root directory does not exist; the root is canonicalized once
/// here so every request is checked against the same real path.
pub fn router(config: &ServeConfig) -> Result<Router> {
    let root = std::fs::canonicalize(&config.root)
        .with_context(|| format!("served directory not found: {}", config.root.display()))?;
    if !root.is_dir() {
        bail!("served path is not a directory: {}", root.display());
    }

    let viewer = Arc::new(Viewer {
        root,
        mime_types: config.mime_types.clone(),
    });

    let files: MethodRouter = get(serve_path).with_state(viewer);
    Ok(Router::new()
        .fallback_service(files)
        .layer(middleware::from_fn(log_request))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        )))
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let response = next.run(request).await;
    tracing::info!(
        target: "docbench::http",
        %method,
        path,
        status = response.status().as_u16(),
        "Request served"
    );
    response
}

async fn serve_path(State(viewer): State<Arc<Viewer>>, uri: Uri) -> Response {
    let request_path = uri.path();
    let Some(candidate) = resolve_request_path(&viewer.root, request_path) else {
        tracing::debug!(target: "docbench::http", path = request_path, "Rejected request path");
        return not_found();
    };

    let Ok(resolved) = tokio::fs::canonicalize(&candidate).await else {
        return not_found();
    };
    if !is_within_root(&viewer.root, &resolved) {
        tracing::warn!(
            target: "docbench::http",
            path = request_path,
            resolved = %resolved.display(),
            "Request resolved outside the served root"
        );
        return not_found();
    }

    let Ok(metadata) = tokio::fs::metadata(&resolved).await else {
        return not_found();
    };
    if !metadata.is_dir() {
        return serve_file(&viewer, &candidate, &resolved).await;
    }

    if !request_path.ends_with('/') {
        return redirect_to_directory(&uri);
    }
    for index in INDEX_FILES {
        let index_path = resolved.join(index);
        if tokio::fs::metadata(&index_path)
            .await
            .is_ok_and(|meta| meta.is_file())
        {
            return serve_file(&viewer, &index_path, &index_path).await;
        }
    }
    not_found()
}

/// `named` picks the content type; `resolved` is what gets read. They differ
/// when the request goes through a symlink.
async fn serve_file(viewer: &Viewer, named: &Path, resolved: &Path) -> Response {
    match tokio::fs::read(resolved).await {
        Ok(bytes) => {
            let content_type = viewer.mime_types.content_type_for(named);
            let content_type = HeaderValue::from_str(content_type)
                .unwrap_or_else(|_| HeaderValue::from_static(FALLBACK_CONTENT_TYPE));
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Err(err) => {
            tracing::debug!(
                target: "docbench::http",
                path = %resolved.display(),
                error = %err,
                "Failed to read file"
            );
            not_found()
        }
    }
}

fn redirect_to_directory(uri: &Uri) -> Response {
    let location = match uri.query() {
        Some(query) => format!("{}/?{query}", uri.path()),
        None => format!("{}/", uri.path()),
    };
    match HeaderValue::from_str(&location) {
        Ok(location) => {
            (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
        }
        Err(_) => not_found(),
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "File not found").into_response()
}

/// The startup banner printed to stdout.
pub fn banner(config: &ServeConfig, local_addr: SocketAddr) -> String {
    let rule = "=".repeat(40);
    let url = if local_addr.ip().is_loopback() || local_addr.ip().is_unspecified() {
        format!("http://localhost:{}", local_addr.port())
    } else {
        format!("http://{local_addr}")
    };
    format!(
        "{rule}\nDocumentation Viewer Server\n{rule}\n\n\
         Server running at: {url}\n\
         Serving directory: {}\n\n\
         Press Ctrl+C to stop the server\n",
        config.root.display()
    )
}

/// Binds the configured address, prints the banner, and serves until `shutdown` resolves.
pub async fn serve<F>(config: ServeConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(&config)?;
    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to read bound address")?;

    println!("{}", banner(&config, local_addr));
    tracing::info!(
        target: "docbench::http",
        bind = %local_addr,
        root = %config.root.display(),
        overrides = config.mime_types.len(),
        "Documentation viewer listening"
    );

    serve_listener(listener, app, shutdown).await
}

/// Serves `app` on an already bound listener until `shutdown` resolves.
pub async fn serve_listener<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error")?;

    tracing::info!(target: "docbench::http", "Documentation viewer stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use docbench_test_utils::ViewerFixture;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app_for(fixture: &ViewerFixture) -> Router {
        let config = ServeConfig {
            root: fixture.root().to_path_buf(),
            ..Default::default()
        };
        router(&config).expect("router")
    }

    async fn get(app: Router, uri: &str) -> Response {
        let request = axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap();
        app.oneshot(request).await.unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec()
    }

    fn header_str<'a>(response: &'a Response, name: header::HeaderName) -> Option<&'a str> {
        response.headers().get(name).and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn serves_module_script_with_javascript_type() {
        let fixture = ViewerFixture::with_sample_files().expect("fixture");

        let response = get(app_for(&fixture), "/app.mjs").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            header_str(&response, header::CONTENT_TYPE),
            Some("application/javascript")
        );
        assert_eq!(
            header_str(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some("*")
        );
        assert_eq!(body_bytes(response).await, b"x=1;\n");
    }

    #[tokio::test]
    async fn serves_json_with_json_type() {
        let fixture = ViewerFixture::new().expect("fixture");
        fixture.write("data/nav.json", br#"{"pages":[]}"#).expect("write");

        let response = get(app_for(&fixture), "/data/nav.json").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, header::CONTENT_TYPE), Some("application/json"));
    }

    #[tokio::test]
    async fn missing_file_is_404_with_cors_header() {
        let fixture = ViewerFixture::with_sample_files().expect("fixture");

        let response = get(app_for(&fixture), "/missing.txt").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            header_str(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some("*")
        );
    }

    #[tokio::test]
    async fn root_serves_index() {
        let fixture = ViewerFixture::with_sample_files().expect("fixture");

        let response = get(app_for(&fixture), "/").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, header::CONTENT_TYPE), Some("text/html"));
        assert_eq!(body_bytes(response).await.len(), 10);
    }

    #[tokio::test]
    async fn directory_without_slash_redirects() {
        let fixture = ViewerFixture::new().expect("fixture");
        fixture.write("guide/index.html", b"guide").expect("write");

        let response = get(app_for(&fixture), "/guide?tab=api").await;

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(header_str(&response, header::LOCATION), Some("/guide/?tab=api"));
        assert_eq!(
            header_str(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some("*")
        );
    }

    #[tokio::test]
    async fn directory_without_index_is_404() {
        let fixture = ViewerFixture::new().expect("fixture");
        fixture.write("assets/app.js", b"1").expect("write");

        let response = get(app_for(&fixture), "/assets/").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let outer = ViewerFixture::new().expect("fixture");
        outer.write("secret.txt", b"secret").expect("write");
        outer.write("viewer/index.html", b"ok").expect("write");
        let config = ServeConfig {
            root: outer.root().join("viewer"),
            ..Default::default()
        };
        let app = router(&config).expect("router");

        let response = get(app.clone(), "/../secret.txt").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = get(app, "/%2e%2e/secret.txt").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_escaping_root_is_rejected() {
        let outer = ViewerFixture::new().expect("fixture");
        let secret = outer.write("secret.txt", b"secret").expect("write");
        outer.write("viewer/index.html", b"ok").expect("write");
        std::os::unix::fs::symlink(&secret, outer.root().join("viewer/leak.txt"))
            .expect("symlink");
        let config = ServeConfig {
            root: outer.root().join("viewer"),
            ..Default::default()
        };

        let response = get(router(&config).expect("router"), "/leak.txt").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn post_is_method_not_allowed_with_cors_header() {
        let fixture = ViewerFixture::with_sample_files().expect("fixture");
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/app.mjs")
            .body(Body::empty())
            .unwrap();

        let response = app_for(&fixture).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            header_str(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some("*")
        );
    }

    #[tokio::test]
    async fn configured_override_applies() {
        let fixture = ViewerFixture::new().expect("fixture");
        fixture.write("notes.md", b"# Notes").expect("write");
        let config = ServeConfig {
            root: fixture.root().to_path_buf(),
            mime_types: MimeTable::default()
                .with_override("md", "text/markdown")
                .expect("valid override"),
            ..Default::default()
        };

        let response = get(router(&config).expect("router"), "/notes.md").await;

        assert_eq!(header_str(&response, header::CONTENT_TYPE), Some("text/markdown"));
    }

    #[test]
    fn router_requires_existing_root() {
        let fixture = ViewerFixture::new().expect("fixture");
        let config = ServeConfig {
            root: fixture.root().join("does-not-exist"),
            ..Default::default()
        };
        let err = router(&config).expect_err("missing root should fail");
        assert!(err.to_string().contains("served directory not found"));
    }

    #[test]
    fn bind_addr_accepts_localhost_and_ip_literals() {
        let config = ServeConfig {
            host: "localhost".into(),
            ..Default::default()
        };
        assert_eq!(config.bind_addr().unwrap(), "127.0.0.1:8080".parse().unwrap());

        let config = ServeConfig {
            host: "::1".into(),
            port: 3000,
            ..Default::default()
        };
        assert_eq!(config.bind_addr().unwrap(), "[::1]:3000".parse().unwrap());

        let config = ServeConfig {
            host: "not-an-address".into(),
            ..Default::default()
        };
        assert!(config.bind_addr().is_err());
    }

    #[test]
    fn banner_names_url_directory_and_stop_instruction() {
        let config = ServeConfig::default();
        let text = banner(&config, "127.0.0.1:8080".parse().unwrap());
        assert!(text.contains("Server running at: http://localhost:8080"));
        assert!(text.contains("Serving directory: docs/viewer"));
        assert!(text.contains("Press Ctrl+C to stop the server"));
    }
}
