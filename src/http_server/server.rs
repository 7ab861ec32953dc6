//! # Static Asset Server
//!
//! Serves the compiled page and its assets from one directory. Every path resolves
//! against the asset root; `.wasm` responses are labelled `application/wasm` so the
//! browser can compile them while streaming.

use std::io;
use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::Request;
use axum::http::{header, HeaderValue};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;

use super::config::HttpServerConfig;
use crate::observability::{log_event_with_fields, Event};

/// Content type of WebAssembly modules
pub const WASM_CONTENT_TYPE: &str = "application/wasm";

/// Asset server errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid socket address {0}")]
    InvalidAddress(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Server failed: {0}")]
    Serve(#[from] io::Error),
}

/// Static asset server
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a new server with default configuration
    pub fn new() -> Self {
        Self::with_config(HttpServerConfig::default())
    }

    /// Create a new server with custom configuration
    pub fn with_config(config: HttpServerConfig) -> Self {
        let router = Self::build_router(&config);
        Self { config, router }
    }

    fn build_router(config: &HttpServerConfig) -> Router {
        let router = Router::new()
            .fallback_service(ServeDir::new(&config.root))
            .layer(middleware::from_fn(wasm_content_type))
            .layer(middleware::from_fn(log_request));

        if config.cors_origins.is_empty() {
            return router;
        }

        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        router.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any),
        )
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Bind the listener
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .map_err(|_| ServerError::InvalidAddress(self.config.socket_addr()))?;

        match TcpListener::bind(addr).await {
            Ok(listener) => Ok(listener),
            Err(source) => {
                let error = source.to_string();
                let addr_str = addr.to_string();
                log_event_with_fields(
                    Event::ServerBindFailed,
                    &[("addr", &addr_str), ("error", &error)],
                );
                Err(ServerError::Bind { addr, source })
            }
        }
    }

    /// Serve on an already bound listener until the process exits
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        let local = listener.local_addr()?.to_string();
        log_event_with_fields(
            Event::ServerListening,
            &[("addr", &local), ("root", &self.config.root)],
        );
        println!("Serving on http://{}", self.config.socket_addr());

        axum::serve(listener, self.router).await?;
        Ok(())
    }

    /// Bind and serve
    pub async fn start(self) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }
}

impl Default for HttpServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Force the WebAssembly content type on successful `.wasm` responses
async fn wasm_content_type(request: Request, next: Next) -> Response {
    let is_wasm = request.uri().path().ends_with(".wasm");
    let mut response = next.run(request).await;
    if is_wasm && response.status().is_success() {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(WASM_CONTENT_TYPE));
    }
    response
}

/// One `ASSET_SERVED` line per request
async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    let elapsed_us = started.elapsed().as_micros().to_string();
    log_event_with_fields(
        Event::AssetServed,
        &[
            ("method", &method),
            ("path", &path),
            ("status", &status),
            ("elapsed_us", &elapsed_us),
        ],
    );
    response
}
