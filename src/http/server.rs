//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap the engine in an axum fallback service
//! - Wire up tower-http layers (request ID, tracing, read/write timeouts, body limit)
//! - Run each request's chain on the blocking pool
//! - Serve plain TCP or TLS with graceful shutdown

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::{RequestBodyTimeoutLayer, TimeoutLayer},
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::engine::Engine;
use crate::http::request::{buffer_request, X_REQUEST_ID};
use crate::http::response::into_response;
use crate::lifecycle::Shutdown;
use crate::net::load_tls_config;

/// Errors raised while starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not bind its address.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Certificate or key could not be loaded.
    #[error("failed to load TLS configuration: {0}")]
    Tls(#[source] std::io::Error),

    /// The configured address is not a socket address.
    #[error("invalid listen address '{0}'")]
    InvalidAddress(String),

    /// Accept loop or connection I/O failed.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into the dispatch handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub body_limit: usize,
}

/// HTTP front end for an [`Engine`].
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Freeze `engine` and build the service stack described by `config`.
    pub fn new(engine: Engine, config: ServerConfig) -> Self {
        for (method, pattern) in engine.routes() {
            tracing::debug!(method = %method, pattern = %pattern, "Serving route");
        }
        let state = AppState {
            engine: Arc::new(engine),
            body_limit: config.limits.max_body_size,
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(RequestBodyTimeoutLayer::new(Duration::from_secs(config.timeouts.read_secs)))
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.write_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The service stack, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address and serve, with TLS when configured.
    pub async fn serve(self, shutdown: Shutdown) -> Result<(), ServerError> {
        let address = self.config.listener.bind_address.clone();
        match self.config.listener.tls.clone() {
            Some(tls) => {
                let addr: SocketAddr = address
                    .parse()
                    .map_err(|_| ServerError::InvalidAddress(address.clone()))?;
                let rustls = load_tls_config(&tls).await.map_err(ServerError::Tls)?;
                self.run_tls(addr, rustls, shutdown).await
            }
            None => {
                let listener = TcpListener::bind(&address)
                    .await
                    .map_err(|source| ServerError::Bind { address, source })?;
                self.run(listener, shutdown).await
            }
        }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, tls = false, "HTTP server starting");

        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let signal = shutdown.clone();
        let server = axum::serve(listener, app)
            .with_graceful_shutdown(async move { signal.wait().await })
            .into_future();

        tokio::select! {
            result = server => result?,
            _ = grace_deadline(&shutdown, grace) => {
                tracing::warn!(grace_secs = grace.as_secs(), "Grace period elapsed, dropping open connections");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    async fn run_tls(
        self,
        addr: SocketAddr,
        rustls: axum_server::tls_rustls::RustlsConfig,
        shutdown: Shutdown,
    ) -> Result<(), ServerError> {
        tracing::info!(address = %addr, tls = true, "HTTP server starting");

        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        let handle = axum_server::Handle::new();
        let watcher = handle.clone();
        tokio::spawn(async move {
            shutdown.wait().await;
            watcher.graceful_shutdown(Some(grace));
        });

        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(self.router.into_make_service_with_connect_info::<SocketAddr>())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Resolves `grace` after shutdown was triggered.
async fn grace_deadline(shutdown: &Shutdown, grace: Duration) {
    shutdown.wait().await;
    tokio::time::sleep(grace).await;
}

/// Fallback handler: buffer, run the chain off the async workers, respond.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_headers = request.headers().clone();
    let incoming = match buffer_request(request, state.body_limit).await {
        Ok(incoming) => incoming,
        Err(response) => return response,
    };

    let engine = Arc::clone(&state.engine);
    let span = tracing::Span::current();
    let outcome = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        engine.handle(incoming)
    })
    .await;

    match outcome {
        Ok(reply) => into_response(reply, &request_headers).await,
        Err(e) => {
            tracing::error!(error = %e, panicked = e.is_panic(), "Request chain did not complete");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
