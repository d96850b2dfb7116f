//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use grove::config::ServerConfig;
use grove::engine::{Engine, IncomingRequest, Reply};
use grove::{HttpServer, Shutdown};

/// Run `method uri` through the engine without a transport.
#[allow(dead_code)]
pub fn call(engine: &Engine, method: Method, uri: &str) -> Reply {
    engine.handle(IncomingRequest::new(method, uri.parse().unwrap()))
}

#[allow(dead_code)]
pub fn get(engine: &Engine, uri: &str) -> Reply {
    call(engine, Method::GET, uri)
}

/// Build an axum request with an empty body.
#[allow(dead_code)]
pub fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Collect a response body as text.
#[allow(dead_code)]
pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// A running server bound to an ephemeral port.
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), grove::http::ServerError>>,
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server task to finish.
    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop in time")
            .expect("server task panicked")
            .expect("server returned an error");
    }
}

/// Start `engine` on 127.0.0.1 with an OS-assigned port.
#[allow(dead_code)]
pub async fn start_server(engine: Engine, mut config: ServerConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();
    config.timeouts.shutdown_grace_secs = 1;

    let shutdown = Shutdown::new();
    let server = HttpServer::new(engine, config);
    let handle = tokio::spawn(server.run(listener, shutdown.clone()));

    TestServer { addr, shutdown, handle }
}
