//! Access logging middleware.

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, info, warn};

/// Liveness route; logged at debug since probes hit it every few seconds.
pub(crate) const HEALTH_PATH: &str = "/health";

/// Logs one line per request once the response is ready.
///
/// Server errors (a scrape past its deadline, a failed encode) go to warn.
pub(crate) async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let client = client_addr(&req);
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let latency_ms = started.elapsed().as_millis() as u64;
    let code = status.as_u16();
    if status.is_server_error() {
        warn!(%client, status = code, latency_ms, "{method} {path}");
    } else if path == HEALTH_PATH {
        debug!(%client, status = code, latency_ms, "{method} {path}");
    } else {
        info!(%client, status = code, latency_ms, "{method} {path}");
    }
    response
}

/// Peer IP, or `-` when the router runs without connect info (tests).
fn client_addr(req: &Request) -> String {
    match req.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => addr.ip().to_string(),
        None => "-".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_client_addr() {
        let mut req = Request::new(Body::empty());
        assert_eq!(client_addr(&req), "-");

        let addr: SocketAddr = "10.1.2.3:45678".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        assert_eq!(client_addr(&req), "10.1.2.3");
    }
}
