//! HTTP request handlers: metrics scrape, health and landing page.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use tracing::{error, warn};

use crate::state::AppState;

// ============================================================
// Metrics
// ============================================================

/// Runs one collection round and returns the text exposition.
///
/// Collection reads sysfs synchronously, so it runs on the blocking pool
/// under the scrape deadline. A round that overruns keeps going in the
/// background; its result is dropped, and scrapes are refused until it ends.
pub(crate) async fn handle_metrics(State(app): AppState) -> Response {
    let Some(slot) = app.try_start_scrape() else {
        warn!("previous scrape still running, refusing scrape");
        return (StatusCode::SERVICE_UNAVAILABLE, "previous scrape still running\n")
            .into_response();
    };

    let exporter = app.exporter.clone();
    let content_type = exporter.content_type();
    let task = tokio::task::spawn_blocking(move || {
        let _slot = slot;
        exporter.render()
    });

    match tokio::time::timeout(app.scrape_timeout, task).await {
        Ok(Ok(Ok(body))) => ([(header::CONTENT_TYPE, content_type)], body).into_response(),
        Ok(Ok(Err(e))) => {
            error!(error = %e, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to encode metrics\n",
            )
                .into_response()
        }
        Ok(Err(e)) => {
            error!(error = %e, "scrape panicked in spawn_blocking");
            (StatusCode::INTERNAL_SERVER_ERROR, "scrape failed\n").into_response()
        }
        Err(_) => {
            warn!(
                timeout_ms = app.scrape_timeout.as_millis() as u64,
                "scrape deadline exceeded"
            );
            (StatusCode::SERVICE_UNAVAILABLE, "scrape timed out\n").into_response()
        }
    }
}

// ============================================================
// Health
// ============================================================

pub(crate) async fn handle_health() -> &'static str {
    "ok"
}

// ============================================================
// Landing page
// ============================================================

pub(crate) async fn handle_index(State(app): AppState) -> Html<String> {
    Html(format!(
        "<html>\n<head><title>PCI Exporter</title></head>\n<body>\n\
         <h1>PCI Exporter</h1>\n<p><a href=\"{path}\">Metrics</a></p>\n\
         </body>\n</html>\n",
        path = app.telemetry_path
    ))
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use pci_exporter_core::Exporter;
    use pci_exporter_core::collector::{
        CollectorConfig, FileSystem, MockFs, PciCollector,
    };

    use super::*;
    use crate::build_router;
    use crate::state::WebApp;

    /// Delays every directory listing to make a scrape overrun its deadline.
    #[derive(Clone)]
    struct SlowFs(MockFs);

    impl FileSystem for SlowFs {
        fn read_to_string(&self, path: &Path) -> io::Result<String> {
            self.0.read_to_string(path)
        }

        fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
            std::thread::sleep(Duration::from_millis(300));
            self.0.read_dir(path)
        }

        fn file_size(&self, path: &Path) -> io::Result<u64> {
            self.0.file_size(path)
        }
    }

    fn app<F: FileSystem + Clone + 'static>(fs: F, scrape_timeout: Duration) -> WebApp {
        let collector = PciCollector::new(fs, CollectorConfig::default()).unwrap();
        WebApp::new(Exporter::new(collector).unwrap(), scrape_timeout, "/metrics")
    }

    async fn get(app: WebApp, uri: &str) -> (StatusCode, String) {
        let response = build_router(app)
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let (status, body) = get(
            app(MockFs::typical_host(), Duration::from_secs(5)),
            "/metrics",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("pci_device_link_width{device=\"0000:01:00.0\"} 4"));
        assert!(body.contains("pci_exporter_devices 5"));
    }

    #[tokio::test]
    async fn test_metrics_content_type() {
        let response = build_router(app(MockFs::typical_host(), Duration::from_secs(5)))
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/plain"));
    }

    #[tokio::test]
    async fn test_metrics_deadline() {
        let fs = SlowFs(MockFs::typical_host());
        let (status, body) = get(app(fs, Duration::from_millis(20)), "/metrics").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("timed out"));
    }

    #[tokio::test]
    async fn test_overrunning_scrape_blocks_next_one() {
        let app = app(SlowFs(MockFs::typical_host()), Duration::from_millis(20));

        let (status, body) = get(app.clone(), "/metrics").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("timed out"));

        // The first round is still sleeping in read_dir.
        let (status, body) = get(app.clone(), "/metrics").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("still running"));
    }

    #[tokio::test]
    async fn test_consecutive_scrapes_succeed() {
        let app = app(MockFs::typical_host(), Duration::from_secs(5));
        for _ in 0..3 {
            let (status, _) = get(app.clone(), "/metrics").await;
            assert_eq!(status, StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_health_and_index() {
        let (status, body) = get(app(MockFs::new(), Duration::from_secs(5)), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");

        let (status, body) = get(app(MockFs::new(), Duration::from_secs(5)), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("href=\"/metrics\""));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, _) = get(app(MockFs::new(), Duration::from_secs(5)), "/api").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
