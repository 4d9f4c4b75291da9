use axum::{response::Html, routing::get, Router};
use prometheus::{gather, Encoder, TextEncoder};
use std::net::SocketAddr;

/// Encode every registered collector in the Prometheus text format.
pub fn render_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    encoder
        .encode(&gather(), &mut buffer)
        .map_err(|e| format!("failed to encode metrics: {}", e))?;
    String::from_utf8(buffer).map_err(|e| format!("metrics buffer is not UTF-8: {}", e))
}

async fn metrics_handler() -> Html<String> {
    match render_metrics() {
        Ok(text) => Html(text),
        Err(e) => {
            tracing::error!("Failed to render Prometheus metrics: {}", e);
            Html(format!("# ERROR: {}\n", e))
        }
    }
}

/// Serve `/metrics` on the given address until the task is dropped.
pub async fn run_metrics_server(addr: SocketAddr) {
    let app = Router::new().route("/metrics", get(metrics_handler));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind metrics server to {}: {}", addr, e);
            return;
        }
    };
    tracing::info!("Metrics server listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Metrics server failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_types::SourceKind;

    #[test]
    fn rendered_metrics_include_reputation_collectors() {
        crate::metrics::record_source_attempt(SourceKind::RestLive);
        let text = render_metrics().unwrap();
        assert!(text.contains("storefront_reputation_source_attempts_total"));
    }
}
