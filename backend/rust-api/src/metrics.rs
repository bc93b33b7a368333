use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, Encoder,
    HistogramVec, IntCounterVec, IntGaugeVec, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Game Metrics
    pub static ref GAME_SESSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "game_sessions_total",
        "Game session lifecycle events",
        &["mode", "status"]
    )
    .unwrap();

    pub static ref GAME_SESSIONS_ACTIVE: IntGaugeVec = register_int_gauge_vec!(
        "game_sessions_active",
        "Number of hosted game sessions",
        &["mode"]
    )
    .unwrap();

    pub static ref ANSWERS_SUBMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "answers_submitted_total",
        "Total number of scored answers",
        &["mode", "correct"]
    )
    .unwrap();

    pub static ref STALE_RESULTS_DISCARDED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "stale_results_discarded_total",
        "Async results dropped because their session was reset or replaced",
        &["mode", "kind"]
    )
    .unwrap();

    // Collaborator Metrics
    pub static ref SUPPLY_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "supply_requests_total",
        "Question supply requests",
        &["source", "status"]
    )
    .unwrap();

    pub static ref SUPPLY_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "supply_request_duration_seconds",
        "Question supply latency in seconds",
        &["source"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    pub static ref RECORDER_WRITES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "recorder_writes_total",
        "Session result writes",
        &["status"]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Helper: time a supply call and count its outcome
pub async fn track_supply_request<F, T, E>(source: &str, future: F) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
{
    let start = std::time::Instant::now();
    let result = future.await;

    let status = if result.is_ok() { "success" } else { "error" };
    SUPPLY_REQUESTS_TOTAL
        .with_label_values(&[source, status])
        .inc();
    SUPPLY_REQUEST_DURATION_SECONDS
        .with_label_values(&[source])
        .observe(start.elapsed().as_secs_f64());

    result
}

pub fn record_recorder_write(success: bool) {
    let status = if success { "success" } else { "error" };
    RECORDER_WRITES_TOTAL.with_label_values(&[status]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        let _ = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/health", "200"])
            .get();
        let _ = GAME_SESSIONS_ACTIVE.with_label_values(&["quiz"]).get();
    }

    #[test]
    fn test_render_metrics() {
        GAME_SESSIONS_TOTAL
            .with_label_values(&["arcade", "started"])
            .inc();

        let output = render_metrics().unwrap();
        assert!(output.contains("game_sessions_total"));
    }

    #[tokio::test]
    async fn test_track_supply_request_counts_errors() {
        let before = SUPPLY_REQUESTS_TOTAL
            .with_label_values(&["unit", "error"])
            .get();
        let res: Result<(), &str> = track_supply_request("unit", async { Err("down") }).await;
        assert!(res.is_err());
        assert_eq!(
            SUPPLY_REQUESTS_TOTAL
                .with_label_values(&["unit", "error"])
                .get(),
            before + 1
        );
    }
}
