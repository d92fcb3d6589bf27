use std::sync::LazyLock;

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, TextEncoder};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{error, info};

// --- Global metrics registered with the default prometheus registry ---

static RECONCILIATIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "drone_operator_reconciliations_total",
            "Total number of DroneServer reconciliations",
        ),
        &["result"],
    )
    .expect("metric can be created");
    prometheus::register(Box::new(counter.clone())).expect("metric can be registered");
    counter
});

static RECONCILE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    let hist = Histogram::with_opts(HistogramOpts::new(
        "drone_operator_reconciliation_duration_seconds",
        "Duration of DroneServer reconciliation in seconds",
    ))
    .expect("metric can be created");
    prometheus::register(Box::new(hist.clone())).expect("metric can be registered");
    hist
});

static CONVERGES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "drone_operator_converge_total",
            "Managed objects created or updated",
        ),
        &["kind", "outcome"],
    )
    .expect("metric can be created");
    prometheus::register(Box::new(counter.clone())).expect("metric can be registered");
    counter
});

/// Record a completed reconciliation.
pub fn record_reconciliation(result: &str) {
    RECONCILIATIONS.with_label_values(&[result]).inc();
}

/// Observe reconciliation duration.
pub fn observe_reconcile_duration(duration_secs: f64) {
    RECONCILE_DURATION.observe(duration_secs);
}

/// Record a create or update of a managed object.
pub fn record_converge(kind: &str, outcome: &str) {
    CONVERGES.with_label_values(&[kind, outcome]).inc();
}

/// Encode all registered metrics as Prometheus text format.
fn encode_metrics() -> Result<Vec<u8>, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {e}"))?;
    Ok(buffer)
}

/// Route a request path to (status line, content type, body).
fn respond(path: &str) -> (&'static str, &'static str, Vec<u8>) {
    match path {
        "/metrics" => match encode_metrics() {
            Ok(data) => ("200 OK", "text/plain; version=0.0.4; charset=utf-8", data),
            Err(e) => ("500 Internal Server Error", "text/plain", e.into_bytes()),
        },
        "/healthz" | "/readyz" => ("200 OK", "text/plain", b"ok".to_vec()),
        _ => ("404 Not Found", "text/plain", b"not found".to_vec()),
    }
}

/// Serve metrics and probes.
///
/// - `GET /metrics`: Prometheus metrics
/// - `GET /healthz`: liveness probe
/// - `GET /readyz`: readiness probe
pub async fn serve(addr: String) -> std::io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("Metrics server listening on {addr}");

    loop {
        match listener.accept().await {
            Ok((mut stream, _)) => {
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let n = match stream.read(&mut buf).await {
                        Ok(n) => n,
                        Err(_) => return,
                    };
                    let request = String::from_utf8_lossy(&buf[..n]);

                    let path = request
                        .lines()
                        .next()
                        .and_then(|line| line.split_whitespace().nth(1))
                        .unwrap_or("/");

                    let (status, content_type, body) = respond(path);
                    let header = format!(
                        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        body.len()
                    );

                    let _ = stream.write_all(header.as_bytes()).await;
                    let _ = stream.write_all(&body).await;
                });
            }
            Err(e) => {
                error!("Failed to accept metrics connection: {e}");
            }
        }
    }
}
