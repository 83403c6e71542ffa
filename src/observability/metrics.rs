use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Installs the process-wide Prometheus recorder and starts its HTTP
/// exporter. Call once at startup before any `counter!`/`gauge!` use.
pub fn init_metrics() {
    let addr: SocketAddr = "0.0.0.0:9100".parse().expect("invalid metrics address");

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus recorder");
}

pub const METRIC_CONNECTIONS_TOTAL: &str = "embercache_connections_total";
pub const METRIC_COMMANDS_TOTAL: &str = "embercache_commands_total";
pub const METRIC_COMMAND_LATENCY: &str = "embercache_command_latency_seconds";
pub const METRIC_ACTIVE_CONNECTIONS: &str = "embercache_active_connections";
