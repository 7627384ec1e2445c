//! Prometheus exposition for the metric names fixed in spec.md §6
//! (SPEC_FULL.md A.5). Names and label sets are emitted verbatim by the
//! `metrics` calls scattered through `leadguard-worker`; this module only
//! installs the recorder and its HTTP listener.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

/// Install the global Prometheus recorder and serve `/metrics` on
/// `listen`. Must be called exactly once, before any `metrics::counter!`/
/// `gauge!`/`histogram!` call fires.
pub fn install(listen: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(listen)
        .install()?;
    info!(%listen, "prometheus exporter listening");
    Ok(())
}
