use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use tracing::info;

/// Installs a global Prometheus recorder that serves `/metrics` on `listen_addr`.
///
/// The recorder picks up every counter the pipeline emits through the `metrics` facade.
/// Must be called from within a tokio runtime since the listener runs as a background task.
pub fn init_metrics(listen_addr: SocketAddr, run_label: Option<&str>) -> Result<(), BuildError> {
    let mut builder = PrometheusBuilder::new().with_http_listener(listen_addr);

    if let Some(run_label) = run_label {
        builder = builder.add_global_label("run", run_label);
    }

    builder.install()?;

    info!(%listen_addr, "metrics endpoint listening");

    Ok(())
}
