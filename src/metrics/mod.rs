//! Prometheus exposition for the counters and histograms emitted by the
//! cache and the alert evaluator.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::utils::error::{Error, Result};

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the global Prometheus recorder. Subsequent calls are no-ops.
pub fn init() -> Result<()> {
    if PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::Other(format!("install metrics recorder: {}", e)))?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

/// Handle for rendering, if [`init`] has run
pub fn handle() -> Option<&'static PrometheusHandle> {
    PROM_HANDLE.get()
}

/// Current metrics in Prometheus text format; empty before [`init`]
pub fn render() -> String {
    handle().map(|h| h.render()).unwrap_or_default()
}
