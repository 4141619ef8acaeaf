//! Prometheus metrics exposition
//!
//! - `phone_exchange_total` (counter): label `outcome` (`resolved` or failure kind)
//! - `phone_exchange_duration_seconds` (histogram): label `outcome`
//! - `phone_exchange_config_faults_total` (counter): label `fault`

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

const DURATION_METRIC: &str = "phone_exchange_duration_seconds";

/// Buckets from 5ms up to the maximum configurable exchange timeout.
const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 8.0, 10.0, 30.0,
];

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(DURATION_METRIC.to_string()), DURATION_BUCKETS)
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    Ok(builder()?.install_recorder()?)
}

/// Record one completed exchange.
pub fn record_exchange(outcome: &'static str, duration_secs: f64) {
    metrics::counter!("phone_exchange_total", "outcome" => outcome).increment(1);
    metrics::histogram!(DURATION_METRIC, "outcome" => outcome).record(duration_secs);
}

/// Record a request refused because credentials could not be resolved.
pub fn record_config_fault(fault: &'static str) {
    metrics::counter!("phone_exchange_config_faults_total", "fault" => fault).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusRecorder;

    /// Isolated recorder/handle pair; install_recorder() can only succeed once
    /// per process.
    fn isolated_recorder() -> (PrometheusRecorder, PrometheusHandle) {
        let recorder = builder().unwrap().build_recorder();
        let handle = recorder.handle();
        (recorder, handle)
    }

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        record_exchange("resolved", 0.05);
        record_config_fault("missing_secret");
    }

    #[test]
    fn record_exchange_renders_counter_and_histogram() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_exchange("resolved", 0.042);
        record_exchange("timeout", 8.0);

        let output = handle.render();
        assert!(output.contains("phone_exchange_total"));
        assert!(output.contains("outcome=\"resolved\""));
        assert!(output.contains("outcome=\"timeout\""));
        assert!(
            output.contains("phone_exchange_duration_seconds_bucket"),
            "histogram must render _bucket lines"
        );
        assert!(output.contains("le=\"8\""), "timeout-sized bucket must exist");
    }

    #[test]
    fn record_config_fault_labels_the_fault() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_config_fault("missing_secret");

        let output = handle.render();
        assert!(output.contains("phone_exchange_config_faults_total"));
        assert!(output.contains("fault=\"missing_secret\""));
    }
}
