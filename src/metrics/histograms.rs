//! Histogram metrics

/// Time from cache miss to a verified connection
pub fn connect_duration(duration_ms: u64) {
    ::metrics::histogram!("influxdb_producer_connect_duration_ms").record(duration_ms as f64);
}
