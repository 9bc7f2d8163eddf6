//! Counter metrics

/// A connection attempt started (cache miss)
pub fn connection_attempted() {
    ::metrics::counter!("influxdb_producer_connection_attempts_total").increment(1);
}

/// A connection was verified and cached
pub fn connection_established() {
    ::metrics::counter!("influxdb_producer_connections_established_total").increment(1);
}

/// A connection attempt failed
pub fn connection_failed(reason: &'static str) {
    ::metrics::counter!("influxdb_producer_connection_failures_total", "reason" => reason)
        .increment(1);
}

/// `connection()` was served from the cache
pub fn cache_hit() {
    ::metrics::counter!("influxdb_producer_cache_hits_total").increment(1);
}
