//! Label values for failure reasons

/// TLS client configuration could not be built
pub const REASON_TLS_CONFIG: &str = "tls_config";
/// Dial failed
pub const REASON_DIAL: &str = "dial";
/// Liveness probe failed
pub const REASON_PROBE: &str = "probe";
/// Authorization listing could not be fetched
pub const REASON_INTROSPECTION: &str = "introspection";
/// Token lacks required permissions
pub const REASON_PERMISSION: &str = "permission";
