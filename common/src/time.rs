use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch, as the platform stores every timestamp.
pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
