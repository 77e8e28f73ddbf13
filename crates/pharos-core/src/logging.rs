//! Structured logging setup with `tracing`.
//!
//! Flow operations log at their boundaries (captures started/finished,
//! steps appended, aggregation passes); this module only wires up the
//! subscriber. Context such as the flow name and step id is carried on the
//! events themselves, not via globals.

/// Initialize the global tracing subscriber with stderr output only.
///
/// Call once at application startup. Subsequent calls are no-ops.
/// The subscriber writes human-readable output to stderr.
///
/// # Arguments
///
/// * `level` - Minimum log level to display. Defaults to `"warn"` when the
///   `RUST_LOG` env var is unset.
pub fn init_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // try_init is a no-op if a subscriber is already set
    if subscriber.try_init().is_ok() {
        tracing::debug!(level, "tracing subscriber initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_subscriber_is_idempotent() {
        init_subscriber("debug");
        init_subscriber("warn");
    }

    #[test]
    fn events_emit_after_init() {
        init_subscriber("debug");
        tracing::debug!(component = "logging", "event dispatch works");
    }
}
