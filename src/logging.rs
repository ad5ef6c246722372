// ==========================================
// College ERP - Logging
// ==========================================
// tracing + tracing-subscriber, filtered by RUST_LOG.
// ERP_LOG_FORMAT=json switches to one JSON object per line.
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber.
///
/// # Environment
/// - RUST_LOG: filter directives (default: info),
///   e.g. `RUST_LOG=college_erp=debug,tower_http=info`
/// - ERP_LOG_FORMAT: `json` for structured output
///
/// # Example
/// ```no_run
/// use college_erp::logging;
/// logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("ERP_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Subscriber for tests: debug level, captured by the test harness.
/// Safe to call more than once.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
