//! Log subscriber setup.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "askdoc=info,askdoc_cli=info,askdoc_rag=info";

/// Install the global subscriber, writing to stderr so answers stay on stdout.
///
/// Respects `RUST_LOG`; falls back to [`DEFAULT_FILTER`].
pub fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    if json {
        builder.with_target(true).json().init();
    } else {
        builder.with_target(false).compact().init();
    }
}
