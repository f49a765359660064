use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static ACTIVE_FILTER: OnceCell<String> = OnceCell::new();

/// Installs the global fmt subscriber. `RUST_LOG` wins over `filter` when
/// set. If another subscriber is already installed this does nothing.
pub fn init_tracing(filter: &str) {
    ACTIVE_FILTER.get_or_init(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
        let active = env_filter.to_string();
        let _ = fmt().with_env_filter(env_filter).try_init();
        active
    });
}

/// The filter the first [`init_tracing`] call settled on.
pub fn active_log_filter() -> Option<&'static str> {
    ACTIVE_FILTER.get().map(String::as_str)
}
