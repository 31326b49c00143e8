use tracing_subscriber::{EnvFilter, fmt};

use crate::app::AppError;

/// Our crates and desktop alerts at info; dependencies (actix, rustls, reqwest) only warn.
const DEFAULT_DIRECTIVES: &str = "warn,quarry_console=info,quarry_export=info,desktop_notification=info";

pub fn init() -> Result<(), AppError> {
    let filter = filter_from(|key| std::env::var(key).ok());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(AppError::logging_init)
}

/// `QUARRY_LOG` wins over `RUST_LOG`; unparsable directives fall back to the defaults.
fn filter_from(lookup: impl Fn(&str) -> Option<String>) -> EnvFilter {
    ["QUARRY_LOG", "RUST_LOG"]
        .into_iter()
        .filter_map(|key| lookup(key).filter(|value| !value.trim().is_empty()))
        .find_map(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}
