//! Logging setup and event macros.
//!
//! Output is a compact `HH:MM:SS.mmm LEVEL target: [component] event: detail`
//! line on stderr. Levels come from `[logging]` in the settings file:
//!
//! ```toml
//! [logging]
//! default = "warn"
//!
//! [logging.modules]
//! "docname::watcher" = "debug"
//! ```
//!
//! `RUST_LOG` takes precedence over the settings:
//! ```bash
//! RUST_LOG=docname::index=debug docname list
//! ```

use std::sync::Once;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// Compact time format: HH:MM:SS.mmm
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Filter directives for a config, raised to at least `min_level` if given.
///
/// `min_level` comes from repeated `-v` flags on the command line.
pub fn filter_directives(config: &LoggingConfig, min_level: Option<&str>) -> String {
    let default = match min_level {
        Some(level) if level_rank(level) > level_rank(&config.default) => level,
        _ => config.default.as_str(),
    };

    let mut modules: Vec<(&String, &String)> = config.modules.iter().collect();
    modules.sort();

    let mut directives = default.to_string();
    for (module, level) in modules {
        directives.push_str(&format!(",{module}={level}"));
    }
    directives
}

fn level_rank(level: &str) -> u8 {
    match level.to_ascii_lowercase().as_str() {
        "off" => 0,
        "error" => 1,
        "warn" => 2,
        "info" => 3,
        "debug" => 4,
        "trace" => 5,
        _ => 2,
    }
}

/// Install the global subscriber.
///
/// Only the first call takes effect, so tests and the binary can both call it.
pub fn init_with_config(config: &LoggingConfig, min_level: Option<&str>) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(filter_directives(config, min_level))
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_timer(CompactTime)
            .with_level(true)
            .with_filter(filter);

        // Another subscriber may already be installed (e.g. by a test harness)
        let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
    });
}

/// Log an event with component context.
///
/// # Examples
/// ```ignore
/// log_event!("index", "renamed", "{from} -> {to}");
/// log_event!("repository", "switched");
/// ```
#[macro_export]
macro_rules! log_event {
    ($component:expr, $event:expr) => {
        tracing::info!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::info!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

/// Debug-only event logging.
///
/// # Examples
/// ```ignore
/// debug_event!("watcher", "changes", "+{added} -{removed}");
/// ```
#[macro_export]
macro_rules! debug_event {
    ($component:expr, $event:expr) => {
        tracing::debug!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::debug!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives() {
        let mut config = LoggingConfig::default();
        config.modules.insert("docname::watcher".to_string(), "trace".to_string());
        config.modules.insert("docname::index".to_string(), "debug".to_string());

        assert_eq!(
            filter_directives(&config, None),
            "warn,docname::index=debug,docname::watcher=trace"
        );
        assert!(filter_directives(&config, Some("debug")).starts_with("debug,"));
        // A quieter CLI level never lowers the configured one
        assert!(filter_directives(&config, Some("error")).starts_with("warn,"));
    }
}
