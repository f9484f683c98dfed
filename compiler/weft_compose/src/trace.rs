//! Tracing setup and level-parameterized logging.

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Environment variable holding the tracing filter directives.
pub const LOG_FILTER_VAR: &str = "WEFT_LOG";

/// Install a global subscriber if `WEFT_LOG` is set.
///
/// Spans nest the way composition does (factory, registration, synthesis),
/// so output goes through a hierarchical layer. Safe to call repeatedly;
/// only the first call installs anything, and an already-installed global
/// subscriber is left alone.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{prelude::*, EnvFilter};

        if std::env::var(LOG_FILTER_VAR).is_ok() {
            let filter = EnvFilter::from_env(LOG_FILTER_VAR);
            let _ = tracing_subscriber::registry()
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_bracketed_fields(true),
                )
                .with(filter)
                .try_init();
        }
    });
}

/// Emit an event at a level chosen at runtime.
///
/// `tracing` macros take their level as a constant; the configured
/// composition log level is not one.
macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {{
        let level: tracing::Level = $level;
        if level == tracing::Level::ERROR {
            tracing::error!($($arg)+);
        } else if level == tracing::Level::WARN {
            tracing::warn!($($arg)+);
        } else if level == tracing::Level::INFO {
            tracing::info!($($arg)+);
        } else if level == tracing::Level::DEBUG {
            tracing::debug!($($arg)+);
        } else {
            tracing::trace!($($arg)+);
        }
    }};
}

pub(crate) use log_at;
