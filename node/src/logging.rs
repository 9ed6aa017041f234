//! # Logging
//!
//! One-call tracing setup for the node binary. Format and default
//! verbosity come from the CLI; a `RUST_LOG` environment variable wins
//! over both when set.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Output shape for the node's logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Colored human output for a terminal.
    Pretty,
    /// One JSON object per line, for log shippers.
    Json,
}

impl LogFormat {
    /// Maps a CLI string onto a format. Anything that is not `json`
    /// (case-insensitive) falls back to `Pretty`, so a typo in
    /// `--log-format` degrades the output instead of aborting the node.
    pub fn from_str_lossy(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Installs the global tracing subscriber. Panics if called twice, which
/// is why only `main` calls it.
///
/// `default_directives` takes the usual `EnvFilter` syntax, e.g.
/// `verdant_node=debug,verdant_ledger=info,tower_http=debug`, and applies
/// only when `RUST_LOG` is absent.
pub fn init_logging(default_directives: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    let base = fmt::layer().with_target(true);
    let output = match format {
        LogFormat::Pretty => base.with_file(true).with_line_number(true).boxed(),
        LogFormat::Json => base.json().boxed(),
    };

    tracing_subscriber::registry().with(filter).with(output).init();

    tracing::info!(?format, "logging ready");
}
