// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Structured Logging
//!
//! Installs the global `tracing` subscriber, pretty-printed or as JSON lines,
//! filtered by `RUST_LOG` when set.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info,enclave_bridge=debug";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output for local development.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// `"json"` (any case) selects JSON; anything else is pretty.
    pub fn from_str_lossy(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed, so embedding
/// applications that configure their own logging are left alone.
pub fn init_logging(default_filter: &str, format: LogFormat) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let installed = match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true).with_line_number(true))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_target(true))
            .try_init(),
    }
    .is_ok();

    if installed {
        tracing::info!(format = ?format, "Logging initialized");
    }
    installed
}
