/*
 * rangecast - Concurrent multi-mirror HTTP range downloader.
 * Copyright (C) 2025  rangecast contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 */

//! Logging and observability with tracing support.

use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system
pub fn init() {
    init_with_level("info")
}

/// Initialize logging with a specific level
pub fn init_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .init();
}

/// Initialize logging with optional file output
pub fn init_with_file(level: &str, log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        if let Ok(file) = std::fs::OpenOptions::new().create(true).append(true).open(path) {
            let file_layer = fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact())
                .with(file_layer)
                .init();

            return;
        }
    }

    init_with_level(level);
}

/// Log macros re-exported for convenience
pub use tracing::{debug, error, info, trace, warn};

#[macro_export]
macro_rules! span_download {
    ($url:expr) => {
        tracing::info_span!("download", url = $url)
    };
}
