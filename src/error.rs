/*
 * rangecast - Concurrent multi-mirror HTTP range downloader.
 * Copyright (C) 2025  rangecast contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 */

//! Error taxonomy for initialization, per-request, and telemetry failures.

use thiserror::Error;

/// Errors this crate can raise.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// A HEAD request returned a non-200, non-redirect status during
    /// initialization. Fatal to construction.
    #[error("HEAD request to {url} returned status {status}")]
    HeadStatus { url: String, status: u16 },

    /// Mirrors disagree on `Content-Length`. Fatal to construction.
    #[error("mirrors report different file sizes")]
    FileSize,

    /// A range GET returned a non-206 status. Non-fatal: the worker
    /// requeues the block and exits its own loop.
    #[error("range request to {url} returned status {status}")]
    DownloaderStatus { url: String, status: u16 },

    /// A transport-level failure (connection reset, timeout, DNS, TLS) on a
    /// range GET. Handled identically to `DownloaderStatus`.
    #[error("transport error talking to {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Telemetry requested before the download has begun.
    #[error("download has not started")]
    NotStarted,

    /// Telemetry or completion-only state requested before all blocks were
    /// delivered.
    #[error("download has not completed")]
    NotComplete,

    /// Every mirror's fetch loop exited (normally or on error) while blocks
    /// remained undelivered: the consumer would otherwise wait forever.
    #[error("no mirrors remain active and the download is incomplete")]
    Incomplete,

    /// Building the underlying HTTP client failed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// A mirror URL failed to parse.
    #[error("invalid mirror URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The mirror set passed to the constructor was empty.
    #[error("at least one mirror URL is required")]
    NoMirrors,

    /// The sync facade's background `tokio` runtime failed to start.
    #[error("failed to start background runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

pub type DownloadResult<T> = std::result::Result<T, DownloadError>;
