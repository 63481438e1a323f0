/*
 * rangecast - Concurrent multi-mirror HTTP range downloader.
 * Copyright (C) 2025  rangecast contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 */

//! Downloads a single byte-identical resource mirrored across multiple HTTP
//! hosts by racing concurrent Range requests and reassembling the byte
//! stream in order, exposed as either a blocking iterator of chunks
//! ([`Downloader`]) or an async [`Stream`](futures::Stream)
//! ([`AsyncDownloader`]).

pub mod config;
pub mod downloader;
pub mod error;
pub mod logging;

pub use config::{Config, DownloaderConfig, LoggingConfig};
pub use downloader::{AsyncDownloader, ChunkStream, Chunks, Downloader, ResourceDescriptor, Telemetry, TelemetryEntry};
pub use error::{DownloadError, DownloadResult};
