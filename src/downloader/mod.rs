/*
 * rangecast - Concurrent multi-mirror HTTP range downloader.
 * Copyright (C) 2025  rangecast contributors
 */

//! Concurrent multi-mirror HTTP range downloads: one fetch loop per mirror
//! races delay-biased block selection against a shared pending queue,
//! depositing into an assembly buffer that a consumer gate drains in
//! strict block order.

mod assembly;
mod async_downloader;
mod core;
mod downloader;
mod gate;
mod init;
mod mirror;
mod queue;
mod resource;
mod scheduler;
mod worker;

pub use async_downloader::{AsyncDownloader, ChunkStream};
pub use core::{Telemetry, TelemetryEntry};
pub use downloader::{Chunks, Downloader};
pub use resource::ResourceDescriptor;
