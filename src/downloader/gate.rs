/*
 * rangecast - Concurrent multi-mirror HTTP range downloader.
 * Copyright (C) 2025  rangecast contributors
 */

//! The Consumer Gate: turns the Assembly Buffer's drained prefix into the
//! blocking (sync facade) and awaitable (async facade) `next_chunk`
//! primitives described in the data model.

use bytes::Bytes;

use crate::error::{DownloadError, DownloadResult};

use super::core::Core;

/// Blocking variant for the sync facade: parks the calling thread on a
/// `Condvar` between progress events. The generation is captured *before*
/// re-checking state so a wake-up that lands between the check and the
/// park is never missed.
pub fn next_chunk_blocking(core: &Core) -> DownloadResult<Option<Bytes>> {
    loop {
        let seen = core.generation();

        let chunk = core.assembly().drain_prefix();
        if !chunk.is_empty() {
            return Ok(Some(chunk));
        }
        if core.assembly().is_complete() {
            return Ok(None);
        }
        if core.active_workers() == 0 {
            return Err(DownloadError::Incomplete);
        }

        core.wait_for_generation_past(seen);
    }
}

/// Async variant for the async-native facade: awaits a `tokio::sync::Notify`
/// permit instead of parking a thread.
pub async fn next_chunk_async(core: &Core) -> DownloadResult<Option<Bytes>> {
    loop {
        let chunk = core.assembly().drain_prefix();
        if !chunk.is_empty() {
            return Ok(Some(chunk));
        }
        if core.assembly().is_complete() {
            return Ok(None);
        }
        if core.active_workers() == 0 {
            return Err(DownloadError::Incomplete);
        }

        core.notified().await;
    }
}
