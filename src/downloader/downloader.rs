/*
 * rangecast - Concurrent multi-mirror HTTP range downloader.
 * Copyright (C) 2025  rangecast contributors
 */

//! The synchronous facade: a dedicated OS thread drives a `tokio` runtime
//! through initialization and all fetch loops, while the calling thread
//! blocks on `next_chunk` via the Consumer Gate's `Condvar` path.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bytes::Bytes;

use crate::config::DownloaderConfig;
use crate::error::DownloadResult;
use crate::logging::debug;

use super::core::{Core, Telemetry};
use super::gate;

/// A blocking handle onto one multi-mirror download.
pub struct Downloader {
    core: Arc<Core>,
    thread: Option<JoinHandle<()>>,
}

impl Downloader {
    /// Probe every mirror, assemble the scheduler state, and hand back a
    /// handle once initialization has either succeeded or failed. The
    /// background thread keeps running the fetch loops after this returns.
    pub fn open(urls: Vec<String>, config: DownloaderConfig) -> DownloadResult<Self> {
        let (tx, rx) = mpsc::channel();

        let thread = thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = tx.send(Err(crate::error::DownloadError::Runtime(e)));
                    return;
                }
            };

            runtime.block_on(async move {
                match Core::start(&urls, config).await {
                    Ok(core) => {
                        let for_workers = core.clone();
                        let _ = tx.send(Ok(core));
                        for_workers.run_to_completion().await;
                        debug!("all fetch loops exited");
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e));
                    }
                }
            });
        });

        let core = match rx.recv() {
            Ok(Ok(core)) => core,
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(crate::error::DownloadError::Incomplete),
        };

        Ok(Self {
            core,
            thread: Some(thread),
        })
    }

    /// Block until the next contiguous chunk is ready, `Ok(None)` once the
    /// resource is fully delivered, or an error if every mirror stalled out
    /// before completion.
    pub fn next_chunk(&self) -> DownloadResult<Option<Bytes>> {
        gate::next_chunk_blocking(&self.core)
    }

    /// Iterate remaining chunks, ending the iterator on completion or on
    /// the first error.
    pub fn chunks(&self) -> Chunks<'_> {
        Chunks { downloader: self }
    }

    pub fn telemetry(&self) -> DownloadResult<Telemetry> {
        self.core.telemetry()
    }
}

pub struct Chunks<'a> {
    downloader: &'a Downloader,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = DownloadResult<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.downloader.next_chunk() {
            Ok(Some(bytes)) => Some(Ok(bytes)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl Drop for Downloader {
    fn drop(&mut self) {
        self.core.shutdown();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
