/*
 * rangecast - Concurrent multi-mirror HTTP range downloader.
 * Copyright (C) 2025  rangecast contributors
 */

//! The async-native facade: runs entirely on the caller's executor, with
//! no dedicated OS thread and no cross-thread wake-up hop.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;

use crate::config::DownloaderConfig;
use crate::error::DownloadResult;

use super::core::{Core, Telemetry};
use super::gate;

/// An async handle onto one multi-mirror download. Fetch loops are spawned
/// as tasks on the caller's runtime; dropping the last clone of the
/// returned stream/handle does not cancel them (see `shutdown`).
pub struct AsyncDownloader {
    core: Arc<Core>,
}

impl AsyncDownloader {
    /// Probe every mirror and spawn the fetch loops on the current `tokio`
    /// runtime. Must be called from within one.
    pub async fn open(urls: Vec<String>, config: DownloaderConfig) -> DownloadResult<Self> {
        let core = Core::start(&urls, config).await?;
        let workers = core.clone();
        tokio::spawn(async move {
            workers.run_to_completion().await;
        });
        Ok(Self { core })
    }

    pub async fn next_chunk(&self) -> DownloadResult<Option<Bytes>> {
        gate::next_chunk_async(&self.core).await
    }

    pub fn telemetry(&self) -> DownloadResult<Telemetry> {
        self.core.telemetry()
    }

    /// Flip the shutdown flag the fetch loops poll between blocks.
    pub fn shutdown(&self) {
        self.core.shutdown();
    }

    /// Turn this handle into a `Stream` of delivered chunks.
    pub fn into_stream(self) -> ChunkStream {
        ChunkStream {
            core: self.core,
            pending: None,
        }
    }
}

type ChunkFuture = Pin<Box<dyn Future<Output = DownloadResult<Option<Bytes>>> + Send>>;

/// `Stream` adapter over [`AsyncDownloader::next_chunk`].
pub struct ChunkStream {
    core: Arc<Core>,
    pending: Option<ChunkFuture>,
}

impl Stream for ChunkStream {
    type Item = DownloadResult<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.pending.is_none() {
                let core = this.core.clone();
                this.pending = Some(Box::pin(async move { gate::next_chunk_async(&core).await }));
            }

            let poll = this.pending.as_mut().unwrap().as_mut().poll(cx);
            match poll {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(result) => {
                    this.pending = None;
                    return match result {
                        Ok(Some(bytes)) => Poll::Ready(Some(Ok(bytes))),
                        Ok(None) => Poll::Ready(None),
                        Err(e) => Poll::Ready(Some(Err(e))),
                    };
                }
            }
        }
    }
}
