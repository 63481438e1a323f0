/*
 * rangecast - Concurrent multi-mirror HTTP range downloader.
 * Copyright (C) 2025  rangecast contributors
 */

//! The per-mirror fetch loop: pull a block, issue the Range GET, deposit
//! into the Assembly Buffer, update delay bias, repeat until the queue is
//! exhausted or a request fails.

use reqwest::{header, StatusCode};

use crate::error::DownloadError;
use crate::logging::{debug, warn};

use super::core::Core;

/// Run mirror `w`'s fetch loop to completion. Always decrements the active
/// worker count and wakes the consumer exactly once on the way out,
/// regardless of whether the loop ended by exhaustion or by error.
pub async fn run(w: usize, core: &Core) {
    loop {
        if core.is_shutting_down() {
            break;
        }

        core.scheduler()
            .maybe_duplicate(w, core.mirrors(), core.queue(), core.assembly());

        let Some(block_id) = core
            .scheduler()
            .select_block(w, core.mirrors(), core.queue())
        else {
            break;
        };

        let mirror = core.mirrors().get(w);
        let range = core.resource().range_header(block_id);
        let url = mirror.url();

        core.record_send(block_id, mirror.host());

        let outcome = mirror
            .client()
            .get(url.clone())
            .header(header::RANGE, range)
            .send()
            .await;

        let response = match outcome {
            Ok(resp) => resp,
            Err(source) => {
                warn!(url = %url, "range request failed: {source}");
                core.fail_block(
                    w,
                    block_id,
                    DownloadError::Transport {
                        url: url.to_string(),
                        source,
                    },
                );
                break;
            }
        };

        if response.status() != StatusCode::PARTIAL_CONTENT {
            let status = response.status().as_u16();
            warn!(url = %url, status, "range request returned non-206 status");
            core.fail_block(
                w,
                block_id,
                DownloadError::DownloaderStatus {
                    url: url.to_string(),
                    status,
                },
            );
            break;
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(source) => {
                warn!(url = %url, "failed reading response body: {source}");
                core.fail_block(
                    w,
                    block_id,
                    DownloadError::Transport {
                        url: url.to_string(),
                        source,
                    },
                );
                break;
            }
        };

        debug!(block_id, host = %mirror.host(), len = bytes.len(), "block delivered");
        core.record_recv(block_id, mirror.host());
        core.deposit(w, block_id, bytes);
    }

    core.retire_worker();
}
