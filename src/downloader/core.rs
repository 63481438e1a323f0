/*
 * rangecast - Concurrent multi-mirror HTTP range downloader.
 * Copyright (C) 2025  rangecast contributors
 */

//! The single state machine both public facades wrap: owns every
//! component named in the data model, drives the per-mirror fetch loops,
//! and exposes the wake-up primitives the Consumer Gate waits on.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::future::join_all;

use crate::config::DownloaderConfig;
use crate::error::{DownloadError, DownloadResult};

use super::assembly::AssemblyBuffer;
use super::init;
use super::mirror::MirrorSet;
use super::queue::PendingQueue;
use super::resource::ResourceDescriptor;
use super::scheduler::{Scheduler, SchedulerConfig};
use super::worker;

/// A single send or receive event, timestamped relative to the download
/// start, for the telemetry surface named in the data model.
#[derive(Debug, Clone)]
pub struct TelemetryEntry {
    pub elapsed: Duration,
    pub block_id: usize,
    pub mirror_host: String,
}

/// The `send_log`/`recv_log` pair exposed once a download completes.
#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    pub send_log: Vec<TelemetryEntry>,
    pub recv_log: Vec<TelemetryEntry>,
}

pub struct Core {
    resource: ResourceDescriptor,
    mirrors: MirrorSet,
    queue: PendingQueue,
    assembly: AssemblyBuffer,
    scheduler: Scheduler,

    started_at: Instant,
    received: AtomicU64,
    active_workers: AtomicUsize,
    shutdown: AtomicBool,

    send_log: Mutex<Vec<TelemetryEntry>>,
    recv_log: Mutex<Vec<TelemetryEntry>>,

    generation: Mutex<u64>,
    condvar: Condvar,
    notify: tokio::sync::Notify,
}

impl Core {
    /// Run initialization (HEAD probes, delay priming) and assemble the
    /// core state machine, ready for `run_to_completion`.
    pub async fn start(urls: &[String], config: DownloaderConfig) -> DownloadResult<Arc<Self>> {
        let init::InitResult { resource, mirrors } = init::initialize(urls, &config).await?;
        let num_workers = mirrors.len();

        let scheduler = Scheduler::new(SchedulerConfig {
            dynamic_block_selection: config.dynamic_block_num_selection,
            duplicate_request: config.duplicate_request,
            threshold: config.threshold,
        });

        Ok(Arc::new(Self {
            queue: PendingQueue::new(resource.num_blocks()),
            assembly: AssemblyBuffer::new(resource.num_blocks()),
            resource,
            mirrors,
            scheduler,
            started_at: Instant::now(),
            received: AtomicU64::new(0),
            active_workers: AtomicUsize::new(num_workers),
            shutdown: AtomicBool::new(false),
            send_log: Mutex::new(Vec::new()),
            recv_log: Mutex::new(Vec::new()),
            generation: Mutex::new(0),
            condvar: Condvar::new(),
            notify: tokio::sync::Notify::new(),
        }))
    }

    pub fn resource(&self) -> &ResourceDescriptor {
        &self.resource
    }

    pub fn mirrors(&self) -> &MirrorSet {
        &self.mirrors
    }

    pub fn queue(&self) -> &PendingQueue {
        &self.queue
    }

    pub fn assembly(&self) -> &AssemblyBuffer {
        &self.assembly
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::SeqCst)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Flip the shutdown flag fetch loops poll between blocks. Does not
    /// interrupt a request already in flight.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.wake_consumer();
    }

    pub fn record_send(&self, block_id: usize, mirror_host: String) {
        self.send_log.lock().unwrap().push(TelemetryEntry {
            elapsed: self.started_at.elapsed(),
            block_id,
            mirror_host,
        });
    }

    pub fn record_recv(&self, block_id: usize, mirror_host: String) {
        self.recv_log.lock().unwrap().push(TelemetryEntry {
            elapsed: self.started_at.elapsed(),
            block_id,
            mirror_host,
        });
    }

    /// Deposit a successfully fetched block: fill the Assembly Buffer, run
    /// the per-worker delay update, clear the worker's in-flight marker,
    /// and wake the consumer.
    pub fn deposit(&self, w: usize, block_id: usize, bytes: Bytes) {
        self.assembly.try_fill(block_id, bytes);
        let received_before = self.received.fetch_add(1, Ordering::SeqCst);
        self.scheduler.record_completion(w, &self.mirrors, received_before);
        self.mirrors.get(w).clear_in_flight();
        self.wake_consumer();
    }

    /// A block's fetch failed: push it back to the queue head so another
    /// mirror can pick it up, and clear the failing worker's in-flight
    /// marker. The worker that owned it is expected to exit its loop
    /// permanently afterward.
    pub fn fail_block(&self, w: usize, block_id: usize, _error: DownloadError) {
        self.queue.push_front(block_id);
        self.mirrors.get(w).clear_in_flight();
    }

    pub fn retire_worker(&self) {
        self.active_workers.fetch_sub(1, Ordering::SeqCst);
        self.wake_consumer();
    }

    /// Bump the generation counter and wake both the sync (Condvar) and
    /// async (Notify) consumer facades.
    pub fn wake_consumer(&self) {
        {
            let mut gen = self.generation.lock().unwrap();
            *gen = gen.wrapping_add(1);
        }
        self.condvar.notify_all();
        self.notify.notify_one();
    }

    pub fn generation(&self) -> u64 {
        *self.generation.lock().unwrap()
    }

    /// Block the calling thread until `wake_consumer` has bumped the
    /// generation counter past `seen`.
    pub fn wait_for_generation_past(&self, seen: u64) {
        let mut gen = self.generation.lock().unwrap();
        while *gen == seen {
            gen = self.condvar.wait(gen).unwrap();
        }
    }

    pub async fn notified(&self) {
        self.notify.notified().await;
    }

    /// Drive every mirror's fetch loop to exhaustion. Consumed by both
    /// facades, each on its own executor.
    pub async fn run_to_completion(self: Arc<Self>) {
        let workers = (0..self.mirrors.len()).map(|w| {
            let core = self.clone();
            async move { worker::run(w, &core).await }
        });
        join_all(workers).await;
    }

    /// Telemetry accessor. Errors with `NotComplete` until the assembly
    /// buffer has delivered every block.
    pub fn telemetry(&self) -> DownloadResult<Telemetry> {
        if !self.assembly.is_complete() {
            return Err(DownloadError::NotComplete);
        }
        Ok(Telemetry {
            send_log: self.send_log.lock().unwrap().clone(),
            recv_log: self.recv_log.lock().unwrap().clone(),
        })
    }
}
