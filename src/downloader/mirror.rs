/*
 * rangecast - Concurrent multi-mirror HTTP range downloader.
 * Copyright (C) 2025  rangecast contributors
 */

//! One long-lived HTTP session per mirror, plus the per-worker scheduler
//! state (`delay`, `prev`, `in_flight`) from the data model.

use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::RwLock;

use reqwest::Client;
use url::Url;

/// Sentinel meaning "no block currently in flight" for `in_flight`.
pub const NO_BLOCK: usize = usize::MAX;

/// A single mirror endpoint: its HTTP client, its (possibly redirected)
/// current URL, and the scheduler bookkeeping the coordinator needs for it.
pub struct Mirror {
    client: Client,
    /// Mutable: may be rewritten by redirect resolution during init.
    url: RwLock<Url>,
    /// Signed delay bias; higher means "pull from deeper in the queue".
    delay: AtomicI64,
    /// Value of the global `received` counter at this worker's last
    /// completion.
    prev: AtomicU64,
    /// Block id this worker is currently fetching, or `NO_BLOCK`.
    in_flight: AtomicUsize,
}

impl Mirror {
    pub fn new(client: Client, url: Url) -> Self {
        Self {
            client,
            url: RwLock::new(url),
            delay: AtomicI64::new(0),
            prev: AtomicU64::new(0),
            in_flight: AtomicUsize::new(NO_BLOCK),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn url(&self) -> Url {
        self.url.read().unwrap().clone()
    }

    pub fn set_url(&self, url: Url) {
        *self.url.write().unwrap() = url;
    }

    pub fn host(&self) -> String {
        self.url
            .read()
            .unwrap()
            .host_str()
            .unwrap_or("unknown")
            .to_string()
    }

    pub fn delay(&self) -> i64 {
        self.delay.load(Ordering::SeqCst)
    }

    pub fn set_delay(&self, value: i64) {
        self.delay.store(value, Ordering::SeqCst);
    }

    pub fn prev(&self) -> u64 {
        self.prev.load(Ordering::SeqCst)
    }

    pub fn set_prev(&self, value: u64) {
        self.prev.store(value, Ordering::SeqCst);
    }

    pub fn in_flight(&self) -> Option<usize> {
        match self.in_flight.load(Ordering::SeqCst) {
            NO_BLOCK => None,
            id => Some(id),
        }
    }

    pub fn set_in_flight(&self, block_id: usize) {
        self.in_flight.store(block_id, Ordering::SeqCst);
    }

    pub fn clear_in_flight(&self) {
        self.in_flight.store(NO_BLOCK, Ordering::SeqCst);
    }
}

/// All mirrors in the set, indexed by worker id `w`.
pub struct MirrorSet {
    mirrors: Vec<Mirror>,
}

impl MirrorSet {
    pub fn new(mirrors: Vec<Mirror>) -> Self {
        Self { mirrors }
    }

    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }

    pub fn get(&self, w: usize) -> &Mirror {
        &self.mirrors[w]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mirror> {
        self.mirrors.iter()
    }

    /// Smallest `delay[w]` across all mirrors.
    pub fn min_delay(&self) -> i64 {
        self.mirrors.iter().map(|m| m.delay()).min().unwrap_or(0)
    }

    /// Smallest block id any mirror currently has in flight, ignoring
    /// mirrors with nothing in flight.
    pub fn min_in_flight(&self) -> Option<usize> {
        self.mirrors.iter().filter_map(|m| m.in_flight()).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mirror(url: &str) -> Mirror {
        Mirror::new(Client::new(), Url::parse(url).unwrap())
    }

    #[test]
    fn min_delay_across_mirrors() {
        let set = MirrorSet::new(vec![mirror("http://a/"), mirror("http://b/")]);
        set.get(0).set_delay(5);
        set.get(1).set_delay(-2);
        assert_eq!(set.min_delay(), -2);
    }

    #[test]
    fn min_in_flight_ignores_idle_mirrors() {
        let set = MirrorSet::new(vec![mirror("http://a/"), mirror("http://b/")]);
        assert_eq!(set.min_in_flight(), None);
        set.get(0).set_in_flight(7);
        set.get(1).set_in_flight(3);
        assert_eq!(set.min_in_flight(), Some(3));
    }

    #[test]
    fn set_url_rewrites_for_redirects() {
        let m = mirror("http://a/file");
        m.set_url(Url::parse("https://b/file").unwrap());
        assert_eq!(m.url().as_str(), "https://b/file");
    }
}
