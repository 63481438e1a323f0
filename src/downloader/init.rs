/*
 * rangecast - Concurrent multi-mirror HTTP range downloader.
 * Copyright (C) 2025  rangecast contributors
 */

//! Initialization: open one session per mirror, HEAD-probe each (following
//! redirects when permitted), assert agreement on `Content-Length`, and
//! prime each mirror's initial delay bias from relative HEAD latency.

use std::time::{Duration, Instant};

use futures::future::join_all;
use reqwest::{redirect::Policy, Client, StatusCode};
use url::Url;

use crate::config::DownloaderConfig;
use crate::error::{DownloadError, DownloadResult};

use super::mirror::{Mirror, MirrorSet};
use super::resource::ResourceDescriptor;
use super::scheduler::initial_delay;

const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

fn build_client(config: &DownloaderConfig) -> DownloadResult<Client> {
    Client::builder()
        .redirect(Policy::none())
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .build()
        .map_err(DownloadError::ClientBuild)
}

/// One HEAD probe's outcome: the resource length it reported and the
/// wall-clock round-trip it took.
struct HeadProbe {
    length: u64,
    rtt: Duration,
}

async fn head_with_redirects(
    client: &Client,
    url: &Url,
    allow_redirects: bool,
) -> DownloadResult<(HeadProbe, Url)> {
    let mut current = url.clone();

    loop {
        let begin = Instant::now();
        let resp = client
            .head(current.clone())
            .send()
            .await
            .map_err(|e| DownloadError::Transport {
                url: current.to_string(),
                source: e,
            })?;
        let status = resp.status();

        if status == StatusCode::OK {
            let length = resp
                .headers()
                .get(reqwest::header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .ok_or(DownloadError::HeadStatus {
                    url: current.to_string(),
                    status: status.as_u16(),
                })?;
            let rtt = begin.elapsed();
            return Ok((HeadProbe { length, rtt }, current));
        }

        if allow_redirects && REDIRECT_STATUSES.contains(&status.as_u16()) {
            let location = resp
                .headers()
                .get(reqwest::header::LOCATION)
                .or_else(|| resp.headers().get("uri"))
                .and_then(|v| v.to_str().ok())
                .ok_or(DownloadError::HeadStatus {
                    url: current.to_string(),
                    status: status.as_u16(),
                })?;

            current = resolve_redirect(&current, location)?;
            continue;
        }

        return Err(DownloadError::HeadStatus {
            url: current.to_string(),
            status: status.as_u16(),
        });
    }
}

/// Resolve a `Location` header against the URL that produced it: absolute
/// locations replace the URL outright, relative ones replace only the path.
fn resolve_redirect(current: &Url, location: &str) -> DownloadResult<Url> {
    if let Ok(absolute) = Url::parse(location) {
        return Ok(absolute);
    }
    let mut rewritten = current.clone();
    rewritten.set_path(location);
    Ok(rewritten)
}

/// Result of successful initialization: the resource descriptor and the
/// fully-primed mirror set.
pub struct InitResult {
    pub resource: ResourceDescriptor,
    pub mirrors: MirrorSet,
}

pub async fn initialize(urls: &[String], config: &DownloaderConfig) -> DownloadResult<InitResult> {
    if urls.is_empty() {
        return Err(DownloadError::NoMirrors);
    }

    let parsed: Vec<Url> = urls
        .iter()
        .map(|u| {
            Url::parse(u).map_err(|source| DownloadError::InvalidUrl {
                url: u.clone(),
                source,
            })
        })
        .collect::<DownloadResult<_>>()?;

    // One client, i.e. one long-lived session, per mirror (spec §4.1 step 1:
    // "Open one HTTP session per mirror in parallel"). Each gets its own
    // connection pool rather than sharing one across hosts.
    let clients: Vec<Client> = parsed.iter().map(|_| build_client(config)).collect::<DownloadResult<_>>()?;

    let probes = join_all(
        parsed
            .iter()
            .zip(clients.iter())
            .map(|(url, client)| head_with_redirects(client, url, config.allow_redirects)),
    )
    .await
    .into_iter()
    .collect::<DownloadResult<Vec<_>>>()?;

    let lengths: Vec<u64> = probes.iter().map(|(p, _)| p.length).collect();
    let first = lengths[0];
    if !lengths.iter().all(|&l| l == first) {
        return Err(DownloadError::FileSize);
    }

    let rtts: Vec<f64> = probes
        .iter()
        .map(|(p, _)| p.rtt.as_secs_f64())
        .collect();
    let d_min = rtts.iter().cloned().fold(f64::INFINITY, f64::min);

    let mirrors: Vec<Mirror> = probes
        .into_iter()
        .zip(clients.into_iter())
        .zip(rtts.iter())
        .map(|(((_, resolved_url), client), &d_w)| {
            let mirror = Mirror::new(client, resolved_url);
            mirror.set_delay(initial_delay(
                d_w,
                d_min,
                config.initial_delay_coefficient,
                config.initial_delay_prediction,
            ));
            mirror
        })
        .collect();

    Ok(InitResult {
        resource: ResourceDescriptor::new(first, config.split_size),
        mirrors: MirrorSet::new(mirrors),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_location_replaces_url_outright() {
        let current = Url::parse("http://m1.example/file").unwrap();
        let resolved = resolve_redirect(&current, "https://m2.example/file").unwrap();
        assert_eq!(resolved.as_str(), "https://m2.example/file");
    }

    #[test]
    fn relative_location_replaces_only_the_path() {
        let current = Url::parse("http://m1.example:8080/old/path").unwrap();
        let resolved = resolve_redirect(&current, "/new/path").unwrap();
        assert_eq!(resolved.as_str(), "http://m1.example:8080/new/path");
    }
}
