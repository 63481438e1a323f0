/*
 * rangecast - Concurrent multi-mirror HTTP range downloader.
 * Copyright (C) 2025  rangecast contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 */

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use rangecast::{Config, DownloadError, Downloader, DownloaderConfig};

const VERSION: &str = "0.1.0";

#[derive(Parser)]
#[command(name = "rangecast")]
#[command(author = "rangecast contributors")]
#[command(version = VERSION)]
#[command(about = "Fetch a resource mirrored across multiple HTTP hosts via concurrent Range requests.")]
struct Cli {
    /// Mirror URL serving the same resource (repeatable).
    #[arg(long = "url", required = true)]
    urls: Vec<String>,

    /// Bytes per block.
    #[arg(long)]
    split_size: Option<u64>,

    /// invalid_block_count threshold past which duplication is considered.
    #[arg(long)]
    threshold: Option<usize>,

    /// Disable duplicating stalled blocks onto faster mirrors.
    #[arg(long)]
    no_duplicate: bool,

    /// Always pull from the queue head instead of delay-biased positions.
    #[arg(long)]
    no_dynamic_selection: bool,

    /// Do not follow HEAD redirects.
    #[arg(long)]
    no_redirects: bool,

    /// Output file path, or `-` for stdout. Defaults to the first URL's
    /// final path segment.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn default_output_name(url: &str) -> PathBuf {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("rangecast.out"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    rangecast::logging::init_with_level(level);

    let mut downloader_config = Config::load().downloader;
    if let Some(split_size) = cli.split_size {
        downloader_config.split_size = split_size;
    }
    if let Some(threshold) = cli.threshold {
        downloader_config.threshold = threshold;
    }
    if cli.no_duplicate {
        downloader_config.duplicate_request = false;
    }
    if cli.no_dynamic_selection {
        downloader_config.dynamic_block_num_selection = false;
    }
    if cli.no_redirects {
        downloader_config.allow_redirects = false;
    }

    run(cli.urls, downloader_config, cli.output)
}

fn run(urls: Vec<String>, config: DownloaderConfig, output: Option<PathBuf>) -> Result<()> {
    let output_path = output.unwrap_or_else(|| default_output_name(&urls[0]));
    let to_stdout = output_path.as_os_str() == "-";

    let spinner_style = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.cyan} {msg}")?;
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style);
    pb.set_message("probing mirrors...");
    pb.enable_steady_tick(Duration::from_millis(80));

    let downloader = match Downloader::open(urls, config) {
        Ok(d) => d,
        Err(e) => {
            pb.finish_and_clear();
            return Err(map_open_error(e));
        }
    };
    pb.set_message("downloading...");

    let mut sink: Box<dyn Write> = if to_stdout {
        pb.finish_and_clear();
        Box::new(io::stdout())
    } else {
        Box::new(File::create(&output_path).with_context(|| {
            format!("failed to create output file {}", output_path.display())
        })?)
    };

    let mut total = 0u64;
    for chunk in downloader.chunks() {
        let chunk = chunk.map_err(|e| anyhow!("download failed: {e}"))?;
        total += chunk.len() as u64;
        sink.write_all(&chunk)?;
        if !to_stdout {
            pb.set_message(format!("{} downloaded", human_bytes(total)));
        }
    }
    sink.flush()?;

    if !to_stdout {
        pb.finish_and_clear();
        println!(
            "{} wrote {} to {}",
            style(":: done").green().bold(),
            human_bytes(total),
            output_path.display()
        );
    }

    Ok(())
}

fn map_open_error(error: DownloadError) -> anyhow::Error {
    anyhow!("{} {error}", style("error:").red().bold())
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
