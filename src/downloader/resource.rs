/*
 * rangecast - Concurrent multi-mirror HTTP range downloader.
 * Copyright (C) 2025  rangecast contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 */

//! Static description of how a mirrored resource is partitioned into blocks.

/// Immutable description of a resource's total size and block layout.
///
/// Block `i` covers bytes `[i*split_size, min((i+1)*split_size, length) - 1]`
/// inclusive. Every block has `split_size` bytes except possibly the last,
/// which holds the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor {
    length: u64,
    split_size: u64,
    num_blocks: usize,
}

impl ResourceDescriptor {
    /// Build a descriptor for a resource of `length` bytes split into blocks
    /// of `split_size` bytes. `split_size` must be positive.
    pub fn new(length: u64, split_size: u64) -> Self {
        assert!(split_size > 0, "split_size must be positive");
        let num_blocks = if length == 0 {
            0
        } else {
            ((length + split_size - 1) / split_size) as usize
        };
        Self {
            length,
            split_size,
            num_blocks,
        }
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn split_size(&self) -> u64 {
        self.split_size
    }

    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    /// Inclusive byte range `(start, end)` covered by block `id`.
    ///
    /// Panics if `id >= num_blocks()`.
    pub fn block_range(&self, id: usize) -> (u64, u64) {
        assert!(id < self.num_blocks, "block id out of range");
        let start = id as u64 * self.split_size;
        let end = if id == self.num_blocks - 1 {
            self.length - 1
        } else {
            start + self.split_size - 1
        };
        (start, end)
    }

    /// Length in bytes of block `id`.
    pub fn block_len(&self, id: usize) -> u64 {
        let (start, end) = self.block_range(id);
        end - start + 1
    }

    /// Value of the `Range` HTTP header for block `id`, e.g. `bytes=0-999`.
    pub fn range_header(&self, id: usize) -> String {
        let (start, end) = self.block_range(id);
        format!("bytes={}-{}", start, end)
    }
}
