// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Normalized archive-progress information parsed from tool output.

use serde::{Deserialize, Serialize};

/// Structured progress extracted from a single output line.
///
/// All fields are optional; a line may carry only a subset (or none) of
/// them. Consumers merge successive values into a running snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deduplicated_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nfiles: Option<u64>,
    /// Path of the file currently being processed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_name: Option<String>,
}

impl Progress {
    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        self.original_size.is_none()
            && self.compressed_size.is_none()
            && self.deduplicated_size.is_none()
            && self.nfiles.is_none()
            && self.current_path.is_none()
            && self.archive_name.is_none()
    }

    /// Merge `newer` into this snapshot, overwriting any field the newer
    /// value carries.
    pub fn merge(&mut self, newer: &Progress) {
        if newer.original_size.is_some() {
            self.original_size = newer.original_size;
        }
        if newer.compressed_size.is_some() {
            self.compressed_size = newer.compressed_size;
        }
        if newer.deduplicated_size.is_some() {
            self.deduplicated_size = newer.deduplicated_size;
        }
        if newer.nfiles.is_some() {
            self.nfiles = newer.nfiles;
        }
        if newer.current_path.is_some() {
            self.current_path = newer.current_path.clone();
        }
        if newer.archive_name.is_some() {
            self.archive_name = newer.archive_name.clone();
        }
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
