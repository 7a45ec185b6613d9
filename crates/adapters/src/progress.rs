// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress extraction from archive-tool output lines.
//!
//! Recognizes the stats line borg prints while creating an archive
//! (`original compressed deduplicated nfiles path`) and a few labeled
//! header lines. Anything unrecognized yields `None`; parse failures are
//! never fatal.

use arca_core::Progress;
use regex_lite::Regex;
use std::sync::OnceLock;

// The pattern is a literal; construction cannot fail at runtime.
#[allow(clippy::unwrap_used)]
fn stats_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<original>\d+)\s+(?P<compressed>\d+)\s+(?P<deduplicated>\d+)\s+(?P<nfiles>\d+)\s+(?P<path>.*)$")
            .unwrap()
    })
}

/// Parse one output line into structured progress, if it carries any.
pub fn parse_line(line: &str) -> Option<Progress> {
    if let Some(caps) = stats_pattern().captures(line.trim_end()) {
        let num = |name: &str| caps.name(name).and_then(|m| m.as_str().parse::<u64>().ok());
        return Some(Progress {
            original_size: num("original"),
            compressed_size: num("compressed"),
            deduplicated_size: num("deduplicated"),
            nfiles: num("nfiles"),
            current_path: caps
                .name("path")
                .map(|m| m.as_str().trim().to_string())
                .filter(|p| !p.is_empty()),
            archive_name: None,
        });
    }

    if let Some(rest) = line.strip_prefix("Archive name:") {
        return Some(Progress {
            archive_name: Some(rest.trim().to_string()),
            ..Default::default()
        });
    }

    None
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
