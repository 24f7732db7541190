// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Paragraph-aware message chunking and the text helpers used when an
//! oversized reply is published externally.

use std::sync::OnceLock;

use regex::Regex;

/// Messages longer than this are offered to the content publisher.
pub const PUBLISH_THRESHOLD: usize = 3000;
/// Hard per-chunk channel limit.
pub const MAX_MSG_LEN: usize = 4000;
/// Preview length in the published-summary reply.
pub const SUMMARY_PREVIEW_LEN: usize = 200;

/// A split boundary must sit past 30% of the chunk budget, otherwise the
/// leading chunk would be pathologically small.
const MIN_BOUNDARY_RATIO: usize = 3;

fn heading_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^#{1,3}\s+(.+)$").ok()).as_ref()
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Split `text` into chunks of at most `max_len` bytes.
///
/// Prefers breaking on a paragraph boundary (`"\n\n"`), then a line boundary,
/// then hard-cuts. Boundaries in the first 30% of the budget are ignored.
pub fn split(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_owned()];
    }

    let threshold = max_len * MIN_BOUNDARY_RATIO / 10;
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.len() > max_len {
        let prefix_end = floor_char_boundary(rest, max_len);
        let prefix = &rest[..prefix_end];

        if let Some(idx) = prefix.rfind("\n\n").filter(|&i| i > threshold) {
            chunks.push(prefix[..idx].trim_end().to_owned());
            rest = &rest[idx + 2..];
        } else if let Some(idx) = prefix.rfind('\n').filter(|&i| i > threshold) {
            chunks.push(prefix[..idx].trim_end().to_owned());
            rest = &rest[idx + 1..];
        } else {
            chunks.push(prefix.to_owned());
            rest = &rest[prefix_end..];
        }
    }

    if !rest.is_empty() {
        chunks.push(rest.to_owned());
    }
    chunks
}

/// Derive a publish title: first markdown heading, else the first non-empty
/// line when short enough, else the leading 60 characters.
pub fn extract_title(text: &str) -> String {
    if let Some(caps) = heading_re().and_then(|re| re.captures(text)) {
        if let Some(heading) = caps.get(1) {
            return truncate_chars(heading.as_str().trim(), 100).to_owned();
        }
    }

    if let Some(line) = text.lines().map(str::trim).find(|l| !l.is_empty()) {
        if line.chars().count() <= 100 {
            return line.to_owned();
        }
    }

    format!("{}...", truncate_chars(text.trim(), 60))
}

/// Plain-text preview: heading markers and inline markdown stripped, then
/// truncated to [`SUMMARY_PREVIEW_LEN`].
pub fn preview(text: &str) -> String {
    let mut stripped = String::with_capacity(text.len());
    for line in text.lines() {
        let line = line.trim_start_matches('#').trim_start();
        for c in line.chars() {
            if !matches!(c, '*' | '_' | '~' | '`') {
                stripped.push(c);
            }
        }
        stripped.push('\n');
    }
    let stripped = stripped.trim();

    if stripped.chars().count() > SUMMARY_PREVIEW_LEN {
        format!("{}...", truncate_chars(stripped, SUMMARY_PREVIEW_LEN))
    } else {
        stripped.to_owned()
    }
}

#[cfg(test)]
#[path = "splitter_tests.rs"]
mod tests;
