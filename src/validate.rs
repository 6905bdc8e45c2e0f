//! Input validation for conflict resolutions.
//!
//! Three-tier resolution: exact match → synonym lookup → error with
//! suggestion. Lets `--default replace` or `--project chair=upsert` work
//! without the caller memorising the canonical names.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::exchange::Resolution;

// ── Valid value sets ─────────────────────────────────────────

pub static VALID_RESOLUTIONS: LazyLock<HashSet<&str>> =
    LazyLock::new(|| Resolution::ALL.iter().map(Resolution::as_str).collect());

// ── Synonym maps ─────────────────────────────────────────────

pub static RESOLUTION_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("replace", "clobber"),
        ("overwrite", "clobber"),
        ("force", "clobber"),
        ("theirs", "clobber"),
        ("combine", "merge"),
        ("upsert", "merge"),
        ("update", "merge"),
        ("keep", "skip"),
        ("ignore", "skip"),
        ("local", "skip"),
        ("ours", "skip"),
    ]
    .into_iter()
    .collect()
});

/// Normalize a resolution via exact match or synonym lookup.
///
/// # Errors
///
/// Returns `InvalidResolution` with the closest valid value, if any.
pub fn normalize_resolution(input: &str) -> Result<Resolution> {
    let lower = input.trim().to_lowercase();

    // Tier 1: exact match
    // Tier 2: synonym lookup
    let canonical = if VALID_RESOLUTIONS.contains(lower.as_str()) {
        Some(lower.as_str())
    } else {
        RESOLUTION_SYNONYMS.get(lower.as_str()).copied()
    };

    if let Some(resolution) = canonical.and_then(resolution_named) {
        return Ok(resolution);
    }

    // Tier 3: find closest suggestion
    Err(Error::InvalidResolution {
        input: input.to_string(),
        suggestion: find_closest_match(&lower, &VALID_RESOLUTIONS, &RESOLUTION_SYNONYMS),
    })
}

fn resolution_named(name: &str) -> Option<Resolution> {
    Resolution::ALL.into_iter().find(|r| r.as_str() == name)
}

/// Parse a `NAME=RESOLUTION` override.
///
/// # Errors
///
/// Returns `InvalidArgument` if the `=` or the name is missing, and
/// `InvalidResolution` if the resolution is unknown.
pub fn parse_override(input: &str) -> Result<(String, Resolution)> {
    let Some((name, resolution)) = input.rsplit_once('=') else {
        return Err(Error::InvalidArgument(format!(
            "override '{input}' must have the form NAME=RESOLUTION"
        )));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "override '{input}' has an empty name before '='"
        )));
    }
    Ok((name.to_string(), normalize_resolution(resolution)?))
}

/// Find the closest matching value across valid set and synonyms.
fn find_closest_match(
    input: &str,
    valid: &HashSet<&str>,
    synonyms: &HashMap<&str, &str>,
) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;

    for &v in valid.iter().chain(synonyms.keys()) {
        let dist = levenshtein_distance(input, v);
        if dist <= 3 && best.is_none_or(|(_, d)| dist < d) {
            // For synonyms, show what it maps to
            best = Some((synonyms.get(v).copied().unwrap_or(v), dist));
        }
    }

    best.map(|(v, _)| v.to_string())
}

// ── Levenshtein distance ─────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let a_len = a.len();
    let b_len = b.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    // Use single-row optimization (O(min(m,n)) space)
    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for i in 1..=a_len {
        curr[0] = i;
        for j in 1..=b_len {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1) // deletion
                .min(curr[j - 1] + 1) // insertion
                .min(prev[j - 1] + cost); // substitution
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}
