//! Filename token parser
//!
//! Extracts candidate metadata (series, issue, year, publisher hint, volume)
//! from a raw comic file name. First stage of the identification pipeline.
//!
//! Parsing is deterministic and infallible: a pattern that is absent yields
//! `None` for that field, never an error. Explicit markers (`#NN` issue,
//! `(YYYY)` year) are flagged so the confidence scorer can distinguish them
//! from positional guesses.

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// File extensions recognized as comic archives (lowercase, no dot)
pub const COMIC_EXTENSIONS: [&str; 5] = ["cbz", "cbr", "cb7", "cbt", "pdf"];

/// Earliest publication year considered plausible
const MIN_PLAUSIBLE_YEAR: u16 = 1930;

/// Explicit issue marker: `#40`, `# 12.1`, `#7AU`
static ISSUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#\s*(\d+(?:\.\d+)?[A-Za-z]*)").expect("invalid issue regex"));

/// Parenthesized or bracketed group: `(2012)`, `[Image]`
static BRACKET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[(\[]([^()\[\]]*)[)\]]").expect("invalid bracket regex"));

/// Volume marker: `v2`, `vol 3`, `Volume 4`
static VOLUME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:vol(?:ume)?\.?\s*|v)(\d{1,3})\b").expect("invalid volume regex")
});

/// Standalone number token, 1-4 digits
static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,4})\b").expect("invalid number regex"));

/// Partial metadata guess extracted from one file name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedName {
    /// Candidate series title (text preceding the first metadata token)
    pub series: Option<String>,
    /// Issue number as written, leading zeros preserved
    pub issue: Option<String>,
    pub year: Option<u16>,
    /// Publisher hint from the first non-year bracket group
    pub publisher_hint: Option<String>,
    pub volume: Option<u16>,
    /// Issue came from a `#NN` marker rather than a bare number
    pub explicit_issue: bool,
    /// Year came from a parenthesized `(YYYY)` group
    pub explicit_year: bool,
}

/// True if `year` falls in the plausible publication range
/// (1930 through next year)
pub fn plausible_year(year: u16) -> bool {
    let max = (Utc::now().year() + 1) as u16;
    (MIN_PLAUSIBLE_YEAR..=max).contains(&year)
}

/// Parse a file name into a partial metadata guess.
///
/// Never fails; malformed or unrecognizable names produce a `ParsedName`
/// with every field `None`. The same input always yields the same output
/// (modulo the plausible-year upper bound advancing with the clock).
///
/// # Arguments
/// * `name` - File name without any path separators (extension allowed)
pub fn parse(name: &str) -> ParsedName {
    let stem = strip_extension(name);
    let mut parsed = ParsedName::default();

    // Byte spans already claimed by a metadata token. Separator
    // normalization below is 1:1 on bytes, so spans found on the raw
    // stem remain valid on the normalized copy.
    let mut spans: Vec<(usize, usize)> = Vec::new();

    // Explicit issue marker is matched on the raw stem so decimal issue
    // numbers ("#12.1") survive dot-separator normalization.
    if let Some(cap) = ISSUE_RE.captures(stem) {
        let whole = cap.get(0).map(|m| (m.start(), m.end()));
        if let (Some(span), Some(value)) = (whole, cap.get(1)) {
            parsed.issue = Some(value.as_str().to_string());
            parsed.explicit_issue = true;
            spans.push(span);
        }
    }

    let work = normalize_separators(stem);

    // Bracket groups are metadata, never series text: a 4-digit group is
    // the year, the first remaining non-empty group is a publisher hint.
    for cap in BRACKET_RE.captures_iter(&work) {
        let m = match cap.get(0) {
            Some(m) => m,
            None => continue,
        };
        if overlaps(&spans, m.start(), m.end()) {
            continue;
        }
        spans.push((m.start(), m.end()));

        let inner = cap[1].trim();
        if let Some(year) = parse_year_token(inner) {
            if parsed.year.is_none() {
                parsed.year = Some(year);
                parsed.explicit_year = true;
            }
        } else if !inner.is_empty() && parsed.publisher_hint.is_none() {
            parsed.publisher_hint = Some(inner.to_string());
        }
    }

    if let Some(cap) = VOLUME_RE.captures(&work) {
        if let (Some(m), Some(value)) = (cap.get(0), cap.get(1)) {
            if !overlaps(&spans, m.start(), m.end()) {
                if let Ok(volume) = value.as_str().parse::<u16>() {
                    parsed.volume = Some(volume);
                    spans.push((m.start(), m.end()));
                }
            }
        }
    }

    // Bare number fallback, left to right. A token at offset 0 is series
    // text ("2000 AD"), not metadata. Plausible 4-digit tokens fill the
    // year; anything else fills the issue.
    for m in NUMBER_RE.find_iter(&work) {
        if m.start() == 0 || overlaps(&spans, m.start(), m.end()) {
            continue;
        }
        let token = m.as_str();
        if let Some(year) = parse_year_token(token) {
            if parsed.year.is_none() {
                parsed.year = Some(year);
                spans.push((m.start(), m.end()));
            }
        } else if parsed.issue.is_none() {
            parsed.issue = Some(token.to_string());
            spans.push((m.start(), m.end()));
        }
    }

    let cutoff = spans.iter().map(|(start, _)| *start).min().unwrap_or(work.len());
    parsed.series = clean_series(&work[..cutoff]);

    parsed
}

/// Strip a trailing comic-archive extension, case-insensitively.
/// Unknown extensions are kept (they are part of the name).
fn strip_extension(name: &str) -> &str {
    if let Some((stem, ext)) = name.rsplit_once('.') {
        if !stem.is_empty() && COMIC_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
            return stem;
        }
    }
    name
}

/// Replace `_` and separator dots with spaces. A dot between two digits
/// is a decimal point and is preserved.
fn normalize_separators(stem: &str) -> String {
    let chars: Vec<char> = stem.chars().collect();
    let mut out = String::with_capacity(stem.len());
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '_' => out.push(' '),
            '.' => {
                let decimal = i > 0
                    && chars[i - 1].is_ascii_digit()
                    && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
                out.push(if decimal { '.' } else { ' ' });
            }
            _ => out.push(c),
        }
    }
    out
}

fn parse_year_token(token: &str) -> Option<u16> {
    if token.len() != 4 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = token.parse::<u16>().ok()?;
    plausible_year(year).then_some(year)
}

fn overlaps(spans: &[(usize, usize)], start: usize, end: usize) -> bool {
    spans.iter().any(|&(s, e)| start < e && s < end)
}

fn clean_series(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_end_matches(['-', ',', ' ']);
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
