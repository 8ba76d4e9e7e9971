//! Destination path templating
//!
//! Renders a relative destination path from a template and resolved
//! metadata. Placeholders for null fields and unrecognized placeholders are
//! left verbatim; the caller surfaces those as template gaps before any file
//! is moved. Resolving against the library root is the organizer's job.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::models::comic::ComicMetadata;

/// Default folder layout under the library root
pub const DEFAULT_FOLDER_TEMPLATE: &str = "{publisher}/{series}";

/// Default file base name (extension is carried over from the source)
pub const DEFAULT_FILE_TEMPLATE: &str = "{series} #{issue} ({year})";

/// Characters never allowed inside a path component
const ILLEGAL_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\w+)\}").expect("invalid placeholder regex"));

/// Substitute known placeholders with sanitized field values.
///
/// Recognized placeholders: `{series}`, `{issue}`, `{year}`, `{publisher}`,
/// `{volume}`. A placeholder whose field is null, and any unrecognized
/// placeholder, stays in the output unchanged. Separators written in the
/// template itself are preserved; sanitization applies to substituted
/// values only.
pub fn format_path(template: &str, metadata: &ComicMetadata) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| {
            let rendered = match &caps[1] {
                "series" => metadata.series.clone(),
                "issue" => metadata.issue.clone(),
                "year" => metadata.year.map(|y| y.to_string()),
                "publisher" => metadata.publisher.clone(),
                "volume" => metadata.volume.map(|v| v.to_string()),
                _ => None,
            };
            match rendered {
                Some(value) => sanitize_component(&value),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Strip characters illegal in file or folder names, drop ASCII control
/// characters, then collapse whitespace runs and trim the ends.
pub fn sanitize_component(value: &str) -> String {
    let stripped: String = value
        .chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c) && !c.is_control())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when the formatted path still contains a placeholder (a template
/// gap). Not an error; callers warn before confirming an organize.
pub fn has_unresolved_placeholders(path: &str) -> bool {
    PLACEHOLDER_RE.is_match(path)
}
