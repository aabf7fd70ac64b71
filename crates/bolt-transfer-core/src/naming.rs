//! # Design
//!
//! - Filename detection is an ordered list of strategies; each one either
//!   produces a name or defers to the next.
//! - The final synthetic strategy cannot fail, so derivation always yields a name.
//! - Every produced name passes through [`sanitize_filename`].

use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use url::Url;

/// Suffix appended to URL derived names without an extension.
pub const DOWNLOAD_SUFFIX: &str = ".download";

const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const FALLBACK_STEM: &str = "download";

/// Replace characters that are unsafe in a path segment with `_`.
///
/// Empty and dot-only names collapse to a fixed stem.
#[must_use]
pub fn sanitize_filename(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|ch| {
            if FORBIDDEN.contains(&ch) || ch.is_control() {
                '_'
            } else {
                ch
            }
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|ch| ch == '.') {
        FALLBACK_STEM.to_string()
    } else {
        cleaned
    }
}

/// Inputs available to the naming strategies.
#[derive(Debug, Clone, Copy)]
pub struct NamingContext<'a> {
    /// Source location as submitted.
    pub source: &'a str,
    /// `Content-Disposition` header from a probe, when one succeeded.
    pub content_disposition: Option<&'a str>,
    /// Clock reading used by the synthetic strategies.
    pub now: DateTime<Utc>,
}

impl<'a> NamingContext<'a> {
    /// Context for a source with no probe metadata.
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            content_disposition: None,
            now: Utc::now(),
        }
    }

    /// Attach probe metadata.
    #[must_use]
    pub const fn with_content_disposition(mut self, header: Option<&'a str>) -> Self {
        self.content_disposition = header;
        self
    }
}

type Strategy = fn(&NamingContext<'_>) -> Option<String>;

const STRATEGIES: &[Strategy] = &[disposition_name, url_name, host_timestamp_name];

/// Derive a sanitized name for `ctx`, trying each strategy in order.
#[must_use]
pub fn derive_filename(ctx: &NamingContext<'_>) -> String {
    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(ctx))
        .unwrap_or_else(|| format!("{FALLBACK_STEM}_{}", timestamp(ctx.now)))
}

/// Extract a name from a `Content-Disposition` header value.
///
/// `filename*` (RFC 5987) takes precedence over `filename`.
#[must_use]
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;
    for param in header.split(';') {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let value = value.trim_matches(|ch: char| ch == '"' || ch == '\'' || ch.is_whitespace());
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => extended = Some(value),
            "filename" => plain = Some(value),
            _ => {}
        }
    }
    let name = match (extended, plain) {
        (Some(value), _) => {
            // Drop the `charset'language'` prefix.
            let encoded = value.splitn(3, '\'').nth(2).unwrap_or(value);
            percent_decode_str(encoded).decode_utf8_lossy().into_owned()
        }
        (None, Some(value)) => percent_decode_str(value).decode_utf8_lossy().into_owned(),
        (None, None) => return None,
    };
    if name.trim().is_empty() {
        return None;
    }
    Some(sanitize_filename(&name))
}

/// Derive a name from the URL path basename or the `filename`/`file` query parameter.
#[must_use]
pub fn filename_from_url(source: &str) -> Option<String> {
    let url = Url::parse(source).ok()?;
    let basename = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
        .filter(|segment| !segment.trim().is_empty());
    let name = basename.or_else(|| {
        ["filename", "file"].iter().find_map(|key| {
            url.query_pairs()
                .find(|(name, value)| name == key && !value.trim().is_empty())
                .map(|(_, value)| value.into_owned())
        })
    })?;
    let mut name = sanitize_filename(&name);
    if !name.contains('.') {
        name.push_str(DOWNLOAD_SUFFIX);
    }
    Some(name)
}

/// The `n`th alternative for `name`: `clip.mp4` becomes `clip (n).mp4`.
///
/// `n == 0` returns the name unchanged.
#[must_use]
pub fn numbered_filename(name: &str, n: u32) -> String {
    if n == 0 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem} ({n}).{ext}"),
        _ => format!("{name} ({n})"),
    }
}

fn disposition_name(ctx: &NamingContext<'_>) -> Option<String> {
    ctx.content_disposition.and_then(filename_from_disposition)
}

fn url_name(ctx: &NamingContext<'_>) -> Option<String> {
    filename_from_url(ctx.source)
}

fn host_timestamp_name(ctx: &NamingContext<'_>) -> Option<String> {
    let url = Url::parse(ctx.source).ok()?;
    let host = url.host_str().filter(|host| !host.is_empty())?;
    let netloc = url
        .port()
        .map_or_else(|| host.to_string(), |port| format!("{host}:{port}"));
    Some(format!(
        "{}_{}{DOWNLOAD_SUFFIX}",
        sanitize_filename(&netloc),
        timestamp(ctx.now)
    ))
}

fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}
