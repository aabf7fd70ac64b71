//! `Range` header resolution shared by the local and remote streaming endpoints.

/// Inclusive byte range resolved against a known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset.
    pub start: u64,
    /// Last byte offset, inclusive.
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered by the range.
    #[must_use]
    pub const fn len(self) -> u64 {
        self.end - self.start + 1
    }

    /// Ranges always cover at least one byte.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        false
    }

    /// `Content-Range` header value for a resource of `size` bytes.
    #[must_use]
    pub fn content_range(self, size: u64) -> String {
        format!("bytes {}-{}/{size}", self.start, self.end)
    }
}

/// Outcome of resolving an optional `Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    /// No usable range; serve the whole resource.
    Full,
    /// Serve the given slice with partial content status.
    Partial(ByteRange),
    /// The range lies outside the resource.
    Unsatisfiable,
}

/// Resolve a `Range` header against a resource of `size` bytes.
///
/// Only the first range of a multi-range request is honoured. Malformed headers
/// are ignored and yield [`RangeRequest::Full`].
#[must_use]
pub fn resolve_range(header: Option<&str>, size: u64) -> RangeRequest {
    let Some(spec) = header
        .map(str::trim)
        .and_then(|value| value.strip_prefix("bytes="))
        .and_then(|ranges| ranges.split(',').next())
    else {
        return RangeRequest::Full;
    };
    let Some((first, last)) = spec.trim().split_once('-') else {
        return RangeRequest::Full;
    };
    let (first, last) = (first.trim(), last.trim());

    let range = match (first.parse::<u64>().ok(), last.parse::<u64>().ok()) {
        (Some(start), _) if start >= size => return RangeRequest::Unsatisfiable,
        (Some(start), Some(end)) if end < start => return RangeRequest::Full,
        (Some(start), Some(end)) => ByteRange {
            start,
            end: end.min(size - 1),
        },
        (Some(start), None) if last.is_empty() => ByteRange {
            start,
            end: size - 1,
        },
        (None, Some(suffix)) if first.is_empty() => {
            if suffix == 0 || size == 0 {
                return RangeRequest::Unsatisfiable;
            }
            ByteRange {
                start: size.saturating_sub(suffix),
                end: size - 1,
            }
        }
        _ => return RangeRequest::Full,
    };
    RangeRequest::Partial(range)
}

/// Total size from a `Content-Range` header such as `bytes 400-999/1000`.
#[must_use]
pub fn content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}
