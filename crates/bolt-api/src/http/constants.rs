//! Shared HTTP constants (headers, problem URIs, keep-alive cadence).

pub(crate) const HEADER_LAST_EVENT_ID: &str = "last-event-id";
pub(crate) const SSE_KEEP_ALIVE_SECS: u64 = 20;
pub(crate) const ACCEPT_RANGES_BYTES: &str = "bytes";

pub(crate) const PROBLEM_INTERNAL: &str = "https://bolt.dev/problems/internal";
pub(crate) const PROBLEM_BAD_REQUEST: &str = "https://bolt.dev/problems/bad-request";
pub(crate) const PROBLEM_NOT_FOUND: &str = "https://bolt.dev/problems/not-found";
pub(crate) const PROBLEM_RANGE_NOT_SATISFIABLE: &str =
    "https://bolt.dev/problems/range-not-satisfiable";
pub(crate) const PROBLEM_SERVICE_UNAVAILABLE: &str = "https://bolt.dev/problems/service-unavailable";
pub(crate) const PROBLEM_BAD_GATEWAY: &str = "https://bolt.dev/problems/bad-gateway";
