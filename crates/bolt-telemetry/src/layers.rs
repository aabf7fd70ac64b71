//! Request correlation for the HTTP surface.
//!
//! A caller supplied `x-request-id` is kept; otherwise a UUID is minted. The
//! id is echoed on the response either way so clients can quote it when
//! reporting a failed transfer.

use tower::layer::util::Stack;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Header carrying the correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Assigns a request id on the way in and echoes it on the way out.
pub type RequestIdLayer = Stack<SetRequestIdLayer<MakeRequestUuid>, PropagateRequestIdLayer>;

/// Build the combined request-id layer.
#[must_use]
pub fn request_id_layer() -> RequestIdLayer {
    Stack::new(
        SetRequestIdLayer::x_request_id(MakeRequestUuid),
        PropagateRequestIdLayer::x_request_id(),
    )
}
