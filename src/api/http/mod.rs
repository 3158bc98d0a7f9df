// src/api/http/mod.rs

pub mod chat;
pub mod handlers;
pub mod router;
pub mod vault;

use std::convert::Infallible;

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue},
    response::Response,
};
use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::api::error::{ApiResult, IntoApiError};

pub use router::http_router;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Stream pre-encoded NDJSON lines as a chunked response body
pub(crate) fn ndjson_response<S>(lines: S, request_id: Option<&str>) -> ApiResult<Response>
where
    S: Stream<Item = String> + Send + 'static,
{
    let body = Body::from_stream(lines.map(|line| Ok::<_, Infallible>(Bytes::from(line))));

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-cache");
    if let Some(id) = request_id {
        builder = builder.header(
            HeaderName::from_static(REQUEST_ID_HEADER),
            HeaderValue::from_str(id).into_internal_error("Invalid request id")?,
        );
    }
    builder.body(body).into_internal_error("Failed to build streaming response")
}
