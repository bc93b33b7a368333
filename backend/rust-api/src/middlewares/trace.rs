use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

pub const TRACE_ID_HEADER: &str = "x-trace-id";

const MAX_TRACE_ID_LEN: usize = 128;

/// Caller-supplied trace id, when it is short printable ASCII.
fn incoming_trace_id(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(TRACE_ID_HEADER)?.to_str().ok()?.trim();
    let usable = !raw.is_empty()
        && raw.len() <= MAX_TRACE_ID_LEN
        && raw.bytes().all(|b| b.is_ascii_graphic());
    usable.then_some(raw)
}

/// Runs the request inside a span keyed by its trace id and returns the id in
/// `x-trace-id`. Unusable incoming ids are replaced by a fresh one.
pub async fn trace_context_middleware(request: Request, next: Next) -> Response {
    let trace_id = match incoming_trace_id(request.headers()) {
        Some(id) => id.to_owned(),
        None => Uuid::new_v4().simple().to_string(),
    };
    let echoed = HeaderValue::from_str(&trace_id).ok();

    let span = tracing::info_span!(
        "http_request",
        %trace_id,
        method = %request.method(),
        path = %request.uri().path()
    );
    let mut response = next.run(request).instrument(span).await;

    if let Some(value) = echoed {
        response
            .headers_mut()
            .entry(TRACE_ID_HEADER)
            .or_insert(value);
    }
    response
}
