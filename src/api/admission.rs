use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::state::AppState;
use crate::error::AppError;

/// Turns away oversize uploads from the declared Content-Length before any
/// body byte is read. Bodies without the header still hit the streaming limit
/// during multipart extraction.
pub async fn reject_oversize_payloads(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(declared) = declared_length(request.headers()) {
        if declared > state.max_file_size_bytes {
            tracing::debug!(
                declared,
                limit = state.max_file_size_bytes,
                "upload refused at admission"
            );
            return AppError::PayloadTooLarge {
                limit_bytes: state.max_file_size_bytes,
            }
            .into_response();
        }
    }

    next.run(request).await
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::declared_length;
    use axum::http::{header, HeaderMap, HeaderValue};

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn parses_plain_lengths() {
        assert_eq!(declared_length(&headers_with("0")), Some(0));
        assert_eq!(declared_length(&headers_with("2097152")), Some(2_097_152));
    }

    #[test]
    fn missing_or_garbled_header_reads_as_unknown() {
        assert_eq!(declared_length(&HeaderMap::new()), None);
        assert_eq!(declared_length(&headers_with("not-a-number")), None);
        assert_eq!(declared_length(&headers_with("-5")), None);
    }
}
