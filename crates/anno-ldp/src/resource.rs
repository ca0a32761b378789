use axum::http::header::{ALLOW, CONTENT_TYPE, ETAG, LINK, VARY};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use crate::vocab::{ANNOTATION_ALLOW, ANNO_MEDIA_TYPE, LDP_RESOURCE_LINK};

/// An expanded annotation ready to be sent as an LDP resource.
///
/// Status code and `Location` are the caller's concern; combine with a
/// `(StatusCode, headers, LdpResource)` tuple when they differ from `200`.
#[derive(Clone, Debug, PartialEq)]
pub struct LdpResource {
    body: Value,
}

impl LdpResource {
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn into_body(self) -> Value {
        self.body
    }
}

/// Strong entity tag over the serialized representation.
pub fn entity_tag(bytes: &[u8]) -> String {
    format!("\"{}\"", blake3::hash(bytes).to_hex())
}

impl IntoResponse for LdpResource {
    fn into_response(self) -> Response {
        let bytes = match serde_json::to_vec(&self.body) {
            Ok(bytes) => bytes,
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
        let etag = HeaderValue::try_from(entity_tag(&bytes)).ok();

        let mut response = bytes.into_response();
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(ANNO_MEDIA_TYPE));
        headers.insert(LINK, HeaderValue::from_static(LDP_RESOURCE_LINK));
        headers.insert(ALLOW, HeaderValue::from_static(ANNOTATION_ALLOW));
        headers.insert(VARY, HeaderValue::from_static("Accept"));
        if let Some(etag) = etag {
            headers.insert(ETAG, etag);
        }
        response
    }
}
