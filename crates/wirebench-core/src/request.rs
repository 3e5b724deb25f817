//! Plain-data boundary types exchanged with the REST/CRUD layer.
//!
//! These carry no framework types (no HTTP client/server structs), so the
//! routing layer stays a thin translation shim: it deserializes a
//! [`RequestSpec`] straight from its own transport and hands the
//! [`RunResult`] straight back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::body::BodyField;

/// Everything needed to execute one protobuf-over-HTTP request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestSpec {
    /// HTTP method, e.g. `GET` / `POST`. Matched case-insensitively.
    pub method: String,

    /// Target URL; may contain `{{var}}` placeholders.
    pub url: String,

    /// Header name/value pairs; values may contain `{{var}}` placeholders.
    /// A `Vec` rather than a map so repeated headers survive.
    pub headers: Vec<(String, String)>,

    /// Flat body field list, built into a value tree before encoding.
    pub body: Vec<BodyField>,

    /// Fully-qualified message name to encode the body as. When unset, a
    /// non-empty body is sent as JSON.
    pub request_type: Option<String>,

    /// Fully-qualified message name to decode 2xx responses with.
    pub response_type: Option<String>,

    /// Fully-qualified message name to decode non-2xx responses with.
    /// Falls back to [`response_type`](Self::response_type) when unset.
    pub error_response_type: Option<String>,

    /// Variable scope for `{{var}}` interpolation. Precedence between
    /// environment and collection scopes is resolved by the caller before
    /// the engine sees this merged map.
    pub variables: BTreeMap<String, String>,

    /// Request timeout in seconds. Unset or non-positive means the engine
    /// default (30 s).
    pub timeout_secs: Option<i64>,
}

/// The outcome of one executed request.
///
/// Ephemeral — persistence of results is the collections layer's concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunResult {
    /// HTTP status code of the response.
    pub status: u16,

    /// Response headers in arrival order.
    pub headers: Vec<(String, String)>,

    /// Pretty-printed decode of the response body, when a message type was
    /// selected and wire decoding succeeded.
    pub decoded_text: Option<String>,

    /// The raw response body as text. Always present when no decode was
    /// attempted or the decode failed; also kept alongside a suspicious
    /// (empty-looking) decode.
    pub raw_text: Option<String>,

    /// Why decoding failed or looks wrong, when it did. A populated
    /// `decode_error` never fails the call — the HTTP exchange itself
    /// succeeded.
    pub decode_error: Option<String>,

    /// Wall-clock duration of the HTTP round-trip in milliseconds.
    pub elapsed_ms: u64,
}
