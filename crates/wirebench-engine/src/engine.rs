//! One HTTP round-trip: build, send, decode.

use std::sync::Arc;
use std::time::{Duration, Instant};

use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use wirebench_core::{build_from_fields, RequestSpec, RunResult};
use wirebench_schema::{codec, SchemaRegistry};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::interpolate::interpolate;

/// Content type for protobuf request bodies.
const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";

/// Accept header advertised when a response message type is set.
const PROTOBUF_ACCEPT: &str = "application/x-protobuf, application/octet-stream";

/// Executes [`RequestSpec`]s against live endpoints.
///
/// Cheap to share: holds an [`Arc`]ed registry and a pooled HTTP client.
/// Concurrent [`run`](Self::run) calls are fully independent.
pub struct RequestEngine {
    registry: Arc<SchemaRegistry>,
    http: reqwest::Client,
    config: EngineConfig,
}

impl RequestEngine {
    /// An engine over `registry` with default configuration.
    ///
    /// # Errors
    ///
    /// [`Error::Request`] when the underlying HTTP client cannot be built.
    pub fn new(registry: Arc<SchemaRegistry>) -> Result<Self> {
        Self::with_config(registry, EngineConfig::default())
    }

    /// An engine over `registry` with explicit configuration.
    ///
    /// # Errors
    ///
    /// [`Error::Request`] when the underlying HTTP client cannot be built.
    pub fn with_config(registry: Arc<SchemaRegistry>, config: EngineConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            registry,
            http,
            config,
        })
    }

    /// The schema registry this engine encodes and decodes against.
    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Execute one request.
    ///
    /// The HTTP call is a single attempt under the spec's timeout (engine
    /// default when unset or non-positive). A response that fails to decode
    /// still returns `Ok` — the raw body and a decode-error note land on
    /// the [`RunResult`] instead.
    ///
    /// # Errors
    ///
    /// [`Error::Schema`] when the request body cannot be encoded,
    /// [`Error::Spec`] for malformed methods/headers, and
    /// [`Error::Request`] for transport or deadline failures.
    pub async fn run(&self, spec: &RequestSpec) -> Result<RunResult> {
        let url = interpolate(&spec.url, &spec.variables);
        let method = parse_method(&spec.method)?;
        let timeout = self.effective_timeout(spec);

        let mut headers = HeaderMap::new();
        let mut body_bytes: Option<Vec<u8>> = None;
        if let Some(request_type) = &spec.request_type {
            let tree = build_from_fields(&spec.body);
            let bytes = codec::encode(&self.registry, request_type, &tree, &spec.body)?;
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(PROTOBUF_CONTENT_TYPE));
            body_bytes = Some(bytes);
        } else if !spec.body.is_empty() {
            let tree = build_from_fields(&spec.body);
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            body_bytes = Some(serde_json::to_vec(&tree).map_err(|e| Error::Spec(e.to_string()))?);
        }
        if spec.response_type.is_some() || spec.error_response_type.is_some() {
            headers.insert(ACCEPT, HeaderValue::from_static(PROTOBUF_ACCEPT));
        }
        for (name, value) in &spec.headers {
            let value = interpolate(value, &spec.variables);
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Spec(format!("invalid header name '{name}': {e}")))?;
            let header_value = HeaderValue::from_str(&value)
                .map_err(|e| Error::Spec(format!("invalid value for header '{name}': {e}")))?;
            headers.append(header_name, header_value);
        }

        tracing::debug!(method = %method, url = %url, "executing request");
        let started = Instant::now();

        let mut builder = self
            .http
            .request(method, url.as_str())
            .headers(headers)
            .timeout(timeout);
        if let Some(bytes) = body_bytes {
            builder = builder.body(bytes);
        }
        let response = builder.send().await?;

        let status = response.status();
        let response_headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = response.bytes().await?;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        tracing::debug!(status = status.as_u16(), elapsed_ms, "request completed");

        let mut result = RunResult {
            status: status.as_u16(),
            headers: response_headers,
            decoded_text: None,
            raw_text: None,
            decode_error: None,
            elapsed_ms,
        };

        // Non-2xx responses prefer the error type, falling back to the
        // success type; 2xx always uses the success type.
        let selected = if status.is_success() {
            spec.response_type.as_deref()
        } else {
            spec.error_response_type
                .as_deref()
                .or(spec.response_type.as_deref())
        };

        match selected {
            Some(fqmn) if looks_like_protobuf(&content_type) => {
                match codec::decode(&self.registry, fqmn, &bytes) {
                    Ok(text) => {
                        let looks_empty = matches!(text.trim(), "{}" | "[]");
                        if looks_empty && !bytes.is_empty() {
                            result.decode_error = Some(format!(
                                "decoded '{fqmn}' is empty for a non-empty response body; \
                                 the selected message type may not match the payload"
                            ));
                            result.raw_text =
                                Some(String::from_utf8_lossy(&bytes).into_owned());
                        }
                        result.decoded_text = Some(text);
                    }
                    Err(e) => {
                        // The HTTP exchange succeeded; losing the body over
                        // a formatting problem would be worse.
                        result.decode_error = Some(e.to_string());
                        result.raw_text = Some(String::from_utf8_lossy(&bytes).into_owned());
                    }
                }
            }
            _ => {
                result.raw_text = Some(String::from_utf8_lossy(&bytes).into_owned());
            }
        }

        Ok(result)
    }

    fn effective_timeout(&self, spec: &RequestSpec) -> Duration {
        let secs = spec
            .timeout_secs
            .filter(|t| *t > 0)
            .and_then(|t| u64::try_from(t).ok())
            .unwrap_or(self.config.default_timeout_secs);
        Duration::from_secs(secs)
    }
}

/// Case-insensitive method parse; an empty method means `GET`.
fn parse_method(method: &str) -> Result<Method> {
    if method.is_empty() {
        return Ok(Method::GET);
    }
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::Spec(format!("invalid HTTP method '{method}'")))
}

/// Whether a content type indicates a binary protobuf payload.
fn looks_like_protobuf(content_type: &str) -> bool {
    content_type.contains("protobuf") || content_type.contains("octet-stream")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::net::SocketAddr;

    use axum::body::Bytes;
    use axum::http::{HeaderMap as AxumHeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::Router;
    use prost_types::field_descriptor_proto::{Label, Type};
    use prost_types::{
        DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    };
    use serde_json::json;
    use wirebench_core::BodyField;

    use super::*;

    /// `echo.v1.Ping { string msg = 1 }`, `echo.v1.Problem { string error = 2 }`,
    /// `echo.v1.Empty {}`.
    fn test_registry() -> Arc<SchemaRegistry> {
        fn string_field(name: &str, number: i32) -> FieldDescriptorProto {
            FieldDescriptorProto {
                name: Some(name.to_string()),
                number: Some(number),
                label: Some(Label::Optional as i32),
                r#type: Some(Type::String as i32),
                ..Default::default()
            }
        }
        fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
            DescriptorProto {
                name: Some(name.to_string()),
                field: fields,
                ..Default::default()
            }
        }

        let fds = FileDescriptorSet {
            file: vec![FileDescriptorProto {
                name: Some("echo.proto".to_string()),
                package: Some("echo.v1".to_string()),
                syntax: Some("proto3".to_string()),
                message_type: vec![
                    message("Ping", vec![string_field("msg", 1)]),
                    message("Problem", vec![string_field("error", 2)]),
                    message("Empty", vec![]),
                ],
                ..Default::default()
            }],
        };

        let registry = SchemaRegistry::new();
        registry.register_descriptor_set(fds).unwrap();
        Arc::new(registry)
    }

    /// Wire bytes for a message whose string field `number` holds `value`.
    fn string_message(number: u32, value: &str) -> Vec<u8> {
        let mut out = vec![u8::try_from((number << 3) | 2).unwrap()];
        out.push(u8::try_from(value.len()).unwrap());
        out.extend_from_slice(value.as_bytes());
        out
    }

    async fn spawn(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn engine() -> RequestEngine {
        RequestEngine::new(test_registry()).unwrap()
    }

    #[tokio::test]
    async fn protobuf_round_trip() {
        let app = Router::new().route(
            "/echo",
            post(|headers: AxumHeaderMap, body: Bytes| async move {
                let received = headers
                    .get("content-type")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("none")
                    .to_string();
                (
                    [
                        ("content-type", "application/x-protobuf".to_string()),
                        ("x-received-content-type", received),
                    ],
                    body,
                )
            }),
        );
        let addr = spawn(app).await;

        let spec = RequestSpec {
            method: "POST".to_string(),
            url: format!("http://{addr}/echo"),
            body: vec![BodyField::new("msg", json!("hello"))],
            request_type: Some("echo.v1.Ping".to_string()),
            response_type: Some("echo.v1.Ping".to_string()),
            ..Default::default()
        };
        let result = engine().run(&spec).await.unwrap();

        assert_eq!(result.status, 200);
        assert!(
            result.decoded_text.as_deref().unwrap().contains("hello"),
            "decoded: {:?}",
            result.decoded_text
        );
        assert!(result.decode_error.is_none());
        let received = result
            .headers
            .iter()
            .find(|(name, _)| name == "x-received-content-type")
            .map(|(_, value)| value.as_str());
        assert_eq!(received, Some("application/x-protobuf"));
    }

    #[tokio::test]
    async fn non_2xx_uses_error_response_type() {
        let app = Router::new().route(
            "/missing",
            get(|| async {
                (
                    StatusCode::NOT_FOUND,
                    [("content-type", "application/x-protobuf")],
                    string_message(2, "not here"),
                )
            }),
        );
        let addr = spawn(app).await;

        let spec = RequestSpec {
            method: "GET".to_string(),
            url: format!("http://{addr}/missing"),
            response_type: Some("echo.v1.Ping".to_string()),
            error_response_type: Some("echo.v1.Problem".to_string()),
            ..Default::default()
        };
        let result = engine().run(&spec).await.unwrap();

        assert_eq!(result.status, 404);
        let decoded = result.decoded_text.as_deref().unwrap();
        assert!(decoded.contains("error"), "decoded with Problem: {decoded}");
        assert!(decoded.contains("not here"), "decoded with Problem: {decoded}");
        assert!(result.decode_error.is_none());
    }

    #[tokio::test]
    async fn empty_decode_of_non_empty_body_sets_hint() {
        let app = Router::new().route(
            "/mismatch",
            get(|| async {
                (
                    [("content-type", "application/x-protobuf")],
                    string_message(1, "hello"),
                )
            }),
        );
        let addr = spawn(app).await;

        let spec = RequestSpec {
            method: "GET".to_string(),
            url: format!("http://{addr}/mismatch"),
            response_type: Some("echo.v1.Empty".to_string()),
            ..Default::default()
        };
        let result = engine().run(&spec).await.unwrap();

        assert_eq!(result.status, 200);
        assert_eq!(result.decoded_text.as_deref().map(str::trim), Some("{}"));
        let hint = result.decode_error.as_deref().unwrap();
        assert!(hint.contains("may not match"), "hint: {hint}");
        assert!(result.raw_text.is_some(), "raw body kept alongside hint");
    }

    #[tokio::test]
    async fn decode_failure_degrades_to_raw_text() {
        let app = Router::new().route(
            "/garbage",
            get(|| async {
                (
                    [("content-type", "application/x-protobuf")],
                    vec![0xff, 0xff, 0xff],
                )
            }),
        );
        let addr = spawn(app).await;

        let spec = RequestSpec {
            method: "GET".to_string(),
            url: format!("http://{addr}/garbage"),
            response_type: Some("echo.v1.Ping".to_string()),
            ..Default::default()
        };
        let result = engine().run(&spec).await.unwrap();

        assert_eq!(result.status, 200);
        assert!(result.decoded_text.is_none());
        assert!(result.raw_text.is_some());
        assert!(
            result.decode_error.as_deref().unwrap().contains("decode"),
            "error notes the decode failure: {:?}",
            result.decode_error
        );
    }

    #[tokio::test]
    async fn non_protobuf_content_type_returns_raw_text() {
        let app = Router::new().route(
            "/json",
            get(|| async { ([("content-type", "application/json")], r#"{"ok":true}"#) }),
        );
        let addr = spawn(app).await;

        let spec = RequestSpec {
            method: "GET".to_string(),
            url: format!("http://{addr}/json"),
            response_type: Some("echo.v1.Ping".to_string()),
            ..Default::default()
        };
        let result = engine().run(&spec).await.unwrap();

        assert_eq!(result.raw_text.as_deref(), Some(r#"{"ok":true}"#));
        assert!(result.decoded_text.is_none());
        assert!(result.decode_error.is_none());
    }

    #[tokio::test]
    async fn json_body_when_no_request_type_is_set() {
        let app = Router::new().route(
            "/json-echo",
            post(|headers: AxumHeaderMap, body: Bytes| async move {
                let received = headers
                    .get("content-type")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("none")
                    .to_string();
                ([("x-received-content-type", received)], body)
            }),
        );
        let addr = spawn(app).await;

        let spec = RequestSpec {
            method: "POST".to_string(),
            url: format!("http://{addr}/json-echo"),
            body: vec![BodyField::new("count", json!("42"))],
            ..Default::default()
        };
        let result = engine().run(&spec).await.unwrap();

        assert_eq!(result.raw_text.as_deref(), Some(r#"{"count":42}"#));
        let received = result
            .headers
            .iter()
            .find(|(name, _)| name == "x-received-content-type")
            .map(|(_, value)| value.as_str());
        assert_eq!(received, Some("application/json"));
    }

    #[tokio::test]
    async fn interpolates_url_and_leaves_unresolved_headers_verbatim() {
        let app = Router::new().route(
            "/hdr",
            get(|headers: AxumHeaderMap| async move {
                headers
                    .get("x-token")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("none")
                    .to_string()
            }),
        );
        let addr = spawn(app).await;

        let mut variables = BTreeMap::new();
        variables.insert("host".to_string(), addr.to_string());
        let spec = RequestSpec {
            method: "GET".to_string(),
            url: "http://{{host}}/hdr".to_string(),
            headers: vec![("x-token".to_string(), "{{missing}}".to_string())],
            variables,
            ..Default::default()
        };
        let result = engine().run(&spec).await.unwrap();

        assert_eq!(result.status, 200);
        assert_eq!(result.raw_text.as_deref(), Some("{{missing}}"));
    }

    #[tokio::test]
    async fn accept_header_advertises_protobuf_when_response_type_set() {
        let app = Router::new().route(
            "/accept",
            get(|headers: AxumHeaderMap| async move {
                headers
                    .get("accept")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("none")
                    .to_string()
            }),
        );
        let addr = spawn(app).await;

        let spec = RequestSpec {
            method: "GET".to_string(),
            url: format!("http://{addr}/accept"),
            response_type: Some("echo.v1.Ping".to_string()),
            ..Default::default()
        };
        let result = engine().run(&spec).await.unwrap();

        // Returned as text/plain, so no decode attempt happens.
        assert!(
            result.raw_text.as_deref().unwrap().contains("x-protobuf"),
            "accept header: {:?}",
            result.raw_text
        );
    }

    #[tokio::test]
    async fn timeout_surfaces_as_request_error() {
        let app = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(1500)).await;
                "late"
            }),
        );
        let addr = spawn(app).await;

        let spec = RequestSpec {
            method: "GET".to_string(),
            url: format!("http://{addr}/slow"),
            timeout_secs: Some(1),
            ..Default::default()
        };
        let err = engine().run(&spec).await.unwrap_err();
        assert!(matches!(err, Error::Request(_)), "got: {err}");
    }

    #[tokio::test]
    async fn unknown_request_type_fails_before_sending() {
        let spec = RequestSpec {
            method: "POST".to_string(),
            url: "http://127.0.0.1:9/never".to_string(),
            body: vec![BodyField::new("msg", json!("x"))],
            request_type: Some("no.such.Type".to_string()),
            ..Default::default()
        };
        let err = engine().run(&spec).await.unwrap_err();
        match err {
            Error::Schema(inner) => {
                assert!(inner.to_string().contains("no.such.Type"), "got: {inner}");
            }
            other => panic!("expected Schema error, got: {other}"),
        }
    }

    #[test]
    fn parse_method_accepts_lowercase_and_defaults_get() {
        assert_eq!(parse_method("post").unwrap(), Method::POST);
        assert_eq!(parse_method("").unwrap(), Method::GET);
        assert!(parse_method("not a method").is_err());
    }

    #[test]
    fn protobuf_content_type_detection() {
        assert!(looks_like_protobuf("application/x-protobuf"));
        assert!(looks_like_protobuf("application/protobuf; charset=utf-8"));
        assert!(looks_like_protobuf("application/octet-stream"));
        assert!(!looks_like_protobuf("application/json"));
        assert!(!looks_like_protobuf("text/plain"));
        assert!(!looks_like_protobuf(""));
    }
}
