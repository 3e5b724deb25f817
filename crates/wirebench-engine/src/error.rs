//! Typed error enum for the execution engine.
//!
//! Schema-layer errors pass through transparently; HTTP transport failures
//! (including timeouts) are the engine's own [`Error::Request`] variant.
//! Decode failures during a run are deliberately *not* errors — they degrade
//! to raw-text output on the [`RunResult`](wirebench_core::RunResult).

/// Errors produced while building or sending a request.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Network or timeout failure during HTTP execution. Single attempt —
    /// the transport diagnostic is surfaced verbatim.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Schema or codec failure while preparing the request body.
    #[error(transparent)]
    Schema(#[from] wirebench_schema::Error),

    /// The request spec itself is unusable (malformed method or header).
    #[error("invalid request spec: {0}")]
    Spec(String),

    /// Config file I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Config parsing failure.
    #[error(transparent)]
    Yaml(#[from] serde_yaml_ng::Error),
}

/// Convenience alias used throughout the engine's public API.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time assertion that `Error` is `Send + Sync`.
    /// Required for use in async contexts and across thread boundaries.
    const _: () = {
        const fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    };

    #[test]
    fn schema_errors_pass_through_transparently() {
        let inner = wirebench_schema::Error::NotFound {
            message: "a.b.C".to_string(),
        };
        let wrapped: Error = inner.into();
        assert!(wrapped.to_string().contains("a.b.C"));
    }
}
