//! Typed error enum for the schema layer.
//!
//! Registry and codec failures always carry the underlying diagnostic text
//! (compiler output, parse error) — the user must act on them, so nothing is
//! swallowed. Consumers can match on specific variants; the execution engine
//! wraps these transparently.

/// Errors produced by registry, introspection and codec operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Proto compilation failed: missing toolchain, unparsable sources, or
    /// no `.proto` files found where some were expected. Carries the
    /// compiler's diagnostic text verbatim.
    #[error("proto compilation failed: {0}")]
    Compilation(String),

    /// An import referenced by basename matches more than one uploaded file.
    ///
    /// Resolution never silently picks one — rename the uploads or make the
    /// import paths unique.
    #[error(
        "ambiguous import '{import}' matches multiple uploaded files: {candidates:?}; \
         rename the uploads or use distinct import paths"
    )]
    AmbiguousImport {
        /// The import's bare basename.
        import: String,
        /// All uploaded paths sharing that basename.
        candidates: Vec<String>,
    },

    /// A registry lookup missed: no registered message has this name.
    #[error("message type '{message}' not found in the registered schema")]
    NotFound {
        /// The fully-qualified message name that was looked up.
        message: String,
    },

    /// The codec was asked to encode/decode a type absent from the snapshot.
    #[error("unknown message type '{message}'; register its .proto sources first")]
    UnknownMessageType {
        /// The fully-qualified message name that was looked up.
        message: String,
    },

    /// A body value tree could not be turned into wire bytes.
    #[error(
        "failed to encode body as '{message}': {reason}; \
         oneof conflicts or missing required fields are the most common cause"
    )]
    Encoding {
        /// The target message type.
        message: String,
        /// The underlying parse diagnostic.
        reason: String,
    },

    /// Wire bytes could not be parsed as the selected message type.
    #[error("failed to decode wire bytes as '{message}': {reason}")]
    Decoding {
        /// The selected message type.
        message: String,
        /// The underlying parse diagnostic.
        reason: String,
    },

    /// File I/O failure while reading sources or materializing uploads.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A compiled descriptor set could not be assembled into a pool.
    #[error("failed to build descriptor pool: {0}")]
    Descriptor(#[from] prost_reflect::DescriptorError),

    /// A descriptor set's bytes could not be decoded.
    #[error("failed to decode descriptor set: {0}")]
    DescriptorDecode(#[from] prost::DecodeError),

    /// The persistence collaborator failed.
    #[error("registry store failure: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// Convenience alias used throughout the schema layer's public API.
pub type Result<T> = std::result::Result<T, Error>;
