//! Request execution engine for wirebench.
//!
//! Drives one protobuf-over-HTTP round-trip end to end:
//!
//! 1. **Build** — interpolate `{{var}}` placeholders in the URL and header
//!    values, build the body tree from the flat field list, encode it as the
//!    request message type (or JSON when none is set), and negotiate
//!    content-type/accept headers.
//! 2. **Send** — a single HTTP attempt under the configured timeout; network
//!    and deadline failures surface verbatim, nothing retries.
//! 3. **Decode** — pick the response message type by status class (success
//!    vs error type), decode protobuf payloads, and degrade to raw text
//!    with a decode-error note rather than failing a call whose HTTP
//!    exchange succeeded.
//!
//! Concurrent executions are fully independent; the schema registry is the
//! only shared state, and no lock is held across an HTTP call.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod interpolate;

pub use config::EngineConfig;
pub use engine::RequestEngine;
pub use error::{Error, Result};
pub use interpolate::interpolate;
