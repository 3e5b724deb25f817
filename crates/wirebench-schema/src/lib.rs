//! Schema layer of the wirebench request engine.
//!
//! Turns arbitrary `.proto` sources into a live, queryable schema registry
//! and converts between nested value trees and protobuf wire bytes:
//!
//! - **[`registry`]** — compiles proto sources (filesystem paths or uploaded
//!   byte blobs) into a descriptor snapshot and serves lookups by
//!   fully-qualified message name. Registration fully replaces the previous
//!   snapshot.
//! - **[`vfs`]** — import-path rewriting for uploads that arrive as flat
//!   filenames with no real directory structure.
//! - **[`compiler`]** — the `protoc` subprocess boundary.
//! - **[`introspect`]** — UI-facing schema metadata: flattened field lists,
//!   oneof groups, enum/map/well-known-type annotations.
//! - **[`codec`]** — descriptor-driven encode/decode of dynamic messages,
//!   including oneof conflict resolution for flat field lists.
//!
//! No generated per-type code is involved anywhere: messages are interpreted
//! at runtime from their descriptors via [`prost_reflect`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod codec;
pub mod compiler;
pub mod error;
pub mod introspect;
pub mod registry;
#[cfg(test)]
mod testutil;
pub mod vfs;

pub use codec::{decode, encode};
pub use error::{Error, Result};
pub use introspect::{flatten_message_fields, message_schema, FlatField, SchemaView};
pub use registry::{RegistryStore, SchemaRegistry};
