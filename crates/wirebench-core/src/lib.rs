//! Shared kernel for the wirebench request engine.
//!
//! This crate provides the pieces of the engine that have no protobuf or HTTP
//! dependencies:
//!
//! - **[`body`]** — builds a nested JSON value tree from the flat
//!   `(dot-path, value)` field lists a UI produces, with string-to-literal
//!   coercion and path read-back.
//! - **[`request`]** — plain-data boundary types ([`RequestSpec`],
//!   [`RunResult`]) exchanged with the REST/CRUD layer, kept free of
//!   framework types so that layer stays a thin translation shim.
//!
//! Higher-level crates (`wirebench-schema`, `wirebench-engine`) build on
//! these types; you should rarely need to depend on this crate directly.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod body;
pub mod request;

pub use body::{build_from_fields, coerce_value, set_by_path, value_at_path, BodyField};
pub use request::{RequestSpec, RunResult};
