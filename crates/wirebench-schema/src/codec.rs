//! Descriptor-driven encode/decode of dynamic messages.
//!
//! Encoding interprets a body value tree against the registered descriptor
//! for the named type: no generated per-type code, just a serde pass driven
//! by [`prost_reflect::DynamicMessage`]. Deserialization is deliberately
//! permissive (unknown fields discarded, partial messages allowed) so minor
//! UI/schema skew doesn't hard-fail a request.
//!
//! # Oneof conflict resolution
//!
//! A flat field list cannot express "pick one of these": a UI that renders
//! every field of a oneof lets the user populate several members. Before
//! encoding, every nesting level is pruned — when more than one member of a
//! oneof is present, only the member whose dot-path occurs **latest** in the
//! original field order survives. That encodes "last value set by the user
//! wins", and is a behavioral contract, not an implementation detail.

use prost::Message;
use prost_reflect::{
    DeserializeOptions, DynamicMessage, Kind, MessageDescriptor, OneofDescriptor,
    SerializeOptions,
};
use serde_json::{Map, Value};
use wirebench_core::BodyField;

use crate::error::{Error, Result};
use crate::registry::SchemaRegistry;

/// Encode a body value tree into protobuf wire bytes for `fqmn`.
///
/// `original_fields` is the flat field list the tree was built from; its
/// ordering decides oneof conflicts (see the module docs).
///
/// # Errors
///
/// [`Error::UnknownMessageType`] when `fqmn` is not registered;
/// [`Error::Encoding`] when the pruned tree cannot be interpreted as the
/// message (the diagnostic carries the underlying parse error).
pub fn encode(
    registry: &SchemaRegistry,
    fqmn: &str,
    tree: &Map<String, Value>,
    original_fields: &[BodyField],
) -> Result<Vec<u8>> {
    let desc = registry
        .find_message(fqmn)
        .ok_or_else(|| Error::UnknownMessageType {
            message: fqmn.to_string(),
        })?;

    let mut tree = tree.clone();
    let paths: Vec<&str> = original_fields.iter().map(|f| f.path.as_str()).collect();
    prune_oneof_conflicts(&desc, &mut tree, "", &paths);

    let options = DeserializeOptions::new().deny_unknown_fields(false);
    let message = DynamicMessage::deserialize_with_options(desc, Value::Object(tree), &options)
        .map_err(|e| Error::Encoding {
            message: fqmn.to_string(),
            reason: e.to_string(),
        })?;
    Ok(message.encode_to_vec())
}

/// Decode protobuf wire bytes into an indented JSON rendering.
///
/// Well-known types render per the standard protobuf JSON mapping
/// (Timestamp as RFC 3339 with nanosecond precision, wrapper types in their
/// natural scalar form).
///
/// # Errors
///
/// [`Error::UnknownMessageType`] when `fqmn` is not registered;
/// [`Error::Decoding`] when the bytes don't parse as that message.
pub fn decode(registry: &SchemaRegistry, fqmn: &str, bytes: &[u8]) -> Result<String> {
    let desc = registry
        .find_message(fqmn)
        .ok_or_else(|| Error::UnknownMessageType {
            message: fqmn.to_string(),
        })?;

    let message = DynamicMessage::decode(desc, bytes).map_err(|e| Error::Decoding {
        message: fqmn.to_string(),
        reason: e.to_string(),
    })?;

    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::pretty(&mut out);
    message
        .serialize_with_options(&mut serializer, &SerializeOptions::new())
        .map_err(|e| Error::Decoding {
            message: fqmn.to_string(),
            reason: e.to_string(),
        })?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Prune oneof conflicts at this nesting level, then recurse into nested
/// message values (including list elements and map values).
///
/// `prefix` is the dot-path of this level relative to the root, ending in
/// `.` for nested levels; `original_paths` is the flat field order used to
/// decide winners.
fn prune_oneof_conflicts(
    desc: &MessageDescriptor,
    map: &mut Map<String, Value>,
    prefix: &str,
    original_paths: &[&str],
) {
    for oneof in desc.oneofs() {
        if is_synthetic_oneof(&oneof) {
            continue;
        }
        // Which members are present in this map (under either name)?
        let present: Vec<String> = oneof
            .fields()
            .filter_map(|f| {
                if map.contains_key(f.name()) {
                    Some(f.name().to_string())
                } else if map.contains_key(f.json_name()) {
                    Some(f.json_name().to_string())
                } else {
                    None
                }
            })
            .collect();
        if present.len() <= 1 {
            continue;
        }

        // Last mention in the original field order wins. Members absent
        // from the original list rank lowest; ties go to the later member.
        let mut winner = 0;
        let mut winner_rank = None;
        for (pos, key) in present.iter().enumerate() {
            let rank = last_occurrence(prefix, key, original_paths);
            if pos == 0 || rank >= winner_rank {
                winner = pos;
                winner_rank = rank;
            }
        }
        for (pos, key) in present.iter().enumerate() {
            if pos != winner {
                map.remove(key);
                tracing::debug!(
                    oneof = oneof.name(),
                    dropped = %format!("{prefix}{key}"),
                    "resolved oneof conflict (last value wins)"
                );
            }
        }
    }

    for field in desc.fields() {
        let key = if map.contains_key(field.name()) {
            field.name().to_string()
        } else if map.contains_key(field.json_name()) {
            field.json_name().to_string()
        } else {
            continue;
        };
        let Kind::Message(nested) = field.kind() else {
            continue;
        };

        if field.is_map() {
            let value_field = nested.map_entry_value_field();
            let Kind::Message(value_desc) = value_field.kind() else {
                continue;
            };
            if let Some(Value::Object(entries)) = map.get_mut(&key) {
                for (entry_key, entry_value) in entries.iter_mut() {
                    if let Value::Object(child) = entry_value {
                        let child_prefix = format!("{prefix}{key}.{entry_key}.");
                        prune_oneof_conflicts(&value_desc, child, &child_prefix, original_paths);
                    }
                }
            }
        } else if field.is_list() {
            if let Some(Value::Array(items)) = map.get_mut(&key) {
                for (index, item) in items.iter_mut().enumerate() {
                    if let Value::Object(child) = item {
                        let child_prefix = format!("{prefix}{key}[{index}].");
                        prune_oneof_conflicts(&nested, child, &child_prefix, original_paths);
                    }
                }
            }
        } else if let Some(Value::Object(child)) = map.get_mut(&key) {
            let child_prefix = format!("{prefix}{key}.");
            prune_oneof_conflicts(&nested, child, &child_prefix, original_paths);
        }
    }
}

/// Index of the last original path addressing `prefix` + `key` (the field
/// itself or anything beneath it).
fn last_occurrence(prefix: &str, key: &str, paths: &[&str]) -> Option<usize> {
    paths.iter().rposition(|path| {
        let Some(rest) = path.strip_prefix(prefix) else {
            return false;
        };
        let Some(tail) = rest.strip_prefix(key) else {
            return false;
        };
        tail.is_empty() || tail.starts_with('.') || tail.starts_with('[')
    })
}

fn is_synthetic_oneof(oneof: &OneofDescriptor) -> bool {
    let mut fields = oneof.fields();
    match (fields.next(), fields.next()) {
        (Some(field), None) => field
            .field_descriptor_proto()
            .proto3_optional
            .unwrap_or(false),
        _ => false,
    }
}
