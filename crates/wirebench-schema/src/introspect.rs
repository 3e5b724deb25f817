//! UI-facing schema metadata, derived on demand from descriptors.
//!
//! Nothing here exposes raw compiler types: the views are plain serializable
//! data a body editor can render directly. [`message_schema`] describes one
//! message level in full; [`flatten_message_fields`] walks nested messages
//! into a single dot-path list usable to auto-generate an editor.

use std::collections::BTreeSet;

use prost_reflect::{EnumDescriptor, FieldDescriptor, Kind, MessageDescriptor, OneofDescriptor};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::Result;
use crate::registry::SchemaRegistry;

/// Recursion bound for [`flatten_message_fields`]. Self-referential message
/// graphs stop expanding here; the truncated field stays as a message leaf.
const MAX_FLATTEN_DEPTH: usize = 8;

/// Read-only metadata for one message type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaView {
    /// Fully-qualified message name.
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<FieldView>,
    /// Oneof groups (synthetic proto3-optional groups excluded).
    pub oneofs: Vec<OneofView>,
    /// Reserved field-number ranges, half-open `[start, end)`.
    pub reserved_ranges: Vec<(u32, u32)>,
    /// Reserved field names.
    pub reserved_names: Vec<String>,
}

/// One field of a [`SchemaView`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldView {
    /// Proto field name.
    pub name: String,
    /// JSON-style (lowerCamelCase) name.
    pub json_name: String,
    /// Wire number.
    pub number: u32,
    /// Kind string: `bool`, `int32`, `string`, `message`, `enum`, ...
    pub kind: String,
    /// `optional`, `repeated`, or `map`.
    pub cardinality: String,
    /// Whether the field tracks explicit presence.
    pub has_presence: bool,
    /// Zero value per kind: `false` / `0` / `0.0` / `""` / first enum value
    /// name / `null` for messages.
    pub default: Value,
    /// Index of the containing oneof group, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oneof_index: Option<usize>,
    /// Nested message FQMN for message-typed fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    /// Well-known-type annotation: `timestamp-rfc3339`, `duration`, `json`
    /// (Struct/Value/ListValue/Any), or `scalar-wrapper`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub well_known: Option<String>,
    /// Map key kind for map fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_key_kind: Option<String>,
    /// Map value kind for map fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_value_kind: Option<String>,
    /// Value FQMN for message-valued maps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_value_type: Option<String>,
    /// Ordered `(name, number)` pairs for enum fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<EnumValueView>>,
}

/// One enum value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumValueView {
    /// Value name as declared.
    pub name: String,
    /// Wire number.
    pub number: i32,
}

/// One oneof group of a [`SchemaView`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OneofView {
    /// Declaration index within the message.
    pub index: usize,
    /// Oneof name.
    pub name: String,
    /// Member field names.
    pub fields: Vec<String>,
}

/// One entry of the flattened field list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatField {
    /// Dot-path from the root message, e.g. `user.emails`.
    pub path: String,
    /// Proto field name (last path segment).
    pub name: String,
    /// Kind string, as in [`FieldView::kind`].
    pub kind: String,
    /// Whether the field is repeated.
    pub repeated: bool,
    /// Whether the field is a singular presence-tracking field.
    pub optional: bool,
    /// Whether the field is message-typed (maps excluded).
    pub message: bool,
    /// Nested message FQMN for message-typed fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    /// Enum FQMN for enum fields.
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_name: Option<String>,
    /// Ordered values for enum fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<EnumValueView>>,
    /// Containing oneof index, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oneof: Option<usize>,
    /// Containing oneof name, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oneof_name: Option<String>,
}

/// Produce the [`SchemaView`] for a registered message type.
///
/// # Errors
///
/// [`crate::Error::NotFound`] when no registered message has this name.
pub fn message_schema(registry: &SchemaRegistry, fqmn: &str) -> Result<SchemaView> {
    let desc = registry.get_message_by_name(fqmn)?;

    let oneofs: Vec<OneofView> = desc
        .oneofs()
        .enumerate()
        .filter(|(_, oneof)| !is_synthetic_oneof(oneof))
        .map(|(index, oneof)| OneofView {
            index,
            name: oneof.name().to_string(),
            fields: oneof.fields().map(|f| f.name().to_string()).collect(),
        })
        .collect();

    let fields = desc.fields().map(|field| field_view(&desc, &field)).collect();

    Ok(SchemaView {
        name: desc.full_name().to_string(),
        fields,
        oneofs,
        reserved_ranges: desc
            .reserved_ranges()
            .map(|range| (range.start, range.end))
            .collect(),
        reserved_names: desc.reserved_names().map(ToString::to_string).collect(),
    })
}

/// Recursively flatten a message's fields into dot-path entries.
///
/// Nested message fields expand up to a fixed depth bound; past it the field
/// stays as a message leaf rather than erroring, so self-referential types
/// remain browsable. A per-call visited-path set suppresses duplicate
/// entries.
///
/// # Errors
///
/// [`crate::Error::NotFound`] when the root type itself is unresolvable —
/// the only place this operation errors.
pub fn flatten_message_fields(registry: &SchemaRegistry, fqmn: &str) -> Result<Vec<FlatField>> {
    let desc = registry.get_message_by_name(fqmn)?;
    let mut out = Vec::new();
    let mut visited = BTreeSet::new();
    flatten_into(&desc, "", 0, &mut visited, &mut out);
    Ok(out)
}

fn flatten_into(
    desc: &MessageDescriptor,
    prefix: &str,
    depth: usize,
    visited: &mut BTreeSet<String>,
    out: &mut Vec<FlatField>,
) {
    for field in desc.fields() {
        let path = format!("{prefix}{}", field.name());
        if !visited.insert(path.clone()) {
            continue;
        }

        let kind = field.kind();
        let is_map = field.is_map();
        let is_message = matches!(kind, Kind::Message(_)) && !is_map;
        let (oneof, oneof_name) = oneof_backref(desc, &field);
        let (enum_name, enum_values) = match &kind {
            Kind::Enum(e) => (
                Some(e.full_name().to_string()),
                Some(enum_value_views(e)),
            ),
            _ => (None, None),
        };

        out.push(FlatField {
            path: path.clone(),
            name: field.name().to_string(),
            kind: kind_str(&kind).to_string(),
            repeated: field.is_list(),
            optional: field.supports_presence() && !field.is_list() && !is_map,
            message: is_message,
            message_type: match &kind {
                Kind::Message(m) if !is_map => Some(m.full_name().to_string()),
                _ => None,
            },
            enum_name,
            enum_values,
            oneof,
            oneof_name,
        });

        if is_message && depth < MAX_FLATTEN_DEPTH {
            if let Kind::Message(nested) = &kind {
                let child_prefix = format!("{path}.");
                flatten_into(nested, &child_prefix, depth + 1, visited, out);
            }
        }
    }
}

fn field_view(desc: &MessageDescriptor, field: &FieldDescriptor) -> FieldView {
    let kind = field.kind();
    let is_map = field.is_map();
    let cardinality = if is_map {
        "map"
    } else if field.is_list() {
        "repeated"
    } else {
        "optional"
    };

    let (map_key_kind, map_value_kind, map_value_type) = if is_map {
        if let Kind::Message(entry) = &kind {
            let value_field = entry.map_entry_value_field();
            let value_kind = value_field.kind();
            (
                Some(kind_str(&entry.map_entry_key_field().kind()).to_string()),
                Some(kind_str(&value_kind).to_string()),
                match value_kind {
                    Kind::Message(m) => Some(m.full_name().to_string()),
                    _ => None,
                },
            )
        } else {
            (None, None, None)
        }
    } else {
        (None, None, None)
    };

    let (message_type, well_known) = match &kind {
        Kind::Message(m) if !is_map => (
            Some(m.full_name().to_string()),
            well_known_annotation(m.full_name()).map(ToString::to_string),
        ),
        _ => (None, None),
    };

    let enum_values = match &kind {
        Kind::Enum(e) => Some(enum_value_views(e)),
        _ => None,
    };

    let (oneof_index, _) = oneof_backref(desc, field);

    FieldView {
        name: field.name().to_string(),
        json_name: field.json_name().to_string(),
        number: field.number(),
        kind: kind_str(&kind).to_string(),
        cardinality: cardinality.to_string(),
        has_presence: field.supports_presence(),
        default: default_for(&kind),
        oneof_index,
        message_type,
        well_known,
        map_key_kind,
        map_value_kind,
        map_value_type,
        enum_values,
    }
}

/// The non-synthetic oneof containing `field`, as `(index, name)`.
fn oneof_backref(
    desc: &MessageDescriptor,
    field: &FieldDescriptor,
) -> (Option<usize>, Option<String>) {
    let Some(containing) = field.containing_oneof() else {
        return (None, None);
    };
    if is_synthetic_oneof(&containing) {
        return (None, None);
    }
    let index = desc
        .oneofs()
        .position(|oneof| oneof.name() == containing.name());
    (index, Some(containing.name().to_string()))
}

/// A proto3 `optional` field is represented as a single-member synthetic
/// oneof; those are an encoding detail, not a user-declared group.
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

fn enum_value_views(desc: &EnumDescriptor) -> Vec<EnumValueView> {
    desc.values()
        .map(|v| EnumValueView {
            name: v.name().to_string(),
            number: v.number(),
        })
        .collect()
}

/// Stable kind names for the UI.
fn kind_str(kind: &Kind) -> &'static str {
    match kind {
        Kind::Double => "double",
        Kind::Float => "float",
        Kind::Int32 => "int32",
        Kind::Int64 => "int64",
        Kind::Uint32 => "uint32",
        Kind::Uint64 => "uint64",
        Kind::Sint32 => "sint32",
        Kind::Sint64 => "sint64",
        Kind::Fixed32 => "fixed32",
        Kind::Fixed64 => "fixed64",
        Kind::Sfixed32 => "sfixed32",
        Kind::Sfixed64 => "sfixed64",
        Kind::Bool => "bool",
        Kind::String => "string",
        Kind::Bytes => "bytes",
        Kind::Message(_) => "message",
        Kind::Enum(_) => "enum",
    }
}

/// Zero value per kind.
fn default_for(kind: &Kind) -> Value {
    match kind {
        Kind::Double | Kind::Float => json!(0.0),
        Kind::Int32
        | Kind::Int64
        | Kind::Uint32
        | Kind::Uint64
        | Kind::Sint32
        | Kind::Sint64
        | Kind::Fixed32
        | Kind::Fixed64
        | Kind::Sfixed32
        | Kind::Sfixed64 => json!(0),
        Kind::Bool => json!(false),
        Kind::String | Kind::Bytes => json!(""),
        Kind::Enum(e) => json!(e.default_value().name()),
        Kind::Message(_) => Value::Null,
    }
}

/// Annotation for the fixed set of well-known types the UI special-cases.
fn well_known_annotation(full_name: &str) -> Option<&'static str> {
    match full_name {
        "google.protobuf.Timestamp" => Some("timestamp-rfc3339"),
        "google.protobuf.Duration" => Some("duration"),
        "google.protobuf.Struct"
        | "google.protobuf.Value"
        | "google.protobuf.ListValue"
        | "google.protobuf.Any" => Some("json"),
        "google.protobuf.DoubleValue"
        | "google.protobuf.FloatValue"
        | "google.protobuf.Int64Value"
        | "google.protobuf.UInt64Value"
        | "google.protobuf.Int32Value"
        | "google.protobuf.UInt32Value"
        | "google.protobuf.BoolValue"
        | "google.protobuf.StringValue"
        | "google.protobuf.BytesValue" => Some("scalar-wrapper"),
        _ => None,
    }
}
