//! Hand-built descriptor fixtures shared by the unit tests.
//!
//! Building `FileDescriptorSet`s in code keeps the tests independent of a
//! `protoc` binary on the test host.

use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet, MessageOptions, OneofDescriptorProto,
};

pub(crate) fn fdset(files: Vec<FileDescriptorProto>) -> FileDescriptorSet {
    FileDescriptorSet { file: files }
}

pub(crate) fn file_proto(
    name: &str,
    package: &str,
    messages: Vec<DescriptorProto>,
) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_string()),
        package: Some(package.to_string()),
        syntax: Some("proto3".to_string()),
        message_type: messages,
        ..Default::default()
    }
}

pub(crate) fn file_proto_with_deps(
    name: &str,
    package: &str,
    deps: &[&str],
    messages: Vec<DescriptorProto>,
) -> FileDescriptorProto {
    FileDescriptorProto {
        dependency: deps.iter().map(ToString::to_string).collect(),
        ..file_proto(name, package, messages)
    }
}

pub(crate) fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

pub(crate) fn message_with_oneofs(
    name: &str,
    fields: Vec<FieldDescriptorProto>,
    oneofs: &[&str],
) -> DescriptorProto {
    DescriptorProto {
        oneof_decl: oneofs
            .iter()
            .map(|n| OneofDescriptorProto {
                name: Some((*n).to_string()),
                ..Default::default()
            })
            .collect(),
        ..message(name, fields)
    }
}

fn field(name: &str, number: i32, ty: Type, label: Label) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

pub(crate) fn string_field(
    name: &str,
    number: i32,
    oneof_index: Option<i32>,
) -> FieldDescriptorProto {
    FieldDescriptorProto {
        oneof_index,
        ..field(name, number, Type::String, Label::Optional)
    }
}

pub(crate) fn int32_field(name: &str, number: i32) -> FieldDescriptorProto {
    field(name, number, Type::Int32, Label::Optional)
}

pub(crate) fn int64_field(name: &str, number: i32) -> FieldDescriptorProto {
    field(name, number, Type::Int64, Label::Optional)
}

pub(crate) fn bool_field(name: &str, number: i32) -> FieldDescriptorProto {
    field(name, number, Type::Bool, Label::Optional)
}

pub(crate) fn message_field(
    name: &str,
    number: i32,
    type_name: &str,
    oneof_index: Option<i32>,
) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        oneof_index,
        ..field(name, number, Type::Message, Label::Optional)
    }
}

pub(crate) fn repeated_message_field(
    name: &str,
    number: i32,
    type_name: &str,
) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..field(name, number, Type::Message, Label::Repeated)
    }
}

pub(crate) fn repeated_string_field(name: &str, number: i32) -> FieldDescriptorProto {
    field(name, number, Type::String, Label::Repeated)
}

pub(crate) fn enum_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..field(name, number, Type::Enum, Label::Optional)
    }
}

pub(crate) fn enum_proto(name: &str, values: &[(&str, i32)]) -> EnumDescriptorProto {
    EnumDescriptorProto {
        name: Some(name.to_string()),
        value: values
            .iter()
            .map(|(n, num)| EnumValueDescriptorProto {
                name: Some((*n).to_string()),
                number: Some(*num),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

/// A synthetic map entry message, as protoc would generate for
/// `map<string, V> name = N;`.
pub(crate) fn map_entry(name: &str, value: FieldDescriptorProto) -> DescriptorProto {
    DescriptorProto {
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..message(name, vec![string_field("key", 1, None), value])
    }
}

/// Descriptor for `google/protobuf/timestamp.proto`, enough for the pool to
/// treat `google.protobuf.Timestamp` as the well-known type.
pub(crate) fn timestamp_file() -> FileDescriptorProto {
    file_proto(
        "google/protobuf/timestamp.proto",
        "google.protobuf",
        vec![message(
            "Timestamp",
            vec![int64_field("seconds", 1), int32_field("nanos", 2)],
        )],
    )
}
