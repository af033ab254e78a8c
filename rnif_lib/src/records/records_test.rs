//---------------------------------------------------------------------------//
// Copyright (c) 2017-2024 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted NIF Manager (RNIF) project,
// which can be found here: https://github.com/Frodo45127/rnif.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rnif/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! Tests for the typed records: defaults, accessors, and version-gated field IO.

use nalgebra::Matrix3;

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use crate::schema::Schema;

use super::*;

/// This function loads the descriptor bundled with the crate.
fn bundled_schema() -> Schema {
    Schema::load_from_xml(Path::new("schemas/nif.xml")).unwrap()
}

/// This function encodes a record at the provided version, with empty tables.
fn encode_record(schema: &Schema, record: &NifStruct, version: u32) -> Vec<u8> {
    let strings = HashMap::new();
    let block_tokens = HashMap::new();
    let ctx = EncodeContext { version, user_version: 0, strings: &strings, block_tokens: &block_tokens };

    let mut data = vec![];
    encode_instance(schema, record, &mut data, &ctx).unwrap();
    data
}

/// This function decodes a record of the provided class at the provided version.
fn decode_record(schema: &Schema, class: &str, version: u32, data: &[u8]) -> Result<NifStruct> {
    let mut link_stack = VecDeque::new();
    let mut ctx = DecodeContext { version, user_version: 0, strings: &[], link_stack: &mut link_stack };
    let record = decode_instance(schema, class, None, &mut Cursor::new(data), &mut ctx)?;
    assert!(link_stack.is_empty());
    Ok(record)
}

//---------------------------------------------------------------------------//
//                                  Tests
//---------------------------------------------------------------------------//

/// Test fresh instances get their descriptor defaults.
#[test]
fn instance_defaults() {
    let schema = bundled_schema();
    let node = NifStruct::new(&schema, "NiNode", None).unwrap();

    assert_eq!(node.class(), "NiNode");
    assert_eq!(node.f32(&schema, "scale").unwrap(), 1.0);
    assert_eq!(node.int(&schema, "numChildren").unwrap(), 0);
    assert_eq!(node.string(&schema, "name").unwrap(), "");
    assert_eq!(node.link(&schema, "controller").unwrap(), None);
    assert!(node.list(&schema, "children").unwrap().is_empty());

    // The rotation compound defaults to the identity.
    assert_eq!(node.matrix33(&schema, "rotation").unwrap(), Matrix3::identity());

    // The header defaults its secondary user version from the descriptor.
    let header = NifStruct::new(&schema, "Header", None).unwrap();
    assert_eq!(header.int(&schema, "userVersion2").unwrap(), 11);

    // And enum-typed fields default by option name.
    assert_eq!(header.int(&schema, "endianType").unwrap(), 1);
}

/// Test the typed accessors and their error reporting.
#[test]
fn accessors() {
    let schema = bundled_schema();
    let mut node = NifStruct::new(&schema, "NiNode", None).unwrap();

    node.set_string(&schema, "name", "Scene Root").unwrap();
    assert_eq!(node.string(&schema, "name").unwrap(), "Scene Root");

    node.set_int(&schema, "numChildren", 2).unwrap();
    assert_eq!(node.int(&schema, "numChildren").unwrap(), 2);

    node.set_link(&schema, "controller", Some(4)).unwrap();
    assert_eq!(node.link(&schema, "controller").unwrap(), Some(4));

    // Accessing a field with the wrong type fails.
    assert!(matches!(node.f32(&schema, "name"), Err(RNifError::RecordWrongValueType(..))));

    // Accessing a missing field fails.
    assert!(matches!(node.int(&schema, "numVertices"), Err(RNifError::SchemaMissingField(..))));
}

/// Test arrays only grow through the explicit resize operation.
#[test]
fn resize() {
    let schema = bundled_schema();
    let mut node = NifStruct::new(&schema, "NiNode", None).unwrap();

    node.resize_list(&schema, "children", 2).unwrap();
    assert_eq!(node.list(&schema, "children").unwrap(), &[Value::Link(None), Value::Link(None)]);

    node.resize_list(&schema, "children", 1).unwrap();
    assert_eq!(node.list(&schema, "children").unwrap().len(), 1);
}

/// Test the encoder refuses arrays out of sync with their length field.
#[test]
fn encode_length_mismatch() {
    let schema = bundled_schema();
    let mut node = NifStruct::new(&schema, "NiNode", None).unwrap();
    node.set_int(&schema, "numChildren", 1).unwrap();

    let strings = HashMap::new();
    let block_tokens = HashMap::new();
    let ctx = EncodeContext { version: 0x14010003, user_version: 0, strings: &strings, block_tokens: &block_tokens };

    let mut data = vec![];
    assert!(matches!(encode_instance(&schema, &node, &mut data, &ctx), Err(RNifError::EncodingArrayLengthMismatch(..))));
}

/// Test booleans change width across versions, and gated fields stay out of the stream.
#[test]
fn version_gated_io() {
    let schema = bundled_schema();
    let mut data_block = NifStruct::new(&schema, "NiTriShapeData", None).unwrap();
    data_block.set_int(&schema, "numVertices", 0).unwrap();
    data_block.set_int(&schema, "hasVertices", 0).unwrap();
    data_block.set_int(&schema, "hasNormals", 0).unwrap();
    data_block.set_int(&schema, "hasUv", 0).unwrap();
    data_block.set_int(&schema, "hasTriangles", 0).unwrap();

    // Four booleans in this class: one byte each in late versions, four bytes
    // each up to 4.0.0.2.
    let narrow = encode_record(&schema, &data_block, 0x14000005);
    let wide = encode_record(&schema, &data_block, 0x04000002);
    assert_eq!(wide.len(), narrow.len() + 12);

    // Both round-trip at their own version.
    assert_eq!(decode_record(&schema, "NiTriShapeData", 0x14000005, &narrow).unwrap(), data_block);
    assert_eq!(decode_record(&schema, "NiTriShapeData", 0x04000002, &wide).unwrap(), data_block);
}

/// Test conditions gate fields on the values read before them.
#[test]
fn condition_gated_io() {
    let schema = bundled_schema();
    let mut strips = NifStruct::new(&schema, "NiTriStripsData", None).unwrap();
    strips.set_int(&schema, "numVertices", 0).unwrap();
    strips.set_int(&schema, "hasVertices", 0).unwrap();
    strips.set_int(&schema, "hasNormals", 0).unwrap();
    strips.set_int(&schema, "hasUv", 0).unwrap();
    strips.set_int(&schema, "numStrips", 2).unwrap();
    *strips.list_mut(&schema, "stripLengths").unwrap() = vec![Value::U16(3), Value::U16(2)];

    // With points enabled, the strip data is a jagged array sized by the
    // lengths read right before it.
    *strips.list_mut(&schema, "points").unwrap() = vec![
        Value::List(vec![Value::U16(0), Value::U16(1), Value::U16(2)]),
        Value::List(vec![Value::U16(1), Value::U16(2)]),
    ];

    let with_points = encode_record(&schema, &strips, 0x14000005);
    let round_trip = decode_record(&schema, "NiTriStripsData", 0x14000005, &with_points).unwrap();
    assert_eq!(round_trip, strips);

    // With points disabled, the jagged array vanishes from the stream entirely.
    strips.set_int(&schema, "hasPoints", 0).unwrap();
    *strips.list_mut(&schema, "points").unwrap() = vec![];
    let without_points = encode_record(&schema, &strips, 0x14000005);
    assert_eq!(with_points.len() - without_points.len(), 10);
}

/// Test parametric classes bind their template at instantiation.
#[test]
fn templates() {
    let schema = bundled_schema();

    // A Key bound to string holds a string value.
    let mut key = NifStruct::new(&schema, "Key", Some("string")).unwrap();
    key.set_f32(&schema, "time", 1.0).unwrap();
    key.set_string(&schema, "value", "hi").unwrap();
    assert_eq!(key.template(), Some("string"));

    // A Key bound to float holds a float value.
    let mut key = NifStruct::new(&schema, "Key", Some("float")).unwrap();
    key.set_f32(&schema, "value", 0.5).unwrap();
    assert_eq!(key.f32(&schema, "value").unwrap(), 0.5);

    // An unbound Key cannot be instantiated at all.
    assert!(matches!(NifStruct::new(&schema, "Key", None), Err(RNifError::SchemaUnboundTemplate(_))));
}
