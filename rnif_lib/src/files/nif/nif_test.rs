//---------------------------------------------------------------------------//
// Copyright (c) 2017-2024 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted NIF Manager (RNIF) project,
// which can be found here: https://github.com/Frodo45127/rnif.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rnif/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! Tests for the scene-graph serializer, the version probe and the block behaviors.

use nalgebra::Vector3;

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use crate::error::RNifError;
use crate::files::{walk, Decodeable, DecodeableExtraData, Encodeable, EncodeableExtraData};
use crate::files::nif::verify::TangentSpaceWarning;
use crate::records::{NifStruct, Value};
use crate::schema::Schema;

use super::{NifFile, VersionProbe};

/// Version/user version pair most of these tests write at (Gamebryo 20.1.0.3, Oblivion).
const TEST_VERSION: u32 = 0x14010003;
const TEST_USER_VERSION: u32 = 10;

/// This function loads the descriptor bundled with the crate.
fn bundled_schema() -> Arc<Schema> {
    Arc::new(Schema::load_from_xml(Path::new("schemas/nif.xml")).unwrap())
}

/// This function encodes a file to a byte vector.
fn encode(file: &mut NifFile) -> Vec<u8> {
    let mut data = vec![];
    file.encode(&mut data, &None).unwrap();
    data
}

/// This function decodes a file from a byte vector at the provided version.
fn decode(schema: &Arc<Schema>, version: u32, user_version: u32, data: &[u8]) -> Result<NifFile, RNifError> {
    let mut extra_data = DecodeableExtraData::default();
    extra_data.set_schema(Some(schema));
    extra_data.set_version(version);
    extra_data.set_user_version(user_version);

    NifFile::decode(&mut Cursor::new(data.to_vec()), &Some(extra_data))
}

/// This function builds a file with a single named root node.
fn scene_with_root(schema: &Arc<Schema>, version: u32, user_version: u32) -> (NifFile, usize) {
    let mut file = NifFile::new(schema, version, user_version).unwrap();
    let root = file.new_block("NiNode").unwrap();
    file.block_mut(root).unwrap().set_string(schema, "name", "Scene Root").unwrap();
    file.add_root(root).unwrap();
    (file, root)
}

/// This function builds a Vector3 compound value.
fn vector3_value(schema: &Arc<Schema>, x: f32, y: f32, z: f32) -> Value {
    let mut vector = NifStruct::new(schema, "Vector3", None).unwrap();
    vector.set_f32(schema, "x", x).unwrap();
    vector.set_f32(schema, "y", y).unwrap();
    vector.set_f32(schema, "z", z).unwrap();
    Value::Struct(vector)
}

/// This function builds a TexCoord compound value.
fn tex_coord_value(schema: &Arc<Schema>, u: f32, v: f32) -> Value {
    let mut coord = NifStruct::new(schema, "TexCoord", None).unwrap();
    coord.set_f32(schema, "u", u).unwrap();
    coord.set_f32(schema, "v", v).unwrap();
    Value::Struct(coord)
}

/// This function builds a one-triangle mesh with tangent-space-friendly UVs:
/// a NiTriShape root with a NiTriShapeData holding 3 vertices.
fn scene_with_triangle(schema: &Arc<Schema>) -> (NifFile, usize, usize) {
    let mut file = NifFile::new(schema, TEST_VERSION, TEST_USER_VERSION).unwrap();
    let shape = file.new_block("NiTriShape").unwrap();
    let data = file.new_block("NiTriShapeData").unwrap();
    file.block_mut(shape).unwrap().set_link(schema, "data", Some(data)).unwrap();
    file.add_root(shape).unwrap();

    let block = file.block_mut(data).unwrap();
    block.set_int(schema, "numVertices", 3).unwrap();
    *block.list_mut(schema, "vertices").unwrap() = vec![
        vector3_value(schema, 0.0, 0.0, 0.0),
        vector3_value(schema, 1.0, 0.0, 0.0),
        vector3_value(schema, 0.0, 1.0, 0.0),
    ];
    block.set_int(schema, "hasNormals", 1).unwrap();
    *block.list_mut(schema, "normals").unwrap() = vec![
        vector3_value(schema, 0.0, 0.0, 1.0),
        vector3_value(schema, 0.0, 0.0, 1.0),
        vector3_value(schema, 0.0, 0.0, 1.0),
    ];
    block.set_int(schema, "numUvSets", 1).unwrap();
    block.set_int(schema, "hasUv", 1).unwrap();
    *block.list_mut(schema, "uvSets").unwrap() = vec![Value::List(vec![
        tex_coord_value(schema, 0.0, 0.0),
        tex_coord_value(schema, 1.0, 0.0),
        tex_coord_value(schema, 0.0, 1.0),
    ])];
    block.set_int(schema, "numTriangles", 1).unwrap();
    block.set_int(schema, "numTrianglePoints", 3).unwrap();
    *block.list_mut(schema, "triangles").unwrap() = {
        let mut triangle = NifStruct::new(schema, "Triangle", None).unwrap();
        triangle.set_int(schema, "v1", 0).unwrap();
        triangle.set_int(schema, "v2", 1).unwrap();
        triangle.set_int(schema, "v3", 2).unwrap();
        vec![Value::Struct(triangle)]
    };

    (file, shape, data)
}

//---------------------------------------------------------------------------//
//                          Serializer tests
//---------------------------------------------------------------------------//

/// Test an empty scene round-trips, and the re-written bytes match the first write.
#[test]
fn round_trip_empty_scene() {
    let schema = bundled_schema();
    let (mut file, _) = scene_with_root(&schema, TEST_VERSION, TEST_USER_VERSION);

    let data = encode(&mut file);
    let mut reread = decode(&schema, TEST_VERSION, TEST_USER_VERSION, &data).unwrap();

    assert_eq!(reread.roots(), &[0]);
    let root = reread.block(0).unwrap();
    assert_eq!(root.class(), "NiNode");
    assert_eq!(root.string(&schema, "name").unwrap(), "Scene Root");
    assert_eq!(root.int(&schema, "numChildren").unwrap(), 0);

    assert_eq!(encode(&mut reread), data);
}

/// Test children keep their order across a round trip, with front insertion.
#[test]
fn child_ordering() {
    let schema = bundled_schema();
    let (mut file, root) = scene_with_root(&schema, TEST_VERSION, TEST_USER_VERSION);

    let child = file.new_block("NiNode").unwrap();
    file.block_mut(child).unwrap().set_string(&schema, "name", "new block").unwrap();
    file.add_child(root, child, false).unwrap();

    let strips = file.new_block("NiTriStrips").unwrap();
    file.block_mut(strips).unwrap().set_string(&schema, "name", "hello world").unwrap();
    file.add_child(root, strips, true).unwrap();

    let names = |file: &NifFile| -> Vec<String> {
        file.children(0).unwrap()
            .iter()
            .map(|child| file.block(*child).unwrap().string(&schema, "name").unwrap().to_owned())
            .collect()
    };
    assert_eq!(names(&file), vec!["hello world", "new block"]);

    let data = encode(&mut file);
    let reread = decode(&schema, TEST_VERSION, TEST_USER_VERSION, &data).unwrap();
    assert_eq!(names(&reread), vec!["hello world", "new block"]);
}

/// Test the version probe against streams that are not scene-graph files.
#[test]
fn probe_unknown_bytes() {
    let schema = bundled_schema();
    let mut data = Cursor::new(b"invalid".to_vec());
    assert_eq!(NifFile::probe_version(&schema, &mut data).unwrap(), VersionProbe::NotThisFormat);

    // The probe leaves the stream where it found it.
    assert_eq!(data.position(), 0);
}

/// Test the version probe against a valid header with an unlisted version.
#[test]
fn probe_unlisted_version() {
    let schema = bundled_schema();
    let mut data = Cursor::new(b"NetImmerse File Format, Version 99.99.99.99\x0A".to_vec());
    assert_eq!(NifFile::probe_version(&schema, &mut data).unwrap(), VersionProbe::UnsupportedVersion);
}

/// Test the version probe over real written data, across header layouts.
#[test]
fn probe_written_files() {
    let schema = bundled_schema();
    for (version, user_version) in [(0x03010000, 0), (0x04000002, 0), (0x0A000100, 0), (TEST_VERSION, 10), (0x14020007, 10)] {
        let (mut file, _) = scene_with_root(&schema, version, user_version);
        let data = encode(&mut file);

        let probe = NifFile::probe_version(&schema, &mut Cursor::new(data)).unwrap();
        assert_eq!(probe, VersionProbe::Supported { version, user_version });
    }
}

/// Test a scene with a child round-trips byte-for-byte across every header layout:
/// identity tokens and sentinels, sized class names, zero separators, separator-less
/// framing, and precomputed block sizes.
#[test]
fn round_trip_across_framings() {
    let schema = bundled_schema();
    for (version, user_version) in [(0x03010000, 0), (0x04000002, 0), (0x0A000100, 0), (TEST_VERSION, 10), (0x14020007, 10)] {
        let (mut file, root) = scene_with_root(&schema, version, user_version);
        let child = file.new_block("NiNode").unwrap();
        file.block_mut(child).unwrap().set_string(&schema, "name", "child").unwrap();
        file.add_child(root, child, false).unwrap();

        let data = encode(&mut file);
        let mut reread = decode(&schema, version, user_version, &data).unwrap();

        assert_eq!(reread.roots(), &[0], "version {version:#010X}");
        assert_eq!(reread.children(0).unwrap(), vec![1], "version {version:#010X}");
        assert_eq!(encode(&mut reread), data, "version {version:#010X}");
    }
}

/// Test the early-version framing literally: header line, sentinels, and the
/// end-of-file marker.
#[test]
fn early_framing_layout() {
    let schema = bundled_schema();
    let (mut file, _) = scene_with_root(&schema, 0x03010000, 0);
    let data = encode(&mut file);

    assert!(data.starts_with(b"NetImmerse File Format, Version 3.1\x0A"));

    let as_text = String::from_utf8_lossy(&data);
    assert!(as_text.contains("Top Level Object"));
    assert!(as_text.contains("End Of File"));
    assert!(as_text.contains("NiNode"));
}

/// Test a truncated file fails to read instead of resolving garbage links.
#[test]
fn truncated_file() {
    let schema = bundled_schema();
    let (mut file, _) = scene_with_root(&schema, TEST_VERSION, TEST_USER_VERSION);
    let mut data = encode(&mut file);
    data.truncate(data.len() - 4);

    assert!(decode(&schema, TEST_VERSION, TEST_USER_VERSION, &data).is_err());
}

/// Test trailing bytes after the footer are treated as corruption.
#[test]
fn trailing_bytes() {
    let schema = bundled_schema();
    let (mut file, _) = scene_with_root(&schema, TEST_VERSION, TEST_USER_VERSION);
    let mut data = encode(&mut file);
    data.push(0);

    assert!(matches!(
        decode(&schema, TEST_VERSION, TEST_USER_VERSION, &data),
        Err(RNifError::DecodingTrailingBytes(1)),
    ));
}

/// Test a non-zero block separator is rejected in the separator versions.
#[test]
fn non_zero_separator() {
    let schema = bundled_schema();
    let (mut file, _) = scene_with_root(&schema, 0x0A000100, 0);
    let mut data = encode(&mut file);

    // The separator of the first block sits right after the header: line (41),
    // version echo (4), block count (4), type table count (2), one table entry
    // (10) and one type index (2).
    assert_eq!(&data[63..67], &[0, 0, 0, 0]);
    data[63] = 1;

    assert!(matches!(
        decode(&schema, 0x0A000100, 0, &data),
        Err(RNifError::DecodingNonZeroSeparator(1, _)),
    ));
}

/// Test an unknown block type name is rejected.
#[test]
fn unknown_block_type() {
    let schema = bundled_schema();
    let (mut file, _) = scene_with_root(&schema, TEST_VERSION, TEST_USER_VERSION);
    let mut data = encode(&mut file);

    // The type table's single entry starts right after the header line (39),
    // version echo (4), endian byte (1), user version (4), block count (4),
    // second user version (4), type table count (2) and the entry length (4).
    assert_eq!(data[62], b'N');
    data[62] = b'M';

    assert!(matches!(
        decode(&schema, TEST_VERSION, TEST_USER_VERSION, &data),
        Err(RNifError::DecodingUnknownBlockType(name)) if name == "MiNode",
    ));
}

/// Test the precomputed block sizes of late versions are verified on read.
#[test]
fn block_size_check() {
    let schema = bundled_schema();
    let (mut file, _) = scene_with_root(&schema, 0x14020007, 10);
    let mut data = encode(&mut file);

    // The single block-size entry sits after the header line (39), version echo
    // (4), endian byte (1), user version (4), block count (4), second user
    // version (4), type table count (2), one table entry (10) and one type
    // index (2). The body itself is 82 bytes.
    assert_eq!(data[70], 82);
    data[70] = 83;

    assert!(matches!(
        decode(&schema, 0x14020007, 10, &data),
        Err(RNifError::DecodingBlockSizeMismatch(0, 83, 82)),
    ));
}

/// Test physics blocks are emitted after their children, and everything else before.
#[test]
fn physics_block_ordering() {
    let schema = bundled_schema();
    let (mut file, root) = scene_with_root(&schema, TEST_VERSION, TEST_USER_VERSION);

    let body = file.new_block("bhkRigidBody").unwrap();
    let sphere = file.new_block("bhkSphereShape").unwrap();
    file.block_mut(body).unwrap().set_link(&schema, "shape", Some(sphere)).unwrap();
    file.block_mut(root).unwrap().set_link(&schema, "collisionObject", Some(body)).unwrap();

    let data = encode(&mut file);
    let reread = decode(&schema, TEST_VERSION, TEST_USER_VERSION, &data).unwrap();

    // The rigid body references the sphere, yet the sphere comes first on disk.
    let classes = reread.blocks().iter().map(NifStruct::class).collect::<Vec<_>>();
    assert_eq!(classes, vec!["NiNode", "bhkSphereShape", "bhkRigidBody"]);

    let body = reread.block(0).unwrap().link(&schema, "collisionObject").unwrap().unwrap();
    assert_eq!(reread.block(body).unwrap().class(), "bhkRigidBody");
    let sphere = reread.block(body).unwrap().link(&schema, "shape").unwrap().unwrap();
    assert_eq!(reread.block(sphere).unwrap().class(), "bhkSphereShape");
}

/// Test weak references round-trip without dragging their targets into the block
/// list on their own.
#[test]
fn weak_references() {
    let schema = bundled_schema();
    let (mut file, root) = scene_with_root(&schema, TEST_VERSION, TEST_USER_VERSION);

    // A controller on the root, pointing back up at it through its weak target
    // reference. This is the cycle pattern weak references exist for.
    let controller = file.new_block("NiVisController").unwrap();
    file.block_mut(root).unwrap().set_link(&schema, "controller", Some(controller)).unwrap();
    file.block_mut(controller).unwrap().set_link(&schema, "target", Some(root)).unwrap();

    let data = encode(&mut file);
    let reread = decode(&schema, TEST_VERSION, TEST_USER_VERSION, &data).unwrap();

    let controller = reread.block(0).unwrap().link(&schema, "controller").unwrap().unwrap();
    assert_eq!(reread.block(controller).unwrap().link(&schema, "target").unwrap(), Some(0));
}

/// Test a reference resolving to a block of the wrong class is rejected.
#[test]
fn link_type_mismatch() {
    let schema = bundled_schema();
    let (mut file, root) = scene_with_root(&schema, TEST_VERSION, TEST_USER_VERSION);

    // A controller slot pointing at a node. The writer emits it happily (it only
    // knows indices), the reader must catch it against the field template.
    let child = file.new_block("NiNode").unwrap();
    file.add_child(root, child, false).unwrap();
    file.block_mut(root).unwrap().set_link(&schema, "controller", Some(child)).unwrap();

    let data = encode(&mut file);
    assert!(matches!(
        decode(&schema, TEST_VERSION, TEST_USER_VERSION, &data),
        Err(RNifError::TypeMismatch(expected, found)) if expected == "NiTimeController" && found == "NiNode",
    ));
}

/// Test interned strings land in the header string table, deduplicated, and
/// template-typed string fields reach it too.
#[test]
fn string_table() {
    let schema = bundled_schema();
    let (mut file, root) = scene_with_root(&schema, TEST_VERSION, TEST_USER_VERSION);

    let keys = file.new_block("NiTextKeyExtraData").unwrap();
    {
        let block = file.block_mut(keys).unwrap();
        block.set_string(&schema, "name", "Scene Root").unwrap();
        block.set_int(&schema, "numTextKeys", 2).unwrap();

        let mut first = NifStruct::new(&schema, "Key", Some("string")).unwrap();
        first.set_f32(&schema, "time", 0.0).unwrap();
        first.set_string(&schema, "value", "start").unwrap();
        let mut second = NifStruct::new(&schema, "Key", Some("string")).unwrap();
        second.set_f32(&schema, "time", 1.0).unwrap();
        second.set_string(&schema, "value", "end").unwrap();
        *block.list_mut(&schema, "textKeys").unwrap() = vec![Value::Struct(first), Value::Struct(second)];
    }

    let block = file.block_mut(root).unwrap();
    block.list_mut(&schema, "extraDataList").unwrap().push(Value::Link(Some(keys)));
    block.set_int(&schema, "numExtraDataList", 1).unwrap();

    let data = encode(&mut file);
    let reread = decode(&schema, TEST_VERSION, TEST_USER_VERSION, &data).unwrap();

    // "Scene Root" appears in two blocks but only once in the table.
    let table = reread.header().list(&schema, "strings").unwrap();
    assert_eq!(table, &[
        Value::String("Scene Root".to_owned()),
        Value::String("start".to_owned()),
        Value::String("end".to_owned()),
    ]);

    let keys = reread.extra_data_blocks(0).unwrap()[0];
    let reread_keys = reread.block(keys).unwrap().list(&schema, "textKeys").unwrap();
    let Value::Struct(first) = &reread_keys[0] else { panic!() };
    assert_eq!(first.string(&schema, "value").unwrap(), "start");
}

/// Test writing at a different version than the file was built at.
#[test]
fn write_version_override() {
    let schema = bundled_schema();
    let (mut file, _) = scene_with_root(&schema, TEST_VERSION, TEST_USER_VERSION);

    let mut extra_data = EncodeableExtraData::default();
    extra_data.set_version(Some(0x0A000100));
    extra_data.set_user_version(Some(0));

    let mut data = vec![];
    file.encode(&mut data, &Some(extra_data)).unwrap();

    let reread = decode(&schema, 0x0A000100, 0, &data).unwrap();
    assert_eq!(reread.block(0).unwrap().string(&schema, "name").unwrap(), "Scene Root");
}

/// Test the directory walker filters by extension and skips what it cannot read.
#[test]
fn walker() {
    let schema = bundled_schema();
    let dir = tempfile::tempdir().unwrap();

    let (mut file, _) = scene_with_root(&schema, TEST_VERSION, TEST_USER_VERSION);
    file.save(&dir.path().join("scene.nif")).unwrap();
    file.save(&dir.path().join("SCENE2.NIF")).unwrap();

    std::fs::write(dir.path().join("readme.txt"), b"not a model").unwrap();
    std::fs::write(dir.path().join("broken.nif"), b"invalid").unwrap();

    let walked = walk(dir.path(), &schema).unwrap().collect::<Vec<_>>();
    assert_eq!(walked.len(), 2);
    for entry in &walked {
        assert_eq!(*entry.version(), TEST_VERSION);
        assert_eq!(entry.file().roots(), &[0]);
    }
}

//---------------------------------------------------------------------------//
//                          Behavior tests
//---------------------------------------------------------------------------//

/// Test child management keeps the counter in sync and checks classes.
#[test]
fn add_remove_child() {
    let schema = bundled_schema();
    let (mut file, root) = scene_with_root(&schema, TEST_VERSION, TEST_USER_VERSION);

    let child = file.new_block("NiNode").unwrap();
    file.add_child(root, child, false).unwrap();
    assert_eq!(file.block(root).unwrap().int(&schema, "numChildren").unwrap(), 1);

    file.remove_child(root, child).unwrap();
    assert_eq!(file.block(root).unwrap().int(&schema, "numChildren").unwrap(), 0);
    assert!(file.children(root).unwrap().is_empty());

    // Physics blocks are not scene objects, so they can't be children.
    let sphere = file.new_block("bhkSphereShape").unwrap();
    assert!(matches!(file.add_child(root, sphere, false), Err(RNifError::TypeMismatch(..))));
}

/// Test tree flattening re-parents descendants while keeping world transforms.
#[test]
fn flatten_tree() {
    let schema = bundled_schema();
    let (mut file, root) = scene_with_root(&schema, TEST_VERSION, TEST_USER_VERSION);

    let middle = file.new_block("NiNode").unwrap();
    file.block_mut(middle).unwrap().set_vector3(&schema, "translation", &Vector3::new(1.0, 0.0, 0.0)).unwrap();
    file.add_child(root, middle, false).unwrap();

    let leaf = file.new_block("NiTriShape").unwrap();
    file.block_mut(leaf).unwrap().set_vector3(&schema, "translation", &Vector3::new(0.0, 1.0, 0.0)).unwrap();
    file.add_child(middle, leaf, false).unwrap();

    file.flatten_tree(root).unwrap();

    // The leaf hangs from the root now, with both translations composed.
    assert_eq!(file.children(root).unwrap(), vec![middle, leaf]);
    assert!(file.children(middle).unwrap().is_empty());
    let translation = file.block(leaf).unwrap().vector3(&schema, "translation").unwrap();
    assert_eq!(translation, Vector3::new(1.0, 1.0, 0.0));
}

/// Test flattening a cyclic graph fails instead of hanging.
#[test]
fn flatten_cycle() {
    let schema = bundled_schema();
    let (mut file, root) = scene_with_root(&schema, TEST_VERSION, TEST_USER_VERSION);

    let node = file.new_block("NiNode").unwrap();
    file.add_child(root, node, false).unwrap();
    file.add_child(node, node, false).unwrap();

    assert!(matches!(file.flatten_tree(root), Err(RNifError::SceneCycleDetected(_))));
}

/// Test triangle reconstruction from triangle strips, degenerates dropped.
#[test]
fn strips_to_triangles() {
    let schema = bundled_schema();
    let mut file = NifFile::new(&schema, TEST_VERSION, TEST_USER_VERSION).unwrap();
    let strips = file.new_block("NiTriStrips").unwrap();
    let data = file.new_block("NiTriStripsData").unwrap();
    file.block_mut(strips).unwrap().set_link(&schema, "data", Some(data)).unwrap();
    file.add_root(strips).unwrap();

    let block = file.block_mut(data).unwrap();
    block.set_int(&schema, "numVertices", 5).unwrap();
    block.set_int(&schema, "hasVertices", 0).unwrap();
    block.set_int(&schema, "numStrips", 2).unwrap();
    *block.list_mut(&schema, "stripLengths").unwrap() = vec![Value::U16(3), Value::U16(6)];
    *block.list_mut(&schema, "points").unwrap() = vec![
        Value::List(vec![Value::U16(0), Value::U16(1), Value::U16(2)]),
        Value::List(vec![Value::U16(1), Value::U16(2), Value::U16(3), Value::U16(4), Value::U16(4), Value::U16(2)]),
    ];

    // The second strip alternates winding, and its stitching repeats drop the
    // last two triangles.
    assert_eq!(file.triangles(strips).unwrap(), vec![
        [0, 1, 2],
        [1, 2, 3],
        [2, 4, 3],
    ]);
}

//---------------------------------------------------------------------------//
//                          Tangent space tests
//---------------------------------------------------------------------------//

/// Test tangent-space generation produces an orthonormal frame aligned with the UVs.
#[test]
fn tangent_space_generation() {
    let schema = bundled_schema();
    let (mut file, shape, _) = scene_with_triangle(&schema);

    file.update_tangent_space(shape).unwrap();

    let payload = file.tangent_space_payload(shape).unwrap().unwrap();
    assert_eq!(payload.len(), 72);

    // With this planar mesh the tangent follows U and the binormal follows V.
    let mut reader = Cursor::new(&payload);
    use crate::binary::ReadBytes;
    for _ in 0..3 {
        assert_eq!(reader.read_f32().unwrap(), 1.0);
        assert_eq!(reader.read_f32().unwrap(), 0.0);
        assert_eq!(reader.read_f32().unwrap(), 0.0);
    }
    for _ in 0..3 {
        assert_eq!(reader.read_f32().unwrap(), 0.0);
        assert_eq!(reader.read_f32().unwrap(), 1.0);
        assert_eq!(reader.read_f32().unwrap(), 0.0);
    }

    // And the whole thing survives a round trip, extra data block included.
    let data = encode(&mut file);
    let reread = decode(&schema, TEST_VERSION, TEST_USER_VERSION, &data).unwrap();
    assert_eq!(reread.tangent_space_payload(0).unwrap().unwrap(), payload);
}

/// Test tangent-space verification stays quiet on a good frame and flags a bad normal.
#[test]
fn tangent_space_verification() {
    let schema = bundled_schema();
    let (mut file, shape, data) = scene_with_triangle(&schema);
    file.update_tangent_space(shape).unwrap();

    assert!(file.check_tangent_space(shape).unwrap().is_empty());

    // Shrink one normal to half length: exactly one warning, at that vertex.
    let block = file.block_mut(data).unwrap();
    let normals = block.list_mut(&schema, "normals").unwrap();
    normals[1] = vector3_value(&schema, 0.0, 0.0, 0.5);

    let warnings = file.check_tangent_space(shape).unwrap();
    assert_eq!(warnings, vec![TangentSpaceWarning::NonUnitNormal(1, 0.5)]);

    // The check must not leave the recomputed payload behind.
    let payload = file.tangent_space_payload(shape).unwrap().unwrap();
    assert_eq!(payload.len(), 72);
}

/// Test the verification rejects a payload whose size doesn't match the vertex
/// count, before looking at any component.
#[test]
fn tangent_space_size_check() {
    let schema = bundled_schema();
    let (mut file, shape, _) = scene_with_triangle(&schema);
    file.set_tangent_space_payload(shape, &[0; 71]).unwrap();

    assert!(matches!(
        file.check_tangent_space(shape),
        Err(RNifError::VerifyTangentSpaceSize(72, 71)),
    ));
}
