//---------------------------------------------------------------------------//
// Copyright (c) 2017-2024 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted NIF Manager (RNIF) project,
// which can be found here: https://github.com/Frodo45127/rnif.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rnif/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! This crate contains the functionality to read and write NetImmerse/Gamebryo
//! scene-graph files (NIF and its sibling extensions), driven by an external XML
//! descriptor of the format.
//!
//! The short version of how it fits together:
//! - [`schema`] loads the descriptor: versions, basic types, enums, compounds and
//!   block classes, with per-field version and condition gates.
//! - [`records`] materializes the classes as typed records, and decodes/encodes
//!   them field by field.
//! - [`files`] handles whole files: the version probe, the block list, the link
//!   stack, the footer, and the directory walker. Scene behaviors (child
//!   management, tree flattening, tangent spaces) live there too, as they operate
//!   on whole files.
//! - [`binary`] and [`math`] are the plumbing both sides stand on.
//!
//! Quick example, building a scene from scratch and round-tripping it:
//!
//! ```rust
//! use std::io::Cursor;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use rnif_lib::files::{Decodeable, DecodeableExtraData, Encodeable};
//! use rnif_lib::files::nif::NifFile;
//! use rnif_lib::schema::Schema;
//!
//! let schema = Arc::new(Schema::load_from_xml(Path::new("schemas/nif.xml")).unwrap());
//!
//! let mut file = NifFile::new(&schema, 0x14010003, 10).unwrap();
//! let root = file.new_block("NiNode").unwrap();
//! file.block_mut(root).unwrap().set_string(&schema, "name", "Scene Root").unwrap();
//! file.add_root(root).unwrap();
//!
//! let mut data = vec![];
//! file.encode(&mut data, &None).unwrap();
//!
//! let mut extra_data = DecodeableExtraData::default();
//! extra_data.set_schema(Some(&schema));
//! extra_data.set_version(0x14010003);
//! extra_data.set_user_version(10);
//!
//! let reread = NifFile::decode(&mut Cursor::new(data), &Some(extra_data)).unwrap();
//! assert_eq!(reread.roots().len(), 1);
//! ```

pub mod binary;
pub mod error;
pub mod files;
pub mod math;
pub mod records;
pub mod schema;
