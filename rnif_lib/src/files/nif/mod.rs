//---------------------------------------------------------------------------//
// Copyright (c) 2017-2024 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted NIF Manager (RNIF) project,
// which can be found here: https://github.com/Frodo45127/rnif.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rnif/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! NIF files are scene-graph files: an ordered list of typed, cross-referencing
//! blocks, used by every NetImmerse/Gamebryo game since the late nineties.
//!
//! # NIF Structure
//!
//! | Section | Data                                                                              |
//! | ------- | --------------------------------------------------------------------------------- |
//! | Header  | Version line, counts, block type table, and (in late versions) the string table.  |
//! | Blocks  | The block list. Framing changed three times across versions, see below.           |
//! | Footer  | The root list (from 3.3.0.13 on).                                                 |
//!
//! ## Block framing
//!
//! | Versions                 | Framing                                                                             |
//! | ------------------------ | ----------------------------------------------------------------------------------- |
//! | < 3.3.0.13               | Sized class-name string + 32-bit identity token per block, between the              |
//! |                          | `"Top Level Object"` and `"End Of File"` sentinels.                                 |
//! | [3.3.0.13, 5.0.0.1)      | Sized class-name string per block, block index is the position in the list.         |
//! | [5.0.0.1, 10.1.0.106]    | 32-bit zero separator per block, class names come from the header table.            |
//! | > 10.1.0.106             | No separator at all.                                                                |
//!
//! References are 32-bit values: block-list indices (-1 for null) from 3.3.0.13 on,
//! identity tokens (0 for null) before. They resolve in a second pass, through the
//! link stack the field decoders fill in read order.

use itertools::Itertools;
use log::debug;

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor};
use std::path::Path;
use std::sync::Arc;

use crate::binary::{ReadBytes, WriteBytes};
use crate::error::{Result, RNifError};
use crate::files::{Decodeable, DecodeableExtraData, Encodeable, EncodeableExtraData};
use crate::records::{collect_refs, collect_strings, decode_instance, encode_instance, for_each_link, DecodeContext, EncodeContext, NifStruct, Value, MAX_HEADER_LINE};
use crate::schema::{version_number, Schema, LINK_BY_INDEX_VERSION};

pub mod geometry;
pub mod node;
pub mod verify;

#[cfg(test)] mod nif_test;

/// Extension used by scene-graph files.
pub const EXTENSION: &str = ".nif";

/// First version with a block type table in the header.
const BLOCK_TYPE_TABLE_VERSION: u32 = 0x0500_0001;

/// Last version writing a 32-bit zero separator before each block.
const SEPARATOR_VERSION_MAX: u32 = 0x0A01_006A;

/// First version with an endianness byte in the header.
const ENDIAN_BYTE_VERSION: u32 = 0x1400_0004;

/// First version with a user version in the header.
const USER_VERSION_VERSION: u32 = 0x0A01_0000;

/// First version with precomputed per-block sizes in the header.
const BLOCK_SIZE_VERSION: u32 = 0x1402_0007;

/// Last version with the two-component header line and the copyright lines.
const COPYRIGHT_VERSION_MAX: u32 = 0x0301_0000;

/// Sentinel opening the block stream in versions without block counts.
const TOP_LEVEL_SENTINEL: &str = "Top Level Object";

/// Sentinel closing the block stream in versions without block counts.
const END_SENTINEL: &str = "End Of File";

/// Header line prefixes of the two format families.
const NETIMMERSE_PREFIX: &str = "NetImmerse File Format, Version ";
const GAMEBRYO_PREFIX: &str = "Gamebryo File Format, Version ";

/// Root class of the physics blocks, which are emitted after their children.
const PHYSICS_CLASS: &str = "bhkRefObject";

/// Class names of the two schema-defined framing records.
const HEADER_CLASS: &str = "Header";
const FOOTER_CLASS: &str = "Footer";

//---------------------------------------------------------------------------//
//                              Enum & Structs
//---------------------------------------------------------------------------//

/// Outcome of the version probe.
///
/// Only [`Supported`](Self::Supported) leads to a read. The other two variants are
/// deliberately not errors: directory walkers hit them constantly and just move on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VersionProbe {

    /// The file belongs to the family and its version is in the schema's set.
    Supported {
        version: u32,
        user_version: u32,
    },

    /// The file belongs to the family, but its version is not in the schema's set.
    UnsupportedVersion,

    /// The file does not belong to the family at all.
    NotThisFormat,
}

/// This struct represents a whole scene-graph file decoded in memory.
///
/// Blocks live in the block list and reference each other by index, so the graph
/// (cycles included, through weak references) has a single owner: this struct.
#[derive(Clone, Debug)]
pub struct NifFile {

    /// The schema the file was decoded with.
    schema: Arc<Schema>,

    /// Version of the file.
    version: u32,

    /// User version of the file.
    user_version: u32,

    /// The decoded header. Counts and tables in it are recomputed on every encode.
    header: NifStruct,

    /// The block list. Positions are the indices references use.
    blocks: Vec<NifStruct>,

    /// Indices of the root blocks.
    roots: Vec<usize>,
}

//---------------------------------------------------------------------------//
//                        Implementation of NifFile
//---------------------------------------------------------------------------//

impl NifFile {

    /// This function creates an empty file at the provided version, ready to get blocks.
    pub fn new(schema: &Arc<Schema>, version: u32, user_version: u32) -> Result<Self> {
        if !schema.supports_version(version) {
            return Err(RNifError::UnsupportedVersion(version));
        }

        let mut header = NifStruct::new(schema, HEADER_CLASS, None)?;
        header.set_int(schema, "userVersion", i64::from(user_version))?;

        Ok(Self {
            schema: schema.clone(),
            version,
            user_version,
            header,
            blocks: vec![],
            roots: vec![],
        })
    }

    /// This function opens and decodes a file on disk, probing its version first.
    pub fn open(path: &Path, schema: &Arc<Schema>) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let (version, user_version) = match Self::probe_version(schema, &mut reader)? {
            VersionProbe::Supported { version, user_version } => (version, user_version),
            VersionProbe::UnsupportedVersion => return Err(RNifError::UnsupportedVersion(0)),
            VersionProbe::NotThisFormat => return Err(RNifError::DecodingNotANifFile),
        };

        let file_name = path.file_name().map(|name| name.to_string_lossy().to_string()).unwrap_or_default();
        let mut extra_data = DecodeableExtraData::default();
        extra_data.set_schema(Some(schema));
        extra_data.set_version(version);
        extra_data.set_user_version(user_version);
        extra_data.set_file_name(Some(&file_name));

        Self::decode(&mut reader, &Some(extra_data))
    }

    /// This function encodes the file and saves it to disk.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.encode(&mut writer, &None)
    }

    /// This function returns the schema of the file.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// This function returns the version of the file.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// This function returns the user version of the file.
    pub fn user_version(&self) -> u32 {
        self.user_version
    }

    /// This function returns a reference to the header record.
    pub fn header(&self) -> &NifStruct {
        &self.header
    }

    /// This function returns the block list.
    pub fn blocks(&self) -> &[NifStruct] {
        &self.blocks
    }

    /// This function returns a reference to the block at the provided index.
    pub fn block(&self, index: usize) -> Result<&NifStruct> {
        self.blocks.get(index).ok_or(RNifError::DecodingLinkIndexOutOfBounds(index as i32, self.blocks.len()))
    }

    /// This function returns a mutable reference to the block at the provided index.
    pub fn block_mut(&mut self, index: usize) -> Result<&mut NifStruct> {
        let len = self.blocks.len();
        self.blocks.get_mut(index).ok_or(RNifError::DecodingLinkIndexOutOfBounds(index as i32, len))
    }

    /// This function creates a new block of the provided class and returns its index.
    pub fn new_block(&mut self, class: &str) -> Result<usize> {
        let spec = self.schema.class(class)?;
        if !spec.is_niobject {
            return Err(RNifError::DecodingUnknownBlockType(class.to_owned()));
        }

        let block = NifStruct::new(&self.schema, class, None)?;
        self.blocks.push(block);
        Ok(self.blocks.len() - 1)
    }

    /// This function returns the indices of the root blocks.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// This function adds a block to the root list.
    pub fn add_root(&mut self, index: usize) -> Result<()> {
        self.block(index)?;
        if !self.roots.contains(&index) {
            self.roots.push(index);
        }

        Ok(())
    }

    /// This function checks if the block at the provided index is of the provided
    /// class, or of a subclass of it.
    pub fn is_kind_of(&self, index: usize, class: &str) -> Result<bool> {
        Ok(self.schema.is_kind_of(self.block(index)?.class(), class))
    }

    //-----------------------------------//
    // Version probe
    //-----------------------------------//

    /// This function sniffs the version and user version of the stream, restoring
    /// its position afterwards no matter the outcome.
    ///
    /// Read failures report as [`VersionProbe::NotThisFormat`] instead of erroring:
    /// streams shorter than a header are, by definition, not scene-graph files.
    pub fn probe_version<R: ReadBytes>(schema: &Schema, data: &mut R) -> Result<VersionProbe> {
        let start = data.stream_position()?;
        let probe = Self::probe_version_inner(schema, data);
        data.seek(std::io::SeekFrom::Start(start))?;
        probe
    }

    /// Helper with the actual probe logic, so the caller can restore the stream position in one place.
    fn probe_version_inner<R: ReadBytes>(schema: &Schema, data: &mut R) -> Result<VersionProbe> {
        let Ok(line) = data.read_line_string(MAX_HEADER_LINE) else {
            return Ok(VersionProbe::NotThisFormat);
        };

        let version_token = if let Some(token) = line.strip_prefix(NETIMMERSE_PREFIX) {
            token
        } else if let Some(token) = line.strip_prefix(GAMEBRYO_PREFIX) {
            token
        } else {
            return Ok(VersionProbe::NotThisFormat);
        };

        let Some(version) = version_number(version_token) else {
            return Ok(VersionProbe::UnsupportedVersion);
        };

        if !schema.supports_version(version) {
            return Ok(VersionProbe::UnsupportedVersion);
        }

        let mut user_version = 0;
        if version >= LINK_BY_INDEX_VERSION {

            // The header repeats the version as a little-endian integer. If both
            // copies disagree, this is something else mimicking the header line.
            let Ok(echo) = data.read_u32() else {
                return Ok(VersionProbe::NotThisFormat);
            };

            if echo != version {
                return Ok(VersionProbe::NotThisFormat);
            }

            if version >= ENDIAN_BYTE_VERSION && data.read_u8().is_err() {
                return Ok(VersionProbe::NotThisFormat);
            }

            if version >= USER_VERSION_VERSION {
                match data.read_u32() {
                    Ok(value) => user_version = value,
                    Err(_) => return Ok(VersionProbe::NotThisFormat),
                }
            }
        }

        Ok(VersionProbe::Supported { version, user_version })
    }

    //-----------------------------------//
    // Read
    //-----------------------------------//

    /// This function reads a whole file from the stream: header, block list, footer,
    /// and the second pass resolving every reference.
    fn read_internal<R: ReadBytes>(schema: &Arc<Schema>, version: u32, user_version: u32, data: &mut R) -> Result<Self> {
        let mut link_stack: VecDeque<i32> = VecDeque::new();

        // The header carries no references and no interned strings, so it decodes
        // with an empty string table.
        let header = {
            let mut ctx = DecodeContext { version, user_version, strings: &[], link_stack: &mut link_stack };
            decode_instance(schema, HEADER_CLASS, None, data, &mut ctx)?
        };

        let num_blocks = header.int(schema, "numBlocks")? as usize;
        let block_types = list_as_strings(header.list(schema, "blockTypes")?);
        let block_type_index = list_as_ints(header.list(schema, "blockTypeIndex")?);
        let block_sizes = list_as_ints(header.list(schema, "blockSize")?);
        let strings = list_as_strings(header.list(schema, "strings")?);

        let mut blocks: Vec<NifStruct> = vec![];
        let mut token_map: HashMap<u32, usize> = HashMap::new();

        // First pass: decode the block stream and the footer. Reference fields stay
        // null for now; their placeholders pile up on the link stack.
        let mut footer = {
            let mut ctx = DecodeContext { version, user_version, strings: &strings, link_stack: &mut link_stack };

            if version >= LINK_BY_INDEX_VERSION {
                for index in 0..num_blocks {
                    let block_type = if version >= BLOCK_TYPE_TABLE_VERSION {
                        if version <= SEPARATOR_VERSION_MAX {
                            let separator = data.read_u32()?;
                            if separator != 0 {
                                return Err(RNifError::DecodingNonZeroSeparator(separator, data.stream_position()?));
                            }
                        }

                        let type_index = block_type_index.get(index)
                            .map(|value| *value as usize)
                            .ok_or(RNifError::DecodingBlockTypeIndexOutOfBounds(index, block_type_index.len()))?;
                        block_types.get(type_index)
                            .cloned()
                            .ok_or(RNifError::DecodingBlockTypeIndexOutOfBounds(type_index, block_types.len()))?
                    } else {
                        data.read_sized_string()?
                    };

                    let (block, size) = Self::read_block(schema, &block_type, data, &mut ctx)?;

                    // Late versions precompute per-block sizes. Trust, but verify.
                    if version >= BLOCK_SIZE_VERSION {
                        let expected = block_sizes.get(index).map(|value| *value as u32).unwrap_or(0);
                        if u64::from(expected) != size {
                            return Err(RNifError::DecodingBlockSizeMismatch(index, expected, size));
                        }
                    }

                    blocks.push(block);
                }
            } else {

                // Early versions have no block count. The stream opens with a
                // sentinel pseudo-block and runs until the end-of-file sentinel.
                let sentinel = data.read_sized_string()?;
                if sentinel != TOP_LEVEL_SENTINEL {
                    return Err(RNifError::DecodingMissingTopLevelSentinel(sentinel));
                }

                loop {
                    let block_type = data.read_sized_string()?;
                    if block_type == END_SENTINEL {
                        break;
                    }

                    // The identity token is the in-memory address the block had
                    // when written. Only its uniqueness matters.
                    let token = data.read_u32()?;
                    if token_map.contains_key(&token) {
                        return Err(RNifError::DecodingDuplicateBlockToken(token));
                    }
                    token_map.insert(token, blocks.len());

                    let (block, _) = Self::read_block(schema, &block_type, data, &mut ctx)?;
                    blocks.push(block);
                }
            }

            decode_instance(schema, FOOTER_CLASS, None, data, &mut ctx)?
        };

        // Nothing may follow the footer.
        let position = data.stream_position()?;
        let len = data.len()?;
        if position != len {
            return Err(RNifError::DecodingTrailingBytes(len - position));
        }

        // Second pass: resolve every placeholder pushed during the first one, in
        // the exact order it was pushed.
        let block_classes = blocks.iter().map(|block| block.class().to_owned()).collect::<Vec<_>>();
        let mut resolve = |template: Option<&str>, _weak: bool, target: &mut Option<usize>| -> Result<()> {
            let placeholder = link_stack.pop_front().ok_or(RNifError::DecodingLinkStackExhausted)?;
            let index = if version >= LINK_BY_INDEX_VERSION {
                if placeholder == -1 {
                    *target = None;
                    return Ok(());
                }

                usize::try_from(placeholder)
                    .ok()
                    .filter(|index| *index < block_classes.len())
                    .ok_or(RNifError::DecodingLinkIndexOutOfBounds(placeholder, block_classes.len()))?
            } else {
                if placeholder == 0 {
                    *target = None;
                    return Ok(());
                }

                let token = placeholder as u32;
                *token_map.get(&token).ok_or(RNifError::DecodingUnknownBlockToken(token))?
            };

            if let Some(template) = template {
                if !schema.is_kind_of(&block_classes[index], template) {
                    return Err(RNifError::TypeMismatch(template.to_owned(), block_classes[index].to_owned()));
                }
            }

            *target = Some(index);
            Ok(())
        };

        for block in &mut blocks {
            for_each_link(schema, block, version, user_version, &mut resolve)?;
        }
        for_each_link(schema, &mut footer, version, user_version, &mut resolve)?;

        if !link_stack.is_empty() {
            return Err(RNifError::DecodingResidualLinks(link_stack.len()));
        }

        // Early files have no root list. Their single root is the first block.
        let roots = if version >= LINK_BY_INDEX_VERSION {
            footer.list(schema, "roots")?
                .iter()
                .filter_map(|value| match value {
                    Value::Link(Some(index)) => Some(*index),
                    _ => None,
                })
                .collect()
        } else if blocks.is_empty() {
            vec![]
        } else {
            vec![0]
        };

        Ok(Self {
            schema: schema.clone(),
            version,
            user_version,
            header,
            blocks,
            roots,
        })
    }

    /// This function reads a single block body, returning it together with the
    /// amount of bytes it took on the stream.
    fn read_block<R: ReadBytes>(schema: &Schema, block_type: &str, data: &mut R, ctx: &mut DecodeContext) -> Result<(NifStruct, u64)> {
        match schema.class(block_type) {
            Ok(spec) if spec.is_niobject => {}
            _ => return Err(RNifError::DecodingUnknownBlockType(block_type.to_owned())),
        }

        debug!("reading {block_type} block at offset {}", data.stream_position()?);

        let start = data.stream_position()?;
        let block = decode_instance(schema, block_type, None, data, ctx)?;
        let size = data.stream_position()? - start;
        Ok((block, size))
    }

    //-----------------------------------//
    // Write
    //-----------------------------------//

    /// This function enumerates the blocks reachable from a root, depth-first over
    /// strong references. Physics blocks go after their children; everything else
    /// goes before.
    fn enumerate_blocks(&self, version: u32, user_version: u32, index: usize, seen: &mut HashSet<usize>, list: &mut Vec<usize>) -> Result<()> {
        if !seen.insert(index) {
            return Ok(());
        }

        let block = self.block(index)?;
        let is_physics = self.schema.is_kind_of(block.class(), PHYSICS_CLASS);
        if !is_physics {
            list.push(index);
        }

        let mut refs = vec![];
        collect_refs(&self.schema, block, version, user_version, &mut refs)?;
        for child in refs {
            self.enumerate_blocks(version, user_version, child, seen, list)?;
        }

        if is_physics {
            list.push(index);
        }

        Ok(())
    }

    /// This function writes the whole file to the buffer.
    fn write_internal<W: WriteBytes>(&mut self, buffer: &mut W, version: u32, user_version: u32) -> Result<()> {
        let schema = self.schema.clone();
        if !schema.supports_version(version) {
            return Err(RNifError::UnsupportedVersion(version));
        }

        // Pass one: find every block reachable from the roots, in emit order.
        let mut seen = HashSet::new();
        let mut block_list = vec![];
        for root in self.roots.clone() {
            self.enumerate_blocks(version, user_version, root, &mut seen, &mut block_list)?;
        }

        // On-disk reference values. Identity tokens are one-based so a null
        // reference (0) never collides with a real block.
        let mut block_tokens: HashMap<usize, i32> = HashMap::new();
        for (position, index) in block_list.iter().enumerate() {
            let token = if version >= LINK_BY_INDEX_VERSION { position as i32 } else { position as i32 + 1 };
            block_tokens.insert(*index, token);
        }

        // Block type table and string table, in first-appearance order.
        let mut type_table: Vec<String> = vec![];
        let mut type_index: Vec<usize> = vec![];
        for index in &block_list {
            let class = self.block(*index)?.class().to_owned();
            let position = match type_table.iter().position(|name| *name == class) {
                Some(position) => position,
                None => {
                    type_table.push(class);
                    type_table.len() - 1
                }
            };
            type_index.push(position);
        }

        let mut strings = vec![];
        for index in &block_list {
            collect_strings(&schema, self.block(*index)?, version, user_version, &mut strings)?;
        }

        // Duplicates collapse onto their first appearance, which keeps the table
        // order stable across round trips.
        let string_table = strings.into_iter().unique().collect::<Vec<_>>();
        let string_index = string_table.iter()
            .enumerate()
            .map(|(position, string)| (string.to_owned(), position as i32))
            .collect::<HashMap<String, i32>>();

        // Pass two: encode every block body, so the header can report their sizes.
        let ctx = EncodeContext { version, user_version, strings: &string_index, block_tokens: &block_tokens };
        let mut bodies: Vec<Vec<u8>> = Vec::with_capacity(block_list.len());
        for index in &block_list {
            let mut body = Cursor::new(vec![]);
            encode_instance(&schema, self.block(*index)?, &mut body, &ctx)?;
            bodies.push(body.into_inner());
        }

        // Refresh the header: counts, tables, sizes, user version.
        self.header.set_int(&schema, "numBlocks", block_list.len() as i64)?;
        self.header.set_int(&schema, "numBlockTypes", type_table.len() as i64)?;
        *self.header.list_mut(&schema, "blockTypes")? = type_table.iter().map(|name| Value::String(name.to_owned())).collect();
        *self.header.list_mut(&schema, "blockTypeIndex")? = type_index.iter().map(|position| Value::U16(*position as u16)).collect();
        *self.header.list_mut(&schema, "blockSize")? = bodies.iter().map(|body| Value::U32(body.len() as u32)).collect();
        self.header.set_int(&schema, "numStrings", string_table.len() as i64)?;
        self.header.set_int(&schema, "maxStringLength", string_table.iter().map(|string| string.len()).max().unwrap_or(0) as i64)?;
        *self.header.list_mut(&schema, "strings")? = string_table.iter().map(|string| Value::String(string.to_owned())).collect();
        self.header.set_int(&schema, "userVersion", i64::from(user_version))?;

        if version <= COPYRIGHT_VERSION_MAX && self.header.list(&schema, "copyright")?.len() != 3 {
            self.header.resize_list(&schema, "copyright", 3)?;
        }

        encode_instance(&schema, &self.header, buffer, &ctx)?;

        if version < LINK_BY_INDEX_VERSION {
            buffer.write_sized_string(TOP_LEVEL_SENTINEL)?;
        }

        for (position, index) in block_list.iter().enumerate() {
            let class = self.block(*index)?.class();
            if version >= BLOCK_TYPE_TABLE_VERSION {
                if version <= SEPARATOR_VERSION_MAX {
                    buffer.write_u32(0)?;
                }
                debug_assert_eq!(type_table[type_index[position]], class);
            } else {
                buffer.write_sized_string(class)?;
            }

            if version < LINK_BY_INDEX_VERSION {
                buffer.write_u32(block_tokens[index] as u32)?;
            }

            debug!("writing {class} block {position}");
            buffer.write_all(&bodies[position]).map_err(RNifError::from)?;
        }

        if version < LINK_BY_INDEX_VERSION {
            buffer.write_sized_string(END_SENTINEL)?;
        }

        // The footer is rebuilt from scratch on every write.
        let mut footer = NifStruct::new(&schema, FOOTER_CLASS, None)?;
        footer.set_int(&schema, "numRoots", self.roots.len() as i64)?;
        *footer.list_mut(&schema, "roots")? = self.roots.iter().map(|root| Value::Link(Some(*root))).collect();
        encode_instance(&schema, &footer, buffer, &ctx)
    }
}

impl Decodeable for NifFile {

    fn decode<R: ReadBytes>(data: &mut R, extra_data: &Option<DecodeableExtraData>) -> Result<Self> {
        let extra_data = extra_data.as_ref().ok_or(RNifError::DecodingMissingExtraData)?;
        let schema = extra_data.schema.ok_or(RNifError::DecodingMissingExtraData)?;
        let version = extra_data.version;
        let user_version = extra_data.user_version;

        if !schema.supports_version(version) {
            return Err(RNifError::UnsupportedVersion(version));
        }

        Self::read_internal(schema, version, user_version, data)
    }
}

impl Encodeable for NifFile {

    fn encode<W: WriteBytes>(&mut self, buffer: &mut W, extra_data: &Option<EncodeableExtraData>) -> Result<()> {
        let version = extra_data.as_ref().and_then(|extra_data| extra_data.version).unwrap_or(self.version);
        let user_version = extra_data.as_ref().and_then(|extra_data| extra_data.user_version).unwrap_or(self.user_version);
        self.write_internal(buffer, version, user_version)
    }
}

//---------------------------------------------------------------------------//
//                          Free helpers
//---------------------------------------------------------------------------//

/// This function flattens a list value into the strings it holds.
fn list_as_strings(values: &[Value]) -> Vec<String> {
    values.iter()
        .filter_map(|value| match value {
            Value::String(string) => Some(string.to_owned()),
            _ => None,
        })
        .collect()
}

/// This function flattens a list value into the integers it holds.
fn list_as_ints(values: &[Value]) -> Vec<i64> {
    values.iter().filter_map(Value::as_int).collect()
}
