//---------------------------------------------------------------------------//
// Copyright (c) 2017-2024 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted NIF Manager (RNIF) project,
// which can be found here: https://github.com/Frodo45127/rnif.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rnif/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! This module contains the traits used to decode/encode files, and the directory
//! walker that feeds whole trees of them to the decoder.
//!
//! # Known file types
//!
//! | File Type   | Decoding Supported | Encoding Supported |
//! | ----------- | ------------------ | ------------------ |
//! | [`NifFile`] | Yes                | Yes                |
//!
//! `.kf`, `.kfa` and `.nifcache` files are scene-graph files too, just with other
//! extensions, so they decode through [`NifFile`] as well.
//!
//! [`NifFile`]: crate::files::nif::NifFile

use getset::{Getters, Setters};
use log::{info, warn};
use regex::Regex;

use std::fs::{read_dir, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::binary::{ReadBytes, WriteBytes};
use crate::error::{Result, RNifError};
use crate::files::nif::{NifFile, VersionProbe};
use crate::schema::Schema;

pub mod nif;

/// Filter matching the extensions of the scene-graph family: `.kf` files hold
/// keyframes, `.kfa` keyframes in DAoC style, `.nifcache` Empire Earth II models.
const EXTENSION_FILTER: &str = r"(?i)\.(nif|kf|kfa|nifcache)$";

//---------------------------------------------------------------------------//
//                              Enum & Structs
//---------------------------------------------------------------------------//

/// This is a generic struct to easily pass additional data to a [Decodeable::decode] method.
///
/// To know what you need to provide to each file type, please check their documentation.
#[derive(Clone, Default, Getters, Setters)]
#[getset(get = "pub", set = "pub")]
pub struct DecodeableExtraData<'a> {

    /// Schema for the decoder to use.
    schema: Option<&'a Arc<Schema>>,

    /// Version of the file we're trying to decode, as sniffed by the version probe.
    version: u32,

    /// User version of the file we're trying to decode.
    user_version: u32,

    /// Name of the file we're trying to decode.
    file_name: Option<&'a str>,
}

/// This is a generic struct to easily pass additional data to a [Encodeable::encode] method.
///
/// To know what you need to provide to each file type, please check their documentation.
#[derive(Clone, Default, Getters, Setters)]
#[getset(get = "pub", set = "pub")]
pub struct EncodeableExtraData {

    /// Version to write the file at, if different from the one it was read with.
    version: Option<u32>,

    /// User version to write the file at, if different from the one it was read with.
    user_version: Option<u32>,
}

/// An iterator over every scene-graph file under a path, decoding as it goes.
///
/// Files the probe rejects are skipped with a log line; files that fail to decode
/// are skipped with a warning, so one corrupt file doesn't stop a directory scan.
pub struct Walker {
    schema: Arc<Schema>,
    files: std::vec::IntoIter<PathBuf>,
}

/// One successfully decoded file yielded by the [`Walker`].
#[derive(Getters)]
#[getset(get = "pub")]
pub struct WalkedFile {

    /// Path of the file on disk.
    path: PathBuf,

    /// Version the file was decoded with.
    version: u32,

    /// User version the file was decoded with.
    user_version: u32,

    /// The decoded file.
    file: NifFile,
}

impl WalkedFile {

    /// This function consumes the walked entry, returning the decoded file.
    pub fn into_file(self) -> NifFile {
        self.file
    }
}

//---------------------------------------------------------------------------//
//                           Trait Definitions
//---------------------------------------------------------------------------//

/// A generic trait to implement decoding logic from anything implementing [ReadBytes](crate::binary::ReadBytes)
/// into structured types.
pub trait Decodeable: Send + Sync {

    /// This method provides a generic and expandable way to decode anything implementing [ReadBytes](crate::binary::ReadBytes)
    /// into the implementor's structure.
    ///
    /// The parameter `extra_data` contains arguments that can be used to provide additional data needed for the decoding process.
    fn decode<R: ReadBytes>(data: &mut R, extra_data: &Option<DecodeableExtraData>) -> Result<Self> where Self: Sized;
}

/// A generic trait to implement encoding logic from structured types into anything implementing [WriteBytes](crate::binary::WriteBytes).
pub trait Encodeable: Send + Sync {

    /// This method provides a generic and expandable way to encode any implementor's structure into anything
    /// implementing [WriteBytes](crate::binary::WriteBytes)
    ///
    /// The parameter `extra_data` contains arguments that can be used to provide additional data needed for the encoding process.
    fn encode<W: WriteBytes>(&mut self, buffer: &mut W, extra_data: &Option<EncodeableExtraData>) -> Result<()>;
}

//---------------------------------------------------------------------------//
//                              Walker
//---------------------------------------------------------------------------//

/// This function returns every file under the provided path (or the path itself,
/// if it's a file) whose extension marks it as part of the scene-graph family.
///
/// The result is sorted, so directory scans visit files in a stable order.
pub fn walk_files(path: &Path) -> Result<Vec<PathBuf>> {
    let filter = Regex::new(EXTENSION_FILTER).unwrap();
    let mut files = vec![];
    if path.is_file() {
        files.push(path.to_path_buf());
    } else {
        scan_dir(path, &mut files)?;
    }

    files.retain(|file| filter.is_match(&file.to_string_lossy()));
    files.sort();
    Ok(files)
}

/// Helper collecting every file under a directory, recursively. Unreadable entries
/// abort the scan, as a half-scanned tree is worse than no tree.
fn scan_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let unreadable = || RNifError::ReadFileFolderError(dir.to_string_lossy().to_string());

    for entry in read_dir(dir).map_err(|_| unreadable())? {
        let path = entry.map_err(|_| unreadable())?.path();
        if path.is_dir() {
            scan_dir(&path, files)?;
        } else {
            files.push(path);
        }
    }

    Ok(())
}

/// This function walks the provided path, decoding every supported scene-graph file under it.
pub fn walk(path: &Path, schema: &Arc<Schema>) -> Result<Walker> {
    Ok(Walker {
        schema: schema.clone(),
        files: walk_files(path)?.into_iter(),
    })
}

impl Iterator for Walker {
    type Item = WalkedFile;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let path = self.files.next()?;
            let mut reader = match File::open(&path).map(BufReader::new) {
                Ok(reader) => reader,
                Err(error) => {
                    warn!("cannot open {}: {error}", path.to_string_lossy());
                    continue;
                }
            };

            let (version, user_version) = match NifFile::probe_version(&self.schema, &mut reader) {
                Ok(VersionProbe::Supported { version, user_version }) => (version, user_version),
                Ok(VersionProbe::UnsupportedVersion) => {
                    info!("skipping {}: version not supported", path.to_string_lossy());
                    continue;
                }
                Ok(VersionProbe::NotThisFormat) => {
                    info!("skipping {}: not a scene-graph file", path.to_string_lossy());
                    continue;
                }
                Err(error) => {
                    warn!("cannot probe {}: {error}", path.to_string_lossy());
                    continue;
                }
            };

            let file_name = path.file_name().map(|name| name.to_string_lossy().to_string()).unwrap_or_default();
            let mut extra_data = DecodeableExtraData::default();
            extra_data.set_schema(Some(&self.schema));
            extra_data.set_version(version);
            extra_data.set_user_version(user_version);
            extra_data.set_file_name(Some(&file_name));

            match NifFile::decode(&mut reader, &Some(extra_data)) {
                Ok(file) => return Some(WalkedFile { path, version, user_version, file }),
                Err(error) => {
                    warn!("cannot decode {}: {error}", path.to_string_lossy());
                    continue;
                }
            }
        }
    }
}
