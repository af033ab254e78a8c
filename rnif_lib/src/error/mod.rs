//---------------------------------------------------------------------------//
// Copyright (c) 2017-2024 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted NIF Manager (RNIF) project,
// which can be found here: https://github.com/Frodo45127/rnif.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rnif/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! This module contains all kind of errors used inside this crate.
//!
//! Not much to say appart of that, really.

use thiserror::Error;

/// Custom `Result` type, to always return our custom error.
pub type Result<T, E = RNifError> = core::result::Result<T, E>;

/// Custom error type for the lib.
#[derive(Error, Debug)]
pub enum RNifError {

    //-----------------------------------//
    // Schema errors
    //-----------------------------------//

    #[error("The schema references the type \"{0}\", but no basic, enum, compound or object with that name has been declared.")]
    SchemaUnknownType(String),

    #[error("The schema declares the basic type \"{0}\", but this lib has no codec with that name.")]
    SchemaUnknownBasic(String),

    #[error("The expression of a field of \"{0}\" references \"{1}\", which is not a field declared before it.")]
    SchemaUnknownIdentifier(String, String),

    #[error("Error trying to parse \"{0}\" as a version string.")]
    SchemaMalformedVersion(String),

    #[error("Error trying to parse the expression \"{0}\": {1}.")]
    SchemaMalformedExpression(String, String),

    #[error("The schema declares the class \"{0}\" more than once.")]
    SchemaDuplicatedClass(String),

    #[error("The schema declares two fields of \"{0}\" that map to the identifier \"{1}\".")]
    SchemaDuplicatedIdentifier(String, String),

    #[error("The class \"{0}\" is not in the loaded schema.")]
    SchemaMissingClass(String),

    #[error("The class \"{0}\" has no field with the identifier \"{1}\".")]
    SchemaMissingField(String, String),

    #[error("The field \"{0}\" uses the template placeholder, but no template has been bound at this use site.")]
    SchemaUnboundTemplate(String),

    //-----------------------------------//
    // Decoding errors
    //-----------------------------------//

    #[error("Error trying to decode the header string: expected \"{0}\" but got \"{1}\".")]
    DecodingHeaderStringMismatch(String, String),

    #[error("Error trying to decode the version echo: expected {0:#010X} but got {1:#010X}.")]
    DecodingVersionEchoMismatch(u32, u32),

    #[error("Non-zero block separator {0:#010X} at offset {1}.")]
    DecodingNonZeroSeparator(u32, u64),

    #[error("Error trying to decode a string: its reported length ({0}) is over the maximum allowed at offset {1}.")]
    DecodingStringTooLong(u32, u64),

    #[error("Error trying to decode a line string: no line feed found.")]
    DecodingStringMissingTerminator,

    #[error("Error trying to decode an interned string: index {0} is out of bounds for a string table of {1} entries.")]
    DecodingStringIndexOutOfBounds(i32, usize),

    #[error("Unknown block type \"{0}\".")]
    DecodingUnknownBlockType(String),

    #[error("Block type index {0} is out of bounds for a block type table of {1} entries.")]
    DecodingBlockTypeIndexOutOfBounds(usize, usize),

    #[error("Duplicate block identity token {0:#010X}.")]
    DecodingDuplicateBlockToken(u32),

    #[error("Unknown block identity token {0:#010X} found while resolving links.")]
    DecodingUnknownBlockToken(u32),

    #[error("The block {0} reports a size of {1} bytes, but {2} bytes were read. This means either the schema definition for its class is incorrect, or the file is corrupted.")]
    DecodingBlockSizeMismatch(usize, u32, u64),

    #[error("There are {0} bytes left in the file after the footer. This usually means the file is corrupted.")]
    DecodingTrailingBytes(u64),

    #[error("There are {0} unresolved links left in the link stack after resolving every reference in the file.")]
    DecodingResidualLinks(usize),

    #[error("Expected the \"Top Level Object\" sentinel, but got \"{0}\" instead.")]
    DecodingMissingTopLevelSentinel(String),

    #[error("Link index {0} is out of bounds for a block list of {1} entries.")]
    DecodingLinkIndexOutOfBounds(i32, usize),

    #[error("The link stack ran dry while resolving the references of a block. This means the schema definition for its class is incorrect.")]
    DecodingLinkStackExhausted,

    #[error("This file's version ({0:#010X}) is not in the supported set of the loaded schema.")]
    UnsupportedVersion(u32),

    #[error("Missing extra data required to decode the file. This means the programmer messed up the code that tries to decode files.")]
    DecodingMissingExtraData,

    #[error("Error while trying to read the following file/folder: {0}. \
        This means that path may not be readable (permissions? other programs locking access to it?) or may not exists at all.")]
    ReadFileFolderError(String),

    #[error("This is either not a NIF file, or it's a NIF file but it's corrupted.")]
    DecodingNotANifFile,

    //-----------------------------------//
    // Encoding errors
    //-----------------------------------//

    #[error("Error trying to encode an {0}: \"{1}\" has a length of {2} bytes, but its length should be less or equal than {3}.")]
    EncodingStringTooLong(String, String, usize, usize),

    #[error("The string \"{0}\" is not in the header string table. This means the string aggregation pass missed it.")]
    EncodingStringNotInTable(String),

    #[error("The block {0} is referenced, but it's not in the block list. This usually means a weak reference points to a block not reachable through strong references.")]
    EncodingDanglingLink(usize),

    #[error("The array \"{0}\" holds {2} elements, but its length field says {1}. Resize the array or fix the counter before encoding.")]
    EncodingArrayLengthMismatch(String, usize, usize),

    #[error("Error trying to encode the character \"{0}\" in a single-byte string.")]
    EncodingUnmappableCharacter(char),

    //-----------------------------------//
    // Record access errors
    //-----------------------------------//

    #[error("The field \"{0}\" holds a {1} value, but it was accessed as a {2}.")]
    RecordWrongValueType(String, String, String),

    #[error("Expected an instance of \"{0}\", but got an instance of \"{1}\".")]
    TypeMismatch(String, String),

    //-----------------------------------//
    // Scene and math errors
    //-----------------------------------//

    #[error("Cycle detected in the scene graph: the block {0} is its own ancestor.")]
    SceneCycleDetected(usize),

    #[error("The block {0} is not a descendant of the block {1}.")]
    SceneNotADescendant(usize, usize),

    #[error("This matrix is not a uniform scale times a rotation, so it cannot be decomposed.")]
    MathNotAScaleRotation,

    #[error("This matrix is not invertible.")]
    MathNotInvertible,

    #[error("The block {0} is not a triangle-based geometry block, or it's missing its geometry data.")]
    GeometryMissingData(usize),

    #[error("The tangent space data of this block has an invalid size: expected {0} bytes but got {1}.")]
    VerifyTangentSpaceSize(usize, usize),

    //-----------------------------------//
    // Passthrough errors
    //-----------------------------------//

    /// Represents all other cases of `std::io::Error`.
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Represents all other cases of `std::string::FromUtf8Error`.
    #[error(transparent)]
    DecodeUTF8Error(#[from] std::string::FromUtf8Error),

    /// Represents all other cases of `serde_xml_rs::Error`.
    #[error(transparent)]
    XmlError(#[from] serde_xml_rs::Error),

    /// Represents all other cases of `ron::Error`.
    #[error(transparent)]
    RonError(#[from] ron::Error),

    /// Represents all other cases of `ron::error::SpannedError`.
    #[error(transparent)]
    RonSpannedError(#[from] ron::error::SpannedError),
}
