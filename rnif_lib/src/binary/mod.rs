//---------------------------------------------------------------------------//
// Copyright (c) 2017-2024 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted NIF Manager (RNIF) project,
// which can be found here: https://github.com/Frodo45127/rnif.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rnif/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! This module contains the traits [`ReadBytes`] and [`WriteBytes`], the two halves
//! of the byte-level codec everything else builds on.
//!
//! # Primitive types
//!
//! All multi-byte values are little-endian:
//!
//! | Type | Bytes | On disk | Value | Explanation |
//! | ---- | ----- | ------- | ----- | ----------- |
//! | **[u8]**  | 1 | ```2A```            | 42      | Unsigned Integer. |
//! | **[u16]** | 2 | ```39 05```         | 1337    | Unsigned Integer. |
//! | **[u32]** | 4 | ```40 E2 01 00```   | 123456  | Unsigned Integer. |
//! | **[i8]**  | 1 | ```80```            | -128    | Signed Integer. |
//! | **[i16]** | 2 | ```18 FC```         | -1000   | Signed Integer. |
//! | **[i32]** | 4 | ```FE FF FF FF```   | -2      | Signed Integer. |
//! | **f16**   | 2 | ```00 3E```         | 1.5     | Half-Precision Floating Point Value. |
//! | **[f32]** | 4 | ```00 00 20 C0```   | -2.5    | Floating Point Value. |
//!
//! # String types
//!
//! On top of those sit the three string forms the NetImmerse/Gamebryo family uses:
//!
//! | Type | Bytes | On disk | Value | Explanation |
//! | ---- | ----- | ------- | ----- | ----------- |
//! | **Sized String** | 4 (length, u32) + length. | ```06 00 00 00 4E 69 4E 6F 64 65``` | NiNode | String prefixed by its length in bytes. Lengths over 10000 are rejected as corruption. |
//! | **Short String** | 1 (length, u8) + length. | ```04 54 72 69 00``` | Tri | NULL-terminated string whose one-byte length prefix counts the terminator. |
//! | **Line String** | Variable, up to a 0A byte. | ```47 61 6D 65 62 72 79 6F 0A``` | Gamebryo | String running up to and including a line feed. |
//!
//! All of them are stored on disk as single-byte ISO-8859-15 characters.

pub mod reader;
pub mod writer;

#[cfg(test)] mod reader_test;

pub use self::reader::ReadBytes;
pub use self::writer::WriteBytes;

/// Maximum length in bytes a Sized String can have. Any string over this length is considered a corruption.
pub const MAX_SIZED_STRING_LENGTH: u32 = 10_000;

/// Maximum length in bytes the payload of a Short String can have.
pub const MAX_SHORT_STRING_LENGTH: usize = 254;
