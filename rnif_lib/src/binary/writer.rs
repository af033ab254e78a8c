//---------------------------------------------------------------------------//
// Copyright (c) 2017-2024 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted NIF Manager (RNIF) project,
// which can be found here: https://github.com/Frodo45127/rnif.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rnif/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! Module with the [`WriteBytes`] trait, the mirror of [`ReadBytes`]: it turns the
//! primitive values of the format back into bytes.
//!
//! [`ReadBytes`]: crate::binary::ReadBytes

use byteorder::{LittleEndian, WriteBytesExt};
use encoding_rs::ISO_8859_15;
use half::f16;

use std::io::Write;

use crate::binary::{MAX_SIZED_STRING_LENGTH, MAX_SHORT_STRING_LENGTH};
use crate::error::{Result, RNifError};

//---------------------------------------------------------------------------//
//                            Trait Definition
//---------------------------------------------------------------------------//

/// This trait allow us to easily write all kind of data types to something that implements [`Write`].
pub trait WriteBytes: Write {

    /// This function writes one unsigned byte to `self`.
    ///
    /// ```rust
    /// use rnif_lib::binary::WriteBytes;
    ///
    /// let mut data = vec![];
    /// data.write_u8(42).unwrap();
    /// assert_eq!(data, vec![42]);
    /// ```
    fn write_u8(&mut self, value: u8) -> Result<()> {
        WriteBytesExt::write_u8(self, value).map_err(From::from)
    }

    /// This function writes a u16 to `self`, in little-endian order.
    ///
    /// ```rust
    /// use rnif_lib::binary::WriteBytes;
    ///
    /// let mut data = vec![];
    /// data.write_u16(1337).unwrap();
    /// assert_eq!(data, vec![57, 5]);
    /// ```
    fn write_u16(&mut self, integer: u16) -> Result<()> {
        WriteBytesExt::write_u16::<LittleEndian>(self, integer).map_err(From::from)
    }

    /// This function writes a u32 to `self`, in little-endian order.
    ///
    /// ```rust
    /// use rnif_lib::binary::WriteBytes;
    ///
    /// let mut data = vec![];
    /// data.write_u32(123_456).unwrap();
    /// assert_eq!(data, vec![64, 226, 1, 0]);
    /// ```
    fn write_u32(&mut self, integer: u32) -> Result<()> {
        WriteBytesExt::write_u32::<LittleEndian>(self, integer).map_err(From::from)
    }

    /// This function writes one signed byte to `self`.
    ///
    /// ```rust
    /// use rnif_lib::binary::WriteBytes;
    ///
    /// let mut data = vec![];
    /// data.write_i8(-128).unwrap();
    /// assert_eq!(data, vec![128]);
    /// ```
    fn write_i8(&mut self, integer: i8) -> Result<()> {
        WriteBytesExt::write_i8(self, integer).map_err(From::from)
    }

    /// This function writes an i16 to `self`, in little-endian order.
    ///
    /// ```rust
    /// use rnif_lib::binary::WriteBytes;
    ///
    /// let mut data = vec![];
    /// data.write_i16(-1000).unwrap();
    /// assert_eq!(data, vec![24, 252]);
    /// ```
    fn write_i16(&mut self, integer: i16) -> Result<()> {
        WriteBytesExt::write_i16::<LittleEndian>(self, integer).map_err(From::from)
    }

    /// This function writes an i32 to `self`, in little-endian order. References on
    /// disk are one of these.
    ///
    /// ```rust
    /// use rnif_lib::binary::WriteBytes;
    ///
    /// let mut data = vec![];
    /// data.write_i32(-2).unwrap();
    /// assert_eq!(data, vec![254, 255, 255, 255]);
    /// ```
    fn write_i32(&mut self, integer: i32) -> Result<()> {
        WriteBytesExt::write_i32::<LittleEndian>(self, integer).map_err(From::from)
    }

    /// This function writes a half-precision float to `self`.
    ///
    /// ```rust
    /// use rnif_lib::binary::WriteBytes;
    ///
    /// let mut data = vec![];
    /// data.write_f16(half::f16::from_f32(1.5)).unwrap();
    /// assert_eq!(data, vec![0, 62]);
    /// ```
    fn write_f16(&mut self, value: f16) -> Result<()> {
        self.write_u16(value.to_bits())
    }

    /// This function writes a single-precision float to `self`.
    ///
    /// ```rust
    /// use rnif_lib::binary::WriteBytes;
    ///
    /// let mut data = vec![];
    /// data.write_f32(-2.5).unwrap();
    /// assert_eq!(data, vec![0, 0, 32, 192]);
    /// ```
    fn write_f32(&mut self, value: f32) -> Result<()> {
        WriteBytesExt::write_f32::<LittleEndian>(self, value).map_err(From::from)
    }

    /// This function writes a Sized String to `self`: a u32 byte count, then the
    /// characters.
    ///
    /// Fails on strings over the 10000-byte cap, or with characters that have no
    /// single-byte encoding.
    ///
    /// ```rust
    /// use rnif_lib::binary::WriteBytes;
    ///
    /// let mut data = vec![];
    /// data.write_sized_string("NiNode").unwrap();
    /// assert_eq!(data, vec![6, 0, 0, 0, 78, 105, 78, 111, 100, 101]);
    /// ```
    fn write_sized_string(&mut self, string: &str) -> Result<()> {
        let encoded = encode_single_byte(string)?;
        if encoded.len() > MAX_SIZED_STRING_LENGTH as usize {
            return Err(RNifError::EncodingStringTooLong("Sized String".to_owned(), string.to_owned(), encoded.len(), MAX_SIZED_STRING_LENGTH as usize));
        }

        self.write_u32(encoded.len() as u32)?;
        self.write_all(&encoded).map_err(From::from)
    }

    /// This function writes a Short String to `self`: a one-byte length counting the
    /// NULL terminator this function appends, then the characters.
    ///
    /// Fails on strings over 254 bytes, or with characters that have no single-byte
    /// encoding.
    ///
    /// ```rust
    /// use rnif_lib::binary::WriteBytes;
    ///
    /// let mut data = vec![];
    /// data.write_short_string("Tri").unwrap();
    /// assert_eq!(data, vec![4, 84, 114, 105, 0]);
    /// ```
    fn write_short_string(&mut self, string: &str) -> Result<()> {
        let encoded = encode_single_byte(string)?;
        if encoded.len() > MAX_SHORT_STRING_LENGTH {
            return Err(RNifError::EncodingStringTooLong("Short String".to_owned(), string.to_owned(), encoded.len(), MAX_SHORT_STRING_LENGTH));
        }

        self.write_u8(encoded.len() as u8 + 1)?;
        self.write_all(&encoded)?;
        self.write_u8(0)
    }

    /// This function writes a Line String to `self`: the characters, then the line
    /// feed terminator.
    ///
    /// Fails on characters that have no single-byte encoding.
    ///
    /// ```rust
    /// use rnif_lib::binary::WriteBytes;
    ///
    /// let mut data = vec![];
    /// data.write_line_string("Gamebryo").unwrap();
    /// assert_eq!(data, vec![71, 97, 109, 101, 98, 114, 121, 111, 0x0A]);
    /// ```
    fn write_line_string(&mut self, string: &str) -> Result<()> {
        let encoded = encode_single_byte(string)?;
        self.write_all(&encoded)?;
        self.write_u8(0x0A)
    }
}

// Automatic implementation for everything that implements `Write`.
impl<W: Write> WriteBytes for W {}

/// This function encodes a string to single-byte ISO-8859-15 characters, erroring out
/// on the first character with no single-byte mapping.
fn encode_single_byte(string: &str) -> Result<Vec<u8>> {
    let (encoded, _, unmappable) = ISO_8859_15.encode(string);
    if unmappable {
        let bad = string.chars()
            .find(|c| ISO_8859_15.encode(c.encode_utf8(&mut [0; 4])).2)
            .unwrap_or('?');
        return Err(RNifError::EncodingUnmappableCharacter(bad));
    }

    Ok(encoded.into_owned())
}
