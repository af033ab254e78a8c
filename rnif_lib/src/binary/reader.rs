//---------------------------------------------------------------------------//
// Copyright (c) 2017-2024 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted NIF Manager (RNIF) project,
// which can be found here: https://github.com/Frodo45127/rnif.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rnif/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! Module with the [`ReadBytes`] trait, which turns raw streams into the primitive
//! values of the format.
//!
//! Everything here is little-endian, like the files themselves.

use byteorder::{LittleEndian, ReadBytesExt};
use encoding_rs::ISO_8859_15;

use std::io::{Read, Seek, SeekFrom};

use crate::binary::MAX_SIZED_STRING_LENGTH;
use crate::error::{Result, RNifError};

//---------------------------------------------------------------------------//
//                            Trait Definition
//---------------------------------------------------------------------------//

/// This trait allow us to easily read all kind of data from a source that implements [`Read`] + [`Seek`].
pub trait ReadBytes: Read + Seek {

    /// This function returns the total length in bytes of the data under `self`.
    ///
    /// The cursor ends up back where it started, so it's safe to call mid-read.
    ///
    /// ```rust
    /// use std::io::Cursor;
    ///
    /// use rnif_lib::binary::ReadBytes;
    ///
    /// let mut cursor = Cursor::new(vec![7, 7, 7]);
    /// assert_eq!(cursor.len().unwrap(), 3);
    /// assert_eq!(cursor.position(), 0);
    /// ```
    fn len(&mut self) -> Result<u64> {
        let current = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(current))?;
        Ok(end)
    }

    /// This function checks if there's any data at all under `self`.
    ///
    /// ```rust
    /// use std::io::Cursor;
    ///
    /// use rnif_lib::binary::ReadBytes;
    ///
    /// assert!(ReadBytes::is_empty(&mut Cursor::new(vec![])).unwrap());
    /// assert!(!ReadBytes::is_empty(&mut Cursor::new(vec![7])).unwrap());
    /// ```
    fn is_empty(&mut self) -> Result<bool> {
        self.len().map(|len| len == 0)
    }

    /// This function reads one unsigned byte from `self`.
    ///
    /// Fails when the stream has run dry.
    ///
    /// ```rust
    /// use std::io::Cursor;
    ///
    /// use rnif_lib::binary::ReadBytes;
    ///
    /// let mut cursor = Cursor::new(vec![42]);
    /// assert_eq!(cursor.read_u8().unwrap(), 42);
    /// assert!(cursor.read_u8().is_err());
    /// ```
    fn read_u8(&mut self) -> Result<u8> {
        ReadBytesExt::read_u8(self).map_err(From::from)
    }

    /// This function reads a little-endian u16 from `self`.
    ///
    /// Fails when the stream runs out before the value is complete.
    ///
    /// ```rust
    /// use std::io::Cursor;
    ///
    /// use rnif_lib::binary::ReadBytes;
    ///
    /// let mut cursor = Cursor::new(vec![57, 5, 57]);
    /// assert_eq!(cursor.read_u16().unwrap(), 1337);
    /// assert!(cursor.read_u16().is_err());
    /// ```
    fn read_u16(&mut self) -> Result<u16> {
        ReadBytesExt::read_u16::<LittleEndian>(self).map_err(From::from)
    }

    /// This function reads a little-endian u32 from `self`.
    ///
    /// Fails when the stream runs out before the value is complete.
    ///
    /// ```rust
    /// use std::io::Cursor;
    ///
    /// use rnif_lib::binary::ReadBytes;
    ///
    /// let mut cursor = Cursor::new(vec![64, 226, 1, 0, 64]);
    /// assert_eq!(cursor.read_u32().unwrap(), 123_456);
    /// assert!(cursor.read_u32().is_err());
    /// ```
    fn read_u32(&mut self) -> Result<u32> {
        ReadBytesExt::read_u32::<LittleEndian>(self).map_err(From::from)
    }

    /// This function reads one signed byte from `self`.
    ///
    /// Fails when the stream has run dry.
    ///
    /// ```rust
    /// use std::io::Cursor;
    ///
    /// use rnif_lib::binary::ReadBytes;
    ///
    /// let mut cursor = Cursor::new(vec![128]);
    /// assert_eq!(cursor.read_i8().unwrap(), -128);
    /// assert!(cursor.read_i8().is_err());
    /// ```
    fn read_i8(&mut self) -> Result<i8> {
        ReadBytesExt::read_i8(self).map_err(From::from)
    }

    /// This function reads a little-endian i16 from `self`.
    ///
    /// Fails when the stream runs out before the value is complete.
    ///
    /// ```rust
    /// use std::io::Cursor;
    ///
    /// use rnif_lib::binary::ReadBytes;
    ///
    /// let mut cursor = Cursor::new(vec![24, 252, 24]);
    /// assert_eq!(cursor.read_i16().unwrap(), -1000);
    /// assert!(cursor.read_i16().is_err());
    /// ```
    fn read_i16(&mut self) -> Result<i16> {
        ReadBytesExt::read_i16::<LittleEndian>(self).map_err(From::from)
    }

    /// This function reads a little-endian i32 from `self`. References on disk are
    /// one of these, with -1 or 0 marking a null link depending on the version.
    ///
    /// Fails when the stream runs out before the value is complete.
    ///
    /// ```rust
    /// use std::io::Cursor;
    ///
    /// use rnif_lib::binary::ReadBytes;
    ///
    /// let mut cursor = Cursor::new(vec![254, 255, 255, 255, 254]);
    /// assert_eq!(cursor.read_i32().unwrap(), -2);
    /// assert!(cursor.read_i32().is_err());
    /// ```
    fn read_i32(&mut self) -> Result<i32> {
        ReadBytesExt::read_i32::<LittleEndian>(self).map_err(From::from)
    }

    /// This function reads a half-precision float from `self`.
    ///
    /// Fails when the stream runs out before the value is complete.
    ///
    /// ```rust
    /// use std::io::Cursor;
    ///
    /// use rnif_lib::binary::ReadBytes;
    ///
    /// let mut cursor = Cursor::new(vec![0, 62, 0]);
    /// assert_eq!(cursor.read_f16().unwrap().to_f32(), 1.5);
    /// assert!(cursor.read_f16().is_err());
    /// ```
    fn read_f16(&mut self) -> Result<half::f16> {
        Ok(half::f16::from_bits(self.read_u16()?))
    }

    /// This function reads a single-precision float from `self`.
    ///
    /// Fails when the stream runs out before the value is complete.
    ///
    /// ```rust
    /// use std::io::Cursor;
    ///
    /// use rnif_lib::binary::ReadBytes;
    ///
    /// let mut cursor = Cursor::new(vec![0, 0, 32, 192, 0]);
    /// assert_eq!(cursor.read_f32().unwrap(), -2.5);
    /// assert!(cursor.read_f32().is_err());
    /// ```
    fn read_f32(&mut self) -> Result<f32> {
        ReadBytesExt::read_f32::<LittleEndian>(self).map_err(From::from)
    }

    /// This function reads a Sized String from `self`: a u32 byte count followed by
    /// that many single-byte characters.
    ///
    /// Fails when the stream is shorter than the count claims, or when the count is
    /// over 10000, which no sane file ever reaches.
    ///
    /// ```rust
    /// use std::io::Cursor;
    ///
    /// use rnif_lib::binary::ReadBytes;
    ///
    /// let mut cursor = Cursor::new(vec![6, 0, 0, 0, 78, 105, 78, 111, 100, 101]);
    /// assert_eq!(cursor.read_sized_string().unwrap(), "NiNode");
    /// assert!(cursor.read_sized_string().is_err());
    /// ```
    fn read_sized_string(&mut self) -> Result<String> {
        let size = self.read_u32()?;
        if size > MAX_SIZED_STRING_LENGTH {
            return Err(RNifError::DecodingStringTooLong(size, self.stream_position()?));
        }

        let mut data = vec![0; size as usize];
        self.read_exact(&mut data)?;

        Ok(ISO_8859_15.decode(&data).0.to_string())
    }

    /// This function reads a Short String from `self`: a one-byte length counting
    /// the NULL terminator, then the characters. The terminator is stripped.
    ///
    /// Fails when the stream is shorter than the length claims.
    ///
    /// ```rust
    /// use std::io::Cursor;
    ///
    /// use rnif_lib::binary::ReadBytes;
    ///
    /// let mut cursor = Cursor::new(vec![4, 84, 114, 105, 0]);
    /// assert_eq!(cursor.read_short_string().unwrap(), "Tri");
    /// assert!(cursor.read_short_string().is_err());
    /// ```
    fn read_short_string(&mut self) -> Result<String> {
        let size = self.read_u8()?;
        let mut data = vec![0; size as usize];
        self.read_exact(&mut data)?;

        // Strip the trailing NULL, in case there is one. Some very old files miss it.
        let size_no_zeros = memchr::memchr(0, &data).map_or(size as usize, |x| x);
        Ok(ISO_8859_15.decode(&data[..size_no_zeros]).0.to_string())
    }

    /// This function reads a Line String from `self`: characters up to and including
    /// a line feed (0x0A), which is stripped. The cursor stops just past it.
    ///
    /// Fails when no line feed shows up within `max_size` bytes, or the stream ends
    /// before one.
    ///
    /// ```rust
    /// use std::io::Cursor;
    ///
    /// use rnif_lib::binary::ReadBytes;
    ///
    /// let mut cursor = Cursor::new(vec![71, 97, 109, 101, 98, 114, 121, 111, 0x0A, 71]);
    /// assert_eq!(cursor.read_line_string(64).unwrap(), "Gamebryo");
    /// assert!(cursor.read_line_string(64).is_err());
    /// ```
    fn read_line_string(&mut self, max_size: usize) -> Result<String> {
        let mut data = Vec::with_capacity(max_size.min(64));
        loop {
            let byte = self.read_u8()?;
            if byte == 0x0A {
                break;
            }

            data.push(byte);
            if data.len() >= max_size {
                return Err(RNifError::DecodingStringMissingTerminator);
            }
        }

        Ok(ISO_8859_15.decode(&data).0.to_string())
    }
}

// Automatic implementation for everything that implements `Read + Seek`.
impl<R: Read + Seek> ReadBytes for R {}
