//---------------------------------------------------------------------------//
// Copyright (c) 2017-2024 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted NIF Manager (RNIF) project,
// which can be found here: https://github.com/Frodo45127/rnif.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rnif/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! Tests for the [`ReadBytes`] trait.
//!
//! [`ReadBytes`]: crate::binary::ReadBytes

use std::io::Cursor;

use super::ReadBytes;

//---------------------------------------------------------------------------//
//                                  Tests
//---------------------------------------------------------------------------//

/// Test the length helpers leave the cursor alone.
#[test]
fn stream_length() {
    let mut cursor = Cursor::new(vec![1, 2, 3, 4, 5]);
    cursor.read_u8().unwrap();

    assert_eq!(ReadBytes::len(&mut cursor).unwrap(), 5);
    assert_eq!(cursor.position(), 1);

    assert!(!ReadBytes::is_empty(&mut cursor).unwrap());
    assert!(ReadBytes::is_empty(&mut Cursor::new(Vec::<u8>::new())).unwrap());
}

/// Test the integer readers decode little-endian values, and refuse to zero-fill
/// a stream that runs dry mid-value.
#[test]
fn integers() {
    assert_eq!(ReadBytes::read_u8(&mut Cursor::new([0xFF])).unwrap(), 255);
    assert_eq!(ReadBytes::read_i8(&mut Cursor::new([0xFF])).unwrap(), -1);

    assert_eq!(ReadBytes::read_u16(&mut Cursor::new([0xEF, 0xBE])).unwrap(), 48879);
    assert_eq!(ReadBytes::read_i16(&mut Cursor::new([0xFF, 0xFD])).unwrap(), -513);

    assert_eq!(ReadBytes::read_u32(&mut Cursor::new([1, 1, 1, 0])).unwrap(), 65_793);
    assert_eq!(ReadBytes::read_i32(&mut Cursor::new([0, 0, 0xFF, 0xFF])).unwrap(), -65_536);

    // One byte short, in every width.
    assert!(ReadBytes::read_u8(&mut Cursor::new([])).is_err());
    assert!(ReadBytes::read_u16(&mut Cursor::new([0xEF])).is_err());
    assert!(ReadBytes::read_u32(&mut Cursor::new([1, 1, 1])).is_err());
    assert!(ReadBytes::read_i32(&mut Cursor::new([0, 0, 0xFF])).is_err());
}

/// Test the float readers, in both widths.
#[test]
fn floats() {
    assert_eq!(ReadBytes::read_f32(&mut Cursor::new([0, 0, 128, 62])).unwrap(), 0.25);
    assert_eq!(ReadBytes::read_f16(&mut Cursor::new([0, 192])).unwrap().to_f32(), -2.0);

    assert!(ReadBytes::read_f32(&mut Cursor::new([0, 0])).is_err());
    assert!(ReadBytes::read_f16(&mut Cursor::new([0])).is_err());
}

/// Test Sized Strings: the happy path, a count bigger than the stream, and a
/// count over the sanity cap.
#[test]
fn sized_string() {
    let mut good = vec![10, 0, 0, 0];
    good.extend_from_slice(b"Scene Root");
    assert_eq!(ReadBytes::read_sized_string(&mut Cursor::new(good)).unwrap(), "Scene Root");

    let truncated = vec![10, 0, 0, 0, b'S', b'c'];
    assert!(ReadBytes::read_sized_string(&mut Cursor::new(truncated)).is_err());

    // A count over the cap is rejected without even trying to read the payload.
    let absurd = vec![0xFF, 0xFF, 0xFF, 0x0F];
    assert!(ReadBytes::read_sized_string(&mut Cursor::new(absurd)).is_err());
}

/// Test Short Strings: terminated, unterminated, and truncated forms.
#[test]
fn short_string() {
    assert_eq!(ReadBytes::read_short_string(&mut Cursor::new([3, b'K', b'F', 0])).unwrap(), "KF");

    // Some ancient files drop the terminator; the reader shrugs it off.
    assert_eq!(ReadBytes::read_short_string(&mut Cursor::new([2, b'K', b'F'])).unwrap(), "KF");

    assert!(ReadBytes::read_short_string(&mut Cursor::new([3, b'K'])).is_err());
}

/// Test Line Strings: the terminator is consumed but stripped, and both a missing
/// terminator and one past the limit are errors.
#[test]
fn line_string() {
    let mut cursor = Cursor::new(b"NetImmerse\x0Arest".to_vec());
    assert_eq!(cursor.read_line_string(64).unwrap(), "NetImmerse");
    assert_eq!(cursor.position(), 11);

    assert!(ReadBytes::read_line_string(&mut Cursor::new(b"no feed".to_vec()), 64).is_err());
    assert!(ReadBytes::read_line_string(&mut Cursor::new(b"far\x0A".to_vec()), 2).is_err());
}
