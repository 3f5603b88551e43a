/*
    FluxFox
    https://github.com/dbalsom/fluxfox

    Copyright 2024 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    src/codec.rs

    FM and MFM encoding and decoding of bytes to and from 16-bit cell words.
*/

//! The `codec` module converts between bytes and the 16-bit words of bitcells stored in a track
//! buffer.
//!
//! A cell word is always handled here in *logical* order: the first bitcell on the track is bit
//! 15, and clock and data cells alternate with the clock cell first. Data bit `i` of a byte lives
//! at word bit `2i`, its clock at word bit `2i + 1`. Conversion between logical order and the
//! storage order of the image file is done by the track buffer.

use crate::types::DataEncoding;

/// MFM 0xA1 sync byte with missing clock between bits 4 and 5.
pub const MFM_SYNC: u16 = 0x4489;
/// MFM 0xC2 index sync byte.
pub const MFM_INDEX_SYNC: u16 = 0x5224;
/// MFM index address mark (0xFC).
pub const MFM_IAM: u16 = 0x5552;
/// MFM ID address mark (0xFE).
pub const MFM_IDAM: u16 = 0x5554;
/// MFM data address mark (0xFB).
pub const MFM_DAM: u16 = 0x5545;
/// MFM deleted data address mark (0xF8).
pub const MFM_DDAM: u16 = 0x554A;

/// FM index address mark (0xFC, clock 0xD7).
pub const FM_IAM: u16 = 0xF77A;
/// FM ID address mark (0xFE, clock 0xC7).
pub const FM_IDAM: u16 = 0xF57E;
/// FM data address mark (0xFB, clock 0xC7).
pub const FM_DAM: u16 = 0xF56F;
/// FM deleted data address mark (0xF8, clock 0xC7).
pub const FM_DDAM: u16 = 0xF56A;

/// Gap fill byte for MFM tracks.
pub const MFM_GAP_FILL: u8 = 0x4E;
/// Gap fill byte for FM tracks.
pub const FM_GAP_FILL: u8 = 0xFF;

/// Returned by [encode_byte] for encodings the engine does not implement.
pub const UNSUPPORTED_ENCODING_WORD: u16 = 0x00FF;

#[rustfmt::skip]
const ENCODED_FM: [u8; 64] = [
    0xAA, 0xAB, 0xAE, 0xAF, 0xBA, 0xBB, 0xBE, 0xBF, 0xEA, 0xEB, 0xEE, 0xEF, 0xFA, 0xFB, 0xFE, 0xFF,
    0xAA, 0xAB, 0xAE, 0xAF, 0xBA, 0xBB, 0xBE, 0xBF, 0xEA, 0xEB, 0xEE, 0xEF, 0xFA, 0xFB, 0xFE, 0xFF,
    0xAA, 0xAB, 0xAE, 0xAF, 0xBA, 0xBB, 0xBE, 0xBF, 0xEA, 0xEB, 0xEE, 0xEF, 0xFA, 0xFB, 0xFE, 0xFF,
    0xAA, 0xAB, 0xAE, 0xAF, 0xBA, 0xBB, 0xBE, 0xBF, 0xEA, 0xEB, 0xEE, 0xEF, 0xFA, 0xFB, 0xFE, 0xFF,
];

// Indexed by a nibble plus the two bits preceding it. Only the lower of those two bits
// influences the first clock cell.
#[rustfmt::skip]
const ENCODED_MFM: [u8; 64] = [
    0xAA, 0xA9, 0xA4, 0xA5, 0x92, 0x91, 0x94, 0x95, 0x4A, 0x49, 0x44, 0x45, 0x52, 0x51, 0x54, 0x55,
    0x2A, 0x29, 0x24, 0x25, 0x12, 0x11, 0x14, 0x15, 0x4A, 0x49, 0x44, 0x45, 0x52, 0x51, 0x54, 0x55,
    0xAA, 0xA9, 0xA4, 0xA5, 0x92, 0x91, 0x94, 0x95, 0x4A, 0x49, 0x44, 0x45, 0x52, 0x51, 0x54, 0x55,
    0x2A, 0x29, 0x24, 0x25, 0x12, 0x11, 0x14, 0x15, 0x4A, 0x49, 0x44, 0x45, 0x52, 0x51, 0x54, 0x55,
];

/// Spread the bits of `byte` onto the even bits of a cell word.
#[inline]
pub fn spread_data(byte: u8) -> u16 {
    (0..8).fold(0u16, |acc, i| acc | ((((byte >> i) & 1) as u16) << (i * 2)))
}

/// Spread the bits of `clock` onto the odd bits of a cell word.
#[inline]
pub fn spread_clock(clock: u8) -> u16 {
    spread_data(clock) << 1
}

/// Return the clock pattern that turns `byte` into an address mark or sync byte, if it is one.
pub fn sync_clock(encoding: DataEncoding, byte: u8) -> Option<u8> {
    match encoding {
        DataEncoding::Mfm => match byte {
            0xA1 => Some(0x0A),
            0xC2 => Some(0x14),
            0xF8 => Some(0x03),
            0xFB | 0xFE => Some(0x00),
            0xFC => Some(0x01),
            _ => None,
        },
        DataEncoding::Fm => match byte {
            0xF8 | 0xFB | 0xFE => Some(0xC7),
            0xFC => Some(0xD7),
            _ => None,
        },
        _ => None,
    }
}

/// Encode `byte` into a logical cell word.
///
/// `prev` is the byte written immediately before, whose lowest bit determines the first clock
/// cell under MFM. When `sync` is set and `byte` is one of the address mark or sync bytes of the
/// encoding, the returned word carries the missing-clock pattern of that mark. Any other byte is
/// encoded normally.
pub fn encode_byte(encoding: DataEncoding, sync: bool, byte: u8, prev: u8) -> u16 {
    if !encoding.is_supported() {
        return UNSUPPORTED_ENCODING_WORD;
    }

    if sync {
        if let Some(clock) = sync_clock(encoding, byte) {
            return spread_data(byte) | spread_clock(clock);
        }
    }

    let table = match encoding {
        DataEncoding::Mfm => &ENCODED_MFM,
        _ => &ENCODED_FM,
    };

    let lo = ((byte & 0x0F) | ((byte >> 4) & 0x03) << 4) as usize;
    let hi = ((byte >> 4) | (prev & 0x03) << 4) as usize;

    (table[hi] as u16) << 8 | table[lo] as u16
}

/// Extract the data cells of a logical cell word. Identical for FM and MFM.
#[inline]
pub fn decode_word(word: u16) -> u8 {
    (0..8).fold(0u8, |acc, i| acc | ((((word >> (i * 2)) & 1) as u8) << i))
}

/// Return the gap fill byte for the given encoding.
pub fn gap_fill(mfm: bool) -> u8 {
    if mfm {
        MFM_GAP_FILL
    }
    else {
        FM_GAP_FILL
    }
}

/// Address mark words for one encoding.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MarkSet {
    pub iam: u16,
    pub idam: u16,
    pub dam: u16,
    pub ddam: u16,
}

impl MarkSet {
    pub const MFM: MarkSet = MarkSet {
        iam: MFM_IAM,
        idam: MFM_IDAM,
        dam: MFM_DAM,
        ddam: MFM_DDAM,
    };
    pub const FM: MarkSet = MarkSet {
        iam: FM_IAM,
        idam: FM_IDAM,
        dam: FM_DAM,
        ddam: FM_DDAM,
    };

    pub fn for_encoding(mfm: bool) -> MarkSet {
        if mfm {
            MarkSet::MFM
        }
        else {
            MarkSet::FM
        }
    }
}
