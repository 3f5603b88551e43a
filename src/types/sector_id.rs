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
*/

//! The `sector_id` module defines the four-byte sector ID record found in every ID field, and
//! the sector selector used by read commands.

use std::fmt::{self, Display, Formatter};

/// The largest size code honored when computing a sector length. Larger codes are clamped,
/// so that a corrupt ID can never request more than 32768 bytes.
pub const MAX_SIZE_CODE: u8 = 8;

/// A sector ID as recorded in an ID field:
///  - Cylinder ID (c)
///  - Head ID (h)
///  - Sector ID (r)
///  - Sector Size code (n)
///
/// A [SectorId] is used both for the ID requested by the controller and for the last ID observed
/// on the track. Field order matches the on-disk order.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq)]
pub struct SectorId {
    pub c: u8,
    pub h: u8,
    pub r: u8,
    pub n: u8,
}

impl Display for SectorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[c:{:2} h:{} r:{:3} n:{}]", self.c, self.h, self.r, self.n)
    }
}

impl From<[u8; 4]> for SectorId {
    fn from(bytes: [u8; 4]) -> Self {
        SectorId {
            c: bytes[0],
            h: bytes[1],
            r: bytes[2],
            n: bytes[3],
        }
    }
}

impl From<SectorId> for [u8; 4] {
    fn from(id: SectorId) -> Self {
        id.to_bytes()
    }
}

impl SectorId {
    pub fn new(c: u8, h: u8, r: u8, n: u8) -> Self {
        SectorId { c, h, r, n }
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        [self.c, self.h, self.r, self.n]
    }

    /// Set the byte at `index` in on-disk order (c, h, r, n). Indices past 3 are ignored.
    pub fn set_byte(&mut self, index: usize, byte: u8) {
        match index {
            0 => self.c = byte,
            1 => self.h = byte,
            2 => self.r = byte,
            3 => self.n = byte,
            _ => {}
        }
    }

    /// Return the size of the sector in bytes, as determined by the size code `n`.
    pub fn size(&self) -> usize {
        size_from_code(self.n)
    }
}

/// Convert a sector size code into a size in bytes: 128 << n, with n clamped to 8.
#[inline]
pub fn size_from_code(n: u8) -> usize {
    128usize << n.min(MAX_SIZE_CODE)
}

/// Selects which sector a read, write or compare command is addressed to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SectorSelect {
    /// The first sector after the index hole. Starts a READ TRACK command.
    First,
    /// The sector following the last requested sector. Continues a READ TRACK command.
    Next,
    /// A specific sector ID.
    Number(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_codes() {
        assert_eq!(SectorId::new(0, 0, 1, 0).size(), 128);
        assert_eq!(SectorId::new(0, 0, 1, 2).size(), 512);
        assert_eq!(SectorId::new(0, 0, 1, 8).size(), 32768);
        assert_eq!(SectorId::new(0, 0, 1, 0xFF).size(), 32768);
    }

    #[test]
    fn byte_order() {
        let mut id = SectorId::default();
        for (i, b) in [5u8, 1, 9, 2].iter().enumerate() {
            id.set_byte(i, *b);
        }
        assert_eq!(id, SectorId::new(5, 1, 9, 2));
        assert_eq!(id.to_bytes(), [5, 1, 9, 2]);
    }
}
