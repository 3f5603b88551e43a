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

    src/crc.rs

    Table-driven CRC16 as used by IBM System/34 floppy controllers.
*/

//! The `crc` module implements the 16-bit CRC used for ID and data fields.
//!
//! The table is built once at compile time for polynomial 0x1021. The running CRC is stored on
//! disk big-endian, high byte first.

/// The CCITT polynomial used by the floppy controller.
pub const CRC_POLYNOMIAL: u16 = 0x1021;
/// CRC seed for an FM field. The address mark byte itself is accumulated after seeding.
pub const CRC_SEED_FM: u16 = 0xFFFF;
/// CRC seed for an MFM field. This is the CRC of three 0xA1 sync bytes from a seed of 0xFFFF,
/// so that only the address mark byte needs to be accumulated after seeding.
pub const CRC_SEED_MFM: u16 = 0xCDB4;

/// A 256-entry lookup table for a 16-bit CRC polynomial.
pub struct CrcTable {
    table: [u16; 256],
}

impl CrcTable {
    /// Build the table for `poly`.
    pub const fn new(poly: u16) -> Self {
        let mut table = [0u16; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = (i as u16) << 8;
            let mut bit = 0;
            while bit < 8 {
                crc = if crc & 0x8000 != 0 { (crc << 1) ^ poly } else { crc << 1 };
                bit += 1;
            }
            table[i] = crc;
            i += 1;
        }
        Self { table }
    }

    /// Perform one table-driven shift-xor step of `byte` into `crc`.
    #[inline]
    pub fn accumulate(&self, byte: u8, crc: u16) -> u16 {
        (crc << 8) ^ self.table[((crc >> 8) as u8 ^ byte) as usize]
    }
}

static CCITT_TABLE: CrcTable = CrcTable::new(CRC_POLYNOMIAL);

/// Accumulate `byte` into `crc` with the CCITT table.
#[inline]
pub fn crc_accumulate(byte: u8, crc: u16) -> u16 {
    CCITT_TABLE.accumulate(byte, crc)
}

/// Compute the CRC of `bytes` starting from `seed`.
pub fn crc_ccitt(seed: u16, bytes: &[u8]) -> u16 {
    bytes.iter().fold(seed, |crc, &b| crc_accumulate(b, crc))
}

/// A running CRC accumulator owned by a drive.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Crc16(u16);

impl Crc16 {
    pub fn new(seed: u16) -> Self {
        Crc16(seed)
    }

    pub fn reset(&mut self, seed: u16) {
        self.0 = seed;
    }

    #[inline]
    pub fn update(&mut self, byte: u8) {
        self.0 = crc_accumulate(byte, self.0);
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    /// The CRC in on-disk order.
    pub fn bytes(&self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    /// Invert every bit of the CRC, producing a guaranteed mismatch.
    pub fn invert(&mut self) {
        self.0 ^= 0xFFFF;
    }
}
