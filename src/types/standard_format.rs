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

    types/standard_format.rs

    Represents the standard PC disk formats that can be stored as a raw sector
    image. A raw image carries no metadata, so the format is inferred from the
    file size and all track layout parameters come from here.

        PC   160K  DD Single-Sided 5.25"
        PC   180K  DD Single-Sided 5.25"
        PC   320K  DD Double-Sided 5.25"
        PC   360K  DD Double-Sided 5.25"
        PC   720K  DD Double-Sided 3.5"
        PC   1.2M  HD Double-Sided 5.25"
        PC   1.44M HD Double-Sided 3.5"
        PC   2.88M ED Double-Sided 3.5"
*/

//! The `standard_format` module defines the [StandardFormat] enum that defines parameters for
//! several standard PC disk formats.

use crate::types::{DiskFlags, SideFlags};
use std::fmt::{Display, Formatter};

/// The GAP2 length used by every standard PC format.
pub const STANDARD_GAP2: u8 = 22;

/// An enumeration describing one of several standard PC disk formats.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum StandardFormat {
    /// A single-sided, 8-sectored, 48tpi, double-density disk.
    PcFloppy160,
    /// A single-sided, 9-sectored, 48tpi, double-density disk.
    PcFloppy180,
    /// A double-sided, 8-sectored, 48tpi, double-density disk.
    PcFloppy320,
    /// A double-sided, 9-sectored, 48tpi, double-density disk.
    PcFloppy360,
    /// A double-sided, 9-sectored, 96tpi, double-density disk.
    PcFloppy720,
    /// A double-sided, 15-sectored, 96tpi, high-density disk.
    PcFloppy1200,
    /// A double-sided, 18-sectored, 96tpi, high-density disk.
    PcFloppy1440,
    /// A double-sided, 36-sectored, 96tpi, extra-density disk.
    PcFloppy2880,
}

impl Display for StandardFormat {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            StandardFormat::PcFloppy160 => write!(f, "160K 5.25\" DD"),
            StandardFormat::PcFloppy180 => write!(f, "180K 5.25\" DD"),
            StandardFormat::PcFloppy320 => write!(f, "320K 5.25\" DD"),
            StandardFormat::PcFloppy360 => write!(f, "360K 5.25\" DD"),
            StandardFormat::PcFloppy720 => write!(f, "720K 3.5\" DD"),
            StandardFormat::PcFloppy1200 => write!(f, "1.2M 5.25\" HD"),
            StandardFormat::PcFloppy1440 => write!(f, "1.44M 3.5\" HD"),
            StandardFormat::PcFloppy2880 => write!(f, "2.88M 3.5\" ED"),
        }
    }
}

impl StandardFormat {
    /// Return a vector of all StandardFormat variants.
    pub fn list() -> Vec<StandardFormat> {
        vec![
            StandardFormat::PcFloppy160,
            StandardFormat::PcFloppy180,
            StandardFormat::PcFloppy320,
            StandardFormat::PcFloppy360,
            StandardFormat::PcFloppy720,
            StandardFormat::PcFloppy1200,
            StandardFormat::PcFloppy1440,
            StandardFormat::PcFloppy2880,
        ]
    }

    /// Returns the geometry as a (cylinders, heads, sectors per track) tuple.
    pub fn chs(&self) -> (u16, u8, u8) {
        match self {
            StandardFormat::PcFloppy160 => (40, 1, 8),
            StandardFormat::PcFloppy180 => (40, 1, 9),
            StandardFormat::PcFloppy320 => (40, 2, 8),
            StandardFormat::PcFloppy360 => (40, 2, 9),
            StandardFormat::PcFloppy720 => (80, 2, 9),
            StandardFormat::PcFloppy1200 => (80, 2, 15),
            StandardFormat::PcFloppy1440 => (80, 2, 18),
            StandardFormat::PcFloppy2880 => (80, 2, 36),
        }
    }

    pub fn cylinders(&self) -> u16 {
        self.chs().0
    }

    pub fn heads(&self) -> u8 {
        self.chs().1
    }

    pub fn sectors_per_track(&self) -> u8 {
        self.chs().2
    }

    /// The sector size code. Always 2 (512 bytes) for standard PC formats.
    pub fn size_code(&self) -> u8 {
        2
    }

    pub fn sector_size(&self) -> usize {
        128 << self.size_code()
    }

    /// Return the number of bytes in one track of the raw image.
    pub fn track_size(&self) -> usize {
        self.sector_size() * self.sectors_per_track() as usize
    }

    /// Return a standard default GAP3 value corresponding to the `StandardFormat`.
    pub fn gap3(&self) -> u8 {
        match self {
            StandardFormat::PcFloppy160 => 0x50,
            StandardFormat::PcFloppy180 => 0x50,
            StandardFormat::PcFloppy320 => 0x50,
            StandardFormat::PcFloppy360 => 0x50,
            StandardFormat::PcFloppy720 => 0x50,
            StandardFormat::PcFloppy1200 => 0x54,
            StandardFormat::PcFloppy1440 => 0x6C,
            StandardFormat::PcFloppy2880 => 0x53,
        }
    }

    pub fn gap2(&self) -> u8 {
        STANDARD_GAP2
    }

    /// Return the hole / density class (0 = DD, 1 = HD, 2 = ED).
    pub fn hole_class(&self) -> u8 {
        match self {
            StandardFormat::PcFloppy1200 | StandardFormat::PcFloppy1440 => 1,
            StandardFormat::PcFloppy2880 => 2,
            _ => 0,
        }
    }

    /// Return the side flags every track of the format is written with: the data rate, MFM
    /// encoding and the RPM of the drive type that normally writes the format.
    pub fn side_flags(&self) -> SideFlags {
        match self {
            StandardFormat::PcFloppy1200 => SideFlags::new(0, true, true),
            StandardFormat::PcFloppy1440 => SideFlags::new(0, true, false),
            StandardFormat::PcFloppy2880 => SideFlags::new(3, true, false),
            _ => SideFlags::new(2, true, false),
        }
    }

    /// Return the disk flags a native image of this format would carry.
    pub fn disk_flags(&self) -> DiskFlags {
        let mut flags = DiskFlags::from_bits_retain((self.hole_class() as u16) << 1);
        if self.heads() > 1 {
            flags |= DiskFlags::SIDES;
        }
        flags
    }

    /// Return the size in bytes of a raw sector image corresponding to the `StandardFormat`.
    pub fn disk_size(&self) -> usize {
        match self {
            StandardFormat::PcFloppy160 => 163_840,
            StandardFormat::PcFloppy180 => 184_320,
            StandardFormat::PcFloppy320 => 327_680,
            StandardFormat::PcFloppy360 => 368_640,
            StandardFormat::PcFloppy720 => 737_280,
            StandardFormat::PcFloppy1200 => 1_228_800,
            StandardFormat::PcFloppy1440 => 1_474_560,
            StandardFormat::PcFloppy2880 => 2_949_120,
        }
    }
}

impl TryFrom<u64> for StandardFormat {
    type Error = String;

    /// Convert a size in bytes to a `StandardFormat` variant.
    fn try_from(size: u64) -> Result<Self, Self::Error> {
        StandardFormat::list()
            .into_iter()
            .find(|f| f.disk_size() as u64 == size)
            .ok_or_else(|| format!("Invalid size: {}", size))
    }
}

impl From<StandardFormat> for usize {
    /// Convert a `StandardFormat` variant into a size in bytes.
    fn from(format: StandardFormat) -> Self {
        format.disk_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_matches_size() {
        for format in StandardFormat::list() {
            let (c, h, _) = format.chs();
            assert_eq!(c as usize * h as usize * format.track_size(), format.disk_size());
            assert_eq!(StandardFormat::try_from(format.disk_size() as u64), Ok(format));
        }
        assert!(StandardFormat::try_from(1000u64).is_err());
    }

    #[test]
    fn disk_flags_encode_hole_and_sides() {
        assert_eq!(StandardFormat::PcFloppy180.disk_flags().bits(), 0x00);
        assert_eq!(StandardFormat::PcFloppy360.disk_flags().bits(), 0x08);
        assert_eq!(StandardFormat::PcFloppy1440.disk_flags().bits(), 0x0A);
        assert_eq!(StandardFormat::PcFloppy2880.disk_flags().bits(), 0x0C);
        assert_eq!(StandardFormat::PcFloppy1200.side_flags().bits(), 0x28);
    }
}
