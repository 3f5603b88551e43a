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

    flags.rs

    Defines disk, side, drive and read track status flags
*/

use crate::types::DataEncoding;
use bitflags::bitflags;
use std::fmt::{self, Display, Formatter};

bitflags! {
    /// Flags stored in the 86F file header describing the whole disk.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    #[rustfmt::skip]
    pub struct DiskFlags: u16 {
        #[doc = "Track records carry a surface description array (fuzzy bits and holes)"]
        const HAS_SURFACE_DESC  = 0b0000_0000_0000_0001;
        #[doc = "Hole / density class: 0 = DD, 1 = HD, 2 = ED, 3 = ED with 2000kbps"]
        const HOLE_MASK         = 0b0000_0000_0000_0110;
        #[doc = "Disk is double-sided"]
        const SIDES             = 0b0000_0000_0000_1000;
        #[doc = "Disk is write protected"]
        const WRITE_PROTECT     = 0b0000_0000_0001_0000;
        #[doc = "RPM slowdown class: 0 = 0%, 1 = 1%, 2 = 1.5%, 3 = 2%"]
        const RPM_SLOWDOWN      = 0b0000_0000_0110_0000;
        #[doc = "Track records carry a signed extra bitcell count"]
        const BITCELL_MODE      = 0b0000_0000_1000_0000;
        #[doc = "Disk is zoned (variable RPM)"]
        const ZONED             = 0b0000_0001_0000_0000;
        #[doc = "Zone type of a zoned disk"]
        const ZONE_TYPE         = 0b0000_0110_0000_0000;
        #[doc = "Data and surface words are stored in reverse byte endianness"]
        const REVERSE_ENDIAN    = 0b0000_1000_0000_0000;
    }
}

impl DiskFlags {
    pub fn has_surface_desc(&self) -> bool {
        self.contains(DiskFlags::HAS_SURFACE_DESC)
    }

    /// The raw hole class field, 0-3.
    pub fn hole_class(&self) -> u8 {
        ((self.bits() & DiskFlags::HOLE_MASK.bits()) >> 1) as u8
    }

    pub fn sides(&self) -> usize {
        if self.contains(DiskFlags::SIDES) {
            2
        }
        else {
            1
        }
    }

    pub fn rpm_mode(&self) -> u8 {
        ((self.bits() & DiskFlags::RPM_SLOWDOWN.bits()) >> 5) as u8
    }

    pub fn has_extra_bit_cells(&self) -> bool {
        self.contains(DiskFlags::BITCELL_MODE)
    }

    pub fn reverse_endian(&self) -> bool {
        self.contains(DiskFlags::REVERSE_ENDIAN)
    }

    pub fn write_protect(&self) -> bool {
        self.contains(DiskFlags::WRITE_PROTECT)
    }
}

bitflags! {
    /// Capability flags of a physical drive, as reported by the drive platform.
    /// The low three bits double as a drive type code (see [DriveFlags::drive_type]).
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    #[rustfmt::skip]
    pub struct DriveFlags: u16 {
        #[doc = "Drive can spin at 300RPM"]
        const RPM_300       = 0b0000_0001;
        #[doc = "Drive can spin at 360RPM"]
        const RPM_360       = 0b0000_0010;
        #[doc = "Drive is a 5.25\" drive"]
        const FIVE_INCH     = 0b0000_0100;
        #[doc = "Drive has two heads"]
        const DOUBLE_SIDED  = 0b0000_1000;
        #[doc = "Drive accepts DD media"]
        const HOLE0         = 0b0001_0000;
        #[doc = "Drive accepts HD media"]
        const HOLE1         = 0b0010_0000;
        #[doc = "Drive accepts ED media"]
        const HOLE2         = 0b0100_0000;
        #[doc = "Drive double steps when reading 40 track media"]
        const DOUBLE_STEP   = 0b1000_0000;
    }
}

impl DriveFlags {
    /// Drive type code in the low three bits. 3 is a 3-mode 3.5" drive, 6 is a single-RPM 5.25" HD
    /// drive.
    pub fn drive_type(&self) -> u8 {
        (self.bits() & 0x07) as u8
    }

    pub fn is_three_mode(&self) -> bool {
        self.drive_type() == 3
    }
}

bitflags! {
    /// Errors accumulated over a command and reported through `track_finish_read`.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    #[rustfmt::skip]
    pub struct ReadTrackErrors: u8 {
        #[doc = "An ID field had a CRC error"]
        const ID_CRC            = 0b0000_0001;
        #[doc = "A data field had a CRC error"]
        const DATA_CRC          = 0b0000_0010;
        #[doc = "A sector ID did not match the ID expected by the controller"]
        const WRONG_ID          = 0b0000_0100;
        #[doc = "A sector ID had a cylinder of 0xFF"]
        const BAD_CYLINDER      = 0b0000_1000;
        #[doc = "A sector ID had a different cylinder than requested"]
        const WRONG_CYLINDER    = 0b0001_0000;
    }
}

/// Per-side track flags, stored at the start of each 86F track record.
///
/// - bits 0-2: data rate (0 = 500, 1 = 300, 2 = 250, 3 = 1000, 5 = 2000 kbps)
/// - bits 3-4: encoding (0 = FM, 1 = MFM, 2 = M2FM, 3 = GCR)
/// - bits 5-7: RPM (1 = 360RPM, otherwise 300RPM)
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SideFlags(pub u16);

impl SideFlags {
    pub const RATE_MASK: u16 = 0x07;
    pub const MFM: u16 = 0x08;
    pub const ENCODING_MASK: u16 = 0x18;
    pub const RPM_MASK: u16 = 0xE0;
    pub const RPM_360: u16 = 0x20;

    pub fn new(rate: u8, mfm: bool, rpm_360: bool) -> Self {
        let mut flags = (rate as u16) & Self::RATE_MASK;
        if mfm {
            flags |= Self::MFM;
        }
        if rpm_360 {
            flags |= Self::RPM_360;
        }
        SideFlags(flags)
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    pub fn rate(&self) -> u8 {
        (self.0 & Self::RATE_MASK) as u8
    }

    /// Data rate in kbps, before halving for FM.
    pub fn rate_kbps(&self) -> f64 {
        match self.rate() {
            0 => 500.0,
            1 => 300.0,
            2 => 250.0,
            3 => 1000.0,
            5 => 2000.0,
            _ => 250.0,
        }
    }

    pub fn is_mfm(&self) -> bool {
        self.0 & Self::MFM != 0
    }

    pub fn encoding(&self) -> DataEncoding {
        DataEncoding::from(((self.0 & Self::ENCODING_MASK) >> 3) as u8)
    }

    pub fn rpm(&self) -> f64 {
        if self.0 & Self::RPM_MASK == Self::RPM_360 {
            360.0
        }
        else {
            300.0
        }
    }
}

impl Display for SideFlags {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{:04X} ({} {}kbps {}RPM)",
            self.0,
            self.encoding(),
            self.rate_kbps(),
            self.rpm()
        )
    }
}
