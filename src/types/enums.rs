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

    src/types/enums.rs

    Enums shared between the engine and the floppy controller interface.
*/

use strum::Display;

/// The bitstream encoding of a track, from bits 3-4 of the side flags.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Display)]
pub enum DataEncoding {
    #[strum(to_string = "FM")]
    Fm,
    #[default]
    #[strum(to_string = "MFM")]
    Mfm,
    #[strum(to_string = "M2FM")]
    M2fm,
    #[strum(to_string = "GCR")]
    Gcr,
}

impl From<u8> for DataEncoding {
    fn from(value: u8) -> Self {
        match value & 0x03 {
            0 => DataEncoding::Fm,
            1 => DataEncoding::Mfm,
            2 => DataEncoding::M2fm,
            _ => DataEncoding::Gcr,
        }
    }
}

impl DataEncoding {
    /// Return true if the engine can encode and decode this encoding.
    pub fn is_supported(&self) -> bool {
        matches!(self, DataEncoding::Fm | DataEncoding::Mfm)
    }
}

/// The comparison applied by a SCAN command to each byte.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Display)]
pub enum CompareCondition {
    #[default]
    Equal,
    LowOrEqual,
    HighOrEqual,
}

impl From<u8> for CompareCondition {
    fn from(value: u8) -> Self {
        match value {
            1 => CompareCondition::LowOrEqual,
            2 => CompareCondition::HighOrEqual,
            _ => CompareCondition::Equal,
        }
    }
}

impl CompareCondition {
    /// Return true if the byte supplied by the host satisfies the condition against the byte read
    /// from disk. A host byte of 0xFF is a wildcard and always satisfies.
    pub fn satisfied(&self, received: u8, disk: u8) -> bool {
        if received == 0xFF {
            return true;
        }
        match self {
            CompareCondition::Equal => received == disk,
            CompareCondition::LowOrEqual => received <= disk,
            CompareCondition::HighOrEqual => received >= disk,
        }
    }
}

/// A byte requested from the controller's DMA source.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DmaData {
    /// A byte was transferred.
    Byte(u8),
    /// A byte was transferred but the DMA controller signalled terminal count / overrun.
    Overrun(u8),
    /// No byte was available.
    Unavailable,
}

/// Returned by the controller's data sink when a byte could not be accepted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DmaOverrun;

/// Error conditions reported to the floppy controller. Each one terminates the current command.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum FdcError {
    #[strum(to_string = "No ID address mark")]
    NoIdam,
    #[strum(to_string = "No data address mark")]
    NoDataAm,
    #[strum(to_string = "ID field CRC error")]
    HeaderCrc,
    #[strum(to_string = "Data field CRC error")]
    DataCrc,
    #[strum(to_string = "Bad cylinder")]
    BadCylinder,
    #[strum(to_string = "Wrong cylinder")]
    WrongCylinder,
    #[strum(to_string = "Sector not found")]
    NoSector,
    #[strum(to_string = "DMA overrun")]
    Overrun,
    #[strum(to_string = "Write protected")]
    WriteProtect,
    #[strum(to_string = "Cannot format")]
    CannotFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_satisfies_every_condition() {
        for cond in [
            CompareCondition::Equal,
            CompareCondition::LowOrEqual,
            CompareCondition::HighOrEqual,
        ] {
            assert!(cond.satisfied(0xFF, 0x00));
        }
        assert!(!CompareCondition::Equal.satisfied(0x10, 0x11));
        assert!(CompareCondition::LowOrEqual.satisfied(0x10, 0x11));
        assert!(!CompareCondition::HighOrEqual.satisfied(0x10, 0x11));
    }
}
