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

//! # f86engine
//!
//! A bit-clocked floppy disk controller engine operating on 86F bitstream disk images.
//!
//! The engine models a floppy drive at the level of individual bitcells. A platform timer calls
//! [F86Drive::poll] once per elapsed bitcell; each call advances the virtual head by one bit and
//! steps either the sector search state machine or the format engine. Results are reported back
//! to the floppy controller through the [FloppyController] trait.
//!
//! Disk images are accessed through the [ImageHandler] trait. Three handlers are provided:
//!  - [F86Image], the native 86F bitstream format, optionally LZF-compressed.
//!  - [RawSectorImage], a flat sector image of a standard PC geometry, for which tracks are
//!    synthesized on seek.
//!  - [NullImage], the inert handler used by a drive with no media.

pub mod codec;
pub mod controller;
pub mod crc;
pub mod drive;
pub mod engine;
pub mod file_parsers;
pub mod io;
mod random;
pub mod track;
pub mod types;

use thiserror::Error;

/// The maximum number of drives a [DriveManager] will manage.
pub const FDD_NUM: usize = 4;
/// The 86F image format version this engine reads and writes (2.11).
pub const F86_VERSION: u16 = 0x020B;
/// The version reported by proxied and null image handlers (0.99). Never valid in a file.
pub const F86_INTERNAL_VERSION: u16 = 0x0063;

pub use crate::{
    controller::{DrivePlatform, FloppyController},
    drive::{DriveManager, F86Drive},
    engine::{
        state::{Command, EngineState, Phase},
        DriveImageState,
    },
    file_parsers::{
        compression::CompressionError,
        f86::{F86Image, LoadOptions},
        raw::RawSectorImage,
        ImageHandler,
        NullImage,
    },
    track::{buffer::TrackBuffer, builder::TrackBuilder, TrackStore},
    types::{
        CompareCondition,
        DataEncoding,
        DiskFlags,
        DmaData,
        DmaOverrun,
        DriveFlags,
        FdcError,
        ReadTrackErrors,
        SectorId,
        SectorSelect,
        SideFlags,
        StandardFormat,
    },
};

#[derive(Debug, Error)]
pub enum F86Error {
    #[error("An IO error occurred reading or writing the disk image: {0}")]
    IoError(String),
    #[error("The disk image format parser encountered an error: {0}")]
    FormatParseError(String),
    #[error("Unrecognized magic bytes: {0:08X}")]
    UnknownMagic(u32),
    #[error("File has emulator-internal version 0.99, this version is not valid in a file")]
    InternalVersion,
    #[error("No longer supported development file version: {}.{:02}", .0 >> 8, .0 & 0xFF)]
    ObsoleteVersion(u16),
    #[error("Unrecognized file version: {}.{:02}", .0 >> 8, .0 & 0xFF)]
    UnsupportedVersion(u16),
    #[error("The disk image is too small ({0} bytes)")]
    ImageTooSmall(u64),
    #[error("Disk is zoned (Apple or Sony)")]
    ZonedImage,
    #[error("Disk is fixed-RPM but zone type is not 0 (flags: {0:04X})")]
    InvalidZoneType(u16),
    #[error("The disk image has no track 0 side {0}")]
    MissingTrackZero(usize),
    #[error("A compression error occurred: {0}")]
    CompressionError(#[from] CompressionError),
    #[error("Unknown disk image format")]
    UnknownFormat,
    #[error("No standard geometry matches a raw image of {0} bytes")]
    UnknownGeometry(u64),
    #[error("Track {0} is beyond the formattable range")]
    TrackOutOfRange(u16),
    #[error("The disk image is write protected")]
    WriteProtected,
    #[error("Invalid parameters were specified to a library function")]
    ParameterError,
}

impl From<std::io::Error> for F86Error {
    fn from(err: std::io::Error) -> Self {
        F86Error::IoError(err.to_string())
    }
}

impl From<binrw::Error> for F86Error {
    fn from(err: binrw::Error) -> Self {
        match err {
            binrw::Error::Io(e) => F86Error::IoError(e.to_string()),
            _ => F86Error::FormatParseError(err.to_string()),
        }
    }
}
