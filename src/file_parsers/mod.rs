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

    src/file_parsers/mod.rs

    The image handler interface and the handler for an empty drive.
*/

//! Every mounted disk image is accessed through an [ImageHandler]. The engine never calls
//! format-specific code directly.
//!
//! A native handler ([f86::F86Image]) stores bitstream tracks and writes them back verbatim. A
//! proxied handler ([raw::RawSectorImage]) renders tracks from sector data on seek and receives
//! written sector bytes through [ImageHandler::set_sector] and [ImageHandler::write_data].

use crate::{
    controller::FloppyController,
    track::TrackStore,
    types::{DiskFlags, DriveFlags, SectorId, SideFlags},
    F86Error,
    F86_INTERNAL_VERSION,
};

pub mod compression;
pub mod f86;
pub mod raw;

pub trait ImageHandler {
    fn disk_flags(&self) -> DiskFlags;
    /// The side flags of the current track of `side`.
    fn side_flags(&self, side: usize) -> SideFlags;
    /// The signed count of bitcells the current track of `side` adds to its nominal length.
    fn extra_bit_cells(&self, side: usize) -> i32;
    /// The bit position of the index hole on the current track of `side`.
    fn index_hole_pos(&self, side: usize) -> u32;
    fn version(&self) -> u16;
    fn write_protected(&self) -> bool;
    /// Return true if the controller's current FORMAT TRACK parameters can be represented.
    fn format_conditions(&self, fdc: &dyn FloppyController, drive_flags: DriveFlags) -> bool;
    /// Note the ID of the sector the engine is about to read or write on `side`.
    fn set_sector(&mut self, side: usize, id: SectorId);
    /// Receive byte `pos` of the data field being written on `side`.
    fn write_data(&mut self, side: usize, pos: usize, byte: u8);
    /// Load `track` into `tracks`. `track` is in image track units: with `thick` set it is the
    /// first of the two thin tracks under the head.
    fn seek(&mut self, tracks: &mut TrackStore, track: u16, thick: bool) -> Result<(), F86Error>;
    /// Persist the current track.
    fn writeback(&mut self, tracks: &mut TrackStore, thick: bool) -> Result<(), F86Error>;
    /// Prepare the current track of `side` to be formatted with `flags`.
    fn prepare_format(
        &mut self,
        tracks: &mut TrackStore,
        side: usize,
        flags: SideFlags,
        thick: bool,
    ) -> Result<(), F86Error>;
    /// True if tracks are stored as bitstreams and written back as-is.
    fn is_native(&self) -> bool;
}

/// The handler mounted in a drive with no media.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullImage;

impl NullImage {
    pub const DISK_FLAGS: u16 = 0x09;
    pub const SIDE_FLAGS: u16 = 0x0A;
}

impl ImageHandler for NullImage {
    fn disk_flags(&self) -> DiskFlags {
        DiskFlags::from_bits_retain(Self::DISK_FLAGS)
    }

    fn side_flags(&self, _side: usize) -> SideFlags {
        SideFlags(Self::SIDE_FLAGS)
    }

    fn extra_bit_cells(&self, _side: usize) -> i32 {
        0
    }

    fn index_hole_pos(&self, _side: usize) -> u32 {
        0
    }

    fn version(&self) -> u16 {
        F86_INTERNAL_VERSION
    }

    fn write_protected(&self) -> bool {
        false
    }

    fn format_conditions(&self, _fdc: &dyn FloppyController, _drive_flags: DriveFlags) -> bool {
        false
    }

    fn set_sector(&mut self, _side: usize, _id: SectorId) {}

    fn write_data(&mut self, _side: usize, _pos: usize, _byte: u8) {}

    fn seek(&mut self, _tracks: &mut TrackStore, _track: u16, _thick: bool) -> Result<(), F86Error> {
        Ok(())
    }

    fn writeback(&mut self, _tracks: &mut TrackStore, _thick: bool) -> Result<(), F86Error> {
        Ok(())
    }

    fn prepare_format(
        &mut self,
        _tracks: &mut TrackStore,
        _side: usize,
        _flags: SideFlags,
        _thick: bool,
    ) -> Result<(), F86Error> {
        Ok(())
    }

    fn is_native(&self) -> bool {
        false
    }
}
