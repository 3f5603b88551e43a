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

    src/controller.rs

    Services consumed from the floppy controller and the drive platform.
*/

//! The engine does not implement a floppy controller. It consumes the controller's command
//! parameters and DMA channel through [FloppyController], and reports results back through the
//! same trait. Physical drive state (head, RPM, density select, media presence) comes from
//! [DrivePlatform].

use crate::types::{CompareCondition, DmaData, DmaOverrun, DriveFlags, FdcError, ReadTrackErrors, SectorId};

pub trait FloppyController {
    /// The data rate code selected by the controller (0 = 500, 1 = 300, 2 = 250, 3 = 1000kbps).
    fn bit_rate(&self) -> u8;
    /// The bitcell period the controller is clocked for, in the units of
    /// [crate::track::geometry::bitcell_period].
    fn bitcell_period(&self) -> u32;
    fn is_mfm(&self) -> bool;
    /// The DTL parameter of the current command.
    fn dtl(&self) -> u32;
    /// The gap length parameter of the current command (GPL).
    fn gap(&self) -> u32;
    /// The gap 2 length to use when formatting on `drive`.
    fn gap2(&self, drive: usize) -> u32;
    /// The sector count (SC) of a FORMAT TRACK command.
    fn format_sectors(&self) -> u8;
    /// The sector size code (N) of a FORMAT TRACK command.
    fn format_n(&self) -> u8;
    fn compare_condition(&self) -> CompareCondition;
    /// True if the current command addresses deleted data.
    fn is_deleted(&self) -> bool;
    /// True if the current read is a VERIFY.
    fn is_verify(&self) -> bool;
    /// The SK (skip) bit of the current command.
    fn is_sk(&self) -> bool;
    /// The sector ID a READ TRACK command expects.
    fn read_track_sector(&self) -> SectorId;

    /// Request the next byte from the DMA source. `last` is set for the final byte of a field.
    fn get_data(&mut self, last: bool) -> DmaData;
    /// Deliver a byte read from disk to the DMA sink.
    fn data(&mut self, byte: u8) -> Result<(), DmaOverrun>;

    /// A sector was read or written successfully.
    fn sector_finish_read(&mut self);
    /// A READ TRACK command completed with the accumulated `errors`.
    fn track_finish_read(&mut self, errors: ReadTrackErrors);
    /// Terminate the current data transfer. Sent before an error that aborts a transfer.
    fn finish_read(&mut self);
    /// A SCAN completed. `matched` is true if every byte satisfied the compare condition.
    fn sector_finish_compare(&mut self, matched: bool);
    /// A READ ID command found a sector ID.
    fn sector_id(&mut self, id: SectorId);
    /// The current command failed.
    fn error(&mut self, error: FdcError);
    /// A data address mark of the other type was found and the sector is being processed anyway.
    fn set_wrong_am(&mut self);
    /// FORMAT TRACK is about to fetch the next sector ID through [FloppyController::get_data].
    fn request_next_sector_id(&mut self);
    /// FORMAT TRACK has fetched all four bytes of a sector ID.
    fn stop_id_request(&mut self);
}

pub trait DrivePlatform {
    /// The head currently selected on `drive`.
    fn head(&self, drive: usize) -> usize;
    fn flags(&self, drive: usize) -> DriveFlags;
    /// The spindle speed of `drive`.
    fn rpm(&self, drive: usize) -> u16;
    /// The density select line.
    fn densel(&self, drive: usize) -> bool;
    /// True if the drive can read the inserted medium at all.
    fn can_read_medium(&self, drive: usize) -> bool;
    /// True if each head position reads exactly one image track. When false, the drive has a
    /// 40-track head spanning two adjacent image tracks, which are merged into a thick track.
    fn double_step_40(&self, drive: usize) -> bool;
}
