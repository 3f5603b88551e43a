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

    src/engine/mod.rs

    The bit-clocked drive engine.
*/

//! A [DriveImageState] holds everything one drive needs to execute controller commands against
//! the mounted image: the track buffers, the head position within the track, and the progress
//! of the current command.
//!
//! Commands are started by the `readsector`, `writesector`, `comparesector`, `readaddress` and
//! `format` entry points, then driven by calling [DriveImageState::poll] once per bitcell. The
//! engine never blocks; every call does a bounded amount of work.

pub mod format;
pub mod search;
pub mod state;

use crate::{
    controller::{DrivePlatform, FloppyController},
    crc::Crc16,
    file_parsers::ImageHandler,
    random::RandomBits,
    track::{
        buffer::{BitLayout, DirectWord},
        geometry,
        TrackStore,
    },
    types::{FdcError, ReadTrackErrors, SectorId, SectorSelect, SideFlags},
    F86Error,
};
use format::FormatProgress;
use state::{Command, EngineState, Phase};

/// The services the engine works against during one call: the mounted image, the floppy
/// controller and the drive platform.
pub struct EngineIo<'a> {
    pub handler: &'a mut dyn ImageHandler,
    pub fdc: &'a mut dyn FloppyController,
    pub platform: &'a dyn DrivePlatform,
    pub drive: usize,
    /// Effective write protection: the image's or the user's.
    pub write_protect: bool,
}

impl<'a> EngineIo<'a> {
    pub fn new(
        handler: &'a mut dyn ImageHandler,
        fdc: &'a mut dyn FloppyController,
        platform: &'a dyn DrivePlatform,
        drive: usize,
        write_protect: bool,
    ) -> Self {
        Self {
            handler,
            fdc,
            platform,
            drive,
            write_protect,
        }
    }

    fn layout(&self) -> BitLayout {
        let flags = self.handler.disk_flags();
        BitLayout::new(flags.reverse_endian(), flags.has_surface_desc())
    }

    /// The effective track flags of `side` in this drive.
    pub fn track_flags(&self, side: usize) -> SideFlags {
        geometry::track_flags(self.handler.side_flags(side), self.platform.flags(self.drive))
    }

    /// The length of the current track of `side` in bitcells.
    pub fn raw_size(&self, side: usize) -> u32 {
        geometry::raw_size(
            self.track_flags(side),
            self.handler.disk_flags().rpm_mode(),
            self.handler.extra_bit_cells(side),
        )
    }

    fn index_hole(&self, side: usize) -> u32 {
        self.handler.index_hole_pos(side) % self.raw_size(side)
    }

    /// True if the drive's head spans two image tracks.
    pub fn thick(&self) -> bool {
        !self.platform.double_step_40(self.drive)
    }
}

/// Progress of an address mark search or a field transfer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct FindContext {
    pub(crate) sync_marks: u32,
    pub(crate) bits_obtained: u32,
    pub(crate) bytes_obtained: u32,
    /// Track position of the last MFM sync mark.
    pub(crate) sync_pos: Option<u32>,
}

impl FindContext {
    pub(crate) fn reset(&mut self) {
        *self = FindContext::default();
    }
}

#[derive(Default)]
pub struct DriveImageState {
    pub(crate) tracks: TrackStore,
    pub(crate) state: EngineState,
    pub(crate) track_pos: u32,
    pub(crate) index_count: u32,
    pub(crate) last_word: [u16; 2],
    pub(crate) preceding_bit: [u8; 2],
    pub(crate) current_byte: [u16; 2],
    pub(crate) id_find: FindContext,
    pub(crate) data_find: FindContext,
    pub(crate) calc_crc: Crc16,
    pub(crate) track_crc: u16,
    pub(crate) req_sector: SectorId,
    pub(crate) last_sector: SectorId,
    pub(crate) format_sector_id: SectorId,
    pub(crate) errors: ReadTrackErrors,
    pub(crate) id_found: u32,
    pub(crate) dma_over: u32,
    pub(crate) satisfying_bytes: u32,
    pub(crate) sector_count: u32,
    pub(crate) format: FormatProgress,
    /// The data byte of a FORMAT TRACK command.
    pub(crate) fill: u8,
    rng: RandomBits,
}

impl DriveImageState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The bit position of the head within the current track.
    pub fn track_pos(&self) -> u32 {
        self.track_pos
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn track_store(&self) -> &TrackStore {
        &self.tracks
    }

    /// The ID of the last sector header read from the track.
    pub fn last_sector(&self) -> SectorId {
        self.last_sector
    }

    /// Abandon the current command.
    pub fn stop(&mut self) {
        self.state = EngineState::Idle;
    }

    /// Load `track` from the image and reset the engine to idle. `track` is in physical head
    /// steps; a drive with a thick head reads two image tracks per step.
    pub fn seek(&mut self, io: &mut EngineIo, track: u16) -> Result<(), F86Error> {
        let thick = io.thick();
        let track = if thick { track << 1 } else { track };

        self.tracks.clear(thick);
        let result = io.handler.seek(&mut self.tracks, track, thick);
        self.tracks.cur_track = track;

        for side in 0..2 {
            self.fit_buffers(io, side);
        }
        self.state = EngineState::Idle;

        if let Err(e) = &result {
            log::error!("Drive {}: Seek to track {} failed: {}", io.drive, track, e);
        }
        result
    }

    /// Grow both sides' buffers to hold the current track of `side`. The head reads both sides
    /// at the position of the selected one.
    fn fit_buffers(&mut self, io: &EngineIo, side: usize) {
        let words = io.raw_size(side).div_ceil(16) as usize;
        for s in 0..2 {
            self.tracks.side_mut(s).ensure_len(words);
        }
    }

    /// Return true if the drive can read the current track in its current configuration.
    pub fn can_read_address(&self, io: &EngineIo, side: usize) -> bool {
        let tf = io.track_flags(side);
        io.fdc.bitcell_period() == geometry::bitcell_period(tf, io.platform.rpm(io.drive))
            && io.platform.can_read_medium(io.drive)
            && io.fdc.is_mfm() == tf.is_mfm()
            && tf.encoding().is_supported()
    }

    pub fn can_format(&self, io: &EngineIo) -> bool {
        !io.write_protect
            && io.platform.can_read_medium(io.drive)
            && io.handler.format_conditions(&*io.fdc, io.platform.flags(io.drive))
            && !self.wrong_densel(io)
    }

    fn wrong_densel(&self, io: &EngineIo) -> bool {
        geometry::wrong_densel(
            io.handler.disk_flags(),
            io.platform.densel(io.drive),
            io.platform.flags(io.drive),
        )
    }

    /// The number of bytes the current command transfers.
    fn data_len(&self, io: &EngineIo) -> u32 {
        geometry::data_len(self.req_sector.n, io.fdc.dtl())
    }

    /// Shift the bit under the head on `side` into that side's last word.
    pub(crate) fn get_bit(&mut self, io: &EngineIo, side: usize) {
        let layout = io.layout();
        let rng = &mut self.rng;
        let bit = self
            .tracks
            .side(side)
            .get_bit(self.track_pos, layout, || rng.next_bit());
        self.last_word[side] = (self.last_word[side] << 1) | bit as u16;
    }

    /// Write `bit` under the head on `side`, shifting the bit as it now reads into the last word.
    pub(crate) fn put_bit(&mut self, io: &EngineIo, side: usize, bit: bool) {
        let layout = io.layout();
        let written = self.tracks.side_mut(side).put_bit(self.track_pos, bit, layout);
        self.last_word[side] = (self.last_word[side] << 1) | written as u16;
    }

    /// Write a whole word at the word under the head on `side`.
    pub(crate) fn write_direct(&mut self, io: &EngineIo, side: usize, word: DirectWord) {
        self.write_direct_at(io, side, (self.track_pos >> 4) as usize, word);
    }

    pub(crate) fn write_direct_at(&mut self, io: &EngineIo, side: usize, index: usize, word: DirectWord) {
        let layout = io.layout();
        let encoding = io.track_flags(side).encoding();
        self.last_word[side] =
            self.tracks
                .side_mut(side)
                .write_word(index, word, &mut self.preceding_bit[side], encoding, layout);
    }

    /// Move the head one bitcell forward, counting index pulses while a command is active.
    pub(crate) fn advance_bit(&mut self, io: &EngineIo, side: usize) {
        let raw = io.raw_size(side);
        self.track_pos = (self.track_pos + 1) % raw;

        if self.track_pos == io.index_hole(side) && !self.state.is_idle() {
            self.index_count += 1;
        }
    }

    fn reset_search(&mut self) {
        self.id_find.reset();
        self.data_find.reset();
        self.index_count = 0;
        self.errors = ReadTrackErrors::empty();
        self.satisfying_bytes = 0;
        self.id_found = 0;
        self.dma_over = 0;
    }

    /// Set up the requested sector ID and reset search progress. Returns false if the command
    /// was rejected.
    fn common_command(&mut self, io: &mut EngineIo, select: SectorSelect, track: u8, side: u8, rate: u8, size: u8) -> bool {
        log::trace!(
            "Drive {}: Command: fdc period={} image period={} rate={} sector={:?} track={} side={}",
            io.drive,
            io.fdc.bitcell_period(),
            geometry::bitcell_period(io.track_flags(side as usize), io.platform.rpm(io.drive)),
            rate,
            select,
            track,
            side
        );

        self.req_sector.c = track;
        self.req_sector.h = side;
        self.req_sector.r = match select {
            SectorSelect::First => 1,
            SectorSelect::Next => self.req_sector.r.wrapping_add(1),
            SectorSelect::Number(r) => r,
        };
        self.req_sector.n = size;

        if !self.check_side(io) {
            return false;
        }

        self.reset_search();
        true
    }

    /// Reject a command addressed to the second head of a single-sided disk.
    fn check_side(&mut self, io: &mut EngineIo) -> bool {
        if io.platform.head(io.drive) & 1 != 0 && io.handler.disk_flags().sides() == 1 {
            log::trace!("Drive {}: Access to side 1 of a single-sided disk", io.drive);
            io.fdc.error(FdcError::NoIdam);
            self.state = EngineState::Idle;
            self.index_count = 0;
            return false;
        }
        true
    }

    pub fn readsector(&mut self, io: &mut EngineIo, select: SectorSelect, track: u8, side: u8, rate: u8, size: u8) {
        if !self.common_command(io, select, track, side, rate, size) {
            return;
        }

        self.state = match select {
            SectorSelect::First => EngineState::start(Command::ReadTrack),
            SectorSelect::Next => EngineState::Active(Command::ReadTrack, Phase::FindId),
            SectorSelect::Number(_) => {
                let command = if io.fdc.is_deleted() {
                    Command::ReadDeleted
                }
                else if io.fdc.is_verify() {
                    Command::Verify
                }
                else {
                    Command::ReadData
                };
                EngineState::start(command)
            }
        };
    }

    pub fn writesector(&mut self, io: &mut EngineIo, select: SectorSelect, track: u8, side: u8, rate: u8, size: u8) {
        if io.write_protect {
            io.fdc.error(FdcError::WriteProtect);
            self.state = EngineState::Idle;
            self.index_count = 0;
            return;
        }
        if !self.common_command(io, select, track, side, rate, size) {
            return;
        }

        let command = if io.fdc.is_deleted() {
            Command::WriteDeleted
        }
        else {
            Command::WriteData
        };
        self.state = EngineState::start(command);
    }

    pub fn comparesector(&mut self, io: &mut EngineIo, select: SectorSelect, track: u8, side: u8, rate: u8, size: u8) {
        if !self.common_command(io, select, track, side, rate, size) {
            return;
        }
        self.state = EngineState::start(Command::Scan);
    }

    pub fn readaddress(&mut self, io: &mut EngineIo, side: u8, rate: u8) {
        log::trace!("Drive {}: Read sector ID, side {} rate {}", io.drive, side, rate);
        if !self.check_side(io) {
            return;
        }
        self.reset_search();
        self.state = EngineState::start(Command::ReadSectorId);
    }

    pub fn format(&mut self, io: &mut EngineIo, side: usize, rate: u8, fill: u8) {
        let side = side & 1;

        if io.write_protect {
            io.fdc.error(FdcError::WriteProtect);
            self.state = EngineState::Idle;
            self.index_count = 0;
            return;
        }

        if (side == 1 && io.handler.disk_flags().sides() == 1) || !self.can_format(io) {
            io.fdc.error(FdcError::CannotFormat);
            self.state = EngineState::Idle;
            self.index_count = 0;
            return;
        }

        let mut flags = (io.fdc.bit_rate() as u16) & SideFlags::RATE_MASK;
        if io.platform.rpm(io.drive) == 360 {
            flags |= SideFlags::RPM_360;
        }
        if io.fdc.is_mfm() {
            flags |= SideFlags::MFM;
        }

        let thick = io.thick();
        if let Err(e) = io
            .handler
            .prepare_format(&mut self.tracks, side, SideFlags(flags), thick)
        {
            log::error!("Drive {}: Can't format track {}: {}", io.drive, self.tracks.cur_track, e);
            io.fdc.error(FdcError::WriteProtect);
            self.state = EngineState::Idle;
            self.index_count = 0;
            return;
        }

        log::trace!(
            "Drive {}: Format track {} side {} rate {} with {}, fill {:02X}",
            io.drive,
            self.tracks.cur_track,
            side,
            rate,
            SideFlags(flags),
            fill
        );

        self.fill = fill;
        self.reset_search();
        self.sector_count = 0;
        self.format = FormatProgress::default();
        self.state = EngineState::start(Command::FormatTrack);
    }

    /// Advance the drive by one bitcell.
    pub fn poll(&mut self, io: &mut EngineIo) {
        let side = io.platform.head(io.drive) & 1;
        self.fit_buffers(io, side);

        if self.state.command() == Some(Command::FormatTrack) && !self.can_format(io) {
            self.state = EngineState::SectorNotFound;
        }

        if let EngineState::Active(command, _) = self.state {
            if command != Command::FormatTrack && !self.can_read_address(io, side) {
                log::trace!("Drive {}: Track is unreadable in the current configuration", io.drive);
                self.state = EngineState::SectorNotFound;
            }
        }

        if self.state.phase() != Some(Phase::SpinToIndex) {
            self.get_bit(io, side ^ 1);
        }

        match self.state {
            EngineState::Active(_, Phase::SpinToIndex) => {
                self.spin_to_index(io, side);
                return;
            }
            EngineState::Active(Command::FormatTrack, _) => {
                self.format_step(io, side);
                return;
            }
            EngineState::Active(command, phase) => self.step_search(io, side, command, phase),
            EngineState::Idle | EngineState::SectorNotFound => self.get_bit(io, side),
        }

        self.advance_bit(io, side);

        if self.wrong_densel(io) && !self.state.is_idle() {
            log::trace!("Drive {}: Density select is wrong for the medium", io.drive);
            self.state = EngineState::Idle;
            io.fdc.error(FdcError::NoIdam);
            return;
        }

        if self.index_count == 2 && !self.state.is_idle() {
            self.search_timeout(io);
        }
    }

    /// The head has passed the index hole twice without the command completing.
    fn search_timeout(&mut self, io: &mut EngineIo) {
        let error = match self.state {
            EngineState::Active(Command::ReadSectorId, Phase::FindId) | EngineState::SectorNotFound => {
                FdcError::NoIdam
            }
            EngineState::Active(_, Phase::FindData) => FdcError::NoDataAm,
            EngineState::Active(_, Phase::SpinToIndex) | EngineState::Active(_, Phase::Data) => return,
            _ => {
                if self.id_found == 0 {
                    FdcError::NoIdam
                }
                else if self.errors.contains(ReadTrackErrors::WRONG_CYLINDER) {
                    FdcError::WrongCylinder
                }
                else if self.errors.contains(ReadTrackErrors::BAD_CYLINDER) {
                    FdcError::BadCylinder
                }
                else {
                    FdcError::NoSector
                }
            }
        };

        log::trace!(
            "Drive {}: [State: {:02X}] {} (request {}, ids found {})",
            io.drive,
            self.state.code(),
            error,
            self.req_sector,
            self.id_found
        );
        self.state = EngineState::Idle;
        io.fdc.error(error);
    }
}
