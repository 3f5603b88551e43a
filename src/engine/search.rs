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

    src/engine/search.rs

    The sector search machine: address mark searches, ID field and data field
    transfers, one bitcell per call.
*/

use crate::{
    codec::{decode_word, MarkSet, MFM_SYNC},
    crc::{CRC_SEED_FM, CRC_SEED_MFM},
    engine::{
        state::{Command, EngineState, Phase},
        DriveImageState,
        EngineIo,
    },
    types::{size_from_code, DmaData, FdcError, ReadTrackErrors},
};

/// Set bits preceding an FM data address mark that a write waits for: 22 bytes of 0xFF gap.
const FM_WRITE_GAP_BITS: u32 = 352;

/// What an address mark search does when it finds the other data mark (deleted instead of
/// normal data, or the reverse).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum OtherMark {
    /// The other mark isn't looked for.
    Ignore,
    /// Process the sector anyway and flag the wrong mark to the controller.
    Accept,
    /// Skip the sector and search for the next ID.
    Skip,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Field {
    Id,
    Data,
}

/// Return true if `track_pos` is a whole number of words past `sync_pos`. The track length
/// `raw` corrects for a search that wrapped around the index.
pub(crate) fn word_is_aligned(track_pos: u32, raw: u32, sync_pos: Option<u32>) -> bool {
    let Some(sync_pos) = sync_pos else {
        return false;
    };
    let pos = if track_pos < sync_pos { track_pos + raw } else { track_pos };
    (pos & 15) == (sync_pos & 15)
}

impl DriveImageState {
    /// Dispatch one bitcell of a sector command.
    pub(crate) fn step_search(&mut self, io: &mut EngineIo, side: usize, command: Command, phase: Phase) {
        let marks = MarkSet::for_encoding(io.fdc.is_mfm());
        let skip = if io.fdc.is_sk() { OtherMark::Skip } else { OtherMark::Accept };

        match (command, phase) {
            (_, Phase::FindId) => self.find_address_mark(io, side, Field::Id, marks.idam, 0, OtherMark::Ignore),
            (Command::ReadSectorId | Command::ReadTrack, Phase::ReadId) => self.read_sector_id(io, side, false),
            (_, Phase::ReadId) => self.read_sector_id(io, side, true),
            (Command::ReadTrack, Phase::FindData) => {
                self.find_address_mark(io, side, Field::Data, marks.dam, marks.ddam, OtherMark::Accept)
            }
            (Command::ReadDeleted, Phase::FindData) => {
                self.find_address_mark(io, side, Field::Data, marks.ddam, marks.dam, skip)
            }
            (command, Phase::FindData) if command.is_write() => self.write_find_address_mark(io, side),
            (_, Phase::FindData) => self.find_address_mark(io, side, Field::Data, marks.dam, marks.ddam, skip),
            (Command::WriteData, Phase::Data) => self.write_sector_data(io, side, marks.dam),
            (Command::WriteDeleted, Phase::Data) => self.write_sector_data(io, side, marks.ddam),
            (_, Phase::Data) => self.read_sector_data(io, side),
            (_, Phase::SpinToIndex) => self.get_bit(io, side),
        }
    }

    /// Wait for the index hole, then start the command proper.
    pub(crate) fn spin_to_index(&mut self, io: &mut EngineIo, side: usize) {
        self.get_bit(io, side);
        self.get_bit(io, side ^ 1);
        self.advance_bit(io, side);

        if self.track_pos == io.index_hole(side) {
            if self.state.command() == Some(Command::FormatTrack) {
                self.preceding_bit[side] = 1;
                self.format = Default::default();
            }
            // READ TRACK and FORMAT TRACK count index pulses from here.
            self.index_count = 0;
            self.state = self.state.next();
        }
    }

    /// Search for the address mark `req`. MFM marks only count when preceded by three sync marks
    /// and found on a word boundary relative to them.
    pub(crate) fn find_address_mark(
        &mut self,
        io: &mut EngineIo,
        side: usize,
        field: Field,
        req: u16,
        other: u16,
        policy: OtherMark,
    ) {
        self.get_bit(io, side);

        let word = self.last_word[side];
        let mfm = io.fdc.is_mfm();
        let raw = io.raw_size(side);
        let track_pos = self.track_pos;
        let find = match field {
            Field::Id => &mut self.id_find,
            Field::Data => &mut self.data_find,
        };

        let found = if mfm {
            if word == MFM_SYNC {
                find.sync_marks += 1;
                find.sync_pos = Some(track_pos);
                return;
            }
            let aligned = word_is_aligned(track_pos, raw, find.sync_pos);
            if find.sync_marks >= 3 && aligned && word == req {
                Some(false)
            }
            else if find.sync_marks >= 3 && aligned && policy != OtherMark::Ignore && word == other {
                Some(true)
            }
            else {
                if aligned {
                    find.reset();
                }
                None
            }
        }
        else if word == req {
            Some(false)
        }
        else if policy != OtherMark::Ignore && word == other {
            Some(true)
        }
        else {
            None
        };

        let Some(is_other) = found else {
            return;
        };

        find.reset();
        self.calc_crc.reset(if mfm { CRC_SEED_MFM } else { CRC_SEED_FM });
        self.calc_crc.update(decode_word(word));

        if is_other {
            if policy == OtherMark::Skip {
                log::trace!("Drive {}: Skipping sector with mark {:04X}", io.drive, word);
                self.state = self.state.retry();
                return;
            }
            io.fdc.set_wrong_am();
        }

        log::trace!(
            "Drive {}: [State: {:02X}] Found address mark {:04X} at {}",
            io.drive,
            self.state.code(),
            word,
            track_pos
        );
        self.preceding_bit[side] = (word & 1) as u8;
        self.state = self.state.next();
    }

    /// Find where a data field is to be written: after the three MFM sync marks, or after the
    /// FM gap.
    pub(crate) fn write_find_address_mark(&mut self, io: &mut EngineIo, side: usize) {
        self.get_bit(io, side);

        let word = self.last_word[side];
        let mfm = io.fdc.is_mfm();
        let raw = io.raw_size(side);
        let track_pos = self.track_pos;
        let find = &mut self.data_find;

        let found = if mfm {
            if word == MFM_SYNC {
                find.sync_marks += 1;
                find.sync_pos = Some(track_pos);
                find.sync_marks == 3
            }
            else {
                if word_is_aligned(track_pos, raw, find.sync_pos) {
                    find.reset();
                }
                false
            }
        }
        else if word & 1 != 0 {
            find.sync_marks += 1;
            find.sync_marks == FM_WRITE_GAP_BITS
        }
        else {
            find.reset();
            false
        };

        if found {
            find.reset();
            self.calc_crc.reset(if mfm { CRC_SEED_MFM } else { CRC_SEED_FM });
            self.preceding_bit[side] = 1;
            self.state = self.state.next();
        }
    }

    pub(crate) fn read_sector_id(&mut self, io: &mut EngineIo, side: usize, match_id: bool) {
        let bits = self.id_find.bits_obtained;
        if bits > 0 && bits % 16 == 0 {
            let byte = decode_word(self.last_word[side]);
            match self.id_find.bytes_obtained {
                n @ 0..=3 => {
                    self.last_sector.set_byte(n as usize, byte);
                    self.calc_crc.update(byte);
                }
                4 => self.track_crc = (self.track_crc & 0x00FF) | ((byte as u16) << 8),
                5 => self.track_crc = (self.track_crc & 0xFF00) | byte as u16,
                _ => {}
            }
            self.id_find.bytes_obtained += 1;

            if self.id_find.bytes_obtained == 6 {
                self.id_complete(io, side, match_id);
            }
        }

        self.get_bit(io, side);
        self.id_find.bits_obtained += 1;
    }

    fn id_complete(&mut self, io: &mut EngineIo, side: usize, match_id: bool) {
        let command = self.state.command();
        self.id_find.reset();

        if self.calc_crc.value() != self.track_crc {
            log::trace!(
                "Drive {}: ID CRC error: {:04X} != {:04X} {}",
                io.drive,
                self.track_crc,
                self.calc_crc.value(),
                self.last_sector
            );
            match command {
                Some(Command::ReadSectorId) => self.state = self.state.retry(),
                Some(Command::ReadTrack) => {
                    self.errors |= ReadTrackErrors::ID_CRC;
                    self.state = self.state.next();
                }
                _ => {
                    self.errors = ReadTrackErrors::empty();
                    self.state = EngineState::Idle;
                    io.fdc.finish_read();
                    io.fdc.error(FdcError::HeaderCrc);
                }
            }
            return;
        }

        if command == Some(Command::ReadSectorId) {
            self.errors = ReadTrackErrors::empty();
            self.state = EngineState::Idle;
            io.fdc.sector_id(self.last_sector);
            return;
        }

        self.id_found += 1;
        if !match_id || self.last_sector == self.req_sector {
            io.handler.set_sector(side, self.last_sector);

            if command == Some(Command::ReadTrack) {
                // The sector number isn't compared.
                let expected = io.fdc.read_track_sector();
                let last = self.last_sector;
                if last.c != expected.c || last.h != expected.h || last.n != expected.n {
                    self.errors |= ReadTrackErrors::WRONG_ID;
                    self.last_sector.n = expected.n;
                }
            }
            log::trace!("Drive {}: Sector ID {} found", io.drive, self.last_sector);
            self.state = self.state.next();
        }
        else {
            if self.last_sector.c != self.req_sector.c {
                self.errors |= if self.last_sector.c == 0xFF {
                    ReadTrackErrors::BAD_CYLINDER
                }
                else {
                    ReadTrackErrors::WRONG_CYLINDER
                };
            }
            self.state = self.state.retry();
        }
    }

    /// Fetch the next byte of a write or compare from the controller. `base` is the number of
    /// field bytes preceding the data.
    pub(crate) fn get_data(&mut self, io: &mut EngineIo, base: u32) -> u8 {
        let limit = self.data_len(io) + base;
        if self.data_find.bytes_obtained >= limit {
            return 0;
        }

        match io.fdc.get_data(self.data_find.bytes_obtained + 1 == limit) {
            DmaData::Byte(byte) => byte,
            DmaData::Overrun(byte) => {
                self.dma_over += 1;
                byte
            }
            DmaData::Unavailable => {
                self.dma_over += 1;
                0
            }
        }
    }

    pub(crate) fn read_sector_data(&mut self, io: &mut EngineIo, side: usize) {
        let sector_len = size_from_code(self.last_sector.n) as u32;
        let crc_pos = sector_len + 2;

        let bits = self.data_find.bits_obtained;
        if bits > 0 && bits % 16 == 0 {
            let byte = decode_word(self.last_word[side]);
            let n = self.data_find.bytes_obtained;
            let command = self.state.command();

            if n < sector_len {
                if command == Some(Command::Scan) {
                    let received = self.get_data(io, 0);
                    if io.fdc.compare_condition().satisfied(received, byte) {
                        self.satisfying_bytes += 1;
                    }
                }
                else if n < self.data_len(io) && command != Some(Command::Verify) && io.fdc.data(byte).is_err() {
                    self.dma_over += 1;
                }
                self.calc_crc.update(byte);
            }
            else if n == sector_len {
                self.track_crc = (self.track_crc & 0x00FF) | ((byte as u16) << 8);
            }
            else if n < crc_pos {
                self.track_crc = (self.track_crc & 0xFF00) | byte as u16;
            }
            self.data_find.bytes_obtained += 1;

            if self.data_find.bytes_obtained == crc_pos + io.fdc.gap() {
                self.data_complete(io, sector_len);
            }
        }

        self.get_bit(io, side);
        self.data_find.bits_obtained += 1;
    }

    fn data_complete(&mut self, io: &mut EngineIo, sector_len: u32) {
        let command = self.state.command();
        self.data_find.reset();

        if self.dma_over > 1 {
            log::trace!("Drive {}: DMA overrun while reading data", io.drive);
            self.errors = ReadTrackErrors::empty();
            self.state = EngineState::Idle;
            io.fdc.finish_read();
            io.fdc.error(FdcError::Overrun);
            return;
        }

        if self.calc_crc.value() != self.track_crc {
            log::trace!(
                "Drive {}: Data CRC error: {:04X} != {:04X} {}",
                io.drive,
                self.track_crc,
                self.calc_crc.value(),
                self.last_sector
            );
            self.state = EngineState::Idle;
            if command == Some(Command::ReadTrack) {
                self.errors |= ReadTrackErrors::DATA_CRC;
                io.fdc.track_finish_read(self.errors);
            }
            else {
                self.errors = ReadTrackErrors::empty();
                io.fdc.finish_read();
                io.fdc.error(FdcError::DataCrc);
            }
            return;
        }

        self.errors = ReadTrackErrors::empty();
        self.state = EngineState::Idle;
        if command == Some(Command::Scan) {
            io.fdc.sector_finish_compare(self.satisfying_bytes == sector_len);
        }
        else {
            io.fdc.sector_finish_read();
        }
    }

    /// Write the data field bit by bit: the address mark, the data bytes from the controller,
    /// then the CRC. The controller's gap length is then waited out before completing.
    pub(crate) fn write_sector_data(&mut self, io: &mut EngineIo, side: usize, am: u16) {
        let mfm = io.fdc.is_mfm();
        let sector_len = size_from_code(self.last_sector.n) as u32 + 1;
        let crc_pos = sector_len + 2;

        let bits = self.data_find.bits_obtained;
        let bit_pos = 15 - (bits & 15);
        let n = self.data_find.bytes_obtained;

        if n < crc_pos {
            if bit_pos == 15 {
                self.current_byte[side] = if n == 0 {
                    am
                }
                else if n < sector_len {
                    let byte = self.get_data(io, 1);
                    io.handler.write_data(side, (n - 1) as usize, byte);
                    byte as u16
                }
                else {
                    self.calc_crc.bytes()[(n - sector_len) as usize] as u16
                };

                if n == 0 {
                    self.calc_crc.update(decode_word(am));
                }
                else if n < sector_len {
                    self.calc_crc.update(self.current_byte[side] as u8);
                }
            }

            if n == 0 {
                // The mark is written as is, missing clocks included.
                let bit = (am >> bit_pos) & 1 != 0;
                self.put_bit(io, side, bit);
                if bit_pos & 1 == 0 {
                    self.preceding_bit[side] = bit as u8;
                }
            }
            else {
                let data = (self.current_byte[side] >> (bit_pos >> 1)) & 1 != 0;
                if bit_pos & 1 != 0 {
                    let clock = !mfm || (!data && self.preceding_bit[side] == 0);
                    self.put_bit(io, side, clock);
                }
                else {
                    self.put_bit(io, side, data);
                    self.preceding_bit[side] = data as u8;
                }
            }
        }

        if bit_pos == 0 {
            self.data_find.bytes_obtained += 1;

            if self.data_find.bytes_obtained == crc_pos + io.fdc.gap() {
                self.data_find.reset();
                self.errors = ReadTrackErrors::empty();
                self.state = EngineState::Idle;

                if self.dma_over > 1 {
                    log::trace!("Drive {}: DMA overrun while writing data", io.drive);
                    io.fdc.finish_read();
                    io.fdc.error(FdcError::Overrun);
                    return;
                }

                if let Err(e) = io.handler.writeback(&mut self.tracks, io.thick()) {
                    log::error!("Drive {}: Writeback failed: {}", io.drive, e);
                }
                log::trace!("Drive {}: Sector {} written", io.drive, self.last_sector);
                io.fdc.sector_finish_read();
                return;
            }
        }

        self.data_find.bits_obtained += 1;
    }
}
