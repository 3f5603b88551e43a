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

    src/engine/format.rs

    FORMAT TRACK: lays down a complete track one bitcell at a time, starting
    at the index hole and ending at the next.
*/

use crate::{
    codec::{decode_word, gap_fill, MarkSet, MFM_INDEX_SYNC, MFM_SYNC},
    crc::CRC_SEED_FM,
    engine::{state::EngineState, DriveImageState, EngineIo},
    track::{
        buffer::DirectWord,
        builder::{by_encoding, GAP0_LEN, GAP1_LEN, SYNC_LEN},
    },
    types::{size_from_code, DmaData, ReadTrackErrors},
    F86_VERSION,
};

/// Gap 4 runs until the index hole. This bounds it on a track that never reaches one.
const GAP4_LEN: u32 = 60000;

/// The fields of a formatted track, in the order they are written.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormatPhase {
    #[default]
    Gap0,
    PretrackSync,
    Iam,
    Gap1,
    IdSync,
    Idam,
    Id,
    IdCrc,
    Gap2,
    DataSync,
    DataAm,
    Data,
    DataCrc,
    Gap3,
    PostCheck,
    Gap4,
}

impl FormatPhase {
    pub fn next(self) -> Self {
        use FormatPhase::*;
        match self {
            Gap0 => PretrackSync,
            PretrackSync => Iam,
            Iam => Gap1,
            Gap1 => IdSync,
            IdSync => Idam,
            Idam => Id,
            Id => IdCrc,
            IdCrc => Gap2,
            Gap2 => DataSync,
            DataSync => DataAm,
            DataAm => Data,
            Data => DataCrc,
            DataCrc => Gap3,
            Gap3 => PostCheck,
            PostCheck | Gap4 => Gap4,
        }
    }

    /// True while the phase belongs to a sector rather than to the track gaps.
    pub fn in_sector(&self) -> bool {
        (FormatPhase::IdSync..=FormatPhase::Gap3).contains(self)
    }
}

/// Position of a FORMAT TRACK command within the track layout.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FormatProgress {
    pub phase: FormatPhase,
    /// Bytes written in the current phase.
    pub datac: u32,
    /// Bitcells written of the current byte.
    pub bit: u32,
}

impl DriveImageState {
    /// Advance a FORMAT TRACK by one bitcell. A whole word is written on the first bitcell of
    /// each byte; the remaining fifteen only move the head.
    pub(crate) fn format_step(&mut self, io: &mut EngineIo, side: usize) {
        let mfm = io.track_flags(side).is_mfm();
        // Sector-level images receive the sector bytes instead of a bitstream.
        let do_write = io.handler.version() == F86_VERSION;

        if self.format.bit == 0 {
            self.format_word(io, side, mfm, do_write);
        }

        self.advance_bit(io, side);
        self.format.bit += 1;
        if self.format.bit < 16 {
            return;
        }
        self.format.bit = 0;
        self.format.datac += 1;

        if self.index_count > 0 && !self.format.phase.in_sector() {
            self.format_finish(io, side, mfm, do_write);
            return;
        }

        if self.format.datac < self.phase_len(io, mfm) {
            return;
        }

        self.format.datac = 0;
        self.format.phase = self.format.phase.next();
        match self.format.phase {
            FormatPhase::IdSync => io.fdc.request_next_sector_id(),
            FormatPhase::Idam | FormatPhase::DataAm => self.calc_crc.reset(CRC_SEED_FM),
            FormatPhase::PostCheck => {
                if self.index_count > 0 {
                    self.format_finish(io, side, mfm, do_write);
                    return;
                }
                self.sector_count += 1;
                if self.sector_count < io.fdc.format_sectors() as u32 {
                    self.format.phase = FormatPhase::IdSync;
                    io.fdc.request_next_sector_id();
                }
                else {
                    self.format.phase = FormatPhase::Gap4;
                    self.sector_count = 0;
                }
            }
            _ => {}
        }
    }

    /// The length in bytes of the current phase.
    fn phase_len(&self, io: &EngineIo, mfm: bool) -> u32 {
        let len = |lengths: (usize, usize)| by_encoding(mfm, lengths) as u32;
        match self.format.phase {
            FormatPhase::Gap0 => len(GAP0_LEN),
            FormatPhase::PretrackSync | FormatPhase::IdSync | FormatPhase::DataSync => len(SYNC_LEN),
            FormatPhase::Iam | FormatPhase::Idam | FormatPhase::DataAm => {
                if mfm {
                    4
                }
                else {
                    1
                }
            }
            FormatPhase::Gap1 => len(GAP1_LEN),
            FormatPhase::Id => 4,
            FormatPhase::IdCrc | FormatPhase::DataCrc => 2,
            FormatPhase::Gap2 => io.fdc.gap2(io.drive),
            FormatPhase::Data => size_from_code(io.fdc.format_n()) as u32,
            FormatPhase::Gap3 => io.fdc.gap(),
            FormatPhase::PostCheck => 0,
            FormatPhase::Gap4 => GAP4_LEN,
        }
    }

    /// Write the word for byte `datac` of the current phase.
    fn format_word(&mut self, io: &mut EngineIo, side: usize, mfm: bool, do_write: bool) {
        let marks = MarkSet::for_encoding(mfm);
        let datac = self.format.datac;
        let gap = gap_fill(mfm);

        match self.format.phase {
            FormatPhase::Gap0 | FormatPhase::Gap1 | FormatPhase::Gap2 | FormatPhase::Gap3 | FormatPhase::Gap4 => {
                if do_write {
                    self.write_direct(io, side, DirectWord::Byte(gap));
                }
            }
            FormatPhase::IdSync => {
                if datac <= 3 {
                    // A missing size code reads as 0xFF.
                    let byte = match io.fdc.get_data(false) {
                        DmaData::Byte(b) | DmaData::Overrun(b) => b,
                        DmaData::Unavailable if datac == 3 => 0xFF,
                        DmaData::Unavailable => 0,
                    };
                    self.format_sector_id.set_byte(datac as usize, byte);
                    if datac == 3 {
                        io.fdc.stop_id_request();
                        log::trace!(
                            "Drive {}: Formatting sector {} of track {}",
                            io.drive,
                            self.format_sector_id,
                            self.tracks.cur_track
                        );
                    }
                }
                if do_write {
                    self.write_direct(io, side, DirectWord::Byte(0x00));
                }
            }
            FormatPhase::PretrackSync | FormatPhase::DataSync => {
                if do_write {
                    self.write_direct(io, side, DirectWord::Byte(0x00));
                }
            }
            FormatPhase::Iam => {
                if do_write {
                    let word = if mfm && datac < 3 { MFM_INDEX_SYNC } else { marks.iam };
                    self.write_direct(io, side, DirectWord::Mark(word));
                }
            }
            FormatPhase::Idam | FormatPhase::DataAm => {
                let mark = if self.format.phase == FormatPhase::Idam { marks.idam } else { marks.dam };
                let (word, byte) = if mfm && datac < 3 {
                    (MFM_SYNC, 0xA1)
                }
                else {
                    (mark, decode_word(mark))
                };
                if do_write {
                    self.write_direct(io, side, DirectWord::Mark(word));
                }
                self.calc_crc.update(byte);
            }
            FormatPhase::Id => {
                let byte = self.format_sector_id.to_bytes()[(datac & 3) as usize];
                if do_write {
                    self.write_direct(io, side, DirectWord::Byte(byte));
                }
                else if datac == 3 {
                    io.handler.set_sector(side, self.format_sector_id);
                }
                self.calc_crc.update(byte);
            }
            FormatPhase::IdCrc | FormatPhase::DataCrc => {
                if do_write {
                    let byte = self.calc_crc.bytes()[(datac & 1) as usize];
                    self.write_direct(io, side, DirectWord::Byte(byte));
                }
            }
            FormatPhase::Data => {
                if do_write {
                    self.write_direct(io, side, DirectWord::Byte(self.fill));
                }
                else {
                    io.handler.write_data(side, datac as usize, self.fill);
                }
                self.calc_crc.update(self.fill);
            }
            FormatPhase::PostCheck => {}
        }
    }

    fn format_finish(&mut self, io: &mut EngineIo, side: usize, mfm: bool, do_write: bool) {
        if mfm && do_write && self.track_pos == io.index_hole(side) {
            // The word straddling the index would otherwise keep stale clock bits.
            self.write_direct_at(io, side, 0, DirectWord::Byte(gap_fill(mfm)));
        }

        self.state = EngineState::Idle;
        if let Err(e) = io.handler.writeback(&mut self.tracks, io.thick()) {
            log::error!("Drive {}: Writeback after format failed: {}", io.drive, e);
        }
        log::trace!("Drive {}: Format of track {} complete", io.drive, self.tracks.cur_track);
        self.errors = ReadTrackErrors::empty();
        self.format.datac = 0;
        io.fdc.sector_finish_read();
    }
}
