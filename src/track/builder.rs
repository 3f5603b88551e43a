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

    src/track/builder.rs

    Synthesize a formatted track word by word.
*/

//! A [TrackBuilder] writes an IBM System 34 style track layout directly into a [TrackBuffer].
//!
//! It is used to render sector images as bitstream tracks, and to author test images. Every
//! position is a word index that wraps at the end of the track.

use crate::codec::{gap_fill, FM_IAM, FM_IDAM, MFM_IAM, MFM_IDAM, MFM_INDEX_SYNC, MFM_SYNC};
use crate::codec::{FM_DAM, FM_DDAM, MFM_DAM, MFM_DDAM};
use crate::crc::{Crc16, CRC_SEED_FM};
use crate::track::buffer::{BitLayout, DirectWord, TrackBuffer};
use crate::types::{DataEncoding, SectorId};

/// Gap 0 length in bytes (MFM, FM).
pub const GAP0_LEN: (usize, usize) = (80, 40);
/// Sync field length in bytes (MFM, FM).
pub const SYNC_LEN: (usize, usize) = (12, 6);
/// Gap 1 length in bytes (MFM, FM).
pub const GAP1_LEN: (usize, usize) = (50, 26);

#[inline]
pub(crate) fn by_encoding(mfm: bool, lengths: (usize, usize)) -> usize {
    if mfm {
        lengths.0
    }
    else {
        lengths.1
    }
}

pub struct TrackBuilder<'a> {
    buf: &'a mut TrackBuffer,
    layout: BitLayout,
    encoding: DataEncoding,
    words: usize,
    preceding: u8,
    crc: Crc16,
}

impl<'a> TrackBuilder<'a> {
    /// Create a builder over `buf` for a track of `raw_bits` bitcells. The buffer is grown to
    /// hold the track if needed.
    pub fn new(buf: &'a mut TrackBuffer, layout: BitLayout, mfm: bool, raw_bits: u32) -> Self {
        let words = ((raw_bits >> 4) as usize).max(1);
        buf.ensure_len(words);
        Self {
            buf,
            layout,
            encoding: if mfm { DataEncoding::Mfm } else { DataEncoding::Fm },
            words,
            preceding: 0,
            crc: Crc16::new(CRC_SEED_FM),
        }
    }

    fn mfm(&self) -> bool {
        self.encoding == DataEncoding::Mfm
    }

    /// The number of words in the track.
    pub fn words(&self) -> usize {
        self.words
    }

    fn put(&mut self, pos: usize, word: DirectWord) -> usize {
        self.buf
            .write_word(pos, word, &mut self.preceding, self.encoding, self.layout);
        (pos + 1) % self.words
    }

    fn put_run(&mut self, mut pos: usize, byte: u8, count: usize) -> usize {
        for _ in 0..count {
            pos = self.put(pos, DirectWord::Byte(byte));
        }
        pos
    }

    fn put_crc_byte(&mut self, pos: usize, byte: u8) -> usize {
        self.crc.update(byte);
        self.put(pos, DirectWord::Byte(byte))
    }

    /// Write the field prologue: sync bytes, then the MFM 0xA1 sync marks, then the address mark.
    /// The CRC is restarted and covers the marks.
    fn put_address_mark(&mut self, mut pos: usize, mfm_mark: u16, fm_mark: u16, mark_byte: u8) -> usize {
        pos = self.put_run(pos, 0x00, by_encoding(self.mfm(), SYNC_LEN));
        self.crc.reset(CRC_SEED_FM);
        if self.mfm() {
            for _ in 0..3 {
                pos = self.put(pos, DirectWord::Mark(MFM_SYNC));
                self.crc.update(0xA1);
            }
            pos = self.put(pos, DirectWord::Mark(mfm_mark));
        }
        else {
            pos = self.put(pos, DirectWord::Mark(fm_mark));
        }
        self.crc.update(mark_byte);
        pos
    }

    fn put_crc(&mut self, mut pos: usize) -> usize {
        for byte in self.crc.bytes() {
            pos = self.put(pos, DirectWord::Byte(byte));
        }
        pos
    }

    /// Fill the track with gap bytes and write the track prologue. An ISO track has no gap 0,
    /// sync or index address mark. Returns the word position following the prologue.
    pub fn prepare_pretrack(&mut self, iso: bool) -> usize {
        let mfm = self.mfm();
        let fill = gap_fill(mfm);

        self.preceding = 0;
        self.put_run(0, fill, self.words);

        let mut pos = 0;
        if !iso {
            pos = self.put_run(pos, fill, by_encoding(mfm, GAP0_LEN));
            pos = self.put_run(pos, 0x00, by_encoding(mfm, SYNC_LEN));
            if mfm {
                for _ in 0..3 {
                    pos = self.put(pos, DirectWord::Mark(MFM_INDEX_SYNC));
                }
                pos = self.put(pos, DirectWord::Mark(MFM_IAM));
            }
            else {
                pos = self.put(pos, DirectWord::Mark(FM_IAM));
            }
        }
        self.put_run(pos, fill, by_encoding(mfm, GAP1_LEN))
    }

    /// Write one sector starting at word `pos` and return the position following its gap 3.
    ///
    /// If `bad_crc` is set, the data CRC is inverted so that reading the sector reports a CRC
    /// error.
    pub fn prepare_sector(
        &mut self,
        pos: usize,
        id: SectorId,
        data: &[u8],
        gap2: usize,
        gap3: usize,
        deleted: bool,
        bad_crc: bool,
    ) -> usize {
        let fill = gap_fill(self.mfm());

        let mut pos = self.put_address_mark(pos % self.words, MFM_IDAM, FM_IDAM, 0xFE);
        for byte in id.to_bytes() {
            pos = self.put_crc_byte(pos, byte);
        }
        pos = self.put_crc(pos);
        pos = self.put_run(pos, fill, gap2);

        pos = match deleted {
            true => self.put_address_mark(pos, MFM_DDAM, FM_DDAM, 0xF8),
            false => self.put_address_mark(pos, MFM_DAM, FM_DAM, 0xFB),
        };
        for &byte in data {
            pos = self.put_crc_byte(pos, byte);
        }
        if bad_crc {
            self.crc.invert();
        }
        pos = self.put_crc(pos);
        self.put_run(pos, fill, gap3)
    }
}
