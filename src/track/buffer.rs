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

    src/track/buffer.rs

    A single track's bitcell data and surface description.
*/

//! A [TrackBuffer] holds the encoded bitcells of one track side, as 16-bit words in the storage
//! order of the image file, along with an optional parallel surface description.
//!
//! Surface and data bits combine to describe each bitcell:
//!
//! | surface | data | meaning                                   |
//! |---------|------|-------------------------------------------|
//! | 0       | 0/1  | a regular bit                             |
//! | 1       | 1    | a fuzzy bit, read randomly each revolution |
//! | 1       | 0    | a hole, unmagnetized media that reads 0   |
//!
//! Bits are addressed MSB first within the logical word: track position `p` is bit
//! `15 - (p & 15)` of word `p >> 4`.

use crate::codec::encode_byte;
use crate::types::DataEncoding;

/// Describes how the words of a buffer map to logical bitcell order, and whether a surface
/// description is present. Derived from the disk flags of the mounted image.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BitLayout {
    pub reverse_endian: bool,
    pub has_surface: bool,
}

impl BitLayout {
    pub fn new(reverse_endian: bool, has_surface: bool) -> Self {
        Self {
            reverse_endian,
            has_surface,
        }
    }

    /// Convert a stored word into logical bit order.
    #[inline]
    pub fn to_logical(&self, stored: u16) -> u16 {
        if self.reverse_endian {
            stored
        }
        else {
            stored.swap_bytes()
        }
    }

    /// Convert a logical word into the storage order of the image.
    #[inline]
    pub fn to_storage(&self, logical: u16) -> u16 {
        // Byte swapping is its own inverse.
        self.to_logical(logical)
    }
}

/// The decoded state of one bitcell.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BitCell {
    Clear,
    Set,
    Fuzzy,
    Hole,
}

/// A word to be written directly into a track buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DirectWord {
    /// A byte, encoded with the normal clock rules of the track's encoding.
    Byte(u8),
    /// A pre-encoded logical cell word, such as an address mark.
    Mark(u16),
}

#[derive(Clone, Debug, Default)]
pub struct TrackBuffer {
    data: Vec<u16>,
    surface: Vec<u16>,
}

impl TrackBuffer {
    /// Create a zeroed buffer of `words` words.
    pub fn new(words: usize) -> Self {
        Self {
            data: vec![0; words],
            surface: vec![0; words],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Resize the buffer to exactly `words` words. New words are zeroed.
    pub fn resize(&mut self, words: usize) {
        self.data.resize(words, 0);
        self.surface.resize(words, 0);
    }

    /// Grow the buffer to at least `words` words.
    pub fn ensure_len(&mut self, words: usize) {
        if self.data.len() < words {
            self.resize(words);
        }
    }

    /// Zero both data and surface words, keeping the length.
    pub fn clear(&mut self) {
        self.data.fill(0);
        self.surface.fill(0);
    }

    pub fn data(&self) -> &[u16] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u16] {
        &mut self.data
    }

    pub fn surface(&self) -> &[u16] {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut [u16] {
        &mut self.surface
    }

    /// Replace the data words, resizing the surface to match.
    pub fn set_data(&mut self, data: Vec<u16>) {
        let len = data.len();
        self.data = data;
        self.surface.resize(len, 0);
    }

    /// Replace the surface words. The surface is truncated or zero-extended to the data length.
    pub fn set_surface(&mut self, mut surface: Vec<u16>) {
        surface.resize(self.data.len(), 0);
        self.surface = surface;
    }

    #[inline]
    fn locate(pos: u32) -> (usize, u32) {
        ((pos >> 4) as usize, 15 - (pos & 15))
    }

    /// Return the state of the bitcell at track position `pos`.
    /// Positions past the end of the buffer read as clear.
    pub fn cell(&self, pos: u32, layout: BitLayout) -> BitCell {
        let (word, bit) = Self::locate(pos);
        let Some(&stored) = self.data.get(word) else {
            return BitCell::Clear;
        };

        let data = (layout.to_logical(stored) >> bit) & 1;
        let surface = if layout.has_surface {
            self.surface
                .get(word)
                .map_or(0, |&s| (layout.to_logical(s) >> bit) & 1)
        }
        else {
            0
        };

        match (surface, data) {
            (0, 0) => BitCell::Clear,
            (0, _) => BitCell::Set,
            (_, 0) => BitCell::Hole,
            _ => BitCell::Fuzzy,
        }
    }

    /// Read the bit at `pos`. A fuzzy bit is resolved with `random`, which is only consulted for
    /// fuzzy bits.
    pub fn get_bit(&self, pos: u32, layout: BitLayout, random: impl FnOnce() -> bool) -> bool {
        debug_assert!(
            (pos as usize) < self.data.len() * 16,
            "bit {} is outside a track of {} words",
            pos,
            self.data.len()
        );
        match self.cell(pos, layout) {
            BitCell::Set => true,
            BitCell::Fuzzy => random(),
            BitCell::Clear | BitCell::Hole => false,
        }
    }

    /// Write `bit` at `pos` and return the bit the head will now read there.
    ///
    /// Writing a fuzzy bit pins it to the written value. A hole can't be magnetized: it is left
    /// untouched and reads as 0. Positions past the end of the buffer are ignored in release
    /// builds.
    pub fn put_bit(&mut self, pos: u32, bit: bool, layout: BitLayout) -> bool {
        let (word, shift) = Self::locate(pos);
        debug_assert!(
            word < self.data.len(),
            "bit {} is outside a track of {} words",
            pos,
            self.data.len()
        );
        if word >= self.data.len() {
            return false;
        }
        let mask = 1u16 << shift;

        let mut data = layout.to_logical(self.data[word]);
        if layout.has_surface {
            let mut surface = layout.to_logical(self.surface[word]);
            if surface & mask != 0 {
                if data & mask == 0 {
                    return false;
                }
                surface &= !mask;
                self.surface[word] = layout.to_storage(surface);
            }
        }

        if bit {
            data |= mask;
        }
        else {
            data &= !mask;
        }
        self.data[word] = layout.to_storage(data);
        bit
    }

    /// Write a whole word at word index `index` and return the logical word as it now reads.
    ///
    /// A [DirectWord::Byte] is encoded using `preceding`, the last data bit written, which is then
    /// updated from the new word. Hole bits are preserved and fuzzy bits under the word become
    /// regular.
    pub fn write_word(
        &mut self,
        index: usize,
        word: DirectWord,
        preceding: &mut u8,
        encoding: DataEncoding,
        layout: BitLayout,
    ) -> u16 {
        let logical = match word {
            DirectWord::Byte(byte) => encode_byte(encoding, false, byte, *preceding),
            DirectWord::Mark(mark) => mark,
        };
        *preceding = (logical & 1) as u8;

        let Some(slot) = self.data.get_mut(index) else {
            return logical;
        };

        let mut stored = layout.to_storage(logical);
        if layout.has_surface {
            let surface = self.surface[index];
            let holes = surface & !*slot;
            stored &= !holes;
            self.surface[index] = surface & !(surface & *slot);
        }
        *slot = stored;
        layout.to_logical(stored)
    }
}
