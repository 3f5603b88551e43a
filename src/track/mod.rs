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

    src/track/mod.rs

    Track buffer store for one drive.

*/
pub mod buffer;
pub mod builder;
pub mod geometry;
pub mod thin;

use crate::track::buffer::TrackBuffer;

/// The words allocated for each side before the first seek. Enough for a 2000kbps track with a
/// 2% slowdown.
pub const INITIAL_TRACK_WORDS: usize = 51000;

/// The bitcell buffers of one drive: the active track for each side, and the two thin tracks
/// per side used to build it on a drive that does not double step.
#[derive(Clone, Debug)]
pub struct TrackStore {
    sides: [TrackBuffer; 2],
    // Indexed by side, then thin track.
    thin: [[TrackBuffer; 2]; 2],
    /// The physical track the head is over, in 80-track units.
    pub cur_track: u16,
}

impl Default for TrackStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackStore {
    pub fn new() -> Self {
        Self {
            sides: [TrackBuffer::new(INITIAL_TRACK_WORDS), TrackBuffer::new(INITIAL_TRACK_WORDS)],
            thin: Default::default(),
            cur_track: 0,
        }
    }

    pub fn side(&self, side: usize) -> &TrackBuffer {
        &self.sides[side & 1]
    }

    pub fn side_mut(&mut self, side: usize) -> &mut TrackBuffer {
        &mut self.sides[side & 1]
    }

    /// Return the thin track buffer `thin` (0 or 1) of `side`.
    pub fn thin(&self, thin: usize, side: usize) -> &TrackBuffer {
        &self.thin[side & 1][thin & 1]
    }

    pub fn thin_mut(&mut self, thin: usize, side: usize) -> &mut TrackBuffer {
        &mut self.thin[side & 1][thin & 1]
    }

    /// Zero every buffer. With `thick` set the thin buffers are cleared as well.
    pub fn clear(&mut self, thick: bool) {
        for buf in self.sides.iter_mut() {
            buf.clear();
        }
        if thick {
            for buf in self.thin.iter_mut().flatten() {
                buf.clear();
            }
        }
    }

    /// Build the active track of `side` from its two thin tracks.
    pub fn construct(&mut self, side: usize, has_surface: bool) {
        let side = side & 1;
        let halves = &self.thin[side];
        let len = halves[0].len().max(halves[1].len());
        self.sides[side].resize(len);
        thin::construct(&mut self.sides[side], halves, has_surface, len);
    }

    /// Split the active track of `side` back into its two thin tracks.
    pub fn decompose(&mut self, side: usize, has_surface: bool) {
        let side = side & 1;
        let halves = &mut self.thin[side];
        let len = halves[0].len().max(halves[1].len());
        thin::decompose(&self.sides[side], halves, has_surface, len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct_sizes_active_track_to_thin_tracks() {
        let mut store = TrackStore::new();
        store.thin_mut(0, 1).set_data(vec![0x0F00; 8]);
        store.thin_mut(1, 1).set_data(vec![0x00F0; 8]);
        store.construct(1, false);
        assert_eq!(store.side(1).len(), 8);
        assert!(store.side(1).data().iter().all(|&w| w == 0x0FF0));

        store.side_mut(1).data_mut()[0] = 0xFFFF;
        store.decompose(1, false);
        assert_eq!(store.thin(0, 1).data()[0], 0xFFFF);
        assert_eq!(store.thin(1, 1).data()[0], 0xFFFF);
        assert_eq!(store.thin(1, 1).data()[1], 0x0FF0);
    }
}
