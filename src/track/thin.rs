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

    src/track/thin.rs

    Merge two thin tracks into a thick track and split them again.
*/

//! A drive that does not double step reads 40-track media with a head wide enough to cover two
//! adjacent 80-track positions. Such a "thick" track is constructed from both "thin" tracks on
//! seek and decomposed back into them on writeback.
//!
//! When merging bits that differ:
//!  - Regular bits are OR'd together.
//!  - A fuzzy bit in either half makes the merged bit fuzzy.
//!  - A hole in either half, with no fuzzy bit, makes the merged bit a hole.
//!
//! Without a surface description the merge is a plain OR.
//!
//! The masks are bitwise and apply equally to either storage byte order.

use crate::track::buffer::TrackBuffer;

/// Merge `thin[0]` and `thin[1]` into `dst` over the first `len` words.
pub fn construct(dst: &mut TrackBuffer, thin: &[TrackBuffer; 2], has_surface: bool, len: usize) {
    dst.ensure_len(len);
    let len = len.min(thin[0].len()).min(thin[1].len());

    let (d1, s1) = (thin[0].data(), thin[0].surface());
    let (d2, s2) = (thin[1].data(), thin[1].surface());

    for i in 0..len {
        if has_surface {
            let fuzzy = (d1[i] & s1[i]) | (d2[i] & s2[i]);
            // Clear where the half has a hole.
            let not_hole1 = d1[i] | !s1[i];
            let not_hole2 = d2[i] | !s2[i];
            let any_hole = !(not_hole1 & not_hole2);
            let neither = !(fuzzy | any_hole);

            dst.surface_mut()[i] = !neither;
            dst.data_mut()[i] = ((d1[i] | d2[i]) & neither) | fuzzy;
        }
        else {
            dst.data_mut()[i] = d1[i] | d2[i];
            dst.surface_mut()[i] = 0;
        }
    }
}

/// Split `src` back into `thin[0]` and `thin[1]` over the first `len` words.
///
/// Each half keeps the holes it had when it was loaded. Every other bit takes the merged data,
/// and merged fuzzy bits stay fuzzy.
pub fn decompose(src: &TrackBuffer, thin: &mut [TrackBuffer; 2], has_surface: bool, len: usize) {
    let len = len.min(src.len());
    let (dst, dst_s) = (src.data(), src.surface());

    for half in thin.iter_mut() {
        half.ensure_len(len);
        for i in 0..len {
            if has_surface {
                let hole = !half.data()[i] & half.surface()[i];
                let fuzzy = dst[i] & dst_s[i];
                half.data_mut()[i] = dst[i] & !hole;
                half.surface_mut()[i] = hole | (fuzzy & !hole);
            }
            else {
                half.data_mut()[i] = dst[i];
                half.surface_mut()[i] = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::buffer::{BitCell, BitLayout};

    fn buffer(data: u16, surface: u16) -> TrackBuffer {
        let mut buf = TrackBuffer::new(1);
        buf.data_mut()[0] = data;
        buf.surface_mut()[0] = surface;
        buf
    }

    #[test]
    fn plain_merge_is_or() {
        let thin = [buffer(0x1200, 0), buffer(0x0034, 0)];
        let mut dst = TrackBuffer::new(1);
        construct(&mut dst, &thin, false, 1);
        assert_eq!(dst.data()[0], 0x1234);
        assert_eq!(dst.surface()[0], 0);
    }

    #[test]
    fn plain_round_trip_is_stable() {
        let mut thin = [buffer(0x1200, 0), buffer(0x0034, 0)];
        let mut dst = TrackBuffer::new(1);
        construct(&mut dst, &thin, false, 1);
        decompose(&dst, &mut thin, false, 1);
        assert_eq!(thin[0].data()[0], 0x1234);
        assert_eq!(thin[1].data()[0], 0x1234);

        let mut again = TrackBuffer::new(1);
        construct(&mut again, &thin, false, 1);
        assert_eq!(again.data(), dst.data());
    }

    #[test]
    fn surface_merge() {
        let layout = BitLayout::new(true, true);
        // Bit 15: fuzzy in half 1. Bit 14: hole in both. Bit 13: hole in half 2 only.
        // Bit 12: set in half 2 only.
        let thin = [buffer(0x8000, 0xC000), buffer(0x1000, 0x6000)];
        let mut dst = TrackBuffer::new(1);
        construct(&mut dst, &thin, true, 1);

        assert_eq!(dst.cell(0, layout), BitCell::Fuzzy);
        assert_eq!(dst.cell(1, layout), BitCell::Hole);
        assert_eq!(dst.cell(2, layout), BitCell::Hole);
        assert_eq!(dst.cell(3, layout), BitCell::Set);
        assert_eq!(dst.cell(4, layout), BitCell::Clear);
    }

    #[test]
    fn surface_split_keeps_holes_per_half() {
        let layout = BitLayout::new(true, true);
        // Half 1 has a hole at bit 15, half 2 has a hole at bit 14.
        let mut thin = [buffer(0x0000, 0x8000), buffer(0x0000, 0x4000)];
        // Merged track written as all ones, with bit 13 fuzzy.
        let src = buffer(0xFFFF, 0x2000);
        decompose(&src, &mut thin, true, 1);

        assert_eq!(thin[0].cell(0, layout), BitCell::Hole);
        assert_eq!(thin[0].cell(1, layout), BitCell::Set);
        assert_eq!(thin[1].cell(0, layout), BitCell::Set);
        assert_eq!(thin[1].cell(1, layout), BitCell::Hole);
        assert_eq!(thin[0].cell(2, layout), BitCell::Fuzzy);
        assert_eq!(thin[1].cell(2, layout), BitCell::Fuzzy);
        assert_eq!(thin[1].cell(3, layout), BitCell::Set);
    }
}
