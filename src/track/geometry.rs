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

    src/track/geometry.rs

    Track length and timing calculations.
*/

//! Pure functions deriving track lengths and timing from disk, side and drive flags.

use crate::types::{DiskFlags, DriveFlags, SideFlags};

/// Nominal bitcell count of a 250kbps MFM track at 300RPM.
const BASE_TRACK_BITS: f64 = 100000.0;
/// Nominal bitcell period, in the controller's timing units, of a 250kbps MFM track at 300RPM.
const BASE_BITCELL_PERIOD: f64 = 8000.0;

/// Speed-up factor for the disk's RPM slowdown class.
pub fn rpm_diff(rpm_mode: u8) -> f64 {
    match rpm_mode {
        1 => 1.01,
        2 => 1.015,
        3 => 1.02,
        _ => 1.0,
    }
}

/// Return the effective track flags for a side.
///
/// 250kbps/300RPM and 300kbps/360RPM both describe a 1MB unformatted medium. They are treated
/// as equivalent and resolved to whichever suits the drive: 300kbps/360RPM on a single-RPM
/// 5.25" HD drive (type 6), 250kbps/300RPM on anything else.
pub fn track_flags(side_flags: SideFlags, drive_flags: DriveFlags) -> SideFlags {
    let rr = side_flags.bits() & 0x67;
    let rest = side_flags.bits() & !0x67;
    let rr = match rr {
        0x02 | 0x21 => {
            if drive_flags.drive_type() == 6 {
                0x21
            }
            else {
                0x02
            }
        }
        _ => rr,
    };
    SideFlags(rest | rr)
}

/// Return the number of bitcells in a track with the given effective track flags.
///
/// The nominal length is rounded down to a multiple of 16 before `extra_bit_cells` is added.
/// The result is never less than one word.
pub fn raw_size(track_flags: SideFlags, rpm_mode: u8, extra_bit_cells: i32) -> u32 {
    let mut rate = track_flags.rate_kbps();
    if !track_flags.is_mfm() {
        rate /= 2.0;
    }
    let size = (BASE_TRACK_BITS / 250.0) * rate;
    let size = (size * 300.0) / track_flags.rpm();
    let size = size * rpm_diff(rpm_mode);

    let rounded = ((size as u32) >> 4) << 4;
    (rounded as i64 + extra_bit_cells as i64).max(16) as u32
}

/// Return the number of words in an on-disk track array for the disk's hole class.
/// This is sized for the longest track the class can hold, independent of the side flags.
pub fn array_words(hole_class: u8, rpm_mode: u8, extra_bit_cells: i32) -> usize {
    let base: i64 = match (hole_class, rpm_mode) {
        (2, 1) => 25250,
        (2, 2) => 25375,
        (2, 3) => 25500,
        (2, _) => 25000,
        (3, 1) => 50500,
        (3, 2) => 50750,
        (3, 3) => 51000,
        (3, _) => 50000,
        (_, 1) => 12625,
        (_, 2) => 12687,
        (_, 3) => 12750,
        _ => 12500,
    };

    let mut words = ((base << 4) + extra_bit_cells as i64) >> 4;
    if extra_bit_cells & 15 != 0 {
        words += 1;
    }
    words.max(1) as usize
}

/// Return the bitcell period of a track as seen by a drive spinning at `drive_rpm`, in the units
/// returned by the controller's `bitcell_period`.
pub fn bitcell_period(track_flags: SideFlags, drive_rpm: u16) -> u32 {
    let mut rate = track_flags.rate_kbps();
    if !track_flags.is_mfm() {
        rate /= 2.0;
    }
    let size = (BASE_BITCELL_PERIOD * 250.0) / rate;
    let size = (size * 300.0) / track_flags.rpm();
    let size = (size * drive_rpm as f64) / 300.0;
    size as u32
}

/// Return the time taken to pass one byte under the head, in microseconds divided by 16.
pub fn byte_period(track_flags: SideFlags) -> f64 {
    match track_flags.bits() & 0x0F {
        0x02 => 4.0,
        0x01 => 20.0 / 6.0,
        0x0A | 0x00 => 2.0,
        0x09 => 10.0 / 6.0,
        0x08 => 1.0,
        0x0B => 0.5,
        0x0D => 0.25,
        _ => 2.0,
    }
}

/// Return true if the controller's data rate `rate` is usable with the disk's hole class.
pub fn valid_bit_rate(disk_flags: DiskFlags, rate: u8, drive_flags: DriveFlags) -> bool {
    match disk_flags.hole_class() {
        0 => (rate == 0 && drive_flags.contains(DriveFlags::HOLE0)) || (1..=2).contains(&rate),
        1 => rate == 0,
        2 => rate == 3,
        _ => rate >= 3,
    }
}

/// Return the media hole type: 0 for DD, 1 for HD, 2 for ED.
pub fn hole(disk_flags: DiskFlags) -> u8 {
    match disk_flags.hole_class() {
        3 => 2,
        class => class,
    }
}

/// Return true if the drive's density select line is wrong for the media type.
pub fn wrong_densel(disk_flags: DiskFlags, densel: bool, drive_flags: DriveFlags) -> bool {
    match hole(disk_flags) {
        1 => !densel && !drive_flags.is_three_mode(),
        2 => !densel,
        _ => densel,
    }
}

/// Return the side flags assumed for a track absent from the image.
pub fn default_side_flags(disk_flags: DiskFlags) -> SideFlags {
    match disk_flags.hole_class() {
        0 => SideFlags(0x0A),
        1 => SideFlags(0x00),
        _ => SideFlags(0x03),
    }
}

/// Return the number of data bytes a command transfers for size code `n`. A size code of 0 uses
/// the controller's data length `dtl` when that is below 128.
pub fn data_len(n: u8, dtl: u32) -> u32 {
    if n != 0 {
        crate::types::size_from_code(n) as u32
    }
    else if dtl < 128 {
        dtl
    }
    else {
        128
    }
}
