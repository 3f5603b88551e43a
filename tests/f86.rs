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

    tests/f86.rs

    Loading, writeback and compression of 86F images.
*/
mod common;

use std::io::{Cursor, Write};

use common::*;
use f86engine::{
    file_parsers::f86::F86_HEADER_SIZE,
    F86Drive,
    F86Error,
    F86Image,
    ImageHandler,
    LoadOptions,
    SectorId,
    SectorSelect,
    SideFlags,
    TrackStore,
    F86_VERSION,
};

const REVOLUTION: usize = 100_000;

fn load(image: Vec<u8>) -> Result<F86Image, F86Error> {
    F86Image::load(Cursor::new(image), false, &LoadOptions::default())
}

fn with_header(mut image: Vec<u8>, magic: u32, version: u16, flags: u16) -> Vec<u8> {
    image[0..4].copy_from_slice(&magic.to_le_bytes());
    image[4..6].copy_from_slice(&version.to_le_bytes());
    image[6..8].copy_from_slice(&flags.to_le_bytes());
    image
}

#[test]
fn loads_standard_image() {
    init();
    let image = load(standard_image()).unwrap();

    assert_eq!(image.version(), F86_VERSION);
    assert_eq!(image.disk_flags().sides(), 1);
    assert_eq!(image.side_flags(0), SideFlags(SIDE_MFM_250));
    assert_eq!(image.index_hole_pos(0), 0);
    assert!(image.is_native());
    assert!(!image.is_compressed());
    assert!(!image.write_protected());
    assert_eq!(image.track_offsets().len(), 256);
    assert_eq!(image.track_offsets()[0] as u64, F86_HEADER_SIZE + 1024);
    assert!(image.track_offsets()[1..].iter().all(|&o| o == 0));
}

#[test]
fn detects_both_magics() {
    init();
    let plain = standard_image();
    assert!(F86Image::detect(Cursor::new(plain.clone())));
    assert!(F86Image::detect(Cursor::new(compress_image(&plain))));
    assert!(!F86Image::detect(Cursor::new(vec![0u8; 64])));
}

#[test]
fn rejects_bad_headers() {
    init();
    let base = standard_image();

    let result = load(with_header(base.clone(), 0x12345678, F86_VERSION, DISK_DD_SS));
    assert!(matches!(result, Err(F86Error::UnknownMagic(0x12345678))));

    let result = load(with_header(base.clone(), F86_MAGIC, 0x0063, DISK_DD_SS));
    assert!(matches!(result, Err(F86Error::InternalVersion)));

    let result = load(with_header(base.clone(), F86_MAGIC, 0x0200, DISK_DD_SS));
    assert!(matches!(result, Err(F86Error::ObsoleteVersion(0x0200))));

    let result = load(with_header(base.clone(), F86_MAGIC, 0x0300, DISK_DD_SS));
    assert!(matches!(result, Err(F86Error::UnsupportedVersion(0x0300))));

    let result = load(with_header(base.clone(), F86_MAGIC, F86_VERSION, 0x0100));
    assert!(matches!(result, Err(F86Error::ZonedImage)));

    let result = load(with_header(base, F86_MAGIC, F86_VERSION, 0x0200));
    assert!(matches!(result, Err(F86Error::InvalidZoneType(0x0200))));
}

#[test]
fn rejects_short_and_inconsistent_images() {
    init();
    assert!(matches!(load(vec![0u8; 10]), Err(F86Error::ImageTooSmall(10))));

    let header_only = standard_image()[..64].to_vec();
    assert!(matches!(load(header_only), Err(F86Error::ImageTooSmall(64))));

    let mut bad_offset = standard_image();
    bad_offset[8..12].copy_from_slice(&0x7FFF_FFFFu32.to_le_bytes());
    assert!(matches!(load(bad_offset), Err(F86Error::FormatParseError(_))));
}

#[test]
fn requires_track_zero_on_every_side() {
    init();
    let track = build_track(DISK_DD_DS, SIDE_MFM_250, &standard_sectors(0, 0, 9, 2));
    let image = build_image(DISK_DD_DS, F86_VERSION, &[TestTrack::new(0, SIDE_MFM_250, &track)]);
    assert!(matches!(load(image), Err(F86Error::MissingTrackZero(1))));

    let image = build_image(DISK_DD_DS, F86_VERSION, &[TestTrack::new(1, SIDE_MFM_250, &track)]);
    assert!(matches!(load(image), Err(F86Error::MissingTrackZero(0))));
}

#[test]
fn writeback_updates_track_in_place() {
    init();
    let mut image = load(standard_image()).unwrap();
    let mut tracks = TrackStore::new();
    image.seek(&mut tracks, 0, false).unwrap();

    poke_byte(tracks.side_mut(0), DISK_DD_SS, 3000, 0x12);
    image.writeback(&mut tracks, false).unwrap();

    let mut expected = build_track(DISK_DD_SS, SIDE_MFM_250, &standard_sectors(0, 0, 9, 2));
    poke_byte(&mut expected, DISK_DD_SS, 3000, 0x12);
    let expected = build_image(DISK_DD_SS, F86_VERSION, &[TestTrack::new(0, SIDE_MFM_250, &expected)]);

    let written = image.read_image().unwrap();
    assert_eq!(written.len(), expected.len());
    assert_eq!(compute_slice_hash(&written), compute_slice_hash(&expected));
}

#[test]
fn write_protected_image_is_never_written() {
    init();
    let original = standard_image();
    let options = LoadOptions::default().with_write_protect(true);
    let mut image = F86Image::load(Cursor::new(original.clone()), false, &options).unwrap();
    assert!(image.write_protected());

    let mut tracks = TrackStore::new();
    image.seek(&mut tracks, 0, false).unwrap();
    poke_byte(tracks.side_mut(0), DISK_DD_SS, 3000, 0x12);
    image.writeback(&mut tracks, false).unwrap();

    assert_eq!(image.read_image().unwrap(), original);
}

#[test]
fn write_protect_flag_in_header() {
    init();
    let image = with_header(standard_image(), F86_MAGIC, F86_VERSION, DISK_DD_SS | 0x0010);
    assert!(load(image).unwrap().write_protected());
}

#[test]
fn compressed_image_round_trips() {
    init();
    let original = standard_image();
    let mut image = F86Image::load(
        Cursor::new(compress_image(&original)),
        false,
        &LoadOptions::default().with_temp_dir(std::env::temp_dir()),
    )
    .unwrap();
    assert!(image.is_compressed());
    assert_eq!(image.track_offsets()[0] as u64, F86_HEADER_SIZE + 1024);

    let mut tracks = TrackStore::new();
    image.seek(&mut tracks, 0, false).unwrap();
    let expected_track = build_track(DISK_DD_SS, SIDE_MFM_250, &standard_sectors(0, 0, 9, 2));
    assert_eq!(&tracks.side(0).data()[..12500], expected_track.data());

    poke_byte(tracks.side_mut(0), DISK_DD_SS, 4000, 0x34);
    image.writeback(&mut tracks, false).unwrap();

    let stored = image.read_image().unwrap();
    assert_eq!(&stored[0..4], &F86_MAGIC_LZF.to_le_bytes());
    assert!(stored.len() < original.len());

    let mut expected = expected_track.clone();
    poke_byte(&mut expected, DISK_DD_SS, 4000, 0x34);
    let expected = build_image(DISK_DD_SS, F86_VERSION, &[TestTrack::new(0, SIDE_MFM_250, &expected)]);
    assert_eq!(expand_image(&stored), expected);
}

#[test]
fn decompression_is_bounded() {
    init();
    let compressed = compress_image(&standard_image());
    let options = LoadOptions::default().with_max_decompressed_len(4096);
    let result = F86Image::load(Cursor::new(compressed), false, &options);
    assert!(matches!(result, Err(F86Error::CompressionError(_))));
}

#[test]
fn absent_tracks_read_unformatted() {
    init();
    let mut image = load(standard_image()).unwrap();
    let mut tracks = TrackStore::new();
    image.seek(&mut tracks, 7, false).unwrap();

    assert_eq!(image.side_flags(0), SideFlags(SIDE_MFM_250));
    assert_eq!(image.index_hole_pos(0), 0);
    assert!(tracks.side(0).data().iter().all(|&w| w == 0));
}

#[test]
fn formatting_allocates_new_tracks() {
    init();
    let original = standard_image();
    let mut image = load(original.clone()).unwrap();
    let mut tracks = TrackStore::new();
    image.seek(&mut tracks, 2, false).unwrap();

    image
        .prepare_format(&mut tracks, 0, SideFlags(SIDE_MFM_250), false)
        .unwrap();
    assert_eq!(image.track_offsets()[2] as usize, original.len());

    image.writeback(&mut tracks, false).unwrap();
    let written = image.read_image().unwrap();
    assert_eq!(written.len(), original.len() + 6 + 12500 * 2);
    assert_eq!(&written[8 + 8..8 + 12], &(original.len() as u32).to_le_bytes());

    // Allocation happens once.
    image
        .prepare_format(&mut tracks, 0, SideFlags(SIDE_MFM_250), false)
        .unwrap();
    assert_eq!(image.track_offsets()[2] as usize, original.len());
}

#[test]
fn formatting_past_the_last_track_fails() {
    init();
    let mut image = load(standard_image()).unwrap();
    let mut tracks = TrackStore::new();
    image.seek(&mut tracks, 255, false).unwrap();

    let result = image.prepare_format(&mut tracks, 0, SideFlags(SIDE_MFM_250), true);
    assert!(matches!(result, Err(F86Error::TrackOutOfRange(255))));
    assert!(image
        .prepare_format(&mut tracks, 0, SideFlags(SIDE_MFM_250), false)
        .is_ok());
}

#[test]
fn reverse_endian_and_bitcell_mode_images_read() {
    init();
    let platform = MockPlatform::default();

    for disk_flags in [DISK_DD_SS | 0x0800, DISK_DD_SS | 0x0080] {
        let track = build_track(disk_flags, SIDE_MFM_250, &standard_sectors(0, 0, 9, 2));
        let mut record = TestTrack::new(0, SIDE_MFM_250, &track);
        if disk_flags & 0x0080 != 0 {
            record.extra_bit_cells = -16;
        }
        let image = build_image(disk_flags, F86_VERSION, &[record]);

        let mut fdc = MockFdc::new(true);
        let mut drive = F86Drive::new(0);
        drive.insert(Box::new(load(image).unwrap()));
        drive.seek(&mut fdc, &platform, 0).unwrap();

        drive.readsector(&mut fdc, &platform, SectorSelect::Number(8), 0, 0, 2, 2);
        run_until_idle(&mut drive, &mut fdc, &platform, 3 * REVOLUTION);
        assert_eq!(fdc.sink, pattern(8, 512), "disk flags {:04X}", disk_flags);
    }
}

#[test]
fn facade_formats_and_persists_a_new_track() {
    init();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&standard_image()).unwrap();
    file.flush().unwrap();

    let platform = MockPlatform::default();
    let mut fdc = MockFdc::new(true);
    fdc.gap = GAP3 as u32;

    let mut drive = F86Drive::new(0);
    drive.load(file.path(), &LoadOptions::default()).unwrap();
    assert!(drive.handler().is_native());
    drive.seek(&mut fdc, &platform, 1).unwrap();

    for r in 1..=9 {
        fdc.supply(&[1, 0, r, 2]);
    }
    drive.format(&mut fdc, &platform, 0, 2, 0xF6);
    run_until_idle(&mut drive, &mut fdc, &platform, 3 * REVOLUTION);
    assert!(fdc.errors().is_empty(), "errors: {:?}", fdc.errors());
    drive.close();

    let mut reopened = F86Drive::new(1);
    reopened.load(file.path(), &LoadOptions::default()).unwrap();
    reopened.seek(&mut fdc, &platform, 1).unwrap();
    for r in [1, 4, 9] {
        fdc.clear();
        reopened.readsector(&mut fdc, &platform, SectorSelect::Number(r), 1, 0, 2, 2);
        run_until_idle(&mut reopened, &mut fdc, &platform, 3 * REVOLUTION);
        assert_eq!(fdc.sink, vec![0xF6; 512]);
        assert_eq!(reopened.engine().last_sector(), SectorId::new(1, 0, r, 2));
    }
}

#[test]
fn facade_writes_reach_the_file() {
    init();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&compress_image(&standard_image())).unwrap();
    file.flush().unwrap();

    let platform = MockPlatform::default();
    let mut fdc = MockFdc::new(true);
    let mut drive = F86Drive::new(0);
    drive.load(file.path(), &LoadOptions::default()).unwrap();
    drive.seek(&mut fdc, &platform, 0).unwrap();

    let data = pattern(0x5A, 512);
    fdc.supply(&data);
    drive.writesector(&mut fdc, &platform, SectorSelect::Number(2), 0, 0, 2, 2);
    run_until_idle(&mut drive, &mut fdc, &platform, 3 * REVOLUTION);
    drive.close();

    let mut reopened = F86Drive::new(0);
    reopened.load(file.path(), &LoadOptions::default()).unwrap();
    reopened.seek(&mut fdc, &platform, 0).unwrap();
    fdc.clear();
    reopened.readsector(&mut fdc, &platform, SectorSelect::Number(2), 0, 0, 2, 2);
    run_until_idle(&mut reopened, &mut fdc, &platform, 3 * REVOLUTION);
    assert_eq!(fdc.sink, data);
}
