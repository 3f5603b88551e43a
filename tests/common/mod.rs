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

    tests/common/mod.rs

    Common support routines for tests
*/
#![allow(dead_code)]

use std::collections::VecDeque;

use f86engine::{
    track::{
        buffer::{BitLayout, TrackBuffer},
        builder::TrackBuilder,
        geometry,
    },
    types::DataEncoding,
    CompareCondition,
    DmaData,
    DmaOverrun,
    DriveFlags,
    DrivePlatform,
    F86Drive,
    FdcError,
    FloppyController,
    ReadTrackErrors,
    SectorId,
    SideFlags,
    F86_VERSION,
};

use hex::encode;
use sha1::{Digest, Sha1};

pub const F86_MAGIC: u32 = 0x4642_3638;
pub const F86_MAGIC_LZF: u32 = 0x6662_3638;

/// Single-sided, double density, no surface data.
pub const DISK_DD_SS: u16 = 0x0000;
/// Double-sided, double density, no surface data.
pub const DISK_DD_DS: u16 = 0x0008;
/// MFM at 250kbps, 300RPM.
pub const SIDE_MFM_250: u16 = 0x000A;
/// FM at 250kbps, 300RPM.
pub const SIDE_FM_250: u16 = 0x0002;

pub const GAP2: usize = 22;
pub const GAP3: usize = 84;

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn compute_slice_hash(slice: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(slice);
    let result = hasher.finalize();

    encode(result)
}

/// Everything the floppy controller was told by the engine.
#[derive(Clone, Debug, PartialEq)]
pub enum FdcEvent {
    SectorFinishRead,
    TrackFinishRead(ReadTrackErrors),
    FinishRead,
    SectorFinishCompare(bool),
    SectorId(SectorId),
    Error(FdcError),
    WrongAm,
    RequestSectorId,
    StopIdRequest,
}

/// A floppy controller that serves DMA bytes from a queue and records everything it receives.
pub struct MockFdc {
    pub rate: u8,
    pub mfm: bool,
    pub dtl: u32,
    pub gap: u32,
    pub gap2: u32,
    pub format_sectors: u8,
    pub format_n: u8,
    pub condition: CompareCondition,
    pub deleted: bool,
    pub verify: bool,
    pub sk: bool,
    pub read_track_sector: SectorId,
    /// Bytes supplied through get_data.
    pub source: VecDeque<u8>,
    /// Bytes received through data.
    pub sink: Vec<u8>,
    /// Once this many bytes have been transferred in either direction, the DMA overruns.
    pub overrun_after: Option<usize>,
    supplied: usize,
    pub events: Vec<FdcEvent>,
}

impl MockFdc {
    pub fn new(mfm: bool) -> Self {
        Self {
            rate: 2,
            mfm,
            dtl: 0xFF,
            gap: 0x1B,
            gap2: GAP2 as u32,
            format_sectors: 9,
            format_n: 2,
            condition: CompareCondition::Equal,
            deleted: false,
            verify: false,
            sk: false,
            read_track_sector: SectorId::default(),
            source: VecDeque::new(),
            sink: Vec::new(),
            overrun_after: None,
            supplied: 0,
            events: Vec::new(),
        }
    }

    pub fn supply(&mut self, bytes: &[u8]) {
        self.source.extend(bytes.iter().copied());
    }

    pub fn errors(&self) -> Vec<FdcError> {
        self.events
            .iter()
            .filter_map(|e| match e {
                FdcEvent::Error(err) => Some(*err),
                _ => None,
            })
            .collect()
    }

    pub fn has(&self, event: &FdcEvent) -> bool {
        self.events.contains(event)
    }

    pub fn clear(&mut self) {
        self.sink.clear();
        self.source.clear();
        self.supplied = 0;
        self.events.clear();
    }
}

impl FloppyController for MockFdc {
    fn bit_rate(&self) -> u8 {
        self.rate
    }

    fn bitcell_period(&self) -> u32 {
        geometry::bitcell_period(SideFlags::new(self.rate, self.mfm, false), 300)
    }

    fn is_mfm(&self) -> bool {
        self.mfm
    }

    fn dtl(&self) -> u32 {
        self.dtl
    }

    fn gap(&self) -> u32 {
        self.gap
    }

    fn gap2(&self, _drive: usize) -> u32 {
        self.gap2
    }

    fn format_sectors(&self) -> u8 {
        self.format_sectors
    }

    fn format_n(&self) -> u8 {
        self.format_n
    }

    fn compare_condition(&self) -> CompareCondition {
        self.condition
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn is_verify(&self) -> bool {
        self.verify
    }

    fn is_sk(&self) -> bool {
        self.sk
    }

    fn read_track_sector(&self) -> SectorId {
        self.read_track_sector
    }

    fn get_data(&mut self, _last: bool) -> DmaData {
        let Some(byte) = self.source.pop_front() else {
            return DmaData::Unavailable;
        };
        self.supplied += 1;
        match self.overrun_after {
            Some(limit) if self.supplied > limit => DmaData::Overrun(byte),
            _ => DmaData::Byte(byte),
        }
    }

    fn data(&mut self, byte: u8) -> Result<(), DmaOverrun> {
        if self.overrun_after.is_some_and(|limit| self.sink.len() >= limit) {
            return Err(DmaOverrun);
        }
        self.sink.push(byte);
        Ok(())
    }

    fn sector_finish_read(&mut self) {
        self.events.push(FdcEvent::SectorFinishRead);
    }

    fn track_finish_read(&mut self, errors: ReadTrackErrors) {
        self.events.push(FdcEvent::TrackFinishRead(errors));
    }

    fn finish_read(&mut self) {
        self.events.push(FdcEvent::FinishRead);
    }

    fn sector_finish_compare(&mut self, matched: bool) {
        self.events.push(FdcEvent::SectorFinishCompare(matched));
    }

    fn sector_id(&mut self, id: SectorId) {
        self.events.push(FdcEvent::SectorId(id));
    }

    fn error(&mut self, error: FdcError) {
        self.events.push(FdcEvent::Error(error));
    }

    fn set_wrong_am(&mut self) {
        self.events.push(FdcEvent::WrongAm);
    }

    fn request_next_sector_id(&mut self) {
        self.events.push(FdcEvent::RequestSectorId);
    }

    fn stop_id_request(&mut self) {
        self.events.push(FdcEvent::StopIdRequest);
    }
}

/// A 3.5" dual density drive spinning at 300RPM.
pub struct MockPlatform {
    pub head: usize,
    pub flags: DriveFlags,
    pub rpm: u16,
    pub densel: bool,
    pub double_step: bool,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self {
            head: 0,
            flags: DriveFlags::RPM_300 | DriveFlags::DOUBLE_SIDED | DriveFlags::HOLE0 | DriveFlags::HOLE1,
            rpm: 300,
            densel: false,
            double_step: true,
        }
    }
}

impl DrivePlatform for MockPlatform {
    fn head(&self, _drive: usize) -> usize {
        self.head
    }

    fn flags(&self, _drive: usize) -> DriveFlags {
        self.flags
    }

    fn rpm(&self, _drive: usize) -> u16 {
        self.rpm
    }

    fn densel(&self, _drive: usize) -> bool {
        self.densel
    }

    fn can_read_medium(&self, _drive: usize) -> bool {
        true
    }

    fn double_step_40(&self, _drive: usize) -> bool {
        self.double_step
    }
}

/// Poll `drive` until it returns to idle, for at most `limit` bitcells. Returns the number of
/// polls taken.
pub fn run_until_idle(drive: &mut F86Drive, fdc: &mut MockFdc, platform: &MockPlatform, limit: usize) -> usize {
    for i in 0..limit {
        if drive.state().is_idle() {
            return i;
        }
        drive.poll(fdc, platform);
    }
    panic!("Drive did not return to idle within {} bitcells", limit);
}

/// Sector data that differs for every sector.
pub fn pattern(r: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(7).wrapping_add(r)).collect()
}

/// One sector to place on a test track.
#[derive(Clone, Debug)]
pub struct TestSector {
    pub id: SectorId,
    pub data: Vec<u8>,
    pub deleted: bool,
    pub bad_crc: bool,
}

impl TestSector {
    pub fn new(id: SectorId) -> Self {
        Self {
            id,
            data: pattern(id.r, id.size()),
            deleted: false,
            bad_crc: false,
        }
    }
}

/// `count` sectors of size code `n` numbered from 1.
pub fn standard_sectors(c: u8, h: u8, count: u8, n: u8) -> Vec<TestSector> {
    (1..=count).map(|r| TestSector::new(SectorId::new(c, h, r, n))).collect()
}

/// Render `sectors` into a track buffer sized for a disk with `disk_flags`.
pub fn build_track(disk_flags: u16, side_flags: u16, sectors: &[TestSector]) -> TrackBuffer {
    let flags = f86engine::DiskFlags::from_bits_retain(disk_flags);
    let layout = BitLayout::new(flags.reverse_endian(), flags.has_surface_desc());
    let side_flags = SideFlags(side_flags);

    let mut buf = TrackBuffer::new(geometry::array_words(flags.hole_class(), flags.rpm_mode(), 0));
    let raw = geometry::raw_size(side_flags, flags.rpm_mode(), 0);
    let mut builder = TrackBuilder::new(&mut buf, layout, side_flags.is_mfm(), raw);

    let mut pos = builder.prepare_pretrack(false);
    for sector in sectors {
        pos = builder.prepare_sector(
            pos,
            sector.id,
            &sector.data,
            GAP2,
            GAP3,
            sector.deleted,
            sector.bad_crc,
        );
    }
    buf
}

/// Overwrite the word at `index` of `buf` with `byte`.
pub fn poke_byte(buf: &mut TrackBuffer, disk_flags: u16, index: usize, byte: u8) {
    let flags = f86engine::DiskFlags::from_bits_retain(disk_flags);
    let layout = BitLayout::new(flags.reverse_endian(), flags.has_surface_desc());
    let mut preceding = 0;
    buf.write_word(
        index,
        f86engine::track::buffer::DirectWord::Byte(byte),
        &mut preceding,
        DataEncoding::Mfm,
        layout,
    );
}

/// A track record of a test image.
pub struct TestTrack<'a> {
    /// Index into the track offset table.
    pub entry: usize,
    pub side_flags: u16,
    pub extra_bit_cells: i32,
    pub index_hole: u32,
    pub buf: &'a TrackBuffer,
}

impl<'a> TestTrack<'a> {
    pub fn new(entry: usize, side_flags: u16, buf: &'a TrackBuffer) -> Self {
        Self {
            entry,
            side_flags,
            extra_bit_cells: 0,
            index_hole: 0,
            buf,
        }
    }
}

/// Assemble an uncompressed 86F image.
pub fn build_image(disk_flags: u16, version: u16, tracks: &[TestTrack]) -> Vec<u8> {
    let flags = f86engine::DiskFlags::from_bits_retain(disk_flags);
    let table_len = 256 * flags.sides();

    let mut table = vec![0u32; table_len];
    let mut body = Vec::new();
    let mut offset = (8 + table_len * 4) as u32;

    for track in tracks {
        table[track.entry] = offset;

        let mut record = Vec::new();
        record.extend_from_slice(&track.side_flags.to_le_bytes());
        if flags.has_extra_bit_cells() {
            record.extend_from_slice(&track.extra_bit_cells.to_le_bytes());
        }
        record.extend_from_slice(&track.index_hole.to_le_bytes());

        let words = geometry::array_words(flags.hole_class(), flags.rpm_mode(), track.extra_bit_cells);
        if flags.has_surface_desc() {
            push_words(&mut record, track.buf.surface(), words);
        }
        push_words(&mut record, track.buf.data(), words);

        offset += record.len() as u32;
        body.extend_from_slice(&record);
    }

    let mut image = Vec::new();
    image.extend_from_slice(&F86_MAGIC.to_le_bytes());
    image.extend_from_slice(&version.to_le_bytes());
    image.extend_from_slice(&disk_flags.to_le_bytes());
    for entry in table {
        image.extend_from_slice(&entry.to_le_bytes());
    }
    image.extend_from_slice(&body);
    image
}

fn push_words(out: &mut Vec<u8>, words: &[u16], count: usize) {
    for i in 0..count {
        out.extend_from_slice(&words.get(i).copied().unwrap_or(0).to_le_bytes());
    }
}

/// A single-sided DD image with nine 512-byte sectors on track 0.
pub fn standard_image() -> Vec<u8> {
    let track = build_track(DISK_DD_SS, SIDE_MFM_250, &standard_sectors(0, 0, 9, 2));
    build_image(DISK_DD_SS, F86_VERSION, &[TestTrack::new(0, SIDE_MFM_250, &track)])
}

/// Compress an uncompressed image the way a compressed 86F file is stored.
pub fn compress_image(image: &[u8]) -> Vec<u8> {
    use f86engine::file_parsers::compression::lzf;

    let (header, body) = image.split_at(8);
    let mut out = Vec::new();
    out.extend_from_slice(&F86_MAGIC_LZF.to_le_bytes());
    out.extend_from_slice(&header[4..8]);
    out.extend_from_slice(&lzf::compress(body, lzf::compress_bound(body.len())).unwrap());
    out
}

/// Decompress a compressed 86F file back into an uncompressed image.
pub fn expand_image(image: &[u8]) -> Vec<u8> {
    use f86engine::file_parsers::compression::lzf;

    let (header, body) = image.split_at(8);
    let mut out = Vec::new();
    out.extend_from_slice(&F86_MAGIC.to_le_bytes());
    out.extend_from_slice(&header[4..8]);
    out.extend_from_slice(&lzf::decompress(body, 64 * 1024 * 1024).unwrap());
    out
}

/// The track record at offset table `entry` of an uncompressed image, through to the end of the
/// image.
pub fn track_record(image: &[u8], entry: usize) -> &[u8] {
    let offset = u32::from_le_bytes(image[8 + entry * 4..12 + entry * 4].try_into().unwrap()) as usize;
    &image[offset..]
}
