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

    src/file_parsers/f86.rs

    The native image handler for the 86f disk image format. (F is prepended due
    to inability to start identifiers with numbers in Rust.)

    86f images store each track side as a raw array of bitcells, optionally with
    a parallel surface description marking fuzzy bits and holes.

*/

use crate::{
    controller::FloppyController,
    file_parsers::{
        compression::lzf::{self, compress_bound},
        ImageHandler,
    },
    io::{read_words, write_words, ImageStream, Read, ReadSeek, Seek, SeekFrom, Write},
    track::{
        buffer::TrackBuffer,
        geometry::{array_words, default_side_flags, valid_bit_rate},
        TrackStore,
    },
    types::{DiskFlags, DriveFlags, SectorId, SideFlags},
    F86Error,
    F86_INTERNAL_VERSION,
    F86_VERSION,
};
use binrw::{binrw, BinRead, BinWrite};
use std::path::{Path, PathBuf};

/// "86BF" read as a little-endian u32.
pub const F86_MAGIC: u32 = 0x4642_3638;
/// "86bf", the magic of an LZF-compressed image.
pub const F86_MAGIC_LZF: u32 = 0x6662_3638;
pub const F86_HEADER_SIZE: u64 = 8;
/// Track offset table entries per head.
pub const F86_TRACK_TABLE_LEN_PER_HEAD: usize = 256;
/// Smallest image we'll consider.
pub const F86_MIN_FILE_SIZE: u64 = 16;
/// Default bound on the decompressed size of a compressed image.
pub const DEFAULT_MAX_DECOMPRESSED_LEN: usize = 64 * 1024 * 1024;
/// Extra bitcell counts are clamped to this magnitude.
const MAX_EXTRA_BIT_CELLS: i32 = 32768;

#[derive(Debug)]
#[binrw]
#[brw(little)]
struct FileHeader {
    magic: u32,
    version: u16,
    flags: u16,
}

#[derive(Debug)]
#[binrw]
#[brw(little)]
struct TrackHeader {
    flags: u16,
    index_hole: u32,
}

#[derive(Debug)]
#[binrw]
#[brw(little)]
struct TrackHeaderBitCells {
    flags: u16,
    bit_cells: i32,
    index_hole: u32,
}

/// Options applied when mounting an image.
#[derive(Clone, Debug)]
pub struct LoadOptions {
    /// Mount the image write protected regardless of the file.
    pub write_protect: bool,
    /// The largest decompressed body accepted from a compressed image.
    pub max_decompressed_len: usize,
    /// Directory for the scratch file holding a decompressed image. The system temporary
    /// directory is used if unset.
    pub temp_dir: Option<PathBuf>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            write_protect: false,
            max_decompressed_len: DEFAULT_MAX_DECOMPRESSED_LEN,
            temp_dir: None,
        }
    }
}

impl LoadOptions {
    pub fn with_write_protect(mut self, state: bool) -> Self {
        self.write_protect = state;
        self
    }

    pub fn with_max_decompressed_len(mut self, len: usize) -> Self {
        self.max_decompressed_len = len;
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }
}

pub struct F86Image {
    /// The uncompressed image. For a compressed image this is the scratch file.
    stream: Box<dyn ImageStream>,
    /// The compressed image the scratch file was expanded from.
    origin: Option<Box<dyn ImageStream>>,
    version: u16,
    disk_flags: DiskFlags,
    side_flags: [SideFlags; 2],
    extra_bit_cells: [i32; 2],
    index_hole: [u32; 2],
    track_offsets: Vec<u32>,
    file_size: u32,
    write_protect: bool,
}

impl F86Image {
    /// Return true if the stream starts with either 86f magic.
    pub fn detect<RS: ReadSeek>(mut image: RS) -> bool {
        if image.seek(SeekFrom::Start(0)).is_err() {
            return false;
        }
        match FileHeader::read(&mut image) {
            Ok(header) => header.magic == F86_MAGIC || header.magic == F86_MAGIC_LZF,
            Err(_) => false,
        }
    }

    /// Open the image at `path`, falling back to read-only access if it can't be opened for
    /// writing.
    pub fn open(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self, F86Error> {
        let path = path.as_ref();
        match std::fs::OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => Self::load(file, false, options),
            Err(e) => {
                log::debug!("Opening {} read-only: {}", path.display(), e);
                let file = std::fs::File::open(path)?;
                Self::load(file, true, options)
            }
        }
    }

    /// Mount an image from `stream`. A `read_only` stream is never written.
    pub fn load<S: ImageStream + 'static>(mut stream: S, read_only: bool, options: &LoadOptions) -> Result<Self, F86Error> {
        let len = stream.total_len()?;
        if len < F86_MIN_FILE_SIZE {
            log::error!("86F: Image is too small ({} bytes)", len);
            return Err(F86Error::ImageTooSmall(len));
        }

        stream.seek(SeekFrom::Start(0))?;
        let header = FileHeader::read(&mut stream)?;

        let compressed = match header.magic {
            F86_MAGIC => false,
            F86_MAGIC_LZF => true,
            magic => {
                log::error!("86F: Unrecognized magic bytes: {:08X}", magic);
                return Err(F86Error::UnknownMagic(magic));
            }
        };

        check_version(header.version)?;

        let (mut working, origin): (Box<dyn ImageStream>, Option<Box<dyn ImageStream>>) = if compressed {
            let scratch = expand(&mut stream, &header, options)?;
            (Box::new(scratch), Some(Box::new(stream)))
        }
        else {
            (Box::new(stream), None)
        };

        let disk_flags = DiskFlags::from_bits_retain(header.flags);
        if disk_flags.contains(DiskFlags::ZONED) {
            log::error!("86F: Disk is zoned (Apple or Sony)");
            return Err(F86Error::ZonedImage);
        }
        if disk_flags.intersects(DiskFlags::ZONE_TYPE) {
            log::error!("86F: Disk is fixed-RPM but zone type is not 0");
            return Err(F86Error::InvalidZoneType(header.flags));
        }

        let write_protect = options.write_protect || read_only || disk_flags.write_protect();

        let table_len = F86_TRACK_TABLE_LEN_PER_HEAD * disk_flags.sides();
        let working_len = working.total_len()?;
        if working_len < F86_HEADER_SIZE + (table_len * 4) as u64 {
            log::error!("86F: Image is too small to hold its track table ({} bytes)", working_len);
            return Err(F86Error::ImageTooSmall(working_len));
        }

        working.seek(SeekFrom::Start(F86_HEADER_SIZE))?;
        let track_offsets = Vec::<u32>::read_le_args(
            &mut working,
            binrw::VecArgs {
                count: table_len,
                inner: (),
            },
        )?;

        if let Some(bad) = track_offsets
            .iter()
            .find(|&&o| o != 0 && (o as u64) >= working_len)
        {
            log::error!("86F: Track offset {:08X} is past the end of the image", bad);
            return Err(F86Error::FormatParseError(format!("track offset {:08X} out of range", bad)));
        }

        for side in 0..disk_flags.sides() {
            if track_offsets[side] == 0 {
                log::error!("86F: No track 0 side {}", side);
                return Err(F86Error::MissingTrackZero(side));
            }
        }

        let mut image = F86Image {
            stream: working,
            origin,
            version: header.version,
            disk_flags,
            side_flags: [default_side_flags(disk_flags); 2],
            extra_bit_cells: [0; 2],
            index_hole: [0; 2],
            track_offsets,
            file_size: working_len as u32,
            write_protect,
        };

        // Track 0 supplies the side flags until the first seek.
        for side in 0..disk_flags.sides() {
            image.stream.seek(SeekFrom::Start(image.track_offsets[side] as u64))?;
            image.read_track_header(side)?;
        }

        log::debug!(
            "86F: Disk is {}compressed and {} surface description data",
            if compressed { "" } else { "not " },
            if disk_flags.has_surface_desc() { "has" } else { "does not have" }
        );

        Ok(image)
    }

    /// Return true if the image was stored LZF-compressed.
    pub fn is_compressed(&self) -> bool {
        self.origin.is_some()
    }

    /// Read back the complete stored image, compressed if it was loaded compressed.
    pub fn read_image(&mut self) -> Result<Vec<u8>, F86Error> {
        let stream = match self.origin.as_mut() {
            Some(origin) => origin,
            None => &mut self.stream,
        };
        let mut buf = Vec::new();
        stream.seek(SeekFrom::Start(0))?;
        stream.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// The track offset table, one entry per track side. Unformatted tracks are 0.
    pub fn track_offsets(&self) -> &[u32] {
        &self.track_offsets
    }

    fn track_index(&self, track: u16, side: usize) -> usize {
        if self.disk_flags.sides() == 2 {
            ((track as usize) << 1) + (side & 1)
        }
        else {
            track as usize
        }
    }

    fn header_size(&self) -> u64 {
        if self.disk_flags.has_extra_bit_cells() {
            10
        }
        else {
            6
        }
    }

    fn array_words(&self, side: usize) -> usize {
        array_words(
            self.disk_flags.hole_class(),
            self.disk_flags.rpm_mode(),
            self.extra_bit_cells[side],
        )
    }

    fn read_track_header(&mut self, side: usize) -> Result<(), F86Error> {
        if self.disk_flags.has_extra_bit_cells() {
            let header = TrackHeaderBitCells::read(&mut self.stream)?;
            self.side_flags[side] = SideFlags(header.flags);
            self.extra_bit_cells[side] = header.bit_cells.clamp(-MAX_EXTRA_BIT_CELLS, MAX_EXTRA_BIT_CELLS);
            self.index_hole[side] = header.index_hole;
        }
        else {
            let header = TrackHeader::read(&mut self.stream)?;
            self.side_flags[side] = SideFlags(header.flags);
            self.extra_bit_cells[side] = 0;
            self.index_hole[side] = header.index_hole;
        }
        Ok(())
    }

    /// Read track side `track + thin` into `buf`. Only thin track 0 updates the side's flags.
    fn read_track(&mut self, track: u16, thin: u16, side: usize, buf: &mut TrackBuffer) -> Result<(), F86Error> {
        let index = self.track_index(track + thin, side);
        let offset = self.track_offsets.get(index).copied().unwrap_or(0);

        if offset == 0 {
            if thin == 0 {
                self.side_flags[side] = default_side_flags(self.disk_flags);
                self.extra_bit_cells[side] = 0;
                self.index_hole[side] = 0;
            }
            buf.resize(self.array_words(side));
            buf.clear();
            return Ok(());
        }

        if thin == 0 {
            self.stream.seek(SeekFrom::Start(offset as u64))?;
            self.read_track_header(side)?;
        }
        else {
            self.stream.seek(SeekFrom::Start(offset as u64 + self.header_size()))?;
        }

        let words = self.array_words(side);
        let surface = if self.disk_flags.has_surface_desc() {
            read_words(&mut self.stream, words)?
        }
        else {
            vec![0; words]
        };
        let data = read_words(&mut self.stream, words)?;
        buf.set_data(data);
        buf.set_surface(surface);
        Ok(())
    }

    fn write_track(&mut self, side: usize, buf: &TrackBuffer) -> Result<(), F86Error> {
        if self.disk_flags.has_extra_bit_cells() {
            TrackHeaderBitCells {
                flags: self.side_flags[side].bits(),
                bit_cells: self.extra_bit_cells[side],
                index_hole: self.index_hole[side],
            }
            .write(&mut self.stream)?;
        }
        else {
            TrackHeader {
                flags: self.side_flags[side].bits(),
                index_hole: self.index_hole[side],
            }
            .write(&mut self.stream)?;
        }

        let words = self.array_words(side);
        if self.disk_flags.has_surface_desc() {
            write_words(&mut self.stream, &fit(buf.surface(), words))?;
        }
        write_words(&mut self.stream, &fit(buf.data(), words))?;
        Ok(())
    }

    /// Allocate space at the end of the image for `track` of `side`, if it has none.
    fn add_track(&mut self, track: u16, side: usize) {
        if self.disk_flags.sides() == 1 && side != 0 {
            return;
        }
        let index = self.track_index(track, side);
        let Some(offset) = self.track_offsets.get_mut(index) else {
            return;
        };
        if *offset != 0 {
            return;
        }

        *offset = self.file_size;
        let array_bytes = (array_words(
            self.disk_flags.hole_class(),
            self.disk_flags.rpm_mode(),
            self.extra_bit_cells[side],
        ) * 2) as u32;

        self.file_size += array_bytes + 6;
        if self.disk_flags.has_extra_bit_cells() {
            self.file_size += 4;
        }
        if self.disk_flags.has_surface_desc() {
            self.file_size += array_bytes;
        }
        log::trace!("86F: Added track {} side {} at offset {:08X}", track, side, *offset);
    }

    /// Recompress the scratch file into the original compressed image.
    fn recompress(&mut self) -> Result<(), F86Error> {
        let Some(origin) = self.origin.as_mut() else {
            return Ok(());
        };

        let mut expanded = Vec::new();
        self.stream.seek(SeekFrom::Start(0))?;
        self.stream.read_to_end(&mut expanded)?;

        let (header, body) = expanded.split_at(F86_HEADER_SIZE as usize);
        let packed = lzf::compress(body, compress_bound(body.len()))?;

        origin.seek(SeekFrom::Start(0))?;
        origin.write_all(header)?;
        origin.write_all(&packed)?;
        origin.set_len(F86_HEADER_SIZE + packed.len() as u64)?;
        origin.flush()?;
        log::trace!("86F: Recompressed {} bytes into {}", body.len(), packed.len());
        Ok(())
    }
}

fn check_version(version: u16) -> Result<(), F86Error> {
    match version {
        F86_VERSION => {
            log::debug!("86F: Recognized file version: {}.{:02}", version >> 8, version & 0xFF);
            Ok(())
        }
        F86_INTERNAL_VERSION => {
            log::error!("86F: File has emulator-internal version 0.99, this version is not valid in a file");
            Err(F86Error::InternalVersion)
        }
        0x0100..=0x020A => {
            log::error!(
                "86F: No longer supported development file version: {}.{:02}",
                version >> 8,
                version & 0xFF
            );
            Err(F86Error::ObsoleteVersion(version))
        }
        _ => {
            log::error!("86F: Unrecognized file version: {}.{:02}", version >> 8, version & 0xFF);
            Err(F86Error::UnsupportedVersion(version))
        }
    }
}

/// Expand the LZF body of a compressed image into a scratch file, preceded by the 8-byte header.
fn expand<S: ImageStream>(stream: &mut S, header: &FileHeader, options: &LoadOptions) -> Result<std::fs::File, F86Error> {
    let mut packed = Vec::new();
    stream.seek(SeekFrom::Start(F86_HEADER_SIZE))?;
    stream.read_to_end(&mut packed)?;

    let body = lzf::decompress(&packed, options.max_decompressed_len).map_err(|e| {
        log::error!("86F: Error decompressing file: {}", e);
        e
    })?;

    let mut scratch = match &options.temp_dir {
        Some(dir) => tempfile::tempfile_in(dir),
        None => tempfile::tempfile(),
    }
    .map_err(|e| {
        log::error!("86F: Unable to create temporary decompressed file: {}", e);
        e
    })?;

    header.write(&mut scratch)?;
    scratch.write_all(&body)?;
    scratch.flush()?;
    log::trace!("86F: Decompressed {} bytes into {}", packed.len(), body.len());
    Ok(scratch)
}

/// Return `words` truncated or zero-extended to `len`.
fn fit(words: &[u16], len: usize) -> Vec<u16> {
    let mut out = words[..words.len().min(len)].to_vec();
    out.resize(len, 0);
    out
}

impl ImageHandler for F86Image {
    fn disk_flags(&self) -> DiskFlags {
        self.disk_flags
    }

    fn side_flags(&self, side: usize) -> SideFlags {
        self.side_flags[side & 1]
    }

    fn extra_bit_cells(&self, side: usize) -> i32 {
        self.extra_bit_cells[side & 1]
    }

    fn index_hole_pos(&self, side: usize) -> u32 {
        self.index_hole[side & 1]
    }

    fn version(&self) -> u16 {
        self.version
    }

    fn write_protected(&self) -> bool {
        self.write_protect
    }

    fn format_conditions(&self, fdc: &dyn FloppyController, drive_flags: DriveFlags) -> bool {
        valid_bit_rate(self.disk_flags, fdc.bit_rate(), drive_flags)
    }

    fn set_sector(&mut self, _side: usize, _id: SectorId) {}

    fn write_data(&mut self, _side: usize, _pos: usize, _byte: u8) {}

    fn seek(&mut self, tracks: &mut TrackStore, track: u16, thick: bool) -> Result<(), F86Error> {
        tracks.cur_track = track;
        let has_surface = self.disk_flags.has_surface_desc();

        for side in 0..self.disk_flags.sides() {
            if thick {
                for thin in 0..2 {
                    self.read_track(track, thin, side, tracks.thin_mut(thin as usize, side))?;
                }
                tracks.construct(side, has_surface);
            }
            else {
                self.read_track(track, 0, side, tracks.side_mut(side))?;
            }
        }
        log::trace!(
            "86F: Seeked to track {}{}, side flags {}",
            track,
            if thick { " (thick)" } else { "" },
            self.side_flags[0]
        );
        Ok(())
    }

    fn writeback(&mut self, tracks: &mut TrackStore, thick: bool) -> Result<(), F86Error> {
        if self.write_protect {
            log::trace!("86F: Image is write protected, skipping writeback");
            return Ok(());
        }

        self.stream.seek(SeekFrom::Start(F86_HEADER_SIZE))?;
        let table: Vec<u8> = self.track_offsets.iter().flat_map(|o| o.to_le_bytes()).collect();
        self.stream.write_all(&table)?;

        let has_surface = self.disk_flags.has_surface_desc();
        let track = tracks.cur_track;

        for side in 0..self.disk_flags.sides() {
            if thick {
                tracks.decompose(side, has_surface);
                for thin in 0..2u16 {
                    let offset = self.track_offsets[self.track_index(track + thin, side)];
                    if offset != 0 {
                        self.stream.seek(SeekFrom::Start(offset as u64))?;
                        self.write_track(side, tracks.thin(thin as usize, side))?;
                    }
                }
            }
            else {
                let offset = self.track_offsets[self.track_index(track, side)];
                if offset != 0 {
                    self.stream.seek(SeekFrom::Start(offset as u64))?;
                    self.write_track(side, tracks.side(side))?;
                }
            }
        }
        self.stream.flush()?;

        self.recompress()
    }

    fn prepare_format(
        &mut self,
        tracks: &mut TrackStore,
        side: usize,
        flags: SideFlags,
        thick: bool,
    ) -> Result<(), F86Error> {
        let track = tracks.cur_track;
        if track as usize + thick as usize >= F86_TRACK_TABLE_LEN_PER_HEAD {
            log::error!("86F: Track {} is beyond the formattable range", track);
            return Err(F86Error::TrackOutOfRange(track));
        }

        let side = side & 1;
        self.index_hole[side] = 0;

        let words = self.array_words(side);
        let buf = tracks.side_mut(side);
        let len = words.min(buf.len());
        if self.disk_flags.has_surface_desc() {
            // Keep the holes, drop the fuzzy bits.
            for i in 0..len {
                let data = buf.data()[i];
                buf.surface_mut()[i] &= !data;
            }
        }
        buf.data_mut()[..len].fill(0);

        self.add_track(track, side);
        if thick {
            self.add_track(track + 1, side);
        }

        self.side_flags[side] = flags;
        Ok(())
    }

    fn is_native(&self) -> bool {
        true
    }
}
