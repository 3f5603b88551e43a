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

    src/file_parsers/raw.rs

    A proxied image handler for raw sector images (IMG, IMA, DSK) of one of the
    standard PC formats.

    A raw image holds no track data, so tracks are synthesized as IBM System/34
    MFM tracks whenever the head seeks. Sector bytes written by the engine are
    routed back into the image through set_sector and write_data.
*/

use crate::{
    controller::FloppyController,
    file_parsers::{f86::LoadOptions, ImageHandler},
    io::{ImageStream, ReadSeek, Seek, SeekFrom},
    track::{
        buffer::{BitLayout, TrackBuffer},
        builder::TrackBuilder,
        geometry::{array_words, raw_size, valid_bit_rate},
        TrackStore,
    },
    types::{DiskFlags, DriveFlags, SectorId, SideFlags, StandardFormat},
    F86Error,
    F86_INTERNAL_VERSION,
};
use std::io::{Read, Write};
use std::path::Path;

pub struct RawSectorImage {
    stream: Box<dyn ImageStream>,
    format: StandardFormat,
    /// The cylinder the head is over, in the image's own cylinder units.
    cylinder: u16,
    /// Sector data of the current cylinder, all heads.
    cache: Vec<u8>,
    /// Sector index on the current cylinder targeted by write_data, per side.
    target: [Option<usize>; 2],
    dirty: [bool; 2],
    write_protect: bool,
}

impl RawSectorImage {
    /// Return true if the image length matches one of the standard formats.
    pub fn detect<RS: ReadSeek>(mut image: RS) -> bool {
        image
            .seek(SeekFrom::End(0))
            .is_ok_and(|len| StandardFormat::try_from(len).is_ok())
    }

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

    pub fn load<S: ImageStream + 'static>(mut stream: S, read_only: bool, options: &LoadOptions) -> Result<Self, F86Error> {
        let len = stream.total_len()?;
        let format = match StandardFormat::try_from(len) {
            Ok(format) => {
                log::trace!("Raw: Detected format {}", format);
                format
            }
            Err(e) => {
                log::error!("Raw: Error detecting format: {}", e);
                return Err(F86Error::UnknownGeometry(len));
            }
        };

        let mut image = RawSectorImage {
            stream: Box::new(stream),
            format,
            cylinder: 0,
            cache: Vec::new(),
            target: [None; 2],
            dirty: [false; 2],
            write_protect: options.write_protect || read_only,
        };
        image.load_cylinder(0)?;
        Ok(image)
    }

    pub fn format(&self) -> StandardFormat {
        self.format
    }

    /// Read back the complete image.
    pub fn read_image(&mut self) -> Result<Vec<u8>, F86Error> {
        let mut buf = Vec::new();
        self.stream.seek(SeekFrom::Start(0))?;
        self.stream.read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn cylinder_size(&self) -> usize {
        self.format.track_size() * self.format.heads() as usize
    }

    fn load_cylinder(&mut self, cylinder: u16) -> Result<(), F86Error> {
        self.cylinder = cylinder;
        self.target = [None; 2];
        self.dirty = [false; 2];

        if cylinder >= self.format.cylinders() {
            self.cache.clear();
            return Ok(());
        }

        let size = self.cylinder_size();
        self.cache.resize(size, 0);
        self.stream.seek(SeekFrom::Start(cylinder as u64 * size as u64))?;
        self.stream.read_exact(&mut self.cache)?;
        Ok(())
    }

    /// Render the current cylinder's sectors on `side` into `buf`.
    fn build_track(&self, buf: &mut TrackBuffer, side: usize) {
        let disk_flags = self.format.disk_flags();
        buf.resize(array_words(disk_flags.hole_class(), 0, 0));
        buf.clear();

        if self.cache.is_empty() || side >= self.format.heads() as usize {
            return;
        }

        let raw = raw_size(self.format.side_flags(), 0, 0);
        let mut builder = TrackBuilder::new(buf, BitLayout::default(), true, raw);
        let mut pos = builder.prepare_pretrack(false);

        let sector_size = self.format.sector_size();
        let track_base = side * self.format.track_size();
        for s in 0..self.format.sectors_per_track() {
            let id = SectorId::new(self.cylinder as u8, side as u8, s + 1, self.format.size_code());
            let start = track_base + s as usize * sector_size;
            pos = builder.prepare_sector(
                pos,
                id,
                &self.cache[start..start + sector_size],
                self.format.gap2() as usize,
                self.format.gap3() as usize,
                false,
                false,
            );
        }
    }
}

impl ImageHandler for RawSectorImage {
    fn disk_flags(&self) -> DiskFlags {
        self.format.disk_flags()
    }

    fn side_flags(&self, _side: usize) -> SideFlags {
        self.format.side_flags()
    }

    fn extra_bit_cells(&self, _side: usize) -> i32 {
        0
    }

    fn index_hole_pos(&self, _side: usize) -> u32 {
        0
    }

    fn version(&self) -> u16 {
        F86_INTERNAL_VERSION
    }

    fn write_protected(&self) -> bool {
        self.write_protect
    }

    fn format_conditions(&self, fdc: &dyn FloppyController, drive_flags: DriveFlags) -> bool {
        valid_bit_rate(self.format.disk_flags(), fdc.bit_rate(), drive_flags)
            && fdc.format_sectors() == self.format.sectors_per_track()
            && fdc.format_n() == self.format.size_code()
    }

    fn set_sector(&mut self, side: usize, id: SectorId) {
        let side = side & 1;
        let spt = self.format.sectors_per_track();
        self.target[side] = if !self.cache.is_empty()
            && (side as u8) < self.format.heads()
            && id.n == self.format.size_code()
            && (1..=spt).contains(&id.r)
        {
            Some((id.r - 1) as usize)
        }
        else {
            log::trace!("Raw: Sector {} is not part of the image", id);
            None
        };
    }

    fn write_data(&mut self, side: usize, pos: usize, byte: u8) {
        let side = side & 1;
        let Some(sector) = self.target[side] else {
            return;
        };
        let sector_size = self.format.sector_size();
        if pos >= sector_size {
            return;
        }
        let offset = side * self.format.track_size() + sector * sector_size + pos;
        if let Some(b) = self.cache.get_mut(offset) {
            *b = byte;
            self.dirty[side] = true;
        }
    }

    fn seek(&mut self, tracks: &mut TrackStore, track: u16, thick: bool) -> Result<(), F86Error> {
        tracks.cur_track = track;
        let cylinder = if thick { track >> 1 } else { track };
        if cylinder != self.cylinder || self.cache.is_empty() {
            self.load_cylinder(cylinder)?;
        }

        for side in 0..2 {
            self.build_track(tracks.side_mut(side), side);
        }
        log::trace!("Raw: Seeked to cylinder {}", cylinder);
        Ok(())
    }

    fn writeback(&mut self, tracks: &mut TrackStore, _thick: bool) -> Result<(), F86Error> {
        if self.write_protect || !self.dirty.iter().any(|&d| d) || self.cache.is_empty() {
            return Ok(());
        }

        let size = self.cylinder_size();
        self.stream
            .seek(SeekFrom::Start(self.cylinder as u64 * size as u64))?;
        self.stream.write_all(&self.cache)?;
        self.stream.flush()?;

        for side in 0..2 {
            if self.dirty[side] {
                self.build_track(tracks.side_mut(side), side);
            }
        }
        self.dirty = [false; 2];
        log::trace!("Raw: Wrote back cylinder {}", self.cylinder);
        Ok(())
    }

    fn prepare_format(
        &mut self,
        tracks: &mut TrackStore,
        side: usize,
        _flags: SideFlags,
        _thick: bool,
    ) -> Result<(), F86Error> {
        log::trace!(
            "Raw: Formatting cylinder {} side {} (track {})",
            self.cylinder,
            side,
            tracks.cur_track
        );
        Ok(())
    }

    fn is_native(&self) -> bool {
        false
    }
}
