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

    src/drive.rs

    The drive façade: one mounted image and its engine state per drive.
*/

//! An [F86Drive] pairs the [ImageHandler] of the mounted image with the [DriveImageState] that
//! executes commands against it. The floppy controller and drive platform are passed to every
//! call rather than stored, so that a drive never holds a reference into its host.
//!
//! A [DriveManager] owns [FDD_NUM] drives.

use std::path::Path;

use crate::{
    controller::{DrivePlatform, FloppyController},
    engine::{state::EngineState, DriveImageState, EngineIo},
    file_parsers::{
        f86::{F86Image, LoadOptions},
        raw::RawSectorImage,
        ImageHandler,
        NullImage,
    },
    track::{geometry, TrackStore},
    types::SectorSelect,
    F86Error,
    FDD_NUM,
};

pub struct F86Drive {
    index: usize,
    handler: Box<dyn ImageHandler>,
    image: DriveImageState,
    ui_write_protect: bool,
}

impl F86Drive {
    /// Create drive `index` with no media.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            handler: Box::new(NullImage),
            image: DriveImageState::new(),
            ui_write_protect: false,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Open and mount the image at `path`. 86F images are recognized by their magic, anything
    /// else must be a raw sector image of a standard size. On failure the previously mounted
    /// image stays mounted.
    ///
    /// The track buffers are emptied; the caller is expected to seek before issuing commands.
    pub fn load(&mut self, path: impl AsRef<Path>, options: &LoadOptions) -> Result<(), F86Error> {
        let path = path.as_ref();
        let result = Self::open_image(path, options);

        match result {
            Ok(handler) => {
                log::debug!("Drive {}: Mounted {}", self.index, path.display());
                self.insert(handler);
                Ok(())
            }
            Err(e) => {
                log::error!("Drive {}: Failed to load {}: {}", self.index, path.display(), e);
                Err(e)
            }
        }
    }

    fn open_image(path: &Path, options: &LoadOptions) -> Result<Box<dyn ImageHandler>, F86Error> {
        let mut file = std::fs::File::open(path)?;

        if F86Image::detect(&mut file) {
            return Ok(Box::new(F86Image::open(path, options)?));
        }
        if RawSectorImage::detect(&mut file) {
            return Ok(Box::new(RawSectorImage::open(path, options)?));
        }
        Err(F86Error::UnknownFormat)
    }

    /// Mount `handler`, replacing the current image.
    pub fn insert(&mut self, handler: Box<dyn ImageHandler>) {
        self.handler = handler;
        self.image = DriveImageState::new();
    }

    /// Eject the mounted image. A decompression scratch file is removed with its handler.
    pub fn close(&mut self) {
        log::debug!("Drive {}: Closing image", self.index);
        self.insert(Box::new(NullImage));
    }

    pub fn handler(&self) -> &dyn ImageHandler {
        self.handler.as_ref()
    }

    /// Set the user write protect switch. It applies on top of the image's own write protection.
    pub fn set_write_protect(&mut self, state: bool) {
        self.ui_write_protect = state;
    }

    pub fn is_write_protected(&self) -> bool {
        self.ui_write_protect || self.handler.write_protected()
    }

    fn io<'a>(
        &'a mut self,
        fdc: &'a mut dyn FloppyController,
        platform: &'a dyn DrivePlatform,
    ) -> (&'a mut DriveImageState, EngineIo<'a>) {
        let write_protect = self.ui_write_protect || self.handler.write_protected();
        let io = EngineIo::new(self.handler.as_mut(), fdc, platform, self.index, write_protect);
        (&mut self.image, io)
    }

    pub fn readsector(
        &mut self,
        fdc: &mut dyn FloppyController,
        platform: &dyn DrivePlatform,
        select: SectorSelect,
        track: u8,
        side: u8,
        rate: u8,
        size: u8,
    ) {
        let (image, mut io) = self.io(fdc, platform);
        image.readsector(&mut io, select, track, side, rate, size);
    }

    pub fn writesector(
        &mut self,
        fdc: &mut dyn FloppyController,
        platform: &dyn DrivePlatform,
        select: SectorSelect,
        track: u8,
        side: u8,
        rate: u8,
        size: u8,
    ) {
        let (image, mut io) = self.io(fdc, platform);
        image.writesector(&mut io, select, track, side, rate, size);
    }

    pub fn comparesector(
        &mut self,
        fdc: &mut dyn FloppyController,
        platform: &dyn DrivePlatform,
        select: SectorSelect,
        track: u8,
        side: u8,
        rate: u8,
        size: u8,
    ) {
        let (image, mut io) = self.io(fdc, platform);
        image.comparesector(&mut io, select, track, side, rate, size);
    }

    pub fn readaddress(&mut self, fdc: &mut dyn FloppyController, platform: &dyn DrivePlatform, side: u8, rate: u8) {
        let (image, mut io) = self.io(fdc, platform);
        image.readaddress(&mut io, side, rate);
    }

    pub fn format(
        &mut self,
        fdc: &mut dyn FloppyController,
        platform: &dyn DrivePlatform,
        side: usize,
        rate: u8,
        fill: u8,
    ) {
        let (image, mut io) = self.io(fdc, platform);
        image.format(&mut io, side, rate, fill);
    }

    pub fn stop(&mut self) {
        self.image.stop();
    }

    /// Advance the drive by one bitcell.
    pub fn poll(&mut self, fdc: &mut dyn FloppyController, platform: &dyn DrivePlatform) {
        let (image, mut io) = self.io(fdc, platform);
        image.poll(&mut io);
    }

    /// Move the head to physical `track` and load it from the image.
    pub fn seek(
        &mut self,
        fdc: &mut dyn FloppyController,
        platform: &dyn DrivePlatform,
        track: u16,
    ) -> Result<(), F86Error> {
        let (image, mut io) = self.io(fdc, platform);
        image.seek(&mut io, track)
    }

    /// The hole type of the mounted media: 0 for DD, 1 for HD, 2 for ED.
    pub fn hole(&self) -> u8 {
        geometry::hole(self.handler.disk_flags())
    }

    /// The duration of one encoded byte on the current track under the selected head, in
    /// microseconds.
    pub fn byteperiod(&self, platform: &dyn DrivePlatform) -> f64 {
        let side = platform.head(self.index) & 1;
        let flags = geometry::track_flags(self.handler.side_flags(side), platform.flags(self.index));
        geometry::byte_period(flags)
    }

    pub fn state(&self) -> EngineState {
        self.image.state()
    }

    pub fn engine(&self) -> &DriveImageState {
        &self.image
    }

    pub fn track_store(&self) -> &TrackStore {
        self.image.track_store()
    }
}

/// Owns every drive of a floppy controller.
pub struct DriveManager {
    drives: Vec<F86Drive>,
}

impl Default for DriveManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DriveManager {
    pub fn new() -> Self {
        Self {
            drives: (0..FDD_NUM).map(F86Drive::new).collect(),
        }
    }

    pub fn drive(&self, index: usize) -> Option<&F86Drive> {
        self.drives.get(index)
    }

    pub fn drive_mut(&mut self, index: usize) -> Option<&mut F86Drive> {
        self.drives.get_mut(index)
    }

    pub fn drives(&self) -> impl Iterator<Item = &F86Drive> {
        self.drives.iter()
    }

    /// Stop every drive.
    pub fn reset(&mut self) {
        for drive in &mut self.drives {
            drive.stop();
        }
    }
}
