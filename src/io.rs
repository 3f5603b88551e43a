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

    src/io.rs

    Stream traits used by the image handlers.
*/

pub use std::io::{Cursor, Error, ErrorKind, Read, Result, Seek, SeekFrom, Write};

pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

pub trait ReadWriteSeek: Read + Write + Seek {}
impl<T: Read + Write + Seek> ReadWriteSeek for T {}

/// A seekable, writable stream backing a mounted disk image.
///
/// Image handlers own their stream for the lifetime of the mount, so that writeback can update
/// tracks in place. A compressed image is rewritten as a whole on writeback, which may shrink it,
/// hence the need to truncate.
pub trait ImageStream: ReadWriteSeek {
    /// Truncate or extend the underlying storage to `len` bytes.
    fn set_len(&mut self, len: u64) -> Result<()>;

    /// Return the total length of the stream, preserving the current position.
    fn total_len(&mut self) -> Result<u64> {
        let pos = self.stream_position()?;
        let len = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(pos))?;
        Ok(len)
    }
}

impl ImageStream for std::fs::File {
    fn set_len(&mut self, len: u64) -> Result<()> {
        std::fs::File::set_len(self, len)
    }
}

impl ImageStream for Cursor<Vec<u8>> {
    fn set_len(&mut self, len: u64) -> Result<()> {
        self.get_mut().resize(len as usize, 0);
        Ok(())
    }
}

/// Read `count` little-endian words from the current position of `reader`.
pub(crate) fn read_words<R: ReadSeek>(reader: &mut R, count: usize) -> binrw::BinResult<Vec<u16>> {
    use binrw::{BinRead, Endian, VecArgs};
    Vec::<u16>::read_options(reader, Endian::Little, VecArgs { count, inner: () })
}

/// Write `words` as little-endian words at the current position of `writer`.
pub(crate) fn write_words<W: Write>(writer: &mut W, words: &[u16]) -> Result<()> {
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    writer.write_all(&bytes)
}
