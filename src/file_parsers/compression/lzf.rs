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

    src/file_parsers/compression/lzf.rs

    LZF compression and decompression.
*/

//! An implementation of the LZF format, a byte-oriented LZ77 variant.
//!
//! The stream is a sequence of runs, each introduced by a control byte `c`:
//!  - `c < 0x20`: a literal run of `c + 1` bytes follows.
//!  - otherwise: a back reference. The length is `c >> 5`, extended by a following byte if it
//!    is 7, plus 2. The distance is `((c & 0x1F) << 8) + next byte + 1`.

use super::CompressionError;

const HASH_LOG: u32 = 14;
const MAX_LITERAL: usize = 32;
const MAX_OFFSET: usize = 1 << 13;
const MAX_REF: usize = (1 << 8) + (1 << 3);

/// The largest output [compress] can produce for `len` input bytes.
pub fn compress_bound(len: usize) -> usize {
    len + len / MAX_LITERAL + 1
}

#[inline]
fn hash(input: &[u8], pos: usize) -> usize {
    let v = (input[pos] as u32) << 16 | (input[pos + 1] as u32) << 8 | input[pos + 2] as u32;
    (v.wrapping_mul(0x9E37_79B1) >> (32 - HASH_LOG)) as usize
}

/// Compress `input`. Fails with [CompressionError::Incompressible] if the output would exceed
/// `limit` bytes.
pub fn compress(input: &[u8], limit: usize) -> Result<Vec<u8>, CompressionError> {
    let mut table = vec![usize::MAX; 1 << HASH_LOG];
    let mut out = Vec::with_capacity(compress_bound(input.len()));

    let mut lit = 0;
    let mut lit_pos = out.len();
    out.push(0);

    let mut ip = 0;
    while ip + 2 < input.len() {
        let slot = hash(input, ip);
        let candidate = table[slot];
        table[slot] = ip;

        let found = candidate < ip
            && ip - candidate - 1 < MAX_OFFSET
            && input[candidate..candidate + 3] == input[ip..ip + 3];

        if !found {
            out.push(input[ip]);
            ip += 1;
            lit += 1;
            if lit == MAX_LITERAL {
                out[lit_pos] = (lit - 1) as u8;
                lit = 0;
                lit_pos = out.len();
                out.push(0);
            }
            continue;
        }

        let max_len = (input.len() - ip).min(MAX_REF);
        let mut len = 3;
        while len < max_len && input[candidate + len] == input[ip + len] {
            len += 1;
        }

        // Close the pending literal run.
        if lit == 0 {
            out.pop();
        }
        else {
            out[lit_pos] = (lit - 1) as u8;
        }

        let off = ip - candidate - 1;
        let code = len - 2;
        if code < 7 {
            out.push(((off >> 8) as u8) | ((code as u8) << 5));
        }
        else {
            out.push(((off >> 8) as u8) | (7 << 5));
            out.push((code - 7) as u8);
        }
        out.push(off as u8);
        ip += len;

        lit = 0;
        lit_pos = out.len();
        out.push(0);

        if out.len() > limit {
            return Err(CompressionError::Incompressible(limit));
        }
    }

    while ip < input.len() {
        out.push(input[ip]);
        ip += 1;
        lit += 1;
        if lit == MAX_LITERAL {
            out[lit_pos] = (lit - 1) as u8;
            lit = 0;
            lit_pos = out.len();
            out.push(0);
        }
    }

    if lit == 0 {
        out.pop();
    }
    else {
        out[lit_pos] = (lit - 1) as u8;
    }

    if out.len() > limit {
        return Err(CompressionError::Incompressible(limit));
    }
    Ok(out)
}

/// Decompress `input`, producing at most `max_len` bytes.
pub fn decompress(input: &[u8], max_len: usize) -> Result<Vec<u8>, CompressionError> {
    let mut out: Vec<u8> = Vec::new();
    let mut ip = 0;

    while ip < input.len() {
        let ctrl = input[ip] as usize;
        ip += 1;

        if ctrl < 0x20 {
            let run = ctrl + 1;
            let literal = input.get(ip..ip + run).ok_or(CompressionError::Truncated)?;
            if out.len() + run > max_len {
                return Err(CompressionError::OutputTooLarge(max_len));
            }
            out.extend_from_slice(literal);
            ip += run;
            continue;
        }

        let mut len = ctrl >> 5;
        if len == 7 {
            len += *input.get(ip).ok_or(CompressionError::Truncated)? as usize;
            ip += 1;
        }
        let low = *input.get(ip).ok_or(CompressionError::Truncated)? as usize;
        ip += 1;
        len += 2;

        let distance = ((ctrl & 0x1F) << 8) + low + 1;
        let start = out
            .len()
            .checked_sub(distance)
            .ok_or(CompressionError::BadBackReference)?;
        if out.len() + len > max_len {
            return Err(CompressionError::OutputTooLarge(max_len));
        }
        // The reference may overlap the bytes being produced.
        for i in 0..len {
            let byte = out[start + i];
            out.push(byte);
        }
    }

    Ok(out)
}
