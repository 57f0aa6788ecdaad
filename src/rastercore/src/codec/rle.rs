// This file is part of rastercore.
// Copyright (C) 2024 the rastercore authors
//
// rastercore is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// rastercore is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with rastercore.  If not, see <https://www.gnu.org/licenses/>.


//! Byte oriented run-length encoding of tile data.
//!
//! Each channel of a tile is encoded as its own plane. A plane is a
//! sequence of runs, each starting with a length byte `L`:
//!
//! * `L < 127`: `L + 1` copies of the following byte
//! * `L == 127`: like above, but the run length is the next big-endian u16
//! * `L == 129`: literal bytes, the count is the next big-endian u16
//! * otherwise: `257 - L` literal bytes follow

use crate::{RasterError, Result};

const LONG_PACKED: u8 = 127;
const LONG_LITERAL: u8 = 129;
const MAX_SHORT_RUN: usize = 127;
const MAX_LONG_RUN: usize = u16::MAX as usize;

fn write_packed(out: &mut Vec<u8>, len: usize, value: u8) {
    debug_assert!(len > 0 && len <= MAX_LONG_RUN);
    if len <= MAX_SHORT_RUN {
        out.push((len - 1) as u8);
    } else {
        out.push(LONG_PACKED);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    }
    out.push(value);
}

fn write_literal(out: &mut Vec<u8>, bytes: &[u8]) {
    match bytes.len() {
        0 => {}
        1 => write_packed(out, 1, bytes[0]),
        n if n <= MAX_SHORT_RUN => {
            out.push((257 - n) as u8);
            out.extend_from_slice(bytes);
        }
        n => {
            out.push(LONG_LITERAL);
            out.extend_from_slice(&(n as u16).to_be_bytes());
            out.extend_from_slice(bytes);
        }
    }
}

fn encode_plane(plane: &[u8], out: &mut Vec<u8>) {
    let mut literal_start = 0;
    let mut i = 0;
    while i < plane.len() {
        let value = plane[i];
        let run = plane[i..]
            .iter()
            .take(MAX_LONG_RUN)
            .take_while(|&&v| v == value)
            .count();

        if run >= 2 {
            for chunk in plane[literal_start..i].chunks(MAX_LONG_RUN) {
                write_literal(out, chunk);
            }
            write_packed(out, run, value);
            i += run;
            literal_start = i;
        } else {
            i += 1;
        }
    }
    for chunk in plane[literal_start..].chunks(MAX_LONG_RUN) {
        write_literal(out, chunk);
    }
}

/// Encode interleaved pixel data with the given number of bytes per pixel
pub fn encode(pixels: &[u8], bpp: usize, out: &mut Vec<u8>) {
    debug_assert!(bpp > 0 && pixels.len() % bpp == 0);
    let mut plane = Vec::with_capacity(pixels.len() / bpp);
    for c in 0..bpp {
        plane.clear();
        plane.extend(pixels.iter().skip(c).step_by(bpp));
        encode_plane(&plane, out);
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn byte(&mut self) -> Result<u8> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| RasterError::corrupt("RLE stream ended early"))?;
        self.pos += 1;
        Ok(b)
    }

    fn u16(&mut self) -> Result<usize> {
        let hi = self.byte()? as usize;
        let lo = self.byte()? as usize;
        Ok(hi << 8 | lo)
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos + n;
        let b = self
            .data
            .get(self.pos..end)
            .ok_or_else(|| RasterError::corrupt("RLE literal run past end of data"))?;
        self.pos = end;
        Ok(b)
    }
}

/// Decode RLE data into interleaved pixels.
///
/// `out` must be exactly the size of the decoded tile. Runs that would
/// write past a plane or read past the end of `data` are rejected.
/// Returns the number of input bytes consumed.
pub fn decode(data: &[u8], bpp: usize, out: &mut [u8]) -> Result<usize> {
    debug_assert!(bpp > 0 && out.len() % bpp == 0);
    let count = out.len() / bpp;
    let mut cursor = Cursor { data, pos: 0 };

    for c in 0..bpp {
        let mut written = 0;
        while written < count {
            let l = cursor.byte()?;
            let (len, literal) = match l {
                0..=126 => (l as usize + 1, false),
                LONG_PACKED => (cursor.u16()?, false),
                LONG_LITERAL => (cursor.u16()?, true),
                _ => (257 - l as usize, true),
            };
            if len == 0 {
                return Err(RasterError::corrupt("zero length RLE run"));
            }
            if written + len > count {
                return Err(RasterError::corrupt("RLE run overruns the tile"));
            }

            let dest = out[c..]
                .iter_mut()
                .step_by(bpp)
                .skip(written)
                .take(len);
            if literal {
                let src = cursor.bytes(len)?;
                dest.zip(src).for_each(|(d, &s)| *d = s);
            } else {
                let value = cursor.byte()?;
                dest.for_each(|d| *d = value);
            }
            written += len;
        }
    }

    Ok(cursor.pos)
}
