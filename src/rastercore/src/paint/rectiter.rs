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


//! Row iterators over a rectangle of an interleaved pixel buffer.
//!
//! Coordinates and widths are given in pixels; the yielded rows are byte
//! slices `w * bpp` long.

use super::Rectangle;

pub struct RowIterator<'a> {
    buf: &'a [u8],
    rowstride: usize,
    x0: usize,
    x1: usize,
    rows: usize,
}

fn test_bounds(buflen: usize, rowstride: usize, bpp: usize, r: (usize, usize, usize, usize)) {
    let (x, y, w, h) = r;
    debug_assert!(w > 0);
    debug_assert!(h > 0);
    debug_assert!((x + w) * bpp <= rowstride);
    debug_assert!(((y + h - 1) * rowstride + (x + w) * bpp) <= buflen);
}

impl<'a> RowIterator<'a> {
    pub fn new(
        buf: &'a [u8],
        rowstride: usize,
        bpp: usize,
        x: usize,
        y: usize,
        w: usize,
        h: usize,
    ) -> RowIterator<'a> {
        test_bounds(buf.len(), rowstride, bpp, (x, y, w, h));
        RowIterator {
            buf: &buf[(y * rowstride)..],
            rowstride,
            x0: x * bpp,
            x1: (x + w) * bpp,
            rows: h,
        }
    }

    pub fn from_rectangle(buf: &'a [u8], rowstride: usize, bpp: usize, r: &Rectangle) -> Self {
        RowIterator::new(
            buf,
            rowstride,
            bpp,
            r.x as usize,
            r.y as usize,
            r.w as usize,
            r.h as usize,
        )
    }

    /// Number of bytes this iterator will yield
    pub fn byte_len(&self) -> usize {
        self.rows * (self.x1 - self.x0)
    }
}

impl<'a> Iterator for RowIterator<'a> {
    type Item = &'a [u8];
    fn next(&mut self) -> Option<Self::Item> {
        if self.rows > 0 {
            self.rows -= 1;
            let row = &self.buf[self.x0..self.x1];
            self.buf = &self.buf[self.rowstride.min(self.buf.len())..];
            Some(row)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.rows, Some(self.rows))
    }
}

pub struct RowIteratorMut<'a> {
    buf: &'a mut [u8],
    rowstride: usize,
    x0: usize,
    x1: usize,
    rows: usize,
}

impl<'a> RowIteratorMut<'a> {
    pub fn new(
        buf: &'a mut [u8],
        rowstride: usize,
        bpp: usize,
        x: usize,
        y: usize,
        w: usize,
        h: usize,
    ) -> RowIteratorMut<'a> {
        test_bounds(buf.len(), rowstride, bpp, (x, y, w, h));
        RowIteratorMut {
            buf: &mut buf[(y * rowstride)..],
            rowstride,
            x0: x * bpp,
            x1: (x + w) * bpp,
            rows: h,
        }
    }

    pub fn from_rectangle(
        buf: &'a mut [u8],
        rowstride: usize,
        bpp: usize,
        r: &Rectangle,
    ) -> Self {
        RowIteratorMut::new(
            buf,
            rowstride,
            bpp,
            r.x as usize,
            r.y as usize,
            r.w as usize,
            r.h as usize,
        )
    }

    pub fn byte_len(&self) -> usize {
        self.rows * (self.x1 - self.x0)
    }
}

impl<'a> Iterator for RowIteratorMut<'a> {
    type Item = &'a mut [u8];
    fn next(&mut self) -> Option<Self::Item> {
        if self.rows > 0 {
            self.rows -= 1;
            let tmp = std::mem::take(&mut self.buf);
            let split = self.rowstride.min(tmp.len());
            let (row, rest) = tmp.split_at_mut(split);
            self.buf = rest;
            Some(&mut row[self.x0..self.x1])
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.rows, Some(self.rows))
    }
}
