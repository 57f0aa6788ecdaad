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


use super::color::{ColorType, PixelFormat};
use super::rectiter::RowIterator;
use super::tilestore::TileStore;
use super::{Rectangle, Size};
use crate::{RasterError, Result};

/// A flat, packed pixel buffer.
///
/// This is what the compositor produces and what the export code consumes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    pub pixels: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
}

impl PixelBuffer {
    pub fn new(width: usize, height: usize, format: PixelFormat) -> PixelBuffer {
        PixelBuffer {
            pixels: vec![0; width * height * format.bpp()],
            width,
            height,
            format,
        }
    }

    /// Copy a rectangle of a tile store into a new buffer
    pub fn from_store(store: &TileStore, rect: &Rectangle, format: PixelFormat) -> Result<Self> {
        if store.bpp() as usize != format.bpp() {
            return Err(RasterError::IncompatibleFormat);
        }
        Ok(PixelBuffer {
            pixels: store.to_pixels(rect)?,
            width: rect.w as usize,
            height: rect.h as usize,
            format,
        })
    }

    pub fn size(&self) -> Size {
        Size::new(self.width as i32, self.height as i32)
    }

    pub fn rowstride(&self) -> usize {
        self.width * self.format.bpp()
    }

    pub fn pixel(&self, x: usize, y: usize) -> &[u8] {
        let bpp = self.format.bpp();
        let offset = y * self.rowstride() + x * bpp;
        &self.pixels[offset..offset + bpp]
    }

    pub fn rows(&self, rect: &Rectangle) -> RowIterator {
        RowIterator::from_rectangle(&self.pixels, self.rowstride(), self.format.bpp(), rect)
    }

    /// Find the bounding rectangle of the non-transparent pixels in this buffer.
    /// For formats without alpha, nonzero pixels count as opaque.
    /// If the buffer is entirely transparent, None is returned.
    pub fn opaque_bounds(&self) -> Option<Rectangle> {
        let bpp = self.format.bpp();
        let mut top = self.height;
        let mut btm = 0;
        let mut left = self.width;
        let mut right = 0;

        for y in 0..self.height {
            let row = &self.pixels[y * self.rowstride()..(y + 1) * self.rowstride()];
            for (x, px) in row.chunks_exact(bpp).enumerate() {
                let visible = match self.format.alpha_index() {
                    Some(ai) => px[ai] != 0,
                    None => px.iter().any(|&b| b != 0),
                };
                if visible {
                    left = left.min(x);
                    right = right.max(x);
                    top = top.min(y);
                    btm = btm.max(y);
                }
            }
        }

        if top > btm {
            return None;
        }

        Some(Rectangle {
            x: left as i32,
            y: top as i32,
            w: (right - left + 1) as i32,
            h: (btm - top + 1) as i32,
        })
    }

    /// Return a cropped version of the buffer
    pub fn cropped(&self, rect: &Rectangle) -> Option<PixelBuffer> {
        let rect = rect.cropped(self.size())?;
        let mut pixels = Vec::with_capacity(rect.area() * self.format.bpp());
        self.rows(&rect).for_each(|row| pixels.extend_from_slice(row));

        Some(PixelBuffer {
            pixels,
            width: rect.w as usize,
            height: rect.h as usize,
            format: self.format,
        })
    }

    /// Convert to 8 bit RGBA.
    ///
    /// Indexed pixels are looked up in the colormap; indices outside
    /// of it become black.
    pub fn to_rgba8(&self, colormap: &[[u8; 3]]) -> Vec<u8> {
        let fmt = self.format;
        let mut out = Vec::with_capacity(self.width * self.height * 4);
        for px in self.pixels.chunks_exact(fmt.bpp()) {
            let rgb = match fmt.color {
                ColorType::Rgb => [px[0], px[1], px[2]],
                ColorType::Gray => [px[0]; 3],
                ColorType::Indexed => colormap.get(px[0] as usize).copied().unwrap_or([0; 3]),
            };
            out.extend_from_slice(&rgb);
            out.push(fmt.alpha_of(px));
        }
        out
    }
}
