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


use std::fmt;
use std::sync::Arc;

use super::color::MAX_CHANNELS;
use super::rectiter::{RowIterator, RowIteratorMut};
use super::Rectangle;

pub const TILE_SIZE: u32 = 64;
pub const TILE_SIZEI: i32 = TILE_SIZE as i32;

/// Size of the largest possible tile in bytes
pub const MAX_TILE_BYTES: usize = (TILE_SIZE * TILE_SIZE) as usize * MAX_CHANNELS;

// Backing for reads of unallocated tiles
static ZERO_BYTES: [u8; MAX_TILE_BYTES] = [0; MAX_TILE_BYTES];

/// The pixel content of an allocated tile
#[derive(Clone, PartialEq, Eq)]
pub struct TileData {
    width: u32,
    height: u32,
    bpp: u32,
    pixels: Vec<u8>,
}

#[derive(Clone)]
pub enum Tile {
    Bitmap(Arc<TileData>),
    Blank,
}

impl TileData {
    /// Create a new zero filled tile
    pub fn new(width: u32, height: u32, bpp: u32) -> TileData {
        debug_assert!(width > 0 && width <= TILE_SIZE);
        debug_assert!(height > 0 && height <= TILE_SIZE);
        TileData {
            width,
            height,
            bpp,
            pixels: vec![0; (width * height * bpp) as usize],
        }
    }

    /// Wrap existing pixel content.
    ///
    /// Returns None if the buffer length does not match the dimensions.
    pub fn from_bytes(width: u32, height: u32, bpp: u32, pixels: Vec<u8>) -> Option<TileData> {
        if pixels.len() == (width * height * bpp) as usize {
            Some(TileData {
                width,
                height,
                bpp,
                pixels,
            })
        } else {
            None
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bpp(&self) -> u32 {
        self.bpp
    }

    pub fn rowstride(&self) -> usize {
        (self.width * self.bpp) as usize
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn fill(&mut self, pixel: &[u8]) {
        debug_assert_eq!(pixel.len(), self.bpp as usize);
        for px in self.pixels.chunks_exact_mut(pixel.len()) {
            px.copy_from_slice(pixel);
        }
    }

    pub fn rows(&self, r: &Rectangle) -> RowIterator {
        RowIterator::from_rectangle(&self.pixels, self.rowstride(), self.bpp as usize, r)
    }

    pub fn rows_mut(&mut self, r: &Rectangle) -> RowIteratorMut {
        let rowstride = self.rowstride();
        RowIteratorMut::from_rectangle(&mut self.pixels, rowstride, self.bpp as usize, r)
    }

    pub fn is_zero(&self) -> bool {
        self.pixels.iter().all(|&b| b == 0)
    }
}

impl Tile {
    /// Number of tiles needed to cover the given length
    pub fn div_up(x: u32) -> u32 {
        (x + TILE_SIZE - 1) / TILE_SIZE
    }

    pub fn data(&self) -> Option<&TileData> {
        match self {
            Tile::Bitmap(td) => Some(td),
            Tile::Blank => None,
        }
    }

    /// Get this tile's pixel bytes.
    ///
    /// A blank tile reads as a zero filled buffer of at least `len` bytes.
    pub fn bytes(&self, len: usize) -> &[u8] {
        match self {
            Tile::Bitmap(td) => &td.pixels,
            Tile::Blank => &ZERO_BYTES[..len],
        }
    }

    /// Return an iterator over the rows of a rectangle of this tile.
    ///
    /// Since a blank tile has no dimensions of its own, the caller provides
    /// the row stride (tile width times bpp).
    pub fn rows(&self, rowstride: usize, bpp: usize, r: &Rectangle) -> RowIterator {
        match self {
            Tile::Bitmap(td) => td.rows(r),
            Tile::Blank => RowIterator::from_rectangle(&ZERO_BYTES, rowstride, bpp, r),
        }
    }

    /// Check if every byte of this tile is zero
    pub fn is_blank(&self) -> bool {
        match self {
            Tile::Bitmap(td) => td.is_zero(),
            Tile::Blank => true,
        }
    }

    /// Number of stores referencing this tile's content (0 for a blank tile)
    pub fn share_count(&self) -> usize {
        match self {
            Tile::Bitmap(td) => Arc::strong_count(td),
            Tile::Blank => 0,
        }
    }

    /// Do a shallow equality comparison between these two tiles
    pub fn ptr_eq(&self, other: &Tile) -> bool {
        use Tile::*;
        match (self, other) {
            (Blank, Blank) => true,
            (Bitmap(a), Bitmap(b)) => Arc::ptr_eq(a, b),
            (_, _) => false,
        }
    }
}

impl PartialEq for Tile {
    fn eq(&self, other: &Tile) -> bool {
        self.ptr_eq(other)
            || match (self, other) {
                (Tile::Bitmap(a), Tile::Bitmap(b)) => a.pixels == b.pixels,
                (Tile::Bitmap(_), Tile::Blank) => self.is_blank(),
                (Tile::Blank, _) => other.is_blank(),
            }
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tile::Bitmap(d) => write!(
                f,
                "Tile({}x{}x{}, refs={})",
                d.width,
                d.height,
                d.bpp,
                Arc::strong_count(d)
            ),
            Tile::Blank => write!(f, "Tile(blank)"),
        }
    }
}
