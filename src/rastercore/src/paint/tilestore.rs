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


use std::sync::Arc;

use super::color::MAX_CHANNELS;
use super::rectiter::{RowIterator, RowIteratorMut};
use super::tile::{Tile, TileData, TILE_SIZE, TILE_SIZEI};
use super::{Rectangle, Size};
use crate::{RasterError, Result};

/// Largest width or height of a tile store
pub const MAX_DIMENSION: u32 = 262_144;

/// A grid of copy-on-write tiles covering a `width × height` surface.
///
/// Tiles are 64×64 pixels, except on the right and bottom edges where
/// they are cut to the remaining size. Unallocated tiles read as zero.
#[derive(Clone, Debug)]
pub struct TileStore {
    width: u32,
    height: u32,
    bpp: u32,
    tiles: Vec<Tile>,
}

impl TileStore {
    pub fn new(width: u32, height: u32, bpp: u32) -> Result<TileStore> {
        if width == 0
            || height == 0
            || width > MAX_DIMENSION
            || height > MAX_DIMENSION
            || bpp == 0
            || bpp as usize > MAX_CHANNELS
        {
            return Err(RasterError::InvalidDimensions);
        }
        let count = Tile::div_up(width) as usize * Tile::div_up(height) as usize;
        Ok(TileStore {
            width,
            height,
            bpp,
            tiles: vec![Tile::Blank; count],
        })
    }

    /// Build a tile store from a packed pixel buffer (rowstride = width * bpp)
    pub fn from_pixels(width: u32, height: u32, bpp: u32, pixels: &[u8]) -> Result<TileStore> {
        let mut store = TileStore::new(width, height, bpp)?;
        store.write_pixels(&store.bounds(), pixels)?;
        Ok(store)
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

    pub fn size(&self) -> Size {
        Size::new(self.width as i32, self.height as i32)
    }

    pub fn bounds(&self) -> Rectangle {
        Rectangle::new(0, 0, self.width as i32, self.height as i32)
    }

    pub fn cols(&self) -> u32 {
        Tile::div_up(self.width)
    }

    pub fn rows(&self) -> u32 {
        Tile::div_up(self.height)
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn index(&self, col: u32, row: u32) -> usize {
        debug_assert!(col < self.cols() && row < self.rows());
        (row * self.cols() + col) as usize
    }

    /// Dimensions of the tile at the given grid position
    pub fn tile_dims(&self, col: u32, row: u32) -> (u32, u32) {
        (
            TILE_SIZE.min(self.width - col * TILE_SIZE),
            TILE_SIZE.min(self.height - row * TILE_SIZE),
        )
    }

    pub fn tile_dims_at_index(&self, index: usize) -> (u32, u32) {
        let cols = self.cols() as usize;
        self.tile_dims((index % cols) as u32, (index / cols) as u32)
    }

    /// Area covered by the tile at the given grid position
    pub fn tile_rect(&self, col: u32, row: u32) -> Rectangle {
        let (w, h) = self.tile_dims(col, row);
        Rectangle::new(
            (col * TILE_SIZE) as i32,
            (row * TILE_SIZE) as i32,
            w as i32,
            h as i32,
        )
    }

    /// Byte length of the tile at the given grid position
    pub fn tile_bytes(&self, index: usize) -> usize {
        let (w, h) = self.tile_dims_at_index(index);
        (w * h * self.bpp) as usize
    }

    /// Get read access to a tile
    pub fn tile(&self, col: u32, row: u32) -> &Tile {
        &self.tiles[self.index(col, row)]
    }

    pub fn tile_at_index(&self, index: usize) -> &Tile {
        &self.tiles[index]
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Get write access to a tile.
    ///
    /// A blank tile is allocated and a tile whose content is shared with
    /// another store is privatized first.
    pub fn tile_mut(&mut self, col: u32, row: u32) -> &mut TileData {
        let index = self.index(col, row);
        self.tile_mut_at_index(index)
    }

    pub fn tile_mut_at_index(&mut self, index: usize) -> &mut TileData {
        let (w, h) = self.tile_dims_at_index(index);
        let bpp = self.bpp;
        let tile = &mut self.tiles[index];
        if let Tile::Blank = tile {
            *tile = Tile::Bitmap(Arc::new(TileData::new(w, h, bpp)));
        }
        match tile {
            Tile::Bitmap(td) => Arc::make_mut(td),
            Tile::Blank => unreachable!(),
        }
    }

    /// Make the tile slot at `index` another reference to the given tile.
    ///
    /// The source tile's dimensions must match the slot's.
    pub fn map(&mut self, index: usize, source: &Tile) -> Result<()> {
        if index >= self.tiles.len() {
            return Err(RasterError::NotFound);
        }
        if let Tile::Bitmap(td) = source {
            let (w, h) = self.tile_dims_at_index(index);
            if td.width() != w || td.height() != h || td.bpp() != self.bpp {
                return Err(RasterError::DimensionMismatch);
            }
        }
        self.tiles[index] = source.clone();
        Ok(())
    }

    /// Replace a tile slot with newly loaded content
    pub fn replace_tile(&mut self, index: usize, data: TileData) -> Result<()> {
        self.map(index, &Tile::Bitmap(Arc::new(data)))
    }

    pub fn share_count(&self, index: usize) -> usize {
        self.tiles[index].share_count()
    }

    /// Read a single pixel. The returned slice is `bpp` bytes long.
    pub fn pixel_at(&self, x: u32, y: u32) -> &[u8] {
        debug_assert!(x < self.width && y < self.height);
        let index = self.index(x / TILE_SIZE, y / TILE_SIZE);
        let (tw, _) = self.tile_dims_at_index(index);
        let offset = (((y % TILE_SIZE) * tw + x % TILE_SIZE) * self.bpp) as usize;
        let len = self.tile_bytes(index);
        &self.tiles[index].bytes(len)[offset..offset + self.bpp as usize]
    }

    pub fn set_pixel_at(&mut self, x: u32, y: u32, pixel: &[u8]) {
        debug_assert!(x < self.width && y < self.height);
        debug_assert_eq!(pixel.len(), self.bpp as usize);
        let bpp = self.bpp;
        let td = self.tile_mut(x / TILE_SIZE, y / TILE_SIZE);
        let offset = (((y % TILE_SIZE) * td.width() + x % TILE_SIZE) * bpp) as usize;
        td.pixels_mut()[offset..offset + bpp as usize].copy_from_slice(pixel);
    }

    /// Fill the whole store with a single pixel value.
    ///
    /// Filling with zero releases all tiles. Otherwise tiles of equal
    /// size share the same content.
    pub fn fill(&mut self, pixel: &[u8]) {
        debug_assert_eq!(pixel.len(), self.bpp as usize);
        if pixel.iter().all(|&b| b == 0) {
            self.clear();
            return;
        }

        let mut shared: Vec<Arc<TileData>> = Vec::new();
        for index in 0..self.tiles.len() {
            let (w, h) = self.tile_dims_at_index(index);
            let td = match shared.iter().find(|t| t.width() == w && t.height() == h) {
                Some(t) => t.clone(),
                None => {
                    let mut td = TileData::new(w, h, self.bpp);
                    td.fill(pixel);
                    let td = Arc::new(td);
                    shared.push(td.clone());
                    td
                }
            };
            self.tiles[index] = Tile::Bitmap(td);
        }
    }

    /// Release all tiles
    pub fn clear(&mut self) {
        self.tiles.iter_mut().for_each(|t| *t = Tile::Blank);
    }

    /// Check if every pixel of this store is zero
    pub fn is_blank(&self) -> bool {
        self.tiles.iter().all(Tile::is_blank)
    }

    /// Number of allocated tiles
    pub fn allocated_tiles(&self) -> usize {
        self.tiles
            .iter()
            .filter(|t| matches!(t, Tile::Bitmap(_)))
            .count()
    }

    /// Copy pixels of the given rectangle into a packed buffer
    pub fn to_pixels(&self, rect: &Rectangle) -> Result<Vec<u8>> {
        if !rect.in_bounds(self.size()) {
            return Err(RasterError::InvalidDimensions);
        }
        let bpp = self.bpp as usize;
        let mut pixels = vec![0u8; rect.area() * bpp];

        for (col, row) in self.tiles_in(rect) {
            let tile = self.tile(col, row);
            if let Tile::Blank = tile {
                continue;
            }
            let tilerect = self.tile_rect(col, row);
            let area = rect.intersected(&tilerect).unwrap_or(tilerect);
            let src = tile.rows(
                tilerect.w as usize * bpp,
                bpp,
                &area.offset(-tilerect.x, -tilerect.y),
            );
            let dest = RowIteratorMut::from_rectangle(
                &mut pixels,
                rect.w as usize * bpp,
                bpp,
                &area.offset(-rect.x, -rect.y),
            );
            dest.zip(src).for_each(|(d, s)| d.copy_from_slice(s));
        }

        Ok(pixels)
    }

    /// Write a packed pixel buffer into the given rectangle
    pub fn write_pixels(&mut self, rect: &Rectangle, pixels: &[u8]) -> Result<()> {
        if !rect.in_bounds(self.size()) {
            return Err(RasterError::InvalidDimensions);
        }
        let bpp = self.bpp as usize;
        if pixels.len() != rect.area() * bpp {
            return Err(RasterError::DimensionMismatch);
        }

        for (col, row) in self.tiles_in(rect) {
            let tilerect = self.tile_rect(col, row);
            let area = rect.intersected(&tilerect).unwrap_or(tilerect);
            let src = RowIterator::from_rectangle(
                pixels,
                rect.w as usize * bpp,
                bpp,
                &area.offset(-rect.x, -rect.y),
            );
            self.tile_mut(col, row)
                .rows_mut(&area.offset(-tilerect.x, -tilerect.y))
                .zip(src)
                .for_each(|(d, s)| d.copy_from_slice(s));
        }
        Ok(())
    }

    /// Grid positions of the tiles touched by the given rectangle
    fn tiles_in(&self, rect: &Rectangle) -> impl Iterator<Item = (u32, u32)> {
        let c0 = (rect.x / TILE_SIZEI) as u32;
        let c1 = (rect.right() / TILE_SIZEI) as u32;
        let r0 = (rect.y / TILE_SIZEI) as u32;
        let r1 = (rect.bottom() / TILE_SIZEI) as u32;
        (r0..=r1).flat_map(move |row| (c0..=c1).map(move |col| (col, row)))
    }

    /// Change the size of this store.
    ///
    /// The old content is moved by (dx, dy). Content that falls outside the
    /// new bounds is discarded and newly exposed area is zero.
    /// Whole tiles that land on an identically sized tile slot are shared
    /// rather than copied.
    pub fn resize(&mut self, width: u32, height: u32, dx: i32, dy: i32) -> Result<()> {
        let mut resized = TileStore::new(width, height, self.bpp)?;
        let new_size = resized.size();

        for (index, tile) in self.tiles.iter().enumerate() {
            let td = match tile {
                Tile::Bitmap(td) => td,
                Tile::Blank => continue,
            };
            let cols = self.cols() as usize;
            let source_rect = self.tile_rect((index % cols) as u32, (index / cols) as u32);
            let target_rect = source_rect.offset(dx, dy);
            let cropped = match target_rect.cropped(new_size) {
                Some(r) => r,
                None => continue,
            };

            for (col, row) in resized.tiles_in(&cropped) {
                let dest_rect = resized.tile_rect(col, row);
                if dest_rect == target_rect {
                    let i = resized.index(col, row);
                    resized.tiles[i] = tile.clone();
                    continue;
                }
                let subrect = match dest_rect.intersected(&target_rect) {
                    Some(r) => r,
                    None => continue,
                };
                let src = td.rows(&subrect.offset(-target_rect.x, -target_rect.y));
                resized
                    .tile_mut(col, row)
                    .rows_mut(&subrect.offset(-dest_rect.x, -dest_rect.y))
                    .zip(src)
                    .for_each(|(d, s)| d.copy_from_slice(s));
            }
        }

        *self = resized;
        Ok(())
    }
}

impl PartialEq for TileStore {
    fn eq(&self, other: &TileStore) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.bpp == other.bpp
            && self.tiles == other.tiles
    }
}
