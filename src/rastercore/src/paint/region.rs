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


//! Pixel regions: cursors over a rectangle of a tile store.
//!
//! A region hands out its pixels one tile-aligned chunk at a time, so at most
//! one tile per participating region is touched at once. Walking several
//! regions in lockstep splits chunks wherever any of the underlying tile
//! grids has a boundary.

use super::rectiter::{RowIterator, RowIteratorMut};
use super::tile::TILE_SIZEI;
use super::tileiter::ChunkGrid;
use super::tilestore::TileStore;
use super::Rectangle;
use crate::{RasterError, Result};

/// A read-only view of part of one tile
pub struct Chunk<'a> {
    /// Position of this chunk relative to the region's top-left corner
    pub local: Rectangle,
    /// Position of this chunk in the store
    pub rect: Rectangle,
    pub bpp: usize,
    rowstride: usize,
    in_tile: Rectangle,
    data: &'a [u8],
}

/// A writable view of part of one tile
pub struct ChunkMut<'a> {
    pub local: Rectangle,
    pub rect: Rectangle,
    pub bpp: usize,
    rowstride: usize,
    in_tile: Rectangle,
    data: &'a mut [u8],
}

impl<'a> Chunk<'a> {
    pub fn rowstride(&self) -> usize {
        self.rowstride
    }

    pub fn rows(&self) -> RowIterator<'a> {
        RowIterator::from_rectangle(self.data, self.rowstride, self.bpp, &self.in_tile)
    }
}

impl<'a> ChunkMut<'a> {
    pub fn rowstride(&self) -> usize {
        self.rowstride
    }

    pub fn rows(&self) -> RowIterator {
        RowIterator::from_rectangle(self.data, self.rowstride, self.bpp, &self.in_tile)
    }

    pub fn rows_mut(&mut self) -> RowIteratorMut {
        RowIteratorMut::from_rectangle(self.data, self.rowstride, self.bpp, &self.in_tile)
    }
}

fn check_rect(store: &TileStore, rect: &Rectangle) -> Result<()> {
    if rect.in_bounds(store.size()) {
        Ok(())
    } else {
        Err(RasterError::InvalidDimensions)
    }
}

// Grid position of the tile containing the given store coordinate
fn tile_of(r: &Rectangle) -> (u32, u32) {
    debug_assert!(r.x / TILE_SIZEI == r.right() / TILE_SIZEI);
    debug_assert!(r.y / TILE_SIZEI == r.bottom() / TILE_SIZEI);
    ((r.x / TILE_SIZEI) as u32, (r.y / TILE_SIZEI) as u32)
}

#[derive(Clone, Copy)]
pub struct PixelRegion<'a> {
    store: &'a TileStore,
    rect: Rectangle,
}

impl<'a> PixelRegion<'a> {
    /// Open a read cursor over a rectangle of the store.
    ///
    /// The rectangle must be fully inside the store.
    pub fn new(store: &'a TileStore, rect: Rectangle) -> Result<Self> {
        check_rect(store, &rect)?;
        Ok(Self { store, rect })
    }

    /// Open a read cursor over the whole store
    pub fn whole(store: &'a TileStore) -> Self {
        Self {
            store,
            rect: store.bounds(),
        }
    }

    pub fn rect(&self) -> Rectangle {
        self.rect
    }

    pub fn bpp(&self) -> usize {
        self.store.bpp() as usize
    }

    pub fn store(&self) -> &'a TileStore {
        self.store
    }

    /// Get the chunk at the given region-local rectangle.
    ///
    /// The rectangle must not cross a tile boundary.
    pub fn chunk(&self, local: &Rectangle) -> Chunk<'a> {
        let rect = local.offset(self.rect.x, self.rect.y);
        let (col, row) = tile_of(&rect);
        let tile_rect = self.store.tile_rect(col, row);
        let index = self.store.index(col, row);
        let bpp = self.bpp();
        Chunk {
            local: *local,
            rect,
            bpp,
            rowstride: tile_rect.w as usize * bpp,
            in_tile: rect.offset(-tile_rect.x, -tile_rect.y),
            data: self
                .store
                .tile_at_index(index)
                .bytes(self.store.tile_bytes(index)),
        }
    }

    /// Iterate through the tile-aligned chunks of this region
    pub fn chunks(&self) -> Chunks<'a> {
        Chunks {
            region: *self,
            grid: ChunkGrid::new(self.rect.w, self.rect.h, &[(self.rect.x, self.rect.y)]),
        }
    }
}

pub struct Chunks<'a> {
    region: PixelRegion<'a>,
    grid: ChunkGrid,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;
    fn next(&mut self) -> Option<Chunk<'a>> {
        self.grid.next().map(|local| self.region.chunk(&local))
    }
}

pub struct PixelRegionMut<'a> {
    store: &'a mut TileStore,
    rect: Rectangle,
}

impl<'a> PixelRegionMut<'a> {
    /// Open a write cursor over a rectangle of the store.
    ///
    /// Each tile touched through this cursor is allocated or
    /// privatized on access.
    pub fn new(store: &'a mut TileStore, rect: Rectangle) -> Result<Self> {
        check_rect(store, &rect)?;
        Ok(Self { store, rect })
    }

    pub fn whole(store: &'a mut TileStore) -> Self {
        let rect = store.bounds();
        Self { store, rect }
    }

    pub fn rect(&self) -> Rectangle {
        self.rect
    }

    pub fn bpp(&self) -> usize {
        self.store.bpp() as usize
    }

    pub fn chunk_mut(&mut self, local: &Rectangle) -> ChunkMut {
        let rect = local.offset(self.rect.x, self.rect.y);
        let (col, row) = tile_of(&rect);
        let tile_rect = self.store.tile_rect(col, row);
        let bpp = self.bpp();
        ChunkMut {
            local: *local,
            rect,
            bpp,
            rowstride: tile_rect.w as usize * bpp,
            in_tile: rect.offset(-tile_rect.x, -tile_rect.y),
            data: self.store.tile_mut(col, row).pixels_mut(),
        }
    }

    pub fn for_each_chunk_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(ChunkMut),
    {
        for local in ChunkGrid::new(self.rect.w, self.rect.h, &[(self.rect.x, self.rect.y)]) {
            f(self.chunk_mut(&local));
        }
    }

    /// Like `for_each_chunk_mut`, but stops at the first error
    pub fn try_for_each_chunk_mut<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(ChunkMut) -> Result<()>,
    {
        for local in ChunkGrid::new(self.rect.w, self.rect.h, &[(self.rect.x, self.rect.y)]) {
            f(self.chunk_mut(&local))?;
        }
        Ok(())
    }
}

fn same_size(a: &Rectangle, b: &Rectangle) -> Result<()> {
    if a.w == b.w && a.h == b.h {
        Ok(())
    } else {
        Err(RasterError::DimensionMismatch)
    }
}

/// Walk a source and a destination region in lockstep
pub fn walk2<F>(src: &PixelRegion, dst: &mut PixelRegionMut, mut f: F) -> Result<()>
where
    F: FnMut(Chunk, ChunkMut),
{
    same_size(&src.rect, &dst.rect)?;
    let grid = ChunkGrid::new(
        src.rect.w,
        src.rect.h,
        &[(src.rect.x, src.rect.y), (dst.rect.x, dst.rect.y)],
    );
    for local in grid {
        f(src.chunk(&local), dst.chunk_mut(&local));
    }
    Ok(())
}

/// Walk a source, a mask and a destination region in lockstep
pub fn walk3<F>(
    src: &PixelRegion,
    mask: &PixelRegion,
    dst: &mut PixelRegionMut,
    mut f: F,
) -> Result<()>
where
    F: FnMut(Chunk, Chunk, ChunkMut),
{
    same_size(&src.rect, &dst.rect)?;
    same_size(&mask.rect, &dst.rect)?;
    let grid = ChunkGrid::new(
        src.rect.w,
        src.rect.h,
        &[
            (src.rect.x, src.rect.y),
            (mask.rect.x, mask.rect.y),
            (dst.rect.x, dst.rect.y),
        ],
    );
    for local in grid {
        f(src.chunk(&local), mask.chunk(&local), dst.chunk_mut(&local));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_bounds() {
        let store = TileStore::new(100, 100, 1).unwrap();
        assert!(PixelRegion::new(&store, Rectangle::new(50, 50, 50, 50)).is_ok());
        assert!(matches!(
            PixelRegion::new(&store, Rectangle::new(51, 50, 50, 50)),
            Err(RasterError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_chunks_cover_region() {
        let store = TileStore::new(200, 100, 3).unwrap();
        let region = PixelRegion::new(&store, Rectangle::new(10, 20, 150, 70)).unwrap();
        let mut area = 0;
        for chunk in region.chunks() {
            assert_eq!(chunk.rows().count(), chunk.rect.h as usize);
            assert!(chunk.rows().all(|r| r.len() == chunk.rect.w as usize * 3));
            area += chunk.rect.area();
        }
        assert_eq!(area, 150 * 70);

        // Reopening restarts iteration
        assert_eq!(region.chunks().count(), region.chunks().count());
    }

    #[test]
    fn test_walk2_copies_misaligned() {
        let mut src = TileStore::new(130, 10, 1).unwrap();
        for x in 0..130 {
            src.set_pixel_at(x, 5, &[x as u8]);
        }
        let mut dst = TileStore::new(200, 20, 1).unwrap();

        let sr = PixelRegion::new(&src, Rectangle::new(0, 0, 130, 10)).unwrap();
        let mut dr = PixelRegionMut::new(&mut dst, Rectangle::new(37, 3, 130, 10)).unwrap();
        walk2(&sr, &mut dr, |s, mut d| {
            d.rows_mut().zip(s.rows()).for_each(|(d, s)| d.copy_from_slice(s));
        })
        .unwrap();

        for x in 0..130 {
            assert_eq!(dst.pixel_at(x + 37, 8), &[x as u8]);
        }
        assert_eq!(dst.pixel_at(36, 8), &[0]);
    }

    #[test]
    fn test_walk_size_mismatch() {
        let src = TileStore::new(10, 10, 1).unwrap();
        let mut dst = TileStore::new(10, 10, 1).unwrap();
        let sr = PixelRegion::new(&src, Rectangle::new(0, 0, 5, 5)).unwrap();
        let mut dr = PixelRegionMut::new(&mut dst, Rectangle::new(0, 0, 6, 5)).unwrap();
        assert!(matches!(
            walk2(&sr, &mut dr, |_, _| ()),
            Err(RasterError::DimensionMismatch)
        ));
    }
}
