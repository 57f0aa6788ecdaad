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


use super::tile::TILE_SIZEI;
use super::Rectangle;

/// Maximum number of regions that can be walked in lockstep
pub const MAX_WALK_REGIONS: usize = 3;

/// Chunk geometry of a synchronized walk over one or more regions.
///
/// All regions have the same size, but each starts at its own position
/// in its own tile grid. The iterator yields rectangles in region-local
/// coordinates, row by row. Each rectangle is the largest one that stays
/// inside a single tile of every participating store.
#[derive(Clone, Debug)]
pub struct ChunkGrid {
    width: i32,
    height: i32,
    origins: [(i32, i32); MAX_WALK_REGIONS],
    count: usize,
    x: i32,
    y: i32,
    band: i32,
}

fn to_tile_edge(pos: i32) -> i32 {
    TILE_SIZEI - pos.rem_euclid(TILE_SIZEI)
}

impl ChunkGrid {
    /// Create a new chunk grid.
    ///
    /// The `origins` are the top-left corners of each region in
    /// its store's coordinate space.
    pub fn new(width: i32, height: i32, origins: &[(i32, i32)]) -> ChunkGrid {
        assert!(!origins.is_empty() && origins.len() <= MAX_WALK_REGIONS);
        let mut o = [(0, 0); MAX_WALK_REGIONS];
        o[..origins.len()].copy_from_slice(origins);
        ChunkGrid {
            width,
            height,
            origins: o,
            count: origins.len(),
            x: 0,
            y: 0,
            band: 0,
        }
    }

    fn origins(&self) -> &[(i32, i32)] {
        &self.origins[..self.count]
    }
}

impl Iterator for ChunkGrid {
    type Item = Rectangle;

    fn next(&mut self) -> Option<Rectangle> {
        if self.width <= 0 || self.y >= self.height {
            return None;
        }

        let (x, y) = (self.x, self.y);
        if x == 0 {
            self.band = self
                .origins()
                .iter()
                .map(|&(_, oy)| to_tile_edge(oy + y))
                .fold(self.height - y, i32::min);
        }

        let w = self
            .origins()
            .iter()
            .map(|&(ox, _)| to_tile_edge(ox + x))
            .fold(self.width - x, i32::min);

        self.x += w;
        if self.x >= self.width {
            self.x = 0;
            self.y += self.band;
        }

        Some(Rectangle::new(x, y, w, self.band))
    }
}
