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


//! Persistence: run-length encoding, tile hierarchies, image files
//! and the tile swap file.

pub mod hierarchy;
pub mod imagefile;
pub mod rle;
pub mod swap;

use num_enum::{IntoPrimitive, TryFromPrimitive};

pub use hierarchy::{read_hierarchy, read_hierarchy_into, write_hierarchy};
pub use imagefile::{load_image, load_image_file, save_image, save_image_file, LoadedImage};
pub use swap::{SwapFile, SwappedTiles};

/// How tile blocks are stored
#[derive(Copy, Clone, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Compression {
    None = 0,
    Rle = 1,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SaveOptions {
    pub compression: Compression,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            compression: Compression::Rle,
        }
    }
}

impl SaveOptions {
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LoadOptions {
    /// Share identical consecutive tiles instead of storing copies
    pub dedup_tiles: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { dedup_tiles: true }
    }
}

impl LoadOptions {
    pub fn with_dedup_tiles(mut self, dedup: bool) -> Self {
        self.dedup_tiles = dedup;
        self
    }
}
