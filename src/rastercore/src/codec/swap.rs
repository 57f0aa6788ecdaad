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


//! Swapping tile stores out of memory.
//!
//! Swapped stores are written as RLE compressed hierarchies into an
//! anonymous temporary file, which the operating system deletes once
//! it is closed. Space given back by `swap_in` is reused by later
//! swap-outs, and a free tail is truncated.

use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use tracing::debug;

use super::hierarchy::{read_hierarchy, write_hierarchy};
use super::{Compression, LoadOptions};
use crate::paint::tilestore::TileStore;
use crate::{RasterError, Result};

pub struct SwapFile {
    file: File,
    end: u64,

    /// Released extents as (offset, length), sorted and never adjacent
    free: Vec<(u64, u64)>,
}

/// A handle to a tile store that currently lives in a swap file.
///
/// It holds no pixel memory of its own.
#[derive(Debug)]
pub struct SwappedTiles {
    width: u32,
    height: u32,
    bpp: u32,
    offset: u64,
    len: u64,
}

impl SwapFile {
    pub fn new() -> Result<SwapFile> {
        Ok(SwapFile {
            file: tempfile::tempfile()?,
            end: 0,
            free: Vec::new(),
        })
    }

    /// Size of the swap file, including released space not yet reused
    pub fn len(&self) -> u64 {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end == 0
    }

    // First fit from the free list, else grow the file
    fn allocate(&mut self, len: u64) -> u64 {
        match self.free.iter().position(|&(_, l)| l >= len) {
            Some(i) => {
                let (offset, l) = self.free[i];
                if l == len {
                    self.free.remove(i);
                } else {
                    self.free[i] = (offset + len, l - len);
                }
                offset
            }
            None => {
                let offset = self.end;
                self.end += len;
                offset
            }
        }
    }

    fn release(&mut self, offset: u64, len: u64) -> Result<()> {
        let i = self.free.partition_point(|&(o, _)| o < offset);
        self.free.insert(i, (offset, len));
        if i + 1 < self.free.len() && offset + len == self.free[i + 1].0 {
            self.free[i].1 += self.free[i + 1].1;
            self.free.remove(i + 1);
        }
        if i > 0 && self.free[i - 1].0 + self.free[i - 1].1 == offset {
            self.free[i - 1].1 += self.free[i].1;
            self.free.remove(i);
        }

        if let Some(&(o, l)) = self.free.last() {
            if o + l == self.end {
                self.free.pop();
                self.end = o;
                self.file.set_len(o)?;
            }
        }
        Ok(())
    }
}

/// Write a tile store to the swap file and release its memory
pub fn swap_out(store: TileStore, swap: &mut SwapFile) -> Result<SwappedTiles> {
    // Hierarchy pointers are relative to the start of the block
    let mut block = Cursor::new(Vec::new());
    write_hierarchy(&mut block, &store, Compression::Rle)?;
    let block = block.into_inner();
    let len = block.len() as u64;

    let offset = swap.allocate(len);
    swap.file.seek(SeekFrom::Start(offset))?;
    swap.file.write_all(&block)?;

    debug!(
        "Swapped out {}x{} store ({} bytes at {})",
        store.width(),
        store.height(),
        len,
        offset
    );
    Ok(SwappedTiles {
        width: store.width(),
        height: store.height(),
        bpp: store.bpp(),
        offset,
        len,
    })
}

impl SwappedTiles {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Size of the swapped data in the swap file
    pub fn swapped_len(&self) -> u64 {
        self.len
    }

    /// Read the tile store back from the swap file.
    ///
    /// The space it took is released even if reading fails.
    pub fn swap_in(self, swap: &mut SwapFile) -> Result<TileStore> {
        let mut block = vec![0; self.len as usize];
        let read = swap
            .file
            .seek(SeekFrom::Start(self.offset))
            .and_then(|_| swap.file.read_exact(&mut block));
        swap.release(self.offset, self.len)?;
        read?;

        let store = read_hierarchy(&mut Cursor::new(block), Compression::Rle, &LoadOptions::default())?;
        if store.width() != self.width || store.height() != self.height || store.bpp() != self.bpp {
            return Err(RasterError::corrupt("swapped store changed size"));
        }
        Ok(store)
    }
}

impl TileStore {
    /// Move this store's content into a swap file
    pub fn swap_out(self, swap: &mut SwapFile) -> Result<SwappedTiles> {
        swap_out(self, swap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_roundtrip() {
        let mut swap = SwapFile::new().unwrap();
        let mut a = TileStore::new(100, 80, 4).unwrap();
        a.fill(&[1, 2, 3, 4]);
        a.set_pixel_at(99, 79, &[9, 9, 9, 9]);
        let b = TileStore::new(10, 10, 1).unwrap();

        let a_copy = a.clone();
        let swapped_a = a.swap_out(&mut swap).unwrap();
        let swapped_b = b.swap_out(&mut swap).unwrap();
        assert!(swap.len() > swapped_a.swapped_len());

        // Swap in out of order
        let b = swapped_b.swap_in(&mut swap).unwrap();
        assert!(b.is_blank());
        let a = swapped_a.swap_in(&mut swap).unwrap();
        assert_eq!(a, a_copy);
        assert!(swap.is_empty());
    }

    #[test]
    fn test_space_is_reused() {
        let mut swap = SwapFile::new().unwrap();
        let mut a = TileStore::new(100, 80, 4).unwrap();
        a.fill(&[1, 2, 3, 4]);
        let b = TileStore::new(10, 10, 1).unwrap();

        let swapped_a = a.clone().swap_out(&mut swap).unwrap();
        let swapped_b = b.swap_out(&mut swap).unwrap();
        let full = swap.len();

        // The front extent is free but the file cannot shrink yet
        assert_eq!(swapped_a.swap_in(&mut swap).unwrap(), a);
        assert_eq!(swap.len(), full);

        let swapped_a = a.clone().swap_out(&mut swap).unwrap();
        assert_eq!(swap.len(), full);

        let b_len = swapped_b.swapped_len();
        assert!(swapped_b.swap_in(&mut swap).unwrap().is_blank());
        assert_eq!(swap.len(), full - b_len);

        assert_eq!(swapped_a.swap_in(&mut swap).unwrap(), a);
        assert!(swap.is_empty());
    }
}
