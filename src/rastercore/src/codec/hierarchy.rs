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


//! Tile hierarchy serialization.
//!
//! A hierarchy describes one tile store:
//!
//! ```text
//! hierarchy: width u32, height u32, bpp u32, level pointer u32, 0u32
//! level:     width u32, height u32, tile pointer u32 × (cols × rows), 0u32
//! tiles:     one block per tile, in row-major order
//! ```
//!
//! All numbers are big-endian. Pointers are absolute stream offsets.
//! Only the full resolution level is stored.

use std::convert::TryFrom;
use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use tracing::{debug, warn};

use super::{rle, Compression, LoadOptions};
use crate::paint::tile::{Tile, TileData};
use crate::paint::tilestore::{TileStore, MAX_DIMENSION};
use crate::{RasterError, Result};

fn corrupt(msg: &str) -> RasterError {
    warn!("Corrupt tile hierarchy: {}", msg);
    RasterError::corrupt(msg)
}

fn pointer(pos: u64) -> Result<u32> {
    u32::try_from(pos).map_err(|_| RasterError::UnsupportedOperation("stream offset too large"))
}

/// Write a tile store as a hierarchy at the current stream position.
///
/// The stream is left positioned after the last tile block.
pub fn write_hierarchy<W>(writer: &mut W, store: &TileStore, compression: Compression) -> Result<()>
where
    W: Write + Seek,
{
    let start = writer.stream_position()?;
    writer.write_u32::<BigEndian>(store.width())?;
    writer.write_u32::<BigEndian>(store.height())?;
    writer.write_u32::<BigEndian>(store.bpp())?;
    writer.write_u32::<BigEndian>(pointer(start + 20)?)?;
    writer.write_u32::<BigEndian>(0)?;

    writer.write_u32::<BigEndian>(store.width())?;
    writer.write_u32::<BigEndian>(store.height())?;

    // Placeholders for the tile pointer table
    let table = writer.stream_position()?;
    for _ in 0..=store.tile_count() {
        writer.write_u32::<BigEndian>(0)?;
    }

    let bpp = store.bpp() as usize;
    let mut pointers = Vec::with_capacity(store.tile_count());
    let mut block = Vec::new();
    for (index, tile) in store.tiles().iter().enumerate() {
        pointers.push(pointer(writer.stream_position()?)?);
        let bytes = tile.bytes(store.tile_bytes(index));
        match compression {
            Compression::None => writer.write_all(bytes)?,
            Compression::Rle => {
                block.clear();
                rle::encode(bytes, bpp, &mut block);
                writer.write_all(&block)?;
            }
        }
    }

    let end = writer.stream_position()?;
    writer.seek(SeekFrom::Start(table))?;
    for p in pointers {
        writer.write_u32::<BigEndian>(p)?;
    }
    writer.seek(SeekFrom::Start(end))?;

    debug!(
        "Wrote {}x{} hierarchy ({} tiles, {} bytes)",
        store.width(),
        store.height(),
        store.tile_count(),
        end - start
    );
    Ok(())
}

struct Header {
    width: u32,
    height: u32,
    bpp: u32,
    level: u32,
}

fn read_header<R: Read>(reader: &mut R) -> Result<Header> {
    let width = reader.read_u32::<BigEndian>()?;
    let height = reader.read_u32::<BigEndian>()?;
    let bpp = reader.read_u32::<BigEndian>()?;
    let level = reader.read_u32::<BigEndian>()?;
    if level == 0 {
        return Err(corrupt("missing level pointer"));
    }
    // Lower resolution levels are not used
    let _next_level = reader.read_u32::<BigEndian>()?;
    Ok(Header {
        width,
        height,
        bpp,
        level,
    })
}

/// Read a hierarchy from the current stream position into a new tile store.
///
/// The tile pointer table is read before the store is allocated, so a
/// header claiming a huge surface fails on the short stream instead.
pub fn read_hierarchy<R>(reader: &mut R, compression: Compression, opts: &LoadOptions) -> Result<TileStore>
where
    R: Read + Seek,
{
    let header = read_header(reader)?;
    if header.width == 0
        || header.height == 0
        || header.width > MAX_DIMENSION
        || header.height > MAX_DIMENSION
    {
        return Err(corrupt("invalid dimensions"));
    }
    let pointers = read_tile_pointers(reader, &header)?;
    let mut store = TileStore::new(header.width, header.height, header.bpp)
        .map_err(|_| corrupt("invalid dimensions"))?;
    read_tiles(reader, &pointers, &mut store, compression, opts)?;
    Ok(store)
}

/// Read a hierarchy into an existing tile store.
///
/// The hierarchy's dimensions must match the store's.
pub fn read_hierarchy_into<R>(
    reader: &mut R,
    store: &mut TileStore,
    compression: Compression,
    opts: &LoadOptions,
) -> Result<()>
where
    R: Read + Seek,
{
    let header = read_header(reader)?;
    if header.width != store.width() || header.height != store.height() || header.bpp != store.bpp() {
        return Err(corrupt("hierarchy dimensions do not match the tile store"));
    }
    let pointers = read_tile_pointers(reader, &header)?;
    read_tiles(reader, &pointers, store, compression, opts)
}

fn read_tile_pointers<R>(reader: &mut R, header: &Header) -> Result<Vec<u32>>
where
    R: Read + Seek,
{
    reader.seek(SeekFrom::Start(header.level as u64))?;
    let width = reader.read_u32::<BigEndian>()?;
    let height = reader.read_u32::<BigEndian>()?;
    if width != header.width || height != header.height {
        return Err(corrupt("level dimensions do not match the hierarchy"));
    }

    let count = Tile::div_up(width) as usize * Tile::div_up(height) as usize;
    // Grows with what the stream actually holds
    let mut pointers = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let p = reader.read_u32::<BigEndian>()?;
        if p == 0 {
            return Err(corrupt("tile pointer table ended early"));
        }
        if let Some(&last) = pointers.last() {
            if p <= last {
                return Err(corrupt("tile pointers out of order"));
            }
        }
        pointers.push(p);
    }
    Ok(pointers)
}

fn read_tiles<R>(
    reader: &mut R,
    pointers: &[u32],
    store: &mut TileStore,
    compression: Compression,
    opts: &LoadOptions,
) -> Result<()>
where
    R: Read + Seek,
{
    let count = store.tile_count();
    debug_assert_eq!(pointers.len(), count);
    let bpp = store.bpp() as usize;
    let mut block = Vec::new();
    for index in 0..count {
        let raw_len = store.tile_bytes(index);
        let start = pointers[index] as u64;
        reader.seek(SeekFrom::Start(start))?;

        // Worst case RLE output is a little over the raw size
        let max_len = raw_len * 2 + 16;
        block.clear();
        match pointers.get(index + 1) {
            Some(&next) => {
                let len = (next as u64 - start) as usize;
                if len > max_len {
                    return Err(corrupt("tile block too large"));
                }
                block.resize(len, 0);
                reader.read_exact(&mut block)?;
            }
            None => {
                // The last block has no successor to bound it
                reader.by_ref().take(max_len as u64).read_to_end(&mut block)?;
            }
        }

        let mut pixels = vec![0u8; raw_len];
        match compression {
            Compression::None => {
                if block.len() < raw_len {
                    return Err(corrupt("tile block too short"));
                }
                pixels.copy_from_slice(&block[..raw_len]);
            }
            Compression::Rle => {
                rle::decode(&block, bpp, &mut pixels).map_err(|e| {
                    warn!("Tile {} of hierarchy: {}", index, e);
                    e
                })?;
            }
        }

        if opts.dedup_tiles && index > 0 {
            let prev = store.tile_at_index(index - 1);
            if store.tile_dims_at_index(index - 1) == store.tile_dims_at_index(index)
                && prev.bytes(raw_len) == &pixels[..]
            {
                let prev = prev.clone();
                store.map(index, &prev)?;
                continue;
            }
        }

        if pixels.iter().all(|&b| b == 0) {
            store.map(index, &Tile::Blank)?;
        } else {
            let (w, h) = store.tile_dims_at_index(index);
            let data = TileData::from_bytes(w, h, store.bpp(), pixels)
                .ok_or_else(|| corrupt("tile size mismatch"))?;
            store.replace_tile(index, data)?;
        }
    }

    debug!("Read {}x{} hierarchy ({} tiles)", store.width(), store.height(), count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> TileStore {
        let mut s = TileStore::new(130, 70, 2).unwrap();
        s.fill(&[10, 255]);
        s.set_pixel_at(129, 69, &[1, 2]);
        s.set_pixel_at(3, 3, &[0, 0]);
        s
    }

    #[test]
    fn test_roundtrip() {
        for compression in [Compression::None, Compression::Rle] {
            let store = sample();
            let mut buf = Cursor::new(Vec::new());
            write_hierarchy(&mut buf, &store, compression).unwrap();
            buf.set_position(0);
            let loaded = read_hierarchy(&mut buf, compression, &LoadOptions::default()).unwrap();
            assert_eq!(loaded, store);
        }
    }

    #[test]
    fn test_dedup() {
        let mut store = TileStore::new(128, 64, 1).unwrap();
        store.fill(&[7]);
        let mut buf = Cursor::new(Vec::new());
        write_hierarchy(&mut buf, &store, Compression::Rle).unwrap();

        buf.set_position(0);
        let shared = read_hierarchy(&mut buf, Compression::Rle, &LoadOptions::default()).unwrap();
        assert_eq!(shared.share_count(0), 2);

        buf.set_position(0);
        let opts = LoadOptions::default().with_dedup_tiles(false);
        let unshared = read_hierarchy(&mut buf, Compression::Rle, &opts).unwrap();
        assert_eq!(unshared.share_count(0), 1);
        assert_eq!(shared, unshared);
    }

    #[test]
    fn test_zero_pointer() {
        let store = sample();
        let mut buf = Cursor::new(Vec::new());
        write_hierarchy(&mut buf, &store, Compression::Rle).unwrap();
        let mut bytes = buf.into_inner();
        // Second tile pointer
        let at = 20 + 8 + 4;
        bytes[at..at + 4].copy_from_slice(&[0, 0, 0, 0]);
        let r = read_hierarchy(&mut Cursor::new(bytes), Compression::Rle, &LoadOptions::default());
        assert!(matches!(r, Err(RasterError::CorruptStream(_))));
    }

    #[test]
    fn test_dimension_mismatch() {
        let store = sample();
        let mut buf = Cursor::new(Vec::new());
        write_hierarchy(&mut buf, &store, Compression::None).unwrap();
        buf.set_position(0);
        let mut other = TileStore::new(70, 130, 2).unwrap();
        let r = read_hierarchy_into(&mut buf, &mut other, Compression::None, &LoadOptions::default());
        assert!(matches!(r, Err(RasterError::CorruptStream(_))));
    }

    #[test]
    fn test_truncated() {
        let store = sample();
        let mut buf = Cursor::new(Vec::new());
        write_hierarchy(&mut buf, &store, Compression::None).unwrap();
        let mut bytes = buf.into_inner();
        bytes.truncate(bytes.len() - 10);
        let r = read_hierarchy(&mut Cursor::new(bytes), Compression::None, &LoadOptions::default());
        assert!(matches!(r, Err(RasterError::CorruptStream(_))));
    }
}
