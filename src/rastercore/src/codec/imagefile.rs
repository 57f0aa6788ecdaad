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


//! Whole image files.
//!
//! ```text
//! magic "RCIMG\0", version u16
//! width u32, height u32, base color type u8, compression u8
//! colormap: count u32, count × rgb
//! layer pointers u32 ..., 0
//! channel pointers u32 ..., 0
//! selection hierarchy pointer u32
//! layer and channel records
//! ```
//!
//! Layers are stored topmost first. All numbers are big-endian.

use std::convert::TryFrom;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use tracing::{info, warn};

use super::hierarchy::{read_hierarchy, read_hierarchy_into, write_hierarchy};
use super::{Compression, LoadOptions, SaveOptions};
use crate::paint::color::{ColorType, PixelFormat};
use crate::paint::{Blendmode, Channel, Image, Layer, LayerMask};
use crate::{RasterError, Result};

const MAGIC: &[u8; 6] = b"RCIMG\0";
const VERSION: u16 = 1;
const MAX_NAME_LEN: u32 = 0x10000;
const MAX_COLORMAP: u32 = 256;

/// The result of loading an image.
///
/// Loading is best effort: if a layer or channel is corrupt, loading
/// stops there and the problem is reported in `warnings`.
#[derive(Debug)]
pub struct LoadedImage {
    pub image: Image,
    pub warnings: Vec<String>,
}

fn corrupt(msg: &str) -> RasterError {
    warn!("Corrupt image file: {}", msg);
    RasterError::corrupt(msg)
}

fn pointer(pos: u64) -> Result<u32> {
    u32::try_from(pos).map_err(|_| RasterError::UnsupportedOperation("stream offset too large"))
}

fn write_name<W: Write>(writer: &mut W, name: &str) -> Result<()> {
    writer.write_u32::<BigEndian>(name.len() as u32)?;
    writer.write_all(name.as_bytes())?;
    Ok(())
}

fn read_name<R: Read>(reader: &mut R) -> Result<String> {
    let len = reader.read_u32::<BigEndian>()?;
    if len > MAX_NAME_LEN {
        return Err(corrupt("name too long"));
    }
    let mut buf = vec![0; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

// Overwrite a placeholder written earlier, then return to the end of the stream
fn patch_u32<W: Write + Seek>(writer: &mut W, at: u64, value: u32) -> Result<()> {
    let end = writer.stream_position()?;
    writer.seek(SeekFrom::Start(at))?;
    writer.write_u32::<BigEndian>(value)?;
    writer.seek(SeekFrom::Start(end))?;
    Ok(())
}

/// Save an image.
///
/// An image with a floating selection cannot be saved: anchor it
/// or turn it into a layer first.
pub fn save_image<W>(writer: &mut W, image: &Image, opts: &SaveOptions) -> Result<()>
where
    W: Write + Seek,
{
    if image.floating_layer().is_some() {
        return Err(RasterError::UnsupportedOperation(
            "cannot save an image with a floating selection",
        ));
    }

    writer.write_all(MAGIC)?;
    writer.write_u16::<BigEndian>(VERSION)?;
    writer.write_u32::<BigEndian>(image.width())?;
    writer.write_u32::<BigEndian>(image.height())?;
    writer.write_u8(image.base_type().into())?;
    writer.write_u8(opts.compression.into())?;

    writer.write_u32::<BigEndian>(image.colormap().len() as u32)?;
    for rgb in image.colormap() {
        writer.write_all(rgb)?;
    }

    // Placeholders for the pointer tables
    let layer_table = writer.stream_position()?;
    for _ in 0..=image.layers().len() {
        writer.write_u32::<BigEndian>(0)?;
    }
    let channel_table = writer.stream_position()?;
    for _ in 0..=image.channels().len() {
        writer.write_u32::<BigEndian>(0)?;
    }
    let selection_ptr = writer.stream_position()?;
    writer.write_u32::<BigEndian>(0)?;

    for (i, layer) in image.layers().iter().enumerate() {
        let pos = pointer(writer.stream_position()?)?;
        patch_u32(writer, layer_table + i as u64 * 4, pos)?;
        write_layer(writer, layer, opts.compression)?;
    }

    for (i, channel) in image.channels().iter().enumerate() {
        let pos = pointer(writer.stream_position()?)?;
        patch_u32(writer, channel_table + i as u64 * 4, pos)?;
        write_channel(writer, channel, opts.compression)?;
    }

    if !image.selection().tiles().is_blank() {
        let pos = pointer(writer.stream_position()?)?;
        patch_u32(writer, selection_ptr, pos)?;
        write_hierarchy(writer, image.selection().tiles(), opts.compression)?;
    }

    info!(
        "Saved {}x{} image with {} layers and {} channels",
        image.width(),
        image.height(),
        image.layers().len(),
        image.channels().len()
    );
    Ok(())
}

fn write_layer<W: Write + Seek>(writer: &mut W, layer: &Layer, compression: Compression) -> Result<()> {
    let (x, y) = layer.drawable().offset();
    write_name(writer, layer.name())?;
    writer.write_i32::<BigEndian>(x)?;
    writer.write_i32::<BigEndian>(y)?;
    writer.write_u8(layer.format().has_alpha as u8)?;
    writer.write_u8(layer.opacity)?;
    writer.write_u8(layer.mode.into())?;
    writer.write_u8(layer.is_visible() as u8)?;
    writer.write_u8(layer.preserve_alpha as u8)?;

    let mask_ptr = writer.stream_position()?;
    writer.write_u32::<BigEndian>(0)?;
    write_hierarchy(writer, layer.tiles(), compression)?;

    if let Some(mask) = layer.mask() {
        let pos = pointer(writer.stream_position()?)?;
        patch_u32(writer, mask_ptr, pos)?;
        write_name(writer, mask.drawable().name())?;
        writer.write_u8(mask.apply as u8)?;
        writer.write_u8(mask.show as u8)?;
        writer.write_u8(mask.edit as u8)?;
        write_hierarchy(writer, mask.tiles(), compression)?;
    }
    Ok(())
}

fn write_channel<W: Write + Seek>(
    writer: &mut W,
    channel: &Channel,
    compression: Compression,
) -> Result<()> {
    write_name(writer, channel.drawable().name())?;
    writer.write_all(&channel.color)?;
    writer.write_u8(channel.opacity)?;
    writer.write_u8(channel.drawable().visible as u8)?;
    write_hierarchy(writer, channel.drawable().tiles(), compression)
}

fn read_pointers<R: Read>(reader: &mut R) -> Result<Vec<u32>> {
    let mut pointers = Vec::new();
    loop {
        match reader.read_u32::<BigEndian>()? {
            0 => return Ok(pointers),
            p => pointers.push(p),
        }
    }
}

/// Load an image.
///
/// A broken file header is an error. A broken layer or channel is not:
/// everything read before it is kept and a warning is returned.
pub fn load_image<R>(reader: &mut R, opts: &LoadOptions) -> Result<LoadedImage>
where
    R: Read + Seek,
{
    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(corrupt("not an image file"));
    }
    let version = reader.read_u16::<BigEndian>()?;
    if version != VERSION {
        return Err(corrupt("unsupported file version"));
    }

    let width = reader.read_u32::<BigEndian>()?;
    let height = reader.read_u32::<BigEndian>()?;
    let base = ColorType::try_from(reader.read_u8()?).map_err(|_| corrupt("unknown color type"))?;
    let compression =
        Compression::try_from(reader.read_u8()?).map_err(|_| corrupt("unknown compression"))?;

    let mut image = Image::new(width, height, base).map_err(|_| corrupt("invalid image size"))?;

    let colors = reader.read_u32::<BigEndian>()?;
    if colors > MAX_COLORMAP {
        return Err(corrupt("colormap too large"));
    }
    let mut colormap = Vec::with_capacity(colors as usize);
    for _ in 0..colors {
        let mut rgb = [0u8; 3];
        reader.read_exact(&mut rgb)?;
        colormap.push(rgb);
    }
    image.set_colormap(colormap);

    let layer_pointers = read_pointers(reader)?;
    let channel_pointers = read_pointers(reader)?;
    let selection_pointer = reader.read_u32::<BigEndian>()?;

    let mut warnings = Vec::new();
    let mut intact = true;

    for (i, &p) in layer_pointers.iter().enumerate() {
        let result = read_layer(reader, p, base, compression, opts)
            .and_then(|layer| image.add_layer(layer, usize::MAX));
        if let Err(e) = result {
            warn!("Stopped loading at layer {}: {}", i, e);
            warnings.push(format!("layer {}: {}", i, e));
            intact = false;
            break;
        }
    }

    if intact {
        for (i, &p) in channel_pointers.iter().enumerate() {
            let result = read_channel(reader, p, compression, opts)
                .and_then(|channel| image.add_channel(channel, usize::MAX));
            if let Err(e) = result {
                warn!("Stopped loading at channel {}: {}", i, e);
                warnings.push(format!("channel {}: {}", i, e));
                intact = false;
                break;
            }
        }
    }

    if intact && selection_pointer != 0 {
        let result = reader
            .seek(SeekFrom::Start(selection_pointer as u64))
            .map_err(RasterError::from)
            .and_then(|_| {
                read_hierarchy_into(
                    reader,
                    image.selection_mut().tiles_mut(),
                    compression,
                    opts,
                )
            });
        if let Err(e) = result {
            warn!("Could not load the selection: {}", e);
            warnings.push(format!("selection: {}", e));
            image.selection_mut().tiles_mut().clear();
        }
    }

    info!(
        "Loaded {}x{} image with {} layers and {} channels ({} warnings)",
        width,
        height,
        image.layers().len(),
        image.channels().len(),
        warnings.len()
    );
    Ok(LoadedImage { image, warnings })
}

fn read_layer<R: Read + Seek>(
    reader: &mut R,
    pos: u32,
    base: ColorType,
    compression: Compression,
    opts: &LoadOptions,
) -> Result<Layer> {
    reader.seek(SeekFrom::Start(pos as u64))?;
    let name = read_name(reader)?;
    let x = reader.read_i32::<BigEndian>()?;
    let y = reader.read_i32::<BigEndian>()?;
    let has_alpha = reader.read_u8()? != 0;
    let opacity = reader.read_u8()?;
    let mode = Blendmode::try_from(reader.read_u8()?).map_err(|_| corrupt("unknown blend mode"))?;
    let visible = reader.read_u8()? != 0;
    let preserve_alpha = reader.read_u8()? != 0;
    let mask_ptr = reader.read_u32::<BigEndian>()?;

    let format = PixelFormat::new(base, has_alpha);
    let tiles = read_hierarchy(reader, compression, opts)?;
    if tiles.bpp() as usize != format.bpp() {
        return Err(corrupt("layer depth does not match its format"));
    }

    if x.checked_add(tiles.width() as i32).is_none() || y.checked_add(tiles.height() as i32).is_none() {
        return Err(corrupt("layer offset out of range"));
    }

    let mut layer = Layer::from_store(&name, tiles, format)?;
    layer.set_offset(x, y);
    layer.opacity = opacity;
    layer.mode = mode;
    layer.preserve_alpha = preserve_alpha;
    layer.set_visible(visible);

    if mask_ptr != 0 {
        reader.seek(SeekFrom::Start(mask_ptr as u64))?;
        let name = read_name(reader)?;
        let apply = reader.read_u8()? != 0;
        let show = reader.read_u8()? != 0;
        let edit = reader.read_u8()? != 0;
        let mut mask = LayerMask::new(&name, layer.drawable().width(), layer.drawable().height())?;
        read_hierarchy_into(reader, mask.drawable_mut().tiles_mut(), compression, opts)?;
        mask.apply = apply;
        mask.show = show;
        mask.edit = edit;
        layer
            .add_mask(mask)
            .map_err(|_| corrupt("layer mask does not fit its layer"))?;
    }

    Ok(layer)
}

fn read_channel<R: Read + Seek>(
    reader: &mut R,
    pos: u32,
    compression: Compression,
    opts: &LoadOptions,
) -> Result<Channel> {
    reader.seek(SeekFrom::Start(pos as u64))?;
    let name = read_name(reader)?;
    let mut color = [0u8; 3];
    reader.read_exact(&mut color)?;
    let opacity = reader.read_u8()?;
    let visible = reader.read_u8()? != 0;
    let tiles = read_hierarchy(reader, compression, opts)?;
    if tiles.bpp() != 1 {
        return Err(corrupt("channel is not single channel"));
    }

    let mut channel = Channel::from_store(&name, tiles, color)?;
    channel.opacity = opacity;
    channel.drawable_mut().visible = visible;
    Ok(channel)
}

/// Save an image to a file
pub fn save_image_file(path: &Path, image: &Image, opts: &SaveOptions) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    save_image(&mut writer, image, opts)?;
    writer.flush()?;
    Ok(())
}

/// Load an image from a file
pub fn load_image_file(path: &Path, opts: &LoadOptions) -> Result<LoadedImage> {
    let mut reader = BufReader::new(File::open(path)?);
    load_image(&mut reader, opts)
}
