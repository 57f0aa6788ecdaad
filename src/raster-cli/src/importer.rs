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


//! Bringing PNG files into images, as new layers or floating selections.

use std::error::Error;
use std::path::Path;

use rastercore::codec::{load_image_file, save_image_file, Compression, LoadOptions, SaveOptions};
use rastercore::paint::floating::{anchor, attach, to_layer};
use rastercore::paint::{ColorType, DrawableRef, Image, Layer, PixelFormat, TileStore};
use tracing::{info, warn};

use crate::{CliError, Point, Size};

/// Read a PNG (or any format the image crate knows) into an unattached layer
pub fn layer_from_file(path: &Path, color: ColorType) -> Result<Layer, Box<dyn Error>> {
    let img = image::open(path)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Pasted layer".to_string());

    let (format, (w, h), pixels) = match color {
        ColorType::Rgb => {
            let buf = img.to_rgba8();
            (PixelFormat::RGBA, buf.dimensions(), buf.into_raw())
        }
        ColorType::Gray => {
            let buf = img.to_luma_alpha8();
            (PixelFormat::GRAYA, buf.dimensions(), buf.into_raw())
        }
        ColorType::Indexed => {
            return Err(CliError::new("cannot import pictures into an indexed image").into())
        }
    };

    let tiles = TileStore::from_pixels(w, h, format.bpp() as u32, &pixels)?;
    Ok(Layer::from_store(&name, tiles, format)?)
}

pub struct ImportOpts<'a> {
    /// Pictures to import, bottommost first
    pub input_files: &'a [String],

    /// Name of the image file to create
    pub output_file: &'a str,

    /// Image size (defaults to the size of the largest picture)
    pub size: Option<Size>,

    pub grayscale: bool,
    pub compression: Compression,
}

pub fn import_layers(opts: &ImportOpts) -> Result<(), Box<dyn Error>> {
    let color = if opts.grayscale {
        ColorType::Gray
    } else {
        ColorType::Rgb
    };

    let layers = opts
        .input_files
        .iter()
        .map(|f| layer_from_file(Path::new(f), color))
        .collect::<Result<Vec<_>, _>>()?;

    let Size(width, height) = match opts.size {
        Some(size) => size,
        None => layers.iter().fold(Size(1, 1), |s, l| {
            Size(s.0.max(l.drawable().width()), s.1.max(l.drawable().height()))
        }),
    };

    let mut image = Image::new(width, height, color)?;
    for layer in layers {
        let id = image.add_layer(layer, 0)?;
        info!("Imported {}", id);
    }

    save_image_file(
        Path::new(opts.output_file),
        &image,
        &SaveOptions::default().with_compression(opts.compression),
    )?;
    info!("Saved {}", opts.output_file);
    Ok(())
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PasteMode {
    /// Merge the pasted picture into the target layer
    Anchor,
    /// Keep the pasted picture as a layer of its own
    NewLayer,
}

pub struct PasteOpts<'a> {
    pub image_file: &'a str,
    pub picture_file: &'a str,

    /// Where to write the result (overwrites the image file if empty)
    pub output_file: &'a str,

    pub position: Point,

    /// Stack index of the target layer (0 is the topmost)
    pub target: usize,

    pub mode: PasteMode,
}

/// Paste a picture onto a layer as a floating selection, then finish it
/// off by anchoring it or turning it into a layer.
pub fn paste(
    image: &mut Image,
    mut layer: Layer,
    position: Point,
    target: usize,
    mode: PasteMode,
) -> Result<(), Box<dyn Error>> {
    let target = image
        .layers()
        .get(target)
        .map(|l| DrawableRef::Layer(l.id()))
        .ok_or_else(|| CliError::new(format!("no layer at index {}", target)))?;

    layer.set_offset(position.0, position.1);
    let floating = attach(image, layer, target)?;
    match mode {
        PasteMode::Anchor => anchor(image, floating)?,
        PasteMode::NewLayer => to_layer(image, floating)?,
    };
    Ok(())
}

pub fn paste_file(opts: &PasteOpts) -> Result<(), Box<dyn Error>> {
    let mut loaded = load_image_file(Path::new(opts.image_file), &LoadOptions::default())?;
    if !loaded.warnings.is_empty() {
        for w in &loaded.warnings {
            warn!("{}: {}", opts.image_file, w);
        }
        return Err(CliError::new("refusing to overwrite a partially loaded image").into());
    }

    let image = &mut loaded.image;
    let layer = layer_from_file(Path::new(opts.picture_file), image.base_type())?;
    paste(image, layer, opts.position, opts.target, opts.mode)?;

    let output = if opts.output_file.is_empty() {
        opts.image_file
    } else {
        opts.output_file
    };
    save_image_file(Path::new(output), image, &SaveOptions::default())?;
    info!("Saved {}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picture(color: [u8; 4]) -> Layer {
        let mut l = Layer::new("picture", 4, 4, ColorType::Rgb, true).unwrap();
        l.drawable_mut().tiles_mut().fill(&color);
        l
    }

    fn canvas() -> Image {
        let mut image = Image::new(16, 16, ColorType::Rgb).unwrap();
        let mut bg = Layer::new("bg", 16, 16, ColorType::Rgb, false).unwrap();
        bg.drawable_mut().tiles_mut().fill(&[255, 255, 255]);
        image.add_layer(bg, 0).unwrap();
        image
    }

    #[test]
    fn test_paste_anchor() {
        let mut image = canvas();
        paste(&mut image, picture([0, 0, 0, 255]), Point(2, 2), 0, PasteMode::Anchor).unwrap();
        assert_eq!(image.layers().len(), 1);
        assert_eq!(image.floating_layer(), None);
        let tiles = image.layers()[0].tiles();
        assert_eq!(tiles.pixel_at(3, 3), &[0, 0, 0]);
        assert_eq!(tiles.pixel_at(6, 6), &[255, 255, 255]);
    }

    #[test]
    fn test_paste_new_layer() {
        let mut image = canvas();
        paste(&mut image, picture([0, 0, 0, 255]), Point(2, 2), 0, PasteMode::NewLayer).unwrap();
        assert_eq!(image.layers().len(), 2);
        assert_eq!(image.floating_layer(), None);
        assert_eq!(image.layers()[0].bounds().x, 2);
        assert_eq!(image.layers()[1].tiles().pixel_at(3, 3), &[255, 255, 255]);
    }

    #[test]
    fn test_paste_bad_target() {
        let mut image = canvas();
        assert!(paste(&mut image, picture([0, 0, 0, 255]), Point(0, 0), 5, PasteMode::Anchor).is_err());
    }
}
