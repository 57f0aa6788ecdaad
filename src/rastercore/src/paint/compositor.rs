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
use super::image::Image;
use super::layer::{Channel, Layer};
use super::pixelbuffer::PixelBuffer;
use super::rasterop::BlendOptions;
use super::region::{walk2, PixelRegion, PixelRegionMut};
use super::regionops::{composite_blend, composite_color};
use super::tilestore::TileStore;
use super::{Blendmode, Rectangle};
use crate::{RasterError, Result};

/// Image flattening options
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlattenOptions {
    /// RGBA color under the bottommost layer
    pub background: [u8; 4],

    /// Draw visible channels as colored overlays
    pub show_channels: bool,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            background: [0, 0, 0, 0],
            show_channels: true,
        }
    }
}

impl FlattenOptions {
    pub fn with_background(mut self, background: [u8; 4]) -> Self {
        self.background = background;
        self
    }

    pub fn with_show_channels(mut self, show: bool) -> Self {
        self.show_channels = show;
        self
    }
}

/// Flatten a rectangle of the image into a pixel buffer.
///
/// The result is in the image's base color type, with alpha.
/// Floating selections are not drawn here: they have already been
/// composited into their target.
pub fn flatten(image: &Image, rect: &Rectangle, opts: &FlattenOptions) -> Result<PixelBuffer> {
    let rect = rect
        .cropped(image.size())
        .ok_or(RasterError::InvalidDimensions)?;
    let format = PixelFormat::new(image.base_type(), true);
    let layers: Vec<&Layer> = image.layers().iter().collect();

    let mut acc = flatten_to_store(&layers, format, &rect, opts)?;

    if opts.show_channels && image.base_type() != ColorType::Indexed {
        for channel in image.channels().iter().rev() {
            overlay_channel(&mut acc, format, channel, &rect)?;
        }
    }

    PixelBuffer::from_store(&acc, &acc.bounds(), format)
}

/// Flatten a list of layers (topmost first) into a pixel buffer of the given format
pub fn flatten_layers(
    layers: &[&Layer],
    format: PixelFormat,
    rect: &Rectangle,
    opts: &FlattenOptions,
) -> Result<PixelBuffer> {
    let acc = flatten_to_store(layers, format, rect, opts)?;
    PixelBuffer::from_store(&acc, &acc.bounds(), format)
}

fn flatten_to_store(
    layers: &[&Layer],
    format: PixelFormat,
    rect: &Rectangle,
    opts: &FlattenOptions,
) -> Result<TileStore> {
    let mut acc = TileStore::new(rect.w as u32, rect.h as u32, format.bpp() as u32)?;
    if opts.background != [0, 0, 0, 0] {
        acc.fill(&format.pixel_from_rgba(opts.background)[..format.bpp()]);
    }

    for layer in layers.iter().rev() {
        if layer.is_visible() && !layer.is_floating() {
            composite_layer(&mut acc, format, layer, rect)?;
        }
    }

    Ok(acc)
}

fn composite_layer(acc: &mut TileStore, format: PixelFormat, layer: &Layer, rect: &Rectangle) -> Result<()> {
    let lb = layer.bounds();
    let area = match lb.intersected(rect) {
        Some(a) => a,
        None => return Ok(()),
    };
    let local = area.offset(-lb.x, -lb.y);
    let mut dst = PixelRegionMut::new(acc, area.offset(-rect.x, -rect.y))?;

    match layer.mask() {
        Some(mask) if mask.show => {
            let gray = gray_as_format(&PixelRegion::new(mask.tiles(), local)?, format)?;
            composite_blend(
                &PixelRegion::whole(&gray),
                format,
                &mut dst,
                format,
                Blendmode::Normal,
                layer.opacity,
                None,
                &BlendOptions::default(),
            )
        }
        mask => {
            let mask = match mask {
                Some(m) if m.apply => Some(PixelRegion::new(m.tiles(), local)?),
                _ => None,
            };
            composite_blend(
                &PixelRegion::new(layer.tiles(), local)?,
                layer.format(),
                &mut dst,
                format,
                layer.mode,
                layer.opacity,
                mask.as_ref(),
                &BlendOptions::default(),
            )
        }
    }
}

// Expand a single channel region into opaque pixels of the given format
fn gray_as_format(src: &PixelRegion, format: PixelFormat) -> Result<TileStore> {
    let r = src.rect();
    let bpp = format.bpp();
    let n = format.color_channels();
    let mut out = TileStore::new(r.w as u32, r.h as u32, bpp as u32)?;
    walk2(src, &mut PixelRegionMut::whole(&mut out), |s, mut d| {
        for (d, s) in d.rows_mut().zip(s.rows()) {
            for (px, &v) in d.chunks_exact_mut(bpp).zip(s) {
                px[..n].iter_mut().for_each(|c| *c = v);
                if let Some(ai) = format.alpha_index() {
                    px[ai] = 255;
                }
            }
        }
    })?;
    Ok(out)
}

fn overlay_channel(
    acc: &mut TileStore,
    format: PixelFormat,
    channel: &Channel,
    rect: &Rectangle,
) -> Result<()> {
    if !channel.drawable().visible {
        return Ok(());
    }
    let [r, g, b] = channel.color;
    let color = format.pixel_from_rgba([r, g, b, 255]);
    composite_color(
        &mut PixelRegionMut::whole(acc),
        format,
        &color[..format.color_channels()],
        &PixelRegion::new(channel.drawable().tiles(), *rect)?,
        channel.opacity,
    )
}
