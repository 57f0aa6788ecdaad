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


use std::error::Error;
use std::path::Path;
use std::time::Instant;

use rastercore::codec::{load_image_file, LoadOptions};
use rastercore::paint::compositor::flatten;
use rastercore::paint::{FlattenOptions, Image};
use tracing::{info, warn};

use crate::{with_suffix, CliError, Color};

pub struct FlattenOpts<'a> {
    /// Name of the input image file
    pub input_file: &'a str,

    /// Name of the output PNG file (derived from the input file name if empty)
    pub output_file: &'a str,

    /// Color under the bottommost layer
    pub background: Option<Color>,

    /// Draw visible channels as colored overlays
    pub show_channels: bool,
}

/// Flatten the whole image into an 8 bit RGBA buffer
pub fn render_image(src: &Image, opts: &FlattenOptions) -> Result<image::RgbaImage, Box<dyn Error>> {
    let flat = flatten(src, &src.bounds(), opts)?;
    let rgba = flat.to_rgba8(src.colormap());
    image::RgbaImage::from_raw(flat.width as u32, flat.height as u32, rgba)
        .ok_or_else(|| CliError::new("flattened image has the wrong size").into())
}

pub fn flatten_image(opts: &FlattenOpts) -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let loaded = load_image_file(Path::new(opts.input_file), &LoadOptions::default())?;
    for w in &loaded.warnings {
        warn!("{}: {}", opts.input_file, w);
    }

    let mut flatten_opts = FlattenOptions::default().with_show_channels(opts.show_channels);
    if let Some(Color(bg)) = opts.background {
        flatten_opts = flatten_opts.with_background(bg);
    }
    let img = render_image(&loaded.image, &flatten_opts)?;
    let render_time = start.elapsed();

    let filename = if opts.output_file.is_empty() {
        with_suffix(opts.input_file, ".png")
    } else {
        opts.output_file.to_string()
    };
    info!("Saving {}", filename);
    img.save(&filename)?;

    info!("Render time: {:.3} s", render_time.as_secs_f64());
    info!("Total time: {:.3} s", start.elapsed().as_secs_f64());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rastercore::paint::{ColorType, Layer};

    #[test]
    fn test_render_gray() {
        let mut image = Image::new(4, 2, ColorType::Gray).unwrap();
        let mut layer = Layer::new("l", 4, 2, ColorType::Gray, false).unwrap();
        layer.drawable_mut().tiles_mut().fill(&[90]);
        image.add_layer(layer, 0).unwrap();

        let img = render_image(&image, &FlattenOptions::default()).unwrap();
        assert_eq!(img.dimensions(), (4, 2));
        assert_eq!(img.get_pixel(3, 1).0, [90, 90, 90, 255]);
    }
}
