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

use rastercore::codec::{load_image_file, LoadOptions};
use rastercore::paint::{ColorType, Image};
use tracing::warn;

fn color_type_name(color: ColorType) -> &'static str {
    match color {
        ColorType::Rgb => "RGB",
        ColorType::Gray => "grayscale",
        ColorType::Indexed => "indexed",
    }
}

/// Print a summary of an image: its size, layers, channels and selection
pub fn describe(image: &mut Image) -> String {
    let mut out = format!(
        "{}x{} {} image",
        image.width(),
        image.height(),
        color_type_name(image.base_type())
    );
    if image.base_type() == ColorType::Indexed {
        out += &format!(", {} colors", image.colormap().len());
    }
    out.push('\n');

    out += &format!("{} layers:\n", image.layers().len());
    for layer in image.layers() {
        let b = layer.bounds();
        out += &format!(
            "  {:<24} {}x{}+{}+{} opacity {} {}{}{}\n",
            layer.name(),
            b.w,
            b.h,
            b.x,
            b.y,
            layer.opacity,
            layer.mode.name(),
            if layer.is_visible() { "" } else { " hidden" },
            if layer.mask().is_some() { " masked" } else { "" },
        );
    }

    out += &format!("{} channels:\n", image.channels().len());
    for channel in image.channels() {
        let [r, g, b] = channel.color;
        out += &format!(
            "  {:<24} #{:02x}{:02x}{:02x} opacity {}{}\n",
            channel.drawable().name(),
            r,
            g,
            b,
            channel.opacity,
            if channel.drawable().visible { "" } else { " hidden" },
        );
    }

    match image.selection_bounds() {
        Some(r) => out += &format!("Selection: {}x{}+{}+{}\n", r.w, r.h, r.x, r.y),
        None => out += "Selection: none\n",
    }
    out
}

pub fn print_info(input_file: &str) -> Result<(), Box<dyn Error>> {
    let mut loaded = load_image_file(Path::new(input_file), &LoadOptions::default())?;
    for w in &loaded.warnings {
        warn!("{}: {}", input_file, w);
    }
    print!("{}", describe(&mut loaded.image));
    Ok(())
}
