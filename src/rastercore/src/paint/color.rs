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

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::cmp::Ordering;
use std::cmp::{max_by, min_by};

/// Maximum number of bytes in one pixel (RGBA)
pub const MAX_CHANNELS: usize = 4;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ColorType {
    Rgb = 0,
    Gray,
    Indexed,
}

impl ColorType {
    /// Number of color (non-alpha) channels
    pub fn color_channels(self) -> usize {
        match self {
            ColorType::Rgb => 3,
            ColorType::Gray | ColorType::Indexed => 1,
        }
    }
}

/// Memory layout of a pixel.
///
/// Channels are interleaved, 8 bits each, and not premultiplied.
/// If present, alpha is always the last channel.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct PixelFormat {
    pub color: ColorType,
    pub has_alpha: bool,
}

impl PixelFormat {
    pub const RGB: PixelFormat = PixelFormat::new(ColorType::Rgb, false);
    pub const RGBA: PixelFormat = PixelFormat::new(ColorType::Rgb, true);
    pub const GRAY: PixelFormat = PixelFormat::new(ColorType::Gray, false);
    pub const GRAYA: PixelFormat = PixelFormat::new(ColorType::Gray, true);

    pub const fn new(color: ColorType, has_alpha: bool) -> Self {
        Self { color, has_alpha }
    }

    pub fn bpp(self) -> usize {
        self.color.color_channels() + self.has_alpha as usize
    }

    pub fn color_channels(self) -> usize {
        self.color.color_channels()
    }

    pub fn alpha_index(self) -> Option<usize> {
        if self.has_alpha {
            Some(self.color.color_channels())
        } else {
            None
        }
    }

    pub fn with_alpha(self) -> Self {
        Self::new(self.color, true)
    }

    /// Get the alpha value of a pixel in this format (255 if there is no alpha channel)
    pub fn alpha_of(self, pixel: &[u8]) -> u8 {
        match self.alpha_index() {
            Some(i) => pixel[i],
            None => 255,
        }
    }

    /// Convert an RGBA color into a pixel of this format.
    ///
    /// Gray formats use the color's luminance. Indexed formats
    /// use the red component as the palette index.
    pub fn pixel_from_rgba(self, c: [u8; 4]) -> [u8; MAX_CHANNELS] {
        let mut px = [0u8; MAX_CHANNELS];
        match self.color {
            ColorType::Rgb => px[..3].copy_from_slice(&c[..3]),
            ColorType::Gray => px[0] = luminance(c[0], c[1], c[2]),
            ColorType::Indexed => px[0] = c[0],
        }
        if let Some(a) = self.alpha_index() {
            px[a] = c[3];
        }
        px
    }
}

/// The set of channels an operation is allowed to modify.
///
/// This is passed explicitly to every operation that honors channel
/// selection, so nothing depends on transient image-wide state.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ComponentSet([bool; MAX_CHANNELS]);

impl ComponentSet {
    pub const ALL: ComponentSet = ComponentSet([true; MAX_CHANNELS]);

    pub fn is_active(&self, channel: usize) -> bool {
        self.0[channel]
    }

    pub fn with(mut self, channel: usize, active: bool) -> Self {
        self.0[channel] = active;
        self
    }
}

impl Default for ComponentSet {
    fn default() -> Self {
        Self::ALL
    }
}

/// Perceptual intensity of an RGB triplet (0.30 R + 0.59 G + 0.11 B)
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 77 + g as u32 * 151 + b as u32 * 28 + 128) >> 8) as u8
}

// f32 has no total order, so NaN compares as equal here.
fn compare_floats(a: &f32, b: &f32) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

fn to_channel(v: f32) -> u8 {
    (v * 255.0 + 0.5).clamp(0.0, 255.0) as u8
}

/// Convert RGB to hue (0..360), saturation (0..1) and value (0..1)
pub fn rgb_to_hsv(rgb: [u8; 3]) -> (f32, f32, f32) {
    let r = rgb[0] as f32 / 255.0;
    let g = rgb[1] as f32 / 255.0;
    let b = rgb[2] as f32 / 255.0;
    let m = min_by(r, min_by(g, b, compare_floats), compare_floats);
    let v = max_by(r, max_by(g, b, compare_floats), compare_floats);
    let d = v - m;
    if d == 0.0 {
        (0.0, 0.0, v)
    } else {
        let raw_h = if r == v {
            (g - b) / d
        } else if g == v {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        } * 60.0;
        let h = if raw_h < 0.0 { raw_h + 360.0 } else { raw_h };
        (h, d / v, v)
    }
}

pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [u8; 3] {
    let c = v * s;
    let hp = (h / 60.0) % 6.0;
    let x = c * (1.0 - ((hp % 2.0) - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if hp < 1.0 {
        (c, x, 0.0)
    } else if hp < 2.0 {
        (x, c, 0.0)
    } else if hp < 3.0 {
        (0.0, c, x)
    } else if hp < 4.0 {
        (0.0, x, c)
    } else if hp < 5.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };
    [to_channel(r + m), to_channel(g + m), to_channel(b + m)]
}

/// Convert RGB to hue (0..360), saturation (0..1) and lightness (0..1)
pub fn rgb_to_hsl(rgb: [u8; 3]) -> (f32, f32, f32) {
    let (h, _, _) = rgb_to_hsv(rgb);
    let r = rgb[0] as f32 / 255.0;
    let g = rgb[1] as f32 / 255.0;
    let b = rgb[2] as f32 / 255.0;
    let mx = r.max(g).max(b);
    let mn = r.min(g).min(b);
    let l = (mx + mn) / 2.0;
    let d = mx - mn;
    let s = if d == 0.0 {
        0.0
    } else if l <= 0.5 {
        d / (mx + mn)
    } else {
        d / (2.0 - mx - mn)
    };
    (h, s, l)
}

pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [u8; 3] {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let v = l + c / 2.0;
    let sv = if v == 0.0 { 0.0 } else { c / v };
    hsv_to_rgb(h, sv, v)
}
