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


//! Row level pixel operations.
//!
//! Every function here works on one row of interleaved, non-premultiplied
//! 8 bit pixels. Input validity (matching lengths and formats) is checked
//! by the region algorithms and only debug-asserted here.

use super::color::*;
use super::lut::Lut;
use super::Blendmode;

/// Per-call options for compositing operations
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlendOptions {
    /// Keep the destination's alpha channel unchanged
    pub preserve_alpha: bool,

    /// Channels the operation may modify
    pub components: ComponentSet,
}

impl BlendOptions {
    pub fn with_preserve_alpha(mut self, preserve: bool) -> Self {
        self.preserve_alpha = preserve;
        self
    }

    pub fn with_components(mut self, components: ComponentSet) -> Self {
        self.components = components;
        self
    }
}

impl Default for BlendOptions {
    fn default() -> Self {
        Self {
            preserve_alpha: false,
            components: ComponentSet::ALL,
        }
    }
}

pub(crate) fn u8_mult(a: u32, b: u32) -> u32 {
    let c = a * b + 0x80;
    ((c >> 8) + c) >> 8
}

pub(crate) fn u8_blend(a: i32, b: i32, alpha: i32) -> i32 {
    let c = (a - b) * alpha + (b << 8) - b + 0x80;
    ((c >> 8) + c) >> 8
}

// 8 bit square root lookup table. The values are floored, so the math is
// floor(sqrt(i / 255.0) * 255.0) for i in 0 .. 255.
const U8_SQRT_LOOKUP: [u32; 256] = [
    0, 15, 22, 27, 31, 35, 39, 42, 45, 47, 50, 52, 55, 57, 59, 61, 63, 65, 67, 69, 71, 73, 74, 76,
    78, 79, 81, 82, 84, 85, 87, 88, 90, 91, 93, 94, 95, 97, 98, 99, 100, 102, 103, 104, 105, 107,
    108, 109, 110, 111, 112, 114, 115, 116, 117, 118, 119, 120, 121, 122, 123, 124, 125, 126, 127,
    128, 129, 130, 131, 132, 133, 134, 135, 136, 137, 138, 139, 140, 141, 141, 142, 143, 144, 145,
    146, 147, 148, 148, 149, 150, 151, 152, 153, 153, 154, 155, 156, 157, 158, 158, 159, 160, 161,
    162, 162, 163, 164, 165, 165, 166, 167, 168, 168, 169, 170, 171, 171, 172, 173, 174, 174, 175,
    176, 177, 177, 178, 179, 179, 180, 181, 182, 182, 183, 184, 184, 185, 186, 186, 187, 188, 188,
    189, 190, 190, 191, 192, 192, 193, 194, 194, 195, 196, 196, 197, 198, 198, 199, 200, 200, 201,
    201, 202, 203, 203, 204, 205, 205, 206, 206, 207, 208, 208, 209, 210, 210, 211, 211, 212, 213,
    213, 214, 214, 215, 216, 216, 217, 217, 218, 218, 219, 220, 220, 221, 221, 222, 222, 223, 224,
    224, 225, 225, 226, 226, 227, 228, 228, 229, 229, 230, 230, 231, 231, 232, 233, 233, 234, 234,
    235, 235, 236, 236, 237, 237, 238, 238, 239, 240, 240, 241, 241, 242, 242, 243, 243, 244, 244,
    245, 245, 246, 246, 247, 247, 248, 248, 249, 249, 250, 250, 251, 251, 252, 252, 253, 253, 254,
    255,
];

fn u8_sqrt(a: u32) -> u32 {
    U8_SQRT_LOOKUP[a as usize]
}

// Channel compositing operations: `a` is the destination, `b` the source

fn comp_op_normal(_: u32, b: u32) -> u32 {
    b
}

fn comp_op_multiply(a: u32, b: u32) -> u32 {
    u8_mult(a, b)
}

fn comp_op_screen(a: u32, b: u32) -> u32 {
    255 - u8_mult(255 - a, 255 - b)
}

fn comp_op_overlay(a: u32, b: u32) -> u32 {
    comp_op_hard_light(b, a)
}

fn comp_op_hard_light(a: u32, b: u32) -> u32 {
    let b2 = b * 2;
    if b2 <= 255 {
        comp_op_multiply(a, b2)
    } else {
        comp_op_screen(a, b2 - 255)
    }
}

fn comp_op_soft_light(a: u32, b: u32) -> u32 {
    let b2 = b * 2;
    if b2 <= 255 {
        a - u8_mult(u8_mult(255 - b2, a), 255 - a)
    } else {
        let a4 = a * 4;
        let d = if a4 <= 255 {
            let squared = u8_mult(a, a);
            a4 + 16 * u8_mult(squared, a) - 12 * squared
        } else {
            u8_sqrt(a)
        };
        (a as i32 + ((b2 as i32 - 255) * (d as i32 - a as i32) + 127) / 255).clamp(0, 255) as u32
    }
}

fn comp_op_difference(a: u32, b: u32) -> u32 {
    (a as i32 - b as i32).unsigned_abs()
}

fn comp_op_divide(a: u32, b: u32) -> u32 {
    255.min((a * 256 + b / 2) / (1 + b))
}

fn comp_op_darken(a: u32, b: u32) -> u32 {
    a.min(b)
}

fn comp_op_lighten(a: u32, b: u32) -> u32 {
    a.max(b)
}

fn comp_op_dodge(a: u32, b: u32) -> u32 {
    255.min(a * 256 / (256 - b))
}

fn comp_op_burn(a: u32, b: u32) -> u32 {
    (255 - ((255 - a) * 256 / (b + 1)) as i32).clamp(0, 255) as u32
}

fn comp_op_add(a: u32, b: u32) -> u32 {
    255.min(a + b)
}

fn comp_op_subtract(a: u32, b: u32) -> u32 {
    0.max(a as i32 - b as i32) as u32
}

fn comp_op_grain_extract(a: u32, b: u32) -> u32 {
    (a as i32 - b as i32 + 128).clamp(0, 255) as u32
}

fn comp_op_grain_merge(a: u32, b: u32) -> u32 {
    (a as i32 + b as i32 - 128).clamp(0, 255) as u32
}

fn channel_op(mode: Blendmode) -> fn(u32, u32) -> u32 {
    match mode {
        Blendmode::Multiply => comp_op_multiply,
        Blendmode::Screen => comp_op_screen,
        Blendmode::Overlay => comp_op_overlay,
        Blendmode::Difference => comp_op_difference,
        Blendmode::Addition => comp_op_add,
        Blendmode::Subtract => comp_op_subtract,
        Blendmode::DarkenOnly => comp_op_darken,
        Blendmode::LightenOnly => comp_op_lighten,
        Blendmode::Divide => comp_op_divide,
        Blendmode::Dodge => comp_op_dodge,
        Blendmode::Burn => comp_op_burn,
        Blendmode::HardLight => comp_op_hard_light,
        Blendmode::SoftLight => comp_op_soft_light,
        Blendmode::GrainExtract => comp_op_grain_extract,
        Blendmode::GrainMerge => comp_op_grain_merge,
        _ => comp_op_normal,
    }
}

fn hsv_op(mode: Blendmode, dst: [u8; 3], src: [u8; 3]) -> [u8; 3] {
    match mode {
        Blendmode::Hue => {
            let (_, ds, dv) = rgb_to_hsv(dst);
            let (sh, ss, _) = rgb_to_hsv(src);
            if ss == 0.0 {
                dst
            } else {
                hsv_to_rgb(sh, ds, dv)
            }
        }
        Blendmode::Saturation => {
            let (dh, _, dv) = rgb_to_hsv(dst);
            let (_, ss, _) = rgb_to_hsv(src);
            hsv_to_rgb(dh, ss, dv)
        }
        Blendmode::Value => {
            let (dh, ds, _) = rgb_to_hsv(dst);
            let (_, _, sv) = rgb_to_hsv(src);
            hsv_to_rgb(dh, ds, sv)
        }
        Blendmode::Color => {
            let (_, _, dl) = rgb_to_hsl(dst);
            let (sh, ss, _) = rgb_to_hsl(src);
            hsl_to_rgb(sh, ss, dl)
        }
        _ => src,
    }
}

/// Calculate the blend mode result color (ignoring alpha)
fn mode_pixel(mode: Blendmode, dst: &[u8], src: &[u8], out: &mut [u8]) {
    if mode.is_hsv_mode() {
        if dst.len() == 3 {
            out.copy_from_slice(&hsv_op(mode, [dst[0], dst[1], dst[2]], [src[0], src[1], src[2]]));
        } else if mode == Blendmode::Value {
            // A gray pixel has no hue or saturation, just the value
            out.copy_from_slice(src);
        } else {
            out.copy_from_slice(dst);
        }
    } else {
        let op = channel_op(mode);
        for ((o, &d), &s) in out.iter_mut().zip(dst).zip(src) {
            *o = op(d as u32, s as u32) as u8;
        }
    }
}

/// Composite a single pixel. `mask` scales the source alpha.
#[allow(clippy::too_many_arguments)]
fn blend_pixel(
    d: &mut [u8],
    dst_fmt: PixelFormat,
    s: &[u8],
    src_fmt: PixelFormat,
    mask: u8,
    mode: Blendmode,
    opacity: u8,
    opts: &BlendOptions,
) {
    let n = dst_fmt.color_channels();
    let da = dst_fmt.alpha_of(d) as u32;
    let mut a = u8_mult(
        u8_mult(src_fmt.alpha_of(s) as u32, opacity as u32),
        mask as u32,
    );
    if !mode.can_increase_opacity() && dst_fmt.has_alpha {
        a = a.min(da);
    }
    if a == 0 {
        return;
    }

    if dst_fmt.color == ColorType::Indexed {
        // Palette indices cannot be mixed: the source wins or loses outright
        if a >= 128 {
            if opts.components.is_active(0) {
                d[0] = s[0];
            }
            if let Some(ai) = dst_fmt.alpha_index() {
                if !opts.preserve_alpha && opts.components.is_active(ai) {
                    d[ai] = 255;
                }
            }
        }
        return;
    }

    let mut blended = [0u8; 3];
    mode_pixel(mode, &d[..n], &s[..n], &mut blended[..n]);

    let ratio = match dst_fmt.alpha_index() {
        Some(ai) => {
            let new_a = da + u8_mult(255 - da, a);
            if !opts.preserve_alpha && opts.components.is_active(ai) {
                d[ai] = new_a as u8;
            }
            ((a * 255 + new_a / 2) / new_a).min(255)
        }
        None => a,
    };

    for c in 0..n {
        if opts.components.is_active(c) {
            d[c] = u8_blend(blended[c] as i32, d[c] as i32, ratio as i32) as u8;
        }
    }
}

/// Composite a row of source pixels onto a row of destination pixels.
///
/// Both formats must have the same number of color channels.
/// If a mask row is given, it scales the source alpha.
#[allow(clippy::too_many_arguments)]
pub fn blend_row(
    dst: &mut [u8],
    dst_fmt: PixelFormat,
    src: &[u8],
    src_fmt: PixelFormat,
    mask: Option<&[u8]>,
    mode: Blendmode,
    opacity: u8,
    opts: &BlendOptions,
) {
    debug_assert_eq!(dst_fmt.color_channels(), src_fmt.color_channels());
    debug_assert_eq!(dst.len() / dst_fmt.bpp(), src.len() / src_fmt.bpp());
    if opacity == 0 {
        return;
    }

    let count = dst.len() / dst_fmt.bpp();
    let pixels = dst
        .chunks_exact_mut(dst_fmt.bpp())
        .zip(src.chunks_exact(src_fmt.bpp()));

    match mask {
        Some(mask) => {
            debug_assert_eq!(mask.len(), count);
            for ((d, s), &m) in pixels.zip(mask) {
                blend_pixel(d, dst_fmt, s, src_fmt, m, mode, opacity, opts);
            }
        }
        None => {
            for (d, s) in pixels {
                blend_pixel(d, dst_fmt, s, src_fmt, 255, mode, opacity, opts);
            }
        }
    }
}

/// Blend a solid color through a mask row (normal mode)
pub fn mask_blend_row(dst: &mut [u8], dst_fmt: PixelFormat, color: &[u8], mask: &[u8], opacity: u8) {
    let n = dst_fmt.color_channels();
    debug_assert_eq!(color.len(), n);
    let src_fmt = PixelFormat::new(dst_fmt.color, true);
    let mut px = [0u8; MAX_CHANNELS];
    px[..n].copy_from_slice(color);
    for (d, &m) in dst.chunks_exact_mut(dst_fmt.bpp()).zip(mask) {
        px[n] = m;
        blend_pixel(
            d,
            dst_fmt,
            &px[..n + 1],
            src_fmt,
            255,
            Blendmode::Normal,
            opacity,
            &BlendOptions::default(),
        );
    }
}

/// Multiply the alpha channel by mask × max_opacity
pub fn apply_mask_row(pixels: &mut [u8], fmt: PixelFormat, mask: &[u8], max_opacity: u8) {
    let ai = match fmt.alpha_index() {
        Some(ai) => ai,
        None => return,
    };
    for (px, &m) in pixels.chunks_exact_mut(fmt.bpp()).zip(mask) {
        px[ai] = u8_mult(px[ai] as u32, u8_mult(m as u32, max_opacity as u32)) as u8;
    }
}

/// Copy the alpha channel into a single channel row
pub fn extract_alpha_row(src: &[u8], fmt: PixelFormat, dst: &mut [u8]) {
    for (px, d) in src.chunks_exact(fmt.bpp()).zip(dst.iter_mut()) {
        *d = fmt.alpha_of(px);
    }
}

/// Copy color channels and add a fully opaque alpha channel
pub fn add_alpha_row(src: &[u8], fmt: PixelFormat, dst: &mut [u8]) {
    debug_assert!(!fmt.has_alpha);
    let n = fmt.bpp();
    for (s, d) in src.chunks_exact(n).zip(dst.chunks_exact_mut(n + 1)) {
        d[..n].copy_from_slice(s);
        d[n] = 255;
    }
}

/// Composite pixels over a solid background color and drop the alpha channel
pub fn flatten_row(src: &[u8], fmt: PixelFormat, dst: &mut [u8], background: &[u8]) {
    debug_assert!(fmt.has_alpha);
    let n = fmt.color_channels();
    let indexed = fmt.color == ColorType::Indexed;
    for (s, d) in src.chunks_exact(n + 1).zip(dst.chunks_exact_mut(n)) {
        let a = s[n] as i32;
        for c in 0..n {
            d[c] = if indexed {
                if a >= 128 {
                    s[c]
                } else {
                    background[c]
                }
            } else {
                u8_blend(s[c] as i32, background[c] as i32, a) as u8
            };
        }
    }
}

/// Invert the color channels
pub fn invert_row(pixels: &mut [u8], fmt: PixelFormat, components: ComponentSet) {
    let n = fmt.color_channels();
    for px in pixels.chunks_exact_mut(fmt.bpp()) {
        for (c, v) in px[..n].iter_mut().enumerate() {
            if components.is_active(c) {
                *v = 255 - *v;
            }
        }
    }
}

/// Convert pixels to a single intensity channel
pub fn gray_row(src: &[u8], fmt: PixelFormat, dst: &mut [u8]) {
    for (px, d) in src.chunks_exact(fmt.bpp()).zip(dst.iter_mut()) {
        *d = match fmt.color {
            ColorType::Rgb => luminance(px[0], px[1], px[2]),
            ColorType::Gray | ColorType::Indexed => px[0],
        };
    }
}

/// Set alpha to fully opaque where it is at least `threshold` and transparent elsewhere
pub fn threshold_alpha_row(pixels: &mut [u8], fmt: PixelFormat, threshold: u8) {
    if let Some(ai) = fmt.alpha_index() {
        for px in pixels.chunks_exact_mut(fmt.bpp()) {
            px[ai] = if px[ai] >= threshold { 255 } else { 0 };
        }
    }
}

/// Remap channel values through a lookup table.
///
/// Alpha is mapped only when the table has an entry for it.
pub fn lut_row(dst: &mut [u8], src: &[u8], fmt: PixelFormat, lut: &Lut, components: ComponentSet) {
    let bpp = fmt.bpp();
    let mapped = if lut.channels() == bpp {
        bpp
    } else {
        fmt.color_channels()
    };
    for (d, s) in dst.chunks_exact_mut(bpp).zip(src.chunks_exact(bpp)) {
        for c in 0..bpp {
            d[c] = if c < mapped && components.is_active(c) {
                lut.map(c, s[c])
            } else {
                s[c]
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blend1(
        dst: &mut [u8],
        dst_fmt: PixelFormat,
        src: &[u8],
        src_fmt: PixelFormat,
        mode: Blendmode,
        opacity: u8,
    ) {
        blend_row(
            dst,
            dst_fmt,
            src,
            src_fmt,
            None,
            mode,
            opacity,
            &BlendOptions::default(),
        );
    }

    #[test]
    fn test_normal_blend() {
        let mut dst = [255, 0, 0, 255];
        blend1(&mut dst, PixelFormat::RGBA, &[0, 128, 0, 128], PixelFormat::RGBA, Blendmode::Normal, 255);
        assert_eq!(dst, [127, 64, 0, 255]);

        let mut dst = [0, 0, 0, 0];
        blend1(&mut dst, PixelFormat::RGBA, &[10, 20, 30, 200], PixelFormat::RGBA, Blendmode::Normal, 255);
        assert_eq!(dst, [10, 20, 30, 200]);

        let mut dst = [0, 0, 0];
        blend1(&mut dst, PixelFormat::RGB, &[255, 255, 255, 255], PixelFormat::RGBA, Blendmode::Normal, 128);
        assert_eq!(dst, [128, 128, 128]);
    }

    #[test]
    fn test_identity_and_zero_opacity() {
        let src = [12, 34, 56, 255, 200, 100, 50, 255];
        for dst0 in [[1u8, 2, 3, 4, 5, 6, 7, 8], [0; 8], [255; 8]] {
            let mut dst = dst0;
            blend1(&mut dst, PixelFormat::RGBA, &src, PixelFormat::RGBA, Blendmode::Normal, 255);
            assert_eq!(dst, src);

            let mut dst = dst0;
            blend1(&mut dst, PixelFormat::RGBA, &src, PixelFormat::RGBA, Blendmode::Multiply, 0);
            assert_eq!(dst, dst0);
        }
    }

    #[test]
    fn test_min_alpha_modes() {
        let mut dst = [0, 0, 0, 0];
        blend1(&mut dst, PixelFormat::RGBA, &[255, 255, 255, 255], PixelFormat::RGBA, Blendmode::Screen, 255);
        assert_eq!(dst, [0, 0, 0, 0]);

        let mut dst = [100, 100, 100, 255];
        blend1(&mut dst, PixelFormat::RGBA, &[128, 0, 255, 255], PixelFormat::RGBA, Blendmode::Multiply, 255);
        assert_eq!(dst, [50, 0, 100, 255]);
    }

    #[test]
    fn test_preserve_alpha_and_components() {
        let mut dst = [100, 100, 100, 50];
        blend_row(
            &mut dst,
            PixelFormat::RGBA,
            &[200, 200, 200, 255],
            PixelFormat::RGBA,
            None,
            Blendmode::Normal,
            255,
            &BlendOptions::default().with_preserve_alpha(true),
        );
        assert_eq!(dst, [200, 200, 200, 50]);

        let mut dst = [0, 0, 0, 255];
        blend_row(
            &mut dst,
            PixelFormat::RGBA,
            &[255, 255, 255, 255],
            PixelFormat::RGBA,
            None,
            Blendmode::Normal,
            255,
            &BlendOptions::default().with_components(ComponentSet::ALL.with(1, false)),
        );
        assert_eq!(dst, [255, 0, 255, 255]);
    }

    #[test]
    fn test_indexed_threshold() {
        let fmt = PixelFormat::new(ColorType::Indexed, true);
        let mut dst = [3, 0, 3, 0];
        blend1(&mut dst, fmt, &[7, 200, 9, 100], fmt, Blendmode::Normal, 255);
        assert_eq!(dst, [7, 255, 3, 0]);
    }

    #[test]
    fn test_gray_hsv_modes() {
        let mut dst = [50];
        blend1(&mut dst, PixelFormat::GRAY, &[200], PixelFormat::GRAY, Blendmode::Hue, 255);
        assert_eq!(dst, [50]);
        blend1(&mut dst, PixelFormat::GRAY, &[200], PixelFormat::GRAY, Blendmode::Value, 255);
        assert_eq!(dst, [200]);
    }

    #[test]
    fn test_hue_of_gray_source() {
        let mut dst = [200, 50, 50];
        blend1(&mut dst, PixelFormat::RGB, &[90, 90, 90], PixelFormat::RGB, Blendmode::Hue, 255);
        assert_eq!(dst, [200, 50, 50]);
    }

    #[test]
    fn test_mask_ops() {
        let mut px = [10, 200];
        apply_mask_row(&mut px, PixelFormat::GRAYA, &[128], 255);
        assert_eq!(px, [10, 100]);

        let mut flat = [0u8; 3];
        flatten_row(&[255, 255, 255, 128], PixelFormat::RGBA, &mut flat, &[0, 0, 0]);
        assert_eq!(flat, [128, 128, 128]);

        let mut alpha = [0u8; 2];
        extract_alpha_row(&[1, 2, 3, 4, 5, 6], PixelFormat::RGB, &mut alpha);
        assert_eq!(alpha, [255, 255]);

        let mut px = [0, 0, 0, 0];
        mask_blend_row(&mut px, PixelFormat::RGBA, &[255, 0, 0], &[255], 255);
        assert_eq!(px, [255, 0, 0, 255]);
    }

    #[test]
    fn test_invert() {
        let mut px = [0, 100, 255, 7];
        invert_row(&mut px, PixelFormat::RGBA, ComponentSet::ALL.with(2, false));
        assert_eq!(px, [255, 155, 255, 7]);
    }
}
