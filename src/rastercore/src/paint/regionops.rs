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


//! Region algorithms.
//!
//! These walk one or more pixel regions chunk by chunk and apply a row
//! operation from `rasterop` to each visited row.

use std::ops::ControlFlow;

use super::color::{ComponentSet, PixelFormat};
use super::lut::Lut;
use super::rasterop::{self, BlendOptions};
use super::region::{walk2, walk3, PixelRegion, PixelRegionMut};
use super::tilestore::TileStore;
use super::{Blendmode, Rectangle};
use crate::{RasterError, Result};

fn check_format(region_bpp: usize, fmt: PixelFormat) -> Result<()> {
    if region_bpp == fmt.bpp() {
        Ok(())
    } else {
        Err(RasterError::IncompatibleFormat)
    }
}

/// Copy pixels from one region to another of equal size and depth
pub fn copy_region(src: &PixelRegion, dst: &mut PixelRegionMut) -> Result<()> {
    if src.bpp() != dst.bpp() {
        return Err(RasterError::IncompatibleFormat);
    }
    walk2(src, dst, |s, mut d| {
        d.rows_mut()
            .zip(s.rows())
            .for_each(|(d, s)| d.copy_from_slice(s));
    })
}

/// Remap pixel values through a lookup table
pub fn apply_lut(
    src: &PixelRegion,
    dst: &mut PixelRegionMut,
    fmt: PixelFormat,
    lut: &Lut,
    components: ComponentSet,
) -> Result<()> {
    check_format(src.bpp(), fmt)?;
    check_format(dst.bpp(), fmt)?;
    walk2(src, dst, |s, mut d| {
        d.rows_mut()
            .zip(s.rows())
            .for_each(|(d, s)| rasterop::lut_row(d, s, fmt, lut, components));
    })
}

/// Remap pixel values of a region in place
pub fn apply_lut_in_place(
    region: &mut PixelRegionMut,
    fmt: PixelFormat,
    lut: &Lut,
    components: ComponentSet,
) -> Result<()> {
    check_format(region.bpp(), fmt)?;
    let mut scratch = Vec::new();
    region.for_each_chunk_mut(|mut chunk| {
        for row in chunk.rows_mut() {
            scratch.clear();
            scratch.extend_from_slice(row);
            rasterop::lut_row(row, &scratch, fmt, lut, components);
        }
    });
    Ok(())
}

/// Composite the source region onto the destination.
///
/// The optional mask region (one byte per pixel) scales the source alpha.
#[allow(clippy::too_many_arguments)]
pub fn composite_blend(
    src: &PixelRegion,
    src_fmt: PixelFormat,
    dst: &mut PixelRegionMut,
    dst_fmt: PixelFormat,
    mode: Blendmode,
    opacity: u8,
    mask: Option<&PixelRegion>,
    opts: &BlendOptions,
) -> Result<()> {
    check_format(src.bpp(), src_fmt)?;
    check_format(dst.bpp(), dst_fmt)?;
    if src_fmt.color_channels() != dst_fmt.color_channels() {
        return Err(RasterError::IncompatibleFormat);
    }

    match mask {
        Some(mask) => {
            if mask.bpp() != 1 {
                return Err(RasterError::IncompatibleFormat);
            }
            walk3(src, mask, dst, |s, m, mut d| {
                for ((d, s), m) in d.rows_mut().zip(s.rows()).zip(m.rows()) {
                    rasterop::blend_row(d, dst_fmt, s, src_fmt, Some(m), mode, opacity, opts);
                }
            })
        }
        None => walk2(src, dst, |s, mut d| {
            for (d, s) in d.rows_mut().zip(s.rows()) {
                rasterop::blend_row(d, dst_fmt, s, src_fmt, None, mode, opacity, opts);
            }
        }),
    }
}

/// Blend a solid color onto the region, using the mask region as coverage
pub fn composite_color(
    dst: &mut PixelRegionMut,
    dst_fmt: PixelFormat,
    color: &[u8],
    mask: &PixelRegion,
    opacity: u8,
) -> Result<()> {
    check_format(dst.bpp(), dst_fmt)?;
    if mask.bpp() != 1 || color.len() != dst_fmt.color_channels() {
        return Err(RasterError::IncompatibleFormat);
    }
    walk2(mask, dst, |m, mut d| {
        for (d, m) in d.rows_mut().zip(m.rows()) {
            rasterop::mask_blend_row(d, dst_fmt, color, m, opacity);
        }
    })
}

/// Multiply the region's alpha channel by the mask and a maximum opacity
pub fn apply_mask(
    region: &mut PixelRegionMut,
    fmt: PixelFormat,
    mask: &PixelRegion,
    max_opacity: u8,
) -> Result<()> {
    check_format(region.bpp(), fmt)?;
    if mask.bpp() != 1 || !fmt.has_alpha {
        return Err(RasterError::IncompatibleFormat);
    }
    walk2(mask, region, |m, mut d| {
        for (d, m) in d.rows_mut().zip(m.rows()) {
            rasterop::apply_mask_row(d, fmt, m, max_opacity);
        }
    })
}

// Produce a new store from the region, converting each row
fn convert_region<F>(src: &PixelRegion, new_bpp: usize, convert: F) -> Result<TileStore>
where
    F: Fn(&[u8], &mut [u8]),
{
    let r = src.rect();
    let mut out = TileStore::new(r.w as u32, r.h as u32, new_bpp as u32)?;
    walk2(src, &mut PixelRegionMut::whole(&mut out), |s, mut d| {
        for (d, s) in d.rows_mut().zip(s.rows()) {
            convert(s, d);
        }
    })?;
    Ok(out)
}

/// Copy the alpha channel into a new single channel store
pub fn extract_alpha(src: &PixelRegion, fmt: PixelFormat) -> Result<TileStore> {
    check_format(src.bpp(), fmt)?;
    convert_region(src, 1, |s, d| rasterop::extract_alpha_row(s, fmt, d))
}

/// Create a copy of the region with an added, fully opaque, alpha channel
pub fn add_alpha_channel(src: &PixelRegion, fmt: PixelFormat) -> Result<TileStore> {
    check_format(src.bpp(), fmt)?;
    if fmt.has_alpha {
        return Err(RasterError::IncompatibleFormat);
    }
    convert_region(src, fmt.bpp() + 1, |s, d| rasterop::add_alpha_row(s, fmt, d))
}

/// Composite the region over a solid color, producing a store without alpha
pub fn flatten_against_color(
    src: &PixelRegion,
    fmt: PixelFormat,
    background: [u8; 3],
) -> Result<TileStore> {
    check_format(src.bpp(), fmt)?;
    if !fmt.has_alpha {
        return Err(RasterError::IncompatibleFormat);
    }
    let bg = fmt.pixel_from_rgba([background[0], background[1], background[2], 255]);
    let n = fmt.color_channels();
    convert_region(src, n, |s, d| rasterop::flatten_row(s, fmt, d, &bg[..n]))
}

/// Convert the region into a single channel intensity store
pub fn gray_from_color(src: &PixelRegion, fmt: PixelFormat) -> Result<TileStore> {
    check_format(src.bpp(), fmt)?;
    convert_region(src, 1, |s, d| rasterop::gray_row(s, fmt, d))
}

pub fn invert_region(
    region: &mut PixelRegionMut,
    fmt: PixelFormat,
    components: ComponentSet,
) -> Result<()> {
    check_format(region.bpp(), fmt)?;
    region.for_each_chunk_mut(|mut chunk| {
        chunk
            .rows_mut()
            .for_each(|row| rasterop::invert_row(row, fmt, components));
    });
    Ok(())
}

pub fn fill_region(region: &mut PixelRegionMut, pixel: &[u8]) -> Result<()> {
    if pixel.len() != region.bpp() {
        return Err(RasterError::IncompatibleFormat);
    }
    region.for_each_chunk_mut(|mut chunk| {
        for row in chunk.rows_mut() {
            for px in row.chunks_exact_mut(pixel.len()) {
                px.copy_from_slice(pixel);
            }
        }
    });
    Ok(())
}

/// Snap alpha to either fully opaque or fully transparent
pub fn threshold_alpha(region: &mut PixelRegionMut, fmt: PixelFormat, threshold: u8) -> Result<()> {
    check_format(region.bpp(), fmt)?;
    region.for_each_chunk_mut(|mut chunk| {
        chunk
            .rows_mut()
            .for_each(|row| rasterop::threshold_alpha_row(row, fmt, threshold));
    });
    Ok(())
}

/// Find the bounding rectangle of the non-zero pixels of a single channel region.
///
/// The result is relative to the region's top-left corner.
pub fn nonzero_bounds(src: &PixelRegion) -> Option<Rectangle> {
    debug_assert_eq!(src.bpp(), 1);
    let mut bounds: Option<Rectangle> = None;
    for chunk in src.chunks() {
        for (j, row) in chunk.rows().enumerate() {
            let first = row.iter().position(|&v| v > 0);
            let last = row.iter().rposition(|&v| v > 0);
            if let (Some(first), Some(last)) = (first, last) {
                let r = Rectangle::new(
                    chunk.local.x + first as i32,
                    chunk.local.y + j as i32,
                    (last - first) as i32 + 1,
                    1,
                );
                bounds = Some(match bounds {
                    Some(b) => b.union(&r),
                    None => r,
                });
            }
        }
    }
    bounds
}

/// Build a new store by sampling the source with a coordinate mapping.
///
/// `map` returns the source pixel for each destination pixel, or None
/// to leave it zero. The progress callback is invoked after every chunk
/// with the completed fraction. Returning `ControlFlow::Break` cancels
/// the operation.
pub(crate) fn resample<M, F>(
    src: &TileStore,
    width: u32,
    height: u32,
    map: M,
    mut progress: F,
) -> Result<TileStore>
where
    M: Fn(u32, u32) -> Option<(u32, u32)>,
    F: FnMut(f32) -> ControlFlow<()>,
{
    let mut out = TileStore::new(width, height, src.bpp())?;
    let bpp = src.bpp() as usize;
    let total = width as f32 * height as f32;
    let mut done = 0usize;

    PixelRegionMut::whole(&mut out).try_for_each_chunk_mut(|mut chunk| {
        let rect = chunk.rect;
        for (j, row) in chunk.rows_mut().enumerate() {
            let y = rect.y as u32 + j as u32;
            for (i, px) in row.chunks_exact_mut(bpp).enumerate() {
                if let Some((sx, sy)) = map(rect.x as u32 + i as u32, y) {
                    px.copy_from_slice(src.pixel_at(sx, sy));
                }
            }
        }
        done += rect.area();
        match progress(done as f32 / total) {
            ControlFlow::Continue(()) => Ok(()),
            ControlFlow::Break(()) => Err(RasterError::Cancelled),
        }
    })?;

    Ok(out)
}

/// Resample a whole store to a new size (nearest neighbour).
///
/// Returning `ControlFlow::Break` from the progress callback cancels
/// the operation.
pub fn scale_region<F>(src: &TileStore, width: u32, height: u32, progress: F) -> Result<TileStore>
where
    F: FnMut(f32) -> ControlFlow<()>,
{
    let (sw, sh) = (src.width() as u64, src.height() as u64);
    let (dw, dh) = (width.max(1) as u64, height.max(1) as u64);
    resample(
        src,
        width,
        height,
        |x, y| {
            Some((
                ((2 * x as u64 + 1) * sw / (2 * dw)) as u32,
                ((2 * y as u64 + 1) * sh / (2 * dh)) as u32,
            ))
        },
        progress,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, px: &[u8]) -> TileStore {
        let mut s = TileStore::new(w, h, px.len() as u32).unwrap();
        s.fill(px);
        s
    }

    #[test]
    fn test_copy_requires_same_depth() {
        let src = solid(10, 10, &[1, 2]);
        let mut dst = TileStore::new(10, 10, 1).unwrap();
        assert!(matches!(
            copy_region(&PixelRegion::whole(&src), &mut PixelRegionMut::whole(&mut dst)),
            Err(RasterError::IncompatibleFormat)
        ));
    }

    #[test]
    fn test_blend_with_mask() {
        let src = solid(100, 100, &[255, 255, 255, 255]);
        let mut dst = solid(100, 100, &[0, 0, 0, 255]);
        let mut mask = TileStore::new(100, 100, 1).unwrap();
        mask.set_pixel_at(70, 70, &[255]);

        composite_blend(
            &PixelRegion::whole(&src),
            PixelFormat::RGBA,
            &mut PixelRegionMut::whole(&mut dst),
            PixelFormat::RGBA,
            Blendmode::Normal,
            255,
            Some(&PixelRegion::whole(&mask)),
            &BlendOptions::default(),
        )
        .unwrap();

        assert_eq!(dst.pixel_at(70, 70), &[255, 255, 255, 255]);
        assert_eq!(dst.pixel_at(69, 70), &[0, 0, 0, 255]);
    }

    #[test]
    fn test_blend_format_mismatch() {
        let src = solid(10, 10, &[255, 255]);
        let mut dst = solid(10, 10, &[0, 0, 0, 255]);
        let result = composite_blend(
            &PixelRegion::whole(&src),
            PixelFormat::GRAYA,
            &mut PixelRegionMut::whole(&mut dst),
            PixelFormat::RGBA,
            Blendmode::Normal,
            255,
            None,
            &BlendOptions::default(),
        );
        assert!(matches!(result, Err(RasterError::IncompatibleFormat)));
    }

    #[test]
    fn test_channel_count_changes() {
        let src = solid(70, 5, &[10, 20, 30, 128]);
        let region = PixelRegion::whole(&src);

        let alpha = extract_alpha(&region, PixelFormat::RGBA).unwrap();
        assert_eq!(alpha.bpp(), 1);
        assert_eq!(alpha.pixel_at(69, 4), &[128]);

        let flat = flatten_against_color(&region, PixelFormat::RGBA, [255, 255, 255]).unwrap();
        assert_eq!(flat.bpp(), 3);
        assert_eq!(flat.pixel_at(0, 0), &[132, 137, 142]);

        let rgb = solid(5, 5, &[1, 2, 3]);
        let with_alpha = add_alpha_channel(&PixelRegion::whole(&rgb), PixelFormat::RGB).unwrap();
        assert_eq!(with_alpha.pixel_at(4, 4), &[1, 2, 3, 255]);
    }

    #[test]
    fn test_lut_in_place_keeps_alpha() {
        let mut store = solid(3, 3, &[10, 200]);
        let mut region = PixelRegionMut::whole(&mut store);
        apply_lut_in_place(&mut region, PixelFormat::GRAYA, &Lut::invert(1), ComponentSet::ALL)
            .unwrap();
        assert_eq!(store.pixel_at(1, 1), &[245, 200]);

        let mut region = PixelRegionMut::whole(&mut store);
        apply_lut_in_place(&mut region, PixelFormat::GRAYA, &Lut::invert(2), ComponentSet::ALL)
            .unwrap();
        assert_eq!(store.pixel_at(1, 1), &[10, 55]);
    }

    #[test]
    fn test_lut_into_other_store() {
        let src = solid(70, 70, &[10, 20, 30]);
        let mut dst = TileStore::new(70, 70, 3).unwrap();
        let green_locked = ComponentSet::ALL.with(1, false);
        apply_lut(
            &PixelRegion::whole(&src),
            &mut PixelRegionMut::whole(&mut dst),
            PixelFormat::RGB,
            &Lut::invert(3),
            green_locked,
        )
        .unwrap();
        assert_eq!(dst.pixel_at(69, 69), &[245, 20, 225]);
        assert_eq!(src.pixel_at(69, 69), &[10, 20, 30]);
    }

    #[test]
    fn test_threshold_alpha() {
        let mut store = solid(2, 1, &[5, 127]);
        store.set_pixel_at(1, 0, &[5, 128]);
        threshold_alpha(&mut PixelRegionMut::whole(&mut store), PixelFormat::GRAYA, 128).unwrap();
        assert_eq!(store.pixel_at(0, 0), &[5, 0]);
        assert_eq!(store.pixel_at(1, 0), &[5, 255]);
    }

    #[test]
    fn test_subregion_fill() {
        let mut store = TileStore::new(128, 128, 1).unwrap();
        let mut region = PixelRegionMut::new(&mut store, Rectangle::new(60, 60, 8, 8)).unwrap();
        fill_region(&mut region, &[9]).unwrap();
        assert_eq!(store.pixel_at(60, 60), &[9]);
        assert_eq!(store.pixel_at(67, 67), &[9]);
        assert_eq!(store.pixel_at(68, 67), &[0]);
        assert_eq!(store.allocated_tiles(), 4);
    }

    #[test]
    fn test_scale() {
        let mut src = TileStore::new(2, 2, 1).unwrap();
        src.set_pixel_at(1, 1, &[255]);
        let scaled = scale_region(&src, 100, 100, |_| ControlFlow::Continue(())).unwrap();
        assert_eq!(scaled.pixel_at(0, 0), &[0]);
        assert_eq!(scaled.pixel_at(49, 49), &[0]);
        assert_eq!(scaled.pixel_at(50, 50), &[255]);
        assert_eq!(scaled.pixel_at(99, 99), &[255]);

        let mut calls = 0;
        let cancelled = scale_region(&src, 100, 100, |_| {
            calls += 1;
            ControlFlow::Break(())
        });
        assert!(matches!(cancelled, Err(RasterError::Cancelled)));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_nonzero_bounds() {
        let mut s = TileStore::new(200, 100, 1).unwrap();
        let region = PixelRegion::new(&s, Rectangle::new(10, 10, 150, 80)).unwrap();
        assert_eq!(nonzero_bounds(&region), None);
        s.set_pixel_at(70, 20, &[1]);
        s.set_pixel_at(130, 65, &[255]);
        let region = PixelRegion::new(&s, Rectangle::new(10, 10, 150, 80)).unwrap();
        assert_eq!(nonzero_bounds(&region), Some(Rectangle::new(60, 10, 61, 46)));
    }
}
