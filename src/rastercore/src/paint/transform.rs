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


//! Geometric transformations of whole tile stores.

use std::ops::ControlFlow;

use super::regionops::resample;
use super::tilestore::TileStore;
use super::Rectangle;
use crate::{RasterError, Result};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Rotation by a multiple of 90 degrees
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Rotation {
    Cw90,
    Half,
    Ccw90,
}

/// A 2D affine transformation.
///
/// A point is mapped as `x' = xx*x + xy*y + x0` and `y' = yx*x + yy*y + y0`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Affine {
    pub xx: f64,
    pub yx: f64,
    pub xy: f64,
    pub yy: f64,
    pub x0: f64,
    pub y0: f64,
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        xx: 1.0,
        yx: 0.0,
        xy: 0.0,
        yy: 1.0,
        x0: 0.0,
        y0: 0.0,
    };

    pub fn translate(tx: f64, ty: f64) -> Affine {
        Affine {
            x0: tx,
            y0: ty,
            ..Self::IDENTITY
        }
    }

    pub fn scale(sx: f64, sy: f64) -> Affine {
        Affine {
            xx: sx,
            yy: sy,
            ..Self::IDENTITY
        }
    }

    /// Rotation around the origin. Positive angles turn clockwise
    /// in image coordinates (y axis pointing down).
    pub fn rotate(radians: f64) -> Affine {
        let (s, c) = radians.sin_cos();
        Affine {
            xx: c,
            yx: s,
            xy: -s,
            yy: c,
            x0: 0.0,
            y0: 0.0,
        }
    }

    /// Return a transformation that applies `self` first, then `next`
    pub fn then(&self, next: &Affine) -> Affine {
        Affine {
            xx: next.xx * self.xx + next.xy * self.yx,
            yx: next.yx * self.xx + next.yy * self.yx,
            xy: next.xx * self.xy + next.xy * self.yy,
            yy: next.yx * self.xy + next.yy * self.yy,
            x0: next.xx * self.x0 + next.xy * self.y0 + next.x0,
            y0: next.yx * self.x0 + next.yy * self.y0 + next.y0,
        }
    }

    pub fn invert(&self) -> Option<Affine> {
        let det = self.xx * self.yy - self.xy * self.yx;
        if det.abs() < 1e-12 {
            return None;
        }
        let xx = self.yy / det;
        let xy = -self.xy / det;
        let yx = -self.yx / det;
        let yy = self.xx / det;
        Some(Affine {
            xx,
            yx,
            xy,
            yy,
            x0: -(xx * self.x0 + xy * self.y0),
            y0: -(yx * self.x0 + yy * self.y0),
        })
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.xx * x + self.xy * y + self.x0,
            self.yx * x + self.yy * y + self.y0,
        )
    }

    /// Bounding box of the transformed rectangle, rounded outwards
    pub fn bounds(&self, r: &Rectangle) -> Option<Rectangle> {
        let (x0, y0) = (r.x as f64, r.y as f64);
        let (x1, y1) = ((r.x + r.w) as f64, (r.y + r.h) as f64);
        let corners = [
            self.apply(x0, y0),
            self.apply(x1, y0),
            self.apply(x0, y1),
            self.apply(x1, y1),
        ];
        let (mut minx, mut miny) = (f64::MAX, f64::MAX);
        let (mut maxx, mut maxy) = (f64::MIN, f64::MIN);
        for (x, y) in corners {
            minx = minx.min(x);
            miny = miny.min(y);
            maxx = maxx.max(x);
            maxy = maxy.max(y);
        }
        // Snap away floating point noise before rounding outwards
        let snap = |v: f64| (v * 1e6).round() / 1e6;
        let left = snap(minx).floor() as i32;
        let top = snap(miny).floor() as i32;
        Rectangle::try_new(
            left,
            top,
            snap(maxx).ceil() as i32 - left,
            snap(maxy).ceil() as i32 - top,
        )
    }
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

fn no_progress(_: f32) -> ControlFlow<()> {
    ControlFlow::Continue(())
}

pub fn flip_store(src: &TileStore, orientation: Orientation) -> Result<TileStore> {
    let (w, h) = (src.width(), src.height());
    match orientation {
        Orientation::Horizontal => resample(src, w, h, |x, y| Some((w - 1 - x, y)), no_progress),
        Orientation::Vertical => resample(src, w, h, |x, y| Some((x, h - 1 - y)), no_progress),
    }
}

pub fn rotate_store(src: &TileStore, rotation: Rotation) -> Result<TileStore> {
    let (w, h) = (src.width(), src.height());
    match rotation {
        Rotation::Cw90 => resample(src, h, w, |x, y| Some((y, h - 1 - x)), no_progress),
        Rotation::Half => resample(src, w, h, |x, y| Some((w - 1 - x, h - 1 - y)), no_progress),
        Rotation::Ccw90 => resample(src, h, w, |x, y| Some((w - 1 - y, x)), no_progress),
    }
}

/// Transform a store placed at `bounds` (in some shared coordinate space).
///
/// Returns the new store and its position in the same space.
/// Pixels are sampled at their centers (nearest neighbour).
pub fn transform_store<F>(
    src: &TileStore,
    bounds: &Rectangle,
    affine: &Affine,
    progress: F,
) -> Result<(TileStore, Rectangle)>
where
    F: FnMut(f32) -> ControlFlow<()>,
{
    let inverse = affine
        .invert()
        .ok_or(RasterError::UnsupportedOperation("singular transformation"))?;
    let target = affine.bounds(bounds).ok_or(RasterError::InvalidDimensions)?;
    let (w, h) = (src.width() as f64, src.height() as f64);

    let store = resample(
        src,
        target.w as u32,
        target.h as u32,
        |x, y| {
            let (u, v) = inverse.apply(
                (target.x as f64) + x as f64 + 0.5,
                (target.y as f64) + y as f64 + 0.5,
            );
            let (u, v) = ((u - bounds.x as f64).floor(), (v - bounds.y as f64).floor());
            if u >= 0.0 && v >= 0.0 && u < w && v < h {
                Some((u as u32, v as u32))
            } else {
                None
            }
        },
        progress,
    )?;

    Ok((store, target))
}
