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


//! Outlines of the opaque parts of a drawable.

use std::collections::HashMap;

use super::color::PixelFormat;
use super::region::PixelRegion;
use super::tilestore::TileStore;
use super::Rectangle;

/// A directed boundary segment.
///
/// Segments are either horizontal or vertical. Walking from the first
/// point to the second, the inside is on the right (with y pointing down).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct BoundSeg {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Boundary {
    segments: Vec<BoundSeg>,
}

// Which side of an edge is inside
#[derive(Copy, Clone, PartialEq)]
enum Side {
    None,
    Before,
    After,
}

fn edge(before: bool, after: bool) -> Side {
    match (before, after) {
        (true, false) => Side::Before,
        (false, true) => Side::After,
        _ => Side::None,
    }
}

fn inside_flags(store: &TileStore, fmt: PixelFormat, threshold: u8, y: i32, out: &mut Vec<bool>) {
    out.clear();
    let rect = Rectangle::new(0, y, store.width() as i32, 1);
    let region = match PixelRegion::new(store, rect) {
        Ok(r) => r,
        Err(_) => return,
    };
    let bpp = fmt.bpp();
    for chunk in region.chunks() {
        for row in chunk.rows() {
            out.extend(row.chunks_exact(bpp).map(|px| fmt.alpha_of(px) >= threshold));
        }
    }
}

impl Boundary {
    /// Trace the outline of the pixels whose alpha is at least `threshold`.
    ///
    /// Drawables without an alpha channel are entirely inside.
    /// The offset is added to every coordinate.
    pub fn find(store: &TileStore, fmt: PixelFormat, threshold: u8, offset: (i32, i32)) -> Boundary {
        let (w, h) = (store.width() as i32, store.height() as i32);
        let (ox, oy) = offset;
        let mut segments = Vec::new();

        let mut prev: Vec<bool> = vec![false; w as usize];
        let mut cur: Vec<bool> = Vec::with_capacity(w as usize);
        for y in 0..=h {
            if y < h {
                inside_flags(store, fmt, threshold, y, &mut cur);
            } else {
                cur.clear();
                cur.resize(w as usize, false);
            }

            // Horizontal edges on the line between rows y-1 and y
            let mut run: Option<(i32, Side)> = None;
            for x in 0..=w {
                let side = if x < w {
                    edge(prev[x as usize], cur[x as usize])
                } else {
                    Side::None
                };
                match run {
                    Some((_, s)) if s == side => {}
                    _ => {
                        if let Some((start, s)) = run.take() {
                            let (x1, x2) = if s == Side::After { (start, x) } else { (x, start) };
                            segments.push(BoundSeg {
                                x1: x1 + ox,
                                y1: y + oy,
                                x2: x2 + ox,
                                y2: y + oy,
                            });
                        }
                        if side != Side::None {
                            run = Some((x, side));
                        }
                    }
                }
            }

            // Vertical edges within row y
            if y < h {
                for x in 0..=w {
                    let left = x > 0 && cur[x as usize - 1];
                    let right = x < w && cur[x as usize];
                    match edge(left, right) {
                        Side::Before => segments.push(BoundSeg {
                            x1: x + ox,
                            y1: y + oy,
                            x2: x + ox,
                            y2: y + 1 + oy,
                        }),
                        Side::After => segments.push(BoundSeg {
                            x1: x + ox,
                            y1: y + 1 + oy,
                            x2: x + ox,
                            y2: y + oy,
                        }),
                        Side::None => {}
                    }
                }
            }

            std::mem::swap(&mut prev, &mut cur);
        }

        Boundary {
            segments: merge_vertical(segments),
        }
    }

    pub fn segments(&self) -> &[BoundSeg] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Chain the segments into closed polygons.
    ///
    /// Each polygon is a list of corner points; the last point connects
    /// back to the first.
    pub fn polygons(&self) -> Vec<Vec<(i32, i32)>> {
        let mut starts: HashMap<(i32, i32), Vec<usize>> = HashMap::new();
        for (i, s) in self.segments.iter().enumerate() {
            starts.entry((s.x1, s.y1)).or_default().push(i);
        }

        let mut used = vec![false; self.segments.len()];
        let mut polygons = Vec::new();

        for first in 0..self.segments.len() {
            if used[first] {
                continue;
            }
            let mut polygon = Vec::new();
            let mut current = first;
            loop {
                used[current] = true;
                let s = self.segments[current];
                polygon.push((s.x1, s.y1));
                let next = starts
                    .get(&(s.x2, s.y2))
                    .and_then(|c| c.iter().copied().find(|&i| !used[i]));
                match next {
                    Some(n) => current = n,
                    None => break,
                }
            }
            polygons.push(polygon);
        }

        polygons
    }
}

// Vertical edges are found one row at a time: join the ones that continue each other
fn merge_vertical(segments: Vec<BoundSeg>) -> Vec<BoundSeg> {
    let mut out: Vec<BoundSeg> = Vec::with_capacity(segments.len());
    let mut open: HashMap<(i32, bool), usize> = HashMap::new();

    for s in segments {
        if s.x1 != s.x2 {
            out.push(s);
            continue;
        }
        let down = s.y2 > s.y1;
        let top = s.y1.min(s.y2);
        match open.get(&(s.x1, down)).copied() {
            Some(i) if out[i].y1.max(out[i].y2) == top => {
                let seg = &mut out[i];
                if down {
                    seg.y2 = s.y2;
                } else {
                    seg.y1 = s.y1;
                }
            }
            _ => {
                open.insert((s.x1, down), out.len());
                out.push(s);
            }
        }
    }
    out
}
