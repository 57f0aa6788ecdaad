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


use std::ops::ControlFlow;

use super::color::PixelFormat;
use super::pixelbuffer::PixelBuffer;
use super::regionops::scale_region;
use super::tilestore::TileStore;
use super::transform::{flip_store, rotate_store, transform_store, Affine, Orientation, Rotation};
use super::{Rectangle, Size};
use crate::{RasterError, Result};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DrawableKind {
    Layer,
    Channel,
    LayerMask,
}

/// Where a drawable is in its life.
///
/// Transitions only go forward: a removed drawable cannot be attached again.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Lifecycle {
    Unattached,
    Attached,
    Removed,
}

/// A named tile store with a pixel format and a position in the image.
///
/// This is the common part of layers, layer masks and channels.
/// Surface operations are implemented here once; `Layer` extends
/// them to cover its mask too.
#[derive(Clone, Debug)]
pub struct Drawable {
    name: String,
    kind: DrawableKind,
    tiles: TileStore,
    format: PixelFormat,
    offset_x: i32,
    offset_y: i32,
    pub visible: bool,
    lifecycle: Lifecycle,
    preview: Option<PixelBuffer>,
}

impl Drawable {
    /// Create a new transparent drawable.
    ///
    /// Channels and layer masks must use the single channel gray format.
    pub fn new(
        kind: DrawableKind,
        name: &str,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Drawable> {
        let tiles = TileStore::new(width, height, format.bpp() as u32)?;
        Self::from_store(kind, name, tiles, format)
    }

    /// Wrap an existing tile store
    pub fn from_store(
        kind: DrawableKind,
        name: &str,
        tiles: TileStore,
        format: PixelFormat,
    ) -> Result<Drawable> {
        if kind != DrawableKind::Layer && format != PixelFormat::GRAY {
            return Err(RasterError::IncompatibleFormat);
        }
        if tiles.bpp() as usize != format.bpp() {
            return Err(RasterError::IncompatibleFormat);
        }
        Ok(Drawable {
            name: name.to_string(),
            kind,
            tiles,
            format,
            offset_x: 0,
            offset_y: 0,
            visible: true,
            lifecycle: Lifecycle::Unattached,
            preview: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn kind(&self) -> DrawableKind {
        self.kind
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.tiles.width()
    }

    pub fn height(&self) -> u32 {
        self.tiles.height()
    }

    pub fn size(&self) -> Size {
        self.tiles.size()
    }

    pub fn offset(&self) -> (i32, i32) {
        (self.offset_x, self.offset_y)
    }

    /// Move the drawable.
    ///
    /// The offset is clamped so that the far edge stays within `i32`.
    pub fn set_offset(&mut self, x: i32, y: i32) {
        self.offset_x = x.min(i32::MAX - self.tiles.width() as i32);
        self.offset_y = y.min(i32::MAX - self.tiles.height() as i32);
    }

    /// The drawable's area in image coordinates
    pub fn bounds(&self) -> Rectangle {
        self.tiles.bounds().offset(self.offset_x, self.offset_y)
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub(crate) fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }

    pub fn tiles(&self) -> &TileStore {
        &self.tiles
    }

    /// Get write access to the pixel content.
    ///
    /// This invalidates the cached preview.
    pub fn tiles_mut(&mut self) -> &mut TileStore {
        self.preview = None;
        &mut self.tiles
    }

    /// Replace the pixel content with a store of the same depth
    pub fn replace_tiles(&mut self, tiles: TileStore) -> Result<()> {
        if tiles.bpp() != self.tiles.bpp() {
            return Err(RasterError::IncompatibleFormat);
        }
        self.tiles = tiles;
        self.preview = None;
        Ok(())
    }

    /// Replace the content and the format at the same time
    pub(crate) fn replace_content(&mut self, tiles: TileStore, format: PixelFormat) {
        debug_assert_eq!(tiles.bpp() as usize, format.bpp());
        self.tiles = tiles;
        self.format = format;
        self.preview = None;
    }

    /// Get the flat preview of the content, rendering it if needed
    pub fn preview(&mut self) -> Result<&PixelBuffer> {
        let preview = match self.preview.take() {
            Some(p) => p,
            None => PixelBuffer::from_store(&self.tiles, &self.tiles.bounds(), self.format)?,
        };
        Ok(self.preview.insert(preview))
    }

    pub fn has_preview(&self) -> bool {
        self.preview.is_some()
    }

    pub fn invalidate_preview(&mut self) {
        self.preview = None;
    }

    /// Change the size of the drawable.
    ///
    /// The content is shifted by (dx, dy) and the drawable's offset
    /// moves the opposite way, so the pixels stay put in the image.
    pub fn resize(&mut self, width: u32, height: u32, dx: i32, dy: i32) -> Result<()> {
        self.tiles.resize(width, height, dx, dy)?;
        self.set_offset(self.offset_x.saturating_sub(dx), self.offset_y.saturating_sub(dy));
        self.preview = None;
        Ok(())
    }

    pub(crate) fn scaled_store<F>(&self, width: u32, height: u32, progress: F) -> Result<TileStore>
    where
        F: FnMut(f32) -> ControlFlow<()>,
    {
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidDimensions);
        }
        scale_region(&self.tiles, width, height, progress)
    }

    /// Scale the content to a new size.
    ///
    /// If the progress callback cancels, the drawable is left unchanged.
    pub fn scale<F>(&mut self, width: u32, height: u32, progress: F) -> Result<()>
    where
        F: FnMut(f32) -> ControlFlow<()>,
    {
        let tiles = self.scaled_store(width, height, progress)?;
        self.replace_tiles(tiles)
    }

    pub fn flip(&mut self, orientation: Orientation) -> Result<()> {
        let tiles = flip_store(&self.tiles, orientation)?;
        self.replace_tiles(tiles)
    }

    /// Rotate the content around the drawable's center
    pub fn rotate(&mut self, rotation: Rotation) -> Result<()> {
        let tiles = rotate_store(&self.tiles, rotation)?;
        let (w, h) = (self.width() as i32, self.height() as i32);
        self.replace_tiles(tiles)?;
        if rotation != Rotation::Half {
            self.set_offset(
                self.offset_x.saturating_add((w - h) / 2),
                self.offset_y.saturating_add((h - w) / 2),
            );
        }
        Ok(())
    }

    pub(crate) fn transformed_store<F>(
        &self,
        affine: &Affine,
        progress: F,
    ) -> Result<(TileStore, Rectangle)>
    where
        F: FnMut(f32) -> ControlFlow<()>,
    {
        transform_store(&self.tiles, &self.bounds(), affine, progress)
    }

    /// Apply an affine transformation (in image coordinates).
    ///
    /// The drawable is resized to the bounding box of the result.
    pub fn transform<F>(&mut self, affine: &Affine, progress: F) -> Result<()>
    where
        F: FnMut(f32) -> ControlFlow<()>,
    {
        let (tiles, bounds) = self.transformed_store(affine, progress)?;
        self.replace_tiles(tiles)?;
        self.set_offset(bounds.x, bounds.y);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_format() {
        assert!(matches!(
            Drawable::new(DrawableKind::Channel, "c", 4, 4, PixelFormat::RGBA),
            Err(RasterError::IncompatibleFormat)
        ));
        assert!(matches!(
            Drawable::new(DrawableKind::Layer, "l", 0, 4, PixelFormat::RGBA),
            Err(RasterError::InvalidDimensions)
        ));
        let mut d = Drawable::new(DrawableKind::LayerMask, "m", 4, 4, PixelFormat::GRAY).unwrap();
        assert_eq!(d.lifecycle(), Lifecycle::Unattached);
        d.set_name("Mask copy");
        assert_eq!(d.name(), "Mask copy");
    }

    #[test]
    fn test_preview_invalidation() {
        let mut d = Drawable::new(DrawableKind::Layer, "l", 4, 4, PixelFormat::GRAYA).unwrap();
        assert_eq!(d.preview().unwrap().pixel(0, 0), &[0, 0]);
        assert!(d.has_preview());
        d.tiles_mut().set_pixel_at(0, 0, &[9, 255]);
        assert!(!d.has_preview());
        assert_eq!(d.preview().unwrap().pixel(0, 0), &[9, 255]);
    }

    #[test]
    fn test_resize_keeps_position() {
        let mut d = Drawable::new(DrawableKind::Layer, "l", 10, 10, PixelFormat::GRAY).unwrap();
        d.set_offset(5, 5);
        d.tiles_mut().set_pixel_at(0, 0, &[7]);
        d.resize(20, 20, 3, 4).unwrap();
        assert_eq!(d.bounds(), Rectangle::new(2, 1, 20, 20));
        assert_eq!(d.tiles().pixel_at(3, 4), &[7]);
    }

    #[test]
    fn test_rotate_keeps_center() {
        let mut d = Drawable::new(DrawableKind::Layer, "l", 10, 4, PixelFormat::GRAY).unwrap();
        d.rotate(Rotation::Cw90).unwrap();
        assert_eq!(d.bounds(), Rectangle::new(3, -3, 4, 10));
    }

    #[test]
    fn test_cancelled_scale() {
        let mut d = Drawable::new(DrawableKind::Layer, "l", 100, 100, PixelFormat::GRAY).unwrap();
        d.tiles_mut().fill(&[3]);
        let r = d.scale(200, 200, |_| ControlFlow::Break(()));
        assert!(matches!(r, Err(RasterError::Cancelled)));
        assert_eq!(d.size(), Size::new(100, 100));
        assert_eq!(d.tiles().pixel_at(99, 99), &[3]);
    }

    #[test]
    fn test_transform_moves_offset() {
        let mut d = Drawable::new(DrawableKind::Layer, "l", 8, 8, PixelFormat::GRAY).unwrap();
        d.transform(&Affine::translate(4.0, 2.0), |_| ControlFlow::Continue(()))
            .unwrap();
        assert_eq!(d.bounds(), Rectangle::new(4, 2, 8, 8));
    }
}
