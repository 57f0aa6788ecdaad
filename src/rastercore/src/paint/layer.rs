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


use std::fmt;
use std::ops::ControlFlow;

use super::boundary::Boundary;
use super::color::{ColorType, ComponentSet, PixelFormat};
use super::drawable::{Drawable, DrawableKind, Lifecycle};
use super::image::DrawableRef;
use super::region::{PixelRegion, PixelRegionMut};
use super::regionops;
use super::tilestore::TileStore;
use super::transform::{Affine, Orientation, Rotation};
use super::{AoE, Blendmode, Rectangle};
use crate::{RasterError, Result};

/// Layer identifier, allocated by the image the layer is added to.
///
/// Zero means the layer has not been added to an image yet.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct LayerId(pub u32);

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct ChannelId(pub u32);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer {:04x}", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel {:04x}", self.0)
    }
}

/// Initial content of a new layer mask
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MaskKind {
    White,
    Black,
    AlphaCopy,
    /// Like AlphaCopy, but the layer becomes opaque once the mask is added
    AlphaTransfer,
    SelectionCopy,
    InverseSelectionCopy,
    GraySourceCopy,
}

/// What to do with the mask's content when removing it
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MaskApply {
    Apply,
    Discard,
}

#[derive(Clone, Debug)]
pub struct LayerMask {
    drawable: Drawable,

    /// Modulate the layer's alpha with the mask when compositing
    pub apply: bool,

    /// Show the mask instead of the layer
    pub show: bool,

    /// The mask (rather than the layer) receives edits
    pub edit: bool,

    // Reset the layer's alpha once the mask has been added
    alpha_transfer: bool,
}

impl LayerMask {
    pub fn new(name: &str, width: u32, height: u32) -> Result<LayerMask> {
        Ok(Self::from_drawable(Drawable::new(
            DrawableKind::LayerMask,
            name,
            width,
            height,
            PixelFormat::GRAY,
        )?))
    }

    pub(crate) fn from_drawable(drawable: Drawable) -> LayerMask {
        debug_assert_eq!(drawable.kind(), DrawableKind::LayerMask);
        LayerMask {
            drawable,
            apply: true,
            show: false,
            edit: true,
            alpha_transfer: false,
        }
    }

    pub(crate) fn with_alpha_transfer(mut self) -> Self {
        self.alpha_transfer = true;
        self
    }

    pub fn drawable(&self) -> &Drawable {
        &self.drawable
    }

    pub fn drawable_mut(&mut self) -> &mut Drawable {
        &mut self.drawable
    }

    pub fn tiles(&self) -> &TileStore {
        self.drawable.tiles()
    }
}

/// A color channel: an extra gray drawable shown as a tinted overlay
#[derive(Clone, Debug)]
pub struct Channel {
    pub(crate) id: ChannelId,
    drawable: Drawable,
    pub color: [u8; 3],
    pub opacity: u8,
}

impl Channel {
    pub fn new(name: &str, width: u32, height: u32, color: [u8; 3]) -> Result<Channel> {
        Ok(Channel {
            id: ChannelId::default(),
            drawable: Drawable::new(DrawableKind::Channel, name, width, height, PixelFormat::GRAY)?,
            color,
            opacity: 128,
        })
    }

    pub fn from_store(name: &str, tiles: TileStore, color: [u8; 3]) -> Result<Channel> {
        Ok(Channel {
            id: ChannelId::default(),
            drawable: Drawable::from_store(DrawableKind::Channel, name, tiles, PixelFormat::GRAY)?,
            color,
            opacity: 128,
        })
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn drawable(&self) -> &Drawable {
        &self.drawable
    }

    pub fn drawable_mut(&mut self) -> &mut Drawable {
        &mut self.drawable
    }
}

/// The state that makes a layer a floating selection
#[derive(Clone, Debug)]
pub struct FloatingState {
    pub(crate) target: DrawableRef,

    /// Target pixels under the layer, same size as the layer, target's depth
    pub(crate) backing: TileStore,

    /// True when the target currently holds its own pixels
    /// (nothing has been composited since the last rigor/relax)
    pub(crate) initial: bool,

    pub(crate) boundary: Option<Boundary>,
}

impl FloatingState {
    pub fn target(&self) -> DrawableRef {
        self.target
    }

    pub fn backing_store(&self) -> &TileStore {
        &self.backing
    }

    pub fn is_initial(&self) -> bool {
        self.initial
    }
}

#[derive(Clone, Debug)]
pub struct Layer {
    pub(crate) id: LayerId,
    drawable: Drawable,
    pub opacity: u8,
    pub mode: Blendmode,
    pub preserve_alpha: bool,
    mask: Option<LayerMask>,
    pub(crate) floating: Option<FloatingState>,
}

impl Layer {
    /// Create a new transparent layer
    pub fn new(
        name: &str,
        width: u32,
        height: u32,
        color: ColorType,
        has_alpha: bool,
    ) -> Result<Layer> {
        let format = PixelFormat::new(color, has_alpha);
        Ok(Self::from_drawable(Drawable::new(
            DrawableKind::Layer,
            name,
            width,
            height,
            format,
        )?))
    }

    /// Create a layer from existing pixel content
    pub fn from_store(name: &str, tiles: TileStore, format: PixelFormat) -> Result<Layer> {
        Ok(Self::from_drawable(Drawable::from_store(
            DrawableKind::Layer,
            name,
            tiles,
            format,
        )?))
    }

    fn from_drawable(drawable: Drawable) -> Layer {
        Layer {
            id: LayerId::default(),
            drawable,
            opacity: 255,
            mode: Blendmode::Normal,
            preserve_alpha: false,
            mask: None,
            floating: None,
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn drawable(&self) -> &Drawable {
        &self.drawable
    }

    pub fn drawable_mut(&mut self) -> &mut Drawable {
        &mut self.drawable
    }

    pub fn name(&self) -> &str {
        self.drawable.name()
    }

    pub fn format(&self) -> PixelFormat {
        self.drawable.format()
    }

    pub fn tiles(&self) -> &TileStore {
        self.drawable.tiles()
    }

    pub fn bounds(&self) -> Rectangle {
        self.drawable.bounds()
    }

    pub fn is_visible(&self) -> bool {
        self.drawable.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.drawable.visible = visible;
    }

    /// Move the layer (and its mask) to a new position
    pub fn set_offset(&mut self, x: i32, y: i32) {
        self.drawable.set_offset(x, y);
        if let Some(m) = &mut self.mask {
            m.drawable.set_offset(x, y);
        }
    }

    pub fn mask(&self) -> Option<&LayerMask> {
        self.mask.as_ref()
    }

    pub fn mask_mut(&mut self) -> Option<&mut LayerMask> {
        self.mask.as_mut()
    }

    pub fn is_floating(&self) -> bool {
        self.floating.is_some()
    }

    pub fn floating_state(&self) -> Option<&FloatingState> {
        self.floating.as_ref()
    }

    pub(crate) fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.drawable.set_lifecycle(lifecycle);
        if let Some(m) = &mut self.mask {
            m.drawable.set_lifecycle(lifecycle);
        }
    }

    /// The channels that edits of this layer's own pixels may touch.
    ///
    /// With preserve-alpha set, the alpha channel is excluded.
    pub fn editable_components(&self) -> ComponentSet {
        let all = ComponentSet::ALL;
        match (self.preserve_alpha, self.format().alpha_index()) {
            (true, Some(ai)) => all.with(ai, false),
            _ => all,
        }
    }

    /// Attach a mask to this layer.
    ///
    /// The mask must be the same size as the layer, and the layer
    /// must not have a mask already. On failure, the layer is not modified.
    pub fn add_mask(&mut self, mut mask: LayerMask) -> Result<AoE> {
        if self.mask.is_some() || mask.drawable.lifecycle() != Lifecycle::Unattached {
            return Err(RasterError::AlreadyExists);
        }
        if mask.drawable.size() != self.drawable.size() {
            return Err(RasterError::DimensionMismatch);
        }

        if mask.alpha_transfer {
            mask.alpha_transfer = false;
            let fmt = self.format();
            if let Some(ai) = fmt.alpha_index() {
                let bpp = fmt.bpp();
                PixelRegionMut::whole(self.drawable.tiles_mut()).for_each_chunk_mut(|mut chunk| {
                    for row in chunk.rows_mut() {
                        row.chunks_exact_mut(bpp).for_each(|px| px[ai] = 255);
                    }
                });
            }
        }

        let (x, y) = self.drawable.offset();
        mask.drawable.set_offset(x, y);
        mask.drawable.set_lifecycle(self.drawable.lifecycle());
        let visible = mask.apply || mask.show;
        self.mask = Some(mask);

        Ok(if visible && self.is_visible() {
            AoE::Bounds(self.bounds())
        } else {
            AoE::Nothing
        })
    }

    /// Detach the layer mask, optionally applying it to the alpha channel first.
    ///
    /// When applying a mask to a layer without alpha, an alpha channel is added.
    pub fn remove_mask(&mut self, apply: MaskApply) -> Result<LayerMask> {
        let mut mask = self.mask.take().ok_or(RasterError::NotFound)?;

        if apply == MaskApply::Apply {
            if let Err(e) = self.apply_mask_content(&mask) {
                self.mask = Some(mask);
                return Err(e);
            }
        }

        mask.drawable.set_lifecycle(Lifecycle::Removed);
        Ok(mask)
    }

    fn apply_mask_content(&mut self, mask: &LayerMask) -> Result<()> {
        let fmt = self.format();
        if !fmt.has_alpha {
            let tiles = regionops::add_alpha_channel(&PixelRegion::whole(self.tiles()), fmt)?;
            self.drawable.replace_content(tiles, fmt.with_alpha());
        }
        let fmt = self.format();
        regionops::apply_mask(
            &mut PixelRegionMut::whole(self.drawable.tiles_mut()),
            fmt,
            &PixelRegion::whole(mask.tiles()),
            255,
        )
    }

    pub fn resize(&mut self, width: u32, height: u32, dx: i32, dy: i32) -> Result<()> {
        self.drawable.resize(width, height, dx, dy)?;
        if let Some(m) = &mut self.mask {
            m.drawable.resize(width, height, dx, dy)?;
        }
        Ok(())
    }

    /// Scale the layer and its mask.
    ///
    /// The progress callback sees the layer and then the mask.
    /// If it cancels, neither is changed.
    pub fn scale<F>(&mut self, width: u32, height: u32, mut progress: F) -> Result<()>
    where
        F: FnMut(f32) -> ControlFlow<()>,
    {
        let tiles = self.drawable.scaled_store(width, height, &mut progress)?;
        let mask_tiles = match &self.mask {
            Some(m) => Some(m.drawable.scaled_store(width, height, &mut progress)?),
            None => None,
        };
        self.drawable.replace_tiles(tiles)?;
        if let (Some(m), Some(t)) = (&mut self.mask, mask_tiles) {
            m.drawable.replace_tiles(t)?;
        }
        Ok(())
    }

    pub fn flip(&mut self, orientation: Orientation) -> Result<()> {
        self.drawable.flip(orientation)?;
        if let Some(m) = &mut self.mask {
            m.drawable.flip(orientation)?;
        }
        Ok(())
    }

    pub fn rotate(&mut self, rotation: Rotation) -> Result<()> {
        self.drawable.rotate(rotation)?;
        if let Some(m) = &mut self.mask {
            m.drawable.rotate(rotation)?;
        }
        Ok(())
    }

    pub fn transform<F>(&mut self, affine: &Affine, mut progress: F) -> Result<()>
    where
        F: FnMut(f32) -> ControlFlow<()>,
    {
        let (tiles, bounds) = self.drawable.transformed_store(affine, &mut progress)?;
        let mask_tiles = match &self.mask {
            Some(m) => Some(m.drawable.transformed_store(affine, &mut progress)?.0),
            None => None,
        };
        self.drawable.replace_tiles(tiles)?;
        if let (Some(m), Some(t)) = (&mut self.mask, mask_tiles) {
            m.drawable.replace_tiles(t)?;
        }
        self.set_offset(bounds.x, bounds.y);
        Ok(())
    }
}
