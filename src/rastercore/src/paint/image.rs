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


use tracing::debug;

use super::color::{ColorType, ComponentSet, PixelFormat};
use super::drawable::{Drawable, DrawableKind, Lifecycle};
use super::floating;
use super::layer::{Channel, ChannelId, Layer, LayerId, LayerMask, MaskApply, MaskKind};
use super::region::{PixelRegion, PixelRegionMut};
use super::regionops;
use super::{Rectangle, Size};
use crate::{RasterError, Result};

/// A reference to one of the drawables of an image
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DrawableRef {
    Layer(LayerId),
    LayerMask(LayerId),
    Channel(ChannelId),
    Selection,
}

impl DrawableRef {
    /// The layer this drawable belongs to, if any
    pub fn layer_id(&self) -> Option<LayerId> {
        match self {
            DrawableRef::Layer(id) | DrawableRef::LayerMask(id) => Some(*id),
            _ => None,
        }
    }
}

/// A layered image document.
///
/// Layers are stored top to bottom: index 0 is the topmost layer.
#[derive(Clone, Debug)]
pub struct Image {
    width: u32,
    height: u32,
    base: ColorType,
    colormap: Vec<[u8; 3]>,
    layers: Vec<Layer>,
    channels: Vec<Channel>,
    selection: Drawable,
    selection_bounds: Option<Option<Rectangle>>,
    floating: Option<LayerId>,
    active: Option<DrawableRef>,
    last_id: u32,

    /// Channels that editing operations may modify
    pub active_components: ComponentSet,
}

// Get mutable references to two distinct elements of a slice
fn two_mut<T>(v: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = v.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = v.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

impl Image {
    pub fn new(width: u32, height: u32, base: ColorType) -> Result<Image> {
        let mut selection = Drawable::new(
            DrawableKind::Channel,
            "Selection",
            width,
            height,
            PixelFormat::GRAY,
        )?;
        selection.set_lifecycle(Lifecycle::Attached);

        Ok(Image {
            width,
            height,
            base,
            colormap: Vec::new(),
            layers: Vec::new(),
            channels: Vec::new(),
            selection,
            selection_bounds: None,
            floating: None,
            active: None,
            last_id: 0,
            active_components: ComponentSet::ALL,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width as i32, self.height as i32)
    }

    pub fn bounds(&self) -> Rectangle {
        Rectangle::new(0, 0, self.width as i32, self.height as i32)
    }

    pub fn base_type(&self) -> ColorType {
        self.base
    }

    pub fn colormap(&self) -> &[[u8; 3]] {
        &self.colormap
    }

    pub fn set_colormap(&mut self, colormap: Vec<[u8; 3]>) {
        self.colormap = colormap;
    }

    fn next_id(&mut self) -> u32 {
        self.last_id += 1;
        self.last_id
    }

    /// All layers, topmost first
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_index(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    /// Add a layer to the stack at the given index (0 is the top).
    ///
    /// The layer must be of the image's base color type and must not
    /// have been added to an image before.
    pub fn add_layer(&mut self, layer: Layer, position: usize) -> Result<LayerId> {
        if layer.format().color != self.base {
            return Err(RasterError::IncompatibleFormat);
        }
        self.insert_layer(layer, position)
    }

    pub(crate) fn insert_layer(&mut self, mut layer: Layer, position: usize) -> Result<LayerId> {
        if layer.drawable().lifecycle() != Lifecycle::Unattached {
            return Err(RasterError::AlreadyExists);
        }
        let id = LayerId(self.next_id());
        layer.id = id;
        layer.set_lifecycle(Lifecycle::Attached);
        let position = position.min(self.layers.len());
        self.layers.insert(position, layer);
        self.active = Some(DrawableRef::Layer(id));
        debug!("Added {} at position {}", id, position);
        Ok(id)
    }

    /// Remove a layer from the stack.
    ///
    /// Removing a floating selection restores the pixels under it first.
    /// A floating selection over the layer or its mask is removed too.
    pub fn remove_layer(&mut self, id: LayerId) -> Result<Layer> {
        if self.floating == Some(id) {
            return floating::remove(self, id);
        }
        self.layer_index(id).ok_or(RasterError::NotFound)?;
        self.remove_floating_over(|t| t.layer_id() == Some(id))?;
        self.detach_layer(id)
    }

    // Remove the floating selection if its target matches
    fn remove_floating_over<F>(&mut self, is_target: F) -> Result<()>
    where
        F: Fn(DrawableRef) -> bool,
    {
        let over = self.floating.and_then(|fs| {
            let target = self.layer(fs)?.floating_state()?.target();
            is_target(target).then_some(fs)
        });
        if let Some(fs) = over {
            debug!("Removing floating selection {} along with its target", fs);
            floating::remove(self, fs)?;
        }
        Ok(())
    }

    pub(crate) fn detach_layer(&mut self, id: LayerId) -> Result<Layer> {
        let index = self.layer_index(id).ok_or(RasterError::NotFound)?;
        let mut layer = self.layers.remove(index);
        layer.set_lifecycle(Lifecycle::Removed);

        if self.floating == Some(id) {
            self.floating = None;
        }
        if self.active.and_then(|a| a.layer_id()) == Some(id) {
            self.active = self
                .layers
                .get(index.min(self.layers.len().saturating_sub(1)))
                .map(|l| DrawableRef::Layer(l.id));
        }
        debug!("Removed {}", id);
        Ok(layer)
    }

    /// Move a layer to a new position in the stack
    pub fn reorder_layer(&mut self, id: LayerId, position: usize) -> Result<()> {
        let index = self.layer_index(id).ok_or(RasterError::NotFound)?;
        let layer = self.layers.remove(index);
        let position = position.min(self.layers.len());
        self.layers.insert(position, layer);
        Ok(())
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    pub fn channel_mut(&mut self, id: ChannelId) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|c| c.id == id)
    }

    /// Add a channel. Channels are always the size of the image.
    pub fn add_channel(&mut self, mut channel: Channel, position: usize) -> Result<ChannelId> {
        if channel.drawable().lifecycle() != Lifecycle::Unattached {
            return Err(RasterError::AlreadyExists);
        }
        if channel.drawable().size() != self.size() {
            return Err(RasterError::DimensionMismatch);
        }
        let id = ChannelId(self.next_id());
        channel.id = id;
        channel.drawable_mut().set_lifecycle(Lifecycle::Attached);
        let position = position.min(self.channels.len());
        self.channels.insert(position, channel);
        Ok(id)
    }

    pub fn remove_channel(&mut self, id: ChannelId) -> Result<Channel> {
        self.channel(id).ok_or(RasterError::NotFound)?;
        self.remove_floating_over(|t| t == DrawableRef::Channel(id))?;
        let index = self
            .channels
            .iter()
            .position(|c| c.id == id)
            .ok_or(RasterError::NotFound)?;
        let mut channel = self.channels.remove(index);
        channel.drawable_mut().set_lifecycle(Lifecycle::Removed);
        if self.active == Some(DrawableRef::Channel(id)) {
            self.active = None;
        }
        Ok(channel)
    }

    pub fn selection(&self) -> &Drawable {
        &self.selection
    }

    /// Get write access to the selection mask.
    ///
    /// This invalidates the cached selection bounds.
    pub fn selection_mut(&mut self) -> &mut Drawable {
        self.selection_bounds = None;
        &mut self.selection
    }

    /// Bounding rectangle of the selected area, or None if nothing is selected
    pub fn selection_bounds(&mut self) -> Option<Rectangle> {
        match self.selection_bounds {
            Some(bounds) => bounds,
            None => {
                let bounds = regionops::nonzero_bounds(&PixelRegion::whole(self.selection.tiles()));
                self.selection_bounds = Some(bounds);
                bounds
            }
        }
    }

    pub fn invalidate_selection_bounds(&mut self) {
        self.selection_bounds = None;
    }

    /// The floating selection layer, if there is one
    pub fn floating_layer(&self) -> Option<LayerId> {
        self.floating
    }

    pub(crate) fn set_floating(&mut self, id: Option<LayerId>) {
        self.floating = id;
    }

    pub fn active(&self) -> Option<DrawableRef> {
        self.active
    }

    pub fn set_active(&mut self, drawable: Option<DrawableRef>) -> Result<()> {
        if let Some(d) = drawable {
            self.drawable(d).ok_or(RasterError::NotFound)?;
        }
        self.active = drawable;
        Ok(())
    }

    pub fn drawable(&self, r: DrawableRef) -> Option<&Drawable> {
        match r {
            DrawableRef::Layer(id) => self.layer(id).map(|l| l.drawable()),
            DrawableRef::LayerMask(id) => self.layer(id)?.mask().map(|m| m.drawable()),
            DrawableRef::Channel(id) => self.channel(id).map(|c| c.drawable()),
            DrawableRef::Selection => Some(&self.selection),
        }
    }

    pub fn drawable_mut(&mut self, r: DrawableRef) -> Option<&mut Drawable> {
        match r {
            DrawableRef::Layer(id) => self.layer_mut(id).map(|l| l.drawable_mut()),
            DrawableRef::LayerMask(id) => self.layer_mut(id)?.mask_mut().map(|m| m.drawable_mut()),
            DrawableRef::Channel(id) => self.channel_mut(id).map(|c| c.drawable_mut()),
            DrawableRef::Selection => Some(self.selection_mut()),
        }
    }

    /// Borrow a floating layer and the drawable it overlays at the same time
    pub(crate) fn split_floating(
        &mut self,
        id: LayerId,
        target: DrawableRef,
    ) -> Result<(&mut Layer, &mut Drawable)> {
        let li = self.layer_index(id).ok_or(RasterError::NotFound)?;
        match target {
            DrawableRef::Layer(tid) | DrawableRef::LayerMask(tid) => {
                if tid == id {
                    return Err(RasterError::UnsupportedOperation(
                        "floating selection cannot overlay itself",
                    ));
                }
                let ti = self.layer_index(tid).ok_or(RasterError::NotFound)?;
                let (layer, target_layer) = two_mut(&mut self.layers, li, ti);
                let drawable = if let DrawableRef::Layer(_) = target {
                    target_layer.drawable_mut()
                } else {
                    target_layer
                        .mask_mut()
                        .ok_or(RasterError::NotFound)?
                        .drawable_mut()
                };
                Ok((layer, drawable))
            }
            DrawableRef::Channel(cid) => {
                let Image {
                    layers, channels, ..
                } = self;
                let channel = channels
                    .iter_mut()
                    .find(|c| c.id == cid)
                    .ok_or(RasterError::NotFound)?;
                Ok((&mut layers[li], channel.drawable_mut()))
            }
            DrawableRef::Selection => {
                self.selection_bounds = None;
                Ok((&mut self.layers[li], &mut self.selection))
            }
        }
    }

    /// Create a new mask suitable for the given layer.
    ///
    /// The mask is not attached: pass it to `Layer::add_mask`.
    pub fn create_mask(&self, id: LayerId, kind: MaskKind) -> Result<LayerMask> {
        let layer = self.layer(id).ok_or(RasterError::NotFound)?;
        let fmt = layer.format();
        let name = format!("{} mask", layer.name());
        let mut mask = LayerMask::new(&name, layer.drawable().width(), layer.drawable().height())?;

        match kind {
            MaskKind::White => mask.drawable_mut().tiles_mut().fill(&[255]),
            MaskKind::Black => {}
            MaskKind::AlphaCopy | MaskKind::AlphaTransfer => {
                if fmt.has_alpha {
                    let alpha = regionops::extract_alpha(&PixelRegion::whole(layer.tiles()), fmt)?;
                    mask.drawable_mut().replace_tiles(alpha)?;
                } else {
                    mask.drawable_mut().tiles_mut().fill(&[255]);
                }
                if kind == MaskKind::AlphaTransfer {
                    mask = mask.with_alpha_transfer();
                }
            }
            MaskKind::SelectionCopy | MaskKind::InverseSelectionCopy => {
                let lb = layer.bounds();
                if let Some(isect) = lb.intersected(&self.bounds()) {
                    let src = PixelRegion::new(self.selection.tiles(), isect)?;
                    let mut dst = PixelRegionMut::new(
                        mask.drawable_mut().tiles_mut(),
                        isect.offset(-lb.x, -lb.y),
                    )?;
                    regionops::copy_region(&src, &mut dst)?;
                }
                if kind == MaskKind::InverseSelectionCopy {
                    regionops::invert_region(
                        &mut PixelRegionMut::whole(mask.drawable_mut().tiles_mut()),
                        PixelFormat::GRAY,
                        ComponentSet::ALL,
                    )?;
                }
            }
            MaskKind::GraySourceCopy => {
                let gray = regionops::gray_from_color(&PixelRegion::whole(layer.tiles()), fmt)?;
                mask.drawable_mut().replace_tiles(gray)?;
            }
        }

        Ok(mask)
    }

    /// Create a mask of the given kind and attach it to the layer
    pub fn add_mask(&mut self, id: LayerId, kind: MaskKind) -> Result<()> {
        let mask = self.create_mask(id, kind)?;
        self.layer_mut(id)
            .ok_or(RasterError::NotFound)?
            .add_mask(mask)?;
        Ok(())
    }

    /// Detach a layer's mask.
    ///
    /// A floating selection over the mask is removed first.
    pub fn remove_mask(&mut self, id: LayerId, apply: MaskApply) -> Result<LayerMask> {
        if self.layer(id).ok_or(RasterError::NotFound)?.mask().is_none() {
            return Err(RasterError::NotFound);
        }
        self.remove_floating_over(|t| t == DrawableRef::LayerMask(id))?;
        self.layer_mut(id)
            .ok_or(RasterError::NotFound)?
            .remove_mask(apply)
    }
}
