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


//! The floating selection protocol.
//!
//! A floating selection is a temporary layer that overlays another drawable
//! (its target). The target's pixels under the layer are kept in a backing
//! store, so the overlay can be lifted (relax), put back down (rigor) and
//! finally merged for good (anchor) without losing any pixel data.
//!
//! The overlay is composited directly into the target's pixels. This is
//! why the compositor skips floating layers: by the time the layer stack
//! is flattened, the floating selection is already part of its target.

use tracing::{debug, warn};

use super::boundary::Boundary;
use super::drawable::{Drawable, Lifecycle};
use super::image::{DrawableRef, Image};
use super::layer::{FloatingState, Layer, LayerId};
use super::rasterop::BlendOptions;
use super::region::{PixelRegion, PixelRegionMut};
use super::regionops::{composite_blend, copy_region};
use super::tilestore::TileStore;
use super::{AoE, Rectangle};
use crate::{RasterError, Result};

/// Alpha level at which floating selection pixels count as part of its outline
const BOUNDARY_THRESHOLD: u8 = 128;

fn target_of(image: &Image, id: LayerId) -> Result<DrawableRef> {
    image
        .layer(id)
        .ok_or(RasterError::NotFound)?
        .floating_state()
        .map(|s| s.target())
        .ok_or(RasterError::NotFloatingSelection)
}

fn state_mut(layer: &mut Layer) -> Result<&mut FloatingState> {
    layer
        .floating
        .as_mut()
        .ok_or(RasterError::NotFloatingSelection)
}

// Copy the backing store back into the target, within the given rectangle
fn restore(layer: &Layer, target: &mut Drawable, rect: &Rectangle) -> Result<AoE> {
    let bounds = layer.bounds();
    let tb = target.bounds();
    let area = match bounds.intersected(&tb).and_then(|r| r.intersected(rect)) {
        Some(r) => r,
        None => return Ok(AoE::Nothing),
    };
    let state = layer
        .floating_state()
        .ok_or(RasterError::NotFloatingSelection)?;

    let src = PixelRegion::new(state.backing_store(), area.offset(-bounds.x, -bounds.y))?;
    let mut dst = PixelRegionMut::new(target.tiles_mut(), area.offset(-tb.x, -tb.y))?;
    copy_region(&src, &mut dst)?;
    Ok(AoE::Bounds(area))
}

/// Attach a layer as the image's floating selection, overlaying the target.
///
/// An existing floating selection is anchored first. If the target was
/// that floating selection, the new one overlays the old one's target
/// (the drawable that becomes active after the anchor) instead.
/// Nothing is changed when the attach fails.
pub fn attach(image: &mut Image, mut layer: Layer, target: DrawableRef) -> Result<LayerId> {
    if layer.drawable().lifecycle() != Lifecycle::Unattached {
        return Err(RasterError::AlreadyExists);
    }

    let old = image.floating_layer();
    let target = match old {
        Some(old) if target.layer_id() == Some(old) => target_of(image, old)?,
        _ => target,
    };

    let target_drawable = image.drawable(target).ok_or(RasterError::NotFound)?;
    if target_drawable.format().color != layer.format().color {
        return Err(RasterError::IncompatibleFormat);
    }
    let backing = TileStore::new(
        layer.drawable().width(),
        layer.drawable().height(),
        target_drawable.format().bpp() as u32,
    )?;

    if let Some(old) = old {
        debug!("Anchoring {} to make room for a new floating selection", old);
        anchor(image, old)?;
    }

    layer.preserve_alpha = true;
    layer.floating = Some(FloatingState {
        target,
        backing,
        initial: true,
        boundary: None,
    });

    let id = image.insert_layer(layer, 0)?;
    image.set_floating(Some(id));
    debug!("Attached floating selection {} to {:?}", id, target);

    rigor(image, id, true)?;
    let bounds = image.layer(id).ok_or(RasterError::NotFound)?.bounds();
    composite(image, id, &bounds, true)?;
    Ok(id)
}

/// Save the target's pixels under the floating selection into the backing store
pub fn rigor(image: &mut Image, id: LayerId, push_undo: bool) -> Result<()> {
    let target = target_of(image, id)?;
    let (layer, drawable) = image.split_floating(id, target)?;
    let bounds = layer.bounds();
    let tb = drawable.bounds();
    let state = state_mut(layer)?;

    if let Some(area) = bounds.intersected(&tb) {
        let src = PixelRegion::new(drawable.tiles(), area.offset(-tb.x, -tb.y))?;
        let mut dst = PixelRegionMut::new(&mut state.backing, area.offset(-bounds.x, -bounds.y))?;
        copy_region(&src, &mut dst)?;
    }
    state.initial = true;

    debug!("Rigor {} (push_undo: {})", id, push_undo);
    Ok(())
}

/// Put the target's original pixels back under the floating selection
pub fn relax(image: &mut Image, id: LayerId, push_undo: bool) -> Result<AoE> {
    let target = target_of(image, id)?;
    let (layer, drawable) = image.split_floating(id, target)?;

    let aoe = if state_mut(layer)?.initial {
        AoE::Nothing
    } else {
        let bounds = layer.bounds();
        restore(layer, drawable, &bounds)?
    };
    state_mut(layer)?.initial = true;

    debug!("Relax {} (push_undo: {})", id, push_undo);
    Ok(aoe)
}

/// Blend the floating selection onto its target within the given rectangle.
///
/// Previously composited pixels are restored first. The blend ignores the
/// target's own preserve-alpha setting and the image's active channels:
/// a floating selection merge is never channel clipped.
pub fn composite(image: &mut Image, id: LayerId, rect: &Rectangle, push_undo: bool) -> Result<AoE> {
    let target = target_of(image, id)?;
    let (layer, drawable) = image.split_floating(id, target)?;

    let mut aoe = if state_mut(layer)?.initial {
        if layer.is_visible() {
            state_mut(layer)?.initial = false;
        }
        AoE::Nothing
    } else {
        restore(layer, drawable, rect)?
    };

    if layer.is_visible() {
        let bounds = layer.bounds();
        let tb = drawable.bounds();
        if let Some(area) = bounds.intersected(&tb).and_then(|r| r.intersected(rect)) {
            let local = area.offset(-bounds.x, -bounds.y);
            let src = PixelRegion::new(layer.tiles(), local)?;
            let mask = match layer.mask() {
                Some(m) if m.apply => Some(PixelRegion::new(m.tiles(), local)?),
                _ => None,
            };
            let dst_fmt = drawable.format();
            let mut dst = PixelRegionMut::new(drawable.tiles_mut(), area.offset(-tb.x, -tb.y))?;
            composite_blend(
                &src,
                layer.format(),
                &mut dst,
                dst_fmt,
                layer.mode,
                layer.opacity,
                mask.as_ref(),
                &BlendOptions::default(),
            )?;
            aoe = aoe.merge(AoE::Bounds(area));
        }
    }

    debug!("Composite {} at {:?} (push_undo: {})", id, rect, push_undo);
    Ok(aoe)
}

/// Merge the floating selection into its target permanently.
///
/// The layer is removed from the image and the target becomes
/// the active drawable.
pub fn anchor(image: &mut Image, id: LayerId) -> Result<AoE> {
    let target = target_of(image, id)?;
    if image.drawable(target).is_none() {
        warn!("Target of {} is gone, discarding it", id);
        remove(image, id)?;
        return Ok(AoE::Nothing);
    }

    image
        .drawable_mut(target)
        .ok_or(RasterError::NotFound)?
        .invalidate_preview();

    let mut aoe = relax(image, id, true)?;
    let bounds = image.layer(id).ok_or(RasterError::NotFound)?.bounds();
    aoe = aoe.merge(composite(image, id, &bounds, true)?);

    image.detach_layer(id)?;
    image.invalidate_selection_bounds();
    image.set_active(Some(target))?;

    debug!("Anchored {} to {:?}", id, target);
    Ok(aoe)
}

/// Turn the floating selection into an ordinary layer.
///
/// The target gets its original pixels back. Floating selections
/// over channels, masks or the selection cannot become layers.
pub fn to_layer(image: &mut Image, id: LayerId) -> Result<AoE> {
    let target = target_of(image, id)?;
    match target {
        DrawableRef::Layer(_) => {}
        _ => {
            return Err(RasterError::UnsupportedOperation(
                "floating selection over a channel cannot become a layer",
            ))
        }
    }
    let (layer, drawable) = image.split_floating(id, target)?;
    let bounds = layer.bounds();
    let aoe = if state_mut(layer)?.initial {
        AoE::Nothing
    } else {
        restore(layer, drawable, &bounds)?
    };
    layer.floating = None;
    layer.set_visible(true);

    image.set_floating(None);
    image.invalidate_selection_bounds();

    debug!("Floating selection {} is now a layer", id);
    Ok(aoe.merge(AoE::Bounds(bounds)))
}

/// Remove the floating selection, restoring the target's pixels
pub fn remove(image: &mut Image, id: LayerId) -> Result<Layer> {
    let target = target_of(image, id)?;

    // A target removed behind our back has nothing to restore
    if image.drawable(target).is_some() {
        relax(image, id, true)?;
    }
    image
        .layer_mut(id)
        .ok_or(RasterError::NotFound)?
        .drawable_mut()
        .invalidate_preview();

    let mut layer = image.detach_layer(id)?;
    layer.floating = None;
    if image.drawable(target).is_some() {
        image.set_active(Some(target))?;
    }

    debug!("Removed floating selection {}", id);
    Ok(layer)
}

/// Get the outline of the floating selection's opaque pixels, in image coordinates
pub fn boundary(image: &mut Image, id: LayerId) -> Result<&Boundary> {
    let layer = image.layer_mut(id).ok_or(RasterError::NotFound)?;
    if state_mut(layer)?.boundary.is_none() {
        let found = Boundary::find(
            layer.tiles(),
            layer.format(),
            BOUNDARY_THRESHOLD,
            layer.drawable().offset(),
        );
        state_mut(layer)?.boundary = Some(found);
    }
    layer
        .floating_state()
        .and_then(|s| s.boundary.as_ref())
        .ok_or(RasterError::NotFloatingSelection)
}

/// Forget the cached outline. Call this after changing the layer's content.
pub fn invalidate_boundary(image: &mut Image, id: LayerId) -> Result<()> {
    let layer = image.layer_mut(id).ok_or(RasterError::NotFound)?;
    state_mut(layer)?.boundary = None;
    Ok(())
}

/// Move the floating selection.
///
/// The target's pixels under the old position are restored before
/// the overlay is composited at the new position.
pub fn translate(image: &mut Image, id: LayerId, dx: i32, dy: i32) -> Result<AoE> {
    target_of(image, id)?;

    let mut aoe = relax(image, id, false)?;

    let layer = image.layer_mut(id).ok_or(RasterError::NotFound)?;
    let (x, y) = layer.drawable().offset();
    layer.set_offset(x.saturating_add(dx), y.saturating_add(dy));
    state_mut(layer)?.boundary = None;
    let bounds = layer.bounds();

    rigor(image, id, false)?;
    aoe = aoe.merge(composite(image, id, &bounds, false)?);
    Ok(aoe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::boundary::BoundSeg;
    use crate::paint::color::ColorType;

    fn setup() -> (Image, LayerId) {
        let mut image = Image::new(100, 100, ColorType::Rgb).unwrap();
        let mut base = Layer::new("base", 100, 100, ColorType::Rgb, true).unwrap();
        base.drawable_mut().tiles_mut().fill(&[0, 0, 255, 255]);
        let id = image.add_layer(base, 0).unwrap();
        (image, id)
    }

    fn red_patch(x: i32, y: i32) -> Layer {
        let mut l = Layer::new("patch", 10, 10, ColorType::Rgb, true).unwrap();
        l.drawable_mut().tiles_mut().fill(&[255, 0, 0, 255]);
        l.set_offset(x, y);
        l
    }

    #[test]
    fn test_translate() {
        let (mut image, base) = setup();
        let fs = attach(&mut image, red_patch(0, 0), DrawableRef::Layer(base)).unwrap();
        let aoe = translate(&mut image, fs, 50, 50).unwrap();
        assert_eq!(aoe, AoE::Bounds(Rectangle::new(0, 0, 60, 60)));

        let tiles = image.layer(base).unwrap().tiles();
        assert_eq!(tiles.pixel_at(5, 5), &[0, 0, 255, 255]);
        assert_eq!(tiles.pixel_at(55, 55), &[255, 0, 0, 255]);
    }

    #[test]
    fn test_boundary_cache() {
        let (mut image, base) = setup();
        let fs = attach(&mut image, red_patch(20, 30), DrawableRef::Layer(base)).unwrap();
        let b = boundary(&mut image, fs).unwrap();
        assert_eq!(b.polygons().len(), 1);
        assert!(b.segments().contains(&BoundSeg {
            x1: 20,
            y1: 30,
            x2: 30,
            y2: 30
        }));

        translate(&mut image, fs, 1, 0).unwrap();
        assert!(image.layer(fs).unwrap().floating_state().unwrap().boundary.is_none());
    }

    #[test]
    fn test_relax_and_invalidate() {
        let (mut image, base) = setup();
        let fs = attach(&mut image, red_patch(0, 0), DrawableRef::Layer(base)).unwrap();
        let state = |image: &Image| image.layer(fs).unwrap().floating_state().unwrap().clone();
        assert!(!state(&image).is_initial());
        assert!(!image.layer(fs).unwrap().editable_components().is_active(3));

        relax(&mut image, fs, false).unwrap();
        assert!(state(&image).is_initial());
        assert_eq!(image.layer(base).unwrap().tiles().pixel_at(5, 5), &[0, 0, 255, 255]);

        boundary(&mut image, fs).unwrap();
        assert!(state(&image).boundary.is_some());
        invalidate_boundary(&mut image, fs).unwrap();
        assert!(state(&image).boundary.is_none());
    }

    #[test]
    fn test_not_floating() {
        let (mut image, base) = setup();
        assert!(matches!(anchor(&mut image, base), Err(RasterError::NotFloatingSelection)));
        assert!(matches!(to_layer(&mut image, base), Err(RasterError::NotFloatingSelection)));
        assert!(matches!(anchor(&mut image, LayerId(99)), Err(RasterError::NotFound)));
    }
}
