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


use std::io::Cursor;

use rastercore::codec::{save_image, SaveOptions};
use rastercore::paint::floating::{anchor, attach, composite, remove, to_layer};
use rastercore::paint::regionops::composite_blend;
use rastercore::paint::{
    AoE, BlendOptions, Blendmode, Channel, ColorType, DrawableRef, Image, Layer, LayerId,
    MaskApply, MaskKind, PixelRegion, PixelRegionMut, Rectangle,
};
use rastercore::RasterError;

fn gradient_image() -> (Image, LayerId) {
    let mut image = Image::new(150, 100, ColorType::Rgb).unwrap();
    let mut base = Layer::new("base", 150, 100, ColorType::Rgb, true).unwrap();
    {
        let tiles = base.drawable_mut().tiles_mut();
        for y in 0..100 {
            for x in 0..150 {
                tiles.set_pixel_at(x, y, &[x as u8, y as u8, (x + y) as u8, 255]);
            }
        }
    }
    let id = image.add_layer(base, 0).unwrap();
    (image, id)
}

fn patch(x: i32, y: i32, color: [u8; 4]) -> Layer {
    let mut l = Layer::new("patch", 80, 70, ColorType::Rgb, true).unwrap();
    l.drawable_mut().tiles_mut().fill(&color);
    l.set_offset(x, y);
    l
}

fn floating_count(image: &Image) -> usize {
    image.layers().iter().filter(|l| l.is_floating()).count()
}

#[test]
fn test_attach_remove_restores_target() {
    let (mut image, base) = gradient_image();
    let original = image.layer(base).unwrap().tiles().clone();

    let fs = attach(&mut image, patch(100, -10, [200, 10, 10, 180]), DrawableRef::Layer(base)).unwrap();
    assert_eq!(image.floating_layer(), Some(fs));
    assert_ne!(image.layer(base).unwrap().tiles(), &original);
    assert!(image.layer(fs).unwrap().preserve_alpha);

    let removed = remove(&mut image, fs).unwrap();
    assert!(!removed.is_floating());
    assert_eq!(image.layer(base).unwrap().tiles(), &original);
    assert_eq!(image.floating_layer(), None);
    assert_eq!(image.layers().len(), 1);
}

#[test]
fn test_anchor_is_permanent() {
    let (mut image, base) = gradient_image();
    let layer = patch(30, 20, [10, 200, 10, 128]);

    // What a plain composite of the patch produces
    let mut expected = image.layer(base).unwrap().tiles().clone();
    composite_blend(
        &PixelRegion::whole(layer.tiles()),
        layer.format(),
        &mut PixelRegionMut::new(&mut expected, Rectangle::new(30, 20, 80, 70)).unwrap(),
        image.layer(base).unwrap().format(),
        Blendmode::Normal,
        255,
        None,
        &BlendOptions::default(),
    )
    .unwrap();

    let fs = attach(&mut image, layer, DrawableRef::Layer(base)).unwrap();
    anchor(&mut image, fs).unwrap();

    assert!(image.layer(fs).is_none());
    assert_eq!(image.floating_layer(), None);
    assert_eq!(image.active(), Some(DrawableRef::Layer(base)));
    assert_eq!(image.layer(base).unwrap().tiles(), &expected);
}

#[test]
fn test_repeated_composite_is_stable() {
    let (mut image, base) = gradient_image();
    let fs = attach(&mut image, patch(10, 10, [0, 0, 0, 100]), DrawableRef::Layer(base)).unwrap();
    let once = image.layer(base).unwrap().tiles().clone();

    let bounds = image.layer(fs).unwrap().bounds();
    composite(&mut image, fs, &bounds, false).unwrap();
    composite(&mut image, fs, &bounds, false).unwrap();
    assert_eq!(image.layer(base).unwrap().tiles(), &once);
}

#[test]
fn test_second_attach_anchors_first() {
    let (mut image, base) = gradient_image();
    let first = attach(&mut image, patch(0, 0, [255, 0, 0, 255]), DrawableRef::Layer(base)).unwrap();
    let second = attach(&mut image, patch(70, 30, [0, 0, 255, 255]), DrawableRef::Layer(base)).unwrap();

    assert!(image.layer(first).is_none());
    assert_eq!(floating_count(&image), 1);
    assert_eq!(image.floating_layer(), Some(second));

    // The first one is now part of the base layer
    remove(&mut image, second).unwrap();
    assert_eq!(image.layer(base).unwrap().tiles().pixel_at(5, 5), &[255, 0, 0, 255]);
}

#[test]
fn test_attach_onto_old_floating_redirects() {
    let (mut image, base) = gradient_image();
    let first = attach(&mut image, patch(0, 0, [255, 0, 0, 255]), DrawableRef::Layer(base)).unwrap();
    let second = attach(&mut image, patch(0, 0, [0, 255, 0, 255]), DrawableRef::Layer(first)).unwrap();

    let state = image.layer(second).unwrap().floating_state().unwrap();
    assert_eq!(state.target(), DrawableRef::Layer(base));
    assert_eq!(floating_count(&image), 1);
}

#[test]
fn test_to_layer() {
    let (mut image, base) = gradient_image();
    let original = image.layer(base).unwrap().tiles().clone();
    let fs = attach(&mut image, patch(5, 5, [1, 2, 3, 255]), DrawableRef::Layer(base)).unwrap();
    image.layer_mut(fs).unwrap().set_visible(false);

    to_layer(&mut image, fs).unwrap();
    let layer = image.layer(fs).unwrap();
    assert!(!layer.is_floating());
    assert!(layer.is_visible());
    assert_eq!(image.floating_layer(), None);
    assert_eq!(image.layer(base).unwrap().tiles(), &original);
    assert_eq!(image.layers().len(), 2);
}

#[test]
fn test_to_layer_over_channel_fails() {
    let (mut image, _) = gradient_image();
    let channel = image
        .add_channel(Channel::new("c", 150, 100, [255, 0, 0]).unwrap(), 0)
        .unwrap();
    let mut gray = Layer::new("g", 10, 10, ColorType::Gray, true).unwrap();
    gray.drawable_mut().tiles_mut().fill(&[255, 255]);

    let fs = attach(&mut image, gray, DrawableRef::Channel(channel)).unwrap();
    assert_eq!(image.channel(channel).unwrap().drawable().tiles().pixel_at(0, 0), &[255]);

    assert!(matches!(
        to_layer(&mut image, fs),
        Err(RasterError::UnsupportedOperation(_))
    ));
    assert_eq!(image.floating_layer(), Some(fs));

    anchor(&mut image, fs).unwrap();
    assert_eq!(image.active(), Some(DrawableRef::Channel(channel)));
}

#[test]
fn test_incompatible_target() {
    let (mut image, _) = gradient_image();
    let channel = image
        .add_channel(Channel::new("c", 150, 100, [255, 0, 0]).unwrap(), 0)
        .unwrap();
    let r = attach(&mut image, patch(0, 0, [1, 1, 1, 255]), DrawableRef::Channel(channel));
    assert!(matches!(r, Err(RasterError::IncompatibleFormat)));
    assert_eq!(image.floating_layer(), None);
}

#[test]
fn test_save_requires_anchor() {
    let (mut image, base) = gradient_image();
    let fs = attach(&mut image, patch(0, 0, [9, 9, 9, 255]), DrawableRef::Layer(base)).unwrap();

    let mut buf = Cursor::new(Vec::new());
    assert!(matches!(
        save_image(&mut buf, &image, &SaveOptions::default()),
        Err(RasterError::UnsupportedOperation(_))
    ));

    anchor(&mut image, fs).unwrap();
    save_image(&mut buf, &image, &SaveOptions::default()).unwrap();
}

#[test]
fn test_removed_layer_cannot_be_reattached() {
    let (mut image, base) = gradient_image();
    let fs = attach(&mut image, patch(0, 0, [9, 9, 9, 255]), DrawableRef::Layer(base)).unwrap();
    let layer = remove(&mut image, fs).unwrap();
    assert!(matches!(
        attach(&mut image, layer, DrawableRef::Layer(base)),
        Err(RasterError::AlreadyExists)
    ));
}

#[test]
fn test_failed_attach_changes_nothing() {
    let (mut image, base) = gradient_image();
    let first = attach(&mut image, patch(0, 0, [255, 0, 0, 255]), DrawableRef::Layer(base)).unwrap();
    let composited = image.layer(base).unwrap().tiles().clone();

    let gray = Layer::new("g", 10, 10, ColorType::Gray, true).unwrap();
    assert!(matches!(
        attach(&mut image, gray, DrawableRef::Layer(base)),
        Err(RasterError::IncompatibleFormat)
    ));
    assert!(matches!(
        attach(&mut image, patch(0, 0, [1, 1, 1, 255]), DrawableRef::Layer(LayerId(99))),
        Err(RasterError::NotFound)
    ));

    assert_eq!(image.floating_layer(), Some(first));
    assert!(image.layer(first).unwrap().is_floating());
    assert_eq!(image.layer(base).unwrap().tiles(), &composited);
    assert_eq!(image.layers().len(), 2);
}

#[test]
fn test_removing_target_removes_selection() {
    let (mut image, base) = gradient_image();
    let other = image
        .add_layer(Layer::new("other", 150, 100, ColorType::Rgb, true).unwrap(), 0)
        .unwrap();
    let fs = attach(&mut image, patch(0, 0, [255, 0, 0, 255]), DrawableRef::Layer(base)).unwrap();

    image.remove_layer(base).unwrap();
    assert_eq!(image.floating_layer(), None);
    assert!(image.layer(fs).is_none());
    assert_eq!(image.layers().len(), 1);

    let next = attach(&mut image, patch(0, 0, [0, 0, 255, 255]), DrawableRef::Layer(other)).unwrap();
    assert_eq!(image.floating_layer(), Some(next));
    anchor(&mut image, next).unwrap();
    assert_eq!(image.layer(other).unwrap().tiles().pixel_at(5, 5), &[0, 0, 255, 255]);
}

#[test]
fn test_removing_mask_or_channel_target() {
    let (mut image, base) = gradient_image();
    image.add_mask(base, MaskKind::White).unwrap();
    let channel = image
        .add_channel(Channel::new("c", 150, 100, [255, 0, 0]).unwrap(), 0)
        .unwrap();
    let gray = || Layer::new("g", 10, 10, ColorType::Gray, true).unwrap();

    attach(&mut image, gray(), DrawableRef::LayerMask(base)).unwrap();
    image.remove_mask(base, MaskApply::Discard).unwrap();
    assert_eq!(image.floating_layer(), None);
    assert_eq!(image.layers().len(), 1);

    attach(&mut image, gray(), DrawableRef::Channel(channel)).unwrap();
    image.remove_channel(channel).unwrap();
    assert_eq!(image.floating_layer(), None);
    assert_eq!(image.layers().len(), 1);
}

#[test]
fn test_anchor_without_target() {
    let (mut image, base) = gradient_image();
    image.add_mask(base, MaskKind::White).unwrap();
    let gray = Layer::new("g", 10, 10, ColorType::Gray, true).unwrap();
    let fs = attach(&mut image, gray, DrawableRef::LayerMask(base)).unwrap();

    // Detached directly from the layer, bypassing the image
    image.layer_mut(base).unwrap().remove_mask(MaskApply::Discard).unwrap();
    assert_eq!(anchor(&mut image, fs).unwrap(), AoE::Nothing);
    assert_eq!(image.floating_layer(), None);
    assert!(image.layer(fs).is_none());
}
