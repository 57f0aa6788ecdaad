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

use rastercore::codec::{
    load_image, load_image_file, read_hierarchy, rle, save_image, save_image_file, Compression,
    LoadOptions, SaveOptions,
};
use rastercore::paint::floating::attach;
use rastercore::paint::{
    Blendmode, Channel, ColorType, DrawableRef, Image, Layer, LayerMask, PixelFormat, TileStore,
    MAX_DIMENSION,
};
use rastercore::RasterError;

fn hierarchy_1row(width: u8, block: &[u8]) -> Vec<u8> {
    let mut bytes = vec![
        0, 0, 0, width, // width
        0, 0, 0, 1, // height
        0, 0, 0, 1, // bpp
        0, 0, 0, 20, // level
        0, 0, 0, 0, //
        0, 0, 0, width, // level width
        0, 0, 0, 1, // level height
        0, 0, 0, 36, // tile 0
        0, 0, 0, 0,
    ];
    bytes.extend_from_slice(block);
    bytes
}

#[test]
fn test_rle_packed_single_byte() {
    let mut out = [0u8; 1];
    assert_eq!(rle::decode(&[0x00, 0xAB], 1, &mut out).unwrap(), 2);
    assert_eq!(out, [0xAB]);

    let stream = hierarchy_1row(1, &[0x00, 0xAB]);
    let store = read_hierarchy(&mut Cursor::new(stream), Compression::Rle, &LoadOptions::default())
        .unwrap();
    assert_eq!(store.pixel_at(0, 0), &[0xAB]);
}

#[test]
fn test_rle_literal_run() {
    let mut out = [0u8; 3];
    assert_eq!(rle::decode(&[0xFE, 1, 2, 3], 1, &mut out).unwrap(), 4);
    assert_eq!(out, [1, 2, 3]);

    let stream = hierarchy_1row(3, &[0xFE, 1, 2, 3]);
    let store = read_hierarchy(&mut Cursor::new(stream), Compression::Rle, &LoadOptions::default())
        .unwrap();
    assert_eq!(store.to_pixels(&store.bounds()).unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_rle_overrun() {
    // A literal run of 3 bytes into a 1 pixel tile
    let stream = hierarchy_1row(1, &[0xFE, 1, 2, 3]);
    let r = read_hierarchy(&mut Cursor::new(stream), Compression::Rle, &LoadOptions::default());
    assert!(matches!(r, Err(RasterError::CorruptStream(_))));
}

fn be_words(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_be_bytes()).collect()
}

#[test]
fn test_oversized_header() {
    let opts = LoadOptions::default();
    let huge = be_words(&[0x7fff_ffff, 0x7fff_ffff, 4, 20, 0]);
    let r = read_hierarchy(&mut Cursor::new(huge), Compression::Rle, &opts);
    assert!(matches!(r, Err(RasterError::CorruptStream(_))));

    // Plausible size, but the stream does not hold the tile pointer table
    let m = MAX_DIMENSION;
    let truncated = be_words(&[m, m, 4, 20, 0, m, m, 40]);
    let r = read_hierarchy(&mut Cursor::new(truncated), Compression::Rle, &opts);
    assert!(matches!(r, Err(RasterError::CorruptStream(_))));

    let mut file = b"RCIMG\0".to_vec();
    file.extend_from_slice(&1u16.to_be_bytes());
    file.extend(be_words(&[0x7fff_ffff, 0x7fff_ffff]));
    file.extend_from_slice(&[0, 1]);
    file.extend(be_words(&[0, 0, 0, 0]));
    assert!(matches!(
        load_image(&mut Cursor::new(file), &opts),
        Err(RasterError::CorruptStream(_))
    ));
}

#[test]
fn test_zero_size() {
    assert!(matches!(
        Layer::new("empty", 0, 10, ColorType::Rgb, true),
        Err(RasterError::InvalidDimensions)
    ));
    assert!(matches!(
        Image::new(10, 0, ColorType::Gray),
        Err(RasterError::InvalidDimensions)
    ));
}

fn sample_image() -> Image {
    let mut image = Image::new(100, 80, ColorType::Rgb).unwrap();

    let mut bottom = Layer::new("Background", 100, 80, ColorType::Rgb, false).unwrap();
    bottom.drawable_mut().tiles_mut().fill(&[250, 240, 230]);
    image.add_layer(bottom, 0).unwrap();

    let mut top = Layer::new("Sketch", 70, 70, ColorType::Rgb, true).unwrap();
    for i in 0..70 {
        top.drawable_mut()
            .tiles_mut()
            .set_pixel_at(i, i, &[0, 0, i as u8, 255]);
    }
    top.set_offset(-5, 20);
    top.opacity = 200;
    top.mode = Blendmode::Screen;
    top.preserve_alpha = true;
    top.set_visible(false);
    let mut mask = LayerMask::new("Sketch mask", 70, 70).unwrap();
    mask.drawable_mut().tiles_mut().fill(&[128]);
    mask.show = true;
    top.add_mask(mask).unwrap();
    image.add_layer(top, 0).unwrap();

    let mut channel = Channel::new("Saved", 100, 80, [0, 128, 255]).unwrap();
    channel.drawable_mut().tiles_mut().set_pixel_at(99, 79, &[42]);
    channel.opacity = 64;
    image.add_channel(channel, 0).unwrap();

    image.selection_mut().tiles_mut().set_pixel_at(10, 10, &[255]);
    image
}

fn assert_same_image(a: &Image, b: &Image) {
    assert_eq!(a.size(), b.size());
    assert_eq!(a.base_type(), b.base_type());
    assert_eq!(a.colormap(), b.colormap());
    assert_eq!(a.layers().len(), b.layers().len());
    for (la, lb) in a.layers().iter().zip(b.layers()) {
        assert_eq!(la.name(), lb.name());
        assert_eq!(la.format(), lb.format());
        assert_eq!(la.bounds(), lb.bounds());
        assert_eq!(la.tiles(), lb.tiles());
        assert_eq!(la.opacity, lb.opacity);
        assert_eq!(la.mode, lb.mode);
        assert_eq!(la.preserve_alpha, lb.preserve_alpha);
        assert_eq!(la.is_visible(), lb.is_visible());
        assert_eq!(la.mask().is_some(), lb.mask().is_some());
        if let (Some(ma), Some(mb)) = (la.mask(), lb.mask()) {
            assert_eq!(ma.drawable().name(), mb.drawable().name());
            assert_eq!(ma.tiles(), mb.tiles());
            assert_eq!((ma.apply, ma.show, ma.edit), (mb.apply, mb.show, mb.edit));
        }
    }
    assert_eq!(a.channels().len(), b.channels().len());
    for (ca, cb) in a.channels().iter().zip(b.channels()) {
        assert_eq!(ca.drawable().name(), cb.drawable().name());
        assert_eq!(ca.drawable().tiles(), cb.drawable().tiles());
        assert_eq!(ca.color, cb.color);
        assert_eq!(ca.opacity, cb.opacity);
    }
    assert_eq!(a.selection().tiles(), b.selection().tiles());
}

#[test]
fn test_image_roundtrip() {
    let image = sample_image();
    for compression in [Compression::Rle, Compression::None] {
        let mut buf = Cursor::new(Vec::new());
        save_image(&mut buf, &image, &SaveOptions::default().with_compression(compression)).unwrap();
        buf.set_position(0);
        let loaded = load_image(&mut buf, &LoadOptions::default()).unwrap();
        assert!(loaded.warnings.is_empty());
        assert_same_image(&image, &loaded.image);
    }
}

#[test]
fn test_indexed_roundtrip() {
    let mut image = Image::new(20, 20, ColorType::Indexed).unwrap();
    image.set_colormap(vec![[0, 0, 0], [255, 0, 0], [0, 255, 0]]);
    let mut layer = Layer::new("Pixels", 20, 20, ColorType::Indexed, true).unwrap();
    layer.drawable_mut().tiles_mut().fill(&[2, 255]);
    image.add_layer(layer, 0).unwrap();

    let mut buf = Cursor::new(Vec::new());
    save_image(&mut buf, &image, &SaveOptions::default()).unwrap();
    buf.set_position(0);
    let loaded = load_image(&mut buf, &LoadOptions::default()).unwrap();
    assert_same_image(&image, &loaded.image);
    assert_eq!(
        loaded.image.layers()[0].format(),
        PixelFormat::new(ColorType::Indexed, true)
    );
}

#[test]
fn test_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.rci");
    let image = sample_image();
    save_image_file(&path, &image, &SaveOptions::default()).unwrap();
    let loaded = load_image_file(&path, &LoadOptions::default()).unwrap();
    assert_same_image(&image, &loaded.image);
}

#[test]
fn test_floating_selection_blocks_save() {
    let mut image = sample_image();
    let target = image.layers()[1].id();
    let mut paste = Layer::new("Paste", 10, 10, ColorType::Rgb, true).unwrap();
    paste.drawable_mut().tiles_mut().fill(&[1, 2, 3, 255]);
    attach(&mut image, paste, DrawableRef::Layer(target)).unwrap();

    let mut buf = Cursor::new(Vec::new());
    let r = save_image(&mut buf, &image, &SaveOptions::default());
    assert!(matches!(r, Err(RasterError::UnsupportedOperation(_))));
}

#[test]
fn test_best_effort_load() {
    let image = sample_image();
    let mut buf = Cursor::new(Vec::new());
    save_image(&mut buf, &image, &SaveOptions::default()).unwrap();
    let mut bytes = buf.into_inner();

    // Magic, version, size, base type, compression and an empty colormap
    // come first; then the layer pointer table.
    let second_layer = 6 + 2 + 4 + 4 + 1 + 1 + 4 + 4;
    bytes[second_layer..second_layer + 4].copy_from_slice(&[0x7f, 0xff, 0xff, 0x00]);

    let loaded = load_image(&mut Cursor::new(bytes), &LoadOptions::default()).unwrap();
    assert_eq!(loaded.warnings.len(), 1);
    assert_eq!(loaded.image.layers().len(), 1);
    assert_eq!(loaded.image.layers()[0].name(), "Sketch");
    assert_eq!(loaded.image.layers()[0].tiles(), image.layers()[0].tiles());
    assert!(loaded.image.channels().is_empty());
}

#[test]
fn test_layer_offset_out_of_range() {
    let image = sample_image();
    let mut buf = Cursor::new(Vec::new());
    save_image(&mut buf, &image, &SaveOptions::default()).unwrap();
    let mut bytes = buf.into_inner();

    // The top layer record starts with its name ("Sketch") and then x
    let first_layer = 6 + 2 + 4 + 4 + 1 + 1 + 4;
    let record = u32::from_be_bytes(bytes[first_layer..first_layer + 4].try_into().unwrap()) as usize;
    let x = record + 4 + "Sketch".len();
    bytes[x..x + 4].copy_from_slice(&(i32::MAX - 5).to_be_bytes());

    let loaded = load_image(&mut Cursor::new(bytes), &LoadOptions::default()).unwrap();
    assert_eq!(loaded.warnings.len(), 1);
    assert!(loaded.image.layers().is_empty());
}

#[test]
fn test_not_an_image() {
    let r = load_image(&mut Cursor::new(b"PNG\0 not really".to_vec()), &LoadOptions::default());
    assert!(matches!(r, Err(RasterError::CorruptStream(_))));
}

#[test]
fn test_share_tiles_on_load() {
    let mut store = TileStore::new(256, 64, 1).unwrap();
    store.fill(&[9]);
    let layer = Layer::from_store("Flat", store, PixelFormat::GRAY).unwrap();
    let mut image = Image::new(256, 64, ColorType::Gray).unwrap();
    image.add_layer(layer, 0).unwrap();

    let mut buf = Cursor::new(Vec::new());
    save_image(&mut buf, &image, &SaveOptions::default()).unwrap();
    buf.set_position(0);
    let loaded = load_image(&mut buf, &LoadOptions::default()).unwrap();
    assert_eq!(loaded.image.layers()[0].tiles().share_count(0), 4);
}
