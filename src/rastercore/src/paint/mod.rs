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


pub mod aoe;
pub mod boundary;
pub mod color;
pub mod compositor;
pub mod drawable;
pub mod floating;
pub mod image;
pub mod layer;
pub mod lut;
pub mod pixelbuffer;
pub mod rasterop;
pub mod rectiter;
pub mod region;
pub mod regionops;
pub mod tile;
pub mod tileiter;
pub mod tilestore;
pub mod transform;

// Re-export types most commonly used from the outside
mod blendmode;
mod rect;

pub use self::image::{DrawableRef, Image};
pub use aoe::AoE;
pub use blendmode::Blendmode;
pub use boundary::{BoundSeg, Boundary};
pub use color::{ColorType, ComponentSet, PixelFormat};
pub use compositor::FlattenOptions;
pub use drawable::{Drawable, DrawableKind, Lifecycle};
pub use layer::{Channel, ChannelId, FloatingState, Layer, LayerId, LayerMask, MaskApply, MaskKind};
pub use lut::{Levels, Lut};
pub use pixelbuffer::PixelBuffer;
pub use rasterop::BlendOptions;
pub use rect::{Rectangle, Size};
pub use region::{PixelRegion, PixelRegionMut};
pub use tile::{Tile, TileData, TILE_SIZE};
pub use tilestore::{TileStore, MAX_DIMENSION};
pub use transform::{Affine, Orientation, Rotation};
