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

//! Tiled raster storage and layer compositing.
//!
//! The `paint` module holds the engine proper: copy-on-write tile stores,
//! pixel region cursors, region algorithms, the layer/mask/channel model,
//! the floating selection protocol and the compositor.
//! The `codec` module reads and writes tile hierarchies and whole images.

pub mod codec;
mod error;
pub mod paint;

pub use error::{RasterError, Result};
