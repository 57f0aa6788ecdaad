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


use super::Rectangle;

/// The part of the image an operation changed, in image coordinates.
///
/// Operations that change pixels or geometry return this in place of a
/// change notification, so the caller knows what to redraw. A change to
/// a hidden drawable is `Nothing`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AoE {
    Bounds(Rectangle),
    Nothing,
}

impl AoE {
    /// The smallest area of effect covering both
    pub fn merge(self, other: AoE) -> Self {
        match (self, other) {
            (AoE::Bounds(a), AoE::Bounds(b)) => AoE::Bounds(a.union(&b)),
            (AoE::Nothing, o) => o,
            (s, AoE::Nothing) => s,
        }
    }

    pub fn is_nothing(&self) -> bool {
        *self == AoE::Nothing
    }

    pub fn bounds(&self) -> Option<Rectangle> {
        match self {
            AoE::Bounds(r) => Some(*r),
            AoE::Nothing => None,
        }
    }
}

impl From<Option<Rectangle>> for AoE {
    fn from(item: Option<Rectangle>) -> AoE {
        item.map_or(AoE::Nothing, AoE::Bounds)
    }
}
