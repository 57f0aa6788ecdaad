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


use num_enum::IntoPrimitive;
use num_enum::TryFromPrimitive;

/// Layer blending modes.
///
/// The numeric values are stable and used in saved images.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Blendmode {
    Normal = 0,
    Multiply = 3,
    Screen,
    Overlay,
    Difference,
    Addition,
    Subtract,
    DarkenOnly,
    LightenOnly,
    Hue,
    Saturation,
    Color,
    Value,
    Divide,
    Dodge,
    Burn,
    HardLight,
    SoftLight,
    GrainExtract,
    GrainMerge,
}

impl Blendmode {
    /// Modes that operate on whole pixels in a cylindrical color space
    pub fn is_hsv_mode(self) -> bool {
        matches!(
            self,
            Blendmode::Hue | Blendmode::Saturation | Blendmode::Color | Blendmode::Value
        )
    }

    /// Can this mode make a transparent destination pixel less transparent?
    ///
    /// Every mode except Normal limits the source alpha to the
    /// destination's alpha.
    pub fn can_increase_opacity(self) -> bool {
        self == Blendmode::Normal
    }

    pub fn name(self) -> &'static str {
        use Blendmode::*;
        match self {
            Normal => "normal",
            Multiply => "multiply",
            Screen => "screen",
            Overlay => "overlay",
            Difference => "difference",
            Addition => "addition",
            Subtract => "subtract",
            DarkenOnly => "darken-only",
            LightenOnly => "lighten-only",
            Hue => "hue",
            Saturation => "saturation",
            Color => "color",
            Value => "value",
            Divide => "divide",
            Dodge => "dodge",
            Burn => "burn",
            HardLight => "hard-light",
            SoftLight => "soft-light",
            GrainExtract => "grain-extract",
            GrainMerge => "grain-merge",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        use Blendmode::*;
        Some(match name {
            "normal" => Normal,
            "multiply" => Multiply,
            "screen" => Screen,
            "overlay" => Overlay,
            "difference" => Difference,
            "addition" => Addition,
            "subtract" => Subtract,
            "darken-only" => DarkenOnly,
            "lighten-only" => LightenOnly,
            "hue" => Hue,
            "saturation" => Saturation,
            "color" => Color,
            "value" => Value,
            "divide" => Divide,
            "dodge" => Dodge,
            "burn" => Burn,
            "hard-light" => HardLight,
            "soft-light" => SoftLight,
            "grain-extract" => GrainExtract,
            "grain-merge" => GrainMerge,
            _ => {
                return None;
            }
        })
    }
}

impl Default for Blendmode {
    fn default() -> Self {
        Blendmode::Normal
    }
}
