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


use std::error::Error;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

pub mod importer;
pub mod inspector;
pub mod renderer;

#[derive(Debug)]
pub struct CliError {
    message: String,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

/// Image size given as WxH
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Size(pub u32, pub u32);

impl FromStr for Size {
    type Err = ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s.split_once('x').unwrap_or((s, ""));
        Ok(Size(w.parse()?, h.parse()?))
    }
}

/// A position given as X,Y
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Point(pub i32, pub i32);

impl FromStr for Point {
    type Err = ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s.split_once(',').unwrap_or((s, ""));
        Ok(Point(x.trim().parse()?, y.trim().parse()?))
    }
}

/// An RGBA color given as RRGGBB or RRGGBBAA, with an optional leading #
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Color(pub [u8; 4]);

impl FromStr for Color {
    type Err = CliError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(CliError::new(format!("not a color: {}", s)));
        }
        let mut c = [255u8; 4];
        for (i, v) in c.iter_mut().enumerate().take(hex.len() / 2) {
            *v = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| CliError::new(format!("not a color: {}", s)))?;
        }
        Ok(Color(c))
    }
}

/// Replace the input file's suffix with the given one
pub fn with_suffix(input: &str, suffix: &str) -> String {
    let end = input.rfind('.').unwrap_or(input.len());
    format!("{}{}", &input[..end], suffix)
}
