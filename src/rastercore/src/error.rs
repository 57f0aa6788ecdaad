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

use std::{fmt, io};

#[derive(Debug)]
pub enum RasterError {
    /// Width or height was zero (or otherwise unusable) at creation time
    InvalidDimensions,

    /// Two surfaces that must be the same size were not
    DimensionMismatch,

    /// The operation is not possible for this kind of object
    UnsupportedOperation(&'static str),

    /// A tile hierarchy or image stream is inconsistent or truncated
    CorruptStream(String),

    /// Tried to add an object to a container that already holds it
    AlreadyExists,

    /// Tried to access or remove an object that is not in the container
    NotFound,

    /// The layer is not an active floating selection
    NotFloatingSelection,

    /// Pixel formats cannot be combined
    IncompatibleFormat,

    /// A progress callback requested cancellation
    Cancelled,

    IoError(io::Error),
}

pub type Result<T> = std::result::Result<T, RasterError>;

impl RasterError {
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptStream(msg.into())
    }
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterError::InvalidDimensions => write!(f, "invalid dimensions"),
            RasterError::DimensionMismatch => write!(f, "dimension mismatch"),
            RasterError::UnsupportedOperation(what) => write!(f, "unsupported operation: {}", what),
            RasterError::CorruptStream(why) => write!(f, "corrupt stream: {}", why),
            RasterError::AlreadyExists => write!(f, "object already exists"),
            RasterError::NotFound => write!(f, "object not found"),
            RasterError::NotFloatingSelection => write!(f, "not a floating selection"),
            RasterError::IncompatibleFormat => write!(f, "incompatible pixel formats"),
            RasterError::Cancelled => write!(f, "cancelled"),
            RasterError::IoError(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for RasterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RasterError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RasterError {
    fn from(err: io::Error) -> Self {
        // A short read means the stream ended before the structure did
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::CorruptStream(err.to_string())
        } else {
            Self::IoError(err)
        }
    }
}
