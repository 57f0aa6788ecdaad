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


//! Per-channel lookup tables for tone adjustments.

use super::color::MAX_CHANNELS;

/// A set of 256 entry lookup tables, one per channel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lut {
    tables: Vec<[u8; 256]>,
}

/// Parameters of a levels adjustment, in 0..255 channel units
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Levels {
    pub low_input: f32,
    pub high_input: f32,
    pub gamma: f32,
    pub low_output: f32,
    pub high_output: f32,
}

impl Default for Levels {
    fn default() -> Self {
        Self {
            low_input: 0.0,
            high_input: 255.0,
            gamma: 1.0,
            low_output: 0.0,
            high_output: 255.0,
        }
    }
}

fn round_half_up(v: f32) -> u8 {
    (v + 0.5).floor().clamp(0.0, 255.0) as u8
}

impl Lut {
    /// Build a table from a function of (channel, value in 0..255).
    ///
    /// Results are rounded half up and clamped to 0..255.
    pub fn from_fn<F>(channels: usize, f: F) -> Lut
    where
        F: Fn(usize, f32) -> f32,
    {
        debug_assert!(channels > 0 && channels <= MAX_CHANNELS);
        let tables = (0..channels)
            .map(|c| {
                let mut t = [0u8; 256];
                for (i, v) in t.iter_mut().enumerate() {
                    *v = round_half_up(f(c, i as f32));
                }
                t
            })
            .collect();
        Lut { tables }
    }

    pub fn identity(channels: usize) -> Lut {
        Lut::from_fn(channels, |_, v| v)
    }

    pub fn invert(channels: usize) -> Lut {
        Lut::from_fn(channels, |_, v| 255.0 - v)
    }

    /// Brightness and contrast adjustment. Both values are in range -1..1.
    pub fn brightness_contrast(channels: usize, brightness: f32, contrast: f32) -> Lut {
        let brightness = brightness.clamp(-1.0, 1.0);
        let contrast = contrast.clamp(-1.0, 1.0);
        Lut::from_fn(channels, |_, v| {
            let mut value = v / 255.0;
            if brightness < 0.0 {
                value *= 1.0 + brightness;
            } else {
                value += (1.0 - value) * brightness;
            }

            // Contrast pulls values toward or pushes them away from the midpoint
            let nvalue = if value > 0.5 { 1.0 - value } else { value }.max(0.0);
            let power = if contrast < 0.0 {
                1.0 + contrast
            } else if contrast >= 1.0 {
                127.0
            } else {
                1.0 / (1.0 - contrast)
            };
            let nvalue = 0.5 * (2.0 * nvalue).powf(power);
            let value = if value > 0.5 { 1.0 - nvalue } else { nvalue };
            value * 255.0
        })
    }

    pub fn levels(channels: usize, levels: &Levels) -> Lut {
        let l = *levels;
        let in_range = (l.high_input - l.low_input).max(1.0);
        let inv_gamma = 1.0 / l.gamma.max(0.01);
        Lut::from_fn(channels, move |_, v| {
            let normalized = ((v - l.low_input) / in_range).clamp(0.0, 1.0);
            l.low_output + normalized.powf(inv_gamma) * (l.high_output - l.low_output)
        })
    }

    pub fn gamma(channels: usize, gamma: f32) -> Lut {
        let inv_gamma = 1.0 / gamma.max(0.01);
        Lut::from_fn(channels, move |_, v| (v / 255.0).powf(inv_gamma) * 255.0)
    }

    /// Reduce each channel to the given number of evenly spaced levels
    pub fn posterize(channels: usize, levels: u8) -> Lut {
        let steps = (levels.max(2) - 1) as f32;
        Lut::from_fn(channels, move |_, v| {
            (v / 255.0 * steps + 0.5).floor() * 255.0 / steps
        })
    }

    /// Values in low..=high become 255, everything else 0
    pub fn threshold(channels: usize, low: u8, high: u8) -> Lut {
        Lut::from_fn(channels, move |_, v| {
            if v >= low as f32 && v <= high as f32 {
                255.0
            } else {
                0.0
            }
        })
    }

    /// Build a table by linear interpolation between control points.
    ///
    /// Points are (input, output) pairs. Values before the first and after
    /// the last point are held constant.
    pub fn from_curve(channels: usize, points: &[(u8, u8)]) -> Lut {
        let mut points = points.to_vec();
        points.sort_by_key(|p| p.0);
        points.dedup_by_key(|p| p.0);
        if points.is_empty() {
            return Lut::identity(channels);
        }
        Lut::from_fn(channels, move |_, v| {
            let first = points[0];
            let last = points[points.len() - 1];
            if v <= first.0 as f32 {
                return first.1 as f32;
            }
            if v >= last.0 as f32 {
                return last.1 as f32;
            }
            let seg = points
                .windows(2)
                .find(|w| v <= w[1].0 as f32)
                .unwrap_or(&points[points.len() - 2..]);
            let (x0, y0) = (seg[0].0 as f32, seg[0].1 as f32);
            let (x1, y1) = (seg[1].0 as f32, seg[1].1 as f32);
            y0 + (v - x0) * (y1 - y0) / (x1 - x0)
        })
    }

    pub fn channels(&self) -> usize {
        self.tables.len()
    }

    pub fn map(&self, channel: usize, value: u8) -> u8 {
        let table = &self.tables[channel.min(self.tables.len() - 1)];
        table[value as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_and_invert() {
        let id = Lut::identity(3);
        let inv = Lut::invert(3);
        for v in 0..=255u8 {
            assert_eq!(id.map(1, v), v);
            assert_eq!(inv.map(2, v), 255 - v);
        }
        assert_eq!(Lut::levels(1, &Levels::default()), Lut::identity(1));
        assert_eq!(Lut::gamma(1, 1.0), Lut::identity(1));
        assert_eq!(Lut::brightness_contrast(1, 0.0, 0.0), Lut::identity(1));
    }

    #[test]
    fn test_round_half_up() {
        let half = Lut::from_fn(1, |_, v| v / 2.0);
        assert_eq!(half.map(0, 1), 1);
        assert_eq!(half.map(0, 3), 2);
        assert_eq!(half.map(0, 4), 2);
    }

    #[test]
    fn test_posterize_threshold() {
        let p = Lut::posterize(1, 2);
        assert_eq!(p.map(0, 127), 0);
        assert_eq!(p.map(0, 128), 255);

        let t = Lut::threshold(1, 100, 200);
        assert_eq!(t.map(0, 99), 0);
        assert_eq!(t.map(0, 100), 255);
        assert_eq!(t.map(0, 200), 255);
        assert_eq!(t.map(0, 201), 0);
    }

    #[test]
    fn test_curve() {
        assert_eq!(Lut::from_curve(1, &[(0, 0), (255, 255)]), Lut::identity(1));
        assert_eq!(Lut::from_curve(1, &[(255, 0), (0, 255)]), Lut::invert(1));

        let c = Lut::from_curve(1, &[(0, 0), (100, 200), (255, 255)]);
        assert_eq!(c.map(0, 50), 100);
        assert_eq!(c.map(0, 100), 200);
    }

    #[test]
    fn test_brightness() {
        let lut = Lut::brightness_contrast(1, 1.0, 0.0);
        assert_eq!(lut.map(0, 0), 255);
        let lut = Lut::brightness_contrast(1, -1.0, 0.0);
        assert_eq!(lut.map(0, 255), 0);
    }
}
