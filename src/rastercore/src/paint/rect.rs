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

use core::cmp::{max, min};

/// An axis aligned rectangle.
///
/// Edge arithmetic saturates at the `i32` range.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Size {
        Size { width, height }
    }
}

impl Rectangle {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Rectangle {
        assert!(w > 0 && h > 0);
        Rectangle { x, y, w, h }
    }

    /// Like `new`, but returns None for an empty rectangle
    pub fn try_new(x: i32, y: i32, w: i32, h: i32) -> Option<Rectangle> {
        if w > 0 && h > 0 {
            Some(Rectangle { x, y, w, h })
        } else {
            None
        }
    }

    pub fn contains(&self, other: &Rectangle) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }

    pub fn intersected(&self, other: &Rectangle) -> Option<Rectangle> {
        let leftx = max(self.x, other.x);
        let rightx = min(self.x.saturating_add(self.w), other.x.saturating_add(other.w));
        let topy = max(self.y, other.y);
        let btmy = min(self.y.saturating_add(self.h), other.y.saturating_add(other.h));

        if leftx < rightx && topy < btmy {
            Some(Rectangle::new(leftx, topy, rightx - leftx, btmy - topy))
        } else {
            None
        }
    }

    pub fn union(&self, other: &Rectangle) -> Rectangle {
        let x0 = min(self.x, other.x);
        let y0 = min(self.y, other.y);
        let x1 = max(self.right(), other.right());
        let y1 = max(self.bottom(), other.bottom());

        Rectangle {
            x: x0,
            y: y0,
            w: x1.saturating_sub(x0).saturating_add(1),
            h: y1.saturating_sub(y0).saturating_add(1),
        }
    }

    /// Crop this rectangle to the area (0, 0, size)
    pub fn cropped(&self, size: Size) -> Option<Rectangle> {
        self.intersected(&Rectangle::try_new(0, 0, size.width, size.height)?)
    }

    /// Is this rectangle fully inside the area (0, 0, size)
    pub fn in_bounds(&self, size: Size) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.x.saturating_add(self.w) <= size.width
            && self.y.saturating_add(self.h) <= size.height
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.w - 1)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.h - 1)
    }

    pub fn area(&self) -> usize {
        self.w as usize * self.h as usize
    }

    pub fn size(&self) -> Size {
        Size::new(self.w, self.h)
    }

    pub fn offset(&self, x: i32, y: i32) -> Rectangle {
        Rectangle {
            x: self.x.saturating_add(x),
            y: self.y.saturating_add(y),
            w: self.w,
            h: self.h,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection() {
        let r1 = Rectangle::new(0, 0, 100, 100);
        let r2 = Rectangle::new(-10, -10, 20, 20);
        let edge = Rectangle::new(99, 0, 10, 10);

        assert_eq!(r1.intersected(&r2), Some(Rectangle::new(0, 0, 10, 10)));
        assert_eq!(r1.intersected(&edge), Some(Rectangle::new(99, 0, 1, 10)));

        let touching = Rectangle::new(100, 100, 20, 20);
        let outside = Rectangle::new(200, 200, 10, 10);
        assert_eq!(r1.intersected(&touching), None);
        assert_eq!(r1.intersected(&outside), None);
    }

    #[test]
    fn test_union() {
        let r1 = Rectangle::new(0, 0, 100, 100);
        let r2 = Rectangle::new(-10, -10, 20, 20);
        assert_eq!(r1.union(&r2), Rectangle::new(-10, -10, 110, 110));

        let inside = Rectangle::new(10, 10, 10, 10);
        assert_eq!(r1.union(&inside), r1);
    }

    #[test]
    fn test_far_edge() {
        let far = Rectangle::new(i32::MAX - 5, 0, 64, 64);
        assert_eq!(far.right(), i32::MAX);
        assert_eq!(far.intersected(&Rectangle::new(0, 0, 10, 10)), None);
        assert_eq!(
            far.intersected(&Rectangle::new(i32::MAX - 10, 0, 8, 8)),
            Some(Rectangle::new(i32::MAX - 5, 0, 3, 8))
        );
        assert!(!far.in_bounds(Size::new(64, 64)));
    }

    #[test]
    fn test_bounds() {
        let size = Size::new(64, 32);
        assert!(Rectangle::new(0, 0, 64, 32).in_bounds(size));
        assert!(!Rectangle::new(1, 0, 64, 32).in_bounds(size));
        assert!(!Rectangle::new(-1, 0, 2, 2).in_bounds(size));
        assert_eq!(
            Rectangle::new(-5, 30, 10, 10).cropped(size),
            Some(Rectangle::new(0, 30, 5, 2))
        );
        assert_eq!(Rectangle::try_new(0, 0, 0, 5), None);
    }
}
