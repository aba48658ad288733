/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 04/03/2023
Last Modified: 26/02/2024
License: MIT
*/
use crate::structures::Point2D;

/// An axis-aligned bounding rectangle. A newly created, empty box holds the
/// infinite sentinel extents and reports `is_null()` until the first point or
/// box is folded into it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Default for BoundingBox {
    fn default() -> BoundingBox {
        BoundingBox {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }
}

impl BoundingBox {
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> BoundingBox {
        let (x1, x2) = if min_x < max_x {
            (min_x, max_x)
        } else {
            (max_x, min_x)
        };
        let (y1, y2) = if min_y < max_y {
            (min_y, max_y)
        } else {
            (max_y, min_y)
        };
        BoundingBox {
            min_x: x1,
            min_y: y1,
            max_x: x2,
            max_y: y2,
        }
    }

    pub fn from_points(points: &[Point2D]) -> BoundingBox {
        let mut bb = BoundingBox::default();
        for p in points {
            bb.expand_to_point(p.x, p.y);
        }
        bb
    }

    /// True for a box no geometry has been folded into yet.
    pub fn is_null(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn get_width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn get_height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn expand_to_point(&mut self, x: f64, y: f64) {
        if x < self.min_x {
            self.min_x = x;
        }
        if x > self.max_x {
            self.max_x = x;
        }
        if y < self.min_y {
            self.min_y = y;
        }
        if y > self.max_y {
            self.max_y = y;
        }
    }

    pub fn expand_to(&mut self, other: BoundingBox) {
        if other.min_x < self.min_x {
            self.min_x = other.min_x;
        }
        if other.min_y < self.min_y {
            self.min_y = other.min_y;
        }
        if other.max_x > self.max_x {
            self.max_x = other.max_x;
        }
        if other.max_y > self.max_y {
            self.max_y = other.max_y;
        }
    }

    /// Closed-interval overlap test; boxes that share only an edge or a
    /// corner still overlap.
    pub fn overlaps(&self, other: BoundingBox) -> bool {
        if self.max_y < other.min_y
            || self.max_x < other.min_x
            || self.min_y > other.max_y
            || self.min_x > other.max_x
        {
            return false;
        }
        true
    }

    pub fn intersect(&self, other: BoundingBox) -> BoundingBox {
        let max_y = if self.max_y <= other.max_y {
            self.max_y
        } else {
            other.max_y
        };
        let max_x = if self.max_x <= other.max_x {
            self.max_x
        } else {
            other.max_x
        };
        let min_y = if self.min_y >= other.min_y {
            self.min_y
        } else {
            other.min_y
        };
        let min_x = if self.min_x >= other.min_x {
            self.min_x
        } else {
            other.min_x
        };
        BoundingBox {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn is_point_in_box(&self, x: f64, y: f64) -> bool {
        !(self.max_y < y || self.max_x < x || self.min_y > y || self.min_x > x)
    }
}

#[cfg(test)]
mod test {
    use super::BoundingBox;
    use crate::structures::Point2D;

    #[test]
    fn test_null_box_sentinels() {
        let bb = BoundingBox::default();
        assert!(bb.is_null());

        let mut bb2 = bb;
        bb2.expand_to_point(3.0, -2.0);
        assert!(!bb2.is_null());
        assert_eq!(bb2.min_x, 3.0);
        assert_eq!(bb2.max_x, 3.0);
        assert_eq!(bb2.min_y, -2.0);
        assert_eq!(bb2.max_y, -2.0);
    }

    #[test]
    fn test_from_points_contains_all_vertices() {
        let points = vec![
            Point2D::new(1.0, 5.0),
            Point2D::new(-4.0, 2.0),
            Point2D::new(3.0, -1.0),
        ];
        let bb = BoundingBox::from_points(&points);
        assert!(bb.min_x <= bb.max_x && bb.min_y <= bb.max_y);
        for p in &points {
            assert!(bb.is_point_in_box(p.x, p.y));
        }
        assert_eq!(bb.min_x, -4.0);
        assert_eq!(bb.max_x, 3.0);
        assert_eq!(bb.min_y, -1.0);
        assert_eq!(bb.max_y, 5.0);
    }

    #[test]
    fn test_overlap_is_symmetric_and_closed() {
        let a = BoundingBox::new(0.0, 1.0, 0.0, 1.0);
        let b = BoundingBox::new(0.5, 1.5, 0.5, 1.5);
        let c = BoundingBox::new(2.0, 3.0, 2.0, 3.0);
        assert!(a.overlaps(b));
        assert!(b.overlaps(a));
        assert!(!a.overlaps(c));
        assert!(!c.overlaps(a));

        // boxes touching along an edge count as overlapping
        let d = BoundingBox::new(1.0, 2.0, 0.0, 1.0);
        assert!(a.overlaps(d));
        assert!(d.overlaps(a));
    }
}
