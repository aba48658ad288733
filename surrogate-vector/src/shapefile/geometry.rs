/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 12/05/2023
Last Modified: 08/11/2024
License: MIT

Notes: Geometry records of the ESRI Shapefile format. Measured (M) and 3-D
(Z) shape types are recognized on input but their vertical and measure
payloads are discarded; only x-y geometry is carried.
*/
use std::fmt;
use surrogate_common::structures::Point2D;

/// The geometry of one shapefile record.
#[derive(Default, Clone, Debug)]
pub struct ShapefileGeometry {
    pub shape_type: ShapeType,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub num_parts: i32,
    pub num_points: i32,
    pub parts: Vec<i32>,
    pub points: Vec<Point2D>,
}

impl ShapefileGeometry {
    pub fn new(shape_type: ShapeType) -> ShapefileGeometry {
        ShapefileGeometry {
            shape_type,
            x_min: f64::INFINITY,
            x_max: f64::NEG_INFINITY,
            y_min: f64::INFINITY,
            y_max: f64::NEG_INFINITY,
            ..Default::default()
        }
    }

    /// Adds a part to the geometry; the part offset list is maintained
    /// automatically.
    pub fn add_part(&mut self, points: &[Point2D]) {
        self.parts.push(self.points.len() as i32);
        self.num_parts += 1;
        for p in points {
            self.points.push(*p);
            self.update_extent(p.x, p.y);
        }
        self.num_points += points.len() as i32;
    }

    pub fn add_point(&mut self, point: Point2D) {
        self.points.push(point);
        self.num_points += 1;
        self.update_extent(point.x, point.y);
    }

    fn update_extent(&mut self, x: f64, y: f64) {
        if x < self.x_min {
            self.x_min = x;
        }
        if x > self.x_max {
            self.x_max = x;
        }
        if y < self.y_min {
            self.y_min = y;
        }
        if y > self.y_max {
            self.y_max = y;
        }
    }

    /// Returns the points belonging to one part.
    pub fn get_part(&self, part_num: usize) -> &[Point2D] {
        let start = self.parts[part_num] as usize;
        let end = if part_num < self.parts.len() - 1 {
            self.parts[part_num + 1] as usize
        } else {
            self.points.len()
        };
        &self.points[start..end]
    }

    /// The length of the record content in bytes, including the leading
    /// shape-type integer.
    pub fn get_length(&self) -> i32 {
        match self.shape_type.base_shape_type() {
            ShapeType::Null => 4i32,
            ShapeType::Point => 20i32,
            ShapeType::PolyLine | ShapeType::Polygon => {
                44i32 + 4i32 * self.num_parts + 16i32 * self.num_points
            }
            ShapeType::MultiPoint => 40i32 + 16i32 * self.num_points,
            _ => 0i32,
        }
    }
}

/// The ESRI shape-type codes. The Z and M variants are accepted by the
/// reader, which flattens them to their base x-y types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeType {
    Null,
    Point,
    PolyLine,
    Polygon,
    MultiPoint,
    PointZ,
    PolyLineZ,
    PolygonZ,
    MultiPointZ,
    PointM,
    PolyLineM,
    PolygonM,
    MultiPointM,
}

impl Default for ShapeType {
    fn default() -> ShapeType {
        ShapeType::Null
    }
}

impl ShapeType {
    pub fn from_int(value: i32) -> ShapeType {
        match value {
            0 => ShapeType::Null,
            1 => ShapeType::Point,
            3 => ShapeType::PolyLine,
            5 => ShapeType::Polygon,
            8 => ShapeType::MultiPoint,
            11 => ShapeType::PointZ,
            13 => ShapeType::PolyLineZ,
            15 => ShapeType::PolygonZ,
            18 => ShapeType::MultiPointZ,
            21 => ShapeType::PointM,
            23 => ShapeType::PolyLineM,
            25 => ShapeType::PolygonM,
            28 => ShapeType::MultiPointM,
            _ => panic!("Unrecognized ShapeType {}", value),
        }
    }

    pub fn to_int(&self) -> i32 {
        match self {
            ShapeType::Null => 0,
            ShapeType::Point => 1,
            ShapeType::PolyLine => 3,
            ShapeType::Polygon => 5,
            ShapeType::MultiPoint => 8,
            ShapeType::PointZ => 11,
            ShapeType::PolyLineZ => 13,
            ShapeType::PolygonZ => 15,
            ShapeType::MultiPointZ => 18,
            ShapeType::PointM => 21,
            ShapeType::PolyLineM => 23,
            ShapeType::PolygonM => 25,
            ShapeType::MultiPointM => 28,
        }
    }

    /// The x-y shape type a measured or 3-D variant collapses to.
    pub fn base_shape_type(&self) -> ShapeType {
        match self {
            ShapeType::PointZ | ShapeType::PointM => ShapeType::Point,
            ShapeType::PolyLineZ | ShapeType::PolyLineM => ShapeType::PolyLine,
            ShapeType::PolygonZ | ShapeType::PolygonM => ShapeType::Polygon,
            ShapeType::MultiPointZ | ShapeType::MultiPointM => ShapeType::MultiPoint,
            _ => *self,
        }
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod test {
    use super::{ShapeType, ShapefileGeometry};
    use surrogate_common::structures::Point2D;

    #[test]
    fn test_add_part_tracks_offsets_and_extent() {
        let mut sfg = ShapefileGeometry::new(ShapeType::Polygon);
        sfg.add_part(&[
            Point2D::new(0.0, 0.0),
            Point2D::new(0.0, 2.0),
            Point2D::new(2.0, 2.0),
            Point2D::new(2.0, 0.0),
            Point2D::new(0.0, 0.0),
        ]);
        sfg.add_part(&[
            Point2D::new(3.0, 3.0),
            Point2D::new(3.0, 4.0),
            Point2D::new(4.0, 4.0),
            Point2D::new(3.0, 3.0),
        ]);
        assert_eq!(sfg.num_parts, 2);
        assert_eq!(sfg.num_points, 9);
        assert_eq!(sfg.parts, vec![0, 5]);
        assert_eq!(sfg.get_part(0).len(), 5);
        assert_eq!(sfg.get_part(1).len(), 4);
        assert_eq!(sfg.x_max, 4.0);
        assert_eq!(sfg.y_min, 0.0);
    }

    #[test]
    fn test_record_length() {
        let mut sfg = ShapefileGeometry::new(ShapeType::Point);
        sfg.add_point(Point2D::new(1.0, 1.0));
        assert_eq!(sfg.get_length(), 20);

        let mut poly = ShapefileGeometry::new(ShapeType::Polygon);
        poly.add_part(&[
            Point2D::new(0.0, 0.0),
            Point2D::new(0.0, 1.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(0.0, 0.0),
        ]);
        assert_eq!(poly.get_length(), 44 + 4 + 16 * 4);
    }

    #[test]
    fn test_base_shape_type() {
        assert_eq!(ShapeType::PolygonZ.base_shape_type(), ShapeType::Polygon);
        assert_eq!(ShapeType::PointM.base_shape_type(), ShapeType::Point);
        assert_eq!(ShapeType::PolyLine.base_shape_type(), ShapeType::PolyLine);
    }
}
