/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 14/03/2024
Last Modified: 02/10/2024
License: MIT
*/

//! Dissolves a polygon set into a single multi-contour element, so a
//! many-record boundary file can serve as one overlay region.

use crate::clip::polygon_union;
use crate::poly_set::{Derivation, PolySet, PolyShape, ShapeKind};
use std::io::{Error, ErrorKind};
use std::sync::Arc;

/// Unions all elements of a polygon set into one. The result holds a single
/// element (none when the input is empty) whose derivation pair names the
/// first and last input elements as representative parents.
pub fn poly_union(poly: &Arc<PolySet>) -> Result<PolySet, Error> {
    if poly.kind != ShapeKind::Polygon {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "Only polygon sets can be unioned.",
        ));
    }

    let mut acc: Option<PolyShape> = None;
    for shape in &poly.shapes {
        acc = Some(match acc {
            Some(merged) => polygon_union(&merged, shape),
            None => shape.clone(),
        });
    }

    let mut result = PolySet::new(ShapeKind::Polygon);
    let mut pairs: Vec<(usize, usize)> = vec![];
    if let Some(merged) = acc {
        result.add_shape(merged);
        pairs.push((0, poly.num_shapes() - 1));
    }
    result.recompute_bounding_boxes();
    result.derivation = Some(Derivation {
        first: None,
        second: poly.clone(),
        pairs,
    });
    Ok(result)
}

#[cfg(test)]
mod test {
    use super::poly_union;
    use crate::poly_set::{Contour, PolySet, PolyShape, ShapeKind};
    use std::sync::Arc;
    use surrogate_common::structures::Point2D;

    fn square(x0: f64, y0: f64, size: f64) -> PolyShape {
        PolyShape {
            contours: vec![Contour {
                points: vec![
                    Point2D::new(x0, y0),
                    Point2D::new(x0, y0 + size),
                    Point2D::new(x0 + size, y0 + size),
                    Point2D::new(x0 + size, y0),
                ],
                is_hole: false,
            }],
        }
    }

    #[test]
    fn test_union_of_disjoint_squares_preserves_area() {
        let mut set = PolySet::new(ShapeKind::Polygon);
        set.add_shape(square(0.0, 0.0, 1.0));
        set.add_shape(square(3.0, 0.0, 2.0));
        set.add_shape(square(0.0, 5.0, 1.5));
        let unioned = poly_union(&Arc::new(set)).unwrap();
        assert_eq!(unioned.num_shapes(), 1);
        let expected = 1.0 + 4.0 + 2.25;
        assert!((unioned.shapes[0].area() - expected).abs() < 1e-9);
        let deriv = unioned.derivation.unwrap();
        assert!(deriv.first.is_none());
        assert_eq!(deriv.pairs, vec![(0, 2)]);
    }

    #[test]
    fn test_union_of_overlapping_squares() {
        let mut set = PolySet::new(ShapeKind::Polygon);
        set.add_shape(square(0.0, 0.0, 1.0));
        set.add_shape(square(0.5, 0.5, 1.0));
        let unioned = poly_union(&Arc::new(set)).unwrap();
        assert_eq!(unioned.num_shapes(), 1);
        assert!((unioned.shapes[0].area() - 1.75).abs() < 1e-9);
    }

    #[test]
    fn test_union_of_empty_set_has_no_elements() {
        let set = PolySet::new(ShapeKind::Polygon);
        let unioned = poly_union(&Arc::new(set)).unwrap();
        assert!(unioned.is_empty());
        assert!(unioned.derivation.unwrap().pairs.is_empty());
    }

    #[test]
    fn test_union_of_line_set_is_an_error() {
        let set = PolySet::new(ShapeKind::Arc);
        assert!(poly_union(&Arc::new(set)).is_err());
    }
}
