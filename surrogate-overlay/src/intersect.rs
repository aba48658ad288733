/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 14/03/2024
Last Modified: 08/01/2025
License: MIT
*/

//! The pairwise overlay engine. Candidate element pairs are screened with
//! bounding-box tests before any exact clip runs; each surviving clip result
//! is recorded together with the indices of the two parent elements.

use crate::clip::{line_clip, point_clip, polygon_clip};
use crate::poly_set::{Derivation, PolySet, ShapeKind};
use std::io::{Error, ErrorKind};
use std::sync::Arc;

/// Intersects every element of `poly1` with every element of `poly2`,
/// which must be a polygon set. The result has the kind of `poly1` and one
/// element per non-empty clip, with the parent indices held in its
/// derivation. Disjoint inputs give an empty result, not an error.
pub fn poly_isect(poly1: &Arc<PolySet>, poly2: &Arc<PolySet>) -> Result<PolySet, Error> {
    if poly2.kind != ShapeKind::Polygon {
        println!(
            "WARNING: The overlay set must be of polygon type; found {}.",
            poly2.kind
        );
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "The overlay set must be of polygon type.",
        ));
    }

    let mut result = PolySet::new(poly1.kind);
    if !poly1.bounding_box.overlaps(poly2.bounding_box) {
        println!("WARNING: There is no intersection between the two polygon sets.");
        result.derivation = Some(Derivation {
            first: Some(poly1.clone()),
            second: poly2.clone(),
            pairs: vec![],
        });
        return Ok(result);
    }

    let mut pairs: Vec<(usize, usize)> = vec![];
    for j in 0..poly2.num_shapes() {
        if !poly1.bounding_box.overlaps(poly2.boxes[j]) {
            continue;
        }
        for i in 0..poly1.num_shapes() {
            if !poly1.boxes[i].overlaps(poly2.boxes[j]) {
                continue;
            }
            let clipped = match poly1.kind {
                ShapeKind::Polygon => polygon_clip(&poly1.shapes[i], &poly2.shapes[j]),
                ShapeKind::Arc => line_clip(&poly1.shapes[i], &poly2.shapes[j]),
                ShapeKind::Point => point_clip(&poly1.shapes[i], &poly2.shapes[j])?,
            };
            if !clipped.contours.is_empty() {
                result.add_shape(clipped);
                pairs.push((i, j));
            }
        }
    }
    result.recompute_bounding_boxes();
    result.derivation = Some(Derivation {
        first: Some(poly1.clone()),
        second: poly2.clone(),
        pairs,
    });
    Ok(result)
}

#[cfg(test)]
mod test {
    use super::poly_isect;
    use crate::poly_set::{Contour, PolySet, PolyShape, ShapeKind};
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;
    use surrogate_common::structures::Point2D;

    fn rect(x0: f64, y0: f64, w: f64, h: f64) -> PolyShape {
        PolyShape {
            contours: vec![Contour {
                points: vec![
                    Point2D::new(x0, y0),
                    Point2D::new(x0, y0 + h),
                    Point2D::new(x0 + w, y0 + h),
                    Point2D::new(x0 + w, y0),
                ],
                is_hole: false,
            }],
        }
    }

    fn polygon_set(rects: &[(f64, f64, f64, f64)]) -> Arc<PolySet> {
        let mut set = PolySet::new(ShapeKind::Polygon);
        for &(x, y, w, h) in rects {
            set.add_shape(rect(x, y, w, h));
        }
        Arc::new(set)
    }

    #[test]
    fn test_quarter_overlap_records_parent_indices() {
        let a = polygon_set(&[(0.0, 0.0, 1.0, 1.0)]);
        let b = polygon_set(&[(0.5, 0.5, 1.0, 1.0)]);
        let r = poly_isect(&a, &b).unwrap();
        assert_eq!(r.kind, ShapeKind::Polygon);
        assert_eq!(r.num_shapes(), 1);
        assert!((r.shapes[0].area() - 0.25).abs() < 1e-9);
        assert_eq!(r.weight_index(0), Some(0));
        assert_eq!(r.grid_index(0), Some(0));
        assert_eq!(r.weight_set().map(|s| s.num_shapes()), Some(1));
    }

    #[test]
    fn test_disjoint_sets_give_empty_result() {
        let a = polygon_set(&[(0.0, 0.0, 1.0, 1.0)]);
        let b = polygon_set(&[(100.0, 100.0, 1.0, 1.0)]);
        let r = poly_isect(&a, &b).unwrap();
        assert!(r.is_empty());
        let deriv = r.derivation.unwrap();
        assert!(deriv.pairs.is_empty());
        assert_eq!(deriv.second.num_shapes(), 1);
    }

    #[test]
    fn test_non_polygon_overlay_set_is_an_error() {
        let a = polygon_set(&[(0.0, 0.0, 1.0, 1.0)]);
        let mut lines = PolySet::new(ShapeKind::Arc);
        lines.add_shape(PolyShape {
            contours: vec![Contour {
                points: vec![Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0)],
                is_hole: false,
            }],
        });
        assert!(poly_isect(&a, &Arc::new(lines)).is_err());
    }

    #[test]
    fn test_line_set_clipped_to_polygons() {
        let mut lines = PolySet::new(ShapeKind::Arc);
        lines.add_shape(PolyShape {
            contours: vec![Contour {
                points: vec![Point2D::new(-1.0, 0.5), Point2D::new(2.0, 0.5)],
                is_hole: false,
            }],
        });
        let r = poly_isect(&Arc::new(lines), &polygon_set(&[(0.0, 0.0, 1.0, 1.0)])).unwrap();
        assert_eq!(r.kind, ShapeKind::Arc);
        assert_eq!(r.num_shapes(), 1);
        assert!((r.shapes[0].length() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_point_set_clipped_to_polygons() {
        let mut points = PolySet::new(ShapeKind::Point);
        for &(x, y) in &[(0.5, 0.5), (3.0, 3.0)] {
            points.add_shape(PolyShape {
                contours: vec![Contour {
                    points: vec![Point2D::new(x, y)],
                    is_hole: false,
                }],
            });
        }
        let r = poly_isect(&Arc::new(points), &polygon_set(&[(0.0, 0.0, 1.0, 1.0)])).unwrap();
        assert_eq!(r.kind, ShapeKind::Point);
        assert_eq!(r.num_shapes(), 1);
        assert_eq!(r.weight_index(0), Some(0));
    }

    #[test]
    fn test_two_level_overlay_chain() {
        let weight = polygon_set(&[(0.5, 0.5, 1.0, 1.0), (1.5, 0.5, 1.0, 1.0)]);
        let data = polygon_set(&[(0.0, 0.0, 4.0, 4.0)]);
        let grid = polygon_set(&[(0.0, 0.0, 2.0, 4.0), (2.0, 0.0, 2.0, 4.0)]);

        let wd = Arc::new(poly_isect(&weight, &data).unwrap());
        assert_eq!(wd.num_shapes(), 2);

        let wdg = poly_isect(&wd, &grid).unwrap();
        // the second weight square straddles the cell boundary
        assert_eq!(wdg.num_shapes(), 3);
        let total: f64 = wdg.shapes.iter().map(|s| s.area()).sum();
        assert!((total - 2.0).abs() < 1e-9);
        for e in 0..wdg.num_shapes() {
            assert_eq!(wdg.data_index(e), Some(0));
            assert!(wdg.weight_index(e).unwrap() < 2);
            assert!(wdg.grid_index(e).unwrap() < 2);
        }
        assert_eq!(wdg.weight_set().map(|s| s.num_shapes()), Some(2));
        assert_eq!(wdg.data_set().map(|s| s.num_shapes()), Some(1));
        assert_eq!(wdg.grid_set().map(|s| s.num_shapes()), Some(2));
    }

    #[test]
    fn test_intersection_is_symmetric_over_random_rectangles() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut a = PolySet::new(ShapeKind::Polygon);
        let mut b = PolySet::new(ShapeKind::Polygon);
        for _ in 0..12 {
            a.add_shape(rect(
                rng.gen_range(0.0..50.0),
                rng.gen_range(0.0..50.0),
                rng.gen_range(1.0..10.0),
                rng.gen_range(1.0..10.0),
            ));
            b.add_shape(rect(
                rng.gen_range(0.0..50.0),
                rng.gen_range(0.0..50.0),
                rng.gen_range(1.0..10.0),
                rng.gen_range(1.0..10.0),
            ));
        }
        let a = Arc::new(a);
        let b = Arc::new(b);
        let ab = poly_isect(&a, &b).unwrap();
        let ba = poly_isect(&b, &a).unwrap();

        let mut ab_pairs: Vec<(usize, usize)> = (0..ab.num_shapes())
            .map(|e| (ab.weight_index(e).unwrap(), ab.grid_index(e).unwrap()))
            .collect();
        let mut ba_pairs: Vec<(usize, usize)> = (0..ba.num_shapes())
            .map(|e| (ba.grid_index(e).unwrap(), ba.weight_index(e).unwrap()))
            .collect();
        ab_pairs.sort_unstable();
        ba_pairs.sort_unstable();
        assert_eq!(ab_pairs, ba_pairs);

        let sum_ab: f64 = ab.shapes.iter().map(|s| s.area()).sum();
        let sum_ba: f64 = ba.shapes.iter().map(|s| s.area()).sum();
        assert!((sum_ab - sum_ba).abs() < 1e-6);
    }
}
