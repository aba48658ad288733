/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 22/03/2024
Last Modified: 19/03/2025
License: MIT
*/

//! Numeric aggregation over overlay results. Every routine here walks a
//! derived set's elements, resolves each element's ancestry through the
//! derivation chain, and folds a per-element weight fraction into dense or
//! sparse accumulators.

use crate::intersect::poly_isect;
use crate::overlap_table::{OverlapTable, MISSING};
use crate::poly_set::{PolySet, PolyShape, ShapeKind};
use std::io::{Error, ErrorKind};
use std::sync::Arc;

fn no_derivation() -> Error {
    Error::new(
        ErrorKind::InvalidInput,
        "The polygon set was not derived from an overlay.",
    )
}

fn derived_sets(poly: &PolySet) -> Result<(&PolySet, &PolySet), Error> {
    let weight = poly.weight_set().ok_or_else(no_derivation)?;
    let data = poly.data_set().ok_or_else(no_derivation)?;
    Ok((weight, data))
}

/// The contribution of one clipped element. With an attribute the value is
/// apportioned by the clipped share of the parent's measure; without one
/// the raw clipped measure itself is the weight. A point that picked up a
/// second contour fell inside a hole ring and contributes nothing.
fn weight_frac(
    weight: &PolySet,
    weight_idx: usize,
    clipped: &PolyShape,
    attr: Option<usize>,
) -> f64 {
    let val = match (attr, weight.attributes.as_ref()) {
        (Some(a), Some(table)) => table.rows[weight_idx][a].as_f64(),
        _ => 1f64,
    };
    if val == 0f64 {
        return 0f64;
    }
    match weight.kind {
        ShapeKind::Point => {
            if clipped.contours.len() > 1 {
                0f64
            } else {
                val
            }
        }
        ShapeKind::Arc => match attr {
            Some(_) => {
                let parent = weight.shapes[weight_idx].length();
                if parent != 0f64 {
                    val * clipped.length() / parent
                } else {
                    0f64
                }
            }
            None => clipped.length(),
        },
        ShapeKind::Polygon => match attr {
            Some(_) => {
                let parent = weight.shapes[weight_idx].area();
                if parent != 0f64 {
                    val * clipped.area() / parent
                } else {
                    0f64
                }
            }
            None => clipped.area(),
        },
    }
}

/// Like `weight_frac` but for averaging: a polygon attribute is weighted by
/// the raw clipped area rather than by the share of the parent.
fn avg_frac(weight: &PolySet, weight_idx: usize, clipped: &PolyShape, attr: Option<usize>) -> f64 {
    if weight.kind == ShapeKind::Polygon {
        if let (Some(a), Some(table)) = (attr, weight.attributes.as_ref()) {
            return table.rows[weight_idx][a].as_f64() * clipped.area();
        }
        return clipped.area();
    }
    weight_frac(weight, weight_idx, clipped, attr)
}

/// Sums the weight fractions per data polygon. The returned vector is dense
/// over the data set's elements; polygons with no overlap hold zero.
pub fn sum1(poly: &PolySet, attr: Option<usize>) -> Result<Vec<f64>, Error> {
    let (weight, data) = derived_sets(poly)?;
    let mut sums = vec![0f64; data.num_shapes()];
    for e in 0..poly.num_shapes() {
        let w = match poly.weight_index(e) {
            Some(w) => w,
            None => continue,
        };
        let d = match poly.data_index(e) {
            Some(d) => d,
            None => continue,
        };
        sums[d] += weight_frac(weight, w, &poly.shapes[e], attr);
    }
    Ok(sums)
}

/// Accumulates the weight fractions of a two-level overlay into the sparse
/// (data polygon, grid cell) table. An element whose pair has no row in the
/// table is reported and skipped.
pub fn sum2(poly: &PolySet, attr: Option<usize>, table: &mut OverlapTable) -> Result<(), Error> {
    let weight = poly.weight_set().ok_or_else(no_derivation)?;
    for e in 0..poly.num_shapes() {
        let (w, d, g) = match (poly.weight_index(e), poly.data_index(e), poly.grid_index(e)) {
            (Some(w), Some(d), Some(g)) => (w, d, g),
            _ => continue,
        };
        let current = table.get(d, g);
        if current == MISSING {
            println!(
                "WARNING: Couldn't find index ({}, {}) in the overlap table.",
                d, g
            );
            continue;
        }
        let frac = weight_frac(weight, w, &poly.shapes[e], attr);
        table.set(d, g, current + frac)?;
    }
    Ok(())
}

/// Averages an attribute over each data polygon: contributions accumulate
/// area-weighted and the total is divided by the data element's own
/// measure. A zero measure is reported and the raw sum kept.
pub fn avg1(poly: &PolySet, attr: Option<usize>) -> Result<Vec<f64>, Error> {
    let (weight, data) = derived_sets(poly)?;
    let mut sums = vec![0f64; data.num_shapes()];
    for e in 0..poly.num_shapes() {
        let w = match poly.weight_index(e) {
            Some(w) => w,
            None => continue,
        };
        let d = match poly.data_index(e) {
            Some(d) => d,
            None => continue,
        };
        sums[d] += avg_frac(weight, w, &poly.shapes[e], attr);
    }
    for i in 0..sums.len() {
        let measure = match data.kind {
            ShapeKind::Polygon => data.shapes[i].area(),
            ShapeKind::Arc => data.shapes[i].length(),
            ShapeKind::Point => 1f64,
        };
        if measure != 0f64 {
            sums[i] /= measure;
        } else if sums[i] != 0f64 {
            println!(
                "WARNING: Division by zero attempt for data polygon {}; the sum is left unnormalized.",
                i
            );
        }
    }
    Ok(sums)
}

/// For each data polygon, the index of the overlapping weight element with
/// the largest clipped measure, or -1 when nothing overlaps.
pub fn discrete_overlap(poly: &PolySet) -> Result<Vec<i32>, Error> {
    let data = poly.data_set().ok_or_else(no_derivation)?;
    let mut winners = vec![-1i32; data.num_shapes()];
    let mut best = vec![0f64; data.num_shapes()];
    for e in 0..poly.num_shapes() {
        let w = match poly.weight_index(e) {
            Some(w) => w,
            None => continue,
        };
        let d = match poly.data_index(e) {
            Some(d) => d,
            None => continue,
        };
        let measure = match poly.kind {
            ShapeKind::Point => 1f64,
            ShapeKind::Arc => poly.shapes[e].length(),
            ShapeKind::Polygon => poly.shapes[e].area(),
        };
        if measure > best[d] {
            best[d] = measure;
            winners[d] = w as i32;
        }
    }
    Ok(winners)
}

/// For each element of `data`, the index of the `weight` polygon containing
/// that element's vertex-average centroid, or -1 when the centroid falls
/// outside every polygon. Multiple centroids in one polygon each keep their
/// own assignment; the converse (one centroid in overlapping polygons)
/// resolves to the last polygon visited.
pub fn discrete_centroid(data: &Arc<PolySet>, weight: &Arc<PolySet>) -> Result<Vec<i32>, Error> {
    if weight.kind != ShapeKind::Polygon {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "The discrete centroid method requires polygon input shapes.",
        ));
    }
    let centroids = Arc::new(data.centroid_set());
    let located = poly_isect(&centroids, weight)?;
    let mut assigned = vec![-1i32; data.num_shapes()];
    if let Some(deriv) = located.derivation.as_ref() {
        for &(d, w) in &deriv.pairs {
            assigned[d] = w as i32;
        }
    }
    Ok(assigned)
}

/// Per-type area shares: for each label in `types`, the fraction of every
/// data polygon's area covered by weight polygons carrying that label in
/// attribute `attr`. Labels missing from `types` are reported once each and
/// skipped.
pub fn type_area_percent(
    poly: &PolySet,
    attr: usize,
    types: &[String],
) -> Result<Vec<Vec<f64>>, Error> {
    let (weight, data) = derived_sets(poly)?;
    if weight.kind != ShapeKind::Polygon {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "The area percent method requires polygon input shapes.",
        ));
    }
    let table = weight.attributes.as_ref().ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidInput,
            "The area percent method requires an input attribute.",
        )
    })?;
    let mut result = vec![vec![0f64; data.num_shapes()]; types.len()];
    let mut warned: Vec<String> = vec![];
    for e in 0..poly.num_shapes() {
        let w = match poly.weight_index(e) {
            Some(w) => w,
            None => continue,
        };
        let d = match poly.data_index(e) {
            Some(d) => d,
            None => continue,
        };
        let label = table.rows[w][attr].as_string();
        let t = match types.iter().position(|s| *s == label) {
            Some(t) => t,
            None => {
                if !warned.contains(&label) {
                    println!(
                        "WARNING: Attribute value {} is not in the type list; skipping.",
                        label
                    );
                    warned.push(label);
                }
                continue;
            }
        };
        let denom = data.shapes[d].area();
        if denom != 0f64 {
            result[t][d] += poly.shapes[e].area() / denom;
        }
    }
    Ok(result)
}

#[cfg(test)]
mod test {
    use super::{avg1, discrete_centroid, discrete_overlap, sum1, sum2, type_area_percent};
    use crate::attributes::{AttributeDesc, AttributeKind, AttributeTable, AttributeValue};
    use crate::intersect::poly_isect;
    use crate::overlap_table::OverlapTable;
    use crate::poly_set::{Contour, PolySet, PolyShape, ShapeKind};
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

    fn attach_values(set: &mut PolySet, name: &str, values: &[f64]) {
        set.attributes = Some(AttributeTable {
            descs: vec![AttributeDesc {
                name: name.to_string(),
                kind: AttributeKind::Double,
                category: 1,
            }],
            rows: values
                .iter()
                .map(|&v| vec![AttributeValue::Double(v)])
                .collect(),
        });
    }

    #[test]
    fn test_attribute_weighted_fractions_sum_to_total() {
        // two population squares fully inside one data polygon; a two-cell
        // grid splits the second square in half
        let mut weight = PolySet::new(ShapeKind::Polygon);
        weight.add_shape(rect(1.0, 1.0, 2.0, 2.0));
        weight.add_shape(rect(4.0, 1.0, 2.0, 2.0));
        attach_values(&mut weight, "POP", &[100.0, 50.0]);
        let weight = Arc::new(weight);
        let data = polygon_set(&[(0.0, 0.0, 10.0, 10.0)]);
        let grid = polygon_set(&[(0.0, 0.0, 5.0, 10.0), (5.0, 0.0, 5.0, 10.0)]);

        let wd = Arc::new(poly_isect(&weight, &data).unwrap());
        let wdg = poly_isect(&wd, &grid).unwrap();

        let mut table = OverlapTable::new(&data, &grid, 0.0);
        sum2(&wdg, Some(0), &mut table).unwrap();
        let den = sum1(&wd, Some(0)).unwrap();

        assert!((den[0] - 150.0).abs() < 1e-9);
        assert!((table.get(0, 0) - 125.0).abs() < 1e-9);
        assert!((table.get(0, 1) - 25.0).abs() < 1e-9);
        let ratio = (table.get(0, 0) + table.get(0, 1)) / den[0];
        assert!((ratio - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_area_weighting_without_attribute() {
        // 40/60 split of a data polygon between two grid cells
        let weight = polygon_set(&[(1.0, 1.0, 8.0, 5.0), (10.0, 0.0, 10.0, 6.0)]);
        let data = polygon_set(&[(0.0, 0.0, 20.0, 10.0)]);
        let grid = polygon_set(&[(0.0, 0.0, 10.0, 10.0), (10.0, 0.0, 10.0, 10.0)]);

        let wd = Arc::new(poly_isect(&weight, &data).unwrap());
        let wdg = poly_isect(&wd, &grid).unwrap();

        let mut table = OverlapTable::new(&data, &grid, 0.0);
        sum2(&wdg, None, &mut table).unwrap();
        let den = sum1(&wd, None).unwrap();

        assert!((den[0] - 100.0).abs() < 1e-9);
        assert!((table.get(0, 0) / den[0] - 0.4).abs() < 1e-9);
        assert!((table.get(0, 1) / den[0] - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_average_divides_by_data_measure() {
        let mut weight = PolySet::new(ShapeKind::Polygon);
        weight.add_shape(rect(0.0, 0.0, 1.0, 1.0));
        attach_values(&mut weight, "RATE", &[8.0]);
        let weight = Arc::new(weight);
        let data = polygon_set(&[(0.0, 0.0, 2.0, 2.0)]);

        let wd = poly_isect(&weight, &data).unwrap();
        let avg = avg1(&wd, Some(0)).unwrap();
        // 8.0 over a quarter of the 4-unit polygon
        assert!((avg[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_discrete_overlap_picks_largest_share() {
        let weight = polygon_set(&[(0.0, 0.0, 1.0, 1.0), (0.5, 0.0, 4.0, 4.0)]);
        let data = polygon_set(&[(0.0, 0.0, 3.0, 3.0), (50.0, 50.0, 1.0, 1.0)]);
        let wd = poly_isect(&weight, &data).unwrap();
        let winners = discrete_overlap(&wd).unwrap();
        assert_eq!(winners[0], 1);
        assert_eq!(winners[1], -1);
    }

    #[test]
    fn test_discrete_centroid_locates_centres() {
        let data = polygon_set(&[(0.0, 0.0, 2.0, 2.0), (10.0, 0.0, 2.0, 2.0), (50.0, 50.0, 2.0, 2.0)]);
        let weight = polygon_set(&[(0.0, 0.0, 4.0, 4.0), (9.0, 0.0, 4.0, 4.0)]);
        let assigned = discrete_centroid(&data, &weight).unwrap();
        assert_eq!(assigned, vec![0, 1, -1]);
    }

    #[test]
    fn test_discrete_centroid_requires_polygons() {
        let data = polygon_set(&[(0.0, 0.0, 2.0, 2.0)]);
        let lines = Arc::new(PolySet::new(ShapeKind::Arc));
        assert!(discrete_centroid(&data, &lines).is_err());
    }

    #[test]
    fn test_type_area_percent() {
        let mut weight = PolySet::new(ShapeKind::Polygon);
        weight.add_shape(rect(0.0, 0.0, 3.0, 1.0)); // clips to 10% of the data polygon
        weight.add_shape(rect(0.0, 5.0, 2.0, 1.0)); // clips to another 10%
        weight.add_shape(rect(0.0, 8.0, 1.0, 1.0)); // unlisted label
        weight.attributes = Some(AttributeTable {
            descs: vec![AttributeDesc {
                name: "LU".to_string(),
                kind: AttributeKind::Str,
                category: 1,
            }],
            rows: vec![
                vec![AttributeValue::Str("FOREST".to_string())],
                vec![AttributeValue::Str("WATER".to_string())],
                vec![AttributeValue::Str("URBAN".to_string())],
            ],
        });
        let weight = Arc::new(weight);
        let data = polygon_set(&[(0.0, 0.0, 1.0, 10.0)]);

        let wd = poly_isect(&weight, &data).unwrap();
        let types = vec!["FOREST".to_string(), "WATER".to_string()];
        let shares = type_area_percent(&wd, 0, &types).unwrap();
        assert!((shares[0][0] - 0.1).abs() < 1e-9);
        assert!((shares[1][0] - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_underived_set_is_an_error() {
        let plain = PolySet::new(ShapeKind::Polygon);
        assert!(sum1(&plain, None).is_err());
        assert!(avg1(&plain, None).is_err());
        assert!(discrete_overlap(&plain).is_err());
    }
}
