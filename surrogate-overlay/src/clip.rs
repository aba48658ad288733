/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 12/03/2024
Last Modified: 26/02/2025
License: MIT
*/

//! Exact clipping primitives: polygon intersection and union through the
//! boolean-ops backend, plus scan-line clips for line and point shapes.

use crate::poly_set::{Contour, PolyShape};
use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};
use std::cmp::Ordering;
use std::io::{Error, ErrorKind};
use surrogate_common::algorithms::{
    is_clockwise_order, point_in_ring, seg_seg_int, PointPosition, SegmentIntersection,
};
use surrogate_common::structures::Point2D;

/// Intersection of two polygon shapes; the result may have no contours.
pub fn polygon_clip(a: &PolyShape, b: &PolyShape) -> PolyShape {
    let result = to_multi_polygon(a).intersection(&to_multi_polygon(b));
    from_multi_polygon(result)
}

/// Union of two polygon shapes.
pub fn polygon_union(a: &PolyShape, b: &PolyShape) -> PolyShape {
    let result = to_multi_polygon(a).union(&to_multi_polygon(b));
    from_multi_polygon(result)
}

/// Converts one shape to a boolean-ops multi-polygon. Holes are attached to
/// the first outer ring containing their leading vertex; an orphan hole is
/// dropped.
fn to_multi_polygon(shape: &PolyShape) -> MultiPolygon<f64> {
    let mut outers: Vec<(Vec<Point2D>, Vec<LineString<f64>>)> = vec![];
    for contour in &shape.contours {
        if !contour.is_hole {
            outers.push((contour.points.clone(), vec![]));
        }
    }
    for contour in &shape.contours {
        if contour.is_hole && !contour.points.is_empty() {
            let q = contour.points[0];
            if let Some(owner) = outers
                .iter_mut()
                .find(|(ring, _)| point_in_ring(&q, ring) != PointPosition::Outside)
            {
                owner.1.push(ring_to_line_string(&contour.points));
            }
        }
    }
    MultiPolygon::new(
        outers
            .into_iter()
            .map(|(ring, holes)| Polygon::new(ring_to_line_string(&ring), holes))
            .collect(),
    )
}

fn ring_to_line_string(points: &[Point2D]) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = points.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
    if let (Some(first), Some(last)) = (coords.first().copied(), coords.last().copied()) {
        if first != last {
            coords.push(first);
        }
    }
    LineString::new(coords)
}

/// Converts a boolean-ops result back to the contour representation: open
/// rings, clockwise outers, counter-clockwise holes.
fn from_multi_polygon(mp: MultiPolygon<f64>) -> PolyShape {
    let mut shape = PolyShape::new();
    for polygon in mp {
        let (exterior, interiors) = polygon.into_inner();
        if let Some(contour) = ring_to_contour(exterior, false) {
            shape.contours.push(contour);
        }
        for interior in interiors {
            if let Some(contour) = ring_to_contour(interior, true) {
                shape.contours.push(contour);
            }
        }
    }
    shape
}

fn ring_to_contour(ring: LineString<f64>, is_hole: bool) -> Option<Contour> {
    let mut points: Vec<Point2D> = ring
        .into_inner()
        .into_iter()
        .map(|c| Point2D::new(c.x, c.y))
        .collect();
    if points.len() > 1 && points[0] == points[points.len() - 1] {
        points.pop();
    }
    if points.len() < 3 {
        return None;
    }
    if is_clockwise_order(&points) == is_hole {
        points.reverse();
    }
    Some(Contour { points, is_hole })
}

#[derive(Clone, Copy, PartialEq)]
enum VisitKind {
    Inside,
    Crossing,
    Vertex,
    Edge,
}

#[derive(Clone, Copy)]
struct Visit {
    point: Point2D,
    kind: VisitKind,
}

/// Clips a line shape's segments to one polygon shape. Each kept piece
/// becomes its own two-vertex contour carrying the source contour's hole
/// flag. Segments are walked against every polygon contour independently.
pub fn line_clip(line: &PolyShape, poly: &PolyShape) -> PolyShape {
    let mut result = PolyShape::new();
    for line_contour in &line.contours {
        let lv = &line_contour.points;
        if lv.len() < 2 {
            continue;
        }
        for poly_contour in &poly.contours {
            let pv = &poly_contour.points;
            if pv.len() < 3 {
                continue;
            }
            for k in 0..lv.len() - 1 {
                clip_segment(&lv[k], &lv[k + 1], pv, line_contour.is_hole, &mut result);
            }
        }
    }
    result
}

/// Builds the ordered visit table for one segment against one ring, then
/// walks consecutive visit pairs deciding which spans fall inside.
fn clip_segment(
    a: &Point2D,
    b: &Point2D,
    ring: &[Point2D],
    is_hole: bool,
    result: &mut PolyShape,
) {
    let mut table: Vec<Visit> = vec![];
    if point_in_ring(a, ring) == PointPosition::Inside {
        table.push(Visit {
            point: *a,
            kind: VisitKind::Inside,
        });
    }
    let nv = ring.len();
    for n in 0..nv {
        let nn = (n + 1) % nv;
        match seg_seg_int(a, b, &ring[n], &ring[nn]) {
            SegmentIntersection::Proper(p) => {
                table.push(Visit {
                    point: p,
                    kind: VisitKind::Crossing,
                });
            }
            SegmentIntersection::Endpoint(p) => {
                table.push(Visit {
                    point: p,
                    kind: VisitKind::Vertex,
                });
            }
            SegmentIntersection::Collinear(p, q) => {
                table.push(Visit {
                    point: p,
                    kind: VisitKind::Edge,
                });
                table.push(Visit {
                    point: q,
                    kind: VisitKind::Edge,
                });
            }
            SegmentIntersection::None => {}
        }
    }
    if point_in_ring(b, ring) == PointPosition::Inside {
        table.push(Visit {
            point: *b,
            kind: VisitKind::Inside,
        });
    }
    if table.is_empty() {
        return;
    }

    // order the visits along the segment's dominant direction
    if a.x < b.x {
        table.sort_by(|p, q| p.point.x.partial_cmp(&q.point.x).unwrap_or(Ordering::Equal));
    } else if a.x > b.x {
        table.sort_by(|p, q| q.point.x.partial_cmp(&p.point.x).unwrap_or(Ordering::Equal));
    } else if a.y < b.y {
        table.sort_by(|p, q| p.point.y.partial_cmp(&q.point.y).unwrap_or(Ordering::Equal));
    } else {
        table.sort_by(|p, q| q.point.y.partial_cmp(&p.point.y).unwrap_or(Ordering::Equal));
    }

    let mut v0 = table[0].point;
    let mut l1 = table[0].kind;
    let mut ps = 0i32; // pairing state: 1 = last span was in, -1 = out
    for n in 1..table.len() {
        let vn = table[n].point;
        let l2 = table[n].kind;
        if l1 == VisitKind::Inside || l2 == VisitKind::Inside {
            ps = 1;
            add_line_segment(vn, v0, is_hole, result);
        } else if l1 == VisitKind::Edge && l2 == VisitKind::Edge {
            ps = 0;
            add_line_segment(vn, v0, is_hole, result);
        } else if l1 == VisitKind::Crossing && ps == -1 {
            ps = 1;
            add_line_segment(vn, v0, is_hole, result);
        } else if l1 == VisitKind::Crossing && ps == 1 {
            ps = -11;
        } else {
            if v0 == vn {
                continue; // zero-length span; keep the walk state
            }
            let mid = Point2D::midpoint(&v0, &vn);
            if point_in_ring(&mid, ring) != PointPosition::Outside {
                ps = 1;
                add_line_segment(vn, v0, is_hole, result);
            } else {
                ps = -1;
            }
        }
        v0 = vn;
        l1 = l2;
    }
}

fn add_line_segment(v1: Point2D, v2: Point2D, is_hole: bool, result: &mut PolyShape) {
    result.contours.push(Contour {
        points: vec![v1, v2],
        is_hole,
    });
}

/// Clips a point shape to one polygon shape. A point inside or on the edge
/// of a polygon contour contributes one single-vertex contour per containing
/// contour, so a point falling within a hole ring appears twice and can be
/// recognized downstream. A point landing exactly on a polygon vertex is an
/// error for the caller to handle.
pub fn point_clip(points: &PolyShape, poly: &PolyShape) -> Result<PolyShape, Error> {
    let mut result = PolyShape::new();
    for poly_contour in &poly.contours {
        let ring = &poly_contour.points;
        if ring.len() < 3 {
            continue;
        }
        for point_contour in &points.contours {
            for p in &point_contour.points {
                match point_in_ring(p, ring) {
                    PointPosition::OnVertex => {
                        println!(
                            "WARNING: A point coincides with a polygon vertex; special attention needed."
                        );
                        return Err(Error::new(
                            ErrorKind::InvalidData,
                            "A point coincides with a polygon vertex.",
                        ));
                    }
                    PointPosition::Outside => {}
                    _ => {
                        result.contours.push(Contour {
                            points: vec![*p],
                            is_hole: false,
                        });
                    }
                }
            }
        }
    }
    Ok(result)
}
