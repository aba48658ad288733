/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 08/03/2023
Last Modified: 19/06/2023
License: MIT
*/
use crate::structures::Point2D;

/// The result of intersecting two closed segments ab and cd.
///
/// `Endpoint` covers the case of a vertex of one segment lying on the other
/// segment; `Collinear` carries the two end points of the shared
/// sub-segment. Two collinear segments that share a single point report
/// that point as a degenerate `Endpoint`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SegmentIntersection {
    None,
    Proper(Point2D),
    Endpoint(Point2D),
    Collinear(Point2D, Point2D),
}

/// Intersects closed segments ab and cd, after O'Rourke, Computational
/// Geometry in C, ch. 7. Parallel segments are handled separately through
/// exact collinearity and betweenness tests.
pub fn seg_seg_int(
    a: &Point2D,
    b: &Point2D,
    c: &Point2D,
    d: &Point2D,
) -> SegmentIntersection {
    let denom = a.x * (d.y - c.y) + b.x * (c.y - d.y) + d.x * (b.y - a.y) + c.x * (a.y - b.y);

    if denom == 0.0 {
        return parallel_int(a, b, c, d);
    }

    let mut at_vertex = false;

    let num_s = a.x * (d.y - c.y) + c.x * (a.y - d.y) + d.x * (c.y - a.y);
    if num_s == 0.0 || num_s == denom {
        at_vertex = true;
    }
    let s = num_s / denom;

    let num_t = -(a.x * (c.y - b.y) + b.x * (a.y - c.y) + c.x * (b.y - a.y));
    if num_t == 0.0 || num_t == denom {
        at_vertex = true;
    }
    let t = num_t / denom;

    let p = Point2D::new(a.x + s * (b.x - a.x), a.y + s * (b.y - a.y));

    if s > 0.0 && s < 1.0 && t > 0.0 && t < 1.0 {
        SegmentIntersection::Proper(p)
    } else if s < 0.0 || s > 1.0 || t < 0.0 || t > 1.0 {
        SegmentIntersection::None
    } else if at_vertex {
        SegmentIntersection::Endpoint(p)
    } else {
        SegmentIntersection::None
    }
}

fn parallel_int(a: &Point2D, b: &Point2D, c: &Point2D, d: &Point2D) -> SegmentIntersection {
    if area_sign(a, b, c) != 0 {
        return SegmentIntersection::None;
    }

    let abc = between(a, b, c);
    let abd = between(a, b, d);
    let cda = between(c, d, a);
    let cdb = between(c, d, b);

    if abc && abd {
        return SegmentIntersection::Collinear(*c, *d);
    }
    if cda && cdb {
        return SegmentIntersection::Collinear(*a, *b);
    }

    if (abc != abd) && (cda != cdb) {
        // the overlap degenerates to a shared end point
        if a == d || a == c {
            return SegmentIntersection::Endpoint(*a);
        }
        if b == c || b == d {
            return SegmentIntersection::Endpoint(*b);
        }

        if abd && cda {
            return SegmentIntersection::Collinear(*a, *d);
        }
        if abc && cdb {
            return SegmentIntersection::Collinear(*b, *c);
        }
        if abc && cda {
            return SegmentIntersection::Collinear(*a, *c);
        }
        if abd && cdb {
            return SegmentIntersection::Collinear(*b, *d);
        }
    }

    SegmentIntersection::None
}

/// True iff c lies on the closed segment ab; a, b and c must already be
/// known collinear.
fn between(a: &Point2D, b: &Point2D, c: &Point2D) -> bool {
    // if ab is not vertical, check betweenness on x; else on y
    if a.x != b.x {
        (a.x <= c.x && c.x <= b.x) || (a.x >= c.x && c.x >= b.x)
    } else {
        (a.y <= c.y && c.y <= b.y) || (a.y >= c.y && c.y >= b.y)
    }
}

fn area_sign(a: &Point2D, b: &Point2D, c: &Point2D) -> i32 {
    let area2 = (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y);
    if area2 > 0.0 {
        1
    } else if area2 < 0.0 {
        -1
    } else {
        0
    }
}
