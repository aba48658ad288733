/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 06/03/2023
Last Modified: 19/06/2023
License: MIT
*/
use crate::structures::Point2D;

/// Position of a query point relative to a single polygon ring. The four
/// categories are mutually exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointPosition {
    Inside,
    Outside,
    OnVertex,
    OnEdge,
}

/// Classifies a point against one ring using the crossings-count method of
/// O'Rourke, Computational Geometry in C, ch. 7. Right and left horizontal
/// rays are counted separately; unequal crossing parity means the point
/// lies on the relative interior of an edge. Coordinates are compared
/// exactly, so an on-vertex or on-edge result requires an exact hit.
pub fn point_in_ring(q: &Point2D, ring: &[Point2D]) -> PointPosition {
    let n = ring.len();
    let mut r_cross = 0; // number of right edge/ray crossings
    let mut l_cross = 0; // number of left edge/ray crossings

    for i in 0..n {
        if ring[i].x == q.x && ring[i].y == q.y {
            return PointPosition::OnVertex;
        }
        let i1 = (i + n - 1) % n;

        let viy = ring[i].y - q.y;
        let vi1y = ring[i1].y - q.y;

        // does the edge (i1,i) straddle the rightward ray?
        if (viy > 0.0) != (vi1y > 0.0) {
            let x = (ring[i].x * vi1y - ring[i1].x * viy) / (ring[i1].y - ring[i].y);
            if x > q.x {
                r_cross += 1;
            }
        }

        // and the leftward ray?
        if (viy < 0.0) != (vi1y < 0.0) {
            let x = (ring[i].x * vi1y - ring[i1].x * viy) / (ring[i1].y - ring[i].y);
            if x < q.x {
                l_cross += 1;
            }
        }
    }

    if (r_cross % 2) != (l_cross % 2) {
        return PointPosition::OnEdge;
    }
    if r_cross % 2 == 1 {
        PointPosition::Inside
    } else {
        PointPosition::Outside
    }
}

#[cfg(test)]
mod test {
    use super::{point_in_ring, PointPosition};
    use crate::structures::Point2D;

    fn unit_square() -> Vec<Point2D> {
        vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(0.0, 1.0),
            Point2D::new(1.0, 1.0),
            Point2D::new(1.0, 0.0),
        ]
    }

    #[test]
    fn test_point_inside() {
        let ring = unit_square();
        assert_eq!(
            point_in_ring(&Point2D::new(0.5, 0.5), &ring),
            PointPosition::Inside
        );
    }

    #[test]
    fn test_point_outside() {
        let ring = unit_square();
        assert_eq!(
            point_in_ring(&Point2D::new(1.5, 0.5), &ring),
            PointPosition::Outside
        );
        assert_eq!(
            point_in_ring(&Point2D::new(0.5, -0.25), &ring),
            PointPosition::Outside
        );
    }

    #[test]
    fn test_point_on_vertex() {
        let ring = unit_square();
        assert_eq!(
            point_in_ring(&Point2D::new(1.0, 1.0), &ring),
            PointPosition::OnVertex
        );
    }

    #[test]
    fn test_point_on_edge() {
        let ring = unit_square();
        assert_eq!(
            point_in_ring(&Point2D::new(0.5, 0.0), &ring),
            PointPosition::OnEdge
        );
        assert_eq!(
            point_in_ring(&Point2D::new(1.0, 0.5), &ring),
            PointPosition::OnEdge
        );
    }

    #[test]
    fn test_concave_ring() {
        // a U-shaped ring; the notch interior is outside
        let ring = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(0.0, 3.0),
            Point2D::new(1.0, 3.0),
            Point2D::new(1.0, 1.0),
            Point2D::new(2.0, 1.0),
            Point2D::new(2.0, 3.0),
            Point2D::new(3.0, 3.0),
            Point2D::new(3.0, 0.0),
        ];
        assert_eq!(
            point_in_ring(&Point2D::new(1.5, 2.0), &ring),
            PointPosition::Outside
        );
        assert_eq!(
            point_in_ring(&Point2D::new(1.5, 0.5), &ring),
            PointPosition::Inside
        );
    }
}
