/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 06/03/2023
Last Modified: 19/06/2023
License: MIT
*/
use crate::structures::Point2D;

/// Calculates the signed area of a ring. The ring is treated as closed
/// whether or not the last vertex repeats the first. A clockwise ring has
/// positive area, a counter-clockwise ring negative area; hole rings stored
/// counter-clockwise therefore subtract when ring areas are summed.
pub fn ring_area_signed(points: &[Point2D]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut a = 0.0;
    for i in 0..n {
        let j = if i == n - 1 { 0 } else { i + 1 };
        a += (points[i].y - points[j].y) * (points[j].x + points[i].x);
    }
    0.5 * a
}

#[cfg(test)]
mod test {
    use super::ring_area_signed;
    use crate::structures::Point2D;

    #[test]
    fn test_clockwise_ring_is_positive() {
        let ring = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(0.0, 2.0),
            Point2D::new(2.0, 2.0),
            Point2D::new(2.0, 0.0),
        ];
        assert!((ring_area_signed(&ring) - 4.0).abs() < 1e-12);

        let mut rev = ring.clone();
        rev.reverse();
        assert!((ring_area_signed(&rev) + 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_closed_ring_matches_open_ring() {
        let open = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(0.0, 1.0),
            Point2D::new(3.0, 1.0),
            Point2D::new(3.0, 0.0),
        ];
        let mut closed = open.clone();
        closed.push(open[0]);
        assert!((ring_area_signed(&open) - ring_area_signed(&closed)).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_ring() {
        let pts = vec![Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0)];
        assert_eq!(ring_area_signed(&pts), 0.0);
    }
}
