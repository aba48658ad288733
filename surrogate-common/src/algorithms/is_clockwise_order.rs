/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 06/03/2023
Last Modified: 19/06/2023
License: MIT
*/
use crate::algorithms::ring_area_signed;
use crate::structures::Point2D;

/// Checks whether a sequence of Point2D are in clockwise order. Accepts
/// both open rings and rings whose last point repeats the first.
pub fn is_clockwise_order(points: &[Point2D]) -> bool {
    if points.len() < 3 {
        return false;
    } // something's wrong!

    let ring = if points[0] == points[points.len() - 1] {
        // the last point is the same as the first...it's not a legitimate point
        &points[..points.len() - 1]
    } else {
        points
    };

    ring_area_signed(ring) > 0f64
}
