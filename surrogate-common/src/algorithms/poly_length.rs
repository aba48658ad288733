/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 06/03/2023
Last Modified: 19/06/2023
License: MIT
*/
use crate::structures::Point2D;

/// Calculates the planar length of a polyline. The closing segment of a
/// ring is not included unless the ring repeats its first vertex at the
/// end.
pub fn polyline_length(points: &[Point2D]) -> f64 {
    let mut a = 0.0;
    for i in 1..points.len() {
        a += points[i - 1].distance(&points[i]);
    }
    a
}
