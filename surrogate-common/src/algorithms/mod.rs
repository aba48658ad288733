/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 06/03/2023
Last Modified: 14/05/2024
License: MIT
*/
// private sub-module defined in other files
mod is_clockwise_order;
mod point_in_ring;
mod poly_area;
mod poly_length;
mod seg_seg_int;

// exports identifiers from private sub-modules in the current module namespace
pub use self::is_clockwise_order::is_clockwise_order;
pub use self::point_in_ring::{point_in_ring, PointPosition};
pub use self::poly_area::ring_area_signed;
pub use self::poly_length::polyline_length;
pub use self::seg_seg_int::{seg_seg_int, SegmentIntersection};
