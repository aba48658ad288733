/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 12/05/2023
Last Modified: 12/05/2023
License: MIT
*/

// private sub-module defined in other files
pub mod shapefile;

// exports identifiers from private sub-modules in the current module namespace
pub use crate::shapefile::attributes::*;
pub use crate::shapefile::geometry::*;
pub use crate::shapefile::Shapefile;
