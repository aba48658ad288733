/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 05/04/2024
Last Modified: 05/04/2024
License: MIT
*/

//! Report writers: gridded surrogate fractions and attribute overlays.

pub mod overlay;
pub mod surrogate;
