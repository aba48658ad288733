/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 05/03/2024
Last Modified: 11/04/2025
License: MIT
*/

//! Overlay engines for spatial-surrogate and attribute-allocation jobs.
//!
//! The pipeline intersects a weight set against a data set against a target
//! grid, walks the resulting derivation chain to recover the original
//! element indices, and aggregates weighted contributions into surrogate
//! ratios or allocated totals.

pub mod aggregate;
pub mod allocate;
pub mod attributes;
pub mod clip;
pub mod grid;
pub mod intersect;
pub mod modes;
pub mod overlap_table;
pub mod poly_set;
pub mod projection;
pub mod report;
pub mod union;

pub use crate::attributes::{AttributeDesc, AttributeKind, AttributeTable, AttributeValue};
pub use crate::poly_set::{Contour, Derivation, PolySet, PolyShape, ShapeKind};
