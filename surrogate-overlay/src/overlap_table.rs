/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 20/03/2024
Last Modified: 17/09/2024
License: MIT
*/

//! A sparse data-polygon by grid-cell accumulator. Each row holds only the
//! cells whose boxes overlap that data polygon's box, so the table stays
//! proportional to the candidate pairs rather than the full cross product.

use crate::poly_set::PolySet;
use std::io::{Error, ErrorKind};

/// Sentinel returned for a row that does not exist in the table.
pub const MISSING: f64 = -999999.0;

struct OverlapRow {
    columns: Vec<usize>,
    values: Vec<f64>,
}

pub struct OverlapTable {
    rows: Vec<OverlapRow>,
}

impl OverlapTable {
    /// Builds the table with one row per `data` element, one slot per grid
    /// cell whose box overlaps that element's box, every slot set to `seed`.
    /// Columns are stored in ascending cell order.
    pub fn new(data: &PolySet, grid: &PolySet, seed: f64) -> OverlapTable {
        let mut rows = Vec::with_capacity(data.num_shapes());
        for i in 0..data.num_shapes() {
            let mut columns: Vec<usize> = vec![];
            for j in 0..grid.num_shapes() {
                if data.boxes[i].overlaps(grid.boxes[j]) {
                    columns.push(j);
                }
            }
            let values = vec![seed; columns.len()];
            rows.push(OverlapRow { columns, values });
        }
        OverlapTable { rows }
    }

    /// The stored value for (data polygon, cell); zero for a cell that is
    /// not a candidate of that row, MISSING for a row out of range. Rows are
    /// scanned linearly; candidate counts per row are small.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        match self.rows.get(i) {
            Some(row) => match row.columns.iter().position(|&c| c == j) {
                Some(k) => row.values[k],
                None => 0f64,
            },
            None => MISSING,
        }
    }

    /// Overwrites the slot for (data polygon, cell). Setting a cell that is
    /// not a candidate of the row is reported and ignored; a row out of
    /// range is an error.
    pub fn set(&mut self, i: usize, j: usize, value: f64) -> Result<(), Error> {
        let row = match self.rows.get_mut(i) {
            Some(r) => r,
            None => {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    format!("Data polygon index {} is out of range for the overlap table.", i),
                ));
            }
        };
        match row.columns.iter().position(|&c| c == j) {
            Some(k) => {
                row.values[k] = value;
                Ok(())
            }
            None => {
                println!(
                    "WARNING: Cell {} is not an overlap candidate of data polygon {}.",
                    j, i
                );
                Ok(())
            }
        }
    }

    /// The candidate cell indices of one row, in ascending order.
    pub fn row_columns(&self, i: usize) -> &[usize] {
        self.rows.get(i).map(|r| r.columns.as_slice()).unwrap_or(&[])
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod test {
    use super::{OverlapTable, MISSING};
    use crate::poly_set::{Contour, PolySet, PolyShape, ShapeKind};
    use surrogate_common::structures::Point2D;

    fn square(x0: f64, y0: f64, size: f64) -> PolyShape {
        PolyShape {
            contours: vec![Contour {
                points: vec![
                    Point2D::new(x0, y0),
                    Point2D::new(x0, y0 + size),
                    Point2D::new(x0 + size, y0 + size),
                    Point2D::new(x0 + size, y0),
                ],
                is_hole: false,
            }],
        }
    }

    fn sets() -> (PolySet, PolySet) {
        let mut data = PolySet::new(ShapeKind::Polygon);
        data.add_shape(square(0.0, 0.0, 3.0));
        data.add_shape(square(10.0, 0.0, 3.0));
        let mut grid = PolySet::new(ShapeKind::Polygon);
        grid.add_shape(square(0.0, 0.0, 2.0));
        grid.add_shape(square(2.0, 0.0, 2.0));
        grid.add_shape(square(11.0, 0.0, 2.0));
        (data, grid)
    }

    #[test]
    fn test_candidates_follow_box_overlap() {
        let (data, grid) = sets();
        let table = OverlapTable::new(&data, &grid, 0.0);
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.row_columns(0), &[0, 1]);
        assert_eq!(table.row_columns(1), &[2]);
    }

    #[test]
    fn test_accumulation_round_trip() {
        let (data, grid) = sets();
        let mut table = OverlapTable::new(&data, &grid, 0.0);
        table.set(0, 1, table.get(0, 1) + 2.5).unwrap();
        table.set(0, 1, table.get(0, 1) + 1.5).unwrap();
        assert_eq!(table.get(0, 1), 4.0);
        assert_eq!(table.get(0, 0), 0.0);
    }

    #[test]
    fn test_non_candidate_reads_zero_and_ignores_writes() {
        let (data, grid) = sets();
        let mut table = OverlapTable::new(&data, &grid, 0.0);
        assert_eq!(table.get(1, 0), 0.0);
        table.set(1, 0, 9.0).unwrap();
        assert_eq!(table.get(1, 0), 0.0);
    }

    #[test]
    fn test_out_of_range_row() {
        let (data, grid) = sets();
        let mut table = OverlapTable::new(&data, &grid, 0.0);
        assert_eq!(table.get(7, 0), MISSING);
        assert!(table.set(7, 0, 1.0).is_err());
        assert!(table.row_columns(7).is_empty());
    }

    #[test]
    fn test_seed_value_fills_candidates() {
        let (data, grid) = sets();
        let table = OverlapTable::new(&data, &grid, -1.0);
        assert_eq!(table.get(0, 0), -1.0);
        assert_eq!(table.get(1, 2), -1.0);
    }
}
