/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 22/04/2024
Last Modified: 02/04/2025
License: MIT
*/

//! The overlay report: one delimited row of input attribute values for each
//! element of an input-region overlay, optionally tagged with the grid cell
//! the element fell in.

use crate::attributes::AttributeValue;
use crate::grid::{GridInfo, OverlayKind};
use crate::poly_set::PolySet;
use std::io::{Error, ErrorKind, Write};

/// Controls for the overlay report writer.
pub struct OverlayOptions {
    pub delimiter: char,
    pub write_header: bool,
    /// Append the grid column and row of each element. Only meaningful when
    /// the overlay region is a grid.
    pub cell_id: bool,
}

impl Default for OverlayOptions {
    fn default() -> OverlayOptions {
        OverlayOptions {
            delimiter: ',',
            write_header: true,
            cell_id: false,
        }
    }
}

fn format_value(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Int(v) => format!("{}", v),
        AttributeValue::Double(v) => format!("{:.6}", v),
        AttributeValue::Str(v) => v.clone(),
    }
}

/// Writes one row per overlay element, carrying the attribute values of the
/// input shape the element came from. `grid` supplies the e-grid dimensions
/// when cell positions must be recovered from cell identifiers.
pub fn write_overlay_report<W: Write>(
    sink: &mut W,
    derived: &PolySet,
    kind: OverlayKind,
    grid: Option<&GridInfo>,
    options: &OverlayOptions,
) -> Result<(), Error> {
    let input = derived.weight_set().ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidInput,
            "The polygon set was not derived from an overlay.",
        )
    })?;
    let table = input.attributes.as_ref().ok_or_else(|| {
        Error::new(ErrorKind::InvalidInput, "The input shapes carry no attributes.")
    })?;
    let gridded = matches!(kind, OverlayKind::RegularGrid | OverlayKind::EGrid);
    if options.cell_id && !gridded {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "Writing the overlay column and row requires a grid overlay.",
        ));
    }
    let ncols = match (options.cell_id, kind) {
        (true, OverlayKind::EGrid) => match grid {
            Some(g) if g.ncols > 0 => g.ncols,
            _ => {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    "The grid dimensions are needed to recover cell positions.",
                ))
            }
        },
        _ => 0,
    };

    if options.write_header {
        let mut names: Vec<String> = table.descs.iter().map(|d| d.name.clone()).collect();
        if options.cell_id {
            names.push("COL".to_string());
            names.push("ROW".to_string());
        }
        writeln!(sink, "{}", names.join(&options.delimiter.to_string()))?;
    }

    let overlay = derived.grid_set();
    let num = derived.num_shapes();
    for e in 0..num {
        let i = match derived.weight_index(e) {
            Some(i) => i,
            None => continue,
        };
        let mut fields: Vec<String> = table.rows[i].iter().map(format_value).collect();
        if options.cell_id {
            let j = match derived.grid_index(e) {
                Some(j) => j,
                None => continue,
            };
            let cells = overlay.and_then(|o| o.attributes.as_ref()).ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidInput,
                    "The overlay grid carries no cell identifiers.",
                )
            })?;
            match kind {
                OverlayKind::RegularGrid => {
                    fields.push(cells.rows[j][0].as_string());
                    fields.push(cells.rows[j][1].as_string());
                }
                _ => {
                    let poly_id = cells.rows[j][0].as_f64() as i32;
                    fields.push(format!("{}", (poly_id - 1) % ncols + 1));
                    fields.push(format!("{}", (poly_id - 1) / ncols + 1));
                }
            }
        }
        writeln!(sink, "{}", fields.join(&options.delimiter.to_string()))?;
    }
    Ok(())
}
