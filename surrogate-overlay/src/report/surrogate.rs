/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 10/04/2024
Last Modified: 02/04/2025
License: MIT
*/

//! The surrogate fraction report. Each row apportions one data polygon's
//! weight to one grid cell or output polygon as numerator over denominator;
//! rows with an untrustworthy denominator are kept but flagged, and the
//! unallocated share of each data polygon is written as a remainder row.

use crate::aggregate::{sum1, sum2};
use crate::attributes::{AttributeKind, AttributeValue};
use crate::grid::{GridInfo, OutputKind};
use crate::overlap_table::OverlapTable;
use crate::poly_set::PolySet;
use std::fs::File;
use std::io::{BufWriter, Error, ErrorKind, Write};
use surrogate_vector::{AttributeField, FieldData, FieldDataType, ShapeType, Shapefile, ShapefileGeometry};

/// Controls for the report writer.
pub struct SurrogateOptions {
    /// Surrogate code written when the weight set has no attributes.
    pub code: i32,
    pub write_header: bool,
    pub qa_sum: bool,
    pub output_numerator: bool,
    pub output_denominator: bool,
    /// Rows whose denominator falls below this are flagged as skipped.
    pub denominator_threshold: f64,
    /// Base name of an optional polygon file of per-cell numerator sums.
    pub grid_sum_name: Option<String>,
}

impl Default for SurrogateOptions {
    fn default() -> SurrogateOptions {
        SurrogateOptions {
            code: 1,
            write_header: true,
            qa_sum: false,
            output_numerator: false,
            output_denominator: false,
            denominator_threshold: 0.00001,
            grid_sum_name: None,
        }
    }
}

/// Writes the surrogate report for a two-level overlay. `derived` is the
/// weight-data result intersected with the grid; `one_level` is the
/// weight-data result itself and provides the denominators. With weight
/// attributes present, one block of rows is written per attribute using its
/// category as the surrogate code.
pub fn write_surrogate_report<W: Write>(
    sink: &mut W,
    derived: &PolySet,
    one_level: &PolySet,
    grid: &GridInfo,
    options: &SurrogateOptions,
) -> Result<(), Error> {
    let data = one_level
        .data_set()
        .ok_or_else(|| report_error("The weight-data overlay has no derivation."))?;
    let grid_set = derived
        .grid_set()
        .ok_or_else(|| report_error("The gridded overlay has no derivation."))?;
    let weight = derived
        .weight_set()
        .ok_or_else(|| report_error("The gridded overlay has no derivation."))?;
    let data_table = data
        .attributes
        .as_ref()
        .ok_or_else(|| report_error("The data polygons carry no identifier attribute."))?;
    if matches!(grid.kind, OutputKind::RegularGrid | OutputKind::EGrid) && grid.ncols < 1 {
        return Err(report_error("The output grid has no columns."));
    }
    if matches!(grid.kind, OutputKind::EGrid | OutputKind::Polygon)
        && grid_set.attributes.is_none()
    {
        return Err(report_error("The output polygons carry no identifier attribute."));
    }

    if options.write_header {
        write_header(sink, grid)?;
    }

    let passes: Vec<(Option<usize>, i32)> = match weight.attributes.as_ref() {
        Some(t) if t.num_attributes() > 0 => (0..t.num_attributes())
            .map(|a| (Some(a), t.descs[a].category))
            .collect(),
        _ => vec![(None, options.code)],
    };

    let mut grid_sums: Option<Vec<f64>> = options
        .grid_sum_name
        .as_ref()
        .map(|_| vec![0f64; grid_set.num_shapes()]);
    let mut values_ok = true;

    for (attr, code) in passes {
        let mut table = OverlapTable::new(data, grid_set, 0f64);
        sum2(derived, attr, &mut table)?;
        let den = sum1(one_level, attr)?;
        if den.len() != table.num_rows() {
            return Err(report_error("The numerator and denominator dimensions disagree."));
        }

        let mut last_id = String::new();
        let mut qasum = 0f64;
        let mut sum_a = 0f64;
        let mut last_b = 0f64;

        for i in 0..den.len() {
            let b = den[i];
            if b == 0f64 {
                continue;
            }
            let id = data_table.rows[i][0].as_string();
            if id != last_id {
                write_remainder(sink, grid.kind, code, &last_id, qasum, sum_a, last_b, options)?;
                qasum = 0f64;
                sum_a = 0f64;
                last_b = b;
                last_id = id.clone();
            }
            for &j in table.row_columns(i) {
                let a = table.get(i, j);
                if a == 0f64 {
                    continue;
                }
                let frac = a / b;
                if values_ok && (frac <= 0f64 || frac > 1f64) {
                    println!(
                        "WARNING: At least one surrogate for attribute {}, data polygon {} is not between 0 and 1.",
                        code, id
                    );
                    values_ok = false;
                }
                qasum += frac;
                sum_a += a;
                if let Some(sums) = grid_sums.as_mut() {
                    sums[j] += a;
                }

                let keep = b >= options.denominator_threshold && !id.is_empty();
                let mut line = String::new();
                if !keep {
                    line.push_str("#SKIPPED ");
                }
                match grid.kind {
                    OutputKind::RegularGrid | OutputKind::EGrid => {
                        let (col, row) = cell_position(grid, grid_set, j);
                        line.push_str(&format!(
                            "{:5}\t{}\t{:5}\t{:5}\t{:10.8}",
                            code, id, col, row, frac
                        ));
                    }
                    OutputKind::Polygon => {
                        let out_id = grid_set
                            .attributes
                            .as_ref()
                            .map(|t| t.rows[j][0].as_string())
                            .unwrap_or_default();
                        line.push_str(&format!("{:5}\t{}\t{}\t{:10.8}", code, id, out_id, frac));
                    }
                }
                push_qa(&mut line, options, a, b, qasum);
                writeln!(sink, "{}", line)?;
            }
        }
        write_remainder(sink, grid.kind, code, &last_id, qasum, sum_a, last_b, options)?;
    }

    if let (Some(name), Some(sums)) = (options.grid_sum_name.as_ref(), grid_sums.as_ref()) {
        write_grid_sums(name, grid_set, grid, sums)?;
    }
    Ok(())
}

fn report_error(message: &str) -> Error {
    Error::new(ErrorKind::InvalidInput, message)
}

/// The 1-based column and row of grid element `j`: positional for a regular
/// grid, recovered from the cell identifier for an irregular one.
fn cell_position(grid: &GridInfo, grid_set: &PolySet, j: usize) -> (i32, i32) {
    if grid.kind == OutputKind::RegularGrid {
        (
            (j % grid.ncols as usize) as i32 + 1,
            (j / grid.ncols as usize) as i32 + 1,
        )
    } else {
        let poly_id = grid_set
            .attributes
            .as_ref()
            .map(|t| t.rows[j][0].as_f64() as i32)
            .unwrap_or(0);
        ((poly_id - 1) % grid.ncols + 1, (poly_id - 1) / grid.ncols + 1)
    }
}

fn push_qa(line: &mut String, options: &SurrogateOptions, a: f64, b: f64, qasum: f64) {
    if options.qa_sum || options.output_numerator || options.output_denominator {
        line.push_str("\t!");
        if options.output_numerator {
            line.push_str(&format!("\t{:.6}", a));
        }
        if options.output_denominator {
            line.push_str(&format!("\t{:.6}", b));
        }
        if options.qa_sum {
            line.push_str(&format!("\t{:.6}", qasum));
        }
    }
}

/// Writes the unallocated share of the previous data polygon, when it is
/// worth reporting: a remainder above the tolerance with at least some
/// fraction already allocated.
fn write_remainder<W: Write>(
    sink: &mut W,
    kind: OutputKind,
    code: i32,
    last_id: &str,
    qasum: f64,
    sum_a: f64,
    last_b: f64,
    options: &SurrogateOptions,
) -> Result<(), Error> {
    let frac = 1f64 - qasum;
    if frac.abs() <= 0.00001 || qasum <= 0.00001 || last_id.is_empty() {
        return Ok(());
    }
    println!(
        "WARNING: The fraction sum for attribute {}, data polygon {} was {:.4}, not 1.",
        code, last_id, qasum
    );
    let mut line = String::new();
    match kind {
        OutputKind::RegularGrid | OutputKind::EGrid => {
            line.push_str(&format!(
                "#REMAINDER {:5}\t{}\t{:5}\t{:5}\t{:10.8}",
                code, last_id, 0, 0, frac
            ));
        }
        OutputKind::Polygon => {
            line.push_str(&format!(
                "#REMAINDER {:5}\t{}\t{}\t{:10.8}",
                code, last_id, "0", frac
            ));
        }
    }
    push_qa(&mut line, options, last_b - sum_a, last_b, frac);
    writeln!(sink, "{}", line)?;
    Ok(())
}

/// The one-line grid description heading the report.
fn write_header<W: Write>(sink: &mut W, grid: &GridInfo) -> Result<(), Error> {
    let tag = match grid.kind {
        OutputKind::RegularGrid | OutputKind::EGrid => "#GRID",
        OutputKind::Polygon => "#POLYGON",
    };
    let cname = match grid.coord.ctype {
        1 => "LAT-LON",
        2 => "LAMBERT",
        3 => "MERCATOR",
        4 => "STEREOGRAPHIC",
        5 => "UTM",
        6 => "POLGRD3",
        7 => "EquatorialMERCATOR",
        8 => "TransverseMERCATOR",
        _ => "UNKNOWN",
    };
    let units = if grid.coord.ctype == 1 { "degrees" } else { "meters" };
    // the polar stereographic convention leads with its central meridian
    let (p1, p2, p3) = if grid.coord.ctype == 6 {
        (grid.coord.p_gam, grid.coord.p_alp, grid.coord.p_bet)
    } else {
        (grid.coord.p_alp, grid.coord.p_bet, grid.coord.p_gam)
    };
    writeln!(
        sink,
        "{}\t{}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{}\t{}\t{}\t{}\t{}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}",
        tag,
        grid.name,
        grid.xorig,
        grid.yorig,
        grid.xcell,
        grid.ycell,
        grid.ncols,
        grid.nrows,
        1,
        cname,
        units,
        p1,
        p2,
        p3,
        grid.coord.xcent,
        grid.coord.ycent
    )?;
    Ok(())
}

fn attr_to_field(value: &AttributeValue) -> FieldData {
    match value {
        AttributeValue::Int(v) => FieldData::Int(*v),
        AttributeValue::Double(v) => FieldData::Real(*v),
        AttributeValue::Str(v) => FieldData::Text(v.clone()),
    }
}

/// Writes the per-cell numerator sums as a polygon shapefile plus a CSV
/// beside it.
fn write_grid_sums(
    name: &str,
    grid_set: &PolySet,
    grid: &GridInfo,
    sums: &[f64],
) -> Result<(), Error> {
    let mut output = Shapefile::new(name, ShapeType::Polygon)?;
    match grid.kind {
        OutputKind::RegularGrid | OutputKind::EGrid => {
            output
                .attributes
                .add_field(&AttributeField::new("COL", FieldDataType::Int, 20u8, 0u8));
            output
                .attributes
                .add_field(&AttributeField::new("ROW", FieldDataType::Int, 20u8, 0u8));
            output.attributes.add_field(&AttributeField::new(
                "NUMERSUM",
                FieldDataType::Real,
                20u8,
                8u8,
            ));
        }
        OutputKind::Polygon => {
            let table = grid_set
                .attributes
                .as_ref()
                .ok_or_else(|| report_error("The output polygons carry no identifier attribute."))?;
            let desc = &table.descs[0];
            let (ftype, decimals) = match desc.kind {
                AttributeKind::Int => (FieldDataType::Int, 0u8),
                AttributeKind::Double => (FieldDataType::Real, 8u8),
                AttributeKind::Str => (FieldDataType::Text, 0u8),
            };
            output
                .attributes
                .add_field(&AttributeField::new(&desc.name, ftype, 20u8, decimals));
            output.attributes.add_field(&AttributeField::new(
                "NUMERSUM",
                FieldDataType::Real,
                20u8,
                8u8,
            ));
        }
    }

    let base = name.strip_suffix(".shp").unwrap_or(name);
    let csv_name = format!("{}.csv", base);
    let csv_file = File::create(&csv_name).map_err(|e| {
        Error::new(
            e.kind(),
            format!("Cannot open file {} for writing: {}", csv_name, e),
        )
    })?;
    let mut csv = BufWriter::new(csv_file);
    match grid.kind {
        OutputKind::RegularGrid | OutputKind::EGrid => {
            writeln!(csv, "COL,ROW,NUMERSUM")?;
        }
        OutputKind::Polygon => {
            let id_name = grid_set
                .attributes
                .as_ref()
                .map(|t| t.descs[0].name.clone())
                .unwrap_or_default();
            writeln!(csv, "{},NUMERSUM", id_name)?;
        }
    }

    for j in 0..grid_set.num_shapes() {
        let mut sfg = ShapefileGeometry::new(ShapeType::Polygon);
        for contour in &grid_set.shapes[j].contours {
            let mut pts = contour.points.clone();
            if !pts.is_empty() && pts[0] != pts[pts.len() - 1] {
                let first = pts[0];
                pts.push(first);
            }
            sfg.add_part(&pts);
        }
        output.add_record(sfg);
        match grid.kind {
            OutputKind::RegularGrid | OutputKind::EGrid => {
                let (col, row) = cell_position(grid, grid_set, j);
                writeln!(csv, "{},{},{:.8}", col, row, sums[j])?;
                output.attributes.add_record(
                    vec![
                        FieldData::Int(col),
                        FieldData::Int(row),
                        FieldData::Real(sums[j]),
                    ],
                    false,
                );
            }
            OutputKind::Polygon => {
                let id_value = grid_set
                    .attributes
                    .as_ref()
                    .map(|t| t.rows[j][0].clone())
                    .unwrap_or(AttributeValue::Int(0));
                writeln!(csv, "{},{:.8}", id_value.as_string(), sums[j])?;
                output
                    .attributes
                    .add_record(vec![attr_to_field(&id_value), FieldData::Real(sums[j])], false);
            }
        }
    }
    csv.flush()?;
    output.write()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{write_surrogate_report, SurrogateOptions};
    use crate::attributes::{AttributeDesc, AttributeKind, AttributeTable, AttributeValue};
    use crate::grid::{regular_grid, CoordSystem, GridDef, GridInfo, OutputKind};
    use crate::intersect::poly_isect;
    use crate::poly_set::{Contour, PolySet, PolyShape, ShapeKind};
    use std::fs;
    use std::sync::Arc;
    use surrogate_common::structures::Point2D;

    fn rect(x0: f64, y0: f64, w: f64, h: f64) -> PolyShape {
        PolyShape {
            contours: vec![Contour {
                points: vec![
                    Point2D::new(x0, y0),
                    Point2D::new(x0, y0 + h),
                    Point2D::new(x0 + w, y0 + h),
                    Point2D::new(x0 + w, y0),
                ],
                is_hole: false,
            }],
        }
    }

    fn latlon() -> CoordSystem {
        CoordSystem {
            name: "LATLON".to_string(),
            ctype: 1,
            p_alp: 0.0,
            p_bet: 0.0,
            p_gam: 0.0,
            xcent: 0.0,
            ycent: 0.0,
        }
    }

    fn two_cell_grid_def() -> GridDef {
        GridDef {
            name: "TEST_GRID".to_string(),
            coord_name: "LATLON".to_string(),
            xorig: 0.0,
            yorig: 0.0,
            xcell: 10.0,
            ycell: 10.0,
            ncols: 2,
            nrows: 1,
            nthik: 1,
        }
    }

    fn grid_info(def: &GridDef) -> GridInfo {
        GridInfo {
            kind: OutputKind::RegularGrid,
            name: def.name.clone(),
            coord: latlon(),
            xorig: def.xorig,
            yorig: def.yorig,
            xcell: def.xcell,
            ycell: def.ycell,
            ncols: def.ncols,
            nrows: def.nrows,
        }
    }

    fn data_set_with_id(id: i32) -> Arc<PolySet> {
        let mut data = PolySet::new(ShapeKind::Polygon);
        data.add_shape(rect(0.0, 0.0, 20.0, 10.0));
        data.attributes = Some(AttributeTable {
            descs: vec![AttributeDesc {
                name: "FIPS".to_string(),
                kind: AttributeKind::Int,
                category: 0,
            }],
            rows: vec![vec![AttributeValue::Int(id)]],
        });
        Arc::new(data)
    }

    fn forty_sixty_weights() -> Arc<PolySet> {
        let mut weight = PolySet::new(ShapeKind::Polygon);
        weight.add_shape(rect(1.0, 1.0, 8.0, 5.0)); // area 40, in cell 1
        weight.add_shape(rect(10.0, 0.0, 10.0, 6.0)); // area 60, in cell 2
        Arc::new(weight)
    }

    #[test]
    fn test_forty_sixty_report() {
        let def = two_cell_grid_def();
        let data = data_set_with_id(100);
        let grid_cells = Arc::new(regular_grid(&def, None, None).unwrap());

        let wd = Arc::new(poly_isect(&forty_sixty_weights(), &data).unwrap());
        let wdg = poly_isect(&wd, &grid_cells).unwrap();

        let mut sink: Vec<u8> = vec![];
        let options = SurrogateOptions::default();
        write_surrogate_report(&mut sink, &wdg, &wd, &grid_info(&def), &options).unwrap();
        let text = String::from_utf8(sink).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("#GRID\tTEST_GRID\t"));
        assert!(lines[0].contains("LAT-LON"));
        assert!(lines[0].contains("degrees"));
        assert!(lines.contains(&"    1\t100\t    1\t    1\t0.40000000"));
        assert!(lines.contains(&"    1\t100\t    2\t    1\t0.60000000"));
        assert!(!text.contains("#REMAINDER"));
        assert!(!text.contains("#SKIPPED"));
    }

    #[test]
    fn test_qa_columns() {
        let def = two_cell_grid_def();
        let data = data_set_with_id(100);
        let grid_cells = Arc::new(regular_grid(&def, None, None).unwrap());
        let wd = Arc::new(poly_isect(&forty_sixty_weights(), &data).unwrap());
        let wdg = poly_isect(&wd, &grid_cells).unwrap();

        let mut sink: Vec<u8> = vec![];
        let options = SurrogateOptions {
            qa_sum: true,
            output_numerator: true,
            output_denominator: true,
            ..Default::default()
        };
        write_surrogate_report(&mut sink, &wdg, &wd, &grid_info(&def), &options).unwrap();
        let text = String::from_utf8(sink).unwrap();

        assert!(text.contains("0.40000000\t!\t40.000000\t100.000000\t0.400000"));
        assert!(text.contains("0.60000000\t!\t60.000000\t100.000000\t1.000000"));
    }

    #[test]
    fn test_remainder_row_for_unallocated_share() {
        // a single cell only covers the first weight polygon
        let def = GridDef {
            ncols: 1,
            ..two_cell_grid_def()
        };
        let data = data_set_with_id(100);
        let grid_cells = Arc::new(regular_grid(&def, None, None).unwrap());
        let wd = Arc::new(poly_isect(&forty_sixty_weights(), &data).unwrap());
        let wdg = poly_isect(&wd, &grid_cells).unwrap();

        let mut sink: Vec<u8> = vec![];
        write_surrogate_report(
            &mut sink,
            &wdg,
            &wd,
            &grid_info(&def),
            &SurrogateOptions::default(),
        )
        .unwrap();
        let text = String::from_utf8(sink).unwrap();

        assert!(text.contains("    1\t100\t    1\t    1\t0.40000000"));
        let remainder: Vec<&str> = text
            .lines()
            .filter(|l| l.starts_with("#REMAINDER"))
            .collect();
        assert_eq!(remainder.len(), 1);
        assert!(remainder[0].contains("0.60000000"));
        assert!(remainder[0].contains("\t    0\t    0\t"));
    }

    #[test]
    fn test_low_denominator_rows_are_flagged() {
        let def = two_cell_grid_def();
        let data = data_set_with_id(100);
        let grid_cells = Arc::new(regular_grid(&def, None, None).unwrap());
        let wd = Arc::new(poly_isect(&forty_sixty_weights(), &data).unwrap());
        let wdg = poly_isect(&wd, &grid_cells).unwrap();

        let mut sink: Vec<u8> = vec![];
        let options = SurrogateOptions {
            denominator_threshold: 1000.0,
            ..Default::default()
        };
        write_surrogate_report(&mut sink, &wdg, &wd, &grid_info(&def), &options).unwrap();
        let text = String::from_utf8(sink).unwrap();
        assert!(text.contains("#SKIPPED     1\t100\t    1\t    1\t0.40000000"));
    }

    #[test]
    fn test_polygon_output_uses_identifiers() {
        let data = data_set_with_id(100);
        let mut regions = PolySet::new(ShapeKind::Polygon);
        regions.add_shape(rect(0.0, 0.0, 10.0, 10.0));
        regions.add_shape(rect(10.0, 0.0, 10.0, 10.0));
        regions.attributes = Some(AttributeTable {
            descs: vec![AttributeDesc {
                name: "NAME".to_string(),
                kind: AttributeKind::Str,
                category: 0,
            }],
            rows: vec![
                vec![AttributeValue::Str("WEST".to_string())],
                vec![AttributeValue::Str("EAST".to_string())],
            ],
        });
        let regions = Arc::new(regions);
        let wd = Arc::new(poly_isect(&forty_sixty_weights(), &data).unwrap());
        let wdg = poly_isect(&wd, &regions).unwrap();

        let info = GridInfo {
            kind: OutputKind::Polygon,
            name: "REGIONS".to_string(),
            coord: latlon(),
            xorig: 0.0,
            yorig: 0.0,
            xcell: 0.0,
            ycell: 0.0,
            ncols: 0,
            nrows: 0,
        };
        let mut sink: Vec<u8> = vec![];
        write_surrogate_report(&mut sink, &wdg, &wd, &info, &SurrogateOptions::default())
            .unwrap();
        let text = String::from_utf8(sink).unwrap();
        assert!(text.lines().next().unwrap().starts_with("#POLYGON\tREGIONS"));
        assert!(text.contains("    1\t100\tWEST\t0.40000000"));
        assert!(text.contains("    1\t100\tEAST\t0.60000000"));
    }

    #[test]
    fn test_grid_sum_files() {
        let def = two_cell_grid_def();
        let data = data_set_with_id(100);
        let grid_cells = Arc::new(regular_grid(&def, None, None).unwrap());
        let wd = Arc::new(poly_isect(&forty_sixty_weights(), &data).unwrap());
        let wdg = poly_isect(&wd, &grid_cells).unwrap();

        let mut base = std::env::temp_dir();
        base.push("srgt_numersum_test");
        let base = base.to_str().unwrap().to_string();
        let options = SurrogateOptions {
            grid_sum_name: Some(base.clone()),
            ..Default::default()
        };
        let mut sink: Vec<u8> = vec![];
        write_surrogate_report(&mut sink, &wdg, &wd, &grid_info(&def), &options).unwrap();

        let csv = fs::read_to_string(format!("{}.csv", base)).unwrap();
        assert!(csv.starts_with("COL,ROW,NUMERSUM"));
        assert!(csv.contains("1,1,40.00000000"));
        assert!(csv.contains("2,1,60.00000000"));
        assert!(fs::metadata(format!("{}.shp", base)).unwrap().len() > 0);
        assert!(fs::metadata(format!("{}.dbf", base)).unwrap().len() > 0);
        for ext in ["shp", "shx", "dbf", "csv"] {
            let _ = fs::remove_file(format!("{}.{}", base, ext));
        }
    }
}
