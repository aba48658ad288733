/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 08/03/2024
Last Modified: 22/01/2025
License: MIT
*/

//! Grid description files and the polygon sets generated from them: regular
//! modelling grids, irregular cell files in the generate format, and ad hoc
//! bounding-box regions.

use crate::attributes::{AttributeDesc, AttributeKind, AttributeTable, AttributeValue};
use crate::poly_set::{Contour, PolySet, PolyShape, ShapeKind};
use crate::projection::ProjectionContext;
use std::fs::File;
use std::io::{BufRead, BufReader, Error, ErrorKind};
use surrogate_common::algorithms::is_clockwise_order;
use surrogate_common::structures::{BoundingBox, Point2D};

/// One named coordinate system from a grid description file. The projection
/// parameters follow the conventional six-value layout: a type code and the
/// alpha, beta, gamma, and centre values whose meaning depends on the type.
#[derive(Clone, Debug)]
pub struct CoordSystem {
    pub name: String,
    pub ctype: i32,
    pub p_alp: f64,
    pub p_bet: f64,
    pub p_gam: f64,
    pub xcent: f64,
    pub ycent: f64,
}

impl CoordSystem {
    /// The PROJ.4 description of this system, on the 6370997 m sphere used
    /// by the air-quality modelling grids.
    pub fn proj4_string(&self) -> Result<String, Error> {
        let s = match self.ctype {
            1 => "+proj=longlat +R=6370997 +no_defs".to_string(),
            2 => format!(
                "+proj=lcc +lat_1={} +lat_2={} +lon_0={} +lat_0={} +R=6370997 +units=m +no_defs",
                self.p_alp, self.p_bet, self.p_gam, self.ycent
            ),
            3 => format!(
                "+proj=merc +lat_ts={} +lon_0={} +R=6370997 +units=m +no_defs",
                self.p_alp, self.xcent
            ),
            4 => format!(
                "+proj=stere +lat_0={} +lon_0={} +R=6370997 +units=m +no_defs",
                self.p_alp, self.p_bet
            ),
            5 => format!(
                "+proj=utm +zone={} +R=6370997 +units=m +no_defs",
                self.p_alp as i32
            ),
            6 => format!(
                "+proj=stere +lat_0={} +lat_ts={} +lon_0={} +R=6370997 +units=m +no_defs",
                if self.p_alp >= 0f64 { 90 } else { -90 },
                self.p_bet,
                self.p_gam
            ),
            7 => format!(
                "+proj=merc +lon_0={} +R=6370997 +units=m +no_defs",
                self.p_gam
            ),
            8 => format!(
                "+proj=tmerc +lat_0={} +lon_0={} +R=6370997 +units=m +no_defs",
                self.p_alp, self.p_gam
            ),
            _ => {
                return Err(Error::new(
                    ErrorKind::InvalidData,
                    format!(
                        "Coordinate system type {} ({}) is not supported.",
                        self.ctype, self.name
                    ),
                ));
            }
        };
        Ok(s)
    }
}

/// One named grid from a grid description file, referencing its coordinate
/// system by name.
#[derive(Clone, Debug)]
pub struct GridDef {
    pub name: String,
    pub coord_name: String,
    pub xorig: f64,
    pub yorig: f64,
    pub xcell: f64,
    pub ycell: f64,
    pub ncols: i32,
    pub nrows: i32,
    pub nthik: i32,
}

/// The parsed content of a grid description file: a coordinate-system
/// segment followed by a grid segment, each terminated by a blank-name
/// record.
#[derive(Debug, Default)]
pub struct GridDesc {
    pub coord_systems: Vec<CoordSystem>,
    pub grids: Vec<GridDef>,
}

impl GridDesc {
    pub fn read(path: &str) -> Result<GridDesc, Error> {
        let file = File::open(path).map_err(|e| {
            Error::new(
                e.kind(),
                format!("Unable to open the grid description file {}: {}", path, e),
            )
        })?;
        let mut lines: Vec<String> = vec![];
        for line in BufReader::new(file).lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('!') {
                continue;
            }
            lines.push(trimmed.to_string());
        }

        let mut desc = GridDesc::default();
        let mut idx = 0usize;
        loop {
            if idx >= lines.len() {
                return Err(malformed(path, "the coordinate segment is unterminated"));
            }
            let name = unquote(&lines[idx]);
            idx += 1;
            if name.is_empty() {
                break;
            }
            if idx >= lines.len() {
                return Err(malformed(path, "a coordinate record is missing its values"));
            }
            let t = tokens(&lines[idx]);
            idx += 1;
            if t.len() < 6 {
                return Err(malformed(
                    path,
                    &format!("coordinate system {} has too few values", name),
                ));
            }
            desc.coord_systems.push(CoordSystem {
                name,
                ctype: parse_num(&t[0], path)? as i32,
                p_alp: parse_num(&t[1], path)?,
                p_bet: parse_num(&t[2], path)?,
                p_gam: parse_num(&t[3], path)?,
                xcent: parse_num(&t[4], path)?,
                ycent: parse_num(&t[5], path)?,
            });
        }
        loop {
            if idx >= lines.len() {
                break;
            }
            let name = unquote(&lines[idx]);
            idx += 1;
            if name.is_empty() {
                break;
            }
            if idx >= lines.len() {
                return Err(malformed(path, "a grid record is missing its values"));
            }
            let t = tokens(&lines[idx]);
            idx += 1;
            if t.len() < 8 {
                return Err(malformed(
                    path,
                    &format!("grid {} has too few values", name),
                ));
            }
            desc.grids.push(GridDef {
                name,
                coord_name: unquote(&t[0]),
                xorig: parse_num(&t[1], path)?,
                yorig: parse_num(&t[2], path)?,
                xcell: parse_num(&t[3], path)?,
                ycell: parse_num(&t[4], path)?,
                ncols: parse_num(&t[5], path)? as i32,
                nrows: parse_num(&t[6], path)? as i32,
                nthik: parse_num(&t[7], path)? as i32,
            });
        }
        Ok(desc)
    }

    /// Finds a grid by exact name together with its coordinate system.
    pub fn find_grid(&self, name: &str) -> Option<(&GridDef, &CoordSystem)> {
        let grid = self.grids.iter().find(|g| g.name == name)?;
        let coord = self
            .coord_systems
            .iter()
            .find(|c| c.name == grid.coord_name)?;
        Some((grid, coord))
    }
}

fn malformed(path: &str, detail: &str) -> Error {
    Error::new(
        ErrorKind::InvalidData,
        format!("Malformed grid description file {}: {}.", path, detail),
    )
}

fn unquote(s: &str) -> String {
    s.trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .trim()
        .to_string()
}

fn tokens(s: &str) -> Vec<String> {
    s.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

fn parse_num(token: &str, path: &str) -> Result<f64, Error> {
    token.trim().parse::<f64>().map_err(|_| {
        Error::new(
            ErrorKind::InvalidData,
            format!("Unreadable number '{}' in {}.", token, path),
        )
    })
}

/// The kind of overlay an output grid takes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputKind {
    RegularGrid,
    EGrid,
    Polygon,
}

impl OutputKind {
    pub fn from_name(name: &str) -> Option<OutputKind> {
        match name.to_uppercase().as_str() {
            "REGULARGRID" | "REGULAR_GRID" => Some(OutputKind::RegularGrid),
            "EGRID" | "E_GRID" => Some(OutputKind::EGrid),
            "POLYGON" => Some(OutputKind::Polygon),
            _ => None,
        }
    }
}

/// The kind of region an overlay report runs against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayKind {
    RegularGrid,
    EGrid,
    BoundingBox,
    Polygon,
    ShapeFile,
}

impl OverlayKind {
    pub fn from_name(name: &str) -> Option<OverlayKind> {
        match name.to_uppercase().as_str() {
            "REGULARGRID" | "REGULAR_GRID" => Some(OverlayKind::RegularGrid),
            "EGRID" | "E_GRID" => Some(OverlayKind::EGrid),
            "BOUNDINGBOX" | "BOUNDING_BOX" => Some(OverlayKind::BoundingBox),
            "POLYGON" => Some(OverlayKind::Polygon),
            "SHAPEFILE" | "SHAPE_FILE" => Some(OverlayKind::ShapeFile),
            _ => None,
        }
    }
}

/// Everything a report header needs to know about the output grid.
#[derive(Clone, Debug)]
pub struct GridInfo {
    pub kind: OutputKind,
    pub name: String,
    pub coord: CoordSystem,
    pub xorig: f64,
    pub yorig: f64,
    pub xcell: f64,
    pub ycell: f64,
    pub ncols: i32,
    pub nrows: i32,
}

/// Builds the open clockwise ring of one rectangle, with each edge split
/// into the given number of segments.
fn cell_ring(x0: f64, y0: f64, width: f64, height: f64, xseg: usize, yseg: usize) -> Vec<Point2D> {
    let mut points = Vec::with_capacity(2 * (xseg + yseg));
    for s in 0..=yseg {
        points.push(Point2D::new(x0, y0 + height * s as f64 / yseg as f64));
    }
    for s in 1..=xseg {
        points.push(Point2D::new(x0 + width * s as f64 / xseg as f64, y0 + height));
    }
    for s in (0..yseg).rev() {
        points.push(Point2D::new(x0 + width, y0 + height * s as f64 / yseg as f64));
    }
    for s in (1..xseg).rev() {
        points.push(Point2D::new(x0 + width * s as f64 / xseg as f64, y0));
    }
    points
}

fn segments(extent: f64, max_seg: Option<f64>) -> usize {
    match max_seg {
        Some(m) if m > 0f64 => ((extent / m).ceil() as usize).max(1),
        _ => 1,
    }
}

fn check_grid(grid: &GridDef) -> Result<(), Error> {
    if grid.ncols < 1 || grid.nrows < 1 {
        return Err(Error::new(
            ErrorKind::InvalidData,
            format!("The grid {} has no cells.", grid.name),
        ));
    }
    if grid.xcell <= 0f64 || grid.ycell <= 0f64 {
        return Err(Error::new(
            ErrorKind::InvalidData,
            format!("The grid {} has a non-positive cell size.", grid.name),
        ));
    }
    Ok(())
}

/// Generates the cell polygons of a regular grid, row-major from the
/// bottom-left cell, with 1-based COL and ROW attributes. `max_seg` splits
/// cell edges so that no segment exceeds it, which keeps projected cell
/// boundaries faithful to the curved originals; `proj` transforms every
/// vertex as it is generated.
pub fn regular_grid(
    grid: &GridDef,
    max_seg: Option<f64>,
    proj: Option<&ProjectionContext>,
) -> Result<PolySet, Error> {
    check_grid(grid)?;
    let xseg = segments(grid.xcell, max_seg);
    let yseg = segments(grid.ycell, max_seg);

    let mut set = PolySet::new(ShapeKind::Polygon);
    let mut rows: Vec<Vec<AttributeValue>> =
        Vec::with_capacity((grid.ncols * grid.nrows) as usize);
    for r in 0..grid.nrows {
        for c in 0..grid.ncols {
            let x0 = grid.xorig + c as f64 * grid.xcell;
            let y0 = grid.yorig + r as f64 * grid.ycell;
            let mut points = cell_ring(x0, y0, grid.xcell, grid.ycell, xseg, yseg);
            if let Some(p) = proj {
                for pt in points.iter_mut() {
                    let (x, y) = p.project(pt.x, pt.y)?;
                    pt.x = x;
                    pt.y = y;
                }
            }
            set.add_shape(PolyShape {
                contours: vec![Contour {
                    points,
                    is_hole: false,
                }],
            });
            rows.push(vec![AttributeValue::Int(c + 1), AttributeValue::Int(r + 1)]);
        }
    }
    set.attributes = Some(AttributeTable {
        descs: vec![
            AttributeDesc {
                name: "COL".to_string(),
                kind: AttributeKind::Int,
                category: 0,
            },
            AttributeDesc {
                name: "ROW".to_string(),
                kind: AttributeKind::Int,
                category: 0,
            },
        ],
        rows,
    });
    Ok(set)
}

/// The extent of the whole grid in the target system of `proj`, computed by
/// walking the grid perimeter. Without a maximum segment length the
/// perimeter is sampled at every cell boundary.
pub fn grid_envelope(
    grid: &GridDef,
    max_seg: Option<f64>,
    proj: Option<&ProjectionContext>,
) -> Result<BoundingBox, Error> {
    check_grid(grid)?;
    let width = grid.ncols as f64 * grid.xcell;
    let height = grid.nrows as f64 * grid.ycell;
    let xseg = match max_seg {
        Some(m) if m > 0f64 => ((width / m).ceil() as usize).max(1),
        _ => grid.ncols as usize,
    };
    let yseg = match max_seg {
        Some(m) if m > 0f64 => ((height / m).ceil() as usize).max(1),
        _ => grid.nrows as usize,
    };
    let ring = cell_ring(grid.xorig, grid.yorig, width, height, xseg, yseg);
    let mut bb = BoundingBox::default();
    for pt in &ring {
        let (x, y) = match proj {
            Some(p) => p.project(pt.x, pt.y)?,
            None => (pt.x, pt.y),
        };
        bb.expand_to_point(x, y);
    }
    Ok(bb)
}

/// Reads an irregular grid from a generate-format polygon file: each
/// polygon is a header line `id, x, y`, one vertex per line, and an END
/// line, with a final END closing the file. Cell identifiers land in an ID
/// attribute.
pub fn egrid(path: &str, proj: Option<&ProjectionContext>) -> Result<PolySet, Error> {
    let file = File::open(path).map_err(|e| {
        Error::new(
            e.kind(),
            format!("Unable to open the grid polygon file {}: {}", path, e),
        )
    })?;
    let mut set = PolySet::new(ShapeKind::Polygon);
    let mut rows: Vec<Vec<AttributeValue>> = vec![];
    let mut current_id: Option<i32> = None;
    let mut points: Vec<Point2D> = vec![];
    for line in BufReader::new(file).lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("END") {
            match current_id.take() {
                Some(id) => {
                    if points.len() > 3 && points[0] == points[points.len() - 1] {
                        points.pop();
                    }
                    if !is_clockwise_order(&points) {
                        points.reverse();
                    }
                    set.add_shape(PolyShape {
                        contours: vec![Contour {
                            points: std::mem::take(&mut points),
                            is_hole: false,
                        }],
                    });
                    rows.push(vec![AttributeValue::Int(id)]);
                }
                None => break,
            }
            continue;
        }
        let t = tokens(trimmed);
        match current_id {
            None => {
                if t.len() < 3 {
                    return Err(Error::new(
                        ErrorKind::InvalidData,
                        format!("Malformed polygon header '{}' in {}.", trimmed, path),
                    ));
                }
                current_id = Some(parse_num(&t[0], path)? as i32);
            }
            Some(_) => {
                if t.len() < 2 {
                    return Err(Error::new(
                        ErrorKind::InvalidData,
                        format!("Malformed vertex '{}' in {}.", trimmed, path),
                    ));
                }
                let mut x = parse_num(&t[0], path)?;
                let mut y = parse_num(&t[1], path)?;
                if let Some(p) = proj {
                    let (px, py) = p.project(x, y)?;
                    x = px;
                    y = py;
                }
                points.push(Point2D::new(x, y));
            }
        }
    }
    if current_id.is_some() {
        return Err(Error::new(
            ErrorKind::InvalidData,
            format!("The grid polygon file {} ends inside a polygon; END is missing.", path),
        ));
    }
    set.attributes = Some(AttributeTable {
        descs: vec![AttributeDesc {
            name: "ID".to_string(),
            kind: AttributeKind::Int,
            category: 0,
        }],
        rows,
    });
    Ok(set)
}

/// Builds a one-polygon set from an `x1,y1,x2,y2` extent description.
pub fn bounding_box_set(spec: &str, proj: Option<&ProjectionContext>) -> Result<PolySet, Error> {
    let t = tokens(spec);
    if t.len() < 4 {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("A bounding box requires x1,y1,x2,y2; received '{}'.", spec),
        ));
    }
    let x1 = parse_num(&t[0], spec)?;
    let y1 = parse_num(&t[1], spec)?;
    let x2 = parse_num(&t[2], spec)?;
    let y2 = parse_num(&t[3], spec)?;
    if x1 > x2 || y1 > y2 {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("The bounding box '{}' has its corners reversed.", spec),
        ));
    }
    let mut points = vec![
        Point2D::new(x1, y1),
        Point2D::new(x1, y2),
        Point2D::new(x2, y2),
        Point2D::new(x2, y1),
    ];
    if let Some(p) = proj {
        for pt in points.iter_mut() {
            let (x, y) = p.project(pt.x, pt.y)?;
            pt.x = x;
            pt.y = y;
        }
    }
    let mut set = PolySet::new(ShapeKind::Polygon);
    set.add_shape(PolyShape {
        contours: vec![Contour {
            points,
            is_hole: false,
        }],
    });
    Ok(set)
}

#[cfg(test)]
mod test {
    use super::{
        bounding_box_set, egrid, grid_envelope, regular_grid, CoordSystem, GridDef, GridDesc,
        OutputKind, OverlayKind,
    };
    use std::fs;
    use std::path::PathBuf;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn sample_grid() -> GridDef {
        GridDef {
            name: "TEST_2X2".to_string(),
            coord_name: "TEST_COORD".to_string(),
            xorig: 0.0,
            yorig: 0.0,
            xcell: 10.0,
            ycell: 5.0,
            ncols: 2,
            nrows: 2,
            nthik: 1,
        }
    }

    #[test]
    fn test_read_grid_description() {
        let path = temp_file(
            "srgt_griddesc_test.txt",
            "! coordinate systems\n\
             'LAM_40N97W'\n\
             2, 33.0, 45.0, -97.0, -97.0, 40.0\n\
             'LATLON'\n\
             1, 0.0, 0.0, 0.0, 0.0, 0.0\n\
             ' '\n\
             ! grids\n\
             'US36KM'\n\
             'LAM_40N97W', -2736000.0, -2088000.0, 36000.0, 36000.0, 148, 112, 1\n\
             ' '\n",
        );
        let desc = GridDesc::read(path.to_str().unwrap()).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(desc.coord_systems.len(), 2);
        assert_eq!(desc.grids.len(), 1);
        let (grid, coord) = desc.find_grid("US36KM").unwrap();
        assert_eq!(grid.ncols, 148);
        assert_eq!(grid.nrows, 112);
        assert_eq!(coord.ctype, 2);
        assert!((coord.p_alp - 33.0).abs() < 1e-9);
        assert!(desc.find_grid("NOT_THERE").is_none());
    }

    #[test]
    fn test_lambert_proj4_string() {
        let coord = CoordSystem {
            name: "LAM_40N97W".to_string(),
            ctype: 2,
            p_alp: 33.0,
            p_bet: 45.0,
            p_gam: -97.0,
            xcent: -97.0,
            ycent: 40.0,
        };
        let s = coord.proj4_string().unwrap();
        assert!(s.contains("+proj=lcc"));
        assert!(s.contains("+lat_1=33"));
        assert!(s.contains("+lat_0=40"));
    }

    #[test]
    fn test_unsupported_coordinate_type() {
        let coord = CoordSystem {
            name: "ODD".to_string(),
            ctype: 11,
            p_alp: 0.0,
            p_bet: 0.0,
            p_gam: 0.0,
            xcent: 0.0,
            ycent: 0.0,
        };
        assert!(coord.proj4_string().is_err());
    }

    #[test]
    fn test_regular_grid_layout() {
        let set = regular_grid(&sample_grid(), None, None).unwrap();
        assert_eq!(set.num_shapes(), 4);
        // row-major from the bottom-left: cell 1 is column 2, row 1
        assert_eq!(set.boxes[1].min_x, 10.0);
        assert_eq!(set.boxes[1].min_y, 0.0);
        assert_eq!(set.boxes[2].min_x, 0.0);
        assert_eq!(set.boxes[2].min_y, 5.0);
        let table = set.attributes.as_ref().unwrap();
        assert_eq!(table.rows[1][0].as_string(), "2");
        assert_eq!(table.rows[1][1].as_string(), "1");
        assert_eq!(table.rows[2][0].as_string(), "1");
        assert_eq!(table.rows[2][1].as_string(), "2");
        for shape in &set.shapes {
            assert!((shape.area() - 50.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_regular_grid_edge_subdivision() {
        let set = regular_grid(&sample_grid(), Some(2.5), None).unwrap();
        // 10/2.5 = 4 segments across, 5/2.5 = 2 down: 2*(4+2) vertices
        assert_eq!(set.shapes[0].contours[0].points.len(), 12);
        assert!((set.shapes[0].area() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_grid_envelope_without_projection() {
        let bb = grid_envelope(&sample_grid(), None, None).unwrap();
        assert_eq!(bb.min_x, 0.0);
        assert_eq!(bb.max_x, 20.0);
        assert_eq!(bb.max_y, 10.0);
    }

    #[test]
    fn test_egrid_parse() {
        let path = temp_file(
            "srgt_egrid_test.txt",
            "1, 5.0, 5.0\n\
             0.0, 0.0\n\
             0.0, 10.0\n\
             10.0, 10.0\n\
             10.0, 0.0\n\
             0.0, 0.0\n\
             END\n\
             7, 15.0, 5.0\n\
             10.0, 0.0\n\
             10.0, 10.0\n\
             20.0, 10.0\n\
             20.0, 0.0\n\
             10.0, 0.0\n\
             END\n\
             END\n",
        );
        let set = egrid(path.to_str().unwrap(), None).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(set.num_shapes(), 2);
        assert!((set.shapes[0].area() - 100.0).abs() < 1e-9);
        let table = set.attributes.as_ref().unwrap();
        assert_eq!(table.rows[0][0].as_string(), "1");
        assert_eq!(table.rows[1][0].as_string(), "7");
    }

    #[test]
    fn test_egrid_truncated_file_is_an_error() {
        let path = temp_file(
            "srgt_egrid_truncated.txt",
            "1, 5.0, 5.0\n0.0, 0.0\n0.0, 10.0\n",
        );
        let result = egrid(path.to_str().unwrap(), None);
        let _ = fs::remove_file(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_bounding_box_set() {
        let set = bounding_box_set("0.0,0.0,20.0,10.0", None).unwrap();
        assert_eq!(set.num_shapes(), 1);
        assert!((set.shapes[0].area() - 200.0).abs() < 1e-9);
        assert!(bounding_box_set("0.0,0.0,20.0", None).is_err());
        assert!(bounding_box_set("20.0,0.0,0.0,10.0", None).is_err());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(OutputKind::from_name("RegularGrid"), Some(OutputKind::RegularGrid));
        assert_eq!(OutputKind::from_name("EGRID"), Some(OutputKind::EGrid));
        assert_eq!(OutputKind::from_name("nothing"), None);
        assert_eq!(OverlayKind::from_name("ShapeFile"), Some(OverlayKind::ShapeFile));
        assert_eq!(OverlayKind::from_name("BoundingBox"), Some(OverlayKind::BoundingBox));
    }
}
