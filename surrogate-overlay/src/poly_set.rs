/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 05/03/2024
Last Modified: 11/04/2025
License: MIT
*/

//! The polygon-set data model: shapes and their bounding boxes held as
//! parallel arrays, attribute rows correlated by position, and a derivation
//! record linking an overlay result back to the two sets it was clipped from.

use crate::attributes::{AttributeDesc, AttributeKind, AttributeTable, AttributeValue};
use crate::projection::ProjectionContext;
use std::collections::HashMap;
use std::fmt;
use std::io::{Error, ErrorKind};
use std::sync::Arc;
use surrogate_common::algorithms::{is_clockwise_order, polyline_length, ring_area_signed};
use surrogate_common::structures::{BoundingBox, Point2D};
use surrogate_vector::{FieldData, ShapeType, Shapefile};

/// The homogeneous geometry kind of a polygon set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    Polygon,
    Arc,
    Point,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ShapeKind::Polygon => write!(f, "Polygon"),
            ShapeKind::Arc => write!(f, "Arc"),
            ShapeKind::Point => write!(f, "Point"),
        }
    }
}

/// One ring or line string. `is_hole` marks a ring subtracted from the
/// enclosed area. Rings are stored open, without a duplicated closing
/// vertex; outer rings run clockwise and holes counter-clockwise.
#[derive(Clone, Debug, Default)]
pub struct Contour {
    pub points: Vec<Point2D>,
    pub is_hole: bool,
}

/// One shape: a polygon with holes, a poly-line, or a point cluster.
/// Hole contours are assumed to be nested inside an outer contour of the
/// same shape; this is a precondition from upstream data, not validated.
#[derive(Clone, Debug, Default)]
pub struct PolyShape {
    pub contours: Vec<Contour>,
}

impl PolyShape {
    pub fn new() -> PolyShape {
        PolyShape { contours: vec![] }
    }

    /// Signed-area sum over the contours; clockwise outer rings contribute
    /// positively and counter-clockwise holes subtract.
    pub fn area(&self) -> f64 {
        self.contours.iter().map(|c| ring_area_signed(&c.points)).sum()
    }

    /// Total line length over the contours.
    pub fn length(&self) -> f64 {
        self.contours.iter().map(|c| polyline_length(&c.points)).sum()
    }

    /// Box containing every vertex, or None when the shape has no geometry.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut bb = BoundingBox::default();
        for contour in &self.contours {
            for p in &contour.points {
                bb.expand_to_point(p.x, p.y);
            }
        }
        if bb.is_null() {
            None
        } else {
            Some(bb)
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.contours.iter().map(|c| c.points.len()).sum()
    }
}

/// Links an overlay result to the sets it was derived from. `pairs[k]`
/// holds the (first-set element, second-set element) indices that element k
/// of the result was clipped from. A union result records no first set; its
/// single pair names the first and last input elements as representative
/// parents.
#[derive(Clone, Debug)]
pub struct Derivation {
    pub first: Option<Arc<PolySet>>,
    pub second: Arc<PolySet>,
    pub pairs: Vec<(usize, usize)>,
}

/// A homogeneous set of shapes with per-shape and whole-set bounding boxes,
/// optional attributes (one row per shape), and an optional derivation.
#[derive(Clone, Debug)]
pub struct PolySet {
    pub kind: ShapeKind,
    pub shapes: Vec<PolyShape>,
    pub boxes: Vec<BoundingBox>,
    pub bounding_box: BoundingBox,
    pub attributes: Option<AttributeTable>,
    pub derivation: Option<Derivation>,
}

impl PolySet {
    pub fn new(kind: ShapeKind) -> PolySet {
        PolySet {
            kind,
            shapes: vec![],
            boxes: vec![],
            bounding_box: BoundingBox::default(),
            attributes: None,
            derivation: None,
        }
    }

    pub fn num_shapes(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Appends a shape, computing its box and folding it into the set box.
    /// A shape with no geometry gets the null sentinel box, which never
    /// overlaps anything and so never becomes a clip candidate.
    pub fn add_shape(&mut self, shape: PolyShape) {
        let bb = shape.bounding_box().unwrap_or_default();
        if !bb.is_null() {
            self.bounding_box.expand_to(bb);
        }
        self.boxes.push(bb);
        self.shapes.push(shape);
    }

    /// Recomputes every per-shape box from its current geometry and folds
    /// them into the set box. Must be called after any geometry-mutating
    /// pass (clipping, projection, merge); cached boxes are not
    /// auto-invalidated.
    pub fn recompute_bounding_boxes(&mut self) {
        self.bounding_box = BoundingBox::default();
        for i in 0..self.shapes.len() {
            let bb = self.shapes[i].bounding_box().unwrap_or_default();
            if !bb.is_null() {
                self.bounding_box.expand_to(bb);
            }
            self.boxes[i] = bb;
        }
    }

    /// Walks the first-side ancestry to the original weight-set element
    /// index for element `index` of this derived set.
    pub fn weight_index(&self, index: usize) -> Option<usize> {
        let mut deriv = self.derivation.as_ref()?;
        let mut idx = index;
        loop {
            let (first_idx, _) = *deriv.pairs.get(idx)?;
            match deriv.first.as_ref().and_then(|f| f.derivation.as_ref()) {
                Some(parent) => {
                    deriv = parent;
                    idx = first_idx;
                }
                None => return Some(first_idx),
            }
        }
    }

    /// Walks the first-side ancestry and reports the second-set element
    /// index at the deepest level: the data-set index for a one- or
    /// two-level overlay result.
    pub fn data_index(&self, index: usize) -> Option<usize> {
        let mut deriv = self.derivation.as_ref()?;
        let mut idx = index;
        loop {
            let (first_idx, second_idx) = *deriv.pairs.get(idx)?;
            match deriv.first.as_ref().and_then(|f| f.derivation.as_ref()) {
                Some(parent) => {
                    deriv = parent;
                    idx = first_idx;
                }
                None => return Some(second_idx),
            }
        }
    }

    /// The second-set element index at this level: the grid cell for a
    /// two-level overlay result.
    pub fn grid_index(&self, index: usize) -> Option<usize> {
        Some(self.derivation.as_ref()?.pairs.get(index)?.1)
    }

    /// The deepest first-side ancestor set (the original weight set).
    pub fn weight_set(&self) -> Option<&PolySet> {
        let mut deriv = self.derivation.as_ref()?;
        loop {
            let first = deriv.first.as_ref()?;
            match first.derivation.as_ref() {
                Some(parent) => deriv = parent,
                None => return Some(first.as_ref()),
            }
        }
    }

    /// The second set at the deepest first-side level (the original data
    /// set).
    pub fn data_set(&self) -> Option<&PolySet> {
        let mut deriv = self.derivation.as_ref()?;
        loop {
            match deriv.first.as_ref().and_then(|f| f.derivation.as_ref()) {
                Some(parent) => deriv = parent,
                None => return Some(deriv.second.as_ref()),
            }
        }
    }

    /// The second set at this level (the grid set for a two-level result).
    pub fn grid_set(&self) -> Option<&PolySet> {
        self.derivation.as_ref().map(|d| d.second.as_ref())
    }

    /// Builds a set from a shapefile's records.
    ///
    /// `attrs` selects DBF fields to attach, as (name, category) pairs; a
    /// name missing from the file is an error listing the available fields.
    /// Records whose boxes do not overlap `window` (given in file
    /// coordinates) are dropped before conversion. With `projection` set,
    /// every vertex is transformed and the boxes are computed from the
    /// transformed geometry.
    pub fn from_shapefile(
        sf: &Shapefile,
        attrs: &[(String, i32)],
        window: Option<&BoundingBox>,
        projection: Option<&ProjectionContext>,
    ) -> Result<PolySet, Error> {
        let kind = match sf.header.shape_type.base_shape_type() {
            ShapeType::Polygon => ShapeKind::Polygon,
            ShapeType::PolyLine => ShapeKind::Arc,
            ShapeType::Point | ShapeType::MultiPoint => ShapeKind::Point,
            _ => {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    format!(
                        "Geometry of type {} is not supported for overlay processing.",
                        sf.header.shape_type
                    ),
                ));
            }
        };

        // resolve the attribute selection up front
        let mut fields = Vec::with_capacity(attrs.len());
        let mut descs = Vec::with_capacity(attrs.len());
        for (name, category) in attrs {
            let field_num = match sf.attributes.get_field_num(name) {
                Some(f) => f,
                None => {
                    let available: Vec<String> = sf
                        .attributes
                        .fields
                        .iter()
                        .map(|f| f.name.clone())
                        .collect();
                    return Err(Error::new(
                        ErrorKind::InvalidInput,
                        format!(
                            "Attribute {} was not located in the file. Available attributes: {}.",
                            name,
                            available.join(", ")
                        ),
                    ));
                }
            };
            let field = sf.attributes.get_field(field_num);
            let attr_kind = match field.field_type {
                'N' | 'F' | 'I' | 'O' => {
                    if field.decimal_count == 0 {
                        AttributeKind::Int
                    } else {
                        AttributeKind::Double
                    }
                }
                _ => AttributeKind::Str,
            };
            fields.push(field_num);
            descs.push(AttributeDesc {
                name: name.clone(),
                kind: attr_kind,
                category: *category,
            });
        }

        let mut set = PolySet::new(kind);
        let mut rows: Vec<Vec<AttributeValue>> = vec![];
        for record_num in 0..sf.num_records {
            let record = sf.get_record(record_num);
            if record.shape_type == ShapeType::Null {
                continue;
            }
            if let Some(win) = window {
                let rb = if record.shape_type.base_shape_type() == ShapeType::Point {
                    BoundingBox::new(
                        record.points[0].x,
                        record.points[0].x,
                        record.points[0].y,
                        record.points[0].y,
                    )
                } else {
                    BoundingBox::new(record.x_min, record.x_max, record.y_min, record.y_max)
                };
                if !win.overlaps(rb) {
                    continue;
                }
            }

            let mut shape = PolyShape::new();
            match kind {
                ShapeKind::Polygon => {
                    for part in 0..record.num_parts as usize {
                        let mut points = record.get_part(part).to_vec();
                        if points.len() > 3 && points[0] == points[points.len() - 1] {
                            points.pop(); // drop the duplicated closing vertex
                        }
                        let is_hole = !is_clockwise_order(&points);
                        shape.contours.push(Contour { points, is_hole });
                    }
                }
                ShapeKind::Arc => {
                    for part in 0..record.num_parts as usize {
                        shape.contours.push(Contour {
                            points: record.get_part(part).to_vec(),
                            is_hole: false,
                        });
                    }
                }
                ShapeKind::Point => {
                    for p in &record.points {
                        shape.contours.push(Contour {
                            points: vec![*p],
                            is_hole: false,
                        });
                    }
                }
            }
            if let Some(proj) = projection {
                for contour in shape.contours.iter_mut() {
                    for p in contour.points.iter_mut() {
                        let (x, y) = proj.project(p.x, p.y)?;
                        p.x = x;
                        p.y = y;
                    }
                }
            }
            set.add_shape(shape);

            if !descs.is_empty() {
                let mut row = Vec::with_capacity(fields.len());
                for (k, &field_num) in fields.iter().enumerate() {
                    let value = sf.attributes.get_field_value(record_num, field_num);
                    row.push(convert_field(value, descs[k].kind));
                }
                rows.push(row);
            }
        }
        if !descs.is_empty() {
            set.attributes = Some(AttributeTable { descs, rows });
        }
        Ok(set)
    }

    /// Folds together all shapes sharing the first attribute's value; the
    /// first occurrence keeps its position and later duplicates contribute
    /// their contours. Blank and zero identifiers never merge. A set without
    /// attributes is returned unchanged.
    pub fn merged_by_id(mut self) -> PolySet {
        let table = match self.attributes.take() {
            Some(t) => t,
            None => return self,
        };
        let mut merged = PolySet::new(self.kind);
        let mut rows: Vec<Vec<AttributeValue>> = vec![];
        let mut index_of: HashMap<String, usize> = HashMap::new();
        for (shape, row) in self.shapes.into_iter().zip(table.rows.into_iter()) {
            let id = row
                .get(0)
                .map(|v| v.as_string())
                .unwrap_or_default()
                .trim()
                .to_string();
            if !id.is_empty() && id != "0" {
                if let Some(&at) = index_of.get(&id) {
                    merged.shapes[at].contours.extend(shape.contours);
                    continue;
                }
                index_of.insert(id, merged.shapes.len());
            }
            merged.shapes.push(shape);
            merged.boxes.push(BoundingBox::default());
            rows.push(row);
        }
        merged.attributes = Some(AttributeTable {
            descs: table.descs,
            rows,
        });
        merged.recompute_bounding_boxes();
        merged
    }

    /// A point-kind set holding each shape's vertex-average centroid, with
    /// the attribute rows carried over.
    pub fn centroid_set(&self) -> PolySet {
        let mut centroids = PolySet::new(ShapeKind::Point);
        for shape in &self.shapes {
            let mut sum_x = 0f64;
            let mut sum_y = 0f64;
            let mut n = 0usize;
            for contour in &shape.contours {
                for p in &contour.points {
                    sum_x += p.x;
                    sum_y += p.y;
                    n += 1;
                }
            }
            let centre = if n > 0 {
                Point2D::new(sum_x / n as f64, sum_y / n as f64)
            } else {
                Point2D::new(0f64, 0f64)
            };
            centroids.add_shape(PolyShape {
                contours: vec![Contour {
                    points: vec![centre],
                    is_hole: false,
                }],
            });
        }
        centroids.attributes = self.attributes.clone();
        centroids
    }

    /// The weight∩data stage for a job with no weight file: a copy of `data`
    /// whose every element pairs with itself, so plain area/length/count
    /// weighting applies downstream.
    pub fn identity_overlay(data: &Arc<PolySet>) -> PolySet {
        let mut result = PolySet::new(data.kind);
        for shape in &data.shapes {
            result.add_shape(shape.clone());
        }
        result.derivation = Some(Derivation {
            first: Some(data.clone()),
            second: data.clone(),
            pairs: (0..data.shapes.len()).map(|i| (i, i)).collect(),
        });
        result.recompute_bounding_boxes();
        result
    }
}

fn convert_field(value: FieldData, kind: AttributeKind) -> AttributeValue {
    match kind {
        AttributeKind::Int => AttributeValue::Int(match value {
            FieldData::Int(v) => v,
            FieldData::Real(v) => v as i32,
            _ => 0,
        }),
        AttributeKind::Double => AttributeValue::Double(match value {
            FieldData::Int(v) => v as f64,
            FieldData::Real(v) => v,
            _ => 0f64,
        }),
        AttributeKind::Str => AttributeValue::Str(match value {
            FieldData::Text(v) => v,
            FieldData::Int(v) => format!("{}", v),
            FieldData::Real(v) => format!("{}", v),
            FieldData::Date(v) => format!("{}", v),
            FieldData::Bool(v) => (if v { "T" } else { "F" }).to_string(),
            FieldData::Null => String::new(),
        }),
    }
}

#[cfg(test)]
mod test {
    use super::{Contour, Derivation, PolySet, PolyShape, ShapeKind};
    use std::sync::Arc;
    use surrogate_common::structures::Point2D;
    use surrogate_vector::{
        AttributeField, FieldData, FieldDataType, ShapeType, Shapefile, ShapefileGeometry,
    };

    fn square(x0: f64, y0: f64, size: f64) -> PolyShape {
        // clockwise outer ring
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

    #[test]
    fn test_shape_area_with_hole() {
        let mut shape = square(0.0, 0.0, 10.0);
        // counter-clockwise hole of area 4
        shape.contours.push(Contour {
            points: vec![
                Point2D::new(2.0, 2.0),
                Point2D::new(4.0, 2.0),
                Point2D::new(4.0, 4.0),
                Point2D::new(2.0, 4.0),
            ],
            is_hole: true,
        });
        assert!((shape.area() - 96.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_boxes_track_shapes() {
        let mut set = PolySet::new(ShapeKind::Polygon);
        set.add_shape(square(0.0, 0.0, 1.0));
        set.add_shape(square(5.0, 5.0, 2.0));
        assert_eq!(set.num_shapes(), 2);
        assert_eq!(set.bounding_box.min_x, 0.0);
        assert_eq!(set.bounding_box.max_x, 7.0);
        assert_eq!(set.boxes[1].min_y, 5.0);

        set.shapes[0] = square(-3.0, 0.0, 1.0);
        set.recompute_bounding_boxes();
        assert_eq!(set.bounding_box.min_x, -3.0);
    }

    #[test]
    fn test_two_level_chain_walk() {
        let weight = Arc::new({
            let mut s = PolySet::new(ShapeKind::Polygon);
            s.add_shape(square(0.0, 0.0, 1.0));
            s.add_shape(square(2.0, 0.0, 1.0));
            s
        });
        let data = Arc::new({
            let mut s = PolySet::new(ShapeKind::Polygon);
            s.add_shape(square(0.0, 0.0, 4.0));
            s
        });
        let grid = Arc::new({
            let mut s = PolySet::new(ShapeKind::Polygon);
            s.add_shape(square(0.0, 0.0, 2.0));
            s.add_shape(square(2.0, 0.0, 2.0));
            s
        });

        let mut wd = PolySet::new(ShapeKind::Polygon);
        wd.add_shape(square(0.0, 0.0, 1.0));
        wd.add_shape(square(2.0, 0.0, 1.0));
        wd.derivation = Some(Derivation {
            first: Some(weight.clone()),
            second: data.clone(),
            pairs: vec![(0, 0), (1, 0)],
        });
        let wd = Arc::new(wd);

        let mut wdg = PolySet::new(ShapeKind::Polygon);
        wdg.add_shape(square(0.0, 0.0, 1.0));
        wdg.add_shape(square(2.0, 0.0, 1.0));
        wdg.derivation = Some(Derivation {
            first: Some(wd.clone()),
            second: grid.clone(),
            pairs: vec![(0, 0), (1, 1)],
        });

        assert_eq!(wdg.weight_index(0), Some(0));
        assert_eq!(wdg.weight_index(1), Some(1));
        assert_eq!(wdg.data_index(0), Some(0));
        assert_eq!(wdg.data_index(1), Some(0));
        assert_eq!(wdg.grid_index(1), Some(1));
        assert_eq!(wdg.weight_set().map(|s| s.num_shapes()), Some(2));
        assert_eq!(wdg.data_set().map(|s| s.num_shapes()), Some(1));
    }

    fn polygon_file_with_ids(ids: &[&str]) -> Shapefile {
        let mut sf = Shapefile::new("memory.shp", ShapeType::Polygon).unwrap();
        sf.attributes.add_field(&AttributeField::new(
            "FIPS",
            FieldDataType::Text,
            12u8,
            0u8,
        ));
        for (i, id) in ids.iter().enumerate() {
            let x0 = i as f64 * 10.0;
            let mut sfg = ShapefileGeometry::new(ShapeType::Polygon);
            sfg.add_part(&[
                Point2D::new(x0, 0.0),
                Point2D::new(x0, 5.0),
                Point2D::new(x0 + 5.0, 5.0),
                Point2D::new(x0 + 5.0, 0.0),
                Point2D::new(x0, 0.0),
            ]);
            sf.add_record(sfg);
            sf.attributes
                .add_record(vec![FieldData::Text(id.to_string())], false);
        }
        sf
    }

    #[test]
    fn test_from_shapefile_strips_closing_vertex() {
        let sf = polygon_file_with_ids(&["37001"]);
        let set =
            PolySet::from_shapefile(&sf, &[("FIPS".to_string(), 0)], None, None).unwrap();
        assert_eq!(set.kind, ShapeKind::Polygon);
        assert_eq!(set.num_shapes(), 1);
        assert_eq!(set.shapes[0].contours[0].points.len(), 4);
        assert!(!set.shapes[0].contours[0].is_hole);
        assert!((set.shapes[0].area() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_shapefile_window_filters_records() {
        let sf = polygon_file_with_ids(&["37001", "37003", "37005"]);
        let window =
            surrogate_common::structures::BoundingBox::new(-1.0, 6.0, -1.0, 6.0);
        let set = PolySet::from_shapefile(
            &sf,
            &[("FIPS".to_string(), 0)],
            Some(&window),
            None,
        )
        .unwrap();
        assert_eq!(set.num_shapes(), 1);
        let table = set.attributes.unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][0].as_string(), "37001");
    }

    #[test]
    fn test_missing_attribute_is_an_error() {
        let sf = polygon_file_with_ids(&["37001"]);
        let result = PolySet::from_shapefile(&sf, &[("COUNTY".to_string(), 0)], None, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_by_id_folds_duplicates() {
        let sf = polygon_file_with_ids(&["37001", "37003", "37001", "", "0"]);
        let set =
            PolySet::from_shapefile(&sf, &[("FIPS".to_string(), 0)], None, None).unwrap();
        let merged = set.merged_by_id();
        // 37001 absorbs its duplicate; blank and zero ids stay separate
        assert_eq!(merged.num_shapes(), 4);
        assert_eq!(merged.shapes[0].contours.len(), 2);
        assert_eq!(merged.shapes[1].contours.len(), 1);
        let table = merged.attributes.unwrap();
        assert_eq!(table.rows.len(), 4);
        assert_eq!(table.rows[0][0].as_string(), "37001");
        assert_eq!(table.rows[1][0].as_string(), "37003");
    }

    #[test]
    fn test_centroid_set() {
        let mut set = PolySet::new(ShapeKind::Polygon);
        set.add_shape(square(0.0, 0.0, 2.0));
        let centroids = set.centroid_set();
        assert_eq!(centroids.kind, ShapeKind::Point);
        assert_eq!(centroids.num_shapes(), 1);
        let p = centroids.shapes[0].contours[0].points[0];
        assert!((p.x - 1.0).abs() < 1e-9);
        assert!((p.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_identity_overlay_pairs_elements_with_themselves() {
        let data = Arc::new({
            let mut s = PolySet::new(ShapeKind::Polygon);
            s.add_shape(square(0.0, 0.0, 1.0));
            s.add_shape(square(3.0, 0.0, 1.0));
            s
        });
        let wd = PolySet::identity_overlay(&data);
        assert_eq!(wd.num_shapes(), 2);
        assert_eq!(wd.data_index(1), Some(1));
        assert_eq!(wd.weight_index(1), Some(1));
    }
}
