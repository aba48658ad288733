/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 05/03/2024
Last Modified: 14/11/2024
License: MIT
*/

//! Coordinate reprojection between PROJ.4 reference systems. Geographic
//! systems exchange coordinates in degrees at this interface; the radian
//! convention of the transform backend is handled internally.

use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use std::io::{Error, ErrorKind};
use surrogate_common::structures::BoundingBox;

/// A reusable source-to-target transform built from two PROJ.4 strings.
pub struct ProjectionContext {
    source: Proj,
    target: Proj,
    identity: bool,
}

impl ProjectionContext {
    pub fn new(source: &str, target: &str) -> Result<ProjectionContext, Error> {
        let identity = source.trim() == target.trim();
        let source_proj = Proj::from_proj_string(source.trim()).map_err(|e| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("Invalid projection description '{}': {}", source.trim(), e),
            )
        })?;
        let target_proj = Proj::from_proj_string(target.trim()).map_err(|e| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("Invalid projection description '{}': {}", target.trim(), e),
            )
        })?;
        Ok(ProjectionContext {
            source: source_proj,
            target: target_proj,
            identity,
        })
    }

    /// Projects a single coordinate, returning it in the target system.
    pub fn project(&self, x: f64, y: f64) -> Result<(f64, f64), Error> {
        if self.identity {
            return Ok((x, y));
        }
        let mut point = (x, y, 0.0);
        if self.source.is_latlong() {
            point.0 = point.0.to_radians();
            point.1 = point.1.to_radians();
        }
        transform(&self.source, &self.target, &mut point).map_err(|e| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("Unable to project ({}, {}): {}", x, y, e),
            )
        })?;
        if self.target.is_latlong() {
            point.0 = point.0.to_degrees();
            point.1 = point.1.to_degrees();
        }
        Ok((point.0, point.1))
    }
}

/// Projects the four corners of a box and returns their extent in the
/// target system.
pub fn project_box(bbox: &BoundingBox, proj: &ProjectionContext) -> Result<BoundingBox, Error> {
    let corners = [
        (bbox.min_x, bbox.min_y),
        (bbox.min_x, bbox.max_y),
        (bbox.max_x, bbox.max_y),
        (bbox.max_x, bbox.min_y),
    ];
    let mut out = BoundingBox::default();
    for &(x, y) in &corners {
        let (px, py) = proj.project(x, y)?;
        out.expand_to_point(px, py);
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::{project_box, ProjectionContext};
    use surrogate_common::structures::BoundingBox;

    const LONGLAT: &str = "+proj=longlat +R=6370997 +no_defs";
    const LAMBERT: &str =
        "+proj=lcc +lat_1=33 +lat_2=45 +lon_0=-97 +lat_0=40 +R=6370997 +units=m +no_defs";

    #[test]
    fn test_identity_projection_passes_through() {
        let proj = ProjectionContext::new(LONGLAT, LONGLAT).unwrap();
        let (x, y) = proj.project(-89.25, 43.07).unwrap();
        assert_eq!(x, -89.25);
        assert_eq!(y, 43.07);
    }

    #[test]
    fn test_geographic_to_lambert() {
        let proj = ProjectionContext::new(LONGLAT, LAMBERT).unwrap();
        // the projection origin maps to the false origin
        let (x, y) = proj.project(-97.0, 40.0).unwrap();
        assert!(x.abs() < 1e-3);
        assert!(y.abs() < 1e-3);
        // a point to the north-east lands in the first quadrant
        let (x, y) = proj.project(-90.0, 45.0).unwrap();
        assert!(x > 0.0 && x.is_finite());
        assert!(y > 0.0 && y.is_finite());
    }

    #[test]
    fn test_lambert_round_trip() {
        let forward = ProjectionContext::new(LONGLAT, LAMBERT).unwrap();
        let back = ProjectionContext::new(LAMBERT, LONGLAT).unwrap();
        let (x, y) = forward.project(-96.0, 38.0).unwrap();
        let (lon, lat) = back.project(x, y).unwrap();
        assert!((lon - -96.0).abs() < 1e-6);
        assert!((lat - 38.0).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_projection_string_is_an_error() {
        assert!(ProjectionContext::new("+proj=nonsense", LONGLAT).is_err());
    }

    #[test]
    fn test_project_box_folds_corners() {
        let proj = ProjectionContext::new(LONGLAT, LAMBERT).unwrap();
        let bbox = BoundingBox::new(-100.0, -90.0, 35.0, 45.0);
        let projected = project_box(&bbox, &proj).unwrap();
        assert!(projected.min_x < projected.max_x);
        assert!(projected.min_y < projected.max_y);
        assert!(projected.min_x.is_finite() && projected.max_y.is_finite());
    }
}
