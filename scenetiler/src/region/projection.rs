//! EPSG-to-EPSG reprojection using `proj4rs` and `crs-definitions`.

use geo::{Coord, MapCoords};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use super::{RegionError, RegionGeometry, RegionResult};

/// PROJ.4 definition string for an EPSG code.
fn proj_string(epsg: u32) -> Option<&'static str> {
    u16::try_from(epsg)
        .ok()
        .and_then(crs_definitions::from_code)
        .map(|def| def.proj4)
}

/// Check if an EPSG code represents a geographic (lon/lat) CRS.
pub fn is_geographic_crs(epsg: u32) -> bool {
    match proj_string(epsg) {
        Some(definition) => definition.contains("+proj=longlat"),
        None => (4000..5000).contains(&epsg),
    }
}

struct Projector {
    from: u32,
    to: u32,
    source: Proj,
    target: Proj,
    source_geographic: bool,
    target_geographic: bool,
}

impl Projector {
    fn new(from: u32, to: u32) -> RegionResult<Self> {
        let build = |epsg: u32| -> RegionResult<Proj> {
            let definition = proj_string(epsg).ok_or(RegionError::UnknownCrs(epsg))?;
            Proj::from_proj_string(definition).map_err(|e| RegionError::Projection {
                from,
                to,
                reason: format!("invalid definition for EPSG:{}: {:?}", epsg, e),
            })
        };

        Ok(Self {
            from,
            to,
            source: build(from)?,
            target: build(to)?,
            source_geographic: is_geographic_crs(from),
            target_geographic: is_geographic_crs(to),
        })
    }

    fn project(&self, x: f64, y: f64) -> RegionResult<(f64, f64)> {
        // proj4rs works in radians for geographic coordinates
        let mut point = if self.source_geographic {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };

        transform(&self.source, &self.target, &mut point).map_err(|e| {
            RegionError::Projection {
                from: self.from,
                to: self.to,
                reason: format!("{:?}", e),
            }
        })?;

        if self.target_geographic {
            Ok((point.0.to_degrees(), point.1.to_degrees()))
        } else {
            Ok((point.0, point.1))
        }
    }
}

/// Project a single point between EPSG codes.
pub fn project_point(from: u32, to: u32, x: f64, y: f64) -> RegionResult<(f64, f64)> {
    if from == to {
        return Ok((x, y));
    }
    Projector::new(from, to)?.project(x, y)
}

/// Reproject every vertex of a region into `target_epsg`.
///
/// The buffer radius override is carried over unchanged; it is expressed in
/// the target CRS's units.
pub fn reproject_region(region: &RegionGeometry, target_epsg: u32) -> RegionResult<RegionGeometry> {
    if region.epsg == target_epsg {
        return Ok(region.clone());
    }

    let projector = Projector::new(region.epsg, target_epsg)?;
    let projector = &projector;
    let geometry = region.geometry.try_map_coords(move |c: Coord<f64>| {
        projector
            .project(c.x, c.y)
            .map(|(x, y)| Coord { x, y })
    })?;

    Ok(RegionGeometry {
        name: region.name.clone(),
        geometry,
        epsg: target_epsg,
        buffer_radius: region.buffer_radius,
    })
}
