use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{GeostatError, Result};
use crate::spatial_database::point_set::PointSet;

use super::{Dimension, SamplePoint};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub mins: Point3<f64>,
    pub maxs: Point3<f64>,
}

impl BoundingBox {
    #[inline(always)]
    pub fn new(mins: Point3<f64>, maxs: Point3<f64>) -> Self {
        Self { mins, maxs }
    }

    /// Smallest box containing every point.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a SamplePoint>) -> Result<Self> {
        let mut iter = points.into_iter();
        let first = iter
            .next()
            .ok_or_else(|| GeostatError::Input("cannot bound an empty point set".to_string()))?;

        let (mins, maxs) = iter.fold((first.coords, first.coords), |(mins, maxs), p| {
            (mins.inf(&p.coords), maxs.sup(&p.coords))
        });

        Ok(Self { mins, maxs })
    }

    #[inline(always)]
    pub fn extents(&self) -> Vector3<f64> {
        self.maxs - self.mins
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpacing {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl GridSpacing {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        for (axis, step) in [("x", self.x), ("y", self.y), ("z", self.z)] {
            if !(step.is_finite() && step > 0.0) {
                return Err(GeostatError::Input(format!(
                    "grid spacing along {axis} must be positive and finite, got {step}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for GridSpacing {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

//number of nodes along one axis, always at least one
#[inline(always)]
fn axis_count(extent: f64, step: f64) -> usize {
    ((extent / step).ceil() as usize).max(1)
}

/// Regular grid of unobserved target points covering `bbox`.
///
/// Nodes sit at `min + i * spacing`, ordered with x varying slowest, then y, then z.
/// Planar grids ignore the z extent and spacing.
pub fn dense_grid(
    bbox: &BoundingBox,
    spacing: &GridSpacing,
    dimension: Dimension,
) -> Result<PointSet> {
    spacing.validate()?;

    let extents = bbox.extents();
    let nx = axis_count(extents.x, spacing.x);
    let ny = axis_count(extents.y, spacing.y);
    let nz = if dimension.is_3d() {
        axis_count(extents.z, spacing.z)
    } else {
        1
    };

    let mut points = Vec::with_capacity(nx * ny * nz);
    for i in 0..nx {
        let x = bbox.mins.x + i as f64 * spacing.x;
        for j in 0..ny {
            let y = bbox.mins.y + j as f64 * spacing.y;
            for k in 0..nz {
                let z = if dimension.is_3d() {
                    bbox.mins.z + k as f64 * spacing.z
                } else {
                    0.0
                };
                points.push(SamplePoint::unobserved(Point3::new(x, y, z)));
            }
        }
    }

    Ok(PointSet::new(points, dimension))
}
