use nalgebra::Point3;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{GeostatError, Result};
use crate::geometry::aabb::BoundingBox;
use crate::geometry::metric::DistanceMetric;
use crate::geometry::{Dimension, SamplePoint};

/// Ordered collection of sample points sharing one dimensionality.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PointSet {
    pub points: Vec<SamplePoint>,
    pub dimension: Dimension,
}

impl PointSet {
    pub fn new(points: Vec<SamplePoint>, dimension: Dimension) -> Self {
        Self { points, dimension }
    }

    /// Zip coordinates and values into a point set.
    ///
    /// # Arguments
    /// * `coords` - point locations, z is ignored for planar sets
    /// * `values` - attribute per location, NaN for unobserved
    /// * `dimension` - dimensionality shared by every point
    pub fn from_parts(
        coords: Vec<Point3<f64>>,
        values: Vec<f64>,
        dimension: Dimension,
    ) -> Result<Self> {
        if coords.len() != values.len() {
            return Err(GeostatError::Input(format!(
                "{} coordinates but {} values",
                coords.len(),
                values.len()
            )));
        }

        let points = coords
            .into_iter()
            .zip(values)
            .map(|(mut c, v)| {
                if !dimension.is_3d() {
                    c.z = 0.0;
                }
                SamplePoint::new(c, v)
            })
            .collect();

        Ok(Self { points, dimension })
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline(always)]
    pub fn is_3d(&self) -> bool {
        self.dimension.is_3d()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SamplePoint> {
        self.points.iter()
    }

    /// Copy of the set without unobserved (NaN) points.
    pub fn observed(&self) -> PointSet {
        PointSet {
            points: self
                .points
                .iter()
                .filter(|p| p.is_observed())
                .copied()
                .collect(),
            dimension: self.dimension,
        }
    }

    pub fn bounding_box(&self) -> Result<BoundingBox> {
        BoundingBox::from_points(self.points.iter())
    }

    /// Up to `k` nearest points to `target` as `(index, distance)`, closest first.
    ///
    /// Equal distances are ordered by index.
    pub fn nearest(
        &self,
        target: &Point3<f64>,
        k: usize,
        metric: &DistanceMetric,
    ) -> Vec<(usize, f64)> {
        let mut dists = self
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| (OrderedFloat(metric.compute(target, &p.coords)), i))
            .collect::<Vec<_>>();

        if k < dists.len() {
            dists.select_nth_unstable(k);
            dists.truncate(k);
        }
        dists.sort_unstable();

        dists.into_iter().map(|(d, i)| (i, d.0)).collect()
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a SamplePoint;
    type IntoIter = std::slice::Iter<'a, SamplePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
