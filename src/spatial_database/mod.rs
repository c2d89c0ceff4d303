use rand::Rng;

use crate::geometry::SamplePoint;

use self::point_set::PointSet;

pub mod point_set;

/// Anything that can hand the core a set of sampled points.
///
/// File readers live outside the crate and implement this trait; [`PointSet`] implements it
/// for in-memory data.
pub trait PointSource {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> PointSet;

    /// Random subsample of `size` points drawn without replacement.
    ///
    /// Returns every point when `size >= len`.
    fn sample<R>(&self, size: usize, rng: &mut R) -> PointSet
    where
        Self: Sized,
        R: Rng + ?Sized,
    {
        let all = self.read();
        if size >= all.len() {
            return all;
        }

        let points: Vec<SamplePoint> = rand::seq::index::sample(rng, all.len(), size)
            .into_iter()
            .map(|i| all.points[i])
            .collect();

        PointSet::new(points, all.dimension)
    }
}

impl PointSource for PointSet {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn read(&self) -> PointSet {
        self.clone()
    }
}
