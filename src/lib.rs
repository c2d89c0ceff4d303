pub mod config;
pub mod error;
pub mod geometry;
pub mod kriging;
pub mod simulation;
pub mod spatial_database;
pub mod systems;
pub mod variography;
pub mod workflow;

pub use error::{GeostatError, Result};

pub mod prelude {

    pub mod re_exports {
        pub use nalgebra;
        pub use rand;
    }

    pub use crate::config::GeostatConfig;
    pub use crate::error::{GeostatError, Result};
    pub use crate::geometry::aabb::{dense_grid, BoundingBox, GridSpacing};
    pub use crate::geometry::metric::{DistanceMetric, MetricKind};
    pub use crate::geometry::{Dimension, SamplePoint};
    pub use crate::kriging::ordinary_kriging::OrdinaryKriging;
    pub use crate::kriging::{Estimation, EstimationError, KrigingParameters};
    pub use crate::simulation::progress::{IndicatifProgress, ProgressEvent, ProgressSink};
    pub use crate::simulation::sgs::{SGSParameters, SimulationState, SGS};
    pub use crate::spatial_database::point_set::PointSet;
    pub use crate::spatial_database::PointSource;
    pub use crate::variography::experimental::estimator::Estimator;
    pub use crate::variography::experimental::{EmpiricalVariogram, VariogramParams};
    pub use crate::variography::model_variograms::iso_cubic::IsoCubic;
    pub use crate::variography::model_variograms::iso_exponential::IsoExponential;
    pub use crate::variography::model_variograms::iso_fitter::{fit_variogram, FittedVariogram};
    pub use crate::variography::model_variograms::iso_gaussian::IsoGaussian;
    pub use crate::variography::model_variograms::iso_matern::IsoMatern;
    pub use crate::variography::model_variograms::iso_spherical::IsoSpherical;
    pub use crate::variography::model_variograms::{
        IsoVariogramModel, ModelFamily, ModelParameters, VariogramType,
    };
    pub use crate::workflow::{run, Workflow, WorkflowOutput};
}
