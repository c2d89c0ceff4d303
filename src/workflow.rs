//! End to end runs: empirical variogram, model fit, then kriging or simulation on a dense grid.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use crate::config::GeostatConfig;
use crate::error::{GeostatError, Result};
use crate::geometry::aabb::dense_grid;
use crate::kriging::ordinary_kriging::OrdinaryKriging;
use crate::kriging::{Estimation, KrigingProfile};
use crate::simulation::progress::ProgressSink;
use crate::simulation::sgs::{SimulationProfile, SGS};
use crate::spatial_database::point_set::PointSet;
use crate::spatial_database::PointSource;
use crate::variography::experimental::EmpiricalVariogram;
use crate::variography::model_variograms::iso_fitter::FittedVariogram;

/// How far a run goes. Kriging and simulation are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Workflow {
    Variogram,
    Fit,
    Kriging,
    Simulation,
}

impl Workflow {
    pub fn name(&self) -> &'static str {
        match self {
            Workflow::Variogram => "variogram",
            Workflow::Fit => "fit",
            Workflow::Kriging => "kriging",
            Workflow::Simulation => "simulation",
        }
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Workflow {
    type Err = GeostatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "variogram" => Ok(Workflow::Variogram),
            "fit" => Ok(Workflow::Fit),
            "kriging" | "krige" => Ok(Workflow::Kriging),
            "simulation" | "sgs" => Ok(Workflow::Simulation),
            _ => Err(GeostatError::unknown("workflow", s)),
        }
    }
}

/// Everything a run produced, stages that did not run are `None`.
#[derive(Debug, Clone)]
pub struct WorkflowOutput {
    pub variogram: EmpiricalVariogram,
    pub model: Option<FittedVariogram>,
    pub grid: Option<PointSet>,
    pub estimates: Option<Vec<Estimation>>,
    pub realizations: Option<Vec<Vec<Estimation>>>,
    pub kriging_profile: Option<KrigingProfile>,
    pub simulation_profile: Option<SimulationProfile>,
}

impl WorkflowOutput {
    fn new(variogram: EmpiricalVariogram) -> Self {
        Self {
            variogram,
            model: None,
            grid: None,
            estimates: None,
            realizations: None,
            kriging_profile: None,
            simulation_profile: None,
        }
    }
}

/// Run `workflow` on the points of `source`.
///
/// # Arguments
/// * `source` - sample points, unobserved points are ignored
/// * `config` - parameters for every stage, validated before any work is done
/// * `workflow` - last stage to run
/// * `progress` - optional per step sink for simulation
#[tracing::instrument(skip_all, fields(workflow = %workflow))]
pub fn run<S>(
    source: &S,
    config: &GeostatConfig,
    workflow: Workflow,
    progress: Option<Arc<dyn ProgressSink>>,
) -> Result<WorkflowOutput>
where
    S: PointSource + ?Sized,
{
    config.validate()?;

    let sample = source.read();
    if sample.is_empty() {
        return Err(GeostatError::Input("point source is empty".to_string()));
    }
    info!(points = sample.len(), dimension = ?sample.dimension, "sample loaded");

    let mut variogram = EmpiricalVariogram::new(sample.clone(), config.variogram);
    variogram.compute()?;

    let mut output = WorkflowOutput::new(variogram);
    if workflow == Workflow::Variogram {
        return Ok(output);
    }

    let model = output.variogram.fit(config.model)?;
    info!(
        model = model.name(),
        range = model.model.params().range,
        sill = model.model.params().sill,
        nugget = model.model.params().nugget,
        "model fitted"
    );
    output.model = Some(model);
    if workflow == Workflow::Fit {
        return Ok(output);
    }

    let grid = dense_grid(&sample.bounding_box()?, &config.grid, sample.dimension)?;
    info!(targets = grid.len(), "target grid built");

    match workflow {
        Workflow::Kriging => {
            let mut kriging = OrdinaryKriging::new(model, config.kriging);
            kriging.fit(&sample);
            output.estimates = Some(kriging.interpolate(&grid)?);
            output.kriging_profile = Some(*kriging.profile());
        }
        Workflow::Simulation => {
            let mut sgs = SGS::new(model, config.simulation);
            if let Some(sink) = progress {
                sgs = sgs.with_progress(sink);
            }
            sgs.fit(&sample);
            output.realizations = Some(sgs.simulate(&grid, config.realizations)?);
            output.simulation_profile = Some(*sgs.profile());
        }
        Workflow::Variogram | Workflow::Fit => {}
    }

    output.grid = Some(grid);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;
    use crate::geometry::{Dimension, SamplePoint};
    use crate::simulation::sgs::SGSParameters;

    fn sample() -> PointSet {
        let mut rng = StdRng::seed_from_u64(21);
        PointSet::new(
            (0..80)
                .map(|_| {
                    let x = rng.gen_range(0.0..20.0);
                    let y = rng.gen_range(0.0..20.0);
                    SamplePoint::planar(x, y, (x / 5.0).sin() * (y / 7.0).cos() + rng.gen_range(-0.1..0.1))
                })
                .collect(),
            Dimension::Planar,
        )
    }

    #[test]
    fn variogram_only() {
        let output = run(&sample(), &GeostatConfig::default(), Workflow::Variogram, None).unwrap();
        assert!(output.variogram.is_computed());
        assert!(output.model.is_none());
        assert!(output.grid.is_none());
    }

    #[test]
    fn kriging_covers_grid() {
        let config = GeostatConfig {
            grid: crate::geometry::aabb::GridSpacing::new(2.0, 2.0, 1.0),
            ..Default::default()
        };
        let output = run(&sample(), &config, Workflow::Kriging, None).unwrap();

        let grid = output.grid.unwrap();
        let estimates = output.estimates.unwrap();
        assert_eq!(estimates.len(), grid.len());
        assert!(output.model.is_some());
        assert!(output.realizations.is_none());
        assert!(estimates.iter().any(|e| e.is_ok()));
    }

    #[test]
    fn simulation_realizations() {
        let config = GeostatConfig {
            grid: crate::geometry::aabb::GridSpacing::new(2.0, 2.0, 1.0),
            realizations: 3,
            simulation: SGSParameters {
                max_points: 16,
                seed: Some(3),
                ..Default::default()
            },
            ..Default::default()
        };
        let output = run(&sample(), &config, Workflow::Simulation, None).unwrap();

        let grid_len = output.grid.unwrap().len();
        let realizations = output.realizations.unwrap();
        assert_eq!(realizations.len(), 3);
        assert!(realizations.iter().all(|r| r.len() == grid_len));
        assert!(output.estimates.is_none());
    }

    #[test]
    fn empty_source_rejected() {
        assert!(matches!(
            run(&PointSet::default(), &GeostatConfig::default(), Workflow::Fit, None),
            Err(GeostatError::Input(_))
        ));
    }

    #[test]
    fn parse_workflow() {
        assert_eq!("SGS".parse::<Workflow>().unwrap(), Workflow::Simulation);
        assert_eq!("kriging".parse::<Workflow>().unwrap(), Workflow::Kriging);
        assert!("cokriging".parse::<Workflow>().is_err());
    }
}
