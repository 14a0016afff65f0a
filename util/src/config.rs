//! JSON configuration for a spectral particle filter run.
//!
//! `FilterConfig::default()` is the two-parameter power-law setup: a
//! photon index and a normalisation, both carried in log space by the
//! filter and mapped to physical values through `exp` (and a scale of 10
//! for the normalisation).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use nd::{Array, Ix1, Ix2};

use serde::{Deserialize, Serialize};
use tracing::debug;

use na_core::{Error, Result, Transition};
use na_df::{Init, InitialPrior, ParticleFilter, ResamplePolicy, ResampleScheme,
            VarTransition};
use na_q::EnergyGrid;
use xray::{Bijector, Binding, Blockwise, Component, Constant, Gauss,
           PoissonObservation, PowerLaw, RateGuard, Response, SpectralModel};

/// The observation operator every configured run uses.
pub type SpectralObservation = PoissonObservation<Response>;
pub type SpectralFilter = ParticleFilter<VarTransition, SpectralObservation>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridConfig {
  Linear { start: f64, end: f64, num_bins: usize },
  Logarithmic { start: f64, end: f64, num_bins: usize },
  Edges(Vec<f64>),
}
impl GridConfig {
  pub fn build(&self) -> Result<EnergyGrid> {
    match self {
      &GridConfig::Linear { start, end, num_bins } => {
        EnergyGrid::linear(start, end, num_bins)
      },
      &GridConfig::Logarithmic { start, end, num_bins } => {
        EnergyGrid::logarithmic(start, end, num_bins)
      },
      &GridConfig::Edges(ref edges) => EnergyGrid::from_edges(&edges[..]),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionConfig {
  /// Row-major `A`.
  pub coefficients: Vec<Vec<f64>>,
  pub noise_covariance: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialConfig {
  pub mean: Vec<f64>,
  pub variance: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentConfig {
  Gauss {
    center: Binding,
    width: Binding,
    normalization: Binding,
  },
  PowerLaw {
    photon_index: Binding,
    normalization: Binding,
  },
  Constant {
    factor: Binding,
  },
}
impl ComponentConfig {
  pub fn build(&self) -> Component {
    match *self {
      ComponentConfig::Gauss { center, width, normalization } => {
        Gauss::new(center, width, normalization).into()
      },
      ComponentConfig::PowerLaw { photon_index, normalization } => {
        PowerLaw::new(photon_index, normalization).into()
      },
      ComponentConfig::Constant { factor } => Constant::new(factor).into(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResampleConfig {
  #[serde(default)]
  pub policy: ResamplePolicy,
  #[serde(default)]
  pub scheme: ResampleScheme,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
  pub num_particles: usize,
  pub seed: u64,
  pub grid: GridConfig,
  pub transition: TransitionConfig,
  pub initial: InitialConfig,
  pub components: Vec<ComponentConfig>,
  pub bijector: Vec<Bijector>,
  #[serde(default)]
  pub response: Response,
  #[serde(default)]
  pub resample: ResampleConfig,
  #[serde(default)]
  pub rate_guard: RateGuard,
}

impl Default for FilterConfig {
  fn default() -> Self {
    let scaled_exp = |s| Bijector::Chain(vec![Bijector::Scale(s), Bijector::Exp]);
    FilterConfig {
      num_particles: 1000,
      seed: 0,
      grid: GridConfig::Linear {
        start: 0.5,
        end: 10.0,
        num_bins: 10,
      },
      transition: TransitionConfig {
        coefficients: vec![vec![0.1, 0.0], vec![0.0, 0.1]],
        noise_covariance: vec![vec![0.1, 0.0], vec![0.0, 0.1]],
      },
      initial: InitialConfig {
        mean: vec![0.1, 0.1],
        // standard deviation 0.01
        variance: vec![1e-4, 1e-4],
      },
      components: vec![
        ComponentConfig::PowerLaw {
          photon_index: Binding::Index(0),
          normalization: Binding::Index(1),
        },
      ],
      bijector: vec![scaled_exp(1.0), scaled_exp(10.0)],
      response: Default::default(),
      resample: Default::default(),
      rate_guard: Default::default(),
    }
  }
}

fn matrix(name: &str, rows: &[Vec<f64>]) -> Result<Array<f64, Ix2>> {
  let r = rows.len();
  let c = rows.first().map(|row| row.len() ).unwrap_or(0);
  if rows.iter().any(|row| row.len() != c ) {
    return Err(Error::config(format!("`{}` has ragged rows", name)));
  }
  let flat: Vec<f64> = rows.iter().flat_map(|row| row.iter().cloned() ).collect();
  Array::from_shape_vec((r, c), flat)
    .map_err(|e| Error::config(format!("`{}`: {}", name, e)))
}

/// Everything needed to run (or simulate) one configured filter.
#[derive(Debug, Clone)]
pub struct Pipeline {
  pub init: Init,
  pub prior: InitialPrior,
  pub transition: VarTransition,
  pub observation: SpectralObservation,
}

impl Pipeline {
  pub fn grid(&self) -> &EnergyGrid { self.observation.model().grid() }
  pub fn state_dim(&self) -> usize { self.prior.dim() }

  pub fn filter(self) -> Result<SpectralFilter> {
    ParticleFilter::new(self.init, self.prior, self.transition, self.observation)
  }
}

impl FilterConfig {
  pub fn from_json_str(json: &str) -> Result<FilterConfig> {
    let config: FilterConfig = serde_json::from_str(json)?;
    Ok(config)
  }
  pub fn from_path<P>(path: P) -> Result<FilterConfig>
    where P: AsRef<Path>,
  {
    let mut json = String::new();
    File::open(path)?.read_to_string(&mut json)?;
    FilterConfig::from_json_str(&json[..])
  }
  pub fn to_json_string(&self) -> Result<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }

  /// Checks the configuration by building it.
  pub fn validate(&self) -> Result<()> {
    self.build().map(|_| () )
  }

  pub fn build(&self) -> Result<Pipeline> {
    if self.num_particles == 0 {
      return Err(Error::config("`num_particles` must be positive"));
    }

    let grid = self.grid.build()?;
    self.response.validate(&grid)?;

    let transition = VarTransition::new(matrix("transition.coefficients",
                                               &self.transition.coefficients[..])?,
                                        matrix("transition.noise_covariance",
                                               &self.transition.noise_covariance[..])?)?;
    let prior = InitialPrior::new(Array::from(self.initial.mean.clone()),
                                  Array::<f64, Ix1>::from(self.initial.variance.clone()))?;
    if prior.dim() != transition.state_dim() {
      return Err(Error::config(format!("initial state has dim {}, transition {}",
                                       prior.dim(), transition.state_dim())));
    }

    let bijector = Blockwise::new(self.bijector.clone())?;
    if bijector.dim() != prior.dim() {
      return Err(Error::config(format!("bijector has {} blocks, state dim is {}",
                                       bijector.dim(), prior.dim())));
    }

    let mut model = SpectralModel::new(grid);
    for c in self.components.iter() {
      model.push(c.build());
    }
    let observation = PoissonObservation::new(bijector, model, self.response.clone(),
                                              self.rate_guard)?;

    let init = Init {
      num_particles: self.num_particles,
      seed: self.seed,
      policy: self.resample.policy,
      scheme: self.resample.scheme,
    };
    init.policy.validate()?;

    debug!(num_particles = init.num_particles, state_dim = prior.dim(),
           num_bins = observation.model().num_bins(), "built pipeline");
    Ok(Pipeline {
      init,
      prior,
      transition,
      observation,
    })
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn default_builds() {
    let p = FilterConfig::default().build().unwrap();
    assert_eq!(p.state_dim(), 2);
    assert_eq!(p.grid().num_bins(), 10);
    assert_eq!(p.init.num_particles, 1000);
    assert_eq!(p.init.policy, ResamplePolicy::Always);
    assert_eq!(p.prior.mean().to_vec(), vec![0.1, 0.1]);
    assert_eq!(p.prior.variance().to_vec(), vec![1e-4, 1e-4]);
  }

  #[test]
  fn json_round_trip() {
    let mut config = FilterConfig::default();
    config.components.push(ComponentConfig::Gauss {
      center: Binding::Fixed(6.4),
      width: Binding::Fixed(0.1),
      normalization: Binding::Fixed(0.5),
    });
    config.resample.policy = ResamplePolicy::EssBelow(0.5);
    config.rate_guard = RateGuard::Clip(1e-6);
    let json = config.to_json_string().unwrap();
    let back = FilterConfig::from_json_str(&json[..]).unwrap();
    assert_eq!(back, config);
  }

  #[test]
  fn optional_sections() {
    let json = r#"{
      "num_particles": 10,
      "seed": 3,
      "grid": {"edges": [1.0, 2.0, 3.0, 4.0]},
      "transition": {"coefficients": [[1.0]], "noise_covariance": [[0.01]]},
      "initial": {"mean": [2.5], "variance": [0.1]},
      "components": [
        {"gauss": {"center": {"index": 0}, "width": {"fixed": 0.3}, "normalization": {"fixed": 1.0}}}
      ],
      "bijector": ["identity"]
    }"#;
    let config = FilterConfig::from_json_str(json).unwrap();
    assert_eq!(config.rate_guard, RateGuard::Fail);
    assert_eq!(config.response, Response::default());
    let p = config.build().unwrap();
    assert_eq!(p.grid().num_bins(), 3);
  }

  #[test]
  fn mismatched_dims() {
    let mut config = FilterConfig::default();
    config.initial.mean = vec![0.0];
    config.initial.variance = vec![1.0];
    assert!(config.validate().is_err());

    let mut config = FilterConfig::default();
    config.bijector.pop();
    assert!(config.validate().is_err());

    let mut config = FilterConfig::default();
    config.transition.coefficients = vec![vec![1.0, 0.0], vec![0.0]];
    match config.validate() {
      Err(Error::Config(_)) => {},
      other => panic!("unexpected {:?}", other.map(|_| () )),
    }

    let mut config = FilterConfig::default();
    config.num_particles = 0;
    assert!(config.validate().is_err());
  }

  #[test]
  fn bad_json() {
    match FilterConfig::from_json_str("{\"num_particles\": 1}") {
      Err(Error::Json(_)) => {},
      other => panic!("unexpected {:?}", other.map(|_| () )),
    }
  }
}
