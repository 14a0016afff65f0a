//! Poisson likelihood of binned photon counts.

use nd::{Array, ArrayView, Ix1, Ix2, Axis};
use rayon::prelude::*;

use serde::{Deserialize, Serialize};
use statrs::function::gamma::ln_gamma;

use na_core::{Error, Location, ObservationOperator, Result};

use crate::bijector::Blockwise;
use crate::model::SpectralModel;
use crate::response::ResponseEngine;

/// What to do with an expected count that is not strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateGuard {
  /// Report `Error::InvalidRate` for the first offending particle.
  Fail,
  /// Raise finite rates below the floor up to it. Non-finite rates still
  /// fail.
  Clip(f64),
}
impl Default for RateGuard {
  fn default() -> Self { RateGuard::Fail }
}

impl RateGuard {
  pub fn validate(&self) -> Result<()> {
    match *self {
      RateGuard::Clip(floor) if !(floor > 0.0) || !floor.is_finite() => {
        Err(Error::config(format!("rate floor must be finite and positive, got {}", floor)))
      },
      _ => Ok(()),
    }
  }

  fn apply(&self, particle: usize, bin: usize, rate: f64) -> Result<f64> {
    match *self {
      _ if !rate.is_finite() => Err(invalid_rate(particle, bin, rate)),
      RateGuard::Fail if rate <= 0.0 => Err(invalid_rate(particle, bin, rate)),
      RateGuard::Clip(floor) if rate < floor => Ok(floor),
      _ => Ok(rate),
    }
  }
}

fn invalid_rate(particle: usize, bin: usize, rate: f64) -> Error {
  Error::InvalidRate {
    at: Location::particle(particle),
    bin,
    rate,
  }
}

/// Maps filter states through the bijector, the spectral model, and the
/// response, then scores the observed counts under independent Poisson
/// bins.
#[derive(Debug, Clone)]
pub struct PoissonObservation<R> {
  bijector: Blockwise,
  model: SpectralModel,
  response: R,
  guard: RateGuard,
}

impl<R> PoissonObservation<R>
  where R: ResponseEngine,
{
  pub fn new(bijector: Blockwise, model: SpectralModel, response: R,
             guard: RateGuard) -> Result<Self> {
    if bijector.dim() < model.param_dim() {
      return Err(Error::config(format!("model needs {} parameters, bijector provides {}",
                                       model.param_dim(), bijector.dim())));
    }
    guard.validate()?;

    Ok(PoissonObservation {
      bijector,
      model,
      response,
      guard,
    })
  }

  pub fn bijector(&self) -> &Blockwise { &self.bijector }
  pub fn model(&self) -> &SpectralModel { &self.model }
  pub fn response(&self) -> &R { &self.response }
  pub fn guard(&self) -> RateGuard { self.guard }
  pub fn state_dim(&self) -> usize { self.bijector.dim() }

  /// Physical parameters for every particle.
  pub fn parameters(&self, states: ArrayView<f64, Ix2>) -> Result<Array<f64, Ix2>> {
    self.bijector.forward(states)
  }

  /// `[num_particles, state_dim]` states to `[num_particles, num_bins]`
  /// expected counts, before the rate guard.
  pub fn expected_counts(&mut self, states: ArrayView<f64, Ix2>) -> Result<Array<f64, Ix2>> {
    let params = self.bijector.forward(states)?;
    let flux = self.model.evaluate(params.view())?;

    let grid = self.model.grid();
    let response = &self.response;
    let mut counts = Array::zeros(flux.dim());
    let folded: Vec<Result<()>> = counts.axis_iter_mut(Axis(0))
      .into_par_iter()
      .zip(flux.axis_iter(Axis(0)).into_par_iter())
      .map(|(out, row)| response.respond(grid, row, out) )
      .collect();
    folded.into_iter().collect::<Result<()>>()?;
    Ok(counts)
  }
}

fn check_observation(observation: &ArrayView<f64, Ix1>, num_bins: usize) -> Result<()> {
  if observation.len() != num_bins {
    return Err(Error::shape(format!("observation has {} bins, grid {}",
                                    observation.len(), num_bins)));
  }
  if let Some(bin) = observation.iter().position(|&k| !k.is_finite() || k < 0.0 ) {
    return Err(Error::InvalidObservation(format!("count {} in bin {}",
                                                 observation[bin], bin)));
  }
  Ok(())
}

impl<R> ObservationOperator for PoissonObservation<R>
  where R: ResponseEngine,
{
  fn observation_dim(&self) -> usize { self.model.num_bins() }

  fn log_likelihood(&mut self, states: ArrayView<f64, Ix2>,
                    observation: ArrayView<f64, Ix1>)
    -> Result<Array<f64, Ix1>>
  {
    check_observation(&observation, self.model.num_bins())?;
    let rates = self.expected_counts(states)?;

    // ln k! is shared by all particles.
    let log_factorials = observation.mapv(|k| ln_gamma(k + 1.0) );
    let guard = self.guard;
    let scored: Vec<Result<f64>> = rates.axis_iter(Axis(0))
      .into_par_iter()
      .enumerate()
      .map(|(i, row)| {
        let mut sum = 0.0;
        for (bin, ((&rate, &k), &lf)) in row.iter()
          .zip(observation.iter())
          .zip(log_factorials.iter())
          .enumerate()
        {
          let rate = guard.apply(i, bin, rate)?;
          sum += k * rate.ln() - rate - lf;
        }
        Ok(sum)
      })
      .collect();

    let ll: Result<Vec<f64>> = scored.into_iter().collect();
    Ok(Array::from(ll?))
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use nd::{arr1, arr2};
  use na_quadrature::EnergyGrid;
  use crate::bijector::Bijector;
  use crate::component::{Binding, Constant, Gauss, PowerLaw};
  use crate::response::{IdentityResponse, Response};

  fn flat(rate: f64) -> PoissonObservation<Response> {
    let grid = EnergyGrid::from_edges(&[1.0, 2.0, 3.0]).unwrap();
    let model = SpectralModel::new(grid)
      .with(PowerLaw::new(0.0, Binding::Index(0)));
    let response = Response::Identity(IdentityResponse { exposure: rate });
    PoissonObservation::new(Blockwise::identity(1), model, response,
                            RateGuard::Fail)
      .unwrap()
  }

  #[test]
  fn matches_hand_computation() {
    let mut obs = flat(2.0);
    // normalization 1.5 and 0.5, unit bins, exposure 2 -> rates 3 and 1.
    let states = arr2(&[[1.5], [0.5]]);
    let counts = arr1(&[2.0, 4.0]);
    let ll = obs.log_likelihood(states.view(), counts.view()).unwrap();

    let lf2 = 2.0f64.ln();
    let lf4 = 24.0f64.ln();
    let expected0 = (2.0 * 3.0f64.ln() - 3.0 - lf2) + (4.0 * 3.0f64.ln() - 3.0 - lf4);
    let expected1 = (-1.0 - lf2) + (-1.0 - lf4);
    assert!((ll[0] - expected0).abs() < 1e-10);
    assert!((ll[1] - expected1).abs() < 1e-10);
    assert!(ll[0] > ll[1]);
  }

  #[test]
  fn zero_rate_fails() {
    let mut obs = flat(1.0);
    let states = arr2(&[[1.0], [0.0], [-1.0]]);
    match obs.log_likelihood(states.view(), arr1(&[0.0, 0.0]).view()) {
      Err(Error::InvalidRate { at, bin, rate }) => {
        assert_eq!(at.particle, Some(1));
        assert_eq!(bin, 0);
        assert_eq!(rate, 0.0);
      },
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn clipped_rates() {
    let grid = EnergyGrid::from_edges(&[1.0, 2.0, 3.0]).unwrap();
    let model = SpectralModel::new(grid)
      .with(PowerLaw::new(0.0, 1.0))
      .with(Constant::new(Binding::Index(0)));
    let mut obs = PoissonObservation::new(Blockwise::identity(1), model,
                                          Response::default(),
                                          RateGuard::Clip(1e-3))
      .unwrap();
    let ll = obs.log_likelihood(arr2(&[[0.0]]).view(), arr1(&[0.0, 1.0]).view())
      .unwrap();
    let expected = -1e-3 + (1e-3f64.ln() - 1e-3);
    assert!((ll[0] - expected).abs() < 1e-12);

    let bad = PoissonObservation::new(Blockwise::identity(1),
                                      SpectralModel::new(EnergyGrid::from_edges(&[1.0, 2.0]).unwrap()),
                                      Response::default(), RateGuard::Clip(0.0));
    assert!(bad.is_err());
  }

  #[test]
  fn rejects_bad_observations() {
    let mut obs = flat(1.0);
    let states = arr2(&[[1.0]]);
    match obs.log_likelihood(states.view(), arr1(&[1.0]).view()) {
      Err(Error::Shape(_)) => {},
      other => panic!("unexpected {:?}", other),
    }
    for counts in [arr1(&[1.0, -1.0]), arr1(&[1.0, ::std::f64::NAN])].iter() {
      match obs.log_likelihood(states.view(), counts.view()) {
        Err(Error::InvalidObservation(_)) => {},
        other => panic!("unexpected {:?}", other),
      }
    }
  }

  #[test]
  fn bijector_too_narrow() {
    let grid = EnergyGrid::from_edges(&[1.0, 2.0]).unwrap();
    let model = SpectralModel::new(grid)
      .with(PowerLaw::new(Binding::Index(0), Binding::Index(1)));
    let b = Blockwise::new(vec![Bijector::Identity]).unwrap();
    assert!(PoissonObservation::new(b, model, Response::default(),
                                    RateGuard::Fail).is_err());
  }

  #[test]
  fn line_prefers_matching_center() {
    let grid = EnergyGrid::from_edges(&[1.0, 2.0, 3.0, 4.0]).unwrap();
    let model = SpectralModel::new(grid)
      .with(Gauss::new(Binding::Index(0), 0.3, 100.0))
      .with(PowerLaw::new(0.0, 0.01));
    let mut obs = PoissonObservation::new(Blockwise::identity(1), model,
                                          Response::default(), RateGuard::Fail)
      .unwrap();
    let counts = obs.expected_counts(arr2(&[[2.5]]).view()).unwrap();
    assert!(counts[[0, 1]] > counts[[0, 0]]);
    assert!(counts[[0, 1]] > counts[[0, 2]]);

    let observed = arr1(&[1.0, 95.0, 2.0]);
    let ll = obs.log_likelihood(arr2(&[[2.5], [3.5]]).view(), observed.view())
      .unwrap();
    assert!(ll[0] > ll[1]);
  }
}
