//! Vector autoregressive dynamics and the initial state prior.

use nd::{Array, ArrayView, Ix1, Ix2, Axis};
use rayon::prelude::*;

use rand::Rng;
use rand_distr::StandardNormal;

use na_core::{Error, Result, Proposal, Stream, Transition, stream_rng};

use crate::utils::cholesky_lower;

fn randn<R: Rng>(n: usize, rng: &mut R) -> Array<f64, Ix1> {
  Array::from_shape_simple_fn(n, || rng.sample(StandardNormal) )
}

/// `x_t = A x_{t-1} + ε`, `ε ~ N(0, Σ)`. `A` and `Σ` are fixed at
/// construction and shared read-only by every particle.
#[derive(Debug, Clone)]
pub struct VarTransition {
  coefficients: Array<f64, Ix2>,
  noise_covariance: Array<f64, Ix2>,
  /// Lower Cholesky factor of `noise_covariance`.
  noise_factor: Array<f64, Ix2>,
}

impl VarTransition {
  pub fn new(coefficients: Array<f64, Ix2>,
             noise_covariance: Array<f64, Ix2>) -> Result<VarTransition> {
    let (r, c) = coefficients.dim();
    if r != c {
      return Err(Error::config(format!("coefficient matrix must be square, got {:?}",
                                       coefficients.dim())));
    }
    if noise_covariance.dim() != (r, r) {
      return Err(Error::config(format!("noise covariance {:?} does not match state dim {}",
                                       noise_covariance.dim(), r)));
    }
    if coefficients.iter().any(|v| !v.is_finite() ) {
      return Err(Error::config("coefficient matrix has non-finite entries"));
    }
    let noise_factor = cholesky_lower(noise_covariance.view())?;

    Ok(VarTransition {
      coefficients,
      noise_covariance,
      noise_factor,
    })
  }
  pub fn with_diagonal_noise(coefficients: Array<f64, Ix2>,
                             variances: ArrayView<f64, Ix1>) -> Result<VarTransition> {
    VarTransition::new(coefficients, Array::from_diag(&variances))
  }

  pub fn coefficients(&self) -> ArrayView<f64, Ix2> { self.coefficients.view() }
  pub fn noise_covariance(&self) -> ArrayView<f64, Ix2> { self.noise_covariance.view() }

  /// The kernel applied to every particle: returns the new state and the
  /// noise that was added.
  pub fn propose_particle<R>(&self, prior: ArrayView<f64, Ix1>, rng: &mut R)
    -> (Array<f64, Ix1>, Array<f64, Ix1>)
    where R: Rng,
  {
    let z = randn(prior.len(), rng);
    let noise = self.noise_factor.dot(&z);
    let state = self.coefficients.dot(&prior) + &noise;
    (state, noise)
  }
}

impl Transition for VarTransition {
  fn state_dim(&self) -> usize { self.coefficients.dim().0 }

  fn propose(&self, step: u64, seed: u64,
             states: ArrayView<f64, Ix2>) -> Result<Proposal> {
    let (n, d) = states.dim();
    if d != self.state_dim() {
      return Err(Error::shape(format!("states have dim {}, transition expects {}",
                                      d, self.state_dim())));
    }

    let mut out = Array::zeros((n, d));
    let mut noise = Array::zeros((n, d));
    out.axis_iter_mut(Axis(0))
      .into_par_iter()
      .zip(noise.axis_iter_mut(Axis(0)).into_par_iter())
      .zip(states.axis_iter(Axis(0)).into_par_iter())
      .enumerate()
      .for_each(|(i, ((mut out, mut noise), prior))| {
        let mut rng = stream_rng(seed, step, Stream::Transition(i));
        let (s, e) = self.propose_particle(prior, &mut rng);
        out.assign(&s);
        noise.assign(&e);
      });

    Ok(Proposal {
      states: out,
      noise,
    })
  }
}

/// Diagonal Gaussian the step-0 particles are drawn from.
#[derive(Debug, Clone)]
pub struct InitialPrior {
  mean: Array<f64, Ix1>,
  /// Per-dimension variance.
  variance: Array<f64, Ix1>,
}
impl InitialPrior {
  pub fn new(mean: Array<f64, Ix1>, variance: Array<f64, Ix1>) -> Result<InitialPrior> {
    if mean.len() != variance.len() {
      return Err(Error::config(format!("prior mean has {} entries, variance {}",
                                       mean.len(), variance.len())));
    }
    if mean.iter().any(|v| !v.is_finite() ) {
      return Err(Error::config("prior mean has non-finite entries"));
    }
    if variance.iter().any(|&v| !(v >= 0.0) || !v.is_finite() ) {
      return Err(Error::config("prior variance must be finite and non-negative"));
    }
    Ok(InitialPrior {
      mean,
      variance,
    })
  }

  pub fn dim(&self) -> usize { self.mean.len() }
  pub fn mean(&self) -> ArrayView<f64, Ix1> { self.mean.view() }
  pub fn variance(&self) -> ArrayView<f64, Ix1> { self.variance.view() }

  pub fn sample(&self, num_particles: usize, seed: u64) -> Array<f64, Ix2> {
    let scale = self.variance.mapv(f64::sqrt);
    let mut out = Array::zeros((num_particles, self.dim()));
    out.axis_iter_mut(Axis(0))
      .into_par_iter()
      .enumerate()
      .for_each(|(i, mut row)| {
        let mut rng = stream_rng(seed, 0, Stream::Prior(i));
        let z = randn(row.len(), &mut rng);
        row.assign(&(&self.mean + &(&z * &scale)));
      });
    out
  }
}
