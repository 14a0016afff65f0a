extern crate ndarray as nd;
extern crate rand;
extern crate rand_isaac;
extern crate thiserror;
extern crate serde_json;

use nd::prelude::*;
use nd::{Data};

pub use error::{Result, Error, Location};
pub use rng::{Stream, StreamRng, stream_rng, stream_seed};

pub mod error;
pub mod rng;

/// One-step-ahead proposal for a batch of particles, `[num_particles,
/// state_dim]` each.
#[derive(Debug, Clone)]
pub struct Proposal {
  pub states: Array<f64, Ix2>,
  /// The process noise that was added to each particle.
  pub noise: Array<f64, Ix2>,
}

pub trait Transition: Send + Sync {
  fn state_dim(&self) -> usize;
  /// Must not touch `states`; returns fresh arrays. Randomness comes only
  /// from streams keyed by `seed` and `step`.
  fn propose(&self, step: u64, seed: u64,
             states: ArrayView<f64, Ix2>) -> Result<Proposal>;
}

pub trait ObservationOperator {
  fn observation_dim(&self) -> usize;
  /// One log-weight per particle for the observation of a single step.
  fn log_likelihood(&mut self, states: ArrayView<f64, Ix2>,
                    observation: ArrayView<f64, Ix1>)
    -> Result<Array<f64, Ix1>>;
}

#[derive(Debug)]
pub struct ModelStats<M> {
  pub model: M,
  pub calls: u64,
}
impl<M> From<M> for ModelStats<M> {
  fn from(v: M) -> ModelStats<M> {
    ModelStats {
      model: v,
      calls: 0,
    }
  }
}

/// A bare matrix is a noiseless linear transition.
impl<D> Transition for ArrayBase<D, Ix2>
  where D: Data<Elem = f64> + Send + Sync,
{
  fn state_dim(&self) -> usize { self.dim().1 }
  fn propose(&self, _step: u64, _seed: u64,
             states: ArrayView<f64, Ix2>) -> Result<Proposal> {
    if states.dim().1 != self.dim().1 || self.dim().0 != self.dim().1 {
      return Err(Error::shape(format!("transition {:?} applied to states {:?}",
                                      self.dim(), states.dim())));
    }

    Ok(Proposal {
      states: states.dot(&self.t()),
      noise: Array::zeros(states.dim()),
    })
  }
}
