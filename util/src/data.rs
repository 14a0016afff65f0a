
use nd::{Array, ArrayView, Ix1, Ix2, Axis, Zip};

use rand::Rng;
use rand_distr::{Distribution, Poisson, StandardNormal};

use na_core::{Error, Location, Result, Stream, stream_rng};

use crate::config::Pipeline;
use crate::ModelTruth;

/// A simulated run: the latent path and the counts observed along it.
#[derive(Debug, Clone)]
pub struct Data {
  /// `[steps, state_dim]`
  pub latents: Array<f64, Ix2>,
  /// `[steps, num_bins]`
  pub observations: Array<f64, Ix2>,
}
impl ModelTruth<f64> for Data {
  fn truth(&self) -> ArrayView<f64, Ix2> { self.latents.view() }
  fn observations(&self) -> ArrayView<f64, Ix2> { self.observations.view() }
}

fn randn<R: Rng>(n: usize, rng: &mut R) -> Array<f64, Ix1> {
  Array::from_shape_simple_fn(n, || rng.sample(StandardNormal) )
}

/// Draws a latent path from the pipeline's prior and transition, then
/// Poisson counts around the expected counts of each latent state. The
/// filter's own seed is not used; the same `seed` always gives the same
/// data.
pub fn generate_latents_and_observations(pipeline: &mut Pipeline, steps: usize,
                                         seed: u64) -> Result<Data> {
  let d = pipeline.state_dim();
  let mut latents = Array::zeros((steps, d));

  for t in 0..steps {
    let mut rng = stream_rng(seed, t as u64, Stream::Simulation(0));
    let state = if t == 0 {
      let z = randn(d, &mut rng);
      &pipeline.prior.mean() + &(&z * &pipeline.prior.variance().mapv(f64::sqrt))
    } else {
      let prev = latents.row(t - 1);
      pipeline.transition.propose_particle(prev, &mut rng).0
    };
    latents.row_mut(t).assign(&state);
  }

  let rates = pipeline.observation.expected_counts(latents.view())?;
  let mut observations = Array::zeros(rates.dim());
  for (t, (mut obs, rates)) in observations.axis_iter_mut(Axis(0))
    .zip(rates.axis_iter(Axis(0)))
    .enumerate()
  {
    let mut rng = stream_rng(seed, t as u64, Stream::Simulation(1));
    let mut failed = None;
    Zip::indexed(&mut obs)
      .and(&rates)
      .for_each(|bin, k, &rate| {
        if failed.is_some() { return; }
        if !rate.is_finite() {
          failed = Some((bin, rate));
          return;
        }
        match Poisson::new(rate) {
          Ok(p) => *k = p.sample(&mut rng),
          Err(_) => failed = Some((bin, rate)),
        }
      });
    if let Some((bin, rate)) = failed {
      return Err(Error::InvalidRate {
        at: Location {
          step: Some(t),
          particle: None,
        },
        bin,
        rate,
      });
    }
  }

  Ok(Data {
    latents,
    observations,
  })
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::config::FilterConfig;

  #[test]
  fn deterministic() {
    let mut p = FilterConfig::default().build().unwrap();
    let a = generate_latents_and_observations(&mut p, 5, 11).unwrap();
    let b = generate_latents_and_observations(&mut p, 5, 11).unwrap();
    let c = generate_latents_and_observations(&mut p, 5, 12).unwrap();
    assert_eq!(a.latents, b.latents);
    assert_eq!(a.observations, b.observations);
    assert!(a.latents != c.latents);

    assert_eq!(a.truth().dim(), (5, 2));
    assert_eq!(ModelTruth::observations(&a).dim(), (5, 10));
    assert!(a.observations.iter().all(|&k| k >= 0.0 && k == k.floor() ));
  }

  #[test]
  fn infinite_rate_is_reported() {
    let mut config = FilterConfig::default();
    config.components.push(crate::config::ComponentConfig::Constant {
      factor: xray::Binding::Fixed(::std::f64::MAX),
    });
    let mut p = config.build().unwrap();
    match generate_latents_and_observations(&mut p, 2, 0) {
      Err(Error::InvalidRate { at, rate, .. }) => {
        assert_eq!(at.step, Some(0));
        assert!(rate.is_infinite());
      },
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn zero_rate_is_reported() {
    let mut config = FilterConfig::default();
    config.components.push(crate::config::ComponentConfig::Constant {
      factor: xray::Binding::Fixed(0.0),
    });
    let mut p = config.build().unwrap();
    match generate_latents_and_observations(&mut p, 2, 0) {
      Err(Error::InvalidRate { at, .. }) => assert_eq!(at.step, Some(0)),
      other => panic!("unexpected {:?}", other),
    }
  }
}
