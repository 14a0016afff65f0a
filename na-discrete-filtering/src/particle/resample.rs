//! Index selection for resampling.

use nd::{ArrayView, Ix1};

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

use serde::{Deserialize, Serialize};

use na_core::{Error, Result};

/// When to resample after a reweight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResamplePolicy {
  /// Every step; the plain bootstrap filter.
  Always,
  /// When the effective sample size is below `fraction * num_particles`.
  EssBelow(f64),
  Never,
}
impl Default for ResamplePolicy {
  fn default() -> Self { ResamplePolicy::Always }
}
impl ResamplePolicy {
  pub fn validate(&self) -> Result<()> {
    match *self {
      ResamplePolicy::EssBelow(f) if !(f > 0.0 && f <= 1.0) => {
        Err(Error::config(format!("ESS fraction must be in (0, 1], got {}", f)))
      },
      _ => Ok(()),
    }
  }
  pub fn should_resample(&self, ess: f64, num_particles: usize) -> bool {
    match *self {
      ResamplePolicy::Always => true,
      ResamplePolicy::EssBelow(f) => ess < f * num_particles as f64,
      ResamplePolicy::Never => false,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleScheme {
  /// One uniform offset, `count` evenly spaced pointers.
  Systematic,
  /// `count` independent categorical draws.
  Multinomial,
}
impl Default for ResampleScheme {
  fn default() -> Self { ResampleScheme::Systematic }
}

fn check_weights(weights: ArrayView<f64, Ix1>) -> Result<f64> {
  if weights.is_empty() {
    return Err(Error::shape("cannot resample from an empty population"));
  }
  if let Some(&w) = weights.iter().find(|&&w| !(w >= 0.0) || !w.is_finite() ) {
    return Err(Error::shape(format!("resampling weight {} is not a finite non-negative number", w)));
  }
  // Summed in index order, the same order the systematic walk uses.
  let total = weights.fold(0.0, |acc, &w| acc + w );
  if !(total > 0.0) {
    return Err(Error::shape("resampling weights sum to zero"));
  }
  Ok(total)
}

impl ResampleScheme {
  /// Draws `count` indices with probability proportional to `weights`.
  /// Weights need not be normalised. A zero `count` draws nothing.
  pub fn resample<R>(&self, weights: ArrayView<f64, Ix1>, count: usize,
                     rng: &mut R) -> Result<Vec<usize>>
    where R: Rng,
  {
    if count == 0 {
      return Ok(Vec::new());
    }
    let total = check_weights(weights)?;

    match *self {
      ResampleScheme::Systematic => {
        let last = weights.iter().rposition(|&w| w > 0.0 ).unwrap_or(0);
        let step = total / count as f64;
        let mut pointer = rng.gen::<f64>() * step;
        let mut out = Vec::with_capacity(count);
        let mut cumulative = weights[0];
        let mut i = 0;
        for _ in 0..count {
          while pointer >= cumulative && i < last {
            i += 1;
            cumulative += weights[i];
          }
          out.push(i);
          pointer += step;
        }
        Ok(out)
      },
      ResampleScheme::Multinomial => {
        let dist = WeightedIndex::new(weights.iter())
          .map_err(|e| Error::shape(format!("multinomial resampling: {}", e)))?;
        Ok(dist.sample_iter(rng).take(count).collect())
      },
    }
  }
}
