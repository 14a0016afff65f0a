//! Per-step output of a filter run.

use nd::{Array, ArrayView, Ix1, Ix2, Ix3, Axis};

use na_core::{Error, Result};

/// What one step leaves behind. The particles are the population carried
/// into the next step (resampled if resampling happened) and `weights`
/// are the matching normalised weights. `mean` and `covariance` are the
/// weighted estimate taken before resampling.
#[derive(Debug, Clone)]
pub struct StepRecord {
  pub step: usize,
  pub particles: Array<f64, Ix2>,
  pub weights: Array<f64, Ix1>,
  pub ess: f64,
  pub resampled: bool,
  pub mean: Array<f64, Ix1>,
  pub covariance: Array<f64, Ix2>,
  pub log_evidence_increment: f64,
}

#[derive(Clone, Debug)]
pub struct Trajectory {
  /// `[num_steps, num_particles, dim]`
  pub particles: Array<f64, Ix3>,
  /// `[num_steps, num_particles]`
  pub weights: Array<f64, Ix2>,
  pub log_evidence: f64,
  pub log_evidence_increments: Array<f64, Ix1>,
  pub ess: Array<f64, Ix1>,
  pub resampled: Vec<bool>,
  pub means: Array<f64, Ix2>,
  pub covariances: Array<f64, Ix3>,
}

impl Trajectory {
  pub fn new(steps: usize, num_particles: usize, n: usize) -> Trajectory {
    Trajectory {
      particles: Array::zeros((steps, num_particles, n)),
      weights: Array::zeros((steps, num_particles)),
      log_evidence: 0.0,
      log_evidence_increments: Array::zeros(steps),
      ess: Array::zeros(steps),
      resampled: vec![false; steps],
      means: Array::zeros((steps, n)),
      covariances: Array::zeros((steps, n, n)),
    }
  }

  pub fn from_records(records: &[StepRecord], num_particles: usize,
                      n: usize) -> Trajectory {
    let mut t = Trajectory::new(records.len(), num_particles, n);
    for (i, r) in records.iter().enumerate() {
      t.store_step(i, r);
    }
    t
  }

  pub fn store_step(&mut self, step: usize, r: &StepRecord) {
    self.particles
      .index_axis_mut(Axis(0), step)
      .assign(&r.particles);
    self.weights
      .index_axis_mut(Axis(0), step)
      .assign(&r.weights);
    self.means
      .index_axis_mut(Axis(0), step)
      .assign(&r.mean);
    self.covariances
      .index_axis_mut(Axis(0), step)
      .assign(&r.covariance);
    self.ess[step] = r.ess;
    self.resampled[step] = r.resampled;
    self.log_evidence_increments[step] = r.log_evidence_increment;
    self.log_evidence = self.log_evidence_increments.sum();
  }

  pub fn num_steps(&self) -> usize { self.particles.dim().0 }
  pub fn num_particles(&self) -> usize { self.particles.dim().1 }
  pub fn dim(&self) -> usize { self.particles.dim().2 }

  /// Weighted per-dimension quantiles, `[num_steps, qs.len(), dim]`.
  pub fn quantiles(&self, qs: &[f64]) -> Result<Array<f64, Ix3>> {
    if let Some(&q) = qs.iter().find(|&&q| !(q >= 0.0 && q <= 1.0) ) {
      return Err(Error::config(format!("quantile {} outside [0, 1]", q)));
    }
    let (steps, _, n) = self.particles.dim();
    let mut out = Array::zeros((steps, qs.len(), n));
    for t in 0..steps {
      let particles = self.particles.index_axis(Axis(0), t);
      let weights = self.weights.index_axis(Axis(0), t);
      for j in 0..n {
        let column = weighted_quantiles(particles.column(j), weights, qs);
        out.slice_mut(s![t, .., j]).assign(&column);
      }
    }
    Ok(out)
  }

  /// Applies `f` to every step's `[num_particles, dim]` population, eg to
  /// move the particles into physical parameter space.
  pub fn map_particles<F>(&self, f: F) -> Result<Array<f64, Ix3>>
    where F: Fn(ArrayView<f64, Ix2>) -> Result<Array<f64, Ix2>>,
  {
    let mut out = self.particles.clone();
    for (mut dst, src) in out.axis_iter_mut(Axis(0)).zip(self.particles.axis_iter(Axis(0))) {
      let mapped = f(src)?;
      if mapped.dim() != src.dim() {
        return Err(Error::shape(format!("mapped particles {:?}, expected {:?}",
                                        mapped.dim(), src.dim())));
      }
      dst.assign(&mapped);
    }
    Ok(out)
  }
}

/// Smallest value whose cumulative normalised weight reaches `q`.
pub fn weighted_quantiles(values: ArrayView<f64, Ix1>,
                          weights: ArrayView<f64, Ix1>,
                          qs: &[f64]) -> Array<f64, Ix1> {
  let mut order: Vec<usize> = (0..values.len()).collect();
  order.sort_by(|&a, &b| values[a].total_cmp(&values[b]) );
  let total = weights.sum();

  let mut cumulative = Vec::with_capacity(order.len());
  let mut acc = 0.0;
  for &i in order.iter() {
    acc += weights[i] / total;
    cumulative.push(acc);
  }

  qs.iter()
    .map(|&q| {
      if order.is_empty() {
        return ::std::f64::NAN;
      }
      let k = cumulative.partition_point(|&c| c < q );
      values[order[k.min(order.len() - 1)]]
    })
    .collect()
}

#[cfg(test)]
mod test {
  use super::*;
  use nd::{arr1, arr2};

  fn record(step: usize, particles: Array<f64, Ix2>, inc: f64) -> StepRecord {
    let n = particles.dim().0;
    let d = particles.dim().1;
    StepRecord {
      step,
      particles,
      weights: Array::from_elem(n, 1.0 / n as f64),
      ess: n as f64,
      resampled: true,
      mean: Array::zeros(d),
      covariance: Array::zeros((d, d)),
      log_evidence_increment: inc,
    }
  }

  #[test]
  fn collects_records() {
    let records = vec![
      record(0, arr2(&[[1.0], [2.0]]), -1.0),
      record(1, arr2(&[[3.0], [4.0]]), -2.5),
    ];
    let t = Trajectory::from_records(&records, 2, 1);
    assert_eq!(t.num_steps(), 2);
    assert_eq!(t.num_particles(), 2);
    assert_eq!(t.dim(), 1);
    assert_eq!(t.particles[[1, 0, 0]], 3.0);
    assert_eq!(t.log_evidence, -3.5);
    assert_eq!(t.log_evidence_increments, arr1(&[-1.0, -2.5]));
    assert_eq!(t.resampled, vec![true, true]);
  }

  #[test]
  fn empty_run() {
    let t = Trajectory::from_records(&[], 4, 2);
    assert_eq!(t.particles.dim(), (0, 4, 2));
    assert_eq!(t.log_evidence, 0.0);
    assert_eq!(t.quantiles(&[0.5]).unwrap().dim(), (0, 1, 2));
  }

  #[test]
  fn quantiles_follow_weights() {
    let v = arr1(&[3.0, 1.0, 2.0, 4.0]);
    let w = arr1(&[0.1, 0.1, 0.1, 0.7]);
    let q = weighted_quantiles(v.view(), w.view(), &[0.0, 0.15, 0.5, 1.0]);
    assert_eq!(q, arr1(&[1.0, 2.0, 4.0, 4.0]));

    let records = vec![record(0, arr2(&[[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]]), 0.0)];
    let t = Trajectory::from_records(&records, 3, 2);
    let q = t.quantiles(&[0.5]).unwrap();
    assert_eq!(q[[0, 0, 0]], 2.0);
    assert_eq!(q[[0, 0, 1]], 20.0);
    assert!(t.quantiles(&[1.5]).is_err());
  }

  #[test]
  fn map_particles() {
    let records = vec![record(0, arr2(&[[0.0], [1.0]]), 0.0)];
    let t = Trajectory::from_records(&records, 2, 1);
    let m = t.map_particles(|p| Ok(p.mapv(f64::exp)) ).unwrap();
    assert_eq!(m[[0, 0, 0]], 1.0);
    assert_eq!(m[[0, 1, 0]], 1.0f64.exp());
    assert!(t.map_particles(|_| Ok(Array::zeros((1, 1))) ).is_err());
  }
}
