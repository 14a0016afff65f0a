
use nd::{Array, ArrayView, Ix1, Ix2, Axis};
use num_traits::Float;

use na_core::{Error, Result};

/// `ln Σ exp(v_i)`, shifted by the maximum so nothing overflows. Returns
/// NaN if any input is NaN and `-inf` if every input is `-inf` (or `v` is
/// empty); callers treat both as a collapsed population.
pub fn log_sum_exp<F>(v: ArrayView<F, Ix1>) -> F
  where F: Float,
{
  if v.iter().any(|x| x.is_nan() ) {
    return F::nan();
  }
  let max = v.fold(F::neg_infinity(), |m, &x| if x > m { x } else { m } );
  if !max.is_finite() {
    return max;
  }

  let sum = v.fold(F::zero(), |acc, &x| acc + (x - max).exp() );
  max + sum.ln()
}

/// `1 / Σ w_i²` for normalised weights.
pub fn effective_sample_size(weights: ArrayView<f64, Ix1>) -> f64 {
  let sq = weights.fold(0.0, |acc, &w| acc + w * w );
  if sq > 0.0 { sq.recip() } else { 0.0 }
}

/// Mean `[d]` and covariance `[d, d]` of `[n, d]` particles under
/// normalised weights.
pub fn weighted_mean_and_covariance(particles: ArrayView<f64, Ix2>,
                                    weights: ArrayView<f64, Ix1>)
  -> (Array<f64, Ix1>, Array<f64, Ix2>)
{
  let mean = weights.dot(&particles);
  let centered = &particles - &mean.view().insert_axis(Axis(0));
  let scaled = &centered * &weights.insert_axis(Axis(1));
  let covariance = scaled.t().dot(&centered);
  (mean, covariance)
}

/// Lower triangular `L` with `A = L L^T`. `A` must be square, symmetric and
/// positive definite.
pub fn cholesky_lower(a: ArrayView<f64, Ix2>) -> Result<Array<f64, Ix2>> {
  let (m, n) = a.dim();
  if m != n {
    return Err(Error::config(format!("covariance must be square, got {:?}", a.dim())));
  }
  for i in 0..m {
    for j in 0..i {
      let tol = 1e-12 * (a[[i, j]].abs() + a[[j, i]].abs()).max(1.0);
      if (a[[i, j]] - a[[j, i]]).abs() > tol {
        return Err(Error::config(format!("covariance is not symmetric at ({}, {})", i, j)));
      }
    }
  }

  // Row oriented: `r` becomes the upper factor R = L^T.
  let mut r = a.to_owned();
  for k in 0..m {
    let pivot = r[[k, k]];
    if !(pivot > 0.0) || !pivot.is_finite() {
      return Err(Error::config(format!("covariance is not positive definite (pivot {} = {})",
                                       k, pivot)));
    }
    for j in k + 1..m {
      let factor = r[[k, j]] / pivot;
      let t = &r.slice(s![j, j..]) - &(&r.slice(s![k, j..]) * factor);
      r.slice_mut(s![j, j..]).assign(&t);
    }

    let t = pivot.sqrt().recip();
    r.slice_mut(s![k, k..])
      .mapv_inplace(|v| v * t );
  }
  for k in 0..m {
    r.slice_mut(s![k, ..k]).fill(0.0);
  }

  Ok(r.reversed_axes())
}

pub trait PartialEqWithinTol<Rhs, Tol> {
  const STD_TOL: Tol;
  fn partial_eq_within_tol(&self, rhs: &Rhs, tol: Tol) -> bool;

  fn partial_eq_within_std_tol(&self, rhs: &Rhs) -> bool {
    self.partial_eq_within_tol(rhs, Self::STD_TOL)
  }
}

impl PartialEqWithinTol<f64, f64> for f64 {
  const STD_TOL: Self = 1e-9;
  fn partial_eq_within_tol(&self, rhs: &f64, tol: f64) -> bool {
    (self - rhs).abs() <= tol
  }
}
impl<'a, D> PartialEqWithinTol<ArrayView<'a, f64, D>, f64> for ArrayView<'a, f64, D>
  where D: nd::Dimension,
{
  const STD_TOL: f64 = 1e-9;
  fn partial_eq_within_tol(&self, rhs: &ArrayView<'a, f64, D>, tol: f64) -> bool {
    self.shape() == rhs.shape() &&
      self.iter()
        .zip(rhs.iter())
        .all(|(l, r)| l.partial_eq_within_tol(r, tol) )
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use nd::{arr1, arr2};

  #[test]
  fn log_sum_exp_is_stable() {
    let v = arr1(&[1000.0f64, 1000.0]);
    let r = log_sum_exp(v.view());
    assert!(r.partial_eq_within_std_tol(&(1000.0 + 2.0f64.ln())));

    let v = arr1(&[-1000.0f64, -1001.0]);
    let r = log_sum_exp(v.view());
    let expected = -1000.0 + (1.0 + (-1.0f64).exp()).ln();
    assert!(r.partial_eq_within_std_tol(&expected));
  }

  #[test]
  fn log_sum_exp_degenerate() {
    let v = arr1(&[::std::f64::NEG_INFINITY; 3]);
    assert_eq!(log_sum_exp(v.view()), ::std::f64::NEG_INFINITY);
    let v = arr1(&[0.0, ::std::f64::NAN]);
    assert!(log_sum_exp(v.view()).is_nan());
    let v: Array<f64, Ix1> = arr1(&[]);
    assert_eq!(log_sum_exp(v.view()), ::std::f64::NEG_INFINITY);
  }

  #[test]
  fn ess_bounds() {
    let uniform = Array::from_elem(8, 1.0 / 8.0);
    assert!(effective_sample_size(uniform.view()).partial_eq_within_std_tol(&8.0));
    let mut single = Array::zeros(8);
    single[3] = 1.0;
    assert_eq!(effective_sample_size(single.view()), 1.0);
  }

  #[test]
  fn weighted_moments() {
    let x = arr2(&[
      [0.0, 1.0],
      [2.0, 3.0],
    ]);
    let w = arr1(&[0.5, 0.5]);
    let (m, c) = weighted_mean_and_covariance(x.view(), w.view());
    assert_eq!(m, arr1(&[1.0, 2.0]));
    assert_eq!(c, arr2(&[
      [1.0, 1.0],
      [1.0, 1.0],
    ]));
  }

  #[test]
  fn cholesky_llstar() {
    let a = arr2(&[
      [4.0, 12.0, -16.0],
      [12.0, 37.0, -43.0],
      [-16.0, -43.0, 98.0],
    ]);

    let l = cholesky_lower(a.view()).expect("cholesky factorization failed");

    let expected = arr2(&[
      [2.0, 0.0, 0.0],
      [6.0, 1.0, 0.0],
      [-8.0, 5.0, 3.0],
    ]);
    assert_eq!(l, expected);
  }

  #[test]
  fn cholesky_rejects() {
    assert!(cholesky_lower(arr2(&[[1.0, 2.0], [2.0, 1.0]]).view()).is_err());
    assert!(cholesky_lower(arr2(&[[1.0, 0.5], [0.0, 1.0]]).view()).is_err());
    assert!(cholesky_lower(Array::zeros((2, 3)).view()).is_err());
  }
}
