//! Trapezoidal rule over the bins of an `EnergyGrid`.
//!
//! The batched form is what the spectral components use: the density
//! closure is handed every edge at once and returns one row per batch
//! member (particle, or particle and line), so a whole population is
//! integrated with a handful of array operations.

use nd::{Array, ArrayView, Ix1, Ix2, Axis};

use na_core::{Error, Result};

use crate::grid::EnergyGrid;

/// `f` maps the `[num_edges]` edges to a `[batch, num_edges]` density.
/// Returns `[batch, num_bins]` with entry `0.5 * (f_i + f_{i+1}) * (e_{i+1} - e_i)`.
pub fn trapezoid<F>(grid: &EnergyGrid, f: F) -> Result<Array<f64, Ix2>>
  where F: FnOnce(ArrayView<f64, Ix1>) -> Array<f64, Ix2>,
{
  let density = f(grid.edges());
  integrate_density(grid, density.view())
}

/// Same as `trapezoid`, for a density that was already evaluated at the
/// edges.
pub fn integrate_density(grid: &EnergyGrid,
                         density: ArrayView<f64, Ix2>) -> Result<Array<f64, Ix2>> {
  let (_batch, n) = density.dim();
  if n != grid.num_edges() {
    return Err(Error::shape(format!("density has {} columns for {} edges",
                                    n, grid.num_edges())));
  }

  let lo = density.slice(s![.., ..-1]);
  let hi = density.slice(s![.., 1..]);
  let mut out = &lo + &hi;
  out *= 0.5;
  out *= &grid.widths().insert_axis(Axis(0));
  Ok(out)
}

pub fn trapezoid_scalar<F>(grid: &EnergyGrid, f: F) -> Array<f64, Ix1>
  where F: Fn(f64) -> f64,
{
  let density = grid.edges().mapv(f);
  let lo = density.slice(s![..-1]);
  let hi = density.slice(s![1..]);
  let mut out = &lo + &hi;
  out *= 0.5;
  out *= &grid.widths();
  out
}
