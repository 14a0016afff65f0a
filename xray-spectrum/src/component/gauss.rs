//! Gaussian emission line.

use std::f64::consts::PI;

use nd::{Array, ArrayView, Ix1, Ix2, Axis, Zip};

use na_core::{Error, Result};
use na_quadrature::{EnergyGrid, trapezoid};

use super::{Binding, SpectralComponent, check_flux, check_values};

/// `A(E) = 1 / (width √(2π)) · exp(-(E - center)² / (2 width²))`
pub fn gauss_density(energy: f64, center: f64, width: f64) -> f64 {
  let z = (energy - center) / width;
  (-0.5 * z * z).exp() / (width * (2.0 * PI).sqrt())
}

#[derive(Debug, Clone, PartialEq)]
struct Bound {
  center: Array<f64, Ix1>,
  width: Array<f64, Ix1>,
  normalization: Array<f64, Ix1>,
}

/// Additive line: adds `normalization · ∫_bin A(E) dE` to every bin.
#[derive(Debug, Clone, PartialEq)]
pub struct Gauss {
  pub center: Binding,
  pub width: Binding,
  pub normalization: Binding,
  bound: Option<Bound>,
}

impl Gauss {
  pub fn new<C, W, N>(center: C, width: W, normalization: N) -> Gauss
    where C: Into<Binding>,
          W: Into<Binding>,
          N: Into<Binding>,
  {
    Gauss {
      center: center.into(),
      width: width.into(),
      normalization: normalization.into(),
      bound: None,
    }
  }

  /// The bin-integrated line shape `Φ`, `[num_particles, num_bins]`,
  /// without the normalization.
  pub fn profile(&self, grid: &EnergyGrid) -> Result<Array<f64, Ix2>> {
    let b = self.bound.as_ref().ok_or(Error::Unbound("gauss"))?;
    let n = b.center.len();
    trapezoid(grid, |edges: ArrayView<f64, Ix1>| {
      let mut density = Array::zeros((n, edges.len()));
      Zip::from(density.rows_mut())
        .and(&b.center)
        .and(&b.width)
        .par_for_each(|mut row, &center, &width| {
          Zip::from(&mut row)
            .and(&edges)
            .for_each(|d, &e| {
              *d = gauss_density(e, center, width);
            });
        });
      density
    })
  }
}

impl SpectralComponent for Gauss {
  fn name(&self) -> &'static str { "gauss" }
  fn param_dim(&self) -> usize {
    self.center.min_param_dim()
      .max(self.width.min_param_dim())
      .max(self.normalization.min_param_dim())
  }

  fn set_parameter(&mut self, params: ArrayView<f64, Ix2>) -> Result<()> {
    self.bound = None;
    let center = self.center.resolve(params)?;
    let width = self.width.resolve(params)?;
    let normalization = self.normalization.resolve(params)?;
    check_values(&center, "gauss.center", |_| true )?;
    check_values(&width, "gauss.width", |w| w > 0.0 )?;
    check_values(&normalization, "gauss.normalization", |_| true )?;

    self.bound = Some(Bound {
      center,
      width,
      normalization,
    });
    Ok(())
  }

  fn forward(&self, grid: &EnergyGrid, flux: Array<f64, Ix2>) -> Result<Array<f64, Ix2>> {
    let b = self.bound.as_ref().ok_or(Error::Unbound("gauss"))?;
    check_flux(grid, &flux, b.normalization.len())?;
    let mut line = self.profile(grid)?;
    line *= &b.normalization.view().insert_axis(Axis(1));
    Ok(flux + line)
  }
}
