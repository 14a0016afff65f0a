
use nd::{Array, ArrayView, Ix1, Ix2, Axis};

use na_core::{Error, Result};
use na_quadrature::EnergyGrid;

use super::{Binding, SpectralComponent, check_flux, check_values};

/// Multiplicative, energy independent factor (eg a cross-calibration
/// constant). Scales whatever flux precedes it in the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
  pub factor: Binding,
  bound: Option<Array<f64, Ix1>>,
}

impl Constant {
  pub fn new<F>(factor: F) -> Constant
    where F: Into<Binding>,
  {
    Constant {
      factor: factor.into(),
      bound: None,
    }
  }
}

impl SpectralComponent for Constant {
  fn name(&self) -> &'static str { "constant" }
  fn param_dim(&self) -> usize { self.factor.min_param_dim() }

  fn set_parameter(&mut self, params: ArrayView<f64, Ix2>) -> Result<()> {
    self.bound = None;
    let factor = self.factor.resolve(params)?;
    check_values(&factor, "constant.factor", |f| f >= 0.0 )?;
    self.bound = Some(factor);
    Ok(())
  }

  fn forward(&self, grid: &EnergyGrid, mut flux: Array<f64, Ix2>) -> Result<Array<f64, Ix2>> {
    let factor = self.bound.as_ref().ok_or(Error::Unbound("constant"))?;
    check_flux(grid, &flux, factor.len())?;
    flux *= &factor.view().insert_axis(Axis(1));
    Ok(flux)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use nd::arr2;

  #[test]
  fn scales_rows() {
    let grid = EnergyGrid::from_edges(&[1.0, 2.0, 3.0]).unwrap();
    let mut c = Constant::new(Binding::Index(0));
    c.set_parameter(arr2(&[[2.0], [0.5]]).view()).unwrap();
    let flux = c.forward(&grid, arr2(&[[1.0, 2.0], [4.0, 8.0]])).unwrap();
    assert_eq!(flux, arr2(&[[2.0, 4.0], [2.0, 4.0]]));
  }

  #[test]
  fn negative_factor() {
    let mut c = Constant::new(-1.0);
    assert!(c.set_parameter(Array::zeros((2, 0)).view()).is_err());
  }
}
