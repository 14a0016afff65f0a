
use nd::{Array, ArrayView, Ix1, Ix2, Axis, Zip};

use na_core::{Error, Result};
use na_quadrature::{EnergyGrid, trapezoid};

use super::{Binding, SpectralComponent, check_flux, check_values};

#[derive(Debug, Clone, PartialEq)]
struct Bound {
  photon_index: Array<f64, Ix1>,
  normalization: Array<f64, Ix1>,
}

/// Additive power law, `K · E^(-Γ)` photons per unit energy.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerLaw {
  pub photon_index: Binding,
  pub normalization: Binding,
  bound: Option<Bound>,
}

impl PowerLaw {
  pub fn new<I, N>(photon_index: I, normalization: N) -> PowerLaw
    where I: Into<Binding>,
          N: Into<Binding>,
  {
    PowerLaw {
      photon_index: photon_index.into(),
      normalization: normalization.into(),
      bound: None,
    }
  }
}

impl SpectralComponent for PowerLaw {
  fn name(&self) -> &'static str { "powerlaw" }
  fn param_dim(&self) -> usize {
    self.photon_index.min_param_dim()
      .max(self.normalization.min_param_dim())
  }

  fn set_parameter(&mut self, params: ArrayView<f64, Ix2>) -> Result<()> {
    self.bound = None;
    let photon_index = self.photon_index.resolve(params)?;
    let normalization = self.normalization.resolve(params)?;
    check_values(&photon_index, "powerlaw.photon_index", |_| true )?;
    check_values(&normalization, "powerlaw.normalization", |_| true )?;
    self.bound = Some(Bound {
      photon_index,
      normalization,
    });
    Ok(())
  }

  fn forward(&self, grid: &EnergyGrid, flux: Array<f64, Ix2>) -> Result<Array<f64, Ix2>> {
    let b = self.bound.as_ref().ok_or(Error::Unbound("powerlaw"))?;
    if !(grid.lower() > 0.0) {
      return Err(Error::InvalidGrid(format!("power law needs positive energies, grid starts at {}",
                                            grid.lower())));
    }
    check_flux(grid, &flux, b.normalization.len())?;

    let n = b.photon_index.len();
    let mut added = trapezoid(grid, |edges: ArrayView<f64, Ix1>| {
      let mut density = Array::zeros((n, edges.len()));
      Zip::from(density.rows_mut())
        .and(&b.photon_index)
        .par_for_each(|mut row, &gamma| {
          Zip::from(&mut row)
            .and(&edges)
            .for_each(|d, &e| {
              *d = e.powf(-gamma);
            });
        });
      density
    })?;
    added *= &b.normalization.view().insert_axis(Axis(1));
    Ok(flux + added)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use nd::arr2;

  #[test]
  fn flat_spectrum() {
    let grid = EnergyGrid::from_edges(&[1.0, 2.0, 4.0]).unwrap();
    let mut p = PowerLaw::new(0.0, 3.0);
    p.set_parameter(Array::zeros((1, 0)).view()).unwrap();
    let flux = p.forward(&grid, Array::zeros((1, 2))).unwrap();
    assert_eq!(flux, arr2(&[[3.0, 6.0]]));
  }

  #[test]
  fn softer_index_falls_faster() {
    let grid = EnergyGrid::linear(0.5, 10.0, 10).unwrap();
    let params = arr2(&[
      [1.0, 1.0],
      [2.5, 1.0],
    ]);
    let mut p = PowerLaw::new(Binding::Index(0), Binding::Index(1));
    p.set_parameter(params.view()).unwrap();
    let flux = p.forward(&grid, Array::zeros((2, 10))).unwrap();
    for row in flux.rows() {
      for i in 1..10 {
        assert!(row[i] < row[i - 1]);
      }
    }
    let ratio0 = flux[[0, 9]] / flux[[0, 0]];
    let ratio1 = flux[[1, 9]] / flux[[1, 0]];
    assert!(ratio1 < ratio0);
  }

  #[test]
  fn needs_positive_energies() {
    let grid = EnergyGrid::from_edges(&[0.0, 1.0]).unwrap();
    let mut p = PowerLaw::new(1.0, 1.0);
    p.set_parameter(Array::zeros((1, 0)).view()).unwrap();
    match p.forward(&grid, Array::zeros((1, 1))) {
      Err(Error::InvalidGrid(_)) => {},
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn rejects_non_finite() {
    let mut p = PowerLaw::new(Binding::Index(0), 1.0);
    let params = arr2(&[[1.0], [::std::f64::INFINITY]]);
    match p.set_parameter(params.view()) {
      Err(Error::InvalidParameter { at, parameter, .. }) => {
        assert_eq!(at.particle, Some(1));
        assert_eq!(parameter, "powerlaw.photon_index");
      },
      other => panic!("unexpected {:?}", other),
    }
  }
}
