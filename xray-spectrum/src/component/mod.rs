//! Spectral components.
//!
//! A component either adds a binned spectrum to the running flux or scales
//! it. The set of components is closed: every shape is a variant of
//! `Component`, and each variant implements `SpectralComponent`. Component
//! attributes are bound to columns of the `[num_particles, param_dim]`
//! parameter matrix (or fixed) when the component is built, and the actual
//! per-particle values are pulled in by `set_parameter` before every
//! `forward`.

use nd::{Array, ArrayView, Ix1, Ix2};

use serde::{Deserialize, Serialize};

use na_core::{Error, Result};
use na_quadrature::EnergyGrid;

pub use self::constant::Constant;
pub use self::gauss::Gauss;
pub use self::powerlaw::PowerLaw;

pub mod constant;
pub mod gauss;
pub mod powerlaw;

/// Where an attribute's per-particle value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Binding {
  /// The same value for every particle.
  Fixed(f64),
  /// Column `i` of the parameter matrix.
  Index(usize),
}
impl Binding {
  /// Smallest parameter width this binding can be resolved against.
  pub fn min_param_dim(&self) -> usize {
    match *self {
      Binding::Fixed(_) => 0,
      Binding::Index(i) => i + 1,
    }
  }

  pub fn resolve(&self, params: ArrayView<f64, Ix2>) -> Result<Array<f64, Ix1>> {
    match *self {
      Binding::Fixed(v) => Ok(Array::from_elem(params.dim().0, v)),
      Binding::Index(i) if i < params.dim().1 => Ok(params.column(i).to_owned()),
      Binding::Index(i) => {
        Err(Error::shape(format!("parameter index {} out of range for {} columns",
                                 i, params.dim().1)))
      },
    }
  }
}
impl From<f64> for Binding {
  fn from(v: f64) -> Binding { Binding::Fixed(v) }
}

/// Checks every particle's value of one attribute.
pub(crate) fn check_values<F>(values: &Array<f64, Ix1>, parameter: &'static str,
                              valid: F) -> Result<()>
  where F: Fn(f64) -> bool,
{
  match values.iter().position(|&v| !v.is_finite() || !valid(v) ) {
    Some(i) => Err(Error::invalid_parameter(i, parameter, values[i])),
    None => Ok(()),
  }
}

pub(crate) fn check_flux(grid: &EnergyGrid, flux: &Array<f64, Ix2>,
                         num_particles: usize) -> Result<()> {
  if flux.dim() != (num_particles, grid.num_bins()) {
    return Err(Error::shape(format!("flux has shape {:?}, expected {:?}",
                                    flux.dim(), (num_particles, grid.num_bins()))));
  }
  Ok(())
}

pub trait SpectralComponent {
  fn name(&self) -> &'static str;
  /// Number of parameter columns the bindings need.
  fn param_dim(&self) -> usize;
  /// Rebinds the component to a new `[num_particles, param_dim]` parameter
  /// matrix. Out-of-domain values fail here, tagged with the particle.
  fn set_parameter(&mut self, params: ArrayView<f64, Ix2>) -> Result<()>;
  /// Takes the accumulated `[num_particles, num_bins]` flux and returns the
  /// updated flux of the same shape.
  fn forward(&self, grid: &EnergyGrid, flux: Array<f64, Ix2>) -> Result<Array<f64, Ix2>>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Component {
  Gauss(Gauss),
  PowerLaw(PowerLaw),
  Constant(Constant),
}

impl Component {
  pub fn is_multiplicative(&self) -> bool {
    match self {
      &Component::Constant(_) => true,
      _ => false,
    }
  }
}

impl SpectralComponent for Component {
  fn name(&self) -> &'static str {
    match self {
      &Component::Gauss(ref c) => c.name(),
      &Component::PowerLaw(ref c) => c.name(),
      &Component::Constant(ref c) => c.name(),
    }
  }
  fn param_dim(&self) -> usize {
    match self {
      &Component::Gauss(ref c) => c.param_dim(),
      &Component::PowerLaw(ref c) => c.param_dim(),
      &Component::Constant(ref c) => c.param_dim(),
    }
  }
  fn set_parameter(&mut self, params: ArrayView<f64, Ix2>) -> Result<()> {
    match self {
      &mut Component::Gauss(ref mut c) => c.set_parameter(params),
      &mut Component::PowerLaw(ref mut c) => c.set_parameter(params),
      &mut Component::Constant(ref mut c) => c.set_parameter(params),
    }
  }
  fn forward(&self, grid: &EnergyGrid, flux: Array<f64, Ix2>) -> Result<Array<f64, Ix2>> {
    match self {
      &Component::Gauss(ref c) => c.forward(grid, flux),
      &Component::PowerLaw(ref c) => c.forward(grid, flux),
      &Component::Constant(ref c) => c.forward(grid, flux),
    }
  }
}

impl From<Gauss> for Component {
  fn from(v: Gauss) -> Component { Component::Gauss(v) }
}
impl From<PowerLaw> for Component {
  fn from(v: PowerLaw) -> Component { Component::PowerLaw(v) }
}
impl From<Constant> for Component {
  fn from(v: Constant) -> Component { Component::Constant(v) }
}

#[cfg(test)]
mod test {
  use super::*;
  use nd::{arr1, arr2};

  #[test]
  fn binding_resolution() {
    let p = arr2(&[
      [1.0, 2.0],
      [3.0, 4.0],
    ]);
    assert_eq!(Binding::Fixed(7.0).resolve(p.view()).unwrap(), arr1(&[7.0, 7.0]));
    assert_eq!(Binding::Index(1).resolve(p.view()).unwrap(), arr1(&[2.0, 4.0]));
    assert!(Binding::Index(2).resolve(p.view()).is_err());
    assert_eq!(Binding::Index(2).min_param_dim(), 3);
    assert_eq!(Binding::Fixed(0.0).min_param_dim(), 0);
  }

  #[test]
  fn binding_json() {
    let b: Binding = serde_json::from_str(r#"{"index": 1}"#).unwrap();
    assert_eq!(b, Binding::Index(1));
    let b: Binding = serde_json::from_str(r#"{"fixed": 6.4}"#).unwrap();
    assert_eq!(b, Binding::Fixed(6.4));
  }
}
