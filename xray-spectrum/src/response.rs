//! Folding a model flux into expected detector counts.
//!
//! A real instrument response (redistribution matrices and the like) lives
//! outside this crate; it only has to implement `ResponseEngine`. The
//! engines here cover the cases where the response is diagonal in energy.

use nd::{ArrayView, ArrayViewMut, Ix1, Zip, aview1};

use serde::{Deserialize, Serialize};

use na_core::{Error, Result};
use na_quadrature::EnergyGrid;

/// Pure and deterministic: the same flux always folds to the same counts.
pub trait ResponseEngine: Send + Sync {
  /// Writes the expected counts for one particle's `[num_bins]` flux into
  /// `out`.
  fn respond(&self, grid: &EnergyGrid, flux: ArrayView<f64, Ix1>,
             out: ArrayViewMut<f64, Ix1>) -> Result<()>;
}

fn check_len(grid: &EnergyGrid, flux: &ArrayView<f64, Ix1>,
             out: &ArrayViewMut<f64, Ix1>) -> Result<()> {
  if flux.len() != grid.num_bins() || out.len() != grid.num_bins() {
    return Err(Error::shape(format!("response for {} bins got flux {} / out {}",
                                    grid.num_bins(), flux.len(), out.len())));
  }
  Ok(())
}

/// Counts = flux · exposure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityResponse {
  pub exposure: f64,
}
impl ResponseEngine for IdentityResponse {
  fn respond(&self, grid: &EnergyGrid, flux: ArrayView<f64, Ix1>,
             mut out: ArrayViewMut<f64, Ix1>) -> Result<()> {
    check_len(grid, &flux, &out)?;
    Zip::from(&mut out)
      .and(&flux)
      .for_each(|o, &f| *o = f * self.exposure );
    Ok(())
  }
}

/// Counts = flux · effective area of the bin · exposure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagonalResponse {
  pub effective_area: Vec<f64>,
  pub exposure: f64,
}
impl ResponseEngine for DiagonalResponse {
  fn respond(&self, grid: &EnergyGrid, flux: ArrayView<f64, Ix1>,
             mut out: ArrayViewMut<f64, Ix1>) -> Result<()> {
    check_len(grid, &flux, &out)?;
    if self.effective_area.len() != grid.num_bins() {
      return Err(Error::shape(format!("effective area has {} bins, grid {}",
                                      self.effective_area.len(), grid.num_bins())));
    }
    Zip::from(&mut out)
      .and(&flux)
      .and(aview1(&self.effective_area[..]))
      .for_each(|o, &f, &a| *o = f * a * self.exposure );
    Ok(())
  }
}

/// The engines that can be named in a configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
  Identity(IdentityResponse),
  Diagonal(DiagonalResponse),
}
impl Default for Response {
  fn default() -> Self {
    Response::Identity(IdentityResponse { exposure: 1.0 })
  }
}
impl Response {
  pub fn validate(&self, grid: &EnergyGrid) -> Result<()> {
    let exposure = match self {
      &Response::Identity(ref r) => r.exposure,
      &Response::Diagonal(ref r) => {
        if r.effective_area.len() != grid.num_bins() {
          return Err(Error::config(format!("effective area has {} bins, grid {}",
                                           r.effective_area.len(), grid.num_bins())));
        }
        if r.effective_area.iter().any(|&a| !(a > 0.0) || !a.is_finite() ) {
          return Err(Error::config("effective area must be finite and positive"));
        }
        r.exposure
      },
    };
    if !(exposure > 0.0) || !exposure.is_finite() {
      return Err(Error::config(format!("exposure must be finite and positive, got {}",
                                       exposure)));
    }
    Ok(())
  }
}
impl ResponseEngine for Response {
  fn respond(&self, grid: &EnergyGrid, flux: ArrayView<f64, Ix1>,
             out: ArrayViewMut<f64, Ix1>) -> Result<()> {
    match self {
      &Response::Identity(ref r) => r.respond(grid, flux, out),
      &Response::Diagonal(ref r) => r.respond(grid, flux, out),
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use nd::{Array, arr1};

  #[test]
  fn diagonal_folding() {
    let grid = EnergyGrid::from_edges(&[1.0, 2.0, 3.0]).unwrap();
    let r = DiagonalResponse {
      effective_area: vec![2.0, 0.5],
      exposure: 10.0,
    };
    let mut out = Array::zeros(2);
    r.respond(&grid, arr1(&[1.0, 4.0]).view(), out.view_mut()).unwrap();
    assert_eq!(out, arr1(&[20.0, 20.0]));

    let mut short = Array::zeros(1);
    assert!(r.respond(&grid, arr1(&[1.0, 4.0]).view(), short.view_mut()).is_err());
  }

  #[test]
  fn config_validation() {
    let grid = EnergyGrid::from_edges(&[1.0, 2.0, 3.0]).unwrap();
    assert!(Response::default().validate(&grid).is_ok());
    let bad = Response::Identity(IdentityResponse { exposure: 0.0 });
    assert!(bad.validate(&grid).is_err());
    let bad = Response::Diagonal(DiagonalResponse {
      effective_area: vec![1.0],
      exposure: 1.0,
    });
    assert!(bad.validate(&grid).is_err());
  }

  #[test]
  fn json_shape() {
    let r: Response = serde_json::from_str(
      r#"{"diagonal": {"effective_area": [1.0, 2.0], "exposure": 5.0}}"#)
      .unwrap();
    match r {
      Response::Diagonal(d) => assert_eq!(d.effective_area, vec![1.0, 2.0]),
      other => panic!("unexpected {:?}", other),
    }
  }
}
