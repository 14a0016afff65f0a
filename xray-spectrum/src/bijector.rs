//! Invertible maps from the unconstrained filter state to physical
//! parameters.

use nd::{Array, ArrayView, Ix2, Axis, Zip};

use serde::{Deserialize, Serialize};

use na_core::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bijector {
  Identity,
  Exp,
  Scale(f64),
  Shift(f64),
  /// Function composition: the last bijector is applied first, so
  /// `Chain([Scale(10), Exp])` maps `x` to `10 exp(x)`.
  Chain(Vec<Bijector>),
}

impl Default for Bijector {
  fn default() -> Self { Bijector::Identity }
}

impl Bijector {
  pub fn validate(&self) -> Result<()> {
    match self {
      &Bijector::Scale(s) if !(s.is_finite() && s != 0.0) => {
        Err(Error::config(format!("scale bijector needs a finite non-zero factor, got {}", s)))
      },
      &Bijector::Shift(s) if !s.is_finite() => {
        Err(Error::config(format!("shift bijector needs a finite offset, got {}", s)))
      },
      &Bijector::Chain(ref links) => {
        links.iter().map(|b| b.validate() ).collect()
      },
      _ => Ok(()),
    }
  }

  pub fn forward(&self, x: f64) -> f64 {
    match self {
      &Bijector::Identity => x,
      &Bijector::Exp => x.exp(),
      &Bijector::Scale(s) => s * x,
      &Bijector::Shift(s) => x + s,
      &Bijector::Chain(ref links) => {
        links.iter().rev().fold(x, |acc, b| b.forward(acc) )
      },
    }
  }

  /// `None` when `y` is outside the image of `forward`.
  pub fn inverse(&self, y: f64) -> Option<f64> {
    match self {
      &Bijector::Identity => Some(y),
      &Bijector::Exp => if y > 0.0 { Some(y.ln()) } else { None },
      &Bijector::Scale(s) => Some(y / s),
      &Bijector::Shift(s) => Some(y - s),
      &Bijector::Chain(ref links) => {
        links.iter().try_fold(y, |acc, b| b.inverse(acc) )
      },
    }
  }
}

/// One scalar bijector per state column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Blockwise {
  blocks: Vec<Bijector>,
}

impl Blockwise {
  pub fn new(blocks: Vec<Bijector>) -> Result<Blockwise> {
    for b in blocks.iter() {
      b.validate()?;
    }
    Ok(Blockwise {
      blocks,
    })
  }
  pub fn identity(dim: usize) -> Blockwise {
    Blockwise {
      blocks: vec![Bijector::Identity; dim],
    }
  }

  pub fn dim(&self) -> usize { self.blocks.len() }
  pub fn blocks(&self) -> &[Bijector] { &self.blocks[..] }

  fn check(&self, x: &ArrayView<f64, Ix2>) -> Result<()> {
    if x.dim().1 != self.dim() {
      return Err(Error::shape(format!("bijector has {} blocks, states have {} columns",
                                      self.dim(), x.dim().1)));
    }
    Ok(())
  }

  pub fn forward(&self, states: ArrayView<f64, Ix2>) -> Result<Array<f64, Ix2>> {
    self.check(&states)?;
    let mut out = states.to_owned();
    for (mut column, b) in out.axis_iter_mut(Axis(1)).zip(self.blocks.iter()) {
      column.mapv_inplace(|v| b.forward(v) );
    }
    Ok(out)
  }

  pub fn inverse(&self, params: ArrayView<f64, Ix2>) -> Result<Array<f64, Ix2>> {
    self.check(&params)?;
    let mut out = Array::zeros(params.dim());
    for (j, b) in self.blocks.iter().enumerate() {
      let mut failed = None;
      Zip::indexed(out.column_mut(j))
        .and(params.column(j))
        .for_each(|i, o, &y| {
          match b.inverse(y) {
            Some(x) => *o = x,
            None => if failed.is_none() { failed = Some((i, y)); },
          }
        });
      if let Some((i, y)) = failed {
        return Err(Error::invalid_parameter(i, "bijector.inverse", y));
      }
    }
    Ok(out)
  }
}
