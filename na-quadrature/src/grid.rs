//! Energy bin edges shared by every spectral computation.

use nd::{Array, ArrayView, Ix1, Zip};

use na_core::{Error, Result};

/// Strictly increasing, finite bin edges: `num_bins + 1` of them.
/// Validated once here and immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyGrid {
  edges: Array<f64, Ix1>,
  widths: Array<f64, Ix1>,
}

impl EnergyGrid {
  pub fn new(edges: Array<f64, Ix1>) -> Result<EnergyGrid> {
    if edges.len() < 2 {
      return Err(Error::InvalidGrid(format!("need at least two edges, got {}",
                                            edges.len())));
    }
    if let Some((i, &e)) = edges.indexed_iter().find(|&(_, e)| !e.is_finite() ) {
      return Err(Error::InvalidGrid(format!("edge {} is not finite ({})", i, e)));
    }
    for i in 1..edges.len() {
      if !(edges[i] > edges[i - 1]) {
        return Err(Error::InvalidGrid(format!("bin {} is empty or inverted: [{}, {}]",
                                              i - 1, edges[i - 1], edges[i])));
      }
    }

    let mut widths = Array::zeros(edges.len() - 1);
    Zip::from(&mut widths)
      .and(edges.slice(s![1..]))
      .and(edges.slice(s![..-1]))
      .for_each(|w, &hi, &lo| {
        *w = hi - lo;
      });

    Ok(EnergyGrid {
      edges,
      widths,
    })
  }
  pub fn from_edges(edges: &[f64]) -> Result<EnergyGrid> {
    EnergyGrid::new(Array::from(edges.to_vec()))
  }

  /// `num_bins` evenly spaced bins over `[start, end]`.
  pub fn linear(start: f64, end: f64, num_bins: usize) -> Result<EnergyGrid> {
    if num_bins == 0 {
      return Err(Error::InvalidGrid("zero bins requested".into()));
    }
    EnergyGrid::new(Array::linspace(start, end, num_bins + 1))
  }
  /// `num_bins` bins evenly spaced in log energy; `start` must be positive.
  pub fn logarithmic(start: f64, end: f64, num_bins: usize) -> Result<EnergyGrid> {
    if num_bins == 0 {
      return Err(Error::InvalidGrid("zero bins requested".into()));
    }
    if !(start > 0.0) {
      return Err(Error::InvalidGrid(format!("log grid must start above zero, got {}",
                                            start)));
    }
    let edges = Array::linspace(start.ln(), end.ln(), num_bins + 1)
      .mapv_into(f64::exp);
    EnergyGrid::new(edges)
  }

  pub fn edges(&self) -> ArrayView<f64, Ix1> { self.edges.view() }
  pub fn widths(&self) -> ArrayView<f64, Ix1> { self.widths.view() }
  pub fn num_bins(&self) -> usize { self.widths.len() }
  pub fn num_edges(&self) -> usize { self.edges.len() }
  pub fn lower(&self) -> f64 { self.edges[0] }
  pub fn upper(&self) -> f64 { self.edges[self.edges.len() - 1] }

  pub fn centers(&self) -> Array<f64, Ix1> {
    let lo = self.edges.slice(s![..-1]);
    let hi = self.edges.slice(s![1..]);
    (&lo + &hi) * 0.5
  }

  /// Bins are half open, except the last which includes its upper edge.
  pub fn bin_containing(&self, energy: f64) -> Option<usize> {
    if !(energy >= self.lower() && energy <= self.upper()) {
      return None;
    }
    let edges = self.edges.as_slice()?;
    let idx = edges.partition_point(|&e| e <= energy );
    Some(idx.saturating_sub(1).min(self.num_bins() - 1))
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use nd::arr1;

  #[test]
  fn rejects_bad_edges() {
    assert!(EnergyGrid::from_edges(&[1.0]).is_err());
    assert!(EnergyGrid::from_edges(&[1.0, 1.0, 2.0]).is_err());
    assert!(EnergyGrid::from_edges(&[1.0, 3.0, 2.0]).is_err());
    assert!(EnergyGrid::from_edges(&[1.0, ::std::f64::NAN]).is_err());
    assert!(EnergyGrid::linear(1.0, 2.0, 0).is_err());
    assert!(EnergyGrid::logarithmic(0.0, 2.0, 4).is_err());

    match EnergyGrid::from_edges(&[2.0, 1.0]) {
      Err(Error::InvalidGrid(_)) => {},
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn linear_grid() {
    let g = EnergyGrid::linear(0.5, 10.0, 10).unwrap();
    assert_eq!(g.num_bins(), 10);
    assert_eq!(g.num_edges(), 11);
    assert!((g.upper() - 10.0).abs() < 1e-12);
    for &w in g.widths().iter() {
      assert!((w - 0.95).abs() < 1e-12);
    }
  }

  #[test]
  fn log_grid_is_increasing() {
    let g = EnergyGrid::logarithmic(0.1, 100.0, 30).unwrap();
    assert_eq!(g.num_bins(), 30);
    assert!((g.lower() - 0.1).abs() < 1e-12);
    assert!((g.upper() - 100.0).abs() < 1e-9);
  }

  #[test]
  fn centers_and_lookup() {
    let g = EnergyGrid::from_edges(&[1.0, 2.0, 3.0, 4.0]).unwrap();
    assert_eq!(g.centers(), arr1(&[1.5, 2.5, 3.5]));
    assert_eq!(g.bin_containing(2.5), Some(1));
    assert_eq!(g.bin_containing(2.0), Some(1));
    assert_eq!(g.bin_containing(1.0), Some(0));
    assert_eq!(g.bin_containing(4.0), Some(2));
    assert_eq!(g.bin_containing(0.5), None);
    assert_eq!(g.bin_containing(4.5), None);
  }
}
