
use nd::{Array, ArrayView, Ix2};

use tracing::trace;

use na_core::{Error, Result};
use na_quadrature::EnergyGrid;

use crate::component::{Component, SpectralComponent};

/// Ordered pipeline of components over one energy grid. Evaluation always
/// follows construction order, which matters once multiplicative
/// components are present.
#[derive(Debug, Clone)]
pub struct SpectralModel {
  grid: EnergyGrid,
  components: Vec<Component>,
}

impl SpectralModel {
  pub fn new(grid: EnergyGrid) -> SpectralModel {
    SpectralModel {
      grid,
      components: Vec::new(),
    }
  }
  pub fn with<C>(mut self, component: C) -> SpectralModel
    where C: Into<Component>,
  {
    self.push(component);
    self
  }
  pub fn push<C>(&mut self, component: C)
    where C: Into<Component>,
  {
    self.components.push(component.into());
  }

  pub fn grid(&self) -> &EnergyGrid { &self.grid }
  pub fn num_bins(&self) -> usize { self.grid.num_bins() }
  pub fn components(&self) -> &[Component] { &self.components[..] }

  /// Number of parameter columns needed by all bindings.
  pub fn param_dim(&self) -> usize {
    self.components
      .iter()
      .map(|c| c.param_dim() )
      .max()
      .unwrap_or(0)
  }

  /// `[num_particles, param_dim]` parameters to `[num_particles, num_bins]`
  /// flux. Starts from zero flux every call.
  pub fn evaluate(&mut self, params: ArrayView<f64, Ix2>) -> Result<Array<f64, Ix2>> {
    if params.dim().1 < self.param_dim() {
      return Err(Error::shape(format!("model needs {} parameters, got {}",
                                      self.param_dim(), params.dim().1)));
    }

    let mut flux = Array::zeros((params.dim().0, self.grid.num_bins()));
    for component in self.components.iter_mut() {
      component.set_parameter(params)?;
      flux = component.forward(&self.grid, flux)?;
      trace!(component = component.name(), "forward");
    }
    Ok(flux)
  }
}
