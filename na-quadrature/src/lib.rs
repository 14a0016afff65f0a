//! Integration of continuous spectral densities over energy bins.

#[macro_use]
extern crate ndarray as nd;
extern crate na_core;

#[cfg(test)]
extern crate proptest;

pub use grid::EnergyGrid;
pub use trapezoid::{trapezoid, trapezoid_scalar, integrate_density};

pub mod grid;
pub mod trapezoid;
