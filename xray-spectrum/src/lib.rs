//! Forward model for binned X-ray spectra: components integrated over an
//! energy grid, folded through a response, and scored against observed
//! counts.

extern crate ndarray as nd;
extern crate rayon;
extern crate serde;
extern crate statrs;
extern crate tracing;

extern crate na_core;
extern crate na_quadrature;

#[cfg(test)]
extern crate serde_json;

pub use component::{Binding, Component, Constant, Gauss, PowerLaw, SpectralComponent};
pub use model::SpectralModel;
pub use bijector::{Bijector, Blockwise};
pub use response::{DiagonalResponse, IdentityResponse, Response, ResponseEngine};
pub use observation::{PoissonObservation, RateGuard};

pub mod bijector;
pub mod component;
pub mod model;
pub mod observation;
pub mod response;
