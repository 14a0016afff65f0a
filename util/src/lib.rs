
extern crate ndarray as nd;
extern crate na_core;
extern crate na_discrete_filtering as na_df;
extern crate na_quadrature as na_q;
extern crate xray_spectrum as xray;
extern crate pbr;
extern crate rand;
extern crate rand_distr;
extern crate serde;
extern crate serde_json;
extern crate tracing;

use nd::{ArrayView, Ix2};

pub use config::{FilterConfig, Pipeline, SpectralFilter};
pub use data::{Data, generate_latents_and_observations};

pub mod config;
pub mod data;
pub mod progress;

pub trait ModelTruth<E> {
  fn truth(&self) -> ArrayView<E, Ix2>;
  fn observations(&self) -> ArrayView<E, Ix2>;
}
