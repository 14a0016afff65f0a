//! Sequential Monte Carlo state estimation.

#[macro_use]
extern crate ndarray as nd;
extern crate na_core;
extern crate num_traits;
extern crate rand;
extern crate rand_distr;
extern crate rayon;
extern crate serde;
extern crate tracing;

pub use na_core::{Error, Result, Proposal, Transition, ObservationOperator};

pub use particle::{ParticleFilter, Init, Phase, ResamplePolicy,
                   ResampleScheme, StepRecord, Trajectory};
pub use transition::{VarTransition, InitialPrior};

pub mod particle;
pub mod transition;
pub mod utils;
