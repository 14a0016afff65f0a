
use std::fmt;

use thiserror::Error;

pub type Result<T> = ::std::result::Result<T, Error>;

/// Where in a run an error happened. Both parts are optional: errors raised
/// outside of a filter step have no step, and errors that concern the whole
/// population (eg weight collapse) have no particle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Location {
  pub step: Option<usize>,
  pub particle: Option<usize>,
}
impl Location {
  pub fn particle(particle: usize) -> Location {
    Location {
      step: None,
      particle: Some(particle),
    }
  }
}
impl fmt::Display for Location {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match (self.step, self.particle) {
      (Some(s), Some(p)) => write!(f, "step {}, particle {}", s, p),
      (Some(s), None) => write!(f, "step {}", s),
      (None, Some(p)) => write!(f, "particle {}", p),
      (None, None) => write!(f, "setup"),
    }
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid energy grid: {0}")]
  InvalidGrid(String),
  #[error("invalid parameter `{parameter}` = {value} at {at}")]
  InvalidParameter {
    at: Location,
    parameter: &'static str,
    value: f64,
  },
  #[error("invalid Poisson rate {rate} in bin {bin} at {at}")]
  InvalidRate {
    at: Location,
    bin: usize,
    rate: f64,
  },
  #[error("particle weights collapsed at step {step} (normaliser = {normaliser})")]
  DegenerateWeights {
    step: usize,
    normaliser: f64,
  },
  #[error("invalid observation: {0}")]
  InvalidObservation(String),
  #[error("shape mismatch: {0}")]
  Shape(String),
  #[error("configuration error: {0}")]
  Config(String),
  #[error("component `{0}` used before set_parameter")]
  Unbound(&'static str),
  #[error("filter already finished after {0} steps")]
  Finished(usize),
  #[error(transparent)]
  Io(#[from] std::io::Error),
  #[error(transparent)]
  Json(#[from] serde_json::Error),
}

impl Error {
  pub fn invalid_parameter(particle: usize, parameter: &'static str,
                           value: f64) -> Error {
    Error::InvalidParameter {
      at: Location::particle(particle),
      parameter,
      value,
    }
  }
  pub fn shape<S: Into<String>>(msg: S) -> Error {
    Error::Shape(msg.into())
  }
  pub fn config<S: Into<String>>(msg: S) -> Error {
    Error::Config(msg.into())
  }

  /// Tags particle-local errors with the filter step they were raised in.
  pub fn at_step(mut self, step: usize) -> Error {
    match self {
      Error::InvalidParameter { ref mut at, .. } |
      Error::InvalidRate { ref mut at, .. } => {
        at.step = Some(step);
      },
      _ => {},
    }

    self
  }

  pub fn location(&self) -> Option<Location> {
    match self {
      &Error::InvalidParameter { at, .. } |
      &Error::InvalidRate { at, .. } => Some(at),
      &Error::DegenerateWeights { step, .. } => Some(Location {
        step: Some(step),
        particle: None,
      }),
      _ => None,
    }
  }
}
