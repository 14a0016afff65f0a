pub use self::bootstrap::{Algo, Init, ParticleFilter, Phase, filter};
pub use self::resample::{ResamplePolicy, ResampleScheme};
pub use self::trajectory::{StepRecord, Trajectory, weighted_quantiles};

pub mod bootstrap;
pub mod resample;
pub mod trajectory;
