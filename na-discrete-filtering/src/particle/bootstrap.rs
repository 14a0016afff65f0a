//! Bootstrap particle filter: propose from the dynamics, weight by the
//! observation likelihood, resample.

use nd::{Array, ArrayView, Ix1, Ix2, Axis};

use tracing::{debug, info, warn};

use na_core::{Error, Result, ModelStats, ObservationOperator, Stream,
              Transition, stream_rng};

use crate::transition::InitialPrior;
use crate::utils::{effective_sample_size, log_sum_exp,
                   weighted_mean_and_covariance};

use super::resample::{ResamplePolicy, ResampleScheme};
use super::trajectory::{StepRecord, Trajectory};

/// Below this fraction of `num_particles` the effective sample size is
/// logged as a warning.
const LOW_ESS_FRACTION: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct Init {
  pub num_particles: usize,
  pub seed: u64,
  pub policy: ResamplePolicy,
  pub scheme: ResampleScheme,
}
impl Init {
  pub fn new(num_particles: usize, seed: u64) -> Init {
    Init {
      num_particles,
      seed,
      policy: Default::default(),
      scheme: Default::default(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Initialized,
  /// `step` is the index of the last completed step.
  Stepping { step: usize },
  Finished { steps: usize },
}

/// The population carried between steps.
#[derive(Debug)]
struct Workspace {
  particles: Array<f64, Ix2>,
  /// Normalised; uniform right after resampling.
  log_weights: Array<f64, Ix1>,
}

pub struct Algo<T, O>
  where T: Transition,
        O: ObservationOperator,
{
  init: Init,
  prior: InitialPrior,
  transition: ModelStats<T>,
  observer: ModelStats<O>,

  phase: Phase,
  workspace: Option<Workspace>,
  records: Vec<StepRecord>,
}

pub type ParticleFilter<T, O> = Algo<T, O>;

impl<T, O> Algo<T, O>
  where T: Transition,
        O: ObservationOperator,
{
  pub fn new(init: Init, prior: InitialPrior,
             transition: T, observer: O) -> Result<Algo<T, O>> {
    if init.num_particles == 0 {
      return Err(Error::config("need at least one particle"));
    }
    init.policy.validate()?;
    if prior.dim() != transition.state_dim() {
      return Err(Error::config(format!("prior has dim {}, transition {}",
                                       prior.dim(), transition.state_dim())));
    }

    Ok(Algo {
      init,
      prior,
      transition: From::from(transition),
      observer: From::from(observer),

      phase: Phase::Initialized,
      workspace: None,
      records: Vec::new(),
    })
  }

  pub fn phase(&self) -> Phase { self.phase }
  pub fn num_particles(&self) -> usize { self.init.num_particles }
  pub fn state_dim(&self) -> usize { self.prior.dim() }
  pub fn records(&self) -> &[StepRecord] { &self.records[..] }
  pub fn log_evidence(&self) -> f64 {
    self.records.iter().map(|r| r.log_evidence_increment ).sum()
  }
  /// Particle evaluations made by the transition and the observer.
  pub fn model_calls(&self) -> (u64, u64) {
    (self.transition.calls, self.observer.calls)
  }
  pub fn observer(&self) -> &O { &self.observer.model }

  fn next_step(&self) -> Result<usize> {
    match self.phase {
      Phase::Initialized => Ok(0),
      Phase::Stepping { step } => Ok(step + 1),
      Phase::Finished { steps } => Err(Error::Finished(steps)),
    }
  }

  /// Runs one propagate / weight / resample cycle. On error nothing is
  /// recorded and the filter stays at the previous checkpoint.
  pub fn step(&mut self, observation: ArrayView<f64, Ix1>) -> Result<&StepRecord> {
    let t = self.next_step()?;
    let record = self.compute_step(t, observation)
      .map_err(|e| e.at_step(t) )?;

    self.workspace = Some(Workspace {
      particles: record.particles.clone(),
      log_weights: record.weights.mapv(f64::ln),
    });
    self.phase = Phase::Stepping { step: t };
    self.records.push(record);
    Ok(&self.records[t])
  }

  fn compute_step(&mut self, t: usize,
                  observation: ArrayView<f64, Ix1>) -> Result<StepRecord> {
    let n = self.init.num_particles;
    let seed = self.init.seed;

    // propagate
    let (proposed, prior_log_weights) = match self.workspace {
      None => {
        let p = self.prior.sample(n, seed);
        (p, Array::from_elem(n, -(n as f64).ln()))
      },
      Some(ref ws) => {
        let p = self.transition.model
          .propose(t as u64, seed, ws.particles.view())?;
        self.transition.calls += n as u64;
        (p.states, ws.log_weights.clone())
      },
    };
    if proposed.dim() != (n, self.prior.dim()) {
      return Err(Error::shape(format!("proposal has shape {:?}, expected {:?}",
                                      proposed.dim(), (n, self.prior.dim()))));
    }
    debug!(step = t, particles = n, "propagated");

    // weight
    let log_lik = self.observer.model
      .log_likelihood(proposed.view(), observation)?;
    self.observer.calls += n as u64;
    if log_lik.len() != n {
      return Err(Error::shape(format!("{} log-likelihoods for {} particles",
                                      log_lik.len(), n)));
    }

    let log_weights = prior_log_weights + &log_lik;
    let normaliser = log_sum_exp(log_weights.view());
    if !normaliser.is_finite() {
      return Err(Error::DegenerateWeights {
        step: t,
        normaliser,
      });
    }
    let weights = log_weights.mapv(|lw| (lw - normaliser).exp() );
    let ess = effective_sample_size(weights.view());
    let (mean, covariance) = weighted_mean_and_covariance(proposed.view(),
                                                          weights.view());
    debug!(step = t, log_evidence_increment = normaliser, ess, "weighted");
    if ess < LOW_ESS_FRACTION * n as f64 {
      warn!(step = t, ess, particles = n, "effective sample size collapsed");
    }

    // resample
    let resampled = self.init.policy.should_resample(ess, n);
    let (particles, weights) = if resampled {
      let mut rng = stream_rng(seed, t as u64, Stream::Resample);
      let indices = self.init.scheme
        .resample(weights.view(), n, &mut rng)?;
      let particles = proposed.select(Axis(0), &indices[..]);
      debug!(step = t, "resampled");
      (particles, Array::from_elem(n, 1.0 / n as f64))
    } else {
      (proposed, weights)
    };

    Ok(StepRecord {
      step: t,
      particles,
      weights,
      ess,
      resampled,
      mean,
      covariance,
      log_evidence_increment: normaliser,
    })
  }

  /// Filters every row of `[num_steps, observation_dim]` and finishes.
  pub fn run(&mut self, observations: ArrayView<f64, Ix2>) -> Result<()> {
    info!(steps = observations.dim().0,
          particles = self.init.num_particles,
          "starting particle filter");
    for observation in observations.axis_iter(Axis(0)) {
      self.step(observation)?;
    }
    self.phase = Phase::Finished { steps: self.records.len() };
    info!(log_evidence = self.log_evidence(), "particle filter finished");
    Ok(())
  }

  pub fn trajectory(&self) -> Trajectory {
    Trajectory::from_records(&self.records[..], self.init.num_particles,
                             self.prior.dim())
  }

  /// Ends the run, whether or not every observation was consumed, and
  /// returns everything recorded so far.
  pub fn finish(mut self) -> Trajectory {
    self.phase = Phase::Finished { steps: self.records.len() };
    self.trajectory()
  }
}

/// Convenience wrapper: build, run over every observation, finish.
pub fn filter<T, O>(init: Init, prior: InitialPrior, transition: T, observer: O,
                    observations: ArrayView<f64, Ix2>) -> Result<Trajectory>
  where T: Transition,
        O: ObservationOperator,
{
  let mut pf = Algo::new(init, prior, transition, observer)?;
  pf.run(observations)?;
  Ok(pf.finish())
}
