extern crate clap;
extern crate na_core;
extern crate ndarray as nd;
extern crate tracing;
extern crate tracing_subscriber;
extern crate util;

use std::path::PathBuf;
use std::process;

use clap::Parser;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use na_core::Result;

use util::{FilterConfig, ModelTruth, generate_latents_and_observations};
use util::progress::ReportingIterator;

const A0: nd::Axis = nd::Axis(0);

/// Lower, middle and upper quantile of the reported band (median ± 1σ).
const BAND: &'static [f64] = &[0.158_655_253_9, 0.5, 0.841_344_746_1];

/// Simulates counts from a power-law source and tracks its
/// photon index and normalisation with a bootstrap particle filter.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
  /// JSON filter configuration; the built-in power-law setup if omitted.
  #[arg(long)]
  config: Option<PathBuf>,
  /// Number of observation steps to simulate and filter.
  #[arg(long, default_value_t = 20)]
  steps: usize,
  /// Seed for the simulated data. The filter's own seed comes from the
  /// configuration.
  #[arg(long, default_value_t = 1)]
  seed: u64,
  /// Overrides `num_particles` from the configuration.
  #[arg(long)]
  particles: Option<usize>,
  /// No progress bar.
  #[arg(long)]
  quiet: bool,
}

fn run(args: Args) -> Result<()> {
  let mut config = match args.config {
    Some(ref path) => FilterConfig::from_path(path)?,
    None => FilterConfig::default(),
  };
  if let Some(n) = args.particles {
    config.num_particles = n;
  }

  let mut pipeline = config.build()?;
  let bijector = pipeline.observation.bijector().clone();
  let data = generate_latents_and_observations(&mut pipeline, args.steps, args.seed)?;
  let truth = bijector.forward(data.truth())?;

  info!(steps = args.steps, particles = config.num_particles,
        bins = pipeline.grid().num_bins(), "simulated observations");

  let mut pf = pipeline.filter()?;
  let observations = data.observations.axis_iter(A0);
  let steps = if args.quiet {
    ReportingIterator::quiet(observations, "filtering".into())
  } else {
    ReportingIterator::new(observations, "filtering".into())
  };
  for observation in steps {
    pf.step(observation)?;
  }
  let trajectory = pf.finish();

  let mut physical = trajectory.clone();
  physical.particles = trajectory.map_particles(|p| bijector.forward(p) )?;
  let bands = physical.quantiles(BAND)?;

  for t in 0..bands.dim().0 {
    print!("{:>4}", t);
    for j in 0..bands.dim().2 {
      print!("  p{} = {:>9.4} [{:>9.4}, {:>9.4}] (true {:>9.4})",
             j, bands[[t, 1, j]], bands[[t, 0, j]], bands[[t, 2, j]],
             truth[[t, j]]);
    }
    println!();
  }
  println!("log evidence: {}", trajectory.log_evidence);

  Ok(())
}

pub fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env()
                     .unwrap_or_else(|_| EnvFilter::new("info") ))
    .with_writer(::std::io::stderr)
    .init();

  let args = Args::parse();
  if let Err(e) = run(args) {
    error!(location = ?e.location(), "{}", e);
    eprintln!("error: {}", e);
    process::exit(1);
  }
}
