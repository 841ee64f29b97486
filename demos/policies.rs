//! Runs the stress workload once per allocation policy and prints how
//! fragmentation evolves and how long each run takes.
//!
//! ```text
//! cargo run --release --example policies -- --arena-kib 1000 --chunks 1000 --max-size 1024
//! RUST_LOG=rfreelist=trace cargo run --example policies -- --policy best --iterations 10
//! ```

use std::time::Instant;

use clap::Parser;
use rand::{SeedableRng, rngs::StdRng};
use rfreelist::{
  Heap, HeapConfig, Policy,
  workload::{Workload, WorkloadConfig},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Compare first-, best- and worst-fit on a randomised workload.
#[derive(Parser)]
#[command(name = "policies", long_about = None)]
struct Args {
  /// Only run this policy (first, best or worst)
  #[arg(short, long)]
  policy: Option<Policy>,

  /// Arena size in KiB
  #[arg(long, default_value_t = 1000)]
  arena_kib: usize,

  /// Number of allocations kept alive
  #[arg(long, default_value_t = 1000)]
  chunks: usize,

  /// Largest request in bytes
  #[arg(long, default_value_t = 1022)]
  max_size: usize,

  #[arg(long, default_value_t = 1000)]
  iterations: usize,

  /// Print the fragmentation level every this many iterations
  #[arg(long, default_value_t = 100)]
  report_every: usize,

  /// Seed for the random generator; printed when not given so a run can be replayed
  #[arg(long)]
  seed: Option<u64>,

  /// Walk the whole heap after every operation
  #[arg(long)]
  verify: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env().add_directive("rfreelist=info".parse()?))
    .init();

  let args = Args::parse();
  let seed = args.seed.unwrap_or_else(rand::random);
  let policies = match args.policy {
    Some(policy) => vec![policy],
    None => Policy::ALL.to_vec(),
  };
  let workload = WorkloadConfig {
    chunks: args.chunks,
    max_size: args.max_size,
    iterations: args.iterations,
    report_every: args.report_every,
  };

  info!(seed, "starting workload");

  for policy in policies {
    println!("--------------------------------------------------------");
    println!("Testing heap with \"{policy}\" policy...");

    let config = HeapConfig::new(args.arena_kib * 1024, policy).with_verification(args.verify);
    let mut heap = Heap::with_config(config)?;

    let started = Instant::now();
    let result = Workload::new(&mut heap, workload, StdRng::seed_from_u64(seed)).run(|report| {
      println!("Iteration #{}: {}", report.iteration, report.fragmentation_level);
    });
    let elapsed = started.elapsed().as_millis();

    match result {
      Ok(summary) => println!(
        "Test status: OK (in {elapsed} ms, {} allocations, peak fragmentation {:.3})",
        summary.allocations, summary.peak_fragmentation_level
      ),
      Err(error) => println!("Test status: FAILED! (in {elapsed} ms, seed {seed}): {error}"),
    }
  }

  Ok(())
}
