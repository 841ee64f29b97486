#![cfg(feature = "workload")]

use rand::{SeedableRng, rngs::StdRng};
use rfreelist::{
  Heap, HeapConfig, Policy,
  workload::{Workload, WorkloadConfig},
};

#[test]
fn best_fit_survives_the_stress_workload() {
  let mut heap = Heap::with_config(HeapConfig::new(64 * 1024, Policy::Best)).unwrap();
  let mut reports = Vec::new();

  let summary = Workload::new(&mut heap, WorkloadConfig::default(), StdRng::seed_from_u64(2024))
    .run(|report| reports.push(*report))
    .unwrap_or_else(|error| panic!("seed 2024: {error}"));

  assert_eq!(summary.iterations, 1000);
  assert_eq!(summary.allocations, summary.frees);
  assert!(summary.allocations >= 100);
  assert_eq!(
    reports.iter().map(|report| report.iteration).collect::<Vec<_>>(),
    (0..1000usize).step_by(100).collect::<Vec<_>>()
  );
  assert!(reports.iter().all(|report| report.stats.occupied_chunks == 100));

  assert!(heap.verify().is_ok());
  assert_eq!(heap.stats().free_chunks, 1);
  assert_eq!(heap.stats().occupied_chunks, 0);
  assert_eq!(heap.chunks().count(), 1);
}

#[test]
fn every_policy_survives_the_stress_workload() {
  for policy in Policy::ALL {
    for seed in [3, 17] {
      let mut heap = Heap::with_config(HeapConfig::new(128 * 1024, policy)).unwrap();
      let config = WorkloadConfig {
        iterations: 300,
        report_every: 0,
        ..WorkloadConfig::default()
      };

      let mut reported = false;
      let result = Workload::new(&mut heap, config, StdRng::seed_from_u64(seed)).run(|_| reported = true);

      if let Err(error) = result {
        panic!("{policy} with seed {seed}: {error}");
      }
      assert!(!reported);
      assert_eq!(heap.stats().occupied_chunks, 0, "{policy} with seed {seed}");
      assert_eq!(heap.chunks().count(), 1, "{policy} with seed {seed}");
    }
  }
}

#[test]
fn the_same_seed_replays_the_same_run() {
  let run = |seed| {
    let mut heap = Heap::new(64 * 1024, Policy::First).unwrap();
    let config = WorkloadConfig {
      iterations: 50,
      report_every: 10,
      ..WorkloadConfig::default()
    };
    let mut levels = Vec::new();

    let summary = Workload::new(&mut heap, config, StdRng::seed_from_u64(seed))
      .run(|report| levels.push(report.fragmentation_level))
      .unwrap();

    (summary, levels)
  };

  assert_eq!(run(99), run(99));
}
