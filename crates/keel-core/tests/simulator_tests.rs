//! Simulator invariants across seeds

use keel_core::simulator::{run_simulator, SimulatorConfig};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_any_seed_passes(seed in any::<u64>(), seed_records in 0usize..6) {
        let report = run_simulator(SimulatorConfig {
            seed,
            runs: 2,
            steps_per_run: 80,
            seed_records,
            ..SimulatorConfig::default()
        })
        .unwrap();

        prop_assert!(report.passed(), "{}", report.generate_text());
        prop_assert_eq!(report.stats.runs, 2);
    }
}

#[test]
fn json_report_round_trips() {
    let report = run_simulator(SimulatorConfig {
        runs: 1,
        steps_per_run: 20,
        ..SimulatorConfig::default()
    })
    .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["stats"]["runs"], 1);
    assert!(json["violations"].as_array().unwrap().is_empty());
}
