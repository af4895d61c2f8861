//! End-to-end scenarios
//!
//! Whole runs through the audited harness: the generator/processor demo
//! and seeded random networks.

use devs_core::{DevsResult, Value};
use devs_models::{standard_factory, COUPLED_GENERATOR};

use crate::harness::{HarnessResult, ScenarioHarness};
use crate::topology::{Topology, TopologyConfig, NETWORK};

/// Run the generator/processor demo with `arg` overrides
pub fn run_procgen(arg: &Value, end_time: f64) -> DevsResult<HarnessResult> {
    ScenarioHarness::build(&standard_factory(), COUPLED_GENERATOR, arg, end_time)?.run()
}

/// Generate a network from `config` and run it
pub fn run_topology(config: &TopologyConfig, end_time: f64) -> DevsResult<HarnessResult> {
    let topology = Topology::generate(config);
    tracing::debug!(
        seed = topology.seed,
        atomics = topology.atomic_count(),
        "running generated topology"
    );
    ScenarioHarness::build(&topology.factory()?, NETWORK, &Value::Null, end_time)?.run()
}
