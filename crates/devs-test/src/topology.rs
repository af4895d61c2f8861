//! Seeded random topologies
//!
//! A topology is a `Network` coupled model holding a few `Pipeline` coupled
//! models and one sink processor. Each pipeline replicates a generator and
//! a processor, wires every generator replica to one processor replica, and
//! forwards processor output to its boundary. Pipelines feed the sink and
//! the network boundary; the sink feeds the network boundary.
//!
//! Tie-breaking is a random total priority per coupled model, expressed as
//! one select spec per child: `({child, ".*"}, child)`. The first declared
//! child present in an imminent set wins.

use devs_core::{DevsError, DevsResult, Value};
use devs_model::{CoupledSpec, ModelFactory, SubmodelSpec, SELF};
use devs_models::{standard_factory, GENERATOR, PROCESSOR};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub const NETWORK: &str = "Network";
pub const PIPELINE: &str = "Pipeline";

/// Topology generator configuration
#[derive(Clone, Debug)]
pub struct TopologyConfig {
    /// Number of pipelines in the network
    pub pipelines: usize,
    /// Upper bound on generator replicas per pipeline
    pub max_generators: usize,
    /// Upper bound on processor replicas per pipeline
    pub max_processors: usize,
    /// Periods and service times are drawn from `1..=max_period`
    pub max_period: u32,
    /// Random seed
    pub seed: u64,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            pipelines: 2,
            max_generators: 3,
            max_processors: 2,
            max_period: 6,
            seed: 42,
        }
    }
}

impl TopologyConfig {
    /// One small pipeline
    pub fn light() -> Self {
        Self {
            pipelines: 1,
            max_generators: 1,
            max_processors: 1,
            max_period: 4,
            seed: 42,
        }
    }

    /// Wide network with many replicas and frequent ties
    pub fn heavy() -> Self {
        Self {
            pipelines: 6,
            max_generators: 6,
            max_processors: 4,
            max_period: 9,
            seed: 42,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// One generated pipeline
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineLayout {
    pub generators: usize,
    pub period: u32,
    pub processors: usize,
    pub service_time: u32,
    /// Processor replica fed by each generator replica
    pub wiring: Vec<usize>,
    /// Child names, highest priority first
    pub priority: Vec<String>,
}

impl PipelineLayout {
    pub fn generator_names(&self) -> Vec<String> {
        SubmodelSpec::new(GENERATOR, "gen", self.generators, Value::Null).instance_names()
    }

    pub fn processor_names(&self) -> Vec<String> {
        SubmodelSpec::new(PROCESSOR, "proc", self.processors, Value::Null).instance_names()
    }

    /// Coupled declaration of this pipeline
    pub fn declare(&self) -> DevsResult<CoupledSpec> {
        let generators = self.generator_names();
        let processors = self.processor_names();
        if self.wiring.len() != generators.len() {
            return Err(DevsError::Config(format!(
                "pipeline wires {} generators, declares {}",
                self.wiring.len(),
                generators.len()
            )));
        }

        let mut spec = CoupledSpec::new()
            .submodel(GENERATOR, "gen", self.generators, Value::from(self.period))
            .submodel(PROCESSOR, "proc", self.processors, Value::from(self.service_time));
        for (gen, &target) in generators.iter().zip(&self.wiring) {
            let server = processors.get(target).ok_or_else(|| {
                DevsError::Config(format!("{} wired to missing processor {}", gen, target))
            })?;
            spec = spec.coupling(gen, [server.as_str()]);
        }
        let outputs = if self.processors > 1 {
            format!("proc[0:{}]", self.processors)
        } else {
            "proc".to_string()
        };
        spec = spec.coupling(&outputs, [SELF]);
        Ok(with_priority(spec, &self.priority))
    }
}

/// A generated network
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub pipelines: Vec<PipelineLayout>,
    pub sink_service_time: u32,
    /// Network child names, highest priority first
    pub priority: Vec<String>,
    pub seed: u64,
}

impl Topology {
    pub fn generate(config: &TopologyConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let max_period = config.max_period.max(1);

        let pipelines: Vec<PipelineLayout> = (0..config.pipelines)
            .map(|_| {
                let generators = rng.gen_range(1..=config.max_generators.max(1));
                let processors = rng.gen_range(1..=config.max_processors.max(1));
                let wiring = (0..generators).map(|_| rng.gen_range(0..processors)).collect();
                let mut layout = PipelineLayout {
                    generators,
                    period: rng.gen_range(1..=max_period),
                    processors,
                    service_time: rng.gen_range(1..=max_period),
                    wiring,
                    priority: Vec::new(),
                };
                let mut priority = layout.generator_names();
                priority.extend(layout.processor_names());
                priority.shuffle(&mut rng);
                layout.priority = priority;
                layout
            })
            .collect();

        let mut priority: Vec<String> = (0..pipelines.len()).map(line_name).collect();
        priority.push("sink".to_string());
        priority.shuffle(&mut rng);

        Topology {
            sink_service_time: rng.gen_range(1..=max_period),
            pipelines,
            priority,
            seed: config.seed,
        }
    }

    /// Number of atomic models in the network
    pub fn atomic_count(&self) -> usize {
        1 + self
            .pipelines
            .iter()
            .map(|p| p.generators + p.processors)
            .sum::<usize>()
    }

    /// Coupled declaration of the network
    pub fn declare(&self) -> DevsResult<CoupledSpec> {
        let mut spec = CoupledSpec::new();
        for (i, layout) in self.pipelines.iter().enumerate() {
            let arg = serde_json::to_value(layout)
                .map_err(|e| DevsError::Config(format!("pipeline layout: {}", e)))?;
            spec = spec.submodel(PIPELINE, &line_name(i), 1, arg);
        }
        spec = spec.submodel(PROCESSOR, "sink", 1, Value::from(self.sink_service_time));
        for i in 0..self.pipelines.len() {
            spec = spec.coupling(&line_name(i), ["sink", SELF]);
        }
        spec = spec.coupling("sink", [SELF]);
        Ok(with_priority(spec, &self.priority))
    }

    /// Sample models plus `Pipeline` and this `Network`
    pub fn factory(&self) -> DevsResult<ModelFactory> {
        let network = self.declare()?;
        let mut factory = standard_factory();
        factory
            .register_coupled(PIPELINE, |arg| {
                let layout: PipelineLayout = serde_json::from_value(arg.clone())
                    .map_err(|e| DevsError::Config(format!("pipeline layout: {}", e)))?;
                layout.declare()
            })
            .register_coupled(NETWORK, move |_| Ok(network.clone()));
        Ok(factory)
    }
}

fn line_name(i: usize) -> String {
    format!("line{}", i)
}

fn with_priority(mut spec: CoupledSpec, priority: &[String]) -> CoupledSpec {
    for name in priority {
        spec = spec.select([name.as_str(), ".*"], name);
    }
    spec
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_topology() {
        let a = Topology::generate(&TopologyConfig::default());
        let b = Topology::generate(&TopologyConfig::default());
        assert_eq!(a, b);

        let c = Topology::generate(&TopologyConfig::default().with_seed(7));
        assert_eq!(c.seed, 7);
    }

    #[test]
    fn test_light_topology_shape() {
        let topology = Topology::generate(&TopologyConfig::light());
        assert_eq!(topology.pipelines.len(), 1);
        let line = &topology.pipelines[0];
        assert_eq!(line.generator_names(), vec!["gen"]);
        assert_eq!(line.processor_names(), vec!["proc"]);
        assert_eq!(line.wiring, vec![0]);
        assert_eq!(topology.atomic_count(), 3);
    }

    #[test]
    fn test_network_builds() {
        let topology = Topology::generate(&TopologyConfig::heavy());
        let factory = topology.factory().unwrap();
        let model = factory.build_root(NETWORK, "net", &Value::Null).unwrap();
        assert_eq!(model.path(), "/net");
        assert!(!model.is_atomic());
    }

    #[test]
    fn test_network_declares_every_line() {
        let topology = Topology::generate(&TopologyConfig::default());
        let spec = topology.declare().unwrap();
        assert_eq!(spec.submodels.len(), topology.pipelines.len() + 1);
        let layout: PipelineLayout = serde_json::from_value(spec.submodels[0].arg.clone()).unwrap();
        assert_eq!(layout, topology.pipelines[0]);
    }

    #[test]
    fn test_bad_wiring_is_rejected() {
        let layout = PipelineLayout {
            generators: 2,
            period: 3,
            processors: 1,
            service_time: 2,
            wiring: vec![0, 1],
            priority: Vec::new(),
        };
        assert!(matches!(layout.declare(), Err(DevsError::Config(_))));
    }
}
