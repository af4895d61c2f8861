//! DEVS Models - Sample models
//!
//! The classic generator/processor pair:
//! - Generator: periodic job source
//! - Processor: single-server job sink
//! - CoupledGenerator: the two wired together
//!
//! [`standard_factory`] registers all three.

pub mod generator;
pub mod processor;
pub mod procgen;

pub use generator::*;
pub use processor::*;
pub use procgen::*;

use devs_model::ModelFactory;

/// Factory with every sample model registered
pub fn standard_factory() -> ModelFactory {
    let mut factory = ModelFactory::new();
    factory
        .register(GENERATOR, generator)
        .register(PROCESSOR, processor)
        .register_coupled(COUPLED_GENERATOR, coupled_generator);
    factory
}

#[cfg(test)]
mod tests {
    use super::*;
    use devs_core::{DevsError, Value};
    use devs_model::Model;
    use serde_json::json;

    #[test]
    fn test_standard_factory_builds_procgen() {
        let factory = standard_factory();
        assert_eq!(factory.type_ids(), vec![COUPLED_GENERATOR, GENERATOR, PROCESSOR]);

        let model = factory
            .build_root(COUPLED_GENERATOR, "coupled", &Value::Null)
            .unwrap();
        let Model::Coupled(top) = &model else {
            panic!("expected coupled model");
        };
        let paths: Vec<&str> = top.submodels().iter().map(Model::path).collect();
        assert_eq!(paths, vec!["/coupled/gen", "/coupled/proc"]);
    }

    #[test]
    fn test_bad_argument_is_type_mismatch() {
        let err = standard_factory()
            .construct(PROCESSOR, "proc", &json!({"t": 4}))
            .unwrap_err();
        assert!(matches!(err, DevsError::TypeMismatch { .. }));
    }
}
