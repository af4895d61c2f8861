//! CoupledGenerator: a generator feeding a processor
//!
//! ```text
//!   +----------------------------------+
//!   |  gen --job--> proc --job--> self |
//!   +----------------------------------+
//! ```
//!
//! When both are imminent the processor goes first.

use devs_core::{DevsError, DevsResult, Value};
use devs_model::CoupledSpec;
use serde_json::json;

use crate::{GENERATOR, PROCESSOR};

pub const COUPLED_GENERATOR: &str = "CoupledGenerator";

/// Structure of the coupled generator.
///
/// `arg` may override the defaults with `{"period": .., "service_time": ..}`;
/// `null` keeps period 3 and service time 4.
pub fn coupled_generator(arg: &Value) -> DevsResult<CoupledSpec> {
    let (period, service_time) = match arg {
        Value::Null => (json!(3), json!(4)),
        Value::Object(fields) => (
            fields.get("period").cloned().unwrap_or(json!(3)),
            fields.get("service_time").cloned().unwrap_or(json!(4)),
        ),
        other => {
            return Err(DevsError::TypeMismatch {
                path: COUPLED_GENERATOR.to_string(),
                reason: format!("expected null or an object, got {}", other),
            })
        }
    };
    Ok(CoupledSpec::new()
        .submodel(GENERATOR, "gen", 1, period)
        .submodel(PROCESSOR, "proc", 1, service_time)
        .coupling("gen", ["proc"])
        .coupling("proc", ["self"])
        .select(["proc", "gen"], "proc"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_structure() {
        let spec = coupled_generator(&Value::Null).unwrap();
        assert_eq!(spec.submodels.len(), 2);
        assert_eq!(spec.submodels[0].arg, json!(3));
        assert_eq!(spec.submodels[1].arg, json!(4));
        assert_eq!(spec.couplings[1].destinations, vec!["self"]);
        assert_eq!(spec.select[0].winner, "proc");
    }

    #[test]
    fn test_overrides() {
        let spec = coupled_generator(&json!({"period": 2})).unwrap();
        assert_eq!(spec.submodels[0].arg, json!(2));
        assert_eq!(spec.submodels[1].arg, json!(4));
        assert!(coupled_generator(&json!([1, 2])).is_err());
    }
}
