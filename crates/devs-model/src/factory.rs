//! Model factory
//!
//! Maps a type id to a constructor `(instance name, arg) -> Model`. Coupled
//! types register a spec builder instead; the factory wraps it.

use std::collections::HashMap;
use std::fmt;

use devs_core::{DevsError, DevsResult, SimTime, Value};

use crate::{CoupledModel, CoupledSpec, Model};

type Constructor = Box<dyn Fn(&str, &Value) -> DevsResult<Model>>;

/// Registry of model constructors keyed by type id
#[derive(Default)]
pub struct ModelFactory {
    constructors: HashMap<String, Constructor>,
}

impl ModelFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an atomic (or hand-built) model type
    pub fn register<F>(&mut self, type_id: &str, constructor: F) -> &mut Self
    where
        F: Fn(&str, &Value) -> DevsResult<Model> + 'static,
    {
        self.constructors
            .insert(type_id.to_string(), Box::new(constructor));
        self
    }

    /// Register a coupled model type from its structural declaration
    pub fn register_coupled<F>(&mut self, type_id: &str, declare: F) -> &mut Self
    where
        F: Fn(&Value) -> DevsResult<CoupledSpec> + 'static,
    {
        self.register(type_id, move |name, arg| {
            Ok(CoupledModel::new(name, declare(arg)?).into())
        })
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.constructors.contains_key(type_id)
    }

    /// Registered type ids, sorted
    pub fn type_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Instantiate one model. Paths are assigned later, by the build pass.
    pub fn construct(&self, type_id: &str, name: &str, arg: &Value) -> DevsResult<Model> {
        let constructor = self
            .constructors
            .get(type_id)
            .ok_or_else(|| DevsError::UnknownModelType(type_id.to_string()))?;
        let model = constructor(name, arg)?;
        if model.name() != name {
            return Err(DevsError::TypeMismatch {
                path: name.to_string(),
                reason: format!(
                    "constructor for '{}' produced a model named '{}'",
                    type_id,
                    model.name()
                ),
            });
        }
        Ok(model)
    }

    /// Instantiate and build the top model; its path is `/name`
    pub fn build_root(&self, type_id: &str, name: &str, arg: &Value) -> DevsResult<Model> {
        let mut model = self.construct(type_id, name, arg)?;
        model.build("", self)?;
        tracing::debug!(model = %model.path(), type_id, "built model tree");
        Ok(model)
    }
}

impl fmt::Debug for ModelFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelFactory")
            .field("types", &self.type_ids())
            .finish()
    }
}

/// Read a duration argument given as a JSON number or a numeric string
pub fn duration_arg(name: &str, arg: &Value) -> DevsResult<SimTime> {
    let value = match arg {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match value {
        Some(v) if SimTime::new(v).is_valid_duration() => Ok(SimTime::new(v)),
        _ => Err(DevsError::TypeMismatch {
            path: name.to_string(),
            reason: format!("expected a non-negative number, got {}", arg),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AtomicModel;
    use devs_core::PhaseTable;
    use serde_json::json;

    #[test]
    fn test_unknown_type() {
        let factory = ModelFactory::new();
        let err = factory.construct("Nope", "x", &Value::Null).unwrap_err();
        assert_eq!(err, DevsError::UnknownModelType("Nope".into()));
    }

    #[test]
    fn test_constructor_must_honor_name() {
        let mut factory = ModelFactory::new();
        factory.register("Liar", |_, _| Ok(AtomicModel::new("other", PhaseTable::new()).into()));
        let err = factory.construct("Liar", "x", &Value::Null).unwrap_err();
        assert!(matches!(err, DevsError::TypeMismatch { .. }));
    }

    #[test]
    fn test_type_ids_sorted() {
        let mut factory = ModelFactory::new();
        factory
            .register("B", |n, _| Ok(AtomicModel::new(n, PhaseTable::new()).into()))
            .register_coupled("A", |_| Ok(CoupledSpec::new()));
        assert_eq!(factory.type_ids(), vec!["A", "B"]);
        assert!(factory.contains("A"));
    }

    #[test]
    fn test_duration_arg_forms() {
        assert_eq!(duration_arg("g", &json!(3)).unwrap(), SimTime::new(3.0));
        assert_eq!(duration_arg("g", &json!("4")).unwrap(), SimTime::new(4.0));
        assert_eq!(duration_arg("g", &json!(" 2.5 ")).unwrap(), SimTime::new(2.5));
        assert!(duration_arg("g", &json!("soon")).is_err());
        assert!(duration_arg("g", &json!(-1)).is_err());
        assert!(duration_arg("g", &json!([3])).is_err());
    }
}
