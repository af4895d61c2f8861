//! Declarative composition specs
//!
//! A coupled model type declares its structure as data: which submodels to
//! instantiate, how their ports are coupled, and how to break ties between
//! simultaneously imminent children. The tuple shapes mirror the persisted
//! declaration format:
//!
//! - submodel: `(type_id, name, count, arg)`
//! - coupling: `(source, (destination, ...))`, with `name[a:b]` ranges and
//!   the `self` boundary sentinel
//! - select: `({pattern, ...}, winner)`

use std::collections::BTreeSet;

use devs_core::Value;
use serde::{Deserialize, Serialize};

/// Reserved name for a coupled model's own boundary
pub const SELF: &str = "self";

/// One submodel declaration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubmodelSpec {
    pub type_id: String,
    pub name: String,
    /// Replica count; above one, instances are named `name:0 .. name:(count-1)`
    pub count: usize,
    pub arg: Value,
}

impl SubmodelSpec {
    pub fn new(type_id: &str, name: &str, count: usize, arg: Value) -> Self {
        SubmodelSpec {
            type_id: type_id.to_string(),
            name: name.to_string(),
            count,
            arg,
        }
    }

    /// Concrete instance names this declaration produces
    pub fn instance_names(&self) -> Vec<String> {
        if self.count > 1 {
            (0..self.count).map(|i| format!("{}:{}", self.name, i)).collect()
        } else {
            vec![self.name.clone()]
        }
    }
}

impl From<(&str, &str, usize, Value)> for SubmodelSpec {
    fn from((type_id, name, count, arg): (&str, &str, usize, Value)) -> Self {
        SubmodelSpec::new(type_id, name, count, arg)
    }
}

/// One coupling declaration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouplingSpec {
    pub source: String,
    pub destinations: Vec<String>,
}

impl CouplingSpec {
    pub fn new<I, S>(source: &str, destinations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CouplingSpec {
            source: source.to_string(),
            destinations: destinations.into_iter().map(Into::into).collect(),
        }
    }
}

impl<const N: usize> From<(&str, [&str; N])> for CouplingSpec {
    fn from((source, destinations): (&str, [&str; N])) -> Self {
        CouplingSpec::new(source, destinations)
    }
}

/// One tie-break declaration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectSpec {
    /// Candidate names or whole-string patterns
    pub candidates: BTreeSet<String>,
    /// Winner name, or a pattern designating exactly one candidate
    pub winner: String,
}

impl SelectSpec {
    pub fn new<I, S>(candidates: I, winner: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SelectSpec {
            candidates: candidates.into_iter().map(Into::into).collect(),
            winner: winner.to_string(),
        }
    }
}

impl<const N: usize> From<([&str; N], &str)> for SelectSpec {
    fn from((candidates, winner): ([&str; N], &str)) -> Self {
        SelectSpec::new(candidates, winner)
    }
}

/// Port renaming applied to input forwarded along external input couplings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortTranslation {
    /// Destination name or range spec
    pub destination: String,
    pub from_port: String,
    pub to_port: String,
}

impl PortTranslation {
    pub fn new(destination: &str, from_port: &str, to_port: &str) -> Self {
        PortTranslation {
            destination: destination.to_string(),
            from_port: from_port.to_string(),
            to_port: to_port.to_string(),
        }
    }
}

/// Full structural declaration of a coupled model type
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CoupledSpec {
    pub submodels: Vec<SubmodelSpec>,
    pub couplings: Vec<CouplingSpec>,
    pub select: Vec<SelectSpec>,
    #[serde(default)]
    pub translations: Vec<PortTranslation>,
}

impl CoupledSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submodel(mut self, type_id: &str, name: &str, count: usize, arg: Value) -> Self {
        self.submodels.push(SubmodelSpec::new(type_id, name, count, arg));
        self
    }

    pub fn coupling<const N: usize>(mut self, source: &str, destinations: [&str; N]) -> Self {
        self.couplings.push(CouplingSpec::new(source, destinations));
        self
    }

    pub fn select<const N: usize>(mut self, candidates: [&str; N], winner: &str) -> Self {
        self.select.push(SelectSpec::new(candidates, winner));
        self
    }

    pub fn translate(mut self, destination: &str, from_port: &str, to_port: &str) -> Self {
        self.translations
            .push(PortTranslation::new(destination, from_port, to_port));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_replica_names() {
        let single = SubmodelSpec::new("Processor", "proc", 1, json!(4));
        assert_eq!(single.instance_names(), vec!["proc"]);

        let replicated = SubmodelSpec::new("Processor", "proc", 3, json!(4));
        assert_eq!(replicated.instance_names(), vec!["proc:0", "proc:1", "proc:2"]);
    }

    #[test]
    fn test_tuple_declarations() {
        let spec = CoupledSpec {
            submodels: vec![("Generator", "gen", 1, json!("3")).into()],
            couplings: vec![("gen", ["proc"]).into(), ("proc", ["self"]).into()],
            select: vec![(["proc", "gen"], "proc").into()],
            translations: Vec::new(),
        };
        let built = CoupledSpec::new()
            .submodel("Generator", "gen", 1, json!("3"))
            .coupling("gen", ["proc"])
            .coupling("proc", [SELF])
            .select(["gen", "proc"], "proc");
        assert_eq!(spec, built);
    }

    #[test]
    fn test_spec_deserializes_without_translations() {
        let spec: CoupledSpec = serde_json::from_value(json!({
            "submodels": [{"type_id": "Generator", "name": "gen", "count": 1, "arg": 3}],
            "couplings": [{"source": "gen", "destinations": ["self"]}],
            "select": []
        }))
        .unwrap();
        assert_eq!(spec.submodels[0].name, "gen");
        assert!(spec.translations.is_empty());
    }
}
