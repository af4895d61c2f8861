//! Routing table resolution
//!
//! Coupling declarations are expanded once, at build time, against the
//! concrete instance names of a coupled model. The result maps each source
//! (a child name or `self`) to an insertion-ordered, duplicate-free list of
//! destinations.

use devs_core::{DevsError, DevsResult};

use crate::{CouplingSpec, NameSpec, SELF};

/// Resolved couplings of one coupled model
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoutingTable {
    entries: Vec<(String, Vec<String>)>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `dst` under `src` unless already present
    pub fn add(&mut self, src: &str, dst: &str) {
        let idx = match self.entries.iter().position(|(s, _)| s == src) {
            Some(idx) => idx,
            None => {
                self.entries.push((src.to_string(), Vec::new()));
                self.entries.len() - 1
            }
        };
        let dsts = &mut self.entries[idx].1;
        if !dsts.iter().any(|d| d == dst) {
            dsts.push(dst.to_string());
        }
    }

    /// Destinations of `src`, empty when it has no coupling
    pub fn destinations(&self, src: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(s, _)| s == src)
            .map(|(_, d)| d.as_slice())
            .unwrap_or(&[])
    }

    /// External input couplings
    pub fn external_inputs(&self) -> &[String] {
        self.destinations(SELF)
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(s, _)| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Expand every coupling declaration against `names`.
    ///
    /// A source or destination that expands to nothing is an error, as is
    /// a malformed spec or a `self -> self` coupling.
    pub fn resolve(path: &str, couplings: &[CouplingSpec], names: &[String]) -> DevsResult<Self> {
        let mut table = RoutingTable::new();
        for coupling in couplings {
            let src_spec = parse(path, &coupling.source)?;
            let sources = expand(path, &coupling.source, &src_spec, names)?;
            if coupling.destinations.is_empty() {
                return Err(resolution_error(path, &coupling.source, "coupling has no destination"));
            }
            for dst in &coupling.destinations {
                let dst_spec = parse(path, dst)?;
                if src_spec.is_boundary() && dst_spec.is_boundary() {
                    return Err(resolution_error(path, dst, "`self -> self` coupling is not supported"));
                }
                let destinations = expand(path, dst, &dst_spec, names)?;
                for s in &sources {
                    for d in &destinations {
                        table.add(s, d);
                    }
                }
            }
            tracing::debug!(
                model = %path,
                source = %coupling.source,
                destinations = ?coupling.destinations,
                "resolved coupling"
            );
        }
        Ok(table)
    }
}

fn parse(path: &str, spec: &str) -> DevsResult<NameSpec> {
    NameSpec::parse(spec).map_err(|reason| resolution_error(path, spec, &reason))
}

fn expand(path: &str, raw: &str, spec: &NameSpec, names: &[String]) -> DevsResult<Vec<String>> {
    let matched = spec.expand(names.iter().map(String::as_str));
    if matched.is_empty() {
        return Err(resolution_error(path, raw, "matches no submodel"));
    }
    Ok(matched)
}

fn resolution_error(path: &str, spec: &str, reason: &str) -> DevsError {
    DevsError::CouplingResolution {
        path: path.to_string(),
        spec: spec.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_range_coupling_fans_out() {
        let known = names(&["gen:2", "gen:3", "proc:0", "proc:1", "proc"]);
        let couplings = vec![CouplingSpec::new("gen[2:4]", ["proc[0:2]", "proc"])];
        let table = RoutingTable::resolve("/top", &couplings, &known).unwrap();

        assert_eq!(table.destinations("gen:2"), ["proc:0", "proc:1", "proc"]);
        assert_eq!(table.destinations("gen:3"), ["proc:0", "proc:1", "proc"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_duplicates_suppressed_order_kept() {
        let known = names(&["a", "b", "c"]);
        let couplings = vec![
            CouplingSpec::new("a", ["c", "b"]),
            CouplingSpec::new("a", ["b", "self"]),
            CouplingSpec::new("self", ["a"]),
        ];
        let table = RoutingTable::resolve("/top", &couplings, &known).unwrap();

        assert_eq!(table.destinations("a"), ["c", "b", "self"]);
        assert_eq!(table.external_inputs(), ["a"]);
        assert!(table.destinations("b").is_empty());
        assert_eq!(table.sources().collect::<Vec<_>>(), vec!["a", "self"]);
    }

    #[test]
    fn test_empty_expansion_is_an_error() {
        let known = names(&["gen", "proc"]);

        let err = RoutingTable::resolve("/top", &[CouplingSpec::new("nope", ["proc"])], &known)
            .unwrap_err();
        assert!(matches!(err, DevsError::CouplingResolution { ref spec, .. } if spec == "nope"));

        let err = RoutingTable::resolve("/top", &[CouplingSpec::new("gen", ["proc[0:3]"])], &known)
            .unwrap_err();
        assert!(matches!(err, DevsError::CouplingResolution { ref spec, .. } if spec == "proc[0:3]"));
    }

    #[test]
    fn test_malformed_and_degenerate_specs() {
        let known = names(&["gen"]);
        assert!(RoutingTable::resolve("/top", &[CouplingSpec::new("gen[", ["self"])], &known).is_err());
        assert!(RoutingTable::resolve("/top", &[CouplingSpec::new("self", ["self"])], &known).is_err());
        assert!(
            RoutingTable::resolve("/top", &[CouplingSpec::new("gen", Vec::<String>::new())], &known)
                .is_err()
        );
    }
}
