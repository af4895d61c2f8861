//! Select / tie-break engine
//!
//! When several children of a coupled model are imminent at the same time,
//! exactly one fires. Select specs are scanned twice, in declaration order:
//!
//! 1. exact match: the candidate set equals the imminent set literally;
//! 2. pattern match: every candidate pattern full-matches at least one
//!    imminent name, and together they account for every imminent name.
//!
//! For example `{"proc.*", ".*"}` matches `{proc:0, proc:1}` but not
//! `{proc:0}`: `.*` must match some name too, and once both patterns are
//! satisfied the union must be the whole set.

use std::collections::BTreeSet;

use devs_core::{DevsError, DevsResult, SimTime};
use regex::Regex;

use crate::SelectSpec;

#[derive(Clone, Debug)]
struct CompiledSelect {
    candidates: BTreeSet<String>,
    patterns: Vec<Regex>,
    winner: String,
    winner_pattern: Option<Regex>,
}

impl CompiledSelect {
    /// Union of names matched by the patterns, or `None` if some pattern
    /// matches nothing
    fn matched_names(&self, names: &BTreeSet<String>) -> Option<BTreeSet<String>> {
        let mut union = BTreeSet::new();
        for pattern in &self.patterns {
            let mut hit = false;
            for name in names {
                if pattern.is_match(name) {
                    hit = true;
                    union.insert(name.clone());
                }
            }
            if !hit {
                return None;
            }
        }
        Some(union)
    }
}

/// Compiled tie-break rules of one coupled model
#[derive(Clone, Debug, Default)]
pub struct SelectEngine {
    specs: Vec<CompiledSelect>,
}

impl SelectEngine {
    /// Compile all patterns up front; a malformed pattern fails the build
    pub fn compile(path: &str, specs: &[SelectSpec]) -> DevsResult<Self> {
        let mut compiled = Vec::with_capacity(specs.len());
        for spec in specs {
            let patterns = spec
                .candidates
                .iter()
                .map(|p| {
                    full_match(p).map_err(|e| DevsError::InvalidSelectPattern {
                        path: path.to_string(),
                        pattern: p.clone(),
                        reason: e.to_string(),
                    })
                })
                .collect::<DevsResult<Vec<_>>>()?;
            compiled.push(CompiledSelect {
                candidates: spec.candidates.clone(),
                patterns,
                winner: spec.winner.clone(),
                winner_pattern: full_match(&spec.winner).ok(),
            });
        }
        Ok(SelectEngine { specs: compiled })
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Choose the child that fires among the imminent `names`
    pub fn select(&self, path: &str, names: &BTreeSet<String>, time: SimTime) -> DevsResult<String> {
        let spec = self
            .specs
            .iter()
            .find(|s| s.candidates == *names)
            .or_else(|| {
                self.specs
                    .iter()
                    .find(|s| s.matched_names(names).as_ref() == Some(names))
            })
            .ok_or_else(|| DevsError::SelectionFailure {
                path: path.to_string(),
                candidates: names.iter().cloned().collect(),
                time,
            })?;
        resolve_winner(path, spec, names)
    }
}

/// The declared winner must designate exactly one imminent name
fn resolve_winner(path: &str, spec: &CompiledSelect, names: &BTreeSet<String>) -> DevsResult<String> {
    if names.contains(&spec.winner) {
        return Ok(spec.winner.clone());
    }
    if let Some(pattern) = &spec.winner_pattern {
        let mut hits = names.iter().filter(|n| pattern.is_match(n));
        if let (Some(only), None) = (hits.next(), hits.next()) {
            return Ok(only.clone());
        }
    }
    Err(DevsError::InvalidWinner {
        path: path.to_string(),
        winner: spec.winner.clone(),
        candidates: names.iter().cloned().collect(),
    })
}

fn full_match(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})$", pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn engine(specs: Vec<SelectSpec>) -> SelectEngine {
        SelectEngine::compile("/top", &specs).unwrap()
    }

    #[test]
    fn test_exact_match_priority() {
        let e = engine(vec![SelectSpec::new(["proc", "gen"], "proc")]);
        assert_eq!(e.select("/top", &set(&["proc", "gen"]), SimTime::ZERO).unwrap(), "proc");
    }

    #[test]
    fn test_exact_match_beats_earlier_pattern() {
        let e = engine(vec![
            SelectSpec::new([".*"], "a"),
            SelectSpec::new(["a", "b"], "b"),
        ]);
        assert_eq!(e.select("/top", &set(&["a", "b"]), SimTime::ZERO).unwrap(), "b");
    }

    #[test]
    fn test_pattern_match_requires_every_pattern_to_hit() {
        let e = engine(vec![SelectSpec::new(["proc.*", ".*"], "proc:0")]);
        assert_eq!(
            e.select("/top", &set(&["proc:0", "proc:1"]), SimTime::ZERO).unwrap(),
            "proc:0"
        );

        let e = engine(vec![SelectSpec::new(["proc:0", "gen"], "proc:0")]);
        let err = e.select("/top", &set(&["proc:0"]), SimTime::ZERO).unwrap_err();
        assert!(matches!(err, DevsError::SelectionFailure { .. }));
    }

    #[test]
    fn test_pattern_union_must_cover_set() {
        let e = engine(vec![
            SelectSpec::new(["proc:.*"], "proc:0"),
            SelectSpec::new(["proc:.*", "gen"], "gen"),
        ]);
        let names = set(&["proc:0", "proc:1", "gen"]);
        assert_eq!(e.select("/top", &names, SimTime::ZERO).unwrap(), "gen");
    }

    #[test]
    fn test_patterns_are_whole_string() {
        let e = engine(vec![SelectSpec::new(["proc", "gen"], "proc")]);
        let err = e
            .select("/top", &set(&["proc:0", "gen:0"]), SimTime::new(3.0))
            .unwrap_err();
        assert_eq!(
            err,
            DevsError::SelectionFailure {
                path: "/top".into(),
                candidates: vec!["gen:0".into(), "proc:0".into()],
                time: SimTime::new(3.0),
            }
        );
    }

    #[test]
    fn test_winner_outside_candidates_is_fatal() {
        let e = engine(vec![SelectSpec::new(["a", "b"], "c")]);
        let err = e.select("/top", &set(&["a", "b"]), SimTime::ZERO).unwrap_err();
        assert!(matches!(err, DevsError::InvalidWinner { ref winner, .. } if winner == "c"));
    }

    #[test]
    fn test_winner_pattern_must_be_unambiguous() {
        let e = engine(vec![SelectSpec::new(["w:.*", "gen"], "w:.*")]);
        let err = e.select("/top", &set(&["w:0", "w:1", "gen"]), SimTime::ZERO).unwrap_err();
        assert!(matches!(err, DevsError::InvalidWinner { .. }));

        let e = engine(vec![SelectSpec::new(["w:.*", "gen"], "w:.*")]);
        assert_eq!(e.select("/top", &set(&["w:1", "gen"]), SimTime::ZERO).unwrap(), "w:1");
    }

    #[test]
    fn test_invalid_pattern_fails_compile() {
        let err = SelectEngine::compile("/top", &[SelectSpec::new(["proc("], "proc")]).unwrap_err();
        assert!(matches!(err, DevsError::InvalidSelectPattern { ref pattern, .. } if pattern == "proc("));
    }
}
