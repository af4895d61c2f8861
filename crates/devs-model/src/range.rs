//! Name-range specs
//!
//! Coupling endpoints name submodels in one of three forms:
//! - `self`: the coupled model's own boundary
//! - `proc` or `proc:1`: exactly that instance
//! - `proc[a:b]`: replicas `proc:a .. proc:(b-1)`, half-open like a slice

use once_cell::sync::Lazy;
use regex::Regex;

use crate::SELF;

static RANGE_SPEC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>\w+(?::\d+)?)(?:\[(?P<first>\d+):(?P<last>\d+)\])?$")
        .expect("static range-spec regex")
});

static INSTANCE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<base>\w+):(?P<num>\d+)$").expect("static instance regex"));

/// A parsed coupling endpoint
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NameSpec {
    Boundary,
    Name(String),
    Range { base: String, first: usize, last: usize },
}

impl NameSpec {
    /// Parse an endpoint; the error string explains what is malformed
    pub fn parse(spec: &str) -> Result<Self, String> {
        if spec == SELF {
            return Ok(NameSpec::Boundary);
        }
        let caps = RANGE_SPEC
            .captures(spec)
            .ok_or_else(|| "expected `name`, `name:N`, `name[a:b]` or `self`".to_string())?;
        let name = &caps["name"];
        match (caps.name("first"), caps.name("last")) {
            (Some(first), Some(last)) => {
                if name.contains(':') {
                    return Err("a range cannot apply to a replica name".to_string());
                }
                if name == SELF {
                    return Err("`self` cannot carry a range".to_string());
                }
                let first = parse_bound(first.as_str())?;
                let last = parse_bound(last.as_str())?;
                Ok(NameSpec::Range {
                    base: name.to_string(),
                    first,
                    last,
                })
            }
            _ => Ok(NameSpec::Name(name.to_string())),
        }
    }

    pub fn is_boundary(&self) -> bool {
        matches!(self, NameSpec::Boundary)
    }

    /// True when `instance` is denoted by this spec
    pub fn matches(&self, instance: &str) -> bool {
        match self {
            NameSpec::Boundary => instance == SELF,
            NameSpec::Name(name) => name == instance,
            NameSpec::Range { base, first, last } => INSTANCE_NAME
                .captures(instance)
                .and_then(|caps| {
                    let num: usize = caps["num"].parse().ok()?;
                    Some(&caps["base"] == base && *first <= num && num < *last)
                })
                .unwrap_or(false),
        }
    }

    /// Expand against the known instance names, keeping their order.
    ///
    /// `self` always expands to itself.
    pub fn expand<'a, I>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if self.is_boundary() {
            return vec![SELF.to_string()];
        }
        names
            .into_iter()
            .filter(|n| self.matches(n))
            .map(str::to_string)
            .collect()
    }
}

fn parse_bound(s: &str) -> Result<usize, String> {
    s.parse()
        .map_err(|_| format!("range bound '{}' is out of range", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NAMES: [&str; 5] = ["gen:2", "gen:3", "proc:0", "proc:1", "proc"];

    #[test]
    fn test_parse_forms() {
        assert_eq!(NameSpec::parse("self"), Ok(NameSpec::Boundary));
        assert_eq!(NameSpec::parse("proc"), Ok(NameSpec::Name("proc".into())));
        assert_eq!(NameSpec::parse("proc:1"), Ok(NameSpec::Name("proc:1".into())));
        assert_eq!(
            NameSpec::parse("proc[0:2]"),
            Ok(NameSpec::Range {
                base: "proc".into(),
                first: 0,
                last: 2
            })
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "proc[0:2", "proc[a:b]", "proc[0]", "pr oc", "proc:1[0:2]", "self[0:1]", "/proc"] {
            assert!(NameSpec::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_range_expansion_is_half_open() {
        let spec = NameSpec::parse("gen[2:4]").unwrap();
        assert_eq!(spec.expand(NAMES), vec!["gen:2", "gen:3"]);

        let spec = NameSpec::parse("proc[0:2]").unwrap();
        assert_eq!(spec.expand(NAMES), vec!["proc:0", "proc:1"]);

        let spec = NameSpec::parse("proc[1:1]").unwrap();
        assert!(spec.expand(NAMES).is_empty());
    }

    #[test]
    fn test_bare_name_matches_only_itself() {
        let spec = NameSpec::parse("proc").unwrap();
        assert_eq!(spec.expand(NAMES), vec!["proc"]);
        assert!(!spec.matches("proc:0"));
    }

    #[test]
    fn test_range_bounds_compare_numerically() {
        let names = ["w:2", "w:9", "w:10", "w:11"];
        let spec = NameSpec::parse("w[2:11]").unwrap();
        assert_eq!(spec.expand(names), vec!["w:2", "w:9", "w:10"]);
    }

    #[test]
    fn test_boundary_expands_to_self() {
        assert_eq!(NameSpec::Boundary.expand(NAMES), vec!["self"]);
        assert!(!NameSpec::parse("proc[0:9]").unwrap().matches("self"));
    }

    proptest! {
        #[test]
        fn prop_range_selects_exactly_the_interval(count in 0usize..40, first in 0usize..45, len in 0usize..45) {
            let names: Vec<String> = (0..count).map(|i| format!("w:{}", i)).collect();
            let spec = NameSpec::parse(&format!("w[{}:{}]", first, first + len)).unwrap();
            let expanded = spec.expand(names.iter().map(String::as_str));
            let expected: Vec<String> = (first..(first + len).min(count))
                .map(|i| format!("w:{}", i))
                .collect();
            prop_assert_eq!(expanded, expected);
        }
    }
}
