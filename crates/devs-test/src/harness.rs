//! Scenario harness
//!
//! Single-steps a [`RootCoordinator`] and audits the whole simulator tree
//! between steps. At rest (between root iterations) every simulator must
//! satisfy:
//! - `time_last <= time_next`
//! - a coupled simulator owes no DONE and agrees with its children:
//!   `time_next = min(children)` and `time_last = max(children)`
//! - every mailbox is drained
//!
//! The root's own clock must never run backwards. Once the run is over the
//! root mailbox must be empty, and boundary outputs must have arrived in
//! time order, never past the end time.

use devs_core::{DevsResult, SimTime, Tracer, Value};
use devs_model::ModelFactory;
use devs_sim::{RootCoordinator, SimConfig, SimKind, SimTree, SimulationReport};
use thiserror::Error;

// ============================================================================
// VIOLATIONS
// ============================================================================

/// Invariant broken at rest
#[derive(Clone, Debug, PartialEq, Error)]
pub enum Violation {
    #[error("step {step}: {path} has time_last {time_last} after time_next {time_next}")]
    TimeOrder {
        step: u64,
        path: String,
        time_last: SimTime,
        time_next: SimTime,
    },

    #[error("step {step}: {path} reports ({time_last}, {time_next}), children give ({child_last}, {child_next})")]
    Aggregate {
        step: u64,
        path: String,
        time_last: SimTime,
        time_next: SimTime,
        child_last: SimTime,
        child_next: SimTime,
    },

    #[error("step {step}: {path} still owes {pending} DONE")]
    Pending { step: u64, path: String, pending: u32 },

    #[error("step {step}: {path} has {queued} undelivered messages")]
    Queued { step: u64, path: String, queued: usize },

    #[error("step {step}: root clock went back from {before} to {after}")]
    RootRegressed {
        step: u64,
        before: SimTime,
        after: SimTime,
    },

    #[error("output at {time} is out of order or past the end time")]
    OutputOrder { time: SimTime },
}

// ============================================================================
// HARNESS
// ============================================================================

/// Outcome of an audited run
#[derive(Clone, Debug)]
pub struct HarnessResult {
    pub report: SimulationReport,
    pub steps: u64,
    pub violations: Vec<Violation>,
}

impl HarnessResult {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Runs a root coordinator one step at a time, auditing after each step
pub struct ScenarioHarness {
    root: RootCoordinator,
    steps: u64,
    violations: Vec<Violation>,
}

impl ScenarioHarness {
    pub fn new(root: RootCoordinator) -> Self {
        ScenarioHarness {
            root,
            steps: 0,
            violations: Vec::new(),
        }
    }

    /// Build `type_id` through `factory` with tracing off
    pub fn build(
        factory: &ModelFactory,
        type_id: &str,
        arg: &Value,
        end_time: f64,
    ) -> DevsResult<Self> {
        let root = RootCoordinator::new(
            factory,
            (type_id, "top", arg),
            SimConfig::until(end_time),
            Tracer::disabled(),
        )?;
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &RootCoordinator {
        &self.root
    }

    /// Drive the run to completion; protocol errors abort it
    pub fn run(mut self) -> DevsResult<HarnessResult> {
        self.root.initialize()?;
        self.audit_tree();
        loop {
            let before = self.root.time_last();
            let more = self.root.step()?;
            self.steps += 1;
            if self.root.time_last() < before {
                self.violations.push(Violation::RootRegressed {
                    step: self.steps,
                    before,
                    after: self.root.time_last(),
                });
            }
            self.audit_tree();
            if !more {
                break;
            }
        }
        self.audit_end();

        if !self.violations.is_empty() {
            tracing::warn!(
                violations = self.violations.len(),
                steps = self.steps,
                "scenario broke invariants"
            );
        }
        Ok(HarnessResult {
            report: self.root.report(),
            steps: self.steps,
            violations: self.violations,
        })
    }

    fn audit_tree(&mut self) {
        let found = audit(self.root.tree(), self.steps);
        self.violations.extend(found);
    }

    /// The finished run left nothing for the root and reported outputs in order
    fn audit_end(&mut self) {
        let queued = self.root.tree().root_queued();
        if queued > 0 {
            self.violations.push(Violation::Queued {
                step: self.steps,
                path: "/".to_string(),
                queued,
            });
        }
        let end = self.root.config().end_time;
        let mut last = SimTime::ZERO;
        for out in self.root.outputs() {
            if out.time < last || out.time > end {
                self.violations.push(Violation::OutputOrder { time: out.time });
            }
            last = out.time;
        }
    }
}

/// Check every simulator of `tree` against the at-rest invariants
pub fn audit(tree: &SimTree, step: u64) -> Vec<Violation> {
    let mut violations = Vec::new();
    for id in tree.ids() {
        let node = tree.info(id);
        if node.time_last > node.time_next {
            violations.push(Violation::TimeOrder {
                step,
                path: node.path.clone(),
                time_last: node.time_last,
                time_next: node.time_next,
            });
        }
        let queued = tree.queued(id);
        if queued > 0 {
            violations.push(Violation::Queued {
                step,
                path: node.path.clone(),
                queued,
            });
        }
        if node.kind != SimKind::Coupled || node.children.is_empty() {
            continue;
        }
        if node.pending > 0 {
            violations.push(Violation::Pending {
                step,
                path: node.path.clone(),
                pending: node.pending,
            });
        }
        let times: Vec<(SimTime, SimTime)> = node.children.iter().map(|c| tree.times(*c)).collect();
        let child_last = times.iter().map(|t| t.0).max().unwrap_or(SimTime::ZERO);
        let child_next = times.iter().map(|t| t.1).min().unwrap_or(SimTime::INFINITY);
        if node.time_last != child_last || node.time_next != child_next {
            violations.push(Violation::Aggregate {
                step,
                path: node.path,
                time_last: node.time_last,
                time_next: node.time_next,
                child_last,
                child_next,
            });
        }
    }
    violations
}
