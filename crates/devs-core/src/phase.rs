//! Phase-indexed behavior tables
//!
//! An atomic model is a small automaton: its phase selects which of the four
//! DEVS primitives apply. Each model type registers, per phase, the
//! primitives that make sense there. A primitive that is asked for but was
//! never registered is an error at dispatch time, never a silent default.
//!
//! ```
//! use devs_core::{ExternalOutcome, PhaseTable, SimTime};
//!
//! let table = PhaseTable::new()
//!     .time_advance("idle", |_| SimTime::INFINITY)
//!     .external("idle", |_, _, _| ExternalOutcome::to("busy"))
//!     .time_advance("busy", |_| SimTime::new(4.0))
//!     .internal("busy", |_| "idle".into())
//!     .output("busy", |_| None);
//!
//! assert!(table.has("busy", devs_core::Operation::Output));
//! assert!(!table.has("idle", devs_core::Operation::Internal));
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::{Event, SimTime, StateMap};

/// The four DEVS primitives
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Internal,
    External,
    TimeAdvance,
    Output,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::Internal => "internal-transition",
            Operation::External => "external-transition",
            Operation::TimeAdvance => "time-advance",
            Operation::Output => "output",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of an external transition
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExternalOutcome {
    /// Input accepted, switch to the given phase
    Transition(String),
    /// Input ignored; phase and schedule stay as they were
    NoChange,
}

impl ExternalOutcome {
    pub fn to(phase: impl Into<String>) -> Self {
        ExternalOutcome::Transition(phase.into())
    }
}

pub type InternalFn = Box<dyn Fn(&mut StateMap) -> String>;
pub type ExternalFn = Box<dyn Fn(&mut StateMap, SimTime, &Event) -> ExternalOutcome>;
pub type TimeAdvanceFn = Box<dyn Fn(&StateMap) -> SimTime>;
pub type OutputFn = Box<dyn Fn(&StateMap) -> Option<Event>>;

/// Primitives registered for one phase
#[derive(Default)]
pub struct PhaseHandlers {
    pub internal: Option<InternalFn>,
    pub external: Option<ExternalFn>,
    pub time_advance: Option<TimeAdvanceFn>,
    pub output: Option<OutputFn>,
}

impl PhaseHandlers {
    pub fn has(&self, op: Operation) -> bool {
        match op {
            Operation::Internal => self.internal.is_some(),
            Operation::External => self.external.is_some(),
            Operation::TimeAdvance => self.time_advance.is_some(),
            Operation::Output => self.output.is_some(),
        }
    }
}

/// Dispatch table from phase name to its primitives
#[derive(Default)]
pub struct PhaseTable {
    phases: HashMap<String, PhaseHandlers>,
}

impl PhaseTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, phase: &str) -> &mut PhaseHandlers {
        self.phases.entry(phase.to_string()).or_default()
    }

    /// Register the internal transition of `phase`; returns the next phase
    pub fn internal<F>(mut self, phase: &str, f: F) -> Self
    where
        F: Fn(&mut StateMap) -> String + 'static,
    {
        self.entry(phase).internal = Some(Box::new(f));
        self
    }

    /// Register the external transition of `phase`
    pub fn external<F>(mut self, phase: &str, f: F) -> Self
    where
        F: Fn(&mut StateMap, SimTime, &Event) -> ExternalOutcome + 'static,
    {
        self.entry(phase).external = Some(Box::new(f));
        self
    }

    /// Register the time advance of `phase`
    pub fn time_advance<F>(mut self, phase: &str, f: F) -> Self
    where
        F: Fn(&StateMap) -> SimTime + 'static,
    {
        self.entry(phase).time_advance = Some(Box::new(f));
        self
    }

    /// Register the output function of `phase`
    pub fn output<F>(mut self, phase: &str, f: F) -> Self
    where
        F: Fn(&StateMap) -> Option<Event> + 'static,
    {
        self.entry(phase).output = Some(Box::new(f));
        self
    }

    pub fn get(&self, phase: &str) -> Option<&PhaseHandlers> {
        self.phases.get(phase)
    }

    pub fn has(&self, phase: &str, op: Operation) -> bool {
        self.get(phase).map_or(false, |h| h.has(op))
    }

    pub fn internal_for(&self, phase: &str) -> Option<&InternalFn> {
        self.get(phase).and_then(|h| h.internal.as_ref())
    }

    pub fn external_for(&self, phase: &str) -> Option<&ExternalFn> {
        self.get(phase).and_then(|h| h.external.as_ref())
    }

    pub fn time_advance_for(&self, phase: &str) -> Option<&TimeAdvanceFn> {
        self.get(phase).and_then(|h| h.time_advance.as_ref())
    }

    pub fn output_for(&self, phase: &str) -> Option<&OutputFn> {
        self.get(phase).and_then(|h| h.output.as_ref())
    }

    /// Registered phase names, sorted
    pub fn phases(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.phases.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for PhaseTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseTable")
            .field("phases", &self.phases())
            .finish()
    }
}
