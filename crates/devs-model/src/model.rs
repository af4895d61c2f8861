//! Model tree
//!
//! Models are either atomic (phase + state + behavior table) or coupled
//! (submodels + routing table + select engine). The tree is built once,
//! top-down: a coupled model takes its path, instantiates its submodels
//! through the factory, resolves its couplings and select specs, then builds
//! each child under its own path.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use devs_core::{
    DevsError, DevsResult, Event, ExternalOutcome, Operation, PhaseTable, SimTime, StateMap, Value,
};

use crate::{CoupledSpec, ModelFactory, NameSpec, RoutingTable, SelectEngine, SELF};

/// Initial phase of every atomic model
pub const INIT_PHASE: &str = "init";

/// Leaf behavioral unit
pub struct AtomicModel {
    name: String,
    path: String,
    phase: String,
    state: StateMap,
    table: Rc<PhaseTable>,
}

impl AtomicModel {
    pub fn new(name: &str, table: PhaseTable) -> Self {
        Self::with_shared_table(name, Rc::new(table))
    }

    /// Share one table between instances of the same model type
    pub fn with_shared_table(name: &str, table: Rc<PhaseTable>) -> Self {
        AtomicModel {
            name: name.to_string(),
            path: String::new(),
            phase: INIT_PHASE.to_string(),
            state: StateMap::new(),
            table,
        }
    }

    pub fn with_state(mut self, state: StateMap) -> Self {
        self.state = state;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn phase(&self) -> &str {
        &self.phase
    }

    pub fn state(&self) -> &StateMap {
        &self.state
    }

    pub fn table(&self) -> &PhaseTable {
        &self.table
    }

    fn build(&mut self, parent_path: &str) {
        self.path = format!("{}/{}", parent_path, self.name);
        self.state.set_owner(&self.path);
    }

    fn missing(&self, operation: Operation) -> DevsError {
        DevsError::MissingBehavior {
            path: self.path.clone(),
            phase: self.phase.clone(),
            operation,
        }
    }

    fn set_phase(&mut self, next: String) -> DevsResult<()> {
        if next.is_empty() {
            return Err(DevsError::EmptyPhase {
                path: self.path.clone(),
                from: self.phase.clone(),
            });
        }
        self.phase = next;
        Ok(())
    }

    /// ta(s) for the current phase
    pub fn time_advance(&self) -> DevsResult<SimTime> {
        let ta = self
            .table
            .time_advance_for(&self.phase)
            .ok_or_else(|| self.missing(Operation::TimeAdvance))?;
        let value = ta(&self.state);
        if !value.is_valid_duration() {
            return Err(DevsError::InvalidTimeAdvance {
                path: self.path.clone(),
                phase: self.phase.clone(),
                value,
            });
        }
        Ok(value)
    }

    /// λ(s) for the current phase
    pub fn output(&self) -> DevsResult<Option<Event>> {
        let out = self
            .table
            .output_for(&self.phase)
            .ok_or_else(|| self.missing(Operation::Output))?;
        Ok(out(&self.state))
    }

    /// δint: replace the phase with the one the behavior returns
    pub fn internal(&mut self) -> DevsResult<()> {
        let table = Rc::clone(&self.table);
        let dint = table
            .internal_for(&self.phase)
            .ok_or_else(|| self.missing(Operation::Internal))?;
        let next = dint(&mut self.state);
        self.set_phase(next)
    }

    /// δext: returns whether the input was accepted
    pub fn external(&mut self, elapsed: SimTime, input: &Event) -> DevsResult<bool> {
        let table = Rc::clone(&self.table);
        let dext = table
            .external_for(&self.phase)
            .ok_or_else(|| self.missing(Operation::External))?;
        match dext(&mut self.state, elapsed, input) {
            ExternalOutcome::Transition(next) => {
                self.set_phase(next)?;
                Ok(true)
            }
            ExternalOutcome::NoChange => Ok(false),
        }
    }

    /// State writes made by behaviors since the last call
    pub fn take_state_writes(&mut self) -> Vec<(String, Value)> {
        self.state.take_writes()
    }
}

impl fmt::Debug for AtomicModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicModel")
            .field("path", &self.path)
            .field("phase", &self.phase)
            .field("state", &self.state)
            .finish()
    }
}

/// Composite of submodels, couplings and tie-break rules
#[derive(Debug)]
pub struct CoupledModel {
    name: String,
    path: String,
    spec: CoupledSpec,
    submodels: Vec<Model>,
    routing: RoutingTable,
    select: SelectEngine,
    translations: Vec<(String, String, String)>,
}

impl CoupledModel {
    /// A coupled model awaiting its build pass
    pub fn new(name: &str, spec: CoupledSpec) -> Self {
        CoupledModel {
            name: name.to_string(),
            path: String::new(),
            spec,
            submodels: Vec::new(),
            routing: RoutingTable::new(),
            select: SelectEngine::default(),
            translations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn spec(&self) -> &CoupledSpec {
        &self.spec
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    pub fn submodels(&self) -> &[Model] {
        &self.submodels
    }

    pub fn submodel(&self, name: &str) -> Option<&Model> {
        self.submodels.iter().find(|m| m.name() == name)
    }

    /// Hand the submodels over to the simulator tree
    pub fn take_submodels(&mut self) -> Vec<Model> {
        std::mem::take(&mut self.submodels)
    }

    /// Tie-break among imminent children
    pub fn select(&self, names: &BTreeSet<String>, time: SimTime) -> DevsResult<String> {
        self.select.select(&self.path, names, time)
    }

    /// Port seen by `destination` for input arriving on `port` at the boundary
    pub fn translate_port<'a>(&'a self, destination: &str, port: &'a str) -> &'a str {
        self.translations
            .iter()
            .find(|(d, from, _)| d == destination && from == port)
            .map(|(_, _, to)| to.as_str())
            .unwrap_or(port)
    }

    fn build(&mut self, parent_path: &str, factory: &ModelFactory) -> DevsResult<()> {
        self.path = format!("{}/{}", parent_path, self.name);

        for sub in &self.spec.submodels {
            for instance in sub.instance_names() {
                if instance == SELF {
                    return Err(DevsError::CouplingResolution {
                        path: self.path.clone(),
                        spec: instance,
                        reason: "`self` is reserved for the model boundary".to_string(),
                    });
                }
                if self.submodels.iter().any(|m| m.name() == instance) {
                    return Err(DevsError::DuplicateModel {
                        path: self.path.clone(),
                        name: instance,
                    });
                }
                let model = factory.construct(&sub.type_id, &instance, &sub.arg)?;
                self.submodels.push(model);
            }
        }

        let names: Vec<String> = self.submodels.iter().map(|m| m.name().to_string()).collect();
        self.routing = RoutingTable::resolve(&self.path, &self.spec.couplings, &names)?;
        self.select = SelectEngine::compile(&self.path, &self.spec.select)?;
        self.translations = self.resolve_translations(&names)?;

        tracing::debug!(
            model = %self.path,
            submodels = names.len(),
            routes = self.routing.len(),
            select_specs = self.select.len(),
            "built coupled model"
        );

        let path = self.path.clone();
        for model in &mut self.submodels {
            model.build(&path, factory)?;
        }
        Ok(())
    }

    fn resolve_translations(&self, names: &[String]) -> DevsResult<Vec<(String, String, String)>> {
        let mut resolved = Vec::new();
        for t in &self.spec.translations {
            let spec = NameSpec::parse(&t.destination).map_err(|reason| {
                DevsError::CouplingResolution {
                    path: self.path.clone(),
                    spec: t.destination.clone(),
                    reason,
                }
            })?;
            let targets = spec.expand(names.iter().map(String::as_str));
            if targets.is_empty() || spec.is_boundary() {
                return Err(DevsError::CouplingResolution {
                    path: self.path.clone(),
                    spec: t.destination.clone(),
                    reason: "port translation matches no submodel".to_string(),
                });
            }
            for target in targets {
                resolved.push((target, t.from_port.clone(), t.to_port.clone()));
            }
        }
        Ok(resolved)
    }
}

/// Atomic or coupled model
#[derive(Debug)]
pub enum Model {
    Atomic(AtomicModel),
    Coupled(CoupledModel),
}

impl Model {
    pub fn name(&self) -> &str {
        match self {
            Model::Atomic(m) => m.name(),
            Model::Coupled(m) => m.name(),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Model::Atomic(m) => m.path(),
            Model::Coupled(m) => m.path(),
        }
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self, Model::Atomic(_))
    }

    /// Assign paths and instantiate the subtree below this model
    pub fn build(&mut self, parent_path: &str, factory: &ModelFactory) -> DevsResult<()> {
        match self {
            Model::Atomic(m) => {
                m.build(parent_path);
                Ok(())
            }
            Model::Coupled(m) => m.build(parent_path, factory),
        }
    }
}

impl From<AtomicModel> for Model {
    fn from(m: AtomicModel) -> Self {
        Model::Atomic(m)
    }
}

impl From<CoupledModel> for Model {
    fn from(m: CoupledModel) -> Self {
        Model::Coupled(m)
    }
}
