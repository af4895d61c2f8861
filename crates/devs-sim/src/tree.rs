//! Simulator tree
//!
//! Simulators live in two arenas (atomic and coupled) and refer to each
//! other by [`SimId`]. The tree mirrors the model tree one to one; the root
//! coordinator sits above it and is addressed as [`Address::Root`].
//!
//! Message passing is synchronous: a handler pushes a message into the
//! receiver's mailbox and, when the protocol asks for it, activates the
//! receiver right away. Recursion depth is bounded by the hierarchy depth.

use std::fmt;

use devs_core::{
    DevsError, DevsResult, Mailbox, Message, MessageKind, SimTime, StateMap, TraceOp, TraceRecord,
    Tracer,
};
use devs_model::{AtomicModel, CoupledModel, Model};

/// Handle of a simulator in the tree
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SimId {
    Atomic(usize),
    Coupled(usize),
}

/// Message endpoint: a simulator, or the root coordinator above the tree
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Address {
    Root,
    Node(SimId),
}

impl From<SimId> for Address {
    fn from(id: SimId) -> Self {
        Address::Node(id)
    }
}

pub(crate) struct AtomicSim {
    pub(crate) model: AtomicModel,
    pub(crate) parent: Address,
    pub(crate) time_last: SimTime,
    pub(crate) time_next: SimTime,
    pub(crate) mailbox: Mailbox<Address>,
}

pub(crate) struct CoupledSim {
    pub(crate) model: CoupledModel,
    pub(crate) parent: Address,
    pub(crate) time_last: SimTime,
    pub(crate) time_next: SimTime,
    pub(crate) mailbox: Mailbox<Address>,
    /// Children in declaration order
    pub(crate) children: Vec<(String, SimId)>,
    /// Children with unacknowledged work, with the number of DONEs owed
    pub(crate) active: Vec<(SimId, u32)>,
}

/// Kind of simulator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimKind {
    Atomic,
    Coupled,
}

/// Read-only snapshot of one simulator
#[derive(Clone, Debug, PartialEq)]
pub struct NodeInfo {
    pub id: SimId,
    pub path: String,
    pub kind: SimKind,
    pub time_last: SimTime,
    pub time_next: SimTime,
    pub children: Vec<SimId>,
    /// DONE acknowledgments still owed to this simulator
    pub pending: u32,
    /// Current phase, atomic simulators only
    pub phase: Option<String>,
}

/// Arena of simulators plus the root coordinator's mailbox
pub struct SimTree {
    pub(crate) atomics: Vec<AtomicSim>,
    pub(crate) coupleds: Vec<CoupledSim>,
    pub(crate) root_mailbox: Mailbox<Address>,
    pub(crate) tracer: Tracer,
    top: SimId,
}

impl SimTree {
    /// Wrap a built model tree in simulators
    pub fn new(model: Model, tracer: Tracer) -> Self {
        let mut tree = SimTree {
            atomics: Vec::new(),
            coupleds: Vec::new(),
            root_mailbox: Mailbox::new(),
            tracer,
            top: SimId::Atomic(0),
        };
        tree.top = tree.insert(model, Address::Root);
        tracing::debug!(
            atomics = tree.atomics.len(),
            coupleds = tree.coupleds.len(),
            "built simulator tree"
        );
        tree
    }

    fn insert(&mut self, model: Model, parent: Address) -> SimId {
        match model {
            Model::Atomic(model) => {
                self.atomics.push(AtomicSim {
                    model,
                    parent,
                    time_last: SimTime::ZERO,
                    time_next: SimTime::ZERO,
                    mailbox: Mailbox::new(),
                });
                SimId::Atomic(self.atomics.len() - 1)
            }
            Model::Coupled(mut model) => {
                let submodels = model.take_submodels();
                let idx = self.coupleds.len();
                self.coupleds.push(CoupledSim {
                    model,
                    parent,
                    time_last: SimTime::ZERO,
                    time_next: SimTime::ZERO,
                    mailbox: Mailbox::new(),
                    children: Vec::with_capacity(submodels.len()),
                    active: Vec::new(),
                });
                let id = SimId::Coupled(idx);
                for sub in submodels {
                    let name = sub.name().to_string();
                    let child = self.insert(sub, Address::Node(id));
                    self.coupleds[idx].children.push((name, child));
                }
                id
            }
        }
    }

    /// Simulator of the top model
    pub fn top(&self) -> SimId {
        self.top
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Enqueue without activating
    pub fn send(&mut self, to: Address, msg: Message<Address>) {
        match to {
            Address::Root => self.root_mailbox.push(msg),
            Address::Node(id) => self.mailbox_mut(id).push(msg),
        }
    }

    pub(crate) fn mailbox_mut(&mut self, id: SimId) -> &mut Mailbox<Address> {
        match id {
            SimId::Atomic(i) => &mut self.atomics[i].mailbox,
            SimId::Coupled(i) => &mut self.coupleds[i].mailbox,
        }
    }

    /// Drain `id`'s mailbox kind by kind, in priority order.
    ///
    /// Each kind's queue is moved out before dispatch, so a message pushed
    /// for an already-drained kind waits for the next activation.
    pub fn activate(&mut self, id: SimId) -> DevsResult<()> {
        for kind in MessageKind::ALL {
            let queue = self.mailbox_mut(id).take(kind);
            for msg in queue {
                self.dispatch(id, msg)?;
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, id: SimId, msg: Message<Address>) -> DevsResult<()> {
        tracing::debug!(
            sim = %self.path(id),
            kind = %msg.kind,
            time = %msg.time,
            "dispatch"
        );
        match id {
            SimId::Atomic(i) => self.dispatch_atomic(i, msg),
            SimId::Coupled(i) => self.dispatch_coupled(i, msg),
        }
    }

    pub(crate) fn emit(
        &mut self,
        id: SimId,
        op: TraceOp,
        old: String,
        new: String,
        detail: Option<String>,
        time: SimTime,
    ) {
        if !self.tracer.is_enabled() {
            return;
        }
        let path = self.path(id).to_string();
        self.tracer.emit(TraceRecord {
            path,
            op,
            old,
            new,
            detail,
            time,
        });
    }

    // ====================================================================
    // Introspection
    // ====================================================================

    pub fn path(&self, id: SimId) -> &str {
        match id {
            SimId::Atomic(i) => self.atomics[i].model.path(),
            SimId::Coupled(i) => self.coupleds[i].model.path(),
        }
    }

    /// `(time_last, time_next)` of a simulator
    pub fn times(&self, id: SimId) -> (SimTime, SimTime) {
        match id {
            SimId::Atomic(i) => (self.atomics[i].time_last, self.atomics[i].time_next),
            SimId::Coupled(i) => (self.coupleds[i].time_last, self.coupleds[i].time_next),
        }
    }

    pub fn children(&self, id: SimId) -> Vec<SimId> {
        match id {
            SimId::Atomic(_) => Vec::new(),
            SimId::Coupled(i) => self.coupleds[i].children.iter().map(|(_, c)| *c).collect(),
        }
    }

    /// DONE acknowledgments still owed to `id`
    pub fn pending(&self, id: SimId) -> u32 {
        match id {
            SimId::Atomic(_) => 0,
            SimId::Coupled(i) => self.coupleds[i].active.iter().map(|(_, n)| n).sum(),
        }
    }

    pub fn phase(&self, id: SimId) -> Option<&str> {
        match id {
            SimId::Atomic(i) => Some(self.atomics[i].model.phase()),
            SimId::Coupled(_) => None,
        }
    }

    pub fn state(&self, id: SimId) -> Option<&StateMap> {
        match id {
            SimId::Atomic(i) => Some(self.atomics[i].model.state()),
            SimId::Coupled(_) => None,
        }
    }

    /// Messages waiting in `id`'s mailbox
    pub fn queued(&self, id: SimId) -> usize {
        match id {
            SimId::Atomic(i) => self.atomics[i].mailbox.total(),
            SimId::Coupled(i) => self.coupleds[i].mailbox.total(),
        }
    }

    /// Messages waiting for the root coordinator
    pub fn root_queued(&self) -> usize {
        self.root_mailbox.total()
    }

    /// All simulators, top-down in build order
    pub fn ids(&self) -> Vec<SimId> {
        let mut ids = Vec::with_capacity(self.atomics.len() + self.coupleds.len());
        let mut stack = vec![self.top];
        while let Some(id) = stack.pop() {
            ids.push(id);
            let mut children = self.children(id);
            children.reverse();
            stack.extend(children);
        }
        ids
    }

    pub fn find(&self, path: &str) -> Option<SimId> {
        self.ids().into_iter().find(|id| self.path(*id) == path)
    }

    pub fn info(&self, id: SimId) -> NodeInfo {
        let (time_last, time_next) = self.times(id);
        NodeInfo {
            id,
            path: self.path(id).to_string(),
            kind: match id {
                SimId::Atomic(_) => SimKind::Atomic,
                SimId::Coupled(_) => SimKind::Coupled,
            },
            time_last,
            time_next,
            children: self.children(id),
            pending: self.pending(id),
            phase: self.phase(id).map(str::to_string),
        }
    }

    pub(crate) fn timing_violation(&self, id: SimId, kind: MessageKind, time: SimTime) -> DevsError {
        let (time_last, time_next) = self.times(id);
        DevsError::ProtocolTimingViolation {
            path: self.path(id).to_string(),
            kind,
            time,
            time_last,
            time_next,
        }
    }
}

impl fmt::Debug for SimTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimTree")
            .field("top", &self.top)
            .field("atomics", &self.atomics.len())
            .field("coupleds", &self.coupleds.len())
            .field("tracer", &self.tracer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devs_core::{Event, PhaseTable, Value};
    use devs_model::{CoupledSpec, ModelFactory};

    fn idle_table() -> PhaseTable {
        PhaseTable::new()
            .time_advance("init", |_| SimTime::new(2.0))
            .output("init", |_| Some(Event::new("done", None)))
            .internal("init", |_| "idle".to_string())
            .time_advance("idle", |_| SimTime::INFINITY)
    }

    fn pair() -> Model {
        let mut factory = ModelFactory::new();
        factory.register("Idle", |name, _| Ok(AtomicModel::new(name, idle_table()).into()));
        factory.register_coupled("Pair", |_| {
            Ok(CoupledSpec::new()
                .submodel("Idle", "a", 1, Value::Null)
                .submodel("Idle", "b", 2, Value::Null))
        });
        factory.build_root("Pair", "pair", &Value::Null).unwrap()
    }

    #[test]
    fn test_tree_mirrors_model() {
        let tree = SimTree::new(pair(), Tracer::disabled());
        let top = tree.top();
        assert_eq!(tree.path(top), "/pair");
        let paths: Vec<&str> = tree.children(top).into_iter().map(|c| tree.path(c)).collect();
        assert_eq!(paths, vec!["/pair/a", "/pair/b:0", "/pair/b:1"]);
        assert_eq!(tree.ids().len(), 4);
        assert_eq!(tree.find("/pair/b:1"), Some(SimId::Atomic(2)));
        assert_eq!(tree.find("/pair/c"), None);
    }

    #[test]
    fn test_activate_empty_mailbox_is_noop() {
        let mut tree = SimTree::new(pair(), Tracer::disabled());
        let before: Vec<NodeInfo> = tree.ids().into_iter().map(|id| tree.info(id)).collect();
        tree.activate(tree.top()).unwrap();
        let after: Vec<NodeInfo> = tree.ids().into_iter().map(|id| tree.info(id)).collect();
        assert_eq!(before, after);
        assert_eq!(tree.root_mailbox.total(), 0);
    }

    #[test]
    fn test_init_aggregates_children() {
        let mut tree = SimTree::new(pair(), Tracer::disabled());
        let top = tree.top();
        tree.send(top.into(), Message::init(Address::Root, SimTime::ZERO));
        tree.activate(top).unwrap();

        let info = tree.info(top);
        assert_eq!(info.pending, 0);
        assert_eq!(info.time_last, SimTime::ZERO);
        assert_eq!(info.time_next, SimTime::new(2.0));
        assert_eq!(tree.root_mailbox.len(MessageKind::Done), 1);
    }
}
