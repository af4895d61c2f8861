//! Coupled simulator (coordinator)
//!
//! Routes messages between a coupled model's children along its resolved
//! couplings and keeps the coordinator's times in step with theirs. Work
//! handed to a child marks it active; once every active child has answered
//! with DONE the coordinator recomputes its times and answers its own parent.

use std::collections::BTreeSet;

use devs_core::{DevsError, DevsResult, Event, Message, MessageKind, SimTime, TraceOp};
use devs_model::SELF;

use crate::{Address, SimId, SimTree};

impl SimTree {
    pub(crate) fn dispatch_coupled(&mut self, i: usize, msg: Message<Address>) -> DevsResult<()> {
        let id = SimId::Coupled(i);
        match (msg.kind, msg.payload) {
            (MessageKind::Init, _) => self.coupled_init(i, msg.time),
            (MessageKind::Star, _) => self.coupled_star(i, msg.time),
            (MessageKind::In, Some(input)) => self.coupled_input(i, msg.time, input),
            (MessageKind::Out, Some(output)) => self.coupled_output(i, msg.from, msg.time, output),
            (MessageKind::Done, _) => self.coupled_done(i, msg.from),
            (kind, None) => Err(self.unexpected(id, kind)),
        }
    }

    fn coupled_init(&mut self, i: usize, t: SimTime) -> DevsResult<()> {
        let children = self.children(SimId::Coupled(i));
        if children.is_empty() {
            let sim = &mut self.coupleds[i];
            sim.time_last = t;
            sim.time_next = SimTime::INFINITY;
            self.coupled_report(i);
            return Ok(());
        }
        for child in children {
            self.hand_over(i, child, Message::init(Address::Node(SimId::Coupled(i)), t))?;
        }
        Ok(())
    }

    fn coupled_star(&mut self, i: usize, t: SimTime) -> DevsResult<()> {
        let id = SimId::Coupled(i);
        if t != self.coupleds[i].time_next {
            return Err(self.timing_violation(id, MessageKind::Star, t));
        }

        let imminent: Vec<(String, SimId)> = self.coupleds[i]
            .children
            .iter()
            .filter(|(_, c)| self.times(*c).1 == t)
            .cloned()
            .collect();

        let winner = match imminent.as_slice() {
            [] => {
                return Err(DevsError::SelectionFailure {
                    path: self.path(id).to_string(),
                    candidates: Vec::new(),
                    time: t,
                })
            }
            [(_, only)] => *only,
            several => {
                let names: BTreeSet<String> = several.iter().map(|(n, _)| n.clone()).collect();
                let chosen = self.coupleds[i].model.select(&names, t)?;
                let candidates = format!("{{{}}}", names.iter().cloned().collect::<Vec<_>>().join(", "));
                self.emit(id, TraceOp::Select, String::new(), candidates, Some(chosen.clone()), t);
                self.child_named(i, &chosen)?
            }
        };

        self.hand_over(i, winner, Message::star(Address::Node(id), t))
    }

    fn coupled_input(&mut self, i: usize, t: SimTime, input: Event) -> DevsResult<()> {
        let id = SimId::Coupled(i);
        let (time_last, time_next) = self.times(id);
        if !t.within(time_last, time_next) {
            return Err(self.timing_violation(id, MessageKind::In, t));
        }

        let destinations = self.coupleds[i].model.routing().external_inputs().to_vec();
        if destinations.is_empty() {
            tracing::debug!(sim = %self.path(id), port = %input.port, "input has no external coupling");
            self.coupled_report(i);
            return Ok(());
        }
        for dst in destinations {
            let child = self.child_named(i, &dst)?;
            let port = self.coupleds[i].model.translate_port(&dst, &input.port).to_string();
            let event = Event::new(port, input.body.clone());
            self.hand_over(i, child, Message::input(Address::Node(id), t, event))?;
        }
        Ok(())
    }

    fn coupled_output(&mut self, i: usize, from: Address, t: SimTime, output: Event) -> DevsResult<()> {
        let id = SimId::Coupled(i);
        if output.body.is_none() {
            tracing::debug!(sim = %self.path(id), port = %output.port, "discarding output without body");
            return Ok(());
        }
        let source = self.child_name(i, from, MessageKind::Out)?;
        let destinations = self.coupleds[i].model.routing().destinations(&source).to_vec();
        if destinations.is_empty() {
            tracing::debug!(sim = %self.path(id), source = %source, "output has no coupling");
        }
        for dst in destinations {
            if dst == SELF {
                let parent = self.coupleds[i].parent;
                self.send(parent, Message::output(Address::Node(id), t, output.clone()));
            } else {
                let child = self.child_named(i, &dst)?;
                self.hand_over(i, child, Message::input(from, t, output.clone()))?;
            }
        }
        Ok(())
    }

    fn coupled_done(&mut self, i: usize, from: Address) -> DevsResult<()> {
        let id = SimId::Coupled(i);
        let child = match from {
            Address::Node(child) => child,
            Address::Root => return Err(self.unexpected(id, MessageKind::Done)),
        };
        let Some(pos) = self.coupleds[i].active.iter().position(|(c, _)| *c == child) else {
            return Err(self.unexpected(id, MessageKind::Done));
        };
        let active = &mut self.coupleds[i].active;
        active[pos].1 -= 1;
        if active[pos].1 == 0 {
            active.remove(pos);
        }
        if active.is_empty() {
            self.aggregate(i);
            self.coupled_report(i);
        }
        Ok(())
    }

    /// Send `msg` to a child, record the DONE it owes, and activate it
    fn hand_over(&mut self, i: usize, child: SimId, msg: Message<Address>) -> DevsResult<()> {
        self.send(Address::Node(child), msg);
        let active = &mut self.coupleds[i].active;
        match active.iter_mut().find(|(c, _)| *c == child) {
            Some((_, owed)) => *owed += 1,
            None => active.push((child, 1)),
        }
        self.activate(child)
    }

    /// time_last = max, time_next = min over all children
    fn aggregate(&mut self, i: usize) {
        let children = self.children(SimId::Coupled(i));
        let mut time_last = SimTime::new(f64::NEG_INFINITY);
        let mut time_next = SimTime::INFINITY;
        for child in children {
            let (tl, tn) = self.times(child);
            time_last = time_last.max(tl);
            time_next = time_next.min(tn);
        }
        let sim = &mut self.coupleds[i];
        sim.time_last = time_last;
        sim.time_next = time_next;
    }

    fn coupled_report(&mut self, i: usize) {
        let sim = &self.coupleds[i];
        let (parent, time_last, time_next) = (sim.parent, sim.time_last, sim.time_next);
        tracing::debug!(
            sim = %sim.model.path(),
            time_last = %time_last,
            time_next = %time_next,
            "coupled done"
        );
        self.send(parent, Message::done(Address::Node(SimId::Coupled(i)), time_next));
    }

    fn child_named(&self, i: usize, name: &str) -> DevsResult<SimId> {
        self.coupleds[i]
            .children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| *c)
            .ok_or_else(|| DevsError::CouplingResolution {
                path: self.path(SimId::Coupled(i)).to_string(),
                spec: name.to_string(),
                reason: "no such child simulator".to_string(),
            })
    }

    fn child_name(&self, i: usize, from: Address, kind: MessageKind) -> DevsResult<String> {
        let id = SimId::Coupled(i);
        let Address::Node(sender) = from else {
            return Err(self.unexpected(id, kind));
        };
        self.coupleds[i]
            .children
            .iter()
            .find(|(_, c)| *c == sender)
            .map(|(n, _)| n.clone())
            .ok_or_else(|| self.unexpected(id, kind))
    }
}
