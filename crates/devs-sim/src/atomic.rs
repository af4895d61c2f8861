//! Atomic simulator
//!
//! Drives one atomic model through the protocol:
//! - INIT: schedule the first internal event
//! - STAR: output, internal transition, reschedule
//! - IN: external transition, reschedule when accepted
//!
//! Every handler acknowledges its parent with DONE(time_next).

use devs_core::{DevsError, DevsResult, Event, Message, MessageKind, SimTime, TraceOp};

use crate::{Address, SimId, SimTree};

impl SimTree {
    pub(crate) fn dispatch_atomic(&mut self, i: usize, msg: Message<Address>) -> DevsResult<()> {
        match msg.kind {
            MessageKind::Init => self.atomic_init(i, msg.time),
            MessageKind::Star => self.atomic_star(i, msg.time),
            MessageKind::In => match msg.payload {
                Some(input) => self.atomic_input(i, msg.time, input),
                None => Err(self.unexpected(SimId::Atomic(i), msg.kind)),
            },
            MessageKind::Out | MessageKind::Done => Err(self.unexpected(SimId::Atomic(i), msg.kind)),
        }
    }

    fn atomic_init(&mut self, i: usize, t: SimTime) -> DevsResult<()> {
        let ta = self.atomic_time_advance(i, t)?;
        let sim = &mut self.atomics[i];
        sim.time_last = t;
        sim.time_next = t + ta;
        self.atomic_done(i, t);
        Ok(())
    }

    fn atomic_star(&mut self, i: usize, t: SimTime) -> DevsResult<()> {
        let id = SimId::Atomic(i);
        if t != self.atomics[i].time_next {
            return Err(self.timing_violation(id, MessageKind::Star, t));
        }

        let output = self.atomics[i].model.output()?;
        if self.tracer.is_enabled() {
            let phase = self.atomics[i].model.phase().to_string();
            let label = output
                .as_ref()
                .map(|e| e.port.clone())
                .unwrap_or_else(|| "None".to_string());
            self.emit(id, TraceOp::Output, phase, label, None, t);
        }
        if let Some(event) = output {
            let parent = self.atomics[i].parent;
            self.send(parent, Message::output(Address::Node(id), t, event));
        }

        let old = self.atomics[i].model.phase().to_string();
        self.atomics[i].model.internal()?;
        let new = self.atomics[i].model.phase().to_string();
        self.emit(id, TraceOp::Internal, old, new, None, t);
        self.flush_state_writes(i, t);

        let ta = self.atomic_time_advance(i, t)?;
        let sim = &mut self.atomics[i];
        sim.time_next = t + ta;
        sim.time_last = t;
        self.atomic_done(i, t);
        Ok(())
    }

    fn atomic_input(&mut self, i: usize, t: SimTime, input: Event) -> DevsResult<()> {
        let id = SimId::Atomic(i);
        let (time_last, time_next) = (self.atomics[i].time_last, self.atomics[i].time_next);
        if !t.within(time_last, time_next) {
            return Err(self.timing_violation(id, MessageKind::In, t));
        }

        let elapsed = t - time_last;
        let old = self.atomics[i].model.phase().to_string();
        let accepted = self.atomics[i].model.external(elapsed, &input)?;
        let new = if accepted {
            self.atomics[i].model.phase().to_string()
        } else {
            "(cont)".to_string()
        };
        self.emit(id, TraceOp::External, old, new, Some(input.port.clone()), t);
        self.flush_state_writes(i, t);

        if accepted {
            let ta = self.atomic_time_advance(i, t)?;
            let sim = &mut self.atomics[i];
            sim.time_last = t;
            sim.time_next = t + ta;
        }
        self.atomic_done(i, t);
        Ok(())
    }

    fn atomic_time_advance(&mut self, i: usize, t: SimTime) -> DevsResult<SimTime> {
        let ta = self.atomics[i].model.time_advance()?;
        if self.tracer.is_enabled() {
            let phase = self.atomics[i].model.phase().to_string();
            self.emit(SimId::Atomic(i), TraceOp::TimeAdvance, phase, ta.to_string(), None, t);
        }
        Ok(ta)
    }

    /// Forward the state journal as `set` records
    fn flush_state_writes(&mut self, i: usize, t: SimTime) {
        let writes = self.atomics[i].model.take_state_writes();
        for (key, value) in writes {
            self.emit(SimId::Atomic(i), TraceOp::Set, key, value.to_string(), None, t);
        }
    }

    fn atomic_done(&mut self, i: usize, t: SimTime) {
        let sim = &self.atomics[i];
        let (parent, time_next) = (sim.parent, sim.time_next);
        tracing::debug!(
            sim = %sim.model.path(),
            phase = sim.model.phase(),
            time = %t,
            time_next = %time_next,
            "atomic done"
        );
        self.send(parent, Message::done(Address::Node(SimId::Atomic(i)), time_next));
    }

    pub(crate) fn unexpected(&self, id: SimId, kind: MessageKind) -> DevsError {
        DevsError::UnexpectedMessage {
            path: self.path(id).to_string(),
            kind,
        }
    }
}
