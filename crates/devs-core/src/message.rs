//! Synchronization messages and per-kind mailboxes
//!
//! Simulators talk to each other exclusively through five message kinds.
//! Each simulator owns a [`Mailbox`] holding one FIFO queue per kind; an
//! activation drains the queues in kind priority order.

use std::collections::VecDeque;
use std::fmt;

use crate::{Event, SimTime};

/// Message kind, declared in dispatch priority order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum MessageKind {
    Init = 0,
    Star = 1,
    Out = 2,
    In = 3,
    Done = 4,
}

impl MessageKind {
    /// All kinds, highest priority first
    pub const ALL: [MessageKind; 5] = [
        MessageKind::Init,
        MessageKind::Star,
        MessageKind::Out,
        MessageKind::In,
        MessageKind::Done,
    ];

    pub const COUNT: usize = 5;

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageKind::Init => "INIT",
            MessageKind::Star => "STAR",
            MessageKind::Out => "OUT",
            MessageKind::In => "IN",
            MessageKind::Done => "DONE",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A synchronization message sent by `S`
///
/// `IN` and `OUT` carry an [`Event`]; the other kinds carry nothing.
#[derive(Clone, Debug, PartialEq)]
pub struct Message<S> {
    pub kind: MessageKind,
    pub from: S,
    pub time: SimTime,
    pub payload: Option<Event>,
}

impl<S> Message<S> {
    pub fn init(from: S, time: SimTime) -> Self {
        Message {
            kind: MessageKind::Init,
            from,
            time,
            payload: None,
        }
    }

    pub fn star(from: S, time: SimTime) -> Self {
        Message {
            kind: MessageKind::Star,
            from,
            time,
            payload: None,
        }
    }

    pub fn output(from: S, time: SimTime, event: Event) -> Self {
        Message {
            kind: MessageKind::Out,
            from,
            time,
            payload: Some(event),
        }
    }

    pub fn input(from: S, time: SimTime, event: Event) -> Self {
        Message {
            kind: MessageKind::In,
            from,
            time,
            payload: Some(event),
        }
    }

    pub fn done(from: S, time: SimTime) -> Self {
        Message {
            kind: MessageKind::Done,
            from,
            time,
            payload: None,
        }
    }
}

/// One FIFO queue per message kind
#[derive(Debug)]
pub struct Mailbox<S> {
    queues: [VecDeque<Message<S>>; MessageKind::COUNT],
}

impl<S> Mailbox<S> {
    pub fn new() -> Self {
        Mailbox {
            queues: Default::default(),
        }
    }

    /// Append a message to the queue of its kind
    pub fn push(&mut self, msg: Message<S>) {
        self.queues[msg.kind.index()].push_back(msg);
    }

    /// Move the whole queue for `kind` out, leaving it empty.
    ///
    /// Messages pushed after this call land in the fresh queue and are only
    /// seen by a later `take`.
    pub fn take(&mut self, kind: MessageKind) -> VecDeque<Message<S>> {
        std::mem::take(&mut self.queues[kind.index()])
    }

    pub fn len(&self, kind: MessageKind) -> usize {
        self.queues[kind.index()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(VecDeque::is_empty)
    }

    pub fn total(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }
}

impl<S> Default for Mailbox<S> {
    fn default() -> Self {
        Self::new()
    }
}
