//! Transition tracing
//!
//! Tracing is a side channel: simulators report every behavior dispatch,
//! every select decision and every state write to an optional sink. Whether
//! a sink is installed, filtered out, or failing never changes what the
//! simulation computes.

use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::SimTime;

/// What was traced
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraceOp {
    Internal,
    External,
    TimeAdvance,
    Output,
    Select,
    Set,
}

impl TraceOp {
    pub const ALL: [TraceOp; 6] = [
        TraceOp::Internal,
        TraceOp::External,
        TraceOp::TimeAdvance,
        TraceOp::Output,
        TraceOp::Select,
        TraceOp::Set,
    ];

    /// Short label used in filters and trace lines
    pub fn label(self) -> &'static str {
        match self {
            TraceOp::Internal => "dint",
            TraceOp::External => "dext",
            TraceOp::TimeAdvance => "ta",
            TraceOp::Output => "out",
            TraceOp::Select => "slct",
            TraceOp::Set => "set",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        TraceOp::ALL.into_iter().find(|op| op.label() == label)
    }
}

impl fmt::Display for TraceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One traced step
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Path of the model the step belongs to
    pub path: String,
    pub op: TraceOp,
    /// Label before the step (phase, or state key for `set`)
    pub old: String,
    /// Label after the step (phase, duration, port, candidates or value)
    pub new: String,
    /// Extra context: input port for `dext`, winner for `slct`
    pub detail: Option<String>,
    /// Simulated time of the message being handled
    pub time: SimTime,
}

/// Failures reported by a trace sink
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("trace I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("trace sink failure: {0}")]
    Sink(String),
}

/// Consumer of trace records
pub trait TraceSink {
    fn on_transition(&mut self, record: &TraceRecord) -> Result<(), TraceError>;
}

/// Which operations and which model paths get traced; `"*"` matches all
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceFilter {
    pub ops: Vec<String>,
    pub paths: Vec<String>,
}

impl TraceFilter {
    pub fn new<O, P>(ops: O, paths: P) -> Self
    where
        O: IntoIterator,
        O::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        TraceFilter {
            ops: ops.into_iter().map(Into::into).collect(),
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Trace everything
    pub fn all() -> Self {
        Self::new(["*"], ["*"])
    }

    /// Trace nothing
    pub fn none() -> Self {
        Self::new(Vec::<String>::new(), Vec::<String>::new())
    }

    pub fn allows(&self, record: &TraceRecord) -> bool {
        let op_ok = self.ops.iter().any(|o| o == "*" || o == record.op.label());
        let path_ok = self.paths.iter().any(|p| p == "*" || *p == record.path);
        op_ok && path_ok
    }
}

impl Default for TraceFilter {
    fn default() -> Self {
        Self::all()
    }
}

/// Column layout for rendered trace lines
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceLayout {
    pub path_width: usize,
    pub state_width: usize,
}

impl Default for TraceLayout {
    fn default() -> Self {
        TraceLayout {
            path_width: 17,
            state_width: 9,
        }
    }
}

impl TraceLayout {
    /// Render a record as one aligned line
    pub fn render(&self, record: &TraceRecord) -> String {
        let path = shrink(self.path_width, &record.path);
        let detail = match (&record.detail, record.op) {
            (Some(d), TraceOp::Select) => format!(" : {}", d),
            (Some(d), _) => format!(" in={}", d),
            (None, _) => String::new(),
        };
        format!(
            "t:{time} {path:pw$}{op:>4}({old:sw$}) -> {new:sw$}{detail}",
            time = record.time,
            path = path,
            pw = self.path_width,
            op = record.op.label(),
            old = record.old,
            new = record.new,
            sw = self.state_width,
            detail = detail,
        )
    }
}

/// Keep the tail of `s` when it exceeds `max` characters
pub fn shrink(max: usize, s: &str) -> String {
    let count = s.chars().count();
    if count <= max || max < 3 {
        return s.to_string();
    }
    let tail: String = s.chars().skip(count - (max - 3)).collect();
    format!("...{}", tail)
}

/// Emits rendered trace lines through `tracing`
#[derive(Clone, Debug, Default)]
pub struct LogSink {
    layout: TraceLayout,
}

impl LogSink {
    pub fn new(layout: TraceLayout) -> Self {
        LogSink { layout }
    }
}

impl TraceSink for LogSink {
    fn on_transition(&mut self, record: &TraceRecord) -> Result<(), TraceError> {
        tracing::info!(target: "devs::trace", "{}", self.layout.render(record));
        Ok(())
    }
}

/// Writes rendered trace lines to any writer
pub struct WriterSink<W: Write> {
    writer: W,
    layout: TraceLayout,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W, layout: TraceLayout) -> Self {
        WriterSink { writer, layout }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TraceSink for WriterSink<W> {
    fn on_transition(&mut self, record: &TraceRecord) -> Result<(), TraceError> {
        writeln!(self.writer, "{}", self.layout.render(record))?;
        Ok(())
    }
}

/// Collects records in a shared buffer; clones share the same buffer
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    records: Rc<RefCell<Vec<TraceRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.borrow().clone()
    }

    pub fn count(&self, op: TraceOp) -> usize {
        self.records.borrow().iter().filter(|r| r.op == op).count()
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}

impl TraceSink for MemorySink {
    fn on_transition(&mut self, record: &TraceRecord) -> Result<(), TraceError> {
        self.records.borrow_mut().push(record.clone());
        Ok(())
    }
}

/// Optional sink plus filter, as installed on a simulation
#[derive(Default)]
pub struct Tracer {
    sink: Option<Box<dyn TraceSink>>,
    filter: TraceFilter,
    failures: u64,
}

impl Tracer {
    /// Tracer with no sink; every emit is a no-op
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn new(sink: Box<dyn TraceSink>, filter: TraceFilter) -> Self {
        Tracer {
            sink: Some(sink),
            filter,
            failures: 0,
        }
    }

    /// True when a sink is installed
    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Hand a record to the sink. Sink failures are logged and dropped.
    pub fn emit(&mut self, record: TraceRecord) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        if !self.filter.allows(&record) {
            return;
        }
        if let Err(e) = sink.on_transition(&record) {
            self.failures += 1;
            tracing::warn!(path = %record.path, op = %record.op, "trace sink failed: {}", e);
        }
    }

    /// Number of records the sink failed to accept
    pub fn failures(&self) -> u64 {
        self.failures
    }
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("enabled", &self.sink.is_some())
            .field("filter", &self.filter)
            .field("failures", &self.failures)
            .finish()
    }
}
