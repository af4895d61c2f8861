//! Root coordinator
//!
//! Sits above the simulator tree and drives it:
//! 1. INIT(0) to the top simulator
//! 2. While `time_last < end_time`: activate the top simulator, then the
//!    root itself
//! 3. Each DONE(t) reaching the root advances `(time_last, time_next)` and
//!    sends STAR(t) back down
//!
//! A DONE announcing a time past the end time closes the run instead:
//! `time_last` is pinned to the end time and no further STAR is sent.

use devs_core::{
    DevsError, DevsResult, Event, LogSink, Message, MessageKind, SimTime, Tracer, Value,
};
use devs_model::ModelFactory;
use serde::{Deserialize, Serialize};

use crate::{Address, SimConfig, SimTree};

/// Output that left the top model through its boundary
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundaryOutput {
    pub time: SimTime,
    pub port: String,
    pub body: Option<Value>,
}

/// Result of a completed run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub time_last: SimTime,
    pub outputs: Vec<BoundaryOutput>,
}

/// Run counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RootStats {
    /// Root loop iterations
    pub steps: u64,
    /// STAR messages sent to the top simulator
    pub stars: u64,
    pub outputs: u64,
}

/// Drives a simulator tree to an end time
#[derive(Debug)]
pub struct RootCoordinator {
    tree: SimTree,
    config: SimConfig,
    time_last: SimTime,
    time_next: SimTime,
    initialized: bool,
    outputs: Vec<BoundaryOutput>,
    stats: RootStats,
}

impl RootCoordinator {
    /// Build the model tree through `factory` and wrap it in simulators
    pub fn new(
        factory: &ModelFactory,
        root: (&str, &str, &Value),
        config: SimConfig,
        tracer: Tracer,
    ) -> DevsResult<Self> {
        config.validate()?;
        let (type_id, name, arg) = root;
        let model = factory.build_root(type_id, name, arg)?;
        Ok(RootCoordinator {
            tree: SimTree::new(model, tracer),
            config,
            time_last: SimTime::new(-1.0),
            time_next: SimTime::ZERO,
            initialized: false,
            outputs: Vec::new(),
            stats: RootStats::default(),
        })
    }

    /// Like [`RootCoordinator::new`], with the trace sink configured from
    /// `config.trace` and backed by `tracing`
    pub fn with_log_trace(
        factory: &ModelFactory,
        root: (&str, &str, &Value),
        config: SimConfig,
    ) -> DevsResult<Self> {
        let tracer = Tracer::new(
            Box::new(LogSink::new(config.trace.layout)),
            config.trace.filter(),
        );
        Self::new(factory, root, config, tracer)
    }

    pub fn tree(&self) -> &SimTree {
        &self.tree
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn time_last(&self) -> SimTime {
        self.time_last
    }

    pub fn time_next(&self) -> SimTime {
        self.time_next
    }

    pub fn outputs(&self) -> &[BoundaryOutput] {
        &self.outputs
    }

    pub fn stats(&self) -> &RootStats {
        &self.stats
    }

    /// True once `time_last` has reached the end time
    pub fn is_finished(&self) -> bool {
        self.initialized && self.time_last >= self.config.end_time
    }

    /// Send INIT(0) down the tree
    pub fn initialize(&mut self) -> DevsResult<()> {
        if self.initialized {
            return Ok(());
        }
        tracing::info!(
            model = %self.tree.path(self.tree.top()),
            end_time = %self.config.end_time,
            "starting simulation"
        );
        let top = self.tree.top();
        self.tree.send(top.into(), Message::init(Address::Root, SimTime::ZERO));
        self.tree.activate(top)?;
        self.initialized = true;
        Ok(())
    }

    /// One iteration of the root loop. Returns whether the run goes on.
    pub fn step(&mut self) -> DevsResult<bool> {
        self.initialize()?;
        if self.is_finished() {
            return Ok(false);
        }
        self.tree.activate(self.tree.top())?;
        if self.tree.root_mailbox.is_empty() {
            return Err(DevsError::Stalled {
                time: self.time_last,
            });
        }
        self.activate()?;
        self.stats.steps += 1;
        if self.is_finished() {
            self.settle()?;
            return Ok(false);
        }
        Ok(true)
    }

    /// Run to the configured end time
    pub fn run(&mut self) -> DevsResult<SimulationReport> {
        while self.step()? {}
        tracing::info!(
            time_last = %self.time_last,
            outputs = self.outputs.len(),
            steps = self.stats.steps,
            trace_failures = self.tree.tracer().failures(),
            "simulation finished"
        );
        Ok(self.report())
    }

    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            time_last: self.time_last,
            outputs: self.outputs.clone(),
        }
    }

    fn activate(&mut self) -> DevsResult<()> {
        for kind in MessageKind::ALL {
            let queue = self.tree.root_mailbox.take(kind);
            for msg in queue {
                match (msg.kind, msg.payload) {
                    (MessageKind::Out, Some(event)) => self.on_output(msg.time, event),
                    (MessageKind::Done, _) => self.on_done(msg.time)?,
                    (kind, _) => {
                        return Err(DevsError::UnexpectedMessage {
                            path: "/".to_string(),
                            kind,
                        })
                    }
                }
            }
        }
        Ok(())
    }

    /// Collect what reached the root after the last STAR of the run.
    ///
    /// Outputs are reported. A leftover DONE only updates `time_next`; no
    /// further STAR is sent.
    fn settle(&mut self) -> DevsResult<()> {
        for kind in MessageKind::ALL {
            let queue = self.tree.root_mailbox.take(kind);
            for msg in queue {
                match (msg.kind, msg.payload) {
                    (MessageKind::Out, Some(event)) => self.on_output(msg.time, event),
                    (MessageKind::Done, _) => {
                        tracing::debug!(time_next = %msg.time, "run closed before next event");
                        self.time_next = msg.time;
                    }
                    (kind, _) => {
                        return Err(DevsError::UnexpectedMessage {
                            path: "/".to_string(),
                            kind,
                        })
                    }
                }
            }
        }
        Ok(())
    }

    fn on_output(&mut self, time: SimTime, event: Event) {
        tracing::info!(time = %time, output = %event, "boundary output");
        self.stats.outputs += 1;
        self.outputs.push(BoundaryOutput {
            time,
            port: event.port,
            body: event.body,
        });
    }

    fn on_done(&mut self, t: SimTime) -> DevsResult<()> {
        let end = self.config.end_time;
        if t > end {
            tracing::debug!(time_next = %t, end_time = %end, "next event past end time");
            self.time_last = end;
            self.time_next = t;
            return Ok(());
        }
        self.time_last = self.time_next;
        self.time_next = t;
        let top = self.tree.top();
        self.tree.send(top.into(), Message::star(Address::Root, t));
        self.stats.stars += 1;
        self.tree.activate(top)
    }
}

/// Build `root`, run it to `end_time` without tracing, and report
pub fn run_simulation(
    factory: &ModelFactory,
    root: (&str, &str, &Value),
    end_time: f64,
) -> DevsResult<SimulationReport> {
    RootCoordinator::new(factory, root, SimConfig::until(end_time), Tracer::disabled())?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use devs_core::{
        ExternalOutcome, MemorySink, PhaseTable, TraceError, TraceFilter, TraceOp, TraceRecord,
        TraceSink,
    };
    use devs_model::{AtomicModel, CoupledSpec};
    use proptest::prelude::*;
    use serde_json::json;

    fn ticker(period: f64) -> PhaseTable {
        PhaseTable::new()
            .time_advance("init", |_| SimTime::ZERO)
            .output("init", |_| None)
            .internal("init", |_| "tick".to_string())
            .time_advance("tick", move |_| SimTime::new(period))
            .output("tick", |s| Some(Event::with_body("tick", json!(s.get_u64("n").unwrap_or(0)))))
            .internal("tick", |s| {
                s.increment("n");
                "tick".to_string()
            })
    }

    fn passive() -> PhaseTable {
        PhaseTable::new()
            .time_advance("init", |_| SimTime::INFINITY)
            .external("init", |_, _, _| ExternalOutcome::NoChange)
    }

    fn factory() -> ModelFactory {
        let mut factory = ModelFactory::new();
        factory.register("Ticker", |name, arg| {
            Ok(AtomicModel::new(name, ticker(arg.as_f64().unwrap_or(1.0))).into())
        });
        factory.register("Passive", |name, _| Ok(AtomicModel::new(name, passive()).into()));
        factory.register_coupled("Clock", |arg| {
            Ok(CoupledSpec::new()
                .submodel("Ticker", "t", 1, arg.clone())
                .coupling("t", ["self"]))
        });
        factory.register_coupled("Twins", |arg| {
            Ok(CoupledSpec::new()
                .submodel("Ticker", "a", 1, arg.clone())
                .submodel("Ticker", "b", 1, arg.clone())
                .coupling("a", ["self"])
                .coupling("b", ["self"])
                .select(["a", "b"], "a"))
        });
        factory
    }

    struct BrokenSink;

    impl TraceSink for BrokenSink {
        fn on_transition(&mut self, _: &TraceRecord) -> Result<(), TraceError> {
            Err(TraceError::Sink("disk full".into()))
        }
    }

    fn twins(end: f64, tracer: Tracer) -> RootCoordinator {
        RootCoordinator::new(
            &factory(),
            ("Twins", "tw", &json!(5)),
            SimConfig::until(end),
            tracer,
        )
        .unwrap()
    }

    #[test]
    fn test_root_starts_before_zero() {
        let root = RootCoordinator::new(
            &factory(),
            ("Clock", "c", &json!(2)),
            SimConfig::until(5.0),
            Tracer::disabled(),
        )
        .unwrap();
        assert_eq!(root.time_last(), SimTime::new(-1.0));
        assert_eq!(root.time_next(), SimTime::ZERO);
        assert!(!root.is_finished());
    }

    #[test]
    fn test_clock_outputs_until_end() {
        let report = run_simulation(&factory(), ("Clock", "c", &json!(2)), 7.0).unwrap();
        let times: Vec<f64> = report.outputs.iter().map(|o| o.time.as_f64()).collect();
        assert_eq!(times, vec![2.0, 4.0, 6.0]);
        assert_eq!(report.outputs[0].port, "tick");
        assert_eq!(report.outputs[2].body, Some(json!(2)));
        assert_eq!(report.time_last, SimTime::new(7.0));
    }

    #[test]
    fn test_event_at_end_time_still_fires() {
        let report = run_simulation(&factory(), ("Clock", "c", &json!(2)), 6.0).unwrap();
        assert_eq!(report.outputs.len(), 3);
        assert_eq!(report.time_last, SimTime::new(6.0));
    }

    #[test]
    fn test_simultaneous_outputs_at_end_time_are_reported() {
        let mut root = twins(10.0, Tracer::disabled());
        let report = root.run().unwrap();
        let times: Vec<f64> = report.outputs.iter().map(|o| o.time.as_f64()).collect();
        assert_eq!(times, vec![5.0, 5.0, 10.0, 10.0]);
        assert_eq!(report.time_last, SimTime::new(10.0));
        assert_eq!(root.time_next(), SimTime::new(15.0));
        assert_eq!(root.tree().root_queued(), 0);

        let b = root.tree().find("/tw/b").unwrap();
        assert_eq!(root.tree().times(b), (SimTime::new(10.0), SimTime::new(15.0)));
    }

    #[test]
    fn test_tracing_does_not_change_the_run() {
        let plain = run_simulation(&factory(), ("Twins", "tw", &json!(5)), 23.0).unwrap();

        let sink = MemorySink::new();
        let mut traced = twins(23.0, Tracer::new(Box::new(sink.clone()), TraceFilter::all()));
        assert_eq!(traced.run().unwrap(), plain);
        assert!(sink.count(TraceOp::Select) > 0);
        assert!(sink.count(TraceOp::Internal) > 0);

        let mut broken = twins(23.0, Tracer::new(Box::new(BrokenSink), TraceFilter::all()));
        assert_eq!(broken.run().unwrap(), plain);
        assert!(broken.tree().tracer().failures() > 0);
    }

    #[test]
    fn test_log_trace_run_matches_untraced() {
        let plain = run_simulation(&factory(), ("Clock", "c", &json!(2)), 9.0).unwrap();
        let mut root = RootCoordinator::with_log_trace(
            &factory(),
            ("Clock", "c", &json!(2)),
            SimConfig::verbose(9.0),
        )
        .unwrap();
        assert!(root.tree().tracer().is_enabled());
        assert_eq!(root.run().unwrap(), plain);
    }

    #[test]
    fn test_passive_model_ends_immediately() {
        let mut root = RootCoordinator::new(
            &factory(),
            ("Passive", "p", &Value::Null),
            SimConfig::until(100.0),
            Tracer::disabled(),
        )
        .unwrap();
        let report = root.run().unwrap();
        assert!(report.outputs.is_empty());
        assert_eq!(report.time_last, SimTime::new(100.0));
        assert_eq!(root.time_next(), SimTime::INFINITY);
        assert_eq!(root.stats().stars, 0);
    }

    #[test]
    fn test_step_stops_after_finish() {
        let mut root = RootCoordinator::new(
            &factory(),
            ("Clock", "c", &json!(5)),
            SimConfig::until(4.0),
            Tracer::disabled(),
        )
        .unwrap();
        let mut steps = 0;
        while root.step().unwrap() {
            steps += 1;
            assert!(steps < 100);
        }
        assert!(root.is_finished());
        assert!(!root.step().unwrap());
        assert_eq!(root.time_last(), SimTime::new(4.0));
    }

    #[test]
    fn test_build_errors_surface() {
        let err = RootCoordinator::new(
            &factory(),
            ("Nope", "n", &Value::Null),
            SimConfig::default(),
            Tracer::disabled(),
        )
        .unwrap_err();
        assert_eq!(err, DevsError::UnknownModelType("Nope".into()));

        let err = run_simulation(&factory(), ("Clock", "c", &json!(1)), f64::INFINITY).unwrap_err();
        assert!(matches!(err, DevsError::Config(_)));
    }

    proptest! {
        #[test]
        fn prop_clock_ticks_up_to_end(period in 1u32..6, end in 0u32..40) {
            let report = run_simulation(&factory(), ("Clock", "c", &json!(period)), end as f64).unwrap();
            prop_assert_eq!(report.outputs.len() as u32, end / period);
            prop_assert_eq!(report.time_last, SimTime::new(end as f64));
            for (k, out) in report.outputs.iter().enumerate() {
                prop_assert_eq!(out.time, SimTime::new(((k as u32 + 1) * period) as f64));
            }
        }
    }
}
