//! Processor: serves one job at a time
//!
//! Phases:
//! - `init`: ta 0, then `idle`
//! - `idle`: passive; an input job is remembered and the processor turns `busy`
//! - `busy`: ta = service time, output `("job", {"job": <job>})`, then `idle`;
//!   inputs arriving meanwhile are counted in `missed` and otherwise ignored

use devs_core::{DevsResult, Event, ExternalOutcome, PhaseTable, SimTime, Value};
use devs_model::{duration_arg, AtomicModel, Model};
use serde_json::json;

pub const PROCESSOR: &str = "Processor";

pub fn processor_table(service_time: SimTime) -> PhaseTable {
    PhaseTable::new()
        .time_advance("init", |_| SimTime::ZERO)
        .output("init", |_| None)
        .internal("init", |_| "idle".to_string())
        .time_advance("idle", |_| SimTime::INFINITY)
        .external("idle", |s, _, input| {
            let job = input.field("job").cloned().unwrap_or(Value::Null);
            s.insert("job", job);
            ExternalOutcome::to("busy")
        })
        .time_advance("busy", move |_| service_time)
        .output("busy", |s| {
            let job = s.get("job").cloned().unwrap_or(Value::Null);
            Some(Event::with_body("job", json!({ "job": job })))
        })
        .internal("busy", |_| "idle".to_string())
        .external("busy", |s, _, _| {
            s.increment("missed");
            ExternalOutcome::NoChange
        })
}

/// Factory constructor; `arg` is the service time
pub fn processor(name: &str, arg: &Value) -> DevsResult<Model> {
    let service_time = duration_arg(name, arg)?;
    Ok(AtomicModel::new(name, processor_table(service_time)).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processor_serves_then_ignores() {
        let Model::Atomic(mut server) = processor("proc", &json!(4)).unwrap() else {
            panic!("processor is atomic");
        };
        server.internal().unwrap();
        assert_eq!(server.phase(), "idle");
        assert!(server.time_advance().unwrap().is_infinite());

        let job = Event::with_body("job", json!({"job": "/c/gen"}));
        assert!(server.external(SimTime::new(3.0), &job).unwrap());
        assert_eq!(server.phase(), "busy");
        assert_eq!(server.time_advance().unwrap(), SimTime::new(4.0));

        assert!(!server.external(SimTime::new(3.0), &job).unwrap());
        assert_eq!(server.state().get_u64("missed"), Some(1));

        assert_eq!(
            server.output().unwrap(),
            Some(Event::with_body("job", json!({"job": "/c/gen"})))
        );
        server.internal().unwrap();
        assert_eq!(server.phase(), "idle");
    }

    #[test]
    fn test_idle_processor_output_is_missing() {
        let Model::Atomic(mut server) = processor("proc", &json!("4")).unwrap() else {
            panic!("processor is atomic");
        };
        server.internal().unwrap();
        assert!(server.output().is_err());
    }
}
