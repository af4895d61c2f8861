//! Generator: emits a job on port `job` every `period` time units
//!
//! Phases:
//! - `init`: ta 0, no output, then `default`
//! - `default`: ta = period, output `("job", {"job": <own path>})`, back to `default`

use devs_core::{DevsResult, Event, PhaseTable, SimTime, Value};
use devs_model::{duration_arg, AtomicModel, Model};
use serde_json::json;

pub const GENERATOR: &str = "Generator";

pub fn generator_table(period: SimTime) -> PhaseTable {
    PhaseTable::new()
        .time_advance("init", |_| SimTime::ZERO)
        .output("init", |_| None)
        .internal("init", |_| "default".to_string())
        .time_advance("default", move |_| period)
        .output("default", |s| Some(Event::with_body("job", json!({ "job": s.owner() }))))
        .internal("default", |_| "default".to_string())
}

/// Factory constructor; `arg` is the period
pub fn generator(name: &str, arg: &Value) -> DevsResult<Model> {
    let period = duration_arg(name, arg)?;
    Ok(AtomicModel::new(name, generator_table(period)).into())
}
