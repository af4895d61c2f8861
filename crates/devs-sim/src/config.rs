//! Simulation configuration

use devs_core::{DevsError, DevsResult, SimTime, TraceFilter, TraceLayout, TraceOp};
use serde::{Deserialize, Serialize};

/// Root coordinator configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Simulated time at which the root stops
    pub end_time: SimTime,
    /// Transition tracing
    pub trace: TraceConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            end_time: SimTime::new(10.0),
            trace: TraceConfig::default(),
        }
    }
}

impl SimConfig {
    /// Run to `end_time` with default tracing
    pub fn until(end_time: f64) -> Self {
        SimConfig {
            end_time: SimTime::new(end_time),
            ..Self::default()
        }
    }

    /// Run to `end_time`, tracing every operation of every model
    pub fn verbose(end_time: f64) -> Self {
        SimConfig {
            end_time: SimTime::new(end_time),
            trace: TraceConfig::everything(),
        }
    }

    /// Parse a JSON configuration document
    pub fn from_json(text: &str) -> DevsResult<Self> {
        let config: SimConfig =
            serde_json::from_str(text).map_err(|e| DevsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DevsResult<()> {
        let end = self.end_time.as_f64();
        if !end.is_finite() || end < 0.0 {
            return Err(DevsError::Config(format!(
                "end time must be finite and non-negative, got {}",
                self.end_time
            )));
        }
        self.trace.validate()
    }
}

/// Which transitions get traced and how lines are laid out
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Operation labels (`dint`, `dext`, `ta`, `out`, `slct`, `set`) or `*`
    pub ops: Vec<String>,
    /// Model paths or `*`
    pub paths: Vec<String>,
    pub layout: TraceLayout,
}

impl Default for TraceConfig {
    fn default() -> Self {
        TraceConfig {
            ops: vec!["dint".into(), "dext".into()],
            paths: vec!["*".into()],
            layout: TraceLayout::default(),
        }
    }
}

impl TraceConfig {
    pub fn everything() -> Self {
        TraceConfig {
            ops: vec!["*".into()],
            ..Self::default()
        }
    }

    pub fn filter(&self) -> TraceFilter {
        TraceFilter::new(self.ops.iter().cloned(), self.paths.iter().cloned())
    }

    pub fn validate(&self) -> DevsResult<()> {
        if let Some(bad) = self
            .ops
            .iter()
            .find(|op| *op != "*" && TraceOp::from_label(op).is_none())
        {
            return Err(DevsError::Config(format!("unknown trace operation '{}'", bad)));
        }
        if self.layout.path_width < 4 {
            return Err(DevsError::Config("trace path width must be at least 4".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.end_time, SimTime::new(10.0));
    }

    #[test]
    fn test_end_time_must_be_finite() {
        assert!(SimConfig::until(f64::INFINITY).validate().is_err());
        assert!(SimConfig::until(-1.0).validate().is_err());
        assert!(SimConfig::until(f64::NAN).validate().is_err());
        assert!(SimConfig::until(0.0).validate().is_ok());
    }

    #[test]
    fn test_unknown_trace_op_rejected() {
        let mut config = SimConfig::verbose(5.0);
        assert!(config.validate().is_ok());
        config.trace.ops.push("delta".into());
        assert!(matches!(config.validate(), Err(DevsError::Config(_))));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = SimConfig::from_json(r#"{"end_time": 20, "trace": {"ops": ["slct"]}}"#).unwrap();
        assert_eq!(config.end_time, SimTime::new(20.0));
        assert_eq!(config.trace.ops, vec!["slct"]);
        assert_eq!(config.trace.paths, vec!["*"]);
        assert_eq!(config.trace.layout, TraceLayout::default());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(SimConfig::from_json("{").is_err());
        assert!(SimConfig::from_json(r#"{"end_time": -3}"#).is_err());
    }
}
