//! DEVS Sim - Abstract simulator for classic DEVS
//!
//! This crate runs a built model tree:
//! - Simulator arena mirroring the model tree
//! - Atomic simulator handlers (INIT, STAR, IN)
//! - Coupled coordinator handlers (routing, select, time aggregation)
//! - Root coordinator loop and `run_simulation`
//! - Run configuration

pub mod tree;
pub mod atomic;
pub mod coupled;
pub mod root;
pub mod config;

pub use tree::*;
pub use root::*;
pub use config::*;
