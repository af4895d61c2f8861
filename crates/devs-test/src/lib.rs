//! DEVS Test Harness - scenario auditing and random topologies
//!
//! This crate provides:
//! - An audited step-by-step run of the root coordinator
//! - Seeded random coupled networks built from the sample models
//! - End-to-end scenarios over both

pub mod harness;
pub mod topology;
pub mod scenarios;

pub use harness::*;
pub use topology::*;
pub use scenarios::*;
