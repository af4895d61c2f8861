//! DEVS Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every layer of the simulator:
//! - Simulated time (SimTime)
//! - Synchronization messages and per-kind mailboxes
//! - Model state and event payloads
//! - Phase-indexed behavior tables
//! - Trace hooks
//! - Errors

pub mod time;
pub mod message;
pub mod state;
pub mod phase;
pub mod trace;
pub mod error;

pub use time::*;
pub use message::*;
pub use state::*;
pub use phase::*;
pub use trace::*;
pub use error::*;
