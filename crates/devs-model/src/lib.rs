//! DEVS Model - Model tree and declarative composition
//!
//! This crate turns model declarations into a built, path-addressed tree:
//! - Composition specs (submodels, couplings, select, port translation)
//! - Name-range expansion for replicated submodels
//! - Routing table resolution
//! - Select tie-breaking among imminent children
//! - Atomic/coupled models and the model factory

pub mod spec;
pub mod range;
pub mod routing;
pub mod select;
pub mod model;
pub mod factory;

pub use spec::*;
pub use range::*;
pub use routing::*;
pub use select::*;
pub use model::*;
pub use factory::*;
