//! Orbit Report: compiles telemetry format strings for particle
//! simulations and renders them against simulation snapshots.
//!
//! A format such as `#st, #sc: {#pa,#pe;} #ajv` is parsed once into a
//! [`core::ast::Template`], then evaluated against any [`schema::snapshot::Snapshot`]
//! to produce one report line per emission.

pub mod core;
pub mod schema;
