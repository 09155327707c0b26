//! Step definitions for checklist synchronisation scenarios.

pub mod world;

mod given;
mod then;
mod when;
