//! Adapter implementations of workflow ports.

pub mod fs;
pub mod gates;
pub mod memory;
