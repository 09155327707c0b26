//! Unit tests for the tracker module.
