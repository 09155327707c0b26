//! Unit tests for the events module.
