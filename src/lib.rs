//! Specsync: checklist and lifecycle synchronisation for specification work.
//!
//! A unit of work is a Markdown document with a checklist and a lifecycle
//! phase. This crate keeps the document, a local store, and a remote issue
//! tracker consistent: phase changes create and close issues, checklist edits
//! on either side are reconciled, and sub-tasks are mirrored as child issues.
//!
//! # Architecture
//!
//! Specsync follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, APIs, etc.)
//!
//! Components communicate through the in-process [`events::EventBus`].
//!
//! # Modules
//!
//! - [`checklist`]: Checkbox parsing, hashing, diffing, and patching
//! - [`events`]: Workflow events and the publish/subscribe bus
//! - [`tracker`]: Sync records, remote tracker ports, and issue services
//! - [`workflow`]: Units of work, phases, and the phase state machine
//! - [`webhook`]: Signed inbound deliveries mapped onto events
//! - [`config`]: TOML configuration
//! - [`telemetry`]: Tracing subscriber set-up

pub mod checklist;
pub mod config;
pub mod events;
pub mod telemetry;
pub mod tracker;
pub mod webhook;
pub mod workflow;
