//! Remote issue tracker synchronisation.
//!
//! Mirrors units of work and their sub-tasks as parent and child issues on a
//! remote tracker, keeps a local sync record per mirrored entity, and drives
//! project board status. The module follows hexagonal architecture:
//!
//! - Sync records, remote issue shapes, and body templates in [`domain`]
//! - Tracker, repository, and sleep contracts in [`ports`]
//! - GitHub, Postgres, and in-memory implementations in [`adapters`]
//! - Rate limiting, issue sync, and status verification in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
