//! Domain layer containing entities, repository contracts and the
//! reconciliation worker.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Durable store trait definitions
//! - [`cache_keys`] - Key layout of cached URLs and click counters
//! - [`reconciliation_worker`] - Periodic counter-to-store reconciliation
//!
//! # Click Processing Flow
//!
//! 1. HTTP handler resolves a code via [`crate::application::services::Resolver`]
//! 2. [`crate::application::services::ClickRecorder`] increments `clicks:{code}` in the cache
//! 3. [`reconciliation_worker::ReconciliationWorker`] periodically overwrites each
//!    record's click total with its counter value via [`repositories::LinkRepository`]

pub mod cache_keys;
pub mod entities;
pub mod reconciliation_worker;
pub mod repositories;
