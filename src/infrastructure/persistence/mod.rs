//! PostgreSQL repository implementations.
//!
//! # Repositories
//!
//! - [`PgLinkRepository`] - Link storage, lookup and click total reconciliation

pub mod pg_link_repository;

pub use pg_link_repository::PgLinkRepository;
