//! Application layer services implementing business logic.
//!
//! Services consume the repository and cache traits and provide the API the
//! HTTP handlers call.
//!
//! # Available Services
//!
//! - [`services::link_service::LinkService`] - Short link creation and lookup
//! - [`services::resolver::Resolver`] - Cache-aside code resolution
//! - [`services::click_recorder::ClickRecorder`] - Non-blocking click counting

pub mod services;
