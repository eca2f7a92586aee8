//! Business logic services for the application layer.

pub mod click_recorder;
pub mod link_service;
pub mod resolver;

pub use click_recorder::ClickRecorder;
pub use link_service::LinkService;
pub use resolver::{Resolver, ResolverOptions};
