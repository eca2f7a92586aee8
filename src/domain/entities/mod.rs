//! Core domain entities.
//!
//! - [`Link`] - A durable short link record (identifier, code, target, click total)
//! - [`ClickTotal`] - A reconciled click count destined for the durable store

pub mod link;

pub use link::{ClickTotal, Link};
