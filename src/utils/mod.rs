//! Utility functions shared across layers.
//!
//! - [`code_codec`] - Base62 identifier/short code conversion
//! - [`url_check`] - Target URL acceptance rules for the HTTP surface

pub mod code_codec;
pub mod url_check;
