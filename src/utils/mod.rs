//! Shared utilities

pub mod sanitize;

pub use sanitize::{sanitize, sanitize_url};
