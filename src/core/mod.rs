//! Core types shared across the Datav services
//!
//! Currently this is the home of the error taxonomy. Every service module
//! returns [`error::Result`] and callers match on [`error::DatavError`]
//! kinds rather than message strings.

pub mod error;

pub use error::{DatavError, Result};
