//! cdeps Core
//!
//! Core types shared by the cdeps scrubbing and dependency analysis engine.

pub mod config;
pub mod error;
pub mod location;
pub mod types;

pub use error::{Error, Result};
pub use location::Location;
pub use types::*;
