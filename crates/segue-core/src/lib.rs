//! # segue-core
//!
//! Core types, traits, and error handling for the Segue playlist playback core.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
