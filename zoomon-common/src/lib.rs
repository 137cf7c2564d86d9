//! Shared types for the zoomon services
//!
//! Error taxonomy and configuration loading used by every service in the
//! workspace.

pub mod config;
pub mod error;

pub use error::{Error, Result};
