//! # Longbox Common Library
//!
//! Shared code for Longbox crates:
//! - Error types
//! - Event types (LongboxEvent enum) and the EventBus
//! - Configuration loading and path resolution

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
