//! # Interview ETL Common Library
//!
//! Shared code for the Interview ETL services:
//! - Common error type
//! - Configuration loading and root folder resolution
//! - Event types (IetlEvent enum) and the broadcast event bus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
