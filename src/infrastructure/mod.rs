//! Infrastructure layer module
//!
//! This module contains the ambient infrastructure around the engine:
//! - Configuration management
//! - Logging infrastructure
//! - Engine bootstrap from configuration

pub mod config;
pub mod logging;
pub mod setup;
