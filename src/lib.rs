//! # Heatgate - price-gated heat pump control panel
//!
//! Switches a Sensibo-connected heat pump on and off according to the
//! Swedish electricity spot price (elprisetjustnu.se), with a small
//! password-protected web panel for status and manual overrides.
//!
//! ## Architecture
//!
//! - `config`: YAML configuration, environment overrides and validation
//! - `logging`: Structured logging and tracing
//! - `price`: Spot price feed client and current-interval selection
//! - `device`: Sensibo cloud API client
//! - `engine`: Price-threshold decision logic
//! - `controller`: Decision cycles, manual override and the automation timer
//! - `auth`: Shared-password sessions
//! - `web`: HTTP server, status page and REST API

pub mod auth;
pub mod config;
pub mod controller;
pub mod device;
pub mod engine;
pub mod error;
pub mod logging;
pub mod price;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use controller::Controller;
pub use error::{HeatgateError, Result};
