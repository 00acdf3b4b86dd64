//! Services Layer
//!
//! This module contains pure business logic extracted from HTTP handlers.

pub mod checkout_service;

// Re-export for convenience
pub use checkout_service::*;
