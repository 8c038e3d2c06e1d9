//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the codec:
//! - Math types and float helpers
//! - Logging utilities

pub mod math;
pub mod logging;
