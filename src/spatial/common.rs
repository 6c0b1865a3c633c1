//! Common utilities module
//!
//! This module contains shared utilities used across the correction pipeline.

pub mod error;
pub mod grid;
pub mod byte_order;

pub use error::{CorrectionError, Result};
pub use grid::{Grid, GridShape};

/// Single-precision comparison epsilon.
pub const FUZZ: f64 = 0.119e-6;

/// Double-precision comparison epsilon.
pub const DFUZZ: f64 = 0.220e-15;
