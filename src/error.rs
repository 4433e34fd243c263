//! Error types for the dobson library.
//!
//! This module defines a comprehensive error enum that covers all possible
//! error conditions raised by the product model and the rebin engine.

use thiserror::Error;

/// The main error type for dobson operations.
#[derive(Error, Debug)]
pub enum DobsonError {
    /// Malformed arguments (bad axis-bounds shape, type, or name)
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// A variable could not be derived from the product contents
    #[error("Derivation error: {message}")]
    Derivation { message: String },

    /// A variable or dimension was not found in the product
    #[error("Data not found: {message}")]
    DataNotFound { message: String },

    /// Axis lengths inconsistent with the product's dimension records
    #[error("Dimension mismatch: {message}")]
    DimensionMismatch { message: String },

    /// Internal invariant violation
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Convenience type alias for Results with DobsonError
pub type Result<T> = std::result::Result<T, DobsonError>;
