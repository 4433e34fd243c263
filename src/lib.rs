//! # dobson
//!
//! An in-memory product model and regridding engine for atmospheric
//! measurement data.
//!
//! This library provides the unified representation used to harmonize
//! instrument-specific measurement files (named variables with typed,
//! multi-dimensional arrays, units, and dimension semantics) and the
//! rebinning engine that resamples those variables onto arbitrary target
//! interval grids.
//!
//! ## Key features
//!
//! - **Unified product model**: named variables with typed N-dimensional
//!   arrays, units, and per-axis dimension semantics
//! - **Interval rebinning**: overlap-weighted averaging and summation onto
//!   arbitrary target grids, with NaN-aware aggregation
//! - **Grid-aware policies**: per-variable participation rules inferred from
//!   names, units, and dimension structure
//! - **Log-pressure support**: vertical pressure grids rebin on a
//!   logarithmic axis
//!
//! ## Architecture
//!
//! - **Array model**: typed N-dimensional storage with resize, axis
//!   insertion, and double-conversion primitives
//! - **Product layer**: the variable container with per-dimension-type
//!   length bookkeeping and axis-bounds derivation
//! - **Rebin engine**: policy classification, sparse interval-overlap
//!   mapping, and in-place weighted aggregation

pub mod dimension;
pub mod error;
pub mod logging;
pub mod product;
pub mod rebin;
pub mod variable;

pub use dimension::DimensionType;
pub use error::{DobsonError, Result};
pub use logging::{
    init_tracing, log_error, log_operation_end, log_operation_start, log_timed_operation,
};
pub use product::{Product, ProductSummary, VariableSummary};
pub use rebin::overlap::OverlapMap;
pub use rebin::policy::{binning_policy, BinningPolicy};
pub use rebin::rebin;
pub use variable::{ArrayData, DataType, Variable};
