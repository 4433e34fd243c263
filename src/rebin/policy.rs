//! Binning policy classification.
//!
//! For each variable, the classifier decides whether and how it participates
//! in a rebin along a chosen dimension. The rule order matters: the
//! structural and safety exclusions come first, and the vertical
//! integrated-quantity rules fire before the generic averaging-kernel
//! removal.

use crate::dimension::DimensionType;
use crate::variable::{DataType, Variable};

/// How a variable participates in a rebin along one dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinningPolicy {
    /// Variable does not depend on the dimension; left untouched
    Skip,
    /// Variable cannot be rebinned and must be removed from the product
    Remove,
    /// Interval-weighted average (the default)
    Average,
    /// Interval-weighted sum, for integrated quantities
    Sum,
}

/// Classify how a variable participates in a rebin along the given dimension
pub fn binning_policy(variable: &Variable, dimension_type: DimensionType) -> BinningPolicy {
    debug_assert!(dimension_type != DimensionType::Independent);

    // count/weight bookkeeping variables are invalidated by rebinning
    if variable.name.ends_with("count") || variable.name.ends_with("weight") {
        return BinningPolicy::Remove;
    }

    match variable.axis_count(dimension_type) {
        0 => return BinningPolicy::Skip,
        1 => {}
        // ambiguous which axis to bin
        _ => return BinningPolicy::Remove,
    }

    // a time axis anywhere but axis 0 cannot be handled
    if variable
        .dimensions
        .iter()
        .skip(1)
        .any(|d| *d == DimensionType::Time)
    {
        return BinningPolicy::Remove;
    }

    if variable.data_type() == DataType::Text {
        return BinningPolicy::Remove;
    }

    if variable.unit.is_none() {
        return BinningPolicy::Remove;
    }

    if variable.is_enumeration() {
        return BinningPolicy::Remove;
    }

    // axis variables for the binned dimension are regenerated afterwards
    if dimension_type.is_axis_variable(&variable.name) {
        return BinningPolicy::Remove;
    }

    if dimension_type == DimensionType::Vertical {
        // column averaging kernels and partial column profiles are
        // integrated quantities over the vertical axis
        if variable.name.contains("_avk") {
            return BinningPolicy::Sum;
        }
        if variable.name.contains("_column_") {
            return BinningPolicy::Sum;
        }
    }

    // multi-dimensional averaging kernels cannot be rebinned
    if variable.name.contains("_avk") {
        return BinningPolicy::Remove;
    }

    BinningPolicy::Average
}
