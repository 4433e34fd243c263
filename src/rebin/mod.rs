//! Rebinning of product variables onto a target interval grid.
//!
//! The engine resamples every eligible variable of a product from its current
//! grid over one dimension (time, vertical, latitude, longitude, or spectral)
//! onto an arbitrary target interval grid, using interval-overlap weighted
//! averaging or summation. The operation is a single linear pipeline:
//! validate the target bounds, derive the matching source bounds from the
//! product, remove non-binnable variables, build the sparse overlap map,
//! grow the dimension for write-back room, rebin every variable in place,
//! shrink the dimension, and install the target bounds as the product's new
//! axis-bounds variable.
//!
//! Any error aborts the whole operation. The product may then be left
//! partially pruned; callers should treat an error return as "product in an
//! indeterminate state".

pub mod overlap;
pub mod policy;

use tracing::debug;

use crate::dimension::DimensionType;
use crate::error::{DobsonError, Result};
use crate::product::Product;
use crate::variable::{ArrayData, DataType, Variable};

use overlap::OverlapMap;
use policy::{binning_policy, BinningPolicy};

/// Rebin all variables in the product onto the grid described by
/// `target_bounds`.
///
/// `target_bounds` must be an axis bounds variable (name ending in
/// `_bounds`, double typed) whose last axis is an independent dimension of
/// length 2 holding the [lower, upper] edge pair of each target interval.
/// The dimension to rebin is the type of the second-to-last axis. A leading
/// time axis (three-axis form) marks a time-varying target grid and must
/// match the product's time dimension.
///
/// For each variable, a dimension-specific rule based on the variable name
/// decides the policy: most variables get the interval-weighted average of
/// all overlapping source values, integrated quantities (partial columns,
/// column averaging kernels on the vertical axis) get the interval-weighted
/// sum, and variables that cannot be rebinned (no unit, string data,
/// count/weight bookkeeping, multi-dimensional averaging kernels, stale axis
/// variables) are removed. Rebinned variables are converted to double
/// storage, and target intervals with no overlapping valid source data are
/// set to NaN.
///
/// Vertical rebinning against `pressure_bounds` operates on the logarithm of
/// the pressure axis; the caller's `target_bounds` variable is never mutated.
pub fn rebin(product: &mut Product, target_bounds: &Variable) -> Result<()> {
    let dimension_type = validate_target_bounds(product, target_bounds)?;
    let target_rank = target_bounds.num_dimensions();
    let num_targets = target_bounds.shape()[target_rank - 2];

    // private copy so the log transform never touches the caller's variable
    let mut local_target = target_bounds.clone();

    let mut source_bounds = derive_source_bounds(product, target_bounds, dimension_type)?;
    let source_rank = source_bounds.num_dimensions();
    let mut num_sources = source_bounds.shape()[source_rank - 2];

    let time_varying = target_rank == 3 || source_rank == 3;
    let num_time_rows = if time_varying {
        product
            .dimension_length(DimensionType::Time)
            .ok_or_else(|| DobsonError::InvalidArgument {
                message: "bounds are time dependent but the product has no time dimension"
                    .to_string(),
            })?
    } else {
        1
    };

    debug!(
        dimension = %dimension_type,
        num_sources,
        num_targets,
        num_time_rows,
        "rebinning product"
    );

    // the product's own grid variable is superseded by the target bounds;
    // the derived source bounds copy is unaffected
    if product.has_variable(&source_bounds.name) {
        product.remove_variable(&source_bounds.name)?;
    }

    // remove variables that cannot be rebinned
    for name in product.variable_names() {
        if binning_policy(product.variable_checked(&name)?, dimension_type)
            == BinningPolicy::Remove
        {
            debug!(variable = %name, "removing non-binnable variable");
            product.remove_variable(&name)?;
        }
    }

    // vertical pressure grids rebin on a logarithmic axis
    if dimension_type == DimensionType::Vertical && local_target.name == "pressure_bounds" {
        log_transform(&mut source_bounds)?;
        log_transform(&mut local_target)?;
    }

    let map = OverlapMap::build(&local_target, &source_bounds, num_time_rows)?;

    // grow the dimension to provide write-back room
    if num_targets > num_sources {
        resize_dimension(product, dimension_type, num_targets)?;
        num_sources = num_targets;
    }

    for name in product.variable_names() {
        rebin_variable(
            product,
            &name,
            dimension_type,
            &map,
            num_sources,
            num_time_rows,
            time_varying,
        )?;
    }

    // shrink the dimension back to the target size
    if num_targets < num_sources {
        resize_dimension(product, dimension_type, num_targets)?;
    }

    // install the caller's (untransformed) bounds as the new axis variable
    product.replace_variable(target_bounds.clone())?;

    debug!(dimension = %dimension_type, num_targets, "rebin complete");
    Ok(())
}

/// Check the target bounds preconditions and identify the rebinned dimension
fn validate_target_bounds(product: &Product, target_bounds: &Variable) -> Result<DimensionType> {
    if !target_bounds.name.ends_with("_bounds") {
        return Err(DobsonError::InvalidArgument {
            message: format!(
                "axis variable {} is not a boundaries variable",
                target_bounds.name
            ),
        });
    }
    if target_bounds.data_type() != DataType::Double {
        return Err(DobsonError::InvalidArgument {
            message: format!(
                "axis bounds variable has data type {}, expected double",
                target_bounds.data_type().name()
            ),
        });
    }
    let rank = target_bounds.num_dimensions();
    if rank != 2 && rank != 3 {
        return Err(DobsonError::InvalidArgument {
            message: format!("axis bounds variable has {} dimensions, expected 2 or 3", rank),
        });
    }
    let dimension_type = target_bounds.dimensions[rank - 2];
    if dimension_type == DimensionType::Independent {
        return Err(DobsonError::InvalidArgument {
            message: "cannot rebin an independent dimension".to_string(),
        });
    }
    if target_bounds.dimensions[rank - 1] != DimensionType::Independent
        || target_bounds.shape()[rank - 1] != 2
    {
        return Err(DobsonError::InvalidArgument {
            message: "last dimension of axis bounds variable must be independent of length 2"
                .to_string(),
        });
    }
    if rank == 3 {
        if target_bounds.dimensions[0] != DimensionType::Time
            || dimension_type == DimensionType::Time
        {
            return Err(DobsonError::InvalidArgument {
                message: "invalid dimensions for time dependent axis bounds variable".to_string(),
            });
        }
        if product.dimension_length(DimensionType::Time) != Some(target_bounds.shape()[0]) {
            return Err(DobsonError::InvalidArgument {
                message: "time dimension of axis bounds variable does not match product"
                    .to_string(),
            });
        }
    }
    Ok(dimension_type)
}

/// Derive the source grid bounds for the same physical quantity as the
/// target bounds.
///
/// For the time dimension the source grid is always `[time, independent]`.
/// For other dimensions the time-independent form is tried first, then the
/// time-dependent form.
fn derive_source_bounds(
    product: &Product,
    target_bounds: &Variable,
    dimension_type: DimensionType,
) -> Result<Variable> {
    let unit = target_bounds.unit.as_deref();
    if dimension_type == DimensionType::Time {
        return product.derived_bounds(
            &target_bounds.name,
            unit,
            &[DimensionType::Time, DimensionType::Independent],
        );
    }
    product
        .derived_bounds(
            &target_bounds.name,
            unit,
            &[dimension_type, DimensionType::Independent],
        )
        .or_else(|_| {
            product.derived_bounds(
                &target_bounds.name,
                unit,
                &[
                    DimensionType::Time,
                    dimension_type,
                    DimensionType::Independent,
                ],
            )
        })
}

/// Replace a bounds variable's values by their natural logarithm
fn log_transform(bounds: &mut Variable) -> Result<()> {
    match &mut bounds.data {
        ArrayData::Double(array) => {
            array.mapv_inplace(f64::ln);
            Ok(())
        }
        _ => Err(DobsonError::Internal {
            message: format!("bounds variable {} is not double typed", bounds.name),
        }),
    }
}

/// Grow or shrink the given dimension across all variables in the product
/// and update the product's dimension record
fn resize_dimension(
    product: &mut Product,
    dimension_type: DimensionType,
    new_length: usize,
) -> Result<()> {
    for name in product.variable_names() {
        let variable = product.variable_checked_mut(&name)?;
        let axes: Vec<usize> = variable
            .dimensions
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == dimension_type)
            .map(|(axis, _)| axis)
            .collect();
        for axis in axes {
            variable.resize_dimension(axis, new_length)?;
        }
    }
    product.set_dimension_length(dimension_type, new_length);
    Ok(())
}

/// Rebin a single variable in place using the overlap map.
///
/// The variable is viewed as a [num_blocks, num_sources, num_elements] array:
/// all axes before the rebinned axis multiply into the outer block count and
/// all axes after it into the inner element count.
#[allow(clippy::too_many_arguments)]
fn rebin_variable(
    product: &mut Product,
    name: &str,
    dimension_type: DimensionType,
    map: &OverlapMap,
    num_sources: usize,
    num_time_rows: usize,
    time_varying: bool,
) -> Result<()> {
    let variable = product.variable_checked_mut(name)?;

    let policy = binning_policy(variable, dimension_type);
    debug_assert!(policy != BinningPolicy::Remove);
    if policy == BinningPolicy::Skip || policy == BinningPolicy::Remove {
        return Ok(());
    }

    variable.convert_to_double()?;

    // promote to time dependent when either grid varies per time step
    if time_varying && variable.dimensions.first() != Some(&DimensionType::Time) {
        variable.add_dimension(0, DimensionType::Time, num_time_rows)?;
    }
    // same promotion when the rebinned dimension is time itself
    if dimension_type == DimensionType::Time
        && variable.dimensions.first() != Some(&DimensionType::Time)
    {
        variable.add_dimension(0, DimensionType::Time, num_sources)?;
    }

    let axis = variable
        .axis_position(dimension_type)
        .ok_or_else(|| DobsonError::Internal {
            message: format!("variable {} lost its {} axis", name, dimension_type),
        })?;
    let shape = variable.shape().to_vec();
    let num_blocks: usize = shape[..axis].iter().product();
    let num_elements: usize = shape[axis + 1..].iter().product();
    let num_targets = map.num_targets();
    let average = policy == BinningPolicy::Average;

    let data = variable.as_double_slice_mut()?;
    let mut buffer = vec![0.0; num_targets];
    let blocks_per_row = if num_time_rows > 1 {
        num_blocks / num_time_rows
    } else {
        num_blocks
    };

    for j in 0..num_blocks {
        let time_row = if num_time_rows > 1 { j / blocks_per_row } else { 0 };
        for l in 0..num_elements {
            for (k, slot) in buffer.iter_mut().enumerate() {
                let (indices, weights) = map.entries(time_row, k);
                let mut value_sum = 0.0;
                let mut weight_sum = 0.0;
                for (&source, &weight) in indices.iter().zip(weights) {
                    let value = data[(j * num_sources + source) * num_elements + l];
                    if !value.is_nan() {
                        value_sum += weight * value;
                        weight_sum += weight;
                    }
                }
                *slot = if weight_sum != 0.0 {
                    if average {
                        value_sum / weight_sum
                    } else {
                        value_sum
                    }
                } else {
                    f64::NAN
                };
            }
            // the buffered pass keeps later targets from reading already
            // overwritten source values
            for (k, &value) in buffer.iter().enumerate() {
                data[(j * num_sources + k) * num_elements + l] = value;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::Variable;

    fn target(name: &str, dimensions: Vec<DimensionType>, shape: &[usize]) -> Variable {
        let count: usize = shape.iter().product();
        Variable::double(
            name,
            Some("m"),
            dimensions,
            shape,
            (0..count).map(|v| v as f64).collect(),
        )
        .unwrap()
    }

    fn vertical_target() -> Variable {
        target(
            "altitude_bounds",
            vec![DimensionType::Vertical, DimensionType::Independent],
            &[3, 2],
        )
    }

    #[test]
    fn test_rejects_non_bounds_name() {
        let mut product = Product::new();
        let bad = target(
            "altitude",
            vec![DimensionType::Vertical, DimensionType::Independent],
            &[3, 2],
        );
        assert!(matches!(
            rebin(&mut product, &bad),
            Err(DobsonError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_rejects_non_double_bounds() {
        use ndarray::{Array, IxDyn};

        let data = ArrayData::Float(Array::from_elem(IxDyn(&[3, 2]), 0.0f32));
        let bad = Variable::new(
            "altitude_bounds",
            Some("m"),
            vec![DimensionType::Vertical, DimensionType::Independent],
            data,
        )
        .unwrap();
        let mut product = Product::new();
        assert!(matches!(
            rebin(&mut product, &bad),
            Err(DobsonError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_rank() {
        let mut product = Product::new();
        let bad = target(
            "altitude_bounds",
            vec![DimensionType::Independent],
            &[2],
        );
        assert!(matches!(
            rebin(&mut product, &bad),
            Err(DobsonError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_rejects_independent_grid_dimension() {
        let mut product = Product::new();
        let bad = target(
            "altitude_bounds",
            vec![DimensionType::Independent, DimensionType::Independent],
            &[3, 2],
        );
        assert!(matches!(
            rebin(&mut product, &bad),
            Err(DobsonError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_last_axis() {
        let mut product = Product::new();
        let bad = target(
            "altitude_bounds",
            vec![DimensionType::Vertical, DimensionType::Independent],
            &[2, 3],
        );
        assert!(matches!(
            rebin(&mut product, &bad),
            Err(DobsonError::InvalidArgument { .. })
        ));

        let bad = target(
            "altitude_bounds",
            vec![DimensionType::Vertical, DimensionType::Vertical],
            &[2, 2],
        );
        assert!(matches!(
            rebin(&mut product, &bad),
            Err(DobsonError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_rejects_time_dependent_mismatch() {
        let mut product = Product::new();
        product
            .add_variable(
                Variable::double(
                    "datetime",
                    Some("s"),
                    vec![DimensionType::Time],
                    &[3],
                    vec![0.0, 1.0, 2.0],
                )
                .unwrap(),
            )
            .unwrap();
        // product time length is 3, bounds claim 2
        let bad = target(
            "altitude_bounds",
            vec![
                DimensionType::Time,
                DimensionType::Vertical,
                DimensionType::Independent,
            ],
            &[2, 4, 2],
        );
        assert!(matches!(
            rebin(&mut product, &bad),
            Err(DobsonError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_rejects_three_axis_time_grid() {
        let mut product = Product::new();
        let bad = target(
            "datetime_bounds",
            vec![
                DimensionType::Time,
                DimensionType::Time,
                DimensionType::Independent,
            ],
            &[2, 2, 2],
        );
        assert!(matches!(
            rebin(&mut product, &bad),
            Err(DobsonError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_underivable_source_grid_fails() {
        let mut product = Product::new();
        product
            .add_variable(
                Variable::double(
                    "extinction_coefficient",
                    Some("1/m"),
                    vec![DimensionType::Vertical],
                    &[3],
                    vec![1.0, 2.0, 3.0],
                )
                .unwrap(),
            )
            .unwrap();
        assert!(matches!(
            rebin(&mut product, &vertical_target()),
            Err(DobsonError::Derivation { .. })
        ));
    }

    #[test]
    fn test_log_pressure_weighting() {
        let mut product = Product::new();
        product
            .add_variable(
                Variable::double(
                    "pressure_bounds",
                    Some("hPa"),
                    vec![DimensionType::Vertical, DimensionType::Independent],
                    &[2, 2],
                    vec![1000.0, 100.0, 100.0, 10.0],
                )
                .unwrap(),
            )
            .unwrap();
        product
            .add_variable(
                Variable::double(
                    "temperature",
                    Some("K"),
                    vec![DimensionType::Vertical],
                    &[2],
                    vec![1.0, 2.0],
                )
                .unwrap(),
            )
            .unwrap();

        // target upper edge at 10^1.5 hPa: in log space the second source
        // interval contributes weight 0.5, in linear space it would be ~0.76
        let target_bounds = Variable::double(
            "pressure_bounds",
            Some("hPa"),
            vec![DimensionType::Vertical, DimensionType::Independent],
            &[1, 2],
            vec![1000.0, 31.622776601683793],
        )
        .unwrap();

        rebin(&mut product, &target_bounds).unwrap();

        let temperature = product.variable_checked("temperature").unwrap();
        let values = temperature.as_double_slice().unwrap();
        assert_eq!(values.len(), 1);
        assert!((values[0] - 4.0 / 3.0).abs() < 1e-9);

        // the caller's bounds variable was installed untransformed
        let installed = product.variable_checked("pressure_bounds").unwrap();
        assert_eq!(
            installed.as_double_slice().unwrap(),
            &[1000.0, 31.622776601683793]
        );
    }
}
