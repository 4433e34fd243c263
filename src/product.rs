//! The in-memory product model.
//!
//! A [`Product`] maps variable names to [`Variable`]s and tracks one current
//! length per dimension type. Every non-independent axis of every variable
//! must match the product's recorded length for its dimension type; the
//! independent type is exempt because its length is free per variable.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::dimension::DimensionType;
use crate::error::{DobsonError, Result};
use crate::variable::{DataType, Variable};

/// Serializable metadata view of a single variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableSummary {
    /// Name of the variable
    pub name: String,
    /// Scalar storage type
    pub data_type: DataType,
    /// Unit string, if any
    pub unit: Option<String>,
    /// Dimension-type tag per axis
    pub dimensions: Vec<DimensionType>,
    /// Axis lengths
    pub shape: Vec<usize>,
}

/// Serializable metadata view of a whole product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSummary {
    /// Current length per dimension type
    pub dimensions: HashMap<String, usize>,
    /// Per-variable metadata, sorted by name
    pub variables: Vec<VariableSummary>,
}

/// The in-memory container of named variables plus per-dimension-type lengths
#[derive(Debug, Clone, Default)]
pub struct Product {
    variables: HashMap<String, Variable>,
    dimensions: HashMap<DimensionType, usize>,
}

impl Product {
    /// Create an empty product
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of variables in the product
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Whether the product holds no variables
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// The current length of the given dimension type, if any variable has
    /// established it
    pub fn dimension_length(&self, dimension_type: DimensionType) -> Option<usize> {
        self.dimensions.get(&dimension_type).copied()
    }

    /// Record a new length for the given dimension type
    pub(crate) fn set_dimension_length(&mut self, dimension_type: DimensionType, length: usize) {
        self.dimensions.insert(dimension_type, length);
    }

    /// Check if a variable exists
    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Get a variable by name
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// Get a variable by name with error handling
    pub fn variable_checked(&self, name: &str) -> Result<&Variable> {
        self.variables
            .get(name)
            .ok_or_else(|| DobsonError::DataNotFound {
                message: format!("Variable not found: {}", name),
            })
    }

    /// Get a mutable variable by name with error handling
    pub fn variable_checked_mut(&mut self, name: &str) -> Result<&mut Variable> {
        self.variables
            .get_mut(name)
            .ok_or_else(|| DobsonError::DataNotFound {
                message: format!("Variable not found: {}", name),
            })
    }

    /// Names of all variables in the product (unspecified order)
    pub fn variable_names(&self) -> Vec<String> {
        self.variables.keys().cloned().collect()
    }

    /// Add a variable to the product.
    ///
    /// Fails if the name is already present or if any non-independent axis
    /// length conflicts with the product's recorded dimension length. A
    /// dimension type not seen before is recorded with the variable's length.
    pub fn add_variable(&mut self, variable: Variable) -> Result<()> {
        if self.variables.contains_key(&variable.name) {
            return Err(DobsonError::InvalidArgument {
                message: format!("variable {} already exists in product", variable.name),
            });
        }
        let mut new_lengths: Vec<(DimensionType, usize)> = Vec::new();
        for (axis, dimension_type) in variable.dimensions.iter().enumerate() {
            if *dimension_type == DimensionType::Independent {
                continue;
            }
            let length = variable.shape()[axis];
            match self.dimensions.get(dimension_type) {
                Some(&existing) if existing != length => {
                    return Err(DobsonError::DimensionMismatch {
                        message: format!(
                            "variable {} has {} dimension of length {}, product has {}",
                            variable.name, dimension_type, length, existing
                        ),
                    });
                }
                Some(_) => {}
                None => new_lengths.push((*dimension_type, length)),
            }
        }
        for (dimension_type, length) in new_lengths {
            self.dimensions.insert(dimension_type, length);
        }
        self.variables.insert(variable.name.clone(), variable);
        Ok(())
    }

    /// Remove a variable by name, returning it
    pub fn remove_variable(&mut self, name: &str) -> Result<Variable> {
        self.variables
            .remove(name)
            .ok_or_else(|| DobsonError::DataNotFound {
                message: format!("Variable not found: {}", name),
            })
    }

    /// Add a variable, replacing any existing variable with the same name
    pub fn replace_variable(&mut self, variable: Variable) -> Result<()> {
        self.variables.remove(&variable.name);
        self.add_variable(variable)
    }

    /// Validate that every variable's axis lengths are consistent with the
    /// product's dimension records
    pub fn validate(&self) -> Result<()> {
        for (name, variable) in &self.variables {
            for (axis, dimension_type) in variable.dimensions.iter().enumerate() {
                if *dimension_type == DimensionType::Independent {
                    continue;
                }
                let length = variable.shape()[axis];
                if self.dimensions.get(dimension_type) != Some(&length) {
                    return Err(DobsonError::DimensionMismatch {
                        message: format!(
                            "variable {} axis {} ({}) has length {} inconsistent with product",
                            name, axis, dimension_type, length
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Build a serializable metadata view of the product
    pub fn summary(&self) -> ProductSummary {
        let mut variables: Vec<VariableSummary> = self
            .variables
            .values()
            .map(|v| VariableSummary {
                name: v.name.clone(),
                data_type: v.data_type(),
                unit: v.unit.clone(),
                dimensions: v.dimensions.clone(),
                shape: v.shape().to_vec(),
            })
            .collect();
        variables.sort_by(|a, b| a.name.cmp(&b.name));
        ProductSummary {
            dimensions: self
                .dimensions
                .iter()
                .map(|(d, &len)| (d.name().to_string(), len))
                .collect(),
            variables,
        }
    }

    /// Retrieve or derive an axis-bounds variable matching the requested name,
    /// unit, and dimension-type list.
    ///
    /// An existing variable with the requested name is returned as a
    /// double-converted copy; its dimension tags and unit must match the
    /// request exactly (unit conversion is not supported here). Otherwise the
    /// bounds are derived from the axis midpoint variable (the requested name
    /// minus the `_bounds` suffix): interior interval edges lie halfway
    /// between adjacent midpoints and the outer edges are extrapolated half an
    /// interval beyond the first and last midpoint.
    pub fn derived_bounds(
        &self,
        name: &str,
        unit: Option<&str>,
        dimensions: &[DimensionType],
    ) -> Result<Variable> {
        if let Some(variable) = self.variables.get(name) {
            if variable.dimensions != dimensions {
                return Err(DobsonError::Derivation {
                    message: format!(
                        "variable {} has dimensions {:?}, requested {:?}",
                        name, variable.dimensions, dimensions
                    ),
                });
            }
            if variable.unit.as_deref() != unit {
                return Err(DobsonError::Derivation {
                    message: format!(
                        "variable {} has unit {:?}, requested {:?}; unit conversion is not supported",
                        name, variable.unit, unit
                    ),
                });
            }
            if variable.data_type() == DataType::Text {
                return Err(DobsonError::Derivation {
                    message: format!("variable {} holds text data", name),
                });
            }
            let mut bounds = variable.clone();
            bounds.convert_to_double()?;
            return Ok(bounds);
        }

        let stem = name
            .strip_suffix("_bounds")
            .ok_or_else(|| DobsonError::Derivation {
                message: format!("cannot derive {}: not a bounds variable name", name),
            })?;
        if dimensions.last() != Some(&DimensionType::Independent) {
            return Err(DobsonError::Derivation {
                message: format!(
                    "cannot derive {}: requested dimensions lack a trailing independent axis",
                    name
                ),
            });
        }
        let midpoint_dimensions = &dimensions[..dimensions.len() - 1];
        let midpoints = self
            .variables
            .get(stem)
            .ok_or_else(|| DobsonError::Derivation {
                message: format!("cannot derive {}: no variable {} in product", name, stem),
            })?;
        if midpoints.dimensions != midpoint_dimensions {
            return Err(DobsonError::Derivation {
                message: format!(
                    "variable {} has dimensions {:?}, need {:?} to derive {}",
                    stem, midpoints.dimensions, midpoint_dimensions, name
                ),
            });
        }
        if midpoints.unit.as_deref() != unit {
            return Err(DobsonError::Derivation {
                message: format!(
                    "variable {} has unit {:?}, requested {:?}; unit conversion is not supported",
                    stem, midpoints.unit, unit
                ),
            });
        }
        let mut midpoints = midpoints.clone();
        midpoints.convert_to_double()?;
        let values = midpoints.as_double_slice()?;
        let grid_length = *midpoints
            .shape()
            .last()
            .ok_or_else(|| DobsonError::Derivation {
                message: format!("variable {} is a scalar, cannot derive bounds", stem),
            })?;
        if grid_length < 2 {
            return Err(DobsonError::Derivation {
                message: format!(
                    "variable {} has {} grid midpoints, need at least 2",
                    stem, grid_length
                ),
            });
        }

        let num_rows = values.len() / grid_length;
        let mut bounds = vec![0.0; values.len() * 2];
        for row in 0..num_rows {
            bounds_from_midpoints(
                &values[row * grid_length..(row + 1) * grid_length],
                &mut bounds[row * grid_length * 2..(row + 1) * grid_length * 2],
            );
        }
        let mut shape = midpoints.shape().to_vec();
        shape.push(2);
        Variable::double(name, unit, dimensions.to_vec(), &shape, bounds)
    }
}

/// Compute [lower, upper] interval edges for one row of grid midpoints.
///
/// Interior edges lie halfway between adjacent midpoints; the outer edges are
/// extrapolated half an interval beyond the first and last midpoint.
fn bounds_from_midpoints(midpoints: &[f64], bounds: &mut [f64]) {
    let n = midpoints.len();
    for i in 0..n {
        bounds[2 * i] = if i == 0 {
            1.5 * midpoints[0] - 0.5 * midpoints[1]
        } else {
            0.5 * (midpoints[i - 1] + midpoints[i])
        };
        bounds[2 * i + 1] = if i == n - 1 {
            1.5 * midpoints[n - 1] - 0.5 * midpoints[n - 2]
        } else {
            0.5 * (midpoints[i] + midpoints[i + 1])
        };
    }
}
