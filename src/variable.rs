//! The typed, N-dimensional array model underlying every product variable.
//!
//! A [`Variable`] owns a dense `ndarray` array of a single scalar type, a
//! name, an optional unit, and one dimension-type tag per axis. This module
//! also provides the storage primitives the rebin engine depends on: resizing
//! an axis in place, inserting a replicated axis, and widening storage to
//! double precision.

use ndarray::{Array, Axis, IxDyn, SliceInfoElem};
use serde::{Deserialize, Serialize};

use crate::dimension::DimensionType;
use crate::error::{DobsonError, Result};

/// Scalar storage types supported by the array model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// 8-bit signed integer
    Int8,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// String values
    Text,
}

impl DataType {
    /// The name used for this data type in summaries and messages
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Text => "text",
        }
    }
}

/// Typed N-dimensional storage for a variable
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    /// 8-bit signed integer array
    Int8(Array<i8, IxDyn>),
    /// 16-bit signed integer array
    Int16(Array<i16, IxDyn>),
    /// 32-bit signed integer array
    Int32(Array<i32, IxDyn>),
    /// 32-bit float array
    Float(Array<f32, IxDyn>),
    /// 64-bit float array
    Double(Array<f64, IxDyn>),
    /// String array
    Text(Array<String, IxDyn>),
}

impl ArrayData {
    /// The scalar type held by this array
    pub fn data_type(&self) -> DataType {
        match self {
            ArrayData::Int8(_) => DataType::Int8,
            ArrayData::Int16(_) => DataType::Int16,
            ArrayData::Int32(_) => DataType::Int32,
            ArrayData::Float(_) => DataType::Float,
            ArrayData::Double(_) => DataType::Double,
            ArrayData::Text(_) => DataType::Text,
        }
    }

    /// The axis lengths of this array
    pub fn shape(&self) -> &[usize] {
        match self {
            ArrayData::Int8(a) => a.shape(),
            ArrayData::Int16(a) => a.shape(),
            ArrayData::Int32(a) => a.shape(),
            ArrayData::Float(a) => a.shape(),
            ArrayData::Double(a) => a.shape(),
            ArrayData::Text(a) => a.shape(),
        }
    }

    /// Total number of elements (1 for a zero-dimensional scalar)
    pub fn num_elements(&self) -> usize {
        match self {
            ArrayData::Int8(a) => a.len(),
            ArrayData::Int16(a) => a.len(),
            ArrayData::Int32(a) => a.len(),
            ArrayData::Float(a) => a.len(),
            ArrayData::Double(a) => a.len(),
            ArrayData::Text(a) => a.len(),
        }
    }
}

/// A named, typed, N-dimensional array with unit and dimension metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Name of the variable (unique within a product)
    pub name: String,
    /// Unit string; `None` marks a unitless quantity (distinct from `Some("")`)
    pub unit: Option<String>,
    /// Dimension-type tag for each axis, paired 1:1 with the array shape
    pub dimensions: Vec<DimensionType>,
    /// Enumeration labels; non-empty marks a categorical variable
    pub enum_values: Vec<String>,
    /// The array data
    pub data: ArrayData,
}

impl Variable {
    /// Create a new variable, validating that the dimension tags match the
    /// array rank
    pub fn new(
        name: impl Into<String>,
        unit: Option<&str>,
        dimensions: Vec<DimensionType>,
        data: ArrayData,
    ) -> Result<Self> {
        let name = name.into();
        if dimensions.len() != data.shape().len() {
            return Err(DobsonError::InvalidArgument {
                message: format!(
                    "variable {} has {} dimension tags but array rank {}",
                    name,
                    dimensions.len(),
                    data.shape().len()
                ),
            });
        }
        Ok(Self {
            name,
            unit: unit.map(String::from),
            dimensions,
            enum_values: Vec::new(),
            data,
        })
    }

    /// Create a double-typed variable from a flat value list and shape
    pub fn double(
        name: impl Into<String>,
        unit: Option<&str>,
        dimensions: Vec<DimensionType>,
        shape: &[usize],
        values: Vec<f64>,
    ) -> Result<Self> {
        let name = name.into();
        let array =
            Array::from_shape_vec(IxDyn(shape), values).map_err(|e| DobsonError::InvalidArgument {
                message: format!("variable {}: {}", name, e),
            })?;
        Variable::new(name, unit, dimensions, ArrayData::Double(array))
    }

    /// The scalar type of the variable's data
    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    /// The axis lengths of the variable
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Number of axes (0 for a scalar)
    pub fn num_dimensions(&self) -> usize {
        self.dimensions.len()
    }

    /// Whether this variable carries enumeration (categorical) values
    pub fn is_enumeration(&self) -> bool {
        !self.enum_values.is_empty()
    }

    /// Number of axes tagged with the given dimension type
    pub fn axis_count(&self, dimension_type: DimensionType) -> usize {
        self.dimensions
            .iter()
            .filter(|d| **d == dimension_type)
            .count()
    }

    /// Position of the first axis tagged with the given dimension type
    pub fn axis_position(&self, dimension_type: DimensionType) -> Option<usize> {
        self.dimensions.iter().position(|d| *d == dimension_type)
    }

    /// Resize one axis in place, preserving the overlapping prefix.
    ///
    /// Grown room is filled with NaN for float storage, zero for integer
    /// storage, and the empty string for text storage.
    pub fn resize_dimension(&mut self, axis: usize, new_length: usize) -> Result<()> {
        if axis >= self.num_dimensions() {
            return Err(DobsonError::InvalidArgument {
                message: format!(
                    "axis {} out of range for variable {} with {} dimensions",
                    axis,
                    self.name,
                    self.num_dimensions()
                ),
            });
        }
        let resized = match &self.data {
            ArrayData::Int8(a) => ArrayData::Int8(resize_axis(a, axis, new_length, 0)),
            ArrayData::Int16(a) => ArrayData::Int16(resize_axis(a, axis, new_length, 0)),
            ArrayData::Int32(a) => ArrayData::Int32(resize_axis(a, axis, new_length, 0)),
            ArrayData::Float(a) => ArrayData::Float(resize_axis(a, axis, new_length, f32::NAN)),
            ArrayData::Double(a) => ArrayData::Double(resize_axis(a, axis, new_length, f64::NAN)),
            ArrayData::Text(a) => ArrayData::Text(resize_axis(a, axis, new_length, String::new())),
        };
        self.data = resized;
        Ok(())
    }

    /// Insert a new axis at the given position, replicating the existing data
    /// across it.
    ///
    /// Used to promote time-independent variables to time-dependent ones when
    /// a grid varies per time step.
    pub fn add_dimension(
        &mut self,
        position: usize,
        dimension_type: DimensionType,
        length: usize,
    ) -> Result<()> {
        if position > self.num_dimensions() {
            return Err(DobsonError::InvalidArgument {
                message: format!(
                    "axis position {} out of range for variable {} with {} dimensions",
                    position,
                    self.name,
                    self.num_dimensions()
                ),
            });
        }
        let replicated = match &self.data {
            ArrayData::Int8(a) => ArrayData::Int8(replicate_axis(a, position, length)),
            ArrayData::Int16(a) => ArrayData::Int16(replicate_axis(a, position, length)),
            ArrayData::Int32(a) => ArrayData::Int32(replicate_axis(a, position, length)),
            ArrayData::Float(a) => ArrayData::Float(replicate_axis(a, position, length)),
            ArrayData::Double(a) => ArrayData::Double(replicate_axis(a, position, length)),
            ArrayData::Text(a) => ArrayData::Text(replicate_axis(a, position, length)),
        };
        self.data = replicated;
        self.dimensions.insert(position, dimension_type);
        Ok(())
    }

    /// Widen integer or float storage to double precision.
    ///
    /// All rebin arithmetic operates on doubles regardless of the source
    /// storage type. Text storage cannot be converted.
    pub fn convert_to_double(&mut self) -> Result<()> {
        let converted = match &self.data {
            ArrayData::Int8(a) => a.mapv(|v| v as f64),
            ArrayData::Int16(a) => a.mapv(|v| v as f64),
            ArrayData::Int32(a) => a.mapv(|v| v as f64),
            ArrayData::Float(a) => a.mapv(|v| v as f64),
            ArrayData::Double(_) => return Ok(()),
            ArrayData::Text(_) => {
                return Err(DobsonError::InvalidArgument {
                    message: format!("cannot convert text variable {} to double", self.name),
                });
            }
        };
        self.data = ArrayData::Double(converted);
        Ok(())
    }

    /// Borrow the data as a flat double slice (row-major order)
    pub fn as_double_slice(&self) -> Result<&[f64]> {
        match &self.data {
            ArrayData::Double(a) => a.as_slice().ok_or_else(|| DobsonError::Internal {
                message: format!("variable {} is not in standard layout", self.name),
            }),
            _ => Err(DobsonError::InvalidArgument {
                message: format!(
                    "variable {} has data type {}, expected double",
                    self.name,
                    self.data_type().name()
                ),
            }),
        }
    }

    /// Mutably borrow the data as a flat double slice (row-major order)
    pub fn as_double_slice_mut(&mut self) -> Result<&mut [f64]> {
        let type_name = self.data_type().name();
        match &mut self.data {
            ArrayData::Double(a) => a.as_slice_mut().ok_or_else(|| DobsonError::Internal {
                message: format!("{} is not in standard layout", self.name),
            }),
            _ => Err(DobsonError::InvalidArgument {
                message: format!(
                    "variable {} has data type {}, expected double",
                    self.name, type_name
                ),
            }),
        }
    }
}

/// Reallocate one axis of an array, copying the overlapping prefix and
/// filling any grown room with the given fill value
fn resize_axis<T: Clone>(
    array: &Array<T, IxDyn>,
    axis: usize,
    new_length: usize,
    fill: T,
) -> Array<T, IxDyn> {
    let mut shape = array.shape().to_vec();
    let keep = shape[axis].min(new_length);
    shape[axis] = new_length;
    let mut resized = Array::from_elem(IxDyn(&shape), fill);
    if keep > 0 {
        let mut slice: Vec<SliceInfoElem> = array
            .shape()
            .iter()
            .map(|_| SliceInfoElem::Slice {
                start: 0,
                end: None,
                step: 1,
            })
            .collect();
        slice[axis] = SliceInfoElem::Slice {
            start: 0,
            end: Some(keep as isize),
            step: 1,
        };
        resized
            .slice_mut(slice.as_slice())
            .assign(&array.slice(slice.as_slice()));
    }
    resized
}

/// Insert a new axis of the given length, replicating the array across it
fn replicate_axis<T: Clone + Default>(
    array: &Array<T, IxDyn>,
    position: usize,
    length: usize,
) -> Array<T, IxDyn> {
    let mut shape = array.shape().to_vec();
    shape.insert(position, length);
    let mut replicated = Array::from_elem(IxDyn(&shape), T::default());
    for i in 0..length {
        replicated.index_axis_mut(Axis(position), i).assign(array);
    }
    replicated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn altitude_var() -> Variable {
        Variable::double(
            "altitude",
            Some("m"),
            vec![DimensionType::Time, DimensionType::Vertical],
            &[2, 3],
            vec![0.0, 10.0, 20.0, 1.0, 11.0, 21.0],
        )
        .unwrap()
    }

    #[test]
    fn test_new_validates_rank() {
        let data = ArrayData::Double(Array::from_shape_vec(IxDyn(&[2]), vec![1.0, 2.0]).unwrap());
        let result = Variable::new("x", None, vec![], data);
        assert!(result.is_err());
    }

    #[test]
    fn test_new_stores_unit() {
        let var = altitude_var();
        assert_eq!(var.unit.as_deref(), Some("m"));
        let data = ArrayData::Double(Array::from_elem(IxDyn(&[1]), 0.0));
        let unitless = Variable::new("index", None, vec![DimensionType::Time], data).unwrap();
        assert_eq!(unitless.unit, None);
    }

    #[test]
    fn test_double_slice_mut_rejects_non_double() {
        let data = ArrayData::Int32(Array::from_shape_vec(IxDyn(&[2]), vec![1, 2]).unwrap());
        let mut var = Variable::new("flag", Some("1"), vec![DimensionType::Time], data).unwrap();
        let err = var.as_double_slice_mut().unwrap_err();
        assert!(err.to_string().contains("int32"));
    }

    #[test]
    fn test_scalar_variable() {
        let data = ArrayData::Double(Array::from_elem(IxDyn(&[]), 42.0));
        let var = Variable::new("gain", Some("1"), vec![], data).unwrap();
        assert_eq!(var.num_dimensions(), 0);
        assert_eq!(var.data.num_elements(), 1);
    }

    #[test]
    fn test_resize_grow_fills_nan() {
        let mut var = altitude_var();
        var.resize_dimension(1, 5).unwrap();
        assert_eq!(var.shape(), &[2, 5]);
        let values = var.as_double_slice().unwrap();
        assert_eq!(values[0], 0.0);
        assert_eq!(values[2], 20.0);
        assert!(values[3].is_nan());
        assert!(values[4].is_nan());
        // second time step starts after the grown row
        assert_eq!(values[5], 1.0);
    }

    #[test]
    fn test_resize_shrink_keeps_prefix() {
        let mut var = altitude_var();
        var.resize_dimension(1, 2).unwrap();
        assert_eq!(var.shape(), &[2, 2]);
        let values = var.as_double_slice().unwrap();
        assert_eq!(values, &[0.0, 10.0, 1.0, 11.0]);
    }

    #[test]
    fn test_resize_integer_fill() {
        let data = ArrayData::Int32(Array::from_shape_vec(IxDyn(&[2]), vec![7, 8]).unwrap());
        let mut var = Variable::new("flag", Some("1"), vec![DimensionType::Time], data).unwrap();
        var.resize_dimension(0, 4).unwrap();
        match &var.data {
            ArrayData::Int32(a) => assert_eq!(a.as_slice().unwrap(), &[7, 8, 0, 0]),
            _ => panic!("expected int32 data"),
        }
    }

    #[test]
    fn test_resize_bad_axis() {
        let mut var = altitude_var();
        assert!(var.resize_dimension(2, 5).is_err());
    }

    #[test]
    fn test_add_dimension_replicates() {
        let mut var = Variable::double(
            "temperature",
            Some("K"),
            vec![DimensionType::Vertical],
            &[2],
            vec![250.0, 260.0],
        )
        .unwrap();
        var.add_dimension(0, DimensionType::Time, 3).unwrap();
        assert_eq!(var.shape(), &[3, 2]);
        assert_eq!(
            var.dimensions,
            vec![DimensionType::Time, DimensionType::Vertical]
        );
        let values = var.as_double_slice().unwrap();
        assert_eq!(values, &[250.0, 260.0, 250.0, 260.0, 250.0, 260.0]);
    }

    #[test]
    fn test_add_dimension_to_scalar() {
        let data = ArrayData::Double(Array::from_elem(IxDyn(&[]), 5.0));
        let mut var = Variable::new("offset", Some("1"), vec![], data).unwrap();
        var.add_dimension(0, DimensionType::Time, 2).unwrap();
        assert_eq!(var.shape(), &[2]);
        assert_eq!(var.as_double_slice().unwrap(), &[5.0, 5.0]);
    }

    #[test]
    fn test_convert_to_double() {
        let data = ArrayData::Int16(Array::from_shape_vec(IxDyn(&[3]), vec![1, 2, 3]).unwrap());
        let mut var = Variable::new("counts", Some("1"), vec![DimensionType::Time], data).unwrap();
        var.convert_to_double().unwrap();
        assert_eq!(var.data_type(), DataType::Double);
        assert_eq!(var.as_double_slice().unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_convert_text_fails() {
        let data = ArrayData::Text(Array::from_elem(IxDyn(&[1]), "a".to_string()));
        let mut var = Variable::new("label", None, vec![DimensionType::Time], data).unwrap();
        assert!(var.convert_to_double().is_err());
    }

    #[test]
    fn test_axis_lookup() {
        let var = altitude_var();
        assert_eq!(var.axis_count(DimensionType::Vertical), 1);
        assert_eq!(var.axis_position(DimensionType::Vertical), Some(1));
        assert_eq!(var.axis_position(DimensionType::Spectral), None);
    }
}
