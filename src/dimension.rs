//! Dimension semantics for product variables.
//!
//! Every axis of a variable is tagged with a dimension type. The product keeps
//! one length per dimension type and every variable axis of that type must
//! match it, except for the independent type whose length is free per variable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of dimension types an axis can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionType {
    /// Measurement time
    Time,
    /// Vertical grid (altitude or pressure levels)
    Vertical,
    /// Latitude grid
    Latitude,
    /// Longitude grid
    Longitude,
    /// Spectral grid (wavelength, wavenumber, or frequency)
    Spectral,
    /// Free axis with no shared length (e.g. the [lower, upper] pair of a
    /// bounds variable)
    Independent,
}

impl DimensionType {
    /// The name used for this dimension type in summaries and messages
    pub fn name(&self) -> &'static str {
        match self {
            DimensionType::Time => "time",
            DimensionType::Vertical => "vertical",
            DimensionType::Latitude => "latitude",
            DimensionType::Longitude => "longitude",
            DimensionType::Spectral => "spectral",
            DimensionType::Independent => "independent",
        }
    }

    /// The axis-coordinate and axis-bounds variable names reserved for this
    /// dimension type.
    ///
    /// These variables describe the grid itself and are regenerated when the
    /// grid changes, so the rebin engine removes them up front.
    pub fn axis_variable_names(&self) -> &'static [&'static str] {
        match self {
            DimensionType::Time => &[
                "datetime",
                "datetime_bounds",
                "datetime_start",
                "datetime_stop",
                "datetime_length",
            ],
            DimensionType::Vertical => &[
                "altitude",
                "altitude_bounds",
                "altitude_gph",
                "altitude_gph_bounds",
                "pressure",
                "pressure_bounds",
            ],
            DimensionType::Latitude => &["latitude", "latitude_bounds"],
            DimensionType::Longitude => &["longitude", "longitude_bounds"],
            DimensionType::Spectral => &[
                "wavelength",
                "wavelength_bounds",
                "wavenumber",
                "wavenumber_bounds",
                "frequency",
                "frequency_bounds",
            ],
            DimensionType::Independent => &[],
        }
    }

    /// Whether the given variable name is a reserved axis variable for this
    /// dimension type
    pub fn is_axis_variable(&self, name: &str) -> bool {
        self.axis_variable_names().contains(&name)
    }
}

impl fmt::Display for DimensionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
