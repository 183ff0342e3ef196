//! Labeled 3D gridded datasets.
//!
//! A [`GriddedDataset`] is a collection of named data variables that all share
//! the same three coordinates: longitude, latitude, and pressure. Every
//! variable is a dense array indexed as (`lon`, `lat`, `pressure`).

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use ndarray::{Array1, Array3, ArrayView2, Axis, Zip};

use crate::error::CaseError;
use crate::units;

/// Relative tolerance when checking that two coordinates are the same.
const COORD_RTOL: f64 = 1e-9;

/// One of the three dimensions of a gridded dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dim {
    /// Longitude, in degrees
    Lon,
    /// Latitude, in degrees
    Lat,
    /// Pressure level, in bar
    Pressure,
}

impl Dim {
    /// All dimensions, in array axis order.
    pub const ALL: [Dim; 3] = [Dim::Lon, Dim::Lat, Dim::Pressure];

    /// The coordinate name for this dimension.
    pub fn name(self) -> &'static str {
        match self {
            Dim::Lon => "lon",
            Dim::Lat => "lat",
            Dim::Pressure => "pressure",
        }
    }

    /// The array axis for this dimension.
    pub fn axis(self) -> Axis {
        Axis(self as usize)
    }

    /// Look up a dimension by its coordinate name.
    pub fn from_name(name: &str) -> Result<Self, CaseError> {
        match name {
            "lon" | "longitude" => Ok(Dim::Lon),
            "lat" | "latitude" => Ok(Dim::Lat),
            "pressure" => Ok(Dim::Pressure),
            _ => Err(CaseError::MissingCoordinate(name.to_owned())),
        }
    }
}

/// A 1D coordinate with its unit annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinate {
    values: Array1<f64>,
    units: String,
}

impl Coordinate {
    /// Create a coordinate. It is validated when placed into a dataset.
    pub fn new(values: impl Into<Array1<f64>>, units: &str) -> Self {
        Self {
            values: values.into(),
            units: units.to_owned(),
        }
    }

    /// Coordinate values.
    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    /// Unit annotation.
    pub fn units(&self) -> &str {
        &self.units
    }

    /// Number of coordinate values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the coordinate has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Index of the value nearest to `value`.
    pub fn nearest_index(&self, value: f64) -> usize {
        self.values
            .iter()
            .enumerate()
            .fold((0, f64::INFINITY), |(best, best_dist), (i, &v)| {
                let dist = (v - value).abs();
                if dist < best_dist {
                    (i, dist)
                } else {
                    (best, best_dist)
                }
            })
            .0
    }

    fn is_strictly_monotonic(&self) -> bool {
        if self.values.is_empty() || self.values.iter().any(|v| !v.is_finite()) {
            return false;
        }
        let pairs = || self.values.iter().zip(self.values.iter().skip(1));
        pairs().all(|(a, b)| b > a) || pairs().all(|(a, b)| b < a)
    }

    /// Values converted into the canonical unit for `dim`.
    pub(crate) fn canonical_values(&self, dim: Dim) -> Result<Array1<f64>, CaseError> {
        match dim {
            Dim::Lon | Dim::Lat => {
                units::check_degrees(&self.units)?;
                Ok(self.values.clone())
            }
            Dim::Pressure => {
                let scale = units::pressure_to_bar(&self.units)?;
                Ok(&self.values * scale)
            }
        }
    }

    fn same_values(&self, other: &Self, dim: Dim) -> Result<bool, CaseError> {
        if self.len() != other.len() {
            return Ok(false);
        }
        let (lhs, rhs) = if self.units == other.units {
            (self.values.clone(), other.values.clone())
        } else {
            (self.canonical_values(dim)?, other.canonical_values(dim)?)
        };
        Ok(lhs.iter().zip(&rhs).all(|(a, b)| {
            let scale = a.abs().max(b.abs()).max(f64::MIN_POSITIVE);
            (a - b).abs() <= COORD_RTOL * scale
        }))
    }
}

/// A named field over the (`lon`, `lat`, `pressure`) grid.
#[derive(Debug, Clone, PartialEq)]
pub struct DataVariable {
    data: Array3<f64>,
    units: String,
    long_name: Option<String>,
}

impl DataVariable {
    /// Create a data variable with a unit annotation.
    pub fn new(data: Array3<f64>, units: &str) -> Self {
        Self {
            data,
            units: units.to_owned(),
            long_name: None,
        }
    }

    /// Attach a descriptive name.
    pub fn with_long_name(mut self, long_name: &str) -> Self {
        self.long_name = Some(long_name.to_owned());
        self
    }

    /// The data, indexed (`lon`, `lat`, `pressure`).
    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    /// Unit annotation.
    pub fn units(&self) -> &str {
        &self.units
    }

    /// Descriptive name, if any.
    pub fn long_name(&self) -> Option<&str> {
        self.long_name.as_deref()
    }

    /// Whether this variable is a volume mixing ratio.
    pub fn is_abundance(&self) -> bool {
        units::is_mixing_ratio(&self.units)
    }

    /// Select a single index along `dim`, dropping that dimension.
    ///
    /// The remaining dimensions keep their order, so selecting a pressure
    /// index gives a (`lon`, `lat`) array.
    pub fn isel(&self, dim: Dim, index: usize) -> Result<ArrayView2<'_, f64>, CaseError> {
        let len = self.data.len_of(dim.axis());
        if index >= len {
            return Err(CaseError::IndexOutOfRange {
                dim: dim.name(),
                index,
                len,
            });
        }
        Ok(self.data.index_axis(dim.axis(), index))
    }

    pub(crate) fn into_parts(self) -> (Array3<f64>, String, Option<String>) {
        (self.data, self.units, self.long_name)
    }

    pub(crate) fn from_parts(data: Array3<f64>, units: String, long_name: Option<String>) -> Self {
        Self {
            data,
            units,
            long_name,
        }
    }
}

/// A collection of data variables sharing longitude, latitude, and pressure
/// coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct GriddedDataset {
    coords: [Coordinate; 3],
    variables: BTreeMap<String, DataVariable>,
}

impl GriddedDataset {
    /// Create an empty dataset from its three coordinates.
    ///
    /// Each coordinate must be non-empty, finite, and strictly monotonic.
    pub fn new(lon: Coordinate, lat: Coordinate, pressure: Coordinate) -> Result<Self, CaseError> {
        let coords = [lon, lat, pressure];
        for (coord, dim) in coords.iter().zip(Dim::ALL) {
            if !coord.is_strictly_monotonic() {
                return Err(CaseError::NonMonotonic(dim.name().to_owned()));
            }
        }
        Ok(Self {
            coords,
            variables: BTreeMap::new(),
        })
    }

    /// An empty dataset on the same coordinates as `self`.
    pub fn empty_like(&self) -> Self {
        Self {
            coords: self.coords.clone(),
            variables: BTreeMap::new(),
        }
    }

    /// Add a variable, returning the dataset for chaining.
    pub fn with_variable(mut self, name: &str, variable: DataVariable) -> Result<Self, CaseError> {
        self.insert(name, variable)?;
        Ok(self)
    }

    /// The coordinate for `dim`.
    pub fn coord(&self, dim: Dim) -> &Coordinate {
        &self.coords[dim as usize]
    }

    /// Look up a coordinate by name (`lon`, `lat`, or `pressure`).
    pub fn coordinate(&self, name: &str) -> Result<&Coordinate, CaseError> {
        Ok(self.coord(Dim::from_name(name)?))
    }

    /// Grid shape as (`num_lon`, `num_lat`, `num_pressure`).
    pub fn shape(&self) -> [usize; 3] {
        [
            self.coords[0].len(),
            self.coords[1].len(),
            self.coords[2].len(),
        ]
    }

    /// Insert a variable, replacing (and returning) any variable of the same
    /// name. The variable must match the grid shape.
    pub fn insert(
        &mut self,
        name: &str,
        variable: DataVariable,
    ) -> Result<Option<DataVariable>, CaseError> {
        if variable.data.shape() != self.shape() {
            return Err(CaseError::InconsistentInputs);
        }
        Ok(self.variables.insert(name.to_owned(), variable))
    }

    /// Remove a variable.
    pub fn remove(&mut self, name: &str) -> Option<DataVariable> {
        self.variables.remove(name)
    }

    /// Get a variable by name.
    pub fn get(&self, name: &str) -> Option<&DataVariable> {
        self.variables.get(name)
    }

    /// Get a variable by name, or fail with [`CaseError::MissingVariable`].
    pub fn variable(&self, name: &str) -> Result<&DataVariable, CaseError> {
        self.get(name)
            .ok_or_else(|| CaseError::MissingVariable(name.to_owned()))
    }

    /// Whether a variable exists.
    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Variable names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.variables.keys().map(String::as_str)
    }

    /// Iterate over (name, variable) pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataVariable)> + '_ {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of data variables.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether there are no data variables.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Merge `other` into `self`.
    ///
    /// Both datasets must have the same coordinate values. Variables only in
    /// `self` are kept, variables in `other` are added, and variables in both
    /// take the value from `other`. The coordinates of `self` are unchanged.
    pub fn update(&mut self, other: GriddedDataset) -> Result<(), CaseError> {
        for dim in Dim::ALL {
            if !self.coord(dim).same_values(other.coord(dim), dim)? {
                return Err(CaseError::CoordinateMismatch {
                    name: dim.name().to_owned(),
                });
            }
        }
        self.variables.extend(other.variables);
        Ok(())
    }

    /// Select a single index along `dim` for the variable `name`.
    pub fn isel(
        &self,
        name: &str,
        dim: Dim,
        index: usize,
    ) -> Result<ArrayView2<'_, f64>, CaseError> {
        self.variable(name)?.isel(dim, index)
    }

    /// Select a single pressure level of `name`, giving a (`lon`, `lat`) array.
    pub fn select_pressure(
        &self,
        name: &str,
        index: usize,
    ) -> Result<ArrayView2<'_, f64>, CaseError> {
        self.isel(name, Dim::Pressure, index)
    }

    /// Index of the coordinate value along `dim` nearest to `value`.
    pub fn sel_nearest(&self, dim: Dim, value: f64) -> usize {
        self.coord(dim).nearest_index(value)
    }

    /// Names of the variables that are volume mixing ratios.
    pub fn abundance_species(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, v)| v.is_abundance())
            .map(|(k, _)| k)
            .collect()
    }

    /// Whether any volume mixing ratio variable is present.
    pub fn has_abundances(&self) -> bool {
        self.variables.values().any(DataVariable::is_abundance)
    }

    /// Sum of every volume mixing ratio variable at each grid point.
    pub fn vmr_total(&self) -> Array3<f64> {
        let mut total = Array3::zeros(self.shape());
        for variable in self.variables.values().filter(|v| v.is_abundance()) {
            Zip::from(&mut total)
                .and(&variable.data)
                .for_each(|t, &v| *t += v);
        }
        total
    }

    /// Replace the coordinate for `dim`. The length must not change.
    pub(crate) fn set_coord(&mut self, dim: Dim, coord: Coordinate) -> Result<(), CaseError> {
        if coord.len() != self.coord(dim).len() {
            return Err(CaseError::InconsistentInputs);
        }
        if !coord.is_strictly_monotonic() {
            return Err(CaseError::NonMonotonic(dim.name().to_owned()));
        }
        self.coords[dim as usize] = coord;
        Ok(())
    }
}

impl std::ops::Index<&str> for GriddedDataset {
    type Output = DataVariable;

    /// Panics if there is no variable called `name`; use
    /// [`GriddedDataset::get`] for a fallible lookup.
    fn index(&self, name: &str) -> &DataVariable {
        match self.variables.get(name) {
            Some(v) => v,
            None => panic!("no data variable named '{name}'"),
        }
    }
}
