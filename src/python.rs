//! Python bindings.
//!
//! NOTE: this module is the interface between Rust and Python. The real work
//! happens in the other modules, and they do not use `pyo3`, it's only used
//! here.

use std::collections::HashMap;
use std::time::Duration;

use ndarray::{Array1, Array3};
use numpy::{PyArray1, PyArray3, PyReadonlyArray1, PyReadonlyArray3, ToPyArray};
use pyo3::exceptions::{PyKeyError, PyValueError};
use pyo3::prelude::*;

use crate::case::{Case, CaseConfig};
use crate::chemistry::{Monitor, SOLAR_C_TO_O, SPECIES};
use crate::dataset::{Coordinate, DataVariable, Dim, GriddedDataset};
use crate::error::CaseError;
use crate::generator::{self, GridShape};
use crate::units;

impl From<CaseError> for PyErr {
    fn from(e: CaseError) -> Self {
        match e {
            CaseError::MissingVariable(_) | CaseError::MissingCoordinate(_) => {
                PyKeyError::new_err(e.to_string())
            }
            _ => PyValueError::new_err(e.to_string()),
        }
    }
}

/// Checks for Python signals (e.g. Ctrl-C) while the workers run, and
/// releases the GIL while waiting.
struct SignalMonitor<'py> {
    py: Python<'py>,
    error: Option<PyErr>,
}

impl Monitor for SignalMonitor<'_> {
    fn cancelled(&mut self) -> bool {
        match self.py.check_signals() {
            Ok(()) => false,
            Err(e) => {
                self.error = Some(e);
                true
            }
        }
    }

    fn wait(&mut self, interval: Duration) {
        self.py.allow_threads(|| std::thread::sleep(interval));
    }
}

/// A synthetic 3D temperature-pressure grid.
///
/// `temperature` is dimensioned as (`num_lon`, `num_lat`, `num_pressure`).
#[pyclass]
struct Grid3d {
    lon: Array1<f64>,
    lat: Array1<f64>,
    pressure: Array1<f64>,
    temperature: Array3<f64>,
}

/// Implement all the "getters" for the Python properties
#[pymethods]
impl Grid3d {
    #[getter]
    fn lon<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.lon.to_pyarray(py)
    }

    #[getter]
    fn lat<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.lat.to_pyarray(py)
    }

    #[getter]
    fn pressure<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.pressure.to_pyarray(py)
    }

    #[getter]
    fn temperature<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray3<f64>> {
        self.temperature.to_pyarray(py)
    }
}

/// Generate a synthetic hot-Jupiter-like 3D temperature-pressure grid, with
/// longitude and latitude in degrees, pressure in bar, and temperature in K.
#[pyfunction]
#[pyo3(signature = (num_lon=128, num_lat=64, num_pressure=53, p_top=1e-6, p_bottom=1e2))]
fn tp_grid_3d(
    num_lon: usize,
    num_lat: usize,
    num_pressure: usize,
    p_top: f64,
    p_bottom: f64,
) -> PyResult<Grid3d> {
    let grid = generator::tp_grid_3d(GridShape {
        num_lon,
        num_lat,
        num_pressure,
        p_top,
        p_bottom,
    })?;
    Ok(Grid3d {
        lon: grid.coord(Dim::Lon).values().clone(),
        lat: grid.coord(Dim::Lat).values().clone(),
        pressure: grid.coord(Dim::Pressure).values().clone(),
        temperature: grid.variable("temperature")?.data().clone(),
    })
}

/// A post-processing run.
#[pyclass(name = "Case")]
struct PyCase {
    inner: Case,
}

#[pymethods]
impl PyCase {
    /// Create a case. `nlevel` is the number of pressure levels after
    /// regridding, `log_mh` is the log10 metallicity relative to solar, and
    /// `c_to_o` is the absolute C/O ratio (solar if `None`).
    #[new]
    #[pyo3(signature = (nlevel=60, log_mh=0.0, c_to_o=None))]
    fn new(nlevel: usize, log_mh: f64, c_to_o: Option<f64>) -> Self {
        let config = CaseConfig::default()
            .with_nlevel(nlevel)
            .with_log_mh(log_mh)
            .with_c_to_o(c_to_o.unwrap_or(SOLAR_C_TO_O));
        Self {
            inner: Case::with_config(config),
        }
    }

    /// Set the phase angle in radians and the number of Gauss and Chebyshev
    /// angles.
    fn phase_angle(&mut self, phase: f64, num_gangle: usize, num_tangle: usize) -> PyResult<()> {
        Ok(self.inner.phase_angle(phase, num_gangle, num_tangle)?)
    }

    /// Attach a 3D atmosphere.
    ///
    /// `lon` and `lat` are in degrees and have shapes (`num_lon`, ) and
    /// (`num_lat`, ). `pressure` has shape (`num_pressure`, ). `temperature`
    /// and every array in `abundances` (volume mixing ratios, keyed by species)
    /// have shape (`num_lon`, `num_lat`, `num_pressure`).
    #[pyo3(signature = (
        lon,
        lat,
        pressure,
        temperature,
        abundances=None,
        regrid=true,
        pressure_unit="bar",
        temperature_unit="K",
    ))]
    #[allow(clippy::too_many_arguments)]
    fn atmosphere_3d<'py>(
        &mut self,
        lon: PyReadonlyArray1<'py, f64>,
        lat: PyReadonlyArray1<'py, f64>,
        pressure: PyReadonlyArray1<'py, f64>,
        temperature: PyReadonlyArray3<'py, f64>,
        abundances: Option<HashMap<String, PyReadonlyArray3<'py, f64>>>,
        regrid: bool,
        pressure_unit: &str,
        temperature_unit: &str,
    ) -> PyResult<()> {
        let mut dataset = GriddedDataset::new(
            Coordinate::new(lon.as_array().to_owned(), units::DEGREES),
            Coordinate::new(lat.as_array().to_owned(), units::DEGREES),
            Coordinate::new(pressure.as_array().to_owned(), pressure_unit),
        )?;
        dataset.insert(
            "temperature",
            DataVariable::new(temperature.as_array().to_owned(), temperature_unit),
        )?;
        for (species, vmr) in abundances.unwrap_or_default() {
            dataset.insert(
                &species,
                DataVariable::new(vmr.as_array().to_owned(), units::VMR),
            )?;
        }

        Ok(self.inner.atmosphere_3d(dataset, regrid)?)
    }

    /// Compute chemical equilibrium abundances at every grid cell, using
    /// `n_cpu` worker threads (1 runs serially).
    #[pyo3(signature = (n_cpu=1))]
    fn chemeq_3d(&mut self, py: Python<'_>, n_cpu: usize) -> PyResult<()> {
        let mut monitor = SignalMonitor { py, error: None };
        match self.inner.chemeq_3d_with_monitor(n_cpu, &mut monitor) {
            Ok(()) => Ok(()),
            Err(CaseError::Cancelled) => Err(monitor
                .error
                .take()
                .unwrap_or_else(|| CaseError::Cancelled.into())),
            Err(e) => Err(e.into()),
        }
    }

    /// A field of the attached atmosphere, e.g. `"temperature"` or `"CH4"`.
    fn profile<'py>(&self, py: Python<'py>, name: &str) -> PyResult<Bound<'py, PyArray3<f64>>> {
        let profile = self.attached()?;
        Ok(profile.variable(name)?.data().to_pyarray(py))
    }

    /// A coordinate of the attached atmosphere: `"lon"`, `"lat"`, or
    /// `"pressure"`.
    fn coordinate<'py>(&self, py: Python<'py>, name: &str) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let profile = self.attached()?;
        Ok(profile.coordinate(name)?.values().to_pyarray(py))
    }

    /// Names of the fields in the attached atmosphere.
    #[getter]
    fn variables(&self) -> PyResult<Vec<String>> {
        Ok(self.attached()?.names().map(str::to_owned).collect())
    }
}

impl PyCase {
    fn attached(&self) -> Result<&GriddedDataset, CaseError> {
        self.inner
            .inputs()
            .atmosphere()
            .profile()
            .ok_or(CaseError::AtmosphereNotSet)
    }
}

/// A Python module implemented in Rust.
#[pymodule]
fn gcm_case(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    m.add_function(wrap_pyfunction!(tp_grid_3d, m)?)?;
    m.add_class::<Grid3d>()?;
    m.add_class::<PyCase>()?;
    m.add("SPECIES", SPECIES.to_vec())?;
    Ok(())
}
