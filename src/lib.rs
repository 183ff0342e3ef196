//! Post-processing of 3D GCM atmospheres
//!
//! Attach chemistry to a 3D grid of temperature and pressure, then regrid the
//! combined atmosphere onto the facets of a disk-resolved observing geometry.
//!
//! ```
//! use gcm_case::{generator, Case};
//!
//! let mut grid = generator::tp_grid_3d(generator::GridShape::default())?;
//! let chemistry = generator::random_h2o_h2(&grid, 0)?;
//! grid.update(chemistry)?;
//!
//! let mut case = Case::new();
//! case.phase_angle(0., 5, 5)?;
//! case.atmosphere_3d(grid, true)?;
//!
//! let profile = case.inputs().atmosphere().profile().unwrap();
//! assert_eq!(profile["H2O"].data().shape(), &[5, 5, 60]);
//! # Ok::<(), gcm_case::CaseError>(())
//! ```
//!
//! NOTE: the Python interface is in the `python` module, which is only built
//! with the `python` feature.

pub mod case;
pub mod chemistry;
pub mod dataset;
pub mod error;
pub mod generator;
pub mod units;

#[cfg(feature = "python")]
mod python;

pub use case::{Case, CaseConfig, Geometry};
pub use dataset::{Coordinate, DataVariable, Dim, GriddedDataset};
pub use error::CaseError;
