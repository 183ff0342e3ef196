//! Run configuration for post-processing a 3D atmosphere.
//!
//! A [`Case`] collects the observing geometry and the 3D atmosphere for one
//! run, and can fill in the chemistry of that atmosphere by solving chemical
//! equilibrium in every grid cell.

mod geometry;
mod regrid;


pub use geometry::Geometry;

use std::time::Duration;

use log::{debug, info, warn};

use crate::chemistry::{self, Blocking, Elements, Monitor, SOLAR_C_TO_O};
use crate::dataset::{Coordinate, DataVariable, Dim, GriddedDataset};
use crate::error::CaseError;
use crate::generator::logspace;
use crate::units;

/// Settings for a case.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseConfig {
    /// Number of pressure levels after regridding
    pub nlevel: usize,
    /// Metallicity as log10 relative to solar
    pub log_mh: f64,
    /// Absolute carbon to oxygen ratio
    pub c_to_o: f64,
    /// How often to log progress during chemistry
    pub progress_interval: Duration,
}

impl Default for CaseConfig {
    fn default() -> Self {
        Self {
            nlevel: 60,
            log_mh: 0.,
            c_to_o: SOLAR_C_TO_O,
            progress_interval: Duration::from_secs(5),
        }
    }
}

impl CaseConfig {
    /// Set the number of pressure levels used when regridding.
    pub fn with_nlevel(mut self, nlevel: usize) -> Self {
        self.nlevel = nlevel;
        self
    }

    /// Set the metallicity, log10 relative to solar.
    pub fn with_log_mh(mut self, log_mh: f64) -> Self {
        self.log_mh = log_mh;
        self
    }

    /// Set the absolute carbon to oxygen ratio.
    pub fn with_c_to_o(mut self, c_to_o: f64) -> Self {
        self.c_to_o = c_to_o;
        self
    }

    /// Set the progress logging interval.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }
}

/// The atmosphere inputs of a case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Atmosphere {
    profile: Option<GriddedDataset>,
    regridded: bool,
}

impl Atmosphere {
    /// The 3D atmosphere, in bar, K, degrees, and v/v.
    ///
    /// Abundance fields are looked up by species name, e.g.
    /// `profile["CH4"]`.
    pub fn profile(&self) -> Option<&GriddedDataset> {
        self.profile.as_ref()
    }

    /// Whether the profile was regridded onto the observing geometry.
    pub fn is_regridded(&self) -> bool {
        self.regridded
    }
}

/// Everything a case has been configured with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inputs {
    geometry: Option<Geometry>,
    atmosphere: Atmosphere,
}

impl Inputs {
    /// Observing geometry, if the phase angle has been set.
    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    /// Phase angle in radians, if set.
    pub fn phase_angle(&self) -> Option<f64> {
        self.geometry.as_ref().map(Geometry::phase)
    }

    /// Atmosphere inputs.
    pub fn atmosphere(&self) -> &Atmosphere {
        &self.atmosphere
    }
}

/// A post-processing run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Case {
    config: CaseConfig,
    inputs: Inputs,
}

impl Case {
    /// A case with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// A case with the given settings.
    pub fn with_config(config: CaseConfig) -> Self {
        Self {
            config,
            inputs: Inputs::default(),
        }
    }

    /// Settings for this case.
    pub fn config(&self) -> &CaseConfig {
        &self.config
    }

    /// Inputs configured so far.
    pub fn inputs(&self) -> &Inputs {
        &self.inputs
    }

    /// Set the observing geometry.
    ///
    /// `phase` is the phase angle in radians, in [0, π). The visible disk is
    /// split into `num_gangle` by `num_tangle` facets. Set this before
    /// attaching an atmosphere that should be regridded.
    pub fn phase_angle(
        &mut self,
        phase: f64,
        num_gangle: usize,
        num_tangle: usize,
    ) -> Result<(), CaseError> {
        let geometry = Geometry::new(phase, num_gangle, num_tangle)?;
        debug!(
            "facet longitudes {:?}, latitudes {:?}",
            geometry.lon().as_slice(),
            geometry.lat().as_slice()
        );
        self.inputs.geometry = Some(geometry);
        Ok(())
    }

    /// Attach a 3D atmosphere.
    ///
    /// The dataset must have a `temperature` variable; it and the pressure
    /// coordinate are converted to K and bar. With `regrid`, the dataset is
    /// resampled onto the facets of the observing geometry and onto
    /// [`CaseConfig::nlevel`] log-spaced pressures spanning the input range, or
    /// onto the one input level if there is only one.
    pub fn atmosphere_3d(
        &mut self,
        dataset: GriddedDataset,
        regrid: bool,
    ) -> Result<(), CaseError> {
        let dataset = canonicalize(dataset)?;

        let profile = if regrid {
            let geometry = self
                .inputs
                .geometry
                .as_ref()
                .ok_or(CaseError::GeometryNotSet)?;
            if self.config.nlevel == 0 {
                return Err(CaseError::InconsistentInputs);
            }
            let source_pressure = dataset.coord(Dim::Pressure).values();
            let (p_min, p_max) = source_pressure
                .iter()
                .fold((f64::INFINITY, 0f64), |(lo, hi), &p| (lo.min(p), hi.max(p)));
            // A single source level can only be regridded onto itself
            let nlevel = if p_min < p_max { self.config.nlevel } else { 1 };
            let pressure = logspace(p_min, p_max, nlevel);

            let [num_lon, num_lat, num_pressure] = dataset.shape();
            info!(
                "Regridding atmosphere from {num_lon}x{num_lat}x{num_pressure} to {}x{}x{nlevel}",
                geometry.num_gangle(),
                geometry.num_tangle(),
            );
            regrid::regrid(&dataset, geometry.lon(), geometry.lat(), &pressure)?
        } else {
            dataset
        };

        if !profile.has_abundances() {
            warn!(
                "No abundances found in the 3D atmosphere. Either add volume mixing ratio \
                 fields to the dataset before attaching it, or call chemeq_3d to compute \
                 them in chemical equilibrium."
            );
        }

        self.inputs.atmosphere = Atmosphere {
            profile: Some(profile),
            regridded: regrid,
        };
        Ok(())
    }

    /// Compute chemical equilibrium abundances at every cell of the attached
    /// atmosphere.
    ///
    /// `n_cpu` of 1 runs serially, larger values use that many worker
    /// threads. Any abundance fields already in the profile are replaced by
    /// the species in [`chemistry::SPECIES`].
    pub fn chemeq_3d(&mut self, n_cpu: usize) -> Result<(), CaseError> {
        self.chemeq_3d_with_monitor(n_cpu, &mut Blocking)
    }

    /// Same as [`Case::chemeq_3d`], but with a [`Monitor`] that can cancel the
    /// computation.
    pub fn chemeq_3d_with_monitor<M: Monitor + ?Sized>(
        &mut self,
        n_cpu: usize,
        monitor: &mut M,
    ) -> Result<(), CaseError> {
        let elements = Elements::new(self.config.log_mh, self.config.c_to_o)?;
        let profile = self
            .inputs
            .atmosphere
            .profile
            .as_mut()
            .ok_or(CaseError::AtmosphereNotSet)?;

        let fields = chemistry::solve_3d(
            profile.variable("temperature")?.data().view(),
            profile.coord(Dim::Pressure).values().view(),
            &elements,
            n_cpu,
            self.config.progress_interval,
            monitor,
        )?;

        let stale: Vec<String> = profile
            .abundance_species()
            .into_iter()
            .map(str::to_owned)
            .collect();
        for name in stale {
            debug!("replacing abundance field {name}");
            profile.remove(&name);
        }
        for (species, field) in fields {
            profile.insert(species, DataVariable::new(field, units::VMR))?;
        }
        Ok(())
    }
}

/// Convert the pressure coordinate to bar and temperature to K, and check
/// that longitude and latitude are in degrees.
fn canonicalize(mut dataset: GriddedDataset) -> Result<GriddedDataset, CaseError> {
    for dim in [Dim::Lon, Dim::Lat] {
        units::check_degrees(dataset.coord(dim).units())?;
    }

    if dataset.coord(Dim::Pressure).units() != units::BAR {
        let pressure = dataset.coord(Dim::Pressure).canonical_values(Dim::Pressure)?;
        dataset.set_coord(Dim::Pressure, Coordinate::new(pressure, units::BAR))?;
    }
    if dataset.coord(Dim::Pressure).values().iter().any(|&p| p <= 0.) {
        return Err(CaseError::InconsistentInputs);
    }

    let temperature = dataset
        .remove("temperature")
        .ok_or_else(|| CaseError::MissingVariable("temperature".to_owned()))?;
    let (mut data, unit, long_name) = temperature.into_parts();
    if unit != units::KELVIN {
        for t in data.iter_mut() {
            *t = units::temperature_to_kelvin(*t, &unit)?;
        }
    }
    dataset.insert(
        "temperature",
        DataVariable::from_parts(data, units::KELVIN.to_owned(), long_name),
    )?;
    Ok(dataset)
}
