//! Synthetic datasets for demonstrations and tests.

use ndarray::{Array1, Array3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::dataset::{Coordinate, DataVariable, GriddedDataset};
use crate::error::CaseError;
use crate::units;

/// Size and pressure span of a synthetic grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridShape {
    /// Number of longitudes, evenly spaced over [-180, 180)
    pub num_lon: usize,
    /// Number of latitudes, evenly spaced over (-90, 90)
    pub num_lat: usize,
    /// Number of pressure levels, log-spaced
    pub num_pressure: usize,
    /// Lowest pressure in bar
    pub p_top: f64,
    /// Highest pressure in bar
    pub p_bottom: f64,
}

impl Default for GridShape {
    /// A typical GCM output resolution: 128 x 64 x 53 from 1e-6 to 100 bar.
    fn default() -> Self {
        Self {
            num_lon: 128,
            num_lat: 64,
            num_pressure: 53,
            p_top: 1e-6,
            p_bottom: 1e2,
        }
    }
}

/// Log-spaced values from `start` to `stop`, inclusive.
pub(crate) fn logspace(start: f64, stop: f64, num: usize) -> Array1<f64> {
    if num == 1 {
        return Array1::from_elem(1, start);
    }
    let (lo, hi) = (start.log10(), stop.log10());
    Array1::from_shape_fn(num, |i| 10f64.powf(lo + (hi - lo) * i as f64 / (num - 1) as f64))
}

/// Generate a synthetic hot-Jupiter-like 3D temperature-pressure grid.
///
/// The returned dataset has a single `temperature` variable in K. The profile
/// warms with depth, and the upper atmosphere has a day-night contrast with
/// the hot spot shifted 20° east of the substellar point. The contrast fades
/// below ~0.1 bar.
pub fn tp_grid_3d(shape: GridShape) -> Result<GriddedDataset, CaseError> {
    /// Mean temperature at the top of the grid in K
    const T_TOP: f64 = 900.;
    /// Temperature increase from top to bottom in K
    const T_RISE: f64 = 900.;
    /// Peak day-night amplitude in K
    const CONTRAST: f64 = 500.;
    /// Pressure in bar where the contrast is halved
    const P_RADIATIVE: f64 = 0.1;
    /// Eastward hot spot offset in degrees
    const HOT_SPOT: f64 = 20.;

    let GridShape {
        num_lon,
        num_lat,
        num_pressure,
        p_top,
        p_bottom,
    } = shape;
    if !(p_top > 0. && p_bottom > p_top) {
        return Err(CaseError::InconsistentInputs);
    }

    let lon = Array1::from_shape_fn(num_lon, |i| -180. + 360. * i as f64 / num_lon as f64);
    let lat = Array1::from_shape_fn(num_lat, |j| {
        -90. + 180. * (j as f64 + 0.5) / num_lat as f64
    });
    let pressure = logspace(p_top, p_bottom, num_pressure);

    let log_span = (p_bottom / p_top).log10();
    let temperature = Array3::from_shape_fn([num_lon, num_lat, num_pressure], |(i, j, k)| {
        let p = pressure[k];
        let depth = (p / p_top).log10() / log_span;
        let base = T_TOP + T_RISE * depth.powf(1.5);
        let amplitude = CONTRAST / (1. + p / P_RADIATIVE);
        let day_night = (lon[i] - HOT_SPOT).to_radians().cos() * lat[j].to_radians().cos();
        base + amplitude * day_night
    });

    GriddedDataset::new(
        Coordinate::new(lon, units::DEGREES),
        Coordinate::new(lat, units::DEGREES),
        Coordinate::new(pressure, units::BAR),
    )?
    .with_variable(
        "temperature",
        DataVariable::new(temperature, units::KELVIN).with_long_name("temperature"),
    )
}

/// Build a two-species chemistry dataset on the grid of `grid`.
///
/// H2O is drawn uniformly from [0, 1) at every point and H2 fills the rest,
/// so the two always sum to 1. This is placeholder chemistry for exercising
/// the merge, with no physical meaning. The same `seed` always gives the same
/// values.
pub fn random_h2o_h2(grid: &GriddedDataset, seed: u64) -> Result<GriddedDataset, CaseError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let h2o = Array3::from_shape_simple_fn(grid.shape(), || rng.gen_range(0.0..1.0));
    let h2 = h2o.mapv(|x| 1. - x);

    grid.empty_like()
        .with_variable("H2O", DataVariable::new(h2o, units::VMR))?
        .with_variable("H2", DataVariable::new(h2, units::VMR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dim;
    use approx::assert_relative_eq;

    #[test]
    fn default_grid() {
        let ds = tp_grid_3d(GridShape::default()).unwrap();
        assert_eq!(ds.shape(), [128, 64, 53]);
        assert_eq!(ds.names().collect::<Vec<_>>(), ["temperature"]);
        assert!(!ds.has_abundances());

        let pressure = ds.coord(Dim::Pressure).values();
        assert_relative_eq!(pressure[0], 1e-6, max_relative = 1e-12);
        assert_relative_eq!(pressure[52], 1e2, max_relative = 1e-12);
        assert_eq!(ds.coord(Dim::Lon).values()[0], -180.);

        let temperature = ds["temperature"].data();
        assert!(temperature.iter().all(|t| t.is_finite() && *t > 0.));
    }

    #[test]
    fn dayside_is_hotter_aloft() {
        let ds = tp_grid_3d(GridShape::default()).unwrap();
        let day = ds.sel_nearest(Dim::Lon, 20.);
        let night = ds.sel_nearest(Dim::Lon, -160.);
        let equator = ds.sel_nearest(Dim::Lat, 0.);
        let top = ds.select_pressure("temperature", 0).unwrap();
        assert!(top[[day, equator]] > top[[night, equator]] + 500.);

        // Contrast is mostly gone at depth
        let bottom = ds.select_pressure("temperature", 52).unwrap();
        assert!((bottom[[day, equator]] - bottom[[night, equator]]).abs() < 5.);
    }

    #[test]
    fn rejects_bad_pressure_span() {
        let shape = GridShape {
            p_top: 1.,
            p_bottom: 0.1,
            ..GridShape::default()
        };
        assert!(tp_grid_3d(shape).is_err());
    }

    #[test]
    fn random_chemistry_sums_to_one() {
        let grid = tp_grid_3d(GridShape {
            num_lon: 16,
            num_lat: 8,
            num_pressure: 10,
            ..GridShape::default()
        })
        .unwrap();
        let chem = random_h2o_h2(&grid, 7).unwrap();
        assert_eq!(chem.abundance_species(), ["H2", "H2O"]);
        for &total in chem.vmr_total().iter() {
            assert_relative_eq!(total, 1., epsilon = 1e-12);
        }
        assert!(chem["H2O"].data().iter().all(|&x| (0.0..1.0).contains(&x)));
        assert_eq!(chem, random_h2o_h2(&grid, 7).unwrap());
        assert_ne!(chem, random_h2o_h2(&grid, 8).unwrap());
    }
}
