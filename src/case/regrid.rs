//! Regridding a 3D atmosphere onto a case's facets.
//!
//! Horizontal interpolation is bilinear in (`lon`, `lat`), treating longitude
//! as periodic. Vertical interpolation is linear in log10 pressure. Values
//! outside the source range are clamped to the nearest edge.

use ndarray::{Array1, Array3};

use crate::dataset::{Coordinate, DataVariable, Dim, GriddedDataset};
use crate::error::CaseError;
use crate::units;

/// Interpolation stencil along one dimension: the two neighboring indices and
/// the weight of the second.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bracket {
    lower: usize,
    upper: usize,
    frac: f64,
}

impl Bracket {
    fn exact(index: usize) -> Self {
        Self {
            lower: index,
            upper: index,
            frac: 0.,
        }
    }

    fn mix(&self, lower: f64, upper: f64) -> f64 {
        if self.frac == 0. {
            lower
        } else {
            lower + self.frac * (upper - lower)
        }
    }
}

/// Find the stencil for `x` in a strictly monotonic `coords`, clamped at the
/// ends.
fn bracket(coords: &[f64], x: f64) -> Bracket {
    let n = coords.len();
    if n == 1 {
        return Bracket::exact(0);
    }
    let sign = if coords[1] > coords[0] { 1. } else { -1. };
    let key = |v: f64| sign * v;

    let x = key(x);
    if x <= key(coords[0]) {
        return Bracket::exact(0);
    }
    if x >= key(coords[n - 1]) {
        return Bracket::exact(n - 1);
    }
    // Number of coordinates <= x, which is at least 1 here
    let lower = coords.partition_point(|&v| key(v) <= x) - 1;
    let (c0, c1) = (key(coords[lower]), key(coords[lower + 1]));
    Bracket {
        lower,
        upper: lower + 1,
        frac: (x - c0) / (c1 - c0),
    }
}

/// Find the stencil for longitude `x` in degrees, wrapping around 360°.
fn periodic_bracket(lon: &[f64], x: f64) -> Bracket {
    let n = lon.len();
    if n == 1 {
        return Bracket::exact(0);
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| lon[a].total_cmp(&lon[b]));
    let sorted: Vec<f64> = order.iter().map(|&i| lon[i]).collect();
    let (first, last) = (sorted[0], sorted[n - 1]);

    let x = first + (x - first).rem_euclid(360.);
    let found = if x <= last {
        bracket(&sorted, x)
    } else {
        // Between the last longitude and the first one, wrapped around
        Bracket {
            lower: n - 1,
            upper: 0,
            frac: (x - last) / (first + 360. - last),
        }
    };
    Bracket {
        lower: order[found.lower],
        upper: order[found.upper],
        frac: found.frac,
    }
}

/// Regrid every variable of `dataset` onto the given longitudes and latitudes
/// (degrees) and pressures (bar).
///
/// The dataset coordinates must already be in canonical units.
pub(crate) fn regrid(
    dataset: &GriddedDataset,
    lon: &Array1<f64>,
    lat: &Array1<f64>,
    pressure: &Array1<f64>,
) -> Result<GriddedDataset, CaseError> {
    let src_lon = dataset.coord(Dim::Lon).values().to_vec();
    let src_lat = dataset.coord(Dim::Lat).values().to_vec();
    let src_log_p: Vec<f64> = dataset
        .coord(Dim::Pressure)
        .values()
        .iter()
        .map(|p| p.log10())
        .collect();

    let lon_brackets: Vec<_> = lon.iter().map(|&x| periodic_bracket(&src_lon, x)).collect();
    let lat_brackets: Vec<_> = lat.iter().map(|&y| bracket(&src_lat, y)).collect();
    let p_brackets: Vec<_> = pressure
        .iter()
        .map(|&p| bracket(&src_log_p, p.log10()))
        .collect();

    let shape = [lon.len(), lat.len(), pressure.len()];
    let mut output = GriddedDataset::new(
        Coordinate::new(lon.clone(), units::DEGREES),
        Coordinate::new(lat.clone(), units::DEGREES),
        Coordinate::new(pressure.clone(), units::BAR),
    )?;

    for (name, variable) in dataset.iter() {
        let src = variable.data();
        let data = Array3::from_shape_fn(shape, |(i, j, k)| {
            let (bx, by, bp) = (lon_brackets[i], lat_brackets[j], p_brackets[k]);
            let column = |level: usize| {
                let south = bx.mix(
                    src[[bx.lower, by.lower, level]],
                    src[[bx.upper, by.lower, level]],
                );
                let north = bx.mix(
                    src[[bx.lower, by.upper, level]],
                    src[[bx.upper, by.upper, level]],
                );
                by.mix(south, north)
            };
            bp.mix(column(bp.lower), column(bp.upper))
        });

        let mut regridded = DataVariable::new(data, variable.units());
        if let Some(long_name) = variable.long_name() {
            regridded = regridded.with_long_name(long_name);
        }
        output.insert(name, regridded)?;
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn source(f: impl Fn(f64, f64, f64) -> f64) -> GriddedDataset {
        let lon = Array1::from_shape_fn(36, |i| -180. + 10. * i as f64);
        let lat = Array1::from_shape_fn(18, |j| -85. + 10. * j as f64);
        let pressure = Array1::from_shape_fn(9, |k| 10f64.powf(-6. + k as f64));
        let data = Array3::from_shape_fn([36, 18, 9], |(i, j, k)| f(lon[i], lat[j], pressure[k]));
        GriddedDataset::new(
            Coordinate::new(lon, units::DEGREES),
            Coordinate::new(lat, units::DEGREES),
            Coordinate::new(pressure, units::BAR),
        )
        .unwrap()
        .with_variable("temperature", DataVariable::new(data, units::KELVIN))
        .unwrap()
    }

    #[test]
    fn brackets() {
        let c = [0., 1., 2., 4.];
        assert_eq!(bracket(&c, -1.), Bracket::exact(0));
        assert_eq!(bracket(&c, 5.), Bracket::exact(3));
        let b = bracket(&c, 3.);
        assert_eq!((b.lower, b.upper), (2, 3));
        assert_relative_eq!(b.frac, 0.5);

        let descending = [4., 2., 1., 0.];
        let b = bracket(&descending, 3.);
        assert_eq!((b.lower, b.upper), (0, 1));
        assert_relative_eq!(b.frac, 0.5);
    }

    #[test]
    fn periodic_wrap() {
        let lon = [0., 90., 180., 270.];
        let b = periodic_bracket(&lon, 315.);
        assert_eq!((b.lower, b.upper), (3, 0));
        assert_relative_eq!(b.frac, 0.5);

        let b = periodic_bracket(&lon, -45.);
        assert_eq!((b.lower, b.upper), (3, 0));
        assert_relative_eq!(b.frac, 0.5);

        let b = periodic_bracket(&lon, 405.);
        assert_eq!((b.lower, b.upper), (0, 1));
        assert_relative_eq!(b.frac, 0.5);
    }

    #[test]
    fn constant_field_is_preserved() {
        let ds = source(|_, _, _| 1234.);
        let out = regrid(
            &ds,
            &array![-60., 0., 60.],
            &array![-30., 30.],
            &array![1e-5, 1e-2, 5.],
        )
        .unwrap();
        assert_eq!(out.shape(), [3, 2, 3]);
        assert!(out["temperature"].data().iter().all(|&t| (t - 1234.).abs() < 1e-9));
    }

    #[test]
    fn linear_fields_are_exact() {
        // Linear in lon, lat, and log10(p)
        let ds = source(|lon, lat, p| 1000. + 2. * lon + 3. * lat + 50. * p.log10());
        let lon = array![-123., 7.5, 44.];
        let lat = array![-12.5, 33.];
        let pressure = array![3e-5, 0.2, 7.];
        let out = regrid(&ds, &lon, &lat, &pressure).unwrap();
        let t = out["temperature"].data();
        for (i, &x) in lon.iter().enumerate() {
            for (j, &y) in lat.iter().enumerate() {
                for (k, &p) in pressure.iter().enumerate() {
                    let expected = 1000. + 2. * x + 3. * y + 50. * p.log10();
                    assert_relative_eq!(t[[i, j, k]], expected, epsilon = 1e-9);
                }
            }
        }
        assert_eq!(out.coord(Dim::Lon).values(), &lon);
        assert_eq!(out.coord(Dim::Pressure).units(), "bar");
    }

    #[test]
    fn clamps_outside_source_range() {
        let ds = source(|_, lat, p| lat + p.log10());
        let out = regrid(&ds, &array![0.], &array![89.], &array![1e-9, 1e4]).unwrap();
        let t = out["temperature"].data();
        assert_relative_eq!(t[[0, 0, 0]], 85. - 6., epsilon = 1e-9);
        assert_relative_eq!(t[[0, 0, 1]], 85. + 2., epsilon = 1e-9);
    }

    #[test]
    fn keeps_units_and_names() {
        let mut ds = source(|_, _, _| 1000.);
        let h2o = Array3::from_elem(ds.shape(), 0.4);
        ds.insert("H2O", DataVariable::new(h2o, units::VMR).with_long_name("water"))
            .unwrap();
        let out = regrid(&ds, &array![0.], &array![0.], &array![1.]).unwrap();
        assert_eq!(out["H2O"].units(), "v/v");
        assert_eq!(out["H2O"].long_name(), Some("water"));
        assert_relative_eq!(out["H2O"].data()[[0, 0, 0]], 0.4, epsilon = 1e-12);
    }
}
