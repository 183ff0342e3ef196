use super::*;
use ndarray::Array3;

fn coords(num_lon: usize, num_lat: usize, num_pressure: usize) -> GriddedDataset {
    let lon: Vec<f64> = (0..num_lon).map(|i| -180. + 360. * i as f64 / num_lon as f64).collect();
    let lat: Vec<f64> = (0..num_lat)
        .map(|i| -90. + 180. * (i as f64 + 0.5) / num_lat as f64)
        .collect();
    let pressure: Vec<f64> = (0..num_pressure)
        .map(|i| 10f64.powf(-4. + i as f64 * 0.5))
        .collect();
    GriddedDataset::new(
        Coordinate::new(lon, "degrees"),
        Coordinate::new(lat, "degrees"),
        Coordinate::new(pressure, "bar"),
    )
    .unwrap()
}

fn filled(ds: &GriddedDataset, value: f64, units: &str) -> DataVariable {
    DataVariable::new(Array3::from_elem(ds.shape(), value), units)
}

#[test]
fn rejects_bad_coordinates() {
    let err = GriddedDataset::new(
        Coordinate::new(vec![0., 10., 5.], "degrees"),
        Coordinate::new(vec![0.], "degrees"),
        Coordinate::new(vec![1.], "bar"),
    )
    .unwrap_err();
    assert!(matches!(err, CaseError::NonMonotonic(name) if name == "lon"));

    let err = GriddedDataset::new(
        Coordinate::new(vec![0.], "degrees"),
        Coordinate::new(vec![0.], "degrees"),
        Coordinate::new(Vec::new(), "bar"),
    )
    .unwrap_err();
    assert!(matches!(err, CaseError::NonMonotonic(name) if name == "pressure"));

    // Descending is fine
    assert!(GriddedDataset::new(
        Coordinate::new(vec![0.], "degrees"),
        Coordinate::new(vec![0.], "degrees"),
        Coordinate::new(vec![100., 1., 0.01], "bar"),
    )
    .is_ok());
}

#[test]
fn insert_checks_shape() {
    let mut ds = coords(8, 4, 6);
    let bad = DataVariable::new(Array3::zeros([4, 8, 6]), "K");
    assert!(matches!(
        ds.insert("temperature", bad),
        Err(CaseError::InconsistentInputs)
    ));
    let good = filled(&ds, 1000., "K");
    assert!(ds.insert("temperature", good).unwrap().is_none());
    assert!(ds.contains("temperature"));
    assert_eq!(ds["temperature"].units(), "K");
}

#[test]
fn coordinate_lookup_by_name() {
    let ds = coords(8, 4, 6);
    assert_eq!(ds.coordinate("lon").unwrap().len(), 8);
    assert_eq!(ds.coordinate("latitude").unwrap().len(), 4);
    assert_eq!(ds.coordinate("pressure").unwrap().units(), "bar");
    assert!(matches!(
        ds.coordinate("time"),
        Err(CaseError::MissingCoordinate(_))
    ));
}

#[test]
fn update_preserves_coordinates_and_variables() {
    let mut ds = coords(16, 8, 10);
    ds.insert("temperature", filled(&ds, 1200., "K")).unwrap();
    let before = ds.clone();

    let chem = ds
        .empty_like()
        .with_variable("H2O", filled(&ds, 0.25, "v/v"))
        .unwrap()
        .with_variable("H2", filled(&ds, 0.75, "v/v"))
        .unwrap();
    ds.update(chem).unwrap();

    for dim in Dim::ALL {
        assert_eq!(ds.coord(dim), before.coord(dim));
    }
    let names: Vec<_> = ds.names().collect();
    assert_eq!(names, ["H2", "H2O", "temperature"]);
    assert_eq!(ds["temperature"], before["temperature"]);
}

#[test]
fn update_overwrites_shared_variables() {
    let mut ds = coords(4, 4, 4);
    ds.insert("H2O", filled(&ds, 0.1, "v/v")).unwrap();
    let other = ds
        .empty_like()
        .with_variable("H2O", filled(&ds, 0.2, "v/v"))
        .unwrap();
    ds.update(other).unwrap();
    assert_eq!(ds.len(), 1);
    assert!(ds["H2O"].data().iter().all(|&v| v == 0.2));
}

#[test]
fn update_rejects_mismatched_grid() {
    let mut ds = coords(16, 8, 10);
    let other = coords(16, 8, 11);
    assert!(matches!(
        ds.update(other),
        Err(CaseError::CoordinateMismatch { name }) if name == "pressure"
    ));

    let mut shifted = coords(16, 8, 10);
    let lon = shifted.coord(Dim::Lon).values() + 1.;
    shifted
        .set_coord(Dim::Lon, Coordinate::new(lon, "degrees"))
        .unwrap();
    assert!(matches!(
        ds.update(shifted),
        Err(CaseError::CoordinateMismatch { name }) if name == "lon"
    ));
}

#[test]
fn update_compares_pressure_after_conversion() {
    let mut ds = coords(4, 4, 3);
    let mut other = coords(4, 4, 3);
    let pa = other.coord(Dim::Pressure).values() * 1e5;
    other
        .set_coord(Dim::Pressure, Coordinate::new(pa, "Pa"))
        .unwrap();
    other.insert("CH4", filled(&other, 1e-4, "v/v")).unwrap();
    ds.update(other).unwrap();
    assert_eq!(ds.coord(Dim::Pressure).units(), "bar");
    assert!(ds.contains("CH4"));
}

#[test]
fn select_pressure_gives_lon_lat_slice() {
    let mut ds = coords(128, 64, 20);
    let mut temperature = Array3::zeros(ds.shape());
    for ((i, j, k), t) in temperature.indexed_iter_mut() {
        *t = (i * 10_000 + j * 100 + k) as f64;
    }
    ds.insert("temperature", DataVariable::new(temperature, "K"))
        .unwrap();

    let slice = ds.select_pressure("temperature", 10).unwrap();
    assert_eq!(slice.shape(), &[128, 64]);
    assert_eq!(slice[[3, 5]], 30_510.);

    assert!(matches!(
        ds.select_pressure("temperature", 20),
        Err(CaseError::IndexOutOfRange {
            dim: "pressure",
            index: 20,
            len: 20
        })
    ));
    assert!(matches!(
        ds.select_pressure("CH4", 0),
        Err(CaseError::MissingVariable(_))
    ));
}

#[test]
fn isel_other_dimensions() {
    let mut ds = coords(6, 5, 4);
    ds.insert("temperature", filled(&ds, 900., "K")).unwrap();
    assert_eq!(ds.isel("temperature", Dim::Lon, 2).unwrap().shape(), &[5, 4]);
    assert_eq!(ds.isel("temperature", Dim::Lat, 0).unwrap().shape(), &[6, 4]);
}

#[test]
fn nearest_selection() {
    let ds = coords(8, 4, 9);
    // pressure levels are 1e-4, 10^-3.5, ..., 1
    assert_eq!(ds.sel_nearest(Dim::Pressure, 1e-3), 2);
    assert_eq!(ds.sel_nearest(Dim::Lon, -179.), 0);
    assert_eq!(ds.sel_nearest(Dim::Pressure, 50.), 8);
}

#[test]
fn abundances_sum_to_at_most_one() {
    let mut ds = coords(8, 4, 6);
    ds.insert("temperature", filled(&ds, 800., "K")).unwrap();
    ds.insert("H2O", filled(&ds, 0.3, "v/v")).unwrap();
    ds.insert("H2", filled(&ds, 0.7, "v/v")).unwrap();

    assert!(ds.has_abundances());
    assert_eq!(ds.abundance_species(), ["H2", "H2O"]);
    let total = ds.vmr_total();
    assert!(total.iter().all(|&t| (t - 1.).abs() < 1e-12));
}

#[test]
#[should_panic(expected = "no data variable named 'CO'")]
fn index_panics_on_missing_variable() {
    let ds = coords(2, 2, 2);
    let _ = &ds["CO"];
}
