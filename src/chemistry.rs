//! Chemical equilibrium over a 3D atmosphere.
//!
//! The per-cell solver lives in [`equilibrium`]; this module runs it over every
//! (`lon`, `lat`, `pressure`) cell, optionally on a pool of worker threads.

mod equilibrium;


pub use equilibrium::{Elements, SOLAR_C_TO_O, SPECIES};

use std::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::{Duration, Instant},
};

use equilibrium::{solve_cell, CellAbundances};
use log::{debug, info};
use ndarray::{Array3, ArrayView1, ArrayView3};
use rayon::prelude::*;

use crate::error::CaseError;

/// How often the calling thread checks for completion or cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Hooks for the thread waiting on a 3D solve.
///
/// While the workers run, the calling thread repeatedly asks whether to cancel
/// and then waits a short while. Bindings to other runtimes use this to check
/// for interrupts, or to release locks while waiting.
pub trait Monitor {
    /// Return `true` to stop the computation early.
    fn cancelled(&mut self) -> bool {
        false
    }

    /// Block for `interval`.
    fn wait(&mut self, interval: Duration) {
        std::thread::sleep(interval);
    }
}

/// A [`Monitor`] that never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct Blocking;

impl Monitor for Blocking {}

/// Equilibrium abundance fields, one per species.
#[derive(Debug, Clone, PartialEq)]
pub struct EquilibriumFields {
    fields: Vec<(&'static str, Array3<f64>)>,
}

impl EquilibriumFields {
    /// Iterate over (species, volume mixing ratio) pairs, in the order of
    /// [`SPECIES`].
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Array3<f64>)> + '_ {
        self.fields.iter().map(|(name, field)| (*name, field))
    }

    /// Field for one species.
    pub fn get(&self, species: &str) -> Option<&Array3<f64>> {
        self.fields
            .iter()
            .find(|(name, _)| *name == species)
            .map(|(_, field)| field)
    }
}

impl IntoIterator for EquilibriumFields {
    type Item = (&'static str, Array3<f64>);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// Solve chemical equilibrium at every cell of a 3D atmosphere.
///
/// `temperature` is in K with shape (`num_lon`, `num_lat`, `num_pressure`),
/// and `pressure` is in bar with shape (`num_pressure`, ).
///
/// `num_workers` of 1 runs on the calling thread. Larger values run on a
/// thread pool with that many threads. Progress is logged every
/// `progress_interval`, and `monitor` may cancel the computation early.
pub fn solve_3d<M: Monitor + ?Sized>(
    temperature: ArrayView3<'_, f64>,
    pressure: ArrayView1<'_, f64>,
    elements: &Elements,
    num_workers: usize,
    progress_interval: Duration,
    monitor: &mut M,
) -> Result<EquilibriumFields, CaseError> {
    let (num_lon, num_lat, num_pressure) = temperature.dim();
    if pressure.len() != num_pressure {
        return Err(CaseError::InconsistentInputs);
    }
    if num_workers == 0 {
        return Err(CaseError::InvalidWorkers);
    }
    debug!("input shapes are consistent");

    // Every cell in one longitude row, ordered (lat, pressure)
    let solve_row = |lon: usize| -> Result<Vec<CellAbundances>, CaseError> {
        let mut row = Vec::with_capacity(num_lat * num_pressure);
        for lat in 0..num_lat {
            for (level, &p) in pressure.iter().enumerate() {
                row.push(solve_cell(elements, temperature[[lon, lat, level]], p)?);
            }
        }
        Ok(row)
    };

    let num_cells = num_lon * num_lat * num_pressure;
    info!("Solving chemical equilibrium for {num_cells} cells with {num_workers} worker(s)");

    let report = |num_completed: usize| {
        let progress = num_completed as f32 / num_lon as f32 * 100.;
        info!("Completed chemistry for {num_completed}/{num_lon} longitudes ({progress:0.2}%)");
    };

    let mut results = Vec::with_capacity(num_lon);
    if num_workers == 1 {
        let mut last_report = Instant::now();
        for lon in 0..num_lon {
            if monitor.cancelled() {
                return Err(CaseError::Cancelled);
            }
            results.push(solve_row(lon));
            if last_report.elapsed() >= progress_interval {
                report(lon + 1);
                last_report = Instant::now();
            }
        }
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_workers)
            .build()
            .map_err(|e| CaseError::ThreadPool(e.to_string()))?;

        // These atomics keep track of how many rows have finished and whether
        // it's time to cancel the computation or not
        let num_completed = AtomicUsize::new(0);
        let cancelled = AtomicBool::new(false);

        pool.in_place_scope(|s| -> Result<(), CaseError> {
            s.spawn(|_| {
                (0..num_lon)
                    .into_par_iter()
                    .map(|lon| {
                        if cancelled.load(Ordering::Relaxed) {
                            return Err(CaseError::Cancelled);
                        }
                        solve_row(lon)
                    })
                    .inspect(|_| {
                        num_completed.fetch_add(1, Ordering::Relaxed);
                    })
                    .collect_into_vec(&mut results);
            });

            // The work is done in the thread pool, but back here in the
            // calling thread, handle progress reporting and checking for early
            // cancellation
            let mut last_report = Instant::now();
            loop {
                let num_completed = num_completed.load(Ordering::Relaxed);
                if num_completed == num_lon {
                    break;
                }

                if monitor.cancelled() {
                    cancelled.store(true, Ordering::Relaxed);
                    return Err(CaseError::Cancelled);
                }
                if last_report.elapsed() >= progress_interval {
                    report(num_completed);
                    last_report = Instant::now();
                }

                monitor.wait(POLL_INTERVAL);
            }

            Ok(())
        })?;
    }
    report(num_lon);

    // Copy the per-row results into one field per species
    debug!("copying chemistry output");
    let mut fields: Vec<Array3<f64>> = SPECIES
        .iter()
        .map(|_| Array3::zeros([num_lon, num_lat, num_pressure]))
        .collect();
    results
        .into_iter()
        .enumerate()
        .try_for_each(|(lon, row)| -> Result<_, CaseError> {
            for (cell, abundances) in row?.iter().enumerate() {
                let (lat, level) = (cell / num_pressure, cell % num_pressure);
                for (field, &x) in fields.iter_mut().zip(abundances) {
                    field[[lon, lat, level]] = x;
                }
            }
            Ok(())
        })?;

    Ok(EquilibriumFields {
        fields: SPECIES.iter().copied().zip(fields).collect(),
    })
}
