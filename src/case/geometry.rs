//! Observing geometry for a disk-resolved run.
//!
//! The visible disk is discretized with a Gauss-Legendre quadrature along one
//! axis (`gangle`) and a Chebyshev quadrature along the other (`tangle`). Each
//! (gangle, tangle) pair is a facet with a planetary longitude and latitude.

use ndarray::{Array1, Array2};

use crate::error::CaseError;

/// Newton iteration tolerance for the Legendre roots
const ROOT_TOLERANCE: f64 = 1e-15;
/// Cap on Newton iterations per root
const MAX_ITERATIONS: usize = 100;

/// Facet angles and weights for a phase angle.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// Phase angle in radians
    phase: f64,
    /// Gauss-Legendre nodes on (-1, 1), ascending, with length `num_gangle`
    gangle: Array1<f64>,
    /// Gauss-Legendre weights
    gweight: Array1<f64>,
    /// Chebyshev nodes on (-1, 1), ascending, with length `num_tangle`
    tangle: Array1<f64>,
    /// Chebyshev weights
    tweight: Array1<f64>,
    /// Facet longitude in degrees, one per gangle
    lon: Array1<f64>,
    /// Facet latitude in degrees, one per tangle
    lat: Array1<f64>,
    /// Cosine of the incident angle, (`num_gangle`, `num_tangle`)
    ubar0: Array2<f64>,
    /// Cosine of the outgoing angle, (`num_gangle`, `num_tangle`)
    ubar1: Array2<f64>,
}

impl Geometry {
    /// Compute the facets for a `phase` angle in radians, which must be in
    /// [0, π), and at least one angle along each axis.
    pub fn new(phase: f64, num_gangle: usize, num_tangle: usize) -> Result<Self, CaseError> {
        if !(phase.is_finite() && (0. ..std::f64::consts::PI).contains(&phase))
            || num_gangle == 0
            || num_tangle == 0
        {
            return Err(CaseError::InvalidGeometry);
        }

        let (gangle, gweight) = gauss_legendre(num_gangle);
        let (tangle, tweight) = chebyshev(num_tangle);

        // Map the gauss nodes across the illuminated and visible part of the
        // disk, which narrows as the phase angle grows
        let cos_phase = phase.cos();
        let lon_radians = gangle.mapv(|g| {
            let x = 0.5 * (g * (cos_phase + 1.) + 1. - cos_phase);
            x.clamp(-1., 1.).asin()
        });
        let lat_radians = tangle.mapv(f64::asin);

        let ubar0 = Array2::from_shape_fn((num_gangle, num_tangle), |(i, j)| {
            (lon_radians[i] - phase).cos() * lat_radians[j].cos()
        });
        let ubar1 = Array2::from_shape_fn((num_gangle, num_tangle), |(i, j)| {
            lon_radians[i].cos() * lat_radians[j].cos()
        });

        Ok(Self {
            phase,
            gangle,
            gweight,
            tangle,
            tweight,
            lon: lon_radians.mapv(f64::to_degrees),
            lat: lat_radians.mapv(f64::to_degrees),
            ubar0,
            ubar1,
        })
    }

    /// Phase angle in radians.
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Number of Gauss angles.
    pub fn num_gangle(&self) -> usize {
        self.gangle.len()
    }

    /// Number of Chebyshev angles.
    pub fn num_tangle(&self) -> usize {
        self.tangle.len()
    }

    /// Gauss-Legendre nodes and weights.
    pub fn gangle(&self) -> (&Array1<f64>, &Array1<f64>) {
        (&self.gangle, &self.gweight)
    }

    /// Chebyshev nodes and weights.
    pub fn tangle(&self) -> (&Array1<f64>, &Array1<f64>) {
        (&self.tangle, &self.tweight)
    }

    /// Facet longitudes in degrees.
    pub fn lon(&self) -> &Array1<f64> {
        &self.lon
    }

    /// Facet latitudes in degrees.
    pub fn lat(&self) -> &Array1<f64> {
        &self.lat
    }

    /// Cosine of the incident angle per facet.
    pub fn ubar0(&self) -> &Array2<f64> {
        &self.ubar0
    }

    /// Cosine of the outgoing angle per facet.
    pub fn ubar1(&self) -> &Array2<f64> {
        &self.ubar1
    }
}

/// Gauss-Legendre nodes (ascending) and weights on [-1, 1].
fn gauss_legendre(n: usize) -> (Array1<f64>, Array1<f64>) {
    let mut nodes = Array1::zeros(n);
    let mut weights = Array1::zeros(n);
    let nf = n as f64;

    for i in 0..(n + 1) / 2 {
        // Initial guess for the i-th largest root
        let mut z = (std::f64::consts::PI * (i as f64 + 0.75) / (nf + 0.5)).cos();
        let mut derivative = 1.;
        for _ in 0..MAX_ITERATIONS {
            // Upward recurrence for P_n(z) and P_{n-1}(z)
            let (mut p1, mut p2) = (1., 0.);
            for j in 1..=n {
                let jf = j as f64;
                let p3 = p2;
                p2 = p1;
                p1 = ((2. * jf - 1.) * z * p2 - (jf - 1.) * p3) / jf;
            }
            derivative = nf * (z * p1 - p2) / (z * z - 1.);
            let previous = z;
            z = previous - p1 / derivative;
            if (z - previous).abs() < ROOT_TOLERANCE {
                break;
            }
        }
        let weight = 2. / ((1. - z * z) * derivative * derivative);
        nodes[i] = -z;
        nodes[n - 1 - i] = z;
        weights[i] = weight;
        weights[n - 1 - i] = weight;
    }
    (nodes, weights)
}

/// Chebyshev (second kind) nodes (ascending) and weights on [-1, 1].
///
/// The weights integrate f(x) √(1 - x²), so they sum to π/2.
fn chebyshev(n: usize) -> (Array1<f64>, Array1<f64>) {
    let step = std::f64::consts::PI / (n as f64 + 1.);
    let nodes = Array1::from_shape_fn(n, |i| -(step * (i as f64 + 1.)).cos());
    let weights = Array1::from_shape_fn(n, |i| step * (step * (i as f64 + 1.)).sin().powi(2));
    (nodes, weights)
}
