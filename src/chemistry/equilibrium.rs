//! Closed-form gas-phase chemical equilibrium for a single grid cell.
//!
//! Two net reactions set the carbon and nitrogen carriers:
//!
//! CH4 + H2O <-> CO + 3 H2
//!
//! 2 NH3 <-> N2 + 3 H2
//!
//! Working with abundances relative to H2 and taking H2 as the dominant gas,
//! each equilibrium constant reduces to a ratio of relative abundances scaled
//! by (P0/P)², and together with element conservation each pair has a closed
//! form solution. Oxygen not in CO stays in H2O, and helium is inert.

use smallvec::SmallVec;

use crate::error::CaseError;

/// Species computed by the solver, in output order.
pub const SPECIES: [&str; 7] = ["H2", "He", "H2O", "CH4", "CO", "NH3", "N2"];

/// Volume mixing ratios for a single cell, in the order of [`SPECIES`].
pub(crate) type CellAbundances = SmallVec<[f64; 8]>;

/// Solar number abundances relative to H (Asplund et al. 2009).
mod solar {
    pub(super) const HE: f64 = 0.0851;
    pub(super) const C: f64 = 2.69e-4;
    pub(super) const N: f64 = 6.76e-5;
    pub(super) const O: f64 = 4.90e-4;
}

/// Solar carbon to oxygen ratio.
pub const SOLAR_C_TO_O: f64 = solar::C / solar::O;

/// Ideal gas constant (J/mol/K)
const R: f64 = 8.314_462_618;

/// Standard enthalpy (J/mol) and entropy (J/mol/K) of CH4 + H2O -> CO + 3 H2
const CO_REACTION: (f64, f64) = (206.1e3, 214.6);
/// Standard enthalpy (J/mol) and entropy (J/mol/K) of 2 NH3 -> N2 + 3 H2
const N2_REACTION: (f64, f64) = (91.8e3, 198.1);

/// Bounds on ln(K) so the constants stay finite.
const LN_K_LIMIT: f64 = 700.;

/// Bulk elemental composition, as number abundances relative to H2.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Elements {
    he: f64,
    c: f64,
    n: f64,
    o: f64,
}

impl Elements {
    /// Elemental abundances for a metallicity `log_mh` (log10, relative to
    /// solar) and an absolute carbon to oxygen ratio `c_to_o`.
    ///
    /// Metallicity scales C, N, and O but not He.
    pub fn new(log_mh: f64, c_to_o: f64) -> Result<Self, CaseError> {
        if !log_mh.is_finite() || !(c_to_o.is_finite() && c_to_o > 0.) {
            return Err(CaseError::InconsistentInputs);
        }
        // Two H atoms per H2
        let scale = 2. * 10f64.powf(log_mh);
        let o = solar::O * scale;
        Ok(Self {
            he: 2. * solar::HE,
            c: o * c_to_o,
            n: solar::N * scale,
            o,
        })
    }

    /// Solar composition.
    pub fn solar() -> Self {
        Self {
            he: 2. * solar::HE,
            c: 2. * solar::C,
            n: 2. * solar::N,
            o: 2. * solar::O,
        }
    }
}

/// Equilibrium constant in terms of relative abundances, for a reaction with
/// enthalpy `dh`, entropy `ds`, and a net gain of two moles of gas.
fn relative_constant((dh, ds): (f64, f64), temperature: f64, pressure: f64) -> f64 {
    let delta_g = dh - temperature * ds;
    let ln_k = -delta_g / (R * temperature) - 2. * pressure.ln();
    ln_k.clamp(-LN_K_LIMIT, LN_K_LIMIT).exp()
}

/// Solve for the equilibrium volume mixing ratios at one grid cell.
///
/// `temperature` is in K and `pressure` is in bar. The output follows the
/// order of [`SPECIES`] and sums to 1.
pub(crate) fn solve_cell(
    elements: &Elements,
    temperature: f64,
    pressure: f64,
) -> Result<CellAbundances, CaseError> {
    if !(temperature.is_finite() && temperature > 0. && pressure.is_finite() && pressure > 0.) {
        return Err(CaseError::InvalidState {
            temperature,
            pressure,
        });
    }
    let Elements { he, c, n, o } = *elements;

    // x_CO = K x_CH4 x_H2O with x_CH4 + x_CO = C and x_H2O + x_CO = O. Divide
    // the quadratic through by K so that huge K (hot, low pressure) stays
    // finite.
    let k_co = relative_constant(CO_REACTION, temperature, pressure);
    let co = if k_co > 0. {
        let s = c + o + k_co.recip();
        let disc = (s * s - 4. * c * o).max(0.);
        2. * c * o / (s + disc.sqrt())
    } else {
        0.
    };
    let ch4 = (c - co).max(0.);
    let h2o = (o - co).max(0.);

    // x_N2 = K x_NH3² with x_NH3 + 2 x_N2 = N
    let k_n2 = relative_constant(N2_REACTION, temperature, pressure);
    let nh3 = 2. * n / (1. + (1. + 8. * k_n2 * n).sqrt());
    let n2 = 0.5 * (n - nh3).max(0.);

    let relative: CellAbundances = SmallVec::from_slice(&[1., he, h2o, ch4, co, nh3, n2]);
    let total: f64 = relative.iter().sum();
    Ok(relative.into_iter().map(|x| x / total).collect())
}
