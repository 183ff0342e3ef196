//! Unit annotations for coordinates and data variables.
//!
//! Datasets carry their units as plain strings. A case converts everything
//! into the canonical units (bar, K, degrees, v/v) when a 3D atmosphere is
//! attached.

use crate::error::CaseError;

/// Canonical pressure unit.
pub const BAR: &str = "bar";
/// Canonical temperature unit.
pub const KELVIN: &str = "K";
/// Canonical angle unit.
pub const DEGREES: &str = "degrees";
/// Canonical abundance unit (volume mixing ratio).
pub const VMR: &str = "v/v";

/// Get the multiplicative factor that converts pressure in `unit` to bar.
pub fn pressure_to_bar(unit: &str) -> Result<f64, CaseError> {
    let factor = match unit.trim() {
        "bar" | "bars" => 1.,
        "mbar" | "millibar" | "hPa" => 1e-3,
        "kPa" => 1e-2,
        "Pa" => 1e-5,
        "atm" => 1.01325,
        "dyn/cm^2" | "dyn/cm2" | "dyne/cm^2" | "barye" | "Ba" => 1e-6,
        other => return Err(CaseError::UnknownUnit(other.to_owned())),
    };
    Ok(factor)
}

/// Convert a temperature `value` in `unit` to K.
pub fn temperature_to_kelvin(value: f64, unit: &str) -> Result<f64, CaseError> {
    match unit.trim() {
        "K" | "kelvin" => Ok(value),
        "C" | "degC" | "celsius" => Ok(value + 273.15),
        other => Err(CaseError::UnknownUnit(other.to_owned())),
    }
}

/// Check that `unit` describes an angle in degrees.
pub fn check_degrees(unit: &str) -> Result<(), CaseError> {
    match unit.trim() {
        "degree" | "degrees" | "deg" | "degrees_east" | "degrees_north" => Ok(()),
        other => Err(CaseError::UnknownUnit(other.to_owned())),
    }
}

/// Whether `unit` marks a data variable as a volume mixing ratio.
pub fn is_mixing_ratio(unit: &str) -> bool {
    matches!(unit.trim(), "v/v" | "vmr" | "mol/mol")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pressure_factors() {
        assert_eq!(pressure_to_bar("bar").unwrap(), 1.);
        assert_relative_eq!(pressure_to_bar("Pa").unwrap() * 1e5, 1.);
        assert_relative_eq!(pressure_to_bar("hPa").unwrap() * 1e3, 1.);
        assert_relative_eq!(pressure_to_bar("dyn/cm^2").unwrap() * 1e6, 1.);
        assert!(matches!(
            pressure_to_bar("psi"),
            Err(CaseError::UnknownUnit(u)) if u == "psi"
        ));
    }

    #[test]
    fn temperatures() {
        assert_eq!(temperature_to_kelvin(1500., "K").unwrap(), 1500.);
        assert_relative_eq!(temperature_to_kelvin(0., "degC").unwrap(), 273.15);
        assert!(temperature_to_kelvin(10., "F").is_err());
    }

    #[test]
    fn angles_and_abundances() {
        assert!(check_degrees("degrees").is_ok());
        assert!(check_degrees("rad").is_err());
        assert!(is_mixing_ratio("v/v"));
        assert!(!is_mixing_ratio("K"));
    }
}
