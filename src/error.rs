//! Errors for building and running a case.

/// Possible errors when building or running a case.
#[derive(Debug)]
pub enum CaseError {
    /// The inputs don't have the expected shape(s)
    InconsistentInputs,
    /// Two datasets disagree on the values of a shared coordinate
    CoordinateMismatch {
        /// Name of the offending coordinate
        name: String,
    },
    /// A coordinate name wasn't recognized
    MissingCoordinate(String),
    /// A data variable wasn't found in the dataset
    MissingVariable(String),
    /// A coordinate is empty or not strictly monotonic
    NonMonotonic(String),
    /// A unit string couldn't be parsed, or doesn't fit the quantity
    UnknownUnit(String),
    /// A selection index is past the end of its dimension
    IndexOutOfRange {
        /// Name of the dimension
        dim: &'static str,
        /// Requested index
        index: usize,
        /// Length of the dimension
        len: usize,
    },
    /// The phase angle or discretization angle counts are invalid
    InvalidGeometry,
    /// Regridding was requested before the observing geometry was set
    GeometryNotSet,
    /// Chemistry was requested before a 3D atmosphere was attached
    AtmosphereNotSet,
    /// The number of workers must be at least 1
    InvalidWorkers,
    /// A grid cell has an unphysical temperature or pressure
    InvalidState {
        /// Temperature in K
        temperature: f64,
        /// Pressure in bar
        pressure: f64,
    },
    /// The worker thread pool couldn't be created
    ThreadPool(String),
    /// The operation was aborted early
    Cancelled,
}

impl std::fmt::Display for CaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaseError::InconsistentInputs => {
                write!(f, "inputs have the wrong shape")
            }
            CaseError::CoordinateMismatch { name } => {
                write!(f, "coordinate '{name}' differs between datasets")
            }
            CaseError::MissingCoordinate(name) => write!(f, "no coordinate named '{name}'"),
            CaseError::MissingVariable(name) => write!(f, "no data variable named '{name}'"),
            CaseError::NonMonotonic(name) => {
                write!(f, "coordinate '{name}' must be non-empty and strictly monotonic")
            }
            CaseError::UnknownUnit(unit) => write!(f, "unsupported unit '{unit}'"),
            CaseError::IndexOutOfRange { dim, index, len } => {
                write!(f, "index {index} is out of range for '{dim}' of length {len}")
            }
            CaseError::InvalidGeometry => write!(
                f,
                "phase angle must be in [0, pi) and angle counts must be at least 1"
            ),
            CaseError::GeometryNotSet => {
                write!(f, "set the phase angle before regridding a 3D atmosphere")
            }
            CaseError::AtmosphereNotSet => write!(f, "no 3D atmosphere has been attached"),
            CaseError::InvalidWorkers => write!(f, "number of workers must be at least 1"),
            CaseError::InvalidState {
                temperature,
                pressure,
            } => write!(
                f,
                "unphysical state: temperature {temperature} K, pressure {pressure} bar"
            ),
            CaseError::ThreadPool(msg) => write!(f, "couldn't build thread pool: {msg}"),
            CaseError::Cancelled => write!(f, "operation cancelled early"),
        }
    }
}

impl std::error::Error for CaseError {}
