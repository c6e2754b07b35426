use thiserror::Error;

/// Reasons a measurement series cannot become an [`ErrorTable`](crate::table::ErrorTable).
///
/// These are raised before any search starts, so a calibration never discovers malformed input
/// half way through an optimisation run.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("ambient temperature must be a finite value above absolute zero, found {0} °C")]
    InvalidTemperature(f64),

    #[error("at least two measurements are needed to fit a series, found {0}")]
    TooFewMeasurements(usize),

    #[error("measurement {index} has elapsed time {value} s, expected a finite non-negative value")]
    InvalidElapsedTime { index: usize, value: f64 },

    #[error("measurement {index} has conductivity {value}, expected a finite positive value")]
    InvalidConductivity { index: usize, value: f64 },

    #[error(
        "elapsed times must be strictly increasing: measurement {index} at {current} s follows {previous} s"
    )]
    NotIncreasing {
        index: usize,
        previous: f64,
        current: f64,
    },
}

/// Invalid calibration settings.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("interval [{lower}, {upper}] must be finite with lower < upper")]
    InvalidInterval { lower: f64, upper: f64 },

    #[error("population size must be at least 1")]
    EmptyPopulation,

    #[error("mutation range [{lower}, {upper}] must satisfy 0 <= lower <= upper < 2")]
    InvalidMutation { lower: f64, upper: f64 },

    #[error("recombination rate {0} must lie in [0, 1]")]
    InvalidRecombination(f64),

    #[error("scale factor for {name} must be finite and non-zero, found {value}")]
    InvalidScale { name: &'static str, value: f64 },

    #[error("convergence tolerances must be finite, found relative={relative} absolute={absolute}")]
    InvalidTolerance { relative: f64, absolute: f64 },
}
