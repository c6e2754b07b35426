use itertools::Itertools;

use crate::error::ValidationError;
use crate::model::{converged_conductivity, predict, KELVIN_OFFSET};
use crate::parameters::ParameterSet;

/// A single conductivity observation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measurement {
    /// Seconds since the first measurement of the series
    pub elapsed_seconds: f64,
    /// Measured thermal conductivity in W/(m·K)
    pub conductivity: f64,
}

impl Measurement {
    #[must_use]
    pub const fn new(elapsed_seconds: f64, conductivity: f64) -> Self {
        Self {
            elapsed_seconds,
            conductivity,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ErrorRow {
    pub elapsed_seconds: f64,
    pub measured: f64,
    pub predicted: f64,
    /// `|measured - predicted|`
    pub absolute_error: f64,
    /// Trapezoidal error area between this row and the previous one. Always zero on the first row.
    pub segment_error_area: f64,
}

impl ErrorRow {
    fn unevaluated(measurement: &Measurement) -> Self {
        Self {
            elapsed_seconds: measurement.elapsed_seconds,
            measured: measurement.conductivity,
            predicted: 0.0,
            absolute_error: measurement.conductivity.abs(),
            segment_error_area: 0.0,
        }
    }
}

/// Measured and modelled conductivity over the course of one experiment
///
/// Rows are sorted by strictly increasing elapsed time and there are always at least two of
/// them. Measured values and times are fixed at construction; [`ErrorTable::evaluate`] rewrites
/// the predicted and derived columns in place.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorTable {
    /// Ambient exposure temperature in °C
    temperature: f64,
    rows: Vec<ErrorRow>,
}

impl ErrorTable {
    /// Build a table for a series aged at `temperature` (°C)
    ///
    /// # Errors
    /// Returns a [`ValidationError`] if the temperature is not finite or below absolute zero, if
    /// fewer than two measurements are given, if any time or conductivity is out of range, or if
    /// the elapsed times are not strictly increasing.
    pub fn new(temperature: f64, measurements: &[Measurement]) -> Result<Self, ValidationError> {
        if !temperature.is_finite() || temperature <= -KELVIN_OFFSET {
            return Err(ValidationError::InvalidTemperature(temperature));
        }
        if measurements.len() < 2 {
            return Err(ValidationError::TooFewMeasurements(measurements.len()));
        }
        for (index, measurement) in measurements.iter().enumerate() {
            if !measurement.elapsed_seconds.is_finite() || measurement.elapsed_seconds < 0.0 {
                return Err(ValidationError::InvalidElapsedTime {
                    index,
                    value: measurement.elapsed_seconds,
                });
            }
            if !measurement.conductivity.is_finite() || measurement.conductivity <= 0.0 {
                return Err(ValidationError::InvalidConductivity {
                    index,
                    value: measurement.conductivity,
                });
            }
        }
        if let Some(((_, previous), (index, current))) = measurements
            .iter()
            .enumerate()
            .tuple_windows()
            .find(|((_, previous), (_, current))| current.elapsed_seconds <= previous.elapsed_seconds)
        {
            return Err(ValidationError::NotIncreasing {
                index,
                previous: previous.elapsed_seconds,
                current: current.elapsed_seconds,
            });
        }

        Ok(Self {
            temperature,
            rows: measurements.iter().map(ErrorRow::unevaluated).collect(),
        })
    }

    /// Recompute predictions, absolute errors and trapezoidal areas for `params`
    ///
    /// The first measured conductivity is the baseline the model starts from.
    pub fn evaluate(&mut self, params: &ParameterSet) {
        let baseline = self.baseline();
        for row in &mut self.rows {
            row.predicted = predict(params, self.temperature, row.elapsed_seconds, baseline);
            row.absolute_error = (row.measured - row.predicted).abs();
        }
        integrate(&mut self.rows);
    }

    /// Sum of the segment areas: the time integral of absolute error, in W/(m·K)·s
    pub fn total_error_area(&self) -> f64 {
        self.rows.iter().map(|row| row.segment_error_area).sum()
    }

    pub fn rows(&self) -> &[ErrorRow] {
        &self.rows
    }

    pub const fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Conductivity of the unaged sample, the first measurement of the series
    pub fn baseline(&self) -> f64 {
        self.rows.first().map_or(0.0, |row| row.measured)
    }

    /// Elapsed seconds at the last measurement
    pub fn duration(&self) -> f64 {
        self.rows.last().map_or(0.0, |row| row.elapsed_seconds)
    }

    /// Long term conductivity of this series under `params`
    pub fn converged_conductivity(&self, params: &ParameterSet) -> f64 {
        converged_conductivity(params, self.baseline())
    }
}

/// Fill in the trapezoidal error area of every row after the first
fn integrate(rows: &mut [ErrorRow]) {
    if let Some(first) = rows.first_mut() {
        first.segment_error_area = 0.0;
    }
    for ii in 1..rows.len() {
        let (previous, current) = (&rows[ii - 1], &rows[ii]);
        let area = (previous.absolute_error.abs() + current.absolute_error.abs()) / 2.0
            * (current.elapsed_seconds - previous.elapsed_seconds);
        rows[ii].segment_error_area = area;
    }
}
