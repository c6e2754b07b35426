use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::parameters::ScaleFactors;
use crate::Result;

/// Settings for a joint calibration run
///
/// Every field has a default, so a configuration file only needs to name what it changes:
///
/// ```toml
/// [bounds]
/// gas_conductivity = [1.0, 100.0]
///
/// [search]
/// max_iterations = 250
/// seed = 7
///
/// [search.tolerance]
/// relative = 0.01
/// absolute = 0.0
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub bounds: Bounds,
    pub scales: ScaleFactors,
    pub search: SearchConfig,
}

impl CalibrationConfig {
    /// Read and validate a configuration from a TOML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid TOML, or holds invalid settings.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        for (name, value) in [
            ("gas_conductivity", self.scales.gas_conductivity),
            ("activation_energy", self.scales.activation_energy),
            ("rate_prefactor", self.scales.rate_prefactor),
        ] {
            if !value.is_finite() || value == 0.0 {
                return Err(ConfigError::InvalidScale { name, value });
            }
        }
        self.search.validate()
    }
}

/// A closed search interval `[lower, upper]` with finite `lower < upper`
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "(f64, f64)", into = "(f64, f64)")]
pub struct Interval {
    lower: f64,
    upper: f64,
}

impl Interval {
    /// # Errors
    /// Returns [`ConfigError::InvalidInterval`] unless both ends are finite and `lower < upper`.
    pub fn new(lower: f64, upper: f64) -> std::result::Result<Self, ConfigError> {
        if lower.is_finite() && upper.is_finite() && lower < upper {
            Ok(Self { lower, upper })
        } else {
            Err(ConfigError::InvalidInterval { lower, upper })
        }
    }

    pub const fn lower(&self) -> f64 {
        self.lower
    }

    pub const fn upper(&self) -> f64 {
        self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn midpoint(&self) -> f64 {
        self.lower + self.width() / 2.0
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.lower, self.upper)
    }
}

impl TryFrom<(f64, f64)> for Interval {
    type Error = ConfigError;

    fn try_from((lower, upper): (f64, f64)) -> std::result::Result<Self, Self::Error> {
        Self::new(lower, upper)
    }
}

impl From<Interval> for (f64, f64) {
    fn from(interval: Interval) -> Self {
        (interval.lower, interval.upper)
    }
}

/// Search box over the optimiser values (not the physical values) of each parameter
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Bounds {
    pub gas_conductivity: Interval,
    pub activation_energy: Interval,
    pub rate_prefactor: Interval,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            gas_conductivity: Interval {
                lower: 1.0,
                upper: 100.0,
            },
            activation_energy: Interval {
                lower: 1.0,
                upper: 1000.0,
            },
            rate_prefactor: Interval {
                lower: 1.0,
                upper: 1000.0,
            },
        }
    }
}

impl Bounds {
    /// Intervals in optimiser order
    pub const fn intervals(&self) -> [Interval; 3] {
        [
            self.gas_conductivity,
            self.activation_energy,
            self.rate_prefactor,
        ]
    }

    pub fn midpoint(&self) -> [f64; 3] {
        self.intervals().map(|interval| interval.midpoint())
    }
}

/// Early stopping criterion on the spread of population costs
///
/// The search stops once `std(costs) <= absolute + relative * |mean(costs)|`.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct Tolerance {
    pub relative: f64,
    pub absolute: f64,
}

/// Differential evolution settings
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Population members per search dimension. Larger populations explore more of the box at
    /// the cost of more evaluations per generation.
    pub population_size: usize,
    /// Range the mutation factor is redrawn from each generation. Larger factors take bigger
    /// steps and explore more; equal ends disable dithering.
    pub mutation: (f64, f64),
    /// Probability of taking each component from the mutant. High values converge faster, low
    /// values keep the population diverse.
    pub recombination: f64,
    /// Hard cap on the number of generations
    pub max_iterations: u64,
    /// Stop early once the population has collapsed. `None` always runs every generation.
    pub tolerance: Option<Tolerance>,
    /// Refine the best candidate with Nelder-Mead once the global search finishes
    pub polish: bool,
    pub polish_max_iterations: u64,
    /// Seed for the random number generator; `None` draws a fresh seed
    pub seed: Option<u64>,
    /// Log one line per generation and attach a progress observer to the polish
    pub display_progress: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            mutation: (0.5, 1.0),
            recombination: 0.9,
            max_iterations: 100,
            tolerance: None,
            polish: true,
            polish_max_iterations: 500,
            seed: None,
            display_progress: true,
        }
    }
}

impl SearchConfig {
    /// # Errors
    /// Returns the first out of range hyper-parameter.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        let (lower, upper) = self.mutation;
        if !(0.0..2.0).contains(&lower) || !(lower..2.0).contains(&upper) {
            return Err(ConfigError::InvalidMutation { lower, upper });
        }
        if !(0.0..=1.0).contains(&self.recombination) {
            return Err(ConfigError::InvalidRecombination(self.recombination));
        }
        if let Some(Tolerance { relative, absolute }) = self.tolerance {
            if !relative.is_finite() || !absolute.is_finite() {
                return Err(ConfigError::InvalidTolerance { relative, absolute });
            }
        }
        Ok(())
    }
}
