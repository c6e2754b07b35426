use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

/// Physical quantity a [`Scaled`] value stands for.
pub trait Kind {
    const NAME: &'static str;
    const UNIT: &'static str;
}

/// Asymptotic conductivity gain from gas diffusing into the cells, in W/(m·K)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GasConductivity {}

/// Arrhenius activation energy of the aging process, in J/mol
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivationEnergy {}

/// Kinetic pre-factor of the aging rate, in 1/s
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RatePrefactor {}

impl Kind for GasConductivity {
    const NAME: &'static str = "λgas";
    const UNIT: &'static str = "W/(m·K)";
}

impl Kind for ActivationEnergy {
    const NAME: &'static str = "E";
    const UNIT: &'static str = "J/mol";
}

impl Kind for RatePrefactor {
    const NAME: &'static str = "k₀";
    const UNIT: &'static str = "1/s";
}

/// A physical parameter expressed as an optimiser value times a fixed scale factor.
///
/// The optimiser searches over `raw`, which keeps all three parameters on comparable numeric
/// ranges. `value` is the physical quantity and is only ever computed in [`Scaled::new`], so it
/// cannot drift out of step with `raw`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scaled<K> {
    scale: f64,
    raw: f64,
    value: f64,
    kind: PhantomData<K>,
}

impl<K> Scaled<K> {
    #[must_use]
    pub fn new(scale: f64, raw: f64) -> Self {
        Self {
            scale,
            raw,
            value: scale * raw,
            kind: PhantomData,
        }
    }

    /// The same parameter at a different optimiser value
    #[must_use]
    pub fn with_raw(self, raw: f64) -> Self {
        Self::new(self.scale, raw)
    }

    pub const fn scale(&self) -> f64 {
        self.scale
    }

    pub const fn raw(&self) -> f64 {
        self.raw
    }

    /// The physical value, `scale * raw`
    pub const fn value(&self) -> f64 {
        self.value
    }
}

impl<K: Kind> fmt::Display for Scaled<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {} {}", K::NAME, self.value, K::UNIT)
    }
}

/// Fixed factors converting optimiser values into physical values.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScaleFactors {
    pub gas_conductivity: f64,
    pub activation_energy: f64,
    pub rate_prefactor: f64,
}

impl Default for ScaleFactors {
    fn default() -> Self {
        Self {
            gas_conductivity: 1e-4,
            activation_energy: 100.0,
            rate_prefactor: 1e-3,
        }
    }
}

/// The three model parameters; the unit the optimiser searches over.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParameterSet {
    pub gas_conductivity: Scaled<GasConductivity>,
    pub activation_energy: Scaled<ActivationEnergy>,
    pub rate_prefactor: Scaled<RatePrefactor>,
}

impl ParameterSet {
    /// Build a parameter set from optimiser values ordered as
    /// `[gas_conductivity, activation_energy, rate_prefactor]`.
    #[must_use]
    pub fn from_raw(raw: [f64; 3], scales: &ScaleFactors) -> Self {
        Self {
            gas_conductivity: Scaled::new(scales.gas_conductivity, raw[0]),
            activation_energy: Scaled::new(scales.activation_energy, raw[1]),
            rate_prefactor: Scaled::new(scales.rate_prefactor, raw[2]),
        }
    }

    /// Build a parameter set from physical values, deriving the optimiser values from `scales`.
    #[must_use]
    pub fn from_physical(
        gas_conductivity: f64,
        activation_energy: f64,
        rate_prefactor: f64,
        scales: &ScaleFactors,
    ) -> Self {
        Self::from_raw(
            [
                gas_conductivity / scales.gas_conductivity,
                activation_energy / scales.activation_energy,
                rate_prefactor / scales.rate_prefactor,
            ],
            scales,
        )
    }

    pub const fn raw(&self) -> [f64; 3] {
        [
            self.gas_conductivity.raw(),
            self.activation_energy.raw(),
            self.rate_prefactor.raw(),
        ]
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}",
            self.gas_conductivity, self.activation_energy, self.rate_prefactor
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{ParameterSet, ScaleFactors, Scaled};

    #[test]
    fn physical_value_is_scale_times_raw() {
        let parameter: Scaled<super::GasConductivity> = Scaled::new(1e-4, 42.0);
        approx::assert_relative_eq!(parameter.value(), 42.0 * 1e-4);

        let moved = parameter.with_raw(7.0);
        approx::assert_relative_eq!(moved.value(), 7.0 * 1e-4, max_relative = 1e-12);
        approx::assert_relative_eq!(moved.scale(), parameter.scale());
        // The receiver is untouched
        approx::assert_relative_eq!(parameter.raw(), 42.0);
    }

    #[test]
    fn raw_values_round_trip_through_a_parameter_set() {
        let scales = ScaleFactors::default();
        let raw = [12.5, 350.0, 97.5];
        let params = ParameterSet::from_raw(raw, &scales);

        assert_eq!(params.raw(), raw);
        approx::assert_relative_eq!(params.activation_energy.value(), 35_000.0);
        approx::assert_relative_eq!(params.rate_prefactor.value(), 0.0975, max_relative = 1e-12);
    }

    #[test]
    fn physical_construction_recovers_requested_values() {
        let scales = ScaleFactors::default();
        let params = ParameterSet::from_physical(0.005, 35_000.0, 0.0975, &scales);

        approx::assert_relative_eq!(params.gas_conductivity.value(), 0.005, max_relative = 1e-12);
        approx::assert_relative_eq!(params.gas_conductivity.raw(), 50.0, max_relative = 1e-12);
        approx::assert_relative_eq!(params.activation_energy.raw(), 350.0, max_relative = 1e-12);
        approx::assert_relative_eq!(params.rate_prefactor.raw(), 97.5, max_relative = 1e-12);
    }

    #[test]
    fn parameters_display_with_units() {
        let params = ParameterSet::from_raw([50.0, 350.0, 97.5], &ScaleFactors::default());
        let rendered = params.to_string();
        assert!(rendered.contains("J/mol"));
        assert!(rendered.contains("W/(m·K)"));
    }
}
