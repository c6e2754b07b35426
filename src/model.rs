//! Arrhenius-type first-order aging model.
//!
//! Conductivity rises from its initial value towards an asymptote as gas diffuses into the
//! insulation:
//! $$
//!     \lambda(t) = \lambda_0 + \lambda_{gas} \left(1 - e^{-k_0 t \exp(-E / R T)}\right)
//! $$
use crate::parameters::ParameterSet;

/// Molar gas constant in J/(mol·K)
pub const GAS_CONSTANT: f64 = 8.314_462_618;

/// Offset between the Celsius and Kelvin scales
pub const KELVIN_OFFSET: f64 = 273.15;

/// The Arrhenius rate constant `k0 * exp(-E / (R * T))` in 1/s at `ambient_temperature`
/// (°C).
#[must_use]
pub fn rate_constant(params: &ParameterSet, ambient_temperature: f64) -> f64 {
    let absolute_temperature = ambient_temperature + KELVIN_OFFSET;
    params.rate_prefactor.value()
        * (-params.activation_energy.value() / (GAS_CONSTANT * absolute_temperature)).exp()
}

/// Predicted conductivity after `elapsed_seconds` of exposure at `ambient_temperature` (°C),
/// starting from `baseline_conductivity`.
///
/// The saturation term is evaluated as `exp(-rate) - 1`. The algebraically equal
/// `(1 - exp(rate)) / exp(rate)` overflows once `rate` passes roughly 710.
///
/// Non-finite inputs produce non-finite outputs; the caller decides what to do with them.
#[must_use]
pub fn predict(
    params: &ParameterSet,
    ambient_temperature: f64,
    elapsed_seconds: f64,
    baseline_conductivity: f64,
) -> f64 {
    let rate = rate_constant(params, ambient_temperature) * elapsed_seconds;
    (-params.gas_conductivity.value()).mul_add((-rate).exp() - 1.0, baseline_conductivity)
}

/// The conductivity the model approaches as exposure time grows without bound.
#[must_use]
pub fn converged_conductivity(params: &ParameterSet, baseline_conductivity: f64) -> f64 {
    baseline_conductivity + params.gas_conductivity.value()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{converged_conductivity, predict, rate_constant, GAS_CONSTANT, KELVIN_OFFSET};
    use crate::parameters::{ParameterSet, ScaleFactors};

    fn naive_saturation(rate: f64) -> f64 {
        (1.0 - rate.exp()) / rate.exp()
    }

    fn stable_saturation(rate: f64) -> f64 {
        (-rate).exp() - 1.0
    }

    fn reference_parameters() -> ParameterSet {
        ParameterSet::from_physical(0.005, 35_000.0, 0.0975, &ScaleFactors::default())
    }

    #[test]
    fn stable_and_naive_saturation_terms_agree_for_moderate_rates() {
        for rate in [0.0, 1e-6, 0.1, 0.5, 1.0, 2.5, 7.0, 12.0, 19.9] {
            approx::assert_relative_eq!(
                stable_saturation(rate),
                naive_saturation(rate),
                epsilon = 1e-12,
                max_relative = 1e-9
            );
        }
    }

    #[test]
    fn stable_saturation_stays_finite_where_naive_form_overflows() {
        let rate = 1000.0;
        assert!(!naive_saturation(rate).is_finite());
        approx::assert_relative_eq!(stable_saturation(rate), -1.0);
    }

    #[test]
    fn prediction_at_time_zero_is_the_baseline() {
        let params = reference_parameters();
        approx::assert_relative_eq!(predict(&params, 23.0, 0.0, 0.021), 0.021);
    }

    #[test]
    fn prediction_matches_hand_computed_value() {
        let params = reference_parameters();
        let elapsed = 30.0 * 86_400.0;
        let temperature = 50.0;
        let rate = 0.0975 * elapsed * (-35_000.0 / (GAS_CONSTANT * (temperature + KELVIN_OFFSET))).exp();
        let expected = 0.021 + 0.005 * (1.0 - (-rate).exp());

        approx::assert_relative_eq!(
            predict(&params, temperature, elapsed, 0.021),
            expected,
            max_relative = 1e-12
        );
    }

    #[test]
    fn huge_rates_saturate_at_the_converged_value() {
        let params = ParameterSet::from_raw([50.0, 1.0, 1000.0], &ScaleFactors::default());
        let predicted = predict(&params, 23.0, 1e12, 0.021);
        assert!(predicted.is_finite());
        approx::assert_relative_eq!(predicted, converged_conductivity(&params, 0.021));
    }

    #[test]
    fn hotter_exposure_ages_faster() {
        let params = reference_parameters();
        assert!(rate_constant(&params, 50.0) > rate_constant(&params, 23.0));
    }

    proptest! {
        #[test]
        fn predictions_are_finite_and_non_decreasing_in_time(
            gas in 1.0f64..100.0,
            energy in 1.0f64..1000.0,
            prefactor in 1.0f64..1000.0,
            temperature in -20.0f64..120.0,
            baseline in 0.01f64..0.05,
            t0 in 0.0f64..1e8,
            dt in 0.0f64..1e8,
        ) {
            let params = ParameterSet::from_raw([gas, energy, prefactor], &ScaleFactors::default());
            let earlier = predict(&params, temperature, t0, baseline);
            let later = predict(&params, temperature, t0 + dt, baseline);

            prop_assert!(earlier.is_finite());
            prop_assert!(later.is_finite());
            prop_assert!(later + 1e-15 >= earlier);
            prop_assert!(later <= converged_conductivity(&params, baseline) + 1e-15);
        }

        #[test]
        fn predictions_approach_the_converged_value(
            gas in 1.0f64..100.0,
            prefactor in 1.0f64..1000.0,
            baseline in 0.01f64..0.05,
        ) {
            // Low activation energy keeps the rate large enough to saturate within the horizon
            let params = ParameterSet::from_raw([gas, 1.0, prefactor], &ScaleFactors::default());
            let far_future = predict(&params, 23.0, 1e9, baseline);
            prop_assert!((far_future - converged_conductivity(&params, baseline)).abs() < 1e-12);
        }
    }
}
