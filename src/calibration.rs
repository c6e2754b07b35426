use argmin::core::CostFunction;
use slog::{info, o, warn, Logger};

use crate::config::CalibrationConfig;
use crate::minimisation::{polish, Candidate, DifferentialEvolution};
use crate::model::rate_constant;
use crate::parameters::{ParameterSet, ScaleFactors};
use crate::table::ErrorTable;

/// Score assigned to any parameter set whose score cannot be computed
///
/// Large enough to lose against every real score, so the search is pushed out of regions
/// where the model overflows.
pub const SENTINEL_SCORE: f64 = 1e20;

/// Disagreement between the model and two experiments under one shared parameter set
///
/// The templates are never modified: every evaluation works on its own copy of both tables, so
/// trials are independent of each other and of evaluation order.
#[derive(Clone, Debug)]
pub struct JointObjective {
    first: ErrorTable,
    second: ErrorTable,
    scales: ScaleFactors,
}

impl JointObjective {
    #[must_use]
    pub fn new(first: ErrorTable, second: ErrorTable, scales: ScaleFactors) -> Self {
        Self {
            first,
            second,
            scales,
        }
    }

    /// Time averaged absolute error of both series at the optimiser values `raw`
    ///
    /// The summed trapezoidal error areas of both tables are divided by the duration of the
    /// first series. A result that is not finite is replaced by [`SENTINEL_SCORE`].
    #[must_use]
    pub fn score(&self, raw: [f64; 3]) -> f64 {
        let params = ParameterSet::from_raw(raw, &self.scales);
        let (first, second) = self.evaluated(&params);
        let score = (first.total_error_area() + second.total_error_area()) / first.duration();
        if score.is_finite() {
            score
        } else {
            SENTINEL_SCORE
        }
    }

    /// Copies of both tables evaluated at `params`
    #[must_use]
    pub fn evaluated(&self, params: &ParameterSet) -> (ErrorTable, ErrorTable) {
        let mut first = self.first.clone();
        let mut second = self.second.clone();
        first.evaluate(params);
        second.evaluate(params);
        (first, second)
    }

    pub const fn scales(&self) -> &ScaleFactors {
        &self.scales
    }
}

impl CostFunction for JointObjective {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        Ok(<[f64; 3]>::try_from(param.as_slice()).map_or(SENTINEL_SCORE, |raw| self.score(raw)))
    }
}

/// Outcome of a joint calibration
#[derive(Clone, Debug, PartialEq)]
pub struct FitResult {
    /// Best parameter set found
    pub parameters: ParameterSet,
    /// Joint score of `parameters`
    pub score: f64,
    /// Generations the global search ran for
    pub generations: u64,
    /// Objective evaluations made by the global search
    pub evaluations: u64,
    /// Global search evaluations that scored below [`SENTINEL_SCORE`]
    pub feasible_evaluations: u64,
    /// Whether the global search stopped on its tolerance rather than the iteration cap
    pub converged: bool,
    /// Whether the local polish improved on the global optimum
    pub polished: bool,
}

impl FitResult {
    /// False if no evaluated parameter set produced a finite score, in which case
    /// `parameters` carry no information.
    #[must_use]
    pub fn is_feasible(&self) -> bool {
        self.score < SENTINEL_SCORE
    }
}

/// Fit a shared parameter set to two experiments
///
/// Runs the differential evolution search over `config.bounds`, then optionally polishes the
/// best candidate. Never fails: numerical trouble inside the search only shows up as a poor
/// score, and a run in which no trial was feasible is reported through
/// [`FitResult::is_feasible`] and a warning on `logger`.
///
/// `config` is expected to have passed [`CalibrationConfig::validate`].
pub fn fit(
    first: &ErrorTable,
    second: &ErrorTable,
    config: &CalibrationConfig,
    logger: &Logger,
) -> FitResult {
    let logger = logger.new(o!(
        "first_temperature" => first.temperature(),
        "second_temperature" => second.temperature()
    ));
    let objective = JointObjective::new(first.clone(), second.clone(), config.scales);
    let bounds = config.bounds.intervals();

    info!(logger, "starting global search";
        "population_size" => config.search.population_size,
        "max_iterations" => config.search.max_iterations
    );
    let report =
        DifferentialEvolution::new(&objective, &bounds, &config.search, SENTINEL_SCORE).run(&logger);
    info!(logger, "global search finished";
        "generations" => report.generations,
        "evaluations" => report.evaluations,
        "score" => report.best.cost
    );

    if report.feasible_evaluations == 0 {
        warn!(logger, "every trial scored the sentinel value, no feasible region was found";
            "evaluations" => report.evaluations
        );
    }

    let mut best = report.best;
    let mut polished = false;
    if config.search.polish && report.feasible_evaluations > 0 {
        match polish(&objective, &bounds, &best, &config.search, SENTINEL_SCORE) {
            Ok(Some(refined)) => {
                info!(logger, "polish improved the global optimum";
                    "before" => best.cost,
                    "after" => refined.cost
                );
                best = refined;
                polished = true;
            }
            Ok(None) => info!(logger, "polish found no improvement"),
            Err(error) => warn!(logger, "polish failed, keeping the global optimum";
                "error" => %error
            ),
        }
    }

    let Candidate { param, cost } = best;
    let raw = <[f64; 3]>::try_from(param.as_slice())
        .unwrap_or_else(|_| config.bounds.midpoint());
    FitResult {
        parameters: ParameterSet::from_raw(raw, &config.scales),
        score: cost,
        generations: report.generations,
        evaluations: report.evaluations,
        feasible_evaluations: report.feasible_evaluations,
        converged: report.converged,
        polished,
    }
}

/// A fit together with both experiments evaluated at the fitted parameters
#[derive(Clone, Debug)]
pub struct Calibration {
    pub fit: FitResult,
    pub first: ErrorTable,
    pub second: ErrorTable,
}

impl Calibration {
    /// Long term conductivities of the first and second series
    #[must_use]
    pub fn converged_conductivities(&self) -> (f64, f64) {
        (
            self.first.converged_conductivity(&self.fit.parameters),
            self.second.converged_conductivity(&self.fit.parameters),
        )
    }

    /// Arrhenius rate constants (1/s) at the temperatures of the first and second series
    #[must_use]
    pub fn rate_constants(&self) -> (f64, f64) {
        (
            rate_constant(&self.fit.parameters, self.first.temperature()),
            rate_constant(&self.fit.parameters, self.second.temperature()),
        )
    }
}

/// Fit both experiments and return their tables evaluated at the result
#[must_use]
pub fn calibrate(
    mut first: ErrorTable,
    mut second: ErrorTable,
    config: &CalibrationConfig,
    logger: &Logger,
) -> Calibration {
    let fit = fit(&first, &second, config, logger);
    first.evaluate(&fit.parameters);
    second.evaluate(&fit.parameters);
    Calibration { fit, first, second }
}
