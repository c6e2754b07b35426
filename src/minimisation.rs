use argmin::core::observers::{ObserverMode, SlogLogger};
use argmin::core::{CostFunction, Executor, State};
use argmin::solver::neldermead::NelderMead;
use ndarray::{Array1, Array2, ArrayView1};
use ndarray_rand::rand::seq::SliceRandom;
use ndarray_rand::rand::{thread_rng, Rng, SeedableRng};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_isaac::Isaac64Rng;
use slog::{debug, info, Logger};

use crate::config::{Interval, SearchConfig, Tolerance};

/// Smallest total population the rand/1 strategy can draw three distinct partners from
const MIN_POPULATION: usize = 5;

/// Relative size of the initial polish simplex around the global optimum
const SIMPLEX_STEP: f64 = 0.05;

/// The polish stops once the simplex costs agree to this standard deviation
const POLISH_SD_TOLERANCE: f64 = 1e-15;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Candidate {
    pub(crate) param: Vec<f64>,
    pub(crate) cost: f64,
}

#[derive(Clone, Debug)]
pub(crate) struct SearchReport {
    pub(crate) best: Candidate,
    pub(crate) generations: u64,
    pub(crate) evaluations: u64,
    /// Evaluations which scored below the penalty
    pub(crate) feasible_evaluations: u64,
    /// Whether the population met the convergence tolerance before the iteration cap
    pub(crate) converged: bool,
}

/// Differential evolution over a box, strategy rand/1/bin
///
/// The population lives in the unit cube and is mapped linearly onto `bounds` for every
/// evaluation. Each generation redraws the mutation factor from the configured range
/// (dithering), then for every member builds a mutant from three other distinct members,
/// crosses it with the member component-wise (at least one component always comes from the
/// mutant) and keeps whichever of the two scores lower. A better trial replaces its parent
/// immediately, so later members of the same generation already see it.
///
/// Any cost that is an error or not finite is replaced by `penalty`, so every point in the box
/// can be ranked.
pub(crate) struct DifferentialEvolution<'a, O> {
    objective: &'a O,
    bounds: &'a [Interval],
    config: &'a SearchConfig,
    penalty: f64,
    rng: Isaac64Rng,
    evaluations: u64,
    feasible_evaluations: u64,
}

impl<'a, O> DifferentialEvolution<'a, O>
where
    O: CostFunction<Param = Vec<f64>, Output = f64>,
{
    pub(crate) fn new(
        objective: &'a O,
        bounds: &'a [Interval],
        config: &'a SearchConfig,
        penalty: f64,
    ) -> Self {
        let seed = config.seed.unwrap_or_else(|| thread_rng().gen());
        Self {
            objective,
            bounds,
            config,
            penalty,
            rng: Isaac64Rng::seed_from_u64(seed),
            evaluations: 0,
            feasible_evaluations: 0,
        }
    }

    fn population_count(&self) -> usize {
        (self.config.population_size * self.bounds.len()).max(MIN_POPULATION)
    }

    /// Map a point of the unit cube onto the search box
    fn scale(&self, unit: ArrayView1<f64>) -> Vec<f64> {
        unit.iter()
            .zip(self.bounds)
            .map(|(u, interval)| u.mul_add(interval.width(), interval.lower()))
            .collect()
    }

    fn evaluate(&mut self, unit: ArrayView1<f64>) -> f64 {
        let param = self.scale(unit);
        let cost = match self.objective.cost(&param) {
            Ok(cost) if cost.is_finite() => cost,
            _ => self.penalty,
        };
        self.evaluations += 1;
        if cost < self.penalty {
            self.feasible_evaluations += 1;
        }
        cost
    }

    /// Latin hypercube sample of the unit cube: each dimension is cut into one stratum per
    /// member and every stratum is used exactly once.
    #[allow(clippy::cast_precision_loss)]
    fn latin_hypercube(&mut self) -> Array2<f64> {
        let (n, d) = (self.population_count(), self.bounds.len());
        let segment = 1.0 / n as f64;
        let jitter: Array2<f64> =
            Array2::random_using((n, d), Uniform::new(0.0, segment), &mut self.rng);

        let mut population = Array2::zeros((n, d));
        let mut order: Vec<usize> = (0..n).collect();
        for jj in 0..d {
            order.shuffle(&mut self.rng);
            for (ii, &stratum) in order.iter().enumerate() {
                population[[ii, jj]] = (stratum as f64).mul_add(segment, jitter[[ii, jj]]);
            }
        }
        population
    }

    /// Three distinct population indices, none equal to `exclude`
    fn partners(&mut self, n: usize, exclude: usize) -> [usize; 3] {
        let mut picks = [exclude; 3];
        let mut found = 0;
        while found < picks.len() {
            let candidate = self.rng.gen_range(0..n);
            if candidate != exclude && !picks[..found].contains(&candidate) {
                picks[found] = candidate;
                found += 1;
            }
        }
        picks
    }

    fn mutation_factor(&mut self) -> f64 {
        let (lower, upper) = self.config.mutation;
        if upper > lower {
            self.rng.gen_range(lower..upper)
        } else {
            lower
        }
    }

    pub(crate) fn run(mut self, logger: &Logger) -> SearchReport {
        let mut population = self.latin_hypercube();
        let (n, d) = population.dim();

        let mut energies: Array1<f64> = Array1::zeros(n);
        for ii in 0..n {
            energies[ii] = self.evaluate(population.row(ii));
        }
        let mut best = lowest(&energies);
        debug!(logger, "initial population evaluated"; "members" => n, "best" => energies[best]);

        let mut generations = 0;
        let mut converged = false;
        while generations < self.config.max_iterations {
            generations += 1;
            let factor = self.mutation_factor();

            for ii in 0..n {
                let [r0, r1, r2] = self.partners(n, ii);
                let forced = self.rng.gen_range(0..d);

                let mut trial = population.row(ii).to_owned();
                for jj in 0..d {
                    if jj == forced || self.rng.gen::<f64>() < self.config.recombination {
                        trial[jj] = factor.mul_add(
                            population[[r1, jj]] - population[[r2, jj]],
                            population[[r0, jj]],
                        );
                    }
                }
                for value in &mut trial {
                    if !(0.0..=1.0).contains(&*value) {
                        *value = self.rng.gen();
                    }
                }

                let energy = self.evaluate(trial.view());
                if energy <= energies[ii] {
                    population.row_mut(ii).assign(&trial);
                    energies[ii] = energy;
                    if energy <= energies[best] {
                        best = ii;
                    }
                }
            }

            if self.config.display_progress {
                info!(logger, "differential evolution step";
                    "generation" => generations,
                    "best" => energies[best],
                    "mutation" => factor
                );
            }

            if let Some(tolerance) = self.config.tolerance {
                if has_converged(&energies, tolerance) {
                    converged = true;
                    break;
                }
            }
        }

        SearchReport {
            best: Candidate {
                param: self.scale(population.row(best)),
                cost: energies[best],
            },
            generations,
            evaluations: self.evaluations,
            feasible_evaluations: self.feasible_evaluations,
            converged,
        }
    }
}

fn lowest(energies: &Array1<f64>) -> usize {
    energies
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map_or(0, |(ii, _)| ii)
}

/// The population has collapsed when the spread of its costs is within tolerance
fn has_converged(energies: &Array1<f64>, tolerance: Tolerance) -> bool {
    energies.mean().map_or(false, |mean| {
        energies.std(0.0) <= tolerance.relative.mul_add(mean.abs(), tolerance.absolute)
    })
}

fn clamp(param: &[f64], bounds: &[Interval]) -> Vec<f64> {
    param
        .iter()
        .zip(bounds)
        .map(|(value, interval)| interval.clamp(*value))
        .collect()
}

/// An objective evaluated at the nearest point inside the search box
///
/// Nelder-Mead knows nothing of bounds, so the polish sees a landscape which is flat outside
/// the box.
struct Clamped<O> {
    objective: O,
    bounds: Vec<Interval>,
    penalty: f64,
}

impl<O> CostFunction for Clamped<O>
where
    O: CostFunction<Param = Vec<f64>, Output = f64>,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let inside = clamp(param, &self.bounds);
        Ok(match self.objective.cost(&inside) {
            Ok(cost) if cost.is_finite() => cost,
            _ => self.penalty,
        })
    }
}

fn initial_simplex(start: &[f64], bounds: &[Interval]) -> Vec<Vec<f64>> {
    let mut simplex = vec![start.to_vec()];
    for (jj, interval) in bounds.iter().enumerate() {
        let step = (start[jj].abs() * SIMPLEX_STEP).max(interval.width() * 1e-3);
        let mut vertex = start.to_vec();
        vertex[jj] = if start[jj] + step <= interval.upper() {
            start[jj] + step
        } else {
            start[jj] - step
        };
        simplex.push(vertex);
    }
    simplex
}

/// Refine `start` with a bounded Nelder-Mead search
///
/// Returns the refined candidate only if it scores strictly lower than `start`.
///
/// # Errors
/// Returns an error if the solver cannot be constructed or fails while running.
pub(crate) fn polish<O>(
    objective: &O,
    bounds: &[Interval],
    start: &Candidate,
    config: &SearchConfig,
    penalty: f64,
) -> Result<Option<Candidate>, argmin::core::Error>
where
    O: CostFunction<Param = Vec<f64>, Output = f64> + Clone,
{
    let problem = Clamped {
        objective: objective.clone(),
        bounds: bounds.to_vec(),
        penalty,
    };
    let solver: NelderMead<Vec<f64>, f64> =
        NelderMead::new(initial_simplex(&start.param, bounds)).with_sd_tolerance(POLISH_SD_TOLERANCE)?;

    let mut executor = Executor::new(problem, solver)
        .configure(|state| state.max_iters(config.polish_max_iterations));
    if config.display_progress {
        executor = executor.add_observer(SlogLogger::term(), ObserverMode::Always);
    }
    let res = executor.run()?;

    let state = res.state();
    let Some(param) = state.get_best_param() else {
        return Ok(None);
    };
    let cost = state.get_best_cost();
    if cost < start.cost {
        Ok(Some(Candidate {
            param: clamp(param, bounds),
            cost,
        }))
    } else {
        Ok(None)
    }
}
