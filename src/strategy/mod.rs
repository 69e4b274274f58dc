//! The eleven population-strategy policies.
//!
//! Each [`Kind`] variant carries only the parameters unique to that policy;
//! the iteration budget, mutation pool, and early-exit machinery live on
//! the shared [`LocalPopulation`]. [`Engine::process_unit`] runs the common
//! skeleton (randomize-or-accept, shuffle, before/after hooks, fraction
//! callback, early exit) and dispatches the per-kind inner body to one of
//! the functions in this module.

use rand::Rng;

use crate::config::EsConfig;
use crate::error::EsError;
use crate::individual::Individual;
use crate::population::{LocalPopulation, Scored};
use crate::random::Random;

/// Per-kind parameters. `Engine::process_unit` mutates the schedule state
/// (e.g. `global_limit`, `sine_base`) carried here across work units on the
/// same node.
#[derive(Debug, Clone)]
pub enum Kind {
    /// K=1: halve-and-mutate with elitist carry-forward.
    ElitistHalving,
    /// K=2: independent per-slot hill climb.
    PerSlotHillClimb,
    /// K=3: single random-neighbor probes against best/worst.
    Stochastic1Neighbor,
    /// K=4: a shrinking/growing fitness corridor shared by the whole population.
    SharedShrinkingLimit { global_limit: f64 },
    /// K=5: corridor pinned to the midpoint between best and worst.
    AverageFitnessAcceptance { average: f64 },
    /// K=6: one continuing walk plus fresh one-step probes per slot.
    BranchCompareBest,
    /// K=7: unbounded, terminates after a fitness plateau.
    PlateauBoundedElitistHalving {
        previous_best_fitness: f64,
        previous_best_counter: u64,
    },
    /// K=8: geometric ladder of per-slot corridors anchored at the best.
    GeometricLadderCorridor { limit_range: f64 },
    /// K=9: repopulate from the best, rejecting fitness duplicates.
    BestRepopulateUnique,
    /// K=10: repopulate from the best, allowing duplicates.
    BestRepopulateDuplicates,
    /// K=11: corridor follows a sine wave whose parameters adapt each unit.
    SinusoidalCorridor {
        sine_base: f64,
        sine_amplitude: f64,
        sine_frequency: f64,
    },
}

impl Kind {
    /// Selects the variant named by `config.population_kind` (1..=11) and
    /// seeds its per-kind state: K=4's `global_limit` and K=5's `average`
    /// come from the freshly-constructed population's own fitness spread,
    /// K=8's `limit_range` and K=11's sine parameters come straight from
    /// `config`. `config.min_num_ind` plays no role here — the K=4 corridor
    /// threshold is drawn from the population size, not from config (see
    /// `run_shared_shrinking_limit`).
    pub fn from_config<I: Individual>(
        config: &EsConfig,
        population: &LocalPopulation<I>,
    ) -> Result<Self, EsError> {
        Ok(match config.population_kind {
            1 => Kind::ElitistHalving,
            2 => Kind::PerSlotHillClimb,
            3 => Kind::Stochastic1Neighbor,
            4 => Kind::SharedShrinkingLimit {
                global_limit: population.worst().fitness,
            },
            5 => Kind::AverageFitnessAcceptance {
                average: (population.best().fitness + population.worst().fitness) / 2.0,
            },
            6 => Kind::BranchCompareBest,
            7 => Kind::PlateauBoundedElitistHalving {
                previous_best_fitness: f64::INFINITY,
                previous_best_counter: 0,
            },
            8 => Kind::GeometricLadderCorridor {
                limit_range: config.limit_range,
            },
            9 => Kind::BestRepopulateUnique,
            10 => Kind::BestRepopulateDuplicates,
            11 => Kind::SinusoidalCorridor {
                sine_base: config.sine_base,
                sine_amplitude: config.sine_amplitude,
                sine_frequency: config.sine_frequency,
            },
            other => {
                return Err(EsError::InvalidConfig(format!(
                    "population_kind must be in 1..=11, got {other}"
                )))
            }
        })
    }
}

pub struct Engine<I> {
    pub kind: Kind,
    pub population: LocalPopulation<I>,
}

impl<I: Individual> Engine<I> {
    pub fn new(kind: Kind, population: LocalPopulation<I>) -> Self {
        Engine { kind, population }
    }

    /// Runs one full work unit: integrate the seed, search for
    /// `iteration_budget` iterations (or until early exit / plateau),
    /// compute the secondary objective, and return the local best.
    pub fn process_unit(&mut self, seed: &I, rng: &mut Random) -> I {
        self.population.randomize_or_accept(seed, rng);
        self.population.shuffle_mutation_ops(rng);
        self.population.on_before_iteration();

        match &mut self.kind {
            Kind::ElitistHalving => run_bounded(&mut self.population, rng, k1_elitist_halving),
            Kind::PerSlotHillClimb => run_bounded(&mut self.population, rng, k2_per_slot_hill_climb),
            Kind::Stochastic1Neighbor => {
                run_stochastic_neighbor(&mut self.population, rng)
            }
            Kind::SharedShrinkingLimit { global_limit } => {
                run_shared_shrinking_limit(&mut self.population, rng, global_limit)
            }
            Kind::AverageFitnessAcceptance { average } => {
                run_average_fitness_acceptance(&mut self.population, rng, average)
            }
            Kind::BranchCompareBest => run_bounded(&mut self.population, rng, k6_branch_compare_best),
            Kind::PlateauBoundedElitistHalving {
                previous_best_fitness,
                previous_best_counter,
            } => run_plateau_bounded(
                &mut self.population,
                rng,
                previous_best_fitness,
                previous_best_counter,
            ),
            Kind::GeometricLadderCorridor { limit_range } => {
                run_geometric_ladder(&mut self.population, rng, *limit_range)
            }
            Kind::BestRepopulateUnique => run_bounded(&mut self.population, rng, k9_best_repopulate_unique),
            Kind::BestRepopulateDuplicates => {
                run_bounded(&mut self.population, rng, k10_best_repopulate_duplicates)
            }
            Kind::SinusoidalCorridor {
                sine_base,
                sine_amplitude,
                sine_frequency,
            } => run_sinusoidal(
                &mut self.population,
                rng,
                sine_base,
                sine_amplitude,
                *sine_frequency,
            ),
        }

        self.population.on_after_iteration();
        self.population.compute_fitness2();
        log_stats(&self.population);
        self.population.best().individual.clone()
    }
}

fn log_stats<I: Individual>(population: &LocalPopulation<I>) {
    log::debug!(
        "best_fitness={:.6} worst_fitness={:.6}",
        population.best().fitness,
        population.worst().fitness,
    );
}

fn mutate_n<I: Individual>(
    population: &mut LocalPopulation<I>,
    scored: &mut Scored<I>,
    n: u64,
    rng: &mut Random,
) {
    for _ in 0..n {
        let op = population.next_mutation_op();
        let _ = LocalPopulation::mutate_tracked(scored, op, rng);
    }
    scored.fitness = scored.individual.fitness();
}

/// Runs the common "fixed iteration budget, check target each iteration"
/// shell shared by K=1, K=2, K=6, K=9, K=10.
fn run_bounded<I: Individual>(
    population: &mut LocalPopulation<I>,
    rng: &mut Random,
    body: impl Fn(&mut LocalPopulation<I>, &mut Random),
) {
    for iter in 0..population.iteration_budget {
        population.on_fraction_iteration();
        body(population, rng);
        if population.best().fitness <= population.target_fitness {
            population.early_exit(iter);
            break;
        }
    }
}

fn k1_elitist_halving<I: Individual>(population: &mut LocalPopulation<I>, rng: &mut Random) {
    let half = population.len() / 2;
    let budget = population.mutation_budget;
    for j in 0..half {
        let snapshot = population.get(j).clone();
        *population.get_mut(j + half) = snapshot;
        let mut candidate = population.get(j).clone();
        mutate_n(population, &mut candidate, budget, rng);
        *population.get_mut(j) = candidate;
    }
    population.sort();
}

fn k2_per_slot_hill_climb<I: Individual>(population: &mut LocalPopulation<I>, rng: &mut Random) {
    let budget = population.mutation_budget;
    for i in 0..population.len() {
        let mut candidate = population.get(i).clone();
        mutate_n(population, &mut candidate, budget, rng);
        if candidate.fitness < population.get(i).fitness {
            *population.get_mut(i) = candidate;
        }
    }
    population.find_best_and_worst();
}

fn run_stochastic_neighbor<I: Individual>(population: &mut LocalPopulation<I>, rng: &mut Random) {
    let total = population.iteration_budget * population.len() as u64;
    let budget = population.mutation_budget;
    for iter in 0..total {
        let j = rng.gen_range(0..population.len());
        let mut candidate = population.get(j).clone();
        mutate_n(population, &mut candidate, budget, rng);
        if candidate.fitness < population.best().fitness {
            population.replace_best(candidate);
        } else if candidate.fitness < population.worst().fitness {
            population.replace_worst(candidate);
            population.find_worst();
        }
        if population.best().fitness <= population.target_fitness {
            population.early_exit(iter);
            break;
        }
    }
}

fn run_shared_shrinking_limit<I: Individual>(
    population: &mut LocalPopulation<I>,
    rng: &mut Random,
    global_limit: &mut f64,
) {
    let budget = population.mutation_budget;
    let min_below = rng.gen_range(1..(population.len() / 2).max(2));
    for iter in 0..population.iteration_budget {
        population.on_fraction_iteration();
        for i in 0..population.len() {
            let mut candidate = population.get(i).clone();
            mutate_n(population, &mut candidate, budget, rng);
            population.check_limit(candidate, *global_limit, i);
        }
        if population.best().fitness <= population.target_fitness {
            population.early_exit(iter);
            return;
        }
        let below = population
            .individuals()
            .iter()
            .filter(|s| s.fitness < *global_limit)
            .count();
        if below >= min_below {
            *global_limit *= 0.9;
        } else {
            *global_limit *= 1.01;
        }
    }
    population.find_best_and_worst();
    population.clone_best_to_worst();
}

fn run_average_fitness_acceptance<I: Individual>(
    population: &mut LocalPopulation<I>,
    rng: &mut Random,
    average: &mut f64,
) {
    let budget = population.mutation_budget;
    for iter in 0..population.iteration_budget {
        population.on_fraction_iteration();
        for i in 0..population.len() {
            let mut candidate = population.get(i).clone();
            mutate_n(population, &mut candidate, budget, rng);
            population.check_limit(candidate, *average, i);
        }
        population.sort();
        let len = population.len();
        let second_to_last = population.get(len - 2).clone();
        *population.get_mut(len - 1) = second_to_last;
        *average = (population.best().fitness + population.worst().fitness) / 2.0;
        if population.best().fitness <= population.target_fitness {
            population.early_exit(iter);
            return;
        }
    }
}

fn k6_branch_compare_best<I: Individual>(population: &mut LocalPopulation<I>, rng: &mut Random) {
    let budget = population.mutation_budget;
    for i in 0..population.len() {
        let initial = population.get(i).clone();
        let mut walk = initial.clone();
        let mut best = initial.clone();
        for _ in 0..budget {
            let op = population.next_mutation_op();
            let _ = LocalPopulation::mutate_tracked(&mut walk, op, rng);
            walk.fitness = walk.individual.fitness();
            if walk.fitness < best.fitness {
                best = walk.clone();
            }

            let mut probe = initial.clone();
            let op = population.next_mutation_op();
            let _ = LocalPopulation::mutate_tracked(&mut probe, op, rng);
            probe.fitness = probe.individual.fitness();
            if probe.fitness < best.fitness {
                best = probe;
            }
        }
        if best.fitness < population.get(i).fitness {
            *population.get_mut(i) = best;
        }
    }
    population.find_best_and_worst();
}

fn run_plateau_bounded<I: Individual>(
    population: &mut LocalPopulation<I>,
    rng: &mut Random,
    previous_best_fitness: &mut f64,
    previous_best_counter: &mut u64,
) {
    let plateau_limit = population.iteration_budget;
    let mut iter = 0u64;
    loop {
        population.on_fraction_iteration();
        let op = population.next_mutation_op();
        let half = population.len() / 2;
        for j in 0..half {
            let snapshot = population.get(j).clone();
            *population.get_mut(j + half) = snapshot;
            let mut candidate = population.get(j).clone();
            let _ = LocalPopulation::mutate_tracked(&mut candidate, op, rng);
            candidate.fitness = candidate.individual.fitness();
            *population.get_mut(j) = candidate;
        }
        population.sort();

        if population.best().fitness <= population.target_fitness {
            population.early_exit(iter);
            return;
        }

        if population.best().fitness == *previous_best_fitness {
            *previous_best_counter += 1;
            if *previous_best_counter >= plateau_limit {
                return;
            }
        } else {
            *previous_best_counter = 0;
            *previous_best_fitness = population.best().fitness;
        }
        iter += 1;
    }
}

fn run_geometric_ladder<I: Individual>(
    population: &mut LocalPopulation<I>,
    rng: &mut Random,
    limit_range: f64,
) {
    let budget = population.mutation_budget;
    let factor = limit_range.powf(1.0 / population.len() as f64);
    for iter in 0..population.iteration_budget {
        population.on_fraction_iteration();
        let current_best = population.best().fitness;
        for i in 0..population.len() {
            let mut candidate = population.get(i).clone();
            mutate_n(population, &mut candidate, budget, rng);
            if candidate.fitness < current_best {
                if population.best().fitness <= population.target_fitness {
                    population.early_exit(iter);
                    return;
                }
                *population.get_mut(0) = candidate;
            } else if i > 0 {
                let limit = current_best * factor.powi(i as i32);
                population.check_limit(candidate, limit, i);
            }
        }
    }
    population.sort();
}

fn k9_best_repopulate_unique<I: Individual>(population: &mut LocalPopulation<I>, rng: &mut Random) {
    population.sort();
    let seed = population.best().clone();
    let size = population.len();
    let mut refilled = vec![seed.clone()];
    let mut attempts_since_unique = 0u32;
    while refilled.len() < size {
        let mut candidate = seed.clone();
        let op = population.next_mutation_op();
        let _ = LocalPopulation::mutate_tracked(&mut candidate, op, rng);
        candidate.fitness = candidate.individual.fitness();

        let is_duplicate = refilled.iter().any(|s: &Scored<I>| s.fitness == candidate.fitness);
        if is_duplicate && attempts_since_unique < 100 {
            attempts_since_unique += 1;
            continue;
        }
        attempts_since_unique = 0;
        refilled.push(candidate);
    }
    for (i, s) in refilled.into_iter().enumerate() {
        *population.get_mut(i) = s;
    }
    population.find_best_and_worst();
}

fn k10_best_repopulate_duplicates<I: Individual>(
    population: &mut LocalPopulation<I>,
    rng: &mut Random,
) {
    population.sort();
    let budget = population.mutation_budget;
    let best = population.best().clone();
    for j in 1..population.len() {
        let mut candidate = best.clone();
        mutate_n(population, &mut candidate, budget, rng);
        *population.get_mut(j) = candidate;
    }
    population.sort();
}

fn run_sinusoidal<I: Individual>(
    population: &mut LocalPopulation<I>,
    rng: &mut Random,
    sine_base: &mut f64,
    sine_amplitude: &mut f64,
    sine_frequency: f64,
) {
    let budget = population.mutation_budget;
    for iter in 0..population.iteration_budget {
        population.on_fraction_iteration();
        let limit = *sine_base + *sine_amplitude * (sine_frequency * iter as f64).sin();
        for i in 0..population.len() {
            let mut candidate = population.get(i).clone();
            mutate_n(population, &mut candidate, budget, rng);
            population.check_limit(candidate, limit, i);
        }
        if population.best().fitness <= population.target_fitness {
            population.early_exit(iter);
            return;
        }
    }
    population.find_best_and_worst();
    *sine_base = population.best().fitness;
    *sine_amplitude = if *sine_base < 30.0 {
        rng.gen_range(1.0..5.0)
    } else {
        *sine_base * rng.gen_range(0.1..0.2)
    };
}

/// Returns the sine-corridor `limit` sequence for `iterations` steps,
/// exposed so the K=11 amplitude property can be checked without running a
/// full work unit.
pub fn sine_limit_sequence(
    sine_base: f64,
    sine_amplitude: f64,
    sine_frequency: f64,
    iterations: u64,
) -> Vec<f64> {
    (0..iterations)
        .map(|i| sine_base + sine_amplitude * (sine_frequency * i as f64).sin())
        .collect()
}
