//! The per-node population every strategy operates on.
//!
//! `LocalPopulation<I>` owns `N` individuals plus everything the strategy
//! skeleton needs between iterations: best/worst indices, the mutation
//! operator pool and its rotating cursor, and the handful of policy knobs
//! (randomize-every, accept-new-best, early-exit) that are shared across
//! all eleven population kinds.

use std::collections::HashMap;
use std::time::Duration;

use rand::seq::SliceRandom;

use crate::error::EsError;
use crate::individual::Individual;
use crate::random::Random;

/// An individual together with the bookkeeping the framework layers on top
/// of it (mutation-operator histogram). Kept separate from `Individual`
/// itself per the mutation-count wrapper design note.
#[derive(Clone)]
pub struct Scored<I> {
    pub individual: I,
    pub fitness: f64,
    pub mut_counts: HashMap<u32, u64>,
}

impl<I: Individual> Scored<I> {
    fn new(mut individual: I) -> Self {
        let fitness = individual.fitness();
        Scored {
            individual,
            fitness,
            mut_counts: HashMap::new(),
        }
    }

    fn rescore(&mut self) {
        self.fitness = self.individual.fitness();
    }

    fn reset_counter(&mut self) {
        self.mut_counts.clear();
    }
}

pub struct LocalPopulation<I> {
    individuals: Vec<Scored<I>>,
    best_idx: usize,
    worst_idx: usize,

    pub iteration_budget: u64,
    pub mutation_budget: u64,
    pub target_fitness: f64,
    pub target_fitness2: f64,

    mutation_ops: Vec<u32>,
    configured_ops: Vec<u32>,
    mut_op_cursor: usize,
    pad_factor: usize,

    pub randomize_pop: bool,
    pub randomize_every: u64,
    randomize_counter: u64,
    pub accept_new_best: bool,

    pub minimum_found: bool,
    pub early_exit_sleep: Duration,

    pub fraction_stride: u64,
    iteration_counter: u64,
}

impl<I: Individual> LocalPopulation<I> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        seed: I,
        size: usize,
        mutation_operations: Vec<u32>,
        iteration_budget: u64,
        mutation_budget: u64,
        target_fitness: f64,
        target_fitness2: f64,
        pad_factor: usize,
        early_exit_sleep: Duration,
        rng: &mut Random,
    ) -> Result<Self, EsError> {
        if size < 2 {
            return Err(EsError::InvalidConfig(format!(
                "node_population_size must be >= 2, got {size}"
            )));
        }
        if iteration_budget < 1 {
            return Err(EsError::InvalidConfig(
                "num_of_iterations must be >= 1".into(),
            ));
        }
        if mutation_budget < 1 {
            return Err(EsError::InvalidConfig(
                "num_of_mutations must be >= 1".into(),
            ));
        }
        if mutation_operations.is_empty() {
            return Err(EsError::InvalidConfig(
                "mutation_operations must be non-empty".into(),
            ));
        }

        let mut individuals = Vec::with_capacity(size);
        for _ in 0..size {
            let mut ind = seed.clone();
            ind.randomize(rng);
            individuals.push(Scored::new(ind));
        }

        let mut population = LocalPopulation {
            individuals,
            best_idx: 0,
            worst_idx: size - 1,
            iteration_budget,
            mutation_budget,
            target_fitness,
            target_fitness2,
            mutation_ops: Vec::new(),
            configured_ops: mutation_operations,
            mut_op_cursor: 0,
            pad_factor,
            randomize_pop: false,
            randomize_every: 1,
            randomize_counter: 0,
            accept_new_best: true,
            minimum_found: false,
            early_exit_sleep,
            fraction_stride: 4,
            iteration_counter: 0,
        };
        population.find_best_and_worst();
        Ok(population)
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn get(&self, i: usize) -> &Scored<I> {
        &self.individuals[i]
    }

    pub fn get_mut(&mut self, i: usize) -> &mut Scored<I> {
        &mut self.individuals[i]
    }

    pub fn best(&self) -> &Scored<I> {
        &self.individuals[self.best_idx]
    }

    pub fn worst(&self) -> &Scored<I> {
        &self.individuals[self.worst_idx]
    }

    pub fn best_idx(&self) -> usize {
        self.best_idx
    }

    pub fn worst_idx(&self) -> usize {
        self.worst_idx
    }

    /// Wraps [`Individual::mutate`], bumping the per-operator histogram
    /// before delegating. This is the only place mutation counts are ever
    /// touched; `Individual` implementors never see the counter.
    pub fn mutate_tracked(
        scored: &mut Scored<I>,
        op: u32,
        rng: &mut Random,
    ) -> Result<(), EsError> {
        *scored.mut_counts.entry(op).or_insert(0) += 1;
        scored.individual.mutate(op, rng)
    }

    pub fn find_worst(&mut self) {
        let (idx, _) = self
            .individuals
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.fitness.total_cmp(&b.1.fitness))
            .expect("population is never empty");
        self.worst_idx = idx;
    }

    pub fn find_best_and_worst(&mut self) {
        let mut best = 0;
        let mut worst = 0;
        for (i, s) in self.individuals.iter().enumerate() {
            if s.fitness < self.individuals[best].fitness {
                best = i;
            }
            if s.fitness > self.individuals[worst].fitness {
                worst = i;
            }
        }
        self.best_idx = best;
        self.worst_idx = worst;
    }

    pub fn sort(&mut self) {
        self.individuals
            .sort_by(|a, b| a.fitness.total_cmp(&b.fitness));
        self.best_idx = 0;
        self.worst_idx = self.individuals.len() - 1;
    }

    pub fn randomize_all(&mut self, rng: &mut Random) {
        for s in &mut self.individuals {
            s.reset_counter();
            s.individual.randomize(rng);
            s.rescore();
        }
        self.find_best_and_worst();
    }

    /// Either periodically randomizes the whole population, or integrates a
    /// server-provided seed into the current best slot.
    pub fn randomize_or_accept(&mut self, seed: &I, rng: &mut Random) {
        if self.randomize_pop {
            self.randomize_counter += 1;
            if self.randomize_counter >= self.randomize_every {
                self.randomize_counter = 0;
                self.randomize_all(rng);
            }
        } else if self.accept_new_best {
            self.individuals[0].individual.accept_from_server(seed);
            self.individuals[0].reset_counter();
            self.individuals[0].rescore();
        }
    }

    pub fn shuffle_mutation_ops(&mut self, rng: &mut Random) {
        let mut pool = Vec::with_capacity(self.configured_ops.len() * self.pad_factor);
        for _ in 0..self.pad_factor {
            pool.extend_from_slice(&self.configured_ops);
        }
        pool.shuffle(rng);
        self.mutation_ops = pool;
        self.mut_op_cursor = 0;
    }

    pub fn next_mutation_op(&mut self) -> u32 {
        let op = self.mutation_ops[self.mut_op_cursor];
        self.mut_op_cursor = (self.mut_op_cursor + 1) % self.mutation_ops.len();
        op
    }

    pub fn randomize_worst(&mut self, rng: &mut Random) {
        let worst = self.worst_idx;
        let s = &mut self.individuals[worst];
        s.reset_counter();
        s.individual.randomize(rng);
        s.rescore();
    }

    pub fn replace_best(&mut self, candidate: Scored<I>) {
        if candidate.fitness < self.individuals[self.best_idx].fitness {
            let idx = self.best_idx;
            self.individuals[idx] = candidate;
        }
    }

    pub fn replace_worst(&mut self, candidate: Scored<I>) {
        let idx = self.worst_idx;
        self.individuals[idx] = candidate;
    }

    pub fn clone_best_to_worst(&mut self) {
        let best = self.individuals[self.best_idx].clone();
        self.individuals[self.worst_idx] = best;
    }

    /// Replaces `individuals[i]` with `candidate` if the candidate beats
    /// `limit`, or beats the slot it would replace.
    pub fn check_limit(&mut self, candidate: Scored<I>, limit: f64, i: usize) {
        if candidate.fitness < limit || candidate.fitness < self.individuals[i].fitness {
            self.individuals[i] = candidate;
        }
    }

    /// Marks the population as converged. If this is the very first
    /// iteration, sleeps briefly: an early exit this fast usually means the
    /// seed itself already satisfied the target, and hammering the server
    /// immediately with a trivial result is wasted effort.
    pub fn early_exit(&mut self, iteration: u64) {
        self.minimum_found = true;
        if iteration == 0 && !self.early_exit_sleep.is_zero() {
            std::thread::sleep(self.early_exit_sleep);
        }
    }

    /// Computes the secondary objective for every individual whose primary
    /// fitness has dropped below `0.01`, promoting the one with the
    /// smallest secondary value to best if it differs from the current
    /// best.
    pub fn compute_fitness2(&mut self) {
        let mut best_fitness2 = f64::INFINITY;
        let mut best_fitness2_idx = self.best_idx;
        let mut any = false;
        for (i, s) in self.individuals.iter_mut().enumerate() {
            if s.fitness < 0.01 {
                let f2 = s.individual.fitness2();
                any = true;
                if f2 < best_fitness2 {
                    best_fitness2 = f2;
                    best_fitness2_idx = i;
                }
            }
        }
        if any && best_fitness2_idx != self.best_idx {
            self.best_idx = best_fitness2_idx;
        }
    }

    pub fn on_before_iteration(&mut self) {
        self.iteration_counter = 0;
    }

    /// Fires every `ceil(iteration_budget / fraction_stride)` iterations
    /// (called once per outer iteration by the strategy skeleton). The
    /// default hook only traces progress; a caller that owns the
    /// `LocalPopulation` can poll the returned boundary flag to layer a
    /// problem-specific observer on top.
    pub fn on_fraction_iteration(&mut self) -> bool {
        self.iteration_counter += 1;
        let stride = self.fraction_stride.max(1);
        if self.iteration_counter >= self.iteration_budget.div_ceil(stride).max(1) {
            self.iteration_counter = 0;
            log::trace!("fraction boundary: best_fitness={:.6}", self.best().fitness);
            true
        } else {
            false
        }
    }

    pub fn on_after_iteration(&mut self) {}

    pub fn individuals(&self) -> &[Scored<I>] {
        &self.individuals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[derive(Clone)]
    struct Counter(u32);

    impl Individual for Counter {
        fn randomize(&mut self, rng: &mut Random) {
            use rand::Rng;
            self.0 = rng.gen_range(0..1000);
        }

        fn mutate(&mut self, op: u32, _rng: &mut Random) -> Result<(), EsError> {
            match op {
                0 => {
                    self.0 = self.0.saturating_sub(1);
                    Ok(())
                }
                1 => {
                    self.0 = self.0.saturating_add(1);
                    Ok(())
                }
                _ => Err(EsError::UnknownMutationOp(op)),
            }
        }

        fn fitness(&mut self) -> f64 {
            self.0 as f64
        }

        fn accept_from_server(&mut self, other: &Self) {
            self.0 = other.0;
        }

        fn actual_fitness(&self) -> f64 {
            self.0 as f64
        }

        fn to_document(&self) -> Value {
            json!({ "value": self.0 })
        }

        fn from_document(&mut self, doc: &Value) -> Result<(), EsError> {
            self.0 = doc["value"].as_u64().unwrap_or(0) as u32;
            Ok(())
        }
    }

    fn pop(size: usize) -> LocalPopulation<Counter> {
        let mut rng = Random::testing();
        LocalPopulation::new(
            Counter(0),
            size,
            vec![0, 1],
            10,
            1,
            0.0,
            0.0,
            10,
            Duration::ZERO,
            &mut rng,
        )
        .unwrap()
    }

    #[test]
    fn rejects_too_small_population() {
        let mut rng = Random::testing();
        let err = LocalPopulation::new(
            Counter(0),
            1,
            vec![0],
            10,
            1,
            0.0,
            0.0,
            10,
            Duration::ZERO,
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, EsError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_empty_mutation_ops() {
        let mut rng = Random::testing();
        let err = LocalPopulation::new(
            Counter(0),
            5,
            vec![],
            10,
            1,
            0.0,
            0.0,
            10,
            Duration::ZERO,
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, EsError::InvalidConfig(_)));
    }

    #[test]
    fn sort_is_ascending() {
        let mut p = pop(5);
        p.sort();
        for w in p.individuals().windows(2) {
            assert!(w[0].fitness <= w[1].fitness);
        }
    }

    #[test]
    fn mutation_counter_tracks_calls() {
        let mut p = pop(5);
        let mut rng = Random::testing();
        for _ in 0..7 {
            let mut s = p.get_mut(0).clone();
            LocalPopulation::mutate_tracked(&mut s, 0, &mut rng).unwrap();
            *p.get_mut(0) = s;
        }
        let total: u64 = p.get(0).mut_counts.values().sum();
        assert_eq!(total, 7);
    }

    #[test]
    fn op_pool_covers_every_configured_op() {
        let mut p = pop(5);
        let mut rng = Random::testing();
        p.shuffle_mutation_ops(&mut rng);
        let window = 10 * 2;
        let mut seen = HashMap::new();
        for _ in 0..window {
            *seen.entry(p.next_mutation_op()).or_insert(0) += 1;
        }
        for op in [0u32, 1u32] {
            assert!(*seen.get(&op).unwrap_or(&0) >= 9);
        }
    }

    #[test]
    fn clone_independence() {
        let mut rng = Random::testing();
        let mut a = Counter(5);
        let fa = a.fitness();
        let mut b = a.clone();
        b.mutate(1, &mut rng).unwrap();
        b.fitness();
        assert_eq!(a.fitness(), fa);
    }

    #[test]
    fn fitness2_gate_only_fires_below_threshold() {
        let mut p = pop(3);
        p.get_mut(0).fitness = 0.005;
        p.get_mut(0).individual.0 = 0;
        p.get_mut(1).fitness = 5.0;
        p.get_mut(1).individual.0 = 5;
        p.compute_fitness2();
        // Only individual 0 is under the 0.01 gate; fitness2() defaults to
        // INFINITY so it never displaces a genuinely-better primary best.
        assert_eq!(p.best_idx(), 0);
    }
}
