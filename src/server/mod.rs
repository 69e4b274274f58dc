//! The server-side elite store: a small sorted population of the best
//! candidates seen so far, with admission, hand-out, termination, and
//! checkpointing.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Instant;

use crate::checkpoint;
use crate::error::EsError;
use crate::individual::Individual;
use crate::random::Random;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Ignored,
    Rejected,
    Admitted,
    NewBest,
    Target2Met,
}

pub struct ServerElite<I, N> {
    elite: Vec<I>,
    fitnesses: Vec<f64>,

    target_fitness: f64,
    target_fitness2: f64,
    allow_duplicate_fitness: bool,
    share_only_best: bool,
    save_every_improvement: bool,
    result_path: String,

    improvement_count: u64,
    per_node_accept_count: HashMap<N, u64>,
    target2_met: bool,
    start_time: Instant,
}

#[allow(clippy::too_many_arguments)]
impl<I, N> ServerElite<I, N>
where
    I: Individual,
    N: Eq + Hash,
{
    pub fn new(
        seed: I,
        size: usize,
        target_fitness: f64,
        target_fitness2: f64,
        allow_duplicate_fitness: bool,
        share_only_best: bool,
        save_every_improvement: bool,
        result_path: String,
        rng: &mut Random,
    ) -> Result<Self, EsError> {
        if size < 2 {
            return Err(EsError::InvalidConfig(format!(
                "server_population_size must be >= 2, got {size}"
            )));
        }

        let mut elite = Vec::with_capacity(size);
        let mut fitnesses = Vec::with_capacity(size);
        for _ in 0..size {
            let mut ind = seed.clone();
            ind.randomize(rng);
            let f = ind.fitness();
            elite.push(ind);
            fitnesses.push(f);
        }
        let mut server = ServerElite {
            elite,
            fitnesses,
            target_fitness,
            target_fitness2,
            allow_duplicate_fitness,
            share_only_best,
            save_every_improvement,
            result_path,
            improvement_count: 0,
            per_node_accept_count: HashMap::new(),
            target2_met: false,
            start_time: Instant::now(),
        };
        server.sort();
        Ok(server)
    }

    fn sort(&mut self) {
        let mut indices: Vec<usize> = (0..self.elite.len()).collect();
        indices.sort_by(|&a, &b| self.fitnesses[a].total_cmp(&self.fitnesses[b]));
        let elite: Vec<I> = indices.iter().map(|&i| self.elite[i].clone()).collect();
        let fitnesses: Vec<f64> = indices.iter().map(|&i| self.fitnesses[i]).collect();
        self.elite = elite;
        self.fitnesses = fitnesses;
    }

    pub fn best(&self) -> &I {
        &self.elite[0]
    }

    pub fn best_fitness(&self) -> f64 {
        self.fitnesses[0]
    }

    /// `node_id` never influences which seed is handed out; it is logged
    /// only, as a request trace.
    pub fn get_seed(&self, node_id: &N, rng: &mut Random) -> I
    where
        N: std::fmt::Display,
    {
        log::debug!("seed requested by node {node_id}");
        if self.share_only_best {
            self.elite[0].clone()
        } else {
            use rand::Rng;
            let idx = rng.gen_range(0..self.elite.len());
            self.elite[idx].clone()
        }
    }

    pub fn submit(&mut self, node_id: N, mut candidate: I) -> SubmitOutcome {
        if self.target2_met {
            return SubmitOutcome::Ignored;
        }

        let fitness = candidate.actual_fitness();

        // fitness2() may be an expensive secondary evaluation (e.g. a
        // neural-net validation pass); only ever invoked once the primary
        // objective is already close to converged, mirroring
        // `LocalPopulation::compute_fitness2`'s own gate.
        if fitness < 0.01 {
            let fitness2 = candidate.fitness2();
            if fitness2 < self.target_fitness2 {
                self.target2_met = true;
                candidate.on_new_best();
                self.elite[0] = candidate;
                self.fitnesses[0] = fitness;
                log::info!("target2 met: fitness2={fitness2:.6}");
                return SubmitOutcome::Target2Met;
            }
        }

        let worst = *self.fitnesses.last().expect("elite is never empty");
        if fitness >= worst {
            return SubmitOutcome::Rejected;
        }
        if !self.allow_duplicate_fitness && self.fitnesses.iter().any(|&f| f == fitness) {
            return SubmitOutcome::Rejected;
        }

        let prior_best = self.fitnesses[0];
        let last = self.elite.len() - 1;
        self.elite[last] = candidate.clone();
        self.fitnesses[last] = fitness;
        self.sort();

        if self.fitnesses[0] < prior_best {
            self.improvement_count += 1;
            *self.per_node_accept_count.entry(node_id).or_insert(0) += 1;
            candidate.on_new_best();
            log::info!(
                "new best: fitness={:.6} (improvement #{})",
                self.fitnesses[0], self.improvement_count
            );
            if self.save_every_improvement {
                let path = format!("{}_{}", self.improvement_count, self.result_path);
                if let Err(e) = checkpoint::write_checkpoint(&path, &self.elite[0], self.fitnesses[0], f64::INFINITY) {
                    log::warn!("failed to write numbered checkpoint {path}: {e}");
                }
            }
            SubmitOutcome::NewBest
        } else {
            SubmitOutcome::Admitted
        }
    }

    pub fn is_done(&self) -> bool {
        self.fitnesses[0] <= self.target_fitness || self.target2_met
    }

    pub fn save_final(&self) -> Result<(), EsError> {
        log::info!(
            "saving final result after {:.1}s, fitness={:.6}",
            self.start_time.elapsed().as_secs_f64(),
            self.fitnesses[0]
        );
        checkpoint::write_checkpoint(&self.result_path, &self.elite[0], self.fitnesses[0], f64::INFINITY)
    }

    pub fn accept_count(&self, node_id: &N) -> u64 {
        *self.per_node_accept_count.get(node_id).unwrap_or(&0)
    }
}
