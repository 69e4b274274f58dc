//! A minimal end-to-end demonstration: a bit-vector individual whose
//! fitness is the count of unset bits, driven in-process (no real
//! transport) through a handful of work units until the server's target is
//! met.
//!
//! Not a library module — this exists purely to give the framework
//! something runnable to exercise.

use std::time::Duration;

use evolusnake::config::EsConfig;
use evolusnake::error::EsError;
use evolusnake::individual::Individual;
use evolusnake::population::LocalPopulation;
use evolusnake::random::Random;
use evolusnake::server::ServerElite;
use evolusnake::strategy::{Engine, Kind};
use serde_json::{json, Value};

const BITS: usize = 64;

#[derive(Clone, Default)]
struct OneMax(Vec<bool>);

impl OneMax {
    fn new() -> Self {
        OneMax(vec![false; BITS])
    }
}

impl Individual for OneMax {
    fn randomize(&mut self, rng: &mut Random) {
        use rand::Rng;
        for b in &mut self.0 {
            *b = rng.gen_bool(0.5);
        }
    }

    fn mutate(&mut self, op: u32, rng: &mut Random) -> Result<(), EsError> {
        use rand::Rng;
        if op != 0 {
            return Err(EsError::UnknownMutationOp(op));
        }
        let i = rng.gen_range(0..self.0.len());
        self.0[i] = !self.0[i];
        Ok(())
    }

    fn fitness(&mut self) -> f64 {
        self.0.iter().filter(|set| !**set).count() as f64
    }

    fn accept_from_server(&mut self, other: &Self) {
        self.0 = other.0.clone();
    }

    fn actual_fitness(&self) -> f64 {
        self.0.iter().filter(|set| !**set).count() as f64
    }

    fn to_document(&self) -> Value {
        json!({ "bits": self.0 })
    }

    fn from_document(&mut self, doc: &Value) -> Result<(), EsError> {
        self.0 = doc["bits"]
            .as_array()
            .map(|a| a.iter().map(|v| v.as_bool().unwrap_or(false)).collect())
            .unwrap_or_else(|| vec![false; BITS]);
        Ok(())
    }
}

fn main() {
    env_logger::init();

    let config = EsConfig {
        node_population_size: 12,
        server_population_size: 6,
        num_of_iterations: 300,
        num_of_mutations: 1,
        population_kind: 1,
        mutation_operations: vec![0],
        target_fitness: 0.0,
        ..EsConfig::default()
    };

    let mut server_rng = Random::seeded(1);
    let mut server = ServerElite::<OneMax, u32>::new(
        OneMax::new(),
        config.server_population_size,
        config.target_fitness,
        config.target_fitness2,
        config.allow_same_fitness,
        config.share_only_best,
        false,
        "demos-onemax-result.json".to_string(),
        &mut server_rng,
    )
    .expect("valid demo configuration");

    let mut node_rng = Random::seeded(2);
    let population = LocalPopulation::new(
        OneMax::new(),
        config.node_population_size,
        config.mutation_operations.clone(),
        config.num_of_iterations,
        config.num_of_mutations,
        config.target_fitness,
        config.target_fitness2,
        config.mutation_pool_pad_factor,
        Duration::ZERO,
        &mut node_rng,
    )
    .expect("valid demo configuration");
    let kind = Kind::from_config(&config, &population).expect("valid demo configuration");
    let mut engine = Engine::new(kind, population);

    let mut units = 0;
    while !server.is_done() && units < 200 {
        let seed = server.get_seed(&0u32, &mut server_rng);
        let best = engine.process_unit(&seed, &mut node_rng);
        server.submit(0u32, best);
        units += 1;
    }

    println!(
        "converged after {units} work units, best fitness = {}",
        server.best_fitness()
    );
}
