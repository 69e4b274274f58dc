//! The JSON-loadable configuration document, mirroring every option a node
//! or server process can be started with.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EsError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EsConfig {
    pub secret_key: String,
    pub server_mode: bool,

    pub target_fitness: f64,
    pub target_fitness2: f64,

    pub result_filename: String,
    pub save_new_fitness: bool,
    pub allow_same_fitness: bool,
    pub share_only_best: bool,

    pub server_population_size: usize,
    pub node_population_size: usize,

    pub num_of_iterations: u64,
    pub num_of_mutations: u64,

    pub accept_new_best: bool,
    pub randomize_population: bool,
    pub randomize_count: u64,

    pub population_kind: u8,
    pub mutation_operations: Vec<u32>,

    pub min_num_ind: usize,

    pub sine_base: f64,
    pub sine_amplitude: f64,
    pub sine_frequency: f64,

    pub limit_range: f64,

    pub user_options: String,

    /// Surfaced so the early-exit heuristic and mutation-pool padding
    /// aren't magic constants buried in code.
    pub early_exit_sleep_secs: u64,
    pub mutation_pool_pad_factor: usize,
}

impl Default for EsConfig {
    fn default() -> Self {
        EsConfig {
            secret_key: String::new(),
            server_mode: false,
            target_fitness: 0.0,
            target_fitness2: 0.0,
            result_filename: "result.json".to_string(),
            save_new_fitness: false,
            allow_same_fitness: true,
            share_only_best: false,
            server_population_size: 10,
            node_population_size: 10,
            num_of_iterations: 100,
            num_of_mutations: 1,
            accept_new_best: true,
            randomize_population: false,
            randomize_count: 1,
            population_kind: 1,
            mutation_operations: vec![0],
            min_num_ind: 1,
            sine_base: 100.0,
            sine_amplitude: 50.0,
            sine_frequency: 0.01,
            limit_range: 5.0,
            user_options: String::new(),
            early_exit_sleep_secs: 5,
            mutation_pool_pad_factor: 10,
        }
    }
}

impl EsConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EsError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, EsError> {
        // Unknown keys are ignored by serde's default behavior; log at
        // debug so silently-typo'd options don't vanish unnoticed.
        let config: EsConfig = serde_json::from_str(text)?;
        config.validate()?;
        log::debug!("loaded configuration: population_kind={}", config.population_kind);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EsError> {
        if self.server_population_size < 2 {
            return Err(EsError::InvalidConfig(
                "server_population_size must be >= 2".into(),
            ));
        }
        if self.node_population_size < 2 {
            return Err(EsError::InvalidConfig(
                "node_population_size must be >= 2".into(),
            ));
        }
        if self.num_of_iterations < 1 {
            return Err(EsError::InvalidConfig("num_of_iterations must be >= 1".into()));
        }
        if self.num_of_mutations < 1 {
            return Err(EsError::InvalidConfig("num_of_mutations must be >= 1".into()));
        }
        if self.mutation_operations.is_empty() {
            return Err(EsError::InvalidConfig(
                "mutation_operations must be non-empty".into(),
            ));
        }
        if !(1..=11).contains(&self.population_kind) {
            return Err(EsError::InvalidConfig(format!(
                "population_kind must be in 1..=11, got {}",
                self.population_kind
            )));
        }
        Ok(())
    }

    pub fn early_exit_sleep(&self) -> Duration {
        Duration::from_secs(self.early_exit_sleep_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        EsConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_bad_population_kind() {
        let mut c = EsConfig::default();
        c.population_kind = 12;
        assert!(c.validate().is_err());
    }

    #[test]
    fn round_trips_through_json() {
        let c = EsConfig::default();
        let text = serde_json::to_string(&c).unwrap();
        let back = EsConfig::from_json_str(&text).unwrap();
        assert_eq!(back.node_population_size, c.node_population_size);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let text = r#"{"node_population_size": 4, "totally_unknown_option": 42}"#;
        let c = EsConfig::from_json_str(text).unwrap();
        assert_eq!(c.node_population_size, 4);
    }
}
