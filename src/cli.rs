//! A thin, hand-rolled overlay for command-line overrides of [`EsConfig`].
//!
//! Full CLI parsing (subcommands, shell completion, `--help` generation) is
//! explicitly out of scope for this crate; this only recognizes the flags
//! that mirror [`EsConfig`]'s fields and applies them on top of a
//! JSON-loaded configuration.

use crate::config::EsConfig;
use crate::error::EsError;

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub config_path: Option<String>,
    pub server: bool,
    pub target_fitness: Option<f64>,
    pub target_fitness2: Option<f64>,
    pub population_size: Option<usize>,
    pub num_of_mutations: Option<u64>,
    pub num_of_iterations: Option<u64>,
    pub population_kind: Option<u8>,
    pub randomize_population: bool,
    pub randomize_count: Option<u64>,
    pub mutation_operations: Option<Vec<u32>>,
    pub min_num_ind: Option<usize>,
    pub sine_base: Option<f64>,
    pub sine_amplitude: Option<f64>,
    pub sine_frequency: Option<f64>,
    pub limit_range: Option<f64>,
    pub user_options: Option<String>,
}

impl CliOverrides {
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, EsError> {
        let mut overrides = CliOverrides::default();
        let mut it = args.into_iter();
        while let Some(arg) = it.next() {
            let mut next_value = || {
                it.next().ok_or_else(|| {
                    EsError::InvalidConfig(format!("{arg} requires a value"))
                })
            };
            match arg.as_str() {
                "--config" => overrides.config_path = Some(next_value()?),
                "-s" | "--server" => overrides.server = true,
                "-f" | "--target-fitness" => {
                    overrides.target_fitness = Some(parse_f64(&arg, &next_value()?)?)
                }
                "--target-fitness2" => {
                    overrides.target_fitness2 = Some(parse_f64(&arg, &next_value()?)?)
                }
                "-p" | "--population-size" => {
                    overrides.population_size = Some(parse_usize(&arg, &next_value()?)?)
                }
                "-m" | "--num-of-mutations" => {
                    overrides.num_of_mutations = Some(parse_u64(&arg, &next_value()?)?)
                }
                "-i" | "--num-of-iterations" => {
                    overrides.num_of_iterations = Some(parse_u64(&arg, &next_value()?)?)
                }
                "-k" | "--population-kind" => {
                    overrides.population_kind = Some(parse_u8(&arg, &next_value()?)?)
                }
                "-r" | "--randomize-population" => overrides.randomize_population = true,
                "--randomize-count" => {
                    overrides.randomize_count = Some(parse_u64(&arg, &next_value()?)?)
                }
                "-o" | "--mutation-operations" => {
                    let raw = next_value()?;
                    let ops = raw
                        .split(',')
                        .map(|s| parse_u32(&arg, s))
                        .collect::<Result<Vec<_>, _>>()?;
                    overrides.mutation_operations = Some(ops);
                }
                "--min-num-ind" => {
                    overrides.min_num_ind = Some(parse_usize(&arg, &next_value()?)?)
                }
                "--sine-base" => overrides.sine_base = Some(parse_f64(&arg, &next_value()?)?),
                "--sine-amplitude" => {
                    overrides.sine_amplitude = Some(parse_f64(&arg, &next_value()?)?)
                }
                "--sine-frequency" => {
                    overrides.sine_frequency = Some(parse_f64(&arg, &next_value()?)?)
                }
                "--limit-range" => overrides.limit_range = Some(parse_f64(&arg, &next_value()?)?),
                "--user-options" => overrides.user_options = Some(next_value()?),
                other => {
                    log::debug!("ignoring unrecognized CLI argument: {other}");
                }
            }
        }
        Ok(overrides)
    }

    /// Applies overrides on top of a base configuration.
    pub fn apply(self, mut config: EsConfig) -> EsConfig {
        config.server_mode = config.server_mode || self.server;
        if let Some(v) = self.target_fitness {
            config.target_fitness = v;
        }
        if let Some(v) = self.target_fitness2 {
            config.target_fitness2 = v;
        }
        if let Some(v) = self.population_size {
            config.node_population_size = v;
        }
        if let Some(v) = self.num_of_mutations {
            config.num_of_mutations = v;
        }
        if let Some(v) = self.num_of_iterations {
            config.num_of_iterations = v;
        }
        if let Some(v) = self.population_kind {
            config.population_kind = v;
        }
        config.randomize_population = config.randomize_population || self.randomize_population;
        if let Some(v) = self.randomize_count {
            config.randomize_count = v;
        }
        if let Some(v) = self.mutation_operations {
            config.mutation_operations = v;
        }
        if let Some(v) = self.min_num_ind {
            config.min_num_ind = v;
        }
        if let Some(v) = self.sine_base {
            config.sine_base = v;
        }
        if let Some(v) = self.sine_amplitude {
            config.sine_amplitude = v;
        }
        if let Some(v) = self.sine_frequency {
            config.sine_frequency = v;
        }
        if let Some(v) = self.limit_range {
            config.limit_range = v;
        }
        if let Some(v) = self.user_options {
            config.user_options = v;
        }
        config
    }
}

fn parse_f64(flag: &str, value: &str) -> Result<f64, EsError> {
    value
        .parse()
        .map_err(|_| EsError::InvalidConfig(format!("{flag}: expected a float, got {value:?}")))
}

fn parse_u64(flag: &str, value: &str) -> Result<u64, EsError> {
    value
        .parse()
        .map_err(|_| EsError::InvalidConfig(format!("{flag}: expected an integer, got {value:?}")))
}

fn parse_u32(flag: &str, value: &str) -> Result<u32, EsError> {
    value
        .parse()
        .map_err(|_| EsError::InvalidConfig(format!("{flag}: expected an integer, got {value:?}")))
}

fn parse_u8(flag: &str, value: &str) -> Result<u8, EsError> {
    value
        .parse()
        .map_err(|_| EsError::InvalidConfig(format!("{flag}: expected an integer, got {value:?}")))
}

fn parse_usize(flag: &str, value: &str) -> Result<usize, EsError> {
    value
        .parse()
        .map_err(|_| EsError::InvalidConfig(format!("{flag}: expected an integer, got {value:?}")))
}
