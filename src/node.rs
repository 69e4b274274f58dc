//! The node's cooperative, single-threaded request/reply loop.
//!
//! One RPC is ever outstanding at a time. There is no concurrency inside a
//! node: the `Engine` it owns runs to completion on every work unit before
//! the next `get_seed` is issued.

use crate::error::{EsError, TransportError};
use crate::individual::Individual;
use crate::random::Random;
use crate::strategy::Engine;
use crate::transport::{Seed, Transport};

pub struct NodeLoop<I, T> {
    engine: Engine<I>,
    transport: T,
    rng: Random,
}

impl<I, T> NodeLoop<I, T>
where
    I: Individual,
    T: Transport<I>,
{
    pub fn new(engine: Engine<I>, transport: T, rng: Random) -> Self {
        NodeLoop {
            engine,
            transport,
            rng,
        }
    }

    /// Runs until the server signals completion or the transport gives up.
    pub fn run(&mut self) -> Result<(), EsError> {
        loop {
            let seed = match self.transport.get_seed() {
                Ok(Seed::Work(seed)) => seed,
                Ok(Seed::Done) => {
                    log::info!("server signaled completion, exiting");
                    return Ok(());
                }
                Err(TransportError::Unreachable(msg)) => {
                    log::error!("transport unreachable, giving up: {msg}");
                    return Err(EsError::Transport(TransportError::Unreachable(msg)));
                }
                Err(e) => {
                    log::warn!("transient transport error, retrying next unit: {e}");
                    continue;
                }
            };

            let best = self.engine.process_unit(&seed, &mut self.rng);

            if let Err(e) = self.transport.submit(best) {
                log::warn!("failed to submit result: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::LocalPopulation;
    use crate::strategy::Kind;
    use serde_json::{json, Value};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct Counter(u32);

    impl Individual for Counter {
        fn randomize(&mut self, rng: &mut Random) {
            use rand::Rng;
            self.0 = rng.gen_range(0..100);
        }
        fn mutate(&mut self, op: u32, _rng: &mut Random) -> Result<(), EsError> {
            if op != 0 {
                return Err(EsError::UnknownMutationOp(op));
            }
            self.0 = self.0.saturating_sub(1);
            Ok(())
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

    struct FixedUnitsTransport {
        remaining: u32,
        last_submitted: Option<Counter>,
    }

    impl Transport<Counter> for FixedUnitsTransport {
        fn get_seed(&mut self) -> Result<Seed<Counter>, TransportError> {
            if self.remaining == 0 {
                Ok(Seed::Done)
            } else {
                self.remaining -= 1;
                Ok(Seed::Work(Counter(50)))
            }
        }

        fn submit(&mut self, result: Counter) -> Result<(), TransportError> {
            self.last_submitted = Some(result);
            Ok(())
        }
    }

    #[test]
    fn exits_cleanly_when_server_signals_done() {
        let mut rng = Random::testing();
        let population = LocalPopulation::new(
            Counter(0),
            4,
            vec![0],
            20,
            1,
            0.0,
            0.0,
            10,
            Duration::ZERO,
            &mut rng,
        )
        .unwrap();
        let engine = Engine::new(Kind::PerSlotHillClimb, population);
        let transport = FixedUnitsTransport {
            remaining: 3,
            last_submitted: None,
        };
        let mut node = NodeLoop::new(engine, transport, Random::testing());
        node.run().unwrap();
        assert_eq!(node.transport.remaining, 0);
        assert!(node.transport.last_submitted.is_some());
    }
}
