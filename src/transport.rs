//! The boundary between this crate's search logic and an actual
//! request/reply transport.
//!
//! The transport itself — framing, authentication, retry/backoff — is out
//! of scope here; [`Transport`] is the thin contract the node loop needs,
//! [`NcNodeAdapter`] is one concrete, real implementation of the node side
//! backed by `node_crunch`, the same crate a comparable Rust population
//! framework (`darwin-rs`) uses for this exact role, and [`ServerAdapter`]
//! serializes concurrent RPC handlers' access to the server's elite store
//! behind a single mutex.

use std::hash::Hash;
use std::sync::Mutex;

use serde_json::Value;

use crate::error::{EsError, TransportError};
use crate::individual::Individual;
use crate::random::Random;
use crate::server::{ServerElite, SubmitOutcome};

/// What a node gets back when it asks the server for a seed.
pub enum Seed<I> {
    Work(I),
    Done,
}

/// The contract a node loop needs from whatever carries bytes to and from
/// the server. Implementors own retry/backoff; [`TransportError::Unreachable`]
/// means the node should give up and exit.
pub trait Transport<I: Individual> {
    fn get_seed(&mut self) -> Result<Seed<I>, TransportError>;
    fn submit(&mut self, result: I) -> Result<(), TransportError>;
}

/// Encodes an individual as its document form, the same shape used for
/// checkpointing, so the wire format and the on-disk format stay in sync.
/// Delegates the actual byte-level framing to `node_crunch::nc_encode_data`,
/// the same call darwin-rs's node uses.
pub fn encode<I: Individual>(individual: &I) -> Result<Vec<u8>, TransportError> {
    node_crunch::nc_encode_data(&individual.to_document())
        .map_err(|e| TransportError::Codec(e.to_string()))
}

pub fn decode<I: Individual + Default>(bytes: &[u8]) -> Result<I, TransportError> {
    let doc: Value = node_crunch::nc_decode_data(bytes)
        .map_err(|e| TransportError::Codec(e.to_string()))?;
    let mut individual = I::default();
    individual
        .from_document(&doc)
        .map_err(|e| TransportError::Codec(e.to_string()))?;
    Ok(individual)
}

/// Adapter implementing [`node_crunch`]'s [`NCNode`] trait over a node-side
/// [`crate::strategy::Engine`], so the search core never has to know
/// node_crunch exists.
///
/// `node_crunch::NCNode::process_data_from_server` is the single RPC verb a
/// node answers: decode the server's seed, run one work unit, encode the
/// result. The retry/backoff/authentication machinery around that call is
/// entirely node_crunch's responsibility, started via
/// `node_crunch::NCNodeStarter`.
pub struct NcNodeAdapter<I> {
    pub engine: crate::strategy::Engine<I>,
    pub rng: crate::random::Random,
}

impl<I> node_crunch::NCNode for NcNodeAdapter<I>
where
    I: Individual + Default,
{
    fn process_data_from_server(&mut self, data: &[u8]) -> Result<Vec<u8>, node_crunch::NCError> {
        let doc: Value = node_crunch::nc_decode_data(data)?;
        let mut seed = I::default();
        // node_crunch's framing/authentication already guarantees this came
        // from our own server process; a malformed document at this point
        // means the wire format itself drifted, not a recoverable input.
        seed.from_document(&doc)
            .expect("seed document did not match the configured Individual's wire format");
        let best = self.engine.process_unit(&seed, &mut self.rng);
        node_crunch::nc_encode_data(&best.to_document())
    }
}

/// Serializes concurrent RPC dispatch onto a single [`ServerElite`] behind a
/// `Mutex`, per the server's "handles RPCs concurrently but serializes
/// access to the elite store" scheduling rule. `get_seed` holds the lock
/// just long enough to clone a seed; `submit` holds it for the full
/// admission rule.
pub struct ServerAdapter<I, N> {
    inner: Mutex<ServerElite<I, N>>,
}

impl<I, N> ServerAdapter<I, N>
where
    I: Individual,
    N: Eq + Hash,
{
    pub fn new(elite: ServerElite<I, N>) -> Self {
        ServerAdapter {
            inner: Mutex::new(elite),
        }
    }

    pub fn get_seed(&self, node_id: &N, rng: &mut Random) -> I
    where
        N: std::fmt::Display,
    {
        self.inner
            .lock()
            .expect("server elite mutex poisoned by a panicking request handler")
            .get_seed(node_id, rng)
    }

    pub fn submit(&self, node_id: N, candidate: I) -> SubmitOutcome {
        self.inner
            .lock()
            .expect("server elite mutex poisoned by a panicking request handler")
            .submit(node_id, candidate)
    }

    pub fn is_done(&self) -> bool {
        self.inner
            .lock()
            .expect("server elite mutex poisoned by a panicking request handler")
            .is_done()
    }

    pub fn save_final(&self) -> Result<(), EsError> {
        self.inner
            .lock()
            .expect("server elite mutex poisoned by a panicking request handler")
            .save_final()
    }
}
