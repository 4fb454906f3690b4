use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use qms_types::{BatchEvent, BatchKey, SequencedEvent};

use crate::codec::{decode_event, encode_event};
use crate::error::LedgerError;
use crate::traits::{LedgerReader, LedgerWriter};

/// In-memory ledger for tests, local demos, and embedding.
///
/// Stores the same hex envelopes the RPC adapter puts on the wire, so every
/// read goes through the real decoder. Sequence markers are 1-based
/// positions within each key's stream.
#[derive(Default)]
pub struct InMemoryLedger {
    streams: RwLock<HashMap<BatchKey, Vec<String>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an already-encoded payload, bypassing the encoder. Lets tests
    /// model foreign or corrupted stream items.
    pub fn publish_raw(&self, key: &BatchKey, payload: impl Into<String>) -> Result<u64, LedgerError> {
        let mut streams = self.streams.write().map_err(|_| poisoned())?;
        let stream = streams.entry(key.clone()).or_default();
        stream.push(payload.into());
        Ok(stream.len() as u64)
    }

    pub fn event_count(&self, key: &BatchKey) -> Result<usize, LedgerError> {
        let streams = self.streams.read().map_err(|_| poisoned())?;
        Ok(streams.get(key).map_or(0, Vec::len))
    }
}

impl LedgerWriter for InMemoryLedger {
    fn publish(&self, key: &BatchKey, event: &BatchEvent) -> Result<u64, LedgerError> {
        let seq = self.publish_raw(key, encode_event(event)?)?;
        tracing::debug!(key = %key, seq, kind = %event.kind(), "published event");
        Ok(seq)
    }
}

impl LedgerReader for InMemoryLedger {
    fn retrieve_all(&self, key: &BatchKey) -> Result<Vec<SequencedEvent>, LedgerError> {
        let streams = self.streams.read().map_err(|_| poisoned())?;
        let Some(stream) = streams.get(key) else {
            return Ok(Vec::new());
        };
        stream
            .iter()
            .enumerate()
            .map(|(index, payload)| Ok(SequencedEvent::new(index as u64 + 1, decode_event(payload)?)))
            .collect()
    }

    fn list_keys(&self) -> Result<BTreeSet<BatchKey>, LedgerError> {
        let streams = self.streams.read().map_err(|_| poisoned())?;
        Ok(streams.keys().cloned().collect())
    }
}

fn poisoned() -> LedgerError {
    LedgerError::Connection("in-memory ledger lock poisoned".into())
}
