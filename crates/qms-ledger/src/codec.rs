//! Wire form of events on the ledger.
//!
//! Each stream item's data is the hex encoding of a JSON envelope
//! `{"v": <version>, "event": {...}}`. The version lets the event schema
//! evolve without reinterpreting items already on the ledger.

use qms_types::BatchEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LedgerError;

pub const ENVELOPE_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    v: u32,
    event: &'a BatchEvent,
}

#[derive(Deserialize)]
struct EnvelopeRaw {
    v: u32,
    event: Value,
}

/// Encode an event as hex-encoded JSON envelope bytes.
pub fn encode_event(event: &BatchEvent) -> Result<String, LedgerError> {
    let envelope = EnvelopeRef {
        v: ENVELOPE_VERSION,
        event,
    };
    let json = serde_json::to_vec(&envelope)
        .map_err(|e| LedgerError::Decode(format!("cannot serialize event: {e}")))?;
    Ok(hex::encode(json))
}

/// Decode a hex payload produced by [`encode_event`].
pub fn decode_event(payload: &str) -> Result<BatchEvent, LedgerError> {
    let bytes = hex::decode(payload.trim())
        .map_err(|e| LedgerError::Decode(format!("payload is not hex: {e}")))?;
    let envelope: EnvelopeRaw = serde_json::from_slice(&bytes)
        .map_err(|e| LedgerError::Decode(format!("payload is not an event envelope: {e}")))?;
    if envelope.v != ENVELOPE_VERSION {
        return Err(LedgerError::Decode(format!(
            "unsupported envelope version {} (expected {ENVELOPE_VERSION})",
            envelope.v
        )));
    }
    serde_json::from_value(envelope.event)
        .map_err(|e| LedgerError::Decode(format!("unrecognized event: {e}")))
}

#[cfg(test)]
mod tests {
    use qms_types::{parse_calendar_date, ReleaseStatus};
    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_is_versioned_hex_json() {
        let event = BatchEvent::StatusUpdated {
            status: ReleaseStatus::Hold,
        };
        let payload = encode_event(&event).unwrap();
        let json: Value = serde_json::from_slice(&hex::decode(&payload).unwrap()).unwrap();
        assert_eq!(
            json,
            json!({"v": 1, "event": {"kind": "status_updated", "status": "hold"}})
        );
        assert_eq!(decode_event(&payload).unwrap(), event);
    }

    #[test]
    fn creation_dates_survive_the_wire() {
        let event = BatchEvent::Created {
            manufacture_date: parse_calendar_date("2023-10-01").unwrap(),
            expiration_date: parse_calendar_date("2025-10-01").unwrap(),
        };
        assert_eq!(decode_event(&encode_event(&event).unwrap()).unwrap(), event);
    }

    #[test]
    fn rejects_future_envelope_versions() {
        let payload = hex::encode(br#"{"v":2,"event":{"kind":"capa_appended","id":"C"}}"#);
        let err = decode_event(&payload).unwrap_err();
        assert!(matches!(err, LedgerError::Decode(msg) if msg.contains("version 2")));
    }

    #[test]
    fn rejects_non_envelope_payloads() {
        // A full-record snapshot as written by older tooling is not an event.
        let legacy = hex::encode(br#"{"batch_number":"B1","qc_tests":[]}"#);
        assert!(matches!(decode_event(&legacy), Err(LedgerError::Decode(_))));
        assert!(matches!(decode_event("not-hex"), Err(LedgerError::Decode(_))));
    }
}
