use qms_types::{BatchRecord, FingerprintScope};

/// A single fingerprint item in its stable byte form.
///
/// Layout: the tag then each field, every component prefixed by its UTF-8
/// byte length as a little-endian `u64`. Length prefixes make the encoding
/// injective, so `("ab", "c")` and `("a", "bc")` never collide.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CanonicalItem {
    bytes: Vec<u8>,
}

impl CanonicalItem {
    pub fn new(tag: &str) -> Self {
        let mut item = Self { bytes: Vec::new() };
        item.push(tag);
        item
    }

    pub fn field(mut self, value: &str) -> Self {
        self.push(value);
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn push(&mut self, value: &str) {
        self.bytes
            .extend_from_slice(&(value.len() as u64).to_le_bytes());
        self.bytes.extend_from_slice(value.as_bytes());
    }
}

fn ids(tag: &str, values: &[String]) -> Vec<CanonicalItem> {
    values
        .iter()
        .map(|id| CanonicalItem::new(tag).field(id))
        .collect()
}

/// Anything the fingerprint engine can canonicalize into ordered items.
pub trait Fingerprintable {
    /// Items covered by `scope`, in the target's own order.
    fn canonical_items(&self, scope: FingerprintScope) -> Vec<CanonicalItem>;
}

impl Fingerprintable for BatchRecord {
    fn canonical_items(&self, scope: FingerprintScope) -> Vec<CanonicalItem> {
        let qc = || {
            self.qc_tests.iter().map(|t| {
                CanonicalItem::new("qc_test")
                    .field(&t.test_name)
                    .field(&t.test_result)
                    .field(&t.test_hash)
            })
        };
        match scope {
            FingerprintScope::QcTests => qc().collect(),
            FingerprintScope::Deviations => ids("deviation", &self.deviations),
            FingerprintScope::Capa => ids("capa", &self.capa),
            FingerprintScope::Oos => ids("oos", &self.oos_investigations),
            FingerprintScope::Record => {
                let manufacture = self.manufacture_date.format("%Y-%m-%d").to_string();
                let expiration = self.expiration_date.format("%Y-%m-%d").to_string();
                let mut items = vec![
                    CanonicalItem::new("batch_number").field(self.batch_number.as_str()),
                    CanonicalItem::new("manufacture_date").field(&manufacture),
                    CanonicalItem::new("expiration_date").field(&expiration),
                    CanonicalItem::new("release_status").field(self.release_status.as_str()),
                ];
                items.extend(qc());
                items.extend(ids("deviation", &self.deviations));
                items.extend(ids("capa", &self.capa));
                items.extend(ids("oos", &self.oos_investigations));
                items
            }
        }
    }
}
