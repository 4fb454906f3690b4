use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::error::TypeError;

/// How item order contributes to a fingerprint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FingerprintMode {
    /// Digest depends on content and on each item's position.
    OrderDependent,
    /// Digest depends on the multiset of items only.
    OrderIndependent,
}

impl FingerprintMode {
    /// Both modes, in display order.
    pub const ALL: [Self; 2] = [Self::OrderDependent, Self::OrderIndependent];

    /// Stable name, used in the `scope:mode:hex` text form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderDependent => "order-dependent",
            Self::OrderIndependent => "order-independent",
        }
    }
}

impl fmt::Display for FingerprintMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FingerprintMode {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "order-dependent" | "dependent" | "dep" => Ok(Self::OrderDependent),
            "order-independent" | "independent" | "indep" => Ok(Self::OrderIndependent),
            _ => Err(TypeError::UnknownVariant {
                what: "mode",
                input: s.to_string(),
            }),
        }
    }
}

/// Which part of a batch record a fingerprint covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintScope {
    /// Every field of the record, scalars first, then each collection.
    Record,
    QcTests,
    Deviations,
    Capa,
    Oos,
}

impl FingerprintScope {
    /// Every scope, with the whole record first.
    pub const ALL: [Self; 5] = [
        Self::Record,
        Self::QcTests,
        Self::Deviations,
        Self::Capa,
        Self::Oos,
    ];

    /// Stable name, used on the command line and in the text form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Record => "record",
            Self::QcTests => "qc_tests",
            Self::Deviations => "deviations",
            Self::Capa => "capa",
            Self::Oos => "oos",
        }
    }
}

impl fmt::Display for FingerprintScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FingerprintScope {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "record" => Ok(Self::Record),
            "qc_tests" | "qc" => Ok(Self::QcTests),
            "deviations" => Ok(Self::Deviations),
            "capa" => Ok(Self::Capa),
            "oos" | "oos_investigations" => Ok(Self::Oos),
            _ => Err(TypeError::UnknownVariant {
                what: "scope",
                input: s.to_string(),
            }),
        }
    }
}

/// A computed content fingerprint together with how it was computed.
///
/// Two fingerprints are only comparable when mode and scope agree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    pub digest: Digest,
    pub mode: FingerprintMode,
    pub scope: FingerprintScope,
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.scope, self.mode, self.digest)
    }
}

impl FromStr for Fingerprint {
    type Err = TypeError;

    /// Parse the `scope:mode:hex` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(3, ':');
        let (Some(scope), Some(mode), Some(digest)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(TypeError::UnknownVariant {
                what: "encoding",
                input: s.to_string(),
            });
        };
        Ok(Self {
            scope: scope.parse()?,
            mode: mode.parse()?,
            digest: digest.parse()?,
        })
    }
}
