use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Error type for content digest operations
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("Invalid digest format: {0}")]
    InvalidFormat(String),
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("Digest mismatch: expected {expected}, actual {actual}")]
    Mismatch { expected: String, actual: String },
}

/// An OCI content digest, `sha256:` followed by 64 lowercase hex characters.
///
/// Every blob's identity is the digest of its own bytes; a digest is never
/// accepted from outside without passing through [`OciDigest::from_str`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OciDigest {
    algorithm: String,
    hex: String,
}

impl OciDigest {
    /// Compute the digest of `content`. Deterministic, total, no failure mode.
    pub fn from_content(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self {
            algorithm: "sha256".to_string(),
            hex: hex::encode(hasher.finalize()),
        }
    }

    /// Get the algorithm part of the digest
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Get the hex part of the digest
    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for OciDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

impl FromStr for OciDigest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((algorithm, hex)) = s.split_once(':') else {
            return Err(DigestError::InvalidFormat(s.to_string()));
        };

        // Currently only sha256 is supported
        if algorithm != "sha256" {
            return Err(DigestError::UnsupportedAlgorithm(algorithm.to_string()));
        }

        if hex.len() != 64
            || !hex
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        {
            return Err(DigestError::InvalidFormat(s.to_string()));
        }

        Ok(OciDigest {
            algorithm: algorithm.to_string(),
            hex: hex.to_string(),
        })
    }
}

impl serde::Serialize for OciDigest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for OciDigest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        OciDigest::from_str(&s).map_err(serde::de::Error::custom)
    }
}
