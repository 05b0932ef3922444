//! EVM address normalization
//!
//! Every address that enters the analysis (recipients, contracts, configured
//! known-address lists) goes through [`normalize`] so that comparisons are
//! plain string equality on the canonical lowercase form.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::error::{Error, Result};

/// Length of a canonical address string (`0x` + 40 hex digits)
const ADDRESS_LEN: usize = 42;

/// Canonical lowercase 20-byte hex address
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        normalize(s)
    }
}

impl TryFrom<String> for Address {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        normalize(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn invalid(input: &str, reason: &str) -> Error {
    Error::InvalidAddress {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

/// Canonicalize a raw address string.
///
/// Trims whitespace, requires a `0x` prefix and 40 hex digits, and lowercases
/// the result. A string exactly one character too long has its trailing
/// character dropped; some upstream lists carry such a stray character.
/// Mixed-case checksums are accepted as-is and never verified.
pub fn normalize(raw: &str) -> Result<Address> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid(raw, "empty address"));
    }

    if !trimmed.starts_with("0x") && !trimmed.starts_with("0X") {
        return Err(invalid(raw, "missing 0x prefix"));
    }

    let candidate = match trimmed.len() {
        ADDRESS_LEN => trimmed,
        len if len == ADDRESS_LEN + 1 => match trimmed.char_indices().last() {
            Some((idx, _)) => &trimmed[..idx],
            None => trimmed,
        },
        len => {
            return Err(invalid(
                raw,
                &format!("expected {} characters, got {}", ADDRESS_LEN, len),
            ))
        }
    };

    let digits = &candidate[2..];
    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid(raw, "expected 40 hex digits"));
    }

    Ok(Address(format!("0x{}", digits.to_ascii_lowercase())))
}

/// Normalize a configured address list, dropping invalid entries and
/// duplicates while preserving first-seen order.
pub fn dedup_addresses<I, S>(raw: I) -> Vec<Address>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for entry in raw {
        let entry = entry.as_ref();
        match normalize(entry) {
            Ok(address) => {
                if seen.insert(address.clone()) {
                    out.push(address);
                }
            }
            Err(e) => warn!(address = %entry, error = %e, "Dropping invalid configured address"),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases_checksum() {
        let addr = normalize("  0xd15fE25eD0Dba12fE05e7029C88b10C25e8880E3 ").unwrap();
        assert_eq!(addr.as_str(), "0xd15fe25ed0dba12fe05e7029c88b10c25e8880e3");
    }

    #[test]
    fn test_normalize_strips_one_stray_char() {
        // 41 hex digits after the prefix
        let addr = normalize("0x4c79b8c9cB0BD62B047880603a9B0c734f1FF0FcF").unwrap();
        assert_eq!(addr.as_str(), "0x4c79b8c9cb0bd62b047880603a9b0c734f1ff0fc");
    }

    #[test]
    fn test_normalize_rejects_bad_input() {
        assert!(normalize("").is_err());
        assert!(normalize("   ").is_err());
        assert!(normalize("1986cc18d8ec757447254310d2604f85741aa732").is_err());
        assert!(normalize("0x1986cc18d8ec7574").is_err());
        assert!(normalize("0xzz86cc18d8ec757447254310d2604f85741aa732").is_err());
        assert!(normalize("0x1986cc18d8ec757447254310d2604f85741aa73200").is_err());
    }

    #[test]
    fn test_equality_is_case_insensitive() {
        let a: Address = "0x1986CC18D8EC757447254310D2604F85741AA732".parse().unwrap();
        let b: Address = "0x1986cc18d8ec757447254310d2604f85741aa732".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_dedup_preserves_first_seen_order() {
        let list = dedup_addresses([
            "0x8dc80a209a3362f0586e6c116973bb6908170c84",
            "0x1fc10ef15e041c5d3c54042e52eb0c54cb9b710c",
            "0x8DC80A209A3362F0586E6C116973BB6908170C84",
            "not-an-address",
            "0x1fc10ef15e041c5d3c54042e52eb0c54cb9b710c",
        ]);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].as_str(), "0x8dc80a209a3362f0586e6c116973bb6908170c84");
        assert_eq!(list[1].as_str(), "0x1fc10ef15e041c5d3c54042e52eb0c54cb9b710c");
    }

    #[test]
    fn test_serde_roundtrip_normalizes() {
        let addr: Address =
            serde_json::from_str(r#""0x6921B130D297CC43754AFBA22E5EAC0FBF8DB75B""#).unwrap();
        assert_eq!(
            serde_json::to_string(&addr).unwrap(),
            r#""0x6921b130d297cc43754afba22e5eac0fbf8db75b""#
        );
    }
}
