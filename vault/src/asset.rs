//! # Asset & Account Identifiers
//!
//! Assets and account holders share one identifier type: a 20-byte
//! [`Address`]. Two addresses are reserved:
//!
//! - [`Address::ZERO`] — the null address. Never a valid asset or
//!   recipient; operations naming it are rejected before any state change.
//! - [`Address::NATIVE`] — the sentinel (`0xeeee…eeee`) standing for the
//!   chain's native currency rather than an external token. Deposits of
//!   this "asset" arrive as value attached to the call instead of being
//!   pulled through the token adapter.
//!
//! Addresses serialize as `0x`-prefixed hex strings, which also makes
//! them usable as JSON map keys.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A 20-byte asset or account identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 20]);

impl Address {
    /// The null address. Rejected everywhere an asset or recipient is named.
    pub const ZERO: Address = Address([0u8; 20]);

    /// The native-currency sentinel: every byte `0xee`.
    pub const NATIVE: Address = Address([0xee; 20]);

    /// Creates an address from raw bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Returns the raw 20-byte identifier.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns `true` if this is the null address.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Returns `true` if this is the native-currency sentinel.
    pub fn is_native(&self) -> bool {
        *self == Self::NATIVE
    }

    /// Returns the `0x`-prefixed hex encoding.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parses a hex-encoded address, with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)?;
        if bytes.len() != 20 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}...)", &self.to_hex()[..10])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// Serialized as a hex string rather than a byte array so that
// `HashMap<Address, _>` produces a plain JSON object.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
