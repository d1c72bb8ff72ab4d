use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const PUBLIC_KEY_BYTE_COUNT: usize = 32;

/// The address an output is paid to: the raw bytes of an Ed25519 verifying key.
/// The bytes are not checked to be a valid curve point here. A malformed key simply never
/// verifies a signature, so an output locked to it is unspendable.
#[derive(Debug, Copy, Clone, Hash, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd)]
pub struct PublicKey([u8; PUBLIC_KEY_BYTE_COUNT]);

impl PublicKey {
    pub const fn new(raw_bytes: [u8; PUBLIC_KEY_BYTE_COUNT]) -> Self {
        Self(raw_bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_BYTE_COUNT] {
        &self.0
    }

    pub fn from_hex(s: &str) -> Result<Self, String> {
        let bytes = hex::decode(s).map_err(|e| e.to_string())?;
        if bytes.len() != PUBLIC_KEY_BYTE_COUNT {
            return Err(format!(
                "Invalid public key length. Expected: {} but got: {} in: {}",
                PUBLIC_KEY_BYTE_COUNT,
                bytes.len(),
                s
            ));
        }
        let mut raw_bytes = [0; PUBLIC_KEY_BYTE_COUNT];
        raw_bytes.copy_from_slice(&bytes);
        Ok(Self(raw_bytes))
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
