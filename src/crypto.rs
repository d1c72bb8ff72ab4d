use crate::PublicKey;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

pub const SEED_BYTE_COUNT: usize = 32;

/// The signature primitive that transaction validation relies on.
pub struct Crypto;

impl Crypto {
    /// Returns whether `signature` is a valid Ed25519 signature of `message` under `public_key`.
    /// Malformed keys and signatures of the wrong length are reported as invalid signatures.
    pub fn verify_signature(public_key: &PublicKey, message: &[u8], signature: &[u8]) -> bool {
        let verifying_key = match VerifyingKey::from_bytes(public_key.as_bytes()) {
            Ok(verifying_key) => verifying_key,
            Err(_) => return false,
        };
        let signature = match Signature::from_slice(signature) {
            Ok(signature) => signature,
            Err(_) => return false,
        };
        verifying_key.verify_strict(message, &signature).is_ok()
    }
}

/// A signing key together with the public key that outputs are paid to.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generates a new key pair from the operating system's randomness.
    pub fn generate() -> Self {
        let mut csprng = OsRng;
        Self {
            signing_key: SigningKey::generate(&mut csprng),
        }
    }

    /// Derives the key pair from the 32-byte secret seed.
    pub fn from_seed(seed: &[u8; SEED_BYTE_COUNT]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn from_hex_seed(s: &str) -> Result<Self, String> {
        let bytes = hex::decode(s).map_err(|e| e.to_string())?;
        if bytes.len() != SEED_BYTE_COUNT {
            return Err(format!(
                "Invalid seed length. Expected: {} but got: {}",
                SEED_BYTE_COUNT,
                bytes.len()
            ));
        }
        let mut seed = [0; SEED_BYTE_COUNT];
        seed.copy_from_slice(&bytes);
        Ok(Self::from_seed(&seed))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::new(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}
