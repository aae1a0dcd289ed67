//! Signature engine.
//!
//! Keys and signatures travel as standard base64 text: the private key is the
//! 32-byte Ed25519 seed, the public key the 32-byte verifying key and the
//! signature the 64-byte Ed25519 signature. Text is signed as UTF-8 bytes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::constants::{PUBKEY_SIZE, SECRET_KEY_SIZE, SIGNATURE_SIZE};
use crate::error::IdentityError;

/// A local signing identity. The private key never leaves this struct except
/// through [`Identity::private_key`].
#[derive(Clone)]
pub struct Identity {
    signing_key: SigningKey,
}

impl Identity {
    /// Generate a new random identity
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Restore an identity from its exported private key text
    pub fn from_private_key(private_key: &str) -> Result<Self, IdentityError> {
        let secret: [u8; SECRET_KEY_SIZE] = decode_fixed(private_key.trim())?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&secret),
        })
    }

    /// Exportable private key text
    pub fn private_key(&self) -> String {
        STANDARD.encode(self.signing_key.as_bytes())
    }

    /// Public key text matching [`Identity::private_key`]
    pub fn public_key(&self) -> String {
        STANDARD.encode(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign `text`, returning the base64 signature
    pub fn sign(&self, text: &str) -> String {
        let signature: Signature = self.signing_key.sign(text.as_bytes());
        STANDARD.encode(signature.to_bytes())
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// Generate a fresh key pair and return its private key text.
pub fn generate_key_pair() -> String {
    Identity::generate().private_key()
}

/// Derive the public key text from a private key text.
pub fn public_key_of(private_key: &str) -> Result<String, IdentityError> {
    Ok(Identity::from_private_key(private_key)?.public_key())
}

/// Sign `text` with a private key text.
pub fn sign(private_key: &str, text: &str) -> Result<String, IdentityError> {
    Ok(Identity::from_private_key(private_key)?.sign(text))
}

/// Verify a base64 signature over `text` against a base64 public key.
///
/// Malformed keys or signatures verify as `false`; this never errors.
pub fn verify(public_key: &str, signature: &str, text: &str) -> bool {
    let Ok(key_bytes) = decode_fixed::<PUBKEY_SIZE>(public_key.trim()) else {
        return false;
    };
    let Ok(sig_bytes) = decode_fixed::<SIGNATURE_SIZE>(signature.trim()) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let signature = Signature::from_bytes(&sig_bytes);
    verifying_key.verify(text.as_bytes(), &signature).is_ok()
}

fn decode_fixed<const N: usize>(text: &str) -> Result<[u8; N], IdentityError> {
    let bytes = STANDARD.decode(text)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| IdentityError::InvalidKeyLength {
            expected: N,
            got: bytes.len(),
        })
}
