//! Cryptographic primitives for dimgur.
//!
//! Wallet addresses are base58-encoded Ed25519 public keys, the same
//! grammar Solana wallets use. Signatures are detached, 64 bytes, base58.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Raw public key length.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Raw detached signature length.
pub const SIGNATURE_LEN: usize = 64;

/// A wallet address: a base58 Ed25519 public key that decodes to a valid
/// curve point.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress([u8; PUBLIC_KEY_LEN]);

impl WalletAddress {
    /// Parse a base58 address.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| CoreError::InvalidAddress(format!("bad base58: {e}")))?;
        let bytes: [u8; PUBLIC_KEY_LEN] = bytes.try_into().map_err(|v: Vec<u8>| {
            CoreError::InvalidAddress(format!(
                "expected {PUBLIC_KEY_LEN} bytes, got {}",
                v.len()
            ))
        })?;
        Self::from_bytes(bytes)
    }

    /// Create from raw bytes, checking that they form a curve point.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LEN]) -> Result<Self, CoreError> {
        VerifyingKey::from_bytes(&bytes)
            .map_err(|_| CoreError::InvalidAddress("not an ed25519 point".into()))?;
        Ok(Self(bytes))
    }

    pub const fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    fn verifying_key(&self) -> Result<VerifyingKey, CoreError> {
        VerifyingKey::from_bytes(&self.0)
            .map_err(|_| CoreError::InvalidAddress("not an ed25519 point".into()))
    }
}

impl fmt::Debug for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletAddress({})", self.to_base58())
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl FromStr for WalletAddress {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<WalletAddress> for String {
    fn from(addr: WalletAddress) -> Self {
        addr.to_base58()
    }
}

/// A 64-byte detached Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletSignature(pub [u8; SIGNATURE_LEN]);

impl WalletSignature {
    /// Parse a base58 signature.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| CoreError::MalformedSignature(format!("bad base58: {e}")))?;
        let bytes: [u8; SIGNATURE_LEN] = bytes.try_into().map_err(|v: Vec<u8>| {
            CoreError::MalformedSignature(format!(
                "expected {SIGNATURE_LEN} bytes, got {}",
                v.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    pub const fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl fmt::Debug for WalletSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletSig({}...)", &hex::encode(self.0)[..16])
    }
}

impl fmt::Display for WalletSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl TryFrom<String> for WalletSignature {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<WalletSignature> for String {
    fn from(sig: WalletSignature) -> Self {
        sig.to_base58()
    }
}

/// Verify a detached signature over `message`.
///
/// Returns `Ok(false)` for a well-formed signature that does not match.
pub fn verify_detached(
    address: &WalletAddress,
    message: &[u8],
    signature: &WalletSignature,
) -> Result<bool, CoreError> {
    let key = address.verifying_key()?;
    let sig = Signature::from_bytes(&signature.0);
    Ok(key.verify(message, &sig).is_ok())
}

/// Verify a base58 signature over a UTF-8 message for a base58 address.
///
/// Errors only on malformed input: `InvalidAddress` for the key,
/// `MalformedSignature` for the signature encoding.
pub fn verify_signature(
    signature_b58: &str,
    message: &str,
    address_b58: &str,
) -> Result<bool, CoreError> {
    let address = WalletAddress::parse(address_b58)?;
    let signature = WalletSignature::parse(signature_b58)?;
    verify_detached(&address, message.as_bytes(), &signature)
}

/// A wallet keypair. Stands in for the browser wallet in tests and tools.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let signing_key = SigningKey::generate(&mut rng);
        Self { signing_key }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// The wallet address of this keypair.
    pub fn address(&self) -> WalletAddress {
        WalletAddress(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> WalletSignature {
        let sig = self.signing_key.sign(message);
        WalletSignature(sig.to_bytes())
    }

    /// Get the raw seed bytes (secret key material).
    pub fn seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.address())
    }
}
