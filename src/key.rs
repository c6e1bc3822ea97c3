use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use std::str::FromStr;
use thiserror::Error;

const KEY_BITS: usize = 2048;

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("RSA error")]
    Rsa(#[from] rsa::Error),
    #[error("base64 decode error")]
    Base64(#[from] base64::DecodeError),
    #[error("decrypted password is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("unknown hash function {0:?}")]
    UnknownHashFunction(String),
}

/// OAEP digest used by the guest agent when encrypting the password.
/// The agent defaults to SHA-1 and echoes its choice in the `hashFunction`
/// field of the serial response.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum HashFunction {
    #[default]
    Sha1,
    Sha256,
    Sha512,
}

impl FromStr for HashFunction {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha1" => Ok(HashFunction::Sha1),
            "sha256" => Ok(HashFunction::Sha256),
            "sha512" => Ok(HashFunction::Sha512),
            _ => Err(KeyError::UnknownHashFunction(s.to_string())),
        }
    }
}

/// A fresh RSA key pair identifying one handshake run.
///
/// The key is held in memory only; the base64 modulus doubles as the
/// correlation id for matching the agent's serial response to this run.
pub struct HandshakeKey {
    private: RsaPrivateKey,
}

impl HandshakeKey {
    pub fn generate() -> Result<Self, KeyError> {
        let mut rng = OsRng;
        let private = RsaPrivateKey::new(&mut rng, KEY_BITS)?;
        Ok(Self { private })
    }

    /// Public modulus as big-endian bytes, base64-encoded.
    pub fn modulus_b64(&self) -> String {
        BASE64.encode(self.private.n().to_bytes_be())
    }

    /// Public exponent as minimal big-endian bytes, base64-encoded
    /// (`"AQAB"` for the usual 65537).
    pub fn exponent_b64(&self) -> String {
        BASE64.encode(self.private.e().to_bytes_be())
    }

    pub fn public_key(&self) -> RsaPublicKey {
        self.private.to_public_key()
    }

    /// Base64-decode `encrypted_b64` and decrypt it with OAEP padding.
    ///
    /// Padding or length errors propagate: they indicate a corrupted or
    /// mismatched ciphertext and must stay visible to the operator.
    pub fn decrypt_password(
        &self,
        encrypted_b64: &str,
        hash: HashFunction,
    ) -> Result<String, KeyError> {
        let ciphertext = BASE64.decode(encrypted_b64)?;
        let padding = match hash {
            HashFunction::Sha1 => Oaep::new::<Sha1>(),
            HashFunction::Sha256 => Oaep::new::<Sha256>(),
            HashFunction::Sha512 => Oaep::new::<Sha512>(),
        };
        let plaintext = self.private.decrypt(padding, &ciphertext)?;
        Ok(String::from_utf8(plaintext)?)
    }
}
