//! OpenSSL primitives behind XML Signature and XML Encryption.

mod errors;
mod keys;
pub mod rsa;
pub mod sym;
mod utils;

pub use errors::Error;
pub use keys::SecureBytes;
pub use utils::*;

use errors::CryptoResult;
use openssl::hash::{MessageDigest, hash};
use std::fmt;

use crate::xmlsec::algorithms;

/// Digest algorithms usable in a `ds:DigestMethod` and as the hash half of
/// an RSA signature method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlg {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlg {
    /// Resolve a `ds:DigestMethod` algorithm URI.
    pub fn from_digest_uri(uri: &str) -> Option<Self> {
        match uri {
            algorithms::SHA1 => Some(HashAlg::Sha1),
            algorithms::SHA256 => Some(HashAlg::Sha256),
            algorithms::SHA384 => Some(HashAlg::Sha384),
            algorithms::SHA512 => Some(HashAlg::Sha512),
            _ => None,
        }
    }

    pub fn digest_uri(self) -> &'static str {
        match self {
            HashAlg::Sha1 => algorithms::SHA1,
            HashAlg::Sha256 => algorithms::SHA256,
            HashAlg::Sha384 => algorithms::SHA384,
            HashAlg::Sha512 => algorithms::SHA512,
        }
    }

    pub fn hash(self, data: impl AsRef<[u8]>) -> CryptoResult<Vec<u8>> {
        Ok(hash(self.into(), data.as_ref())?.to_vec())
    }
}

impl From<HashAlg> for MessageDigest {
    fn from(hash_alg: HashAlg) -> Self {
        match hash_alg {
            HashAlg::Sha1 => MessageDigest::sha1(),
            HashAlg::Sha256 => MessageDigest::sha256(),
            HashAlg::Sha384 => MessageDigest::sha384(),
            HashAlg::Sha512 => MessageDigest::sha512(),
        }
    }
}

impl fmt::Display for HashAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.digest_uri())
    }
}
