use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::crypto::rsa::{self, RsaPadding, RsaPrivateKey, RsaPublicKey};
use crate::crypto::sym::Cipher;
use crate::crypto::{HashAlg, SecureBytes};
use crate::error::{Error, Result};
use crate::xmlsec::algorithms;

/// Algorithms a [`SecurityKey`] can be typed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    RsaSha1,
    RsaSha256,
    RsaSha384,
    RsaSha512,
    RsaOaepMgf1p,
    Rsa15,
    Aes128Cbc,
    Aes192Cbc,
    Aes256Cbc,
    Aes128Gcm,
    Aes256Gcm,
}

impl Algorithm {
    pub fn uri(self) -> &'static str {
        match self {
            Algorithm::RsaSha1 => algorithms::RSA_SHA1,
            Algorithm::RsaSha256 => algorithms::RSA_SHA256,
            Algorithm::RsaSha384 => algorithms::RSA_SHA384,
            Algorithm::RsaSha512 => algorithms::RSA_SHA512,
            Algorithm::RsaOaepMgf1p => algorithms::RSA_OAEP_MGF1P,
            Algorithm::Rsa15 => algorithms::RSA_1_5,
            Algorithm::Aes128Cbc => algorithms::AES128_CBC,
            Algorithm::Aes192Cbc => algorithms::AES192_CBC,
            Algorithm::Aes256Cbc => algorithms::AES256_CBC,
            Algorithm::Aes128Gcm => algorithms::AES128_GCM,
            Algorithm::Aes256Gcm => algorithms::AES256_GCM,
        }
    }

    /// Digest used when this is a signature algorithm
    pub fn hash_alg(self) -> Option<HashAlg> {
        match self {
            Algorithm::RsaSha1 => Some(HashAlg::Sha1),
            Algorithm::RsaSha256 => Some(HashAlg::Sha256),
            Algorithm::RsaSha384 => Some(HashAlg::Sha384),
            Algorithm::RsaSha512 => Some(HashAlg::Sha512),
            _ => None,
        }
    }

    /// Padding used when this is a key transport algorithm
    pub fn padding(self) -> Option<RsaPadding> {
        match self {
            Algorithm::RsaOaepMgf1p => Some(RsaPadding::Pkcs1Oaep),
            Algorithm::Rsa15 => Some(RsaPadding::Pkcs1),
            _ => None,
        }
    }

    /// Cipher used when this is a block encryption algorithm
    pub fn cipher(self) -> Option<Cipher> {
        match self {
            Algorithm::Aes128Cbc => Some(Cipher::Aes128Cbc),
            Algorithm::Aes192Cbc => Some(Cipher::Aes192Cbc),
            Algorithm::Aes256Cbc => Some(Cipher::Aes256Cbc),
            Algorithm::Aes128Gcm => Some(Cipher::Aes128Gcm),
            Algorithm::Aes256Gcm => Some(Cipher::Aes256Gcm),
            _ => None,
        }
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(uri: &str) -> Result<Self> {
        let alg = match uri {
            algorithms::RSA_SHA1 => Algorithm::RsaSha1,
            algorithms::RSA_SHA256 => Algorithm::RsaSha256,
            algorithms::RSA_SHA384 => Algorithm::RsaSha384,
            algorithms::RSA_SHA512 => Algorithm::RsaSha512,
            algorithms::RSA_OAEP_MGF1P => Algorithm::RsaOaepMgf1p,
            algorithms::RSA_1_5 => Algorithm::Rsa15,
            algorithms::AES128_CBC => Algorithm::Aes128Cbc,
            algorithms::AES192_CBC => Algorithm::Aes192Cbc,
            algorithms::AES256_CBC => Algorithm::Aes256Cbc,
            algorithms::AES128_GCM => Algorithm::Aes128Gcm,
            algorithms::AES256_GCM => Algorithm::Aes256Gcm,
            other => return Err(Error::Unsupported(format!("Unsupported algorithm: {other}"))),
        };
        Ok(alg)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

#[derive(Debug, Clone)]
enum KeyMaterial {
    Private(RsaPrivateKey),
    Public(RsaPublicKey),
}

/// An RSA key typed with the algorithm it will be used for.
#[derive(Debug, Clone)]
pub struct SecurityKey {
    algorithm: Algorithm,
    material: KeyMaterial,
}

impl SecurityKey {
    pub fn from_private_key(algorithm: Algorithm, key: RsaPrivateKey) -> Self {
        Self {
            algorithm,
            material: KeyMaterial::Private(key),
        }
    }

    pub fn from_public_key(algorithm: Algorithm, key: RsaPublicKey) -> Self {
        Self {
            algorithm,
            material: KeyMaterial::Public(key),
        }
    }

    /// Load a PEM private key, decrypting it when a passphrase is given.
    pub fn private_from_pem(
        algorithm: Algorithm,
        pem: impl AsRef<[u8]>,
        passphrase: Option<&SecretString>,
    ) -> Result<Self> {
        let key = match passphrase {
            Some(pass) => RsaPrivateKey::from_pem_with_passphrase(pem, pass.expose_secret()),
            None => RsaPrivateKey::from_pem(pem),
        }
        .map_err(|e| Error::Configuration(format!("Unable to load private key: {e}")))?;
        info!("Loaded {}-bit RSA private key for {}", key.bits(), algorithm);
        Ok(Self::from_private_key(algorithm, key))
    }

    /// Load a public key from a PEM certificate or a PEM public key.
    pub fn public_from_pem(algorithm: Algorithm, pem: impl AsRef<[u8]>) -> Result<Self> {
        let pem = pem.as_ref();
        let is_certificate = std::str::from_utf8(pem)
            .map(|s| s.contains("BEGIN CERTIFICATE"))
            .unwrap_or(false);
        let key = if is_certificate {
            RsaPublicKey::from_certificate_pem(pem)
        } else {
            RsaPublicKey::from_pem(pem)
        }
        .map_err(|e| Error::Configuration(format!("Unable to load public key: {e}")))?;
        Ok(Self::from_public_key(algorithm, key))
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The same key material typed with another algorithm.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn is_private(&self) -> bool {
        matches!(self.material, KeyMaterial::Private(_))
    }

    pub fn public_key(&self) -> Result<RsaPublicKey> {
        match &self.material {
            KeyMaterial::Private(k) => Ok(k.public_key()?),
            KeyMaterial::Public(k) => Ok(k.clone()),
        }
    }

    fn private_key(&self, purpose: &str) -> Result<&RsaPrivateKey> {
        match &self.material {
            KeyMaterial::Private(k) => Ok(k),
            KeyMaterial::Public(_) => Err(Error::Configuration(format!(
                "A private key is required to {purpose}"
            ))),
        }
    }

    pub(crate) fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let hash_alg = self.algorithm.hash_alg().ok_or_else(|| {
            Error::Unsupported(format!("{} is not a signature algorithm", self.algorithm))
        })?;
        let key = self.private_key("sign")?;
        Ok(rsa::sign(key, data, hash_alg)?)
    }

    pub(crate) fn verify(&self, algorithm: Algorithm, data: &[u8], signature: &[u8]) -> Result<bool> {
        let hash_alg = algorithm.hash_alg().ok_or_else(|| {
            Error::Unsupported(format!("{algorithm} is not a signature algorithm"))
        })?;
        Ok(rsa::verify(&self.public_key()?, data, signature, hash_alg)?)
    }

    pub(crate) fn wrap_key(&self, transport: Algorithm, session_key: &SecureBytes) -> Result<Vec<u8>> {
        let padding = transport.padding().ok_or_else(|| {
            Error::Unsupported(format!("{transport} is not a key transport algorithm"))
        })?;
        Ok(self
            .public_key()?
            .encrypt(session_key.expose_secret(), padding)?)
    }

    pub(crate) fn unwrap_key(&self, transport: Algorithm, sealed: &[u8]) -> Result<SecureBytes> {
        let padding = transport.padding().ok_or_else(|| {
            Error::Unsupported(format!("{transport} is not a key transport algorithm"))
        })?;
        let key = self.private_key("decrypt")?;
        let opened = key
            .decrypt(sealed, padding)
            .map_err(|e| Error::Decryption(format!("Failed to decrypt symmetric key: {e}")))?;
        Ok(SecureBytes::new(opened))
    }
}
