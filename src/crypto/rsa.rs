use crate::crypto::HashAlg;
use crate::crypto::errors::{CryptoResult, Error};
use openssl::pkey::{Id, PKey, Private, Public};
use openssl::rsa::{Padding, Rsa};
use openssl::sign::{Signer, Verifier};
use openssl::x509::X509;
use tracing::debug;

/// Padding schemes used when an RSA key wraps a symmetric key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaPadding {
    /// RSAES-PKCS1-v1_5
    Pkcs1,
    /// RSAES-OAEP with SHA-1 and MGF1
    Pkcs1Oaep,
}

impl From<RsaPadding> for Padding {
    fn from(padding: RsaPadding) -> Self {
        match padding {
            RsaPadding::Pkcs1 => Padding::PKCS1,
            RsaPadding::Pkcs1Oaep => Padding::PKCS1_OAEP,
        }
    }
}

/// RSA private key wrapper
#[derive(Debug, Clone)]
pub struct RsaPrivateKey {
    key: PKey<Private>,
}

impl RsaPrivateKey {
    /// Load from PEM-encoded PKCS#1/PKCS#8.
    pub fn from_pem(pem_bytes: impl AsRef<[u8]>) -> CryptoResult<Self> {
        let key = PKey::private_key_from_pem(pem_bytes.as_ref())?;
        Self::from_pkey(key)
    }

    /// Load from an encrypted PEM-encoded PKCS#1/PKCS#8 key.
    pub fn from_pem_with_passphrase(
        pem_bytes: impl AsRef<[u8]>,
        passphrase: impl AsRef<[u8]>,
    ) -> CryptoResult<Self> {
        let key = PKey::private_key_from_pem_passphrase(pem_bytes.as_ref(), passphrase.as_ref())?;
        Self::from_pkey(key)
    }

    fn from_pkey(key: PKey<Private>) -> CryptoResult<Self> {
        if key.id() != Id::RSA {
            return Err(Error::KeyType("expected an RSA private key".into()));
        }
        Ok(Self { key })
    }

    /// Get the corresponding public key
    pub fn public_key(&self) -> CryptoResult<RsaPublicKey> {
        let key = PKey::public_key_from_der(&self.key.public_key_to_der()?)?;
        Ok(RsaPublicKey { key })
    }

    /// Key size in bits
    pub fn bits(&self) -> u32 {
        self.key.bits()
    }

    /// Unwrap data sealed with the matching public key
    pub fn decrypt(&self, data: &[u8], padding: RsaPadding) -> CryptoResult<Vec<u8>> {
        let rsa = self.key.rsa()?;
        let mut buf = vec![0u8; rsa.size() as usize];
        let len = rsa.private_decrypt(data, &mut buf, padding.into())?;
        buf.truncate(len);
        Ok(buf)
    }

    pub(crate) fn pkey(&self) -> &PKey<Private> {
        &self.key
    }
}

/// RSA public key wrapper
#[derive(Debug, Clone)]
pub struct RsaPublicKey {
    key: PKey<Public>,
}

impl RsaPublicKey {
    /// Load a SubjectPublicKeyInfo or PKCS#1 PEM public key
    pub fn from_pem(pem_bytes: impl AsRef<[u8]>) -> CryptoResult<Self> {
        let pem_bytes = pem_bytes.as_ref();
        let key = match PKey::public_key_from_pem(pem_bytes) {
            Ok(key) => key,
            Err(_) => PKey::from_rsa(Rsa::public_key_from_pem_pkcs1(pem_bytes)?)?,
        };
        Self::from_pkey(key)
    }

    /// Extract the public key of a PEM encoded X.509 certificate
    pub fn from_certificate_pem(pem_bytes: impl AsRef<[u8]>) -> CryptoResult<Self> {
        let cert = X509::from_pem(pem_bytes.as_ref())?;
        Self::from_pkey(cert.public_key()?)
    }

    fn from_pkey(key: PKey<Public>) -> CryptoResult<Self> {
        if key.id() != Id::RSA {
            return Err(Error::KeyType("expected an RSA public key".into()));
        }
        Ok(Self { key })
    }

    /// Seal `data` (typically a session key) for the private key holder
    pub fn encrypt(&self, data: &[u8], padding: RsaPadding) -> CryptoResult<Vec<u8>> {
        let rsa = self.key.rsa()?;
        let mut buf = vec![0u8; rsa.size() as usize];
        let len = rsa.public_encrypt(data, &mut buf, padding.into())?;
        buf.truncate(len);
        Ok(buf)
    }

    pub(crate) fn pkey(&self) -> &PKey<Public> {
        &self.key
    }
}

/// Sign data with RSASSA-PKCS1-v1_5
pub fn sign(
    private_key: &RsaPrivateKey,
    data: impl AsRef<[u8]>,
    hash_alg: HashAlg,
) -> CryptoResult<Vec<u8>> {
    let mut signer = Signer::new(hash_alg.into(), private_key.pkey())?;
    Ok(signer.sign_oneshot_to_vec(data.as_ref())?)
}

/// Verify an RSASSA-PKCS1-v1_5 signature
///
/// Malformed signatures verify as `false`.
pub fn verify(
    public_key: &RsaPublicKey,
    data: impl AsRef<[u8]>,
    signature: &[u8],
    hash_alg: HashAlg,
) -> CryptoResult<bool> {
    let mut verifier = Verifier::new(hash_alg.into(), public_key.pkey())?;
    match verifier.verify_oneshot(signature, data.as_ref()) {
        Ok(valid) => Ok(valid),
        Err(e) => {
            debug!("RSA verification rejected the signature: {e}");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDP_KEY: &str = include_str!("../../test_data/saml/idp.key.pem");
    const IDP_KEY_ENCRYPTED: &str = include_str!("../../test_data/saml/idp.key.encrypted.pem");
    const IDP_CERT: &str = include_str!("../../test_data/saml/idp.cert.pem");
    const IDP_PUB: &str = include_str!("../../test_data/saml/idp.pub.pem");
    const OTHER_KEY: &str = include_str!("../../test_data/saml/other.key.pem");

    fn key_pair(pem: &str) -> (RsaPrivateKey, RsaPublicKey) {
        let private_key = RsaPrivateKey::from_pem(pem).unwrap();
        let public_key = private_key.public_key().unwrap();
        (private_key, public_key)
    }

    #[test]
    fn test_rsa_sign_verify() {
        let (private_key, public_key) = key_pair(IDP_KEY);
        let data = b"test data";

        let signature = sign(&private_key, data, HashAlg::Sha256).unwrap();
        assert!(verify(&public_key, data, &signature, HashAlg::Sha256).unwrap());
        assert!(!verify(&public_key, b"wrong data", &signature, HashAlg::Sha256).unwrap());
        assert!(!verify(&public_key, data, b"garbage", HashAlg::Sha256).unwrap());
    }

    #[test]
    fn test_cross_key_verification_fails() {
        let (idp_private, _) = key_pair(IDP_KEY);
        let (_, other_public) = key_pair(OTHER_KEY);

        let signature = sign(&idp_private, b"data", HashAlg::Sha256).unwrap();
        assert!(!verify(&other_public, b"data", &signature, HashAlg::Sha256).unwrap());
    }

    #[test]
    fn test_load_keys_from_pem() {
        let (private_key, public_key) = key_pair(IDP_KEY);
        assert_eq!(private_key.bits(), 2048);

        let encrypted = RsaPrivateKey::from_pem_with_passphrase(IDP_KEY_ENCRYPTED, "1234").unwrap();
        assert!(encrypted.pkey().public_eq(&**private_key.pkey()));
        assert!(RsaPrivateKey::from_pem_with_passphrase(IDP_KEY_ENCRYPTED, "wrong").is_err());

        let from_cert = RsaPublicKey::from_certificate_pem(IDP_CERT).unwrap();
        let from_pub = RsaPublicKey::from_pem(IDP_PUB).unwrap();
        assert!(from_cert.pkey().public_eq(&**from_pub.pkey()));
        assert!(public_key.pkey().public_eq(&**from_pub.pkey()));
    }

    #[test]
    fn test_non_rsa_keys_are_rejected() {
        let ec = openssl::ec::EcKey::generate(
            &openssl::ec::EcGroup::from_curve_name(openssl::nid::Nid::X9_62_PRIME256V1).unwrap(),
        )
        .unwrap();
        let pem = PKey::from_ec_key(ec).unwrap().private_key_to_pem_pkcs8().unwrap();
        assert!(matches!(RsaPrivateKey::from_pem(pem), Err(Error::KeyType(_))));
    }

    #[test]
    fn test_key_transport_roundtrip() {
        let (private_key, public_key) = key_pair(IDP_KEY);
        let session_key = [7u8; 16];
        for padding in [RsaPadding::Pkcs1Oaep, RsaPadding::Pkcs1] {
            let sealed = public_key.encrypt(&session_key, padding).unwrap();
            let opened = private_key.decrypt(&sealed, padding).unwrap();
            assert_eq!(opened, session_key);
        }
    }

    #[test]
    fn test_oaep_with_wrong_key_fails() {
        let (_, idp_public) = key_pair(IDP_KEY);
        let (other_private, _) = key_pair(OTHER_KEY);
        let sealed = idp_public.encrypt(&[1u8; 16], RsaPadding::Pkcs1Oaep).unwrap();
        assert!(other_private.decrypt(&sealed, RsaPadding::Pkcs1Oaep).is_err());
    }
}
