use std::{collections::HashMap, fs, path::PathBuf, str::FromStr};

use config::{Config as ConfigLib, ConfigError, Environment, File};
use serde::Deserialize;
use tracing::debug;

use crate::certificate::{PrivateKeyConfig, PrivateKeyLoader};
use crate::error::{Error, Result};
use crate::signed::Signable;
use crate::xmlsec::{Algorithm, SecurityKey};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub signing: Option<PrivateKeyConfig>,
    /// PEM certificates embedded in produced signatures.
    #[serde(default)]
    pub signing_certificates: Vec<PathBuf>,
    pub encryption: EncryptionConfig,
    pub signature_algorithm: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncryptionConfig {
    pub block_cipher: String,
    pub key_transport: String,
}

/// Resolve a short name such as `rsa-sha256` or a full algorithm URI.
pub fn algorithm_by_name(name: &str) -> Result<Algorithm> {
    let alg = match name {
        "rsa-sha1" => Algorithm::RsaSha1,
        "rsa-sha256" => Algorithm::RsaSha256,
        "rsa-sha384" => Algorithm::RsaSha384,
        "rsa-sha512" => Algorithm::RsaSha512,
        "rsa-oaep-mgf1p" => Algorithm::RsaOaepMgf1p,
        "rsa-1_5" => Algorithm::Rsa15,
        "aes128-cbc" => Algorithm::Aes128Cbc,
        "aes192-cbc" => Algorithm::Aes192Cbc,
        "aes256-cbc" => Algorithm::Aes256Cbc,
        "aes128-gcm" => Algorithm::Aes128Gcm,
        "aes256-gcm" => Algorithm::Aes256Gcm,
        uri => Algorithm::from_str(uri)
            .map_err(|_| Error::Configuration(format!("Unknown algorithm '{uri}'")))?,
    };
    Ok(alg)
}

impl EncryptionConfig {
    pub fn block_cipher(&self) -> Result<Algorithm> {
        algorithm_by_name(&self.block_cipher)
    }

    pub fn key_transport(&self) -> Result<Algorithm> {
        algorithm_by_name(&self.key_transport)
    }
}

impl Config {
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load_with_sources(None)
    }

    pub fn load_with_sources(
        env_vars: Option<HashMap<String, String>>,
    ) -> std::result::Result<Self, ConfigError> {
        let mut builder = ConfigLib::builder()
            .set_default("encryption.block_cipher", "aes128-cbc")?
            .set_default("encryption.key_transport", "rsa-oaep-mgf1p")?
            .set_default("signature_algorithm", "rsa-sha256")?
            .add_source(File::with_name("config/saml2").required(false));

        // Explicit overrides keep tests independent of the process environment
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            // e.g. SAML2_SIGNING__FILE_PATH or SAML2_ENCRYPTION__BLOCK_CIPHER
            builder = builder.add_source(
                Environment::with_prefix("SAML2")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        builder.build()?.try_deserialize()
    }

    pub fn signature_algorithm(&self) -> Result<Algorithm> {
        algorithm_by_name(&self.signature_algorithm)
    }

    /// The configured signing key, if any.
    pub fn signing_key(&self) -> Result<Option<SecurityKey>> {
        let Some(signing) = &self.signing else {
            return Ok(None);
        };
        let key = PrivateKeyLoader::load_private_key(signing)?;
        key.to_security_key(self.signature_algorithm()?).map(Some)
    }

    pub fn signing_certificates(&self) -> Result<Vec<String>> {
        self.signing_certificates
            .iter()
            .map(|path| {
                fs::read_to_string(path).map_err(|e| {
                    Error::Configuration(format!(
                        "Unable to read certificate {}: {e}",
                        path.display()
                    ))
                })
            })
            .collect()
    }

    /// Give `target` the configured signing key and certificates.
    pub fn apply_signing(&self, target: &mut impl Signable) -> Result<()> {
        let key = self.signing_key()?;
        debug!(signing = key.is_some(), "Applying signing configuration");
        target.set_signature_key(key);
        target.set_certificates(self.signing_certificates()?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::Assertion;
    use crate::xml;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const IDP_KEY: &str = include_str!("../test_data/saml/idp.key.pem");
    const IDP_CERT: &str = include_str!("../test_data/saml/idp.cert.pem");

    fn file_with(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = Config::load_with_sources(Some(HashMap::new())).expect("Failed to load config");

        assert!(config.signing.is_none());
        assert!(config.signing_certificates.is_empty());
        assert_eq!(config.encryption.block_cipher().unwrap(), Algorithm::Aes128Cbc);
        assert_eq!(config.encryption.key_transport().unwrap(), Algorithm::RsaOaepMgf1p);
        assert_eq!(config.signature_algorithm().unwrap(), Algorithm::RsaSha256);
        assert!(config.signing_key().unwrap().is_none());
    }

    #[test]
    fn test_env_config() {
        let mut env_vars = HashMap::new();
        env_vars.insert("signing.file_path".to_string(), "/etc/saml2/idp.key".to_string());
        env_vars.insert("signing.name".to_string(), "idp".to_string());
        env_vars.insert("signing.passphrase".to_string(), "1234".to_string());
        env_vars.insert(
            "encryption.block_cipher".to_string(),
            "aes256-gcm".to_string(),
        );

        let config = Config::load_with_sources(Some(env_vars)).expect("Failed to load config");

        let signing = config.signing.unwrap();
        assert_eq!(signing.file_path, PathBuf::from("/etc/saml2/idp.key"));
        assert_eq!(signing.name, "idp");
        assert!(signing.passphrase.is_some());
        assert_eq!(config.encryption.block_cipher().unwrap(), Algorithm::Aes256Gcm);
        // untouched defaults survive
        assert_eq!(config.encryption.key_transport, "rsa-oaep-mgf1p");
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!(
            algorithm_by_name("http://www.w3.org/2001/04/xmldsig-more#rsa-sha256").unwrap(),
            Algorithm::RsaSha256
        );
        assert!(algorithm_by_name("des-cbc").is_err());
    }

    #[test]
    fn test_apply_signing() {
        let key = file_with(IDP_KEY);
        let cert = file_with(IDP_CERT);
        let mut env_vars = HashMap::new();
        env_vars.insert(
            "signing.file_path".to_string(),
            key.path().display().to_string(),
        );
        env_vars.insert("signing.name".to_string(), "idp".to_string());
        let mut config = Config::load_with_sources(Some(env_vars)).unwrap();
        config.signing_certificates = vec![cert.path().to_path_buf()];

        let mut assertion = Assertion::new();
        assertion.set_issuer("https://idp.example.org");
        config.apply_signing(&mut assertion).unwrap();
        assert_eq!(assertion.certificates(), [IDP_CERT]);

        let signed = assertion.to_xml().unwrap().to_xml_string().unwrap();
        let parsed = Assertion::from_element(xml::from_string(&signed).unwrap().root()).unwrap();
        assert!(parsed.was_signed_at_construction());
    }
}
