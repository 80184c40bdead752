//! Private key configuration and loading.

use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;

use crate::error::{Error, Result};
use crate::xmlsec::{Algorithm, SecurityKey};

/// Where to find a PEM private key and how to unlock it.
#[derive(Debug, Clone, Deserialize)]
pub struct PrivateKeyConfig {
    pub file_path: PathBuf,
    /// Label used in logs.
    pub name: String,
    #[serde(default)]
    pub passphrase: Option<SecretString>,
}

impl PrivateKeyConfig {
    pub fn new(file_path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            name: name.into(),
            passphrase: None,
        }
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(SecretString::from(passphrase.into()));
        self
    }
}

/// A private key as read from disk, not yet decrypted.
#[derive(Debug, Clone)]
pub struct PrivateKey {
    name: String,
    pem: String,
    passphrase: Option<SecretString>,
}

impl PrivateKey {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_as_string(&self) -> &str {
        &self.pem
    }

    pub fn passphrase(&self) -> Option<&SecretString> {
        self.passphrase.as_ref()
    }

    /// Decrypt the PEM and type it with `algorithm`.
    pub fn to_security_key(&self, algorithm: Algorithm) -> Result<SecurityKey> {
        SecurityKey::private_from_pem(algorithm, &self.pem, self.passphrase.as_ref()).map_err(
            |e| Error::Configuration(format!("Unable to use private key '{}': {e}", self.name)),
        )
    }
}

pub struct PrivateKeyLoader;

impl PrivateKeyLoader {
    pub fn load_private_key(config: &PrivateKeyConfig) -> Result<PrivateKey> {
        let pem = fs::read_to_string(&config.file_path).map_err(|e| {
            Error::Configuration(format!(
                "Unable to read private key '{}' from {}: {e}",
                config.name,
                config.file_path.display()
            ))
        })?;
        info!(name = %config.name, path = %config.file_path.display(), "Loaded private key");
        Ok(PrivateKey {
            name: config.name.clone(),
            pem,
            passphrase: config.passphrase.clone(),
        })
    }
}
