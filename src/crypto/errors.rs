use openssl::error::ErrorStack;
use thiserror::Error;

pub(crate) type CryptoResult<T> = Result<T, Error>;

/// Failures below the XML layer: key material, ciphertext framing and OpenSSL.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed ciphertext: {0}")]
    Ciphertext(String),

    #[error("Wrong key type: {0}")]
    KeyType(String),

    #[error("Expected a {expected} byte key, got {actual}")]
    KeyLength { expected: usize, actual: usize },

    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] ErrorStack),

    #[error("Random generator error: {0}")]
    Random(String),
}
