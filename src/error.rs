use color_eyre::eyre::Report;

pub type Result<T> = std::result::Result<T, Error>;

/// Broad failure classes a caller can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unparseable, empty or DOCTYPE-bearing XML, or a missing input file
    MalformedInput,
    /// A missing, duplicated or mutually exclusive element or attribute
    StructuralViolation,
    /// A SAML version other than 2.0
    UnsupportedVersion,
    /// Invalid signature, digest mismatch or failed decryption
    CryptographicFailure,
    /// An encrypted value was read before it was decrypted
    NotDecryptedYet,
    /// Missing key file, bad passphrase or unusable settings
    ConfigurationError,
    /// Codec and I/O plumbing
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unparseable XML: {0}")]
    UnparseableXml(String),

    #[error("{0}")]
    Runtime(String),

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(String),

    #[error("Missing ID attribute on {0}")]
    MissingId(&'static str),

    #[error("Missing <saml:Issuer> in {0}")]
    MissingIssuer(&'static str),

    #[error("More than one <saml:NameID> or <saml:EncryptedID> in {0}")]
    TooManyNameIds(&'static str),

    #[error("Missing <saml:NameID> or <saml:EncryptedID> in {0}")]
    MissingNameId(&'static str),

    #[error("Missing <saml:SubjectConfirmation> in <saml:Subject>")]
    MissingSubjectConfirmation,

    #[error("Unknown condition: {0}")]
    UnknownCondition(String),

    #[error("More that one <saml:AuthnStatement> in <saml:Assertion> not supported")]
    TooManyAuthnStatements,

    #[error("Missing required AuthnInstant attribute on <saml:AuthnStatement>")]
    MissingAuthnInstant,

    #[error(
        "A \"{name}\" (EPTI) attribute value must be a NameID, none found for value no. \"{index}\""
    )]
    InvalidEptiValue { name: String, index: usize },

    #[error("{0}")]
    Structure(String),

    #[error("Reference validation failed: {0}")]
    ReferenceValidation(String),

    #[error("Unable to validate Signature: {0}")]
    SignatureValidation(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Attempted to retrieve encrypted {0} without decrypting it first")]
    NotDecryptedYet(&'static str),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] crate::crypto::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("XML processing error: {0}")]
    Xml(#[from] Report),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_) | Error::UnparseableXml(_) | Error::Runtime(_) => {
                ErrorKind::MalformedInput
            }
            Error::UnsupportedVersion(_) => ErrorKind::UnsupportedVersion,
            Error::MissingId(_)
            | Error::MissingIssuer(_)
            | Error::TooManyNameIds(_)
            | Error::MissingNameId(_)
            | Error::MissingSubjectConfirmation
            | Error::UnknownCondition(_)
            | Error::TooManyAuthnStatements
            | Error::MissingAuthnInstant
            | Error::InvalidEptiValue { .. }
            | Error::Structure(_) => ErrorKind::StructuralViolation,
            Error::ReferenceValidation(_) | Error::SignatureValidation(_) | Error::Decryption(_) => {
                ErrorKind::CryptographicFailure
            }
            Error::NotDecryptedYet(_) => ErrorKind::NotDecryptedYet,
            Error::Configuration(_) => ErrorKind::ConfigurationError,
            Error::Unsupported(_)
            | Error::Crypto(_)
            | Error::Base64(_)
            | Error::Utf8(_)
            | Error::Xml(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn structure(msg: impl Into<String>) -> Self {
        Error::Structure(msg.into())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.into())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(err.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Xml(err.into())
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::Utf8(err.utf8_error())
    }
}

impl From<chrono::ParseError> for Error {
    fn from(err: chrono::ParseError) -> Self {
        Error::Structure(format!("Invalid timestamp: {err}"))
    }
}
