//! SAML 2.0 object model.
//!
//! Parses, validates, builds and serializes assertions, protocol messages
//! and metadata, and applies XML signatures and XML encryption to them.
//!
//! ```no_run
//! use saml2::{assertion::Assertion, xml};
//!
//! # fn main() -> saml2::Result<()> {
//! let doc = xml::from_file("assertion.xml")?;
//! let assertion = Assertion::from_element(doc.root())?;
//! println!("issued by {}", assertion.issuer());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod assertion;
pub mod certificate;
pub mod config;
pub mod constants;
pub mod container;
pub mod crypto;
pub mod ds;
pub mod error;
pub mod metadata;
pub mod protocol;
pub mod signed;
pub mod telemetry;
pub mod utils;
pub mod validation;
pub mod xml;
pub mod xmlsec;

pub use error::{Error, ErrorKind, Result};
