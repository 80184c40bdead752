//! Signature state shared by every element that can carry a `ds:Signature`.

use crate::error::Result;
use crate::xml::Element;
use crate::xmlsec::{self, SecurityKey, SignatureData};

/// Key and certificates used when serializing, plus the signature found
/// when parsing.
#[derive(Debug, Clone, Default)]
pub struct SignedElement {
    signature_key: Option<SecurityKey>,
    certificates: Vec<String>,
    signature: Option<SignatureData>,
}

impl SignedElement {
    /// Capture the signature of a parsed element.
    ///
    /// Fails when a signature is present but its reference does not match
    /// the element content.
    pub fn from_element(element: &Element) -> Result<Self> {
        let signature = SignatureData::extract(element)?;
        let certificates = signature
            .as_ref()
            .map(|s| s.certificates().to_vec())
            .unwrap_or_default();
        Ok(Self {
            signature_key: None,
            certificates,
            signature,
        })
    }

    pub fn signature_key(&self) -> Option<&SecurityKey> {
        self.signature_key.as_ref()
    }

    pub fn set_signature_key(&mut self, key: Option<SecurityKey>) {
        self.signature_key = key;
    }

    /// PEM certificates, either found in the parsed signature or to be
    /// included in the next one.
    pub fn certificates(&self) -> &[String] {
        &self.certificates
    }

    pub fn set_certificates(&mut self, certificates: Vec<String>) {
        self.certificates = certificates;
    }

    pub fn was_signed(&self) -> bool {
        self.signature.is_some()
    }

    pub fn signature_data(&self) -> Option<&SignatureData> {
        self.signature.as_ref()
    }

    /// `Ok(false)` when no signature was present at parse time.
    pub fn validate(&self, key: &SecurityKey) -> Result<bool> {
        match &self.signature {
            Some(signature) => signature.verify(key),
            None => Ok(false),
        }
    }

    /// Sign the serialized `element`, placing the signature at `insert_at`.
    ///
    /// Does nothing without a signature key.
    pub fn sign_element(&self, element: &mut Element, insert_at: usize) -> Result<()> {
        match &self.signature_key {
            Some(key) => xmlsec::sign_element(element, key, &self.certificates, insert_at),
            None => Ok(()),
        }
    }
}

/// Access to the [`SignedElement`] state of a protocol or metadata object.
pub trait Signable {
    fn signed(&self) -> &SignedElement;

    fn signed_mut(&mut self) -> &mut SignedElement;

    fn signature_key(&self) -> Option<&SecurityKey> {
        self.signed().signature_key()
    }

    fn set_signature_key(&mut self, key: Option<SecurityKey>) {
        self.signed_mut().set_signature_key(key);
    }

    fn certificates(&self) -> &[String] {
        self.signed().certificates()
    }

    fn set_certificates(&mut self, certificates: Vec<String>) {
        self.signed_mut().set_certificates(certificates);
    }

    /// Check the signature captured at parse time against `key`.
    fn validate(&self, key: &SecurityKey) -> Result<bool> {
        self.signed().validate(key)
    }
}
