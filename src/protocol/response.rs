use tracing::debug;

use crate::assertion::Assertion;
use crate::container::{Container, TracingContainer};
use crate::error::{Error, Result};
use crate::protocol::{MessageHeader, Status};
use crate::signed::{Signable, SignedElement};
use crate::xml::{Element, ns};
use crate::xmlsec::{self, EncryptedElement, SecurityKey};

/// `samlp:Response` carrying plain and encrypted assertions.
#[derive(Debug, Clone)]
pub struct Response {
    header: MessageHeader,
    in_response_to: Option<String>,
    status: Status,
    assertions: Vec<Assertion>,
    encrypted_assertions: Vec<EncryptedElement>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self::new_in(&TracingContainer)
    }

    pub fn new_in(container: &dyn Container) -> Self {
        Self {
            header: MessageHeader::new_in(container),
            in_response_to: None,
            status: Status::success(),
            assertions: Vec::new(),
            encrypted_assertions: Vec::new(),
        }
    }

    pub fn from_element(element: &Element) -> Result<Self> {
        let header = MessageHeader::from_element(element, "Response")?;
        let status = element
            .first_child_named(ns::SAMLP, "Status")
            .ok_or_else(|| Error::structure("Missing status code on response."))
            .and_then(Status::from_element)?;

        let mut response = Self {
            header,
            in_response_to: element.attribute("InResponseTo").map(str::to_string),
            status,
            assertions: Vec::new(),
            encrypted_assertions: Vec::new(),
        };
        for child in element.child_elements() {
            if child.is(ns::SAML, "Assertion") {
                response.assertions.push(Assertion::from_element(child)?);
            } else if child.is(ns::SAML, "EncryptedAssertion") {
                response
                    .encrypted_assertions
                    .push(EncryptedElement::from_wrapper(child)?);
            }
        }
        debug!(
            id = %response.header.id,
            assertions = response.assertions.len(),
            encrypted = response.encrypted_assertions.len(),
            "Parsed response"
        );
        Ok(response)
    }

    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut MessageHeader {
        &mut self.header
    }

    pub fn in_response_to(&self) -> Option<&str> {
        self.in_response_to.as_deref()
    }

    pub fn set_in_response_to(&mut self, in_response_to: Option<String>) {
        self.in_response_to = in_response_to;
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn assertions(&self) -> &[Assertion] {
        &self.assertions
    }

    pub fn add_assertion(&mut self, assertion: Assertion) {
        self.assertions.push(assertion);
    }

    pub fn encrypted_assertions(&self) -> &[EncryptedElement] {
        &self.encrypted_assertions
    }

    /// Serialize `assertion` (signing it if it has a key) and add it encrypted for `key`.
    pub fn add_encrypted_assertion(&mut self, assertion: &Assertion, key: &SecurityKey) -> Result<()> {
        let encrypted = xmlsec::encrypt_element(&assertion.to_xml()?, key)?;
        self.encrypted_assertions.push(encrypted);
        Ok(())
    }

    /// Decrypt every `saml:EncryptedAssertion` with the private `key`.
    pub fn decrypt_assertions(&mut self, key: &SecurityKey) -> Result<()> {
        let decrypted = self
            .encrypted_assertions
            .iter()
            .map(|encrypted| {
                let element = xmlsec::decrypt_element(encrypted, key)?;
                if !element.is(ns::SAML, "Assertion") {
                    return Err(Error::Decryption(format!(
                        "Expected a <saml:Assertion>, decrypted <{}>",
                        element.qualified_name()
                    )));
                }
                Assertion::from_element(&element)
            })
            .collect::<Result<Vec<_>>>()?;
        self.assertions.extend(decrypted);
        self.encrypted_assertions.clear();
        Ok(())
    }

    pub fn to_unsigned_xml(&self) -> Result<Element> {
        let mut root = self.header.to_element("samlp:Response");
        if let Some(in_response_to) = &self.in_response_to {
            root.set_attribute("InResponseTo", in_response_to.as_str());
        }
        self.status.to_xml(&mut root);
        for assertion in &self.assertions {
            root.append_element(assertion.to_xml()?);
        }
        for encrypted in &self.encrypted_assertions {
            root.append_element(encrypted.to_wrapper(ns::SAML, "saml:EncryptedAssertion"));
        }
        Ok(root)
    }

    pub fn to_signed_xml(&self) -> Result<Element> {
        let mut root = self.to_unsigned_xml()?;
        self.header.sign(&mut root)?;
        Ok(root)
    }
}

impl Signable for Response {
    fn signed(&self) -> &SignedElement {
        &self.header.signed
    }

    fn signed_mut(&mut self) -> &mut SignedElement {
        &mut self.header.signed
    }
}
