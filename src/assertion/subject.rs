use chrono::{DateTime, Utc};
use tracing::warn;

use crate::assertion::name_id::Identifier;
use crate::ds::{Chunk, KeyInfo};
use crate::error::{Error, Result};
use crate::utils::{format_timestamp, timestamp_attribute};
use crate::xml::{Element, ns};

/// `saml:SubjectConfirmationData`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectConfirmationData {
    pub not_before: Option<DateTime<Utc>>,
    pub not_on_or_after: Option<DateTime<Utc>>,
    pub recipient: Option<String>,
    pub in_response_to: Option<String>,
    pub address: Option<String>,
    pub key_info: Vec<KeyInfo>,
    /// Children other than `ds:KeyInfo`
    pub info: Vec<Chunk>,
}

impl SubjectConfirmationData {
    pub fn from_element(element: &Element) -> Result<Self> {
        let address = element.attribute("Address").map(str::to_string);
        if let Some(address) = &address {
            if address.parse::<std::net::IpAddr>().is_err() {
                warn!("Provided argument is not a valid IP address: {address}");
            }
        }

        let mut data = Self {
            not_before: timestamp_attribute(element, "NotBefore")?,
            not_on_or_after: timestamp_attribute(element, "NotOnOrAfter")?,
            recipient: element.attribute("Recipient").map(str::to_string),
            in_response_to: element.attribute("InResponseTo").map(str::to_string),
            address,
            ..Self::default()
        };
        for child in element.child_elements() {
            if child.is(ns::DS, "KeyInfo") {
                data.key_info.push(KeyInfo::from_element(child)?);
            } else {
                data.info.push(Chunk::from_element(child));
            }
        }
        Ok(data)
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        let el = parent.append_element(Element::new_ns(ns::SAML, "saml:SubjectConfirmationData"));
        if let Some(ts) = &self.not_before {
            el.set_attribute("NotBefore", format_timestamp(ts));
        }
        if let Some(ts) = &self.not_on_or_after {
            el.set_attribute("NotOnOrAfter", format_timestamp(ts));
        }
        for (name, value) in [
            ("Recipient", &self.recipient),
            ("InResponseTo", &self.in_response_to),
            ("Address", &self.address),
        ] {
            if let Some(value) = value {
                el.set_attribute(name, value.as_str());
            }
        }
        for key_info in &self.key_info {
            key_info.to_xml(el);
        }
        for chunk in &self.info {
            chunk.to_xml(el);
        }
        el
    }
}

/// `saml:SubjectConfirmation`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectConfirmation {
    pub method: String,
    pub name_id: Option<Identifier>,
    pub data: Option<SubjectConfirmationData>,
}

impl SubjectConfirmation {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            name_id: None,
            data: None,
        }
    }

    pub fn from_element(element: &Element) -> Result<Self> {
        let method = element
            .attribute("Method")
            .ok_or_else(|| Error::structure("SubjectConfirmation element without Method attribute."))?
            .to_string();

        let mut identifiers = element
            .child_elements()
            .filter(|e| Identifier::is_identifier(e));
        let name_id = identifiers.next().map(Identifier::from_element).transpose()?;
        if identifiers.next().is_some() {
            return Err(Error::TooManyNameIds("<saml:SubjectConfirmation>"));
        }

        let mut data = element.children_named(ns::SAML, "SubjectConfirmationData");
        let first = data.next().map(SubjectConfirmationData::from_element).transpose()?;
        if data.next().is_some() {
            return Err(Error::structure(
                "More than one SubjectConfirmationData child in a SubjectConfirmation element.",
            ));
        }

        Ok(Self {
            method,
            name_id,
            data: first,
        })
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        let el = parent.append_element(Element::new_ns(ns::SAML, "saml:SubjectConfirmation"));
        el.set_attribute("Method", self.method.as_str());
        if let Some(name_id) = &self.name_id {
            el.append_element(name_id.to_element());
        }
        if let Some(data) = &self.data {
            data.to_xml(el);
        }
        el
    }
}
