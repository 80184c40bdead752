use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::metadata::extensions::{self, Extension};
use crate::utils::{add_localized_strings, add_strings, extract_localized_strings, extract_strings};
use crate::xml::{Element, ns};

/// `md:Organization`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Organization {
    pub extensions: Vec<Extension>,
    pub organization_name: BTreeMap<String, String>,
    pub organization_display_name: BTreeMap<String, String>,
    pub organization_url: BTreeMap<String, String>,
}

impl Organization {
    pub fn from_element(element: &Element) -> Result<Self> {
        let localized = |local_name: &str| -> Result<BTreeMap<String, String>> {
            let values = extract_localized_strings(element, ns::MD, local_name)?;
            if values.is_empty() {
                return Err(Error::structure(format!(
                    "Missing {local_name} in Organization."
                )));
            }
            Ok(values)
        };
        Ok(Self {
            extensions: extensions::extract(element)?,
            organization_name: localized("OrganizationName")?,
            organization_display_name: localized("OrganizationDisplayName")?,
            organization_url: localized("OrganizationURL")?,
        })
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        let el = parent.append_element(Element::new_ns(ns::MD, "md:Organization"));
        extensions::add(el, &self.extensions);
        add_localized_strings(el, ns::MD, "md:OrganizationName", &self.organization_name);
        add_localized_strings(
            el,
            ns::MD,
            "md:OrganizationDisplayName",
            &self.organization_display_name,
        );
        add_localized_strings(el, ns::MD, "md:OrganizationURL", &self.organization_url);
        el
    }
}

/// `md:ContactPerson`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactPerson {
    pub contact_type: String,
    pub extensions: Vec<Extension>,
    pub company: Option<String>,
    pub given_name: Option<String>,
    pub sur_name: Option<String>,
    pub email_address: Vec<String>,
    pub telephone_number: Vec<String>,
}

impl ContactPerson {
    pub fn new(contact_type: impl Into<String>) -> Self {
        Self {
            contact_type: contact_type.into(),
            extensions: Vec::new(),
            company: None,
            given_name: None,
            sur_name: None,
            email_address: Vec::new(),
            telephone_number: Vec::new(),
        }
    }

    pub fn from_element(element: &Element) -> Result<Self> {
        let contact_type = element
            .attribute("contactType")
            .ok_or_else(|| Error::structure("Missing contactType on ContactPerson."))?;
        let single = |local_name: &str| -> Result<Option<String>> {
            let mut values = extract_strings(element, ns::MD, local_name);
            if values.len() > 1 {
                return Err(Error::structure(format!(
                    "More than one {local_name} in md:ContactPerson"
                )));
            }
            Ok(values.pop())
        };
        Ok(Self {
            contact_type: contact_type.to_string(),
            extensions: extensions::extract(element)?,
            company: single("Company")?,
            given_name: single("GivenName")?,
            sur_name: single("SurName")?,
            email_address: extract_strings(element, ns::MD, "EmailAddress"),
            telephone_number: extract_strings(element, ns::MD, "TelephoneNumber"),
        })
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        let el = parent.append_element(Element::new_ns(ns::MD, "md:ContactPerson"));
        el.set_attribute("contactType", self.contact_type.as_str());
        extensions::add(el, &self.extensions);
        for (qname, value) in [
            ("md:Company", &self.company),
            ("md:GivenName", &self.given_name),
            ("md:SurName", &self.sur_name),
        ] {
            if let Some(value) = value {
                el.append_text_element(ns::MD, qname, value.as_str());
            }
        }
        add_strings(el, ns::MD, "md:EmailAddress", &self.email_address);
        add_strings(el, ns::MD, "md:TelephoneNumber", &self.telephone_number);
        el
    }
}

/// `md:AdditionalMetadataLocation`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdditionalMetadataLocation {
    pub namespace: String,
    pub location: String,
}

impl AdditionalMetadataLocation {
    pub fn from_element(element: &Element) -> Result<Self> {
        let namespace = element.attribute("namespace").ok_or_else(|| {
            Error::structure("Missing namespace attribute on AdditionalMetadataLocation element.")
        })?;
        Ok(Self {
            namespace: namespace.to_string(),
            location: element.text().trim().to_string(),
        })
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        let el = parent.append_text_element(
            ns::MD,
            "md:AdditionalMetadataLocation",
            self.location.as_str(),
        );
        el.set_attribute("namespace", self.namespace.as_str());
        el
    }
}
