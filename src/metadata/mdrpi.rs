//! Metadata registration and publication info (`mdrpi`).

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::utils::{add_localized_strings, extract_localized_strings, format_timestamp, timestamp_attribute};
use crate::xml::{Element, ns};

fn required<'a>(element: &'a Element, name: &str) -> Result<&'a str> {
    element.attribute(name).ok_or_else(|| {
        Error::structure(format!(
            "Missing required attribute \"{name}\" in mdrpi:{} element.",
            element.local_name()
        ))
    })
}

/// `mdrpi:PublicationInfo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationInfo {
    pub publisher: String,
    pub creation_instant: Option<DateTime<Utc>>,
    pub publication_id: Option<String>,
    /// Usage policy URLs keyed by language.
    pub usage_policy: BTreeMap<String, String>,
}

impl PublicationInfo {
    pub fn new(publisher: impl Into<String>) -> Self {
        Self {
            publisher: publisher.into(),
            creation_instant: None,
            publication_id: None,
            usage_policy: BTreeMap::new(),
        }
    }

    pub fn from_element(element: &Element) -> Result<Self> {
        Ok(Self {
            publisher: required(element, "publisher")?.to_string(),
            creation_instant: timestamp_attribute(element, "creationInstant")?,
            publication_id: element.attribute("publicationId").map(str::to_string),
            usage_policy: extract_localized_strings(element, ns::MDRPI, "UsagePolicy")?,
        })
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        let el = parent.append_element(Element::new_ns(ns::MDRPI, "mdrpi:PublicationInfo"));
        el.set_attribute("publisher", self.publisher.as_str());
        if let Some(instant) = &self.creation_instant {
            el.set_attribute("creationInstant", format_timestamp(instant));
        }
        if let Some(id) = &self.publication_id {
            el.set_attribute("publicationId", id.as_str());
        }
        add_localized_strings(el, ns::MDRPI, "mdrpi:UsagePolicy", &self.usage_policy);
        el
    }
}

/// `mdrpi:RegistrationInfo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationInfo {
    pub registration_authority: String,
    pub registration_instant: Option<DateTime<Utc>>,
    pub registration_policy: BTreeMap<String, String>,
}

impl RegistrationInfo {
    pub fn new(registration_authority: impl Into<String>) -> Self {
        Self {
            registration_authority: registration_authority.into(),
            registration_instant: None,
            registration_policy: BTreeMap::new(),
        }
    }

    pub fn from_element(element: &Element) -> Result<Self> {
        Ok(Self {
            registration_authority: required(element, "registrationAuthority")?.to_string(),
            registration_instant: timestamp_attribute(element, "registrationInstant")?,
            registration_policy: extract_localized_strings(
                element,
                ns::MDRPI,
                "RegistrationPolicy",
            )?,
        })
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        let el = parent.append_element(Element::new_ns(ns::MDRPI, "mdrpi:RegistrationInfo"));
        el.set_attribute("registrationAuthority", self.registration_authority.as_str());
        if let Some(instant) = &self.registration_instant {
            el.set_attribute("registrationInstant", format_timestamp(instant));
        }
        add_localized_strings(
            el,
            ns::MDRPI,
            "mdrpi:RegistrationPolicy",
            &self.registration_policy,
        );
        el
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;

    #[test]
    fn test_publication_info() {
        let doc = xml::from_string(
            r#"<mdrpi:PublicationInfo xmlns:mdrpi="urn:oasis:names:tc:SAML:metadata:rpi" publisher="SomePublisher" creationInstant="2011-01-01T00:00:00Z" publicationId="SomePublicationId">
                 <mdrpi:UsagePolicy xml:lang="en">http://EnglishUsagePolicy</mdrpi:UsagePolicy>
                 <mdrpi:UsagePolicy xml:lang="no">http://NorwegianUsagePolicy</mdrpi:UsagePolicy>
               </mdrpi:PublicationInfo>"#,
        )
        .unwrap();
        let info = PublicationInfo::from_element(doc.root()).unwrap();
        assert_eq!(info.publisher, "SomePublisher");
        assert_eq!(info.publication_id.as_deref(), Some("SomePublicationId"));
        assert_eq!(info.usage_policy["no"], "http://NorwegianUsagePolicy");

        let mut parent = Element::new_ns(ns::MD, "md:Extensions");
        info.to_xml(&mut parent);
        assert_eq!(
            PublicationInfo::from_element(parent.first_child_element().unwrap()).unwrap(),
            info
        );
    }

    #[test]
    fn test_publisher_required() {
        let doc = xml::from_string(
            r#"<mdrpi:PublicationInfo xmlns:mdrpi="urn:oasis:names:tc:SAML:metadata:rpi"/>"#,
        )
        .unwrap();
        assert_eq!(
            PublicationInfo::from_element(doc.root()).unwrap_err().to_string(),
            "Missing required attribute \"publisher\" in mdrpi:PublicationInfo element."
        );
    }

    #[test]
    fn test_registration_info() {
        let doc = xml::from_string(
            r#"<mdrpi:RegistrationInfo xmlns:mdrpi="urn:oasis:names:tc:SAML:metadata:rpi" registrationAuthority="https://ExampleAuthority" registrationInstant="2009-02-13T23:31:30Z"><mdrpi:RegistrationPolicy xml:lang="en">http://EnglishRegistrationPolicy</mdrpi:RegistrationPolicy></mdrpi:RegistrationInfo>"#,
        )
        .unwrap();
        let info = RegistrationInfo::from_element(doc.root()).unwrap();
        assert_eq!(info.registration_authority, "https://ExampleAuthority");
        assert_eq!(
            info.registration_instant.map(|i| i.timestamp()),
            Some(1_234_567_890)
        );

        let missing = xml::from_string(
            r#"<mdrpi:RegistrationInfo xmlns:mdrpi="urn:oasis:names:tc:SAML:metadata:rpi"/>"#,
        )
        .unwrap();
        assert_eq!(
            RegistrationInfo::from_element(missing.root()).unwrap_err().to_string(),
            "Missing required attribute \"registrationAuthority\" in mdrpi:RegistrationInfo element."
        );
    }
}
