use chrono::{DateTime, Utc};

use crate::constants::{CONSENT_UNSPECIFIED, SAML_VERSION};
use crate::container::Container;
use crate::ds::Chunk;
use crate::error::{Error, Result};
use crate::signed::SignedElement;
use crate::utils::{format_timestamp, parse_timestamp};
use crate::xml::{Element, ns};
use crate::xmlsec::insertion_point_after_issuer;

/// Attributes and leading children common to every `samlp` message.
#[derive(Debug, Clone)]
pub struct MessageHeader {
    pub id: String,
    pub issue_instant: DateTime<Utc>,
    pub destination: Option<String>,
    pub consent: String,
    pub issuer: Option<String>,
    pub extensions: Vec<Chunk>,
    pub(crate) signed: SignedElement,
}

impl MessageHeader {
    pub fn new_in(container: &dyn Container) -> Self {
        Self {
            id: container.generate_id(),
            issue_instant: Utc::now(),
            destination: None,
            consent: CONSENT_UNSPECIFIED.to_string(),
            issuer: None,
            extensions: Vec::new(),
            signed: SignedElement::default(),
        }
    }

    /// Read the header of `element`, which must be `samlp:<local_name>`.
    pub fn from_element(element: &Element, local_name: &str) -> Result<Self> {
        if !element.is(ns::SAMLP, local_name) {
            return Err(Error::structure(format!(
                "Expected <samlp:{local_name}>, got <{}>",
                element.qualified_name()
            )));
        }

        let version = element.attribute("Version").unwrap_or_default();
        if version != SAML_VERSION {
            return Err(Error::UnsupportedVersion(version.to_string()));
        }

        let id = match element.attribute("ID") {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return Err(Error::MissingId("SAML message")),
        };

        let issue_instant = element
            .attribute("IssueInstant")
            .ok_or_else(|| Error::structure("Missing IssueInstant attribute on SAML message"))
            .and_then(parse_timestamp)?;

        let extensions = element
            .first_child_named(ns::SAMLP, "Extensions")
            .map(|ext| ext.child_elements().map(Chunk::from_element).collect())
            .unwrap_or_default();

        Ok(Self {
            id,
            issue_instant,
            destination: element.attribute("Destination").map(str::to_string),
            consent: element
                .attribute("Consent")
                .unwrap_or(CONSENT_UNSPECIFIED)
                .to_string(),
            issuer: element
                .first_child_named(ns::SAML, "Issuer")
                .map(|i| i.text().trim().to_string()),
            extensions,
            signed: SignedElement::from_element(element)?,
        })
    }

    pub fn was_signed(&self) -> bool {
        self.signed.was_signed()
    }

    /// Root element with the header attributes, Issuer and Extensions.
    pub(crate) fn to_element(&self, qname: &str) -> Element {
        let mut root = Element::new_ns(ns::SAMLP, qname);
        root.declare_namespace(Some(ns::prefix::SAMLP), ns::SAMLP);
        root.declare_namespace(Some(ns::prefix::SAML), ns::SAML);
        root.set_attribute("ID", self.id.as_str());
        root.set_attribute("Version", SAML_VERSION);
        root.set_attribute("IssueInstant", format_timestamp(&self.issue_instant));
        if let Some(destination) = &self.destination {
            root.set_attribute("Destination", destination.as_str());
        }
        if self.consent != CONSENT_UNSPECIFIED {
            root.set_attribute("Consent", self.consent.as_str());
        }
        if let Some(issuer) = &self.issuer {
            root.append_text_element(ns::SAML, "saml:Issuer", issuer.as_str());
        }
        if !self.extensions.is_empty() {
            let extensions = root.append_element(Element::new_ns(ns::SAMLP, "samlp:Extensions"));
            for chunk in &self.extensions {
                chunk.to_xml(extensions);
            }
        }
        root
    }

    /// Sign a finished message, placing the signature after the Issuer.
    pub(crate) fn sign(&self, root: &mut Element) -> Result<()> {
        let insert_at = insertion_point_after_issuer(root);
        self.signed.sign_element(root, insert_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::TracingContainer;
    use crate::xml;

    #[test]
    fn test_header_round_trip() {
        let mut header = MessageHeader::new_in(&TracingContainer);
        header.destination = Some("https://idp.example.org/slo".into());
        header.issuer = Some("https://sp.example.org".into());
        header.consent = "urn:oasis:names:tc:SAML:2.0:consent:obtained".into();
        header.extensions = vec![Chunk::from_element(&Element::new_ns("urn:x-test", "x:Ext"))];

        let root = header.to_element("samlp:LogoutRequest");
        let doc = xml::from_string(&root.to_xml_string().unwrap()).unwrap();
        let again = MessageHeader::from_element(doc.root(), "LogoutRequest").unwrap();

        assert_eq!(again.id, header.id);
        assert_eq!(again.destination, header.destination);
        assert_eq!(again.issuer, header.issuer);
        assert_eq!(again.consent, header.consent);
        assert_eq!(again.extensions.len(), 1);
        assert_eq!(again.extensions[0].local_name(), "Ext");
        assert!(!again.was_signed());
    }

    #[test]
    fn test_wrong_element_and_version() {
        let doc = xml::from_string(
            r#"<samlp:LogoutResponse xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="_1" Version="2.0" IssueInstant="2010-07-22T11:30:19Z"/>"#,
        )
        .unwrap();
        assert!(MessageHeader::from_element(doc.root(), "LogoutRequest").is_err());

        let doc = xml::from_string(
            r#"<samlp:LogoutRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="_1" Version="1.1" IssueInstant="2010-07-22T11:30:19Z"/>"#,
        )
        .unwrap();
        assert!(matches!(
            MessageHeader::from_element(doc.root(), "LogoutRequest"),
            Err(Error::UnsupportedVersion(_))
        ));
    }
}
