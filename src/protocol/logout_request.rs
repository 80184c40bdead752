use chrono::{DateTime, Utc};
use tracing::debug;

use crate::assertion::{Identifier, NameId};
use crate::container::{Container, TracingContainer};
use crate::error::{Error, Result};
use crate::protocol::MessageHeader;
use crate::signed::{Signable, SignedElement};
use crate::utils::{extract_strings, format_timestamp, timestamp_attribute};
use crate::xml::{Element, ns};
use crate::xmlsec::SecurityKey;

const ELEMENT: &str = "<samlp:LogoutRequest>";

/// `samlp:LogoutRequest`
#[derive(Debug, Clone)]
pub struct LogoutRequest {
    header: MessageHeader,
    not_on_or_after: Option<DateTime<Utc>>,
    reason: Option<String>,
    name_id: Option<Identifier>,
    session_indexes: Vec<String>,
}

impl Default for LogoutRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl LogoutRequest {
    pub fn new() -> Self {
        Self::new_in(&TracingContainer)
    }

    pub fn new_in(container: &dyn Container) -> Self {
        Self {
            header: MessageHeader::new_in(container),
            not_on_or_after: None,
            reason: None,
            name_id: None,
            session_indexes: Vec::new(),
        }
    }

    pub fn from_element(element: &Element) -> Result<Self> {
        let header = MessageHeader::from_element(element, "LogoutRequest")?;

        let identifiers: Vec<_> = element
            .child_elements()
            .filter(|e| Identifier::is_identifier(e))
            .collect();
        let name_id = match identifiers.as_slice() {
            [] => return Err(Error::MissingNameId(ELEMENT)),
            [identifier] => Identifier::from_element(identifier)?,
            _ => return Err(Error::TooManyNameIds(ELEMENT)),
        };

        let request = Self {
            header,
            not_on_or_after: timestamp_attribute(element, "NotOnOrAfter")?,
            reason: element.attribute("Reason").map(str::to_string),
            name_id: Some(name_id),
            session_indexes: extract_strings(element, ns::SAMLP, "SessionIndex")
                .into_iter()
                .map(|s| s.trim().to_string())
                .collect(),
        };
        debug!(id = %request.header.id, "Parsed logout request");
        Ok(request)
    }

    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut MessageHeader {
        &mut self.header
    }

    pub fn id(&self) -> &str {
        &self.header.id
    }

    pub fn issuer(&self) -> Option<&str> {
        self.header.issuer.as_deref()
    }

    pub fn set_issuer(&mut self, issuer: Option<String>) {
        self.header.issuer = issuer;
    }

    pub fn not_on_or_after(&self) -> Option<DateTime<Utc>> {
        self.not_on_or_after
    }

    pub fn set_not_on_or_after(&mut self, not_on_or_after: Option<DateTime<Utc>>) {
        self.not_on_or_after = not_on_or_after;
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn set_reason(&mut self, reason: Option<String>) {
        self.reason = reason;
    }

    pub fn is_name_id_encrypted(&self) -> bool {
        self.name_id.as_ref().is_some_and(Identifier::is_encrypted)
    }

    pub fn encrypt_name_id(&mut self, key: &SecurityKey) -> Result<()> {
        match &mut self.name_id {
            Some(id) => id.encrypt(key),
            None => Ok(()),
        }
    }

    pub fn decrypt_name_id(&mut self, key: &SecurityKey) -> Result<()> {
        match &mut self.name_id {
            Some(id) => id.decrypt(key),
            None => Ok(()),
        }
    }

    /// The NameID of the session to end. Fails while it is encrypted.
    pub fn name_id(&self) -> Result<Option<&NameId>> {
        self.name_id.as_ref().map(Identifier::name_id).transpose()
    }

    pub fn set_name_id(&mut self, name_id: NameId) {
        self.name_id = Some(Identifier::Plain(name_id));
    }

    pub fn session_indexes(&self) -> &[String] {
        &self.session_indexes
    }

    pub fn set_session_indexes(&mut self, session_indexes: Vec<String>) {
        self.session_indexes = session_indexes;
    }

    /// First SessionIndex, if any.
    pub fn session_index(&self) -> Option<&str> {
        self.session_indexes.first().map(String::as_str)
    }

    /// Replace all session indexes with `session_index`, or clear them.
    pub fn set_session_index(&mut self, session_index: Option<String>) {
        self.session_indexes = session_index.into_iter().collect();
    }

    pub fn to_unsigned_xml(&self) -> Result<Element> {
        let name_id = self.name_id.as_ref().ok_or(Error::MissingNameId(ELEMENT))?;

        let mut root = self.header.to_element("samlp:LogoutRequest");
        if let Some(ts) = &self.not_on_or_after {
            root.set_attribute("NotOnOrAfter", format_timestamp(ts));
        }
        if let Some(reason) = &self.reason {
            root.set_attribute("Reason", reason.as_str());
        }
        root.append_element(name_id.to_element());
        for index in &self.session_indexes {
            root.append_text_element(ns::SAMLP, "samlp:SessionIndex", index.as_str());
        }
        Ok(root)
    }

    /// Serialize and sign when a signature key is set.
    pub fn to_signed_xml(&self) -> Result<Element> {
        let mut root = self.to_unsigned_xml()?;
        self.header.sign(&mut root)?;
        Ok(root)
    }
}

impl Signable for LogoutRequest {
    fn signed(&self) -> &SignedElement {
        &self.header.signed
    }

    fn signed_mut(&mut self) -> &mut SignedElement {
        &mut self.header.signed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NAMEID_UNSPECIFIED;
    use crate::error::ErrorKind;
    use crate::xml;
    use chrono::TimeZone;

    const ENVELOPE: &str = r#"<samlp:LogoutRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="SomeIDValue" Version="2.0" IssueInstant="2010-07-22T11:30:19Z"{attrs}>
  <saml:Issuer>TheIssuer</saml:Issuer>
  {body}
</samlp:LogoutRequest>"#;

    fn parse(attrs: &str, body: &str) -> Result<LogoutRequest> {
        let xml = ENVELOPE.replace("{attrs}", attrs).replace("{body}", body);
        let doc = xml::from_string(&xml).unwrap();
        LogoutRequest::from_element(doc.root())
    }

    const FRITS: &str = r#"<saml:NameID Format="urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified">frits</saml:NameID>"#;

    #[test]
    fn test_plain_name_id() {
        let request = parse("", FRITS).unwrap();
        let name_id = request.name_id().unwrap().unwrap();
        assert_eq!(name_id.value, "frits");
        assert_eq!(name_id.format.as_deref(), Some(NAMEID_UNSPECIFIED));
        assert!(!request.is_name_id_encrypted());
        assert_eq!(request.issuer(), Some("TheIssuer"));
        assert!(request.session_indexes().is_empty());
        assert_eq!(request.session_index(), None);
    }

    #[test]
    fn test_missing_name_id() {
        let err = parse("", "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralViolation);
        assert_eq!(
            err.to_string(),
            "Missing <saml:NameID> or <saml:EncryptedID> in <samlp:LogoutRequest>"
        );
    }

    #[test]
    fn test_multiple_name_ids() {
        let body = format!("{FRITS}{}", FRITS.replace("frits", "willem"));
        assert!(matches!(parse("", &body), Err(Error::TooManyNameIds(_))));
    }

    #[test]
    fn test_not_on_or_after() {
        let request = parse(r#" NotOnOrAfter="2018-11-28T19:33:12Z""#, FRITS).unwrap();
        assert_eq!(
            request.not_on_or_after(),
            Some(Utc.with_ymd_and_hms(2018, 11, 28, 19, 33, 12).unwrap())
        );
    }

    #[test]
    fn test_session_index_variants() {
        let mut request = LogoutRequest::new();
        request.set_session_indexes(vec!["SessionIndexValue1".into(), "SessionIndexValue2".into()]);
        assert_eq!(request.session_indexes().len(), 2);
        request.set_session_index(None);
        assert!(request.session_indexes().is_empty());
        request.set_session_indexes(vec!["SessionIndexValue1".into(), "SessionIndexValue2".into()]);
        request.set_session_index(Some("SessionIndexValue3".into()));
        assert_eq!(request.session_indexes(), ["SessionIndexValue3"]);
        assert_eq!(request.session_index(), Some("SessionIndexValue3"));
    }

    #[test]
    fn test_marshalling() {
        let mut request = LogoutRequest::new();
        request.set_name_id(NameId::new("NameIDValue"));
        request.set_session_index(Some("SessionIndexValue".into()));
        request.set_reason(Some(crate::constants::LOGOUT_USER.into()));

        let root = request.to_unsigned_xml().unwrap();
        assert!(root.is(ns::SAMLP, "LogoutRequest"));
        let name_ids: Vec<_> = root.children_named(ns::SAML, "NameID").collect();
        assert_eq!(name_ids.len(), 1);
        assert_eq!(name_ids[0].text(), "NameIDValue");
        assert_eq!(extract_strings(&root, ns::SAMLP, "SessionIndex"), ["SessionIndexValue"]);

        let again = LogoutRequest::from_element(&root).unwrap();
        assert_eq!(again.reason(), request.reason());
        assert_eq!(again.session_index(), Some("SessionIndexValue"));
    }

    #[test]
    fn test_unsigned_xml_requires_name_id() {
        assert!(LogoutRequest::new().to_unsigned_xml().is_err());
    }
}
