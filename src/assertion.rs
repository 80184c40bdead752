//! The `saml:Assertion` object model.
//!
//! Parsing enforces the structural rules of the assertion schema in a
//! single pass and captures, but never decrypts, encrypted identifiers and
//! attributes. Serialization emits children in schema order and signs last.

mod attribute;
mod authn;
mod conditions;
mod name_id;
mod subject;

pub use attribute::AttributeValue;
pub use authn::{AuthnContext, SubjectLocality};
pub use name_id::{Identifier, NameId};
pub use subject::{SubjectConfirmation, SubjectConfirmationData};

use chrono::{DateTime, Utc};
use tracing::debug;

pub(crate) use self::attribute::{attribute_element, fill_attribute, parse_attribute};
use self::authn::AuthnStatement;
use self::conditions::Conditions;
use crate::constants::{NAMEFORMAT_UNSPECIFIED, SAML_VERSION};
use crate::container::{Container, TracingContainer};
use crate::ds::Chunk;
use crate::error::{Error, Result};
use crate::signed::{Signable, SignedElement};
use crate::utils::{format_timestamp, parse_timestamp};
use crate::xml::{Element, ns};
use crate::xmlsec::{self, EncryptedElement, SecurityKey, insertion_point_after_issuer};

#[derive(Debug, Clone)]
pub struct Assertion {
    id: String,
    issue_instant: DateTime<Utc>,
    issuer: String,

    name_id: Option<Identifier>,
    subject_confirmation: Vec<SubjectConfirmation>,

    conditions: Conditions,

    authn_instant: DateTime<Utc>,
    session_not_on_or_after: Option<DateTime<Utc>>,
    session_index: Option<String>,
    subject_locality: Option<SubjectLocality>,
    authn_context: AuthnContext,

    attributes: Vec<(String, Vec<AttributeValue>)>,
    attribute_name_format: String,
    encrypted_attributes: Vec<EncryptedElement>,
    required_enc_attributes: bool,
    encryption_key: Option<SecurityKey>,

    signed: SignedElement,
    was_signed_at_construction: bool,
}

impl Default for Assertion {
    fn default() -> Self {
        Self::new()
    }
}

impl Assertion {
    /// An empty assertion with a fresh ID, issued now.
    pub fn new() -> Self {
        Self::new_in(&TracingContainer)
    }

    pub fn new_in(container: &dyn Container) -> Self {
        let now = Utc::now();
        Self {
            id: container.generate_id(),
            issue_instant: now,
            issuer: String::new(),
            name_id: None,
            subject_confirmation: Vec::new(),
            conditions: Conditions::default(),
            authn_instant: now,
            session_not_on_or_after: None,
            session_index: None,
            subject_locality: None,
            authn_context: AuthnContext::default(),
            attributes: Vec::new(),
            attribute_name_format: NAMEFORMAT_UNSPECIFIED.to_string(),
            encrypted_attributes: Vec::new(),
            required_enc_attributes: false,
            encryption_key: None,
            signed: SignedElement::default(),
            was_signed_at_construction: false,
        }
    }

    /// Build an assertion from a `saml:Assertion` element.
    pub fn from_element(element: &Element) -> Result<Self> {
        if !element.is(ns::SAML, "Assertion") {
            return Err(Error::structure(format!(
                "Expected <saml:Assertion>, got <{}>",
                element.qualified_name()
            )));
        }

        let version = element.attribute("Version").unwrap_or_default();
        if version != SAML_VERSION {
            return Err(Error::UnsupportedVersion(version.to_string()));
        }

        let id = match element.attribute("ID") {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return Err(Error::MissingId("SAML assertion")),
        };

        let issue_instant = element
            .attribute("IssueInstant")
            .ok_or_else(|| Error::structure("Missing IssueInstant attribute on SAML assertion"))
            .and_then(parse_timestamp)?;

        let issuer = match element
            .children_named(ns::SAML, "Issuer")
            .collect::<Vec<_>>()
            .as_slice()
        {
            [] => return Err(Error::MissingIssuer("assertion")),
            [issuer] => issuer.text().trim().to_string(),
            _ => {
                return Err(Error::structure(
                    "More than one <saml:Issuer> in <saml:Assertion>",
                ));
            }
        };

        let mut assertion = Self {
            id,
            issue_instant,
            issuer,
            ..Self::new()
        };
        assertion.parse_subject(element)?;
        assertion.parse_conditions(element)?;
        assertion.parse_authn_statement(element)?;
        assertion.parse_attributes(element)?;
        assertion.parse_encrypted_attributes(element)?;

        assertion.signed = SignedElement::from_element(element)?;
        assertion.was_signed_at_construction = assertion.signed.was_signed();

        debug!(id = %assertion.id, signed = assertion.was_signed_at_construction, "Parsed assertion");
        Ok(assertion)
    }

    fn parse_subject(&mut self, element: &Element) -> Result<()> {
        let subjects: Vec<_> = element.children_named(ns::SAML, "Subject").collect();
        let subject = match subjects.as_slice() {
            [] => return Ok(()),
            [subject] => *subject,
            _ => {
                return Err(Error::structure(
                    "More than one <saml:Subject> in <saml:Assertion>.",
                ));
            }
        };

        let identifiers: Vec<_> = subject
            .child_elements()
            .filter(|e| Identifier::is_identifier(e))
            .collect();
        if identifiers.len() > 1 {
            return Err(Error::TooManyNameIds("<saml:Subject>"));
        }

        let confirmations: Vec<_> = subject
            .children_named(ns::SAML, "SubjectConfirmation")
            .collect();
        if confirmations.is_empty() && identifiers.is_empty() {
            return Err(Error::MissingSubjectConfirmation);
        }

        self.name_id = identifiers
            .first()
            .map(|e| Identifier::from_element(e))
            .transpose()?;
        self.subject_confirmation = confirmations
            .into_iter()
            .map(SubjectConfirmation::from_element)
            .collect::<Result<_>>()?;
        Ok(())
    }

    fn parse_conditions(&mut self, element: &Element) -> Result<()> {
        let conditions: Vec<_> = element.children_named(ns::SAML, "Conditions").collect();
        match conditions.as_slice() {
            [] => {}
            [conditions] => self.conditions = Conditions::from_element(conditions)?,
            _ => {
                return Err(Error::structure(
                    "More than one <saml:Conditions> in <saml:Assertion>.",
                ));
            }
        }
        Ok(())
    }

    fn parse_authn_statement(&mut self, element: &Element) -> Result<()> {
        let statements: Vec<_> = element.children_named(ns::SAML, "AuthnStatement").collect();
        let statement = match statements.as_slice() {
            [] => return Ok(()),
            [statement] => AuthnStatement::from_element(statement)?,
            _ => return Err(Error::TooManyAuthnStatements),
        };

        self.authn_instant = statement.authn_instant;
        self.session_not_on_or_after = statement.session_not_on_or_after;
        self.session_index = statement.session_index;
        self.subject_locality = statement.subject_locality;
        self.authn_context = statement.context;
        Ok(())
    }

    fn parse_attributes(&mut self, element: &Element) -> Result<()> {
        let mut name_format: Option<String> = None;
        for statement in element.children_named(ns::SAML, "AttributeStatement") {
            for attribute in statement.children_named(ns::SAML, "Attribute") {
                let format = attribute
                    .attribute("NameFormat")
                    .unwrap_or(NAMEFORMAT_UNSPECIFIED);
                name_format = Some(match name_format {
                    Some(current) if current != format => NAMEFORMAT_UNSPECIFIED.to_string(),
                    Some(current) => current,
                    None => format.to_string(),
                });

                let (name, values) = parse_attribute(attribute)?;
                self.add_attribute_values(name, values);
            }
        }
        if let Some(format) = name_format {
            self.attribute_name_format = format;
        }
        Ok(())
    }

    fn parse_encrypted_attributes(&mut self, element: &Element) -> Result<()> {
        self.encrypted_attributes = element
            .children_named(ns::SAML, "AttributeStatement")
            .flat_map(|s| s.children_named(ns::SAML, "EncryptedAttribute"))
            .map(EncryptedElement::from_wrapper)
            .collect::<Result<_>>()?;
        Ok(())
    }

    fn add_attribute_values(&mut self, name: String, values: Vec<AttributeValue>) {
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => existing.extend(values),
            None => self.attributes.push((name, values)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn issue_instant(&self) -> DateTime<Utc> {
        self.issue_instant
    }

    pub fn set_issue_instant(&mut self, issue_instant: DateTime<Utc>) {
        self.issue_instant = issue_instant;
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn set_issuer(&mut self, issuer: impl Into<String>) {
        self.issuer = issuer.into();
    }

    /// The subject NameID. Fails when it is still encrypted.
    pub fn name_id(&self) -> Result<Option<&NameId>> {
        self.name_id.as_ref().map(Identifier::name_id).transpose()
    }

    pub fn identifier(&self) -> Option<&Identifier> {
        self.name_id.as_ref()
    }

    pub fn set_name_id(&mut self, name_id: Option<NameId>) {
        self.name_id = name_id.map(Identifier::Plain);
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

    /// Decrypt the subject NameID with a private key. A plain NameID is left alone.
    pub fn decrypt_name_id(&mut self, key: &SecurityKey) -> Result<()> {
        match &mut self.name_id {
            Some(id) => id.decrypt(key),
            None => Ok(()),
        }
    }

    pub fn subject_confirmation(&self) -> &[SubjectConfirmation] {
        &self.subject_confirmation
    }

    pub fn set_subject_confirmation(&mut self, confirmations: Vec<SubjectConfirmation>) {
        self.subject_confirmation = confirmations;
    }

    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        self.conditions.not_before
    }

    pub fn set_not_before(&mut self, not_before: Option<DateTime<Utc>>) {
        self.conditions.not_before = not_before;
    }

    pub fn not_on_or_after(&self) -> Option<DateTime<Utc>> {
        self.conditions.not_on_or_after
    }

    pub fn set_not_on_or_after(&mut self, not_on_or_after: Option<DateTime<Utc>>) {
        self.conditions.not_on_or_after = not_on_or_after;
    }

    /// Audiences allowed to consume the assertion; `None` means any.
    pub fn valid_audiences(&self) -> Option<&[String]> {
        self.conditions.valid_audiences.as_deref()
    }

    pub fn set_valid_audiences(&mut self, audiences: Option<Vec<String>>) {
        self.conditions.valid_audiences = audiences;
    }

    pub fn authn_instant(&self) -> DateTime<Utc> {
        self.authn_instant
    }

    pub fn set_authn_instant(&mut self, authn_instant: DateTime<Utc>) {
        self.authn_instant = authn_instant;
    }

    pub fn session_not_on_or_after(&self) -> Option<DateTime<Utc>> {
        self.session_not_on_or_after
    }

    pub fn set_session_not_on_or_after(&mut self, value: Option<DateTime<Utc>>) {
        self.session_not_on_or_after = value;
    }

    pub fn session_index(&self) -> Option<&str> {
        self.session_index.as_deref()
    }

    pub fn set_session_index(&mut self, session_index: Option<String>) {
        self.session_index = session_index;
    }

    pub fn subject_locality(&self) -> Option<&SubjectLocality> {
        self.subject_locality.as_ref()
    }

    pub fn set_subject_locality(&mut self, locality: Option<SubjectLocality>) {
        self.subject_locality = locality;
    }

    pub fn authn_context_class_ref(&self) -> Option<&str> {
        self.authn_context.class_ref()
    }

    pub fn set_authn_context_class_ref(&mut self, class_ref: Option<String>) {
        self.authn_context.set_class_ref(class_ref);
    }

    pub fn authn_context_decl(&self) -> Option<&Chunk> {
        self.authn_context.decl()
    }

    /// Fails when a declaration reference is already set.
    pub fn set_authn_context_decl(&mut self, decl: Option<Chunk>) -> Result<()> {
        self.authn_context.set_decl(decl)
    }

    pub fn authn_context_decl_ref(&self) -> Option<&str> {
        self.authn_context.decl_ref()
    }

    /// Fails when a declaration is already set.
    pub fn set_authn_context_decl_ref(&mut self, decl_ref: Option<String>) -> Result<()> {
        self.authn_context.set_decl_ref(decl_ref)
    }

    pub fn authenticating_authority(&self) -> &[String] {
        &self.authn_context.authenticating_authority
    }

    pub fn set_authenticating_authority(&mut self, authorities: Vec<String>) {
        self.authn_context.authenticating_authority = authorities;
    }

    pub fn attributes(&self) -> &[(String, Vec<AttributeValue>)] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&[AttributeValue]> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn set_attributes(&mut self, attributes: Vec<(String, Vec<AttributeValue>)>) {
        self.attributes = attributes;
    }

    pub fn add_attribute_value(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.add_attribute_values(name.into(), vec![value.into()]);
    }

    /// Shared NameFormat of all attributes, `unspecified` when they differ.
    pub fn attribute_name_format(&self) -> &str {
        &self.attribute_name_format
    }

    pub fn set_attribute_name_format(&mut self, name_format: impl Into<String>) {
        self.attribute_name_format = name_format.into();
    }

    pub fn has_encrypted_attributes(&self) -> bool {
        !self.encrypted_attributes.is_empty()
    }

    pub fn encrypted_attributes(&self) -> &[EncryptedElement] {
        &self.encrypted_attributes
    }

    /// Decrypt every `saml:EncryptedAttribute` and merge it into the attributes.
    pub fn decrypt_attributes(&mut self, key: &SecurityKey) -> Result<()> {
        let decrypted = self
            .encrypted_attributes
            .iter()
            .map(|encrypted| {
                let attribute = xmlsec::decrypt_element(encrypted, key)?;
                if !attribute.is(ns::SAML, "Attribute") {
                    return Err(Error::Decryption(format!(
                        "Expected a <saml:Attribute>, decrypted <{}>",
                        attribute.qualified_name()
                    )));
                }
                parse_attribute(&attribute)
            })
            .collect::<Result<Vec<_>>>()?;

        for (name, values) in decrypted {
            self.add_attribute_values(name, values);
        }
        self.encrypted_attributes.clear();
        Ok(())
    }

    /// Emit every attribute as `saml:EncryptedAttribute` once an encryption key is set.
    pub fn set_encrypted_attributes(&mut self, encrypt: bool) {
        self.required_enc_attributes = encrypt;
    }

    pub fn encryption_key(&self) -> Option<&SecurityKey> {
        self.encryption_key.as_ref()
    }

    pub fn set_encryption_key(&mut self, key: Option<SecurityKey>) {
        self.encryption_key = key;
    }

    /// Algorithm URI of the signature found at parse time.
    pub fn signature_method(&self) -> Option<&'static str> {
        self.signed.signature_data().map(|s| s.algorithm().uri())
    }

    pub fn was_signed_at_construction(&self) -> bool {
        self.was_signed_at_construction
    }

    /// Serialize, signing when a signature key is set.
    pub fn to_xml(&self) -> Result<Element> {
        let mut root = Element::new_ns(ns::SAML, "saml:Assertion");
        root.declare_namespace(Some(ns::prefix::SAML), ns::SAML);
        root.set_attribute("ID", self.id.as_str());
        root.set_attribute("Version", SAML_VERSION);
        root.set_attribute("IssueInstant", format_timestamp(&self.issue_instant));

        root.append_text_element(ns::SAML, "saml:Issuer", self.issuer.as_str());

        self.add_subject(&mut root);
        self.conditions.to_xml(&mut root)?;
        self.add_authn_statement(&mut root);
        self.add_attribute_statement(&mut root)?;

        let insert_at = insertion_point_after_issuer(&root);
        self.signed.sign_element(&mut root, insert_at)?;
        Ok(root)
    }

    fn add_subject(&self, root: &mut Element) {
        if self.name_id.is_none() && self.subject_confirmation.is_empty() {
            return;
        }
        let subject = root.append_element(Element::new_ns(ns::SAML, "saml:Subject"));
        if let Some(name_id) = &self.name_id {
            subject.append_element(name_id.to_element());
        }
        for confirmation in &self.subject_confirmation {
            confirmation.to_xml(subject);
        }
    }

    fn add_authn_statement(&self, root: &mut Element) {
        if self.authn_context.is_empty() {
            return;
        }
        AuthnStatement {
            authn_instant: self.authn_instant,
            session_not_on_or_after: self.session_not_on_or_after,
            session_index: self.session_index.clone(),
            subject_locality: self.subject_locality.clone(),
            context: self.authn_context.clone(),
        }
        .to_xml(root);
    }

    fn add_attribute_statement(&self, root: &mut Element) -> Result<()> {
        if self.attributes.is_empty() && self.encrypted_attributes.is_empty() {
            return Ok(());
        }
        let name_format = Some(self.attribute_name_format.as_str())
            .filter(|f| *f != NAMEFORMAT_UNSPECIFIED);

        let statement = root.append_element(Element::new_ns(ns::SAML, "saml:AttributeStatement"));
        for (name, values) in &self.attributes {
            let attribute = attribute_element(name, name_format, values);
            match (&self.encryption_key, self.required_enc_attributes) {
                (Some(key), true) => {
                    let encrypted = xmlsec::encrypt_element(&attribute, key)?;
                    statement.append_element(
                        encrypted.to_wrapper(ns::SAML, "saml:EncryptedAttribute"),
                    );
                }
                _ => {
                    statement.append_element(attribute);
                }
            }
        }
        for encrypted in &self.encrypted_attributes {
            statement.append_element(encrypted.to_wrapper(ns::SAML, "saml:EncryptedAttribute"));
        }
        Ok(())
    }
}

impl Signable for Assertion {
    fn signed(&self) -> &SignedElement {
        &self.signed
    }

    fn signed_mut(&mut self) -> &mut SignedElement {
        &mut self.signed
    }
}

impl TryFrom<&Element> for Assertion {
    type Error = Error;

    fn try_from(element: &Element) -> Result<Self> {
        Assertion::from_element(element)
    }
}
