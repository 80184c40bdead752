use crate::error::{Error, Result};
use crate::xml::{Element, ns};
use crate::xmlsec::{self, EncryptedElement, SecurityKey};

/// The value and qualifiers of a `saml:NameID`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameId {
    pub value: String,
    pub format: Option<String>,
    pub name_qualifier: Option<String>,
    pub sp_name_qualifier: Option<String>,
    pub sp_provided_id: Option<String>,
}

impl NameId {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn from_element(element: &Element) -> Result<Self> {
        let attr = |name| element.attribute(name).map(str::to_string);
        Ok(Self {
            value: element.text().trim().to_string(),
            format: attr("Format"),
            name_qualifier: attr("NameQualifier"),
            sp_name_qualifier: attr("SPNameQualifier"),
            sp_provided_id: attr("SPProvidedID"),
        })
    }

    pub fn to_element(&self) -> Element {
        let mut el = Element::new_ns(ns::SAML, "saml:NameID");
        for (name, value) in [
            ("NameQualifier", &self.name_qualifier),
            ("SPNameQualifier", &self.sp_name_qualifier),
            ("Format", &self.format),
            ("SPProvidedID", &self.sp_provided_id),
        ] {
            if let Some(value) = value {
                el.set_attribute(name, value.as_str());
            }
        }
        el.set_text(self.value.as_str());
        el
    }
}

/// A subject identifier that may still be encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Plain(NameId),
    Encrypted(EncryptedElement),
}

impl Identifier {
    /// Read a `saml:NameID` or a `saml:EncryptedID`.
    pub fn from_element(element: &Element) -> Result<Self> {
        if element.is(ns::SAML, "NameID") {
            NameId::from_element(element).map(Identifier::Plain)
        } else if element.is(ns::SAML, "EncryptedID") {
            EncryptedElement::from_wrapper(element).map(Identifier::Encrypted)
        } else {
            Err(Error::structure(format!(
                "Expected <saml:NameID> or <saml:EncryptedID>, got <{}>",
                element.qualified_name()
            )))
        }
    }

    pub(crate) fn is_identifier(element: &Element) -> bool {
        element.is(ns::SAML, "NameID") || element.is(ns::SAML, "EncryptedID")
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, Identifier::Encrypted(_))
    }

    /// The plain NameID, failing when it has not been decrypted yet.
    pub fn name_id(&self) -> Result<&NameId> {
        match self {
            Identifier::Plain(name_id) => Ok(name_id),
            Identifier::Encrypted(_) => Err(Error::NotDecryptedYet("NameID")),
        }
    }

    /// Encrypt a plain identifier for the holder of `key`.
    pub fn encrypt(&mut self, key: &SecurityKey) -> Result<()> {
        if let Identifier::Plain(name_id) = self {
            let encrypted = xmlsec::encrypt_element(&name_id.to_element(), key)?;
            *self = Identifier::Encrypted(encrypted);
        }
        Ok(())
    }

    /// Decrypt with the private `key`. A plain identifier is left alone.
    pub fn decrypt(&mut self, key: &SecurityKey) -> Result<()> {
        if let Identifier::Encrypted(encrypted) = self {
            let element = xmlsec::decrypt_element(encrypted, key)?;
            if !element.is(ns::SAML, "NameID") {
                return Err(Error::Decryption(format!(
                    "Expected a <saml:NameID>, decrypted <{}>",
                    element.qualified_name()
                )));
            }
            *self = Identifier::Plain(NameId::from_element(&element)?);
        }
        Ok(())
    }

    pub fn to_element(&self) -> Element {
        match self {
            Identifier::Plain(name_id) => name_id.to_element(),
            Identifier::Encrypted(encrypted) => encrypted.to_wrapper(ns::SAML, "saml:EncryptedID"),
        }
    }
}

impl From<NameId> for Identifier {
    fn from(name_id: NameId) -> Self {
        Identifier::Plain(name_id)
    }
}
