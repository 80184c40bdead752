use crate::ds::{Chunk, KeyInfo};
use crate::error::{Error, Result};
use crate::xml::{Element, ns};

/// `md:KeyDescriptor`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDescriptor {
    /// `signing`, `encryption` or unset for both
    pub key_use: Option<String>,
    pub key_info: KeyInfo,
    pub encryption_method: Vec<Chunk>,
}

impl KeyDescriptor {
    pub fn new(key_info: KeyInfo) -> Self {
        Self {
            key_use: None,
            key_info,
            encryption_method: Vec::new(),
        }
    }

    pub fn from_element(element: &Element) -> Result<Self> {
        let key_infos: Vec<_> = element.children_named(ns::DS, "KeyInfo").collect();
        let key_info = match key_infos.as_slice() {
            [key_info] => KeyInfo::from_element(key_info)?,
            [] => return Err(Error::structure("Missing ds:KeyInfo in KeyDescriptor.")),
            _ => return Err(Error::structure("More than one ds:KeyInfo in KeyDescriptor.")),
        };
        Ok(Self {
            key_use: element.attribute("use").map(str::to_string),
            key_info,
            encryption_method: element
                .children_named(ns::MD, "EncryptionMethod")
                .map(Chunk::from_element)
                .collect(),
        })
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        let el = parent.append_element(Element::new_ns(ns::MD, "md:KeyDescriptor"));
        if let Some(key_use) = &self.key_use {
            el.set_attribute("use", key_use.as_str());
        }
        self.key_info.to_xml(el);
        for method in &self.encryption_method {
            method.to_xml(el);
        }
        el
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;

    #[test]
    fn test_key_descriptor() {
        let doc = xml::from_string(
            r#"<md:KeyDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" xmlns:ds="http://www.w3.org/2000/09/xmldsig#" use="encryption"><ds:KeyInfo><ds:KeyName>enc</ds:KeyName></ds:KeyInfo><md:EncryptionMethod Algorithm="http://www.w3.org/2001/04/xmlenc#aes128-cbc"/></md:KeyDescriptor>"#,
        )
        .unwrap();
        let kd = KeyDescriptor::from_element(doc.root()).unwrap();
        assert_eq!(kd.key_use.as_deref(), Some("encryption"));
        assert_eq!(kd.encryption_method.len(), 1);

        let mut parent = Element::new_ns(ns::MD, "md:IDPSSODescriptor");
        kd.to_xml(&mut parent);
        assert_eq!(
            KeyDescriptor::from_element(parent.first_child_element().unwrap()).unwrap(),
            kd
        );
    }

    #[test]
    fn test_key_info_required() {
        let doc = xml::from_string(
            r#"<md:KeyDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata"/>"#,
        )
        .unwrap();
        assert_eq!(
            KeyDescriptor::from_element(doc.root()).unwrap_err().to_string(),
            "Missing ds:KeyInfo in KeyDescriptor."
        );
    }
}
