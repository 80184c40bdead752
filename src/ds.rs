//! `ds:KeyInfo` and friends as plain value objects.

use crate::error::{Error, Result};
use crate::xml::{Element, ns};

/// Any element kept verbatim because nothing here knows how to read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    element: Element,
}

impl Chunk {
    pub fn from_element(element: &Element) -> Self {
        Self {
            element: element.clone(),
        }
    }

    pub fn local_name(&self) -> &str {
        self.element.local_name()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.element.namespace()
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        parent.append_element(self.element.clone())
    }
}

fn expect_ds(element: &Element, local_name: &str) -> Result<()> {
    if element.is(ns::DS, local_name) {
        Ok(())
    } else {
        Err(Error::structure(format!(
            "Expected <ds:{local_name}>, got <{}>",
            element.qualified_name()
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyName {
    pub name: String,
}

impl KeyName {
    pub fn from_element(element: &Element) -> Result<Self> {
        expect_ds(element, "KeyName")?;
        Ok(Self {
            name: element.text(),
        })
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        parent.append_text_element(ns::DS, "ds:KeyName", self.name.as_str())
    }
}

/// Base64 DER certificate as found in `ds:X509Certificate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X509Certificate {
    pub certificate: String,
}

impl X509Certificate {
    pub fn from_element(element: &Element) -> Result<Self> {
        expect_ds(element, "X509Certificate")?;
        Ok(Self {
            certificate: element.text(),
        })
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        parent.append_text_element(ns::DS, "ds:X509Certificate", self.certificate.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum X509DataEntry {
    Certificate(X509Certificate),
    Chunk(Chunk),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct X509Data {
    pub data: Vec<X509DataEntry>,
}

impl X509Data {
    pub fn from_element(element: &Element) -> Result<Self> {
        expect_ds(element, "X509Data")?;
        let data = element
            .child_elements()
            .map(|child| {
                if child.is(ns::DS, "X509Certificate") {
                    X509Certificate::from_element(child).map(X509DataEntry::Certificate)
                } else {
                    Ok(X509DataEntry::Chunk(Chunk::from_element(child)))
                }
            })
            .collect::<Result<_>>()?;
        Ok(Self { data })
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        let el = parent.append_element(Element::new_ns(ns::DS, "ds:X509Data"));
        for entry in &self.data {
            match entry {
                X509DataEntry::Certificate(c) => {
                    c.to_xml(el);
                }
                X509DataEntry::Chunk(c) => {
                    c.to_xml(el);
                }
            }
        }
        el
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInfoEntry {
    KeyName(KeyName),
    X509Data(X509Data),
    Chunk(Chunk),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyInfo {
    pub id: Option<String>,
    pub info: Vec<KeyInfoEntry>,
}

impl KeyInfo {
    pub fn from_element(element: &Element) -> Result<Self> {
        expect_ds(element, "KeyInfo")?;
        let info = element
            .child_elements()
            .map(|child| match (child.namespace(), child.local_name()) {
                (Some(ns::DS), "KeyName") => KeyName::from_element(child).map(KeyInfoEntry::KeyName),
                (Some(ns::DS), "X509Data") => {
                    X509Data::from_element(child).map(KeyInfoEntry::X509Data)
                }
                _ => Ok(KeyInfoEntry::Chunk(Chunk::from_element(child))),
            })
            .collect::<Result<_>>()?;
        Ok(Self {
            id: element.attribute("Id").map(str::to_string),
            info,
        })
    }

    /// A KeyInfo carrying one `ds:X509Data` with the given base64 certificates.
    pub fn from_certificates<I, S>(certificates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let data = certificates
            .into_iter()
            .map(|c| {
                X509DataEntry::Certificate(X509Certificate {
                    certificate: c.into(),
                })
            })
            .collect();
        Self {
            id: None,
            info: vec![KeyInfoEntry::X509Data(X509Data { data })],
        }
    }

    /// Every `ds:X509Certificate` value, in document order.
    pub fn certificates(&self) -> impl Iterator<Item = &str> {
        self.info
            .iter()
            .filter_map(|entry| match entry {
                KeyInfoEntry::X509Data(data) => Some(data),
                _ => None,
            })
            .flat_map(|data| data.data.iter())
            .filter_map(|entry| match entry {
                X509DataEntry::Certificate(c) => Some(c.certificate.as_str()),
                X509DataEntry::Chunk(_) => None,
            })
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        let mut el = Element::new_ns(ns::DS, "ds:KeyInfo");
        if let Some(id) = &self.id {
            el.set_attribute("Id", id.as_str());
        }
        for entry in &self.info {
            match entry {
                KeyInfoEntry::KeyName(n) => {
                    n.to_xml(&mut el);
                }
                KeyInfoEntry::X509Data(d) => {
                    d.to_xml(&mut el);
                }
                KeyInfoEntry::Chunk(c) => {
                    c.to_xml(&mut el);
                }
            }
        }
        parent.append_element(el)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;

    const KEY_INFO: &str = r#"<ds:KeyInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#" Id="abc"><ds:KeyName>idp signing</ds:KeyName><ds:X509Data><ds:X509Certificate>MIIB</ds:X509Certificate><ds:X509SubjectName>CN=idp</ds:X509SubjectName></ds:X509Data><ds:KeyValue>...</ds:KeyValue></ds:KeyInfo>"#;

    #[test]
    fn test_parse_key_info() {
        let el = xml::from_string(KEY_INFO).unwrap().into_root();
        let key_info = KeyInfo::from_element(&el).unwrap();

        assert_eq!(key_info.id.as_deref(), Some("abc"));
        assert_eq!(key_info.info.len(), 3);
        assert!(matches!(&key_info.info[0], KeyInfoEntry::KeyName(n) if n.name == "idp signing"));
        match &key_info.info[1] {
            KeyInfoEntry::X509Data(data) => {
                assert_eq!(data.data.len(), 2);
                assert!(matches!(&data.data[1], X509DataEntry::Chunk(c) if c.local_name() == "X509SubjectName"));
            }
            other => panic!("unexpected entry {other:?}"),
        }
        assert!(matches!(&key_info.info[2], KeyInfoEntry::Chunk(c) if c.namespace() == Some(ns::DS)));
        assert_eq!(key_info.certificates().collect::<Vec<_>>(), ["MIIB"]);
    }

    #[test]
    fn test_key_info_roundtrip() {
        let el = xml::from_string(KEY_INFO).unwrap().into_root();
        let key_info = KeyInfo::from_element(&el).unwrap();

        let mut parent = Element::new("root");
        key_info.to_xml(&mut parent);
        let reparsed = KeyInfo::from_element(parent.first_child_element().unwrap()).unwrap();
        assert_eq!(reparsed, key_info);
    }

    #[test]
    fn test_wrong_element_is_rejected() {
        let el = xml::from_string(r#"<KeyInfo/>"#).unwrap().into_root();
        assert!(KeyInfo::from_element(&el).is_err());
    }
}
