//! Algorithm support advertisement (`alg`).

use crate::error::{Error, Result};
use crate::xml::{Element, ns};

fn algorithm(element: &Element) -> Result<String> {
    element.attribute("Algorithm").map(str::to_string).ok_or_else(|| {
        Error::structure(format!(
            "Missing required attribute \"Algorithm\" in alg:{} element.",
            element.local_name()
        ))
    })
}

fn key_size(element: &Element, name: &str) -> Result<Option<u32>> {
    element
        .attribute(name)
        .map(|v| {
            v.trim().parse().map_err(|_| {
                Error::structure(format!("Invalid {name} '{v}' in alg:SigningMethod element."))
            })
        })
        .transpose()
}

/// `alg:DigestMethod`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestMethod {
    pub algorithm: String,
}

impl DigestMethod {
    pub fn from_element(element: &Element) -> Result<Self> {
        Ok(Self {
            algorithm: algorithm(element)?,
        })
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        let el = parent.append_element(Element::new_ns(ns::ALG, "alg:DigestMethod"));
        el.set_attribute("Algorithm", self.algorithm.as_str());
        el
    }
}

/// `alg:SigningMethod`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningMethod {
    pub algorithm: String,
    pub min_key_size: Option<u32>,
    pub max_key_size: Option<u32>,
}

impl SigningMethod {
    pub fn from_element(element: &Element) -> Result<Self> {
        Ok(Self {
            algorithm: algorithm(element)?,
            min_key_size: key_size(element, "MinKeySize")?,
            max_key_size: key_size(element, "MaxKeySize")?,
        })
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        let el = parent.append_element(Element::new_ns(ns::ALG, "alg:SigningMethod"));
        el.set_attribute("Algorithm", self.algorithm.as_str());
        if let Some(min) = self.min_key_size {
            el.set_attribute("MinKeySize", min.to_string());
        }
        if let Some(max) = self.max_key_size {
            el.set_attribute("MaxKeySize", max.to_string());
        }
        el
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;

    #[test]
    fn test_signing_method() {
        let doc = xml::from_string(
            r#"<alg:SigningMethod xmlns:alg="urn:oasis:names:tc:SAML:metadata:algsupport" Algorithm="http://www.w3.org/2001/04/xmldsig-more#rsa-sha256" MinKeySize="1024" MaxKeySize="4096"/>"#,
        )
        .unwrap();
        let method = SigningMethod::from_element(doc.root()).unwrap();
        assert_eq!(method.min_key_size, Some(1024));
        assert_eq!(method.max_key_size, Some(4096));

        let mut parent = Element::new_ns(ns::MD, "md:Extensions");
        method.to_xml(&mut parent);
        assert_eq!(
            SigningMethod::from_element(parent.first_child_element().unwrap()).unwrap(),
            method
        );
    }

    #[test]
    fn test_algorithm_required() {
        let doc = xml::from_string(
            r#"<alg:SigningMethod xmlns:alg="urn:oasis:names:tc:SAML:metadata:algsupport" MinKeySize="1024"/>"#,
        )
        .unwrap();
        assert_eq!(
            SigningMethod::from_element(doc.root()).unwrap_err().to_string(),
            "Missing required attribute \"Algorithm\" in alg:SigningMethod element."
        );

        let doc = xml::from_string(
            r#"<alg:DigestMethod xmlns:alg="urn:oasis:names:tc:SAML:metadata:algsupport"/>"#,
        )
        .unwrap();
        assert!(DigestMethod::from_element(doc.root()).is_err());
    }
}
