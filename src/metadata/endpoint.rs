use crate::error::{Error, Result};
use crate::utils::{parse_boolean, set_boolean};
use crate::xml::{Element, ns};

/// `md:EndpointType`. The element name is chosen by the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointType {
    pub binding: String,
    pub location: String,
    pub response_location: Option<String>,
}

impl EndpointType {
    pub fn new(binding: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            binding: binding.into(),
            location: location.into(),
            response_location: None,
        }
    }

    pub fn from_element(element: &Element) -> Result<Self> {
        let required = |name: &str| {
            element
                .attribute(name)
                .map(str::to_string)
                .ok_or_else(|| {
                    Error::structure(format!("Missing {name} on {}", element.qualified_name()))
                })
        };
        Ok(Self {
            binding: required("Binding")?,
            location: required("Location")?,
            response_location: element.attribute("ResponseLocation").map(str::to_string),
        })
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element, qname: &str) -> &'a mut Element {
        let el = parent.append_element(Element::new_ns(ns::MD, qname));
        el.set_attribute("Binding", self.binding.as_str());
        el.set_attribute("Location", self.location.as_str());
        if let Some(response_location) = &self.response_location {
            el.set_attribute("ResponseLocation", response_location.as_str());
        }
        el
    }
}

/// `md:IndexedEndpointType`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedEndpointType {
    pub endpoint: EndpointType,
    pub index: u32,
    pub is_default: Option<bool>,
}

impl IndexedEndpointType {
    pub fn new(endpoint: EndpointType, index: u32) -> Self {
        Self {
            endpoint,
            index,
            is_default: None,
        }
    }

    pub fn from_element(element: &Element) -> Result<Self> {
        let index = element
            .attribute("index")
            .ok_or_else(|| Error::structure(format!("Missing index on {}", element.qualified_name())))?;
        let index = index.trim().parse().map_err(|_| {
            Error::structure(format!(
                "Invalid index '{index}' on {}",
                element.qualified_name()
            ))
        })?;
        Ok(Self {
            endpoint: EndpointType::from_element(element)?,
            index,
            is_default: parse_boolean(element, "isDefault")?,
        })
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element, qname: &str) -> &'a mut Element {
        let el = self.endpoint.to_xml(parent, qname);
        el.set_attribute("index", self.index.to_string());
        set_boolean(el, "isDefault", self.is_default);
        el
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BINDING_HTTP_POST;
    use crate::xml;

    #[test]
    fn test_indexed_endpoint_round_trip() {
        let doc = xml::from_string(&format!(
            r#"<md:AssertionConsumerService xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" Binding="{BINDING_HTTP_POST}" Location="https://sp.example.org/acs" index="3" isDefault="false"/>"#
        ))
        .unwrap();
        let endpoint = IndexedEndpointType::from_element(doc.root()).unwrap();
        assert_eq!(endpoint.index, 3);
        assert_eq!(endpoint.is_default, Some(false));
        assert_eq!(endpoint.endpoint.binding, BINDING_HTTP_POST);

        let mut parent = Element::new_ns(ns::MD, "md:SPSSODescriptor");
        endpoint.to_xml(&mut parent, "md:AssertionConsumerService");
        let again =
            IndexedEndpointType::from_element(parent.first_child_element().unwrap()).unwrap();
        assert_eq!(again, endpoint);
    }

    #[test]
    fn test_missing_index() {
        let doc = xml::from_string(
            r#"<md:ArtifactResolutionService xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" Binding="b" Location="l"/>"#,
        )
        .unwrap();
        assert_eq!(
            IndexedEndpointType::from_element(doc.root()).unwrap_err().to_string(),
            "Missing index on md:ArtifactResolutionService"
        );
    }

    #[test]
    fn test_missing_binding() {
        let doc = xml::from_string(
            r#"<md:SingleLogoutService xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" Location="l"/>"#,
        )
        .unwrap();
        assert!(EndpointType::from_element(doc.root()).is_err());
    }
}
