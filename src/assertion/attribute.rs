use crate::assertion::name_id::NameId;
use crate::constants::{EPTI_URN_MACE, EPTI_URN_OID};
use crate::error::{Error, Result};
use crate::xml::{Element, Node, ns, set_xsi_type};

/// One decoded `saml:AttributeValue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Text(String),
    Integer(i64),
    /// eduPersonTargetedID values
    NameId(NameId),
    /// Element content kept as found
    Opaque(Vec<Node>),
}

impl AttributeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_name_id(&self) -> Option<&NameId> {
        match self {
            AttributeValue::NameId(name_id) => Some(name_id),
            _ => None,
        }
    }

    fn decode(value: &Element) -> Result<Self> {
        if value.child_elements().next().is_some() {
            return Ok(AttributeValue::Opaque(value.children().to_vec()));
        }
        if value.attribute_ns(ns::XSI, "type") == Some("xs:integer") {
            let text = value.text();
            return text.trim().parse().map(AttributeValue::Integer).map_err(|_| {
                Error::structure(format!("Invalid xs:integer attribute value: '{text}'"))
            });
        }
        Ok(AttributeValue::Text(value.text().trim().to_string()))
    }

    fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        let el = parent.append_element(Element::new_ns(ns::SAML, "saml:AttributeValue"));
        match self {
            AttributeValue::Text(text) => {
                set_xsi_type(el, "xs:string");
                el.set_text(text.as_str());
            }
            AttributeValue::Integer(value) => {
                set_xsi_type(el, "xs:integer");
                el.set_text(value.to_string());
            }
            AttributeValue::NameId(name_id) => {
                el.append_element(name_id.to_element());
            }
            AttributeValue::Opaque(nodes) => {
                for node in nodes {
                    el.append_child(node.clone());
                }
            }
        }
        el
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<NameId> for AttributeValue {
    fn from(value: NameId) -> Self {
        AttributeValue::NameId(value)
    }
}

/// Both historical names of eduPersonTargetedID.
pub(crate) fn is_epti(name: &str) -> bool {
    name == EPTI_URN_OID || name == EPTI_URN_MACE
}

/// Name and values of a `saml:Attribute`.
pub(crate) fn parse_attribute(attribute: &Element) -> Result<(String, Vec<AttributeValue>)> {
    let name = attribute
        .attribute("Name")
        .ok_or_else(|| Error::structure("Missing name on <saml:Attribute> element."))?
        .to_string();

    let values = attribute
        .children_named(ns::SAML, "AttributeValue")
        .enumerate()
        .map(|(index, value)| {
            if !is_epti(&name) {
                return AttributeValue::decode(value);
            }
            let name_ids: Vec<_> = value.children_named(ns::SAML, "NameID").collect();
            match name_ids.as_slice() {
                [name_id] => NameId::from_element(name_id).map(AttributeValue::NameId),
                _ => Err(Error::InvalidEptiValue {
                    name: name.clone(),
                    index,
                }),
            }
        })
        .collect::<Result<_>>()?;

    Ok((name, values))
}

/// Build a `saml:Attribute`, with `NameFormat` only when one is given.
pub(crate) fn attribute_element(
    name: &str,
    name_format: Option<&str>,
    values: &[AttributeValue],
) -> Element {
    let mut attribute = Element::new_ns(ns::SAML, "saml:Attribute");
    fill_attribute(&mut attribute, name, name_format, values);
    attribute
}

/// Write name, format and values onto an attribute-shaped `element`.
pub(crate) fn fill_attribute(
    element: &mut Element,
    name: &str,
    name_format: Option<&str>,
    values: &[AttributeValue],
) {
    element.set_attribute("Name", name);
    if let Some(format) = name_format {
        element.set_attribute("NameFormat", format);
    }
    for value in values {
        value.to_xml(element);
    }
}
