//! User interface hints (`mdui`).

use std::collections::BTreeMap;

use crate::ds::Chunk;
use crate::error::{Error, Result};
use crate::utils::{add_localized_strings, extract_localized_strings};
use crate::xml::{Element, ns};

/// `mdui:Logo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logo {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub lang: Option<String>,
}

impl Logo {
    pub fn from_element(element: &Element) -> Result<Self> {
        let dimension = |name: &str| -> Result<u32> {
            let value = element
                .attribute(name)
                .ok_or_else(|| Error::structure(format!("Missing {name} of Logo.")))?;
            value
                .trim()
                .parse()
                .map_err(|_| Error::structure(format!("Invalid {name} of Logo: '{value}'")))
        };
        let width = dimension("width")?;
        let height = dimension("height")?;
        let url = element.text().trim().to_string();
        if url.is_empty() {
            return Err(Error::structure("Missing url value for Logo."));
        }
        Ok(Self {
            url,
            width,
            height,
            lang: element.attribute_ns(ns::XML, "lang").map(str::to_string),
        })
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        let el = parent.append_text_element(ns::MDUI, "mdui:Logo", self.url.as_str());
        el.set_attribute("width", self.width.to_string());
        el.set_attribute("height", self.height.to_string());
        if let Some(lang) = &self.lang {
            el.set_attribute_ns(ns::XML, "xml:lang", lang.as_str());
        }
        el
    }
}

/// `mdui:UIInfo`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiInfo {
    pub display_name: BTreeMap<String, String>,
    pub description: BTreeMap<String, String>,
    pub information_url: BTreeMap<String, String>,
    pub privacy_statement_url: BTreeMap<String, String>,
    pub logo: Vec<Logo>,
    /// Keywords and anything else not modelled here.
    pub children: Vec<Chunk>,
}

impl UiInfo {
    pub fn from_element(element: &Element) -> Result<Self> {
        let mut info = Self {
            display_name: extract_localized_strings(element, ns::MDUI, "DisplayName")?,
            description: extract_localized_strings(element, ns::MDUI, "Description")?,
            information_url: extract_localized_strings(element, ns::MDUI, "InformationURL")?,
            privacy_statement_url: extract_localized_strings(
                element,
                ns::MDUI,
                "PrivacyStatementURL",
            )?,
            ..Self::default()
        };
        for child in element.child_elements() {
            if child.is(ns::MDUI, "Logo") {
                info.logo.push(Logo::from_element(child)?);
            } else if child.namespace() != Some(ns::MDUI)
                || !matches!(
                    child.local_name(),
                    "DisplayName" | "Description" | "InformationURL" | "PrivacyStatementURL"
                )
            {
                info.children.push(Chunk::from_element(child));
            }
        }
        Ok(info)
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        let el = parent.append_element(Element::new_ns(ns::MDUI, "mdui:UIInfo"));
        add_localized_strings(el, ns::MDUI, "mdui:DisplayName", &self.display_name);
        add_localized_strings(el, ns::MDUI, "mdui:Description", &self.description);
        add_localized_strings(el, ns::MDUI, "mdui:InformationURL", &self.information_url);
        add_localized_strings(
            el,
            ns::MDUI,
            "mdui:PrivacyStatementURL",
            &self.privacy_statement_url,
        );
        for logo in &self.logo {
            logo.to_xml(el);
        }
        for child in &self.children {
            child.to_xml(el);
        }
        el
    }
}
