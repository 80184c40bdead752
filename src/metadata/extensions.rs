use crate::ds::Chunk;
use crate::error::Result;
use crate::metadata::alg::{DigestMethod, SigningMethod};
use crate::metadata::mdrpi::{PublicationInfo, RegistrationInfo};
use crate::metadata::mdui::UiInfo;
use crate::xml::{Element, ns};

/// A child of `md:Extensions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extension {
    PublicationInfo(PublicationInfo),
    RegistrationInfo(RegistrationInfo),
    UiInfo(UiInfo),
    DigestMethod(DigestMethod),
    SigningMethod(SigningMethod),
    Chunk(Chunk),
}

impl Extension {
    pub fn from_element(element: &Element) -> Result<Self> {
        let extension = match (element.namespace(), element.local_name()) {
            (Some(ns::MDRPI), "PublicationInfo") => {
                Extension::PublicationInfo(PublicationInfo::from_element(element)?)
            }
            (Some(ns::MDRPI), "RegistrationInfo") => {
                Extension::RegistrationInfo(RegistrationInfo::from_element(element)?)
            }
            (Some(ns::MDUI), "UIInfo") => Extension::UiInfo(UiInfo::from_element(element)?),
            (Some(ns::ALG), "DigestMethod") => {
                Extension::DigestMethod(DigestMethod::from_element(element)?)
            }
            (Some(ns::ALG), "SigningMethod") => {
                Extension::SigningMethod(SigningMethod::from_element(element)?)
            }
            _ => Extension::Chunk(Chunk::from_element(element)),
        };
        Ok(extension)
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        match self {
            Extension::PublicationInfo(e) => e.to_xml(parent),
            Extension::RegistrationInfo(e) => e.to_xml(parent),
            Extension::UiInfo(e) => e.to_xml(parent),
            Extension::DigestMethod(e) => e.to_xml(parent),
            Extension::SigningMethod(e) => e.to_xml(parent),
            Extension::Chunk(e) => e.to_xml(parent),
        }
    }
}

/// Children of every `md:Extensions` directly below `parent`.
pub(crate) fn extract(parent: &Element) -> Result<Vec<Extension>> {
    parent
        .children_named(ns::MD, "Extensions")
        .flat_map(|extensions| extensions.child_elements())
        .map(Extension::from_element)
        .collect()
}

/// Append a single `md:Extensions` holding `extensions`, or nothing when empty.
pub(crate) fn add(parent: &mut Element, extensions: &[Extension]) {
    if extensions.is_empty() {
        return;
    }
    let container = parent.append_element(Element::new_ns(ns::MD, "md:Extensions"));
    for extension in extensions {
        extension.to_xml(container);
    }
}
