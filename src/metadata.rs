//! SAML 2.0 metadata: entity groups, entities, their roles and the
//! `alg`, `mdrpi` and `mdui` extensions.
//!
//! Every descriptor that may carry a `ds:Signature` implements
//! [`Signable`](crate::signed::Signable) and places its signature as the
//! first child. Role descriptors, extensions and any other children that are not
//! modelled are kept as [`Chunk`](crate::ds::Chunk)s and written back
//! unchanged.

mod affiliation;
mod alg;
mod endpoint;
mod entity;
mod extensions;
mod key_descriptor;
mod mdrpi;
mod mdui;
mod organization;
mod role;

pub use affiliation::AffiliationDescriptor;
pub use alg::{DigestMethod, SigningMethod};
pub use endpoint::{EndpointType, IndexedEndpointType};
pub use entity::{EntitiesChild, EntitiesDescriptor, EntityDescriptor};
pub use extensions::Extension;
pub use key_descriptor::KeyDescriptor;
pub use mdrpi::{PublicationInfo, RegistrationInfo};
pub use mdui::{Logo, UiInfo};
pub use organization::{AdditionalMetadataLocation, ContactPerson, Organization};
pub use role::{
    Attribute, AttributeConsumingService, IdpSsoFields, RequestedAttribute, RoleDescriptor,
    RoleDescriptorCommon, RoleKind, SpSsoFields, SsoFields,
};

use chrono::{DateTime, Utc};

use crate::ds::Chunk;
use crate::error::Result;
use crate::utils::{format_timestamp, timestamp_attribute};
use crate::xml::Element;

/// Direct children of `element` that are none of `known`, kept verbatim.
pub(crate) fn unrecognized_children(element: &Element, known: &[(&str, &str)]) -> Vec<Chunk> {
    element
        .child_elements()
        .filter(|child| {
            !known
                .iter()
                .any(|(namespace, local_name)| child.is(namespace, local_name))
        })
        .map(Chunk::from_element)
        .collect()
}

/// `ID`, `validUntil` and `cacheDuration`, shared by all descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validity {
    pub id: Option<String>,
    pub valid_until: Option<DateTime<Utc>>,
    /// An `xs:duration`, kept as written.
    pub cache_duration: Option<String>,
}

impl Validity {
    pub fn from_element(element: &Element) -> Result<Self> {
        Ok(Self {
            id: element.attribute("ID").map(str::to_string),
            valid_until: timestamp_attribute(element, "validUntil")?,
            cache_duration: element.attribute("cacheDuration").map(str::to_string),
        })
    }

    pub(crate) fn apply(&self, element: &mut Element) {
        if let Some(id) = &self.id {
            element.set_attribute("ID", id.as_str());
        }
        if let Some(valid_until) = &self.valid_until {
            element.set_attribute("validUntil", format_timestamp(valid_until));
        }
        if let Some(cache_duration) = &self.cache_duration {
            element.set_attribute("cacheDuration", cache_duration.as_str());
        }
    }
}
