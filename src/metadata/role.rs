use std::collections::BTreeMap;

use crate::assertion::{AttributeValue, fill_attribute, parse_attribute};
use crate::ds::Chunk;
use crate::error::{Error, Result};
use crate::metadata::{Validity, unrecognized_children};
use crate::metadata::endpoint::{EndpointType, IndexedEndpointType};
use crate::metadata::extensions::{self, Extension};
use crate::metadata::key_descriptor::KeyDescriptor;
use crate::metadata::organization::{ContactPerson, Organization};
use crate::signed::{Signable, SignedElement};
use crate::utils::{
    add_localized_strings, add_strings, extract_localized_strings, extract_strings, parse_boolean,
    set_boolean,
};
use crate::xml::{Element, ns};

fn endpoints(element: &Element, local_name: &str) -> Result<Vec<EndpointType>> {
    element
        .children_named(ns::MD, local_name)
        .map(EndpointType::from_element)
        .collect()
}

fn indexed_endpoints(element: &Element, local_name: &str) -> Result<Vec<IndexedEndpointType>> {
    element
        .children_named(ns::MD, local_name)
        .map(IndexedEndpointType::from_element)
        .collect()
}

/// `saml:Attribute` as advertised in metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub name_format: Option<String>,
    pub friendly_name: Option<String>,
    pub values: Vec<AttributeValue>,
}

impl Attribute {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            name_format: None,
            friendly_name: None,
            values: Vec::new(),
        }
    }

    pub fn from_element(element: &Element) -> Result<Self> {
        let (name, values) = parse_attribute(element)?;
        Ok(Self {
            name,
            name_format: element.attribute("NameFormat").map(str::to_string),
            friendly_name: element.attribute("FriendlyName").map(str::to_string),
            values,
        })
    }

    fn to_element(&self, namespace: &str, qname: &str) -> Element {
        let mut el = Element::new_ns(namespace, qname);
        fill_attribute(&mut el, &self.name, self.name_format.as_deref(), &self.values);
        if let Some(friendly_name) = &self.friendly_name {
            el.set_attribute("FriendlyName", friendly_name.as_str());
        }
        el
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        parent.append_element(self.to_element(ns::SAML, "saml:Attribute"))
    }
}

/// `md:RequestedAttribute`
#[derive(Debug, Clone, PartialEq)]
pub struct RequestedAttribute {
    pub attribute: Attribute,
    pub is_required: Option<bool>,
}

impl RequestedAttribute {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            attribute: Attribute::new(name),
            is_required: None,
        }
    }

    pub fn from_element(element: &Element) -> Result<Self> {
        Ok(Self {
            attribute: Attribute::from_element(element)?,
            is_required: parse_boolean(element, "isRequired")?,
        })
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        let el = parent.append_element(
            self.attribute
                .to_element(ns::MD, "md:RequestedAttribute"),
        );
        set_boolean(el, "isRequired", self.is_required);
        el
    }
}

/// `md:AttributeConsumingService`
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeConsumingService {
    pub index: u32,
    pub is_default: Option<bool>,
    pub service_name: BTreeMap<String, String>,
    pub service_description: BTreeMap<String, String>,
    pub requested_attribute: Vec<RequestedAttribute>,
}

impl AttributeConsumingService {
    pub fn from_element(element: &Element) -> Result<Self> {
        let index = element
            .attribute("index")
            .ok_or_else(|| Error::structure("Missing index on AttributeConsumingService."))?;
        let index = index.trim().parse().map_err(|_| {
            Error::structure(format!("Invalid index '{index}' on AttributeConsumingService."))
        })?;

        let service_name = extract_localized_strings(element, ns::MD, "ServiceName")?;
        if service_name.is_empty() {
            return Err(Error::structure(
                "Missing ServiceName in AttributeConsumingService.",
            ));
        }
        let requested_attribute = element
            .children_named(ns::MD, "RequestedAttribute")
            .map(RequestedAttribute::from_element)
            .collect::<Result<Vec<_>>>()?;
        if requested_attribute.is_empty() {
            return Err(Error::structure(
                "Missing RequestedAttribute in AttributeConsumingService.",
            ));
        }

        Ok(Self {
            index,
            is_default: parse_boolean(element, "isDefault")?,
            service_name,
            service_description: extract_localized_strings(
                element,
                ns::MD,
                "ServiceDescription",
            )?,
            requested_attribute,
        })
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        let el = parent.append_element(Element::new_ns(ns::MD, "md:AttributeConsumingService"));
        el.set_attribute("index", self.index.to_string());
        set_boolean(el, "isDefault", self.is_default);
        add_localized_strings(el, ns::MD, "md:ServiceName", &self.service_name);
        add_localized_strings(el, ns::MD, "md:ServiceDescription", &self.service_description);
        for requested in &self.requested_attribute {
            requested.to_xml(el);
        }
        el
    }
}

/// Fields shared by every role descriptor.
#[derive(Debug, Clone, Default)]
pub struct RoleDescriptorCommon {
    pub validity: Validity,
    pub protocol_support_enumeration: Vec<String>,
    pub error_url: Option<String>,
    pub extensions: Vec<Extension>,
    pub key_descriptors: Vec<KeyDescriptor>,
    pub organization: Option<Organization>,
    pub contact_persons: Vec<ContactPerson>,
    /// Children the role does not model, written back after its own.
    pub unknown_children: Vec<Chunk>,
    pub(crate) signed: SignedElement,
}

impl RoleDescriptorCommon {
    pub fn new(protocol_support_enumeration: Vec<String>) -> Self {
        Self {
            protocol_support_enumeration,
            ..Self::default()
        }
    }

    pub fn from_element(element: &Element) -> Result<Self> {
        let protocols = element.attribute("protocolSupportEnumeration").ok_or_else(|| {
            Error::structure(format!(
                "Missing protocolSupportEnumeration attribute on {}",
                element.local_name()
            ))
        })?;

        let mut organizations = element.children_named(ns::MD, "Organization");
        let organization = organizations
            .next()
            .map(Organization::from_element)
            .transpose()?;
        if organizations.next().is_some() {
            return Err(Error::structure(format!(
                "More than one Organization in {}",
                element.local_name()
            )));
        }

        Ok(Self {
            validity: Validity::from_element(element)?,
            protocol_support_enumeration: protocols
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            error_url: element.attribute("errorURL").map(str::to_string),
            extensions: extensions::extract(element)?,
            key_descriptors: element
                .children_named(ns::MD, "KeyDescriptor")
                .map(KeyDescriptor::from_element)
                .collect::<Result<_>>()?,
            organization,
            contact_persons: element
                .children_named(ns::MD, "ContactPerson")
                .map(ContactPerson::from_element)
                .collect::<Result<_>>()?,
            unknown_children: Vec::new(),
            signed: SignedElement::from_element(element)?,
        })
    }

    /// Attributes and the leading children, up to and including `md:ContactPerson`.
    fn to_xml(&self, el: &mut Element) {
        self.validity.apply(el);
        el.set_attribute(
            "protocolSupportEnumeration",
            self.protocol_support_enumeration.join(" "),
        );
        if let Some(error_url) = &self.error_url {
            el.set_attribute("errorURL", error_url.as_str());
        }
        extensions::add(el, &self.extensions);
        for key_descriptor in &self.key_descriptors {
            key_descriptor.to_xml(el);
        }
        if let Some(organization) = &self.organization {
            organization.to_xml(el);
        }
        for contact in &self.contact_persons {
            contact.to_xml(el);
        }
    }
}

/// `md:SSODescriptorType`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsoFields {
    pub artifact_resolution_service: Vec<IndexedEndpointType>,
    pub single_logout_service: Vec<EndpointType>,
    pub manage_name_id_service: Vec<EndpointType>,
    pub name_id_format: Vec<String>,
}

impl SsoFields {
    fn from_element(element: &Element) -> Result<Self> {
        Ok(Self {
            artifact_resolution_service: indexed_endpoints(element, "ArtifactResolutionService")?,
            single_logout_service: endpoints(element, "SingleLogoutService")?,
            manage_name_id_service: endpoints(element, "ManageNameIDService")?,
            name_id_format: extract_strings(element, ns::MD, "NameIDFormat")
                .into_iter()
                .map(|f| f.trim().to_string())
                .collect(),
        })
    }

    fn to_xml(&self, el: &mut Element) {
        for ep in &self.artifact_resolution_service {
            ep.to_xml(el, "md:ArtifactResolutionService");
        }
        for ep in &self.single_logout_service {
            ep.to_xml(el, "md:SingleLogoutService");
        }
        for ep in &self.manage_name_id_service {
            ep.to_xml(el, "md:ManageNameIDService");
        }
        add_strings(el, ns::MD, "md:NameIDFormat", &self.name_id_format);
    }
}

/// `md:IDPSSODescriptor` specifics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdpSsoFields {
    pub sso: SsoFields,
    pub want_authn_requests_signed: Option<bool>,
    pub single_sign_on_service: Vec<EndpointType>,
    pub name_id_mapping_service: Vec<EndpointType>,
    pub assertion_id_request_service: Vec<EndpointType>,
    pub attribute_profile: Vec<String>,
    pub attributes: Vec<Attribute>,
}

impl IdpSsoFields {
    fn from_element(element: &Element) -> Result<Self> {
        Ok(Self {
            sso: SsoFields::from_element(element)?,
            want_authn_requests_signed: parse_boolean(element, "WantAuthnRequestsSigned")?,
            single_sign_on_service: endpoints(element, "SingleSignOnService")?,
            name_id_mapping_service: endpoints(element, "NameIDMappingService")?,
            assertion_id_request_service: endpoints(element, "AssertionIDRequestService")?,
            attribute_profile: extract_strings(element, ns::MD, "AttributeProfile"),
            attributes: element
                .children_named(ns::SAML, "Attribute")
                .map(Attribute::from_element)
                .collect::<Result<_>>()?,
        })
    }

    fn to_xml(&self, el: &mut Element) {
        set_boolean(el, "WantAuthnRequestsSigned", self.want_authn_requests_signed);
        self.sso.to_xml(el);
        for ep in &self.single_sign_on_service {
            ep.to_xml(el, "md:SingleSignOnService");
        }
        for ep in &self.name_id_mapping_service {
            ep.to_xml(el, "md:NameIDMappingService");
        }
        for ep in &self.assertion_id_request_service {
            ep.to_xml(el, "md:AssertionIDRequestService");
        }
        add_strings(el, ns::MD, "md:AttributeProfile", &self.attribute_profile);
        for attribute in &self.attributes {
            attribute.to_xml(el);
        }
    }
}

/// `md:SPSSODescriptor` specifics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpSsoFields {
    pub sso: SsoFields,
    pub authn_requests_signed: Option<bool>,
    pub want_assertions_signed: Option<bool>,
    pub assertion_consumer_service: Vec<IndexedEndpointType>,
    pub attribute_consuming_service: Vec<AttributeConsumingService>,
}

impl SpSsoFields {
    fn from_element(element: &Element) -> Result<Self> {
        Ok(Self {
            sso: SsoFields::from_element(element)?,
            authn_requests_signed: parse_boolean(element, "AuthnRequestsSigned")?,
            want_assertions_signed: parse_boolean(element, "WantAssertionsSigned")?,
            assertion_consumer_service: indexed_endpoints(element, "AssertionConsumerService")?,
            attribute_consuming_service: element
                .children_named(ns::MD, "AttributeConsumingService")
                .map(AttributeConsumingService::from_element)
                .collect::<Result<_>>()?,
        })
    }

    fn to_xml(&self, el: &mut Element) {
        set_boolean(el, "AuthnRequestsSigned", self.authn_requests_signed);
        set_boolean(el, "WantAssertionsSigned", self.want_assertions_signed);
        self.sso.to_xml(el);
        for ep in &self.assertion_consumer_service {
            ep.to_xml(el, "md:AssertionConsumerService");
        }
        for acs in &self.attribute_consuming_service {
            acs.to_xml(el);
        }
    }
}

const COMMON_CHILDREN: &[(&str, &str)] = &[
    (ns::DS, "Signature"),
    (ns::MD, "Extensions"),
    (ns::MD, "KeyDescriptor"),
    (ns::MD, "Organization"),
    (ns::MD, "ContactPerson"),
];

const SSO_CHILDREN: &[(&str, &str)] = &[
    (ns::MD, "ArtifactResolutionService"),
    (ns::MD, "SingleLogoutService"),
    (ns::MD, "ManageNameIDService"),
    (ns::MD, "NameIDFormat"),
];

const IDP_CHILDREN: &[(&str, &str)] = &[
    (ns::MD, "SingleSignOnService"),
    (ns::MD, "NameIDMappingService"),
    (ns::MD, "AssertionIDRequestService"),
    (ns::MD, "AttributeProfile"),
    (ns::SAML, "Attribute"),
];

const SP_CHILDREN: &[(&str, &str)] = &[
    (ns::MD, "AssertionConsumerService"),
    (ns::MD, "AttributeConsumingService"),
];

#[derive(Debug, Clone)]
pub enum RoleKind {
    IdpSso(IdpSsoFields),
    SpSso(SpSsoFields),
    /// Any other role descriptor, replayed verbatim on serialization.
    Unknown(Chunk),
}

/// One role of an entity.
#[derive(Debug, Clone)]
pub struct RoleDescriptor {
    pub common: RoleDescriptorCommon,
    pub kind: RoleKind,
}

impl RoleDescriptor {
    pub fn idp(common: RoleDescriptorCommon, fields: IdpSsoFields) -> Self {
        Self {
            common,
            kind: RoleKind::IdpSso(fields),
        }
    }

    pub fn sp(common: RoleDescriptorCommon, fields: SpSsoFields) -> Self {
        Self {
            common,
            kind: RoleKind::SpSso(fields),
        }
    }

    /// Whether `element` is one of the role descriptor elements of an entity.
    pub(crate) fn is_role_descriptor(element: &Element) -> bool {
        element.namespace() == Some(ns::MD)
            && matches!(
                element.local_name(),
                "RoleDescriptor"
                    | "IDPSSODescriptor"
                    | "SPSSODescriptor"
                    | "AuthnAuthorityDescriptor"
                    | "AttributeAuthorityDescriptor"
                    | "PDPDescriptor"
            )
    }

    pub fn from_element(element: &Element) -> Result<Self> {
        let mut common = RoleDescriptorCommon::from_element(element)?;
        let kind = match (element.namespace(), element.local_name()) {
            (Some(ns::MD), "IDPSSODescriptor") => {
                common.unknown_children = unrecognized_children(
                    element,
                    &[COMMON_CHILDREN, SSO_CHILDREN, IDP_CHILDREN].concat(),
                );
                RoleKind::IdpSso(IdpSsoFields::from_element(element)?)
            }
            (Some(ns::MD), "SPSSODescriptor") => {
                common.unknown_children = unrecognized_children(
                    element,
                    &[COMMON_CHILDREN, SSO_CHILDREN, SP_CHILDREN].concat(),
                );
                RoleKind::SpSso(SpSsoFields::from_element(element)?)
            }
            _ => RoleKind::Unknown(Chunk::from_element(element)),
        };
        Ok(Self { common, kind })
    }

    pub fn to_xml(&self) -> Result<Element> {
        let qname = match &self.kind {
            RoleKind::IdpSso(_) => "md:IDPSSODescriptor",
            RoleKind::SpSso(_) => "md:SPSSODescriptor",
            RoleKind::Unknown(chunk) => return Ok(chunk.element().clone()),
        };
        let mut el = Element::new_ns(ns::MD, qname);
        self.common.to_xml(&mut el);
        match &self.kind {
            RoleKind::IdpSso(fields) => fields.to_xml(&mut el),
            RoleKind::SpSso(fields) => fields.to_xml(&mut el),
            RoleKind::Unknown(_) => {}
        }
        for chunk in &self.common.unknown_children {
            chunk.to_xml(&mut el);
        }
        self.common.signed.sign_element(&mut el, 0)?;
        Ok(el)
    }
}

impl Signable for RoleDescriptor {
    fn signed(&self) -> &SignedElement {
        &self.common.signed
    }

    fn signed_mut(&mut self) -> &mut SignedElement {
        &mut self.common.signed
    }
}
