use tracing::debug;

use crate::ds::Chunk;
use crate::error::{Error, Result};
use crate::metadata::{Validity, unrecognized_children};
use crate::metadata::affiliation::AffiliationDescriptor;
use crate::metadata::extensions::{self, Extension};
use crate::metadata::organization::{AdditionalMetadataLocation, ContactPerson, Organization};
use crate::metadata::role::RoleDescriptor;
use crate::signed::{Signable, SignedElement};
use crate::xml::{Element, ns};

/// `md:EntityDescriptor`
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    pub entity_id: String,
    pub validity: Validity,
    pub extensions: Vec<Extension>,
    pub role_descriptors: Vec<RoleDescriptor>,
    pub affiliation_descriptor: Option<AffiliationDescriptor>,
    pub organization: Option<Organization>,
    pub contact_persons: Vec<ContactPerson>,
    pub additional_metadata_locations: Vec<AdditionalMetadataLocation>,
    /// Children that are none of the above, written back after the roles.
    pub unknown_children: Vec<Chunk>,
    signed: SignedElement,
}

impl EntityDescriptor {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            validity: Validity::default(),
            extensions: Vec::new(),
            role_descriptors: Vec::new(),
            affiliation_descriptor: None,
            organization: None,
            contact_persons: Vec::new(),
            additional_metadata_locations: Vec::new(),
            unknown_children: Vec::new(),
            signed: SignedElement::default(),
        }
    }

    pub fn from_element(element: &Element) -> Result<Self> {
        if !element.is(ns::MD, "EntityDescriptor") {
            return Err(Error::structure(format!(
                "Expected <md:EntityDescriptor>, got <{}>",
                element.qualified_name()
            )));
        }
        let entity_id = element.attribute("entityID").ok_or_else(|| {
            Error::structure("Missing required attribute entityID on EntityDescriptor.")
        })?;

        let mut entity = Self {
            entity_id: entity_id.to_string(),
            validity: Validity::from_element(element)?,
            extensions: extensions::extract(element)?,
            signed: SignedElement::from_element(element)?,
            ..Self::new(entity_id)
        };

        for child in element.child_elements() {
            if RoleDescriptor::is_role_descriptor(child) {
                entity.role_descriptors.push(RoleDescriptor::from_element(child)?);
                continue;
            }
            if child.is(ns::DS, "Signature") || child.is(ns::MD, "Extensions") {
                continue;
            }
            match (child.namespace(), child.local_name()) {
                (Some(ns::MD), "AffiliationDescriptor") => {
                    if entity.affiliation_descriptor.is_some() {
                        return Err(Error::structure(
                            "More than one AffiliationDescriptor in the entity.",
                        ));
                    }
                    entity.affiliation_descriptor =
                        Some(AffiliationDescriptor::from_element(child)?);
                }
                (Some(ns::MD), "Organization") => {
                    if entity.organization.is_some() {
                        return Err(Error::structure("More than one Organization in the entity."));
                    }
                    entity.organization = Some(Organization::from_element(child)?);
                }
                (Some(ns::MD), "ContactPerson") => entity
                    .contact_persons
                    .push(ContactPerson::from_element(child)?),
                (Some(ns::MD), "AdditionalMetadataLocation") => entity
                    .additional_metadata_locations
                    .push(AdditionalMetadataLocation::from_element(child)?),
                _ => entity.unknown_children.push(Chunk::from_element(child)),
            }
        }

        match (
            entity.affiliation_descriptor.is_some(),
            entity.role_descriptors.is_empty(),
        ) {
            (false, true) => {
                return Err(Error::structure(
                    "Missing AffiliationDescriptor or RoleDescriptor in EntityDescriptor.",
                ));
            }
            (true, false) => {
                return Err(Error::structure(
                    "AffiliationDescriptor cannot be combined with other RoleDescriptor elements in EntityDescriptor.",
                ));
            }
            _ => {}
        }

        debug!(
            entity_id = %entity.entity_id,
            roles = entity.role_descriptors.len(),
            signed = entity.signed.was_signed(),
            "Parsed entity descriptor"
        );
        Ok(entity)
    }

    pub fn to_xml(&self) -> Result<Element> {
        let mut el = Element::new_ns(ns::MD, "md:EntityDescriptor");
        el.set_attribute("entityID", self.entity_id.as_str());
        self.validity.apply(&mut el);
        extensions::add(&mut el, &self.extensions);
        for role in &self.role_descriptors {
            el.append_element(role.to_xml()?);
        }
        if let Some(affiliation) = &self.affiliation_descriptor {
            el.append_element(affiliation.to_xml()?);
        }
        for chunk in &self.unknown_children {
            chunk.to_xml(&mut el);
        }
        if let Some(organization) = &self.organization {
            organization.to_xml(&mut el);
        }
        for contact in &self.contact_persons {
            contact.to_xml(&mut el);
        }
        for location in &self.additional_metadata_locations {
            location.to_xml(&mut el);
        }
        self.signed.sign_element(&mut el, 0)?;
        Ok(el)
    }
}

impl Signable for EntityDescriptor {
    fn signed(&self) -> &SignedElement {
        &self.signed
    }

    fn signed_mut(&mut self) -> &mut SignedElement {
        &mut self.signed
    }
}

const GROUP_CHILDREN: &[(&str, &str)] = &[
    (ns::DS, "Signature"),
    (ns::MD, "Extensions"),
    (ns::MD, "EntityDescriptor"),
    (ns::MD, "EntitiesDescriptor"),
];

#[derive(Debug, Clone)]
pub enum EntitiesChild {
    Entity(EntityDescriptor),
    Entities(EntitiesDescriptor),
}

/// `md:EntitiesDescriptor`, a possibly nested group of entities.
#[derive(Debug, Clone, Default)]
pub struct EntitiesDescriptor {
    pub name: Option<String>,
    pub validity: Validity,
    pub extensions: Vec<Extension>,
    pub children: Vec<EntitiesChild>,
    pub unknown_children: Vec<Chunk>,
    signed: SignedElement,
}

impl EntitiesDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_element(element: &Element) -> Result<Self> {
        if !element.is(ns::MD, "EntitiesDescriptor") {
            return Err(Error::structure(format!(
                "Expected <md:EntitiesDescriptor>, got <{}>",
                element.qualified_name()
            )));
        }
        let children = element
            .child_elements()
            .filter(|child| child.namespace() == Some(ns::MD))
            .filter_map(|child| match child.local_name() {
                "EntityDescriptor" => {
                    Some(EntityDescriptor::from_element(child).map(EntitiesChild::Entity))
                }
                "EntitiesDescriptor" => {
                    Some(EntitiesDescriptor::from_element(child).map(EntitiesChild::Entities))
                }
                _ => None,
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: element.attribute("Name").map(str::to_string),
            validity: Validity::from_element(element)?,
            extensions: extensions::extract(element)?,
            children,
            unknown_children: unrecognized_children(element, GROUP_CHILDREN),
            signed: SignedElement::from_element(element)?,
        })
    }

    /// Every entity in this group and its nested groups, depth first.
    pub fn entities(&self) -> Vec<&EntityDescriptor> {
        let mut entities = Vec::new();
        for child in &self.children {
            match child {
                EntitiesChild::Entity(entity) => entities.push(entity),
                EntitiesChild::Entities(group) => entities.extend(group.entities()),
            }
        }
        entities
    }

    pub fn to_xml(&self) -> Result<Element> {
        let mut el = Element::new_ns(ns::MD, "md:EntitiesDescriptor");
        self.validity.apply(&mut el);
        if let Some(name) = &self.name {
            el.set_attribute("Name", name.as_str());
        }
        extensions::add(&mut el, &self.extensions);
        for child in &self.children {
            let child = match child {
                EntitiesChild::Entity(entity) => entity.to_xml()?,
                EntitiesChild::Entities(group) => group.to_xml()?,
            };
            el.append_element(child);
        }
        for chunk in &self.unknown_children {
            chunk.to_xml(&mut el);
        }
        self.signed.sign_element(&mut el, 0)?;
        Ok(el)
    }
}

impl Signable for EntitiesDescriptor {
    fn signed(&self) -> &SignedElement {
        &self.signed
    }

    fn signed_mut(&mut self) -> &mut SignedElement {
        &mut self.signed
    }
}
