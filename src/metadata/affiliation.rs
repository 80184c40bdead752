use crate::ds::Chunk;
use crate::error::{Error, Result};
use crate::metadata::{Validity, unrecognized_children};
use crate::metadata::extensions::{self, Extension};
use crate::metadata::key_descriptor::KeyDescriptor;
use crate::signed::{Signable, SignedElement};
use crate::utils::{add_strings, extract_strings};
use crate::xml::{Element, ns};

/// `md:AffiliationDescriptor`
#[derive(Debug, Clone)]
pub struct AffiliationDescriptor {
    pub affiliation_owner_id: String,
    pub validity: Validity,
    pub extensions: Vec<Extension>,
    pub affiliate_members: Vec<String>,
    pub key_descriptors: Vec<KeyDescriptor>,
    pub unknown_children: Vec<Chunk>,
    signed: SignedElement,
}

const AFFILIATION_CHILDREN: &[(&str, &str)] = &[
    (ns::DS, "Signature"),
    (ns::MD, "Extensions"),
    (ns::MD, "AffiliateMember"),
    (ns::MD, "KeyDescriptor"),
];

impl AffiliationDescriptor {
    pub fn new(affiliation_owner_id: impl Into<String>, affiliate_members: Vec<String>) -> Self {
        Self {
            affiliation_owner_id: affiliation_owner_id.into(),
            validity: Validity::default(),
            extensions: Vec::new(),
            affiliate_members,
            key_descriptors: Vec::new(),
            unknown_children: Vec::new(),
            signed: SignedElement::default(),
        }
    }

    pub fn from_element(element: &Element) -> Result<Self> {
        let owner = element.attribute("affiliationOwnerID").ok_or_else(|| {
            Error::structure("Missing affiliationOwnerID on AffiliationDescriptor.")
        })?;
        let affiliate_members: Vec<String> = extract_strings(element, ns::MD, "AffiliateMember")
            .into_iter()
            .map(|m| m.trim().to_string())
            .collect();
        if affiliate_members.is_empty() {
            return Err(Error::structure(
                "Missing AffiliateMember in AffiliationDescriptor.",
            ));
        }
        Ok(Self {
            affiliation_owner_id: owner.to_string(),
            validity: Validity::from_element(element)?,
            extensions: extensions::extract(element)?,
            affiliate_members,
            key_descriptors: element
                .children_named(ns::MD, "KeyDescriptor")
                .map(KeyDescriptor::from_element)
                .collect::<Result<_>>()?,
            unknown_children: unrecognized_children(element, AFFILIATION_CHILDREN),
            signed: SignedElement::from_element(element)?,
        })
    }

    pub fn to_xml(&self) -> Result<Element> {
        let mut el = Element::new_ns(ns::MD, "md:AffiliationDescriptor");
        el.set_attribute("affiliationOwnerID", self.affiliation_owner_id.as_str());
        self.validity.apply(&mut el);
        extensions::add(&mut el, &self.extensions);
        add_strings(&mut el, ns::MD, "md:AffiliateMember", &self.affiliate_members);
        for key_descriptor in &self.key_descriptors {
            key_descriptor.to_xml(&mut el);
        }
        for chunk in &self.unknown_children {
            chunk.to_xml(&mut el);
        }
        self.signed.sign_element(&mut el, 0)?;
        Ok(el)
    }
}

impl Signable for AffiliationDescriptor {
    fn signed(&self) -> &SignedElement {
        &self.signed
    }

    fn signed_mut(&mut self) -> &mut SignedElement {
        &mut self.signed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;

    #[test]
    fn test_affiliation_round_trip() {
        let doc = xml::from_string(
            r#"<md:AffiliationDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" affiliationOwnerID="TheOwner" ID="TheID" validUntil="2009-02-13T23:31:30Z" cacheDuration="PT5000S">
                 <md:AffiliateMember>Member</md:AffiliateMember>
                 <md:AffiliateMember>OtherMember</md:AffiliateMember>
               </md:AffiliationDescriptor>"#,
        )
        .unwrap();
        let affiliation = AffiliationDescriptor::from_element(doc.root()).unwrap();
        assert_eq!(affiliation.affiliation_owner_id, "TheOwner");
        assert_eq!(affiliation.validity.id.as_deref(), Some("TheID"));
        assert_eq!(
            affiliation.validity.valid_until.map(|t| t.timestamp()),
            Some(1_234_567_890)
        );
        assert_eq!(affiliation.validity.cache_duration.as_deref(), Some("PT5000S"));
        assert_eq!(affiliation.affiliate_members, ["Member", "OtherMember"]);

        let el = affiliation.to_xml().unwrap();
        assert_eq!(el.attribute("validUntil"), Some("2009-02-13T23:31:30Z"));
        let again = AffiliationDescriptor::from_element(&el).unwrap();
        assert_eq!(again.affiliate_members, affiliation.affiliate_members);
    }

    #[test]
    fn test_affiliation_keeps_unrecognized_children() {
        let doc = xml::from_string(
            r#"<md:AffiliationDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" affiliationOwnerID="TheOwner">
                 <md:AffiliateMember>Member</md:AffiliateMember>
                 <md:Future>later</md:Future>
               </md:AffiliationDescriptor>"#,
        )
        .unwrap();
        let affiliation = AffiliationDescriptor::from_element(doc.root()).unwrap();
        assert_eq!(affiliation.unknown_children[0].local_name(), "Future");
        let el = affiliation.to_xml().unwrap();
        assert_eq!(el.first_child_named(ns::MD, "Future").unwrap().text(), "later");
    }

    #[test]
    fn test_affiliation_requirements() {
        let parse = |xml: &str| {
            AffiliationDescriptor::from_element(xml::from_string(xml).unwrap().root())
                .unwrap_err()
                .to_string()
        };
        assert_eq!(
            parse(
                r#"<md:AffiliationDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata"><md:AffiliateMember>Member</md:AffiliateMember></md:AffiliationDescriptor>"#
            ),
            "Missing affiliationOwnerID on AffiliationDescriptor."
        );
        assert_eq!(
            parse(
                r#"<md:AffiliationDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" affiliationOwnerID="TheOwner"/>"#
            ),
            "Missing AffiliateMember in AffiliationDescriptor."
        );
    }
}
