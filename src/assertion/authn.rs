use chrono::{DateTime, Utc};

use crate::ds::Chunk;
use crate::error::{Error, Result};
use crate::utils::{
    add_strings, extract_strings, format_timestamp, parse_timestamp, timestamp_attribute,
};
use crate::xml::{Element, ns};

/// `saml:SubjectLocality`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectLocality {
    pub address: Option<String>,
    pub dns_name: Option<String>,
}

impl SubjectLocality {
    pub fn from_element(element: &Element) -> Self {
        Self {
            address: element.attribute("Address").map(str::to_string),
            dns_name: element.attribute("DNSName").map(str::to_string),
        }
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        let el = parent.append_element(Element::new_ns(ns::SAML, "saml:SubjectLocality"));
        if let Some(address) = &self.address {
            el.set_attribute("Address", address.as_str());
        }
        if let Some(dns_name) = &self.dns_name {
            el.set_attribute("DNSName", dns_name.as_str());
        }
        el
    }
}

/// `saml:AuthnContext`. A Decl and a DeclRef never coexist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthnContext {
    class_ref: Option<String>,
    decl: Option<Chunk>,
    decl_ref: Option<String>,
    pub authenticating_authority: Vec<String>,
}

impl AuthnContext {
    pub fn from_element(element: &Element) -> Result<Self> {
        let mut context = Self::default();

        let decl_refs: Vec<_> = element.children_named(ns::SAML, "AuthnContextDeclRef").collect();
        match decl_refs.as_slice() {
            [] => {}
            [decl_ref] => context.set_decl_ref(Some(decl_ref.text().trim().to_string()))?,
            _ => return Err(Error::structure("More than one <saml:AuthnContextDeclRef> found?")),
        }

        let decls: Vec<_> = element.children_named(ns::SAML, "AuthnContextDecl").collect();
        match decls.as_slice() {
            [] => {}
            [decl] => context.set_decl(Some(Chunk::from_element(decl)))?,
            _ => return Err(Error::structure("More than one <saml:AuthnContextDecl> found?")),
        }

        let class_refs: Vec<_> = element.children_named(ns::SAML, "AuthnContextClassRef").collect();
        match class_refs.as_slice() {
            [] => {}
            [class_ref] => context.class_ref = Some(class_ref.text().trim().to_string()),
            _ => {
                return Err(Error::structure(
                    "More than one <saml:AuthnContextClassRef> in <saml:AuthnContext>.",
                ));
            }
        }

        if context.is_empty() {
            return Err(Error::structure(
                "Missing either <saml:AuthnContextClassRef> or <saml:AuthnContextDeclRef> or <saml:AuthnContextDecl>",
            ));
        }

        context.authenticating_authority =
            extract_strings(element, ns::SAML, "AuthenticatingAuthority");
        Ok(context)
    }

    pub fn class_ref(&self) -> Option<&str> {
        self.class_ref.as_deref()
    }

    pub fn set_class_ref(&mut self, class_ref: Option<String>) {
        self.class_ref = class_ref;
    }

    pub fn decl(&self) -> Option<&Chunk> {
        self.decl.as_ref()
    }

    pub fn set_decl(&mut self, decl: Option<Chunk>) -> Result<()> {
        if decl.is_some() && self.decl_ref.is_some() {
            return Err(Error::structure(
                "AuthnContextDeclRef is already registered! May only have either a Decl or a DeclRef, not both!",
            ));
        }
        self.decl = decl;
        Ok(())
    }

    pub fn decl_ref(&self) -> Option<&str> {
        self.decl_ref.as_deref()
    }

    pub fn set_decl_ref(&mut self, decl_ref: Option<String>) -> Result<()> {
        if decl_ref.is_some() && self.decl.is_some() {
            return Err(Error::structure(
                "AuthnContextDecl is already registered! May only have either a Decl or a DeclRef, not both!",
            ));
        }
        self.decl_ref = decl_ref;
        Ok(())
    }

    /// No class reference, declaration or declaration reference.
    pub fn is_empty(&self) -> bool {
        self.class_ref.is_none() && self.decl.is_none() && self.decl_ref.is_none()
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        let el = parent.append_element(Element::new_ns(ns::SAML, "saml:AuthnContext"));
        if let Some(class_ref) = &self.class_ref {
            el.append_text_element(ns::SAML, "saml:AuthnContextClassRef", class_ref.as_str());
        }
        if let Some(decl) = &self.decl {
            decl.to_xml(el);
        }
        if let Some(decl_ref) = &self.decl_ref {
            el.append_text_element(ns::SAML, "saml:AuthnContextDeclRef", decl_ref.as_str());
        }
        add_strings(
            el,
            ns::SAML,
            "saml:AuthenticatingAuthority",
            &self.authenticating_authority,
        );
        el
    }
}

/// The single `saml:AuthnStatement` an assertion may carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AuthnStatement {
    pub authn_instant: DateTime<Utc>,
    pub session_not_on_or_after: Option<DateTime<Utc>>,
    pub session_index: Option<String>,
    pub subject_locality: Option<SubjectLocality>,
    pub context: AuthnContext,
}

impl AuthnStatement {
    pub fn from_element(element: &Element) -> Result<Self> {
        let authn_instant = element
            .attribute("AuthnInstant")
            .ok_or(Error::MissingAuthnInstant)
            .and_then(parse_timestamp)?;

        let contexts: Vec<_> = element.children_named(ns::SAML, "AuthnContext").collect();
        let context = match contexts.as_slice() {
            [context] => AuthnContext::from_element(context)?,
            [] => {
                return Err(Error::structure(
                    "Missing required <saml:AuthnContext> in <saml:AuthnStatement>.",
                ));
            }
            _ => {
                return Err(Error::structure(
                    "More than one <saml:AuthnContext> in <saml:AuthnStatement>.",
                ));
            }
        };

        Ok(Self {
            authn_instant,
            session_not_on_or_after: timestamp_attribute(element, "SessionNotOnOrAfter")?,
            session_index: element.attribute("SessionIndex").map(str::to_string),
            subject_locality: element
                .first_child_named(ns::SAML, "SubjectLocality")
                .map(SubjectLocality::from_element),
            context,
        })
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        let el = parent.append_element(Element::new_ns(ns::SAML, "saml:AuthnStatement"));
        el.set_attribute("AuthnInstant", format_timestamp(&self.authn_instant));
        if let Some(ts) = &self.session_not_on_or_after {
            el.set_attribute("SessionNotOnOrAfter", format_timestamp(ts));
        }
        if let Some(index) = &self.session_index {
            el.set_attribute("SessionIndex", index.as_str());
        }
        if let Some(locality) = &self.subject_locality {
            locality.to_xml(el);
        }
        self.context.to_xml(el);
        el
    }
}
