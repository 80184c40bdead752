use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::utils::{add_strings, extract_strings, format_timestamp, timestamp_attribute};
use crate::xml::{Element, ns};

/// Validity window and audiences of an assertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Conditions {
    pub not_before: Option<DateTime<Utc>>,
    pub not_on_or_after: Option<DateTime<Utc>>,
    /// `None` when no AudienceRestriction applies.
    pub valid_audiences: Option<Vec<String>>,
}

impl Conditions {
    pub fn from_element(element: &Element) -> Result<Self> {
        let mut conditions = Self {
            not_before: timestamp_attribute(element, "NotBefore")?,
            not_on_or_after: timestamp_attribute(element, "NotOnOrAfter")?,
            valid_audiences: None,
        };

        for condition in element.child_elements() {
            if condition.namespace() != Some(ns::SAML) {
                return Err(Error::UnknownCondition(format!(
                    "'{}' in namespace '{}'",
                    condition.local_name(),
                    condition.namespace().unwrap_or_default()
                )));
            }
            match condition.local_name() {
                "AudienceRestriction" => {
                    let audiences = extract_strings(condition, ns::SAML, "Audience");
                    conditions.restrict_audiences(audiences);
                }
                "OneTimeUse" | "ProxyRestriction" => {}
                other => return Err(Error::UnknownCondition(format!("'{other}'"))),
            }
        }
        Ok(conditions)
    }

    /// Restrictions are ANDed: only audiences present in every one remain valid.
    fn restrict_audiences(&mut self, audiences: Vec<String>) {
        self.valid_audiences = Some(match self.valid_audiences.take() {
            None => audiences,
            Some(current) => current
                .into_iter()
                .filter(|a| audiences.contains(a))
                .collect(),
        });
    }

    /// An empty audience set cannot be written as a schema-valid
    /// AudienceRestriction, so it is refused.
    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> Result<&'a mut Element> {
        if self.valid_audiences.as_ref().is_some_and(Vec::is_empty) {
            return Err(Error::structure(
                "Cannot serialize an <saml:AudienceRestriction> without audiences",
            ));
        }
        let el = parent.append_element(Element::new_ns(ns::SAML, "saml:Conditions"));
        if let Some(ts) = &self.not_before {
            el.set_attribute("NotBefore", format_timestamp(ts));
        }
        if let Some(ts) = &self.not_on_or_after {
            el.set_attribute("NotOnOrAfter", format_timestamp(ts));
        }
        if let Some(audiences) = &self.valid_audiences {
            let restriction =
                el.append_element(Element::new_ns(ns::SAML, "saml:AudienceRestriction"));
            add_strings(restriction, ns::SAML, "saml:Audience", audiences);
        }
        Ok(el)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::xml;

    fn parse(body: &str) -> Result<Conditions> {
        let doc = xml::from_string(&format!(
            r#"<saml:Conditions xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" NotBefore="2011-08-31T08:50:00Z">{body}</saml:Conditions>"#
        ))
        .unwrap();
        Conditions::from_element(doc.root())
    }

    #[test]
    fn test_audience_restrictions_intersect() {
        let conditions = parse(
            "<saml:AudienceRestriction><saml:Audience>audience1</saml:Audience><saml:Audience>audience2</saml:Audience></saml:AudienceRestriction>\
             <saml:AudienceRestriction><saml:Audience>audience1</saml:Audience></saml:AudienceRestriction>",
        )
        .unwrap();
        assert_eq!(conditions.valid_audiences, Some(vec!["audience1".to_string()]));
        assert!(conditions.not_before.is_some());
    }

    #[test]
    fn test_disjoint_restrictions_cannot_be_serialized() {
        let conditions = parse(
            "<saml:AudienceRestriction><saml:Audience>audience1</saml:Audience></saml:AudienceRestriction>\
             <saml:AudienceRestriction><saml:Audience>audience2</saml:Audience></saml:AudienceRestriction>",
        )
        .unwrap();
        assert_eq!(conditions.valid_audiences, Some(vec![]));

        let mut parent = Element::new_ns(ns::SAML, "saml:Assertion");
        let err = conditions.to_xml(&mut parent).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralViolation);
        assert!(parent.child_elements().next().is_none());

        let mut parent = Element::new_ns(ns::SAML, "saml:Assertion");
        let restricted = Conditions {
            valid_audiences: Some(vec!["audience1".to_string()]),
            ..Conditions::default()
        };
        let el = restricted.to_xml(&mut parent).unwrap();
        let restriction = el.first_child_named(ns::SAML, "AudienceRestriction").unwrap();
        assert_eq!(restriction.child_elements().count(), 1);
    }

    #[test]
    fn test_no_restriction() {
        let conditions = parse("<saml:OneTimeUse/><saml:ProxyRestriction/>").unwrap();
        assert_eq!(conditions.valid_audiences, None);
    }

    #[test]
    fn test_unknown_condition() {
        let err = parse("<saml:OtherCondition/>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralViolation);
        assert_eq!(err.to_string(), "Unknown condition: 'OtherCondition'");

        let err = parse(r#"<x:AudienceRestriction xmlns:x="urn:x-test"/>"#).unwrap_err();
        assert!(matches!(err, Error::UnknownCondition(_)));
    }
}
