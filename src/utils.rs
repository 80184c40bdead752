//! Small helpers shared by the element parsers.

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::xml::{Element, ns};

/// Parse an `xs:dateTime` in UTC, fractional seconds allowed.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    if !value.ends_with('Z') {
        return Err(Error::structure(format!("Invalid SAML2 timestamp: {value}")));
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| Error::structure(format!("Invalid SAML2 timestamp: {value}")))
}

/// Format as `YYYY-MM-DDThh:mm:ssZ`.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn timestamp_attribute(element: &Element, name: &str) -> Result<Option<DateTime<Utc>>> {
    element.attribute(name).map(parse_timestamp).transpose()
}

pub fn parse_boolean(element: &Element, name: &str) -> Result<Option<bool>> {
    match element.attribute(name) {
        None => Ok(None),
        Some("true") | Some("1") => Ok(Some(true)),
        Some("false") | Some("0") => Ok(Some(false)),
        Some(other) => Err(Error::structure(format!(
            "Invalid value of boolean attribute '{name}': '{other}'"
        ))),
    }
}

pub fn set_boolean(element: &mut Element, name: &str, value: Option<bool>) {
    if let Some(value) = value {
        element.set_attribute(name, if value { "true" } else { "false" });
    }
}

pub fn required_attribute<'a>(element: &'a Element, name: &str) -> Result<&'a str> {
    element.attribute(name).ok_or_else(|| {
        Error::structure(format!(
            "Missing required attribute {name} on {}",
            element.local_name()
        ))
    })
}

/// Text of every `{namespace}local_name` child.
pub fn extract_strings(element: &Element, namespace: &str, local_name: &str) -> Vec<String> {
    element
        .children_named(namespace, local_name)
        .map(Element::text)
        .collect()
}

/// Text of every `{namespace}local_name` child, keyed by `xml:lang`.
pub fn extract_localized_strings(
    element: &Element,
    namespace: &str,
    local_name: &str,
) -> Result<BTreeMap<String, String>> {
    element
        .children_named(namespace, local_name)
        .map(|child| {
            let lang = child.attribute_ns(ns::XML, "lang").ok_or_else(|| {
                Error::structure(format!("Missing xml:lang on {}", child.qualified_name()))
            })?;
            Ok((lang.to_string(), child.text()))
        })
        .collect()
}

pub fn add_strings(parent: &mut Element, namespace: &str, qname: &str, values: &[String]) {
    for value in values {
        parent.append_text_element(namespace, qname, value.as_str());
    }
}

pub fn add_localized_strings(
    parent: &mut Element,
    namespace: &str,
    qname: &str,
    values: &BTreeMap<String, String>,
) {
    for (lang, value) in values {
        parent
            .append_text_element(namespace, qname, value.as_str())
            .set_attribute_ns(ns::XML, "xml:lang", lang.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;
    use chrono::TimeZone;

    #[test]
    fn test_timestamps() {
        let ts = parse_timestamp("2024-03-01T12:30:00Z").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap());
        assert_eq!(format_timestamp(&ts), "2024-03-01T12:30:00Z");

        let fractional = parse_timestamp("2024-03-01T12:30:00.123Z").unwrap();
        assert_eq!(format_timestamp(&fractional), "2024-03-01T12:30:00Z");

        assert!(parse_timestamp("2024-03-01T12:30:00+01:00").is_err());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_booleans() {
        let el = xml::from_string(r#"<a x="true" y="0" z="maybe"/>"#).unwrap().into_root();
        assert_eq!(parse_boolean(&el, "x").unwrap(), Some(true));
        assert_eq!(parse_boolean(&el, "y").unwrap(), Some(false));
        assert_eq!(parse_boolean(&el, "missing").unwrap(), None);
        assert!(parse_boolean(&el, "z").is_err());
    }

    #[test]
    fn test_localized_strings_roundtrip() {
        let mut values = BTreeMap::new();
        values.insert("en".to_string(), "Policy".to_string());
        values.insert("nl".to_string(), "Beleid".to_string());

        let mut parent = Element::new_ns(ns::MDRPI, "mdrpi:RegistrationInfo");
        add_localized_strings(&mut parent, ns::MDRPI, "mdrpi:RegistrationPolicy", &values);

        let reparsed = xml::from_string(&parent.to_xml_string().unwrap())
            .unwrap()
            .into_root();
        assert_eq!(
            extract_localized_strings(&reparsed, ns::MDRPI, "RegistrationPolicy").unwrap(),
            values
        );
    }
}
