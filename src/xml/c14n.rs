use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::error::Result;
use crate::xml::dom::{Element, Node};
use crate::xml::ns;

pub const EXCLUSIVE_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
pub const EXCLUSIVE_C14N_WITH_COMMENTS: &str =
    "http://www.w3.org/2001/10/xml-exc-c14n#WithComments";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct C14nOptions {
    /// Keep comment nodes in the output
    pub with_comments: bool,
    /// Prefixes handled the inclusive way (`#default` is the default namespace)
    pub inclusive_prefixes: Vec<String>,
}

impl C14nOptions {
    pub fn with_inclusive_prefixes(prefix_list: &str) -> Self {
        Self {
            with_comments: false,
            inclusive_prefixes: prefix_list.split_whitespace().map(str::to_string).collect(),
        }
    }
}

type NsMap = BTreeMap<Option<String>, String>;

/// Exclusive XML Canonicalization of `element` and its subtree.
pub fn canonicalize(element: &Element, options: &C14nOptions) -> Result<String> {
    let inclusive: BTreeSet<Option<String>> = options
        .inclusive_prefixes
        .iter()
        .map(|p| {
            if p == "#default" {
                None
            } else {
                Some(p.clone())
            }
        })
        .collect();

    let mut out = String::new();
    let mut declared = vec![NsMap::new()];
    let mut rendered = vec![NsMap::new()];
    write_element(
        &mut out,
        element,
        options,
        &inclusive,
        &mut declared,
        &mut rendered,
    );
    debug!(
        "Canonicalized <{}> ({} bytes)",
        element.qualified_name(),
        out.len()
    );
    Ok(out)
}

fn write_element(
    out: &mut String,
    el: &Element,
    options: &C14nOptions,
    inclusive: &BTreeSet<Option<String>>,
    declared_stack: &mut Vec<NsMap>,
    rendered_stack: &mut Vec<NsMap>,
) {
    let parent_declared = declared_stack.last().cloned().unwrap_or_default();
    let ns_rendered = rendered_stack.last().cloned().unwrap_or_default();
    let mut current_declared = parent_declared;

    for (prefix, uri) in &el.declarations {
        if uri.is_empty() {
            current_declared.remove(prefix);
        } else {
            current_declared.insert(prefix.clone(), uri.clone());
        }
    }
    // Bindings inherited from outside the subtree are known through resolution
    match &el.namespace {
        Some(uri) => {
            current_declared.insert(el.prefix.clone(), uri.clone());
        }
        None if el.prefix.is_none() => {
            current_declared.remove(&None);
        }
        None => {}
    }
    for attr in &el.attributes {
        if let (Some(p), Some(uri)) = (&attr.prefix, &attr.namespace) {
            if p != "xml" {
                current_declared.insert(Some(p.clone()), uri.clone());
            }
        }
    }

    // Determine visibly-utilized prefixes
    let mut visibly_utilized: BTreeSet<Option<String>> = BTreeSet::new();
    visibly_utilized.insert(el.prefix.clone());
    for attr in &el.attributes {
        if let Some(p) = &attr.prefix {
            if p != "xml" {
                visibly_utilized.insert(Some(p.clone()));
            }
        }
    }
    for prefix in inclusive {
        if current_declared.contains_key(prefix) {
            visibly_utilized.insert(prefix.clone());
        }
    }

    let mut render_ns: Vec<(Option<String>, String)> = Vec::new();
    for prefix in &visibly_utilized {
        match current_declared.get(prefix) {
            Some(uri) => {
                if ns_rendered.get(prefix) != Some(uri) {
                    render_ns.push((prefix.clone(), uri.clone()));
                }
            }
            None if prefix.is_none() => {
                // Undo a default namespace rendered by an output ancestor
                if ns_rendered.get(&None).is_some_and(|uri| !uri.is_empty()) {
                    render_ns.push((None, String::new()));
                }
            }
            None => {}
        }
    }
    // Sorted by prefix, the default namespace first
    render_ns.sort();

    let name = el.qualified_name();
    out.push('<');
    out.push_str(&name);
    for (prefix, uri) in &render_ns {
        match prefix {
            Some(p) => {
                out.push_str(" xmlns:");
                out.push_str(p);
            }
            None => out.push_str(" xmlns"),
        }
        out.push_str("=\"");
        out.push_str(&escape_attr_value(uri));
        out.push('"');
    }

    let mut attrs: Vec<(&str, &str, String, &str)> = el
        .attributes
        .iter()
        .map(|a| {
            let uri = match a.prefix.as_deref() {
                Some("xml") => ns::XML,
                _ => a.namespace.as_deref().unwrap_or(""),
            };
            (uri, a.local_name.as_str(), a.qualified_name(), a.value.as_str())
        })
        .collect();
    attrs.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    for (_, _, qname, value) in &attrs {
        out.push(' ');
        out.push_str(qname);
        out.push_str("=\"");
        out.push_str(&escape_attr_value(value));
        out.push('"');
    }
    out.push('>');

    let mut new_rendered = ns_rendered;
    for (prefix, uri) in render_ns {
        new_rendered.insert(prefix, uri);
    }
    declared_stack.push(current_declared);
    rendered_stack.push(new_rendered);

    for child in &el.children {
        match child {
            Node::Element(e) => {
                write_element(out, e, options, inclusive, declared_stack, rendered_stack)
            }
            Node::Text(t) => out.push_str(&escape_text_value(&normalize_line_endings(t))),
            Node::Comment(c) if options.with_comments => {
                out.push_str("<!--");
                out.push_str(&normalize_line_endings(c));
                out.push_str("-->");
            }
            Node::Comment(_) => {}
            Node::ProcessingInstruction(p) => {
                out.push_str("<?");
                out.push_str(&normalize_line_endings(p));
                out.push_str("?>");
            }
        }
    }

    declared_stack.pop();
    rendered_stack.pop();
    out.push_str("</");
    out.push_str(&name);
    out.push('>');
}

/// Normalize line endings to LF
fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}

fn escape_attr_value(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / 4);
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_text_value(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / 4);
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;

    fn c14n(input: &str) -> String {
        let doc = xml::from_string(input).unwrap();
        canonicalize(doc.root(), &C14nOptions::default()).unwrap()
    }

    #[test]
    fn test_basic_canonicalization() {
        assert_eq!(
            c14n(r#"<root><child attr="value"/></root>"#),
            r#"<root><child attr="value"></child></root>"#
        );
    }

    #[test]
    fn test_attribute_escaping() {
        let result = c14n(r#"<root attr="&lt;&quot;&#x9;&#xA;&#xD;">text</root>"#);
        assert!(result.contains("&lt;&quot;&#x9;&#xA;&#xD;"));
    }

    #[test]
    fn test_attributes_sorted_by_namespace_then_name() {
        let result = c14n(r#"<root xmlns:b="urn:b" xmlns:a="urn:a" b:x="1" a:y="2" z="3" c="4"/>"#);
        assert_eq!(
            result,
            r#"<root xmlns:a="urn:a" xmlns:b="urn:b" c="4" z="3" a:y="2" b:x="1"></root>"#
        );
    }

    #[test]
    fn test_namespace_not_duplicated() {
        let result = c14n(r#"<root xmlns="http://example.com"><child>text</child></root>"#);
        assert_eq!(result.matches(r#"xmlns="http://example.com""#).count(), 1);
    }

    #[test]
    fn test_unused_namespace_is_dropped() {
        let result = c14n(r#"<root xmlns:a="http://a.com"><child>text</child></root>"#);
        assert_eq!(result, "<root><child>text</child></root>");
    }

    #[test]
    fn test_prefix_utilized_by_element_and_attribute() {
        let result = c14n(r#"<root xmlns:a="http://a.com"><a:child>text</a:child></root>"#);
        assert!(result.contains(r#"<a:child xmlns:a="http://a.com">"#));

        let result = c14n(r#"<root xmlns:a="http://a.com"><child a:attr="v">text</child></root>"#);
        assert!(result.contains(r#"<child xmlns:a="http://a.com" a:attr="v">"#));
    }

    #[test]
    fn test_inclusive_namespaces_with_prefix_list() {
        let doc = xml::from_string(
            r#"<root xmlns:a="http://a.com" xmlns:b="http://b.com"><child>text</child></root>"#,
        )
        .unwrap();
        let result =
            canonicalize(doc.root(), &C14nOptions::with_inclusive_prefixes("a")).unwrap();
        assert!(result.contains(r#"xmlns:a="http://a.com""#));
        assert!(!result.contains(r#"xmlns:b="#));
    }

    #[test]
    fn test_comments_are_dropped_unless_requested() {
        let doc = xml::from_string("<a>one<!-- note -->two</a>").unwrap();
        let without = canonicalize(doc.root(), &C14nOptions::default()).unwrap();
        assert_eq!(without, "<a>onetwo</a>");

        let options = C14nOptions {
            with_comments: true,
            ..Default::default()
        };
        let with = canonicalize(doc.root(), &options).unwrap();
        assert_eq!(with, "<a>one<!-- note -->two</a>");
    }

    #[test]
    fn test_subtree_renders_inherited_prefix() {
        let doc = xml::from_string(
            r#"<samlp:Response xmlns:samlp="urn:p" xmlns:saml="urn:a"><saml:Assertion ID="x"><saml:Issuer>i</saml:Issuer></saml:Assertion></samlp:Response>"#,
        )
        .unwrap();
        let assertion = doc.root().first_child_element().unwrap();
        assert_eq!(
            canonicalize(assertion, &C14nOptions::default()).unwrap(),
            r#"<saml:Assertion xmlns:saml="urn:a" ID="x"><saml:Issuer>i</saml:Issuer></saml:Assertion>"#
        );
    }

    #[test]
    fn test_default_namespace_is_undone() {
        let result = c14n(r#"<root xmlns="urn:d"><inner xmlns=""/></root>"#);
        assert_eq!(result, r#"<root xmlns="urn:d"><inner xmlns=""></inner></root>"#);
    }

    #[test]
    fn test_line_ending_normalization() {
        assert_eq!(normalize_line_endings("hello\r\nworld\rtest"), "hello\nworld\ntest");
    }
}
