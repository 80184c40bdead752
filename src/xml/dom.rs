use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesPI, BytesStart, BytesText, Event};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::xml::ns;

/// A parsed document owning exactly one root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    pub fn into_root(self) -> Element {
        self.root
    }

    pub fn to_xml_string(&self) -> Result<String> {
        self.root.to_xml_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
    ProcessingInstruction(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Whitespace-only text nodes carry no content.
    pub fn is_blank(&self) -> bool {
        matches!(self, Node::Text(t) if t.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub prefix: Option<String>,
    pub local_name: String,
    pub namespace: Option<String>,
    pub value: String,
}

impl Attribute {
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{p}:{}", self.local_name),
            None => self.local_name.clone(),
        }
    }
}

/// An element with resolved namespaces.
///
/// `declarations` only lists the `xmlns` attributes written on this element;
/// the namespace of the element and of its attributes is always resolved, so
/// a detached element still knows what its prefixes mean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub(crate) prefix: Option<String>,
    pub(crate) local_name: String,
    pub(crate) namespace: Option<String>,
    pub(crate) declarations: Vec<(Option<String>, String)>,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) children: Vec<Node>,
}

pub(crate) fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((p, l)) => (Some(p), l),
        None => (None, qname),
    }
}

impl Element {
    /// Create an element without namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local_name: name.into(),
            namespace: None,
            declarations: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create an element in `namespace`, `qname` may carry a prefix.
    pub fn new_ns(namespace: &str, qname: &str) -> Self {
        let (prefix, local) = split_qname(qname);
        Self {
            prefix: prefix.map(str::to_string),
            local_name: local.to_string(),
            namespace: Some(namespace.to_string()),
            declarations: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{p}:{}", self.local_name),
            None => self.local_name.clone(),
        }
    }

    /// True when this element is `{namespace}local_name`.
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.local_name == local_name
    }

    pub fn declarations(&self) -> &[(Option<String>, String)] {
        &self.declarations
    }

    /// Add an explicit `xmlns` declaration, replacing an earlier one for the same prefix.
    pub fn declare_namespace(&mut self, prefix: Option<&str>, uri: &str) {
        let prefix = prefix.map(str::to_string);
        self.declarations.retain(|(p, _)| *p != prefix);
        self.declarations.push((prefix, uri.to_string()));
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Value of an attribute without namespace.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.local_name == name)
            .map(|a| a.value.as_str())
    }

    pub fn attribute_ns(&self, namespace: &str, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.as_deref() == Some(namespace) && a.local_name == local_name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(a) = self
            .attributes
            .iter_mut()
            .find(|a| a.namespace.is_none() && a.local_name == name)
        {
            a.value = value;
            return;
        }
        self.attributes.push(Attribute {
            prefix: None,
            local_name: name.to_string(),
            namespace: None,
            value,
        });
    }

    pub fn set_attribute_ns(&mut self, namespace: &str, qname: &str, value: impl Into<String>) {
        let (prefix, local) = split_qname(qname);
        let value = value.into();
        if let Some(a) = self
            .attributes
            .iter_mut()
            .find(|a| a.namespace.as_deref() == Some(namespace) && a.local_name == local)
        {
            a.value = value;
            return;
        }
        self.attributes.push(Attribute {
            prefix: prefix.map(str::to_string),
            local_name: local.to_string(),
            namespace: Some(namespace.to_string()),
            value,
        });
    }

    pub fn remove_attribute(&mut self, name: &str) {
        self.attributes
            .retain(|a| !(a.namespace.is_none() && a.local_name == name));
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Direct children named `{namespace}local_name`, in document order.
    pub fn children_named<'a>(
        &'a self,
        namespace: &'a str,
        local_name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.child_elements()
            .filter(move |e| e.is(namespace, local_name))
    }

    pub fn first_child_named(&self, namespace: &str, local_name: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.is(namespace, local_name))
    }

    pub fn first_child_named_mut(&mut self, namespace: &str, local_name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|n| match n {
            Node::Element(e) if e.is(namespace, local_name) => Some(e),
            _ => None,
        })
    }

    pub fn first_child_element(&self) -> Option<&Element> {
        self.child_elements().next()
    }

    pub fn append_child(&mut self, node: Node) {
        self.children.push(node);
    }

    /// Append `element` and return a handle to the appended copy.
    pub fn append_element(&mut self, element: Element) -> &mut Element {
        self.children.push(Node::Element(element));
        match self.children.last_mut() {
            Some(Node::Element(e)) => e,
            _ => unreachable!("an element was just pushed"),
        }
    }

    /// Append `<qname>text</qname>` in `namespace`.
    pub fn append_text_element(
        &mut self,
        namespace: &str,
        qname: &str,
        text: impl Into<String>,
    ) -> &mut Element {
        let mut e = Element::new_ns(namespace, qname);
        e.set_text(text);
        self.append_element(e)
    }

    pub fn insert_child(&mut self, index: usize, node: Node) {
        let index = index.min(self.children.len());
        self.children.insert(index, node);
    }

    /// Position among all child nodes of the first child element matching `pred`.
    pub fn position_of(&self, pred: impl Fn(&Element) -> bool) -> Option<usize> {
        self.children
            .iter()
            .position(|n| n.as_element().is_some_and(&pred))
    }

    /// Remove every direct child element matching `pred`, returning them.
    pub fn remove_children(&mut self, pred: impl Fn(&Element) -> bool) -> Vec<Element> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.children.len());
        for node in self.children.drain(..) {
            match node {
                Node::Element(e) if pred(&e) => removed.push(e),
                other => kept.push(other),
            }
        }
        self.children = kept;
        removed
    }

    /// Concatenated content of all descendant text nodes. Comments are skipped.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
                Node::Comment(_) | Node::ProcessingInstruction(_) => {}
            }
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children.clear();
        self.children.push(Node::Text(text.into()));
    }

    /// Serialize this element and its subtree.
    ///
    /// Prefixes that are used but not declared inside the subtree get a
    /// declaration on the element that first needs them.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        let mut scope = vec![BTreeMap::new()];
        write_element(&mut writer, self, &mut scope)?;
        Ok(String::from_utf8(writer.into_inner())?)
    }
}

type Scope = BTreeMap<Option<String>, String>;

fn lookup<'a>(scope: &'a [Scope], prefix: &Option<String>) -> Option<&'a str> {
    scope
        .iter()
        .rev()
        .find_map(|frame| frame.get(prefix))
        .map(String::as_str)
}

fn write_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    el: &Element,
    scope: &mut Vec<Scope>,
) -> Result<()> {
    let mut frame: Scope = el.declarations.iter().cloned().collect();
    let mut extra: Vec<(Option<String>, String)> = Vec::new();

    let mut require = |prefix: &Option<String>, uri: Option<&str>, frame: &mut Scope| {
        if prefix.as_deref() == Some("xml") {
            return;
        }
        let current = frame
            .get(prefix)
            .map(String::as_str)
            .or_else(|| lookup(scope, prefix));
        let wanted = uri.unwrap_or("");
        if current.unwrap_or("") != wanted {
            frame.insert(prefix.clone(), wanted.to_string());
            extra.push((prefix.clone(), wanted.to_string()));
        }
    };

    require(&el.prefix, el.namespace.as_deref(), &mut frame);
    for attr in &el.attributes {
        if attr.prefix.is_some() {
            require(&attr.prefix, attr.namespace.as_deref(), &mut frame);
        }
    }

    let name = el.qualified_name();
    let mut start = BytesStart::new(name.as_str());
    for (prefix, uri) in el.declarations.iter().chain(extra.iter()) {
        let key = match prefix {
            Some(p) => format!("xmlns:{p}"),
            None => "xmlns".to_string(),
        };
        start.push_attribute((key.as_str(), uri.as_str()));
    }
    for attr in &el.attributes {
        let key = attr.qualified_name();
        start.push_attribute((key.as_str(), attr.value.as_str()));
    }

    if el.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    scope.push(frame);
    for child in &el.children {
        match child {
            Node::Element(e) => write_element(writer, e, scope)?,
            Node::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
            Node::Comment(c) => writer.write_event(Event::Comment(BytesText::from_escaped(c.as_str())))?,
            Node::ProcessingInstruction(p) => writer.write_event(Event::PI(BytesPI::new(p.as_str())))?,
        }
    }
    scope.pop();
    writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
    Ok(())
}

/// Build `<prefix:AttributeValue xsi:type="xs:...">` style typed values.
pub(crate) fn set_xsi_type(element: &mut Element, xs_type: &str) {
    element.declare_namespace(Some(ns::prefix::XSI), ns::XSI);
    element.declare_namespace(Some(ns::prefix::XS), ns::XS);
    element.set_attribute_ns(ns::XSI, "xsi:type", xs_type);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;

    #[test]
    fn test_text_skips_comments() {
        let doc = xml::from_string("<a>user@<!-- injected -->example.org</a>").unwrap();
        assert_eq!(doc.root().text(), "user@example.org");
    }

    #[test]
    fn test_detached_subtree_declares_prefixes() {
        let doc = xml::from_string(
            r#"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion"><saml:Issuer>me</saml:Issuer></saml:Assertion>"#,
        )
        .unwrap();
        let issuer = doc.root().first_child_element().unwrap().clone();
        let out = issuer.to_xml_string().unwrap();
        assert_eq!(
            out,
            r#"<saml:Issuer xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion">me</saml:Issuer>"#
        );
    }

    #[test]
    fn test_children_named_and_attributes() {
        let mut root = Element::new_ns(ns::SAML, "saml:Attribute");
        root.set_attribute("Name", "urn:test");
        root.append_text_element(ns::SAML, "saml:AttributeValue", "1");
        root.append_text_element(ns::SAML, "saml:AttributeValue", "2");
        root.set_attribute("Name", "urn:other");

        assert_eq!(root.attribute("Name"), Some("urn:other"));
        assert_eq!(root.attributes().len(), 1);
        let values: Vec<_> = root
            .children_named(ns::SAML, "AttributeValue")
            .map(Element::text)
            .collect();
        assert_eq!(values, vec!["1", "2"]);
    }

    #[test]
    fn test_first_child_named_outlives_query_names() {
        let mut root = Element::new_ns(ns::SAML, "saml:Assertion");
        root.append_text_element(ns::SAML, "saml:Issuer", "first");
        root.append_text_element(ns::SAML, "saml:Issuer", "second");

        let found = {
            let local = String::from("Issuer");
            root.first_child_named(ns::SAML, &local)
        };
        assert_eq!(found.map(Element::text).as_deref(), Some("first"));
        assert!(root.first_child_named(ns::SAMLP, "Issuer").is_none());
    }

    #[test]
    fn test_remove_children() {
        let mut root = Element::new("root");
        root.append_element(Element::new_ns(ns::DS, "ds:Signature"));
        root.append_element(Element::new("keep"));
        let removed = root.remove_children(|e| e.is(ns::DS, "Signature"));
        assert_eq!(removed.len(), 1);
        assert_eq!(root.child_elements().count(), 1);
    }
}
