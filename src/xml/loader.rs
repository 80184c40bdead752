use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::BTreeMap;
use std::path::Path;
use std::str;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::xml::dom::{Attribute, Document, Element, Node, split_qname};
use crate::xml::ns;

type Scope = BTreeMap<Option<String>, String>;

/// Parse `xml` into a [`Document`].
///
/// DOCTYPE declarations are rejected whatever they contain and no external
/// entity is ever resolved.
pub fn from_string(xml: &str) -> Result<Document> {
    if xml.trim().is_empty() {
        return Err(Error::InvalidArgument(
            "Invalid Argument type: \"non-empty string\" expected, \"string\" given".into(),
        ));
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut scopes: Vec<Scope> = vec![Scope::new()];
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::DocType(_)) => {
                warn!("Rejecting XML document with a DOCTYPE node");
                return Err(Error::Runtime(
                    "Dangerous XML detected, DOCTYPE nodes are not allowed in the XML body".into(),
                ));
            }
            Ok(Event::Start(e)) => {
                let element = open_element(&e, &mut scopes)?;
                stack.push(element);
            }
            Ok(Event::Empty(e)) => {
                let element = open_element(&e, &mut scopes)?;
                scopes.pop();
                attach(element, &mut stack, &mut root)?;
            }
            Ok(Event::End(_)) => {
                scopes.pop();
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::UnparseableXml("Unexpected closing tag".into()))?;
                attach(element, &mut stack, &mut root)?;
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| Error::UnparseableXml(e.to_string()))?;
                push_text(&mut stack, text.into_owned())?;
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8(e.into_inner().into_owned())
                    .map_err(|e| Error::UnparseableXml(e.to_string()))?;
                push_text(&mut stack, text)?;
            }
            Ok(Event::Comment(e)) => {
                if let Some(parent) = stack.last_mut() {
                    let comment = str::from_utf8(&e)
                        .map_err(|e| Error::UnparseableXml(e.to_string()))?;
                    parent.children.push(Node::Comment(comment.to_string()));
                }
            }
            Ok(Event::PI(e)) => {
                if let Some(parent) = stack.last_mut() {
                    let pi = str::from_utf8(&e)
                        .map_err(|e| Error::UnparseableXml(e.to_string()))?;
                    parent.children.push(Node::ProcessingInstruction(pi.to_string()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::UnparseableXml(e.to_string())),
        }
    }

    if !stack.is_empty() {
        return Err(Error::UnparseableXml(
            "Unexpected end of document, unclosed elements remain".into(),
        ));
    }

    let root = root.ok_or_else(|| Error::Runtime("Document does not have content".into()))?;
    debug!("Parsed XML document with root <{}>", root.qualified_name());
    Ok(Document::new(root))
}

/// Read `path` and parse it with [`from_string`].
pub fn from_file(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::InvalidArgument(format!(
            "Path \"{}\" is not a file",
            path.display()
        )));
    }

    let content = std::fs::read(path).map_err(|e| {
        Error::Runtime(format!("File \"{}\" could not be read: {e}", path.display()))
    })?;
    if content.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::Runtime(format!(
            "File \"{}\" does not have content",
            path.display()
        )));
    }
    info!("Loading XML document from {} ({} bytes)", path.display(), content.len());

    let text = String::from_utf8(content).map_err(|e| {
        Error::Runtime(format!(
            "File \"{}\" is not valid UTF-8 XML: {e}",
            path.display()
        ))
    })?;
    from_string(&text).map_err(|err| match err {
        Error::UnparseableXml(msg) => Error::Runtime(format!(
            "File \"{}\" cannot be parsed as XML: {msg}",
            path.display()
        )),
        other => other,
    })
}

fn open_element(e: &BytesStart, scopes: &mut Vec<Scope>) -> Result<Element> {
    let mut scope = scopes.last().cloned().unwrap_or_default();
    let mut declarations = Vec::new();
    let mut raw_attributes = Vec::new();

    for attr in e.attributes() {
        let attr = attr.map_err(|e| Error::UnparseableXml(e.to_string()))?;
        let key = str::from_utf8(attr.key.as_ref())
            .map_err(|e| Error::UnparseableXml(e.to_string()))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::UnparseableXml(e.to_string()))?
            .into_owned();

        let prefix = if key == "xmlns" {
            Some(None)
        } else {
            key.strip_prefix("xmlns:").map(|p| Some(p.to_string()))
        };
        match prefix {
            Some(prefix) => {
                if value.is_empty() {
                    scope.remove(&prefix);
                } else {
                    scope.insert(prefix.clone(), value.clone());
                }
                declarations.push((prefix, value));
            }
            None => raw_attributes.push((key, value)),
        }
    }

    let qname = str::from_utf8(e.name().as_ref())
        .map_err(|e| Error::UnparseableXml(e.to_string()))?
        .to_string();
    let (prefix, local_name) = split_qname(&qname);
    let namespace = resolve(&scope, prefix, true)?;

    let mut attributes = Vec::with_capacity(raw_attributes.len());
    for (key, value) in raw_attributes {
        let (attr_prefix, attr_local) = split_qname(&key);
        let attr_ns = match attr_prefix {
            Some(_) => resolve(&scope, attr_prefix, false)?,
            None => None,
        };
        attributes.push(Attribute {
            prefix: attr_prefix.map(str::to_string),
            local_name: attr_local.to_string(),
            namespace: attr_ns,
            value,
        });
    }

    let element = Element {
        prefix: prefix.map(str::to_string),
        local_name: local_name.to_string(),
        namespace,
        declarations,
        attributes,
        children: Vec::new(),
    };
    scopes.push(scope);
    Ok(element)
}

fn resolve(scope: &Scope, prefix: Option<&str>, use_default: bool) -> Result<Option<String>> {
    match prefix {
        Some("xml") => Ok(Some(ns::XML.to_string())),
        Some(p) => scope
            .get(&Some(p.to_string()))
            .cloned()
            .map(Some)
            .ok_or_else(|| Error::UnparseableXml(format!("Namespace prefix {p} is not defined"))),
        None if use_default => Ok(scope.get(&None).cloned()),
        None => Ok(None),
    }
}

fn attach(element: Element, stack: &mut [Element], root: &mut Option<Element>) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(Error::UnparseableXml(
                "Extra content at the end of the document".into(),
            ));
        }
    }
    Ok(())
}

fn push_text(stack: &mut [Element], text: String) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            if let Some(Node::Text(prev)) = parent.children.last_mut() {
                prev.push_str(&text);
            } else {
                parent.children.push(Node::Text(text));
            }
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(Error::UnparseableXml(
            "Start tag expected, text found outside of the root element".into(),
        )),
    }
}
