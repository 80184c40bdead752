use crate::constants::{STATUS_PREFIX, STATUS_SUCCESS};
use crate::error::{Error, Result};
use crate::xml::{Element, ns};

/// `samlp:Status` with its top-level code, optional second-level code and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub code: String,
    pub sub_code: Option<String>,
    pub message: Option<String>,
}

impl Default for Status {
    fn default() -> Self {
        Self::success()
    }
}

impl Status {
    pub fn success() -> Self {
        Self::new(STATUS_SUCCESS)
    }

    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            sub_code: None,
            message: None,
        }
    }

    pub fn from_element(element: &Element) -> Result<Self> {
        let status_code = element
            .first_child_named(ns::SAMLP, "StatusCode")
            .ok_or_else(|| Error::structure("Missing status code in status element."))?;

        Ok(Self {
            code: status_code.attribute("Value").unwrap_or_default().to_string(),
            sub_code: status_code
                .first_child_named(ns::SAMLP, "StatusCode")
                .and_then(|sub| sub.attribute("Value"))
                .map(str::to_string),
            message: element
                .first_child_named(ns::SAMLP, "StatusMessage")
                .map(Element::text),
        })
    }

    pub fn is_success(&self) -> bool {
        self.code == STATUS_SUCCESS
    }

    /// `Code/SubCode Message`, with the common status URI prefix dropped.
    pub fn describe(&self) -> String {
        let mut out = truncate(&self.code).to_string();
        if let Some(sub_code) = &self.sub_code {
            out.push('/');
            out.push_str(truncate(sub_code));
        }
        if let Some(message) = &self.message {
            out.push(' ');
            out.push_str(message);
        }
        out
    }

    pub fn to_xml<'a>(&self, parent: &'a mut Element) -> &'a mut Element {
        let el = parent.append_element(Element::new_ns(ns::SAMLP, "samlp:Status"));
        let code = el.append_element(Element::new_ns(ns::SAMLP, "samlp:StatusCode"));
        code.set_attribute("Value", self.code.as_str());
        if let Some(sub_code) = &self.sub_code {
            code.append_element(Element::new_ns(ns::SAMLP, "samlp:StatusCode"))
                .set_attribute("Value", sub_code.as_str());
        }
        if let Some(message) = &self.message {
            el.append_text_element(ns::SAMLP, "samlp:StatusMessage", message.as_str());
        }
        el
    }
}

fn truncate(code: &str) -> &str {
    code.strip_prefix(STATUS_PREFIX).unwrap_or(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{STATUS_REQUESTER, STATUS_REQUEST_DENIED};
    use crate::xml;

    #[test]
    fn test_describe() {
        let status = Status {
            code: "foo".into(),
            sub_code: Some(format!("{STATUS_PREFIX}bar")),
            message: Some("this is a test message".into()),
        };
        assert_eq!(status.describe(), "foo/bar this is a test message");
        assert_eq!(Status::new(STATUS_REQUESTER).describe(), "Requester");
    }

    #[test]
    fn test_round_trip() {
        let status = Status {
            code: STATUS_REQUESTER.into(),
            sub_code: Some(STATUS_REQUEST_DENIED.into()),
            message: Some("Denied".into()),
        };
        let mut parent = Element::new_ns(ns::SAMLP, "samlp:Response");
        status.to_xml(&mut parent);

        let doc = xml::from_string(&parent.to_xml_string().unwrap()).unwrap();
        let again = Status::from_element(doc.root().first_child_element().unwrap()).unwrap();
        assert_eq!(again, status);
        assert!(!again.is_success());
        assert!(Status::success().is_success());
    }
}
