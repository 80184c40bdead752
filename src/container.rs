//! Environment services the object model calls into.

use tracing::{Level, debug, enabled, warn};

use crate::error::{Error, Result};
use crate::xml::Element;

/// What happened to a message handed to [`Container::debug_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Plaintext about to be encrypted
    Encrypt,
    /// Plaintext that was just decrypted
    Decrypt,
    In,
    Out,
}

/// Hooks for ID generation, message debugging and user-agent redirects.
///
/// Pass an implementation to the `*_in` constructors and operations to
/// override the default [`TracingContainer`].
pub trait Container: Send + Sync {
    /// A fresh identifier usable as an XML `ID` attribute value.
    fn generate_id(&self) -> String;

    fn debug_message(&self, message: &Element, kind: MessageKind);

    /// Send the user agent to `url` with `data` in the query string.
    fn redirect(&self, url: &str, data: &[(String, String)]) -> Result<()>;

    /// Send the user agent to `url` with `data` as a POST form.
    fn post_redirect(&self, url: &str, data: &[(String, String)]) -> Result<()>;
}

/// Generates random IDs and logs messages at debug level.
///
/// There is no HTTP binding, so both redirects fail with [`Error::Unsupported`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingContainer;

impl Container for TracingContainer {
    fn generate_id(&self) -> String {
        // IDs are NCNames and must not start with a digit
        format!(
            "_{}{}",
            uuid::Uuid::new_v4().simple(),
            hex::encode(rand::random::<[u8; 4]>())
        )
    }

    fn debug_message(&self, message: &Element, kind: MessageKind) {
        if !enabled!(Level::DEBUG) {
            return;
        }
        match message.to_xml_string() {
            Ok(xml) => debug!(?kind, "{xml}"),
            Err(e) => debug!(?kind, "<{}> could not be serialized: {e}", message.qualified_name()),
        }
    }

    fn redirect(&self, url: &str, _data: &[(String, String)]) -> Result<()> {
        warn!("Refusing redirect to {url}: no HTTP binding available");
        Err(Error::Unsupported("HTTP-Redirect binding".into()))
    }

    fn post_redirect(&self, url: &str, _data: &[(String, String)]) -> Result<()> {
        warn!("Refusing POST redirect to {url}: no HTTP binding available");
        Err(Error::Unsupported("HTTP-POST binding".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_ncnames() {
        let container = TracingContainer;
        let a = container.generate_id();
        let b = container.generate_id();
        assert_ne!(a, b);
        assert!(a.starts_with('_'));
        assert_eq!(a.len(), 41);
        assert!(a[1..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_redirects_are_unsupported() {
        let container = TracingContainer;
        let data = [("SAMLRequest".to_string(), "abc".to_string())];
        assert!(matches!(
            container.redirect("https://sp.example.org/slo", &data),
            Err(Error::Unsupported(_))
        ));
        assert!(container.post_redirect("https://sp.example.org/acs", &data).is_err());
    }
}
