//! Namespace URIs and the prefixes this crate emits for them.

pub const SAML: &str = "urn:oasis:names:tc:SAML:2.0:assertion";
pub const SAMLP: &str = "urn:oasis:names:tc:SAML:2.0:protocol";
pub const MD: &str = "urn:oasis:names:tc:SAML:2.0:metadata";
pub const DS: &str = "http://www.w3.org/2000/09/xmldsig#";
pub const XENC: &str = "http://www.w3.org/2001/04/xmlenc#";
pub const XS: &str = "http://www.w3.org/2001/XMLSchema";
pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
pub const MDRPI: &str = "urn:oasis:names:tc:SAML:metadata:rpi";
pub const MDUI: &str = "urn:oasis:names:tc:SAML:metadata:ui";
pub const ALG: &str = "urn:oasis:names:tc:SAML:metadata:algsupport";
pub const AC: &str = "urn:oasis:names:tc:SAML:2.0:ac";

pub mod prefix {
    pub const SAML: &str = "saml";
    pub const SAMLP: &str = "samlp";
    pub const MD: &str = "md";
    pub const DS: &str = "ds";
    pub const XENC: &str = "xenc";
    pub const XS: &str = "xs";
    pub const XSI: &str = "xsi";
    pub const MDRPI: &str = "mdrpi";
    pub const MDUI: &str = "mdui";
    pub const ALG: &str = "alg";
}
