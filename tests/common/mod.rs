#![allow(dead_code)]

use saml2::assertion::{Assertion, NameId};
use saml2::constants::NAMEID_PERSISTENT;
use saml2::signed::Signable;
use saml2::xml::{self, Element};
use saml2::xmlsec::{Algorithm, SecurityKey};

pub const IDP_KEY: &str = include_str!("../../test_data/saml/idp.key.pem");
pub const IDP_CERT: &str = include_str!("../../test_data/saml/idp.cert.pem");
pub const OTHER_KEY: &str = include_str!("../../test_data/saml/other.key.pem");
pub const OTHER_CERT: &str = include_str!("../../test_data/saml/other.cert.pem");

pub const IDP_ENTITY: &str = "https://idp.example.org/saml2/idp/metadata.php";
pub const SP_ENTITY: &str = "https://sp.example.org/saml2/sp/metadata.php";

pub fn signing_key() -> SecurityKey {
    SecurityKey::private_from_pem(Algorithm::RsaSha256, IDP_KEY, None).unwrap()
}

pub fn verification_key() -> SecurityKey {
    SecurityKey::public_from_pem(Algorithm::RsaSha256, IDP_CERT).unwrap()
}

pub fn other_verification_key() -> SecurityKey {
    SecurityKey::public_from_pem(Algorithm::RsaSha256, OTHER_CERT).unwrap()
}

/// Public half used by senders to encrypt for the IdP key.
pub fn encryption_key() -> SecurityKey {
    SecurityKey::public_from_pem(Algorithm::RsaOaepMgf1p, IDP_CERT).unwrap()
}

pub fn decryption_key() -> SecurityKey {
    SecurityKey::private_from_pem(Algorithm::RsaOaepMgf1p, IDP_KEY, None).unwrap()
}

pub fn wrong_decryption_key() -> SecurityKey {
    SecurityKey::private_from_pem(Algorithm::RsaOaepMgf1p, OTHER_KEY, None).unwrap()
}

/// Base64 body of the IdP certificate, as carried by `ds:X509Certificate`.
pub fn idp_cert_base64() -> String {
    IDP_CERT
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect()
}

pub fn parse(xml: &str) -> Element {
    xml::from_string(xml).unwrap().into_root()
}

/// A populated assertion, signed with the IdP key when serialized.
pub fn signed_assertion(subject: &str) -> Assertion {
    let mut assertion = Assertion::new();
    assertion.set_issuer(IDP_ENTITY);
    assertion.set_name_id(Some(NameId::new(subject).with_format(NAMEID_PERSISTENT)));
    assertion.set_valid_audiences(Some(vec![SP_ENTITY.to_string()]));
    assertion.add_attribute_value("urn:oid:0.9.2342.19200300.100.1.1", "student");
    assertion.set_signature_key(Some(signing_key()));
    assertion.set_certificates(vec![IDP_CERT.to_string()]);
    assertion
}

pub fn to_string(element: &Element) -> String {
    element.to_xml_string().unwrap()
}
