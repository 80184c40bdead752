use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use color_eyre::eyre::Report;
use openssl::memcmp;
use pem::{EncodeConfig, LineEnding, Pem};
use quick_xml::se::to_string_with_root as xml_to_string;
use serde::Serialize;
use tracing::{debug, warn};

use crate::crypto::HashAlg;
use crate::error::{Error, Result};
use crate::xml::{self, C14nOptions, Element, Node, canonicalize, ns};
use crate::xmlsec::{Algorithm, SecurityKey, algorithms};

#[derive(Debug, Serialize)]
struct Signature {
    #[serde(rename = "@xmlns:ds")]
    xmlns_ds: &'static str,

    #[serde(rename = "ds:SignedInfo")]
    signed_info: SignedInfo,

    #[serde(rename = "ds:SignatureValue")]
    signature_value: String,

    #[serde(rename = "ds:KeyInfo", skip_serializing_if = "Option::is_none")]
    key_info: Option<KeyInfo>,
}

#[derive(Debug, Serialize)]
struct SignedInfo {
    #[serde(rename = "ds:CanonicalizationMethod")]
    canon_method: AlgorithmRef,

    #[serde(rename = "ds:SignatureMethod")]
    signature_method: AlgorithmRef,

    #[serde(rename = "ds:Reference")]
    reference: Reference,
}

#[derive(Debug, Serialize)]
struct AlgorithmRef {
    #[serde(rename = "@Algorithm")]
    algorithm: &'static str,
}

#[derive(Debug, Serialize)]
struct Reference {
    #[serde(rename = "@URI")]
    uri: String,

    #[serde(rename = "ds:Transforms")]
    transforms: Transforms,

    #[serde(rename = "ds:DigestMethod")]
    digest_method: AlgorithmRef,

    #[serde(rename = "ds:DigestValue")]
    digest_value: String,
}

#[derive(Debug, Serialize)]
struct Transforms {
    #[serde(rename = "ds:Transform")]
    transform: Vec<AlgorithmRef>,
}

#[derive(Debug, Serialize)]
struct KeyInfo {
    #[serde(rename = "ds:X509Data")]
    x509_data: X509Data,
}

#[derive(Debug, Serialize)]
struct X509Data {
    #[serde(rename = "ds:X509Certificate")]
    certificates: Vec<String>,
}

/// Child index just after `<saml:Issuer>`, or 0 when there is none.
pub fn insertion_point_after_issuer(element: &Element) -> usize {
    element
        .position_of(|e| e.is(ns::SAML, "Issuer"))
        .map_or(0, |i| i + 1)
}

/// Sign `element` with an enveloped signature inserted at child index `insert_at`.
///
/// The element must carry an `ID` attribute. `certificates` are PEM encoded
/// and end up in `ds:KeyInfo/ds:X509Data`.
pub fn sign_element(
    element: &mut Element,
    key: &SecurityKey,
    certificates: &[String],
    insert_at: usize,
) -> Result<()> {
    let id = element
        .attribute("ID")
        .ok_or_else(|| {
            Error::structure(format!(
                "Cannot sign <{}> without an ID attribute",
                element.qualified_name()
            ))
        })?
        .to_string();

    if key.algorithm().hash_alg().is_none() {
        return Err(Error::Unsupported(format!(
            "{} is not a signature algorithm",
            key.algorithm()
        )));
    }

    element.remove_children(|e| e.is(ns::DS, "Signature"));
    let digest = HashAlg::Sha256.hash(canonicalize(element, &C14nOptions::default())?)?;

    let key_info = if certificates.is_empty() {
        None
    } else {
        let certificates = certificates
            .iter()
            .map(|c| certificate_body(c))
            .collect::<Result<Vec<_>>>()?;
        Some(KeyInfo {
            x509_data: X509Data { certificates },
        })
    };

    let signature = Signature {
        xmlns_ds: ns::DS,
        signed_info: SignedInfo {
            canon_method: AlgorithmRef {
                algorithm: algorithms::EXCLUSIVE_C14N,
            },
            signature_method: AlgorithmRef {
                algorithm: key.algorithm().uri(),
            },
            reference: Reference {
                uri: format!("#{id}"),
                transforms: Transforms {
                    transform: vec![
                        AlgorithmRef {
                            algorithm: algorithms::ENVELOPED_SIGNATURE,
                        },
                        AlgorithmRef {
                            algorithm: algorithms::EXCLUSIVE_C14N,
                        },
                    ],
                },
                digest_method: AlgorithmRef {
                    algorithm: HashAlg::Sha256.digest_uri(),
                },
                digest_value: BASE64.encode(&digest),
            },
        },
        signature_value: String::new(),
        key_info,
    };

    let signature_xml =
        xml_to_string("ds:Signature", &signature).map_err(|e| Error::Xml(Report::new(e)))?;
    let mut signature_el = xml::from_string(&signature_xml)?.into_root();

    let signed_info = signature_el
        .first_child_named(ns::DS, "SignedInfo")
        .ok_or_else(|| Error::structure("Serialized signature lacks ds:SignedInfo"))?;
    let signed_info_c14n = canonicalize(signed_info, &C14nOptions::default())?;
    let value = key.sign(signed_info_c14n.as_bytes())?;

    signature_el
        .first_child_named_mut(ns::DS, "SignatureValue")
        .ok_or_else(|| Error::structure("Serialized signature lacks ds:SignatureValue"))?
        .set_text(BASE64.encode(value));

    debug!(
        "Signed <{}> #{id} with {}",
        element.qualified_name(),
        key.algorithm()
    );
    element.insert_child(insert_at, Node::Element(signature_el));
    Ok(())
}

/// Verify the enveloped signature of `element`.
///
/// Returns `Ok(false)` when the element is unsigned.
pub fn verify_element(element: &Element, key: &SecurityKey) -> Result<bool> {
    match SignatureData::extract(element)? {
        Some(data) => data.verify(key),
        None => Ok(false),
    }
}

/// A signature whose reference has already been checked against the
/// element it was found on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureData {
    algorithm: Algorithm,
    signed_info: String,
    signature_value: Vec<u8>,
    certificates: Vec<String>,
}

impl SignatureData {
    /// Locate the `ds:Signature` child of `element` and validate its reference.
    ///
    /// Digest mismatches fail here with a reference validation error; the
    /// signature value itself is checked by [`SignatureData::verify`].
    pub fn extract(element: &Element) -> Result<Option<Self>> {
        let mut signatures = element.children_named(ns::DS, "Signature");
        let Some(signature) = signatures.next() else {
            return Ok(None);
        };
        if signatures.next().is_some() {
            return Err(Error::structure(format!(
                "More than one <ds:Signature> in <{}>",
                element.qualified_name()
            )));
        }

        let signed_info = required_child(signature, "SignedInfo")?;
        let canon_method = required_child(signed_info, "CanonicalizationMethod")?;
        let options = c14n_options(canon_method)?;

        let method = required_child(signed_info, "SignatureMethod")?;
        let algorithm: Algorithm = method.attribute("Algorithm").unwrap_or_default().parse()?;
        if algorithm.hash_alg().is_none() {
            return Err(Error::Unsupported(format!(
                "{algorithm} is not a signature algorithm"
            )));
        }

        let references: Vec<_> = signed_info.children_named(ns::DS, "Reference").collect();
        match references.as_slice() {
            [reference] => validate_reference(element, reference)?,
            _ => {
                return Err(Error::ReferenceValidation(format!(
                    "expected exactly one reference, found {}",
                    references.len()
                )));
            }
        }

        let signature_value =
            BASE64.decode(strip_whitespace(&required_child(signature, "SignatureValue")?.text()))?;

        let certificates = signature
            .first_child_named(ns::DS, "KeyInfo")
            .into_iter()
            .flat_map(|ki| ki.children_named(ns::DS, "X509Data"))
            .flat_map(|data| data.children_named(ns::DS, "X509Certificate"))
            .map(|c| certificate_pem(&c.text()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Self {
            algorithm,
            signed_info: canonicalize(signed_info, &options)?,
            signature_value,
            certificates,
        }))
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// PEM encoded certificates from `ds:KeyInfo`
    pub fn certificates(&self) -> &[String] {
        &self.certificates
    }

    /// Check the signature value against `key`.
    pub fn verify(&self, key: &SecurityKey) -> Result<bool> {
        if key.verify(self.algorithm, self.signed_info.as_bytes(), &self.signature_value)? {
            debug!("Signature verified with {}", self.algorithm);
            Ok(true)
        } else {
            warn!("Signature does not verify with the supplied key");
            Err(Error::SignatureValidation(
                "signature value does not match the key".into(),
            ))
        }
    }
}

fn required_child<'a>(parent: &'a Element, local_name: &str) -> Result<&'a Element> {
    parent.first_child_named(ns::DS, local_name).ok_or_else(|| {
        Error::structure(format!(
            "Missing <ds:{local_name}> in <{}>",
            parent.qualified_name()
        ))
    })
}

fn c14n_options(method: &Element) -> Result<C14nOptions> {
    let with_comments = match method.attribute("Algorithm") {
        Some(algorithms::EXCLUSIVE_C14N) => false,
        Some(algorithms::EXCLUSIVE_C14N_WITH_COMMENTS) => true,
        other => {
            return Err(Error::Unsupported(format!(
                "Unsupported canonicalization method: {}",
                other.unwrap_or_default()
            )));
        }
    };
    let prefixes = method
        .first_child_named(algorithms::EXCLUSIVE_C14N, "InclusiveNamespaces")
        .and_then(|e| e.attribute("PrefixList"))
        .unwrap_or_default();
    Ok(C14nOptions {
        with_comments,
        ..C14nOptions::with_inclusive_prefixes(prefixes)
    })
}

fn validate_reference(element: &Element, reference: &Element) -> Result<()> {
    let uri = reference.attribute("URI").unwrap_or_default();
    let points_here = uri.is_empty()
        || uri
            .strip_prefix('#')
            .is_some_and(|r| element.attribute("ID") == Some(r));
    if !points_here {
        return Err(Error::ReferenceValidation(format!(
            "reference \"{uri}\" does not point at <{}>",
            element.qualified_name()
        )));
    }

    let mut target = element.clone();
    let mut options = C14nOptions::default();
    let transforms = reference
        .first_child_named(ns::DS, "Transforms")
        .into_iter()
        .flat_map(|t| t.children_named(ns::DS, "Transform"));
    for transform in transforms {
        match transform.attribute("Algorithm") {
            Some(algorithms::ENVELOPED_SIGNATURE) => {
                target.remove_children(|e| e.is(ns::DS, "Signature"));
            }
            Some(_) => options = c14n_options(transform)?,
            None => return Err(Error::structure("Missing Algorithm on <ds:Transform>")),
        }
    }
    // Same-document references drop comments before any transform runs.
    options.with_comments = false;

    let digest_method = reference
        .first_child_named(ns::DS, "DigestMethod")
        .and_then(|d| d.attribute("Algorithm"))
        .unwrap_or_default();
    let digest_alg = HashAlg::from_digest_uri(digest_method)
        .ok_or_else(|| Error::Unsupported(format!("Unsupported digest method: {digest_method}")))?;

    let expected = BASE64.decode(strip_whitespace(&required_child(reference, "DigestValue")?.text()))?;
    let actual = digest_alg.hash(canonicalize(&target, &options)?)?;

    if expected.len() != actual.len() || !memcmp::eq(&expected, &actual) {
        warn!("Digest mismatch on <{}>", element.qualified_name());
        return Err(Error::ReferenceValidation("digest mismatch".into()));
    }
    Ok(())
}

pub(super) fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_ascii_whitespace()).collect()
}

/// Base64 body of a PEM certificate, as written into `ds:X509Certificate`.
fn certificate_body(pem_cert: &str) -> Result<String> {
    let parsed = pem::parse(pem_cert)
        .map_err(|e| Error::Configuration(format!("Invalid PEM certificate: {e}")))?;
    Ok(BASE64.encode(parsed.contents()))
}

fn certificate_pem(body: &str) -> Result<String> {
    let der = BASE64.decode(strip_whitespace(body))?;
    Ok(pem::encode_config(
        &Pem::new("CERTIFICATE", der),
        EncodeConfig::new().set_line_ending(LineEnding::LF),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const IDP_KEY: &str = include_str!("../../test_data/saml/idp.key.pem");
    const IDP_CERT: &str = include_str!("../../test_data/saml/idp.cert.pem");
    const OTHER_CERT: &str = include_str!("../../test_data/saml/other.cert.pem");

    const UNSIGNED: &str = r#"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_a1" Version="2.0" IssueInstant="2024-01-01T00:00:00Z"><saml:Issuer>https://idp.example.org</saml:Issuer><saml:Subject><saml:NameID>user@example.org</saml:NameID></saml:Subject></saml:Assertion>"#;

    fn signed() -> String {
        let key = SecurityKey::private_from_pem(Algorithm::RsaSha256, IDP_KEY, None).unwrap();
        let mut el = xml::from_string(UNSIGNED).unwrap().into_root();
        let at = insertion_point_after_issuer(&el);
        sign_element(&mut el, &key, &[IDP_CERT.to_string()], at).unwrap();
        el.to_xml_string().unwrap()
    }

    fn idp_public() -> SecurityKey {
        SecurityKey::public_from_pem(Algorithm::RsaSha256, IDP_CERT).unwrap()
    }

    #[test]
    fn test_signature_follows_issuer() {
        let el = xml::from_string(&signed()).unwrap().into_root();
        let names: Vec<_> = el.child_elements().map(|e| e.local_name().to_string()).collect();
        assert_eq!(names, ["Issuer", "Signature", "Subject"]);
    }

    #[test]
    fn test_signature_value_is_filled() {
        let el = xml::from_string(&signed()).unwrap().into_root();
        let value = el
            .first_child_named(ns::DS, "Signature")
            .and_then(|sig| sig.first_child_named(ns::DS, "SignatureValue"))
            .unwrap()
            .text();
        assert_eq!(BASE64.decode(strip_whitespace(&value)).unwrap().len(), 256);
    }

    #[test]
    fn test_sign_then_verify() {
        let el = xml::from_string(&signed()).unwrap().into_root();
        assert!(verify_element(&el, &idp_public()).unwrap());

        let data = SignatureData::extract(&el).unwrap().unwrap();
        assert_eq!(data.algorithm(), Algorithm::RsaSha256);
        assert_eq!(data.certificates().len(), 1);
        assert_eq!(
            pem::parse(&data.certificates()[0]).unwrap().contents(),
            pem::parse(IDP_CERT).unwrap().contents()
        );
    }

    #[test]
    fn test_tampered_content_fails_reference() {
        let tampered = signed().replace("user@example.org", "admin@example.org");
        let el = xml::from_string(&tampered).unwrap().into_root();
        let err = SignatureData::extract(&el).unwrap_err();
        assert!(matches!(err, Error::ReferenceValidation(_)));
        assert_eq!(err.kind(), ErrorKind::CryptographicFailure);
    }

    #[test]
    fn test_wrong_key_fails_signature() {
        let el = xml::from_string(&signed()).unwrap().into_root();
        let other = SecurityKey::public_from_pem(Algorithm::RsaSha256, OTHER_CERT).unwrap();
        let err = verify_element(&el, &other).unwrap_err();
        assert!(matches!(err, Error::SignatureValidation(_)));
    }

    #[test]
    fn test_comment_in_signed_text_keeps_signature_valid() {
        let injected = signed().replace("user@example.org", "user@example.org<!-- x -->.evil");
        let el = xml::from_string(&injected).unwrap().into_root();
        // The text changed, so the digest must not match.
        assert!(SignatureData::extract(&el).is_err());

        let split = signed().replace("user@example.org", "user@<!-- x -->example.org");
        let el = xml::from_string(&split).unwrap().into_root();
        assert!(verify_element(&el, &idp_public()).unwrap());
    }

    #[test]
    fn test_unsigned_element() {
        let el = xml::from_string(UNSIGNED).unwrap().into_root();
        assert!(SignatureData::extract(&el).unwrap().is_none());
        assert!(!verify_element(&el, &idp_public()).unwrap());
    }

    #[test]
    fn test_sign_requires_id() {
        let key = SecurityKey::private_from_pem(Algorithm::RsaSha256, IDP_KEY, None).unwrap();
        let mut el = xml::from_string("<a/>").unwrap().into_root();
        assert!(sign_element(&mut el, &key, &[], 0).is_err());
    }
}
