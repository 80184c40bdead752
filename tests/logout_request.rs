mod common;

use chrono::{TimeZone, Utc};
use common::*;
use saml2::ErrorKind;
use saml2::assertion::NameId;
use saml2::protocol::LogoutRequest;
use saml2::signed::Signable;

fn logout_request(body: &str) -> String {
    format!(
        r#"<samlp:LogoutRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="SomeIDValue" Version="2.0" IssueInstant="2010-07-22T11:30:19Z">
  <saml:Issuer>TheIssuer</saml:Issuer>
  {body}
</samlp:LogoutRequest>"#
    )
}

#[test]
fn test_parse_plain_request() {
    let xml = logout_request(
        r#"<saml:NameID>frits</saml:NameID>
           <samlp:SessionIndex>SessionIndexValue</samlp:SessionIndex>"#,
    );
    let request = LogoutRequest::from_element(&parse(&xml)).unwrap();
    assert_eq!(request.id(), "SomeIDValue");
    assert_eq!(request.issuer(), Some("TheIssuer"));
    assert_eq!(request.name_id().unwrap().unwrap().value, "frits");
    assert_eq!(request.session_index(), Some("SessionIndexValue"));
    assert!(!request.header().was_signed());
}

#[test]
fn test_multiple_session_indexes_keep_order() {
    let xml = logout_request(
        r#"<saml:NameID>frits</saml:NameID>
           <samlp:SessionIndex>first</samlp:SessionIndex>
           <samlp:SessionIndex>second</samlp:SessionIndex>
           <samlp:SessionIndex>third</samlp:SessionIndex>"#,
    );
    let request = LogoutRequest::from_element(&parse(&xml)).unwrap();
    assert_eq!(request.session_indexes(), ["first", "second", "third"]);
}

#[test]
fn test_identifier_count_is_enforced() {
    let none = LogoutRequest::from_element(&parse(&logout_request(""))).unwrap_err();
    assert_eq!(none.kind(), ErrorKind::StructuralViolation);
    assert_eq!(
        none.to_string(),
        "Missing <saml:NameID> or <saml:EncryptedID> in <samlp:LogoutRequest>"
    );

    let two = LogoutRequest::from_element(&parse(&logout_request(
        "<saml:NameID>a</saml:NameID><saml:NameID>b</saml:NameID>",
    )))
    .unwrap_err();
    assert_eq!(two.kind(), ErrorKind::StructuralViolation);

    let mixed = LogoutRequest::from_element(&parse(&logout_request(
        r#"<saml:NameID>a</saml:NameID>
           <saml:EncryptedID><xenc:EncryptedData xmlns:xenc="http://www.w3.org/2001/04/xmlenc#"/></saml:EncryptedID>"#,
    )))
    .unwrap_err();
    assert_eq!(
        mixed.to_string(),
        "More than one <saml:NameID> or <saml:EncryptedID> in <samlp:LogoutRequest>"
    );
}

#[test]
fn test_signed_and_encrypted_round_trip() {
    let mut request = LogoutRequest::new();
    request.set_issuer(Some(SP_ENTITY.into()));
    request.set_not_on_or_after(Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()));
    request.set_reason(Some("urn:oasis:names:tc:SAML:2.0:logout:user".into()));
    request.set_name_id(NameId::new("frits"));
    request.set_session_indexes(vec!["a".into(), "b".into()]);
    request.encrypt_name_id(&encryption_key()).unwrap();
    request.set_signature_key(Some(signing_key()));

    let xml = to_string(&request.to_signed_xml().unwrap());
    assert!(!xml.contains(">frits<"));

    let mut received = LogoutRequest::from_element(&parse(&xml)).unwrap();
    assert!(received.header().was_signed());
    assert!(received.validate(&verification_key()).unwrap());
    assert!(received.is_name_id_encrypted());
    assert_eq!(
        received.name_id().unwrap_err().kind(),
        ErrorKind::NotDecryptedYet
    );

    received.decrypt_name_id(&decryption_key()).unwrap();
    assert_eq!(received.name_id().unwrap().unwrap().value, "frits");
    assert_eq!(received.session_indexes(), ["a", "b"]);
    assert_eq!(received.reason(), Some("urn:oasis:names:tc:SAML:2.0:logout:user"));
    assert_eq!(received.not_on_or_after(), request.not_on_or_after());
}

#[test]
fn test_tampered_request_is_rejected() {
    let mut request = LogoutRequest::new();
    request.set_issuer(Some(SP_ENTITY.into()));
    request.set_name_id(NameId::new("frits"));
    request.set_signature_key(Some(signing_key()));

    let xml = to_string(&request.to_signed_xml().unwrap()).replace(">frits<", ">admin<");
    let err = LogoutRequest::from_element(&parse(&xml)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CryptographicFailure);
}
