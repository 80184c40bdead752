use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use tracing::{debug, warn};

use crate::container::{Container, MessageKind, TracingContainer};
use crate::crypto::sym::AesEncryptor;
use crate::error::{Error, Result};
use crate::xml::{self, Element, ns};
use crate::xmlsec::signature::strip_whitespace;
use crate::xmlsec::{Algorithm, SecurityKey, algorithms};

/// An `xenc:EncryptedData` element together with any `xenc:EncryptedKey`
/// siblings it was delivered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedElement {
    data: Element,
    keys: Vec<Element>,
}

impl EncryptedElement {
    /// Read the content of a SAML wrapper such as `saml:EncryptedID`.
    pub fn from_wrapper(wrapper: &Element) -> Result<Self> {
        let data = wrapper
            .first_child_named(ns::XENC, "EncryptedData")
            .ok_or_else(|| {
                Error::structure(format!(
                    "Missing <xenc:EncryptedData> in <{}>",
                    wrapper.qualified_name()
                ))
            })?
            .clone();
        let keys = wrapper
            .children_named(ns::XENC, "EncryptedKey")
            .cloned()
            .collect();
        Ok(Self { data, keys })
    }

    pub fn encrypted_data(&self) -> &Element {
        &self.data
    }

    /// Block cipher named by the `xenc:EncryptionMethod`
    pub fn algorithm(&self) -> Result<Algorithm> {
        algorithm_of(&self.data)
    }

    /// Put the encrypted content into a new wrapper element.
    pub fn to_wrapper(&self, namespace: &str, qname: &str) -> Element {
        let mut wrapper = Element::new_ns(namespace, qname);
        wrapper.append_element(self.data.clone());
        for key in &self.keys {
            wrapper.append_element(key.clone());
        }
        wrapper
    }
}

/// Encrypt `element` with AES-128-CBC for the holder of `key`.
pub fn encrypt_element(element: &Element, key: &SecurityKey) -> Result<EncryptedElement> {
    encrypt_element_in(&TracingContainer, element, key, Algorithm::Aes128Cbc)
}

pub fn encrypt_element_with(
    element: &Element,
    key: &SecurityKey,
    block_cipher: Algorithm,
) -> Result<EncryptedElement> {
    encrypt_element_in(&TracingContainer, element, key, block_cipher)
}

/// Encrypt `element` with `block_cipher`, sealing the content key with `key`.
///
/// The key transport algorithm is the one `key` is typed with when that is
/// RSA-OAEP or RSA 1.5, and RSA-OAEP otherwise.
pub fn encrypt_element_in(
    container: &dyn Container,
    element: &Element,
    key: &SecurityKey,
    block_cipher: Algorithm,
) -> Result<EncryptedElement> {
    let cipher = block_cipher.cipher().ok_or_else(|| {
        Error::Unsupported(format!("{block_cipher} is not a block encryption algorithm"))
    })?;
    let transport = match key.algorithm() {
        alg @ (Algorithm::RsaOaepMgf1p | Algorithm::Rsa15) => alg,
        _ => Algorithm::RsaOaepMgf1p,
    };

    container.debug_message(element, MessageKind::Encrypt);

    let session_key = cipher.generate_key()?;
    let ciphertext = AesEncryptor::new()
        .with_cipher(cipher)
        .encrypt(&session_key, element.to_xml_string()?)?;
    let sealed_key = key.wrap_key(transport, &session_key)?;

    let mut data = Element::new_ns(ns::XENC, "xenc:EncryptedData");
    data.declare_namespace(Some(ns::prefix::XENC), ns::XENC);
    data.set_attribute("Type", algorithms::ENCRYPTED_ELEMENT);
    data.append_element(encryption_method(block_cipher));

    let key_info = data.append_element(Element::new_ns(ns::DS, "ds:KeyInfo"));
    key_info.declare_namespace(Some(ns::prefix::DS), ns::DS);
    let encrypted_key = key_info.append_element(Element::new_ns(ns::XENC, "xenc:EncryptedKey"));
    encrypted_key.append_element(encryption_method(transport));
    encrypted_key.append_element(cipher_data(&sealed_key));

    data.append_element(cipher_data(&ciphertext));

    debug!(
        "Encrypted <{}> with {block_cipher} and {transport}",
        element.qualified_name()
    );
    Ok(EncryptedElement {
        data,
        keys: Vec::new(),
    })
}

pub fn decrypt_element(encrypted: &EncryptedElement, key: &SecurityKey) -> Result<Element> {
    decrypt_element_in(&TracingContainer, encrypted, key)
}

/// Decrypt `encrypted` with the private key `key`.
pub fn decrypt_element_in(
    container: &dyn Container,
    encrypted: &EncryptedElement,
    key: &SecurityKey,
) -> Result<Element> {
    let data = &encrypted.data;
    if let Some(kind) = data.attribute("Type") {
        if kind != algorithms::ENCRYPTED_ELEMENT {
            return Err(Error::Unsupported(format!(
                "Only element encryption is supported, got {kind}"
            )));
        }
    }

    let block_cipher = algorithm_of(data)?;
    let cipher = block_cipher.cipher().ok_or_else(|| {
        Error::Unsupported(format!("{block_cipher} is not a block encryption algorithm"))
    })?;

    let encrypted_key = data
        .first_child_named(ns::DS, "KeyInfo")
        .and_then(|ki| ki.first_child_named(ns::XENC, "EncryptedKey"))
        .or_else(|| encrypted.keys.first())
        .ok_or_else(|| Error::Decryption("No <xenc:EncryptedKey> found".into()))?;
    let transport = algorithm_of(encrypted_key)?;

    let session_key = key.unwrap_key(transport, &cipher_value(encrypted_key)?)?;
    if session_key.len() != cipher.key_size() {
        warn!("Unwrapped key has {} bytes, {block_cipher} needs {}", session_key.len(), cipher.key_size());
        return Err(Error::Decryption("Symmetric key has the wrong size".into()));
    }

    let plaintext = AesEncryptor::new()
        .with_cipher(cipher)
        .decrypt(&session_key, cipher_value(data)?)
        .map_err(|e| Error::Decryption(format!("Failed to decrypt data: {e}")))?;
    let plaintext = String::from_utf8(plaintext)
        .map_err(|_| Error::Decryption("Decrypted content is not UTF-8".into()))?;

    let element = xml::from_string(&plaintext)
        .map_err(|e| Error::Decryption(format!("Failed to parse decrypted XML: {e}")))?
        .into_root();
    container.debug_message(&element, MessageKind::Decrypt);
    Ok(element)
}

fn encryption_method(algorithm: Algorithm) -> Element {
    let mut method = Element::new_ns(ns::XENC, "xenc:EncryptionMethod");
    method.set_attribute("Algorithm", algorithm.uri());
    method
}

fn cipher_data(bytes: &[u8]) -> Element {
    let mut cipher_data = Element::new_ns(ns::XENC, "xenc:CipherData");
    cipher_data.append_text_element(ns::XENC, "xenc:CipherValue", BASE64.encode(bytes));
    cipher_data
}

fn algorithm_of(parent: &Element) -> Result<Algorithm> {
    parent
        .first_child_named(ns::XENC, "EncryptionMethod")
        .and_then(|m| m.attribute("Algorithm"))
        .ok_or_else(|| {
            Error::structure(format!(
                "Missing <xenc:EncryptionMethod> in <{}>",
                parent.qualified_name()
            ))
        })?
        .parse()
}

fn cipher_value(parent: &Element) -> Result<Vec<u8>> {
    let value = parent
        .first_child_named(ns::XENC, "CipherData")
        .and_then(|d| d.first_child_named(ns::XENC, "CipherValue"))
        .ok_or_else(|| {
            Error::structure(format!(
                "Missing <xenc:CipherValue> in <{}>",
                parent.qualified_name()
            ))
        })?;
    Ok(BASE64.decode(strip_whitespace(&value.text()))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const IDP_KEY: &str = include_str!("../../test_data/saml/idp.key.pem");
    const IDP_CERT: &str = include_str!("../../test_data/saml/idp.cert.pem");
    const OTHER_KEY: &str = include_str!("../../test_data/saml/other.key.pem");

    const NAME_ID: &str = r#"<saml:NameID xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" Format="urn:oasis:names:tc:SAML:2.0:nameid-format:transient">_abc</saml:NameID>"#;

    fn recipient() -> SecurityKey {
        SecurityKey::public_from_pem(Algorithm::RsaOaepMgf1p, IDP_CERT).unwrap()
    }

    fn holder(pem: &str) -> SecurityKey {
        SecurityKey::private_from_pem(Algorithm::RsaOaepMgf1p, pem, None).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let name_id = xml::from_string(NAME_ID).unwrap().into_root();
        for cipher in [Algorithm::Aes128Cbc, Algorithm::Aes256Cbc, Algorithm::Aes128Gcm] {
            let encrypted = encrypt_element_with(&name_id, &recipient(), cipher).unwrap();
            assert_eq!(encrypted.algorithm().unwrap(), cipher);
            let decrypted = decrypt_element(&encrypted, &holder(IDP_KEY)).unwrap();
            assert_eq!(decrypted.text(), "_abc");
            assert_eq!(
                decrypted.attribute("Format"),
                Some("urn:oasis:names:tc:SAML:2.0:nameid-format:transient")
            );
        }
    }

    #[test]
    fn test_wrapper_roundtrip_through_xml() {
        let name_id = xml::from_string(NAME_ID).unwrap().into_root();
        let encrypted = encrypt_element(&name_id, &recipient()).unwrap();
        let wrapper = encrypted.to_wrapper(ns::SAML, "saml:EncryptedID");

        let reparsed = xml::from_string(&wrapper.to_xml_string().unwrap())
            .unwrap()
            .into_root();
        let again = EncryptedElement::from_wrapper(&reparsed).unwrap();
        assert_eq!(decrypt_element(&again, &holder(IDP_KEY)).unwrap().text(), "_abc");
    }

    #[test]
    fn test_rsa_1_5_transport() {
        let name_id = xml::from_string(NAME_ID).unwrap().into_root();
        let key = recipient().with_algorithm(Algorithm::Rsa15);
        let encrypted = encrypt_element(&name_id, &key).unwrap();
        let holder = holder(IDP_KEY).with_algorithm(Algorithm::Rsa15);
        assert_eq!(decrypt_element(&encrypted, &holder).unwrap().text(), "_abc");
    }

    #[test]
    fn test_wrong_key_fails() {
        let name_id = xml::from_string(NAME_ID).unwrap().into_root();
        let encrypted = encrypt_element(&name_id, &recipient()).unwrap();
        let err = decrypt_element(&encrypted, &holder(OTHER_KEY)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CryptographicFailure);
    }

    #[test]
    fn test_missing_encrypted_data() {
        let wrapper = xml::from_string(
            r#"<saml:EncryptedID xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion"/>"#,
        )
        .unwrap()
        .into_root();
        assert!(EncryptedElement::from_wrapper(&wrapper).is_err());
    }
}
