//! XML Signature and XML Encryption over the crate DOM.
//!
//! Signatures are enveloped, cover the element carrying the `ID` attribute
//! and are computed over its exclusive canonical form without comments.
//! Encryption seals a fresh AES content key with the recipient's RSA key.

mod encryption;
mod key;
mod signature;

pub use encryption::{
    EncryptedElement, decrypt_element, decrypt_element_in, encrypt_element, encrypt_element_in,
    encrypt_element_with,
};
pub use key::{Algorithm, SecurityKey};
pub use signature::{SignatureData, insertion_point_after_issuer, sign_element, verify_element};

// Algorithm URIs
pub mod algorithms {
    // Signature algorithms
    pub const RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
    pub const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
    pub const RSA_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384";
    pub const RSA_SHA512: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512";

    // Digest algorithms
    pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
    pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
    pub const SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#sha384";
    pub const SHA512: &str = "http://www.w3.org/2001/04/xmlenc#sha512";

    // Canonicalization and transforms
    pub const EXCLUSIVE_C14N: &str = crate::xml::EXCLUSIVE_C14N;
    pub const EXCLUSIVE_C14N_WITH_COMMENTS: &str = crate::xml::EXCLUSIVE_C14N_WITH_COMMENTS;
    pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

    // Key transport
    pub const RSA_OAEP_MGF1P: &str = "http://www.w3.org/2001/04/xmlenc#rsa-oaep-mgf1p";
    pub const RSA_1_5: &str = "http://www.w3.org/2001/04/xmlenc#rsa-1_5";

    // Block ciphers
    pub const AES128_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes128-cbc";
    pub const AES192_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes192-cbc";
    pub const AES256_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes256-cbc";
    pub const AES128_GCM: &str = "http://www.w3.org/2009/xmlenc11#aes128-gcm";
    pub const AES256_GCM: &str = "http://www.w3.org/2009/xmlenc11#aes256-gcm";

    pub const ENCRYPTED_ELEMENT: &str = "http://www.w3.org/2001/04/xmlenc#Element";
}
