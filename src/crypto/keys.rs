use secrecy::{ExposeSecret, SecretSlice};

/// Content-encryption key material. Zeroized on drop and redacted in `Debug`.
#[derive(Debug, Clone)]
pub struct SecureBytes(SecretSlice<u8>);

impl SecureBytes {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self(SecretSlice::new(data.into().into()))
    }

    pub fn expose_secret(&self) -> &[u8] {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.expose_secret().is_empty()
    }
}

impl From<Vec<u8>> for SecureBytes {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_is_redacted() {
        let key = SecureBytes::from(vec![0x2b; 16]);
        assert_eq!(key.len(), 16);
        assert!(!format!("{key:?}").contains("43"));
    }
}
