use crate::crypto::SecureBytes;
use crate::crypto::errors::{CryptoResult, Error};
use crate::crypto::utils::{generate_random_bytes, xmlenc_pad, xmlenc_unpad};
use openssl::symm::{Cipher as OpenSslCipher, Crypter, Mode, decrypt_aead, encrypt_aead};

const AES_BLOCK_SIZE: usize = 16;
const GCM_IV_SIZE: usize = 12;
const GCM_TAG_SIZE: usize = 16;

/// Represents a symmetric cipher algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cipher {
    /// AES-128-CBC cipher
    Aes128Cbc,
    /// AES-192-CBC cipher
    Aes192Cbc,
    /// AES-256-CBC cipher
    Aes256Cbc,
    /// AES-128-GCM cipher
    Aes128Gcm,
    /// AES-256-GCM cipher
    Aes256Gcm,
}

impl Cipher {
    /// Get the key size of the cipher in bytes
    pub const fn key_size(self) -> usize {
        match self {
            Self::Aes128Cbc | Self::Aes128Gcm => 16,
            Self::Aes192Cbc => 24,
            Self::Aes256Cbc | Self::Aes256Gcm => 32,
        }
    }

    /// Size of the IV that prefixes the ciphertext
    pub const fn iv_size(self) -> usize {
        match self {
            Self::Aes128Gcm | Self::Aes256Gcm => GCM_IV_SIZE,
            _ => AES_BLOCK_SIZE,
        }
    }

    pub const fn is_aead(self) -> bool {
        matches!(self, Self::Aes128Gcm | Self::Aes256Gcm)
    }

    /// Convert the cipher to an OpenSSL cipher
    pub fn to_openssl_cipher(self) -> OpenSslCipher {
        match self {
            Self::Aes128Cbc => OpenSslCipher::aes_128_cbc(),
            Self::Aes192Cbc => OpenSslCipher::aes_192_cbc(),
            Self::Aes256Cbc => OpenSslCipher::aes_256_cbc(),
            Self::Aes128Gcm => OpenSslCipher::aes_128_gcm(),
            Self::Aes256Gcm => OpenSslCipher::aes_256_gcm(),
        }
    }

    /// Fresh random content-encryption key for this cipher
    pub fn generate_key(self) -> CryptoResult<SecureBytes> {
        Ok(SecureBytes::new(generate_random_bytes(self.key_size())?))
    }
}

/// Encrypts and decrypts content the way XML Encryption lays it out:
/// the IV is prepended to the ciphertext and, for GCM, the tag appended.
#[derive(Debug, Clone)]
pub struct AesEncryptor {
    cipher: Cipher,
}

impl AesEncryptor {
    /// Create a new AES encryptor.
    ///
    /// Uses AES-128-CBC by default. Could be overridden using [`with_cipher`].
    ///
    /// [`with_cipher`]: AesEncryptor::with_cipher
    pub const fn new() -> Self {
        Self {
            cipher: Cipher::Aes128Cbc,
        }
    }

    /// Override the cipher used by this encryptor
    pub fn with_cipher(mut self, cipher: Cipher) -> Self {
        self.cipher = cipher;
        self
    }

    pub fn cipher(&self) -> Cipher {
        self.cipher
    }

    /// Encrypt `plaintext`, returning `IV || ciphertext [|| tag]`
    pub fn encrypt(&self, key: &SecureBytes, plaintext: impl AsRef<[u8]>) -> CryptoResult<Vec<u8>> {
        self.check_key(key)?;
        let iv = generate_random_bytes(self.cipher.iv_size())?;
        let plaintext = plaintext.as_ref();

        let body = if self.cipher.is_aead() {
            let mut tag = [0u8; GCM_TAG_SIZE];
            let mut ct = encrypt_aead(
                self.cipher.to_openssl_cipher(),
                key.expose_secret(),
                Some(&iv),
                &[],
                plaintext,
                &mut tag,
            )?;
            ct.extend_from_slice(&tag);
            ct
        } else {
            let padded = xmlenc_pad(plaintext, AES_BLOCK_SIZE)?;
            self.run_cbc(Mode::Encrypt, key, &iv, &padded)?
        };

        let mut out = iv;
        out.extend(body);
        Ok(out)
    }

    /// Decrypt `IV || ciphertext [|| tag]`
    pub fn decrypt(&self, key: &SecureBytes, data: impl AsRef<[u8]>) -> CryptoResult<Vec<u8>> {
        self.check_key(key)?;
        let data = data.as_ref();
        let iv_size = self.cipher.iv_size();

        if self.cipher.is_aead() {
            if data.len() < iv_size + GCM_TAG_SIZE {
                return Err(Error::Ciphertext("shorter than one IV".into()));
            }
            let (iv, rest) = data.split_at(iv_size);
            let (ct, tag) = rest.split_at(rest.len() - GCM_TAG_SIZE);
            return Ok(decrypt_aead(
                self.cipher.to_openssl_cipher(),
                key.expose_secret(),
                Some(iv),
                &[],
                ct,
                tag,
            )?);
        }

        if data.len() < iv_size + AES_BLOCK_SIZE || (data.len() - iv_size) % AES_BLOCK_SIZE != 0 {
            return Err(Error::Ciphertext("not a whole number of blocks".into()));
        }
        let (iv, ct) = data.split_at(iv_size);
        let padded = self.run_cbc(Mode::Decrypt, key, iv, ct)?;
        xmlenc_unpad(&padded, AES_BLOCK_SIZE)
    }

    fn check_key(&self, key: &SecureBytes) -> CryptoResult<()> {
        if key.len() != self.cipher.key_size() {
            return Err(Error::KeyLength {
                expected: self.cipher.key_size(),
                actual: key.len(),
            });
        }
        Ok(())
    }

    fn run_cbc(&self, mode: Mode, key: &SecureBytes, iv: &[u8], input: &[u8]) -> CryptoResult<Vec<u8>> {
        let mut crypter = Crypter::new(
            self.cipher.to_openssl_cipher(),
            mode,
            key.expose_secret(),
            Some(iv),
        )?;
        crypter.pad(false);

        let mut output = vec![0u8; input.len() + AES_BLOCK_SIZE];
        let mut count = crypter.update(input, &mut output)?;
        count += crypter.finalize(&mut output[count..])?;
        output.truncate(count);
        Ok(output)
    }
}

impl Default for AesEncryptor {
    fn default() -> Self {
        Self::new()
    }
}
