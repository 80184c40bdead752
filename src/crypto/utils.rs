use crate::crypto::errors::{CryptoResult, Error};
use rand::{TryRngCore, rngs::OsRng};

/// Generate cryptographically secure random bytes
pub fn generate_random_bytes(length: usize) -> CryptoResult<Vec<u8>> {
    let mut buf = vec![0u8; length];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| Error::Random(e.to_string()))?;
    Ok(buf)
}

/// XML Encryption block padding: random filler, last byte holds the pad length.
pub fn xmlenc_pad(data: &[u8], block_size: usize) -> CryptoResult<Vec<u8>> {
    let pad_len = block_size - (data.len() % block_size);
    let mut padded = Vec::with_capacity(data.len() + pad_len);
    padded.extend_from_slice(data);
    padded.extend(generate_random_bytes(pad_len - 1)?);
    padded.push(pad_len as u8);
    Ok(padded)
}

/// Remove XML Encryption block padding
pub fn xmlenc_unpad(data: &[u8], block_size: usize) -> CryptoResult<Vec<u8>> {
    let pad_len = match data.last() {
        Some(&n) => n as usize,
        None => return Err(Error::Ciphertext("empty plaintext".into())),
    };
    if pad_len == 0 || pad_len > block_size || pad_len > data.len() {
        return Err(Error::Ciphertext("invalid block padding".into()));
    }
    Ok(data[..data.len() - pad_len].to_vec())
}
