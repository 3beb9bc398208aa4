//! Fixed symmetric key handling.

use std::fmt;

use common::PipelineError;

/// Byte length of the fixed AES-128 / HMAC key.
pub const KEY_LEN: usize = 16;

/// The fixed 16-byte key used for both HMAC verification and AES decryption.
///
/// Constructed once at startup from configuration and passed explicitly into
/// [`VoucherCodec`](super::VoucherCodec); never ambient state. When this type
/// is dropped, the memory is overwritten with zeroes to minimise the window
/// during which key material lives in RAM.
#[derive(Clone)]
pub struct VoucherKey(Box<[u8; KEY_LEN]>);

impl VoucherKey {
    /// Build a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidKeyLength`] unless `bytes` is exactly
    /// [`KEY_LEN`] bytes.
    pub fn new(bytes: &[u8]) -> Result<Self, PipelineError> {
        if bytes.len() != KEY_LEN {
            return Err(PipelineError::InvalidKeyLength {
                expected: KEY_LEN,
                got: bytes.len(),
            });
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    /// Raw key bytes, for handing to the MAC and cipher constructors.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Drop for VoucherKey {
    fn drop(&mut self) {
        // Zero the key material on drop.
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl fmt::Debug for VoucherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material — not even in debug builds.
        f.write_str("VoucherKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exact_length() {
        let key = VoucherKey::new(b"7563424859574547").unwrap();
        assert_eq!(key.as_bytes(), b"7563424859574547");
    }

    #[test]
    fn rejects_wrong_length() {
        let err = VoucherKey::new(b"too short").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidKeyLength {
                expected: 16,
                got: 9
            }
        ));
    }

    #[test]
    fn redacted_in_debug() {
        let key = VoucherKey::new(&[0xFFu8; KEY_LEN]).unwrap();
        assert!(format!("{key:?}").contains("REDACTED"));
    }
}
