//! Per-row decode outcomes and their sentinel rendering.
//!
//! The pipeline works with this tagged enum internally; consumers of the
//! export artifact expect the exact sentinel strings the legacy decoder
//! produced, so [`Display`](std::fmt::Display) is the single stable rendering
//! point. Do not build sentinel strings anywhere else.

use std::fmt;

/// The result of decoding one voucher token.
///
/// Every decode path returns a value. Nothing in the codec panics or raises,
/// so one bad row can never abort a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptionOutcome {
    /// Authentication and decryption succeeded.
    Plaintext(String),
    /// The row had no token value at all.
    NoCode,
    /// The token was empty or whitespace-only.
    EmptyToken,
    /// The token was not valid base64.
    BadEncoding,
    /// The decoded envelope was 48 bytes or fewer, too small to hold an IV,
    /// a MAC, and any ciphertext.
    TooShort,
    /// The computed MAC did not match the received MAC.
    AuthenticationFailed,
    /// The cipher, padding, or UTF-8 layer failed after the MAC verified.
    DecryptionFailed(String),
    /// Decryption succeeded but produced an empty string.
    EmptyPlaintext,
}

impl DecryptionOutcome {
    /// `true` only when a non-empty plaintext was recovered.
    pub fn is_success(&self) -> bool {
        matches!(self, DecryptionOutcome::Plaintext(_))
    }
}

impl fmt::Display for DecryptionOutcome {
    /// Renders the plaintext itself, or the fixed user-visible sentinel for
    /// every failure kind.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecryptionOutcome::Plaintext(text) => f.write_str(text),
            DecryptionOutcome::NoCode => f.write_str("[No Code]"),
            DecryptionOutcome::EmptyToken => f.write_str("[Empty Code]"),
            DecryptionOutcome::BadEncoding => f.write_str("[Base64 decode failed]"),
            DecryptionOutcome::TooShort => f.write_str("[Ciphertext too short]"),
            DecryptionOutcome::AuthenticationFailed => f.write_str("[HMAC verification failed]"),
            DecryptionOutcome::DecryptionFailed(msg) => {
                write!(f, "[Decryption failed: {msg}]")
            }
            DecryptionOutcome::EmptyPlaintext => f.write_str("[Decryption produced empty string]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_stable() {
        // These strings are consumed downstream; changing any of them is a
        // breaking change.
        assert_eq!(DecryptionOutcome::NoCode.to_string(), "[No Code]");
        assert_eq!(DecryptionOutcome::EmptyToken.to_string(), "[Empty Code]");
        assert_eq!(
            DecryptionOutcome::BadEncoding.to_string(),
            "[Base64 decode failed]"
        );
        assert_eq!(
            DecryptionOutcome::TooShort.to_string(),
            "[Ciphertext too short]"
        );
        assert_eq!(
            DecryptionOutcome::AuthenticationFailed.to_string(),
            "[HMAC verification failed]"
        );
        assert_eq!(
            DecryptionOutcome::DecryptionFailed("bad PKCS#7 padding".into()).to_string(),
            "[Decryption failed: bad PKCS#7 padding]"
        );
        assert_eq!(
            DecryptionOutcome::EmptyPlaintext.to_string(),
            "[Decryption produced empty string]"
        );
    }

    #[test]
    fn plaintext_renders_verbatim() {
        let out = DecryptionOutcome::Plaintext("VOUCHER-123".into());
        assert_eq!(out.to_string(), "VOUCHER-123");
        assert!(out.is_success());
    }

    #[test]
    fn failures_are_not_success() {
        assert!(!DecryptionOutcome::NoCode.is_success());
        assert!(!DecryptionOutcome::EmptyPlaintext.is_success());
        assert!(!DecryptionOutcome::DecryptionFailed("x".into()).is_success());
    }
}
