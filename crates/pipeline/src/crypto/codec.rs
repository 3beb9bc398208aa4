//! Single-token decode: base64 → envelope split → HMAC verify → AES-CBC.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use aes::Aes128;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use common::DecryptionOutcome;

use super::key::VoucherKey;

/// Byte length of the CBC initialisation vector.
pub const IV_LEN: usize = 16;

/// Byte length of the HMAC-SHA-256 tag.
pub const MAC_LEN: usize = 32;

/// AES block size; ciphertext must be a non-zero multiple of this.
const BLOCK_LEN: usize = 16;

type HmacSha256 = Hmac<Sha256>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Decodes and authenticates one voucher token.
///
/// A pure function of the token and the fixed key: no side effects, and every
/// path returns a [`DecryptionOutcome`] rather than an error.
pub struct VoucherCodec {
    key: VoucherKey,
}

impl VoucherCodec {
    /// Build a codec around the fixed key.
    pub fn new(key: VoucherKey) -> Self {
        Self { key }
    }

    /// Decode a single token.
    ///
    /// The MAC is verified before any decryption is attempted
    /// (encrypt-then-MAC), and the comparison runs in constant time over the
    /// full tag length.
    pub fn decode(&self, token: &str) -> DecryptionOutcome {
        if token.trim().is_empty() {
            return DecryptionOutcome::EmptyToken;
        }

        let normalised = normalise_token(token);
        let bytes = match STANDARD.decode(&normalised) {
            Ok(b) => b,
            Err(_) => return DecryptionOutcome::BadEncoding,
        };

        if bytes.len() <= IV_LEN + MAC_LEN {
            return DecryptionOutcome::TooShort;
        }

        let (iv, rest) = bytes.split_at(IV_LEN);
        let (received_mac, ciphertext) = rest.split_at(MAC_LEN);

        // The MAC covers the ciphertext only; the IV sits outside it. See the
        // module docs before changing this.
        let mut mac = match HmacSha256::new_from_slice(self.key.as_bytes()) {
            Ok(m) => m,
            Err(_) => return DecryptionOutcome::DecryptionFailed("HMAC rejected key".into()),
        };
        mac.update(ciphertext);
        if mac.verify_slice(received_mac).is_err() {
            return DecryptionOutcome::AuthenticationFailed;
        }

        self.decrypt(ciphertext, iv)
    }

    /// AES-128-CBC decrypt plus PKCS#7 strip, after the MAC has verified.
    fn decrypt(&self, ciphertext: &[u8], iv: &[u8]) -> DecryptionOutcome {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
            return DecryptionOutcome::DecryptionFailed(format!(
                "ciphertext length {} is not a whole number of AES blocks",
                ciphertext.len()
            ));
        }

        let cipher = match Aes128CbcDec::new_from_slices(self.key.as_bytes(), iv) {
            Ok(c) => c,
            Err(_) => {
                return DecryptionOutcome::DecryptionFailed("cipher rejected key or IV".into())
            }
        };

        let plaintext = match cipher.decrypt_padded_vec_mut::<Pkcs7>(ciphertext) {
            Ok(p) => p,
            Err(_) => return DecryptionOutcome::DecryptionFailed("bad PKCS#7 padding".into()),
        };

        let text = match String::from_utf8(plaintext) {
            Ok(t) => t,
            Err(e) => return DecryptionOutcome::DecryptionFailed(e.to_string()),
        };

        if text.is_empty() {
            return DecryptionOutcome::EmptyPlaintext;
        }
        DecryptionOutcome::Plaintext(text)
    }
}

/// Repair the transport damage tokens routinely arrive with: surrounding
/// whitespace, embedded quote characters and line breaks from sloppy CSV
/// tooling, and stripped base64 padding.
fn normalise_token(token: &str) -> String {
    let mut s: String = token
        .trim()
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '\n' | '\r'))
        .collect();
    let missing = s.len() % 4;
    if missing != 0 {
        for _ in 0..(4 - missing) {
            s.push('=');
        }
    }
    s
}


#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;

    const ZERO_IV: [u8; IV_LEN] = [0u8; IV_LEN];

    #[test]
    fn hello_round_trip() {
        // Fixed scenario: zero IV, MAC over the ciphertext of "HELLO".
        let token = seal(b"HELLO", &ZERO_IV);
        assert_eq!(
            test_codec().decode(&token),
            DecryptionOutcome::Plaintext("HELLO".into())
        );
    }

    #[test]
    fn empty_and_whitespace_tokens() {
        let codec = test_codec();
        assert_eq!(codec.decode(""), DecryptionOutcome::EmptyToken);
        assert_eq!(codec.decode("   \t  "), DecryptionOutcome::EmptyToken);
    }

    #[test]
    fn invalid_base64_is_bad_encoding() {
        assert_eq!(
            test_codec().decode("!!!not base64!!!"),
            DecryptionOutcome::BadEncoding
        );
    }

    #[test]
    fn forty_eight_bytes_is_too_short() {
        // 48 decoded bytes: room for IV and MAC but zero ciphertext.
        let token = STANDARD.encode([0u8; 48]);
        assert_eq!(test_codec().decode(&token), DecryptionOutcome::TooShort);
    }

    #[test]
    fn quoted_token_with_line_breaks_still_decodes() {
        let token = seal(b"HELLO", &ZERO_IV);
        let mangled = format!("  \"{}\"\r\n", token);
        assert_eq!(
            test_codec().decode(&mangled),
            DecryptionOutcome::Plaintext("HELLO".into())
        );
    }

    #[test]
    fn missing_base64_padding_is_repaired() {
        let token = seal(b"HELLO", &ZERO_IV);
        let stripped = token.trim_end_matches('=');
        assert_ne!(stripped.len() % 4, 0, "test needs a padded token");
        assert_eq!(
            test_codec().decode(stripped),
            DecryptionOutcome::Plaintext("HELLO".into())
        );
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let ciphertext = {
            use aes::cipher::BlockEncryptMut;
            cbc::Encryptor::<Aes128>::new_from_slices(TEST_KEY, &ZERO_IV)
                .unwrap()
                .encrypt_padded_vec_mut::<Pkcs7>(b"HELLO")
        };
        let tag = tag_over(&ciphertext);
        let mut corrupted = ciphertext.clone();
        corrupted[0] ^= 0x01;
        let token = encode_envelope(&ZERO_IV, &tag, &corrupted);
        assert_eq!(
            test_codec().decode(&token),
            DecryptionOutcome::AuthenticationFailed
        );
    }

    #[test]
    fn tampered_mac_fails_authentication() {
        let token = seal(b"HELLO", &ZERO_IV);
        let mut bytes = STANDARD.decode(token).unwrap();
        bytes[IV_LEN] ^= 0x80;
        let token = STANDARD.encode(bytes);
        assert_eq!(
            test_codec().decode(&token),
            DecryptionOutcome::AuthenticationFailed
        );
    }

    #[test]
    fn tampered_iv_is_not_an_authentication_failure() {
        // The MAC excludes the IV, so flipping an IV bit must sail through
        // authentication. CBC then garbles only the first plaintext block:
        // 'H' ^ 0x01 = 'I', everything else intact.
        let token = seal(b"HELLO", &ZERO_IV);
        let mut bytes = STANDARD.decode(token).unwrap();
        bytes[0] ^= 0x01;
        let token = STANDARD.encode(bytes);
        assert_eq!(
            test_codec().decode(&token),
            DecryptionOutcome::Plaintext("IELLO".into())
        );
    }

    #[test]
    fn tampered_iv_can_surface_as_decryption_failure() {
        // Same property, but the bit flip produces an invalid UTF-8 lead
        // byte (0x48 ^ 0x80 = 0xC8), so the failure lands after the MAC.
        let token = seal(b"HELLO", &ZERO_IV);
        let mut bytes = STANDARD.decode(token).unwrap();
        bytes[0] ^= 0x80;
        let token = STANDARD.encode(bytes);
        assert!(matches!(
            test_codec().decode(&token),
            DecryptionOutcome::DecryptionFailed(_)
        ));
    }

    #[test]
    fn forty_nine_bytes_passes_length_gate_and_mac() {
        // One ciphertext byte: authenticates fine, but is not a whole AES
        // block, so the failure is in the cipher layer, never TooShort or
        // AuthenticationFailed.
        let ciphertext = [0xABu8];
        let tag = tag_over(&ciphertext);
        let token = encode_envelope(&ZERO_IV, &tag, &ciphertext);
        assert!(matches!(
            test_codec().decode(&token),
            DecryptionOutcome::DecryptionFailed(_)
        ));
    }

    #[test]
    fn empty_plaintext_is_its_own_outcome() {
        let token = seal(b"", &ZERO_IV);
        assert_eq!(
            test_codec().decode(&token),
            DecryptionOutcome::EmptyPlaintext
        );
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let token = seal(b"HELLO", &ZERO_IV);
        let other = VoucherCodec::new(VoucherKey::new(b"0000000000000000").unwrap());
        assert_eq!(
            other.decode(&token),
            DecryptionOutcome::AuthenticationFailed
        );
    }
}
